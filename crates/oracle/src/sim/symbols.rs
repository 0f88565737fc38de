//! Executable symbol resolution.
//!
//! The guest executable is a static 64-bit little-endian ELF image. The oracle only needs
//! its symbol table: the addresses of `code`, `sandbox`, and `registers` tell it where to
//! inject test cases and inputs. This module performs:
//! 1. **Validation:** ELF magic, 64-bit class, little-endian data, and version 1.
//! 2. **Section lookup:** Finds `.strtab` and `.symtab` by name through the section-header
//!    string table.
//! 3. **Symbol table read:** Builds the name → address map and checks the required symbols.
//!
//! Every structure is decoded through bounds-checked reads of the image bytes; no
//! relocation or dynamic symbol handling is attempted.

use std::collections::HashMap;
use std::fs;
use std::mem;
use std::path::{Path, PathBuf};

use object::LittleEndian as LE;
use object::elf::{
    ELFCLASS64, ELFDATA2LSB, ELFMAG, EV_CURRENT, FileHeader64, SectionHeader64, Sym64,
};
use object::pod::Pod;
use object::read::ReadRef;
use tracing::debug;

use crate::common::constants::{
    REQUIRED_SYMBOLS, SYMBOL_CODE, SYMBOL_REGISTERS, SYMBOL_SANDBOX,
};
use crate::common::{OracleError, Result, VirtAddr};

/// Section holding symbol names.
const STRTAB: &[u8] = b".strtab";

/// Section holding symbol entries.
const SYMTAB: &[u8] = b".symtab";

/// Longest section name compared; longer names cannot match either section.
const MAX_SECTION_NAME: u64 = 15;

/// Anything that can report the address of a named symbol.
pub trait SymbolImage {
    /// Returns the address of `name`, if defined.
    fn address_of(&self, name: &str) -> Option<u64>;
}

/// Symbol name → guest virtual address mapping of an executable.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolAddresses {
    addresses: HashMap<String, u64>,
}

impl SymbolAddresses {
    /// Builds a mapping from `(name, address)` pairs; later duplicates win.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        Self {
            addresses: pairs.into_iter().map(|(name, addr)| (name.into(), addr)).collect(),
        }
    }

    /// Returns the address of `name`, if defined.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.addresses.get(name).copied()
    }

    /// Number of named symbols.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Returns `true` if the image defines no named symbols.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Iterates over `(name, address)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.addresses.iter().map(|(name, &addr)| (name.as_str(), addr))
    }

    /// Fails with the first required symbol that is not defined.
    pub fn require(&self, names: &[&str]) -> Result<()> {
        match names.iter().find(|name| !self.addresses.contains_key(**name)) {
            Some(name) => Err(OracleError::MissingSymbol {
                name: (*name).to_owned(),
            }),
            None => Ok(()),
        }
    }
}

impl SymbolImage for SymbolAddresses {
    fn address_of(&self, name: &str) -> Option<u64> {
        self.get(name)
    }
}

/// Guest addresses of the three regions the oracle writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionLayout {
    /// Start of the injected code region.
    pub code: VirtAddr,
    /// Start of the sandbox region.
    pub sandbox: VirtAddr,
    /// Start of the registers region.
    pub registers: VirtAddr,
}

impl RegionLayout {
    /// Looks up the region symbols in `image`.
    pub fn from_image(image: &dyn SymbolImage) -> Result<Self> {
        let lookup = |name: &str| {
            image
                .address_of(name)
                .map(VirtAddr::new)
                .ok_or_else(|| OracleError::MissingSymbol {
                    name: name.to_owned(),
                })
        };
        Ok(Self {
            code: lookup(SYMBOL_CODE)?,
            sandbox: lookup(SYMBOL_SANDBOX)?,
            registers: lookup(SYMBOL_REGISTERS)?,
        })
    }
}

/// Reads the executable at `path` and resolves its symbols.
pub fn resolve(path: &Path) -> Result<SymbolAddresses> {
    let data = fs::read(path).map_err(|source| OracleError::OpenExecutable {
        path: path.to_path_buf(),
        source,
    })?;
    let symbols = parse(&data, path)?;
    debug!(path = %path.display(), count = symbols.len(), "resolved executable symbols");
    Ok(symbols)
}

/// Resolves the symbols of an in-memory image; `path` is only used in errors.
pub fn parse(data: &[u8], path: &Path) -> Result<SymbolAddresses> {
    let image = Image { data, path };
    let header: &FileHeader64<LE> = image.read_at(0, "file header")?;
    let ident = &header.e_ident;
    if ident.magic != ELFMAG
        || ident.class != ELFCLASS64
        || ident.data != ELFDATA2LSB
        || ident.version != EV_CURRENT
    {
        return Err(OracleError::NotElf64 {
            path: path.to_path_buf(),
        });
    }

    let sections = SectionTable {
        offset: header.e_shoff.get(LE),
        entry_size: u64::from(header.e_shentsize.get(LE)),
        count: header.e_shnum.get(LE),
    };
    let shstrtab = image.section(&sections, header.e_shstrndx.get(LE))?;
    let shstrtab_offset = shstrtab.sh_offset.get(LE);

    let mut strtab: Option<&[u8]> = None;
    let mut symtab: Option<&SectionHeader64<LE>> = None;
    for index in 0..sections.count {
        let section = image.section(&sections, index)?;
        let name = image.section_name(shstrtab_offset, section.sh_name.get(LE))?;
        if name == STRTAB {
            strtab = Some(image.bytes_at(
                section.sh_offset.get(LE),
                section.sh_size.get(LE),
                "string table",
            )?);
        } else if name == SYMTAB {
            let expected = mem::size_of::<Sym64<LE>>() as u64;
            let found = section.sh_entsize.get(LE);
            if found != expected {
                return Err(OracleError::SymbolEntrySize {
                    path: path.to_path_buf(),
                    found,
                    expected,
                });
            }
            symtab = Some(section);
        }
    }

    let mut addresses = HashMap::new();
    if let Some(symtab) = symtab {
        let strtab = strtab.ok_or_else(|| image.malformed("missing .strtab section"))?;
        let count = symtab.sh_size.get(LE) / mem::size_of::<Sym64<LE>>() as u64;
        let count = usize::try_from(count).map_err(|_| image.malformed("symbol table"))?;
        let entries: &[Sym64<LE>] = data
            .read_slice_at(symtab.sh_offset.get(LE), count)
            .map_err(|()| image.malformed("symbol table"))?;
        for symbol in entries {
            let name_offset = u64::from(symbol.st_name.get(LE));
            let name = strtab
                .read_bytes_at_until(name_offset..strtab.len() as u64, 0)
                .map_err(|()| image.malformed("symbol name"))?;
            if name.is_empty() {
                continue;
            }
            let _ = addresses.insert(
                String::from_utf8_lossy(name).into_owned(),
                symbol.st_value.get(LE),
            );
        }
    }

    let symbols = SymbolAddresses { addresses };
    symbols.require(&REQUIRED_SYMBOLS)?;
    Ok(symbols)
}

/// Location of the section header table.
struct SectionTable {
    offset: u64,
    entry_size: u64,
    count: u16,
}

/// Bounds-checked view of the image bytes.
struct Image<'data> {
    data: &'data [u8],
    path: &'data Path,
}

impl<'data> Image<'data> {
    fn malformed(&self, what: &'static str) -> OracleError {
        OracleError::MalformedElf {
            path: PathBuf::from(self.path),
            what,
        }
    }

    fn read_at<T: Pod>(&self, offset: u64, what: &'static str) -> Result<&'data T> {
        self.data.read_at(offset).map_err(|()| self.malformed(what))
    }

    fn bytes_at(&self, offset: u64, size: u64, what: &'static str) -> Result<&'data [u8]> {
        self.data
            .read_bytes_at(offset, size)
            .map_err(|()| self.malformed(what))
    }

    fn section(&self, table: &SectionTable, index: u16) -> Result<&'data SectionHeader64<LE>> {
        let offset = u64::from(index)
            .checked_mul(table.entry_size)
            .and_then(|rel| rel.checked_add(table.offset))
            .ok_or_else(|| self.malformed("section header"))?;
        self.read_at(offset, "section header")
    }

    /// Reads a NUL-terminated section name, looking at no more than `MAX_SECTION_NAME` bytes.
    fn section_name(&self, shstrtab_offset: u64, name_offset: u32) -> Result<&'data [u8]> {
        let start = shstrtab_offset
            .checked_add(u64::from(name_offset))
            .ok_or_else(|| self.malformed("section name"))?;
        let end = start
            .saturating_add(MAX_SECTION_NAME)
            .min(self.data.len() as u64);
        if start >= end {
            return Err(self.malformed("section name"));
        }
        self.data
            .read_bytes_at_until(start..end, 0)
            .or_else(|()| self.bytes_at(start, end - start, "section name"))
    }
}
