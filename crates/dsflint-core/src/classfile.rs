//! Minimal Java class-file reader
//!
//! Plugin discovery never executes plugin code. The information the linter
//! needs from a class is available in the class file itself: the declared
//! super class and interfaces (API generation markers, delegate checks),
//! the method name table (capability checks), and the string constants of
//! the constant pool (declared process model and FHIR resource paths).
//!
//! Only the constant pool, the class header, and the field/method name
//! tables are decoded; attributes and bytecode are skipped.

use crate::error::DsflintError;
use crate::Result;

const MAGIC: u32 = 0xCAFE_BABE;

/// Decoded view of a single class file
#[derive(Debug, Clone)]
pub struct ClassFile {
    /// Binary name in dotted form, e.g. `dev.dsf.bpe.PingPluginDefinition`
    pub class_name: String,
    /// Dotted super-class name; `None` only for `java.lang.Object`
    pub super_class: Option<String>,
    /// Dotted names of directly declared interfaces
    pub interfaces: Vec<String>,
    /// Method names in declaration order
    pub methods: Vec<String>,
    /// `CONSTANT_String` literals in constant-pool order
    pub string_constants: Vec<String>,
}

impl ClassFile {
    /// Parse a class file from raw bytes
    pub fn parse(entry: &str, bytes: &[u8]) -> Result<Self> {
        Parser::new(entry, bytes).parse()
    }

    /// Directly declared super types: super class first, then interfaces
    pub fn super_types(&self) -> impl Iterator<Item = &str> {
        self.super_class
            .as_deref()
            .into_iter()
            .chain(self.interfaces.iter().map(String::as_str))
    }

    /// Leaf name without the package
    pub fn simple_name(&self) -> &str {
        self.class_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.class_name)
    }

    /// Whether the method name table covers all given names
    pub fn has_methods(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.methods.iter().any(|m| m == n))
    }
}

/// Constant pool entries the reader keeps; everything else is skipped
#[derive(Debug, Clone)]
enum PoolEntry {
    Utf8(String),
    Class { name_index: u16 },
    Str { utf8_index: u16 },
    Other,
    /// Second slot of a long/double entry
    Tombstone,
}

struct Parser<'a> {
    entry: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(entry: &'a str, bytes: &'a [u8]) -> Self {
        Self {
            entry,
            bytes,
            pos: 0,
        }
    }

    fn err(&self, message: impl Into<String>) -> DsflintError {
        DsflintError::class_file_error(self.entry, message)
    }

    fn u1(&mut self) -> Result<u8> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| self.err("unexpected end of class file"))?;
        self.pos += 1;
        Ok(b)
    }

    fn u2(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes([self.u1()?, self.u1()?]))
    }

    fn u4(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes([
            self.u1()?,
            self.u1()?,
            self.u1()?,
            self.u1()?,
        ]))
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        if self.pos + n > self.bytes.len() {
            return Err(self.err("unexpected end of class file"));
        }
        self.pos += n;
        Ok(())
    }

    fn utf8(&mut self, len: usize) -> Result<String> {
        if self.pos + len > self.bytes.len() {
            return Err(self.err("unexpected end of class file"));
        }
        // Modified UTF-8; plain lossy decoding is sufficient for names and paths
        let s = String::from_utf8_lossy(&self.bytes[self.pos..self.pos + len]).into_owned();
        self.pos += len;
        Ok(s)
    }

    fn parse(mut self) -> Result<ClassFile> {
        if self.u4()? != MAGIC {
            return Err(self.err("bad magic number"));
        }
        self.skip(4)?; // minor, major version

        let pool_count = self.u2()? as usize;
        let mut pool: Vec<PoolEntry> = Vec::with_capacity(pool_count);
        pool.push(PoolEntry::Tombstone); // index 0 is unused
        let mut i = 1;
        while i < pool_count {
            let tag = self.u1()?;
            let entry = match tag {
                1 => {
                    let len = self.u2()? as usize;
                    PoolEntry::Utf8(self.utf8(len)?)
                }
                7 => PoolEntry::Class {
                    name_index: self.u2()?,
                },
                8 => PoolEntry::Str {
                    utf8_index: self.u2()?,
                },
                3 | 4 => {
                    self.skip(4)?;
                    PoolEntry::Other
                }
                5 | 6 => {
                    self.skip(8)?;
                    pool.push(PoolEntry::Other);
                    pool.push(PoolEntry::Tombstone);
                    i += 2;
                    continue;
                }
                9 | 10 | 11 | 12 | 17 | 18 => {
                    self.skip(4)?;
                    PoolEntry::Other
                }
                15 => {
                    self.skip(3)?;
                    PoolEntry::Other
                }
                16 | 19 | 20 => {
                    self.skip(2)?;
                    PoolEntry::Other
                }
                other => return Err(self.err(format!("unknown constant pool tag {other}"))),
            };
            pool.push(entry);
            i += 1;
        }

        let lookup_utf8 = |pool: &[PoolEntry], index: u16| -> Option<String> {
            match pool.get(index as usize) {
                Some(PoolEntry::Utf8(s)) => Some(s.clone()),
                _ => None,
            }
        };
        let lookup_class = |pool: &[PoolEntry], index: u16| -> Option<String> {
            match pool.get(index as usize) {
                Some(PoolEntry::Class { name_index }) => {
                    lookup_utf8(pool, *name_index).map(|n| n.replace('/', "."))
                }
                _ => None,
            }
        };

        self.skip(2)?; // access flags
        let this_class = self.u2()?;
        let super_class = self.u2()?;

        let class_name = lookup_class(&pool, this_class)
            .ok_or_else(|| self.err("this_class is not a class entry"))?;
        let super_class = if super_class == 0 {
            None
        } else {
            Some(
                lookup_class(&pool, super_class)
                    .ok_or_else(|| self.err("super_class is not a class entry"))?,
            )
        };

        let interface_count = self.u2()? as usize;
        let mut interfaces = Vec::with_capacity(interface_count);
        for _ in 0..interface_count {
            let index = self.u2()?;
            interfaces.push(
                lookup_class(&pool, index)
                    .ok_or_else(|| self.err("interface is not a class entry"))?,
            );
        }

        self.skip_members(None)?; // fields
        let mut methods = Vec::new();
        self.skip_members(Some(&mut |name_index| {
            if let Some(name) = lookup_utf8(&pool, name_index) {
                methods.push(name);
            }
        }))?;

        let string_constants = pool
            .iter()
            .filter_map(|entry| match entry {
                PoolEntry::Str { utf8_index } => lookup_utf8(&pool, *utf8_index),
                _ => None,
            })
            .collect();

        Ok(ClassFile {
            class_name,
            super_class,
            interfaces,
            methods,
            string_constants,
        })
    }

    /// Skip a field or method table, optionally reporting each member name index
    fn skip_members(&mut self, mut on_name: Option<&mut dyn FnMut(u16)>) -> Result<()> {
        let count = self.u2()? as usize;
        for _ in 0..count {
            self.skip(2)?; // access flags
            let name_index = self.u2()?;
            if let Some(f) = on_name.as_mut() {
                f(name_index);
            }
            self.skip(2)?; // descriptor
            let attr_count = self.u2()? as usize;
            for _ in 0..attr_count {
                self.skip(2)?; // attribute name
                let len = self.u4()? as usize;
                self.skip(len)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_helpers::ClassFileBuilder;
    use super::*;

    #[test]
    fn parses_names_methods_and_strings() {
        let bytes = ClassFileBuilder::new("dev.example.PingProcessPluginDefinition")
            .interface("dev.dsf.bpe.v2.ProcessPluginDefinition")
            .method("getName")
            .method("getProcessModels")
            .string_constant("bpe/ping.bpmn")
            .string_constant("1.0.0.0")
            .build();

        let class = ClassFile::parse("Ping.class", &bytes).unwrap();
        assert_eq!(class.class_name, "dev.example.PingProcessPluginDefinition");
        assert_eq!(class.simple_name(), "PingProcessPluginDefinition");
        assert_eq!(class.super_class.as_deref(), Some("java.lang.Object"));
        assert_eq!(
            class.interfaces,
            vec!["dev.dsf.bpe.v2.ProcessPluginDefinition"]
        );
        assert!(class.has_methods(&["getName", "getProcessModels"]));
        assert!(!class.has_methods(&["getName", "absent"]));
        assert_eq!(
            class.string_constants,
            vec!["bpe/ping.bpmn", "1.0.0.0"]
        );
    }

    #[test]
    fn rejects_bad_magic() {
        assert!(ClassFile::parse("X.class", &[0, 0, 0, 0]).is_err());
        assert!(ClassFile::parse("X.class", &[]).is_err());
    }

    #[test]
    fn super_types_iterates_super_then_interfaces() {
        let bytes = ClassFileBuilder::new("a.B")
            .super_class("a.Base")
            .interface("a.I1")
            .interface("a.I2")
            .build();
        let class = ClassFile::parse("B.class", &bytes).unwrap();
        let types: Vec<_> = class.super_types().collect();
        assert_eq!(types, vec!["a.Base", "a.I1", "a.I2"]);
    }
}
