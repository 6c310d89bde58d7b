//! Constant pool de un class file.
//!
//! Las entradas existentes nunca se modifican en su contenido: los renombres
//! agregan entradas nuevas al final y re-apuntan índices (`set`). Así una
//! `Utf8` compartida (p.ej. nombre de clase y literal `String`) no cambia para
//! los usos que no se renombran.

use super::io::{put_u16, put_u32, ByteReader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpEntry {
    /// Índice 0 y segunda ranura de `Long`/`Double`.
    Unusable,
    Utf8(Vec<u8>),
    Integer(u32),
    Float(u32),
    Long(u64),
    Double(u64),
    Class(u16),
    String(u16),
    FieldRef { class: u16, nat: u16 },
    MethodRef { class: u16, nat: u16 },
    InterfaceMethodRef { class: u16, nat: u16 },
    NameAndType { name: u16, desc: u16 },
    MethodHandle { kind: u8, reference: u16 },
    MethodType(u16),
    Dynamic { bootstrap: u16, nat: u16 },
    InvokeDynamic { bootstrap: u16, nat: u16 },
    Module(u16),
    Package(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantPool {
    entries: Vec<CpEntry>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self { entries: vec![CpEntry::Unusable] }
    }

    pub(crate) fn read(r: &mut ByteReader<'_>) -> Result<Self, String> {
        let count = r.u16()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(CpEntry::Unusable);
        while entries.len() < count {
            let idx = entries.len();
            let tag = r.u8()?;
            let entry = match tag {
                1 => {
                    let len = r.u16()? as usize;
                    CpEntry::Utf8(r.bytes(len)?.to_vec())
                }
                3 => CpEntry::Integer(r.u32()?),
                4 => CpEntry::Float(r.u32()?),
                5 => CpEntry::Long(r.u64()?),
                6 => CpEntry::Double(r.u64()?),
                7 => CpEntry::Class(r.u16()?),
                8 => CpEntry::String(r.u16()?),
                9 => CpEntry::FieldRef { class: r.u16()?,
                                         nat: r.u16()? },
                10 => CpEntry::MethodRef { class: r.u16()?,
                                           nat: r.u16()? },
                11 => CpEntry::InterfaceMethodRef { class: r.u16()?,
                                                    nat: r.u16()? },
                12 => CpEntry::NameAndType { name: r.u16()?,
                                             desc: r.u16()? },
                15 => CpEntry::MethodHandle { kind: r.u8()?,
                                              reference: r.u16()? },
                16 => CpEntry::MethodType(r.u16()?),
                17 => CpEntry::Dynamic { bootstrap: r.u16()?,
                                         nat: r.u16()? },
                18 => CpEntry::InvokeDynamic { bootstrap: r.u16()?,
                                               nat: r.u16()? },
                19 => CpEntry::Module(r.u16()?),
                20 => CpEntry::Package(r.u16()?),
                other => return Err(format!("unknown constant pool tag {other} at index {idx}")),
            };
            let wide = matches!(entry, CpEntry::Long(_) | CpEntry::Double(_));
            entries.push(entry);
            if wide {
                entries.push(CpEntry::Unusable);
            }
        }
        if entries.len() != count {
            return Err("wide constant overflows the constant pool".to_string());
        }
        Ok(Self { entries })
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        put_u16(out, self.entries.len() as u16);
        for entry in &self.entries {
            match entry {
                CpEntry::Unusable => {}
                CpEntry::Utf8(b) => {
                    out.push(1);
                    put_u16(out, b.len() as u16);
                    out.extend_from_slice(b);
                }
                CpEntry::Integer(v) => {
                    out.push(3);
                    put_u32(out, *v);
                }
                CpEntry::Float(v) => {
                    out.push(4);
                    put_u32(out, *v);
                }
                CpEntry::Long(v) => {
                    out.push(5);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                CpEntry::Double(v) => {
                    out.push(6);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                CpEntry::Class(i) => two(out, 7, *i),
                CpEntry::String(i) => two(out, 8, *i),
                CpEntry::FieldRef { class, nat } => four(out, 9, *class, *nat),
                CpEntry::MethodRef { class, nat } => four(out, 10, *class, *nat),
                CpEntry::InterfaceMethodRef { class, nat } => four(out, 11, *class, *nat),
                CpEntry::NameAndType { name, desc } => four(out, 12, *name, *desc),
                CpEntry::MethodHandle { kind, reference } => {
                    out.push(15);
                    out.push(*kind);
                    put_u16(out, *reference);
                }
                CpEntry::MethodType(i) => two(out, 16, *i),
                CpEntry::Dynamic { bootstrap, nat } => four(out, 17, *bootstrap, *nat),
                CpEntry::InvokeDynamic { bootstrap, nat } => four(out, 18, *bootstrap, *nat),
                CpEntry::Module(i) => two(out, 19, *i),
                CpEntry::Package(i) => two(out, 20, *i),
            }
        }
    }

    /// `constant_pool_count` (índice 0 incluido).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn get(&self, idx: u16) -> Option<&CpEntry> {
        self.entries.get(idx as usize)
    }

    pub fn set(&mut self, idx: u16, entry: CpEntry) {
        if let Some(slot) = self.entries.get_mut(idx as usize) {
            *slot = entry;
        }
    }

    pub fn utf8(&self, idx: u16) -> Option<&str> {
        match self.get(idx)? {
            CpEntry::Utf8(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn class_name(&self, idx: u16) -> Option<&str> {
        match self.get(idx)? {
            CpEntry::Class(n) => self.utf8(*n),
            _ => None,
        }
    }

    pub fn name_and_type(&self, idx: u16) -> Option<(&str, &str)> {
        match self.get(idx)? {
            CpEntry::NameAndType { name, desc } => Some((self.utf8(*name)?, self.utf8(*desc)?)),
            _ => None,
        }
    }

    fn push(&mut self, entry: CpEntry) -> Result<u16, String> {
        let idx = self.entries.len();
        if idx >= u16::MAX as usize {
            return Err("constant pool overflow".to_string());
        }
        self.entries.push(entry);
        Ok(idx as u16)
    }

    /// Índice de una `Utf8` con ese contenido, reutilizando una existente.
    pub fn add_utf8(&mut self, s: &str) -> Result<u16, String> {
        if let Some(i) = self.entries
                             .iter()
                             .position(|e| matches!(e, CpEntry::Utf8(b) if b.as_slice() == s.as_bytes()))
        {
            return Ok(i as u16);
        }
        if s.len() > u16::MAX as usize {
            return Err(format!("utf8 constant too long ({} bytes)", s.len()));
        }
        self.push(CpEntry::Utf8(s.as_bytes().to_vec()))
    }

    pub fn add_class(&mut self, name: &str) -> Result<u16, String> {
        let n = self.add_utf8(name)?;
        if let Some(i) = self.entries.iter().position(|e| *e == CpEntry::Class(n)) {
            return Ok(i as u16);
        }
        self.push(CpEntry::Class(n))
    }

    pub fn add_name_and_type(&mut self, name: u16, desc: u16) -> Result<u16, String> {
        let wanted = CpEntry::NameAndType { name, desc };
        if let Some(i) = self.entries.iter().position(|e| *e == wanted) {
            return Ok(i as u16);
        }
        self.push(wanted)
    }

    pub fn add_entry(&mut self, entry: CpEntry) -> Result<u16, String> {
        if let Some(i) = self.entries.iter().position(|e| *e == entry) {
            return Ok(i as u16);
        }
        let wide = matches!(entry, CpEntry::Long(_) | CpEntry::Double(_));
        let idx = self.push(entry)?;
        if wide {
            self.push(CpEntry::Unusable)?;
        }
        Ok(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &CpEntry)> {
        self.entries.iter().enumerate().map(|(i, e)| (i as u16, e))
    }
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

fn two(out: &mut Vec<u8>, tag: u8, a: u16) {
    out.push(tag);
    put_u16(out, a);
}

fn four(out: &mut Vec<u8>, tag: u8, a: u16, b: u16) {
    out.push(tag);
    put_u16(out, a);
    put_u16(out, b);
}
