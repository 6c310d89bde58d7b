//! Modelo mínimo de class file JVM: lo justo para renombrar símbolos,
//! cambiar flags de acceso y agregar atributos, preservando el resto de bytes
//! (código, atributos desconocidos) tal cual.

mod io;
mod pool;
mod signature;

pub use pool::{ConstantPool, CpEntry};
pub use signature::remap_signature;

use io::{put_u16, put_u32, ByteReader};

pub const MAGIC: u32 = 0xCAFE_BABE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name: u16,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub access: u16,
    pub name: u16,
    pub descriptor: u16,
    pub attributes: Vec<AttributeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    pub minor: u16,
    pub major: u16,
    pub pool: ConstantPool,
    pub access: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        let mut r = ByteReader::new(bytes);
        if r.u32()? != MAGIC {
            return Err("bad magic".to_string());
        }
        let minor = r.u16()?;
        let major = r.u16()?;
        let pool = ConstantPool::read(&mut r)?;
        let access = r.u16()?;
        let this_class = r.u16()?;
        let super_class = r.u16()?;
        let n = r.u16()?;
        let mut interfaces = Vec::with_capacity(n as usize);
        for _ in 0..n {
            interfaces.push(r.u16()?);
        }
        let fields = read_members(&mut r)?;
        let methods = read_members(&mut r)?;
        let attributes = read_attributes(&mut r)?;
        if !r.is_empty() {
            return Err("trailing bytes after class file".to_string());
        }
        Ok(Self { minor,
                  major,
                  pool,
                  access,
                  this_class,
                  super_class,
                  interfaces,
                  fields,
                  methods,
                  attributes })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_u32(&mut out, MAGIC);
        put_u16(&mut out, self.minor);
        put_u16(&mut out, self.major);
        self.pool.write(&mut out);
        put_u16(&mut out, self.access);
        put_u16(&mut out, self.this_class);
        put_u16(&mut out, self.super_class);
        put_u16(&mut out, self.interfaces.len() as u16);
        for i in &self.interfaces {
            put_u16(&mut out, *i);
        }
        write_members(&mut out, &self.fields);
        write_members(&mut out, &self.methods);
        write_attributes(&mut out, &self.attributes);
        out
    }

    pub fn name(&self) -> Option<&str> {
        self.pool.class_name(self.this_class)
    }

    pub fn super_name(&self) -> Option<&str> {
        if self.super_class == 0 {
            return None;
        }
        self.pool.class_name(self.super_class)
    }

    pub fn interface_names(&self) -> impl Iterator<Item = &str> {
        self.interfaces.iter().filter_map(|i| self.pool.class_name(*i))
    }

    pub fn member_name(&self, m: &MemberInfo) -> Option<&str> {
        self.pool.utf8(m.name)
    }

    pub fn member_descriptor(&self, m: &MemberInfo) -> Option<&str> {
        self.pool.utf8(m.descriptor)
    }

    /// Nombre del atributo, si apunta a una `Utf8`.
    pub fn attribute_name(&self, a: &AttributeInfo) -> Option<&str> {
        self.pool.utf8(a.name)
    }
}

fn read_attributes(r: &mut ByteReader<'_>) -> Result<Vec<AttributeInfo>, String> {
    let n = r.u16()?;
    let mut out = Vec::with_capacity(n as usize);
    for _ in 0..n {
        let name = r.u16()?;
        let len = r.u32()? as usize;
        out.push(AttributeInfo { name,
                                 data: r.bytes(len)?.to_vec() });
    }
    Ok(out)
}

fn read_members(r: &mut ByteReader<'_>) -> Result<Vec<MemberInfo>, String> {
    let n = r.u16()?;
    let mut out = Vec::with_capacity(n as usize);
    for _ in 0..n {
        out.push(MemberInfo { access: r.u16()?,
                              name: r.u16()?,
                              descriptor: r.u16()?,
                              attributes: read_attributes(r)? });
    }
    Ok(out)
}

fn write_attributes(out: &mut Vec<u8>, attrs: &[AttributeInfo]) {
    put_u16(out, attrs.len() as u16);
    for a in attrs {
        put_u16(out, a.name);
        put_u32(out, a.data.len() as u32);
        out.extend_from_slice(&a.data);
    }
}

fn write_members(out: &mut Vec<u8>, members: &[MemberInfo]) {
    put_u16(out, members.len() as u16);
    for m in members {
        put_u16(out, m.access);
        put_u16(out, m.name);
        put_u16(out, m.descriptor);
        write_attributes(out, &m.attributes);
    }
}

/// Constructor de class files sintéticos. Lo usan los tests y las
/// herramientas de diagnóstico; sólo emite miembros sin código.
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    class: ClassFile,
}

impl ClassBuilder {
    pub fn new(name: &str, super_name: &str) -> Result<Self, String> {
        let mut pool = ConstantPool::new();
        let this_class = pool.add_class(name)?;
        let super_class = pool.add_class(super_name)?;
        Ok(Self { class: ClassFile { minor: 0,
                                     major: 52,
                                     pool,
                                     access: 0x0021,
                                     this_class,
                                     super_class,
                                     interfaces: Vec::new(),
                                     fields: Vec::new(),
                                     methods: Vec::new(),
                                     attributes: Vec::new() } })
    }

    pub fn access(mut self, flags: u16) -> Self {
        self.class.access = flags;
        self
    }

    pub fn interface(mut self, name: &str) -> Result<Self, String> {
        let idx = self.class.pool.add_class(name)?;
        self.class.interfaces.push(idx);
        Ok(self)
    }

    pub fn field(mut self, access: u16, name: &str, desc: &str) -> Result<Self, String> {
        let name = self.class.pool.add_utf8(name)?;
        let descriptor = self.class.pool.add_utf8(desc)?;
        self.class.fields.push(MemberInfo { access,
                                            name,
                                            descriptor,
                                            attributes: Vec::new() });
        Ok(self)
    }

    pub fn method(mut self, access: u16, name: &str, desc: &str) -> Result<Self, String> {
        let name = self.class.pool.add_utf8(name)?;
        let descriptor = self.class.pool.add_utf8(desc)?;
        self.class.methods.push(MemberInfo { access,
                                             name,
                                             descriptor,
                                             attributes: Vec::new() });
        Ok(self)
    }

    /// Agrega una referencia `Fieldref` / `Methodref` al pool.
    pub fn member_ref(mut self, method: bool, owner: &str, name: &str, desc: &str) -> Result<Self, String> {
        let class = self.class.pool.add_class(owner)?;
        let n = self.class.pool.add_utf8(name)?;
        let d = self.class.pool.add_utf8(desc)?;
        let nat = self.class.pool.add_name_and_type(n, d)?;
        let entry = if method {
            CpEntry::MethodRef { class, nat }
        } else {
            CpEntry::FieldRef { class, nat }
        };
        self.class.pool.add_entry(entry)?;
        Ok(self)
    }

    pub fn string_constant(mut self, value: &str) -> Result<Self, String> {
        let u = self.class.pool.add_utf8(value)?;
        self.class.pool.add_entry(CpEntry::String(u))?;
        Ok(self)
    }

    pub fn build(self) -> ClassFile {
        self.class
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.class.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_write_is_byte_identical() {
        let bytes = ClassBuilder::new("a", "java/lang/Object").unwrap()
                                                              .field(0x0002, "b", "I")
                                                              .unwrap()
                                                              .method(0x0001, "c", "(La;)V")
                                                              .unwrap()
                                                              .member_ref(true, "a", "c", "(La;)V")
                                                              .unwrap()
                                                              .to_bytes();
        let parsed = ClassFile::parse(&bytes).unwrap();
        assert_eq!(parsed.to_bytes(), bytes);
        assert_eq!(parsed.name(), Some("a"));
        assert_eq!(parsed.super_name(), Some("java/lang/Object"));
        assert_eq!(parsed.member_name(&parsed.fields[0]), Some("b"));
    }

    #[test]
    fn long_constants_take_two_slots() {
        let mut class = ClassBuilder::new("a", "java/lang/Object").unwrap().build();
        let before = class.pool.len();
        let idx = class.pool.add_entry(CpEntry::Long(7)).unwrap();
        let after_long = class.pool.add_utf8("tail").unwrap();
        assert_eq!(idx as usize, before);
        assert_eq!(after_long, idx + 2);
        let reparsed = ClassFile::parse(&class.to_bytes()).unwrap();
        assert_eq!(reparsed.pool.get(idx), Some(&CpEntry::Long(7)));
        assert_eq!(reparsed.pool.utf8(after_long), Some("tail"));
    }

    #[test]
    fn truncated_input_is_error() {
        let bytes = ClassBuilder::new("a", "java/lang/Object").unwrap().to_bytes();
        assert!(ClassFile::parse(&bytes[..bytes.len() - 3]).is_err());
        assert!(ClassFile::parse(b"not a class").is_err());
    }
}
