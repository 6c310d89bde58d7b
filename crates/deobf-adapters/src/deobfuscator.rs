//! Deobfuscador binario.
//!
//! Reescribe los class files de un bundle con una `MappingTable`:
//! - sin marcadores: renombra clases, miembros, referencias y descriptores
//!   (y mueve cada clase a la ruta de su nombre nuevo);
//! - con marcadores: no renombra nada, agrega a cada clase / miembro con
//!   nombre nuevo un atributo `DeobfMarker` con el índice de ese nombre en el
//!   constant pool. La JVM ignora atributos desconocidos; el decompilador los
//!   usa para emitir los nombres nuevos.
//!
//! En ambos modos se aplican los access transformers, que se expresan con
//! los nombres del dominio destino.
//!
//! Una referencia a miembro se busca en su owner y, si el owner es una clase
//! del bundle, en sus supertipos. Las referencias a clases externas (JDK,
//! librerías) sólo cambian si la tabla las nombra explícitamente.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use deobf_mapping::{AccessTransformer, AccessTransformerSet, MappingTable};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::bundle::{list_files, read_file, write_file};
use crate::classfile::{remap_signature, AttributeInfo, ClassFile, ConstantPool, CpEntry, MemberInfo};
use crate::error::AdapterError;

pub const MARKER_ATTRIBUTE: &str = "DeobfMarker";
const SIGNATURE_ATTRIBUTE: &str = "Signature";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeobfReport {
    pub classes: usize,
    pub renamed_members: usize,
    pub markers: usize,
    pub resources: usize,
    /// Reglas AT cuyo objetivo no apareció en el bundle.
    pub unmatched_ats: Vec<String>,
}

/// Resultado de procesar un class file.
#[derive(Debug, Clone)]
pub struct DeobfuscatedClass {
    /// Nombre interno de salida (el original en modo marcadores).
    pub name: String,
    pub bytes: Vec<u8>,
    pub renamed_members: usize,
    pub markers: usize,
    pub matched_ats: BTreeSet<String>,
}

/// Supertipos declarados por las clases de un bundle, con nombres del
/// dominio de entrada.
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    supers: HashMap<String, Vec<String>>,
}

impl ClassHierarchy {
    pub fn insert(&mut self, class: &ClassFile) {
        let Some(name) = class.name() else {
            return;
        };
        let supers = class.super_name()
                          .into_iter()
                          .chain(class.interface_names())
                          .map(str::to_string)
                          .collect();
        self.supers.insert(name.to_string(), supers);
    }

    /// `owner` seguido de sus supertipos alcanzables, en anchura y sin
    /// repetir. Para una clase ajena al bundle es sólo `[owner]`.
    pub fn lineage<'h>(&'h self, owner: &'h str) -> Vec<&'h str> {
        let mut out = vec![owner];
        let mut i = 0;
        while i < out.len() {
            if let Some(supers) = self.supers.get(out[i]) {
                for s in supers {
                    if !out.contains(&s.as_str()) {
                        out.push(s);
                    }
                }
            }
            i += 1;
        }
        out
    }
}

pub struct BinaryDeobfuscator<'a> {
    table: &'a MappingTable,
    ats: &'a AccessTransformerSet,
    apply_markers: bool,
    hierarchy: ClassHierarchy,
}

fn class_error(file: &str, message: impl Into<String>) -> AdapterError {
    AdapterError::ClassFormat { file: file.to_string(),
                                message: message.into() }
}

impl<'a> BinaryDeobfuscator<'a> {
    pub fn new(table: &'a MappingTable, ats: &'a AccessTransformerSet, apply_markers: bool) -> Self {
        Self { table,
               ats,
               apply_markers,
               hierarchy: ClassHierarchy::default() }
    }

    /// Jerarquía usada para resolver miembros heredados. `deobfuscate_bundle`
    /// la construye a partir del propio bundle.
    pub fn with_hierarchy(mut self, hierarchy: ClassHierarchy) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn deobfuscate_class(&self, bytes: &[u8], file: &str) -> Result<DeobfuscatedClass, AdapterError> {
        let mut class = ClassFile::parse(bytes).map_err(|m| class_error(file, m))?;
        let old_name = class.name()
                            .ok_or_else(|| class_error(file, "this_class is not a class entry"))?
                            .to_string();
        let mut out = DeobfuscatedClass { name: old_name.clone(),
                                          bytes: Vec::new(),
                                          renamed_members: 0,
                                          markers: 0,
                                          matched_ats: BTreeSet::new() };

        self.apply_access(&mut class, &old_name, &mut out.matched_ats);
        if self.apply_markers {
            self.add_markers(&mut class, &old_name, &mut out)
                .map_err(|m| class_error(file, m))?;
        } else {
            self.rename(&mut class, &old_name, &mut out)
                .map_err(|m| class_error(file, m))?;
            out.name = self.table.remap_class(&old_name);
        }
        debug!("deobf class={old_name} -> {} renamed={} markers={}",
               out.name,
               out.renamed_members,
               out.markers);
        out.bytes = class.to_bytes();
        Ok(out)
    }

    /// Procesa todo `input` y escribe el resultado en `output`. Los recursos
    /// que no son clases se copian tal cual.
    pub fn deobfuscate_bundle(&self, input: &Path, output: &Path) -> Result<DeobfReport, AdapterError> {
        fs::create_dir_all(output).map_err(|e| AdapterError::io(output, e))?;
        let mut hierarchy = self.hierarchy.clone();
        let mut loaded = Vec::new();
        for (rel, path) in list_files(input)? {
            let data = read_file(&path)?;
            if rel.ends_with(".class") {
                hierarchy.insert(&ClassFile::parse(&data).map_err(|m| class_error(&rel, m))?);
            }
            loaded.push((rel, data));
        }
        let scoped = BinaryDeobfuscator { hierarchy, ..*self };

        let mut report = DeobfReport::default();
        let mut matched = BTreeSet::new();
        let mut written = HashSet::new();
        for (rel, data) in loaded {
            let (target, bytes) = if rel.ends_with(".class") {
                let done = scoped.deobfuscate_class(&data, &rel)?;
                report.classes += 1;
                report.renamed_members += done.renamed_members;
                report.markers += done.markers;
                matched.extend(done.matched_ats);
                let target = if self.apply_markers {
                    rel.clone()
                } else {
                    format!("{}.class", done.name)
                };
                (target, done.bytes)
            } else {
                report.resources += 1;
                (rel.clone(), data)
            };
            if !written.insert(target.clone()) {
                return Err(class_error(&rel, format!("output path '{target}' produced twice")));
            }
            write_file(output, &target, &bytes)?;
        }
        for at in self.ats.iter() {
            let line = at.to_string();
            if !matched.contains(&line) {
                warn!("AccessTransformer target not found: {line}");
                report.unmatched_ats.push(line);
            }
        }
        info!("deobfuscated {} classes ({} resources) into {}",
              report.classes,
              report.resources,
              output.display());
        Ok(report)
    }

    fn field_target<'n>(&'n self, owner: &str, name: &'n str) -> &'n str {
        self.hierarchy
            .lineage(owner)
            .into_iter()
            .find_map(|o| self.table.map_field(o, name))
            .unwrap_or(name)
    }

    fn method_target<'n>(&'n self, owner: &str, name: &'n str, desc: &str) -> &'n str {
        if name.starts_with('<') {
            return name;
        }
        self.hierarchy
            .lineage(owner)
            .into_iter()
            .find_map(|o| self.table.map_method(o, name, desc))
            .unwrap_or(name)
    }

    fn apply_access(&self, class: &mut ClassFile, old_name: &str, matched: &mut BTreeSet<String>) {
        let target_class = self.table.remap_class(old_name);
        let relevant: Vec<&AccessTransformer> = self.ats.iter().filter(|a| a.class == target_class).collect();
        if relevant.is_empty() {
            return;
        }
        for at in relevant.iter().filter(|a| a.targets_class(&target_class)) {
            class.access = at.apply(class.access);
            matched.insert(at.to_string());
        }
        for field in class.fields.iter_mut() {
            let Some(name) = class.pool.utf8(field.name) else {
                continue;
            };
            let target = self.field_target(old_name, name);
            for at in relevant.iter().filter(|a| a.targets_field(&target_class, target)) {
                field.access = at.apply(field.access);
                matched.insert(at.to_string());
            }
        }
        for method in class.methods.iter_mut() {
            let (Some(name), Some(desc)) = (class.pool.utf8(method.name), class.pool.utf8(method.descriptor)) else {
                continue;
            };
            let target = self.method_target(old_name, name, desc);
            let target_desc = self.table.remap_descriptor(desc);
            for at in relevant.iter()
                              .filter(|a| a.targets_method(&target_class, target, &target_desc))
            {
                method.access = at.apply(method.access);
                matched.insert(at.to_string());
            }
        }
    }

    fn rename(&self, class: &mut ClassFile, old_name: &str, out: &mut DeobfuscatedClass) -> Result<(), String> {
        let snapshot = class.pool.clone();
        let ClassFile { pool,
                        fields,
                        methods,
                        attributes,
                        .. } = class;

        for (idx, entry) in snapshot.iter() {
            match entry {
                CpEntry::Class(n) => {
                    let Some(name) = snapshot.utf8(*n) else {
                        continue;
                    };
                    let mapped = if name.starts_with('[') {
                        self.table.remap_descriptor(name)
                    } else {
                        self.table.remap_class(name)
                    };
                    if mapped != name {
                        let u = pool.add_utf8(&mapped)?;
                        pool.set(idx, CpEntry::Class(u));
                    }
                }
                CpEntry::FieldRef { class: owner_idx, nat }
                | CpEntry::MethodRef { class: owner_idx, nat }
                | CpEntry::InterfaceMethodRef { class: owner_idx, nat } => {
                    let (Some(owner), Some((name, desc))) = (snapshot.class_name(*owner_idx), snapshot.name_and_type(*nat))
                    else {
                        continue;
                    };
                    let new_name = if matches!(entry, CpEntry::FieldRef { .. }) {
                        self.field_target(owner, name)
                    } else {
                        self.method_target(owner, name, desc)
                    };
                    let new_desc = self.table.remap_descriptor(desc);
                    if new_name != name || new_desc != desc {
                        let n = pool.add_utf8(new_name)?;
                        let d = pool.add_utf8(&new_desc)?;
                        let new_nat = pool.add_name_and_type(n, d)?;
                        let rebuilt = match entry {
                            CpEntry::FieldRef { .. } => CpEntry::FieldRef { class: *owner_idx,
                                                                            nat: new_nat },
                            CpEntry::MethodRef { .. } => CpEntry::MethodRef { class: *owner_idx,
                                                                              nat: new_nat },
                            _ => CpEntry::InterfaceMethodRef { class: *owner_idx,
                                                               nat: new_nat },
                        };
                        pool.set(idx, rebuilt);
                    }
                }
                CpEntry::MethodType(d) => {
                    let Some(desc) = snapshot.utf8(*d) else {
                        continue;
                    };
                    let mapped = self.table.remap_descriptor(desc);
                    if mapped != desc {
                        let u = pool.add_utf8(&mapped)?;
                        pool.set(idx, CpEntry::MethodType(u));
                    }
                }
                CpEntry::InvokeDynamic { bootstrap, nat } | CpEntry::Dynamic { bootstrap, nat } => {
                    let Some((name, desc)) = snapshot.name_and_type(*nat) else {
                        continue;
                    };
                    let mapped = self.table.remap_descriptor(desc);
                    if mapped != desc {
                        let n = pool.add_utf8(name)?;
                        let d = pool.add_utf8(&mapped)?;
                        let new_nat = pool.add_name_and_type(n, d)?;
                        let rebuilt = if matches!(entry, CpEntry::Dynamic { .. }) {
                            CpEntry::Dynamic { bootstrap: *bootstrap,
                                               nat: new_nat }
                        } else {
                            CpEntry::InvokeDynamic { bootstrap: *bootstrap,
                                                     nat: new_nat }
                        };
                        pool.set(idx, rebuilt);
                    }
                }
                _ => {}
            }
        }

        for field in fields.iter_mut() {
            let (Some(name), Some(desc)) = (snapshot.utf8(field.name), snapshot.utf8(field.descriptor)) else {
                continue;
            };
            let target = self.field_target(old_name, name);
            if target != name {
                debug!("deobf field {old_name}.{name} -> {target}");
                field.name = pool.add_utf8(target)?;
                out.renamed_members += 1;
            }
            self.remap_member_descriptor(pool, field, desc)?;
            self.remap_signatures(&snapshot, pool, &mut field.attributes)?;
        }
        for method in methods.iter_mut() {
            let (Some(name), Some(desc)) = (snapshot.utf8(method.name), snapshot.utf8(method.descriptor)) else {
                continue;
            };
            let target = self.method_target(old_name, name, desc);
            if target != name {
                debug!("deobf method {old_name}.{name}{desc} -> {target}");
                method.name = pool.add_utf8(target)?;
                out.renamed_members += 1;
            }
            self.remap_member_descriptor(pool, method, desc)?;
            self.remap_signatures(&snapshot, pool, &mut method.attributes)?;
        }
        self.remap_signatures(&snapshot, pool, attributes)
    }

    fn remap_member_descriptor(&self, pool: &mut ConstantPool, member: &mut MemberInfo, desc: &str) -> Result<(), String> {
        let mapped = self.table.remap_descriptor(desc);
        if mapped != desc {
            member.descriptor = pool.add_utf8(&mapped)?;
        }
        Ok(())
    }

    fn remap_signatures(&self, snapshot: &ConstantPool, pool: &mut ConstantPool, attrs: &mut [AttributeInfo]) -> Result<(), String> {
        for attr in attrs.iter_mut() {
            if snapshot.utf8(attr.name) != Some(SIGNATURE_ATTRIBUTE) || attr.data.len() != 2 {
                continue;
            }
            let idx = u16::from_be_bytes([attr.data[0], attr.data[1]]);
            let Some(sig) = snapshot.utf8(idx) else {
                continue;
            };
            let mapped = remap_signature(sig, &|c: &str| self.table.remap_class(c));
            if mapped != sig {
                attr.data = pool.add_utf8(&mapped)?.to_be_bytes().to_vec();
            }
        }
        Ok(())
    }

    fn add_markers(&self, class: &mut ClassFile, old_name: &str, out: &mut DeobfuscatedClass) -> Result<(), String> {
        let marker = class.pool.add_utf8(MARKER_ATTRIBUTE)?;
        let ClassFile { pool,
                        fields,
                        methods,
                        attributes,
                        .. } = class;

        let new_class = self.table.remap_class(old_name);
        if new_class != old_name {
            set_marker(attributes, marker, pool.add_utf8(&new_class)?);
            out.markers += 1;
        }
        for field in fields.iter_mut() {
            let Some(name) = pool.utf8(field.name).map(str::to_string) else {
                continue;
            };
            let target = self.field_target(old_name, &name);
            if target != name {
                let idx = pool.add_utf8(target)?;
                set_marker(&mut field.attributes, marker, idx);
                out.markers += 1;
            }
        }
        for method in methods.iter_mut() {
            let (Some(name), Some(desc)) = (pool.utf8(method.name).map(str::to_string),
                                            pool.utf8(method.descriptor).map(str::to_string))
            else {
                continue;
            };
            let target = self.method_target(old_name, &name, &desc);
            if target != name {
                let idx = pool.add_utf8(target)?;
                set_marker(&mut method.attributes, marker, idx);
                out.markers += 1;
            }
        }
        Ok(())
    }
}

fn set_marker(attrs: &mut Vec<AttributeInfo>, marker: u16, value: u16) {
    attrs.retain(|a| a.name != marker);
    attrs.push(AttributeInfo { name: marker,
                               data: value.to_be_bytes().to_vec() });
}

/// Nombre registrado por un `DeobfMarker` en `attrs`, si lo hay.
pub fn marker_name<'c>(class: &'c ClassFile, attrs: &[AttributeInfo]) -> Option<&'c str> {
    let attr = attrs.iter()
                    .find(|a| class.attribute_name(a) == Some(MARKER_ATTRIBUTE) && a.data.len() == 2)?;
    class.pool.utf8(u16::from_be_bytes([attr.data[0], attr.data[1]]))
}
