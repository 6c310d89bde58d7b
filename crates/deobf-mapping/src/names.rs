//! Tablas CSV intermedio -> legible (`fields.csv`, `methods.csv`, `params.csv`).
//!
//! Formato: cabecera + filas `searge,name,side,desc` para campos y métodos,
//! `param,name,side` para parámetros. Las columnas extra se ignoran.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::debug;

use crate::error::MappingError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    pub name: String,
    pub side: Option<u8>,
    pub desc: String,
}

impl NameEntry {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(),
               side: None,
               desc: String::new() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTables {
    pub fields: BTreeMap<String, NameEntry>,
    pub methods: BTreeMap<String, NameEntry>,
    pub params: BTreeMap<String, String>,
}

impl NameTables {
    /// Carga `fields.csv` y `methods.csv` (obligatorios) y `params.csv`
    /// (opcional) desde `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, MappingError> {
        let fields = read_members(&dir.join("fields.csv"))?;
        let methods = read_members(&dir.join("methods.csv"))?;
        let params_path = dir.join("params.csv");
        let params = if params_path.is_file() {
            let file = File::open(&params_path).map_err(|e| MappingError::io(&params_path, e))?;
            parse_params(file, &params_path.display().to_string())?
        } else {
            BTreeMap::new()
        };
        debug!("loaded names from {}: fields={} methods={} params={}",
               dir.display(),
               fields.len(),
               methods.len(),
               params.len());
        Ok(Self { fields, methods, params })
    }
}

fn read_members(path: &Path) -> Result<BTreeMap<String, NameEntry>, MappingError> {
    let file = File::open(path).map_err(|e| MappingError::io(path, e))?;
    parse_members(file, &path.display().to_string())
}

/// Parsea un CSV de campos o métodos.
pub fn parse_members<R: Read>(reader: R, file: &str) -> Result<BTreeMap<String, NameEntry>, MappingError> {
    let mut out = BTreeMap::new();
    for row in rows(reader, file)? {
        let (line, record) = row?;
        let searge = field(&record, 0, file, line, "searge")?;
        let name = field(&record, 1, file, line, "name")?;
        let side = match record.get(2).map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Some(s.parse::<u8>()
                             .map_err(|_| MappingError::parse(file, line, format!("invalid side '{s}'")))?),
            None => None,
        };
        let desc = record.get(3).unwrap_or("").to_string();
        out.insert(searge.to_string(),
                   NameEntry { name: name.to_string(),
                               side,
                               desc });
    }
    Ok(out)
}

/// Parsea `params.csv`.
pub fn parse_params<R: Read>(reader: R, file: &str) -> Result<BTreeMap<String, String>, MappingError> {
    let mut out = BTreeMap::new();
    for row in rows(reader, file)? {
        let (line, record) = row?;
        let param = field(&record, 0, file, line, "param")?;
        let name = field(&record, 1, file, line, "name")?;
        out.insert(param.to_string(), name.to_string());
    }
    Ok(out)
}

type Row = Result<(usize, csv::StringRecord), MappingError>;

fn rows<R: Read>(reader: R, file: &str) -> Result<Vec<Row>, MappingError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true)
                                           .flexible(true)
                                           .from_reader(reader);
    rdr.headers()
       .map_err(|e| csv_error(file, &e))?;
    Ok(rdr.records()
          .map(|r| {
              let record = r.map_err(|e| csv_error(file, &e))?;
              let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
              Ok((line, record))
          })
          .collect())
}

fn field<'r>(record: &'r csv::StringRecord, idx: usize, file: &str, line: usize, what: &str) -> Result<&'r str, MappingError> {
    match record.get(idx).map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(MappingError::parse(file, line, format!("missing column '{what}'"))),
    }
}

fn csv_error(file: &str, e: &csv::Error) -> MappingError {
    let line = e.position().map(|p| p.line() as usize).unwrap_or(0);
    MappingError::parse(file, line, e.to_string())
}
