//! Helpers sobre bundles explotados (árboles de ficheros).

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use walkdir::WalkDir;

use crate::error::AdapterError;

/// Ficheros regulares bajo `root` como `(ruta relativa con '/', ruta
/// absoluta)`, ordenados por ruta relativa.
pub fn list_files(root: &Path) -> Result<Vec<(String, PathBuf)>, AdapterError> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| AdapterError::io(root, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        out.push((relative_name(root, entry.path())?, entry.into_path()));
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

pub fn relative_name(root: &Path, path: &Path) -> Result<String, AdapterError> {
    let rel = path.strip_prefix(root).map_err(|_| {
                                         AdapterError::io(path,
                                                          std::io::Error::new(std::io::ErrorKind::InvalidInput,
                                                                              "path outside of bundle root"))
                                     })?;
    let parts: Vec<String> = rel.components()
                                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                                .collect();
    Ok(parts.join("/"))
}

/// Escribe `bytes` en `root/rel`, creando directorios intermedios.
pub fn write_file(root: &Path, rel: &str, bytes: &[u8]) -> Result<PathBuf, AdapterError> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| AdapterError::io(parent, e))?;
    }
    fs::write(&path, bytes).map_err(|e| AdapterError::io(&path, e))?;
    Ok(path)
}

pub fn read_file(path: &Path) -> Result<Vec<u8>, AdapterError> {
    fs::read(path).map_err(|e| AdapterError::io(path, e))
}

/// `true` para nombres de fichero `*_at.cfg`, sin distinguir mayúsculas.
pub fn is_access_transformer(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with("_at.cfg")
}

/// Access transformers bajo los directorios de fuentes / recursos `dirs`,
/// en orden de directorio y luego de ruta. Los directorios inexistentes se
/// ignoran.
pub fn find_access_transformers(dirs: &[PathBuf]) -> Result<Vec<PathBuf>, AdapterError> {
    let mut found = Vec::new();
    for dir in dirs.iter().filter(|d| d.is_dir()) {
        for (rel, path) in list_files(dir)? {
            let name = rel.rsplit('/').next().unwrap_or(&rel);
            if is_access_transformer(name) {
                info!("Found AccessTransformer: {name}");
                found.push(path);
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_files_sorted_with_forward_slashes() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "b/z.txt", b"1").unwrap();
        write_file(dir.path(), "a.txt", b"2").unwrap();
        write_file(dir.path(), "b/a.txt", b"3").unwrap();
        let names: Vec<String> = list_files(dir.path()).unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a.txt", "b/a.txt", "b/z.txt"]);
    }

    #[test]
    fn access_transformers_match_case_insensitively_at_any_depth() {
        let dir = tempfile::tempdir().unwrap();
        let resources = dir.path().join("resources");
        write_file(&resources, "META-INF/Foo_AT.cfg", b"").unwrap();
        write_file(&resources, "mod_at.cfg", b"").unwrap();
        write_file(&resources, "notes_at.txt", b"").unwrap();
        let found = find_access_transformers(&[resources.clone(), dir.path().join("missing")]).unwrap();
        assert_eq!(found, vec![resources.join("META-INF/Foo_AT.cfg"), resources.join("mod_at.cfg")]);
        assert!(is_access_transformer("X_At.CFG"));
        assert!(!is_access_transformer("at.cfg"));
    }
}
