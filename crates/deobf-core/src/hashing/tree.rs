//! Hash de contenido de ficheros y árboles de directorios (bundles explotados).
//!
//! El recorrido se hace en orden de ruta relativa, de modo que el hash no
//! depende del orden en que el sistema de ficheros lista las entradas. Cada
//! fichero contribuye su ruta (con `/` como separador) y su contenido.

use std::fs;
use std::io;
use std::path::Path;

use blake3::Hasher;
use walkdir::WalkDir;

/// Hash de un fichero o de un árbol completo. Una ruta inexistente es un error.
pub fn hash_path(path: &Path) -> io::Result<String> {
    let meta = fs::metadata(path)?;
    let mut h = Hasher::new();
    if meta.is_file() {
        h.update(b"file\0");
        h.update(&fs::read(path)?);
        return Ok(h.finalize().to_hex().to_string());
    }
    h.update(b"tree\0");
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path()
                       .strip_prefix(path)
                       .map_err(io::Error::other)?
                       .components()
                       .map(|c| c.as_os_str().to_string_lossy().into_owned())
                       .collect::<Vec<_>>()
                       .join("/");
        h.update(rel.as_bytes());
        h.update(b"\0");
        let data = fs::read(entry.path())?;
        h.update(&(data.len() as u64).to_le_bytes());
        h.update(&data);
    }
    Ok(h.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_hash_depends_on_content_and_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/X.class"), b"one").unwrap();
        let first = hash_path(dir.path()).unwrap();
        assert_eq!(first, hash_path(dir.path()).unwrap());

        fs::write(dir.path().join("a/b/X.class"), b"two").unwrap();
        let second = hash_path(dir.path()).unwrap();
        assert_ne!(first, second);

        fs::rename(dir.path().join("a/b/X.class"), dir.path().join("a/b/Y.class")).unwrap();
        assert_ne!(second, hash_path(dir.path()).unwrap());
    }

    #[test]
    fn missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(hash_path(&dir.path().join("nope")).is_err());
    }
}
