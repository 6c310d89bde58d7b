//! Directorios privados de staging y promoción atómica.
//!
//! El staging se crea dentro del directorio padre del destino, de modo que
//! el `rename` final ocurre en el mismo sistema de ficheros. Si al promover
//! el destino ya existe (otro escritor terminó antes), se conserva el
//! existente y se descarta la copia propia.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::PersistenceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoteOutcome {
    Promoted,
    AlreadyPresent,
}

pub struct StagedDir {
    temp: TempDir,
    target: PathBuf,
}

impl StagedDir {
    pub fn new(target: &Path) -> Result<Self, PersistenceError> {
        let temp = staging_dir_for(target)?;
        Ok(Self { temp,
                  target: target.to_path_buf() })
    }

    /// Directorio (ya creado) donde escribir el contenido.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Mueve el contenido al destino. El staging se elimina al soltar `self`
    /// en cualquier caso.
    pub fn promote(self) -> Result<PromoteOutcome, PersistenceError> {
        if self.target.exists() {
            debug!("promote: {} already present, discarding staged copy", self.target.display());
            return Ok(PromoteOutcome::AlreadyPresent);
        }
        rename_with_retry(self.temp.path(), &self.target)?;
        Ok(PromoteOutcome::Promoted)
    }
}

/// Crea un `TempDir` hermano de `target` (mismo sistema de ficheros).
pub(crate) fn staging_dir_for(target: &Path) -> Result<TempDir, PersistenceError> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| PersistenceError::io(&parent, e))?;
    tempfile::Builder::new().prefix(".staging-")
                            .tempdir_in(&parent)
                            .map_err(|e| PersistenceError::io(&parent, e))
}

fn is_retryable(e: &io::Error) -> bool {
    matches!(e.kind(),
             io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::PermissionDenied)
}

/// `rename` con hasta 3 reintentos ante errores transitorios.
pub(crate) fn rename_with_retry(from: &Path, to: &Path) -> Result<(), PersistenceError> {
    let mut attempts = 0;
    loop {
        match fs::rename(from, to) {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable rename error (attempt {}): {e} -> sleeping {delay_ms}ms", attempts + 1);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r.map_err(|e| PersistenceError::io(to, e)),
        }
    }
}

/// Copia recursiva de `src` en `dst` (se crea si no existe).
pub fn copy_tree(src: &Path, dst: &Path) -> Result<u64, PersistenceError> {
    let mut copied = 0;
    fs::create_dir_all(dst).map_err(|e| PersistenceError::io(dst, e))?;
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| PersistenceError::io(src, io::Error::other(e)))?;
        let rel = entry.path()
                       .strip_prefix(src)
                       .map_err(|e| PersistenceError::io(entry.path(), io::Error::other(e)))?;
        let out = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&out).map_err(|e| PersistenceError::io(&out, e))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &out).map_err(|e| PersistenceError::io(&out, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote_moves_content_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("out").join("bundle");
        let staged = StagedDir::new(&target).unwrap();
        fs::write(staged.path().join("A.class"), b"x").unwrap();
        assert_eq!(staged.promote().unwrap(), PromoteOutcome::Promoted);
        assert_eq!(fs::read(target.join("A.class")).unwrap(), b"x");
        let leftovers: Vec<_> = fs::read_dir(root.path().join("out")).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn dropped_staging_leaves_nothing_behind() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("bundle");
        {
            let staged = StagedDir::new(&target).unwrap();
            fs::write(staged.path().join("Foo.java"), b"patched").unwrap();
        }
        assert!(!target.exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn existing_target_wins() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("bundle");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("first"), b"1").unwrap();
        let staged = StagedDir::new(&target).unwrap();
        fs::write(staged.path().join("second"), b"2").unwrap();
        assert_eq!(staged.promote().unwrap(), PromoteOutcome::AlreadyPresent);
        assert!(target.join("first").exists());
        assert!(!target.join("second").exists());
    }

    #[test]
    fn copy_tree_copies_nested_files() {
        let src = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("a/b")).unwrap();
        fs::write(src.path().join("a/b/c.txt"), b"c").unwrap();
        let dst = tempfile::tempdir().unwrap();
        assert_eq!(copy_tree(src.path(), &dst.path().join("copy")).unwrap(), 1);
        assert_eq!(fs::read(dst.path().join("copy/a/b/c.txt")).unwrap(), b"c");
    }
}
