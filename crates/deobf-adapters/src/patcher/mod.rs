//! Source patcher: parches -> inyecciones -> formato.
//!
//! Todo se hace sobre un directorio de staging que sólo se promueve si la
//! cadena completa tiene éxito; ante cualquier fallo el destino no se toca.

mod diff;
mod format;

pub use diff::{parse_unified_diff, FilePatch, Hunk, HunkFailure, HunkLine, PatchApplier, PatchSet, UnifiedDiffApplier};
pub use format::{BasicFormatter, SourceFormatter};

use std::fs;
use std::path::Path;
use std::sync::Arc;

use deobf_persistence::{copy_tree, StagedDir};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::bundle::{list_files, read_file, write_file};
use crate::error::AdapterError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchReport {
    pub patched: usize,
    pub injected: usize,
    pub formatted: usize,
}

#[derive(Clone)]
pub struct SourcePatcher {
    applier: Arc<dyn PatchApplier>,
    formatter: Arc<dyn SourceFormatter>,
}

impl Default for SourcePatcher {
    fn default() -> Self {
        Self::new(Arc::new(UnifiedDiffApplier), Arc::new(BasicFormatter))
    }
}

impl SourcePatcher {
    pub fn new(applier: Arc<dyn PatchApplier>, formatter: Arc<dyn SourceFormatter>) -> Self {
        Self { applier, formatter }
    }

    pub fn describe(&self) -> Value {
        json!({"applier": self.applier.describe(), "formatter": self.formatter.describe()})
    }

    /// Copia `input` a un staging, aplica `patches`, copia los ficheros de
    /// `inject` (si hay) y formatea los `.java`. Promueve a `output` al final.
    pub fn run(&self, input: &Path, patches: &PatchSet, inject: Option<&Path>, output: &Path) -> Result<PatchReport, AdapterError> {
        let staged = StagedDir::new(output)?;
        copy_tree(input, staged.path())?;
        let mut report = PatchReport::default();

        for patch in &patches.patches {
            self.apply_one(staged.path(), patch)?;
            report.patched += 1;
        }

        if let Some(dir) = inject {
            for (rel, path) in list_files(dir)? {
                let target = staged.path().join(&rel);
                if target.exists() {
                    return Err(AdapterError::PatchApplicationFailure { file: rel,
                                                                       hunk: 0,
                                                                       context: "injected file would overwrite an existing file".to_string() });
                }
                write_file(staged.path(), &rel, &read_file(&path)?)?;
                report.injected += 1;
            }
        }

        for (rel, path) in list_files(staged.path())? {
            if !rel.ends_with(".java") {
                continue;
            }
            let text = fs::read_to_string(&path).map_err(|e| AdapterError::io(&path, e))?;
            let formatted = self.formatter.format(&rel, &text);
            if formatted != text {
                fs::write(&path, formatted).map_err(|e| AdapterError::io(&path, e))?;
                report.formatted += 1;
            }
        }

        staged.promote()?;
        info!("patched sources into {}: patched={} injected={} formatted={}",
              output.display(),
              report.patched,
              report.injected,
              report.formatted);
        Ok(report)
    }

    fn apply_one(&self, root: &Path, patch: &FilePatch) -> Result<(), AdapterError> {
        let target = root.join(&patch.path);
        let original = if patch.creates {
            if target.exists() {
                return Err(AdapterError::PatchApplicationFailure { file: patch.path.clone(),
                                                                   hunk: 1,
                                                                   context: "file to create already exists".to_string() });
            }
            String::new()
        } else {
            fs::read_to_string(&target).map_err(|_| AdapterError::PatchApplicationFailure { file: patch.path.clone(),
                                                                                            hunk: 1,
                                                                                            context: "target file is missing".to_string() })?
        };
        let patched = self.applier
                          .apply(&original, patch)
                          .map_err(|f| AdapterError::PatchApplicationFailure { file: patch.path.clone(),
                                                                               hunk: f.hunk,
                                                                               context: f.context })?;
        if patch.deletes {
            fs::remove_file(&target).map_err(|e| AdapterError::io(&target, e))?;
        } else {
            write_file(root, &patch.path, patched.as_bytes())?;
        }
        debug!("patched {} ({} hunks)", patch.path, patch.hunks.len());
        Ok(())
    }
}
