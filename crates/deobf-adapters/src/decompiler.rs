//! Adapters de decompilación y recompilación sobre `ExternalTool`.
//!
//! Contrato del decompilador: recibe un bundle binario (con atributos
//! `DeobfMarker`) y escribe en el directorio de salida un `.java` por clase de
//! nivel superior, usando los nombres de los marcadores. Cero ficheros
//! producidos cuenta como fallo.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;
use serde_json::{json, Value};

use crate::bundle::list_files;
use crate::error::AdapterError;
use crate::tool::{join_classpath, ExternalTool};

/// Opciones estilo fernflower: renombrado desactivado, genéricos y
/// literales ASCII.
pub const DECOMPILER_OPTIONS: &[&str] = &["-din=1", "-rbr=1", "-dgs=1", "-asc=1", "-rsy=1", "-iec=1", "-jvn=1"];

#[derive(Clone)]
pub struct DecompilerAdapter {
    tool: Arc<dyn ExternalTool>,
}

impl DecompilerAdapter {
    pub fn new(tool: Arc<dyn ExternalTool>) -> Self {
        Self { tool }
    }

    pub fn describe(&self) -> Value {
        json!({"tool": self.tool.describe(), "options": DECOMPILER_OPTIONS})
    }

    /// Devuelve el número de ficheros fuente producidos.
    pub fn decompile(&self, input: &Path, classpath: &[PathBuf], output: &Path) -> Result<usize, AdapterError> {
        fs::create_dir_all(output).map_err(|e| AdapterError::io(output, e))?;
        let mut args: Vec<String> = DECOMPILER_OPTIONS.iter().map(|s| s.to_string()).collect();
        args.extend(classpath.iter().map(|p| format!("-e={}", p.display())));
        args.push(input.display().to_string());
        args.push(output.display().to_string());
        self.tool.run(&args, output)?;

        let produced = count_sources(output)?;
        if produced == 0 {
            return Err(AdapterError::tool(self.tool.name(),
                                          format!("produced no source files from {}", input.display())));
        }
        info!("decompiled {} into {produced} source files", input.display());
        Ok(produced)
    }
}

/// Recompilación del árbol de fuentes con un compilador estilo `javac`.
#[derive(Clone)]
pub struct CompilerAdapter {
    tool: Arc<dyn ExternalTool>,
}

impl CompilerAdapter {
    pub fn new(tool: Arc<dyn ExternalTool>) -> Self {
        Self { tool }
    }

    pub fn describe(&self) -> Value {
        self.tool.describe()
    }

    /// Compila todos los `.java` de `sources` en `output`. Los recursos que
    /// no son fuentes se copian junto a las clases.
    pub fn compile(&self, sources: &Path, classpath: &[PathBuf], output: &Path) -> Result<usize, AdapterError> {
        fs::create_dir_all(output).map_err(|e| AdapterError::io(output, e))?;
        let mut files = Vec::new();
        for (rel, path) in list_files(sources)? {
            if rel.ends_with(".java") {
                files.push(path.display().to_string());
            } else {
                let dst = output.join(&rel);
                if let Some(parent) = dst.parent() {
                    fs::create_dir_all(parent).map_err(|e| AdapterError::io(parent, e))?;
                }
                fs::copy(&path, &dst).map_err(|e| AdapterError::io(&path, e))?;
            }
        }
        if files.is_empty() {
            return Err(AdapterError::MissingInput(format!("no source files under {}", sources.display())));
        }

        let argfile = tempfile::NamedTempFile::new().map_err(|e| AdapterError::io(output, e))?;
        fs::write(argfile.path(), files.join("\n")).map_err(|e| AdapterError::io(argfile.path(), e))?;
        let mut args = vec!["-nowarn".to_string(),
                            "-encoding".to_string(),
                            "UTF-8".to_string(),
                            "-d".to_string(),
                            output.display().to_string()];
        if !classpath.is_empty() {
            args.push("-cp".to_string());
            args.push(join_classpath(classpath));
        }
        args.push(format!("@{}", argfile.path().display()));
        self.tool.run(&args, sources)?;
        info!("compiled {} sources into {}", files.len(), output.display());
        Ok(files.len())
    }
}

fn count_sources(root: &Path) -> Result<usize, AdapterError> {
    Ok(list_files(root)?
        .iter()
        .filter(|(rel, _)| rel.ends_with(".java"))
        .count())
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::tool::ProcessTool;

    fn script_tool(script: &str) -> Arc<dyn ExternalTool> {
        Arc::new(ProcessTool::new("fake-decompiler", "/bin/sh", Duration::from_secs(10)).with_args(["-c", script, "decompiler"]))
    }

    #[test]
    fn writes_sources_into_output() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        // el último argumento es el directorio de salida
        let tool = script_tool("for last; do :; done; mkdir -p \"$last/a\" && echo 'class A {}' > \"$last/a/A.java\"");
        let n = DecompilerAdapter::new(tool).decompile(input.path(), &[], &out.path().join("src"))
                                            .unwrap();
        assert_eq!(n, 1);
        assert!(out.path().join("src/a/A.java").is_file());
    }

    #[test]
    fn empty_output_is_tool_failure() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let err = DecompilerAdapter::new(script_tool("true")).decompile(input.path(), &[], out.path())
                                                             .unwrap_err();
        assert!(matches!(err, AdapterError::ExternalToolFailure { .. }));
    }
}
