//! Herramientas externas (decompilador, compilador) como procesos hijos.
//!
//! Cada llamada es síncrona y acotada por un timeout: si vence, el proceso se
//! mata y el stage falla. No hay reintentos.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AdapterError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const LOG_TAIL_LINES: usize = 20;

pub trait ExternalTool: Send + Sync {
    fn name(&self) -> &str;

    /// Ejecuta la herramienta con `args` en `workdir` y devuelve su log
    /// (stdout + stderr).
    fn run(&self, args: &[String], workdir: &Path) -> Result<String, AdapterError>;

    /// Descripción determinista de la herramienta; entra en los params del
    /// stage y por tanto en su fingerprint.
    fn describe(&self) -> Value;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTool {
    pub name: String,
    pub program: PathBuf,
    /// Classpath propio del proceso (`-cp`), separado del de la build.
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub base_args: Vec<String>,
    pub timeout: Duration,
}

impl ProcessTool {
    pub fn new(name: &str, program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { name: name.to_string(),
               program: program.into(),
               classpath: Vec::new(),
               main_class: None,
               base_args: Vec::new(),
               timeout }
    }

    pub fn with_main(mut self, classpath: Vec<PathBuf>, main_class: &str) -> Self {
        self.classpath = classpath;
        self.main_class = Some(main_class.to_string());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        self.base_args.extend(args.into_iter().map(Into::into));
        self
    }

    fn command(&self, args: &[String], workdir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(workdir).env_remove("CLASSPATH");
        if let Some(main) = &self.main_class {
            if !self.classpath.is_empty() {
                cmd.arg("-cp").arg(join_classpath(&self.classpath));
            }
            cmd.arg(main);
        }
        cmd.args(&self.base_args).args(args);
        cmd
    }
}

impl ExternalTool for ProcessTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, args: &[String], workdir: &Path) -> Result<String, AdapterError> {
        let mut log = tempfile::tempfile().map_err(|e| AdapterError::tool(&self.name, format!("log file: {e}")))?;
        let stdout = log.try_clone()
                        .map_err(|e| AdapterError::tool(&self.name, format!("log file: {e}")))?;
        let stderr = log.try_clone()
                        .map_err(|e| AdapterError::tool(&self.name, format!("log file: {e}")))?;

        debug!("tool:start name={} program={} args={args:?}", self.name, self.program.display());
        let mut child = self.command(args, workdir)
                            .stdin(Stdio::null())
                            .stdout(Stdio::from(stdout))
                            .stderr(Stdio::from(stderr))
                            .spawn()
                            .map_err(|e| AdapterError::tool(&self.name, format!("spawn {}: {e}", self.program.display())))?;

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => return Err(AdapterError::tool(&self.name, format!("wait: {e}"))),
            }
            if start.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                warn!("tool {} killed after {:?}", self.name, self.timeout);
                return Err(AdapterError::tool(&self.name, format!("timed out after {}s", self.timeout.as_secs())));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let output = read_log(&mut log);
        if !status.success() {
            return Err(AdapterError::tool(&self.name, format!("exited with {status}\n{}", tail(&output))));
        }
        debug!("tool:done name={} elapsed_ms={}", self.name, start.elapsed().as_millis());
        Ok(output)
    }

    fn describe(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn read_log(log: &mut File) -> String {
    let mut buf = Vec::new();
    if log.seek(SeekFrom::Start(0)).is_ok() {
        let _ = log.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn tail(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    lines[lines.len().saturating_sub(LOG_TAIL_LINES)..].join("\n")
}

pub fn join_classpath(paths: &[PathBuf]) -> String {
    let sep = if cfg!(windows) { ";" } else { ":" };
    paths.iter()
         .map(|p| p.display().to_string())
         .collect::<Vec<_>>()
         .join(sep)
}
