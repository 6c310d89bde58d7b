//! `EventStore` append-only en ficheros JSON-lines (`<dir>/<run_id>.jsonl`).
//!
//! Cada evento se serializa completo en una línea. `list` relee el fichero,
//! así que un proceso distinto puede inspeccionar runs anteriores.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use deobf_core::{EventStore, PipelineEvent, PipelineEventKind};
use log::{debug, error};
use uuid::Uuid;

use crate::error::PersistenceError;

pub struct JsonlEventStore {
    dir: PathBuf,
    next_seq: HashMap<Uuid, u64>,
}

impl JsonlEventStore {
    pub fn new(dir: &Path) -> Result<Self, PersistenceError> {
        fs::create_dir_all(dir).map_err(|e| PersistenceError::io(dir, e))?;
        Ok(Self { dir: dir.to_path_buf(),
                  next_seq: HashMap::new() })
    }

    fn path_for(&self, run_id: Uuid) -> PathBuf {
        self.dir.join(format!("{run_id}.jsonl"))
    }

    fn append_line(&self, ev: &PipelineEvent) -> Result<(), PersistenceError> {
        let path = self.path_for(ev.run_id);
        let line = serde_json::to_string(ev).map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        let mut file = OpenOptions::new().create(true)
                                         .append(true)
                                         .open(&path)
                                         .map_err(|e| PersistenceError::io(&path, e))?;
        writeln!(file, "{line}").map_err(|e| PersistenceError::io(&path, e))
    }

    fn read(&self, run_id: Uuid) -> Result<Vec<PipelineEvent>, PersistenceError> {
        let path = self.path_for(run_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&path).map_err(|e| PersistenceError::io(&path, e))?;
        let mut out = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| PersistenceError::io(&path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            out.push(serde_json::from_str(&line).map_err(|e| PersistenceError::Serialization(e.to_string()))?);
        }
        Ok(out)
    }
}

impl EventStore for JsonlEventStore {
    fn append_kind(&mut self, run_id: Uuid, kind: PipelineEventKind) -> PipelineEvent {
        debug!("append_kind:start run_id={run_id} kind={}", kind.variant_name());
        let seq = match self.next_seq.get(&run_id) {
            Some(s) => *s,
            None => self.read(run_id).map(|v| v.len() as u64).unwrap_or(0),
        };
        let ev = PipelineEvent { seq,
                                 run_id,
                                 kind,
                                 ts: Utc::now() };
        if let Err(e) = self.append_line(&ev) {
            error!("append_kind:write error run_id={run_id} err={e}");
        }
        self.next_seq.insert(run_id, seq + 1);
        debug!("append_kind:done run_id={run_id} seq={seq}");
        ev
    }

    fn list(&self, run_id: Uuid) -> Vec<PipelineEvent> {
        debug!("list:start run_id={run_id}");
        match self.read(run_id) {
            Ok(events) => {
                debug!("list:done run_id={run_id} count={}", events.len());
                events
            }
            Err(e) => {
                error!("list:load error run_id={run_id} err={e}");
                Vec::new()
            }
        }
    }
}
