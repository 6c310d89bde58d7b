//! Artifacts del pipeline.
//!
//! Un `Artifact` es un bundle (árbol de ficheros) ya producido y etiquetado con
//! el stage lógico que lo generó. Es inmutable: un stage nunca reescribe la
//! salida de otro. Su identidad es `(name, stage, fingerprint)`, donde el
//! fingerprint resume los inputs y parámetros que lo produjeron (ver
//! `StageFingerprintInput`).
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Etiqueta del punto del pipeline al que pertenece un bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactStage {
    ObfBin,
    DeobfBin,
    DeobfSrcRaw,
    Decompiled,
    Patched,
    DevRemapped,
    CompiledDev,
    RetroRemapped,
    /// Insumos auxiliares (mappings, ATs extraídos, range maps).
    Auxiliary,
}

impl ArtifactStage {
    /// `true` para los stages cuyo bundle contiene código fuente.
    pub fn is_source(self) -> bool {
        matches!(self,
                 ArtifactStage::Decompiled | ArtifactStage::Patched | ArtifactStage::DevRemapped | ArtifactStage::RetroRemapped)
    }
}

impl fmt::Display for ArtifactStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArtifactStage::ObfBin => "OBF_BIN",
            ArtifactStage::DeobfBin => "DEOBF_BIN",
            ArtifactStage::DeobfSrcRaw => "DEOBF_SRC_RAW",
            ArtifactStage::Decompiled => "DECOMPILED",
            ArtifactStage::Patched => "PATCHED",
            ArtifactStage::DevRemapped => "DEV_REMAPPED",
            ArtifactStage::CompiledDev => "COMPILED_DEV",
            ArtifactStage::RetroRemapped => "RETRO_REMAPPED",
            ArtifactStage::Auxiliary => "AUXILIARY",
        };
        f.write_str(s)
    }
}

/// Artifact producido (o ya existente, para stages `Source`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub stage: ArtifactStage,
    pub fingerprint: String,
    pub location: PathBuf,
}

/// Referencia perezosa a la salida de un stage registrado.
///
/// Durante la fase de configuración sólo se conoce el id del stage; la ruta
/// concreta existe tras `PipelineBuilder::finalize` y el contenido tras la
/// ejecución (`ExecutionReport::artifact`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactHandle {
    pub stage_id: String,
    pub stage: ArtifactStage,
}

impl ArtifactHandle {
    pub fn new(stage_id: impl Into<String>, stage: ArtifactStage) -> Self {
        Self { stage_id: stage_id.into(),
               stage }
    }
}
