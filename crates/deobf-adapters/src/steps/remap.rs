//! Stages de remapeo de fuentes: dev (intermedio -> legible) sobre las
//! fuentes parcheadas, y retro (legible -> intermedio) sobre los source sets
//! del desarrollador.

use std::path::PathBuf;

use deobf_core::{ArtifactStage, ExecutionContext, StageDefinition, StageRunResult};
use deobf_mapping::{MappingTable, NameTables, RangeMap};
use log::debug;
use serde_json::{json, Value};

use super::mappings::{generated_table, MCP_SRG};
use super::{ids, load_transformers, path_strings, required_input};
use crate::error::AdapterError;
use crate::rangemap::{classpath_classes, ExtractOptions, RangeMapExtractor, ScopedResolver};
use crate::remapper::{RemapDirection, RemapRules, SymbolRemapper};

pub const RANGE_MAP_FILE: &str = "rangemap.json";

/// remapMcSources: fuentes parcheadas -> fuentes con nombres legibles.
#[derive(Debug, Clone)]
pub struct RemapStage {
    transformers: Vec<PathBuf>,
    classpath: Vec<PathBuf>,
}

impl RemapStage {
    pub fn new(transformers: Vec<PathBuf>, classpath: Vec<PathBuf>) -> Self {
        Self { transformers, classpath }
    }

    fn remap(&self, ctx: &ExecutionContext) -> Result<Option<Value>, AdapterError> {
        let patched = required_input(ctx, ids::PATCH)?;
        let names = NameTables::load_dir(required_input(ctx, ids::INPUT_MCP_NAMES)?)?;
        let table = MappingTable::from_names(&names);
        let rules = RemapRules::from_ats(&load_transformers(&self.transformers, ctx)?);

        let resolver = ScopedResolver::new(&table).with_classes(classpath_classes(&self.classpath)?)
                                                  .index_tree(patched)?;
        let map = RangeMapExtractor::new(&resolver, ExtractOptions::default()).extract(patched)?;
        debug!("remapMcSources: resolved_spans={} at_renames={}", map.resolved_count(), !rules.is_empty());
        let report = SymbolRemapper::new(&table, &rules, RemapDirection::Dev).remap_tree(patched, &map, &ctx.output)?;
        Ok(serde_json::to_value(report).ok())
    }
}

impl StageDefinition for RemapStage {
    fn id(&self) -> &str {
        ids::REMAP
    }

    fn stage(&self) -> ArtifactStage {
        ArtifactStage::DevRemapped
    }

    fn base_params(&self) -> Value {
        json!({
            "direction": RemapDirection::Dev,
            "accessTransformers": path_strings(&self.transformers),
            "classpath": path_strings(&self.classpath),
        })
    }

    fn run(&self, ctx: &ExecutionContext) -> StageRunResult {
        self.remap(ctx).into()
    }
}

/// Tabla legible -> intermedio, con los renombres de ATs invertidos.
fn retro_table(ctx: &ExecutionContext, transformers: &[PathBuf]) -> Result<MappingTable, AdapterError> {
    let mut table = generated_table(required_input(ctx, ids::GEN_SRGS)?, MCP_SRG)?;
    RemapRules::from_ats(&load_transformers(transformers, ctx)?).extend_retro_table(&mut table);
    Ok(table)
}

/// Range map del árbol editado por el desarrollador, resuelto contra los
/// nombres legibles. Se escribe como `rangemap.json` dentro del artifact.
#[derive(Debug, Clone)]
pub struct ExtractRangeMapStage {
    id: String,
    source_input: String,
    transformers: Vec<PathBuf>,
    validate: bool,
}

impl ExtractRangeMapStage {
    pub fn new(id: &str, source_input: &str, transformers: Vec<PathBuf>) -> Self {
        Self { id: id.to_string(),
               source_input: source_input.to_string(),
               transformers,
               validate: false }
    }

    /// Falla ante la primera ocurrencia no resuelta.
    pub fn validating(mut self) -> Self {
        self.validate = true;
        self
    }

    fn extract(&self, ctx: &ExecutionContext) -> Result<Option<Value>, AdapterError> {
        let tree = required_input(ctx, &self.source_input)?;
        let table = retro_table(ctx, &self.transformers)?;
        let classpath: Vec<PathBuf> = ctx.input_location(ids::DEOBF_MCP)
                                         .map(|p| vec![p.to_path_buf()])
                                         .unwrap_or_default();
        let resolver = ScopedResolver::new(&table).with_classes(classpath_classes(&classpath)?)
                                                  .index_tree(tree)?;
        let options = ExtractOptions { require_fully_resolved: self.validate };
        let map = RangeMapExtractor::new(&resolver, options).extract(tree)?;

        std::fs::create_dir_all(&ctx.output).map_err(|e| AdapterError::io(&ctx.output, e))?;
        map.save(&ctx.output.join(RANGE_MAP_FILE))?;
        Ok(Some(json!({
            "files": map.files.len(),
            "resolved": map.resolved_count(),
            "unresolved": map.unresolved().len(),
        })))
    }
}

impl StageDefinition for ExtractRangeMapStage {
    fn id(&self) -> &str {
        &self.id
    }

    fn stage(&self) -> ArtifactStage {
        ArtifactStage::Auxiliary
    }

    fn base_params(&self) -> Value {
        json!({
            "source": self.source_input,
            "accessTransformers": path_strings(&self.transformers),
            "requireFullyResolved": self.validate,
        })
    }

    fn run(&self, ctx: &ExecutionContext) -> StageRunResult {
        self.extract(ctx).into()
    }
}

/// Fuentes del desarrollador -> fuentes en nombres intermedios.
#[derive(Debug, Clone)]
pub struct RetromapStage {
    id: String,
    source_input: String,
    range_map: String,
    transformers: Vec<PathBuf>,
}

impl RetromapStage {
    pub fn new(id: &str, source_input: &str, range_map: &str, transformers: Vec<PathBuf>) -> Self {
        Self { id: id.to_string(),
               source_input: source_input.to_string(),
               range_map: range_map.to_string(),
               transformers }
    }

    fn retromap(&self, ctx: &ExecutionContext) -> Result<Option<Value>, AdapterError> {
        let tree = required_input(ctx, &self.source_input)?;
        let map = RangeMap::load(&required_input(ctx, &self.range_map)?.join(RANGE_MAP_FILE))?;
        let table = retro_table(ctx, &self.transformers)?;
        let rules = RemapRules::new();
        let report = SymbolRemapper::new(&table, &rules, RemapDirection::Retro).remap_tree(tree, &map, &ctx.output)?;
        Ok(serde_json::to_value(report).ok())
    }
}

impl StageDefinition for RetromapStage {
    fn id(&self) -> &str {
        &self.id
    }

    fn stage(&self) -> ArtifactStage {
        ArtifactStage::RetroRemapped
    }

    fn base_params(&self) -> Value {
        json!({
            "direction": RemapDirection::Retro,
            "source": self.source_input,
            "rangeMap": self.range_map,
            "accessTransformers": path_strings(&self.transformers),
        })
    }

    fn run(&self, ctx: &ExecutionContext) -> StageRunResult {
        self.retromap(ctx).into()
    }
}
