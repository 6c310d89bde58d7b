//! deobf-adapters: stages concretos del pipeline.
//!
//! - `deobfuscator` / `classfile`: renombrado y ATs sobre class files.
//! - `decompiler` / `tool`: frontera con procesos externos.
//! - `patcher`: parches, inyecciones y formato.
//! - `rangemap` / `remapper` / `java`: range maps y remapeo de fuentes.
//! - `dependencies`: subpipeline de dependencias de terceros.
//! - `steps` / `pipeline`: `StageDefinition`s y cableado del DAG.

pub mod bundle;
pub mod classfile;
pub mod decompiler;
pub mod deobfuscator;
pub mod dependencies;
pub mod error;
pub mod java;
pub mod patcher;
pub mod pipeline;
pub mod rangemap;
pub mod remapper;
pub mod steps;
pub mod tool;

pub use decompiler::{CompilerAdapter, DecompilerAdapter};
pub use deobfuscator::{BinaryDeobfuscator, DeobfReport};
pub use dependencies::{DeclaredDependency, DependencyDescriptor, DependencyRemapper, DependencyResolver,
                       PublishedModule, ResolvedConfiguration, ResolvedModule};
pub use error::AdapterError;
pub use patcher::{PatchSet, SourcePatcher};
pub use pipeline::{add_retromap, add_retromap_with, build_pipeline, PipelineHandles, PipelineInputs, RetromapHandles};
pub use rangemap::{ExtractOptions, RangeMapExtractor, ScopedResolver, SymbolResolver};
pub use remapper::{RemapDirection, RemapRules, SymbolRemapper};
pub use tool::{ExternalTool, ProcessTool};
