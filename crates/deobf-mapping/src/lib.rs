// deobf-mapping library entry point
pub mod access;
pub mod descriptor;
pub mod error;
pub mod names;
pub mod range;
pub mod srg;
pub mod symbol;
pub mod table;

pub use access::{AccessTransformer, AccessTransformerSet, FinalChange, MemberTarget, Visibility};
pub use error::MappingError;
pub use names::{NameEntry, NameTables};
pub use range::{FileRanges, RangeMap, RangeRecord, Resolution, Span};
pub use symbol::{SymbolId, SymbolKind};
pub use table::MappingTable;
