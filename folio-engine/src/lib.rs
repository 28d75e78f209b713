//! # Folio Engine
//!
//! Compiles loosely structured book metadata into complete, validated rows
//! for a print distributor's wholesale intake sheet.
//!
//! **Flow:** `MetadataRecord` → [`pipeline::CompilationPipeline`] (one
//! strategy per target field) → [`validators::Validator`] →
//! [`recovery::RecoveryManager`] → row in the output table plus an entry in
//! the [`batch::PopulationReport`].
//!
//! The [`pool::IdentifierPool`] hands out identifiers, at most one per book,
//! and is the only state shared between records.

pub mod batch;
pub mod error;
pub mod fields;
pub mod lookup;
pub mod pipeline;
pub mod pool;
pub mod recovery;
pub mod registry;
pub mod strategies;
pub mod types;
pub mod validators;

pub use batch::{BatchOrchestrator, BatchResult, FieldStatus, OutputTable, PopulationReport};
pub use error::{EngineError, EngineResult, StrategyError};
pub use fields::{Field, OutputRecord};
pub use lookup::LookupTables;
pub use pipeline::{CompilationPipeline, CompiledRecord, IdentifierSource, MappingContext};
pub use pool::{IdentifierPool, IdentifierRecord, IdentifierStatus, PoolStatistics};
pub use recovery::{RecoveryManager, RecoveryReport};
pub use registry::{FieldStrategy, StrategyRegistry};
pub use types::MetadataRecord;
pub use validators::{RecordValidation, ValidationDiagnostic, Validator};
