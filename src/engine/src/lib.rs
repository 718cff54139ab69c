//! Capability override engine.
//!
//! Capabilities are named booleans. A query for one is answered by the first
//! layer that has an opinion: a forced value from the [`OverrideTable`], a
//! derivation formula from the [`EligibilityResolver`], or the default
//! provider held by the [`FlagRegistry`].

pub mod audit;
pub mod capability;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod overrides;
pub mod preset;
pub mod registry;
pub mod resolver;

pub use audit::{AuditSink, ChannelSink, DecisionRecord, LogSink, MemorySink};
pub use capability::{Capability, CapabilityKind, Constant, DefaultProvider, PropertyFlag};
pub use config::{EngineConfig, RuleFile, ScopeMatchMode};
pub use context::{Context, DisplayClass, DisplayDescriptor};
pub use engine::{EngineBuilder, Layer, OverrideEngine, Resolution};
pub use error::{
    BuildError, ConflictingOverrideError, DuplicateCapabilityError, MissingInputError,
    ProviderError, ResolutionError,
};
pub use overrides::{OverrideRule, OverrideTable, RuleScope};
pub use registry::FlagRegistry;
pub use resolver::{EligibilityResolver, Formula};
