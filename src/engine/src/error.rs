use crate::overrides::OverrideRule;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("capability `{name}` is already registered")]
pub struct DuplicateCapabilityError {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("conflicting overrides for `{}`: {first} vs {second}", .first.capability)]
pub struct ConflictingOverrideError {
    pub first: OverrideRule,
    pub second: OverrideRule,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{capability}` requires `{input}`, which is neither registered nor overridden")]
pub struct MissingInputError {
    pub capability: String,
    pub input: String,
}

#[derive(Debug, Error)]
#[error("default provider of `{capability}` failed")]
pub struct ProviderError {
    pub capability: String,
    #[source]
    pub source: BoxError,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("capability `{0}` is not registered")]
    Unknown(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Why a single resolution could not produce a value.
#[derive(Debug, Error)]
pub enum ResolutionCause {
    #[error(transparent)]
    MissingInput(#[from] MissingInputError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("capability `{0}` is not registered")]
    UnknownCapability(String),
}

impl From<RegistryError> for ResolutionCause {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::Unknown(name) => ResolutionCause::UnknownCapability(name),
            RegistryError::Provider(err) => ResolutionCause::Provider(err),
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to resolve `{capability}`: {cause}")]
pub struct ResolutionError {
    pub capability: String,
    pub cause: ResolutionCause,
}

impl ResolutionError {
    pub fn new(capability: &str, cause: impl Into<ResolutionCause>) -> Self {
        Self {
            capability: capability.to_owned(),
            cause: cause.into(),
        }
    }
}

/// Startup failures. None of these are recoverable: the engine is never
/// built from an ambiguous table.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    DuplicateCapability(#[from] DuplicateCapabilityError),
    #[error(transparent)]
    ConflictingOverride(#[from] ConflictingOverrideError),
    #[error("cannot derive unregistered capability `{0}`")]
    UnregisteredDerivation(String),
    #[error("capability `{0}` already has a derivation formula")]
    DuplicateDerivation(String),
    #[error("override engine already installed")]
    AlreadyInstalled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    #[error("audit queue is full")]
    Full,
    #[error("audit queue is closed")]
    Closed,
    #[error("audit sink rejected record: {0}")]
    Rejected(String),
}
