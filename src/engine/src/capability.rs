use crate::context::Context;
use crate::error::BoxError;
use deskx_misc::props::PropertySource;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// A plain boolean field.
    Flag,
    /// A boolean-returning check method.
    MethodCheck,
    /// A singleton flag object queried through `isTrue()`.
    EnumFlag,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub kind: CapabilityKind,
}

impl Capability {
    pub fn new(name: impl Into<String>, kind: CapabilityKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, CapabilityKind::Flag)
    }

    pub fn method_check(name: impl Into<String>) -> Self {
        Self::new(name, CapabilityKind::MethodCheck)
    }

    pub fn enum_flag(name: impl Into<String>) -> Self {
        Self::new(name, CapabilityKind::EnumFlag)
    }
}

/// Computes a capability's value when nothing else decides it.
///
/// Implementations must be pure and must terminate for every context.
pub trait DefaultProvider: Send + Sync {
    fn provide(&self, ctx: &Context) -> Result<bool, BoxError>;
}

impl<F> DefaultProvider for F
where
    F: Fn(&Context) -> Result<bool, BoxError> + Send + Sync,
{
    fn provide(&self, ctx: &Context) -> Result<bool, BoxError> {
        self(ctx)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Constant(pub bool);

impl DefaultProvider for Constant {
    fn provide(&self, _ctx: &Context) -> Result<bool, BoxError> {
        Ok(self.0)
    }
}

/// A boolean property read once, at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFlag {
    key: String,
    value: bool,
}

impl PropertyFlag {
    pub fn snapshot(props: &dyn PropertySource, key: impl Into<String>, default: bool) -> Self {
        let key = key.into();
        let value = props.get_bool(&key, default);
        Self { key, value }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> bool {
        self.value
    }
}

impl DefaultProvider for PropertyFlag {
    fn provide(&self, _ctx: &Context) -> Result<bool, BoxError> {
        Ok(self.value)
    }
}
