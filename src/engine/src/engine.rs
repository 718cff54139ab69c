use crate::audit::{AuditSink, DecisionRecord};
use crate::capability::{Capability, DefaultProvider};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::{
    BuildError, ConflictingOverrideError, DuplicateCapabilityError, ProviderError, RegistryError,
    ResolutionError,
};
use crate::overrides::{OverrideRule, OverrideTable};
use crate::registry::FlagRegistry;
use crate::resolver::{EligibilityResolver, Formula, InputSource};
use deskx_common::ext::ResultExt;
use log::{debug, info, warn};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use strum_macros::{AsRefStr, Display, EnumIter};

static INSTANCE: OnceLock<Arc<OverrideEngine>> = OnceLock::new();

/// The layer that produced a value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Layer {
    Override,
    Derived,
    Default,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub value: bool,
    pub decided_by: Layer,
}

impl Resolution {
    fn new(value: bool, decided_by: Layer) -> Self {
        Self { value, decided_by }
    }
}

/// Collects capabilities, rules and formulas before anything can query them.
#[derive(Default)]
pub struct EngineBuilder {
    registry: FlagRegistry,
    rules: Vec<OverrideRule>,
    overrides: OverrideTable,
    resolver: EligibilityResolver,
    config: EngineConfig,
    sink: Option<Arc<dyn AuditSink>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_capability(
        &mut self,
        capability: Capability,
        provider: impl DefaultProvider + 'static,
    ) -> Result<(), DuplicateCapabilityError> {
        self.registry.register(capability, provider)
    }

    /// Add `rules` to the table. The combined set is validated as a whole;
    /// on conflict the previously loaded rules stay in effect.
    pub fn load_overrides(
        &mut self,
        rules: impl IntoIterator<Item = OverrideRule>,
    ) -> Result<(), ConflictingOverrideError> {
        let mut combined = self.rules.clone();
        combined.extend(rules);

        self.overrides = OverrideTable::load(combined.iter().cloned())?;
        self.rules = combined;

        Ok(())
    }

    pub fn derive(&mut self, capability: &str, formula: Formula) -> Result<(), BuildError> {
        if !self.registry.contains(capability) {
            return Err(BuildError::UnregisteredDerivation(capability.to_owned()));
        }

        self.resolver.bind(capability, formula)
    }

    pub fn config(&mut self, config: EngineConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn audit_sink(&mut self, sink: impl AuditSink + 'static) -> &mut Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn shared_audit_sink(&mut self, sink: Arc<dyn AuditSink>) -> &mut Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> OverrideEngine {
        for (capability, formula) in self.resolver.iter() {
            for input in formula.inputs() {
                if !self.registry.contains(input) && !self.overrides.targets(input) {
                    warn!("{capability}: input `{input}` is neither registered nor overridden");
                }
            }
        }

        info!(
            "override engine ready: {} capabilities, {} rules, {:?}",
            self.registry.len(),
            self.overrides.len(),
            self.config
        );

        OverrideEngine {
            registry: self.registry,
            overrides: self.overrides,
            resolver: self.resolver,
            config: self.config,
            sink: self.sink,
        }
    }
}

/// Answers capability queries. Immutable once built and safe to share
/// between threads.
pub struct OverrideEngine {
    registry: FlagRegistry,
    overrides: OverrideTable,
    resolver: EligibilityResolver,
    config: EngineConfig,
    sink: Option<Arc<dyn AuditSink>>,
}

impl OverrideEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn resolve(&self, capability: &str, ctx: &Context) -> Result<Resolution, ResolutionError> {
        let resolution = self.decide(capability, ctx)?;

        debug!(
            "{capability} = {} ({}) for {ctx}",
            resolution.value, resolution.decided_by
        );
        self.emit(capability, ctx, resolution);

        Ok(resolution)
    }

    /// Resolve every registered capability, in registration order.
    pub fn resolve_all(&self, ctx: &Context) -> Vec<(&str, Result<Resolution, ResolutionError>)> {
        self.registry
            .iter()
            .map(|capability| {
                let name = capability.name.as_str();
                (name, self.resolve(name, ctx))
            })
            .collect()
    }

    pub fn registry(&self) -> &FlagRegistry {
        &self.registry
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    pub fn resolver(&self) -> &EligibilityResolver {
        &self.resolver
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn decide(&self, capability: &str, ctx: &Context) -> Result<Resolution, ResolutionError> {
        if let Some(value) = self
            .overrides
            .lookup(capability, ctx, self.config.scope_match_mode)
        {
            return Ok(Resolution::new(value, Layer::Override));
        }

        if let Some(result) = self.resolver.evaluate(capability, ctx, self) {
            match result {
                Ok(value) => return Ok(Resolution::new(value, Layer::Derived)),
                Err(cause) => {
                    let err = ResolutionError::new(capability, cause);

                    if self.config.fail_closed_on_derivation_error {
                        return Err(err);
                    }

                    warn!("{err}, falling back to default");
                }
            }
        }

        let value = self
            .registry
            .get_default(capability, ctx)
            .map_err(|err| ResolutionError::new(capability, err))?;

        Ok(Resolution::new(value, Layer::Default))
    }

    fn emit(&self, capability: &str, ctx: &Context, resolution: Resolution) {
        let Some(sink) = &self.sink else {
            return;
        };

        let record = DecisionRecord::new(capability, ctx, resolution.value, resolution.decided_by);

        match panic::catch_unwind(AssertUnwindSafe(|| sink.record(record))) {
            Ok(result) => {
                result.ok_or_warn_with(capability);
            }
            Err(_) => warn!("audit sink panicked on {capability}, record dropped"),
        }
    }
}

/// Formula inputs see overrides and defaults, never other derivations.
impl InputSource for OverrideEngine {
    fn input(&self, name: &str, ctx: &Context) -> Result<Option<bool>, ProviderError> {
        if let Some(value) = self
            .overrides
            .lookup(name, ctx, self.config.scope_match_mode)
        {
            return Ok(Some(value));
        }

        match self.registry.get_default(name, ctx) {
            Ok(value) => Ok(Some(value)),
            Err(RegistryError::Unknown(_)) => Ok(None),
            Err(RegistryError::Provider(err)) => Err(err),
        }
    }
}

/// Publish a fully built engine for the rest of the process. Only the first
/// call succeeds.
pub fn install(engine: OverrideEngine) -> Result<&'static Arc<OverrideEngine>, BuildError> {
    INSTANCE
        .set(Arc::new(engine))
        .map_err(|_| BuildError::AlreadyInstalled)?;

    Ok(instance())
}

pub fn instance() -> &'static Arc<OverrideEngine> {
    INSTANCE.get().expect("override engine not installed")
}

pub fn try_instance() -> Option<&'static Arc<OverrideEngine>> {
    INSTANCE.get()
}
