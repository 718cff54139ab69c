use crate::context::{Context, DisplayClass};
use crate::error::{BuildError, MissingInputError, ProviderError, ResolutionCause};
use crate::preset::names;
use log::{debug, trace};
use std::collections::HashMap;

/// Where a formula reads its inputs from.
pub trait InputSource {
    /// `Ok(None)` when `name` is neither registered nor overridden for `ctx`.
    fn input(&self, name: &str, ctx: &Context) -> Result<Option<bool>, ProviderError>;
}

/// Raw values captured by the host, e.g. the fields of a state object.
impl InputSource for HashMap<String, bool> {
    fn input(&self, name: &str, _ctx: &Context) -> Result<Option<bool>, ProviderError> {
        Ok(self.get(name).copied())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct DeviceState {
    pub desktop_mode_supported: bool,
    pub can_internal_display_host_desktops: bool,
    pub enforce_device_restrictions: bool,
    pub projected_display_desktop_mode_enabled: bool,
}

/// Restrictions are checked before projected mode; when projected mode is on,
/// internal display hosting is irrelevant.
pub fn device_eligibility(state: DeviceState) -> bool {
    if !state.enforce_device_restrictions {
        return true;
    }

    if state.projected_display_desktop_mode_enabled {
        return state.desktop_mode_supported;
    }

    state.desktop_mode_supported && state.can_internal_display_host_desktops
}

pub fn display_support(can_enter_desktop_mode: bool, class: DisplayClass) -> bool {
    if !can_enter_desktop_mode {
        return false;
    }

    match class {
        DisplayClass::Internal => false,
        DisplayClass::External => true,
        DisplayClass::Other => true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEligibilityInputs {
    pub desktop_mode_supported: String,
    pub can_internal_display_host_desktops: String,
    pub enforce_device_restrictions: String,
    pub projected_display_desktop_mode_enabled: String,
}

impl Default for DeviceEligibilityInputs {
    fn default() -> Self {
        Self {
            desktop_mode_supported: names::DSI_IS_DESKTOP_MODE_SUPPORTED.into(),
            can_internal_display_host_desktops: names::DSI_CAN_INTERNAL_DISPLAY_HOST_DESKTOPS
                .into(),
            enforce_device_restrictions: names::DSI_ENFORCE_DEVICE_RESTRICTIONS.into(),
            projected_display_desktop_mode_enabled: names::DEF_ENABLE_PROJECTED_DISPLAY_DESKTOP_MODE
                .into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySupportInputs {
    pub can_enter_desktop_mode: String,
}

impl Default for DisplaySupportInputs {
    fn default() -> Self {
        Self {
            can_enter_desktop_mode: names::DSI_CAN_ENTER_DESKTOP_MODE.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    DeviceEligibility(DeviceEligibilityInputs),
    DisplaySupport(DisplaySupportInputs),
}

impl Formula {
    pub fn device_eligibility() -> Self {
        Formula::DeviceEligibility(DeviceEligibilityInputs::default())
    }

    pub fn display_support() -> Self {
        Formula::DisplaySupport(DisplaySupportInputs::default())
    }

    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Formula::DeviceEligibility(inputs) => vec![
                inputs.desktop_mode_supported.as_str(),
                inputs.can_internal_display_host_desktops.as_str(),
                inputs.enforce_device_restrictions.as_str(),
                inputs.projected_display_desktop_mode_enabled.as_str(),
            ],
            Formula::DisplaySupport(inputs) => vec![inputs.can_enter_desktop_mode.as_str()],
        }
    }

    /// All declared inputs are read before computing, so a missing input is
    /// reported whatever the other values are.
    pub fn evaluate(
        &self,
        capability: &str,
        ctx: &Context,
        source: &dyn InputSource,
    ) -> Result<bool, ResolutionCause> {
        let fetch = |input: &str| -> Result<bool, ResolutionCause> {
            source.input(input, ctx)?.ok_or_else(|| {
                MissingInputError {
                    capability: capability.to_owned(),
                    input: input.to_owned(),
                }
                .into()
            })
        };

        match self {
            Formula::DeviceEligibility(inputs) => {
                let state = DeviceState {
                    desktop_mode_supported: fetch(&inputs.desktop_mode_supported)?,
                    can_internal_display_host_desktops: fetch(
                        &inputs.can_internal_display_host_desktops,
                    )?,
                    enforce_device_restrictions: fetch(&inputs.enforce_device_restrictions)?,
                    projected_display_desktop_mode_enabled: fetch(
                        &inputs.projected_display_desktop_mode_enabled,
                    )?,
                };

                let eligible = device_eligibility(state);
                trace!("{capability}: {state:?} -> {eligible}");

                Ok(eligible)
            }
            Formula::DisplaySupport(inputs) => {
                let can_enter = fetch(&inputs.can_enter_desktop_mode)?;

                let Some(display) = ctx.display else {
                    debug!(
                        "{capability}: no display in query from {}",
                        ctx.caller_scope
                    );
                    return Ok(false);
                };

                let supported = display_support(can_enter, display.class);
                trace!(
                    "{capability}: display {} ({}), can enter = {can_enter} -> {supported}",
                    display.id, display.class
                );

                Ok(supported)
            }
        }
    }
}

/// Derivation formulas bound to capability names.
#[derive(Debug, Default)]
pub struct EligibilityResolver {
    formulas: HashMap<String, Formula>,
}

impl EligibilityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(
        &mut self,
        capability: impl Into<String>,
        formula: Formula,
    ) -> Result<(), BuildError> {
        let capability = capability.into();

        if self.formulas.contains_key(&capability) {
            return Err(BuildError::DuplicateDerivation(capability));
        }

        self.formulas.insert(capability, formula);
        Ok(())
    }

    pub fn formula(&self, capability: &str) -> Option<&Formula> {
        self.formulas.get(capability)
    }

    /// `None` when no formula is bound to `capability`.
    pub fn evaluate(
        &self,
        capability: &str,
        ctx: &Context,
        source: &dyn InputSource,
    ) -> Option<Result<bool, ResolutionCause>> {
        self.formula(capability).map(|formula| formula.evaluate(capability, ctx, source))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Formula)> {
        self.formulas.iter().map(|(k, v)| (k.as_str(), v))
    }
}
