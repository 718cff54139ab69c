//! The desktop-mode table: which framework checks to force, for which
//! processes, and how the two computed checks are derived.

use crate::capability::{Capability, CapabilityKind, Constant, PropertyFlag};
use crate::engine::EngineBuilder;
use crate::error::BuildError;
use crate::overrides::{OverrideRule, RuleScope};
use crate::resolver::Formula;
use deskx_misc::props::PropertySource;
use log::info;
use once_cell::sync::Lazy;
use std::collections::BTreeSet;

pub mod names {
    pub const DSI_IS_DESKTOP_MODE_SUPPORTED: &str = "DesktopStateImpl.isDesktopModeSupported";
    pub const DSI_CAN_ENTER_DESKTOP_MODE: &str = "DesktopStateImpl.canEnterDesktopMode";
    pub const DSI_CAN_INTERNAL_DISPLAY_HOST_DESKTOPS: &str =
        "DesktopStateImpl.canInternalDisplayHostDesktops";
    pub const DSI_ENFORCE_DEVICE_RESTRICTIONS: &str = "DesktopStateImpl.enforceDeviceRestrictions";
    pub const DSI_IS_DEVICE_ELIGIBLE_FOR_DESKTOP_MODE: &str =
        "DesktopStateImpl.isDeviceEligibleForDesktopMode";
    pub const DSI_IS_DESKTOP_MODE_SUPPORTED_ON_DISPLAY: &str =
        "DesktopStateImpl.isDesktopModeSupportedOnDisplay";
    pub const DEF_ENABLE_PROJECTED_DISPLAY_DESKTOP_MODE: &str =
        "DesktopExperienceFlags.ENABLE_PROJECTED_DISPLAY_DESKTOP_MODE";

    pub const PROP_ENFORCE_DEVICE_RESTRICTIONS: &str =
        "persist.wm.debug.desktop_mode_enforce_device_restrictions";
    pub const SYSPROP_ENFORCE_DEVICE_RESTRICTIONS: &str =
        "SystemProperties.persist.wm.debug.desktop_mode_enforce_device_restrictions";
}

pub const PACKAGE_SETTINGS: &str = "com.android.settings";
pub const PACKAGE_PIXEL_LAUNCHER: &str = "com.google.android.apps.nexuslauncher";
pub const PACKAGE_SYSTEMUI: &str = "com.android.systemui";
pub const PACKAGE_ANDROID_FRAMEWORK: &str = "android";
pub const PACKAGE_ANDROID_SHELL: &str = "com.android.shell";

pub static TARGET_SCOPES: Lazy<BTreeSet<String>> = Lazy::new(|| {
    [
        PACKAGE_SETTINGS,
        PACKAGE_PIXEL_LAUNCHER,
        PACKAGE_SYSTEMUI,
        PACKAGE_ANDROID_FRAMEWORK,
        PACKAGE_ANDROID_SHELL,
    ]
    .into_iter()
    .map(String::from)
    .collect()
});

struct Group {
    class: &'static str,
    kind: CapabilityKind,
    force_true: &'static [&'static str],
    force_false: &'static [&'static str],
}

const GROUPS: &[Group] = &[
    Group {
        class: "DesktopModeStatus",
        kind: CapabilityKind::MethodCheck,
        force_true: &[
            "isDesktopModeSupported",
            "isDesktopModeDevOptionSupported",
            "canShowDesktopModeDevOption",
            "canShowDesktopExperienceDevOption",
            "shouldDevOptionBeEnabledByDefault",
            "isDeviceEligibleForDesktopMode",
            "isDeviceEligibleForDesktopModeDevOption",
        ],
        force_false: &[],
    },
    Group {
        class: "DesktopStateImpl",
        kind: CapabilityKind::Flag,
        force_true: &[
            "canEnterDesktopMode",
            "enableMultipleDesktops",
            "enterDesktopByDefaultOnFreeformDisplay",
            "isDesktopModeSupported",
        ],
        // enforceDeviceRestrictions is registered separately, it has a
        // property-backed default
        force_false: &["canInternalDisplayHostDesktops"],
    },
    Group {
        class: "DesktopExperienceFlags",
        kind: CapabilityKind::EnumFlag,
        force_true: &[
            "ENABLE_PROJECTED_DISPLAY_DESKTOP_MODE",
            "ENTER_DESKTOP_BY_DEFAULT_ON_FREEFORM_DISPLAYS",
            "ENABLE_MULTIPLE_DESKTOPS_BACKEND",
            "ENABLE_MULTIPLE_DESKTOPS_FRONTEND",
            "ENABLE_DESKTOP_TASKBAR_ON_FREEFORM_DISPLAYS",
            "ENABLE_TASKBAR_CONNECTED_DISPLAYS",
            "FORM_FACTOR_BASED_DESKTOP_FIRST_SWITCH",
        ],
        force_false: &[],
    },
    Group {
        class: "FeatureFlagsImpl",
        kind: CapabilityKind::MethodCheck,
        force_true: &[
            "enableDesktopTaskbarOnFreeformDisplays",
            "enableTaskbarConnectedDisplays",
            "enableDesktopWindowingMode",
            "formFactorBasedDesktopFirstSwitch",
        ],
        force_false: &["enableDisplayWindowingModeSwitching"],
    },
];

fn qualified(class: &str, member: &str) -> String {
    format!("{class}.{member}")
}

fn targets() -> RuleScope {
    RuleScope::Callers((*TARGET_SCOPES).clone())
}

/// Every forced value of the table, scoped to the target processes.
pub fn rules() -> Vec<OverrideRule> {
    let mut rules = Vec::new();

    for group in GROUPS {
        let forced = group
            .force_true
            .iter()
            .map(|member| (*member, true))
            .chain(group.force_false.iter().map(|member| (*member, false)));

        for (member, value) in forced {
            rules.push(OverrideRule::new(qualified(group.class, member), value, targets()));
        }
    }

    rules.push(OverrideRule::new(names::DSI_ENFORCE_DEVICE_RESTRICTIONS, false, targets()));
    rules.push(OverrideRule::new(names::SYSPROP_ENFORCE_DEVICE_RESTRICTIONS, false, targets()));

    rules
}

/// Register the table's capabilities, rules and formulas into `builder`.
///
/// Forced capabilities default to `false`, like a device outside the
/// rollout. Device restrictions default to the property value.
pub fn install_into(
    builder: &mut EngineBuilder,
    props: &dyn PropertySource,
) -> Result<(), BuildError> {
    for group in GROUPS {
        for member in group.force_true.iter().chain(group.force_false) {
            builder.register_capability(
                Capability::new(qualified(group.class, member), group.kind),
                Constant(false),
            )?;
        }
    }

    let enforce = PropertyFlag::snapshot(props, names::PROP_ENFORCE_DEVICE_RESTRICTIONS, true);
    info!("{} = {} on this device", enforce.key(), enforce.value());

    builder.register_capability(
        Capability::flag(names::DSI_ENFORCE_DEVICE_RESTRICTIONS),
        enforce.clone(),
    )?;
    builder.register_capability(
        Capability::method_check(names::SYSPROP_ENFORCE_DEVICE_RESTRICTIONS),
        enforce,
    )?;

    builder.register_capability(
        Capability::method_check(names::DSI_IS_DEVICE_ELIGIBLE_FOR_DESKTOP_MODE),
        Constant(false),
    )?;
    builder.register_capability(
        Capability::method_check(names::DSI_IS_DESKTOP_MODE_SUPPORTED_ON_DISPLAY),
        Constant(false),
    )?;

    builder.derive(
        names::DSI_IS_DEVICE_ELIGIBLE_FOR_DESKTOP_MODE,
        Formula::device_eligibility(),
    )?;
    builder.derive(
        names::DSI_IS_DESKTOP_MODE_SUPPORTED_ON_DISPLAY,
        Formula::display_support(),
    )?;

    builder.load_overrides(rules())?;

    Ok(())
}

pub fn builder(props: &dyn PropertySource) -> Result<EngineBuilder, BuildError> {
    let mut builder = EngineBuilder::new();
    install_into(&mut builder, props)?;
    Ok(builder)
}
