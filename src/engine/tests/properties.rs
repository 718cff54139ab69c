use deskx_engine::error::BoxError;
use deskx_engine::preset::{self, PACKAGE_SYSTEMUI, names};
use deskx_engine::{
    Capability, Constant, Context, DisplayClass, DisplayDescriptor, EngineConfig, Formula, Layer,
    MemorySink, OverrideEngine, OverrideRule, Resolution, ScopeMatchMode,
};
use deskx_misc::props::MapProperties;
use std::sync::Arc;
use std::thread;
use strum::IntoEnumIterator;

const LAUNCHER: &str = "com.google.android.apps.nexuslauncher";
const ELIGIBLE: &str = names::DSI_IS_DEVICE_ELIGIBLE_FOR_DESKTOP_MODE;

fn ctx(caller: &str) -> Context {
    Context::new(caller)
}

/// An engine whose device-eligibility inputs are plain constants.
fn eligibility_engine(
    supported: bool,
    internal: bool,
    enforce: bool,
    projected: bool,
) -> OverrideEngine {
    let mut builder = OverrideEngine::builder();
    for (name, value) in [
        (names::DSI_IS_DESKTOP_MODE_SUPPORTED, supported),
        (names::DSI_CAN_INTERNAL_DISPLAY_HOST_DESKTOPS, internal),
        (names::DSI_ENFORCE_DEVICE_RESTRICTIONS, enforce),
        (names::DEF_ENABLE_PROJECTED_DISPLAY_DESKTOP_MODE, projected),
    ] {
        builder
            .register_capability(Capability::flag(name), Constant(value))
            .unwrap();
    }
    builder
        .register_capability(Capability::method_check(ELIGIBLE), Constant(false))
        .unwrap();
    builder
        .derive(ELIGIBLE, Formula::device_eligibility())
        .unwrap();
    builder.build()
}

fn eligible(engine: &OverrideEngine) -> bool {
    let resolution = engine.resolve(ELIGIBLE, &ctx("android")).unwrap();
    assert_eq!(resolution.decided_by, Layer::Derived);
    resolution.value
}

#[test]
fn override_beats_derivation_and_default() {
    let sink = Arc::new(MemorySink::new());
    let mut builder = OverrideEngine::builder();
    builder
        .register_capability(
            Capability::method_check("checked"),
            |_: &Context| -> Result<bool, BoxError> { Err("never consulted".into()) },
        )
        .unwrap();
    builder
        .register_capability(
            Capability::flag(names::DSI_CAN_ENTER_DESKTOP_MODE),
            Constant(true),
        )
        .unwrap();
    builder
        .derive("checked", Formula::display_support())
        .unwrap();
    builder
        .load_overrides([OverrideRule::for_callers("checked", false, [PACKAGE_SYSTEMUI])])
        .unwrap();
    builder.shared_audit_sink(sink.clone());
    let engine = builder.build();

    let external =
        ctx(PACKAGE_SYSTEMUI).with_display(DisplayDescriptor::new(1, DisplayClass::External));
    assert_eq!(
        engine.resolve("checked", &external).unwrap(),
        Resolution {
            value: false,
            decided_by: Layer::Override
        }
    );
    assert_eq!(sink.records()[0].decided_by, Layer::Override);
}

#[test]
fn restrictions_off_grants_eligibility() {
    for bits in 0..8u8 {
        let engine = eligibility_engine(bits & 1 != 0, bits & 2 != 0, false, bits & 4 != 0);
        assert!(eligible(&engine), "bits = {bits:03b}");
    }
}

#[test]
fn projected_mode_tracks_support() {
    for supported in [true, false] {
        assert_eq!(
            eligible(&eligibility_engine(supported, true, true, true)),
            supported
        );
    }
}

#[test]
fn internal_hosting_required_when_not_projected() {
    for supported in [true, false] {
        for internal in [true, false] {
            assert_eq!(
                eligible(&eligibility_engine(supported, internal, true, false)),
                supported && internal
            );
        }
    }
}

#[test]
fn display_support_by_classification() {
    for can_enter in [false, true] {
        let mut builder = OverrideEngine::builder();
        builder
            .register_capability(
                Capability::flag(names::DSI_CAN_ENTER_DESKTOP_MODE),
                Constant(can_enter),
            )
            .unwrap();
        builder
            .register_capability(
                Capability::method_check(names::DSI_IS_DESKTOP_MODE_SUPPORTED_ON_DISPLAY),
                Constant(false),
            )
            .unwrap();
        builder
            .derive(
                names::DSI_IS_DESKTOP_MODE_SUPPORTED_ON_DISPLAY,
                Formula::display_support(),
            )
            .unwrap();
        let engine = builder.build();

        for class in DisplayClass::iter() {
            let query = ctx(LAUNCHER).with_display(DisplayDescriptor::new(0, class));
            let supported = engine
                .resolve(names::DSI_IS_DESKTOP_MODE_SUPPORTED_ON_DISPLAY, &query)
                .unwrap()
                .value;

            let expected = can_enter && class != DisplayClass::Internal;
            assert_eq!(supported, expected, "can_enter={can_enter} class={class}");
        }
    }
}

#[test]
fn conflicting_rules_fail_and_disjoint_rules_load() {
    let mut builder = OverrideEngine::builder();
    assert!(
        builder
            .load_overrides([
                OverrideRule::for_callers("f", true, [PACKAGE_SYSTEMUI]),
                OverrideRule::for_callers("f", false, [PACKAGE_SYSTEMUI]),
            ])
            .is_err()
    );

    builder
        .load_overrides([
            OverrideRule::for_callers("f", true, [PACKAGE_SYSTEMUI]),
            OverrideRule::for_callers("f", false, [LAUNCHER]),
        ])
        .unwrap();
    let engine = builder.build();

    assert!(engine.resolve("f", &ctx(PACKAGE_SYSTEMUI)).unwrap().value);
    assert!(!engine.resolve("f", &ctx(LAUNCHER)).unwrap().value);
}

#[test]
fn duplicate_registration_leaves_first() {
    let mut builder = OverrideEngine::builder();
    builder
        .register_capability(Capability::flag("a"), Constant(true))
        .unwrap();
    let err = builder
        .register_capability(Capability::flag("a"), Constant(false))
        .unwrap_err();
    assert_eq!(err.name, "a");

    let engine = builder.build();
    assert_eq!(
        engine.resolve("a", &ctx("android")).unwrap(),
        Resolution {
            value: true,
            decided_by: Layer::Default
        }
    );
}

#[test]
fn resolve_is_idempotent() {
    let engine = preset::builder(&MapProperties::new()).unwrap().build();
    let query =
        ctx(PACKAGE_SYSTEMUI).with_display(DisplayDescriptor::new(2, DisplayClass::External));

    for capability in engine.registry().iter() {
        let first = engine.resolve(&capability.name, &query).unwrap();
        let second = engine.resolve(&capability.name, &query).unwrap();
        assert_eq!(first, second, "{}", capability.name);
    }
}

#[test]
fn one_record_per_resolution() {
    let sink = Arc::new(MemorySink::new());
    let mut builder = preset::builder(&MapProperties::new()).unwrap();
    builder.shared_audit_sink(sink.clone());
    let engine = builder.build();

    let queries = [ctx(PACKAGE_SYSTEMUI), ctx("com.example.app")];
    let mut expected = Vec::new();
    for query in &queries {
        for (name, result) in engine.resolve_all(query) {
            expected.push((name.to_owned(), result.unwrap().decided_by));
        }
    }

    let recorded: Vec<_> = sink
        .records()
        .into_iter()
        .map(|record| (record.capability, record.decided_by))
        .collect();
    assert_eq!(recorded, expected);
    assert!(recorded.iter().any(|(_, layer)| *layer == Layer::Override));
    assert!(recorded.iter().any(|(_, layer)| *layer == Layer::Derived));
    assert!(recorded.iter().any(|(_, layer)| *layer == Layer::Default));
}

#[test]
fn exact_mode_skips_wildcards() {
    for (mode, expected) in [
        (ScopeMatchMode::Exact, Layer::Default),
        (ScopeMatchMode::ExactThenWildcard, Layer::Override),
    ] {
        let mut builder = OverrideEngine::builder();
        builder
            .register_capability(Capability::flag("f"), Constant(false))
            .unwrap();
        builder
            .load_overrides([OverrideRule::global("f", true)])
            .unwrap();
        builder.config(EngineConfig {
            scope_match_mode: mode,
            ..Default::default()
        });
        let engine = builder.build();

        assert_eq!(
            engine.resolve("f", &ctx(LAUNCHER)).unwrap().decided_by,
            expected
        );
    }
}

#[test]
fn concurrent_resolution() {
    let sink = Arc::new(MemorySink::new());
    let mut builder = preset::builder(&MapProperties::new()).unwrap();
    builder.shared_audit_sink(sink.clone());
    let engine = Arc::new(builder.build());

    let expected = engine.resolve(ELIGIBLE, &ctx(LAUNCHER)).unwrap();

    thread::scope(|scope| {
        for _ in 0..8 {
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                for _ in 0..100 {
                    let resolution = engine.resolve(ELIGIBLE, &ctx(LAUNCHER)).unwrap();
                    assert_eq!(resolution, expected);
                }
            });
        }
    });

    assert_eq!(sink.len(), 1 + 8 * 100);
}
