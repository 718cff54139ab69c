use crate::cli::Cli;
use deskx_engine::{EngineConfig, RuleFile, ScopeMatchMode};

/// Defaults, then the rule file's `[engine]` table, then debug properties,
/// then command line flags.
pub fn engine_config(cli: &Cli, file: Option<&RuleFile>) -> EngineConfig {
    let mut config = file
        .and_then(|file| file.engine)
        .unwrap_or_default()
        .with_debug_props();

    if cli.cfg_fail_closed {
        config.fail_closed_on_derivation_error = true;
    }

    if cli.cfg_exact_scope {
        config.scope_match_mode = ScopeMatchMode::Exact;
    }

    config
}
