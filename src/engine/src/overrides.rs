use crate::config::ScopeMatchMode;
use crate::context::Context;
use crate::error::ConflictingOverrideError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Which callers a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// Wildcard: every caller.
    Global,
    Callers(BTreeSet<String>),
}

impl RuleScope {
    pub fn callers<I, S>(callers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RuleScope::Callers(callers.into_iter().map(Into::into).collect())
    }

    /// Exact matches always win over the wildcard, so only scopes of the same
    /// shape can be ambiguous.
    fn overlaps(&self, other: &RuleScope) -> bool {
        match (self, other) {
            (RuleScope::Global, RuleScope::Global) => true,
            (RuleScope::Callers(a), RuleScope::Callers(b)) => !a.is_disjoint(b),
            _ => false,
        }
    }
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleScope::Global => f.write_str("*"),
            RuleScope::Callers(callers) => {
                f.write_str("[")?;
                for (i, caller) in callers.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(caller)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A forced value. Rules are terminal: they never refer to other rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverrideRule {
    pub capability: String,
    pub value: bool,
    pub scope: RuleScope,
}

impl OverrideRule {
    pub fn new(capability: impl Into<String>, value: bool, scope: RuleScope) -> Self {
        Self {
            capability: capability.into(),
            value,
            scope,
        }
    }

    pub fn global(capability: impl Into<String>, value: bool) -> Self {
        Self::new(capability, value, RuleScope::Global)
    }

    pub fn for_callers<I, S>(capability: impl Into<String>, value: bool, callers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(capability, value, RuleScope::callers(callers))
    }
}

impl fmt::Display for OverrideRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {} @ {}", self.capability, self.value, self.scope)
    }
}

#[derive(Debug, Default)]
struct CapabilityRules {
    exact: HashMap<String, bool>,
    wildcard: Option<bool>,
}

/// Validated, immutable set of override rules.
#[derive(Debug, Default)]
pub struct OverrideTable {
    rules: Vec<OverrideRule>,
    by_capability: HashMap<String, CapabilityRules>,
}

impl OverrideTable {
    /// Validate and index `rules`. Either the whole set is accepted or
    /// nothing is built.
    pub fn load(
        rules: impl IntoIterator<Item = OverrideRule>,
    ) -> Result<Self, ConflictingOverrideError> {
        let rules: Vec<OverrideRule> = rules.into_iter().collect();

        let mut grouped: HashMap<&str, Vec<&OverrideRule>> = HashMap::new();
        for rule in &rules {
            let seen = grouped.entry(rule.capability.as_str()).or_default();

            if let Some(prior) = seen
                .iter()
                .find(|prior| prior.value != rule.value && prior.scope.overlaps(&rule.scope))
            {
                return Err(ConflictingOverrideError {
                    first: (*prior).clone(),
                    second: rule.clone(),
                });
            }

            seen.push(rule);
        }

        let mut by_capability: HashMap<String, CapabilityRules> = HashMap::new();
        for rule in &rules {
            let entry = by_capability.entry(rule.capability.clone()).or_default();

            match &rule.scope {
                RuleScope::Global => {
                    entry.wildcard.get_or_insert(rule.value);
                }
                RuleScope::Callers(callers) => {
                    for caller in callers {
                        entry.exact.entry(caller.clone()).or_insert(rule.value);
                    }
                }
            }
        }

        info!(
            "loaded {} override rules for {} capabilities",
            rules.len(),
            by_capability.len()
        );

        Ok(Self {
            rules,
            by_capability,
        })
    }

    pub fn lookup(&self, capability: &str, ctx: &Context, mode: ScopeMatchMode) -> Option<bool> {
        let rules = self.by_capability.get(capability)?;

        if let Some(&value) = rules.exact.get(&ctx.caller_scope) {
            return Some(value);
        }

        match mode {
            ScopeMatchMode::Exact => None,
            ScopeMatchMode::ExactThenWildcard => {
                if rules.wildcard.is_some() {
                    debug!(
                        "{capability}: wildcard rule applies to {}",
                        ctx.caller_scope
                    );
                }
                rules.wildcard
            }
        }
    }

    pub fn targets(&self, capability: &str) -> bool {
        self.by_capability.contains_key(capability)
    }

    pub fn rules(&self) -> &[OverrideRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
