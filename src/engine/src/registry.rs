use crate::capability::{Capability, DefaultProvider};
use crate::context::Context;
use crate::error::{DuplicateCapabilityError, ProviderError, RegistryError};
use log::debug;
use std::collections::HashMap;
use std::fmt;

struct Entry {
    capability: Capability,
    provider: Box<dyn DefaultProvider>,
}

/// Registered capabilities and their default providers, in registration order.
#[derive(Default)]
pub struct FlagRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl FlagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        capability: Capability,
        provider: impl DefaultProvider + 'static,
    ) -> Result<(), DuplicateCapabilityError> {
        self.register_boxed(capability, Box::new(provider))
    }

    pub fn register_boxed(
        &mut self,
        capability: Capability,
        provider: Box<dyn DefaultProvider>,
    ) -> Result<(), DuplicateCapabilityError> {
        if self.index.contains_key(&capability.name) {
            return Err(DuplicateCapabilityError {
                name: capability.name,
            });
        }

        debug!("registered {} ({})", capability.name, capability.kind);

        self.index.insert(capability.name.clone(), self.entries.len());
        self.entries.push(Entry {
            capability,
            provider,
        });

        Ok(())
    }

    pub fn get_default(&self, name: &str, ctx: &Context) -> Result<bool, RegistryError> {
        let entry = self
            .entry(name)
            .ok_or_else(|| RegistryError::Unknown(name.to_owned()))?;

        entry.provider.provide(ctx).map_err(|source| {
            RegistryError::Provider(ProviderError {
                capability: name.to_owned(),
                source,
            })
        })
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entry(name).map(|entry| &entry.capability)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.entries.iter().map(|entry| &entry.capability)
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }
}

impl fmt::Debug for FlagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
