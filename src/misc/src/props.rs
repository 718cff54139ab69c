use log::trace;
use std::collections::HashMap;
use std::ops::Deref;

// https://cs.android.com/android/platform/superproject/main/+/main:system/libbase/parsebool.cpp;l=23-31;drc=61197364367c9e404c7da6900658f1b16c42d0da
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "y" | "yes" | "on" | "true" => Some(true),
        "0" | "n" | "no" | "off" | "false" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property(String);

impl From<Property> for bool {
    fn from(value: Property) -> Self {
        parse_bool(&value).unwrap_or_default()
    }
}

impl Property {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_bool(&self) -> Option<bool> {
        parse_bool(self)
    }
}

impl Deref for Property {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

/// Something that answers `getprop`-style lookups.
pub trait PropertySource: Send + Sync {
    fn get(&self, name: &str) -> Option<Property>;

    /// Mirrors `SystemProperties.getBoolean(key, def)`: unset or unparsable
    /// values yield `default`.
    fn get_bool(&self, name: &str, default: bool) -> bool {
        let value = self.get(name).and_then(|prop| prop.as_bool());
        trace!("property {name} = {value:?} (default {default})");
        value.unwrap_or(default)
    }
}

/// The device's property area. Off-device every lookup is unset.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProperties;

#[cfg(target_os = "android")]
mod system {
    use super::Property;
    use std::ffi::{CStr, CString, c_char};

    const PROP_VALUE_MAX: usize = 92;

    unsafe extern "C" {
        fn __system_property_get(name: *const c_char, value: *mut c_char) -> u32;
    }

    pub fn get(name: &str) -> Option<Property> {
        let name = CString::new(name).ok()?;
        let mut buffer = [0u8; PROP_VALUE_MAX + 1];

        let len = unsafe { __system_property_get(name.as_ptr(), buffer.as_mut_ptr() as _) };

        if len == 0 {
            return None;
        }

        let value = CStr::from_bytes_until_nul(&buffer).ok()?;
        Some(Property(value.to_string_lossy().into_owned()))
    }
}

#[cfg(not(target_os = "android"))]
mod system {
    use super::Property;

    pub fn get(_name: &str) -> Option<Property> {
        None
    }
}

impl PropertySource for SystemProperties {
    fn get(&self, name: &str) -> Option<Property> {
        system::get(name)
    }
}

/// A fixed property snapshot, for hosts that collect properties up front.
#[derive(Debug, Default, Clone)]
pub struct MapProperties {
    values: HashMap<String, String>,
}

impl MapProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl PropertySource for MapProperties {
    fn get(&self, name: &str) -> Option<Property> {
        self.values.get(name).cloned().map(Property)
    }
}

pub fn get(name: &str) -> Option<Property> {
    SystemProperties.get(name)
}

pub fn prop_on(name: &str) -> bool {
    get(name).map(|it| it.into()).unwrap_or_default()
}
