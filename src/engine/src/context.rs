use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

// android.view.Display.TYPE_INTERNAL / TYPE_EXTERNAL
const TYPE_INTERNAL: i32 = 1;
const TYPE_EXTERNAL: i32 = 2;

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
pub enum DisplayClass {
    Internal,
    External,
    Other,
}

impl DisplayClass {
    /// Classify a raw platform display type. Wifi, overlay, virtual and any
    /// unknown type fall into [`DisplayClass::Other`].
    pub fn from_display_type(display_type: i32) -> Self {
        match display_type {
            TYPE_INTERNAL => DisplayClass::Internal,
            TYPE_EXTERNAL => DisplayClass::External,
            _ => DisplayClass::Other,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayDescriptor {
    pub id: i32,
    pub class: DisplayClass,
}

impl DisplayDescriptor {
    pub fn new(id: i32, class: DisplayClass) -> Self {
        Self { id, class }
    }
}

/// Everything a query knows about its call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Context {
    /// Package (or process) name of the caller.
    pub caller_scope: String,
    pub display: Option<DisplayDescriptor>,
}

impl Context {
    pub fn new(caller_scope: impl Into<String>) -> Self {
        Self {
            caller_scope: caller_scope.into(),
            display: None,
        }
    }

    pub fn with_display(mut self, display: DisplayDescriptor) -> Self {
        self.display = Some(display);
        self
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display {
            Some(display) => write!(
                f,
                "{} (display {}, {})",
                self.caller_scope, display.id, display.class
            ),
            None => f.write_str(&self.caller_scope),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_platform_display_types() {
        assert_eq!(DisplayClass::from_display_type(1), DisplayClass::Internal);
        assert_eq!(DisplayClass::from_display_type(2), DisplayClass::External);
        for other in [0, 3, 4, 5, -1, 42] {
            assert_eq!(DisplayClass::from_display_type(other), DisplayClass::Other);
        }
    }

    #[test]
    fn display_class_parses_from_str() {
        assert_eq!(
            "external".parse::<DisplayClass>(),
            Ok(DisplayClass::External)
        );
        assert!("hdmi".parse::<DisplayClass>().is_err());
    }

    #[test]
    fn context_formats_display() {
        let ctx = Context::new("com.android.systemui")
            .with_display(DisplayDescriptor::new(2, DisplayClass::External));
        assert_eq!(
            ctx.to_string(),
            "com.android.systemui (display 2, external)"
        );
    }
}
