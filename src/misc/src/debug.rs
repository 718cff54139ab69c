/// Reads a `debug.deskx.<key>` switch from the system properties. Always off in
/// release builds.
#[macro_export]
macro_rules! debug_on {
    ($key: expr) => {{
        #[cfg(debug_assertions)]
        {
            $crate::props::prop_on(concat!("debug.deskx.", $key))
        }
        #[cfg(not(debug_assertions))]
        {
            false
        }
    }};
}
