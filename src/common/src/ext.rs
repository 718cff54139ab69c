use log::warn;
use std::fmt::Debug;

pub trait ResultExt<T> {
    /// Log the error at `warn`, prefixed with `what`, and keep going with `None`.
    fn ok_or_warn_with(self, what: &str) -> Option<T>;
}

impl<T, E: Debug> ResultExt<T> for Result<T, E> {
    fn ok_or_warn_with(self, what: &str) -> Option<T> {
        self.inspect_err(|err| warn!("{what}: {err:?}")).ok()
    }
}
