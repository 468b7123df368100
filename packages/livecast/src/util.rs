use std::fmt::Display;

pub trait ResultExt<T, E: Display> {
    /// Log an error at `warn` with `context`, then return the result unchanged.
    fn log_err(self, context: &str) -> Self;
}

impl<T, E: Display> ResultExt<T, E> for Result<T, E> {
    fn log_err(self, context: &str) -> Self {
        if let Err(ref e) = self {
            tracing::warn!(error = %e, "{context}");
        }
        self
    }
}
