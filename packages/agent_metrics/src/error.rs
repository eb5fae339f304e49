use thiserror::Error;

/// Errors that can occur when wiring up instruments and views at startup.
///
/// Every variant is a configuration error: none of them are expected once a process
/// has successfully started, and the host typically treats any of them as fatal.
/// The recording operations themselves have no failure mode - a measurement either
/// lands in a registered view or degrades to a no-op.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An instrument with this name has already been created in the same registry.
    #[error("instrument '{name}' is already registered")]
    DuplicateInstrument {
        /// The conflicting instrument name.
        name: String,
    },

    /// A view with this name has already been registered with the aggregation engine,
    /// or appears twice in one registration batch.
    #[error("view '{name}' is already registered")]
    DuplicateView {
        /// The conflicting view name.
        name: String,
    },

    /// The caller supplied a dimension name that is not a syntactically valid key.
    #[error("invalid dimension key '{invalid_value}': {problem}")]
    InvalidDimensionKey {
        /// The name that failed validation.
        invalid_value: String,

        /// A human-readable description of the problem.
        problem: String,
    },
}

/// A specialized `Result` type for registry operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn errors_render_the_offending_name() {
        let error = Error::DuplicateInstrument {
            name: "queued".to_string(),
        };

        assert!(error.to_string().contains("queued"));

        let error = Error::InvalidDimensionKey {
            invalid_value: "\u{1F980}".to_string(),
            problem: "not printable ASCII".to_string(),
        };

        assert!(error.to_string().contains("not printable ASCII"));
    }
}
