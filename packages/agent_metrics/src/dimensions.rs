use std::fmt;
use std::sync::Arc;

use crate::{Error, Result};

/// Longest allowed dimension key name, in bytes.
const MAX_KEY_LEN: usize = 255;

/// A named axis used to group aggregated measurements, such as an application or
/// function identity.
///
/// Keys are validated once at creation and act purely as lookup and grouping tokens
/// afterwards - a key never owns or mutates any recorded state. Cloning is cheap,
/// so the same key can be held by the view registry and by every context builder
/// that tags measurements with it.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DimensionKey {
    name: Arc<str>,
}

impl DimensionKey {
    /// Creates a validated dimension key.
    ///
    /// A valid key name is non-empty, at most 255 bytes long and consists of
    /// printable ASCII characters only.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();

        if name.is_empty() {
            return Err(invalid(name, "must not be empty"));
        }

        if name.len() > MAX_KEY_LEN {
            return Err(invalid(name, "must be at most 255 bytes"));
        }

        if !name.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
            return Err(invalid(name, "must be printable ASCII"));
        }

        Ok(Self { name: name.into() })
    }

    /// The validated name of the key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn invalid(name: &str, problem: &str) -> Error {
    Error::InvalidDimensionKey {
        invalid_value: name.to_string(),
        problem: problem.to_string(),
    }
}

/// Resolves an ordered list of dimension names into validated keys.
///
/// Input order is preserved, so view dimension ordering is deterministic.
/// Fails on the first name that is not a syntactically valid key; this is a
/// startup configuration error and nothing is partially resolved.
pub fn resolve_dimension_keys<S: AsRef<str>>(names: &[S]) -> Result<Vec<DimensionKey>> {
    names.iter().map(DimensionKey::new).collect()
}

/// The ambient dimensional context carried with a call or container operation.
///
/// A context is an immutable ordered set of `(key, value)` pairs. It is built once
/// when the call is admitted and then accompanies the call through every recording
/// operation, so cloning must stay cheap - the pairs live behind a shared `Arc`.
///
/// Views extract only the values of their own dimension keys from the context;
/// a key that is absent from the context groups under the empty value.
#[derive(Clone, Debug, Default)]
pub struct DimensionContext {
    values: Arc<[(DimensionKey, String)]>,
}

impl DimensionContext {
    /// Creates a new context builder.
    #[must_use]
    pub fn builder() -> DimensionContextBuilder {
        DimensionContextBuilder { values: Vec::new() }
    }

    /// A context carrying no dimension values.
    ///
    /// Measurements recorded with it aggregate under empty dimension values.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The value this context carries for `key`, if any.
    #[must_use]
    pub fn value_of(&self, key: &DimensionKey) -> Option<&str> {
        self.values
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Creates instances of [`DimensionContext`].
#[derive(Debug, Default)]
pub struct DimensionContextBuilder {
    values: Vec<(DimensionKey, String)>,
}

impl DimensionContextBuilder {
    /// Sets the value carried for `key`, replacing any value set earlier
    /// for the same key.
    #[must_use]
    pub fn dimension(mut self, key: &DimensionKey, value: impl Into<String>) -> Self {
        let value = value.into();

        if let Some(slot) = self
            .values
            .iter_mut()
            .find(|(candidate, _)| candidate == key)
        {
            slot.1 = value;
        } else {
            self.values.push((key.clone(), value));
        }

        self
    }

    /// Builds the immutable context.
    #[must_use]
    pub fn build(self) -> DimensionContext {
        DimensionContext {
            values: self.values.into(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(DimensionContext: Send, Sync);
    assert_impl_all!(DimensionKey: Send, Sync);

    #[test]
    fn valid_keys_are_accepted() {
        assert!(DimensionKey::new("appname").is_ok());
        assert!(DimensionKey::new("fn_id").is_ok());
        assert!(DimensionKey::new("a").is_ok());
        assert!(DimensionKey::new("key with spaces").is_ok());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(DimensionKey::new("").is_err());
    }

    #[test]
    fn oversized_key_is_rejected() {
        let name = "k".repeat(MAX_KEY_LEN + 1);
        assert!(DimensionKey::new(name).is_err());

        let name = "k".repeat(MAX_KEY_LEN);
        assert!(DimensionKey::new(name).is_ok());
    }

    #[test]
    fn non_ascii_key_is_rejected() {
        assert!(DimensionKey::new("app\u{e9}").is_err());
        assert!(DimensionKey::new("tab\there").is_err());
    }

    #[test]
    fn resolve_preserves_input_order() {
        let keys = resolve_dimension_keys(&["appname", "fnname", "zone"]).unwrap();

        let names = keys.iter().map(DimensionKey::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["appname", "fnname", "zone"]);
    }

    #[test]
    fn resolve_fails_on_any_invalid_name() {
        assert!(resolve_dimension_keys(&["appname", ""]).is_err());
    }

    #[test]
    fn context_returns_values_by_key() {
        let app = DimensionKey::new("appname").unwrap();
        let func = DimensionKey::new("fnname").unwrap();
        let other = DimensionKey::new("zone").unwrap();

        let context = DimensionContext::builder()
            .dimension(&app, "myapp")
            .dimension(&func, "myfn")
            .build();

        assert_eq!(context.value_of(&app), Some("myapp"));
        assert_eq!(context.value_of(&func), Some("myfn"));
        assert_eq!(context.value_of(&other), None);
    }

    #[test]
    fn builder_replaces_value_for_same_key() {
        let app = DimensionKey::new("appname").unwrap();

        let context = DimensionContext::builder()
            .dimension(&app, "first")
            .dimension(&app, "second")
            .build();

        assert_eq!(context.value_of(&app), Some("second"));
    }

    #[test]
    fn empty_context_carries_nothing() {
        let app = DimensionKey::new("appname").unwrap();

        assert_eq!(DimensionContext::empty().value_of(&app), None);
    }
}
