use std::borrow::Cow;

use indexmap::map::{IndexMap, Iter};

use serde::{Deserialize, Serialize};

/// Validation failures grouped by the name of the offending field.
///
/// Fields keep their insertion order, and so do the messages attached to
/// each field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(IndexMap<Cow<'static, str>, Vec<Cow<'static, str>>>);

impl ValidationErrors {
    /// Creates an empty [`ValidationErrors`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a [`ValidationErrors`] holding a single message for `field`.
    #[must_use]
    pub fn field(
        field: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new().insert(field, message)
    }

    /// Adds a message for `field`.
    #[must_use]
    pub fn insert(
        mut self,
        field: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.0
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Returns the messages attached to `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[Cow<'static, str>]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Whether `field` has at least one message.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Returns an iterator over the names of the offending fields.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(AsRef::as_ref)
    }

    /// Whether there are no validation failures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of offending fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns an iterator over fields and their messages.
    pub fn iter(&self) -> Iter<'_, Cow<'static, str>, Vec<Cow<'static, str>>> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = (&'a Cow<'static, str>, &'a Vec<Cow<'static, str>>);
    type IntoIter = Iter<'a, Cow<'static, str>, Vec<Cow<'static, str>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, (field, messages)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {}", messages.join(" "))?;
        }
        Ok(())
    }
}
