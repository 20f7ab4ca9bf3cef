//! Ordered field maps handed to the statement generators.
//!
//! A [`Payload`] distinguishes a field that was **not provided** (`None`)
//! from one explicitly set to SQL `NULL` (`Some(SqlValue::Null)`):
//!
//! - [`sanitize`] drops only fields that were not provided.
//! - [`fields`] also drops explicit nulls, leaving the values worth writing.

use crate::value::SqlValue;

/// An insertion-ordered map of column name to optional value.
///
/// # Example
///
/// ```ignore
/// use pgrepo::Payload;
///
/// let payload = Payload::new()
///     .with("name", "alice")
///     .with_null("deleted_at")
///     .without("email");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    entries: Vec<(String, Option<SqlValue>)>,
}

impl Payload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field. Replacing keeps the original position.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<SqlValue>) -> &mut Self {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Set a provided value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<SqlValue>) -> &mut Self {
        self.insert(key, Some(value.into()))
    }

    /// Set `Some(v)` as provided and `None` as not provided.
    pub fn set_opt<T: Into<SqlValue>>(
        &mut self,
        key: impl Into<String>,
        value: Option<T>,
    ) -> &mut Self {
        self.insert(key, value.map(Into::into))
    }

    /// Builder form of [`Payload::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder form setting an explicit SQL `NULL`.
    pub fn with_null(mut self, key: impl Into<String>) -> Self {
        self.insert(key, Some(SqlValue::Null));
        self
    }

    /// Builder form recording a field as not provided.
    pub fn without(mut self, key: impl Into<String>) -> Self {
        self.insert(key, None);
        self
    }

    /// Look up a field. The outer `Option` is key presence.
    pub fn get(&self, key: &str) -> Option<&Option<SqlValue>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&SqlValue>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Iterate entries whose value was provided (explicit nulls included).
    pub fn provided(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v)))
    }

    /// Column names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>> FromIterator<(K, Option<SqlValue>)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, Option<SqlValue>)>>(iter: I) -> Self {
        let mut payload = Payload::new();
        for (k, v) in iter {
            payload.insert(k, v);
        }
        payload
    }
}

/// Keep every field that was provided, including explicit nulls.
pub fn sanitize(payload: &Payload) -> Payload {
    payload
        .provided()
        .map(|(k, v)| (k, Some(v.clone())))
        .collect()
}

/// Keep only fields holding a non-null value.
pub fn fields(payload: &Payload) -> Payload {
    payload
        .provided()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k, Some(v.clone())))
        .collect()
}
