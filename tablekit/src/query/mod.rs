//! Query model
//!
//! A [`Query`] is the canonical mapping of filter/search field names to
//! current values driving a table's data request. Values are modeled by
//! [`QueryValue`], a small tagged enum covering everything the engine can
//! round-trip through a URL query string.

mod codec;
mod normalize;

pub use codec::*;
pub use normalize::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single query field value.
///
/// `Null` and the empty string are "empty sentinels": normalization erases
/// fields holding them so that semantically identical queries serialize
/// identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// Absent/cleared value; erased by normalization.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value; `""` is erased by normalization.
    Str(String),
    /// Multi-valued field (repeated URL keys).
    List(Vec<QueryValue>),
    /// Nested object; normalization recurses into it.
    Map(BTreeMap<String, QueryValue>),
}

impl QueryValue {
    /// Returns `true` for values normalization erases outright.
    pub fn is_empty_sentinel(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Str(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Returns `true` for `Int` and `Float` values.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Numeric view of the value, when it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrowed string view, when the value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrowed list view, when the value is a list.
    pub fn as_list(&self) -> Option<&[QueryValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The value rendered as a single URL parameter string.
    ///
    /// Lists and maps are not representable as one parameter; the sync
    /// engine expands lists into repeated keys and serializes maps as JSON
    /// before calling this.
    pub fn to_param_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
            Self::Str(s) => s.clone(),
            Self::List(_) | Self::Map(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for QueryValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for QueryValue {
    fn from(n: i32) -> Self {
        Self::Int(n as i64)
    }
}

impl From<f64> for QueryValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for QueryValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<V: Into<QueryValue>> From<Vec<V>> for QueryValue {
    fn from(items: Vec<V>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// An ordered query object.
///
/// Backed by a `BTreeMap` so field order can never influence equality or
/// serialization, which is one half of the normalization invariant; the other half
/// (array order, empty sentinels) is handled by [`normalize`].
///
/// # Example
///
/// ```
/// use tablekit::query::{Query, QueryValue};
///
/// let query = Query::new()
///     .with("agent_type", vec!["a", "b"])
///     .with("show_status", "active");
/// assert_eq!(query.get("show_status"), Some(&QueryValue::from("active")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(BTreeMap<String, QueryValue>);

impl Query {
    /// Creates an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Inserts a field, replacing any previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.insert(field.into(), value.into());
    }

    /// Removes a field, returning its previous value.
    pub fn remove(&mut self, field: &str) -> Option<QueryValue> {
        self.0.remove(field)
    }

    /// Looks up a field.
    pub fn get(&self, field: &str) -> Option<&QueryValue> {
        self.0.get(field)
    }

    /// Merges `other` into `self`, field by field (last write wins).
    pub fn merge(&mut self, other: Query) {
        for (field, value) in other.0 {
            self.0.insert(field, value);
        }
    }

    /// Returns `true` when no fields are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &QueryValue)> {
        self.0.iter()
    }

    /// Consumes the query into its backing map.
    pub fn into_inner(self) -> BTreeMap<String, QueryValue> {
        self.0
    }
}

impl From<BTreeMap<String, QueryValue>> for Query {
    fn from(map: BTreeMap<String, QueryValue>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, QueryValue)> for Query {
    fn from_iter<I: IntoIterator<Item = (String, QueryValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Query {
    type Item = (String, QueryValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, QueryValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
