//! Per-field URL decode functions
//!
//! The sync engine parses the address bar back into a typed [`Query`]
//! through a codec: each registered field gets a decode function, and any
//! URL key without one falls back to identity (raw string passthrough) so
//! ad-hoc params still populate the query instead of being silently dropped.

use std::collections::HashMap;
use std::sync::Arc;

use super::QueryValue;

/// A decode function from one raw URL value to a typed query value.
pub type DecodeFn = Arc<dyn Fn(&str) -> QueryValue + Send + Sync>;

/// Registry of per-field decode functions.
///
/// # Example
///
/// ```
/// use tablekit::query::{QueryCodec, QueryValue};
///
/// let codec = QueryCodec::new()
///     .field_int("current")
///     .field_bool("archived");
/// assert_eq!(codec.decode("current", "3"), QueryValue::Int(3));
/// assert_eq!(codec.decode("unknown", "raw"), QueryValue::from("raw"));
/// ```
#[derive(Clone, Default)]
pub struct QueryCodec {
    decoders: HashMap<String, DecodeFn>,
}

impl QueryCodec {
    /// Creates an empty codec; every field decodes as a raw string.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom decode function for a field.
    pub fn field(mut self, name: impl Into<String>, decode: DecodeFn) -> Self {
        self.decoders.insert(name.into(), decode);
        self
    }

    /// Registers an integer decoder. Unparseable values fall back to the
    /// raw string.
    pub fn field_int(self, name: impl Into<String>) -> Self {
        self.field(
            name,
            Arc::new(|raw| match raw.parse::<i64>() {
                Ok(n) => QueryValue::Int(n),
                Err(_) => {
                    log::debug!("query codec: not an integer: {raw:?}");
                    QueryValue::Str(raw.to_string())
                }
            }),
        )
    }

    /// Registers a float decoder. Unparseable values fall back to the raw
    /// string.
    pub fn field_float(self, name: impl Into<String>) -> Self {
        self.field(
            name,
            Arc::new(|raw| match raw.parse::<f64>() {
                Ok(n) => QueryValue::Float(n),
                Err(_) => {
                    log::debug!("query codec: not a float: {raw:?}");
                    QueryValue::Str(raw.to_string())
                }
            }),
        )
    }

    /// Registers a boolean decoder accepting `true`/`false`/`1`/`0`.
    pub fn field_bool(self, name: impl Into<String>) -> Self {
        self.field(
            name,
            Arc::new(|raw| match raw {
                "true" | "1" => QueryValue::Bool(true),
                "false" | "0" => QueryValue::Bool(false),
                other => {
                    log::debug!("query codec: not a boolean: {other:?}");
                    QueryValue::Str(other.to_string())
                }
            }),
        )
    }

    /// Registers a comma-separated list decoder.
    ///
    /// A list-returning decoder replaces the repeated-key accumulator
    /// instead of being appended to it.
    pub fn field_csv(self, name: impl Into<String>) -> Self {
        self.field(
            name,
            Arc::new(|raw| {
                QueryValue::List(
                    raw.split(',')
                        .filter(|part| !part.is_empty())
                        .map(QueryValue::from)
                        .collect(),
                )
            }),
        )
    }

    /// Returns `true` when the field has a registered decoder.
    pub fn has(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    /// Decodes one raw value for a field, falling back to identity.
    pub fn decode(&self, name: &str, raw: &str) -> QueryValue {
        match self.decoders.get(name) {
            Some(decode) => decode(raw),
            None => QueryValue::Str(raw.to_string()),
        }
    }
}

impl std::fmt::Debug for QueryCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        fields.sort_unstable();
        f.debug_struct("QueryCodec").field("fields", &fields).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_fallback() {
        let codec = QueryCodec::new();
        assert_eq!(codec.decode("anything", "as-is"), QueryValue::from("as-is"));
    }

    #[test]
    fn test_int_decoder_with_fallback() {
        let codec = QueryCodec::new().field_int("current");
        assert_eq!(codec.decode("current", "7"), QueryValue::Int(7));
        assert_eq!(codec.decode("current", "x"), QueryValue::from("x"));
    }

    #[test]
    fn test_bool_decoder() {
        let codec = QueryCodec::new().field_bool("archived");
        assert_eq!(codec.decode("archived", "true"), QueryValue::Bool(true));
        assert_eq!(codec.decode("archived", "0"), QueryValue::Bool(false));
    }

    #[test]
    fn test_csv_decoder_returns_list() {
        let codec = QueryCodec::new().field_csv("tags");
        assert_eq!(
            codec.decode("tags", "a,b"),
            QueryValue::from(vec!["a", "b"])
        );
    }
}
