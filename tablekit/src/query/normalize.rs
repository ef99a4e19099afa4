//! Query normalization
//!
//! Canonicalizes a query object so that semantically identical queries
//! produce identical serialized forms. The sync engine's loop-breaker
//! depends on this: it compares normalized queries to decide whether a URL
//! write is a real change.

use std::cmp::Ordering;

use super::{Query, QueryValue};

/// Canonicalizes a query.
///
/// - Fields holding `Null` or `""` are dropped.
/// - List fields are filtered of empty elements, then sorted (numeric
///   comparator when both sides are numeric, lexicographic otherwise);
///   a list left empty after filtering drops the whole field.
/// - Map fields are normalized recursively; an empty result drops the field.
/// - Everything else passes through unchanged.
///
/// The output is deterministic regardless of input field order, array order,
/// or the presence of empty sentinels, and `normalize` is idempotent.
pub fn normalize(query: &Query) -> Query {
    query
        .iter()
        .filter_map(|(field, value)| {
            normalize_value(value).map(|v| (field.clone(), v))
        })
        .collect()
}

fn normalize_value(value: &QueryValue) -> Option<QueryValue> {
    if value.is_empty_sentinel() {
        return None;
    }
    match value {
        QueryValue::List(items) => {
            let mut kept: Vec<QueryValue> =
                items.iter().filter_map(normalize_value).collect();
            if kept.is_empty() {
                return None;
            }
            kept.sort_by(compare_values);
            Some(QueryValue::List(kept))
        }
        QueryValue::Map(fields) => {
            let nested: Query = fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let normalized = normalize(&nested);
            if normalized.is_empty() {
                return None;
            }
            Some(QueryValue::Map(normalized.into_inner()))
        }
        other => Some(other.clone()),
    }
}

/// List element ordering: numeric when both sides are numeric, else by the
/// elements' parameter-string forms.
fn compare_values(a: &QueryValue, b: &QueryValue) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.to_param_string().cmp(&b.to_param_string()),
    }
}

/// Canonical string form of a set of URL query pairs.
///
/// Sorts entries by key, then value, drops empty-string values, and joins
/// them percent-encoded. Two URLs carrying the same parameters in any order
/// canonicalize to the same string, which is what the sync engine compares
/// before rewriting the address bar.
pub fn canonical_params(pairs: &[(String, String)]) -> String {
    let mut kept: Vec<&(String, String)> =
        pairs.iter().filter(|(_, v)| !v.is_empty()).collect();
    kept.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    kept.iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Query {
        Query::new()
            .with("agent_type", vec!["b", "a"])
            .with("blank", "")
            .with("missing", QueryValue::Null)
            .with("page_size", 20)
    }

    #[test]
    fn test_idempotence() {
        let q = sample();
        let once = normalize(&q);
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_array_order_invariance() {
        let a = Query::new().with("agent_type", vec!["a", "b", "c"]);
        let b = Query::new().with("agent_type", vec!["c", "a", "b"]);
        assert_eq!(normalize(&a), normalize(&b));
    }

    #[test]
    fn test_empty_value_erasure() {
        let normalized = normalize(&sample());
        assert!(normalized.get("blank").is_none());
        assert!(normalized.get("missing").is_none());
        assert!(normalized.get("agent_type").is_some());
        assert!(normalized.get("page_size").is_some());
    }

    #[test]
    fn test_list_of_empties_drops_field() {
        let q = Query::new().with(
            "tags",
            QueryValue::List(vec![QueryValue::Null, QueryValue::from("")]),
        );
        assert!(normalize(&q).is_empty());
    }

    #[test]
    fn test_numeric_sort_is_numeric_not_lexicographic() {
        let q = Query::new().with("ids", vec![10, 2, 33]);
        let normalized = normalize(&q);
        assert_eq!(
            normalized.get("ids"),
            Some(&QueryValue::from(vec![2, 10, 33]))
        );
    }

    #[test]
    fn test_mixed_list_sorts_by_string_form() {
        let q = Query::new().with(
            "mixed",
            QueryValue::List(vec![QueryValue::from("b"), QueryValue::Int(1)]),
        );
        let normalized = normalize(&q);
        assert_eq!(
            normalized.get("mixed"),
            Some(&QueryValue::List(vec![
                QueryValue::Int(1),
                QueryValue::from("b")
            ]))
        );
    }

    #[test]
    fn test_nested_map_recursion() {
        let inner = Query::new().with("keep", 1).with("drop", "");
        let q = Query::new().with("range", QueryValue::Map(inner.into_inner()));
        let normalized = normalize(&q);
        let expected = Query::new().with("keep", 1);
        assert_eq!(
            normalized.get("range"),
            Some(&QueryValue::Map(expected.into_inner()))
        );
    }

    #[test]
    fn test_empty_nested_map_drops_field() {
        let inner = Query::new().with("drop", "");
        let q = Query::new().with("range", QueryValue::Map(inner.into_inner()));
        assert!(normalize(&q).is_empty());
    }

    #[test]
    fn test_canonical_params_sorted_and_filtered() {
        let pairs = vec![
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
            ("empty".to_string(), String::new()),
            ("a".to_string(), "0".to_string()),
        ];
        assert_eq!(canonical_params(&pairs), "a=0&a=1&b=2");
    }
}
