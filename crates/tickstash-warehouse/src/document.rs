//! Filters and sort specifications understood by every [`DocumentStore`](crate::DocumentStore).
//!
//! Documents are plain JSON objects. Field names may be dotted paths
//! (`"source.domain"`) to reach into nested objects.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Predicate over a single JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    /// Matches every document.
    All,
    /// Field equals the given value exactly.
    Eq { field: String, value: Value },
    /// Field lies inside the inclusive range. Missing bounds are open.
    Range {
        field: String,
        from: Option<Value>,
        to: Option<Value>,
    },
    /// Case-insensitive substring match against any of the listed string fields.
    ContainsText { fields: Vec<String>, needle: String },
    /// Every nested filter matches.
    And { filters: Vec<Filter> },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn between(
        field: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Self::Range {
            field: field.into(),
            from: Some(from.into()),
            to: Some(to.into()),
        }
    }

    pub fn contains_text(fields: &[&str], needle: impl Into<String>) -> Self {
        Self::ContainsText {
            fields: fields.iter().map(|field| (*field).to_owned()).collect(),
            needle: needle.into(),
        }
    }

    /// Combine filters, flattening trivial cases.
    pub fn and(filters: Vec<Filter>) -> Self {
        let mut filters = filters
            .into_iter()
            .filter(|filter| !matches!(filter, Filter::All))
            .collect::<Vec<_>>();
        match filters.len() {
            0 => Self::All,
            1 => filters.remove(0),
            _ => Self::And { filters },
        }
    }

    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Eq { field, value } => lookup(document, field) == Some(value),
            Self::Range { field, from, to } => {
                let Some(actual) = lookup(document, field) else {
                    return false;
                };
                let above_from = from.as_ref().map_or(Some(true), |bound| {
                    compare_values(actual, bound).map(|ordering| ordering != Ordering::Less)
                });
                let below_to = to.as_ref().map_or(Some(true), |bound| {
                    compare_values(actual, bound).map(|ordering| ordering != Ordering::Greater)
                });
                above_from == Some(true) && below_to == Some(true)
            }
            Self::ContainsText { fields, needle } => {
                let needle = needle.to_lowercase();
                fields.iter().any(|field| {
                    lookup(document, field)
                        .and_then(Value::as_str)
                        .is_some_and(|text| text.to_lowercase().contains(&needle))
                })
            }
            Self::And { filters } => filters.iter().all(|filter| filter.matches(document)),
        }
    }

    /// Stable identity of this filter, used as the storage key for upserts.
    ///
    /// A natural-key equality filter on a string renders as `field=value`;
    /// everything else falls back to its JSON form.
    pub fn match_key(&self) -> String {
        match self {
            Self::Eq {
                field,
                value: Value::String(value),
            } => format!("{field}={value}"),
            other => serde_json::to_string(other).unwrap_or_else(|_| format!("{other:?}")),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Single-field sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Descending,
        }
    }

    /// Documents missing the field sort last in either direction.
    pub fn compare(&self, left: &Value, right: &Value) -> Ordering {
        match (lookup(left, &self.field), lookup(right, &self.field)) {
            (Some(left), Some(right)) => {
                let ordering = compare_values(left, right).unwrap_or(Ordering::Equal);
                match self.order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Apply filter, sort and limit to an iterator of documents.
pub fn select_documents(
    documents: impl IntoIterator<Item = Value>,
    filter: &Filter,
    sort: Option<&SortSpec>,
    limit: Option<usize>,
) -> Vec<Value> {
    let mut selected = documents
        .into_iter()
        .filter(|document| filter.matches(document))
        .collect::<Vec<_>>();

    if let Some(sort) = sort {
        selected.sort_by(|left, right| sort.compare(left, right));
    }
    if let Some(limit) = limit {
        selected.truncate(limit);
    }
    selected
}

fn lookup<'a>(document: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        (Value::Number(left), Value::Number(right)) => left.as_f64()?.partial_cmp(&right.as_f64()?),
        (Value::Bool(left), Value::Bool(right)) => Some(left.cmp(right)),
        _ => None,
    }
}
