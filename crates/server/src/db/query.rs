//! Collection queries: equality filters plus a single ordering field.

use std::cmp::Ordering;

use serde_json::Value;

use super::document::Document;

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub(crate) const fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Equality filter on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

/// A query against one collection.
///
/// Documents missing the ordering field are excluded from ordered results.
/// Ties are broken by document id so results are deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    id: Option<String>,
    filters: Vec<Filter>,
    order_by: Option<(String, Direction)>,
    limit: Option<usize>,
}

impl Query {
    /// Match every document in `collection`.
    #[must_use]
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: None,
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Match a single document by id.
    #[must_use]
    pub fn document(collection: impl Into<String>, id: impl Into<String>) -> Self {
        let mut query = Self::collection(collection);
        query.id = Some(id.into());
        query
    }

    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn document_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn ordering(&self) -> Option<(&str, Direction)> {
        self.order_by.as_ref().map(|(f, d)| (f.as_str(), *d))
    }

    #[must_use]
    pub const fn max_results(&self) -> Option<usize> {
        self.limit
    }

    /// Returns `true` if `doc` passes the id and field filters.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(id) = &self.id
            && &doc.id != id
        {
            return false;
        }
        if let Some((field, _)) = &self.order_by
            && !doc.data.contains_key(field)
        {
            return false;
        }
        self.filters
            .iter()
            .all(|f| doc.data.get(&f.field) == Some(&f.value))
    }

    /// Filter, order and limit an unordered candidate set.
    #[must_use]
    pub fn apply(&self, candidates: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut docs: Vec<Document> = candidates.into_iter().filter(|d| self.matches(d)).collect();

        match &self.order_by {
            Some((field, direction)) => docs.sort_by(|a, b| {
                let ord = compare_values(a.data.get(field), b.data.get(field));
                let ord = match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                };
                ord.then_with(|| a.id.cmp(&b.id))
            }),
            None => docs.sort_by(|a, b| a.id.cmp(&b.id)),
        }

        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }
        docs
    }
}

/// Total order over field values: null < bool < number < string < other.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    const fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => {
                let x = x.as_f64().unwrap_or(0.0);
                let y = y.as_f64().unwrap_or(0.0);
                x.total_cmp(&y)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::document::Fields;

    fn doc(id: &str, fields: Value) -> Document {
        let data: Fields = match fields {
            Value::Object(map) => map,
            _ => Fields::new(),
        };
        Document {
            id: id.to_owned(),
            data,
        }
    }

    #[test]
    fn test_equality_filter() {
        let q = Query::collection("ratings").where_eq("storeId", "s1");
        assert!(q.matches(&doc("a", json!({"storeId": "s1"}))));
        assert!(!q.matches(&doc("b", json!({"storeId": "s2"}))));
        assert!(!q.matches(&doc("c", json!({}))));
    }

    #[test]
    fn test_document_query_matches_only_id() {
        let q = Query::document("stores", "x");
        assert!(q.matches(&doc("x", json!({}))));
        assert!(!q.matches(&doc("y", json!({}))));
    }

    #[test]
    fn test_order_descending_with_id_tiebreak() {
        let q = Query::collection("ratings").order_by("createdAt", Direction::Descending);
        let out = q.apply(vec![
            doc("b", json!({"createdAt": "2025-01-01T00:00:00.000000Z"})),
            doc("a", json!({"createdAt": "2025-01-01T00:00:00.000000Z"})),
            doc("c", json!({"createdAt": "2025-02-01T00:00:00.000000Z"})),
            doc("d", json!({})),
        ]);
        let ids: Vec<_> = out.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_numeric_order_and_limit() {
        let q = Query::collection("ratings")
            .order_by("rating", Direction::Ascending)
            .limit(2);
        let out = q.apply(vec![
            doc("a", json!({"rating": 5})),
            doc("b", json!({"rating": 1.5})),
            doc("c", json!({"rating": 3})),
        ]);
        let ids: Vec<_> = out.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_unordered_results_sorted_by_id() {
        let q = Query::collection("stores");
        let out = q.apply(vec![doc("z", json!({})), doc("m", json!({}))]);
        assert_eq!(out.first().map(|d| d.id.as_str()), Some("m"));
    }
}
