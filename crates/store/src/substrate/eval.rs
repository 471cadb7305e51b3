//! Search and aggregation over a set of documents, shared by the substrates.

use super::filter::Filter;
use super::{
    AggregateRow, AggregateStep, Aggregation, ApplyExpr, Document, FieldKind, IndexDefinition,
    Reducer, RowFilter, SearchQuery, SearchResult, SortField,
};
use crate::error::{StoreError, StoreResult};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Run a search over `documents`, which must be in key order.
pub(crate) fn search<'a, I>(
    index: &IndexDefinition,
    documents: I,
    query: &SearchQuery,
) -> StoreResult<SearchResult>
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let filter = Filter::parse(&query.filter)?;
    filter.check(index)?;

    let mut matched: Vec<(&String, &Value)> = documents
        .into_iter()
        .filter(|(key, value)| index.covers(key) && filter.matches(index, value))
        .collect();

    if let Some(sort) = &query.sort_by {
        let schema = index
            .field(&sort.field)
            .ok_or_else(|| StoreError::Query(format!("unknown sort field @{}", sort.field)))?;
        // stable: ties keep key order
        matched.sort_by(|(_, a), (_, b)| {
            let ordering = compare_values(
                sort_key(schema.kind, schema.resolve(a)),
                sort_key(schema.kind, schema.resolve(b)),
            );
            if sort.ascending { ordering } else { ordering.reverse() }
        });
    }

    let total = matched.len();
    let documents = matched
        .into_iter()
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .map(|(key, value)| Document {
            key: key.clone(),
            value: (!query.no_content).then(|| value.clone()),
        })
        .collect();

    Ok(SearchResult { total, documents })
}

struct Row<'a> {
    key: Option<String>,
    fields: Map<String, Value>,
    source: Option<&'a Value>,
    load_document: bool,
}

impl Row<'_> {
    fn get(&self, index: &IndexDefinition, field: &str) -> Option<Value> {
        if let Some(value) = self.fields.get(field) {
            return Some(value.clone());
        }
        let schema = index.field(field)?;
        self.source.and_then(|doc| schema.resolve(doc)).cloned()
    }
}

/// Run an aggregation over `documents`, which must be in key order.
pub(crate) fn aggregate<'a, I>(
    index: &IndexDefinition,
    documents: I,
    aggregation: &Aggregation,
) -> StoreResult<Vec<AggregateRow>>
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let filter = Filter::parse(&aggregation.filter)?;
    filter.check(index)?;

    let mut rows: Vec<Row<'a>> = documents
        .into_iter()
        .filter(|(key, value)| index.covers(key) && filter.matches(index, value))
        .map(|(key, value)| Row {
            key: Some(key.clone()),
            fields: Map::new(),
            source: Some(value),
            load_document: false,
        })
        .collect();

    for step in &aggregation.steps {
        match step {
            AggregateStep::LoadAll => {
                for row in &mut rows {
                    row.load_document = row.source.is_some();
                }
            }
            AggregateStep::Load(fields) => {
                for row in &mut rows {
                    for field in fields {
                        if let Some(value) = row.get(index, field) {
                            row.fields.insert(field.clone(), value);
                        }
                    }
                }
            }
            AggregateStep::Apply { expr, alias } => {
                for row in &mut rows {
                    let value = apply(index, row, expr);
                    row.fields.insert(alias.clone(), value);
                }
            }
            AggregateStep::Filter(RowFilter::Exists(field)) => {
                rows.retain(|row| row.get(index, field).is_some());
            }
            AggregateStep::GroupBy { fields, reducers } => {
                rows = group_by(index, rows, fields, reducers);
            }
            AggregateStep::SortBy(sort) => {
                rows.sort_by(|a, b| compare_rows(index, a, b, sort));
            }
            AggregateStep::Limit { offset, count } => {
                rows = rows.into_iter().skip(*offset).take(*count).collect();
            }
        }
    }

    Ok(rows
        .into_iter()
        .map(|row| AggregateRow {
            document: if row.load_document {
                row.source.cloned()
            } else {
                None
            },
            key: row.key,
            fields: row.fields,
        })
        .collect())
}

fn apply(index: &IndexDefinition, row: &Row<'_>, expr: &ApplyExpr) -> Value {
    match expr {
        ApplyExpr::Format { template, fields } => {
            let mut values = fields.iter().map(|field| match row.get(index, field) {
                Some(Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => String::new(),
            });
            let mut out = String::with_capacity(template.len());
            let mut parts = template.split("%s").peekable();
            while let Some(part) = parts.next() {
                out.push_str(part);
                if parts.peek().is_some() {
                    out.push_str(&values.next().unwrap_or_default());
                }
            }
            Value::String(out)
        }
    }
}

fn group_by<'a>(
    index: &IndexDefinition,
    rows: Vec<Row<'a>>,
    fields: &[String],
    reducers: &[Reducer],
) -> Vec<Row<'a>> {
    // groups keep first-seen order
    let mut groups: Vec<(Vec<Value>, u64)> = Vec::new();
    for row in &rows {
        let values: Vec<Value> = fields
            .iter()
            .map(|field| row.get(index, field).unwrap_or(Value::Null))
            .collect();
        match groups.iter_mut().find(|(existing, _)| *existing == values) {
            Some((_, count)) => *count += 1,
            None => groups.push((values, 1)),
        }
    }

    groups
        .into_iter()
        .map(|(values, count)| {
            let mut out = Map::new();
            for (field, value) in fields.iter().zip(values) {
                out.insert(field.clone(), value);
            }
            for reducer in reducers {
                match reducer {
                    Reducer::Count { alias } => {
                        out.insert(alias.clone(), Value::from(count));
                    }
                }
            }
            Row {
                key: None,
                fields: out,
                source: None,
                load_document: false,
            }
        })
        .collect()
}

fn compare_rows(index: &IndexDefinition, a: &Row<'_>, b: &Row<'_>, sort: &[SortField]) -> Ordering {
    for field in sort {
        let kind = index
            .field(&field.field)
            .map(|schema| schema.kind)
            .unwrap_or(FieldKind::Tag);
        let left = a.get(index, &field.field);
        let right = b.get(index, &field.field);
        let ordering = compare_values(sort_key(kind, left.as_ref()), sort_key(kind, right.as_ref()));
        let ordering = if field.ascending {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

enum SortKey {
    Number(f64),
    Text(String),
    Missing,
}

fn sort_key(kind: FieldKind, value: Option<&Value>) -> SortKey {
    match (kind, value) {
        (_, None) | (_, Some(Value::Null)) => SortKey::Missing,
        (FieldKind::Numeric, Some(Value::Number(n))) => {
            n.as_f64().map_or(SortKey::Missing, SortKey::Number)
        }
        (FieldKind::Numeric, Some(Value::String(s))) => {
            s.parse().map_or(SortKey::Missing, SortKey::Number)
        }
        (_, Some(Value::Number(n))) => n.as_f64().map_or(SortKey::Missing, SortKey::Number),
        (_, Some(Value::String(s))) => SortKey::Text(s.to_lowercase()),
        (_, Some(other)) => SortKey::Text(other.to_string()),
    }
}

// Missing values sort after present ones.
fn compare_values(a: SortKey, b: SortKey) -> Ordering {
    match (a, b) {
        (SortKey::Number(x), SortKey::Number(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(&y),
        (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
        (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        (SortKey::Missing, SortKey::Missing) => Ordering::Equal,
        (SortKey::Missing, _) => Ordering::Greater,
        (_, SortKey::Missing) => Ordering::Less,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substrate::SchemaField;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn index() -> IndexDefinition {
        IndexDefinition::new(
            "q:",
            vec![
                SchemaField::sortable_tag("id"),
                SchemaField::sortable_tag("groupId"),
                SchemaField::sortable_tag("artifactId"),
                SchemaField::sortable_numeric("eventPriority"),
                SchemaField::sortable_numeric("created"),
            ],
        )
    }

    fn docs() -> BTreeMap<String, Value> {
        let mut docs = BTreeMap::new();
        docs.insert(
            "q:1".to_string(),
            json!({"id": "q:1", "groupId": "g", "artifactId": "a", "eventPriority": 2, "created": 1}),
        );
        docs.insert(
            "q:2".to_string(),
            json!({"id": "q:2", "groupId": "g", "artifactId": "a", "eventPriority": 1, "created": 3}),
        );
        docs.insert(
            "q:3".to_string(),
            json!({"groupId": "h", "artifactId": "b", "eventPriority": 1, "created": 2}),
        );
        docs.insert("other:1".to_string(), json!({"groupId": "g"}));
        docs
    }

    #[test]
    fn test_search_skips_keys_outside_the_prefix() {
        let docs = docs();
        let result = search(&index(), &docs, &SearchQuery::new("@groupId:{ g }")).unwrap();
        assert_eq!(result.total, 2);
        assert!(result.documents.iter().all(|d| d.key.starts_with("q:")));
    }

    #[test]
    fn test_search_limit_reports_full_total() {
        let docs = docs();
        let result = search(&index(), &docs, &SearchQuery::all().limit(0, 0)).unwrap();
        assert_eq!(result.total, 3);
        assert!(result.documents.is_empty());
    }

    #[test]
    fn test_search_sorts_numerically() {
        let docs = docs();
        let query = SearchQuery::all().sort_by(SortField::desc("created")).no_content();
        let keys: Vec<_> = search(&index(), &docs, &query)
            .unwrap()
            .documents
            .into_iter()
            .map(|d| {
                assert!(d.value.is_none());
                d.key
            })
            .collect();
        assert_eq!(keys, vec!["q:2", "q:3", "q:1"]);
    }

    #[test]
    fn test_aggregate_filters_and_sorts_by_two_fields() {
        let docs = docs();
        let aggregation = Aggregation::new("*")
            .load_all()
            .filter_exists("id")
            .sort_by(vec![SortField::asc("eventPriority"), SortField::asc("created")]);
        let rows = aggregate(&index(), &docs, &aggregation).unwrap();
        let keys: Vec<_> = rows.iter().filter_map(|r| r.key.clone()).collect();
        assert_eq!(keys, vec!["q:2", "q:1"]);
        assert!(rows.iter().all(|r| r.document.is_some()));
    }

    #[test]
    fn test_aggregate_groups_synthesised_coordinates() {
        let docs = docs();
        let aggregation = Aggregation::new("*")
            .apply_format("%s:%s", &["groupId", "artifactId"], "coordinate")
            .group_by_count(&["coordinate"], "count");
        let rows = aggregate(&index(), &docs, &aggregation).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields["coordinate"], "g:a");
        assert_eq!(rows[0].fields["count"], 2);
        assert_eq!(rows[1].fields["coordinate"], "h:b");
        assert!(rows[0].key.is_none());
    }
}
