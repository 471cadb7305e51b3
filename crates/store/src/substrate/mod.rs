//! Document substrate abstraction.
//!
//! A substrate holds JSON documents under string keys and maintains
//! secondary indexes over key prefixes. It provides exactly the primitives the
//! document engine builds on:
//! - conditional single-key writes (`SetMode::IfAbsent`)
//! - atomic single-key delete returning the removed count
//! - filtered, sorted, paginated search over an index
//! - aggregation pipelines (field synthesis, group-by, count reducers)

mod eval;
pub mod filter;
pub mod memory;
pub mod sqlite;
pub mod traced;

pub use memory::MemorySubstrate;
pub use sqlite::SqliteSubstrate;
pub use traced::TracedSubstrate;

use crate::error::StoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Indexed field type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Exact, prefix and negated matching.
    Tag,
    /// Numeric range matching.
    Numeric,
}

/// One field of an index schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// JSON path of the value, e.g. `$.entity.path`.
    pub path: String,
    /// Name the field is queried by.
    pub alias: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub sortable: bool,
    /// Tag comparison is case-insensitive unless set.
    #[serde(default)]
    pub case_sensitive: bool,
}

impl SchemaField {
    pub fn tag(path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alias: alias.into(),
            kind: FieldKind::Tag,
            sortable: false,
            case_sensitive: false,
        }
    }

    pub fn numeric(path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alias: alias.into(),
            kind: FieldKind::Numeric,
            sortable: false,
            case_sensitive: false,
        }
    }

    /// Sortable tag field on a top-level attribute of the same name.
    pub fn sortable_tag(name: &str) -> Self {
        Self::tag(format!("$.{name}"), name).sortable()
    }

    /// Sortable numeric field on a top-level attribute of the same name.
    pub fn sortable_numeric(name: &str) -> Self {
        Self::numeric(format!("$.{name}"), name).sortable()
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    /// Resolve this field in a document.
    pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        let path = self.path.strip_prefix("$.").unwrap_or(&self.path);
        path.split('.')
            .try_fold(document, |value, segment| value.get(segment))
            .filter(|value| !value.is_null())
    }

    /// Tag values of this field in a document. Arrays index every element.
    pub fn tag_values(&self, document: &Value) -> Vec<String> {
        match self.resolve(document) {
            Some(Value::Array(items)) => items.iter().filter_map(tag_text).collect(),
            Some(value) => tag_text(value).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Numeric value of this field in a document.
    pub fn numeric_value(&self, document: &Value) -> Option<f64> {
        match self.resolve(document)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

fn tag_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Secondary index over every document whose key starts with `prefix`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub prefix: String,
    pub fields: Vec<SchemaField>,
}

impl IndexDefinition {
    pub fn new(prefix: impl Into<String>, fields: Vec<SchemaField>) -> Self {
        Self {
            prefix: prefix.into(),
            fields,
        }
    }

    pub fn field(&self, alias: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.alias == alias)
    }

    pub fn covers(&self, key: &str) -> bool {
        key.starts_with(&self.prefix)
    }
}

/// Write behaviour for `json_set`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetMode {
    /// Create or replace.
    Always,
    /// Write only when the key is absent.
    IfAbsent,
}

/// Sort key for searches and aggregations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub ascending: bool,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// A search request against one index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    pub filter: String,
    pub offset: usize,
    /// Maximum number of documents to return. `None` returns every match.
    pub limit: Option<usize>,
    pub sort_by: Option<SortField>,
    /// Return keys only.
    pub no_content: bool,
}

impl SearchQuery {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            offset: 0,
            limit: None,
            sort_by: None,
            no_content: false,
        }
    }

    /// Query matching every document of the index.
    pub fn all() -> Self {
        Self::new(crate::query::WILDCARD)
    }

    pub fn limit(mut self, offset: usize, count: usize) -> Self {
        self.offset = offset;
        self.limit = Some(count);
        self
    }

    pub fn sort_by(mut self, sort: SortField) -> Self {
        self.sort_by = Some(sort);
        self
    }

    pub fn no_content(mut self) -> Self {
        self.no_content = true;
        self
    }
}

/// A matched document.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub key: String,
    /// Absent for `no_content` searches.
    pub value: Option<Value>,
}

/// Search response: total match count plus the requested window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchResult {
    pub total: usize,
    pub documents: Vec<Document>,
}

/// Synthesised field expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyExpr {
    /// Replace each `%s` in `template` with the next field's value.
    Format { template: String, fields: Vec<String> },
}

/// Aggregation row filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowFilter {
    /// The field has a value in the row.
    Exists(String),
}

/// Group reducer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reducer {
    /// Number of rows in the group.
    Count { alias: String },
}

/// One step of an aggregation pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AggregateStep {
    /// Attach the whole document to each row.
    LoadAll,
    /// Copy the named fields into each row.
    Load(Vec<String>),
    Apply { expr: ApplyExpr, alias: String },
    Filter(RowFilter),
    GroupBy { fields: Vec<String>, reducers: Vec<Reducer> },
    SortBy(Vec<SortField>),
    Limit { offset: usize, count: usize },
}

/// An aggregation: a search filter followed by pipeline steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Aggregation {
    pub filter: String,
    pub steps: Vec<AggregateStep>,
}

impl Aggregation {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            steps: Vec::new(),
        }
    }

    pub fn load_all(mut self) -> Self {
        self.steps.push(AggregateStep::LoadAll);
        self
    }

    pub fn load(mut self, fields: &[&str]) -> Self {
        self.steps
            .push(AggregateStep::Load(fields.iter().map(|f| f.to_string()).collect()));
        self
    }

    /// `format(template, @f1, @f2, ...)` stored under `alias`.
    pub fn apply_format(mut self, template: &str, fields: &[&str], alias: &str) -> Self {
        self.steps.push(AggregateStep::Apply {
            expr: ApplyExpr::Format {
                template: template.to_string(),
                fields: fields.iter().map(|f| f.to_string()).collect(),
            },
            alias: alias.to_string(),
        });
        self
    }

    pub fn filter_exists(mut self, field: &str) -> Self {
        self.steps
            .push(AggregateStep::Filter(RowFilter::Exists(field.to_string())));
        self
    }

    /// Group by `fields`, counting rows into `count_alias`.
    pub fn group_by_count(mut self, fields: &[&str], count_alias: &str) -> Self {
        self.steps.push(AggregateStep::GroupBy {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            reducers: vec![Reducer::Count {
                alias: count_alias.to_string(),
            }],
        });
        self
    }

    pub fn sort_by(mut self, fields: Vec<SortField>) -> Self {
        self.steps.push(AggregateStep::SortBy(fields));
        self
    }

    pub fn limit(mut self, offset: usize, count: usize) -> Self {
        self.steps.push(AggregateStep::Limit { offset, count });
        self
    }

    pub fn loads_documents(&self) -> bool {
        self.steps.iter().any(|s| matches!(s, AggregateStep::LoadAll))
    }
}

/// One aggregation output row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregateRow {
    /// Source document key. Absent after grouping.
    pub key: Option<String>,
    /// Loaded, synthesised and reduced fields.
    pub fields: Map<String, Value>,
    /// Whole document, when loaded.
    pub document: Option<Value>,
}

/// JSON document substrate with secondary indexes.
#[async_trait]
pub trait Substrate: Send + Sync {
    /// Create an index. Fails with `IndexExists` if the name is taken.
    async fn create_index(&self, name: &str, definition: &IndexDefinition) -> StoreResult<()>;

    async fn index_exists(&self, name: &str) -> StoreResult<bool>;

    /// Drop an index. Indexed documents are kept.
    async fn drop_index(&self, name: &str) -> StoreResult<()>;

    async fn list_indexes(&self) -> StoreResult<Vec<String>>;

    /// Write a document. Returns false when `IfAbsent` found the key taken.
    async fn json_set(&self, key: &str, value: &Value, mode: SetMode) -> StoreResult<bool>;

    async fn json_get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Delete a key, returning the number of documents removed (0 or 1).
    async fn unlink(&self, key: &str) -> StoreResult<u64>;

    async fn search(&self, index: &str, query: &SearchQuery) -> StoreResult<SearchResult>;

    async fn aggregate(&self, index: &str, aggregation: &Aggregation)
    -> StoreResult<Vec<AggregateRow>>;

    /// Check substrate connectivity.
    async fn health_check(&self) -> StoreResult<()>;
}
