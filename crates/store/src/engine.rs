//! Generic document engine.
//!
//! A [`DocumentStore`] provides create-or-update, conditional insert, query,
//! count, aggregate and bulk delete over one collection. Everything
//! collection-specific (schema, compound key, the filter that finds the "same"
//! logical row, domain validation) comes from the [`Collection`] strategy.

use crate::error::{StoreError, StoreResult};
use crate::query::{self, QueryBuilder, fields};
use crate::substrate::{
    AggregateRow, Aggregation, AggregateStep, Document, IndexDefinition, SchemaField, SearchQuery,
    SetMode, Substrate,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;

/// Per-collection strategy supplied to the engine.
pub trait Collection: Send + Sync + 'static {
    /// Domain record stored in this collection.
    type Record: Serialize + DeserializeOwned + Send + Sync;

    /// Collection name. Keys start with `NAME:` and the index is `NAME:index`.
    const NAME: &'static str;

    /// Indexed fields.
    fn schema() -> Vec<SchemaField>;

    /// Compound key for a new row.
    fn key(record: &Self::Record) -> String;

    /// Filter finding the stored row that `record` would replace.
    fn key_filter(record: &Self::Record) -> QueryBuilder;

    /// Domain validation run before any write.
    fn validate_new_data(_record: &Self::Record) -> StoreResult<()> {
        Ok(())
    }

    fn index_name() -> String {
        query::index_name(Self::NAME)
    }

    fn index_definition() -> IndexDefinition {
        IndexDefinition::new(query::key_prefix(Self::NAME), Self::schema())
    }
}

/// Typed access to one collection.
pub struct DocumentStore<C: Collection> {
    substrate: Arc<dyn Substrate>,
    index: String,
    _collection: PhantomData<fn() -> C>,
}

impl<C: Collection> Clone for DocumentStore<C> {
    fn clone(&self) -> Self {
        Self {
            substrate: Arc::clone(&self.substrate),
            index: self.index.clone(),
            _collection: PhantomData,
        }
    }
}

impl<C: Collection> DocumentStore<C> {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            substrate,
            index: C::index_name(),
            _collection: PhantomData,
        }
    }

    pub fn collection(&self) -> &'static str {
        C::NAME
    }

    pub fn substrate(&self) -> &Arc<dyn Substrate> {
        &self.substrate
    }

    /// Create the collection index. Returns false when it already existed.
    pub async fn create_index(&self) -> StoreResult<bool> {
        ensure_index(self.substrate.as_ref(), &self.index, &C::index_definition()).await
    }

    /// Insert `record`, or merge it into the row matched by its key filter.
    ///
    /// The existing row is looked up and then overwritten in two separate
    /// substrate calls. Two writers of the same logical row can interleave
    /// between them, in which case the last write wins on the merged map.
    pub async fn create_or_update(
        &self,
        unique: bool,
        id_required: bool,
        record: &C::Record,
    ) -> StoreResult<C::Record> {
        C::validate_new_data(record)?;

        let filter = C::key_filter(record);
        match self.find_one_document(&filter).await? {
            Some(existing) => {
                let mut merged = match existing.value {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                let now = depot_core::dates::now_millis();
                let created = merged
                    .get(fields::CREATED)
                    .filter(|v| !v.is_null())
                    .cloned()
                    .unwrap_or_else(|| Value::from(now));

                merged.extend(to_object(record)?);
                merged.insert(fields::CREATED.to_string(), created);
                merged.insert(fields::UPDATED.to_string(), Value::from(now));
                if id_required {
                    merged.insert(fields::ID.to_string(), Value::from(existing.key.clone()));
                }

                let value = Value::Object(merged);
                if !self
                    .substrate
                    .json_set(&existing.key, &value, SetMode::Always)
                    .await?
                {
                    return Err(StoreError::Substrate {
                        key: existing.key,
                        message: "update was not applied".to_string(),
                    });
                }
                tracing::debug!(collection = C::NAME, key = %existing.key, "Updated document");
                decode::<C>(value)
            }
            None => self.write_new(&C::key(record), unique, id_required, record).await,
        }
    }

    /// Insert `record` under `key`.
    ///
    /// With `unique` the write only succeeds when the key is absent. With
    /// `id_required` the key is copied into the `id` field.
    pub async fn insert(
        &self,
        key: &str,
        unique: bool,
        id_required: bool,
        record: &C::Record,
    ) -> StoreResult<C::Record> {
        C::validate_new_data(record)?;
        self.write_new(key, unique, id_required, record).await
    }

    async fn write_new(
        &self,
        key: &str,
        unique: bool,
        id_required: bool,
        record: &C::Record,
    ) -> StoreResult<C::Record> {
        let mut map = to_object(record)?;
        let now = depot_core::dates::now_millis();
        if map.get(fields::CREATED).is_none_or(Value::is_null) {
            map.insert(fields::CREATED.to_string(), Value::from(now));
        }
        map.insert(fields::UPDATED.to_string(), Value::from(now));
        if id_required {
            map.insert(fields::ID.to_string(), Value::from(key));
        }

        let mode = if unique {
            SetMode::IfAbsent
        } else {
            SetMode::Always
        };
        let value = Value::Object(map);
        if !self.substrate.json_set(key, &value, mode).await? {
            tracing::debug!(collection = C::NAME, key = %key, "Unique insert refused");
            return Err(StoreError::Conflict(format!(
                "Error inserting dataset with key: '{key}' - ensure the key is unique"
            )));
        }
        decode::<C>(value)
    }

    /// Read one row by key.
    pub async fn get(&self, key: &str) -> StoreResult<Option<C::Record>> {
        self.substrate
            .json_get(key)
            .await?
            .map(decode::<C>)
            .transpose()
    }

    /// Run a search and decode every returned document.
    pub async fn find(&self, query: &SearchQuery) -> StoreResult<Vec<C::Record>> {
        let result = self.substrate.search(&self.index, query).await?;
        result
            .documents
            .into_iter()
            .filter_map(|doc| doc.value)
            .map(decode::<C>)
            .collect()
    }

    /// Every row matching `filter`.
    pub async fn find_where(&self, filter: QueryBuilder) -> StoreResult<Vec<C::Record>> {
        self.find(&SearchQuery::new(filter.build())).await
    }

    /// The single row matching `filter`.
    ///
    /// More than one match means the unique key filter is broken and is
    /// reported as a consistency error.
    pub async fn find_one(&self, filter: QueryBuilder) -> StoreResult<Option<C::Record>> {
        match self.find_one_document(&filter).await? {
            Some(Document {
                value: Some(value), ..
            }) => decode::<C>(value).map(Some),
            _ => Ok(None),
        }
    }

    async fn find_one_document(&self, filter: &QueryBuilder) -> StoreResult<Option<Document>> {
        let query = SearchQuery::new(filter.to_string());
        let result = self.substrate.search(&self.index, &query).await?;
        if result.total > 1 {
            return Err(StoreError::Consistency {
                collection: C::NAME.to_string(),
                query: query.filter,
                matches: result.total,
            });
        }
        Ok(result.documents.into_iter().next())
    }

    /// Every row of the collection.
    pub async fn find_all(&self) -> StoreResult<Vec<C::Record>> {
        self.find(&SearchQuery::all()).await
    }

    /// One page of the collection. Pages are 1-based; page 0 is treated as 1.
    pub async fn find_all_by_page(&self, page: usize, page_size: usize) -> StoreResult<Vec<C::Record>> {
        let offset = page.saturating_sub(1).saturating_mul(page_size);
        self.find(&SearchQuery::all().limit(offset, page_size)).await
    }

    /// Number of rows matching `filter`, without loading any document.
    pub async fn count(&self, filter: QueryBuilder) -> StoreResult<usize> {
        let query = SearchQuery::new(filter.build()).limit(0, 0);
        Ok(self.substrate.search(&self.index, &query).await?.total)
    }

    /// Delete one row by key, returning the number removed.
    pub async fn delete_by_key(&self, key: &str) -> StoreResult<u64> {
        self.substrate.unlink(key).await
    }

    /// Delete every row matching `filter`.
    ///
    /// Rows are removed one key at a time; the result counts only the rows
    /// this call actually removed.
    #[tracing::instrument(level = "debug", skip_all, fields(collection = C::NAME))]
    pub async fn delete_by_query(&self, filter: QueryBuilder) -> StoreResult<u64> {
        let query = SearchQuery::new(filter.build()).no_content();
        let result = self.substrate.search(&self.index, &query).await?;
        let mut deleted = 0;
        for doc in &result.documents {
            deleted += self.substrate.unlink(&doc.key).await?;
        }
        if deleted < result.total as u64 {
            tracing::debug!(
                matched = result.total,
                deleted,
                "Some rows were removed concurrently"
            );
        }
        Ok(deleted)
    }

    /// Run an aggregation against the collection index.
    pub async fn aggregate(&self, aggregation: &Aggregation) -> StoreResult<Vec<AggregateRow>> {
        self.substrate.aggregate(&self.index, aggregation).await
    }

    /// Run an aggregation and decode the source document of every row.
    pub async fn find_by_aggregation(&self, aggregation: Aggregation) -> StoreResult<Vec<C::Record>> {
        let aggregation = if aggregation.loads_documents() {
            aggregation
        } else {
            let mut with_documents = aggregation;
            with_documents.steps.insert(0, AggregateStep::LoadAll);
            with_documents
        };
        self.aggregate(&aggregation)
            .await?
            .into_iter()
            .filter_map(|row| row.document)
            .map(decode::<C>)
            .collect()
    }

    /// Delete the source row of every aggregation result that still carries a key.
    #[tracing::instrument(level = "debug", skip_all, fields(collection = C::NAME))]
    pub async fn delete_by_aggregation(&self, aggregation: &Aggregation) -> StoreResult<u64> {
        let rows = self.aggregate(aggregation).await?;
        let mut deleted = 0;
        for key in rows.iter().filter_map(|row| row.key.as_deref()) {
            deleted += self.substrate.unlink(key).await?;
        }
        Ok(deleted)
    }
}

/// Create an index unless one with that name already exists.
/// Returns true when this call created it.
pub async fn ensure_index(
    substrate: &dyn Substrate,
    name: &str,
    definition: &IndexDefinition,
) -> StoreResult<bool> {
    if substrate.index_exists(name).await? {
        return Ok(false);
    }
    match substrate.create_index(name, definition).await {
        Ok(()) => {
            tracing::info!(index = %name, "Created index");
            Ok(true)
        }
        // another process created it between the check and the create
        Err(StoreError::IndexExists(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

fn to_object<T: Serialize>(record: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Validation(format!(
            "record must serialize to an object, got {other}"
        ))),
    }
}

fn decode<C: Collection>(value: Value) -> StoreResult<C::Record> {
    Ok(serde_json::from_value(value)?)
}
