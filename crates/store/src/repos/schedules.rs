//! Schedule definitions and execution records.

use crate::engine::{Collection, DocumentStore};
use crate::error::StoreResult;
use crate::query::{self, QueryBuilder, fields};
use crate::substrate::{SchemaField, Substrate};
use depot_core::{ScheduleInfo, ScheduleInstance};
use std::sync::Arc;

pub const SCHEDULES_COLLECTION: &str = "schedules";
pub const INSTANCES_COLLECTION: &str = "schedule-instances";
pub const SCHEDULE_NAME: &str = "name";
pub const SCHEDULE: &str = "schedule";

/// Collection strategy for [`ScheduleInfo`]. Names are unique.
pub struct Schedules;

impl Collection for Schedules {
    type Record = ScheduleInfo;
    const NAME: &'static str = SCHEDULES_COLLECTION;

    fn schema() -> Vec<SchemaField> {
        vec![SchemaField::sortable_tag(SCHEDULE_NAME)]
    }

    fn key(schedule: &ScheduleInfo) -> String {
        query::compound_key(&[SCHEDULES_COLLECTION, &schedule.name])
    }

    fn key_filter(schedule: &ScheduleInfo) -> QueryBuilder {
        QueryBuilder::new().equal(SCHEDULE_NAME, &schedule.name)
    }
}

/// Collection strategy for [`ScheduleInstance`]. Append-only.
pub struct ScheduleInstances;

impl Collection for ScheduleInstances {
    type Record = ScheduleInstance;
    const NAME: &'static str = INSTANCES_COLLECTION;

    fn schema() -> Vec<SchemaField> {
        vec![
            SchemaField::sortable_tag(fields::ID),
            SchemaField::sortable_tag(SCHEDULE),
        ]
    }

    fn key(instance: &ScheduleInstance) -> String {
        let nanos = depot_core::dates::now_nanos().to_string();
        query::compound_key(&[INSTANCES_COLLECTION, &instance.schedule, &nanos])
    }

    fn key_filter(instance: &ScheduleInstance) -> QueryBuilder {
        QueryBuilder::new().equal(SCHEDULE, &instance.schedule)
    }
}

/// Schedules repository.
#[derive(Clone)]
pub struct SchedulesRepo {
    store: DocumentStore<Schedules>,
}

impl SchedulesRepo {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            store: DocumentStore::new(substrate),
        }
    }

    pub fn store(&self) -> &DocumentStore<Schedules> {
        &self.store
    }

    pub async fn get(&self, name: &str) -> StoreResult<Option<ScheduleInfo>> {
        self.store.find_one(QueryBuilder::new().equal(SCHEDULE_NAME, name)).await
    }

    pub async fn get_all(&self) -> StoreResult<Vec<ScheduleInfo>> {
        self.store.find_all().await
    }

    pub async fn create_or_update(&self, schedule: &ScheduleInfo) -> StoreResult<ScheduleInfo> {
        self.store.create_or_update(true, false, schedule).await
    }

    pub async fn delete(&self, name: &str) -> StoreResult<u64> {
        self.store
            .delete_by_query(QueryBuilder::new().equal(SCHEDULE_NAME, name))
            .await
    }
}

/// Schedule instances repository.
#[derive(Clone)]
pub struct ScheduleInstancesRepo {
    store: DocumentStore<ScheduleInstances>,
}

impl ScheduleInstancesRepo {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            store: DocumentStore::new(substrate),
        }
    }

    pub fn store(&self) -> &DocumentStore<ScheduleInstances> {
        &self.store
    }

    /// Record an execution. The row key becomes the instance id.
    pub async fn insert(&self, instance: &ScheduleInstance) -> StoreResult<ScheduleInstance> {
        self.store
            .insert(&ScheduleInstances::key(instance), false, true, instance)
            .await
    }

    pub async fn find(&self, schedule: &str) -> StoreResult<Vec<ScheduleInstance>> {
        self.store
            .find_where(QueryBuilder::new().equal(SCHEDULE, schedule))
            .await
    }

    pub async fn get_all(&self) -> StoreResult<Vec<ScheduleInstance>> {
        self.store.find_all().await
    }

    pub async fn delete(&self, instance_id: &str) -> StoreResult<u64> {
        self.store.delete_by_key(instance_id).await
    }
}
