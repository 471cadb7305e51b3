//! Record builders shared by the integration tests.

use depot_core::{EntityDefinition, StoredEntity};
use serde_json::{Map, Value, json};

pub const GROUP_ID: &str = "org.finos.legend";
pub const ARTIFACT_ID: &str = "showcase";

/// An entity whose classifier is `meta::pure::metamodel::type::Class`.
#[allow(dead_code)]
pub fn class_entity(version_id: &str, path: &str) -> StoredEntity {
    entity(GROUP_ID, ARTIFACT_ID, version_id, path, "meta::pure::metamodel::type::Class")
}

#[allow(dead_code)]
pub fn entity(
    group_id: &str,
    artifact_id: &str,
    version_id: &str,
    path: &str,
    classifier_path: &str,
) -> StoredEntity {
    let mut content = Map::new();
    content.insert("name".to_string(), Value::from(path.rsplit("::").next().unwrap_or(path)));
    content.insert("properties".to_string(), json!([]));
    StoredEntity::new(
        group_id,
        artifact_id,
        version_id,
        EntityDefinition::new(path, classifier_path, content),
    )
}
