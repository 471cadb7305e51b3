//! Integration tests for the entities repository on every substrate.

mod common;

use common::{ARTIFACT_ID, GROUP_ID, all_backends, class_entity, entity};
use depot_core::ProjectVersion;
use depot_store::repos::{ClassifierQuery, EntitiesRepo};

const CLASS: &str = "meta::pure::metamodel::type::Class";
const ENUMERATION: &str = "meta::pure::metamodel::type::Enumeration";

#[tokio::test]
async fn test_create_or_update_is_idempotent() {
    for backend in all_backends().await {
        let repo = EntitiesRepo::new(backend.substrate());
        let batch = vec![
            class_entity("1.0.0", "model::domain::Person"),
            class_entity("1.0.0", "model::domain::Firm"),
        ];

        let first = repo.create_or_update(&batch).await.unwrap();
        assert_eq!(first.inserted_count, 2, "{}", backend.name);
        assert_eq!(first.modified_count, 0, "{}", backend.name);

        let stored = repo
            .get_version_stored_entities(GROUP_ID, ARTIFACT_ID, "1.0.0")
            .await
            .unwrap();
        let created: Vec<_> = stored.iter().map(|e| (e.entity.path.clone(), e.created)).collect();

        let second = repo.create_or_update(&batch).await.unwrap();
        assert_eq!(second.inserted_count, 0, "{}", backend.name);
        assert_eq!(second.modified_count, 2, "{}", backend.name);

        let stored = repo
            .get_version_stored_entities(GROUP_ID, ARTIFACT_ID, "1.0.0")
            .await
            .unwrap();
        assert_eq!(stored.len(), 2, "{}", backend.name);
        for entity in &stored {
            let before = created
                .iter()
                .find(|(path, _)| *path == entity.entity.path)
                .and_then(|(_, created)| *created);
            assert!(before.is_some());
            assert_eq!(entity.created, before, "{}", backend.name);
        }
    }
}

#[tokio::test]
async fn test_invalid_entities_are_reported_not_stored() {
    for backend in all_backends().await {
        let repo = EntitiesRepo::new(backend.substrate());
        let batch = vec![
            class_entity("1.0.0", "model::Valid"),
            class_entity("1.0.0", "NoPackage"),
            entity("Bad.Group", ARTIFACT_ID, "1.0.0", "model::Other", CLASS),
        ];

        let report = repo.create_or_update(&batch).await.unwrap();
        assert_eq!(report.inserted_count, 1, "{}", backend.name);
        assert!(report.has_errors());
        assert!(report.errors.len() >= 2, "{:?}", report.errors);
        assert_eq!(repo.get_all_stored_entities().await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_entities_by_package() {
    for backend in all_backends().await {
        let repo = EntitiesRepo::new(backend.substrate());
        repo.create_or_update(&[
            class_entity("1.0.0", "model::Root"),
            class_entity("1.0.0", "model::domain::Person"),
            entity(GROUP_ID, ARTIFACT_ID, "1.0.0", "model::domain::Kind", ENUMERATION),
            class_entity("1.0.0", "model::domain::sub::Address"),
            class_entity("1.0.0", "other::Thing"),
        ])
        .await
        .unwrap();

        let direct = repo
            .get_entities_by_package(GROUP_ID, ARTIFACT_ID, "1.0.0", "model::domain", false, &[], false)
            .await
            .unwrap();
        let mut paths: Vec<_> = direct.iter().map(|e| e.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["model::domain::Kind", "model::domain::Person"], "{}", backend.name);

        let nested = repo
            .get_entities_by_package(GROUP_ID, ARTIFACT_ID, "1.0.0", "model", false, &[], true)
            .await
            .unwrap();
        assert_eq!(nested.len(), 4, "{}", backend.name);

        let classes = repo
            .get_entities_by_package(
                GROUP_ID,
                ARTIFACT_ID,
                "1.0.0",
                "model",
                false,
                &[CLASS.to_string()],
                true,
            )
            .await
            .unwrap();
        assert_eq!(classes.len(), 3, "{}", backend.name);
    }
}

#[tokio::test]
async fn test_classifier_search_limit_applies_after_filter() {
    for backend in all_backends().await {
        let repo = EntitiesRepo::new(backend.substrate());
        repo.create_or_update(&[
            class_entity("1.0.0", "model::Alpha"),
            class_entity("1.0.0", "model::Beta"),
            class_entity("1.0.0", "model::Gamma"),
            class_entity("1.0.0", "model::TargetOne"),
            class_entity("1.0.0", "model::TargetTwo"),
        ])
        .await
        .unwrap();
        let versions = vec![ProjectVersion::new(GROUP_ID, ARTIFACT_ID, "1.0.0")];

        let limited = repo
            .find_released_entities_by_classifier_in(CLASS, &versions, &ClassifierQuery::new().limit(2))
            .await
            .unwrap();
        assert_eq!(limited.len(), 2, "{}", backend.name);

        // the first two rows in index order do not match the search term
        let searched = repo
            .find_released_entities_by_classifier_in(
                CLASS,
                &versions,
                &ClassifierQuery::new().search("target").limit(2).summary(true),
            )
            .await
            .unwrap();
        assert_eq!(searched.len(), 2, "{}", backend.name);
        assert!(searched.iter().all(|e| e.entity.path.contains("Target")));
        assert!(searched.iter().all(|e| e.entity.content.is_empty()));
    }
}

#[tokio::test]
async fn test_released_versus_latest() {
    for backend in all_backends().await {
        let repo = EntitiesRepo::new(backend.substrate());
        repo.create_or_update(&[
            class_entity("1.0.0", "model::Person"),
            class_entity("2.0.0", "model::Person"),
            class_entity("master-SNAPSHOT", "model::Person"),
        ])
        .await
        .unwrap();

        let released = repo
            .find_released_entities_by_classifier(CLASS, false, false)
            .await
            .unwrap();
        assert_eq!(released.len(), 2, "{}", backend.name);
        assert!(released.iter().all(|e| e.version_id != "master-SNAPSHOT"));

        let latest = repo
            .find_latest_entities_by_classifier(CLASS, false, false)
            .await
            .unwrap();
        assert_eq!(latest.len(), 1, "{}", backend.name);

        assert_eq!(repo.get_version_entity_count().await.unwrap(), 2);
        assert_eq!(repo.get_entity_count(GROUP_ID, ARTIFACT_ID).await.unwrap(), 3);
    }
}

#[tokio::test]
async fn test_coordinates_and_delete() {
    for backend in all_backends().await {
        let repo = EntitiesRepo::new(backend.substrate());
        repo.create_or_update(&[
            class_entity("1.0.0", "model::Person"),
            class_entity("2.0.0", "model::Person"),
            entity("org.finos.other", "sample", "1.0.0", "model::Firm", CLASS),
        ])
        .await
        .unwrap();

        let mut coordinates = repo.get_stored_entities_coordinates().await.unwrap();
        coordinates.sort();
        assert_eq!(
            coordinates,
            vec![
                (GROUP_ID.to_string(), ARTIFACT_ID.to_string()),
                ("org.finos.other".to_string(), "sample".to_string()),
            ],
            "{}",
            backend.name
        );

        let deleted = repo.delete_all(GROUP_ID, ARTIFACT_ID).await.unwrap();
        assert_eq!(deleted.deleted_count, 2, "{}", backend.name);
        assert_eq!(repo.get_all_stored_entities().await.unwrap().len(), 1);
    }
}
