//! Handler doubles.

use async_trait::async_trait;
use depot_core::MetadataNotification;
use depot_notifications::{NotificationError, NotificationHandler, NotificationResult};
use std::sync::Mutex;

/// Records every event it sees. Versions listed in `failing` report an error.
#[derive(Default)]
pub struct RecordingHandler {
    pub seen: Mutex<Vec<MetadataNotification>>,
    pub failing: Vec<String>,
    pub broken: Vec<String>,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn failing(versions: &[&str]) -> Self {
        Self {
            failing: versions.iter().map(|v| v.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn broken(versions: &[&str]) -> Self {
        Self {
            broken: versions.iter().map(|v| v.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn seen_versions(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.version_id.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationHandler for RecordingHandler {
    async fn handle(&self, event: &MetadataNotification) -> NotificationResult<Vec<String>> {
        self.seen.lock().unwrap().push(event.clone());
        if self.broken.contains(&event.version_id) {
            return Err(NotificationError::Handler {
                event: event.coordinate().to_string(),
                message: "handler crashed".to_string(),
            });
        }
        if self.failing.contains(&event.version_id) {
            return Ok(vec![format!("cannot process {}", event.version_id)]);
        }
        Ok(Vec::new())
    }
}
