//! Ordered multicast stream of run events.

use log::debug;
use serde::Serialize;
use tokio::sync::broadcast;

/// A problem worth surfacing to the user without halting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_app_id: Option<String>,
    pub message: String,
    /// True when the whole app (or run) failed rather than a single operation.
    pub fatal: bool,
}

impl SyncIssue {
    pub fn app(source_app_id: &str, message: impl Into<String>, fatal: bool) -> Self {
        Self {
            source_app_id: Some(source_app_id.to_string()),
            message: message.into(),
            fatal,
        }
    }

    pub fn run(message: impl Into<String>) -> Self {
        Self {
            source_app_id: None,
            message: message.into(),
            fatal: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncEvent {
    #[serde(rename_all = "camelCase")]
    Started { run_id: String },
    CalculatingProgress,
    ReportProgress {
        total: usize,
        synced: usize,
        failed: usize,
    },
    /// Credentials must be renewed outside the engine.
    UserActionsRequired,
    Error { error: SyncIssue },
    #[serde(rename_all = "camelCase")]
    Stopped { has_errors: bool, terminated: bool },
}

/// Multicast sender; every subscriber sees events in emission order.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: SyncEvent) {
        debug!("[AdSync] event {:?}", event);
        // No subscribers is fine; events are advisory.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_serialize_with_type_tag() {
        let value = serde_json::to_value(SyncEvent::Stopped {
            has_errors: true,
            terminated: false,
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"type": "stopped", "hasErrors": true, "terminated": false})
        );

        let value = serde_json::to_value(SyncEvent::ReportProgress {
            total: 3,
            synced: 1,
            failed: 1,
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"type": "reportProgress", "total": 3, "synced": 1, "failed": 1})
        );
    }

    #[tokio::test]
    async fn every_subscriber_sees_the_same_order() {
        let emitter = EventEmitter::new(8);
        let mut first = emitter.subscribe();
        let mut second = emitter.subscribe();

        emitter.emit(SyncEvent::Started {
            run_id: "r1".to_string(),
        });
        emitter.emit(SyncEvent::CalculatingProgress);

        for receiver in [&mut first, &mut second] {
            assert_eq!(
                receiver.recv().await.unwrap(),
                SyncEvent::Started {
                    run_id: "r1".to_string()
                }
            );
            assert_eq!(receiver.recv().await.unwrap(), SyncEvent::CalculatingProgress);
        }
    }

    #[test]
    fn emitting_without_subscribers_is_harmless() {
        EventEmitter::new(1).emit(SyncEvent::UserActionsRequired);
    }
}
