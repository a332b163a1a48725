//! Run accounting for external history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reconcile::{AppOutcome, AppSyncReport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedApps {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub with_errors: usize,
}

/// Finalized statistics of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunStats {
    pub id: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub terminated: bool,
    pub has_errors: bool,
    pub affected_apps: AffectedApps,
}

/// Accumulates run statistics; [`RunStatsRecorder::finish`] seals them.
#[derive(Debug)]
pub struct RunStatsRecorder {
    id: String,
    start_ts: DateTime<Utc>,
    has_errors: bool,
    affected_apps: AffectedApps,
}

impl RunStatsRecorder {
    pub fn start() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            start_ts: Utc::now(),
            has_errors: false,
            affected_apps: AffectedApps::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn mark_errors(&mut self) {
        self.has_errors = true;
    }

    pub fn record_app(&mut self, report: &AppSyncReport) {
        let affected = &mut self.affected_apps;
        match report.outcome {
            AppOutcome::SkippedDeleted => {
                if report.ad_units_deleted > 0 || report.app_updated {
                    affected.deleted += 1;
                }
            }
            AppOutcome::Synced | AppOutcome::SyncedWithErrors => {
                if report.app_created {
                    affected.created += 1;
                } else if report.changed() {
                    affected.updated += 1;
                }
            }
        }
        if !report.errors.is_empty() {
            affected.with_errors += 1;
            self.has_errors = true;
        }
    }

    pub fn record_failure(&mut self) {
        self.affected_apps.with_errors += 1;
        self.has_errors = true;
    }

    pub fn finish(self, terminated: bool) -> SyncRunStats {
        SyncRunStats {
            id: self.id,
            start_ts: self.start_ts,
            end_ts: Utc::now(),
            terminated,
            has_errors: self.has_errors,
            affected_apps: self.affected_apps,
        }
    }
}
