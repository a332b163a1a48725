//! Top-level run state machine.
//!
//! `Idle -> Started -> CalculatingProgress -> SyncingApps(i) -> Stopped`.
//! `Stopped` is reached exactly once per run whatever the outcome, and is
//! always announced by the last event of the run.

use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio::time::sleep;

use crate::config::SyncConfig;
use crate::errors::{Error, Result};
use crate::inventory::{AccountRef, SourceApp};

use super::clients::{SourceClient, TargetClient, TargetGateway};
use super::context::SyncContext;
use super::events::{EventEmitter, SyncEvent, SyncIssue};
use super::reconcile::Reconciler;
use super::stats::{RunStatsRecorder, SyncRunStats};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum SyncPhase {
    Idle,
    Started,
    CalculatingProgress,
    SyncingApps { index: usize, total: usize },
    Stopped,
}

/// Invoked at every checkpoint, before the cancellation test.
pub type CheckpointHook = Arc<dyn Fn(SyncPhase) + Send + Sync>;

#[derive(Debug, Default)]
struct StopState {
    requested: AtomicBool,
    reason: Mutex<Option<String>>,
}

/// Cloneable handle requesting cooperative cancellation of a run.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<StopState>);

impl StopHandle {
    /// Request a stop. Only the first reason is kept; later calls are no-ops.
    pub fn stop(&self, reason: &str) {
        if self.0.requested.swap(true, Ordering::SeqCst) {
            debug!("[AdSync] Stop already requested, ignoring '{}'", reason);
            return;
        }
        info!("[AdSync] Stop requested: {}", reason);
        *lock(&self.0.reason) = Some(reason.to_string());
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.requested.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<String> {
        lock(&self.0.reason).clone()
    }
}

/// Drives one reconciliation run for one account pair.
pub struct SyncDriver {
    config: SyncConfig,
    account: AccountRef,
    source: Arc<dyn SourceClient>,
    target: Arc<dyn TargetClient>,
    events: EventEmitter,
    stop: StopHandle,
    phase: Mutex<SyncPhase>,
    last_run_stats: Mutex<Option<SyncRunStats>>,
    checkpoint_hook: Option<CheckpointHook>,
}

impl SyncDriver {
    pub fn new(
        config: SyncConfig,
        account: AccountRef,
        source: Arc<dyn SourceClient>,
        target: Arc<dyn TargetClient>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            events: EventEmitter::new(config.event_buffer_size),
            config,
            account,
            source,
            target,
            stop: StopHandle::default(),
            phase: Mutex::new(SyncPhase::Idle),
            last_run_stats: Mutex::new(None),
            checkpoint_hook: None,
        })
    }

    pub fn with_checkpoint_hook(mut self, hook: CheckpointHook) -> Self {
        self.checkpoint_hook = Some(hook);
        self
    }

    pub fn account(&self) -> &AccountRef {
        &self.account
    }

    /// Subscribe to this driver's events. Subscribe before `run` to see `Started`.
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> SyncPhase {
        *lock(&self.phase)
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self, reason: &str) {
        self.stop.stop(reason);
    }

    pub fn last_run_stats(&self) -> Option<SyncRunStats> {
        lock(&self.last_run_stats).clone()
    }

    fn set_phase(&self, phase: SyncPhase) {
        *lock(&self.phase) = phase;
    }

    /// Enter `phase`; false when a stop has been requested.
    fn checkpoint(&self, phase: SyncPhase) -> bool {
        self.set_phase(phase);
        if let Some(hook) = &self.checkpoint_hook {
            hook(phase);
        }
        if self.stop.is_stop_requested() {
            info!(
                "[AdSync] Cancellation observed at {:?} ({})",
                phase,
                self.stop.reason().unwrap_or_default()
            );
            return false;
        }
        true
    }

    /// Run the reconciliation once. Errors only when the driver was already used.
    pub async fn run(&self) -> Result<SyncRunStats> {
        {
            let mut phase = lock(&self.phase);
            if *phase != SyncPhase::Idle {
                return Err(Error::invalid_state(format!(
                    "driver already used (phase {:?})",
                    *phase
                )));
            }
            *phase = SyncPhase::Started;
        }

        let mut recorder = RunStatsRecorder::start();
        let run_id = recorder.id().to_string();
        info!(
            "[AdSync] Run {} started for source account {} / target publisher {}",
            run_id, self.account.source_account_id, self.account.target_publisher_id
        );
        self.events.emit(SyncEvent::Started {
            run_id: run_id.clone(),
        });
        if let Err(err) = self.source.report_run_start(&run_id, &self.account).await {
            warn!("[AdSync] Failed to report run start: {}", err);
        }

        let terminated = self.execute(&run_id, &mut recorder).await;

        self.set_phase(SyncPhase::Stopped);
        if let Err(err) = self.source.report_run_end(&run_id).await {
            warn!("[AdSync] Failed to report run end: {}", err);
        }
        let stats = recorder.finish(terminated);
        info!(
            "[AdSync] Run {} stopped: terminated={} has_errors={} affected={:?}",
            stats.id, stats.terminated, stats.has_errors, stats.affected_apps
        );
        self.events.emit(SyncEvent::Stopped {
            has_errors: stats.has_errors,
            terminated,
        });
        *lock(&self.last_run_stats) = Some(stats.clone());
        Ok(stats)
    }

    /// Everything between `Started` and `Stopped`. Returns whether the run was cancelled.
    async fn execute(&self, run_id: &str, recorder: &mut RunStatsRecorder) -> bool {
        if !self.checkpoint(SyncPhase::Started) {
            return true;
        }

        let gateway = TargetGateway::new(Arc::clone(&self.target));
        if let Err(err) = self.refresh_auth_token(&gateway).await {
            error!(
                "[AdSync] Token refresh exhausted {} attempts, re-authentication required: {}",
                self.config.token_refresh_attempts, err
            );
            recorder.mark_errors();
            self.events.emit(SyncEvent::UserActionsRequired);
            return false;
        }

        if !self.checkpoint(SyncPhase::CalculatingProgress) {
            return true;
        }
        self.events.emit(SyncEvent::CalculatingProgress);

        let mut ctx = match self.fetch_context(&gateway).await {
            Ok(ctx) => ctx,
            Err(err) => {
                error!("[AdSync] Fetch phase failed: {}", err);
                recorder.mark_errors();
                self.events.emit(SyncEvent::Error {
                    error: SyncIssue::run(format!("fetch failed: {}", err)),
                });
                return false;
            }
        };

        let unlinked_hidden = ctx.hidden_store_linkable_apps().count();
        if unlinked_hidden > 0 {
            info!(
                "[AdSync] {} hidden target apps have no store link yet",
                unlinked_hidden
            );
        }

        let apps: Vec<SourceApp> = ctx.source_apps().to_vec();
        let total = apps.len();
        let (mut synced, mut failed) = (0usize, 0usize);
        self.events.emit(SyncEvent::ReportProgress {
            total,
            synced,
            failed,
        });

        let mut reconciler = Reconciler::new(
            gateway,
            Arc::clone(&self.source),
            self.config.namespace(),
            &self.config.currency_code,
            self.account.clone(),
            run_id,
        );

        for (index, app) in apps.iter().enumerate() {
            if !self.checkpoint(SyncPhase::SyncingApps { index, total }) {
                return true;
            }
            info!(
                "[AdSync] Syncing app {}/{}: {} ({})",
                index + 1,
                total,
                app.name,
                app.id
            );
            match reconciler.reconcile_app(&mut ctx, app).await {
                Ok(report) => {
                    synced += 1;
                    info!(
                        "[AdSync] App {}: {:?} (created {}, deleted {}, issues {})",
                        app.id,
                        report.outcome,
                        report.ad_units_created,
                        report.ad_units_deleted,
                        report.errors.len()
                    );
                    for issue in &report.errors {
                        self.events.emit(SyncEvent::Error {
                            error: SyncIssue::app(&app.id, issue.clone(), false),
                        });
                    }
                    recorder.record_app(&report);
                }
                Err(err) => {
                    failed += 1;
                    error!("[AdSync] App {}: sync failed: {}", app.id, err);
                    recorder.record_failure();
                    self.events.emit(SyncEvent::Error {
                        error: SyncIssue::app(&app.id, err.to_string(), true),
                    });
                }
            }
            self.events.emit(SyncEvent::ReportProgress {
                total,
                synced,
                failed,
            });
        }

        if reconciler.native_creation_skipped() {
            warn!("[AdSync] Native ad unit creation was disabled for this run after a permission error");
        }
        false
    }

    /// Fixed attempt count with a fixed delay between attempts.
    async fn refresh_auth_token(&self, gateway: &TargetGateway) -> Result<()> {
        let attempts = self.config.token_refresh_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match gateway.refresh_auth_token().await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < attempts => {
                    warn!(
                        "[AdSync] Token refresh attempt {}/{} failed: {}",
                        attempt, attempts, err
                    );
                    sleep(self.config.token_refresh_backoff()).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_context(&self, gateway: &TargetGateway) -> Result<SyncContext> {
        let snapshot = gateway.fetch_snapshot().await?;
        info!(
            "[AdSync] Target snapshot: {} apps, {} ad units",
            snapshot.apps.len(),
            snapshot.ad_units.len()
        );
        let source_apps = self.fetch_source_apps().await?;
        info!("[AdSync] Source declares {} apps", source_apps.len());
        Ok(SyncContext::new(snapshot, source_apps))
    }

    /// Drain every page of declared apps.
    async fn fetch_source_apps(&self) -> Result<Vec<SourceApp>> {
        let mut apps = Vec::new();
        let mut page = 1;
        loop {
            let batch = self
                .source
                .fetch_declared_apps(&self.account, page)
                .await?;
            debug!(
                "[AdSync] Source page {}/{}: {} apps",
                batch.page_info.page,
                batch.page_info.total_pages,
                batch.apps.len()
            );
            apps.extend(batch.apps);
            if !batch.page_info.has_next() {
                return Ok(apps);
            }
            if page >= self.config.max_source_pages {
                return Err(Error::invalid_state(format!(
                    "source paging did not finish within {} pages",
                    self.config.max_source_pages
                )));
            }
            page += 1;
        }
    }
}
