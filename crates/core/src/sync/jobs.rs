//! Closed set of runnable jobs dispatched through one runner.

use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;

use crate::errors::{Error, Result};
use crate::inventory::AccountRef;

use super::clients::{ClientCredentials, CredentialProvisioner, SessionLookup};
use super::driver::SyncDriver;
use super::stats::SyncRunStats;

/// What a finished job produced.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutput {
    Reconciled(SyncRunStats),
    Credentials(ClientCredentials),
}

/// Lifecycle contract shared by every job.
#[async_trait]
pub trait RunJob: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_run(&self, sessions: &SessionLookup) -> bool;

    async fn prepare(&mut self) -> Result<()>;

    async fn execute(&mut self) -> Result<JobOutput>;

    /// Always called once `prepare` has been attempted.
    async fn cleanup(&mut self);
}

/// Runs one reconciliation through a [`SyncDriver`].
pub struct ReconcileJob {
    driver: Arc<SyncDriver>,
}

impl ReconcileJob {
    pub fn new(driver: Arc<SyncDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl RunJob for ReconcileJob {
    fn name(&self) -> &'static str {
        "reconcile"
    }

    fn can_run(&self, sessions: &SessionLookup) -> bool {
        sessions(&self.driver.account().target_publisher_id)
    }

    async fn prepare(&mut self) -> Result<()> {
        if self.driver.stop_handle().is_stop_requested() {
            return Err(Error::invalid_state("driver was stopped before the job began"));
        }
        Ok(())
    }

    async fn execute(&mut self) -> Result<JobOutput> {
        self.driver.run().await.map(JobOutput::Reconciled)
    }

    async fn cleanup(&mut self) {
        if let Some(stats) = self.driver.last_run_stats() {
            info!(
                "[AdSync] Reconcile job finished run {} (has_errors={})",
                stats.id, stats.has_errors
            );
        }
    }
}

/// Obtains API credentials for a target account.
pub struct ProvisionCredentialsJob {
    account: AccountRef,
    provisioner: Arc<dyn CredentialProvisioner>,
}

impl ProvisionCredentialsJob {
    pub fn new(account: AccountRef, provisioner: Arc<dyn CredentialProvisioner>) -> Self {
        Self {
            account,
            provisioner,
        }
    }
}

#[async_trait]
impl RunJob for ProvisionCredentialsJob {
    fn name(&self) -> &'static str {
        "provision_credentials"
    }

    fn can_run(&self, sessions: &SessionLookup) -> bool {
        sessions(&self.account.target_publisher_id)
    }

    async fn prepare(&mut self) -> Result<()> {
        if self.account.target_publisher_id.trim().is_empty() {
            return Err(Error::invalid_state("target publisher id is empty"));
        }
        Ok(())
    }

    async fn execute(&mut self) -> Result<JobOutput> {
        let credentials = self.provisioner.provision(&self.account).await?;
        info!(
            "[AdSync] Provisioned client {} for publisher {}",
            credentials.client_id, self.account.target_publisher_id
        );
        Ok(JobOutput::Credentials(credentials))
    }

    async fn cleanup(&mut self) {}
}

pub enum SyncJob {
    Reconcile(ReconcileJob),
    ProvisionCredentials(ProvisionCredentialsJob),
}

impl SyncJob {
    fn as_job(&mut self) -> &mut dyn RunJob {
        match self {
            Self::Reconcile(job) => job,
            Self::ProvisionCredentials(job) => job,
        }
    }
}

/// Dispatches any [`SyncJob`] through its lifecycle.
#[derive(Clone)]
pub struct JobRunner {
    sessions: SessionLookup,
}

impl JobRunner {
    pub fn new(sessions: SessionLookup) -> Self {
        Self { sessions }
    }

    pub async fn run(&self, job: &mut SyncJob) -> Result<JobOutput> {
        let job = job.as_job();
        if !job.can_run(&self.sessions) {
            return Err(Error::invalid_state(format!(
                "job '{}' has no session to run in",
                job.name()
            )));
        }

        let result = match job.prepare().await {
            Ok(()) => job.execute().await,
            Err(err) => Err(err),
        };
        job.cleanup().await;

        if let Err(err) = &result {
            warn!("[AdSync] Job '{}' failed: {}", job.name(), err);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ClientError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProvisioner {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl CredentialProvisioner for FixedProvisioner {
        async fn provision(
            &self,
            _account: &AccountRef,
        ) -> std::result::Result<ClientCredentials, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClientError::api("console layout changed"));
            }
            Ok(ClientCredentials {
                client_id: "client-1".to_string(),
                client_secret: "secret".to_string(),
            })
        }
    }

    fn sessions_for(publisher: &'static str) -> SessionLookup {
        Arc::new(move |id: &str| id == publisher)
    }

    fn provision_job(provisioner: Arc<FixedProvisioner>) -> SyncJob {
        SyncJob::ProvisionCredentials(ProvisionCredentialsJob::new(
            AccountRef::new("src-1", "pub-1"),
            provisioner,
        ))
    }

    #[tokio::test]
    async fn provisioning_yields_credentials() {
        let provisioner = Arc::new(FixedProvisioner {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let runner = JobRunner::new(sessions_for("pub-1"));
        let output = runner
            .run(&mut provision_job(Arc::clone(&provisioner)))
            .await
            .unwrap();
        match output {
            JobOutput::Credentials(credentials) => assert_eq!(credentials.client_id, "client-1"),
            other => panic!("unexpected output {:?}", other),
        }
        assert_eq!(provisioner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn job_without_session_never_executes() {
        let provisioner = Arc::new(FixedProvisioner {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let runner = JobRunner::new(sessions_for("someone-else"));
        let result = runner.run(&mut provision_job(Arc::clone(&provisioner))).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
        assert_eq!(provisioner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provisioning_failure_is_propagated() {
        let provisioner = Arc::new(FixedProvisioner {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let runner = JobRunner::new(sessions_for("pub-1"));
        let result = runner.run(&mut provision_job(provisioner)).await;
        assert!(matches!(result, Err(Error::Client(_))));
    }
}
