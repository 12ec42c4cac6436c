// ── Workflow context ──
//
// Everything one provisioning run needs, passed explicitly: the API
// client, the org and site scope, the cancellation token, the progress
// sink and the results recorded so far. There is no global state.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mistly_api::MistClient;

use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::model::{Halt, ProvisioningResult, ResourceKind, RunMode, RunSummary};

/// Retry schedule for idempotent configuration pushes.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// State and handles for one run against one organization.
pub struct WorkflowContext {
    client: MistClient,
    org_id: String,
    cancel: CancellationToken,
    progress: Option<mpsc::UnboundedSender<ProvisioningResult>>,
    results: Vec<ProvisioningResult>,
    retry: RetryPolicy,
    started_at: DateTime<Utc>,
}

impl WorkflowContext {
    /// Build the API client and, if configured, mint the run's ephemeral
    /// token. A token is never minted once `cancel` has fired.
    pub async fn open(config: &ClientConfig, cancel: CancellationToken) -> Result<Self, CoreError> {
        let client = MistClient::new(
            config.api_url.as_str(),
            config.token.clone(),
            &config.transport(),
        )?;

        let ctx = Self {
            client,
            org_id: config.org_id.clone(),
            cancel,
            progress: None,
            results: Vec::new(),
            retry: RetryPolicy::default(),
            started_at: Utc::now(),
        };

        if config.ephemeral_token {
            if ctx.cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            // Not raced against `cancel`: a token minted server-side must
            // always reach the client so `close` can revoke it.
            let token_id = ctx.client.start_ephemeral_session().await?;
            debug!(token_id = %token_id, "running with ephemeral token");
        }

        info!(org_id = %ctx.org_id, api = %ctx.client.base_url(), "workflow context opened");
        Ok(ctx)
    }

    /// Revoke the ephemeral token, if one was minted.
    ///
    /// Does not race cancellation: a cancelled run still cleans up.
    pub async fn close(self) -> Result<(), CoreError> {
        if self.client.has_ephemeral_session() {
            self.client.end_ephemeral_session().await?;
        }
        debug!("workflow context closed");
        Ok(())
    }

    /// Stream every recorded result to `tx` as it happens.
    #[must_use]
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<ProvisioningResult>) -> Self {
        self.progress = Some(tx);
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn client(&self) -> &MistClient {
        &self.client
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    pub fn results(&self) -> &[ProvisioningResult] {
        &self.results
    }

    // ── Recording ────────────────────────────────────────────────────

    pub(crate) fn record(&mut self, result: ProvisioningResult) {
        if let Some(tx) = &self.progress {
            // Receiver gone means nobody is watching; results still accumulate.
            let _ = tx.send(result.clone());
        }
        self.results.push(result);
    }

    /// Drain recorded results into a summary.
    pub(crate) fn summarize(
        &mut self,
        mode: RunMode,
        site: &str,
        halted: Option<Halt>,
    ) -> RunSummary {
        RunSummary {
            mode,
            site: site.to_owned(),
            results: std::mem::take(&mut self.results),
            started_at: self.started_at,
            finished_at: Utc::now(),
            halted,
        }
    }

    // ── Remote call discipline ───────────────────────────────────────

    /// Run a remote call unless, or until, the run is cancelled.
    ///
    /// An already-cancelled token short-circuits before the call is issued.
    pub(crate) async fn guard<T, F>(&self, call: F) -> Result<T, CoreError>
    where
        F: Future<Output = Result<T, CoreError>>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(CoreError::Cancelled),
            result = call => result,
        }
    }

    /// Run an idempotent configuration push, retrying transient failures.
    ///
    /// Honors `Retry-After` on 429. Every attempt and every wait races
    /// cancellation.
    pub(crate) async fn retry_idempotent<F, Fut>(
        &self,
        kind: ResourceKind,
        mut call: F,
    ) -> Result<(), CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), mistly_api::Error>>,
    {
        let mut attempt: u32 = 1;
        loop {
            let err = match self.guard(async { Ok(call().await) }).await? {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            if !err.is_transient() || attempt >= self.retry.max_attempts {
                return Err(CoreError::from_write(kind, err));
            }

            let delay = err
                .retry_after()
                .unwrap_or_else(|| self.retry.backoff(attempt - 1));
            warn!(
                %kind,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient failure, retrying"
            );

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(CoreError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
