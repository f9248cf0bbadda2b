//! ActionActor - Watches one metric and runs its command on threshold breach
//!
//! ## Message Flow
//!
//! ```text
//! Fetch → Evaluate → (Trigger command) → Sleep interval + jitter → Fetch → ...
//!                                          ↑
//!                                          └─── Commands (CheckNow, Shutdown)
//! ```
//!
//! Every cycle is isolated: fetch errors, failing commands and even panics
//! are logged and the actor carries on with its next scheduled check.

use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::FutureExt;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::command::Trigger;
use crate::config::ResolvedActionConfig;
use crate::error::ExecutionError;
use crate::fetcher::{MetricFetcher, MetricSource};
use crate::scheduler::JitteredSchedule;
use crate::threshold::should_trigger;

use super::messages::{ActionCommand, CheckOutcome, CheckReport};

/// Actor that owns a single configured action
///
/// Each action gets its own actor. The actor runs in a loop, checking its
/// metric, sleeping for the jittered interval and reacting to commands.
pub struct ActionActor {
    /// Resolved action configuration
    config: ResolvedActionConfig,

    /// Fetcher bound to this action's query URL
    fetcher: MetricFetcher,

    /// Runs the command when the threshold is crossed
    trigger: Arc<dyn Trigger>,

    /// Source of the delays between checks
    schedule: JitteredSchedule,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<ActionCommand>,
}

impl ActionActor {
    /// Create a new action actor
    pub fn new(
        config: ResolvedActionConfig,
        graphite_base: &str,
        source: Arc<dyn MetricSource>,
        trigger: Arc<dyn Trigger>,
        command_rx: mpsc::Receiver<ActionCommand>,
    ) -> Self {
        let fetcher = MetricFetcher::new(graphite_base, &config.metric, source);
        let schedule = JitteredSchedule::new(config.interval);

        Self {
            config,
            fetcher,
            trigger,
            schedule,
            command_rx,
        }
    }

    /// Run the actor's main loop
    ///
    /// The first check happens immediately. The loop runs until:
    /// - A Shutdown command is received
    /// - The command channel is closed
    #[instrument(skip(self), fields(action = %self.config.name))]
    pub async fn run(mut self) {
        debug!(
            url = %self.fetcher.url(),
            interval = self.schedule.interval_secs(),
            "starting action actor"
        );

        loop {
            if self.drain_commands().await.is_break() {
                break;
            }

            self.guarded_check().await;

            let delay = self.schedule.next_delay();
            trace!(delay_secs = delay.as_secs(), "sleeping until next check");

            if self.wait(delay).await.is_break() {
                break;
            }
        }

        debug!("action actor stopped");
    }

    /// Serve commands that queued up while a check was running, so a pending
    /// Shutdown stops the actor before another fetch
    async fn drain_commands(&mut self) -> ControlFlow<()> {
        loop {
            match self.command_rx.try_recv() {
                Ok(ActionCommand::CheckNow { respond_to }) => {
                    debug!("received CheckNow command");
                    let report = self.guarded_check().await;
                    let _ = respond_to.send(report);
                }

                Ok(ActionCommand::Shutdown) => {
                    debug!("received shutdown command");
                    return ControlFlow::Break(());
                }

                Err(TryRecvError::Empty) => return ControlFlow::Continue(()),

                Err(TryRecvError::Disconnected) => {
                    warn!("command channel closed, shutting down");
                    return ControlFlow::Break(());
                }
            }
        }
    }

    /// Sleep until the next check is due while serving commands
    async fn wait(&mut self, delay: Duration) -> ControlFlow<()> {
        let sleep = sleep_until(Instant::now() + delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(ActionCommand::CheckNow { respond_to }) => {
                            debug!("received CheckNow command");
                            let report = self.guarded_check().await;
                            let _ = respond_to.send(report);
                        }

                        Some(ActionCommand::Shutdown) => {
                            debug!("received shutdown command");
                            return ControlFlow::Break(());
                        }

                        // Command channel closed - exit
                        None => {
                            warn!("command channel closed, shutting down");
                            return ControlFlow::Break(());
                        }
                    }
                }

                _ = &mut sleep => return ControlFlow::Continue(()),
            }
        }
    }

    /// Run one check, turning a panic into [`CheckOutcome::Panicked`]
    async fn guarded_check(&self) -> CheckReport {
        let checked_at = Utc::now();

        let outcome = AssertUnwindSafe(self.check())
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!("check panicked, continuing with next cycle");
                CheckOutcome::Panicked
            });

        CheckReport {
            action: self.config.name.clone(),
            checked_at,
            outcome,
        }
    }

    /// Fetch, evaluate and possibly trigger
    async fn check(&self) -> CheckOutcome {
        let ResolvedActionConfig {
            threshold,
            direction,
            ..
        } = self.config;

        let value = match self.fetcher.fetch().await {
            Ok(value) => value,
            Err(e) => {
                error!(kind = e.kind(), error = %e, "fetch failed");
                return CheckOutcome::FetchFailed(e);
            }
        };

        if !should_trigger(value, threshold, direction) {
            trace!(value, threshold, %direction, "threshold not crossed");
            return CheckOutcome::Idle { value };
        }

        info!(value, threshold, %direction, "triggering");
        let execution = self.trigger.execute(&self.config.command).await;

        match &execution {
            Ok(report) => info!(
                exit_code = report.exit_code,
                duration_ms = report.duration.as_millis() as u64,
                stdout = %report.stdout.trim_end(),
                stderr = %report.stderr.trim_end(),
                truncated = report.truncated,
                "command finished"
            ),
            Err(ExecutionError::NonZero { code, stderr }) => warn!(
                kind = "nonzero",
                code,
                stderr = %stderr.trim_end(),
                "command failed"
            ),
            Err(e @ ExecutionError::Timeout { stdout, stderr, .. }) => error!(
                kind = "timeout",
                error = %e,
                stdout = %stdout.trim_end(),
                stderr = %stderr.trim_end(),
                "command failed"
            ),
            Err(e) => error!(kind = e.kind(), error = %e, "command failed"),
        }

        CheckOutcome::Triggered { value, execution }
    }
}

/// Handle for controlling an ActionActor
///
/// This handle provides a typed API for sending commands to the actor.
/// It can be cloned and shared across tasks.
#[derive(Clone)]
pub struct ActionHandle {
    /// Command sender
    sender: mpsc::Sender<ActionCommand>,

    /// Action name from the configuration
    name: String,

    /// Render URL the action polls
    url: String,
}

impl ActionHandle {
    /// Spawn a new action actor
    ///
    /// This creates the actor, spawns it as a tokio task and returns a handle
    /// together with the task, which completes once the actor has stopped.
    pub fn spawn(
        config: ResolvedActionConfig,
        graphite_base: &str,
        source: Arc<dyn MetricSource>,
        trigger: Arc<dyn Trigger>,
    ) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let name = config.name.clone();

        let actor = ActionActor::new(config, graphite_base, source, trigger, cmd_rx);
        let url = actor.fetcher.url().to_string();

        let task = tokio::spawn(actor.run());

        let handle = Self {
            sender: cmd_tx,
            name,
            url,
        };

        (handle, task)
    }

    /// Run a check immediately and wait for its report
    pub async fn check_now(&self) -> Result<CheckReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ActionCommand::CheckNow { respond_to: tx })
            .await
            .context("failed to send CheckNow command")?;

        rx.await.context("failed to receive check report")
    }

    /// Ask the actor to stop after its current cycle
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(ActionCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}
