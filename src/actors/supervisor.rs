//! Supervisor - Starts one ActionActor per configured action
//!
//! The supervisor owns every actor's handle and task. Shutdown is broadcast
//! as a `Shutdown` command to all actors, and [`Supervisor::shutdown`] only
//! returns once every task has finished its current cycle and exited.

use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::command::{CommandTrigger, Trigger};
use crate::config::{Config, ResolvedActionConfig};
use crate::fetcher::{HttpSource, MetricSource};

use super::action::ActionHandle;

pub struct Supervisor {
    actions: Vec<(ActionHandle, JoinHandle<()>)>,
}

impl Supervisor {
    /// Start every action of a validated configuration
    ///
    /// All actions share one HTTP client and one command runner.
    pub fn start(config: &Config) -> Result<Self> {
        let source = Arc::new(HttpSource::new(config.fetch_timeout())?);
        let trigger = Arc::new(CommandTrigger::new(config.command_settings()));

        Ok(Self::start_with(
            &config.graphite_base,
            config.resolve_actions(),
            source,
            trigger,
        ))
    }

    /// Start the given actions with explicit fetch and trigger implementations
    pub fn start_with(
        graphite_base: &str,
        actions: Vec<ResolvedActionConfig>,
        source: Arc<dyn MetricSource>,
        trigger: Arc<dyn Trigger>,
    ) -> Self {
        let actions = actions
            .into_iter()
            .map(|action| {
                info!(
                    action = %action.name,
                    metric = %action.metric,
                    threshold = action.threshold,
                    direction = %action.direction,
                    interval = action.interval,
                    "starting action"
                );
                ActionHandle::spawn(action, graphite_base, source.clone(), trigger.clone())
            })
            .collect();

        Self { actions }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = &ActionHandle> {
        self.actions.iter().map(|(handle, _)| handle)
    }

    pub fn handle(&self, name: &str) -> Option<&ActionHandle> {
        self.handles().find(|handle| handle.name() == name)
    }

    /// Stop all actions and wait until each of them has exited
    pub async fn shutdown(self) {
        let (handles, tasks): (Vec<_>, Vec<_>) = self.actions.into_iter().unzip();

        for handle in &handles {
            if let Err(e) = handle.shutdown().await {
                // The actor is already gone; its task still gets joined below.
                debug!(action = handle.name(), "{e:#}");
            }
        }

        let results = join_all(tasks).await;
        for (handle, result) in handles.iter().zip(results) {
            if let Err(e) = result {
                error!(action = handle.name(), "action task failed: {e}");
            }
        }

        info!(count = handles.len(), "all actions stopped");
    }
}
