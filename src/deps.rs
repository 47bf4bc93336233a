// ABOUTME: Explicit dependency bundle threaded through every engine constructor.
// ABOUTME: Holds configuration, control-plane clients and the clock; no global state.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::client::Clients;
use crate::clock::Clock;
use crate::config::Config;
use crate::task::LaunchKind;
use crate::timeout::TimeoutConfig;
use crate::types::ServiceName;
use crate::wait::Waiter;

#[derive(Clone)]
pub struct Deps {
    pub config: Config,
    pub clients: Clients,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Deps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deps")
            .field("cluster", &self.config.cluster)
            .field("service", &self.config.service)
            .finish_non_exhaustive()
    }
}

impl Deps {
    pub fn new(config: Config, clients: Clients, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clients,
            clock,
        }
    }

    pub fn cluster(&self) -> &str {
        &self.config.cluster
    }

    pub fn service(&self) -> &ServiceName {
        &self.config.service
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.config.timeouts
    }

    /// Instance-pinned when a canary container instance is configured.
    pub fn launch_kind(&self) -> LaunchKind {
        match &self.config.canary.instance_arn {
            Some(instance) => LaunchKind::Instance(instance.clone()),
            None => LaunchKind::OnDemand,
        }
    }

    pub fn waiter<'a>(&'a self, cancel: &'a CancellationToken) -> Waiter<'a> {
        Waiter::new(
            self.clients.cluster.as_ref(),
            self.clock.as_ref(),
            self.cluster(),
            cancel,
        )
    }
}
