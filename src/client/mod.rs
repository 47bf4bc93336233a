// ABOUTME: Control-plane client traits implemented by the surrounding application.
// ABOUTME: Defines ClusterClient, LoadBalancerClient, InstanceClient and DiscoveryClient.

mod cluster;
mod discovery;
mod error;
mod instance;
mod load_balancer;

pub use cluster::{
    ClusterClient, CreateServiceRequest, RunTaskRequest, StartTaskRequest, UpdateServiceRequest,
};
pub use discovery::DiscoveryClient;
pub use error::ClientError;
pub use instance::InstanceClient;
pub use load_balancer::LoadBalancerClient;

use std::sync::Arc;

/// The set of clients a rollout talks to, built once at process start.
#[derive(Clone)]
pub struct Clients {
    pub cluster: Arc<dyn ClusterClient>,
    pub load_balancer: Arc<dyn LoadBalancerClient>,
    pub instances: Arc<dyn InstanceClient>,
    pub discovery: Arc<dyn DiscoveryClient>,
}

impl std::fmt::Debug for Clients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clients").finish_non_exhaustive()
    }
}
