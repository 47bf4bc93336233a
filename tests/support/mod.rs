// ABOUTME: Test support utilities.
// ABOUTME: In-memory control-plane fakes, fixtures and a virtual-time harness.

use std::sync::{Arc, Once};
use std::time::Duration;

use canarist::client::{Clients, InstanceClient};
use canarist::clock::ManualClock;
use canarist::config::Config;
use canarist::deps::Deps;
use canarist::timeout::{Phase, TimeoutConfig};
use canarist::types::{
    ContainerDefinition, ContainerHealthCheck, LoadBalancer, PortMapping, ServiceDefinition,
    ServiceName, ServiceRegistry, RegistryArn, TargetGroupArn, TaskDefinition,
    TaskDefinitionArn,
};

// Each test binary only uses some of these modules, so allow dead_code.
#[allow(dead_code)]
pub mod cluster;
#[allow(dead_code)]
pub mod discovery;
#[allow(dead_code)]
pub mod load_balancer;

use cluster::{CLUSTER, FakeCluster};
use discovery::{FakeDiscovery, FakeInstances};
use load_balancer::FakeLoadBalancer;

pub const SERVICE: &str = "web";
pub const OLD_TASK_DEFINITION: &str = "arn:aws:ecs:us-east-1:123456789012:task-definition/web:6";
pub const NEW_TASK_DEFINITION: &str = "arn:aws:ecs:us-east-1:123456789012:task-definition/web:7";
pub const TARGET_GROUP: &str =
    "arn:aws:elasticloadbalancing:us-east-1:123456789012:targetgroup/web/0123456789abcdef";
pub const REGISTRY: &str = "arn:aws:servicediscovery:us-east-1:123456789012:service/srv-web";

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("canarist=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A task definition with one health-checked container listening on 8080.
#[allow(dead_code)]
pub fn task_definition() -> TaskDefinition {
    TaskDefinition {
        arn: TaskDefinitionArn::new(NEW_TASK_DEFINITION),
        family: "web".to_string(),
        containers: vec![ContainerDefinition {
            name: "app".to_string(),
            image: "registry.example.com/web:7".to_string(),
            essential: true,
            port_mappings: vec![PortMapping {
                container_port: 8080,
                host_port: None,
            }],
            health_check: Some(ContainerHealthCheck {
                command: vec![
                    "CMD-SHELL".to_string(),
                    "curl -f http://localhost:8080/health".to_string(),
                ],
            }),
        }],
    }
}

#[allow(dead_code)]
pub fn load_balancer() -> LoadBalancer {
    LoadBalancer {
        target_group_arn: TargetGroupArn::new(TARGET_GROUP),
        container_name: "app".to_string(),
        container_port: 8080,
    }
}

#[allow(dead_code)]
pub fn registry() -> ServiceRegistry {
    ServiceRegistry {
        registry_arn: RegistryArn::new(REGISTRY),
        container_name: Some("app".to_string()),
        container_port: Some(8080),
        port: None,
    }
}

#[allow(dead_code)]
pub fn service_definition(desired_count: u32) -> ServiceDefinition {
    ServiceDefinition {
        service_name: ServiceName::new(SERVICE).unwrap(),
        desired_count,
        load_balancers: vec![load_balancer()],
        service_registries: Vec::new(),
        network_configuration: None,
        platform_version: None,
        launch_type: None,
        service_connect_configuration: None,
        volume_configurations: Vec::new(),
    }
}

/// Phase timeouts short enough that failing waits end after a few polls.
#[allow(dead_code)]
pub fn short_timeouts() -> TimeoutConfig {
    TimeoutConfig::new(Duration::from_secs(120)).with_phase(Phase::CanaryIdle, Duration::from_secs(30))
}

/// Fakes wired into a `Deps` running on virtual time.
pub struct Harness {
    pub cluster: Arc<FakeCluster>,
    pub load_balancer: Arc<FakeLoadBalancer>,
    pub discovery: Arc<FakeDiscovery>,
    pub instances: Arc<dyn InstanceClient>,
    pub clock: Arc<ManualClock>,
    pub config: Config,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let mut config = Config::new(CLUSTER, ServiceName::new(SERVICE).unwrap());
        config.timeouts = short_timeouts();
        Self {
            cluster: Arc::new(FakeCluster::with_containers(&task_definition())),
            load_balancer: Arc::new(FakeLoadBalancer::default()),
            discovery: Arc::new(FakeDiscovery::default()),
            instances: Arc::new(FakeInstances),
            clock: Arc::new(ManualClock::default()),
            config,
        }
    }

    pub fn deps(&self) -> Arc<Deps> {
        let clients = Clients {
            cluster: self.cluster.clone(),
            load_balancer: self.load_balancer.clone(),
            instances: self.instances.clone(),
            discovery: self.discovery.clone(),
        };
        Arc::new(Deps::new(self.config.clone(), clients, self.clock.clone()))
    }
}
