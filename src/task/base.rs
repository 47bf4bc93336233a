// ABOUTME: Launch, running-state wait and container health gate shared by all canary variants.
// ABOUTME: Also resolves a running task's private address, availability zone and published port.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::TaskError;
use super::target::{CanaryTaskHandle, LaunchKind, TaskPhase};
use crate::client::{RunTaskRequest, StartTaskRequest};
use crate::deps::Deps;
use crate::diagnostics::{Diagnostics, Warning};
use crate::timeout::Phase;
use crate::types::{
    Attachments, ContainerOverride, HealthStatus, NetworkConfiguration, Task, TaskArn,
    TaskDefinition, TaskStatus,
};
use crate::wait::{Deadline, HEALTH_POLL_INTERVAL, WaitError, pause};

/// Pause between launch acceptance and the first status poll, while the
/// scheduler catches up with the new task.
pub const LAUNCH_GRACE: Duration = Duration::from_secs(5);

const STOP_REASON: &str = "canary task cleanup";

/// How and where a task is launched.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub task_definition: Arc<TaskDefinition>,
    pub network_configuration: Option<NetworkConfiguration>,
    pub platform_version: Option<String>,
    pub group: String,
}

impl LaunchSpec {
    /// Launch parameters for a canary borrowing `attachments`.
    pub fn canary(deps: &Deps, task_definition: Arc<TaskDefinition>, attachments: &Attachments) -> Self {
        Self {
            task_definition,
            network_configuration: attachments.network_configuration.clone(),
            platform_version: attachments.platform_version.clone(),
            group: deps.config.canary.task_group.clone(),
        }
    }
}

/// Address a running task is reachable at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkIdentity {
    pub private_ip: String,
    pub availability_zone: String,
}

/// Behavior common to every canary variant. Variants delegate to it and keep
/// only their own verification state.
pub struct TaskBase {
    deps: Arc<Deps>,
    spec: LaunchSpec,
    handle: CanaryTaskHandle,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for TaskBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskBase")
            .field("task_definition", &self.spec.task_definition.arn)
            .field("handle", &self.handle)
            .finish()
    }
}

impl TaskBase {
    pub fn new(deps: Arc<Deps>, spec: LaunchSpec) -> Self {
        let handle = CanaryTaskHandle::new(deps.launch_kind());
        Self {
            deps,
            spec,
            handle,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn handle(&self) -> &CanaryTaskHandle {
        &self.handle
    }

    pub fn deps(&self) -> &Arc<Deps> {
        &self.deps
    }

    pub fn warnings(&self) -> &[Warning] {
        self.diagnostics.warnings()
    }

    /// Record a best-effort cleanup failure.
    pub(crate) fn warn(&mut self, warning: Warning) {
        self.diagnostics.warn(warning);
    }

    pub fn task_definition(&self) -> &TaskDefinition {
        &self.spec.task_definition
    }

    pub fn task_arn(&self) -> Result<&TaskArn, TaskError> {
        self.handle.task_arn.as_ref().ok_or(TaskError::NotStarted)
    }

    pub(crate) fn set_phase(&mut self, phase: TaskPhase) {
        debug!(
            task = self.handle.task_arn.as_ref().map(|a| a.as_str()).unwrap_or("-"),
            from = %self.handle.phase,
            to = %phase,
            "canary task phase"
        );
        self.handle.phase = phase;
    }

    /// Record the outcome of a step: `phase` on success, `Failed` otherwise.
    pub(crate) fn settle<T>(
        &mut self,
        result: Result<T, TaskError>,
        phase: TaskPhase,
    ) -> Result<T, TaskError> {
        match &result {
            Ok(_) => self.set_phase(phase),
            Err(e) => {
                warn!(
                    task = self.handle.task_arn.as_ref().map(|a| a.as_str()).unwrap_or("-"),
                    error = %e,
                    "canary task failed"
                );
                self.set_phase(TaskPhase::Failed);
            }
        }
        result
    }

    /// Start contract shared by all variants: launch with no overrides.
    pub async fn start(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        let result = if cancel.is_cancelled() {
            Err(WaitError::Cancelled.into())
        } else {
            self.launch(Vec::new()).await.map(|_| ())
        };
        self.settle(result, TaskPhase::Starting)
    }

    /// Launch the task on the configured container instance, or on
    /// scheduler-managed capacity when none is configured.
    pub async fn launch(&mut self, overrides: Vec<ContainerOverride>) -> Result<TaskArn, TaskError> {
        if let Some(arn) = &self.handle.task_arn {
            return Ok(arn.clone());
        }
        self.set_phase(TaskPhase::Starting);

        let deps = Arc::clone(&self.deps);
        let client = &deps.clients.cluster;
        let launched = match &self.handle.launch {
            LaunchKind::Instance(instance) => {
                client
                    .start_task(&StartTaskRequest {
                        cluster: deps.cluster().to_string(),
                        task_definition: self.spec.task_definition.arn.clone(),
                        group: self.spec.group.clone(),
                        container_instance: instance.clone(),
                        network_configuration: self.spec.network_configuration.clone(),
                        overrides,
                    })
                    .await
            }
            LaunchKind::OnDemand => {
                client
                    .run_task(&RunTaskRequest {
                        cluster: deps.cluster().to_string(),
                        task_definition: self.spec.task_definition.arn.clone(),
                        group: self.spec.group.clone(),
                        launch_type: deps.config.canary.launch_type,
                        network_configuration: self.spec.network_configuration.clone(),
                        platform_version: self.spec.platform_version.clone(),
                        overrides,
                    })
                    .await
            }
        };
        let task = launched.map_err(TaskError::Launch)?;

        info!(
            task = %task.task_arn,
            task_definition = %self.spec.task_definition.arn,
            launch = ?self.handle.launch,
            "task launched"
        );
        self.handle.task_arn = Some(task.task_arn.clone());
        Ok(task.task_arn)
    }

    /// Give the scheduler a moment, then wait for the task to be running.
    pub async fn wait_running(&mut self, cancel: &CancellationToken) -> Result<Task, TaskError> {
        let arn = self.task_arn()?.clone();
        let deps = Arc::clone(&self.deps);

        pause(deps.clock.as_ref(), cancel, LAUNCH_GRACE).await?;
        let task = deps
            .waiter(cancel)
            .task_running(&arn, deps.timeouts().resolve(Phase::TaskRunning))
            .await?;

        info!(task = %arn, "task is running");
        self.set_phase(TaskPhase::Running);
        Ok(task)
    }

    /// Wait until every container that declares a health check reports
    /// healthy. The task leaving `RUNNING` fails the gate immediately.
    pub async fn wait_container_health(&self, cancel: &CancellationToken) -> Result<(), TaskError> {
        let arn = self.task_arn()?;
        let checked: Vec<&str> = self
            .spec
            .task_definition
            .health_checked_containers()
            .map(|c| c.name.as_str())
            .collect();
        if checked.is_empty() {
            debug!(task = %arn, "no container declares a health check");
            return Ok(());
        }

        let deps = &self.deps;
        let waiter = deps.waiter(cancel);
        let deadline = Deadline::start(
            deps.clock.as_ref(),
            deps.timeouts().resolve(Phase::TaskHealthCheck),
        );
        loop {
            let task = self.observe_running(&waiter, arn).await?;
            let pending: Vec<&str> = checked
                .iter()
                .copied()
                .filter(|name| {
                    task.container(name).map(|c| c.health_status) != Some(HealthStatus::Healthy)
                })
                .collect();
            if pending.is_empty() {
                info!(task = %arn, containers = checked.len(), "containers are healthy");
                return Ok(());
            }
            if deadline.expired() {
                return Err(TaskError::ContainerHealthTimeout {
                    task: arn.clone(),
                    containers: pending.join(", "),
                    after: deadline.limit(),
                });
            }
            debug!(task = %arn, pending = ?pending, "waiting for container health");
            pause(
                deps.clock.as_ref(),
                cancel,
                deadline.next_interval(HEALTH_POLL_INTERVAL),
            )
            .await?;
        }
    }

    /// Describe the task and require it to still be running.
    pub async fn ensure_running(&self, cancel: &CancellationToken) -> Result<Task, TaskError> {
        let arn = self.task_arn()?;
        self.observe_running(&self.deps.waiter(cancel), arn).await
    }

    async fn observe_running(
        &self,
        waiter: &crate::wait::Waiter<'_>,
        arn: &TaskArn,
    ) -> Result<Task, TaskError> {
        let task = waiter
            .describe_task(arn)
            .await?
            .ok_or_else(|| TaskError::TaskNotFound(arn.clone()))?;
        if task.last_status != TaskStatus::Running {
            return Err(TaskError::NotRunning {
                task: arn.clone(),
                status: task.last_status,
                reason: task.stopped_reason_or_default().to_string(),
            });
        }
        Ok(task)
    }

    /// Private address and availability zone of a running task: its own
    /// network interface when on-demand, its host instance when pinned.
    pub async fn network_identity(&self, task: &Task) -> Result<NetworkIdentity, TaskError> {
        let deps = &self.deps;
        let unavailable = |detail: &str| TaskError::AddressUnavailable {
            task: task.task_arn.clone(),
            detail: detail.to_string(),
        };

        match &self.handle.launch {
            LaunchKind::OnDemand => {
                let attachment = task
                    .attachment
                    .as_ref()
                    .ok_or_else(|| unavailable("no network interface attached"))?;
                let private_ip = attachment
                    .private_ipv4_address
                    .clone()
                    .ok_or_else(|| unavailable("network interface has no private address"))?;
                let subnet_id = attachment
                    .subnet_id
                    .as_deref()
                    .ok_or_else(|| unavailable("network interface has no subnet"))?;
                let subnet = deps.clients.instances.describe_subnet(subnet_id).await?;
                Ok(NetworkIdentity {
                    private_ip,
                    availability_zone: subnet.availability_zone,
                })
            }
            LaunchKind::Instance(configured) => {
                let instance_arn = task.container_instance_arn.as_ref().unwrap_or(configured);
                let container_instance = deps
                    .clients
                    .cluster
                    .describe_container_instance(deps.cluster(), instance_arn)
                    .await?;
                let instance = deps
                    .clients
                    .instances
                    .describe_instance(&container_instance.ec2_instance_id)
                    .await?;
                let subnet = deps
                    .clients
                    .instances
                    .describe_subnet(&instance.subnet_id)
                    .await?;
                Ok(NetworkIdentity {
                    private_ip: instance.private_ip_address,
                    availability_zone: subnet.availability_zone,
                })
            }
        }
    }

    /// Port the task publishes for `container_port` of `container`: the
    /// scheduler's network binding, else the static host port of the mapping,
    /// else the container port itself.
    pub fn published_port(
        &self,
        task: &Task,
        container: &str,
        container_port: u16,
    ) -> Result<u16, TaskError> {
        let definition = self.spec.task_definition.container(container).ok_or_else(|| {
            TaskError::ContainerNotFound {
                container: container.to_string(),
                task_definition: self.spec.task_definition.arn.to_string(),
            }
        })?;
        let bound = task.container(container).and_then(|state| {
            state
                .network_bindings
                .iter()
                .find(|b| b.container_port == container_port && b.host_port != 0)
                .map(|b| b.host_port)
        });
        Ok(bound
            .or_else(|| definition.host_port_for(container_port))
            .unwrap_or(container_port))
    }

    /// Stop the task and wait for it to be stopped. A task that was never
    /// launched, or is already stopped, issues no call.
    pub async fn stop_task(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        if self.handle.phase == TaskPhase::Stopped {
            return Ok(());
        }
        let Some(arn) = self.handle.task_arn.clone() else {
            debug!("canary task was never launched; nothing to stop");
            self.set_phase(TaskPhase::Stopped);
            return Ok(());
        };

        self.set_phase(TaskPhase::Stopping);
        let deps = Arc::clone(&self.deps);
        info!(task = %arn, "stopping task");
        deps.clients
            .cluster
            .stop_task(deps.cluster(), &arn, STOP_REASON)
            .await?;
        deps.waiter(cancel)
            .task_stopped(&arn, deps.timeouts().resolve(Phase::TaskStopped))
            .await?;

        self.set_phase(TaskPhase::Stopped);
        info!(task = %arn, "task stopped");
        Ok(())
    }
}
