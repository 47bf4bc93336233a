// ABOUTME: In-memory cluster scheduler for integration tests.
// ABOUTME: Scripted task lifecycles, instantly converging services and a call log.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};

use canarist::client::{
    ClientError, ClusterClient, CreateServiceRequest, RunTaskRequest, StartTaskRequest,
    UpdateServiceRequest,
};
use canarist::types::{
    ContainerInstance, ContainerInstanceArn, ContainerState, HealthStatus, NetworkAttachment,
    NetworkBinding, Service, ServiceArn, ServiceDeployment, ServiceName, ServiceStatus, Task,
    TaskArn, TaskDefinition, TaskDefinitionArn, TaskStatus,
};

pub const CLUSTER: &str = "test-cluster";

/// A control-plane call observed by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateService { service: String, desired_count: u32 },
    UpdateService(UpdateServiceRequest),
    DeleteService(String),
    RunTask(RunTaskRequest),
    StartTask(StartTaskRequest),
    StopTask(String),
}

/// How a launched task behaves over successive polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskScript {
    /// PENDING on the first poll, then RUNNING with every container healthy.
    Healthy,
    /// PENDING, then RUNNING with every container unhealthy.
    UnhealthyContainers,
    /// PENDING, then STOPPED with the given reason.
    StopsBeforeRunning(String),
    /// PENDING, RUNNING, then STOPPED with the given exit code.
    Exits(Option<i32>),
}

struct FakeTask {
    arn: TaskArn,
    task_definition: TaskDefinitionArn,
    script: TaskScript,
    polls: u32,
    stop_requested: bool,
    index: usize,
    container_instance: Option<ContainerInstanceArn>,
}

#[derive(Default)]
struct State {
    services: HashMap<String, Service>,
    stalled: HashSet<String>,
    tasks: Vec<FakeTask>,
    scripts: VecDeque<TaskScript>,
    failures: HashMap<&'static str, ClientError>,
    calls: Vec<Call>,
    capacity: Vec<u32>,
    containers: Vec<(String, Vec<NetworkBinding>)>,
}

#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    /// Containers reported for every launched task, named after `task_definition`.
    pub fn with_containers(task_definition: &TaskDefinition) -> Self {
        let cluster = Self::default();
        cluster.state.lock().containers = task_definition
            .containers
            .iter()
            .map(|c| (c.name.clone(), Vec::new()))
            .collect();
        cluster
    }

    /// Report a dynamic host port binding for a container.
    pub fn bind_port(&self, container: &str, container_port: u16, host_port: u16) {
        let mut state = self.state.lock();
        if let Some((_, bindings)) = state.containers.iter_mut().find(|(n, _)| n == container) {
            bindings.push(NetworkBinding {
                container_port,
                host_port,
            });
        }
    }

    pub fn insert_service(&self, service: Service) {
        let mut state = self.state.lock();
        state
            .services
            .insert(service.service_name.to_string(), service);
        state.record_capacity();
    }

    /// The service never reaches its desired count after a change.
    pub fn stall(&self, service: &str) {
        self.state.lock().stalled.insert(service.to_string());
    }

    /// Scripts consumed by successive launches; `Healthy` once exhausted.
    pub fn script_tasks(&self, scripts: impl IntoIterator<Item = TaskScript>) {
        self.state.lock().scripts.extend(scripts);
    }

    /// Fail every call to `operation` with `error`.
    pub fn fail(&self, operation: &'static str, error: ClientError) {
        self.state.lock().failures.insert(operation, error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn service(&self, name: &str) -> Option<Service> {
        self.state.lock().services.get(name).cloned()
    }

    pub fn launched(&self) -> Vec<TaskArn> {
        self.state.lock().tasks.iter().map(|t| t.arn.clone()).collect()
    }

    pub fn stop_calls(&self, task: &TaskArn) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::StopTask(arn) if arn == task.as_str()))
            .count()
    }

    pub fn update_calls(&self) -> Vec<UpdateServiceRequest> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::UpdateService(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// Total running count across live services after every mutation.
    pub fn capacity_log(&self) -> Vec<u32> {
        self.state.lock().capacity.clone()
    }

    fn launch(
        &self,
        operation: &'static str,
        task_definition: &TaskDefinitionArn,
        container_instance: Option<ContainerInstanceArn>,
        call: Call,
    ) -> Result<Task, ClientError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        state.check(operation)?;

        let index = state.tasks.len() + 1;
        let script = state.scripts.pop_front().unwrap_or(TaskScript::Healthy);
        let task = FakeTask {
            arn: TaskArn::new(format!(
                "arn:aws:ecs:us-east-1:123456789012:task/{CLUSTER}/task{index:04}"
            )),
            task_definition: task_definition.clone(),
            script,
            polls: 0,
            stop_requested: false,
            index,
            container_instance,
        };
        let snapshot = state.snapshot(&task, TaskStatus::Provisioning, HealthStatus::Unknown, None);
        state.tasks.push(task);
        Ok(snapshot)
    }
}

impl State {
    fn check(&self, operation: &'static str) -> Result<(), ClientError> {
        match self.failures.get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn record_capacity(&mut self) {
        let running = self
            .services
            .values()
            .filter(|s| !s.is_inactive())
            .map(|s| s.running_count)
            .sum();
        self.capacity.push(running);
    }

    fn snapshot(
        &self,
        task: &FakeTask,
        status: TaskStatus,
        health: HealthStatus,
        exit_code: Option<i32>,
    ) -> Task {
        Task {
            task_arn: task.arn.clone(),
            task_definition_arn: task.task_definition.clone(),
            last_status: status,
            desired_status: if task.stop_requested {
                TaskStatus::Stopped
            } else {
                TaskStatus::Running
            },
            stopped_reason: None,
            containers: self
                .containers
                .iter()
                .map(|(name, bindings)| ContainerState {
                    name: name.clone(),
                    health_status: health,
                    exit_code,
                    reason: None,
                    network_bindings: bindings.clone(),
                })
                .collect(),
            attachment: Some(NetworkAttachment {
                private_ipv4_address: Some(format!("10.0.1.{}", 10 + task.index)),
                subnet_id: Some("subnet-a".to_string()),
            }),
            container_instance_arn: task.container_instance.clone(),
        }
    }

    fn observe(&mut self, position: usize) -> Task {
        self.tasks[position].polls += 1;
        let task = &self.tasks[position];

        if task.stop_requested {
            let mut snapshot =
                self.snapshot(task, TaskStatus::Stopped, HealthStatus::Unknown, None);
            snapshot.stopped_reason = Some("canary task cleanup".to_string());
            return snapshot;
        }
        if task.polls == 1 {
            return self.snapshot(task, TaskStatus::Pending, HealthStatus::Unknown, None);
        }
        match &task.script {
            TaskScript::Healthy => {
                self.snapshot(task, TaskStatus::Running, HealthStatus::Healthy, None)
            }
            TaskScript::UnhealthyContainers => {
                self.snapshot(task, TaskStatus::Running, HealthStatus::Unhealthy, None)
            }
            TaskScript::StopsBeforeRunning(reason) => {
                let mut snapshot =
                    self.snapshot(task, TaskStatus::Stopped, HealthStatus::Unknown, None);
                snapshot.stopped_reason = Some(reason.clone());
                snapshot
            }
            TaskScript::Exits(_) if task.polls == 2 => {
                self.snapshot(task, TaskStatus::Running, HealthStatus::Healthy, None)
            }
            TaskScript::Exits(code) => {
                let mut snapshot =
                    self.snapshot(task, TaskStatus::Stopped, HealthStatus::Unknown, *code);
                snapshot.stopped_reason = Some("Essential container in task exited".to_string());
                snapshot
            }
        }
    }
}

pub fn active_service(name: &str, task_definition: &str, desired_count: u32) -> Service {
    Service {
        service_name: ServiceName::new(name).expect("valid service name"),
        service_arn: ServiceArn::new(format!(
            "arn:aws:ecs:us-east-1:123456789012:service/{CLUSTER}/{name}"
        )),
        status: ServiceStatus::Active,
        desired_count,
        running_count: desired_count,
        task_definition: TaskDefinitionArn::new(task_definition),
        deployments: vec![ServiceDeployment {
            id: format!("ecs-svc/{name}"),
            status: "PRIMARY".to_string(),
            desired_count,
            running_count: desired_count,
        }],
        load_balancers: Vec::new(),
        service_registries: Vec::new(),
        network_configuration: None,
        platform_version: None,
        launch_type: None,
    }
}

fn converge(service: &mut Service, stalled: bool) {
    let primary = ServiceDeployment {
        id: format!("ecs-svc/{}/primary", service.service_name),
        status: "PRIMARY".to_string(),
        desired_count: service.desired_count,
        running_count: service.desired_count,
    };
    if stalled {
        // The new deployment never replaces the old one.
        service.deployments = vec![
            ServiceDeployment {
                running_count: 0,
                ..primary
            },
            ServiceDeployment {
                id: format!("ecs-svc/{}/active", service.service_name),
                status: "ACTIVE".to_string(),
                desired_count: service.running_count,
                running_count: service.running_count,
            },
        ];
        return;
    }
    service.running_count = service.desired_count;
    service.deployments = vec![primary];
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn describe_service(
        &self,
        _cluster: &str,
        service: &ServiceName,
    ) -> Result<Option<Service>, ClientError> {
        let state = self.state.lock();
        state.check("describe_service")?;
        Ok(state.services.get(service.as_str()).cloned())
    }

    async fn create_service(&self, request: &CreateServiceRequest) -> Result<Service, ClientError> {
        let mut state = self.state.lock();
        let name = request.definition.service_name.to_string();
        state.calls.push(Call::CreateService {
            service: name.clone(),
            desired_count: request.definition.desired_count,
        });
        state.check("create_service")?;
        if state.services.get(&name).is_some_and(|s| !s.is_inactive()) {
            return Err(ClientError::rejected("create_service", "service already exists"));
        }

        let mut service = active_service(&name, request.task_definition.as_str(), 0);
        service.desired_count = request.definition.desired_count;
        service.load_balancers = request.definition.load_balancers.clone();
        service.service_registries = request.definition.service_registries.clone();
        service.network_configuration = request.definition.network_configuration.clone();
        service.platform_version = request.definition.platform_version.clone();
        service.launch_type = request.definition.launch_type;
        let stalled = state.stalled.contains(&name);
        converge(&mut service, stalled);

        state.services.insert(name, service.clone());
        state.record_capacity();
        Ok(service)
    }

    async fn update_service(&self, request: &UpdateServiceRequest) -> Result<Service, ClientError> {
        let mut state = self.state.lock();
        state.calls.push(Call::UpdateService(request.clone()));
        state.check("update_service")?;

        let name = request.service.to_string();
        let stalled = state.stalled.contains(&name);
        let service = state
            .services
            .get_mut(&name)
            .filter(|s| !s.is_inactive())
            .ok_or_else(|| ClientError::not_found("service", name.clone()))?;
        if let Some(arn) = &request.task_definition {
            service.task_definition = arn.clone();
        }
        if let Some(count) = request.desired_count {
            service.desired_count = count;
        }
        if let Some(load_balancers) = &request.load_balancers {
            service.load_balancers = load_balancers.clone();
        }
        if let Some(registries) = &request.service_registries {
            service.service_registries = registries.clone();
        }
        if request.network_configuration.is_some() {
            service.network_configuration = request.network_configuration.clone();
        }
        if request.platform_version.is_some() {
            service.platform_version = request.platform_version.clone();
        }
        converge(service, stalled);
        let updated = service.clone();
        state.record_capacity();
        Ok(updated)
    }

    async fn delete_service(&self, _cluster: &str, service: &ServiceName) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        state.calls.push(Call::DeleteService(service.to_string()));
        state.check("delete_service")?;
        let existing = state
            .services
            .get_mut(service.as_str())
            .ok_or_else(|| ClientError::not_found("service", service.to_string()))?;
        if existing.desired_count > 0 {
            return Err(ClientError::rejected(
                "delete_service",
                "service must be scaled to zero first",
            ));
        }
        existing.status = ServiceStatus::Inactive;
        existing.running_count = 0;
        state.record_capacity();
        Ok(())
    }

    async fn run_task(&self, request: &RunTaskRequest) -> Result<Task, ClientError> {
        self.launch(
            "run_task",
            &request.task_definition,
            None,
            Call::RunTask(request.clone()),
        )
    }

    async fn start_task(&self, request: &StartTaskRequest) -> Result<Task, ClientError> {
        self.launch(
            "start_task",
            &request.task_definition,
            Some(request.container_instance.clone()),
            Call::StartTask(request.clone()),
        )
    }

    async fn stop_task(&self, _cluster: &str, task: &TaskArn, _reason: &str) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        state.calls.push(Call::StopTask(task.to_string()));
        state.check("stop_task")?;
        let fake = state
            .tasks
            .iter_mut()
            .find(|t| &t.arn == task)
            .ok_or_else(|| ClientError::not_found("task", task.to_string()))?;
        fake.stop_requested = true;
        Ok(())
    }

    async fn describe_tasks(&self, _cluster: &str, tasks: &[TaskArn]) -> Result<Vec<Task>, ClientError> {
        let mut state = self.state.lock();
        state.check("describe_tasks")?;
        let positions: Vec<usize> = tasks
            .iter()
            .filter_map(|arn| state.tasks.iter().position(|t| &t.arn == arn))
            .collect();
        Ok(positions.into_iter().map(|p| state.observe(p)).collect())
    }

    async fn describe_container_instance(
        &self,
        _cluster: &str,
        instance: &ContainerInstanceArn,
    ) -> Result<ContainerInstance, ClientError> {
        Ok(ContainerInstance {
            container_instance_arn: instance.clone(),
            ec2_instance_id: "i-0canary".to_string(),
        })
    }
}
