// ABOUTME: Cancellable polling primitives and the scheduler waiters built on them.
// ABOUTME: Every pause races the next poll interval against the cancellation token.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, ClusterClient};
use crate::clock::Clock;
use crate::types::{Service, ServiceName, Task, TaskArn, TaskStatus};

/// Upper bound on the pause between two health polls.
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Pause between two task status polls.
pub const TASK_POLL_INTERVAL: Duration = Duration::from_secs(6);

/// Pause between two service status polls.
pub const SERVICE_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Errors from waiting on an observed state.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WaitError {
    #[error("cancelled")]
    Cancelled,

    #[error("timed out after {}s waiting for {what} (last observed: {last})", .after.as_secs())]
    Timeout {
        what: String,
        after: Duration,
        last: String,
    },

    #[error("task {task} stopped: {reason}")]
    TaskStopped { task: TaskArn, reason: String },

    #[error("service {0} not found")]
    ServiceNotFound(ServiceName),

    #[error("service {0} is inactive")]
    ServiceInactive(ServiceName),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl WaitError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaitError::Cancelled)
    }
}

/// Sleep for `duration` unless `cancel` fires first.
pub async fn pause(
    clock: &dyn Clock,
    cancel: &CancellationToken,
    duration: Duration,
) -> Result<(), WaitError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WaitError::Cancelled),
        _ = clock.sleep(duration) => Ok(()),
    }
}

/// A time budget measured on an injected clock.
pub struct Deadline<'a> {
    clock: &'a dyn Clock,
    started: DateTime<Utc>,
    limit: Duration,
}

impl<'a> Deadline<'a> {
    pub fn start(clock: &'a dyn Clock, limit: Duration) -> Self {
        Self {
            clock,
            started: clock.now(),
            limit,
        }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed_since(self.started)
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed())
    }

    pub fn expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// The next pause: `interval`, or whatever is left of the budget if less.
    pub fn next_interval(&self, interval: Duration) -> Duration {
        self.remaining().min(interval)
    }
}

/// Polls the cluster scheduler until a task or service reaches a state.
pub struct Waiter<'a> {
    pub(crate) client: &'a dyn ClusterClient,
    pub(crate) clock: &'a dyn Clock,
    pub(crate) cluster: &'a str,
    pub(crate) cancel: &'a CancellationToken,
}

impl<'a> Waiter<'a> {
    pub fn new(
        client: &'a dyn ClusterClient,
        clock: &'a dyn Clock,
        cluster: &'a str,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            client,
            clock,
            cluster,
            cancel,
        }
    }

    /// Current state of one task, `None` if the scheduler does not report it.
    pub async fn describe_task(&self, task: &TaskArn) -> Result<Option<Task>, ClientError> {
        let tasks = self
            .client
            .describe_tasks(self.cluster, std::slice::from_ref(task))
            .await?;
        Ok(tasks.into_iter().find(|t| &t.task_arn == task))
    }

    /// Wait until `task` is `RUNNING`. A task that stops first is an error.
    pub async fn task_running(&self, task: &TaskArn, timeout: Duration) -> Result<Task, WaitError> {
        let deadline = Deadline::start(self.clock, timeout);
        let mut last = "not yet visible".to_string();
        loop {
            if let Some(observed) = self.describe_task(task).await? {
                match observed.last_status {
                    TaskStatus::Running => return Ok(observed),
                    TaskStatus::Stopped => {
                        return Err(WaitError::TaskStopped {
                            task: task.clone(),
                            reason: observed.stopped_reason_or_default().to_string(),
                        });
                    }
                    status => last = status.to_string(),
                }
            }
            if deadline.expired() {
                return Err(WaitError::Timeout {
                    what: format!("task {task} to be running"),
                    after: deadline.limit(),
                    last,
                });
            }
            pause(
                self.clock,
                self.cancel,
                deadline.next_interval(TASK_POLL_INTERVAL),
            )
            .await?;
        }
    }

    /// Wait until `task` is `STOPPED`. A task the scheduler no longer reports
    /// counts as stopped.
    pub async fn task_stopped(
        &self,
        task: &TaskArn,
        timeout: Duration,
    ) -> Result<Option<Task>, WaitError> {
        let deadline = Deadline::start(self.clock, timeout);
        loop {
            let last = match self.describe_task(task).await? {
                None => return Ok(None),
                Some(observed) if observed.last_status == TaskStatus::Stopped => {
                    return Ok(Some(observed));
                }
                Some(observed) => observed.last_status.to_string(),
            };
            if deadline.expired() {
                return Err(WaitError::Timeout {
                    what: format!("task {task} to stop"),
                    after: deadline.limit(),
                    last,
                });
            }
            pause(
                self.clock,
                self.cancel,
                deadline.next_interval(TASK_POLL_INTERVAL),
            )
            .await?;
        }
    }

    /// Wait until `service` has a single deployment at its desired count.
    pub async fn service_stable(
        &self,
        service: &ServiceName,
        timeout: Duration,
    ) -> Result<Service, WaitError> {
        let deadline = Deadline::start(self.clock, timeout);
        loop {
            let observed = self
                .client
                .describe_service(self.cluster, service)
                .await?
                .ok_or_else(|| WaitError::ServiceNotFound(service.clone()))?;
            if observed.is_inactive() {
                return Err(WaitError::ServiceInactive(service.clone()));
            }
            if observed.is_stable() {
                return Ok(observed);
            }
            if deadline.expired() {
                return Err(WaitError::Timeout {
                    what: format!("service {service} to become stable"),
                    after: deadline.limit(),
                    last: format!(
                        "{}/{} running, {} deployment(s)",
                        observed.running_count,
                        observed.desired_count,
                        observed.deployments.len()
                    ),
                });
            }
            pause(
                self.clock,
                self.cancel,
                deadline.next_interval(SERVICE_POLL_INTERVAL),
            )
            .await?;
        }
    }

    /// Wait until `service` is `INACTIVE` or gone.
    pub async fn service_inactive(
        &self,
        service: &ServiceName,
        timeout: Duration,
    ) -> Result<(), WaitError> {
        let deadline = Deadline::start(self.clock, timeout);
        loop {
            let last = match self.client.describe_service(self.cluster, service).await? {
                None => return Ok(()),
                Some(observed) if observed.is_inactive() => return Ok(()),
                Some(observed) => format!("{:?}", observed.status),
            };
            if deadline.expired() {
                return Err(WaitError::Timeout {
                    what: format!("service {service} to become inactive"),
                    after: deadline.limit(),
                    last,
                });
            }
            pause(
                self.clock,
                self.cancel,
                deadline.next_interval(SERVICE_POLL_INTERVAL),
            )
            .await?;
        }
    }
}
