// ABOUTME: Library root for canarist - canary-gated rollouts for cluster services.
// ABOUTME: The surrounding application supplies control-plane clients through Deps.

pub mod client;
pub mod clock;
pub mod config;
pub mod deps;
pub mod diagnostics;
pub mod error;
pub mod recreate;
pub mod rollout;
pub mod run;
pub mod task;
pub mod task_set;
pub mod timeout;
pub mod types;
pub mod up;
pub mod wait;

pub use deps::Deps;
pub use error::{Error, Result};
pub use recreate::{RecreateEngine, RecreateError, RecreateResult};
pub use rollout::{RollOutInput, RolloutError, RolloutExecutor};
pub use run::{RunError, RunInput, RunResult, Runner};
pub use task_set::TaskSet;
pub use up::{ServiceCreator, UpError};
