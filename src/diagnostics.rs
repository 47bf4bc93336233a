// ABOUTME: Diagnostics accumulator for non-fatal warnings raised during canary cleanup.
// ABOUTME: Collects failures that must not fail a rollout but should be shown to users.

/// Collects non-fatal warnings during rollout operations.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Take over warnings already logged elsewhere.
    pub fn absorb(&mut self, warnings: &[Warning]) {
        self.warnings.extend_from_slice(warnings);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create a target deregistration warning.
    pub fn target_deregistration(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::TargetDeregistration,
            message: message.into(),
        }
    }

    /// Create a discovery instance deregistration warning.
    pub fn instance_deregistration(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::InstanceDeregistration,
            message: message.into(),
        }
    }

    /// Create a canary stop warning.
    pub fn task_stop(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::TaskStop,
            message: message.into(),
        }
    }

    /// Create a cleanup budget exhausted warning.
    pub fn cleanup_timeout(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::CleanupTimeout,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Target could not be deregistered or was not confirmed gone.
    TargetDeregistration,
    /// Discovery instance could not be deregistered.
    InstanceDeregistration,
    /// A canary task could not be stopped (it may still be running).
    TaskStop,
    /// Cleanup did not finish within its budget.
    CleanupTimeout,
}
