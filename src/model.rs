use std::fmt;

/// Name reported for a failed task whose name could not be read.
pub const UNNAMED_TASK: &str = "<unnamed task>";

#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub workers: usize,
    pub capacity: usize,
    pub queued: usize,
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
}

impl PoolMetrics {
    /// Fraction of the channel currently occupied.
    pub fn queue_pressure(&self) -> f64 {
        self.queued as f64 / self.capacity as f64
    }

    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.finished();
        if total == 0 {
            return 1.0;
        }
        self.completed as f64 / total as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The dequeued slot held no task.
    Absent,
    /// `execute` returned an error.
    Error,
    /// `execute` panicked.
    Panic,
}

/// Everything a worker knows about a task it could not run to completion.
#[derive(Debug, Clone)]
pub struct FailureReport {
    pub worker: usize,
    pub task_name: Option<String>,
    pub kind: FailureKind,
    pub message: String,
    pub backtrace: String,
}

impl FailureReport {
    pub fn display_name(&self) -> &str {
        self.task_name.as_deref().unwrap_or(UNNAMED_TASK)
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.display_name(), self.message)
    }
}
