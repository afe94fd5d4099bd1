use std::{fmt, future::Future};

/// A unit of work the pool can run.
///
/// `execute` may fail by returning an error or by panicking; the pool treats
/// both the same way. `name` is only consulted to label a failure report and
/// may fail too, in which case the report carries a placeholder.
pub trait Task: Send {
    fn execute(&mut self) -> anyhow::Result<()>;

    fn name(&self) -> anyhow::Result<String>;
}

pub type BoxedTask = Box<dyn Task>;

impl fmt::Debug for dyn Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Ok(name) => f.debug_tuple("Task").field(&name).finish(),
            Err(_) => f.write_str("Task(<unnamed>)"),
        }
    }
}

/// Wraps a closure as a [`Task`]. The closure runs at most once; executing
/// the task again is an error.
pub fn from_fn<F>(name: impl Into<String>, f: F) -> FnTask<F>
where
    F: FnOnce() -> anyhow::Result<()> + Send,
{
    FnTask {
        name: name.into(),
        func: Some(f),
    }
}

/// Wraps a future as a [`Task`]. The worker thread that picks it up drives
/// the future to completion, blocking for its whole duration.
pub fn from_future<Fut>(name: impl Into<String>, fut: Fut) -> FutureTask<Fut>
where
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    FutureTask {
        name: name.into(),
        fut: Some(fut),
    }
}

pub struct FnTask<F> {
    name: String,
    func: Option<F>,
}

impl<F> Task for FnTask<F>
where
    F: FnOnce() -> anyhow::Result<()> + Send,
{
    fn execute(&mut self) -> anyhow::Result<()> {
        match self.func.take() {
            Some(f) => f(),
            None => anyhow::bail!("task `{}` was already executed", self.name),
        }
    }

    fn name(&self) -> anyhow::Result<String> {
        Ok(self.name.clone())
    }
}

pub struct FutureTask<Fut> {
    name: String,
    fut: Option<Fut>,
}

impl<Fut> Task for FutureTask<Fut>
where
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    fn execute(&mut self) -> anyhow::Result<()> {
        match self.fut.take() {
            Some(fut) => futures::executor::block_on(fut),
            None => anyhow::bail!("task `{}` was already executed", self.name),
        }
    }

    fn name(&self) -> anyhow::Result<String> {
        Ok(self.name.clone())
    }
}
