use super::{
    channel::BoundedChannel,
    errors::PoolResult,
    model::{FailureKind, FailureReport, PoolMetrics},
    task::{BoxedTask, Task},
};
use std::{
    any::Any,
    backtrace::{Backtrace, BacktraceStatus},
    fmt,
    io::{self, Write},
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

/// Размер канала по умолчанию
pub const DEFAULT_CAPACITY: usize = 100;

pub type FailureHook = Arc<dyn Fn(&FailureReport) + Send + Sync>;

/// Конфигурация пула потоков
#[derive(Clone)]
pub struct Config {
    pub num_workers: usize,
    pub capacity: usize,
    pub thread_name_prefix: String,
    /// Получает каждый отчёт об ошибке. `None` — логирование через `tracing`.
    pub on_failure: Option<FailureHook>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            capacity: DEFAULT_CAPACITY,
            thread_name_prefix: "task-worker".to_string(),
            on_failure: None,
        }
    }
}

impl Config {
    pub fn cpu_bound() -> Self {
        Self::default()
    }

    pub fn io_bound() -> Self {
        Self {
            num_workers: num_cpus::get() * 2,
            ..Self::default()
        }
    }

    pub fn on_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FailureReport) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("num_workers", &self.num_workers)
            .field("capacity", &self.capacity)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

#[derive(Default)]
struct Counters {
    submitted: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

struct Shared {
    channel: BoundedChannel<Option<BoxedTask>>,
    counters: Counters,
    on_failure: Option<FailureHook>,
}

/// Фиксированный набор потоков, разбирающих один общий ограниченный канал.
///
/// Воркеры запускаются в [`WorkerPool::with_config`] и никогда не завершаются:
/// упавшая задача логируется и отбрасывается, воркер снова ждёт следующую.
/// Остановки нет, потоки живут до конца процесса.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(num_workers: usize, capacity: usize) -> PoolResult<Self> {
        Self::with_config(Config {
            num_workers,
            capacity,
            ..Config::default()
        })
    }

    /// Создаёт канал и сразу запускает всех воркеров.
    ///
    /// При `num_workers == 0` пул принимает задачи, пока канал не заполнится,
    /// но никто их не выполняет.
    pub fn with_config(config: Config) -> PoolResult<Self> {
        let shared = Arc::new(Shared {
            channel: BoundedChannel::new(config.capacity)?,
            counters: Counters::default(),
            on_failure: config.on_failure,
        });

        let mut workers = Vec::with_capacity(config.num_workers);
        for id in 0..config.num_workers {
            let shared = Arc::clone(&shared);
            // При ошибке уже запущенные воркеры остаются ждать на канале,
            // до которого больше никто не доберётся: остановки у пула нет.
            let handle = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name_prefix, id))
                .spawn(move || worker_loop(id, &shared))?;
            workers.push(handle);
        }

        tracing::debug!(
            workers = config.num_workers,
            capacity = config.capacity,
            "worker pool started"
        );

        Ok(Self { shared, workers })
    }

    /// Ставит задачу в очередь, блокируясь пока канал заполнен
    pub fn submit<T>(&self, task: T)
    where
        T: Task + 'static,
    {
        self.submit_boxed(Some(Box::new(task)));
    }

    /// Ставит в очередь уже упакованную задачу. `None` принимается и
    /// превращается в ошибку у того воркера, который его достанет.
    pub fn submit_boxed(&self, task: Option<BoxedTask>) {
        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        self.shared.channel.enqueue(task);
    }

    #[inline]
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.channel.capacity()
    }

    pub fn worker_names(&self) -> impl Iterator<Item = &str> {
        self.workers.iter().filter_map(|w| w.thread().name())
    }

    pub fn metrics(&self) -> PoolMetrics {
        let counters = &self.shared.counters;
        PoolMetrics {
            workers: self.workers.len(),
            capacity: self.shared.channel.capacity(),
            queued: self.shared.channel.len(),
            submitted: counters.submitted.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .field("channel", &self.shared.channel)
            .finish_non_exhaustive()
    }
}

fn worker_loop(id: usize, shared: &Shared) {
    tracing::debug!(worker = id, "worker started");

    loop {
        let task = shared.channel.dequeue();

        match run_task(id, task) {
            Ok(()) => {
                shared.counters.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(report) => {
                shared.report(&report);
                shared.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Выполняет одну задачу. Ничего из того, что делает задача (включая панику
/// в `name` или в деструкторе), не выходит за пределы этой функции.
fn run_task(worker: usize, task: Option<BoxedTask>) -> Result<(), FailureReport> {
    let Some(mut task) = task else {
        return Err(FailureReport {
            worker,
            task_name: None,
            kind: FailureKind::Absent,
            message: "task is absent".to_string(),
            backtrace: Backtrace::force_capture().to_string(),
        });
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.execute()));

    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some((FailureKind::Error, format!("{:#}", err), trace_of(&err))),
        Err(payload) => Some((
            FailureKind::Panic,
            panic_message(payload.as_ref()),
            Backtrace::force_capture().to_string(),
        )),
    };

    let result = match failure {
        None => Ok(()),
        Some((kind, message, backtrace)) => Err(FailureReport {
            worker,
            task_name: panic::catch_unwind(AssertUnwindSafe(|| task.name()))
                .ok()
                .and_then(Result::ok),
            kind,
            message,
            backtrace,
        }),
    };

    if panic::catch_unwind(AssertUnwindSafe(move || drop(task))).is_err() {
        tracing::warn!(worker, "task panicked while being dropped");
    }

    result
}

fn trace_of(err: &anyhow::Error) -> String {
    let backtrace = err.backtrace();
    if backtrace.status() == BacktraceStatus::Captured {
        backtrace.to_string()
    } else {
        Backtrace::force_capture().to_string()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked with a non-string payload".to_string()
    }
}

impl Shared {
    fn report(&self, report: &FailureReport) {
        match &self.on_failure {
            Some(hook) => {
                if panic::catch_unwind(AssertUnwindSafe(|| hook(report))).is_err() {
                    tracing::warn!(
                        worker = report.worker,
                        task = report.display_name(),
                        "failure hook panicked"
                    );
                }
            }
            None => log_failure(report),
        }
    }
}

fn log_failure(report: &FailureReport) {
    // Без подписчика tracing молча теряет события, поэтому пишем в stderr
    if tracing::dispatcher::has_been_set() {
        tracing::error!(
            worker = report.worker,
            task = report.display_name(),
            kind = ?report.kind,
            error = %report.message,
            backtrace = %report.backtrace,
            "task failed"
        );
    } else {
        let _ = write_plain(&mut io::stderr().lock(), report);
    }
}

fn write_plain(out: &mut dyn Write, report: &FailureReport) -> io::Result<()> {
    writeln!(
        out,
        "{}:\n{}\n{}\n",
        report.display_name(),
        report.message,
        report.backtrace
    )
}
