use bounded_pool::{task, Config, WorkerPool};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

struct Unnameable;

impl bounded_pool::Task for Unnameable {
    fn execute(&mut self) -> anyhow::Result<()> {
        anyhow::bail!("unnameable task always fails")
    }

    fn name(&self) -> anyhow::Result<String> {
        anyhow::bail!("no name")
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let now = Instant::now();
    let pool = WorkerPool::with_config(Config::cpu_bound())?;
    let (done_tx, done_rx) = crossbeam::channel::unbounded();

    const TASKS: usize = 1_000;
    for i in 0..TASKS {
        let done_tx = done_tx.clone();
        pool.submit(task::from_fn(format!("square-{}", i), move || {
            done_tx.send(i * i)?;
            Ok(())
        }));
    }

    pool.submit(task::from_fn("division", || {
        let divisor: u32 = "0".parse()?;
        anyhow::ensure!(divisor != 0, "refusing to divide by zero");
        Ok(())
    }));
    pool.submit(Unnameable);
    pool.submit_boxed(None);

    let mut sum = 0usize;
    for _ in 0..TASKS {
        sum += done_rx.recv_timeout(Duration::from_secs(10))?;
    }

    // ошибки логируются асинхронно, даём воркерам время
    std::thread::sleep(Duration::from_millis(100));

    let metrics = pool.metrics();
    println!("sum of squares: {}", sum);
    println!("metrics: {:?}", metrics);
    println!("success rate: {:.1}%", metrics.success_rate() * 100.0);
    println!("elapsed: {:?}", now.elapsed());
    Ok(())
}
