//! Пул потоков фиксированного размера поверх ограниченного блокирующего FIFO канала
//!
//! # Features
//! - `BoundedChannel`: кольцевой буфер с блокирующими `enqueue`/`dequeue`,
//!   безопасен для многих производителей и потребителей
//! - `WorkerPool`: фиксированный набор OS-потоков, выполняющих задачи бесконечно
//! - Изоляция ошибок: ошибки и паники задач логируются и не доходят ни до
//!   отправителя, ни до воркера
//! - Отчёты об ошибках через `tracing` или пользовательский callback, базовые метрики

pub mod channel;
pub mod errors;
pub mod model;
pub mod pool;
pub mod task;

pub use channel::BoundedChannel;
pub use errors::{PoolError, PoolResult};
pub use model::{FailureKind, FailureReport, PoolMetrics};
pub use pool::{Config, WorkerPool};
pub use task::{BoxedTask, Task};
