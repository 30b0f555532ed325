//! Пул потоков фиксированного размера с отложенным результатом для каждой задачи
//!
//! # Features
//! - FIFO очередь, N воркеров, размер задается при создании и не меняется
//! - Произвольные вызываемые объекты с move-only аргументами (`enqueue(f, (a, b))`)
//! - `JoinHandle`: блокирующий `get()` или `.await` из async кода
//! - Паника в задаче доставляется как `SpawnError::Panic`, воркер не падает
//! - Graceful shutdown: все поставленные задачи выполняются до join потоков
//! - Метрики пула
//!
//! ```
//! use deferred_pool::ThreadPool;
//!
//! fn sink(p: Box<i32>) -> i32 {
//!     *p
//! }
//!
//! let pool = ThreadPool::new(4).unwrap();
//! let square = pool.enqueue(|i: i32| i * i, (4,)).unwrap();
//! let boxed = pool.enqueue(sink, (Box::new(42),)).unwrap();
//!
//! assert_eq!(square.get(), Ok(16));
//! assert_eq!(boxed.get(), Ok(42));
//! ```

pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;
pub mod result;
pub mod task;

pub use errors::{PoolError, SpawnError};
pub use handle::JoinHandle;
pub use pool::{ThreadPool, Config};
pub use result::SpawnResult;
