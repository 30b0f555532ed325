use std::{any::Any, io};

/// Ошибка выполнения конкретной задачи, доставляется через `JoinHandle`
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum SpawnError {
    #[error("task panicked: {0}")]
    Panic(String),
    #[error("task was dropped before producing a result")]
    ChannelClosed,
}

/// Ошибки уровня пула: создание, постановка задач, остановка
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("worker count must be at least one")]
    ZeroThreads,
    #[error("failed to spawn worker thread #{index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: io::Error,
    },
    #[error("pool is shut down and no longer accepts tasks")]
    ShutDown,
    #[error("{0} worker thread(s) panicked")]
    WorkerPanicked(usize),
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Уничтожить значение так, чтобы паника в его `Drop` не вышла за пределы воркера
pub(crate) fn drop_quietly<T>(value: T, what: &str) {
    if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || drop(value))) {
        log::warn!("drop of {} panicked: {}", what, panic_message(&*payload));
        // payload мог прийти из того же Drop, второй раз не рискуем
        std::mem::forget(payload);
    }
}
