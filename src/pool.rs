use super::{
    errors::{panic_message, PoolError},
    handle::{self, JoinHandle},
    model::{PoolMetrics, TaskCounters},
    task::{BoxedTask, Invoke, PackagedTask},
};
use std::{
    collections::VecDeque,
    io,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, TryLockError},
    thread::{self, ThreadId},
};
use log::{debug, error, trace, warn};


/// Конфигурация пула потоков
#[derive(Debug, Clone)]
pub struct Config {
    pub num_threads: usize,
    pub thread_name: String,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
            thread_name: "deferred-pool-worker".to_owned(),
            stack_size: None,
        }
    }
}

impl Config {
    pub fn cpu_bound() -> Self {
        Self {
            num_threads: num_cpus::get(),
            ..Default::default()
        }
    }

    pub fn io_bound() -> Self {
        Self {
            num_threads: num_cpus::get() * 2,
            ..Default::default()
        }
    }
}


/// Тело воркера, которое получает пользовательский spawner
pub type WorkerFn = Box<dyn FnOnce() + Send + 'static>;

struct State {
    queue: VecDeque<BoxedTask>,
    shutdown: bool,
    active: usize,
    idle: usize,
}

struct Shared {
    state: Mutex<State>,
    available: Condvar,
    drained: Condvar,
    counters: Arc<TaskCounters>,
}

impl Shared {
    // Задачи выполняются вне блокировки, поэтому отравление мьютекса
    // не оставляет состояние очереди в промежуточном виде.
    #[inline]
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_shutdown(&self) {
        {
            let mut state = self.lock();
            state.shutdown = true;
        }
        self.available.notify_all();
    }
}

struct Worker {
    index: usize,
    thread: thread::JoinHandle<()>,
}


/// Пул с фиксированным числом потоков и FIFO очередью задач.
///
/// Каждая задача возвращает `JoinHandle`, через который приходит результат
/// или перехваченная паника. При `shutdown` (или `Drop`) все задачи,
/// поставленные до остановки, выполняются, после чего потоки join-ятся.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<Worker>>,
    worker_ids: Vec<ThreadId>,
    config: Config,
}

impl ThreadPool {
    pub fn new(num_threads: usize) -> Result<Self, PoolError> {
        let config = Config {
            num_threads,
            ..Default::default()
        };
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self, PoolError> {
        let thread_name = config.thread_name.clone();
        let stack_size = config.stack_size;

        Self::with_spawner(config, move |index, body| {
            let mut builder = thread::Builder::new().name(format!("{}-{}", thread_name, index));
            if let Some(size) = stack_size {
                builder = builder.stack_size(size);
            }
            builder.spawn(body)
        })
    }

    /// Создание пула с собственным способом запуска потоков.
    ///
    /// Если `spawner` вернул ошибку, уже запущенные воркеры останавливаются
    /// и join-ятся до возврата `PoolError::Spawn`.
    pub fn with_spawner<S>(config: Config, mut spawner: S) -> Result<Self, PoolError>
    where
        S: FnMut(usize, WorkerFn) -> io::Result<thread::JoinHandle<()>>,
    {
        if config.num_threads == 0 {
            return Err(PoolError::ZeroThreads);
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                shutdown: false,
                active: 0,
                idle: 0,
            }),
            available: Condvar::new(),
            drained: Condvar::new(),
            counters: Arc::new(TaskCounters::default()),
        });

        let mut workers = Vec::with_capacity(config.num_threads);
        for index in 0..config.num_threads {
            let worker_shared = Arc::clone(&shared);
            let body: WorkerFn = Box::new(move || worker_loop(&worker_shared, index));

            match spawner(index, body) {
                Ok(thread) => workers.push(Worker { index, thread }),
                Err(source) => {
                    error!("failed to spawn worker #{}: {}", index, source);
                    shared.request_shutdown();
                    join_workers(workers);
                    return Err(PoolError::Spawn { index, source });
                }
            }
        }

        debug!("thread pool started with {} workers", workers.len());
        let worker_ids = workers.iter().map(|w| w.thread.thread().id()).collect();

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            worker_ids,
            config,
        })
    }

    /// Поставить `func(args...)` в очередь. Аргументы передаются кортежем
    /// и перемещаются в задачу.
    pub fn enqueue<F, Args>(&self, func: F, args: Args) -> Result<JoinHandle<F::Output>, PoolError>
    where
        F: Invoke<Args> + Send + 'static,
        Args: Send + 'static,
        F::Output: Send + 'static,
    {
        let (promise, handle) = handle::channel();
        let task: BoxedTask = Box::new(PackagedTask::new(
            func,
            args,
            promise,
            Arc::clone(&self.shared.counters),
        ));

        {
            let mut state = self.shared.lock();
            if state.shutdown {
                return Err(PoolError::ShutDown);
            }
            state.queue.push_back(task);
            self.shared.counters.spawned();
        }
        self.shared.available.notify_one();

        Ok(handle)
    }

    /// `enqueue` для замыкания без аргументов
    #[inline]
    pub fn spawn<F, T>(&self, func: F) -> Result<JoinHandle<T>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.enqueue(func, ())
    }

    /// Число воркеров, неизменно после создания
    #[inline]
    pub fn num_threads(&self) -> usize {
        self.config.num_threads
    }

    /// Конфигурация, с которой создан пул
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> PoolMetrics {
        let (active_tasks, idle_workers, queued_tasks) = {
            let state = self.shared.lock();
            (state.active, state.idle, state.queue.len())
        };
        let counters = &self.shared.counters;

        PoolMetrics {
            num_threads: self.config.num_threads,
            active_tasks,
            idle_workers,
            queued_tasks,
            total_spawned: counters.total_spawned(),
            completed_tasks: counters.completed(),
            failed_tasks: counters.failed(),
        }
    }

    /// Дождаться, пока очередь опустеет и ни одна задача не выполняется.
    /// Пул остается открытым. Вызов изнутри задачи приведет к deadlock.
    pub fn join_all(&self) {
        let mut state = self.shared.lock();
        while !state.queue.is_empty() || state.active > 0 {
            state = self
                .shared
                .drained
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Явная остановка: новые задачи отклоняются, очередь дорабатывается,
    /// потоки join-ятся. Конкурентный вызов ждет, пока первый закончит join.
    pub fn shutdown(&self) -> Result<(), PoolError> {
        self.shared.request_shutdown();

        let current = thread::current().id();
        let on_worker = self.worker_ids.contains(&current);

        // Список воркеров держим заблокированным на все время join
        let mut workers = if on_worker {
            // Воркер не может ждать того, кто join-ит его самого
            match self.workers.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(e)) => e.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    debug!("shutdown already in progress, worker returns");
                    return Ok(());
                }
            }
        } else {
            self.workers.lock().unwrap_or_else(PoisonError::into_inner)
        };

        let (own, others): (Vec<_>, Vec<_>) = std::mem::take(&mut *workers)
            .into_iter()
            .partition(|w| w.thread.thread().id() == current);
        if !own.is_empty() {
            // Свой поток не join-им: он остается в списке для следующего
            // вызова, а если пул умирает внутри задачи, просто отсоединяется.
            warn!("thread pool shut down from its own worker, leaving it running");
        }
        *workers = own;

        if others.is_empty() {
            return Ok(());
        }

        debug!("shutting down thread pool, joining {} workers", others.len());
        match join_workers(others) {
            0 => Ok(()),
            panicked => Err(PoolError::WorkerPanicked(panicked)),
        }
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("config", &self.config)
            .field("metrics", &self.metrics())
            .finish()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("thread pool shutdown failed: {}", e);
        }
    }
}


fn join_workers(workers: Vec<Worker>) -> usize {
    let mut panicked = 0;
    for worker in workers {
        if worker.thread.join().is_err() {
            error!("worker #{} panicked", worker.index);
            panicked += 1;
        }
    }
    panicked
}

fn worker_loop(shared: &Shared, index: usize) {
    debug!("worker #{} started", index);

    loop {
        let task = {
            let mut state = shared.lock();
            state.idle += 1;
            while !state.shutdown && state.queue.is_empty() {
                state = shared
                    .available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            state.idle -= 1;

            match state.queue.pop_front() {
                Some(task) => {
                    state.active += 1;
                    task
                }
                // shutdown запрошен и очередь пуста
                None => break,
            }
        };

        trace!("worker #{} executing task", index);
        if let Err(payload) = catch_unwind(AssertUnwindSafe(move || task.execute())) {
            error!("worker #{} caught panic escaping a task: {}", index, panic_message(&*payload));
            std::mem::forget(payload);
        }

        let drained = {
            let mut state = shared.lock();
            state.active -= 1;
            state.active == 0 && state.queue.is_empty()
        };
        if drained {
            shared.drained.notify_all();
        }
    }

    debug!("worker #{} stopped", index);
}
