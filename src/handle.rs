use super::{
    errors::{drop_quietly, SpawnError},
    result::SpawnResult,
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll}
};
use log::trace;
use tokio::sync::oneshot;


/// Создает связанную пару: сторона записи (`Promise`) и сторона чтения (`JoinHandle`)
pub fn channel<T>() -> (Promise<T>, JoinHandle<T>) {
    let (sender, receiver) = oneshot::channel();
    (Promise { sender }, JoinHandle { receiver })
}


/// Сторона записи канала результата.
///
/// Записать можно ровно один раз: `set_value` и `set_error` потребляют `self`,
/// поэтому повторная запись не компилируется:
///
/// ```compile_fail
/// let (promise, _handle) = deferred_pool::handle::channel::<i32>();
/// promise.set_value(1);
/// promise.set_value(2);
/// ```
///
/// Если `Promise` уничтожен без записи, читатель получит `SpawnError::ChannelClosed`.
#[derive(Debug)]
pub struct Promise<T> {
    sender: oneshot::Sender<SpawnResult<T>>,
}

impl<T> Promise<T> {
    #[inline]
    pub fn set_value(self, value: T) {
        self.resolve(Ok(value));
    }

    #[inline]
    pub fn set_error(self, error: SpawnError) {
        self.resolve(Err(error));
    }

    fn resolve(self, outcome: SpawnResult<T>) {
        if let Err(rejected) = self.sender.send(outcome) {
            trace!("join handle dropped, discarding task outcome");
            drop_quietly(rejected, "discarded task outcome");
        }
    }
}


/// Handle на результат задачи.
///
/// `get` блокирует поток до появления результата и потребляет handle,
/// повторное чтение не компилируется:
///
/// ```compile_fail
/// let pool = deferred_pool::ThreadPool::new(1).unwrap();
/// let handle = pool.spawn(|| 1).unwrap();
/// let _ = handle.get();
/// let _ = handle.get();
/// ```
///
/// Для async кода handle реализует `Future`, таймаут можно навесить снаружи
/// (например `tokio::time::timeout`).
#[derive(Debug)]
pub struct JoinHandle<T> {
    receiver: oneshot::Receiver<SpawnResult<T>>,
}

impl<T> JoinHandle<T> {
    /// Блокирующее ожидание результата (поток паркуется, без busy-spin)
    pub fn get(self) -> SpawnResult<T> {
        futures::executor::block_on(self)
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = SpawnResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(res) => Poll::Ready(res.unwrap_or(Err(SpawnError::ChannelClosed))),
            Poll::Pending => Poll::Pending,
        }
    }
}
