use super::{
    errors::{drop_quietly, panic_message, SpawnError},
    handle::Promise,
    model::TaskCounters,
};
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};
use log::{trace, warn};


/// Вызываемый объект, применяемый к кортежу аргументов.
///
/// Реализован для любого `FnOnce` от 0 до 8 аргументов; аргументы
/// перемещаются в вызов, поэтому move-only типы поддерживаются без копирования.
pub trait Invoke<Args> {
    type Output;

    fn invoke(self, args: Args) -> Self::Output;
}

macro_rules! impl_invoke {
    ($($arg:ident: $ty:ident),*) => {
        impl<Func, Ret, $($ty,)*> Invoke<($($ty,)*)> for Func
        where
            Func: FnOnce($($ty),*) -> Ret,
        {
            type Output = Ret;

            #[inline]
            fn invoke(self, ($($arg,)*): ($($ty,)*)) -> Ret {
                self($($arg),*)
            }
        }
    };
}

impl_invoke!();
impl_invoke!(a: A);
impl_invoke!(a: A, b: B);
impl_invoke!(a: A, b: B, c: C);
impl_invoke!(a: A, b: B, c: C, d: D);
impl_invoke!(a: A, b: B, c: C, d: D, e: E);
impl_invoke!(a: A, b: B, c: C, d: D, e: E, f: F);
impl_invoke!(a: A, b: B, c: C, d: D, e: E, f: F, g: G);
impl_invoke!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H);


/// Единица работы в очереди: выполняется ровно один раз и потребляется
pub(crate) trait Task: Send {
    fn execute(self: Box<Self>);
}

pub(crate) type BoxedTask = Box<dyn Task>;


/// Вызываемый объект + захваченные аргументы + сторона записи канала
pub(crate) struct PackagedTask<F, Args>
where
    F: Invoke<Args>,
{
    func: F,
    args: Args,
    promise: Promise<F::Output>,
    counters: Arc<TaskCounters>,
}

impl<F, Args> PackagedTask<F, Args>
where
    F: Invoke<Args>,
{
    pub(crate) fn new(
        func: F,
        args: Args,
        promise: Promise<F::Output>,
        counters: Arc<TaskCounters>,
    ) -> Self {
        Self {
            func,
            args,
            promise,
            counters,
        }
    }
}

impl<F, Args> Task for PackagedTask<F, Args>
where
    F: Invoke<Args> + Send,
    Args: Send,
    F::Output: Send,
{
    fn execute(self: Box<Self>) {
        let PackagedTask { func, args, promise, counters } = *self;

        // Паника не должна пересечь границу воркера: канал всегда разрешается
        match catch_unwind(AssertUnwindSafe(move || func.invoke(args))) {
            Ok(value) => {
                trace!("task completed");
                counters.finished(true);
                promise.set_value(value);
            }
            Err(payload) => {
                let message = panic_message(&*payload);
                drop_quietly(payload, "panic payload");
                warn!("task panicked: {}", message);
                counters.finished(false);
                promise.set_error(SpawnError::Panic(message));
            }
        }
    }
}
