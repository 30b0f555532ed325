use deferred_pool::{PoolError, ThreadPool};


fn sink(p: Box<i32>) -> i32 {
    *p
}

fn main() -> Result<(), PoolError> {
    let pool = ThreadPool::new(4)?;

    // замыкание с аргументом
    let fut = pool.enqueue(|i: i32| i * i, (4,))?;

    // move-only аргумент
    let fut2 = pool.enqueue(sink, (Box::new(42),))?;

    match (fut.get(), fut2.get()) {
        (Ok(a), Ok(b)) => println!("{}\n{}", a, b),
        (a, b) => eprintln!("task failed: {:?} / {:?}", a, b),
    }

    pool.shutdown()
}
