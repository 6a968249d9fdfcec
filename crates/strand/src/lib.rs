//! Single-threaded, readiness-driven async runtime.
//!
//! One executor and one reactor live per thread; tasks are cooperatively
//! scheduled and suspend on selector readiness or timer deadlines. Nothing
//! here is thread safe, by design.

use core::{cell::RefCell, future::Future};

use strand_executor::Executor;
use strand_reactor::Poller;

thread_local! {
    static EXECUTOR: RefCell<Executor> = RefCell::new(Executor::new());
    static REACTOR: RefCell<Poller> = RefCell::new(Poller::options().build());
}

struct GlobalReactor;

impl strand_interface::Reactor for GlobalReactor {
    type Handle = Poller;

    fn wait(&self) {
        REACTOR.with_borrow_mut(|poller| poller.wait());
    }

    fn with<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Self::Handle) -> T,
    {
        REACTOR.with_borrow_mut(|poller| f(poller))
    }
}

pub use strand_executor::{JoinError, JoinHandle, TaskId};
pub use strand_macro::main;

pub mod net;
pub mod task;
pub mod time;

/// Schedule a future onto this thread's executor and return a handle to
/// its result (eager start: the task runs at the next tick whether or not
/// the handle is awaited).
///
/// Dropping the handle detaches the task; a detached task's output,
/// including any error it produces, is delivered to nobody. A task still
/// pending when its thread's executor is dropped is dropped with it.
#[inline]
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
{
    EXECUTOR.with_borrow(|executor| executor.spawn(future))
}

/// Drive the loop until `future` completes and return its output.
///
/// Panics if called from inside a running task.
#[inline]
pub fn block_on<F>(future: F) -> F::Output
where
    F: Future + 'static,
{
    EXECUTOR.with_borrow(|executor| executor.block_on(GlobalReactor, future))
}

/// Drive the loop until every spawned task has completed.
#[inline]
pub fn run() {
    EXECUTOR.with_borrow(|executor| executor.run(GlobalReactor));
}

/// Id of the task currently being polled, or `None` outside a task.
#[inline]
pub fn current_task() -> Option<TaskId> {
    strand_executor::current()
}
