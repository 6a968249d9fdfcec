use std::{future::Future, task::Context};

use futures::channel::oneshot;
use strand_interface::Reactor;
use tracing::debug;

use crate::{
    join::{JoinError, JoinHandle},
    task::TaskQueue,
    waker::waker,
};

/// Single-threaded cooperative executor.
///
/// Tasks run to their next suspension point in strict FIFO order of
/// becoming ready; between polls the executor blocks in the reactor.
pub struct Executor {
    queue: TaskQueue,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    pub fn new() -> Self {
        Self {
            queue: TaskQueue::new(),
        }
    }

    /// Schedule a future immediately and return a handle to its result.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
    {
        let (sender, receiver) = oneshot::channel();

        self.queue.schedule(async move {
            let _ = sender.send(future.await);
        });

        JoinHandle::new(receiver)
    }

    /// Drive the loop until `future` completes, then return its output.
    ///
    /// Other spawned tasks make progress while the loop runs, but the call
    /// returns as soon as the root task's result is set; leftovers stay
    /// queued for a later [`run`](Self::run) or `block_on`.
    pub fn block_on<R, F>(&self, reactor: R, future: F) -> F::Output
    where
        F: Future + 'static,
        R: Reactor,
    {
        let mut handle = self.spawn(future);

        loop {
            self.tick();

            match handle.try_join() {
                Ok(output) => return output,
                Err(JoinError::NoResult) => {}
                Err(JoinError::Invalid) => {
                    panic!("root task vanished without completing")
                }
            }

            if self.queue.is_done() {
                panic!("Failed to complete future. Deadlock maybe?");
            }

            reactor.wait();
        }
    }

    /// Drive the loop until every spawned task has completed.
    pub fn run<R>(&self, reactor: R)
    where
        R: Reactor,
    {
        while !self.queue.is_done() {
            self.tick();
            reactor.wait();
        }
    }

    // Drain the ready queue once. Tasks scheduled during the drain are
    // picked up in the same pass.
    fn tick(&self) {
        debug!("executing tasks");
        for task in self.queue.drain() {
            let waker = waker(task.clone());
            let mut cx = Context::from_waker(&waker);
            let _ = task.poll(&mut cx);
        }
    }
}
