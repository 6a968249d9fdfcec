mod io;
mod time;

use std::{
    io::{Error, Result},
    task::Waker,
};

use crate::{completion::Key, poller::Poller, registration::Registration};

pub use io::{Readable, Writable};
pub use time::Timeout;

/// A single wakeup request against a [`Poller`].
pub trait Op {
    type Output;

    /// Register interest, binding `waker` to the eventual wakeup.
    fn register(&mut self, poller: &mut Poller, waker: &Waker) -> Result<Key>;

    /// Consume self once the wakeup has been delivered.
    fn complete(self) -> Self::Output;

    /// Consume self when registration was refused.
    fn fail(self, err: Error) -> Self::Output;

    /// Withdraw a registration that has not completed.
    fn cancel(self, poller: &mut Poller, key: Key);

    fn run_on<R>(self, reactor: R) -> Registration<Self, R>
    where
        R: strand_interface::Reactor<Handle = Poller>,
        Self: Sized,
    {
        Registration::new(reactor, self)
    }
}
