use std::{
    io::{Error, Result},
    task::Waker,
    time::{Duration, Instant},
};

use crate::{completion::Key, op::Op, poller::Poller};

#[derive(Clone, Copy)]
enum When {
    Delay(Duration),
    Deadline(Instant),
}

/// Resolves once a point in time has passed. Never resolves early.
pub struct Timeout {
    when: When,
}

impl Timeout {
    pub fn new(delay: Duration) -> Self {
        Self {
            when: When::Delay(delay),
        }
    }

    pub fn at(deadline: Instant) -> Self {
        Self {
            when: When::Deadline(deadline),
        }
    }
}

impl Op for Timeout {
    type Output = ();

    fn register(&mut self, poller: &mut Poller, waker: &Waker) -> Result<Key> {
        // The delay is anchored at registration, not construction.
        let deadline = match self.when {
            When::Delay(delay) => Instant::now() + delay,
            When::Deadline(deadline) => deadline,
        };

        Ok(poller.register_timer(deadline, waker))
    }

    fn complete(self) -> Self::Output {}

    fn fail(self, _err: Error) -> Self::Output {
        unreachable!("timer registration cannot fail")
    }

    fn cancel(self, poller: &mut Poller, key: Key) {
        poller.cancel_timer(key);
    }
}
