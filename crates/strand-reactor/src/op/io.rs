use std::{
    io::{Error, Result},
    os::fd::RawFd,
    task::Waker,
};

use crate::{
    completion::Key,
    op::Op,
    poller::{Direction, Poller},
};

/// Resolves when `fd` has data to read (or read-side EOF/error).
pub struct Readable {
    fd: RawFd,
}

impl Readable {
    pub fn new(fd: RawFd) -> Self {
        Self { fd }
    }
}

impl Op for Readable {
    type Output = Result<()>;

    fn register(&mut self, poller: &mut Poller, waker: &Waker) -> Result<Key> {
        poller.register_io(self.fd, Direction::Read, waker)
    }

    fn complete(self) -> Self::Output {
        Ok(())
    }

    fn fail(self, err: Error) -> Self::Output {
        Err(err)
    }

    fn cancel(self, poller: &mut Poller, key: Key) {
        poller.cancel_io(self.fd, Direction::Read, key);
    }
}

/// Resolves when `fd` accepts writes (or write-side error).
pub struct Writable {
    fd: RawFd,
}

impl Writable {
    pub fn new(fd: RawFd) -> Self {
        Self { fd }
    }
}

impl Op for Writable {
    type Output = Result<()>;

    fn register(&mut self, poller: &mut Poller, waker: &Waker) -> Result<Key> {
        poller.register_io(self.fd, Direction::Write, waker)
    }

    fn complete(self) -> Self::Output {
        Ok(())
    }

    fn fail(self, err: Error) -> Self::Output {
        Err(err)
    }

    fn cancel(self, poller: &mut Poller, key: Key) {
        poller.cancel_io(self.fd, Direction::Write, key);
    }
}
