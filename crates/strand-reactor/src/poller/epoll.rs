use std::{
    io::{Error, ErrorKind, Result},
    os::fd::RawFd,
    time::Duration,
};

use super::{Interest, SysEvent};

/// Linux epoll backend.
///
/// Level-triggered on purpose: the poller removes interest on delivery,
/// so an fd left un-drained simply re-reports on the next registration.
pub(crate) struct Selector {
    epoll: RawFd,
    buffer: Vec<libc::epoll_event>,
}

impl Selector {
    pub fn new(capacity: usize) -> Result<Self> {
        let epoll = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(Error::last_os_error());
        }

        Ok(Self {
            epoll,
            buffer: Vec::with_capacity(capacity),
        })
    }

    pub fn update(&mut self, fd: RawFd, prev: Interest, next: Interest) -> Result<()> {
        let op = match (prev.any(), next.any()) {
            (false, false) => return Ok(()),
            (false, true) => libc::EPOLL_CTL_ADD,
            (true, true) => libc::EPOLL_CTL_MOD,
            (true, false) => libc::EPOLL_CTL_DEL,
        };

        let mut event = libc::epoll_event {
            events: flags(next),
            u64: fd as u64,
        };

        let rc = unsafe { libc::epoll_ctl(self.epoll, op, fd, &mut event) };
        if rc < 0 {
            Err(Error::last_os_error())
        } else {
            Ok(())
        }
    }

    pub fn select(&mut self, events: &mut Vec<SysEvent>, timeout: Option<Duration>) -> Result<()> {
        // Rounded up: waking a hair late is fine, firing a timer early is not.
        let timeout_ms = match timeout {
            None => -1,
            Some(timeout) => timeout
                .as_nanos()
                .div_ceil(1_000_000)
                .min(i32::MAX as u128) as i32,
        };

        let n = unsafe {
            libc::epoll_wait(
                self.epoll,
                self.buffer.as_mut_ptr(),
                self.buffer.capacity() as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        unsafe {
            self.buffer.set_len(n as usize);
        }

        for ev in &self.buffer {
            // ERR and HUP wake both sides; the owning operation observes
            // the failure or EOF through its own syscall.
            let readable = ev.events & (libc::EPOLLIN | libc::EPOLLERR | libc::EPOLLHUP) as u32 != 0;
            let writable =
                ev.events & (libc::EPOLLOUT | libc::EPOLLERR | libc::EPOLLHUP) as u32 != 0;

            events.push(SysEvent {
                fd: ev.u64 as RawFd,
                readable,
                writable,
            });
        }

        Ok(())
    }
}

fn flags(interest: Interest) -> u32 {
    let mut flags = 0;
    if interest.read {
        flags |= libc::EPOLLIN;
    }
    if interest.write {
        flags |= libc::EPOLLOUT;
    }
    flags as u32
}

impl Drop for Selector {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epoll);
        }
    }
}
