use std::{
    io::{Error, ErrorKind, Result},
    os::fd::RawFd,
    ptr,
    time::Duration,
};

use super::{Interest, SysEvent};

/// BSD / macOS kqueue backend.
///
/// Read and write interest are independent filters, so updates are a
/// per-direction diff rather than a single mask swap.
pub(crate) struct Selector {
    kq: RawFd,
    buffer: Vec<libc::kevent>,
}

impl Selector {
    pub fn new(capacity: usize) -> Result<Self> {
        let kq = unsafe { libc::kqueue() };
        if kq < 0 {
            return Err(Error::last_os_error());
        }

        unsafe {
            libc::fcntl(kq, libc::F_SETFD, libc::FD_CLOEXEC);
        }

        Ok(Self {
            kq,
            buffer: Vec::with_capacity(capacity),
        })
    }

    pub fn update(&mut self, fd: RawFd, prev: Interest, next: Interest) -> Result<()> {
        let mut changes: Vec<libc::kevent> = Vec::with_capacity(2);

        diff(&mut changes, fd, libc::EVFILT_READ, prev.read, next.read);
        diff(&mut changes, fd, libc::EVFILT_WRITE, prev.write, next.write);

        if changes.is_empty() {
            return Ok(());
        }

        let rc = unsafe {
            libc::kevent(
                self.kq,
                changes.as_ptr(),
                changes.len() as _,
                ptr::null_mut(),
                0,
                ptr::null(),
            )
        };

        if rc < 0 {
            Err(Error::last_os_error())
        } else {
            Ok(())
        }
    }

    pub fn select(&mut self, events: &mut Vec<SysEvent>, timeout: Option<Duration>) -> Result<()> {
        let timespec = timeout.map(|timeout| libc::timespec {
            tv_sec: timeout.as_secs() as _,
            tv_nsec: timeout.subsec_nanos() as _,
        });
        let timespec_ptr = timespec
            .as_ref()
            .map_or(ptr::null(), |timespec| timespec as *const _);

        let n = unsafe {
            libc::kevent(
                self.kq,
                ptr::null(),
                0,
                self.buffer.as_mut_ptr(),
                self.buffer.capacity() as _,
                timespec_ptr,
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
            events.push(SysEvent {
                fd: ev.ident as RawFd,
                readable: ev.filter == libc::EVFILT_READ,
                writable: ev.filter == libc::EVFILT_WRITE,
            });
        }

        Ok(())
    }
}

fn diff(changes: &mut Vec<libc::kevent>, fd: RawFd, filter: i16, prev: bool, next: bool) {
    let flags = match (prev, next) {
        (false, true) => libc::EV_ADD,
        (true, false) => libc::EV_DELETE,
        _ => return,
    };

    changes.push(libc::kevent {
        ident: fd as _,
        filter,
        flags,
        fflags: 0,
        data: 0,
        udata: ptr::null_mut(),
    });
}

impl Drop for Selector {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.kq);
        }
    }
}
