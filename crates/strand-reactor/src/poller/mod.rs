#[cfg(target_os = "linux")]
mod epoll;
#[cfg(target_os = "linux")]
use epoll::Selector;

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
))]
mod kqueue;
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
))]
use kqueue::Selector;

use std::{
    collections::HashMap,
    io::{Error, ErrorKind, Result},
    os::fd::RawFd,
    task::Waker,
    time::{Duration, Instant},
};

use tracing::debug;

use crate::{
    completion::{Cancelled, CompletionSet, Key},
    timer::TimerQueue,
};

/// Which side of an fd a registration waits on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Read,
    Write,
}

/// Directions currently registered for an fd, as the selector sees them.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub(crate) struct Interest {
    pub read: bool,
    pub write: bool,
}

impl Interest {
    pub fn any(self) -> bool {
        self.read || self.write
    }
}

/// One readiness delivery out of the selector.
pub(crate) struct SysEvent {
    pub fd: RawFd,
    pub readable: bool,
    pub writable: bool,
}

#[derive(Default)]
struct FdEntry {
    read: Option<Key>,
    write: Option<Key>,
}

impl FdEntry {
    fn interest(&self) -> Interest {
        Interest {
            read: self.read.is_some(),
            write: self.write.is_some(),
        }
    }

    fn slot(&mut self, direction: Direction) -> &mut Option<Key> {
        match direction {
            Direction::Read => &mut self.read,
            Direction::Write => &mut self.write,
        }
    }
}

pub struct PollerOptions {
    events: usize,
    completions: usize,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            events: 256,
            completions: 1024,
        }
    }
}

impl PollerOptions {
    /// Capacity of the per-tick selector event buffer.
    pub fn events(mut self, capacity: usize) -> Self {
        self.events = capacity;
        self
    }

    /// Initial capacity of the completion table.
    pub fn completions(mut self, capacity: usize) -> Self {
        self.completions = capacity;
        self
    }

    pub fn build(self) -> Poller {
        Poller {
            selector: Selector::new(self.events).expect("failed to create selector"),
            watchers: HashMap::new(),
            timers: TimerQueue::new(),
            completions: CompletionSet::with_capacity(self.completions),
            ready: Vec::with_capacity(self.events),
            active: 0,
        }
    }
}

/// Readiness reactor: an OS selector plus a timer heap.
///
/// Used by [`Registration`](crate::Registration) to park wakers until an
/// fd becomes ready or a deadline passes. Strictly single-threaded.
pub struct Poller {
    selector: Selector,
    watchers: HashMap<RawFd, FdEntry>,
    timers: TimerQueue,
    completions: CompletionSet,
    ready: Vec<SysEvent>,
    active: u32,
}

impl Default for Poller {
    fn default() -> Self {
        Poller::options().build()
    }
}

impl Poller {
    pub fn options() -> PollerOptions {
        PollerOptions::default()
    }

    /// Number of in-flight registrations.
    pub fn active(&self) -> u32 {
        self.active
    }

    /// True when no registration, undelivered completion, or fd interest
    /// remains.
    pub fn is_done(&self) -> bool {
        self.active == 0 && self.completions.is_empty() && self.watchers.is_empty()
    }

    /// Register interest in one direction of an fd.
    ///
    /// Each fd has at most one read owner and one write owner; a second
    /// registration for an owned direction fails with `AlreadyExists`.
    pub fn register_io(&mut self, fd: RawFd, direction: Direction, waker: &Waker) -> Result<Key> {
        let entry = self.watchers.entry(fd).or_default();

        if entry.slot(direction).is_some() {
            return Err(Error::new(
                ErrorKind::AlreadyExists,
                "fd already has a watcher for this direction",
            ));
        }

        let prev = entry.interest();
        let key = self.completions.insert(waker.clone());
        *entry.slot(direction) = Some(key);
        let next = entry.interest();

        if let Err(err) = self.selector.update(fd, prev, next) {
            *entry.slot(direction) = None;
            if !entry.interest().any() {
                self.watchers.remove(&fd);
            }
            self.completions.cancel(key);
            return Err(err);
        }

        self.active += 1;
        debug!(fd, ?direction, ?key, "register io");

        Ok(key)
    }

    /// Park a waker until `deadline`. Same-instant deadlines fire in
    /// registration order.
    pub fn register_timer(&mut self, deadline: Instant, waker: &Waker) -> Key {
        let key = self.completions.insert(waker.clone());
        self.timers.insert(deadline, key);
        self.active += 1;
        debug!(?deadline, ?key, "register timer");

        key
    }

    /// Consume a delivered completion, or refresh its waker and report
    /// not-ready.
    pub fn try_take(&mut self, key: Key, waker: &Waker) -> bool {
        self.completions.try_take(key, waker)
    }

    /// Withdraw an io registration. Idempotent against delivery races:
    /// a completion that already fired is simply discarded.
    pub fn cancel_io(&mut self, fd: RawFd, direction: Direction, key: Key) {
        debug!(fd, ?direction, ?key, "cancel io");
        match self.completions.cancel(key) {
            Some(Cancelled::Waiting) => {
                self.active -= 1;
                self.detach(fd, direction);
            }
            // Delivered before the owner dropped; interest is already gone
            // and `active` was decremented at notify time.
            Some(Cancelled::Ready) | None => {}
        }
    }

    /// Withdraw a timer registration. The heap entry goes stale and is
    /// discarded when it surfaces.
    pub fn cancel_timer(&mut self, key: Key) {
        debug!(?key, "cancel timer");
        if let Some(Cancelled::Waiting) = self.completions.cancel(key) {
            self.active -= 1;
        }
    }

    /// One tick: fire due timers, poll the selector, dispatch readiness.
    ///
    /// Returns immediately when nothing is registered. Blocks until the
    /// next timer deadline otherwise, or indefinitely when only fd
    /// interest remains.
    pub fn wait(&mut self) {
        if self.active == 0 {
            debug!("nothing registered");
            return;
        }

        let now = Instant::now();
        let fired = self.fire_timers(now);

        let timeout = if fired > 0 {
            Some(Duration::ZERO)
        } else {
            self.timers
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(now))
        };

        debug!(active = self.active, ?timeout, "waiting");

        let mut ready = std::mem::take(&mut self.ready);
        ready.clear();
        self.selector
            .select(&mut ready, timeout)
            .expect("failed to wait for readiness");

        for event in &ready {
            self.dispatch(event);
        }
        self.ready = ready;

        // Timers that expired while we were blocked in the selector.
        self.fire_timers(Instant::now());
    }

    /// Remove one direction's watcher for an fd, syncing selector interest.
    fn detach(&mut self, fd: RawFd, direction: Direction) {
        let Some(entry) = self.watchers.get_mut(&fd) else {
            return;
        };
        let prev = entry.interest();
        *entry.slot(direction) = None;
        let next = entry.interest();
        if !next.any() {
            self.watchers.remove(&fd);
        }
        if let Err(err) = self.selector.update(fd, prev, next) {
            debug!(fd, ?direction, ?err, "deregister after cancel failed");
        }
    }

    fn dispatch(&mut self, event: &SysEvent) {
        let Some(entry) = self.watchers.get_mut(&event.fd) else {
            return;
        };
        let prev = entry.interest();

        let read = if event.readable { entry.read.take() } else { None };
        let write = if event.writable { entry.write.take() } else { None };

        let next = entry.interest();
        if !next.any() {
            self.watchers.remove(&event.fd);
        }
        if let Err(err) = self.selector.update(event.fd, prev, next) {
            debug!(fd = event.fd, ?err, "deregister after delivery failed");
        }

        for key in [read, write].into_iter().flatten() {
            debug!(fd = event.fd, ?key, "deliver");
            if self.completions.notify(key) {
                self.active -= 1;
            }
        }
    }

    // Pop every entry with deadline <= now; stale (cancelled) entries are
    // dropped without counting.
    fn fire_timers(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        while let Some(key) = self.timers.pop_expired(now) {
            if self.completions.notify(key) {
                debug!(?key, "timer fired");
                self.active -= 1;
                fired += 1;
            }
        }
        fired
    }
}
