use std::{io::ErrorKind, pin::pin, time::Duration};

use futures::future::FusedFuture;
use strand_interface::Reactor;
use strand_reactor::{
    op::{self, Op},
    util,
};

use crate::helpers::{assert_ready, poll, runtime};

#[test]
fn read_ready() {
    let (reactor, notifier) = runtime();
    let (read_fd, write_fd) = util::pipe().unwrap();

    let mut readable = op::Readable::new(read_fd).run_on(reactor.clone());
    let mut fut = pin!(&mut readable);

    assert!(poll!(fut, notifier).is_pending());
    assert_eq!(reactor.active(), 1);

    assert_eq!(util::write(write_fd, b"x").unwrap(), 1);

    reactor.wait();
    assert_eq!(notifier.try_recv(), Some(()));

    let res = assert_ready!(poll!(fut, notifier));
    assert!(res.is_ok());
    assert!(fut.is_terminated());
    assert!(reactor.is_done());

    let mut buf = [0u8; 8];
    assert_eq!(util::read(read_fd, &mut buf).unwrap(), 1);

    let _ = util::close(read_fd);
    let _ = util::close(write_fd);
}

#[test]
fn write_ready() {
    let (reactor, notifier) = runtime();
    let (read_fd, write_fd) = util::pipe().unwrap();

    let mut writable = op::Writable::new(write_fd).run_on(reactor.clone());
    let mut fut = pin!(&mut writable);

    assert!(poll!(fut, notifier).is_pending());

    // An empty pipe is writable immediately.
    reactor.wait();
    assert_eq!(notifier.try_recv(), Some(()));

    let res = assert_ready!(poll!(fut, notifier));
    assert!(res.is_ok());
    assert!(reactor.is_done());

    let _ = util::close(read_fd);
    let _ = util::close(write_fd);
}

#[test]
fn conflicting_watcher_fails() {
    let (reactor, notifier) = runtime();
    let (read_fd, write_fd) = util::pipe().unwrap();

    let mut first = op::Readable::new(read_fd).run_on(reactor.clone());
    let mut fut1 = pin!(&mut first);
    assert!(poll!(fut1, notifier).is_pending());

    let mut second = op::Readable::new(read_fd).run_on(reactor.clone());
    let mut fut2 = pin!(&mut second);

    let res = assert_ready!(poll!(fut2, notifier));
    assert_eq!(res.unwrap_err().kind(), ErrorKind::AlreadyExists);

    // Opposite direction on the same fd is fine.
    let mut writable = op::Writable::new(read_fd).run_on(reactor.clone());
    let mut fut3 = pin!(&mut writable);
    assert!(poll!(fut3, notifier).is_pending());

    drop(first);
    drop(writable);
    assert!(reactor.is_done());

    let _ = util::close(read_fd);
    let _ = util::close(write_fd);
}

#[test]
fn register_again_after_drop() {
    let (reactor, notifier) = runtime();
    let (read_fd, write_fd) = util::pipe().unwrap();

    let mut first = op::Readable::new(read_fd).run_on(reactor.clone());
    let mut fut1 = pin!(&mut first);
    assert!(poll!(fut1, notifier).is_pending());

    drop(first);
    assert!(reactor.is_done());

    let mut second = op::Readable::new(read_fd).run_on(reactor.clone());
    let mut fut2 = pin!(&mut second);
    assert!(poll!(fut2, notifier).is_pending());

    assert_eq!(util::write(write_fd, b"y").unwrap(), 1);
    reactor.wait();

    let res = assert_ready!(poll!(fut2, notifier));
    assert!(res.is_ok());

    let _ = util::close(read_fd);
    let _ = util::close(write_fd);
}

#[test]
fn cancelled_watcher_never_wakes() {
    let (reactor, notifier) = runtime();
    let (read_fd, write_fd) = util::pipe().unwrap();

    let mut readable = op::Readable::new(read_fd).run_on(reactor.clone());
    let mut fut = pin!(&mut readable);
    assert!(poll!(fut, notifier).is_pending());

    drop(readable);
    assert!(reactor.is_done());

    assert_eq!(util::write(write_fd, b"z").unwrap(), 1);
    reactor.wait();

    assert_eq!(notifier.try_recv(), None);

    let _ = util::close(read_fd);
    let _ = util::close(write_fd);
}

#[test]
fn hangup_delivers_readable() {
    let (reactor, notifier) = runtime();
    let (read_fd, write_fd) = util::pipe().unwrap();

    let mut readable = op::Readable::new(read_fd).run_on(reactor.clone());
    let mut fut = pin!(&mut readable);
    assert!(poll!(fut, notifier).is_pending());

    util::close(write_fd).unwrap();

    reactor.wait();
    assert_eq!(notifier.try_recv(), Some(()));

    let res = assert_ready!(poll!(fut, notifier));
    assert!(res.is_ok());

    // EOF is observed through the read itself.
    let mut buf = [0u8; 8];
    assert_eq!(util::read(read_fd, &mut buf).unwrap(), 0);

    let _ = util::close(read_fd);
}

#[test]
fn independent_watchers() {
    let (reactor, notifier) = runtime();
    let (read_fd, write_fd) = util::pipe().unwrap();

    // Only the write end is ready at first; the read watcher must not be
    // disturbed by the other fd's delivery.
    let mut writable = op::Writable::new(write_fd).run_on(reactor.clone());
    let mut readable = op::Readable::new(read_fd).run_on(reactor.clone());
    let mut fut1 = pin!(&mut writable);
    let mut fut2 = pin!(&mut readable);

    assert!(poll!(fut1, notifier).is_pending());
    assert!(poll!(fut2, notifier).is_pending());
    assert_eq!(reactor.active(), 2);

    reactor.wait();

    let res = assert_ready!(poll!(fut1, notifier));
    assert!(res.is_ok());
    assert_eq!(reactor.active(), 1);

    assert_eq!(util::write(write_fd, b"w").unwrap(), 1);
    reactor.wait();

    let res = assert_ready!(poll!(fut2, notifier));
    assert!(res.is_ok());
    assert!(reactor.is_done());

    let _ = util::close(read_fd);
    let _ = util::close(write_fd);
}

#[test]
fn wait_with_nothing_registered_returns() {
    let (reactor, notifier) = runtime();

    reactor.wait();
    assert_eq!(notifier.try_recv(), None);
    assert!(reactor.is_done());
}

#[test]
fn timer_and_readiness_together() {
    let (reactor, notifier) = runtime();
    let (read_fd, write_fd) = util::pipe().unwrap();

    let mut readable = op::Readable::new(read_fd).run_on(reactor.clone());
    let mut timeout = op::Timeout::new(Duration::from_millis(10)).run_on(reactor.clone());
    let mut fut1 = pin!(&mut readable);
    let mut fut2 = pin!(&mut timeout);

    assert!(poll!(fut1, notifier).is_pending());
    assert!(poll!(fut2, notifier).is_pending());

    // Nothing written: only the timer fires.
    reactor.wait();
    assert_eq!(poll!(fut2, notifier), std::task::Poll::Ready(()));
    assert!(poll!(fut1, notifier).is_pending());

    assert_eq!(util::write(write_fd, b"!").unwrap(), 1);
    reactor.wait();

    let res = assert_ready!(poll!(fut1, notifier));
    assert!(res.is_ok());
    assert!(reactor.is_done());

    let _ = util::close(read_fd);
    let _ = util::close(write_fd);
}
