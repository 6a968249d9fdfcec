use std::{
    pin::pin,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use futures::future::FusedFuture;
use strand_interface::Reactor;
use strand_reactor::op::{self, Op};

use crate::helpers::{poll, runtime, OrderNotifier};

#[test]
fn single() {
    let (reactor, notifier) = runtime();

    let mut timeout = op::Timeout::new(Duration::from_millis(10)).run_on(reactor.clone());
    let mut fut = pin!(&mut timeout);

    let start = Instant::now();
    assert!(poll!(fut, notifier).is_pending());
    assert_eq!(reactor.active(), 1);

    reactor.wait();

    assert_eq!(notifier.try_recv(), Some(()));

    assert_eq!(poll!(fut, notifier), Poll::Ready(()));
    assert!(fut.is_terminated());

    assert!(reactor.is_done());

    assert!(10 <= start.elapsed().as_millis());
}

#[test]
fn multi() {
    let (reactor, notifier) = runtime();

    let mut timeout1 = op::Timeout::new(Duration::from_millis(10)).run_on(reactor.clone());
    let mut timeout2 = op::Timeout::new(Duration::from_millis(50)).run_on(reactor.clone());
    let mut fut1 = pin!(&mut timeout1);
    let mut fut2 = pin!(&mut timeout2);

    let start = Instant::now();

    assert!(poll!(fut1, notifier).is_pending());
    assert!(poll!(fut2, notifier).is_pending());
    assert_eq!(reactor.active(), 2);

    reactor.wait();
    assert_eq!(notifier.try_recv(), Some(()));

    assert_eq!(poll!(fut1, notifier), Poll::Ready(()));
    assert!(fut1.is_terminated());
    assert_eq!(reactor.active(), 1);

    assert!(10 <= start.elapsed().as_millis());

    reactor.wait();
    assert_eq!(notifier.try_recv(), Some(()));

    assert_eq!(poll!(fut2, notifier), Poll::Ready(()));
    assert!(fut2.is_terminated());
    assert_eq!(reactor.active(), 0);

    assert!(50 <= start.elapsed().as_millis());
}

#[test]
fn at_deadline() {
    let (reactor, notifier) = runtime();

    let deadline = Instant::now() + Duration::from_millis(20);
    let mut timeout = op::Timeout::at(deadline).run_on(reactor.clone());
    let mut fut = pin!(&mut timeout);

    assert!(poll!(fut, notifier).is_pending());

    reactor.wait();

    assert_eq!(poll!(fut, notifier), Poll::Ready(()));
    assert!(Instant::now() >= deadline);
    assert!(reactor.is_done());
}

#[test]
fn same_deadline_fires_in_order() {
    let (reactor, _) = runtime();
    let notifier = OrderNotifier::new();

    let deadline = Instant::now() + Duration::from_millis(20);
    let mut timeout1 = op::Timeout::at(deadline).run_on(reactor.clone());
    let mut timeout2 = op::Timeout::at(deadline).run_on(reactor.clone());
    let mut fut1 = pin!(&mut timeout1);
    let mut fut2 = pin!(&mut timeout2);

    {
        let waker = notifier.waker(1);
        let mut cx = Context::from_waker(&waker);
        assert!(futures::Future::poll(fut1.as_mut(), &mut cx).is_pending());
    }
    {
        let waker = notifier.waker(2);
        let mut cx = Context::from_waker(&waker);
        assert!(futures::Future::poll(fut2.as_mut(), &mut cx).is_pending());
    }

    reactor.wait();

    assert_eq!(notifier.try_recv(), Some(1));
    assert_eq!(notifier.try_recv(), Some(2));
    assert_eq!(notifier.try_recv(), None);
}

#[test]
fn cancel() {
    let (reactor, notifier) = runtime();

    let mut timeout1 = op::Timeout::new(Duration::from_millis(2000)).run_on(reactor.clone());
    let mut timeout2 = op::Timeout::new(Duration::from_millis(50)).run_on(reactor.clone());
    let mut fut1 = pin!(&mut timeout1);
    let mut fut2 = pin!(&mut timeout2);

    let start = Instant::now();

    assert!(poll!(fut1, notifier).is_pending());
    assert!(poll!(fut2, notifier).is_pending());
    assert_eq!(reactor.active(), 2);

    drop(timeout1);
    assert_eq!(reactor.active(), 1);

    reactor.wait();
    assert_eq!(notifier.try_recv(), Some(()));

    assert_eq!(poll!(fut2, notifier), Poll::Ready(()));
    assert!(fut2.is_terminated());

    assert!(reactor.is_done());

    let elapsed = start.elapsed().as_millis();
    assert!((50..2000).contains(&elapsed));
}

#[test]
fn cancelled_timer_never_wakes() {
    let (reactor, notifier) = runtime();

    let mut timeout = op::Timeout::new(Duration::from_millis(5)).run_on(reactor.clone());
    let mut fut = pin!(&mut timeout);

    assert!(poll!(fut, notifier).is_pending());
    drop(timeout);

    std::thread::sleep(Duration::from_millis(10));
    reactor.wait();

    assert_eq!(notifier.try_recv(), None);
    assert!(reactor.is_done());
}
