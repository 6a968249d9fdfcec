use std::{
    io::{Error, ErrorKind},
    time::{Duration, Instant},
};

use strand::{task, time};

use crate::helpers::*;

async fn item(delay: Duration, value: &'static str) -> &'static str {
    time::sleep(delay).await;
    value
}

#[test]
fn gather_preserves_order() {
    setup_tracing();

    // Completion order is b, c, a; result order follows the arguments.
    let results = strand::block_on(task::gather(vec![
        item(Duration::from_millis(30), "a"),
        item(Duration::from_millis(5), "b"),
        item(Duration::from_millis(15), "c"),
    ]));

    assert_eq!(results, vec!["a", "b", "c"]);
}

#[test]
fn gather_empty() {
    setup_tracing();

    let futures: Vec<futures::future::Ready<u32>> = Vec::new();
    let results = strand::block_on(task::gather(futures));

    assert!(results.is_empty());
}

async fn try_item(
    delay: Duration,
    value: Result<u32, ErrorKind>,
) -> Result<u32, Error> {
    time::sleep(delay).await;
    value.map_err(|kind| Error::new(kind, "item failed"))
}

#[test]
fn try_gather_ok() {
    setup_tracing();

    let results = strand::block_on(task::try_gather(vec![
        try_item(Duration::from_millis(10), Ok(1)),
        try_item(Duration::from_millis(1), Ok(2)),
    ]));

    assert_eq!(results.unwrap(), vec![1, 2]);
}

#[test]
fn try_gather_first_error_cancels_siblings() {
    setup_tracing();

    let start = Instant::now();
    let results = strand::block_on(task::try_gather(vec![
        try_item(Duration::from_secs(2), Ok(1)),
        try_item(Duration::from_millis(5), Err(ErrorKind::BrokenPipe)),
    ]));

    assert_eq!(results.unwrap_err().kind(), ErrorKind::BrokenPipe);
    // The slow sibling was dropped, not awaited.
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn yield_now_interleaves() {
    setup_tracing();

    let (order, location) = output(Vec::new());
    let other = location.clone();

    strand::spawn(async move {
        location.borrow_mut().push(1);
        task::yield_now().await;
        location.borrow_mut().push(3);
    });

    strand::spawn(async move {
        other.borrow_mut().push(2);
    });

    strand::run();

    assert_eq!(order.take(), vec![1, 2, 3]);
}
