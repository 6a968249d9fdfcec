use std::{
    future::Future,
    time::{Duration, Instant},
};

use futures::future::{self, Either};
use futures::pin_mut;
use strand_reactor::op::{self, Op};
use thiserror::Error;

use crate::GlobalReactor;

/// Error returned by [`timeout`] when the limit elapses first.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
#[error("deadline elapsed")]
pub struct TimeoutError;

/// Suspend the current task for at least `delay`.
pub async fn sleep(delay: Duration) {
    op::Timeout::new(delay).run_on(GlobalReactor).await;
}

/// Suspend the current task until at least `deadline`.
pub async fn sleep_until(deadline: Instant) {
    op::Timeout::at(deadline).run_on(GlobalReactor).await;
}

/// Await `future`, giving up after `limit`.
///
/// If the limit expires first the future is dropped — cancelling any
/// timers or selector registrations it holds — and `Err(TimeoutError)`
/// is returned. With a zero limit, a future that is not already ready
/// fails on the first tick.
pub async fn timeout<F>(limit: Duration, future: F) -> Result<F::Output, TimeoutError>
where
    F: Future,
{
    let delay = sleep(limit);
    pin_mut!(future);
    pin_mut!(delay);

    match future::select(future, delay).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right(((), _)) => Err(TimeoutError),
    }
}
