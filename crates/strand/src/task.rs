use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::future;

/// Await every future and collect the outputs in argument order,
/// regardless of completion order.
pub async fn gather<F>(futures: Vec<F>) -> Vec<F::Output>
where
    F: Future,
{
    future::join_all(futures).await
}

/// Await every future; the first error wins. When one fails, the
/// surviving siblings are cancelled by drop before the error is returned.
/// On success the values come back in argument order.
pub async fn try_gather<F, T, E>(futures: Vec<F>) -> Result<Vec<T>, E>
where
    F: Future<Output = Result<T, E>>,
{
    future::try_join_all(futures).await
}

/// Reschedule the current task behind everything already in the ready
/// queue.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
