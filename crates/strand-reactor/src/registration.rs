use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::future::FusedFuture;
use strand_interface::Reactor;

use crate::{completion::Key, op::Op, poller::Poller};

#[derive(Clone, Copy)]
enum State {
    Init,
    Registered(Key),
    Completed,
}

/// Leaf future tying an [`Op`] to a reactor.
///
/// The first poll registers interest and suspends; the poll after the
/// wakeup consumes the completion. Dropping a registration in flight
/// withdraws it, so no selector or timer delivery can reference the waker
/// afterwards.
pub struct Registration<O, R>
where
    O: Op,
    R: Reactor<Handle = Poller>,
{
    op: Option<O>,
    state: State,
    reactor: R,
}

impl<O, R> Registration<O, R>
where
    O: Op,
    R: Reactor<Handle = Poller>,
{
    pub fn new(reactor: R, op: O) -> Self {
        Self {
            op: Some(op),
            state: State::Init,
            reactor,
        }
    }
}

impl<O, R> Future for Registration<O, R>
where
    O: Op,
    R: Reactor<Handle = Poller>,
{
    type Output = O::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // No field is structurally pinned; the op is inert until consumed.
        let this = unsafe { Pin::into_inner_unchecked(self) };

        match this.state {
            State::Init => {
                let registered = {
                    let op = this.op.as_mut().unwrap();
                    this.reactor.with(|poller| op.register(poller, cx.waker()))
                };

                match registered {
                    Ok(key) => {
                        this.state = State::Registered(key);
                        Poll::Pending
                    }
                    Err(err) => {
                        this.state = State::Completed;
                        Poll::Ready(this.op.take().unwrap().fail(err))
                    }
                }
            }

            State::Registered(key) => {
                let taken = this
                    .reactor
                    .with(|poller| poller.try_take(key, cx.waker()));

                if !taken {
                    return Poll::Pending;
                }

                this.state = State::Completed;
                Poll::Ready(this.op.take().unwrap().complete())
            }

            State::Completed => {
                panic!("polled completed Registration");
            }
        }
    }
}

impl<O, R> FusedFuture for Registration<O, R>
where
    O: Op,
    R: Reactor<Handle = Poller>,
{
    fn is_terminated(&self) -> bool {
        matches!(self.state, State::Completed)
    }
}

impl<O, R> Drop for Registration<O, R>
where
    O: Op,
    R: Reactor<Handle = Poller>,
{
    fn drop(&mut self) {
        if let State::Registered(key) = self.state {
            if let Some(op) = self.op.take() {
                self.reactor.with(|poller| op.cancel(poller, key));
            }
        }
    }
}
