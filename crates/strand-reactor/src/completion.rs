use std::task::Waker;

use slab::Slab;

enum State {
    Waiting(Waker),
    Ready,
}

struct Completion {
    token: u64,
    state: State,
}

/// What a cancelled completion was doing when it was removed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Cancelled {
    Waiting,
    Ready,
}

/// Ticket for one pending wakeup in the [`CompletionSet`].
///
/// Carries a generation token alongside the slab index so a key that
/// outlives its completion (a cancelled timer still sitting in the heap)
/// can never touch a slot that has since been reused.
#[derive(Clone, Copy, Debug)]
pub struct Key {
    index: usize,
    token: u64,
}

/// Table of wakers waiting on selector readiness or timer expiry.
pub(crate) struct CompletionSet {
    slab: Slab<Completion>,
    next_token: u64,
}

impl CompletionSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slab: Slab::with_capacity(capacity),
            next_token: 0,
        }
    }

    pub fn insert(&mut self, waker: Waker) -> Key {
        let token = self.next_token;
        self.next_token += 1;

        let index = self.slab.insert(Completion {
            token,
            state: State::Waiting(waker),
        });

        Key { index, token }
    }

    /// Mark a completion ready and wake its task. Returns false for stale
    /// keys (already cancelled or consumed).
    pub fn notify(&mut self, key: Key) -> bool {
        let Some(completion) = self.live(key) else {
            return false;
        };

        match std::mem::replace(&mut completion.state, State::Ready) {
            State::Waiting(waker) => {
                waker.wake();
                true
            }
            State::Ready => true,
        }
    }

    /// Consume a ready completion, or refresh the stored waker and report
    /// not-ready.
    pub fn try_take(&mut self, key: Key, waker: &Waker) -> bool {
        let Some(completion) = self.live(key) else {
            panic!("completion key out of sync");
        };

        match &mut completion.state {
            State::Ready => {
                self.slab.remove(key.index);
                true
            }
            State::Waiting(stored) => {
                stored.clone_from(waker);
                false
            }
        }
    }

    /// Remove a completion regardless of state. Returns what it was, or
    /// `None` for stale keys.
    pub fn cancel(&mut self, key: Key) -> Option<Cancelled> {
        self.live(key)?;

        let completion = self.slab.remove(key.index);
        Some(match completion.state {
            State::Waiting(_) => Cancelled::Waiting,
            State::Ready => Cancelled::Ready,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    fn live(&mut self, key: Key) -> Option<&mut Completion> {
        self.slab
            .get_mut(key.index)
            .filter(|completion| completion.token == key.token)
    }
}
