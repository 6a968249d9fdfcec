use std::{
    cell::{Cell, RefCell},
    fmt,
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use flume::{Receiver, Sender};

type BoxFuture = Pin<Box<dyn Future<Output = ()>>>;

/// Identifier of a spawned task. Ids are assigned from a per-queue counter
/// and strictly increase in spawn order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

thread_local! {
    static CURRENT: Cell<Option<TaskId>> = const { Cell::new(None) };
}

/// Id of the task currently being polled, or `None` outside a poll.
pub fn current() -> Option<TaskId> {
    CURRENT.get()
}

pub struct Task {
    id: TaskId,
    scheduled: Cell<bool>,
    done: Cell<bool>,
    future: RefCell<BoxFuture>,
    queue: Sender<Rc<Task>>,
}

impl Task {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn poll(&self, cx: &mut Context) -> Poll<()> {
        self.scheduled.set(false);

        // A stale waker can still reschedule a task that already ran to
        // completion; skip it instead of resuming a finished future.
        if self.done.get() {
            return Poll::Ready(());
        }

        let previous = CURRENT.replace(Some(self.id));
        let polled = self.future.borrow_mut().as_mut().poll(cx);
        CURRENT.set(previous);

        if polled.is_ready() {
            self.done.set(true);
        }

        polled
    }

    pub fn schedule(self: &Rc<Self>) {
        if !self.scheduled.replace(true) {
            self.queue.send(Rc::clone(self)).unwrap()
        }
    }
}

pub struct TaskQueue {
    sender: Sender<Rc<Task>>,
    receiver: Receiver<Rc<Task>>,
    next_id: Cell<u64>,
}

impl TaskQueue {
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            sender,
            receiver,
            next_id: Cell::new(0),
        }
    }

    pub fn schedule<F>(&self, future: F) -> TaskId
    where
        F: Future<Output = ()> + 'static,
    {
        let id = TaskId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let task = Rc::new(Task {
            id,
            scheduled: Cell::new(false),
            done: Cell::new(false),
            future: RefCell::new(Box::pin(future)),
            queue: self.sender.clone(),
        });

        task.schedule();

        id
    }

    pub fn drain(&self) -> impl Iterator<Item = Rc<Task>> + '_ {
        self.receiver.try_iter()
    }

    pub fn is_done(&self) -> bool {
        self.receiver.sender_count() == 1
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
