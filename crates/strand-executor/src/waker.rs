use std::{
    rc::Rc,
    task::{RawWaker, RawWakerVTable, Waker},
};

use crate::task::Task;

// Not thread safe: the Rc refcount is unsynchronized, and waking sends the
// task back into a queue owned by this thread. The runtime never hands a
// waker to another thread.
pub fn waker(task: Rc<Task>) -> Waker {
    let raw = Rc::into_raw(task).cast::<()>();
    unsafe { Waker::from_raw(RawWaker::new(raw, &VTABLE)) }
}

const VTABLE: RawWakerVTable = RawWakerVTable::new(clone, wake, wake_by_ref, drop_raw);

unsafe fn clone(ptr: *const ()) -> RawWaker {
    let rc = Rc::from_raw(ptr.cast::<Task>());
    std::mem::forget(rc.clone());
    std::mem::forget(rc);
    RawWaker::new(ptr, &VTABLE)
}

unsafe fn wake(ptr: *const ()) {
    let rc = Rc::from_raw(ptr.cast::<Task>());
    rc.schedule();
}

unsafe fn wake_by_ref(ptr: *const ()) {
    let rc = Rc::from_raw(ptr.cast::<Task>());
    rc.schedule();
    std::mem::forget(rc);
}

unsafe fn drop_raw(ptr: *const ()) {
    drop(Rc::from_raw(ptr.cast::<Task>()));
}
