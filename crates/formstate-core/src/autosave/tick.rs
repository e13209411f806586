//! One-tick deferral for the single-threaded executor.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future that yields to the executor exactly once before completing.
///
/// Everything the current task does synchronously after scheduling (for
/// example listeners computing derived fields) settles before the
/// continuation runs.
pub fn next_tick() -> NextTick {
    NextTick { yielded: false }
}

#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct NextTick {
    yielded: bool,
}

impl Future for NextTick {
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
