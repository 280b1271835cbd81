//! NF Mailbox
//!
//! Unbounded multi-producer queue drained by a single actor thread. Pushing
//! never blocks; popping waits on the `not_empty` condition until a message
//! arrives or the mailbox is terminated.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Outcome of a non-blocking or timed pop
#[derive(Debug, PartialEq, Eq)]
pub enum PopResult<T> {
    /// An item was dequeued
    Item(T),
    /// The mailbox was empty (or the timeout elapsed)
    Empty,
    /// The mailbox has been terminated
    Terminated,
}

/// Mailbox for an NF actor
pub struct Mailbox<T> {
    inner: Mutex<MailboxInner<T>>,
    not_empty: Condvar,
}

struct MailboxInner<T> {
    data: VecDeque<T>,
    terminated: bool,
    empty_waiters: u32,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Mailbox {
            inner: Mutex::new(MailboxInner {
                data: VecDeque::new(),
                terminated: false,
                empty_waiters: 0,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Enqueue an item. Hands the item back if the mailbox is terminated.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if guard.terminated {
            return Err(item);
        }

        guard.data.push_back(item);

        if guard.empty_waiters > 0 {
            self.not_empty.notify_one();
        }

        Ok(())
    }

    /// Dequeue an item, blocking until one is available.
    ///
    /// Returns `None` once the mailbox is terminated.
    pub fn pop(&self) -> Option<T> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        loop {
            if guard.terminated {
                return None;
            }
            if let Some(item) = guard.data.pop_front() {
                return Some(item);
            }

            guard.empty_waiters += 1;
            guard = self.not_empty.wait(guard).unwrap_or_else(|e| e.into_inner());
            guard.empty_waiters -= 1;
        }
    }

    /// Dequeue an item without blocking
    pub fn try_pop(&self) -> PopResult<T> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if guard.terminated {
            return PopResult::Terminated;
        }
        match guard.data.pop_front() {
            Some(item) => PopResult::Item(item),
            None => PopResult::Empty,
        }
    }

    /// Dequeue an item, waiting at most `timeout`
    pub fn pop_timeout(&self, timeout: Duration) -> PopResult<T> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if guard.terminated {
            return PopResult::Terminated;
        }

        if guard.data.is_empty() {
            guard.empty_waiters += 1;
            let (new_guard, _) = self
                .not_empty
                .wait_timeout_while(guard, timeout, |inner| {
                    inner.data.is_empty() && !inner.terminated
                })
                .unwrap_or_else(|e| e.into_inner());
            guard = new_guard;
            guard.empty_waiters -= 1;

            if guard.terminated {
                return PopResult::Terminated;
            }
        }

        match guard.data.pop_front() {
            Some(item) => PopResult::Item(item),
            None => PopResult::Empty,
        }
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Terminate the mailbox and wake every waiter. Queued items are dropped.
    pub fn terminate(&self) {
        {
            let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            guard.terminated = true;
            guard.data.clear();
        }
        self.not_empty.notify_all();
    }

    pub fn is_terminated(&self) -> bool {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.terminated
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
