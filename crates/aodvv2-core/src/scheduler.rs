//! Scheduler (C6): a single bounded priority queue of outgoing control
//! messages, rate-limited to one release per `rate_interval`. Enqueue is
//! the sole public entry point and is thread-safe; the routing task drains
//! the queue by calling [`Scheduler::take_next`], which blocks until a
//! message is available and the rate limit allows release.

use std::net::Ipv6Addr;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::config::Constants;

/// Fixed priority ranks from the data model, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    RerrForwardedRrep = 0,
    RerrInvalidated = 1,
    Rreq = 2,
    Rrep = 3,
    RerrUndeliverable = 4,
    RrepAck = 5,
}

/// Where a queued message is headed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Unicast(Ipv6Addr),
    AllTargets,
}

#[derive(Debug, Clone)]
pub enum MessageBody {
    Rreq(crate::engine::RreqOut),
    Rrep(crate::engine::RrepOut),
    Rerr(crate::engine::RerrOut),
    RrepAck(crate::engine::RrepAckOut),
}

#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub priority: Priority,
    pub body: MessageBody,
    pub destination: Destination,
    pub iface: u32,
    enqueue_index: u64,
}

struct Inner {
    queue: Vec<QueuedMessage>,
    next_index: u64,
    last_sent: Option<Instant>,
}

pub struct Scheduler {
    inner: Mutex<Inner>,
    not_empty: Condvar,
    capacity: usize,
    rate_interval: Duration,
}

impl Scheduler {
    pub fn new(constants: &Constants) -> Self {
        Self {
            inner: Mutex::new(Inner { queue: Vec::new(), next_index: 0, last_sent: None }),
            not_empty: Condvar::new(),
            capacity: constants.control_traffic_limit as usize,
            rate_interval: Duration::from_secs(1) / constants.control_traffic_limit.max(1),
        }
    }

    /// Enqueue a message. When full, evicts the single lowest-priority
    /// pending entry strictly lower than `priority`; if none qualifies,
    /// enqueue fails and the caller must drop the message.
    pub fn enqueue(
        &self,
        priority: Priority,
        body: MessageBody,
        destination: Destination,
        iface: u32,
    ) -> Result<(), crate::error::SetError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.queue.len() >= self.capacity {
            let lowest = inner
                .queue
                .iter()
                .enumerate()
                .filter(|(_, m)| m.priority < priority)
                .min_by_key(|(_, m)| (m.priority, m.enqueue_index))
                .map(|(i, _)| i);
            match lowest {
                Some(i) => {
                    inner.queue.remove(i);
                }
                None => return Err(crate::error::SetError::Full),
            }
        }
        let enqueue_index = inner.next_index;
        inner.next_index += 1;
        inner.queue.push(QueuedMessage { priority, body, destination, iface, enqueue_index });
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Block until a message is ready to release: waits for the queue to
    /// be non-empty, then — if the rate interval hasn't elapsed since the
    /// last release — sleeps for the remainder before taking the head.
    pub fn take_next(&self) -> QueuedMessage {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if !inner.queue.is_empty() {
                break;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }

        if let Some(last) = inner.last_sent {
            let elapsed = last.elapsed();
            if elapsed < self.rate_interval {
                let remaining = self.rate_interval - elapsed;
                drop(inner);
                std::thread::sleep(remaining);
                inner = self.inner.lock().unwrap();
            }
        }

        // Highest priority first, ties broken by insertion order (P7).
        let idx = inner
            .queue
            .iter()
            .enumerate()
            .max_by_key(|(_, m)| (m.priority, std::cmp::Reverse(m.enqueue_index)))
            .map(|(i, _)| i)
            .expect("queue non-empty by loop invariant");
        let msg = inner.queue.remove(idx);
        inner.last_sent = Some(Instant::now());
        msg
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
