//! Engine events and their priority queue.
//!
//! Events are ordered by preemption first (real-world events jump ahead of
//! background work), then by priority (higher first), then by arrival in the
//! queue (earlier first).
//! The queue maintains a shared preemption flag that is raised while a
//! preemptive event waits; long-running background work polls it.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::models::NodeId;
use crate::world::Commitment;

/// Something the event loop dispatches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Requests became known at `time`.
    NewRequest { nodes: Vec<NodeId>, time: f64 },
    /// An irrevocable next-visit decision.
    Commit(Commitment),
    ResourceStart { resource: usize, time: f64 },
    ResourceStop { resource: usize, time: f64 },
    StartOfService { resource: usize, node: NodeId, time: f64 },
    EndOfService { resource: usize, node: NodeId, time: f64 },
    /// Rebuild the distinguished solution.
    Decide { time: f64 },
    /// Background: refill the pool.
    Generate,
    /// Background: improve the pool.
    Optimize,
    /// Background: drop inconsistent scenarios.
    CleanPool,
}

impl EngineEvent {
    /// Real-world events preempt background work.
    pub fn is_preemptive(&self) -> bool {
        !matches!(
            self,
            Self::Decide { .. } | Self::Generate | Self::Optimize | Self::CleanPool
        )
    }

    /// Real-world events share one priority so that dependent events (a
    /// request release and its commitment, a start and an end of service)
    /// keep the order in which they were sent.
    pub fn default_priority(&self) -> u8 {
        match self {
            Self::NewRequest { .. }
            | Self::Commit(_)
            | Self::ResourceStart { .. }
            | Self::ResourceStop { .. }
            | Self::StartOfService { .. }
            | Self::EndOfService { .. } => REAL_WORLD_PRIORITY,
            Self::Decide { .. } => 50,
            Self::CleanPool => 20,
            Self::Generate => 10,
            Self::Optimize => 0,
        }
    }
}

/// Default priority of every preemptive event.
pub const REAL_WORLD_PRIORITY: u8 = 60;

/// `arrival` is the queue's logical clock: the order in which events were
/// pushed, which is the order their producers observed them in.
#[derive(Debug)]
struct Queued {
    event: EngineEvent,
    preemptive: bool,
    priority: u8,
    arrival: u64,
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.preemptive
            .cmp(&other.preemptive)
            .then(self.priority.cmp(&other.priority))
            .then(other.arrival.cmp(&self.arrival))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.arrival == other.arrival
    }
}

impl Eq for Queued {}

#[derive(Debug)]
struct Inner {
    heap: Mutex<BinaryHeap<Queued>>,
    clock: AtomicU64,
    preempt: Arc<AtomicBool>,
}

impl Inner {
    fn push(&self, event: EngineEvent, priority: u8) {
        let queued = Queued {
            preemptive: event.is_preemptive(),
            priority,
            arrival: self.clock.fetch_add(1, Ordering::Relaxed),
            event,
        };
        let mut heap = self.heap.lock();
        heap.push(queued);
        self.refresh(&heap);
    }

    fn pop(&self) -> Option<EngineEvent> {
        let mut heap = self.heap.lock();
        let event = heap.pop().map(|q| q.event);
        self.refresh(&heap);
        event
    }

    fn refresh(&self, heap: &BinaryHeap<Queued>) {
        let pending = heap.peek().is_some_and(|q| q.preemptive);
        self.preempt.store(pending, Ordering::Release);
    }
}

/// Priority queue of [`EngineEvent`]s.
///
/// # Examples
///
/// ```
/// use msa_routing::events::{EngineEvent, EventQueue};
///
/// let queue = EventQueue::new();
/// queue.push(EngineEvent::Generate);
/// queue.push(EngineEvent::Decide { time: 1.0 });
/// assert!(!queue.is_preempted());
///
/// queue.push(EngineEvent::NewRequest { nodes: vec![3], time: 2.0 });
/// assert!(queue.is_preempted());
/// assert!(matches!(queue.pop(), EngineEvent::NewRequest { .. }));
/// assert!(matches!(queue.pop(), EngineEvent::Decide { .. }));
/// assert_eq!(queue.pop(), EngineEvent::Generate);
/// // an empty queue hands out background optimization
/// assert_eq!(queue.pop(), EngineEvent::Optimize);
/// ```
#[derive(Debug, Clone)]
pub struct EventQueue {
    inner: Arc<Inner>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                heap: Mutex::new(BinaryHeap::new()),
                clock: AtomicU64::new(0),
                preempt: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// Queues an event with its default priority.
    pub fn push(&self, event: EngineEvent) {
        let priority = event.default_priority();
        self.inner.push(event, priority);
    }

    pub fn push_with_priority(&self, event: EngineEvent, priority: u8) {
        self.inner.push(event, priority);
    }

    /// Next event to dispatch; [`EngineEvent::Optimize`] when nothing waits.
    pub fn pop(&self) -> EngineEvent {
        self.inner.pop().unwrap_or(EngineEvent::Optimize)
    }

    pub fn try_pop(&self) -> Option<EngineEvent> {
        self.inner.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.heap.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.heap.lock().is_empty()
    }

    /// Raised while a preemptive event waits in the queue.
    pub fn preempt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.inner.preempt)
    }

    pub fn is_preempted(&self) -> bool {
        self.inner.preempt.load(Ordering::Acquire)
    }

    /// A handle other threads can push events through.
    pub fn sender(&self) -> EventSender {
        EventSender {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Pushes events into an [`EventQueue`] from any thread.
#[derive(Debug, Clone)]
pub struct EventSender {
    inner: Arc<Inner>,
}

impl EventSender {
    pub fn send(&self, event: EngineEvent) {
        let priority = event.default_priority();
        self.inner.push(event, priority);
    }

    pub fn send_with_priority(&self, event: EngineEvent, priority: u8) {
        self.inner.push(event, priority);
    }
}
