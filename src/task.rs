//! Deferred-work queue between the engine and the cooperative scheduler.
//!
//! A bounded channel built on `critical-section` and `heapless::Deque`.
//! Sequence presets never start a child playback inside the current tick;
//! they post a [`TriggerRequest`] here, and the firmware main loop drains
//! the receiver and calls `play` on the next pass through the queue. That
//! keeps every tick run-to-completion and the slot table single-writer.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::{Deque, Vec};

use crate::buffer::Offset;
use crate::controller::Tag;
use crate::preset::{BlendMode, PresetHeader};

/// Capacity of the trigger queue between engine and scheduler.
pub const TRIGGER_QUEUE_SIZE: usize = 8;

/// Most trigger requests a single tick can produce.
pub const MAX_TRIGGERS_PER_TICK: usize = 8;

/// Per-tick accumulation of trigger requests before posting.
pub type TriggerBacklog = Vec<TriggerRequest, MAX_TRIGGERS_PER_TICK>;

/// A request to start a child playback, posted to the task queue.
///
/// Carries only plain offsets, no buffer borrows: the firmware loop that
/// drains the queue pairs each request with the data set it manages when
/// it calls `play`. That keeps the channel free of data lifetimes, so it
/// can live on the stack next to the controller.
#[derive(Debug, Clone, Copy)]
pub struct TriggerRequest {
    pub preset: Offset<PresetHeader>,
    pub remap_face: u8,
    pub loop_count: u8,
    pub tag: Tag,
    pub blend: BlendMode,
}

/// Error returned when posting to a full queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostError<T>(pub T);

/// Error returned when taking from an empty queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryReceiveError;

/// A bounded, thread-safe deferred-work channel.
///
/// Uses critical sections for synchronization, making it suitable for
/// embedded environments. Backed by a fixed-size `heapless::Deque`.
pub struct TaskChannel<T, const SIZE: usize> {
    inner: Mutex<RefCell<Deque<T, SIZE>>>,
}

impl<T, const SIZE: usize> TaskChannel<T, SIZE> {
    /// Create a new empty channel.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Get a sender handle for this channel.
    pub const fn sender(&self) -> TaskSender<'_, T, SIZE> {
        TaskSender { channel: self }
    }

    /// Get a receiver handle for this channel.
    pub const fn receiver(&self) -> TaskReceiver<'_, T, SIZE> {
        TaskReceiver { channel: self }
    }

    /// Post deferred work onto the queue.
    ///
    /// Returns `Err(PostError(value))` if the queue is full; the work is
    /// dropped, never retried in a loop.
    pub fn post(&self, value: T) -> Result<(), PostError<T>> {
        critical_section::with(|cs| {
            let mut queue = self.inner.borrow(cs).borrow_mut();
            queue.push_back(value).map_err(PostError)
        })
    }

    /// Take the next piece of deferred work, if any.
    pub fn try_receive(&self) -> Result<T, TryReceiveError> {
        critical_section::with(|cs| {
            let mut queue = self.inner.borrow(cs).borrow_mut();
            queue.pop_front().ok_or(TryReceiveError)
        })
    }
}

impl<T, const SIZE: usize> Default for TaskChannel<T, SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// A sender handle for a [`TaskChannel`].
#[derive(Clone, Copy)]
pub struct TaskSender<'a, T, const SIZE: usize> {
    channel: &'a TaskChannel<T, SIZE>,
}

impl<T, const SIZE: usize> TaskSender<'_, T, SIZE> {
    /// Post deferred work onto the queue.
    pub fn post(&self, value: T) -> Result<(), PostError<T>> {
        self.channel.post(value)
    }
}

/// A receiver handle for a [`TaskChannel`].
#[derive(Clone, Copy)]
pub struct TaskReceiver<'a, T, const SIZE: usize> {
    channel: &'a TaskChannel<T, SIZE>,
}

impl<T, const SIZE: usize> TaskReceiver<'_, T, SIZE> {
    /// Take the next piece of deferred work, if any.
    pub fn try_receive(&self) -> Result<T, TryReceiveError> {
        self.channel.try_receive()
    }
}

/// The trigger channel between the controller and the firmware loop.
pub type TriggerChannel = TaskChannel<TriggerRequest, TRIGGER_QUEUE_SIZE>;

/// Sender half held by the controller; borrows only the channel.
pub type TriggerSender<'a> = TaskSender<'a, TriggerRequest, TRIGGER_QUEUE_SIZE>;

/// Receiver half drained by the firmware loop.
pub type TriggerReceiver<'a> = TaskReceiver<'a, TriggerRequest, TRIGGER_QUEUE_SIZE>;
