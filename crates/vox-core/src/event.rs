//! Scheduled event queue shared by every [`crate::signal::SignalProducer`].
//!
//! An `Event` carries a type tag, a time offset into the current round (in
//! seconds; the render loop converts it to a sample index, rounding up so an
//! event never fires early) and up to two numeric payload fields plus one
//! integer field. `EventQueue` is a push/pop ring
//! that resets its indices back to zero once fully drained, so a steady
//! schedule/consume cycle never grows the backing storage.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec::Vec;

/// Discriminates what an [`Event`] instructs its producer to do.
///
/// Each producer interprets its own subset of these; unrecognized types are
/// ignored by `handle_event` — events are opaque to the scheduler, which
/// only orders and delivers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EventType {
    /// Set a parameter directly to a value.
    SetValue,
    /// Begin a linear ramp toward a target value over a duration.
    LinearRamp,
    /// Begin a curved (exponential-shaped) ramp toward a target value.
    CurvedRamp,
    /// Note-on: begin a voice's lifecycle.
    NoteOn,
    /// Note-off: begin release.
    NoteOff,
    /// Cancel all pending events.
    Cancel,
    /// Application-defined event, distinguished by `int_param`.
    Custom,
}

/// A single scheduled event: a type tag, a time offset (in seconds from the
/// start of the current round), an integer payload, and two numeric
/// payloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// What this event instructs the producer to do.
    pub event_type: EventType,
    /// Offset in seconds from the start of the current round.
    pub time_offset: f64,
    /// Integer payload (e.g. MIDI note number, controller id).
    pub int_param: i32,
    /// First numeric payload (e.g. target value).
    pub number_param_1: f64,
    /// Second numeric payload (e.g. ramp duration in seconds).
    pub number_param_2: f64,
}

impl Event {
    /// Construct a new event with both numeric payloads set to `0.0` and
    /// `int_param` set to `0`.
    #[must_use]
    pub fn new(event_type: EventType, time_offset: f64) -> Self {
        Self {
            event_type,
            time_offset,
            int_param: 0,
            number_param_1: 0.0,
            number_param_2: 0.0,
        }
    }

    /// Builder-style setter for `int_param`.
    #[must_use]
    pub fn with_int(mut self, int_param: i32) -> Self {
        self.int_param = int_param;
        self
    }

    /// Builder-style setter for both numeric payloads.
    #[must_use]
    pub fn with_numbers(mut self, p1: f64, p2: f64) -> Self {
        self.number_param_1 = p1;
        self.number_param_2 = p2;
        self
    }
}

/// A push/pop ring of [`Event`]s with lazy reset-when-empty semantics.
///
/// `push` either appends past the high-water mark or overwrites in place if
/// a previous pop already freed the slot; `pop` advances the read cursor and
/// resets both cursors to zero once the queue is fully drained. This keeps a
/// steady produce/consume cycle (schedule this block's events, drain them
/// all, repeat) from growing the backing `Vec` without bound.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    items: Vec<Event>,
    next_push: usize,
    next_pop: usize,
}

impl EventQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_push: 0,
            next_pop: 0,
        }
    }

    /// Number of events currently queued (not yet popped).
    #[must_use]
    pub fn length(&self) -> usize {
        self.next_push - self.next_pop
    }

    /// True when no events remain to be popped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Append an event, overwriting a stale slot in place when one is
    /// available rather than growing the backing vector.
    pub fn push(&mut self, event: Event) {
        if self.next_push >= self.items.len() {
            self.items.push(event);
        } else {
            self.items[self.next_push] = event;
        }
        self.next_push += 1;
    }

    /// Pop the next event in scheduled order, or `None` if empty.
    pub fn pop(&mut self) -> Option<Event> {
        if self.next_pop >= self.next_push {
            return None;
        }
        let event = self.items[self.next_pop];
        self.next_pop += 1;
        self.reset_if_empty();
        Some(event)
    }

    /// Peek the next event without removing it.
    #[must_use]
    pub fn front(&self) -> Option<&Event> {
        if self.next_pop >= self.next_push {
            None
        } else {
            Some(&self.items[self.next_pop])
        }
    }

    /// Peek the most recently pushed event without removing it.
    #[must_use]
    pub fn back(&self) -> Option<&Event> {
        if self.next_push == 0 || self.next_pop >= self.next_push {
            None
        } else {
            Some(&self.items[self.next_push - 1])
        }
    }

    /// Index into the queue relative to the read cursor (`0` is `front()`).
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Event> {
        let i = self.next_pop + index;
        if i < self.next_push { Some(&self.items[i]) } else { None }
    }

    /// Truncate the queue so only the first `index` queued events remain.
    pub fn drop(&mut self, index: usize) {
        self.next_push = (self.next_pop + index).min(self.next_push);
        self.reset_if_empty();
    }

    /// Remove every queued event.
    pub fn clear(&mut self) {
        self.next_push = 0;
        self.next_pop = 0;
    }

    fn reset_if_empty(&mut self) {
        if self.next_pop >= self.next_push {
            self.next_pop = 0;
            self.next_push = 0;
        }
    }
}
