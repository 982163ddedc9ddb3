//! Cached, event-sliced render dispatch shared by every node in the graph.
//!
//! A node renders at most once per round (`cached_round` short-circuit),
//! and within a round it renders in slices between scheduled events, so a
//! parameter change lands on the exact sample it was scheduled for rather
//! than at the start of the next host block.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

#[cfg(test)]
use alloc::vec::Vec;

use crate::event::{Event, EventQueue};

/// A monotonically increasing render-round counter. Each host callback that
/// renders a new block of audio advances the round by one; a node that has
/// already rendered for the current round returns its cached buffer instead
/// of rendering again, so diamond-shaped graphs (two consumers sharing one
/// producer) render the shared producer exactly once.
pub type Round = u64;

/// Below this absolute peak, a block is treated as silence for memoization
/// purposes — the producer is still "rendered" (so its cache is valid) but
/// downstream consumers may skip further processing of the buffer.
pub const SILENCE_THRESHOLD: f32 = 1e-8;

/// Find the largest absolute sample value in a buffer.
#[must_use]
pub fn find_peak(buffer: &[f32]) -> f32 {
    buffer.iter().fold(0.0_f32, |peak, &s| peak.max(s.abs()))
}

/// Cache and event bookkeeping shared by every [`SignalProducer`]
/// implementation. A producer embeds one of these and delegates `produce`'s
/// driving loop to the free function [`produce`].
#[derive(Debug, Default)]
pub struct ProducerState {
    cached_round: i64,
    cached_silence_round: i64,
    events: EventQueue,
    current_time: f64,
    sample_rate: f64,
    block_size: usize,
}

impl ProducerState {
    /// Construct state for a producer running at `sample_rate` with buffers
    /// sized for up to `block_size` samples per round.
    #[must_use]
    pub fn new(sample_rate: f64, block_size: usize) -> Self {
        Self {
            cached_round: -1,
            cached_silence_round: -1,
            events: EventQueue::new(),
            current_time: 0.0,
            sample_rate,
            block_size,
        }
    }

    /// Sample rate this producer renders at.
    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Maximum samples this producer renders per round.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Update the sample rate and block size, e.g. on host reconfiguration.
    /// Does not itself reallocate buffers — callers own their buffers and
    /// should resize them when this returns `true`.
    pub fn set_sample_rate_and_block_size(&mut self, sample_rate: f64, block_size: usize) -> bool {
        let changed = sample_rate != self.sample_rate || block_size != self.block_size;
        self.sample_rate = sample_rate;
        self.block_size = block_size;
        changed
    }

    /// True if this producer already rendered the given round.
    #[must_use]
    pub fn is_cached(&self, round: Round) -> bool {
        self.cached_round == round as i64
    }

    /// Mark the given round as rendered.
    pub fn mark_rendered(&mut self, round: Round) {
        self.cached_round = round as i64;
    }

    /// True if the last rendered round was silent.
    #[must_use]
    pub fn is_silent(&self, round: Round) -> bool {
        self.cached_silence_round == round as i64
    }

    /// Mark the given round as having produced a silent (below-threshold)
    /// buffer.
    pub fn mark_round_as_silent(&mut self, round: Round) {
        self.cached_silence_round = round as i64;
    }

    /// Schedule an event for this producer.
    pub fn schedule(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Cancel every pending event.
    pub fn cancel_events(&mut self) {
        self.events.clear();
    }

    /// Cancel pending events scheduled at or after `time_offset`.
    pub fn cancel_events_after(&mut self, time_offset: f64) {
        let mut kept = 0;
        while let Some(ev) = self.events.at(kept) {
            if ev.time_offset >= time_offset {
                break;
            }
            kept += 1;
        }
        self.events.drop(kept);
    }

    /// True if there are any events still pending.
    #[must_use]
    pub fn has_upcoming_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Current time offset within the round, in samples.
    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.current_time
    }
}

/// The four hooks a node implements to participate in the render graph.
/// `ProducerState` (the cache/event bookkeeping) is intentionally kept
/// outside this trait so implementors own their own field layout; `produce`
/// borrows it via [`SignalProducer::state`] / [`SignalProducer::state_mut`].
pub trait SignalProducer {
    /// Borrow this producer's cache/event state.
    fn state(&self) -> &ProducerState;
    /// Mutably borrow this producer's cache/event state.
    fn state_mut(&mut self) -> &mut ProducerState;

    /// Called once per round before any `render` slice. Returning `true`
    /// short-circuits the rest of the round (used by producers that
    /// delegate entirely to a child, e.g. a passthrough wrapper).
    fn initialize_rendering(&mut self, _round: Round) -> bool {
        false
    }

    /// Render `sample_count` samples starting at `first_sample_index` into
    /// the implementor's own output buffer. Called once per event-bounded
    /// slice within a round.
    fn render(&mut self, round: Round, first_sample_index: usize, sample_count: usize);

    /// Called once per round after all slices have rendered.
    fn finalize_rendering(&mut self, _round: Round) {}

    /// Apply a single event's effect on this producer's parameters/state.
    fn handle_event(&mut self, event: &Event);
}

/// Drive a producer through one round: short-circuit if already cached,
/// otherwise slice the round at each pending event's time offset, calling
/// `render` on each slice and `handle_event` between slices, then finalize.
///
/// Kept outside the trait so it can be called uniformly regardless of the
/// concrete producer type, and so implementors can't accidentally override
/// the caching contract.
pub fn produce<P: SignalProducer>(producer: &mut P, round: Round, sample_count: usize) {
    if producer.state().is_cached(round) {
        return;
    }

    if producer.initialize_rendering(round) {
        producer.state_mut().mark_rendered(round);
        return;
    }

    let sample_rate = producer.state().sample_rate();
    let mut current_sample_index = 0usize;

    loop {
        let next_stop = handle_events(producer, sample_count, current_sample_index, sample_rate);
        let slice_len = next_stop - current_sample_index;
        if slice_len > 0 {
            producer.render(round, current_sample_index, slice_len);
        }
        current_sample_index = next_stop;
        if current_sample_index >= sample_count {
            break;
        }
    }

    producer.finalize_rendering(round);
    producer.state_mut().mark_rendered(round);

    if !producer.state().has_upcoming_events() {
        producer.state_mut().current_time = 0.0;
    }
}

/// Pop and apply every event due at or before `current_sample_index`,
/// returning the sample index of the next slice boundary: either the next
/// pending event's time (rounded up to a whole sample) or `sample_count` if
/// no event falls within this round.
fn handle_events<P: SignalProducer>(
    producer: &mut P,
    sample_count: usize,
    current_sample_index: usize,
    sample_rate: f64,
) -> usize {
    loop {
        let Some(event) = producer.state().events.front().copied() else {
            return sample_count;
        };

        let event_sample = sample_offset(event.time_offset, producer.state().current_time, sample_rate);

        if event_sample > current_sample_index {
            return event_sample.min(sample_count);
        }

        producer.state_mut().events.pop();
        producer.handle_event(&event);
    }
}

/// Convert an event's absolute time offset (seconds since round start) into
/// a sample index relative to the round's current playback time, rounding
/// up so an event never fires before its scheduled instant.
fn sample_offset(event_time: f64, current_time: f64, sample_rate: f64) -> usize {
    let delta_seconds = (event_time - current_time).max(0.0);
    let delta_samples = delta_seconds * sample_rate;
    ceil_to_usize(delta_samples)
}

/// Ceiling with a one-nanosample slack, so a time that round-trips through
/// seconds and back to an exact sample index (plus a ulp of float error)
/// doesn't land one sample late.
fn ceil_to_usize(value: f64) -> usize {
    let nudged = value - 1e-9;
    if nudged <= 0.0 {
        return 0;
    }
    let floor = nudged as usize;
    if (floor as f64) < nudged { floor + 1 } else { floor }
}
