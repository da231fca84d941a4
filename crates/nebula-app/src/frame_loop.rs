//! Cooperative frame scheduler.
//!
//! Window events are queued as they arrive and applied at the start of the
//! next frame, so every input change is visible to the uniform upload and
//! the draw that follow it. One frame is requested at a time; once the
//! scheduler is cancelled no further frames run.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::warn;

/// Frame deltas are clamped to this many seconds after a stall.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Timing of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Time since the scheduler started.
    pub timestamp: Duration,
    /// Seconds since the previous frame, clamped to [`MAX_FRAME_TIME`].
    pub delta: f64,
}

/// The two halves of a frame.
pub trait FrameHandler<E> {
    fn apply_input(&mut self, event: E);

    fn render(&mut self, time: FrameTime);
}

/// Alternates "apply queued input" and "render frame".
pub struct FrameScheduler<E> {
    started: Instant,
    previous: Option<Duration>,
    queue: VecDeque<E>,
    frame_requested: bool,
    cancelled: bool,
    input_attached: bool,
    frame_count: u64,
}

impl<E> FrameScheduler<E> {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            previous: None,
            queue: VecDeque::new(),
            frame_requested: false,
            cancelled: false,
            input_attached: true,
            frame_count: 0,
        }
    }

    /// Queue an input event for the next frame. Dropped once input is detached.
    pub fn push(&mut self, event: E) -> bool {
        if !self.input_attached {
            return false;
        }
        self.queue.push_back(event);
        true
    }

    /// Mark a frame as wanted. Returns `true` when the caller should ask the
    /// window for a redraw, i.e. no frame was pending and the loop is live.
    pub fn request_frame(&mut self) -> bool {
        if self.cancelled || self.frame_requested {
            return false;
        }
        self.frame_requested = true;
        true
    }

    /// Run one frame using the wall clock.
    pub fn tick<H>(&mut self, handler: &mut H) -> Option<FrameTime>
    where
        H: FrameHandler<E>,
    {
        let now = self.started.elapsed();
        self.tick_at(now, handler)
    }

    /// Run one frame at `now` (time since start): drain the input queue in
    /// arrival order, then render once. Returns `None` after cancellation.
    pub fn tick_at<H>(&mut self, now: Duration, handler: &mut H) -> Option<FrameTime>
    where
        H: FrameHandler<E>,
    {
        self.frame_requested = false;
        if self.cancelled {
            return None;
        }

        let mut delta = self
            .previous
            .map_or(0.0, |previous| now.saturating_sub(previous).as_secs_f64());
        if delta > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                delta * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            delta = MAX_FRAME_TIME;
        }
        self.previous = Some(now);

        while let Some(event) = self.queue.pop_front() {
            handler.apply_input(event);
        }

        let time = FrameTime {
            timestamp: now,
            delta,
        };
        handler.render(time);
        self.frame_count += 1;
        Some(time)
    }

    /// Stop scheduling frames. A pending request is dropped.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.frame_requested = false;
    }

    /// Drop queued input and ignore everything pushed afterwards.
    pub fn detach_input(&mut self) {
        self.input_attached = false;
        self.queue.clear();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn is_input_attached(&self) -> bool {
        self.input_attached
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Time since the scheduler started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl<E> Default for FrameScheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        log: Vec<String>,
        times: Vec<FrameTime>,
    }

    impl FrameHandler<u32> for Recorder {
        fn apply_input(&mut self, event: u32) {
            self.log.push(format!("input {event}"));
        }

        fn render(&mut self, time: FrameTime) {
            self.log.push("render".to_string());
            self.times.push(time);
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_input_applied_before_render() {
        let mut scheduler = FrameScheduler::<u32>::new();
        let mut recorder = Recorder::default();
        scheduler.push(1);
        scheduler.push(2);

        scheduler.tick_at(ms(16), &mut recorder);
        assert_eq!(recorder.log, vec!["input 1", "input 2", "render"]);
        assert_eq!(scheduler.pending_events(), 0);
        assert_eq!(scheduler.frame_count(), 1);
    }

    #[test]
    fn test_first_frame_has_zero_delta() {
        let mut scheduler = FrameScheduler::<u32>::new();
        let mut recorder = Recorder::default();
        let time = scheduler.tick_at(ms(500), &mut recorder).unwrap();
        assert_eq!(time.delta, 0.0);
        assert_eq!(time.timestamp, ms(500));

        let time = scheduler.tick_at(ms(516), &mut recorder).unwrap();
        assert!((time.delta - 0.016).abs() < 1e-9);
        assert_eq!(recorder.times.len(), 2);
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut scheduler = FrameScheduler::<u32>::new();
        let mut recorder = Recorder::default();
        scheduler.tick_at(ms(0), &mut recorder);
        let time = scheduler.tick_at(ms(2_000), &mut recorder).unwrap();
        assert_eq!(time.delta, MAX_FRAME_TIME);
    }

    #[test]
    fn test_request_frame_coalesces() {
        let mut scheduler = FrameScheduler::<u32>::new();
        let mut recorder = Recorder::default();
        assert!(scheduler.request_frame());
        assert!(!scheduler.request_frame());
        scheduler.tick_at(ms(1), &mut recorder);
        assert!(scheduler.request_frame());
    }

    #[test]
    fn test_cancel_stops_frames() {
        let mut scheduler = FrameScheduler::<u32>::new();
        let mut recorder = Recorder::default();
        scheduler.request_frame();
        scheduler.cancel();
        assert!(!scheduler.request_frame());

        assert!(scheduler.tick_at(ms(1), &mut recorder).is_none());
        assert!(recorder.log.is_empty());
    }

    #[test]
    fn test_detached_input_is_dropped() {
        let mut scheduler = FrameScheduler::<u32>::new();
        let mut recorder = Recorder::default();
        scheduler.push(1);
        scheduler.detach_input();
        assert!(!scheduler.push(2));
        assert_eq!(scheduler.pending_events(), 0);

        scheduler.tick_at(ms(1), &mut recorder);
        assert_eq!(recorder.log, vec!["render"]);
    }
}
