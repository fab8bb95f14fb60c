// SPDX-License-Identifier: GPL-3.0-only

//! Seek-bar state, kept out of the widget tree so the drag guard can be
//! reasoned about (and tested) without a running toolkit.
//!
//! The one mutual-exclusion rule in the player lives here: while the user
//! is dragging the scrubber, position feedback from the engine must not
//! move it out from under them. That is a flag, not a lock — everything
//! runs on the UI loop.

/// Round a seek target to whole milliseconds before it reaches the engine.
pub fn round_to_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

#[derive(Debug, Default)]
pub struct Scrubber {
    value: f64,
    max: f64,
    dragging: bool,
}

impl Scrubber {
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Total duration in seconds; zero until the media is ready.
    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Back to the unloaded state: no duration, position zero, no drag.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Readiness: the engine has reported the total duration.
    pub fn set_max(&mut self, total: f64) {
        self.max = total.max(0.0);
    }

    /// Position feedback from the engine. Ignored while a drag is in
    /// progress; returns whether the value was applied.
    pub fn sync_position(&mut self, position: f64) -> bool {
        if self.dragging {
            return false;
        }
        self.value = position;
        true
    }

    /// The slider moved under the user's pointer — either a drag step or a
    /// click-jump. Snaps the displayed value immediately and returns the
    /// millisecond-rounded target to hand to the engine.
    pub fn drag_to(&mut self, value: f64) -> f64 {
        self.dragging = true;
        self.value = value;
        round_to_millis(value)
    }

    /// The drag ended; position feedback applies again afterwards.
    /// Returns the final millisecond-rounded target.
    pub fn release(&mut self) -> f64 {
        self.dragging = false;
        round_to_millis(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_feedback_applies_when_idle() {
        let mut scrubber = Scrubber::default();
        scrubber.set_max(120.0);
        assert!(scrubber.sync_position(4.5));
        assert_eq!(scrubber.value(), 4.5);
    }

    #[test]
    fn position_feedback_is_ignored_during_a_drag() {
        let mut scrubber = Scrubber::default();
        scrubber.set_max(120.0);
        scrubber.drag_to(60.0);
        assert!(!scrubber.sync_position(5.0));
        assert_eq!(scrubber.value(), 60.0);
    }

    #[test]
    fn feedback_resumes_after_release() {
        let mut scrubber = Scrubber::default();
        scrubber.drag_to(60.0);
        scrubber.release();
        assert!(scrubber.sync_position(61.0));
        assert_eq!(scrubber.value(), 61.0);
    }

    #[test]
    fn drag_snaps_the_displayed_value_immediately() {
        let mut scrubber = Scrubber::default();
        scrubber.set_max(200.0);
        // A click at 30% of a 200 s bar arrives as a change to 60 s.
        scrubber.drag_to(60.0);
        assert_eq!(scrubber.value(), 60.0);
        assert!(scrubber.is_dragging());
    }

    #[test]
    fn targets_are_rounded_to_milliseconds() {
        let mut scrubber = Scrubber::default();
        assert_eq!(scrubber.drag_to(12.345_678), 12.346);
        assert_eq!(scrubber.release(), 12.346);
        assert_eq!(round_to_millis(0.000_4), 0.0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut scrubber = Scrubber::default();
        scrubber.set_max(120.0);
        scrubber.drag_to(60.0);
        scrubber.reset();
        assert_eq!(scrubber.value(), 0.0);
        assert_eq!(scrubber.max(), 0.0);
        assert!(!scrubber.is_dragging());
    }

    #[test]
    fn max_never_goes_negative() {
        let mut scrubber = Scrubber::default();
        scrubber.set_max(-3.0);
        assert_eq!(scrubber.max(), 0.0);
    }
}
