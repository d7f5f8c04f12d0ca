use std::{cell::Cell, rc::Rc};

use crate::PatternSpec;

/// Accessibility query consulted on every visual tick.
pub trait MotionPreference {
    fn is_reduced_motion(&self) -> bool;
}

impl<F: Fn() -> bool> MotionPreference for F {
    fn is_reduced_motion(&self) -> bool {
        self()
    }
}

/// Preference that never changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedMotion(pub bool);

impl MotionPreference for FixedMotion {
    fn is_reduced_motion(&self) -> bool {
        self.0
    }
}

/// Preference the host can flip while a session runs.
#[derive(Debug, Clone, Default)]
pub struct MotionToggle(Rc<Cell<bool>>);

impl MotionToggle {
    pub fn new(reduced: bool) -> Self {
        Self(Rc::new(Cell::new(reduced)))
    }

    pub fn set(&self, reduced: bool) {
        self.0.set(reduced);
    }
}

impl MotionPreference for MotionToggle {
    fn is_reduced_motion(&self) -> bool {
        self.0.get()
    }
}

/// Portion of every segment drawn at `progress`. Reduced motion pins the
/// pattern to its finished state.
pub fn reveal_fraction(progress: f64, reduced_motion: bool) -> f64 {
    if reduced_motion {
        return 1.0;
    }
    if progress.is_nan() {
        return 0.0;
    }
    progress.clamp(0.0, 1.0)
}

/// Dash offset for a segment of `length` drawn to `fraction`.
pub fn hidden_length(length: f64, fraction: f64) -> f64 {
    (length * (1.0 - fraction.clamp(0.0, 1.0))).clamp(0.0, length)
}

/// Pattern paired with its current reveal.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealedPattern {
    pattern: PatternSpec,
    fraction: f64,
}

impl RevealedPattern {
    /// Starts fully hidden.
    pub fn new(pattern: PatternSpec) -> Self {
        Self {
            pattern,
            fraction: 0.0,
        }
    }

    pub fn pattern(&self) -> &PatternSpec {
        &self.pattern
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn set_fraction(&mut self, fraction: f64) {
        self.fraction = fraction.clamp(0.0, 1.0);
    }

    /// Current dash offset of every segment, in generation order.
    pub fn dash_offsets(&self) -> Vec<f64> {
        self.pattern
            .segments
            .iter()
            .map(|segment| hidden_length(segment.length, self.fraction))
            .collect()
    }

    pub fn is_fully_drawn(&self) -> bool {
        self.dash_offsets().iter().all(|offset| *offset == 0.0)
    }
}
