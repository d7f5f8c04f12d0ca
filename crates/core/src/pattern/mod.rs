//! Procedural star pattern. Points sit evenly on a circle and chord `i`
//! joins point `i` to point `(i * multiplier) % line_count`.

use serde::{Deserialize, Serialize};

use crate::{config::PatternConfig, KenshoError, Result};

/// A single chord of the pattern with its cached length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub length: f64,
    /// Index of the point the chord ends on.
    pub target: usize,
}

impl Segment {
    fn between(x1: f64, y1: f64, x2: f64, y2: f64, target: usize) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            length: (x2 - x1).hypot(y2 - y1),
            target,
        }
    }
}

/// Generated pattern. Immutable once built; only its reveal changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub line_count: usize,
    pub multiplier: usize,
    /// Side of the square canvas the pattern was laid out on.
    pub size: f64,
    pub segments: Vec<Segment>,
}

impl PatternSpec {
    /// Sum of all segment lengths.
    pub fn total_length(&self) -> f64 {
        self.segments.iter().map(|segment| segment.length).sum()
    }
}

/// Builds the pattern with the default geometry and multiplier.
pub fn generate(line_count: usize) -> Result<PatternSpec> {
    PatternConfig {
        line_count,
        ..PatternConfig::default()
    }
    .generate()
}

impl PatternConfig {
    /// Rejects configurations that would collapse into fewer distinct chords
    /// or fall outside the canvas.
    pub fn validate(&self) -> Result<()> {
        if self.line_count == 0 {
            return Err(KenshoError::InvalidPattern(
                "pattern needs at least one line".to_string(),
            ));
        }
        if gcd(self.multiplier, self.line_count) != 1 {
            return Err(KenshoError::InvalidPattern(format!(
                "multiplier {} shares a factor with line count {}",
                self.multiplier, self.line_count
            )));
        }
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(KenshoError::InvalidPattern(format!(
                "canvas size must be positive, got {}",
                self.size
            )));
        }
        if !(self.padding >= 0.0 && self.padding < self.size / 2.0) {
            return Err(KenshoError::InvalidPattern(format!(
                "padding {} leaves no room on a {} canvas",
                self.padding, self.size
            )));
        }
        Ok(())
    }

    /// Radius of the circle the points sit on.
    pub fn radius(&self) -> f64 {
        self.size / 2.0 - self.padding
    }

    /// Lays out the pattern. Deterministic and side-effect free.
    pub fn generate(&self) -> Result<PatternSpec> {
        self.validate()?;

        let center = self.size / 2.0;
        let radius = self.radius();
        let step = 360.0 / self.line_count as f64;
        let point = |index: usize| {
            let angle = (index as f64 * step).to_radians();
            (center + radius * angle.cos(), center + radius * angle.sin())
        };

        let segments = (0..self.line_count)
            .map(|i| {
                let target = (i * self.multiplier) % self.line_count;
                let (x1, y1) = point(i);
                let (x2, y2) = point(target);
                Segment::between(x1, y1, x2, y2, target)
            })
            .collect();

        Ok(PatternSpec {
            line_count: self.line_count,
            multiplier: self.multiplier,
            size: self.size,
            segments,
        })
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}
