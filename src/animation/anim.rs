use crate::animation::ease::Ease;
use crate::foundation::error::{MarkerlayError, MarkerlayResult};

pub trait Lerp: Sized {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for f32 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        (f64::from(*a) + (f64::from(*b) - f64::from(*a)) * t) as f32
    }
}

/// A value track keyed in seconds of action time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframes<T> {
    pub keys: Vec<Keyframe<T>>, // sorted by time
    pub mode: InterpMode,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe<T> {
    pub at_sec: f64,
    pub value: T,
    pub ease: Ease, // toward the next key
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpMode {
    Hold,
    #[default]
    Linear,
}

impl<T> Keyframes<T>
where
    T: Lerp + Clone,
{
    pub fn validate(&self) -> MarkerlayResult<()> {
        if self.keys.is_empty() {
            return Err(MarkerlayError::validation(
                "keyframe track must have at least one key",
            ));
        }
        if self.keys.iter().any(|k| !k.at_sec.is_finite() || k.at_sec < 0.0) {
            return Err(MarkerlayError::validation(
                "keyframe times must be finite and >= 0",
            ));
        }
        if !self.keys.windows(2).all(|w| w[0].at_sec <= w[1].at_sec) {
            return Err(MarkerlayError::validation(
                "keyframe keys must be sorted by time",
            ));
        }
        Ok(())
    }

    /// Time of the last key.
    pub fn end_sec(&self) -> f64 {
        self.keys.last().map_or(0.0, |k| k.at_sec)
    }

    /// Value at `t` seconds; clamps to the first/last key outside the keyed range.
    ///
    /// Returns `None` only for an empty track.
    pub fn sample(&self, t: f64) -> Option<T> {
        let first = self.keys.first()?;
        let idx = self.keys.partition_point(|k| k.at_sec <= t);
        if idx == 0 {
            return Some(first.value.clone());
        }
        if idx >= self.keys.len() {
            return self.keys.last().map(|k| k.value.clone());
        }

        let a = &self.keys[idx - 1];
        let b = &self.keys[idx];
        let span = b.at_sec - a.at_sec;
        if span <= 0.0 {
            return Some(a.value.clone());
        }

        let te = a.ease.apply((t - a.at_sec) / span);
        match self.mode {
            InterpMode::Hold => Some(a.value.clone()),
            InterpMode::Linear => Some(T::lerp(&a.value, &b.value, te)),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/anim.rs"]
mod tests;
