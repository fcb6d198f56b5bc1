//! The transient opacity pulse shown on a freshly detected marker.
//!
//! The overlay for a marker is attached only once its highlight finishes. That ordering is carried
//! as data: completion yields a [`HighlightDone`] token, and the scene graph requires the token to
//! attach pending content.

use crate::animation::anim::{InterpMode, Keyframe, Keyframes};
use crate::animation::ease::Ease;
use crate::foundation::error::{MarkerlayError, MarkerlayResult};

pub const HIGHLIGHT_BASE_OPACITY: f64 = 0.25;

/// One step of a sequential highlight action.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum HighlightStep {
    Wait { secs: f64 },
    FadeTo { opacity: f64, secs: f64 },
    FadeOut { secs: f64 },
    /// Detach the highlight node from the scene.
    Remove,
}

impl HighlightStep {
    fn secs(self) -> f64 {
        match self {
            Self::Wait { secs } | Self::FadeTo { secs, .. } | Self::FadeOut { secs } => secs,
            Self::Remove => 0.0,
        }
    }
}

/// Proof that a highlight ran to completion. Only [`HighlightAction::advance`] creates one.
#[derive(Debug, PartialEq)]
pub struct HighlightDone {
    finished_at_sec: f64,
}

impl HighlightDone {
    pub fn finished_at_sec(&self) -> f64 {
        self.finished_at_sec
    }
}

#[derive(Debug, PartialEq)]
pub enum HighlightProgress {
    Running { opacity: f64 },
    /// Reported exactly once, on the tick that crosses the end of the sequence.
    Completed(HighlightDone),
    /// Any tick after completion.
    Finished,
}

#[derive(Clone, Debug)]
pub struct HighlightAction {
    steps: Vec<HighlightStep>,
    track: Keyframes<f64>,
    duration: f64,
    elapsed: f64,
    completed: bool,
}

impl HighlightAction {
    /// wait 0.25 s, fade to 0.85, fade to 0.15, fade to 0.85 (0.25 s each), fade out over 0.5 s,
    /// then remove. `initial_opacity` is clamped to `[0, 1]`.
    pub fn standard(initial_opacity: f64) -> Self {
        let steps = vec![
            HighlightStep::Wait { secs: 0.25 },
            HighlightStep::FadeTo {
                opacity: 0.85,
                secs: 0.25,
            },
            HighlightStep::FadeTo {
                opacity: 0.15,
                secs: 0.25,
            },
            HighlightStep::FadeTo {
                opacity: 0.85,
                secs: 0.25,
            },
            HighlightStep::FadeOut { secs: 0.5 },
            HighlightStep::Remove,
        ];
        Self::from_track(track_for(initial_opacity.clamp(0.0, 1.0), &steps), steps)
    }

    pub fn new(initial_opacity: f64, steps: Vec<HighlightStep>) -> MarkerlayResult<Self> {
        check_opacity(initial_opacity)?;
        for step in &steps {
            let secs = step.secs();
            if !secs.is_finite() || secs < 0.0 {
                return Err(MarkerlayError::validation(format!(
                    "highlight step duration must be finite and >= 0, got {secs}"
                )));
            }
            if let HighlightStep::FadeTo { opacity, .. } = *step {
                check_opacity(opacity)?;
            }
        }
        let track = track_for(initial_opacity, &steps);
        track.validate()?;
        Ok(Self::from_track(track, steps))
    }

    fn from_track(track: Keyframes<f64>, steps: Vec<HighlightStep>) -> Self {
        Self {
            duration: track.end_sec(),
            steps,
            track,
            elapsed: 0.0,
            completed: false,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Whether the node should be detached once the sequence ends.
    pub fn removes_node(&self) -> bool {
        self.steps.contains(&HighlightStep::Remove)
    }

    pub fn opacity_at(&self, t: f64) -> f64 {
        self.track.sample(t).unwrap_or(0.0)
    }

    pub fn opacity(&self) -> f64 {
        self.opacity_at(self.elapsed)
    }

    pub fn advance(&mut self, dt: f64) -> HighlightProgress {
        if self.completed {
            return HighlightProgress::Finished;
        }
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
        if self.elapsed >= self.duration {
            self.completed = true;
            return HighlightProgress::Completed(HighlightDone {
                finished_at_sec: self.elapsed,
            });
        }
        HighlightProgress::Running {
            opacity: self.opacity(),
        }
    }
}

/// Opacity keys at each step boundary, starting from `initial`.
fn track_for(initial: f64, steps: &[HighlightStep]) -> Keyframes<f64> {
    let mut keys = vec![key(0.0, initial)];
    let mut at = 0.0;
    let mut opacity = initial;
    for step in steps {
        match *step {
            HighlightStep::Wait { .. } => {}
            HighlightStep::FadeTo { opacity: to, .. } => opacity = to,
            HighlightStep::FadeOut { .. } => opacity = 0.0,
            HighlightStep::Remove => continue,
        }
        at += step.secs();
        keys.push(key(at, opacity));
    }
    Keyframes {
        keys,
        mode: InterpMode::Linear,
    }
}

fn key(at_sec: f64, value: f64) -> Keyframe<f64> {
    Keyframe {
        at_sec,
        value,
        ease: Ease::Linear,
    }
}

fn check_opacity(v: f64) -> MarkerlayResult<()> {
    if !(0.0..=1.0).contains(&v) {
        return Err(MarkerlayError::validation(format!(
            "opacity must be within [0, 1], got {v}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/animation/highlight.rs"]
mod tests;
