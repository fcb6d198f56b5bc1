use std::sync::mpsc;
use std::thread::JoinHandle;

use crate::foundation::error::{MarkerlayError, MarkerlayResult};

/// Seconds a shown message stays visible.
pub const MESSAGE_AUTO_HIDE_SEC: f64 = 6.0;

/// Kinds of scheduled status message. Scheduling a message replaces any pending one of the same
/// category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageCategory {
    TrackingStateEscalation,
    PlaneEstimation,
    ContentPlacement,
    FocusSquare,
}

/// User-facing status text. Every call is fire-and-forget.
pub trait StatusSurface: Send {
    fn schedule_message(&mut self, text: &str, delay_sec: f64, category: MessageCategory);
    fn show_message(&mut self, text: &str);
    fn cancel_all_scheduled_messages(&mut self);

    /// Move the surface clock; due scheduled messages are shown.
    fn advance_to(&mut self, _now_sec: f64) {}

    fn report(&self) -> StatusReport {
        StatusReport::default()
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ScheduledMessage {
    pub text: String,
    pub due_sec: f64,
    pub category: MessageCategory,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ShownMessage {
    pub text: String,
    pub at_sec: f64,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct StatusReport {
    pub visible: Option<String>,
    pub scheduled: Vec<ScheduledMessage>,
    pub history: Vec<ShownMessage>,
}

/// In-process status surface that records what would be on screen.
#[derive(Debug, Default)]
pub struct StatusBoard {
    now_sec: f64,
    visible: Option<ShownMessage>,
    scheduled: Vec<ScheduledMessage>,
    history: Vec<ShownMessage>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn show_at(&mut self, text: String, at_sec: f64) {
        tracing::info!(message = %text, "status");
        let msg = ShownMessage { text, at_sec };
        self.history.push(msg.clone());
        self.visible = Some(msg);
    }
}

impl StatusSurface for StatusBoard {
    fn schedule_message(&mut self, text: &str, delay_sec: f64, category: MessageCategory) {
        self.scheduled.retain(|m| m.category != category);
        self.scheduled.push(ScheduledMessage {
            text: text.to_string(),
            due_sec: self.now_sec + delay_sec.max(0.0),
            category,
        });
    }

    fn show_message(&mut self, text: &str) {
        self.show_at(text.to_string(), self.now_sec);
    }

    fn cancel_all_scheduled_messages(&mut self) {
        self.scheduled.clear();
    }

    fn advance_to(&mut self, now_sec: f64) {
        if now_sec < self.now_sec {
            return;
        }
        self.now_sec = now_sec;

        self.scheduled.sort_by(|a, b| a.due_sec.total_cmp(&b.due_sec));
        let n_due = self.scheduled.partition_point(|m| m.due_sec <= now_sec);
        let due: Vec<_> = self.scheduled.drain(..n_due).collect();
        for m in due {
            self.show_at(m.text, m.due_sec);
        }

        if self
            .visible
            .as_ref()
            .is_some_and(|v| now_sec - v.at_sec >= MESSAGE_AUTO_HIDE_SEC)
        {
            self.visible = None;
        }
    }

    fn report(&self) -> StatusReport {
        StatusReport {
            visible: self.visible.as_ref().map(|m| m.text.clone()),
            scheduled: self.scheduled.clone(),
            history: self.history.clone(),
        }
    }
}

enum UiCommand {
    Schedule {
        text: String,
        delay_sec: f64,
        category: MessageCategory,
    },
    Show {
        text: String,
    },
    CancelAll,
    Tick {
        now_sec: f64,
    },
    Report {
        reply: mpsc::Sender<StatusReport>,
    },
    Barrier {
        reply: mpsc::Sender<()>,
    },
    Shutdown,
}

/// Cloneable handle that marshals status calls onto the UI thread.
#[derive(Clone, Debug)]
pub struct UiHandle {
    tx: mpsc::Sender<UiCommand>,
}

impl std::fmt::Debug for UiCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Schedule { .. } => "Schedule",
            Self::Show { .. } => "Show",
            Self::CancelAll => "CancelAll",
            Self::Tick { .. } => "Tick",
            Self::Report { .. } => "Report",
            Self::Barrier { .. } => "Barrier",
            Self::Shutdown => "Shutdown",
        })
    }
}

impl UiHandle {
    fn send(&self, cmd: UiCommand) {
        if let Err(e) = self.tx.send(cmd) {
            tracing::debug!(command = ?e.0, "ui thread closed; dropping status update");
        }
    }

    pub fn schedule_message(
        &self,
        text: impl Into<String>,
        delay_sec: f64,
        category: MessageCategory,
    ) {
        self.send(UiCommand::Schedule {
            text: text.into(),
            delay_sec,
            category,
        });
    }

    pub fn show_message(&self, text: impl Into<String>) {
        self.send(UiCommand::Show { text: text.into() });
    }

    pub fn cancel_all_scheduled_messages(&self) {
        self.send(UiCommand::CancelAll);
    }

    pub fn tick(&self, now_sec: f64) {
        self.send(UiCommand::Tick { now_sec });
    }

    pub fn report(&self) -> MarkerlayResult<StatusReport> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .send(UiCommand::Report { reply })
            .map_err(|_| MarkerlayError::channel("ui thread is closed"))?;
        rx.recv()
            .map_err(|_| MarkerlayError::channel("ui thread exited before report"))
    }

    pub fn barrier(&self) -> MarkerlayResult<()> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .send(UiCommand::Barrier { reply })
            .map_err(|_| MarkerlayError::channel("ui thread is closed"))?;
        rx.recv()
            .map_err(|_| MarkerlayError::channel("ui thread exited before barrier"))
    }
}

/// The main/UI thread: sole owner of the status surface.
pub struct UiDispatcher {
    handle: UiHandle,
    worker: Option<JoinHandle<Box<dyn StatusSurface>>>,
}

impl UiDispatcher {
    pub fn spawn(mut surface: Box<dyn StatusSurface>) -> MarkerlayResult<Self> {
        let (tx, rx) = mpsc::channel::<UiCommand>();
        let worker = std::thread::Builder::new()
            .name("ui-main".to_string())
            .spawn(move || {
                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        UiCommand::Schedule {
                            text,
                            delay_sec,
                            category,
                        } => surface.schedule_message(&text, delay_sec, category),
                        UiCommand::Show { text } => surface.show_message(&text),
                        UiCommand::CancelAll => surface.cancel_all_scheduled_messages(),
                        UiCommand::Tick { now_sec } => surface.advance_to(now_sec),
                        UiCommand::Report { reply } => {
                            let _ = reply.send(surface.report());
                        }
                        UiCommand::Barrier { reply } => {
                            let _ = reply.send(());
                        }
                        UiCommand::Shutdown => break,
                    }
                }
                surface
            })
            .map_err(|e| MarkerlayError::channel(format!("spawn ui thread: {e}")))?;
        Ok(Self {
            handle: UiHandle { tx },
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> UiHandle {
        self.handle.clone()
    }

    /// Stop the UI thread and hand the surface back.
    pub fn shutdown(mut self) -> MarkerlayResult<Box<dyn StatusSurface>> {
        self.stop()?
            .ok_or_else(|| MarkerlayError::channel("ui thread already stopped"))
    }

    fn stop(&mut self) -> MarkerlayResult<Option<Box<dyn StatusSurface>>> {
        let Some(worker) = self.worker.take() else {
            return Ok(None);
        };
        self.handle.send(UiCommand::Shutdown);
        worker
            .join()
            .map(Some)
            .map_err(|_| MarkerlayError::channel("ui thread panicked"))
    }
}

impl Drop for UiDispatcher {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::error!(error = %e, "ui dispatcher shutdown failed");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/status.rs"]
mod tests;
