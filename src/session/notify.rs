//! Playback notification delivery.
//!
//! Compositors post end-of-stream notices from the scene thread; a dedicated relay thread turns
//! each into a [`SceneCommand::LoopPlayback`] on the scene queue, so the seek-and-play runs back
//! on the scene-update thread rather than on the thread that delivered the notice.

use std::sync::mpsc;
use std::thread::JoinHandle;

use crate::composite::compositor::PlaybackNotice;
use crate::foundation::error::{MarkerlayError, MarkerlayResult};
use crate::scene::queue::{SceneCommand, SceneHandle};

pub enum NotificationMessage {
    Playback(PlaybackNotice),
    /// Replied to once every earlier notice has been relayed and applied by the scene.
    Flush(mpsc::Sender<()>),
    Shutdown,
}

/// Fire-and-forget sender used by compositors.
#[derive(Clone, Debug)]
pub struct NotificationPoster {
    tx: mpsc::Sender<NotificationMessage>,
}

impl NotificationPoster {
    pub fn post(&self, notice: PlaybackNotice) {
        if self.tx.send(NotificationMessage::Playback(notice)).is_err() {
            tracing::debug!("notification center closed; dropping playback notice");
        }
    }
}

pub struct NotificationCenter {
    poster: NotificationPoster,
    worker: Option<JoinHandle<u64>>,
}

impl NotificationCenter {
    /// Create the channel up front so posters can be handed out before the relay starts.
    pub fn channel() -> (NotificationPoster, mpsc::Receiver<NotificationMessage>) {
        let (tx, rx) = mpsc::channel();
        (NotificationPoster { tx }, rx)
    }

    pub fn spawn(
        poster: NotificationPoster,
        rx: mpsc::Receiver<NotificationMessage>,
        scene: SceneHandle,
    ) -> MarkerlayResult<Self> {
        let worker = std::thread::Builder::new()
            .name("notification-center".to_string())
            .spawn(move || relay(rx, scene))
            .map_err(|e| MarkerlayError::channel(format!("spawn notification thread: {e}")))?;
        Ok(Self {
            poster,
            worker: Some(worker),
        })
    }

    pub fn poster(&self) -> NotificationPoster {
        self.poster.clone()
    }

    /// Wait until every notice posted so far has reached the scene.
    pub fn flush(&self) -> MarkerlayResult<()> {
        let (reply, rx) = mpsc::channel();
        self.poster
            .tx
            .send(NotificationMessage::Flush(reply))
            .map_err(|_| MarkerlayError::channel("notification center is closed"))?;
        rx.recv()
            .map_err(|_| MarkerlayError::channel("notification center exited before flush"))
    }

    /// Stop the relay; returns how many notices it relayed.
    pub fn shutdown(mut self) -> MarkerlayResult<u64> {
        self.stop()
    }

    fn stop(&mut self) -> MarkerlayResult<u64> {
        let Some(worker) = self.worker.take() else {
            return Ok(0);
        };
        let _ = self.poster.tx.send(NotificationMessage::Shutdown);
        worker
            .join()
            .map_err(|_| MarkerlayError::channel("notification thread panicked"))
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::error!(error = %e, "notification center shutdown failed");
        }
    }
}

fn relay(rx: mpsc::Receiver<NotificationMessage>, scene: SceneHandle) -> u64 {
    let mut relayed = 0;
    while let Ok(msg) = rx.recv() {
        match msg {
            NotificationMessage::Playback(PlaybackNotice::DidPlayToEnd { marker }) => {
                tracing::debug!(marker = %marker, "relaying end of stream");
                if let Err(e) = scene.submit(SceneCommand::LoopPlayback { marker }) {
                    tracing::debug!(error = %e, "scene gone; dropping loop restart");
                }
                relayed += 1;
            }
            NotificationMessage::Flush(reply) => {
                if let Err(e) = scene.barrier() {
                    tracing::debug!(error = %e, "scene gone during flush");
                }
                let _ = reply.send(());
            }
            NotificationMessage::Shutdown => break,
        }
    }
    relayed
}

#[cfg(test)]
#[path = "../../tests/unit/session/notify.rs"]
mod tests;
