//! Single-consumer scene-update worker.
//!
//! Tracking callbacks, playback notices and the session clock all run on different threads. None
//! of them touch the [`SceneGraph`]; they enqueue [`SceneCommand`]s and one worker thread drains
//! them in order, owning the graph outright.

use std::sync::mpsc;
use std::thread::JoinHandle;

use crate::foundation::core::{MarkerDescriptor, MarkerId, Pose};
use crate::foundation::error::{MarkerlayError, MarkerlayResult};
use crate::output::sink::SurfaceFrame;
use crate::scene::graph::{DetectionOutcome, SceneContext, SceneGraph, SceneSnapshot};

pub enum SceneCommand {
    ImageDetected {
        descriptor: MarkerDescriptor,
        pose: Pose,
    },
    PoseUpdated {
        marker: MarkerId,
        pose: Pose,
    },
    Advance {
        dt: f64,
    },
    LoopPlayback {
        marker: MarkerId,
    },
    RemoveAll,
    Snapshot {
        reply: mpsc::Sender<SceneSnapshot>,
    },
    DrainSurfaces {
        reply: mpsc::Sender<Vec<SurfaceFrame>>,
    },
    /// Replied to once every earlier command has been applied.
    Barrier {
        reply: mpsc::Sender<()>,
    },
    Shutdown,
}

/// Cloneable sender side of the scene queue.
#[derive(Clone, Debug)]
pub struct SceneHandle {
    tx: mpsc::Sender<SceneCommand>,
}

impl SceneHandle {
    pub fn submit(&self, cmd: SceneCommand) -> MarkerlayResult<()> {
        self.tx
            .send(cmd)
            .map_err(|_| MarkerlayError::channel("scene queue is closed"))
    }

    /// Block until all previously submitted commands are applied.
    pub fn barrier(&self) -> MarkerlayResult<()> {
        let (reply, rx) = mpsc::channel();
        self.submit(SceneCommand::Barrier { reply })?;
        rx.recv()
            .map_err(|_| MarkerlayError::channel("scene worker exited before barrier"))
    }

    pub fn snapshot(&self) -> MarkerlayResult<SceneSnapshot> {
        let (reply, rx) = mpsc::channel();
        self.submit(SceneCommand::Snapshot { reply })?;
        rx.recv()
            .map_err(|_| MarkerlayError::channel("scene worker exited before snapshot"))
    }

    pub fn drain_surfaces(&self) -> MarkerlayResult<Vec<SurfaceFrame>> {
        let (reply, rx) = mpsc::channel();
        self.submit(SceneCommand::DrainSurfaces { reply })?;
        rx.recv()
            .map_err(|_| MarkerlayError::channel("scene worker exited before drain"))
    }
}

/// Counters kept by the worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneQueueStats {
    pub commands: u64,
    pub detections: u64,
    pub refreshes: u64,
    pub loop_restarts: u64,
}

/// Owns the scene-update thread.
pub struct SceneQueue {
    handle: SceneHandle,
    worker: Option<JoinHandle<SceneQueueStats>>,
}

impl SceneQueue {
    pub fn spawn(ctx: SceneContext) -> MarkerlayResult<Self> {
        let (tx, rx) = mpsc::channel::<SceneCommand>();
        let worker = std::thread::Builder::new()
            .name("scene-update".to_string())
            .spawn(move || run_worker(ctx, rx))
            .map_err(|e| MarkerlayError::channel(format!("spawn scene-update thread: {e}")))?;
        Ok(Self {
            handle: SceneHandle { tx },
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> SceneHandle {
        self.handle.clone()
    }

    pub fn submit(&self, cmd: SceneCommand) -> MarkerlayResult<()> {
        self.handle.submit(cmd)
    }

    pub fn barrier(&self) -> MarkerlayResult<()> {
        self.handle.barrier()
    }

    pub fn snapshot(&self) -> MarkerlayResult<SceneSnapshot> {
        self.handle.snapshot()
    }

    /// Stop the worker after it applies everything already queued.
    pub fn shutdown(mut self) -> MarkerlayResult<SceneQueueStats> {
        self.stop()
    }

    fn stop(&mut self) -> MarkerlayResult<SceneQueueStats> {
        let Some(worker) = self.worker.take() else {
            return Ok(SceneQueueStats::default());
        };
        // A closed queue means the worker is already gone; joining reports how.
        let _ = self.handle.submit(SceneCommand::Shutdown);
        worker
            .join()
            .map_err(|_| MarkerlayError::channel("scene-update thread panicked"))
    }
}

impl Drop for SceneQueue {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::error!(error = %e, "scene queue shutdown failed");
        }
    }
}

fn run_worker(ctx: SceneContext, rx: mpsc::Receiver<SceneCommand>) -> SceneQueueStats {
    let mut scene = SceneGraph::new();
    let mut stats = SceneQueueStats::default();
    tracing::debug!("scene-update worker started");

    while let Ok(cmd) = rx.recv() {
        stats.commands += 1;
        match cmd {
            SceneCommand::ImageDetected { descriptor, pose } => {
                let marker = descriptor.id.clone();
                match scene.image_detected(&ctx, descriptor, pose) {
                    DetectionOutcome::Added { content_bound } => {
                        stats.detections += 1;
                        tracing::info!(marker = %marker, content_bound, "marker anchored");
                    }
                    DetectionOutcome::Refreshed => stats.refreshes += 1,
                }
            }
            SceneCommand::PoseUpdated { marker, pose } => {
                scene.pose_updated(&marker, pose);
            }
            SceneCommand::Advance { dt } => scene.advance(&ctx, dt),
            SceneCommand::LoopPlayback { marker } => {
                stats.loop_restarts += 1;
                scene.loop_playback(&marker);
            }
            SceneCommand::RemoveAll => {
                let removed = scene.remove_all();
                tracing::debug!(removed, "scene cleared");
            }
            SceneCommand::Snapshot { reply } => {
                let _ = reply.send(scene.snapshot());
            }
            SceneCommand::DrainSurfaces { reply } => {
                let _ = reply.send(scene.drain_surfaces());
            }
            SceneCommand::Barrier { reply } => {
                let _ = reply.send(());
            }
            SceneCommand::Shutdown => break,
        }
    }

    tracing::debug!(commands = stats.commands, "scene-update worker stopped");
    stats
}

#[cfg(test)]
#[path = "../../tests/unit/scene/queue.rs"]
mod tests;
