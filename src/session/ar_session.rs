//! Session orchestration.
//!
//! [`ArSession`] owns the three worker threads (scene update, notification relay, UI) and a
//! [`TrackingSource`]. Tracking callbacks arrive through a [`SessionDelegate`], which only
//! enqueues work: scene mutations go to the scene queue, status text to the UI thread.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::assets::catalog::ReferenceCatalog;
use crate::assets::store::AssetStore;
use crate::foundation::core::{MarkerDescriptor, MarkerId, Pose};
use crate::foundation::error::MarkerlayResult;
use crate::output::sink::SurfaceFrame;
use crate::scene::graph::{SceneContext, SceneSnapshot};
use crate::scene::queue::{SceneCommand, SceneHandle, SceneQueue, SceneQueueStats};
use crate::session::config::{ExperienceConfig, SCAN_HINT};
use crate::session::notify::NotificationCenter;
use crate::session::status::{MessageCategory, StatusReport, StatusSurface, UiDispatcher, UiHandle};
use crate::session::tracking::{TrackingDelegate, TrackingSource};

/// Tracking callbacks bound to a session.
///
/// Cheap to clone and safe to call from any thread. While the session is paused every callback
/// is dropped.
#[derive(Clone, Debug)]
pub struct SessionDelegate {
    scene: SceneHandle,
    ui: UiHandle,
    running: Arc<AtomicBool>,
}

impl SessionDelegate {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl TrackingDelegate for SessionDelegate {
    fn on_image_detected(&self, descriptor: MarkerDescriptor, pose: Pose) {
        if !self.is_running() {
            tracing::debug!(marker = %descriptor.id, "session paused; ignoring detection");
            return;
        }
        let name = descriptor.id.to_string();
        tracing::info!(marker = %name, "image detected");
        if let Err(e) = self
            .scene
            .submit(SceneCommand::ImageDetected { descriptor, pose })
        {
            tracing::warn!(marker = %name, error = %e, "dropping detection");
            return;
        }
        self.ui.cancel_all_scheduled_messages();
        self.ui.show_message(format!("Detected image “{name}”"));
    }

    fn on_image_pose_updated(&self, marker: &MarkerId, pose: Pose) {
        if !self.is_running() {
            return;
        }
        if let Err(e) = self.scene.submit(SceneCommand::PoseUpdated {
            marker: marker.clone(),
            pose,
        }) {
            tracing::debug!(marker = %marker, error = %e, "dropping pose update");
        }
    }
}

/// What the worker threads report when a session shuts down.
#[derive(Debug)]
pub struct SessionSummary {
    pub scene: SceneQueueStats,
    pub notices_relayed: u64,
    pub status: StatusReport,
}

/// One image-tracking AR experience.
pub struct ArSession {
    config: ExperienceConfig,
    assets: Arc<AssetStore>,
    catalog: Option<Arc<ReferenceCatalog>>,
    tracking: Box<dyn TrackingSource>,
    delegate: SessionDelegate,
    clock_sec: f64,
    /// Session time before which `restart_experience` is ignored.
    restart_blocked_until: Option<f64>,

    // Field order is shutdown order on drop: the relay stops before the scene it feeds.
    notifications: NotificationCenter,
    scene: SceneQueue,
    ui: UiDispatcher,
}

impl std::fmt::Debug for ArSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArSession")
            .field("reference_group", &self.config.reference_group)
            .field("assets", &self.assets.root())
            .field("clock_sec", &self.clock_sec)
            .field("running", &self.delegate.is_running())
            .finish_non_exhaustive()
    }
}

impl ArSession {
    /// Start the worker threads.
    ///
    /// Tracking stays idle until [`reset_tracking`](Self::reset_tracking).
    pub fn new(
        config: ExperienceConfig,
        assets_root: impl Into<PathBuf>,
        surface: Box<dyn StatusSurface>,
        tracking: Box<dyn TrackingSource>,
    ) -> MarkerlayResult<Self> {
        config.validate()?;
        let assets = Arc::new(AssetStore::new(assets_root));

        let (poster, notices) = NotificationCenter::channel();
        let mut ctx = SceneContext::new(assets.clone(), Arc::new(config.bindings.clone()))
            .with_notifier(poster.clone());
        ctx.highlight_opacity = config.highlight_base_opacity;

        let scene = SceneQueue::spawn(ctx)?;
        let notifications = NotificationCenter::spawn(poster, notices, scene.handle())?;
        let ui = UiDispatcher::spawn(surface)?;

        let delegate = SessionDelegate {
            scene: scene.handle(),
            ui: ui.handle(),
            running: Arc::new(AtomicBool::new(false)),
        };
        tracing::info!(
            assets = %assets.root().display(),
            group = %config.reference_group,
            bindings = config.bindings.len(),
            "session created"
        );

        Ok(Self {
            config,
            assets,
            catalog: None,
            tracking,
            delegate,
            clock_sec: 0.0,
            restart_blocked_until: None,
            notifications,
            scene,
            ui,
        })
    }

    pub fn config(&self) -> &ExperienceConfig {
        &self.config
    }

    pub fn clock_sec(&self) -> f64 {
        self.clock_sec
    }

    pub fn catalog(&self) -> Option<&ReferenceCatalog> {
        self.catalog.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.delegate.is_running()
    }

    /// Load the reference catalog, restart tracking and clear the scene.
    ///
    /// A missing catalog is the one fatal session error: it is returned and tracking is not
    /// started.
    pub fn reset_tracking(&mut self) -> MarkerlayResult<()> {
        let catalog = match self
            .assets
            .load_reference_catalog(&self.config.reference_group)
        {
            Ok(c) => Arc::new(c),
            Err(e) => {
                tracing::error!(
                    group = %self.config.reference_group,
                    error = %e,
                    "cannot start tracking"
                );
                return Err(e);
            }
        };

        self.tracking.run(catalog.clone(), self.config.tracking);
        self.catalog = Some(catalog);
        self.scene.submit(SceneCommand::RemoveAll)?;
        self.ui.handle().schedule_message(
            SCAN_HINT,
            self.config.scan_hint_delay_sec,
            MessageCategory::ContentPlacement,
        );
        self.delegate.running.store(true, Ordering::Release);
        tracing::info!(at_sec = self.clock_sec, "tracking reset");
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.delegate.running.swap(false, Ordering::AcqRel) {
            tracing::info!(at_sec = self.clock_sec, "session paused");
        }
    }

    /// Resume delivery after [`pause`](Self::pause). No-op before the first reset.
    pub fn resume(&mut self) {
        if self.catalog.is_none() {
            tracing::debug!("resume before reset_tracking; ignoring");
            return;
        }
        if !self.delegate.running.swap(true, Ordering::AcqRel) {
            tracing::info!(at_sec = self.clock_sec, "session resumed");
        }
    }

    /// User-requested restart. Returns `false` while the previous restart is cooling down.
    ///
    /// The cooldown starts only once the reset succeeds.
    pub fn restart_experience(&mut self) -> MarkerlayResult<bool> {
        if let Some(until) = self.restart_blocked_until
            && self.clock_sec < until
        {
            tracing::debug!(until_sec = until, "restart not available yet");
            return Ok(false);
        }
        self.ui.handle().cancel_all_scheduled_messages();
        self.reset_tracking()?;
        self.restart_blocked_until = Some(self.clock_sec + self.config.restart_cooldown_sec);
        Ok(true)
    }

    pub fn delegate(&self) -> SessionDelegate {
        self.delegate.clone()
    }

    /// Move session time forward: deliver due tracking events, then tick the scene and the UI.
    ///
    /// While paused, due tracking events are skipped so the source never counts them as seen.
    pub fn advance(&mut self, dt: f64) -> MarkerlayResult<()> {
        if !dt.is_finite() || dt <= 0.0 {
            return Ok(());
        }
        self.clock_sec += dt;
        if self.catalog.is_some() {
            if self.is_running() {
                self.tracking.deliver_until(self.clock_sec, &self.delegate);
            } else {
                self.tracking.skip_until(self.clock_sec);
            }
        }
        self.scene.submit(SceneCommand::Advance { dt })?;
        self.ui.handle().tick(self.clock_sec);
        Ok(())
    }

    /// Block until the scene, pending loop restarts and the UI have caught up.
    pub fn settle(&self) -> MarkerlayResult<()> {
        self.scene.barrier()?;
        self.notifications.flush()?;
        self.ui.handle().barrier()
    }

    pub fn snapshot(&self) -> MarkerlayResult<SceneSnapshot> {
        self.scene.snapshot()
    }

    pub fn drain_surfaces(&self) -> MarkerlayResult<Vec<SurfaceFrame>> {
        self.scene.handle().drain_surfaces()
    }

    pub fn status_report(&self) -> MarkerlayResult<StatusReport> {
        self.ui.handle().report()
    }

    /// Stop every worker, relay first, and collect their reports.
    pub fn shutdown(self) -> MarkerlayResult<SessionSummary> {
        self.delegate.running.store(false, Ordering::Release);
        let notices_relayed = self.notifications.shutdown()?;
        let scene = self.scene.shutdown()?;
        let status = self.ui.shutdown()?.report();
        tracing::info!(
            detections = scene.detections,
            loop_restarts = scene.loop_restarts,
            "session stopped"
        );
        Ok(SessionSummary {
            scene,
            notices_relayed,
            status,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/ar_session.rs"]
mod tests;
