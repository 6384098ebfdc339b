use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::camera::CameraAdjustmentApplier;
use crate::ports::{CameraControl, FeedbackSink, FrameCapture, FrameEncoder, VisionInference};
use crate::reference::ReferenceSession;

use super::loop_worker::{coaching_loop, CoachingWorker};
use super::options::{merge, AnalysisOptions, AnalysisOptionsPatch};
use super::scheduler::RateScheduler;
use super::state::{LoopSnapshot, LoopState};

pub const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_TARGET_WIDTH: u32 = 512;
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

/// The external collaborators one loop drives.
#[derive(Clone)]
pub struct CoachPorts {
    pub capture: Arc<dyn FrameCapture>,
    pub encoder: Arc<dyn FrameEncoder>,
    pub inference: Arc<dyn VisionInference>,
}

impl CoachPorts {
    pub fn new(
        capture: Arc<dyn FrameCapture>,
        encoder: Arc<dyn FrameEncoder>,
        inference: Arc<dyn VisionInference>,
    ) -> Self {
        Self {
            capture,
            encoder,
            inference,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopConfig {
    pub scheduler: RateScheduler,
    /// Upper bound for capture + encode + inference of one cycle.
    pub cycle_timeout: Duration,
    pub target_width: u32,
    pub jpeg_quality: u8,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            scheduler: RateScheduler::default(),
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
            target_width: DEFAULT_TARGET_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

struct ActiveRun {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Continuous capture → infer → parse → feedback loop.
///
/// `start`, `stop` and `update_options` may be called at any time and in any
/// order; repeated `start`/`stop` calls are no-ops.
pub struct AnalysisLoop {
    ports: CoachPorts,
    config: LoopConfig,
    applier: Option<CameraAdjustmentApplier>,
    reference: Option<ReferenceSession>,
    state: Arc<Mutex<LoopState>>,
    options: Arc<RwLock<AnalysisOptions>>,
    run: Mutex<Option<ActiveRun>>,
}

impl AnalysisLoop {
    pub fn new(ports: CoachPorts, config: LoopConfig) -> Self {
        Self {
            ports,
            config,
            applier: None,
            reference: None,
            state: Arc::new(Mutex::new(LoopState::new())),
            options: Arc::new(RwLock::new(AnalysisOptions::default())),
            run: Mutex::new(None),
        }
    }

    /// Let parsed adjustments drive the live camera when the cycle's options
    /// have AI control enabled.
    pub fn with_camera_control(mut self, control: Arc<dyn CameraControl>) -> Self {
        self.applier = Some(CameraAdjustmentApplier::new(control));
        self
    }

    pub fn with_reference_session(mut self, session: ReferenceSession) -> Self {
        self.reference = Some(session);
        self
    }

    pub fn applier(&self) -> Option<&CameraAdjustmentApplier> {
        self.applier.as_ref()
    }

    /// Start coaching. Fails only when called outside a tokio runtime.
    pub fn start(&self, options: AnalysisOptions, sink: Arc<dyn FeedbackSink>) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .context("coaching loop must be started from within a tokio runtime")?;

        let mut run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.running {
                info!("coaching loop already running; start ignored");
                return Ok(());
            }
            state.begin_run()
        };

        *self.options.write().unwrap_or_else(PoisonError::into_inner) = options;

        let cancel = CancellationToken::new();
        let worker = CoachingWorker {
            state: self.state.clone(),
            options: self.options.clone(),
            ports: self.ports.clone(),
            applier: self.applier.clone(),
            reference: self.reference.clone(),
            config: self.config,
            sink,
            cancel: cancel.clone(),
            generation,
        };

        let previous = run.take().map(|active| active.handle);
        let handle = runtime.spawn(coaching_loop(worker, previous));
        *run = Some(ActiveRun { handle, cancel });
        Ok(())
    }

    /// Stop coaching. The pending timer is cancelled right away; a cycle
    /// already in flight finishes but its result is discarded.
    pub fn stop(&self) {
        let run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if !state.running {
                return;
            }
            state.halt();
        }

        if let Some(active) = run.as_ref() {
            active.cancel.cancel();
        }
        info!("coaching loop stop requested");
    }

    /// Merge `patch` into the active options. Takes effect on the next
    /// cycle; timing is unaffected.
    pub fn update_options(&self, patch: AnalysisOptionsPatch) {
        if patch.is_empty() {
            return;
        }
        let mut options = self.options.write().unwrap_or_else(PoisonError::into_inner);
        *options = merge(&options, patch);
    }

    pub fn options(&self) -> AnalysisOptions {
        self.options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .running
    }

    pub fn snapshot(&self) -> LoopSnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }
}

impl Drop for AnalysisLoop {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .halt();
        if let Some(active) = self
            .run
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            active.cancel.cancel();
        }
    }
}
