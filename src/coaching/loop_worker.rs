use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::camera::CameraAdjustmentApplier;
use crate::ports::FeedbackSink;
use crate::reference::ReferenceSession;

use super::controller::{CoachPorts, LoopConfig};
use super::options::AnalysisOptions;
use super::parser::{self, ParsedFeedback};
use super::state::{LoopState, LoopStatus};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

enum CycleOutcome {
    /// The run was stopped or replaced; exit without re-arming.
    Superseded,
    /// Camera not ready; nothing was analyzed.
    Idle,
    Completed { started_at: Instant },
    Failed { started_at: Instant },
}

/// Everything one run of the loop needs, cloned out of the controller at
/// `start`.
pub(crate) struct CoachingWorker {
    pub state: Arc<Mutex<LoopState>>,
    pub options: Arc<RwLock<AnalysisOptions>>,
    pub ports: CoachPorts,
    pub applier: Option<CameraAdjustmentApplier>,
    pub reference: Option<ReferenceSession>,
    pub config: LoopConfig,
    pub sink: Arc<dyn FeedbackSink>,
    pub cancel: CancellationToken,
    pub generation: u64,
}

pub(crate) async fn coaching_loop(worker: CoachingWorker, previous: Option<JoinHandle<()>>) {
    // A stopped run may still have a cycle in flight; let it drain so two
    // cycles never overlap.
    if let Some(previous) = previous {
        if let Err(err) = previous.await {
            log_warn!("previous coaching run ended abnormally: {err}");
        }
    }

    log_info!("coaching loop started (run {})", worker.generation);
    let worker = Arc::new(worker);
    let scheduler = worker.config.scheduler;
    let mut delay = Duration::ZERO;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = worker.cancel.cancelled() => break,
        }

        // Each cycle runs in its own task so a panicking collaborator costs
        // one cycle, not the whole run.
        let attempted_at = Instant::now();
        let cycle = tokio::spawn({
            let worker = worker.clone();
            async move { worker.run_cycle().await }
        });
        let outcome = match cycle.await {
            Ok(outcome) => outcome,
            Err(err) => worker.record_aborted_cycle(attempted_at, err),
        };

        delay = match outcome {
            CycleOutcome::Superseded => break,
            CycleOutcome::Idle => scheduler.idle_delay(),
            CycleOutcome::Completed { started_at } | CycleOutcome::Failed { started_at } => {
                scheduler.delay_until_next(Some(started_at), Instant::now())
            }
        };

        if !worker.set_status_if_current(LoopStatus::Scheduled) {
            break;
        }
        log_debug!("next coaching cycle in {}ms", delay.as_millis());
    }

    log_info!("coaching loop shutting down (run {})", worker.generation);
}

impl CoachingWorker {
    async fn run_cycle(&self) -> CycleOutcome {
        if !self.is_current() {
            return CycleOutcome::Superseded;
        }

        if !self.ports.capture.is_ready() {
            log_debug!("camera not ready; skipping coaching cycle");
            self.with_state(|state| state.skipped_cycles += 1);
            return CycleOutcome::Idle;
        }

        let started_at = Instant::now();
        let marked = self.with_state(|state| {
            if state.is_current(self.generation) {
                state.mark_analysis_started(started_at);
                true
            } else {
                false
            }
        });
        if !marked {
            return CycleOutcome::Superseded;
        }

        let options = self.cycle_options();
        let outcome =
            tokio::time::timeout(self.config.cycle_timeout, self.analyze(&options)).await;

        let parsed = match outcome {
            Ok(Ok(parsed)) => Some(parsed),
            Ok(Err(err)) => {
                log_error!("coaching cycle failed: {err:?}");
                None
            }
            Err(_) => {
                log_warn!(
                    "coaching cycle timeout (> {}ms)",
                    self.config.cycle_timeout.as_millis()
                );
                None
            }
        };

        // The inference call cannot be aborted by stop(); its result is
        // dropped instead.
        let still_current = self.with_state(|state| {
            if !state.is_current(self.generation) {
                return false;
            }
            if parsed.is_some() {
                state.completed_cycles += 1;
            } else {
                state.failed_cycles += 1;
            }
            true
        });
        if !still_current {
            log_info!("discarding coaching result that arrived after stop");
            return CycleOutcome::Superseded;
        }

        let Some(parsed) = parsed else {
            return CycleOutcome::Failed { started_at };
        };

        self.sink.on_feedback(
            &parsed.feedback,
            parsed.score,
            parsed.camera_adjustment.as_ref(),
        );
        self.actuate(&options, &parsed);

        CycleOutcome::Completed { started_at }
    }

    fn record_aborted_cycle(&self, attempted_at: Instant, err: JoinError) -> CycleOutcome {
        log_error!("coaching cycle aborted: {err}");
        let still_current = self.with_state(|state| {
            if !state.is_current(self.generation) {
                return false;
            }
            state.failed_cycles += 1;
            true
        });
        if still_current {
            CycleOutcome::Failed {
                started_at: attempted_at,
            }
        } else {
            CycleOutcome::Superseded
        }
    }

    async fn analyze(&self, options: &AnalysisOptions) -> Result<ParsedFeedback> {
        let cycle_start = Instant::now();

        let frame = self
            .ports
            .capture
            .capture()
            .await
            .context("frame capture failed")?;
        let capture_ms = cycle_start.elapsed().as_millis();

        let encode_start = Instant::now();
        let encoded = self
            .ports
            .encoder
            .encode(frame, self.config.target_width, self.config.jpeg_quality)
            .await
            .context("frame encode failed")?;
        let encode_ms = encode_start.elapsed().as_millis();

        let infer_start = Instant::now();
        let raw = self
            .ports
            .inference
            .infer(&encoded, options)
            .await
            .context("vision inference failed")?;
        let infer_ms = infer_start.elapsed().as_millis();

        let parsed = parser::parse(&raw);
        log_debug!(
            "coaching cycle: score={} capture={}ms encode={}ms ({}x{}) infer={}ms",
            parsed.score,
            capture_ms,
            encode_ms,
            encoded.width,
            encoded.height,
            infer_ms
        );
        Ok(parsed)
    }

    fn actuate(&self, options: &AnalysisOptions, parsed: &ParsedFeedback) {
        if !options.ai_control_enabled {
            return;
        }
        let (Some(applier), Some(adjustment)) = (&self.applier, &parsed.camera_adjustment) else {
            return;
        };
        // The sink may have stopped the loop.
        if !self.is_current() {
            return;
        }
        applier.apply(adjustment);
    }

    /// Options snapshot for this cycle; an attached reference session wins
    /// over the reference stored in the options.
    fn cycle_options(&self) -> AnalysisOptions {
        let mut options = self
            .options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(session) = &self.reference {
            options.reference = session.current();
        }
        options
    }

    fn is_current(&self) -> bool {
        self.with_state(|state| state.is_current(self.generation))
    }

    fn set_status_if_current(&self, status: LoopStatus) -> bool {
        self.with_state(|state| {
            if state.is_current(self.generation) {
                state.status = status;
                true
            } else {
                false
            }
        })
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut LoopState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
