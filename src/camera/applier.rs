use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::ports::CameraControl;

use super::adjustment::{CameraAdjustment, FlashMode, FocusPoint};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Last values pushed to the camera through the applier.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraState {
    pub zoom: f64,
    pub focus_point: FocusPoint,
    pub flash: FlashMode,
    pub exposure_compensation: f64,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            zoom: 0.0,
            focus_point: FocusPoint::CENTER,
            flash: FlashMode::Off,
            exposure_compensation: 0.0,
        }
    }
}

/// What actually reached the camera after clamping and filtering.
pub type AppliedAdjustment = CameraAdjustment;

/// Validates model-suggested adjustments and forwards them to the live
/// camera. Never fails: out-of-range values are clamped, unusable ones
/// dropped, and the rest still applied.
#[derive(Clone)]
pub struct CameraAdjustmentApplier {
    control: Arc<dyn CameraControl>,
    state: Arc<Mutex<CameraState>>,
}

impl CameraAdjustmentApplier {
    pub fn new(control: Arc<dyn CameraControl>) -> Self {
        Self {
            control,
            state: Arc::new(Mutex::new(CameraState::default())),
        }
    }

    pub fn current(&self) -> CameraState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn apply(&self, adjustment: &CameraAdjustment) -> AppliedAdjustment {
        let sanitized = sanitize(adjustment);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(zoom) = sanitized.zoom {
            self.control.set_zoom(zoom);
            state.zoom = zoom;
        }
        if let Some(point) = sanitized.focus_point {
            self.control.set_focus_point(point);
            state.focus_point = point;
        }
        if let Some(flash) = sanitized.flash {
            self.control.set_flash(flash);
            state.flash = flash;
        }
        if let Some(ev) = sanitized.exposure_compensation {
            self.control.set_exposure_compensation(ev);
            state.exposure_compensation = ev;
        }

        log_debug!("camera adjustment applied: {:?}", sanitized);
        sanitized
    }
}

/// Clamp every numeric field into its supported range and drop what cannot
/// be applied.
pub fn sanitize(adjustment: &CameraAdjustment) -> CameraAdjustment {
    let (zoom_min, zoom_max) = CameraAdjustment::ZOOM_RANGE;
    let (ev_min, ev_max) = CameraAdjustment::EXPOSURE_RANGE;

    let focus_point = adjustment.focus_point.and_then(|point| {
        let x = clamp_finite(point.x, 0.0, 1.0)?;
        let y = clamp_finite(point.y, 0.0, 1.0)?;
        Some(FocusPoint { x, y })
    });

    let flash = match adjustment.flash {
        Some(flash) if flash.is_recognized() => Some(flash),
        Some(_) => {
            log_warn!("ignoring unrecognized flash mode; keeping previous flash state");
            None
        }
        None => None,
    };

    CameraAdjustment {
        zoom: adjustment
            .zoom
            .and_then(|zoom| clamp_finite(zoom, zoom_min, zoom_max)),
        focus_point,
        flash,
        exposure_compensation: adjustment
            .exposure_compensation
            .and_then(|ev| clamp_finite(ev, ev_min, ev_max)),
    }
}

fn clamp_finite(value: f64, min: f64, max: f64) -> Option<f64> {
    value.is_finite().then(|| value.clamp(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Zoom(f64),
        Focus(FocusPoint),
        Flash(FlashMode),
        Exposure(f64),
    }

    #[derive(Default)]
    struct RecordingCamera {
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingCamera {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CameraControl for RecordingCamera {
        fn set_zoom(&self, zoom: f64) {
            self.calls.lock().unwrap().push(Call::Zoom(zoom));
        }
        fn set_focus_point(&self, point: FocusPoint) {
            self.calls.lock().unwrap().push(Call::Focus(point));
        }
        fn set_flash(&self, flash: FlashMode) {
            self.calls.lock().unwrap().push(Call::Flash(flash));
        }
        fn set_exposure_compensation(&self, ev: f64) {
            self.calls.lock().unwrap().push(Call::Exposure(ev));
        }
    }

    #[test]
    fn clamps_out_of_range_values() {
        let camera = Arc::new(RecordingCamera::default());
        let applier = CameraAdjustmentApplier::new(camera.clone());

        let applied = applier.apply(&CameraAdjustment {
            zoom: Some(3.5),
            focus_point: Some(FocusPoint { x: -0.2, y: 1.4 }),
            flash: Some(FlashMode::Torch),
            exposure_compensation: Some(-7.0),
        });

        assert_eq!(applied.zoom, Some(1.0));
        assert_eq!(applied.focus_point, Some(FocusPoint { x: 0.0, y: 1.0 }));
        assert_eq!(applied.exposure_compensation, Some(-2.0));
        assert_eq!(
            camera.calls(),
            vec![
                Call::Zoom(1.0),
                Call::Focus(FocusPoint { x: 0.0, y: 1.0 }),
                Call::Flash(FlashMode::Torch),
                Call::Exposure(-2.0),
            ]
        );
    }

    #[test]
    fn unrecognized_flash_is_ignored_but_zoom_still_applies() {
        let camera = Arc::new(RecordingCamera::default());
        let applier = CameraAdjustmentApplier::new(camera.clone());
        applier.apply(&CameraAdjustment {
            flash: Some(FlashMode::Auto),
            ..Default::default()
        });

        applier.apply(&CameraAdjustment {
            zoom: Some(0.3),
            flash: Some(FlashMode::Unrecognized),
            ..Default::default()
        });

        assert_eq!(
            camera.calls(),
            vec![Call::Flash(FlashMode::Auto), Call::Zoom(0.3)]
        );
        let state = applier.current();
        assert_eq!(state.flash, FlashMode::Auto);
        assert_eq!(state.zoom, 0.3);
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let camera = Arc::new(RecordingCamera::default());
        let applier = CameraAdjustmentApplier::new(camera.clone());

        let applied = applier.apply(&CameraAdjustment {
            zoom: Some(f64::NAN),
            focus_point: Some(FocusPoint {
                x: 0.5,
                y: f64::INFINITY,
            }),
            flash: None,
            exposure_compensation: Some(1.0),
        });

        assert_eq!(applied.zoom, None);
        assert_eq!(applied.focus_point, None);
        assert_eq!(camera.calls(), vec![Call::Exposure(1.0)]);
        assert_eq!(applier.current().zoom, 0.0);
    }

    #[test]
    fn empty_adjustment_issues_no_calls() {
        let camera = Arc::new(RecordingCamera::default());
        let applier = CameraAdjustmentApplier::new(camera.clone());
        let applied = applier.apply(&CameraAdjustment::default());
        assert!(applied.is_empty());
        assert!(camera.calls().is_empty());
        assert_eq!(applier.current(), CameraState::default());
    }
}
