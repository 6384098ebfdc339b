use serde::{Deserialize, Serialize};

/// Flash setting requested by the model. Anything outside the four supported
/// values decodes to `Unrecognized` so one bad field does not reject the
/// whole adjustment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    On,
    Off,
    Auto,
    Torch,
    #[serde(other)]
    Unrecognized,
}

impl FlashMode {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, FlashMode::Unrecognized)
    }
}

impl Default for FlashMode {
    fn default() -> Self {
        FlashMode::Off
    }
}

/// Normalized focus coordinates, origin top-left, both axes in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FocusPoint {
    pub x: f64,
    pub y: f64,
}

impl FocusPoint {
    pub const CENTER: FocusPoint = FocusPoint { x: 0.5, y: 0.5 };
}

impl Default for FocusPoint {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Camera change requested by one coaching response. `None` fields mean
/// "leave as is".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraAdjustment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_point: Option<FocusPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash: Option<FlashMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure_compensation: Option<f64>,
}

impl CameraAdjustment {
    pub const ZOOM_RANGE: (f64, f64) = (0.0, 1.0);
    pub const EXPOSURE_RANGE: (f64, f64) = (-2.0, 2.0);

    /// All-neutral adjustment: no zoom, centered focus, flash off, no
    /// exposure bias.
    pub fn neutral() -> Self {
        Self {
            zoom: Some(0.0),
            focus_point: Some(FocusPoint::CENTER),
            flash: Some(FlashMode::Off),
            exposure_compensation: Some(0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.zoom.is_none()
            && self.focus_point.is_none()
            && self.flash.is_none()
            && self.exposure_compensation.is_none()
    }
}
