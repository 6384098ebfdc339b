pub mod adjustment;
pub mod applier;

pub use adjustment::{CameraAdjustment, FlashMode, FocusPoint};
pub use applier::{AppliedAdjustment, CameraAdjustmentApplier, CameraState};
