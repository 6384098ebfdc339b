//! Live photography coaching: frames go to a vision model, structured
//! feedback comes back, and the camera can optionally follow the model's
//! suggested adjustments.

pub mod camera;
pub mod coaching;
pub mod encoder;
pub mod ports;
pub mod reference;
pub mod settings;
pub mod utils;
pub mod vision_client;

pub use camera::{CameraAdjustment, CameraAdjustmentApplier, CameraState, FlashMode, FocusPoint};
pub use coaching::{
    AnalysisLoop, AnalysisOptions, AnalysisOptionsPatch, CoachPorts, LoopConfig, LoopSnapshot,
    LoopStatus, ParsedFeedback, RateScheduler, SkillLevel,
};
pub use encoder::ImageFrameEncoder;
pub use ports::{
    CameraControl, CapturedFrame, EncodedFrame, FeedbackSink, FrameCapture, FrameEncoder,
    VisionInference,
};
pub use reference::{ReferencePhoto, ReferenceSession};
pub use settings::{CoachSettings, SettingsStore};
pub use utils::init_logging;
pub use vision_client::{HttpVisionClient, VisionClientConfig};
