//! Collaborator ports consumed by the coaching loop.
//!
//! The host application implements these over its camera SDK and cloud
//! providers. `encoder::ImageFrameEncoder` and `vision_client::HttpVisionClient`
//! are the bundled defaults for the encode and inference ports.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::camera::{CameraAdjustment, FlashMode, FocusPoint};
use crate::coaching::AnalysisOptions;

/// A still frame as returned by the camera SDK (PNG/JPEG bytes).
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub bytes: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl CapturedFrame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            captured_at: Utc::now(),
        }
    }
}

/// A downsampled, compressed frame ready to ship to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    pub base64: String,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

impl EncodedFrame {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

#[async_trait]
pub trait FrameCapture: Send + Sync {
    /// Whether the camera can take a picture right now. A cycle that finds
    /// the camera not ready is skipped without counting as a failure.
    fn is_ready(&self) -> bool {
        true
    }

    /// Take a picture. Must fail fast rather than block when the camera
    /// stalls.
    async fn capture(&self) -> Result<CapturedFrame>;
}

#[async_trait]
pub trait FrameEncoder: Send + Sync {
    async fn encode(
        &self,
        frame: CapturedFrame,
        target_width: u32,
        quality: u8,
    ) -> Result<EncodedFrame>;
}

#[async_trait]
pub trait VisionInference: Send + Sync {
    /// Send one frame plus the prompt context, returning the model's free
    /// text answer.
    async fn infer(&self, frame: &EncodedFrame, options: &AnalysisOptions) -> Result<String>;
}

/// Live camera controls. Calls are fire-and-forget and idempotent.
pub trait CameraControl: Send + Sync {
    fn set_zoom(&self, zoom: f64);
    fn set_focus_point(&self, point: FocusPoint);
    fn set_flash(&self, flash: FlashMode);
    fn set_exposure_compensation(&self, ev: f64);
}

/// Receives at most one result per completed cycle.
pub trait FeedbackSink: Send + Sync {
    fn on_feedback(&self, feedback: &str, score: u8, adjustment: Option<&CameraAdjustment>);
}

impl<F> FeedbackSink for F
where
    F: Fn(&str, u8, Option<&CameraAdjustment>) + Send + Sync,
{
    fn on_feedback(&self, feedback: &str, score: u8, adjustment: Option<&CameraAdjustment>) {
        self(feedback, score, adjustment)
    }
}
