use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::ports::{CapturedFrame, EncodedFrame, FrameEncoder};

/// Downsamples captured frames and re-encodes them as base64 JPEG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFrameEncoder;

impl ImageFrameEncoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FrameEncoder for ImageFrameEncoder {
    async fn encode(
        &self,
        frame: CapturedFrame,
        target_width: u32,
        quality: u8,
    ) -> Result<EncodedFrame> {
        tokio::task::spawn_blocking(move || encode_jpeg(&frame.bytes, target_width, quality))
            .await
            .context("frame encode worker join failed")?
    }
}

pub fn encode_jpeg(bytes: &[u8], target_width: u32, quality: u8) -> Result<EncodedFrame> {
    let img = image::load_from_memory(bytes).context("captured frame is not a decodable image")?;
    let img = downscale(img, target_width);

    let rgb = img.to_rgb8();
    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .context("jpeg encoding failed")?;

    Ok(EncodedFrame {
        base64: BASE64.encode(&jpeg),
        mime_type: "image/jpeg",
        width: rgb.width(),
        height: rgb.height(),
    })
}

/// Shrink to `target_width` keeping the aspect ratio; never upscales.
fn downscale(img: DynamicImage, target_width: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if target_width == 0 || width <= target_width {
        return img;
    }
    let scaled_height = ((height as f64 * target_width as f64) / width as f64)
        .round()
        .max(1.0) as u32;
    img.resize_exact(target_width, scaled_height, FilterType::Triangle)
}
