//! The reference photo the user is trying to match.
//!
//! The matching screen sets it, the coaching loop reads it; both hold a clone
//! of the same [`ReferenceSession`].

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferencePhoto {
    pub id: String,
    /// Base64 image, already downsampled by the caller.
    pub encoded_image: String,
    /// Precomputed model description of the reference (composition, light).
    #[serde(default)]
    pub analysis: Option<String>,
    pub set_at: DateTime<Utc>,
}

impl ReferencePhoto {
    pub fn new(encoded_image: impl Into<String>, analysis: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            encoded_image: encoded_image.into(),
            analysis,
            set_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceSession {
    current: Arc<RwLock<Option<ReferencePhoto>>>,
}

impl ReferenceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active reference, returning the stored record.
    pub fn set(
        &self,
        encoded_image: impl Into<String>,
        analysis: Option<String>,
    ) -> ReferencePhoto {
        let photo = ReferencePhoto::new(encoded_image, analysis);
        info!("reference photo {} set", photo.id);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(photo.clone());
        photo
    }

    pub fn clear(&self) {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(photo) = previous {
            info!("reference photo {} cleared", photo.id);
        }
    }

    pub fn current(&self) -> Option<ReferencePhoto> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_active(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
