use chrono::{DateTime, Utc};
use image::DynamicImage;
use std::sync::Arc;
use uuid::Uuid;

/// One camera frame as delivered to a checkpoint session.
#[derive(Debug, Clone)]
pub struct Frame {
    session_id: Uuid,
    image: Arc<DynamicImage>,
    captured_at: DateTime<Utc>,
    frame_id: Uuid,
}

impl Frame {
    pub fn new(session_id: Uuid, image: DynamicImage, captured_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            image: Arc::new(image),
            captured_at,
            frame_id: Uuid::new_v4(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    /// Same frame identity and timestamp with replaced pixels.
    pub fn with_image(&self, image: DynamicImage) -> Self {
        Self {
            session_id: self.session_id,
            image: Arc::new(image),
            captured_at: self.captured_at,
            frame_id: self.frame_id,
        }
    }

    pub fn shares_image_with(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}
