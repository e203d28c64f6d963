use crate::media::{Media, MediaType};
use crate::model::Model;

use std::time::Duration;

use image::GrayImage;
use thiserror::Error;

/// The dimension checks run once per job, before any byte goes to the device,
/// so an invalid job can never be streamed halfway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("image width ({actual}px) is expected to be {expected}px")]
    Width { actual: u32, expected: u32 },
    #[error("image height ({actual}px) is expected to be {expected}px")]
    Length { actual: u32, expected: u32 },
    #[error("image height ({actual}px) must be greater than or equal to {min}px")]
    LengthBelowMinimum { actual: u32, min: u32 },
    #[error("image height ({actual}px) must be lower than or equal to {max}px")]
    LengthAboveMaximum { actual: u32, max: u32 },
}

/// One print request: the label images plus the cut, margin and delay policy.
///
/// Printer and media are fixed at construction, so a job can never lose them
/// halfway through its setters. An empty image list is allowed and prints
/// nothing.
pub struct Job {
    pub(crate) model: Model,
    pub(crate) media: &'static Media,
    pub(crate) images: Vec<GrayImage>,
    pub(crate) autocut: bool,
    pub(crate) cut_each: u8,
    pub(crate) feed_margin_override: Option<u16>,
    pub(crate) delay: Duration,
}

impl Job {
    pub fn new(model: Model, media: &'static Media, images: Vec<GrayImage>) -> Job {
        Job {
            model,
            media,
            images,
            autocut: false,
            cut_each: 1,
            feed_margin_override: None,
            delay: Duration::ZERO,
        }
    }

    /// Enable or disable the cutter, cutting after every `cut_each` labels.
    pub fn with_autocut(mut self, autocut: bool, cut_each: u8) -> Job {
        self.autocut = autocut;
        self.cut_each = cut_each;
        self
    }

    /// Pause between labels, e.g. to take each one away before the next prints.
    pub fn with_delay(mut self, delay: Duration) -> Job {
        self.delay = delay;
        self
    }

    /// Request an explicit feed margin in dots.
    /// Only honored on models that allow feed-margin control.
    pub fn with_feed_margin(mut self, dots: u16) -> Job {
        self.feed_margin_override = Some(dots);
        self
    }

    pub fn images(&self) -> &[GrayImage] {
        &self.images
    }

    /// The feed margin in dots that actually goes into the control block.
    ///
    /// Models without feed-margin control have the margin fixed by hardware:
    /// no leader on die-cut labels, 35 dots on everything else.
    pub(crate) fn feed_margin(&self) -> u16 {
        if self.model.allows_feed_margin() {
            self.feed_margin_override.unwrap_or(0)
        } else if self.media.media_type == MediaType::DieCut {
            0
        } else {
            35
        }
    }

    /// Check every image against the media layout and the printer bounds.
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        let media = self.media;
        let (min_px, max_px) = self.model.continuous_length_bounds();

        for image in &self.images {
            if image.width() != media.body_width_px {
                return Err(ValidationError::Width {
                    actual: image.width(),
                    expected: media.body_width_px,
                });
            }

            if media.media_type == MediaType::Continuous {
                if image.height() < min_px {
                    return Err(ValidationError::LengthBelowMinimum {
                        actual: image.height(),
                        min: min_px,
                    });
                }

                if image.height() > max_px {
                    return Err(ValidationError::LengthAboveMaximum {
                        actual: image.height(),
                        max: max_px,
                    });
                }
            } else if image.height() != media.body_length_px {
                return Err(ValidationError::Length {
                    actual: image.height(),
                    expected: media.body_length_px,
                });
            }
        }

        Ok(())
    }
}
