use crate::status::Status;

use std::fmt::Display;

/// Media type as reported at byte 11 of the status payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MediaType {
    NoMedia,
    Continuous,
    DieCut,
    Unknown,
}

impl MediaType {
    pub(crate) fn code(&self) -> u8 {
        use MediaType::*;

        match self {
            NoMedia => 0x00,
            Continuous => 0x0a,
            DieCut => 0x0b,
            Unknown => 0xff,
        }
    }
}

impl From<u8> for MediaType {
    fn from(code: u8) -> Self {
        use MediaType::*;

        match code {
            0x00 => NoMedia,
            0x0a => Continuous,
            0x0b => DieCut,
            _ => Unknown,
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use MediaType::*;

        let name = match self {
            NoMedia => "no media",
            Continuous => "continuous length tape",
            DieCut => "die-cut label",
            Unknown => "unknown media",
        };

        write!(f, "{}", name)
    }
}

/// Layout parameters of one cataloged media, valid for one head generation.
///
/// The margins position the label body within the full print head; together
/// with the body they always span all head pins, i.e. eight times the
/// raster record size.
#[derive(Debug, PartialEq, Eq)]
pub struct Media {
    pub media_type: MediaType,
    pub width_mm: u8,
    /// Zero for continuous-length tape.
    pub length_mm: u8,
    pub body_width_px: u32,
    /// Zero for continuous-length tape (the job chooses the height).
    pub body_length_px: u32,
    pub left_margin_px: u32,
    pub right_margin_px: u32,
    pub rgt_size_bytes: u8,
}

const fn ct(width_mm: u8, body_width_px: u32, left_margin_px: u32, right_margin_px: u32, rgt_size_bytes: u8) -> Media {
    Media {
        media_type: MediaType::Continuous,
        width_mm,
        length_mm: 0,
        body_width_px,
        body_length_px: 0,
        left_margin_px,
        right_margin_px,
        rgt_size_bytes,
    }
}

const fn dc(
    width_mm: u8,
    length_mm: u8,
    body_width_px: u32,
    body_length_px: u32,
    left_margin_px: u32,
    right_margin_px: u32,
    rgt_size_bytes: u8,
) -> Media {
    Media {
        media_type: MediaType::DieCut,
        width_mm,
        length_mm,
        body_width_px,
        body_length_px,
        left_margin_px,
        right_margin_px,
        rgt_size_bytes,
    }
}

/// Every media known to the driver, for both the 720 pin (90 byte records)
/// and the 1296 pin (162 byte records) head generations.
static CATALOG: &[Media] = &[
    // Continuous length tape, 720 pin heads
    ct(12, 106, 585, 29, 90),
    ct(29, 306, 408, 6, 90),
    ct(38, 413, 295, 12, 90),
    ct(50, 554, 154, 12, 90),
    ct(54, 590, 130, 0, 90),
    ct(62, 696, 12, 12, 90),
    // Die-cut labels, 720 pin heads
    dc(17, 54, 165, 566, 555, 0, 90),
    dc(17, 87, 165, 956, 555, 0, 90),
    dc(23, 23, 236, 202, 442, 42, 90),
    dc(29, 90, 306, 991, 408, 6, 90),
    dc(38, 90, 413, 991, 295, 12, 90),
    dc(39, 48, 425, 495, 289, 6, 90),
    dc(52, 29, 578, 271, 142, 0, 90),
    dc(62, 29, 696, 271, 12, 12, 90),
    dc(62, 100, 696, 1109, 12, 12, 90),
    // Round die-cut labels, 720 pin heads
    dc(12, 12, 94, 94, 513, 113, 90),
    dc(24, 24, 236, 236, 442, 42, 90),
    dc(58, 58, 618, 618, 51, 51, 90),
    // Continuous length tape, 1296 pin heads
    ct(12, 106, 1116, 74, 162),
    ct(29, 306, 940, 50, 162),
    ct(38, 413, 827, 56, 162),
    ct(50, 554, 686, 56, 162),
    ct(54, 590, 662, 44, 162),
    ct(62, 696, 544, 56, 162),
    ct(102, 1164, 76, 56, 162),
    // Die-cut labels, 1296 pin heads
    dc(17, 54, 165, 566, 1087, 44, 162),
    dc(17, 87, 165, 956, 1087, 44, 162),
    dc(23, 23, 236, 202, 976, 84, 162),
    dc(29, 90, 306, 991, 940, 50, 162),
    dc(38, 90, 413, 991, 827, 56, 162),
    dc(39, 48, 425, 495, 821, 50, 162),
    dc(52, 29, 578, 271, 674, 44, 162),
    dc(62, 29, 696, 271, 544, 56, 162),
    dc(62, 100, 696, 1109, 544, 56, 162),
    dc(102, 51, 1164, 526, 76, 56, 162),
    dc(102, 153, 1164, 1660, 76, 56, 162),
    // Round die-cut labels, 1296 pin heads
    dc(12, 12, 94, 94, 1046, 156, 162),
    dc(24, 24, 236, 236, 975, 85, 162),
    dc(58, 58, 618, 618, 584, 94, 162),
];

impl Media {
    /// Look up the media matching the given key.
    ///
    /// The record size depends on the printer's head generation and selects
    /// between two distinct label catalogs, so the same (type, width, length)
    /// key can resolve to different margins on a wide printer.
    pub fn identify(rgt_size_bytes: u8, media_type: MediaType, width_mm: u8, length_mm: u8) -> Option<&'static Media> {
        CATALOG.iter().find(|media| {
            media.rgt_size_bytes == rgt_size_bytes
                && media.media_type == media_type
                && media.width_mm == width_mm
                && media.length_mm == length_mm
        })
    }

    /// Derive the lookup key from a decoded status reply.
    pub fn for_status(status: &Status) -> Option<&'static Media> {
        Media::identify(
            status.model().rgt_size_bytes(),
            status.media_type(),
            status.media_width_mm(),
            status.media_length_mm(),
        )
    }
}
