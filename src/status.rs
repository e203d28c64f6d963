use crate::media::MediaType;
use crate::model::Model;

use std::fmt::Display;

bitflags! {
    /// Hardware fault bits from the two error bytes of a status payload.
    ///
    /// Payload byte 8 ("error information 1") forms the high-order byte of
    /// the combined value, byte 9 ("error information 2") the low-order one.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct ErrorFlags: u16 {
        // Error information 1
        const NO_MEDIA = 1 << 0 << 8;
        const END_OF_MEDIA = 1 << 1 << 8;
        const TAPE_CUTTER_JAM = 1 << 2 << 8;
        const UNIT_IN_USE = 1 << 4 << 8;

        // Error information 2
        const TRANSMISSION_ERROR = 1 << 2;
        const COVER_OPEN = 1 << 4;
        const CANNOT_FEED = 1 << 6;
        const SYSTEM_ERROR = 1 << 7;
    }
}

impl ErrorFlags {
    /// Combine the two error bytes and keep the known fault bits.
    pub fn from_status_bytes(error_info_1: u8, error_info_2: u8) -> Self {
        ErrorFlags::from_bits_truncate(((error_info_1 as u16) << 8) | error_info_2 as u16)
    }
}

/// Operational state reported at byte 18 of the status payload.
///
/// The two `Printer*` variants are never sent by hardware. They are
/// synthesized on the host for absent or truncated replies.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StatusType {
    Ready,
    PrintingCompleted,
    ErrorOccurred,
    Notification,
    PhaseChange,
    PrinterUnavailable,
    PrinterNotConnected,
    Unknown(u8),
}

impl From<u8> for StatusType {
    fn from(code: u8) -> Self {
        use StatusType::*;

        match code {
            0x00 => Ready,
            0x01 => PrintingCompleted,
            0x02 => ErrorOccurred,
            0x05 => Notification,
            0x06 => PhaseChange,
            0xf0 => PrinterUnavailable,
            0xf1 => PrinterNotConnected,
            other => Unknown(other),
        }
    }
}

/// High-level printer activity reported at byte 19 of the status payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    WaitingToReceive,
    Printing,
    Unknown(u8),
}

impl From<u8> for Phase {
    fn from(code: u8) -> Self {
        use Phase::*;

        match code {
            0x00 => WaitingToReceive,
            0x01 => Printing,
            other => Unknown(other),
        }
    }
}

/// Where a status came from: a real payload or a host-side placeholder.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StatusOrigin {
    /// Decoded from a full 32-byte payload.
    Live,
    /// The printer is known but returned no (or a truncated) payload.
    Unavailable,
    /// There is no printer identity to talk to.
    NotConnected,
}

/// One status snapshot, created fresh for every read attempt.
#[derive(Debug, Clone)]
pub struct Status {
    origin: StatusOrigin,
    errors: ErrorFlags,
    media_type: MediaType,
    media_width_mm: u8,
    media_length_mm: u8,
    status_type: StatusType,
    phase: Phase,
    model: Model,
    detail: Option<String>,
}

impl Status {
    /// A status payload is always 32 bytes on the wire.
    pub(crate) const PAYLOAD_LEN: usize = 32;

    /// Decode a raw payload, or synthesize a placeholder when there is none.
    ///
    /// A truncated payload counts as no payload. Callers always get a full
    /// status back, never a partial one.
    pub fn decode(raw: Option<&[u8]>, model: Model) -> Status {
        match raw {
            None if model == Model::Unknown => Status::placeholder(StatusOrigin::NotConnected, model),
            None => Status::placeholder(StatusOrigin::Unavailable, model),
            Some(payload) if payload.len() < Status::PAYLOAD_LEN => {
                Status::placeholder(StatusOrigin::Unavailable, model)
            }
            Some(payload) => Status {
                origin: StatusOrigin::Live,
                errors: ErrorFlags::from_status_bytes(payload[8], payload[9]),
                media_width_mm: payload[10],
                media_type: MediaType::from(payload[11]),
                media_length_mm: payload[17],
                status_type: StatusType::from(payload[18]),
                phase: Phase::from(payload[19]),
                model,
                detail: None,
            },
        }
    }

    fn placeholder(origin: StatusOrigin, model: Model) -> Status {
        let status_type = match origin {
            StatusOrigin::NotConnected => StatusType::PrinterNotConnected,
            _ => StatusType::PrinterUnavailable,
        };

        Status {
            origin,
            errors: ErrorFlags::empty(),
            media_type: MediaType::Unknown,
            media_width_mm: 0,
            media_length_mm: 0,
            status_type,
            phase: Phase::Unknown(0xff),
            model,
            detail: None,
        }
    }

    /// Attach a diagnostic message, e.g. the transport error that prevented the read.
    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Status {
        self.detail = Some(detail.into());
        self
    }

    pub fn origin(&self) -> StatusOrigin {
        self.origin
    }

    /// Whether this snapshot was decoded from a real payload.
    pub fn is_live(&self) -> bool {
        self.origin == StatusOrigin::Live
    }

    pub fn errors(&self) -> ErrorFlags {
        self.errors
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Media width in mm.
    pub fn media_width_mm(&self) -> u8 {
        self.media_width_mm
    }

    /// Media length in mm. Zero for continuous-length tape.
    pub fn media_length_mm(&self) -> u8 {
        self.media_length_mm
    }

    pub fn status_type(&self) -> StatusType {
        self.status_type
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The model this status was read from (or synthesized for).
    pub fn model(&self) -> Model {
        self.model
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    fn dimension(&self) -> String {
        if self.media_length_mm == 0 {
            format!("{}mm", self.media_width_mm)
        } else {
            format!("{}mm x {}mm", self.media_width_mm, self.media_length_mm)
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "status={:?} mediaType={} ({}) phaseType={:?}",
            self.status_type,
            self.media_type,
            self.dimension(),
            self.phase
        )?;

        if !self.errors.is_empty() {
            write!(f, " errors={:?}", self.errors)?;
        }

        Ok(())
    }
}
