//! Stateless serialization of the raster command language. Every function
//! returns a fresh byte buffer; the session decides when each buffer goes
//! onto the wire.

use crate::job::Job;
use crate::media::{Media, MediaType};

use image::GrayImage;

/// Length of the zero run that flushes a desynchronized command parser.
const RESET_RUN_LEN: usize = 350;

/// Print command, sent after every page but the last.
pub(crate) const PRINT: u8 = 0x0c;

/// Print command for the final page, feeding the label to the cut position.
pub(crate) const PRINT_LAST: u8 = 0x1a;

bitflags! {
    /// Marks which fields of the print-information record are authoritative.
    struct PrintInfoFlags: u8 {
        const KIND = 0x02;
        const WIDTH = 0x04;
        const LENGTH = 0x08;
        const QUALITY = 0x40;
        const RECOVER = 0x80;
    }
}

/// Resynchronization primitive: a long run of invalid bytes, then initialize.
///
/// Sent once at connection open; also usable to recover a printer that got
/// stuck halfway through an interrupted command.
pub(crate) fn reset() -> Vec<u8> {
    let mut frame = vec![0x00; RESET_RUN_LEN];
    frame.extend_from_slice(&[0x1b, 0x40]);
    frame
}

/// Status information request.
pub(crate) fn status_request() -> Vec<u8> {
    vec![0x1b, 0x69, 0x53]
}

/// The per-job control block: raster-mode switch, print information,
/// cut policy and feed margin.
pub(crate) fn control_block(job: &Job) -> Vec<u8> {
    let media = job.media;
    let mut block = Vec::with_capacity(32);

    // Printers with multiple native modes must be switched explicitly.
    if !job.model.raster_only() {
        block.extend_from_slice(&[0x1b, 0x69, 0x61, 0x01]);
    }

    let mut flags =
        PrintInfoFlags::KIND | PrintInfoFlags::WIDTH | PrintInfoFlags::QUALITY | PrintInfoFlags::RECOVER;

    if media.media_type != MediaType::Continuous {
        flags |= PrintInfoFlags::LENGTH;
    }

    // The declared height applies to every page of the job.
    let line_count = job.images[0].height().to_le_bytes();

    block.extend_from_slice(&[
        0x1b,
        0x69,
        0x7a,
        flags.bits(),
        media.media_type.code(),
        media.width_mm,
        media.length_mm,
        line_count[0],
        line_count[1],
        line_count[2],
        line_count[3],
        0x00, // starting page
        0x00, // reserved
    ]);

    if job.autocut {
        block.extend_from_slice(&[0x1b, 0x69, 0x4d, 0x40]);
        block.extend_from_slice(&[0x1b, 0x69, 0x41, job.cut_each]);
    } else {
        block.extend_from_slice(&[0x1b, 0x69, 0x4d, 0x00]);
    }

    let margin = job.feed_margin().to_le_bytes();
    block.extend_from_slice(&[0x1b, 0x69, 0x64, margin[0], margin[1]]);

    block
}

/// MSB-first bit cursor over a zeroed line buffer.
struct BitWriter<'a> {
    output: &'a mut [u8],
    bit_idx: usize,
}

impl<'a> BitWriter<'a> {
    fn new(output: &'a mut [u8]) -> Self {
        Self { output, bit_idx: 0 }
    }

    fn write_bit(&mut self, bit: bool) {
        self.output[self.bit_idx / 8] |= (bit as u8) << (7 - self.bit_idx % 8);
        self.bit_idx += 1;
    }

    /// Blank bits are a plain cursor move; the buffer starts zeroed.
    fn skip(&mut self, bits: u32) {
        self.bit_idx += bits as usize;
    }
}

/// One raster-graphics-transfer frame carrying row `y` of the image.
///
/// The packed payload always spans the full head: left-margin blanks, then
/// the body scanned from the rightmost column to the leftmost one (the head
/// paints the line mirrored), then right-margin blanks. Only a fully black
/// pixel prints.
pub(crate) fn raster_line(media: &Media, image: &GrayImage, y: u32) -> Vec<u8> {
    let mut frame = vec![0x00; 3 + media.rgt_size_bytes as usize];
    frame[0] = 0x67;
    frame[1] = 0x00;
    frame[2] = media.rgt_size_bytes;

    let mut bits = BitWriter::new(&mut frame[3..]);
    bits.skip(media.left_margin_px);

    for x in (0..media.body_width_px).rev() {
        bits.write_bit(image.get_pixel(x, y).0[0] == 0);
    }

    // The right margin and any slack bits in the last byte stay zero.
    frame
}
