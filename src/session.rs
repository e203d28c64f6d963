use crate::command;
use crate::job::{Job, ValidationError};
use crate::media::Media;
use crate::model::Model;
use crate::status::{Phase, Status, StatusType};
use crate::usb::{self, Transport, UsbTransport};

use std::thread;
use std::time::Duration;

use log::{debug, log_enabled, trace, warn, Level};
use thiserror::Error;

/// Budget for one page to leave the printing phase.
const PRINT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Status poll cadence while a page is still printing.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A status read that returns nothing is retried once after this pause.
const READ_RETRY_PAUSE: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("the job is invalid: {0}")]
    Validation(#[from] ValidationError),
    #[error("an USB error has occurred: {0}")]
    Usb(#[from] rusb::Error),
}

/// Why a print session ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Every page was sent and acknowledged.
    Completed,
    /// The progress callback asked to stop.
    Cancelled,
    /// The printer did not leave the printing phase within the poll budget.
    TimedOut,
    /// The printer reported a hardware fault; the status passed to the
    /// callback carries the error flags.
    Fault,
    /// The printer is not ready to receive another page.
    NotReady,
}

/// What a session actually did, so a partially completed job stays observable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct JobSummary {
    /// Number of pages fully streamed to the device.
    pub pages_sent: usize,
    pub outcome: JobOutcome,
}

/// One exclusive connection to an attached printer.
///
/// The protocol is strictly half-duplex: never issue a status request from
/// another thread while a print session holds the device.
pub struct Printer<T: Transport = UsbTransport> {
    transport: T,
    model: Model,
    serial_number: Option<String>,
}

impl Printer<UsbTransport> {
    /// Attach the first Brother QL printer on the bus and reset it.
    pub fn open() -> Result<Self, usb::Error> {
        let (transport, model, serial_number) = UsbTransport::open_first()?;

        let mut printer = Printer {
            transport,
            model,
            serial_number,
        };

        printer.reset()?;
        Ok(printer)
    }
}

impl<T: Transport> Printer<T> {
    pub fn model(&self) -> Model {
        self.model
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    /// Flush the printer's command parser and reinitialize it.
    /// Usable to recover a desynchronized printer mid-session.
    pub fn reset(&mut self) -> Result<(), rusb::Error> {
        self.write(&command::reset())
    }

    /// Release the device claim. Dropping the printer has the same effect.
    pub fn close(self) {}

    /// Ask the printer for a fresh status.
    ///
    /// Must not be called while a print is in flight; use the progress
    /// callback of [`Printer::print_job`] instead.
    pub fn request_status(&mut self) -> Result<Status, rusb::Error> {
        self.write(&command::status_request())?;
        Ok(self.read_status())
    }

    /// Identify the loaded media from a status reply.
    pub fn media(&self, status: &Status) -> Option<&'static Media> {
        Media::for_status(status)
    }

    /// Print all pages of `job`.
    ///
    /// `on_page` is invoked with the page index and the latest status twice
    /// per page: right after the page was streamed, and again once the
    /// status has settled. Returning `false` stops the job after the
    /// current frame; there is no way (and no need) to abort mid-frame.
    ///
    /// Mid-job printer trouble does not raise: the summary and the statuses
    /// passed to the callback describe how far the job got. Only invalid
    /// jobs and failed bulk writes are errors.
    pub fn print_job<F>(&mut self, job: &Job, mut on_page: F) -> Result<JobSummary, PrintError>
    where
        F: FnMut(usize, &Status) -> bool,
    {
        if job.images.is_empty() {
            // Nothing to print is not an error.
            return Ok(JobSummary {
                pages_sent: 0,
                outcome: JobOutcome::Completed,
            });
        }

        job.validate()?;
        self.write(&command::control_block(job))?;

        let page_count = job.images.len();

        for (page, image) in job.images.iter().enumerate() {
            // The head consumes data in scan-line units: one write per row,
            // rows must arrive in exact scan order.
            for y in 0..image.height() {
                self.write(&command::raster_line(job.media, image, y))?;
            }

            let last = page + 1 == page_count;
            self.write(&[if last { command::PRINT_LAST } else { command::PRINT }])?;

            let mut status = self.read_status();

            if !on_page(page, &status) {
                return Ok(JobSummary {
                    pages_sent: page + 1,
                    outcome: JobOutcome::Cancelled,
                });
            }

            let mut budget = PRINT_TIMEOUT;

            while !budget.is_zero() && (!status.is_live() || status.phase() == Phase::Printing) {
                budget = budget.saturating_sub(POLL_INTERVAL);
                thread::sleep(POLL_INTERVAL);
                status = self.read_status();
            }

            if !on_page(page, &status) {
                return Ok(JobSummary {
                    pages_sent: page + 1,
                    outcome: JobOutcome::Cancelled,
                });
            }

            if let Some(outcome) = stop_reason(&status) {
                return Ok(JobSummary {
                    pages_sent: page + 1,
                    outcome,
                });
            }

            if !job.delay.is_zero() {
                thread::sleep(job.delay);
            }
        }

        Ok(JobSummary {
            pages_sent: page_count,
            outcome: JobOutcome::Completed,
        })
    }

    /// Read back one status payload without requesting one first.
    ///
    /// Never fails: connection problems degrade to a placeholder status, so
    /// the poll loop and the callback always have something to look at.
    pub fn read_status(&mut self) -> Status {
        let mut payload = [0u8; Status::PAYLOAD_LEN];

        match self.read_payload(&mut payload) {
            Ok(read) if read >= Status::PAYLOAD_LEN => {
                let status = Status::decode(Some(&payload), self.model);
                debug!("status is {}", status);
                status
            }
            Ok(read) => {
                warn!("incomplete status read ({} of {} bytes)", read, Status::PAYLOAD_LEN);
                Status::decode(None, self.model)
            }
            Err(err) => {
                warn!("status read failed: {}", err);
                Status::decode(None, self.model).with_detail(err.to_string())
            }
        }
    }

    fn read_payload(&mut self, payload: &mut [u8]) -> Result<usize, rusb::Error> {
        let read = self.transport.read(payload)?;

        if read == 0 {
            // Give a busy printer a moment before the single retry.
            thread::sleep(READ_RETRY_PAUSE);
            return self.transport.read(payload);
        }

        Ok(read)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), rusb::Error> {
        if log_enabled!(Level::Trace) {
            trace!("> {}", hex(data));
        }

        let written = self.transport.write(data)?;

        if written != data.len() {
            warn!("short bulk write ({} of {} bytes)", written, data.len());
        }

        Ok(())
    }
}

fn stop_reason(status: &Status) -> Option<JobOutcome> {
    if !status.is_live() {
        warn!("no printer status within {:?}, stopping the job", PRINT_TIMEOUT);
        return Some(JobOutcome::TimedOut);
    }

    if status.phase() == Phase::Printing {
        warn!("page did not finish within {:?}, stopping the job", PRINT_TIMEOUT);
        return Some(JobOutcome::TimedOut);
    }

    if status.status_type() == StatusType::ErrorOccurred || !status.errors().is_empty() {
        warn!("printer reported {:?}, stopping the job", status.errors());
        return Some(JobOutcome::Fault);
    }

    if status.phase() != Phase::WaitingToReceive {
        warn!("printer is not ready to continue, stopping the job");
        return Some(JobOutcome::NotReady);
    }

    None
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02X}", byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaType;
    use image::GrayImage;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    /// Scripted transport: records every bulk write and serves canned
    /// status payloads, repeating the fallback once the queue runs dry.
    struct MockTransport {
        writes: Vec<Vec<u8>>,
        reads: VecDeque<Vec<u8>>,
        fallback: Option<Vec<u8>>,
        served: usize,
    }

    impl MockTransport {
        fn new() -> Self {
            MockTransport {
                writes: Vec::new(),
                reads: VecDeque::new(),
                fallback: None,
                served: 0,
            }
        }

        fn reads_served(&self) -> usize {
            self.served
        }
    }

    impl Transport for MockTransport {
        fn write(&mut self, data: &[u8]) -> Result<usize, rusb::Error> {
            self.writes.push(data.to_vec());
            Ok(data.len())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, rusb::Error> {
            let payload = match self.reads.pop_front().or_else(|| self.fallback.clone()) {
                Some(payload) => payload,
                None => return Err(rusb::Error::Timeout),
            };

            self.served += 1;
            buf[..payload.len()].copy_from_slice(&payload);
            Ok(payload.len())
        }
    }

    fn status_payload(status_type: u8, phase: u8) -> Vec<u8> {
        let mut raw = vec![0u8; 32];
        raw[0] = 0x80;
        raw[1] = 0x20;
        raw[10] = 62;
        raw[11] = 0x0b;
        raw[17] = 29;
        raw[18] = status_type;
        raw[19] = phase;
        raw
    }

    fn printer(transport: MockTransport) -> Printer<MockTransport> {
        Printer {
            transport,
            model: Model::QL580N,
            serial_number: None,
        }
    }

    fn die_cut_62x29() -> &'static Media {
        Media::identify(90, MediaType::DieCut, 62, 29).unwrap()
    }

    #[test]
    fn a_job_is_streamed_in_strict_order() {
        let mut transport = MockTransport::new();

        // One settled status per page: printing completed, waiting to receive.
        for _ in 0..3 {
            transport.reads.push_back(status_payload(0x01, 0x00));
        }

        let images = vec![
            GrayImage::new(696, 271),
            GrayImage::new(696, 271),
            GrayImage::new(696, 271),
        ];
        let job = Job::new(Model::QL580N, die_cut_62x29(), images).with_autocut(true, 2);

        let mut printer = printer(transport);
        let summary = printer.print_job(&job, |_, _| true).unwrap();

        assert_eq!(
            summary,
            JobSummary {
                pages_sent: 3,
                outcome: JobOutcome::Completed
            }
        );

        let writes = &printer.transport.writes;

        // Control block, then 3 x (271 raster lines + terminal command).
        assert_eq!(writes.len(), 1 + 3 * (271 + 1));

        // The QL-580N has multiple native modes: the control block leads
        // with the raster switch, and the die-cut print information
        // validates the length.
        assert_eq!(&writes[0][..4], &[0x1b, 0x69, 0x61, 0x01]);
        assert_eq!(&writes[0][4..8], &[0x1b, 0x69, 0x7a, 0xce]);
        // Autocut on, cutting every second label.
        assert!(writes[0]
            .windows(8)
            .any(|w| w == [0x1b, 0x69, 0x4d, 0x40, 0x1b, 0x69, 0x41, 0x02]));

        for page in 0..3 {
            let first_line = 1 + page * 272;

            for line in first_line..first_line + 271 {
                assert_eq!(writes[line].len(), 3 + 90);
                assert_eq!(&writes[line][..3], &[0x67, 0x00, 90]);
            }

            let expected_terminal = if page == 2 { command::PRINT_LAST } else { command::PRINT };
            assert_eq!(writes[first_line + 271], vec![expected_terminal]);
        }
    }

    #[test]
    fn a_page_stuck_in_the_printing_phase_times_out() {
        let mut transport = MockTransport::new();
        transport.fallback = Some(status_payload(0x06, 0x01));

        let images = vec![GrayImage::new(696, 271), GrayImage::new(696, 271)];
        let job = Job::new(Model::QL580N, die_cut_62x29(), images);

        let mut pages_seen = Vec::new();
        let mut printer = printer(transport);
        let summary = printer
            .print_job(&job, |page, _| {
                pages_seen.push(page);
                true
            })
            .unwrap();

        assert_eq!(
            summary,
            JobSummary {
                pages_sent: 1,
                outcome: JobOutcome::TimedOut
            }
        );

        // The callback saw page 0 twice and page 1 never.
        assert_eq!(pages_seen, vec![0, 0]);

        // One immediate read plus ten polls of the 2000ms budget.
        assert_eq!(printer.transport.reads_served(), 11);

        // Page 1 was never streamed: control block + 271 lines + terminal.
        assert_eq!(printer.transport.writes.len(), 1 + 271 + 1);
    }

    #[test]
    fn the_callback_cancels_between_pages() {
        let mut transport = MockTransport::new();
        transport.fallback = Some(status_payload(0x01, 0x00));

        let images = vec![GrayImage::new(696, 271), GrayImage::new(696, 271)];
        let job = Job::new(Model::QL580N, die_cut_62x29(), images);

        let mut printer = printer(transport);
        let summary = printer.print_job(&job, |_, _| false).unwrap();

        assert_eq!(
            summary,
            JobSummary {
                pages_sent: 1,
                outcome: JobOutcome::Cancelled
            }
        );
        assert_eq!(printer.transport.writes.len(), 1 + 271 + 1);
    }

    #[test]
    fn a_hardware_fault_stops_the_job() {
        let mut transport = MockTransport::new();
        let mut faulty = status_payload(0x02, 0x00);
        faulty[9] = 0x10; // cover open
        transport.fallback = Some(faulty);

        let images = vec![GrayImage::new(696, 271), GrayImage::new(696, 271)];
        let job = Job::new(Model::QL580N, die_cut_62x29(), images);

        let mut printer = printer(transport);
        let summary = printer.print_job(&job, |_, _| true).unwrap();

        assert_eq!(
            summary,
            JobSummary {
                pages_sent: 1,
                outcome: JobOutcome::Fault
            }
        );
    }

    #[test]
    fn an_empty_job_is_a_silent_no_op() {
        let job = Job::new(Model::QL580N, die_cut_62x29(), Vec::new());

        let mut printer = printer(MockTransport::new());
        let summary = printer.print_job(&job, |_, _| true).unwrap();

        assert_eq!(
            summary,
            JobSummary {
                pages_sent: 0,
                outcome: JobOutcome::Completed
            }
        );
        assert!(printer.transport.writes.is_empty());
    }

    #[test]
    fn validation_happens_before_any_io() {
        let job = Job::new(Model::QL580N, die_cut_62x29(), vec![GrayImage::new(695, 271)]);

        let mut printer = printer(MockTransport::new());
        let result = printer.print_job(&job, |_, _| true);

        assert!(matches!(
            result,
            Err(PrintError::Validation(ValidationError::Width {
                actual: 695,
                expected: 696
            }))
        ));
        assert!(printer.transport.writes.is_empty());
    }

    #[test]
    fn a_failed_write_aborts_the_job() {
        struct BrokenTransport;

        impl Transport for BrokenTransport {
            fn write(&mut self, _data: &[u8]) -> Result<usize, rusb::Error> {
                Err(rusb::Error::Pipe)
            }

            fn read(&mut self, _buf: &mut [u8]) -> Result<usize, rusb::Error> {
                Err(rusb::Error::Timeout)
            }
        }

        let job = Job::new(Model::QL580N, die_cut_62x29(), vec![GrayImage::new(696, 271)]);

        let mut printer = Printer {
            transport: BrokenTransport,
            model: Model::QL580N,
            serial_number: None,
        };

        assert!(matches!(
            printer.print_job(&job, |_, _| true),
            Err(PrintError::Usb(rusb::Error::Pipe))
        ));
    }

    #[test]
    fn a_read_failure_degrades_to_an_unavailable_status() {
        let mut printer = printer(MockTransport::new());
        let status = printer.read_status();

        assert!(!status.is_live());
        assert_eq!(status.status_type(), StatusType::PrinterUnavailable);
        assert!(status.detail().is_some());
    }
}
