#[macro_use]
extern crate bitflags;

/// There are different printer models with variable capabilities.
mod model;
pub use model::Model;

/// Brother printer media are standardized. To print on them, we need layout parameters (margins etc.).
mod media;
pub use media::{Media, MediaType};

/// The status response is the basic feedback method from the printer to the host.
mod status;
pub use status::{ErrorFlags, Phase, Status, StatusOrigin, StatusType};

/// A print job bundles the label images with the cut, margin and delay policy.
mod job;
pub use job::{Job, ValidationError};

/// The printer's raster command language is serialized by a stateless encoder.
mod command;

/// Search the list of available USB devices, find a Brother QL printer and perform bulk IO.
mod usb;
pub use usb::{Error as OpenError, Transport, UsbTransport};

/// Printing streams the control block and raster lines, polling the status between labels.
mod session;
pub use session::{JobOutcome, JobSummary, PrintError, Printer};
