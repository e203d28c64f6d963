use crate::model::Model;

use std::time::Duration;

use log::warn;
use rusb::{DeviceHandle, GlobalContext};
use thiserror::Error;

/// USB vendor ID shared by the whole Brother QL family.
const VENDOR_ID: u16 = 0x04f9;

/// The printers expose a single interface with fixed bulk endpoints.
const INTERFACE: u8 = 0;
const IN_ENDPOINT: u8 = 0x81;
const OUT_ENDPOINT: u8 = 0x02;

/// Per-transfer timeout, independent from the page-completion poll budget.
const IO_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Error)]
pub enum Error {
    #[error("no Brother QL printer has been found")]
    NoPrinter,
    #[error("not enough memory to open the printer device")]
    NoMemory,
    #[error("access to the printer was denied (check the device permissions)")]
    AccessDenied,
    #[error("the printer disappeared while opening it")]
    NoDevice,
    #[error("the printer interface could not be claimed: {0}")]
    ClaimFailed(rusb::Error),
    #[error("an USB error has occurred: {0}")]
    Usb(#[from] rusb::Error),
}

/// Raw bulk IO towards one attached device.
///
/// The session logic only needs these two operations, so tests can drive it
/// with a scripted transport instead of hardware.
pub trait Transport {
    fn write(&mut self, data: &[u8]) -> Result<usize, rusb::Error>;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, rusb::Error>;
}

/// The rusb-backed transport used for real printers.
///
/// Dropping it releases the interface claim and closes the device handle.
pub struct UsbTransport {
    handle: DeviceHandle<GlobalContext>,
}

fn select_device() -> Result<Option<(rusb::Device<GlobalContext>, rusb::DeviceDescriptor, Model)>, rusb::Error> {
    Ok(rusb::DeviceList::new()?.iter().find_map(|device| {
        // Skip devices whose descriptor cannot be read.
        let device_desc = device.device_descriptor().ok()?;

        if device_desc.vendor_id() != VENDOR_ID {
            return None;
        }

        let model = Model::from(device_desc.product_id());

        if model == Model::Unknown {
            warn!(
                "found a Brother QL printer with an unknown product ID: {:#06x}",
                device_desc.product_id()
            );
            return None;
        }

        Some((device, device_desc, model))
    }))
}

impl UsbTransport {
    /// Find the first Brother QL printer on the bus and claim its interface.
    pub(crate) fn open_first() -> Result<(UsbTransport, Model, Option<String>), Error> {
        let (device, device_desc, model) = select_device()?.ok_or(Error::NoPrinter)?;

        let mut handle = device.open().map_err(|err| match err {
            rusb::Error::NoMem => Error::NoMemory,
            rusb::Error::Access => Error::AccessDenied,
            rusb::Error::NoDevice => Error::NoDevice,
            other => Error::Usb(other),
        })?;

        // Ensure that a potential kernel driver is automatically detached
        // and later reattached.
        if let Err(err) = handle.set_auto_detach_kernel_driver(true) {
            warn!("could not enable kernel driver auto-detach: {}", err);
        }

        handle.claim_interface(INTERFACE).map_err(Error::ClaimFailed)?;

        // The serial number distinguishes printers of the same model.
        // Not every unit reports one.
        let serial_number = handle.read_serial_number_string_ascii(&device_desc).ok();

        Ok((UsbTransport { handle }, model, serial_number))
    }
}

impl Transport for UsbTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, rusb::Error> {
        self.handle.write_bulk(OUT_ENDPOINT, data, IO_TIMEOUT)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, rusb::Error> {
        self.handle.read_bulk(IN_ENDPOINT, buf, IO_TIMEOUT)
    }
}
