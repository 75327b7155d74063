//! Steering-wheel HID adapter.

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use super::InputError;
use super::source::{InputSignal, InputSource};

pub const WHEEL_VENDOR_ID: u16 = 13422;
pub const WHEEL_PRODUCT_ID: u16 = 4;

/// Access to the wheel's input reports.
///
/// The device is opened at most once per process and stays open. Reports are
/// forwarded as [`InputSignal::WheelReport`] only while a listener is
/// attached; the rest are discarded by the backend.
pub trait WheelBackend: Send {
    fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<(), InputError>;

    /// Starts forwarding reports to `reports`, replacing any previous listener.
    fn attach(&mut self, reports: UnboundedSender<InputSignal>);

    fn detach(&mut self);
}

/// Decodes one byte of each report as a button.
#[derive(Debug, Clone)]
pub struct WheelAdapter {
    offset: usize,
    latest: bool,
}

impl WheelAdapter {
    pub fn new(offset: usize) -> Self {
        Self {
            offset,
            latest: false,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The button is down when the byte at the offset, read as signed, is 1.
    pub fn on_report(&mut self, report: &[u8]) {
        self.latest = match report.get(self.offset) {
            Some(&byte) => byte as i8 == 1,
            None => {
                warn!(
                    "Wheel report of {} bytes has no byte at offset {}",
                    report.len(),
                    self.offset
                );
                false
            }
        };
    }
}

impl InputSource for WheelAdapter {
    fn sample(&mut self) -> bool {
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_signed_byte_at_offset() {
        let mut adapter = WheelAdapter::new(2);
        adapter.on_report(&[0, 0, 1, 0]);
        assert!(adapter.sample());

        adapter.on_report(&[1, 1, 0, 1]);
        assert!(!adapter.sample());

        adapter.on_report(&[0, 0, 2]);
        assert!(!adapter.sample());
    }

    #[test]
    fn test_short_report_reads_as_released() {
        let mut adapter = WheelAdapter::new(20);
        adapter.on_report(&[1; 21]);
        assert!(adapter.sample());

        adapter.on_report(&[1; 8]);
        assert!(!adapter.sample());
    }
}
