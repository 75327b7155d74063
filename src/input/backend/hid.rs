//! Wheel device access through hidapi.

use std::sync::{Arc, Mutex};

use hidapi::HidApi;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

use crate::input::InputError;
use crate::input::source::InputSignal;
use crate::input::wheel::WheelBackend;

const REPORT_BUFFER_LEN: usize = 64;

type Listener = Arc<Mutex<Option<UnboundedSender<InputSignal>>>>;

/// Reads the wheel on a dedicated thread and hands reports to whichever
/// listener is attached.
#[derive(Default)]
pub struct HidWheelBackend {
    listener: Listener,
}

impl WheelBackend for HidWheelBackend {
    fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<(), InputError> {
        let api = HidApi::new().map_err(|e| InputError::DeviceOpen {
            device: "wheel",
            reason: e.to_string(),
        })?;
        let device = api
            .open(vendor_id, product_id)
            .map_err(|e| InputError::DeviceOpen {
                device: "wheel",
                reason: e.to_string(),
            })?;

        let listener = self.listener.clone();
        std::thread::Builder::new()
            .name("wheel-reader".into())
            .spawn(move || {
                let mut buf = [0u8; REPORT_BUFFER_LEN];
                loop {
                    match device.read(&mut buf) {
                        Ok(0) => continue,
                        Ok(n) => forward(&listener, &buf[..n]),
                        Err(e) => {
                            error!("Wheel read failed: {}", e);
                            break;
                        }
                    }
                }
            })
            .map_err(|e| InputError::DeviceOpen {
                device: "wheel",
                reason: e.to_string(),
            })?;

        Ok(())
    }

    fn attach(&mut self, reports: UnboundedSender<InputSignal>) {
        *self.listener.lock().unwrap() = Some(reports);
    }

    fn detach(&mut self) {
        self.listener.lock().unwrap().take();
    }
}

fn forward(listener: &Listener, report: &[u8]) {
    let mut listener = listener.lock().unwrap();
    let Some(reports) = listener.as_ref() else {
        return;
    };
    if reports.send(InputSignal::WheelReport(report.to_vec())).is_err() {
        debug!("Wheel report receiver closed");
        listener.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_reports_only_reach_an_attached_listener() {
        let mut backend = HidWheelBackend::default();
        let (tx, mut rx) = mpsc::unbounded_channel();

        forward(&backend.listener, &[1]);
        backend.attach(tx);
        forward(&backend.listener, &[2]);
        backend.detach();
        forward(&backend.listener, &[3]);

        assert!(matches!(rx.try_recv(), Ok(InputSignal::WheelReport(r)) if r == vec![2]));
        assert!(rx.try_recv().is_err());
    }
}
