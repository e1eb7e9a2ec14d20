pub mod capture;
pub mod playback;

use cpal::traits::{DeviceTrait, HostTrait};

/// Enumerate input devices as (index, name) pairs. Errors are logged and
/// yield an empty list; the settings UI treats that as "default only".
pub fn list_input_devices() -> Vec<(usize, String)> {
    let host = cpal::default_host();
    match host.input_devices() {
        Ok(devices) => devices
            .enumerate()
            .map(|(i, d)| (i, d.name().unwrap_or_else(|_| format!("Device {i}"))))
            .collect(),
        Err(e) => {
            log::error!("error listing input devices: {e}");
            Vec::new()
        }
    }
}

/// Resolve an input device by opaque index; `None` means system default.
pub(crate) fn input_device(index: Option<usize>) -> Option<cpal::Device> {
    let host = cpal::default_host();
    match index {
        Some(i) => host.input_devices().ok()?.nth(i),
        None => host.default_input_device(),
    }
}
