//! Playback device selection

use std::io::{BufRead, Write};
use log::info;

use crate::data::Device;
use crate::queue::{Confirmation, QueueProvider};
use super::prompt::Console;
use super::CliError;

/// Pick the device the session runs on.
///
/// With a selector the device must match by id or name. Otherwise a single
/// device is used directly and several are offered as a menu. `None` means
/// the user chose to exit.
pub fn select_device<R: BufRead, W: Write>(
    provider: &dyn QueueProvider,
    console: &mut Console<R, W>,
    selector: Option<&str>,
) -> Result<Option<Device>, CliError> {
    loop {
        let devices = provider.devices()?;

        if let Some(selector) = selector {
            return devices
                .into_iter()
                .find(|d| d.matches(selector))
                .map(Some)
                .ok_or_else(|| CliError::DeviceNotFound(selector.to_string()));
        }

        match devices.len() {
            0 => {
                let answer = console.confirm(
                    "No playback devices found. Open Spotify on a device, then press Enter to refresh or 'e' to exit: ",
                )?;
                if answer == Confirmation::Abort {
                    return Ok(None);
                }
            }
            1 => {
                let device = devices.into_iter().next();
                if let Some(device) = &device {
                    info!("Using the only available device {}", device);
                    console.say(&format!("Using {}", device))?;
                }
                return Ok(device);
            }
            count => {
                console.say("Available devices:")?;
                for (i, device) in devices.iter().enumerate() {
                    let marker = if device.is_active { " [active]" } else { "" };
                    console.say(&format!("{}. {}{}", i + 1, device, marker))?;
                }
                return match console.choose("Select a device: ", 1, count)? {
                    Some(choice) => Ok(devices.into_iter().nth(choice - 1)),
                    None => Ok(None),
                };
            }
        }
    }
}
