//! Backend driving the `SwitchAudioSource` command-line helper.
//!
//! The helper (`brew install switchaudio-osx`) prints one JSON object per
//! line when invoked with `-f json`:
//!
//! ```text
//! {"name": "MacBook Pro Microphone", "type": "input", "id": "91", "uid": "BuiltInMicrophoneDevice"}
//! ```
//!
//! A device with both directions is listed once per direction.

use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;

use super::backend::{AudioBackend, AudioError};
use super::device::{Device, DeviceId};
use crate::platform::resolve_binary;

/// Helper binary name.
pub const BINARY_NAME: &str = "SwitchAudioSource";

/// One line of `SwitchAudioSource -f json` output.
#[derive(Debug, Deserialize)]
struct DeviceLine {
    name: String,
    #[serde(rename = "type")]
    direction: String,
    id: IdField,
}

/// The helper prints ids as strings; accept plain numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdField {
    Number(DeviceId),
    Text(String),
}

impl IdField {
    fn parse(&self) -> Option<DeviceId> {
        match self {
            Self::Number(id) => Some(*id),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// Parses `-f json` output into devices, merging the per-direction entries.
///
/// Lines that are blank or cannot be parsed are skipped.
#[must_use]
pub fn parse_device_lines(output: &str) -> Vec<Device> {
    let mut devices: Vec<Device> = Vec::new();

    for line in output.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Ok(entry) = serde_json::from_str::<DeviceLine>(line) else {
            tracing::debug!(line, "skipping unparseable SwitchAudioSource line");
            continue;
        };
        let Some(id) = entry.id.parse() else {
            continue;
        };
        let is_input = entry.direction.eq_ignore_ascii_case("input");

        if let Some(existing) = devices.iter_mut().find(|device| device.id == id) {
            existing.is_input |= is_input;
        } else {
            devices.push(Device { id, name: entry.name, is_input });
        }
    }

    devices
}

/// Drives the external helper binary.
#[derive(Debug, Clone)]
pub struct SwitchAudioSource {
    binary: PathBuf,
}

impl SwitchAudioSource {
    /// Uses the helper at `binary`.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self { Self { binary: binary.into() } }

    /// Locates the helper in the known install locations.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::Unavailable`] if the helper is not installed.
    pub fn locate() -> Result<Self, AudioError> {
        resolve_binary(BINARY_NAME).map(Self::new).map_err(|reason| {
            AudioError::Unavailable(format!(
                "{reason}. Please install switchaudio-osx via homebrew (brew install switchaudio-osx)"
            ))
        })
    }

    /// Runs the helper, returning its stdout.
    fn run(&self, operation: &'static str, args: &[&str]) -> Result<String, AudioError> {
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|err| AudioError::query(operation, err))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioError::query(
                operation,
                format!("{} exited with {}: {}", BINARY_NAME, output.status, stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn find(&self, id: DeviceId) -> Result<Device, AudioError> {
        self.devices()?
            .into_iter()
            .find(|device| device.id == id)
            .ok_or_else(|| AudioError::query("find device", format!("no device with id {id}")))
    }
}

impl AudioBackend for SwitchAudioSource {
    fn name(&self) -> &'static str { "switchaudiosource" }

    fn probe(&self) -> Result<(), AudioError> {
        self.run("probe", &["-a"])
            .map(|_| ())
            .map_err(|err| AudioError::Unavailable(err.to_string()))
    }

    fn device_ids(&self) -> Result<Vec<DeviceId>, AudioError> {
        Ok(self.devices()?.into_iter().map(|device| device.id).collect())
    }

    fn device_name(&self, id: DeviceId) -> Result<String, AudioError> {
        self.find(id).map(|device| device.name)
    }

    fn is_input_capable(&self, id: DeviceId) -> Result<bool, AudioError> {
        self.find(id).map(|device| device.is_input)
    }

    fn default_input_device(&self) -> Result<Option<DeviceId>, AudioError> {
        let output = self.run("read default input device", &["-c", "-t", "input", "-f", "json"])?;
        Ok(parse_device_lines(&output).first().map(|device| device.id))
    }

    fn set_default_input_device(&self, id: DeviceId) -> Result<(), AudioError> {
        let id_arg = id.to_string();
        self.run("set default input device", &["-i", &id_arg, "-t", "input"])
            .map(|_| ())
            .map_err(|err| AudioError::Switch { device: id, message: err.to_string() })
    }

    /// One helper invocation per listing instead of one per attribute.
    fn devices(&self) -> Result<Vec<Device>, AudioError> {
        let output = self.run("list devices", &["-a", "-t", "all", "-f", "json"])?;
        Ok(parse_device_lines(&output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
{"name": "MacBook Pro Microphone", "type": "input", "id": "91", "uid": "BuiltInMicrophoneDevice"}
{"name": "MacBook Pro Speakers", "type": "output", "id": "84", "uid": "BuiltInSpeakerDevice"}
{"name": "AirPods Pro", "type": "output", "id": "112", "uid": "AC-90-85:output"}
{"name": "AirPods Pro", "type": "input", "id": "112", "uid": "AC-90-85:input"}
not json
{"name": "Broken", "type": "input", "id": "x1", "uid": "?"}
"#;

    #[test]
    fn parse_merges_directions_and_keeps_order() {
        let devices = parse_device_lines(LISTING);

        assert_eq!(
            devices,
            vec![
                Device::new(91, "MacBook Pro Microphone", true),
                Device::new(84, "MacBook Pro Speakers", false),
                Device::new(112, "AirPods Pro", true),
            ]
        );
    }

    #[test]
    fn parse_accepts_numeric_ids() {
        let devices = parse_device_lines(r#"{"name":"USB Mic","type":"input","id":7}"#);
        assert_eq!(devices, vec![Device::new(7, "USB Mic", true)]);
    }

    #[test]
    fn parse_empty_output() {
        assert!(parse_device_lines("").is_empty());
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let backend = SwitchAudioSource::new("/nonexistent/SwitchAudioSource");
        assert!(matches!(backend.probe(), Err(AudioError::Unavailable(_))));
        assert!(matches!(backend.devices(), Err(AudioError::Query { .. })));
        assert!(matches!(backend.set_default_input_device(3), Err(AudioError::Switch { device: 3, .. })));
    }

    #[cfg(unix)]
    #[test]
    fn drives_helper_script() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("SwitchAudioSource");
        let mut file = std::fs::File::create(&script).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "case \"$1\" in").unwrap();
        writeln!(
            file,
            "  -c) echo '{{\"name\": \"AirPods Pro\", \"type\": \"input\", \"id\": \"112\"}}' ;;"
        )
        .unwrap();
        writeln!(file, "  -i) [ \"$2\" = \"91\" ] || exit 1 ;;").unwrap();
        writeln!(
            file,
            "  *) echo '{{\"name\": \"MacBook Pro Microphone\", \"type\": \"input\", \"id\": \"91\"}}' ;;"
        )
        .unwrap();
        writeln!(file, "esac").unwrap();
        drop(file);
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let backend = SwitchAudioSource::new(&script);
        assert!(backend.probe().is_ok());
        assert_eq!(backend.default_input_device().unwrap(), Some(112));
        assert_eq!(backend.device_name(91).unwrap(), "MacBook Pro Microphone");
        assert!(backend.is_input_capable(91).unwrap());
        assert!(backend.set_default_input_device(91).is_ok());
        assert!(backend.set_default_input_device(5).is_err());
    }
}
