//! Audio device listing for the CLI.

use std::fmt::Write;

use serde::Serialize;

use super::classifier::DeviceClassifier;
use super::device::{Device, DeviceId};

/// A device annotated with its classification, for CLI output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRow {
    /// The subsystem device ID.
    pub id: DeviceId,
    /// The human-readable device name.
    pub name: String,
    /// Whether this device supports input.
    pub input: bool,
    /// Whether the device matches an undesired pattern.
    pub undesired: bool,
    /// Whether the device may become the default input.
    pub selectable: bool,
    /// Whether this is the current default input device.
    pub current: bool,
}

/// Annotates devices, optionally keeping only input-capable ones.
#[must_use]
pub fn device_rows(
    devices: &[Device],
    classifier: &dyn DeviceClassifier,
    current: Option<DeviceId>,
    input_only: bool,
) -> Vec<DeviceRow> {
    devices
        .iter()
        .filter(|device| !input_only || device.is_input)
        .map(|device| {
            let undesired = classifier.is_undesired(&device.name);
            DeviceRow {
                id: device.id,
                name: device.name.clone(),
                input: device.is_input,
                undesired,
                selectable: device.is_input && !undesired,
                current: current == Some(device.id),
            }
        })
        .collect()
}

/// Formats devices for human-readable output.
#[must_use]
pub fn format_devices_table(rows: &[DeviceRow]) -> String {
    if rows.is_empty() {
        return "No audio devices found.".to_string();
    }

    let name_col_width = rows.iter().map(|row| row.name.len()).max().unwrap_or(20).max(4);

    let mut output = String::new();

    let _ = writeln!(
        output,
        "  {:>6}  {:<name_col_width$}  {:<5}  {:<10}",
        "ID", "Name", "Input", "Selectable"
    );
    let _ = writeln!(
        output,
        "  {:>6}  {:<name_col_width$}  {:<5}  {:<10}",
        "-".repeat(6),
        "-".repeat(name_col_width),
        "-".repeat(5),
        "-".repeat(10)
    );

    for row in rows {
        let marker = if row.current { "*" } else { " " };
        let input_mark = if row.input { "Y" } else { "-" };
        let selectable_mark = match (row.selectable, row.undesired) {
            (true, _) => "Y",
            (false, true) => "undesired",
            (false, false) => "-",
        };

        let _ = writeln!(
            output,
            "{marker} {:>6}  {:<name_col_width$}  {:<5}  {:<10}",
            row.id, row.name, input_mark, selectable_mark
        );
    }

    output
}
