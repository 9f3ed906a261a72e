//! CLI output formatting utilities.

use std::fmt::Write;

use colored::Colorize;

use crate::arbiter::{CycleOutcome, NoActionReason, StatusSnapshot};
use crate::daemon::SelectionResult;

/// Describes a cycle outcome in one line.
#[must_use]
pub fn describe_outcome(outcome: &CycleOutcome) -> String {
    match outcome {
        CycleOutcome::Switched { from, to, name } => {
            format!("Switched default input from device {from} to {name} ({to})")
        }
        CycleOutcome::SwitchFailed { target } => {
            format!("Failed to switch default input to device {target}; retrying next cycle")
        }
        CycleOutcome::NoActionNeeded { reason } => match reason {
            NoActionReason::DefaultUnknown => {
                "No action: the default input device could not be determined".to_string()
            }
            NoActionReason::NotUndesired => {
                "No action: the default input device is acceptable".to_string()
            }
            NoActionReason::NoSelectableInput => {
                "No action: no other input device is available".to_string()
            }
        },
    }
}

/// Formats a boolean as a colored mark.
#[must_use]
pub fn format_bool(value: bool) -> String {
    if value {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

/// Formats the daemon status for humans.
#[must_use]
pub fn format_status(snapshot: &StatusSnapshot) -> String {
    let mut output = String::new();

    let current = snapshot.current_input_device_id.map_or_else(
        || snapshot.current_input_device_name.clone(),
        |id| format!("{} ({id})", snapshot.current_input_device_name),
    );
    let _ = writeln!(output, "{} {}", "Currently using:".bold(), current);

    let _ = writeln!(output, "{}", "Selectable input devices:".bold());
    if snapshot.selectable_devices.is_empty() {
        let _ = writeln!(output, "  (none)");
    }
    for device in &snapshot.selectable_devices {
        let preferred = snapshot.selected_preference_id == Some(device.id);
        let marker = if preferred { format_bool(true) } else { " ".to_string() };
        let _ = writeln!(output, "  {marker} {:>6}  {}", device.id, device.name);
    }

    match snapshot.selected_preference_id {
        Some(id) if !snapshot.selectable_devices.iter().any(|device| device.id == id) => {
            let _ = writeln!(output, "Preferred device {id} is not connected");
        }
        Some(_) => {}
        None => {
            let _ = writeln!(output, "No preferred device selected");
        }
    }

    if !snapshot.preference_persisted {
        let _ = writeln!(
            output,
            "{}",
            "Warning: the preferred device could not be saved and will be lost on restart".yellow()
        );
    }

    if let Some(outcome) = &snapshot.last_outcome {
        let _ = writeln!(output, "{} {}", "Last check:".bold(), describe_outcome(outcome));
    }

    output
}

/// Formats the result of `micswitch select`.
#[must_use]
pub fn format_selection(result: &SelectionResult) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "Preferred input device set to {} ({})",
        result.selected.name, result.selected.id
    );
    let _ = writeln!(output, "{}", describe_outcome(&result.outcome));

    if !result.preference_persisted {
        let _ = writeln!(
            output,
            "{}",
            "Warning: the selection could not be saved and will be lost on restart".yellow()
        );
    }

    output
}
