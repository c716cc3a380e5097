use anyhow::Result;
use loopavatar::audio::LoudnessMonitor;
use loopavatar::state::{StateTable, VideoPolicy};

pub(crate) fn list_input_devices() -> Result<()> {
    // LOOPAVATAR_TEST_DEVICES stands in for the host device list in tests
    let devices = if let Ok(raw) = std::env::var("LOOPAVATAR_TEST_DEVICES") {
        parse_device_list(&raw)
    } else {
        LoudnessMonitor::list_devices().unwrap_or_else(|err| {
            eprintln!("Failed to list audio input devices: {err:#}");
            Vec::new()
        })
    };

    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  - {name}");
        }
    }
    Ok(())
}

fn parse_device_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// One-line startup summary of the loaded states.
pub(crate) fn describe_table(table: &StateTable) -> String {
    let states: Vec<String> = table
        .states()
        .iter()
        .map(|state| {
            let policy = match state.policy {
                VideoPolicy::Random => "random",
                VideoPolicy::Specific => "specific",
            };
            format!(
                "{} ({policy}, {} clips, {} transitions)",
                state.name,
                state.assets.len(),
                state.transitions.len()
            )
        })
        .collect();
    format!("States: {}", states.join(", "))
}
