use std::io::Write;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::arm::TrackingState;
use crate::error::Result;
use crate::pipeline::FrameEstimate;

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize, P: AsRef<Path>>(output_path: P, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(j.as_bytes())?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned, P: AsRef<Path>>(file_path: P) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Writes a plain-text summary of a tracking run.
///
/// For every arm: how many frames it was tracked, coasting or lost, and the
/// mean bend angle over tracked frames.
pub fn write_report<P: AsRef<Path>>(output_path: P, estimates: &[FrameEstimate]) -> Result<()> {
    let mut names: Vec<&str> = Vec::new();
    for e in estimates {
        for arm in &e.arms {
            if !names.contains(&arm.name.as_str()) {
                names.push(&arm.name);
            }
        }
    }

    let mut s = String::new();
    s += format!("frames: {}\n", estimates.len()).as_str();
    s += format!(
        "skipped (too few points): {}\n\n",
        estimates.iter().filter(|e| !e.clustered).count()
    )
    .as_str();
    for name in names {
        let arms: Vec<_> = estimates
            .iter()
            .flat_map(|e| e.arms.iter().filter(move |a| a.name == name))
            .collect();
        let count = |state: TrackingState| arms.iter().filter(|a| a.state == state).count();
        let angles: Vec<f32> = arms.iter().filter_map(|a| a.bend_angle_deg).collect();
        s += format!("{}:\n", name).as_str();
        s += format!("    tracking: {}\n", count(TrackingState::Tracking)).as_str();
        s += format!("    coasting: {}\n", count(TrackingState::Coasting)).as_str();
        s += format!("    lost    : {}\n", count(TrackingState::Lost)).as_str();
        if angles.is_empty() {
            s += "    mean bend angle: n/a\n\n";
        } else {
            let mean = angles.iter().sum::<f32>() / angles.len() as f32;
            s += format!("    mean bend angle: {:.2} deg\n\n", mean).as_str();
        }
    }
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(s.as_bytes())?;
    Ok(())
}
