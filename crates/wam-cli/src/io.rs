//! Recording files: `ts,x,y,z` text tables and JSON sample arrays

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use wam_core::{AccelSample, Recording};

/// Load a recording; `.json` files hold an array of samples, anything else
/// is read as comma separated `ts,x,y,z` rows with an optional header.
pub fn read_recording(path: &Path, sampling_rate: f64) -> Result<Recording> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read recording {}", path.display()))?;

    let samples = if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        serde_json::from_str::<Vec<AccelSample>>(&text)
            .with_context(|| format!("{} is not a JSON sample array", path.display()))?
    } else {
        parse_table(&text).with_context(|| format!("failed to parse {}", path.display()))?
    };

    tracing::debug!(path = %path.display(), samples = samples.len(), "recording loaded");
    Ok(Recording::from_samples(&samples, sampling_rate)?)
}

/// Parse `ts,x,y,z` rows
pub fn parse_table(text: &str) -> Result<Vec<AccelSample>> {
    let mut samples = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            bail!("line {}: expected 4 columns (ts,x,y,z), found {}", line_no + 1, fields.len());
        }

        let parsed: Result<Vec<f64>, _> = fields.iter().map(|f| f.parse::<f64>()).collect();
        match parsed {
            Ok(v) => samples.push(AccelSample {
                ts: v[0],
                x: v[1],
                y: v[2],
                z: v[3],
            }),
            // Header row
            Err(_) if samples.is_empty() && fields.iter().all(|f| f.parse::<f64>().is_err()) => {}
            Err(e) => bail!("line {}: {e}", line_no + 1),
        }
    }

    Ok(samples)
}

/// Render samples as a `ts,x,y,z` table
pub fn format_table(recording: &Recording) -> String {
    let mut out = String::from("ts,x,y,z\n");
    for s in recording.samples() {
        out.push_str(&format!("{},{},{},{}\n", s.ts, s.x, s.y, s.z));
    }
    out
}
