use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::utils::time_utils;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_long_name: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

/// Container tags for `input`, as reported by ffprobe.
pub fn probe_tags(program: &str, input: &str) -> Result<Vec<(String, String)>> {
    let output = Command::new(program)
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(input)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to run {}", program))?;

    if !output.status.success() {
        bail!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    parse_tags(&String::from_utf8_lossy(&output.stdout))
}

pub fn parse_tags(json: &str) -> Result<Vec<(String, String)>> {
    let parsed: ProbeOutput = serde_json::from_str(json).context("unreadable probe output")?;
    let Some(format) = parsed.format else {
        return Ok(Vec::new());
    };

    let mut tags = Vec::new();
    if let Some(container) = format.format_long_name {
        tags.push(("container".to_string(), container));
    }
    if let Some(duration) = format
        .duration
        .and_then(|d| d.parse::<f64>().ok())
        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
    {
        tags.push((
            "duration".to_string(),
            time_utils::format_timestamp(duration),
        ));
    }
    tags.extend(
        format
            .tags
            .into_iter()
            .map(|(key, value)| (key.to_lowercase(), value)),
    );

    Ok(tags)
}
