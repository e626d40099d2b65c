//! Accelerator preflight probing.
//!
//! Used by the CLI `info` command and by automatic device selection. The
//! `GRIDCHECK_GPU_FAKE` environment variable overrides real detection so
//! probing behaviour stays deterministic in tests: set it to `cuda` to fake
//! an available accelerator or `none` to fake its absence.

use std::env;
use std::process::Command;

/// Detected accelerator availability.
#[derive(Debug, Clone)]
pub struct AcceleratorInfo {
    /// Whether a CUDA runtime answered the probe.
    pub cuda: bool,
    /// Driver-reported CUDA version, when available.
    pub cuda_version: Option<String>,
    /// Whether CUDA support was compiled into this binary.
    pub cuda_compiled: bool,
}

impl AcceleratorInfo {
    /// Whether any accelerator can actually be used by this binary.
    pub fn usable(&self) -> bool {
        self.cuda && self.cuda_compiled
    }

    /// Human-readable capability summary.
    pub fn summary(&self) -> String {
        let compiled = if self.cuda_compiled { "yes" } else { "no" };
        let runtime = match (&self.cuda, &self.cuda_version) {
            (true, Some(v)) => format!("CUDA {v}"),
            (true, None) => "CUDA".to_string(),
            (false, _) => "none".to_string(),
        };
        format!("accelerator: {runtime} (cuda compiled in: {compiled})")
    }
}

/// Probe the host for an accelerator.
pub fn detect() -> AcceleratorInfo {
    let cuda_compiled = cfg!(feature = "cuda");

    if let Ok(fake) = env::var("GRIDCHECK_GPU_FAKE") {
        let cuda = fake.to_lowercase().contains("cuda");
        return AcceleratorInfo { cuda, cuda_version: None, cuda_compiled };
    }

    let cuda = Command::new("nvidia-smi")
        .arg("--query-gpu=gpu_name")
        .arg("--format=csv,noheader")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false);

    let cuda_version = if cuda { cuda_version_from_smi() } else { None };

    AcceleratorInfo { cuda, cuda_version, cuda_compiled }
}

fn cuda_version_from_smi() -> Option<String> {
    let output = Command::new("nvidia-smi").output().ok()?;
    let text = String::from_utf8_lossy(&output.stdout);
    text.lines()
        .find(|line| line.contains("CUDA Version"))
        .and_then(|line| line.split("CUDA Version:").nth(1))
        .map(|v| v.trim().trim_end_matches('|').trim().to_string())
}
