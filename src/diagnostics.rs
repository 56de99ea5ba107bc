//! Host diagnostics
//!
//! RAM and CPU figures come from `sysinfo`. GPU presence, name and VRAM are
//! detected once via nvidia-smi and cached for the lifetime of the process.

use crate::models::size::size_fmt;
use serde::Serialize;
use std::process::Command;
use std::sync::OnceLock;
use sysinfo::System;

/// Cached GPU information detected at startup
static GPU_INFO: OnceLock<GpuInfo> = OnceLock::new();

const MIB: u64 = 1024 * 1024;

/// One CUDA device as reported by nvidia-smi
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuDevice {
    pub name: String,
    pub memory_total_bytes: u64,
}

/// Information about available GPUs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuInfo {
    pub devices: Vec<GpuDevice>,
}

impl GpuInfo {
    pub fn is_available(&self) -> bool {
        !self.devices.is_empty()
    }

    /// Device reported in diagnostics
    pub fn primary(&self) -> Option<&GpuDevice> {
        self.devices.first()
    }
}

/// Parse `nvidia-smi --query-gpu=name,memory.total --format=csv,noheader,nounits`
///
/// Memory is reported in MiB. Lines that do not parse are skipped.
pub fn parse_nvidia_smi(stdout: &str) -> Vec<GpuDevice> {
    stdout
        .lines()
        .filter_map(|line| {
            let (name, memory) = line.rsplit_once(',')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let mib: u64 = memory.trim().parse().ok()?;
            Some(GpuDevice {
                name: name.to_string(),
                memory_total_bytes: mib * MIB,
            })
        })
        .collect()
}

/// Detect available GPUs using nvidia-smi
pub fn detect_gpus() -> GpuInfo {
    let output = Command::new("nvidia-smi")
        .args([
            "--query-gpu=name,memory.total",
            "--format=csv,noheader,nounits",
        ])
        .output();

    match output {
        Ok(output) if output.status.success() => {
            let devices = parse_nvidia_smi(&String::from_utf8_lossy(&output.stdout));

            tracing::info!(
                gpu_count = devices.len(),
                primary = ?devices.first().map(|d| &d.name),
                "Detected available GPUs"
            );

            GpuInfo { devices }
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                stderr = %stderr,
                "nvidia-smi failed, assuming no GPUs available"
            );
            GpuInfo::default()
        }
        Err(e) => {
            tracing::info!(
                error = %e,
                "nvidia-smi not available, assuming no GPUs available"
            );
            GpuInfo::default()
        }
    }
}

/// Initialize GPU detection (call once at startup)
pub fn init() -> &'static GpuInfo {
    GPU_INFO.get_or_init(detect_gpus)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RamSection {
    #[serde(rename = "Totale")]
    pub total: String,
    #[serde(rename = "Utilisée")]
    pub used_percent: String,
    #[serde(rename = "Libre")]
    pub available: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuSection {
    #[serde(rename = "Cœurs")]
    pub physical_cores: Option<usize>,
    #[serde(rename = "Threads")]
    pub threads: usize,
    #[serde(rename = "Fréquence")]
    pub frequency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuSection {
    #[serde(rename = "Disponible")]
    pub available: &'static str,
    #[serde(rename = "Nom GPU", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "VRAM", skip_serializing_if = "Option::is_none")]
    pub vram: Option<String>,
}

impl GpuSection {
    pub fn from_info(info: &GpuInfo) -> Self {
        match info.primary() {
            Some(device) => Self {
                available: "Oui",
                name: Some(device.name.clone()),
                vram: Some(size_fmt(device.memory_total_bytes)),
            },
            None => Self {
                available: "Non",
                name: None,
                vram: None,
            },
        }
    }
}

/// Full diagnostics report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    #[serde(rename = "RAM")]
    pub ram: RamSection,
    #[serde(rename = "CPU")]
    pub cpu: CpuSection,
    #[serde(rename = "GPU/CUDA")]
    pub gpu: GpuSection,
}

/// Format a CPU frequency given in MHz
pub fn frequency_fmt(mhz: u64) -> String {
    if mhz == 0 {
        "N/A".to_string()
    } else {
        format!("{:.1}GHz", mhz as f64 / 1000.0)
    }
}

fn used_percent(total: u64, available: u64) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    let used = total.saturating_sub(available);
    format!("{:.1}%", used as f64 * 100.0 / total as f64)
}

/// Collect a fresh report
///
/// Blocking: refreshing `sysinfo` reads `/proc` and samples the CPUs.
pub fn collect(gpu: &GpuInfo) -> Diagnostics {
    let sys = System::new_all();

    let total = sys.total_memory();
    let available = sys.available_memory();
    let max_frequency = sys.cpus().iter().map(|c| c.frequency()).max().unwrap_or(0);

    Diagnostics {
        ram: RamSection {
            total: size_fmt(total),
            used_percent: used_percent(total, available),
            available: size_fmt(available),
        },
        cpu: CpuSection {
            physical_cores: sys.physical_core_count(),
            threads: sys.cpus().len(),
            frequency: frequency_fmt(max_frequency),
        },
        gpu: GpuSection::from_info(gpu),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nvidia_smi() {
        let out = "NVIDIA GeForce RTX 4090, 24564\nNVIDIA A100-SXM4-80GB, 81920\n";
        let devices = parse_nvidia_smi(out);

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "NVIDIA GeForce RTX 4090");
        assert_eq!(devices[0].memory_total_bytes, 24564 * MIB);
        assert_eq!(devices[1].name, "NVIDIA A100-SXM4-80GB");
    }

    #[test]
    fn test_parse_nvidia_smi_skips_garbage() {
        let out = "No devices were found\n, 100\nTesla T4, [N/A]\n";
        assert!(parse_nvidia_smi(out).is_empty());
    }

    #[test]
    fn test_gpu_section_available() {
        let info = GpuInfo {
            devices: vec![GpuDevice {
                name: "Tesla T4".to_string(),
                memory_total_bytes: 16 * 1024 * MIB,
            }],
        };
        let json = serde_json::to_value(GpuSection::from_info(&info)).unwrap();

        assert_eq!(json["Disponible"], "Oui");
        assert_eq!(json["Nom GPU"], "Tesla T4");
        assert_eq!(json["VRAM"], "16.0GB");
    }

    #[test]
    fn test_gpu_section_unavailable() {
        let json = serde_json::to_value(GpuSection::from_info(&GpuInfo::default())).unwrap();
        assert_eq!(json, serde_json::json!({"Disponible": "Non"}));
    }

    #[test]
    fn test_frequency_fmt() {
        assert_eq!(frequency_fmt(0), "N/A");
        assert_eq!(frequency_fmt(3600), "3.6GHz");
        assert_eq!(frequency_fmt(4700), "4.7GHz");
    }

    #[test]
    fn test_used_percent() {
        assert_eq!(used_percent(100, 25), "75.0%");
        assert_eq!(used_percent(0, 0), "0.0%");
        assert_eq!(used_percent(100, 200), "0.0%");
    }

    #[test]
    fn test_collect_has_all_sections() {
        let report = collect(&GpuInfo::default());
        let json = serde_json::to_value(&report).unwrap();

        assert!(json["RAM"]["Totale"].is_string());
        assert!(json["CPU"]["Threads"].is_number());
        assert_eq!(json["GPU/CUDA"]["Disponible"], "Non");
    }
}
