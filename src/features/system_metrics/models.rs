use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use crate::shared::error::DeliveryError;
use crate::shared::traits::Validatable;

pub(crate) const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;
pub(crate) const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

// Intermediate readings, one per subsystem. Only the flattened snapshot
// goes over the wire.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuInformation {
    pub usage_percent: f64,
    pub load_avg_1: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryInformation {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskInformation {
    pub mount_point: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkInformation {
    pub total_sent_bytes: u64,
    pub total_received_bytes: u64,
    pub active_interface: Option<String>,
    pub sent_bytes_per_sec: f64,
    pub received_bytes_per_sec: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessSummary {
    pub top_name: Option<String>,
    pub top_cpu: Option<f64>,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowerStatus {
    #[serde(rename = "AC")]
    Ac,
    Charging,
    Battery,
    Full,
    Idle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerInformation {
    pub status: Option<PowerStatus>,
    pub battery_percent: Option<f64>,
}

/// One immutable sample of host state, in the shape the collector's public
/// metrics endpoint accepts. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    #[serde(serialize_with = "rfc3339_seconds")]
    pub timestamp: DateTime<Utc>,
    pub hostname: String,
    pub platform: String,
    pub cpu_percent: f64,
    pub load_avg_1: f64,
    pub memory_percent: f64,
    pub memory_used_gb: f64,
    pub memory_total_gb: f64,
    pub disk_percent: f64,
    pub disk_free_gb: f64,
    pub disk_total_gb: f64,
    pub network_sent_mb: f64,
    pub network_recv_mb: f64,
    pub network_sent_mbps: f64,
    pub network_recv_mbps: f64,
    pub top_process_name: Option<String>,
    pub top_process_cpu: Option<f64>,
    pub total_processes: u64,
    pub temperature_celsius: Option<f64>,
    pub power_status: Option<PowerStatus>,
    pub battery_percent: Option<f64>,
    pub network_connected: bool,
    pub network_interface: Option<String>,
    pub uptime_seconds: u64,
}

fn rfc3339_seconds<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

pub(crate) fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        clamp_percent(part as f64 / whole as f64 * 100.0)
    }
}

pub(crate) fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

impl MetricsSnapshot {
    /// Canonical JSON body for delivery. Encoding is deterministic: the same
    /// snapshot always produces the same bytes.
    pub fn encode(&self) -> Result<Vec<u8>, DeliveryError> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Validatable for MetricsSnapshot {
    fn validate(&self) -> Result<(), String> {
        if self.hostname.trim().is_empty() {
            return Err("hostname cannot be empty".to_string());
        }
        if self.platform.trim().is_empty() {
            return Err("platform cannot be empty".to_string());
        }
        for (name, value) in [
            ("cpu_percent", self.cpu_percent),
            ("memory_percent", self.memory_percent),
            ("disk_percent", self.disk_percent),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("{} must be between 0 and 100, got {}", name, value));
            }
        }
        if let Some(battery) = self.battery_percent {
            if !(0.0..=100.0).contains(&battery) {
                return Err(format!("battery_percent must be between 0 and 100, got {}", battery));
            }
        }
        for (name, value) in [
            ("load_avg_1", self.load_avg_1),
            ("memory_used_gb", self.memory_used_gb),
            ("memory_total_gb", self.memory_total_gb),
            ("disk_free_gb", self.disk_free_gb),
            ("disk_total_gb", self.disk_total_gb),
            ("network_sent_mb", self.network_sent_mb),
            ("network_recv_mb", self.network_recv_mb),
            ("network_sent_mbps", self.network_sent_mbps),
            ("network_recv_mbps", self.network_recv_mbps),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a non-negative number, got {}", name, value));
            }
        }
        if self.memory_used_gb > self.memory_total_gb {
            return Err("Used memory cannot exceed total memory".to_string());
        }
        if self.disk_free_gb > self.disk_total_gb {
            return Err("Free disk space cannot exceed total disk space".to_string());
        }
        Ok(())
    }
}
