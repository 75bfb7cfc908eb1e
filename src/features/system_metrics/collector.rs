use crate::shared::traits::{AsyncDataCollector, Validatable};
use crate::shared::error::CollectionError;
use crate::features::system_metrics::models::{
    clamp_percent, percent_of, CpuInformation, DiskInformation, MemoryInformation,
    MetricsSnapshot, NetworkInformation, PowerInformation, PowerStatus, ProcessSummary,
    BYTES_PER_GIB, BYTES_PER_MIB,
};
use chrono::Utc;
use log::debug;
use std::fs;
use std::path::Path;
use std::time::Instant;
use sysinfo::{Components, Disks, Networks, System, MINIMUM_CPU_UPDATE_INTERVAL};

const IGNORED_INTERFACE_PREFIXES: [&str; 4] = ["lo", "utun", "awdl", "bridge"];
const IGNORED_MOUNT_PREFIXES: [&str; 2] = ["/System", "/dev"];
const SENSOR_HINTS: [&str; 3] = ["cpu", "core", "temp"];
const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

/// Samples host state through sysinfo. Keeps its handles between cycles so
/// CPU usage and network rates are measured over the previous interval.
pub struct SystemMetricsCollector {
    sys: System,
    disks: Disks,
    networks: Networks,
    components: Components,
    last_refresh: Instant,
    hostname: String,
    platform: String,
}

impl SystemMetricsCollector {
    pub fn new() -> Self {
        let sys = System::new_all();
        let hostname = System::host_name()
            .filter(|name| !name.is_empty())
            .or_else(|| whoami::fallible::hostname().ok())
            .unwrap_or_else(|| String::from("unknown"));
        let platform = Some(System::distribution_id())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| whoami::platform().to_string().to_lowercase());

        Self {
            sys,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            components: Components::new_with_refreshed_list(),
            last_refresh: Instant::now(),
            hostname,
            platform,
        }
    }

    pub fn collect_cpu_info(&self) -> CpuInformation {
        CpuInformation {
            usage_percent: clamp_percent(f64::from(self.sys.global_cpu_usage())),
            load_avg_1: System::load_average().one.max(0.0),
        }
    }

    pub fn collect_memory_info(&self) -> MemoryInformation {
        let total_bytes = self.sys.total_memory();
        MemoryInformation {
            total_bytes,
            used_bytes: self.sys.used_memory().min(total_bytes),
        }
    }

    /// The first real mount, skipping system and device mounts.
    pub fn collect_disk_info(&self) -> Option<DiskInformation> {
        self.disks
            .list()
            .iter()
            .filter(|disk| disk.total_space() > 0)
            .find(|disk| {
                let mount = disk.mount_point().to_string_lossy();
                !IGNORED_MOUNT_PREFIXES.iter().any(|prefix| mount.starts_with(prefix))
            })
            .map(|disk| DiskInformation {
                mount_point: disk.mount_point().to_string_lossy().into_owned(),
                total_bytes: disk.total_space(),
                available_bytes: disk.available_space().min(disk.total_space()),
            })
    }

    pub fn collect_network_info(&self, elapsed_secs: f64) -> NetworkInformation {
        let mut info = NetworkInformation::default();
        let mut active_sent = 0u64;
        let mut active_delta = (0u64, 0u64);

        for (name, data) in self.networks.list() {
            if is_virtual_interface(name) {
                continue;
            }
            let (sent, received) = (data.total_transmitted(), data.total_received());
            if sent == 0 && received == 0 {
                continue;
            }
            info.total_sent_bytes += sent;
            info.total_received_bytes += received;

            if info.active_interface.is_none() || sent > active_sent {
                active_sent = sent;
                active_delta = (data.transmitted(), data.received());
                info.active_interface = Some(name.to_string());
            }
        }

        if elapsed_secs > 0.0 {
            info.sent_bytes_per_sec = active_delta.0 as f64 / elapsed_secs;
            info.received_bytes_per_sec = active_delta.1 as f64 / elapsed_secs;
        }
        info
    }

    pub fn collect_process_summary(&self) -> ProcessSummary {
        let processes = self.sys.processes();
        let top = processes
            .values()
            .filter(|process| process.cpu_usage() > 0.0)
            .max_by(|a, b| a.cpu_usage().total_cmp(&b.cpu_usage()));

        ProcessSummary {
            top_name: top.map(|process| process.name().to_string_lossy().into_owned()),
            top_cpu: top.map(|process| f64::from(process.cpu_usage())),
            total: processes.len(),
        }
    }

    /// Prefer a CPU-ish sensor; fall back to the first sensor with a reading.
    pub fn collect_temperature(&self) -> Option<f64> {
        let readings: Vec<(String, f32)> = self
            .components
            .list()
            .iter()
            .filter_map(|c| c.temperature().map(|t| (c.label().to_lowercase(), t)))
            .filter(|(_, t)| t.is_finite())
            .collect();

        readings
            .iter()
            .find(|(label, _)| SENSOR_HINTS.iter().any(|hint| label.contains(hint)))
            .or_else(|| readings.first())
            .map(|(_, t)| f64::from(*t))
    }

    async fn refresh(&mut self) -> f64 {
        let since_last = self.last_refresh.elapsed();
        if since_last < MINIMUM_CPU_UPDATE_INTERVAL {
            tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL - since_last).await;
        }

        self.sys.refresh_all();
        self.disks.refresh(true);
        self.networks.refresh(true);
        self.components.refresh(true);

        let elapsed = self.last_refresh.elapsed().as_secs_f64();
        self.last_refresh = Instant::now();
        elapsed
    }

    fn internal_validate(&self) -> Result<(), CollectionError> {
        if !self.sys.cpus().is_empty() {
            Ok(())
        } else {
            Err(CollectionError::SystemApi("No CPU information available".to_string()))
        }
    }
}

pub(crate) fn is_virtual_interface(name: &str) -> bool {
    IGNORED_INTERFACE_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Read the first battery under a sysfs `power_supply` directory. With no
/// battery present the host is reported as running on AC.
pub(crate) fn read_power_information(root: &Path) -> PowerInformation {
    let ac = PowerInformation {
        status: Some(PowerStatus::Ac),
        battery_percent: None,
    };
    let Ok(entries) = fs::read_dir(root) else {
        return ac;
    };

    let mut supplies: Vec<_> = entries.filter_map(Result::ok).map(|e| e.path()).collect();
    supplies.sort();

    for supply in supplies {
        let kind = read_trimmed(&supply.join("type"));
        if kind.as_deref() != Some("Battery") {
            continue;
        }
        let battery_percent = read_trimmed(&supply.join("capacity"))
            .and_then(|v| v.parse::<f64>().ok())
            .map(clamp_percent);
        let status = match read_trimmed(&supply.join("status")).as_deref() {
            Some("Charging") => PowerStatus::Charging,
            Some("Discharging") => PowerStatus::Battery,
            Some("Full") => PowerStatus::Full,
            Some("Not charging") => PowerStatus::Idle,
            _ => PowerStatus::Ac,
        };
        return PowerInformation {
            status: Some(status),
            battery_percent,
        };
    }
    ac
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

#[async_trait::async_trait]
impl AsyncDataCollector<MetricsSnapshot> for SystemMetricsCollector {
    async fn collect(&mut self) -> Result<MetricsSnapshot, CollectionError> {
        let elapsed_secs = self.refresh().await;

        let cpu = self.collect_cpu_info();
        let memory = self.collect_memory_info();
        let disk = self.collect_disk_info().unwrap_or_default();
        let network = self.collect_network_info(elapsed_secs);
        let processes = self.collect_process_summary();
        let power = read_power_information(Path::new(POWER_SUPPLY_ROOT));

        let snapshot = MetricsSnapshot {
            timestamp: Utc::now(),
            hostname: self.hostname.clone(),
            platform: self.platform.clone(),
            cpu_percent: cpu.usage_percent,
            load_avg_1: cpu.load_avg_1,
            memory_percent: percent_of(memory.used_bytes, memory.total_bytes),
            memory_used_gb: memory.used_bytes as f64 / BYTES_PER_GIB,
            memory_total_gb: memory.total_bytes as f64 / BYTES_PER_GIB,
            disk_percent: percent_of(
                disk.total_bytes - disk.available_bytes,
                disk.total_bytes,
            ),
            disk_free_gb: disk.available_bytes as f64 / BYTES_PER_GIB,
            disk_total_gb: disk.total_bytes as f64 / BYTES_PER_GIB,
            network_sent_mb: network.total_sent_bytes as f64 / BYTES_PER_MIB,
            network_recv_mb: network.total_received_bytes as f64 / BYTES_PER_MIB,
            network_sent_mbps: network.sent_bytes_per_sec / BYTES_PER_MIB,
            network_recv_mbps: network.received_bytes_per_sec / BYTES_PER_MIB,
            top_process_name: processes.top_name,
            top_process_cpu: processes.top_cpu,
            total_processes: processes.total as u64,
            temperature_celsius: self.collect_temperature(),
            power_status: power.status,
            battery_percent: power.battery_percent,
            network_connected: network.active_interface.is_some(),
            network_interface: network.active_interface,
            uptime_seconds: System::uptime(),
        };

        snapshot.validate().map_err(CollectionError::Parse)?;

        debug!(
            "Collected metrics: cpu {:.1}%, memory {:.1}%, disk {:.1}% ({}), {} processes",
            snapshot.cpu_percent,
            snapshot.memory_percent,
            snapshot.disk_percent,
            if disk.mount_point.is_empty() { "no disk" } else { disk.mount_point.as_str() },
            snapshot.total_processes
        );
        Ok(snapshot)
    }

    async fn validate(&self) -> Result<(), CollectionError> {
        self.internal_validate()
    }
}

impl Default for SystemMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
