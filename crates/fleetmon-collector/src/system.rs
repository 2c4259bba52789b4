use crate::{round_to, CollectionError, ResourceSampler, Result};
use async_trait::async_trait;
use fleetmon_common::types::{DiskUsage, MemoryUsage, SystemSnapshot};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::{Disks, System, MINIMUM_CPU_UPDATE_INTERVAL};

/// Time between the two CPU readings used to compute utilization.
pub const CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

/// [`ResourceSampler`] backed by `sysinfo`.
///
/// Each [`sample`](ResourceSampler::sample) waits one CPU window, so a
/// cycle always takes at least [`CPU_SAMPLE_WINDOW`] with the default
/// constructor.
pub struct SysinfoSampler {
    system: System,
    disks: Disks,
    cpu_window: Duration,
    volume: PathBuf,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        Self::with_cpu_window(CPU_SAMPLE_WINDOW)
    }

    /// Windows shorter than sysinfo's minimum refresh interval are raised to
    /// that minimum.
    pub fn with_cpu_window(cpu_window: Duration) -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            cpu_window: cpu_window.max(MINIMUM_CPU_UPDATE_INTERVAL),
            volume: PathBuf::from("/"),
        }
    }

    async fn cpu_percent(&mut self) -> Result<f64> {
        self.system.refresh_cpu_usage();
        tokio::time::sleep(self.cpu_window).await;
        self.system.refresh_cpu_usage();
        if self.system.cpus().is_empty() {
            return Err(CollectionError::NoCpu);
        }
        let usage = f64::from(self.system.global_cpu_usage()).clamp(0.0, 100.0);
        Ok(round_to(usage, 1))
    }

    fn memory(&mut self) -> Result<MemoryUsage> {
        self.system.refresh_memory();
        memory_usage(
            self.system.total_memory(),
            self.system.available_memory(),
            self.system.used_memory(),
        )
    }

    fn disk(&mut self) -> Result<DiskUsage> {
        self.disks.refresh();
        let disk = select_volume(
            self.disks.iter().map(|d| d.mount_point()),
            &self.volume,
        )
        .and_then(|idx| self.disks.iter().nth(idx))
        .ok_or_else(|| CollectionError::NoDisk(self.volume.display().to_string()))?;
        disk_usage(disk.total_space(), disk.available_space())
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceSampler for SysinfoSampler {
    async fn sample(&mut self) -> Result<SystemSnapshot> {
        let cpu_percent = self.cpu_percent().await?;
        let memory = self.memory()?;
        let disk = self.disk()?;
        tracing::debug!(
            cpu = cpu_percent,
            memory = memory.percent,
            disk = disk.percent,
            "Sampled system resources"
        );
        Ok(SystemSnapshot {
            cpu_percent,
            memory,
            disk,
        })
    }
}

/// Index of the disk mounted at `volume`, or the first disk when none is.
fn select_volume<'a>(mounts: impl Iterator<Item = &'a Path>, volume: &Path) -> Option<usize> {
    let mut first = None;
    for (idx, mount) in mounts.enumerate() {
        if mount == volume {
            return Some(idx);
        }
        first.get_or_insert(idx);
    }
    first
}

fn memory_usage(total: u64, available: u64, used: u64) -> Result<MemoryUsage> {
    if total == 0 {
        return Err(CollectionError::NoMemory);
    }
    let available = available.min(total);
    let percent = (total - available) as f64 / total as f64 * 100.0;
    Ok(MemoryUsage {
        total,
        available,
        used: used.min(total),
        percent: round_to(percent, 1),
    })
}

fn disk_usage(total: u64, available: u64) -> Result<DiskUsage> {
    let free = available.min(total);
    let used = total - free;
    let percent = if total > 0 {
        used as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    Ok(DiskUsage {
        total,
        used,
        free,
        percent: round_to(percent, 1),
    })
}
