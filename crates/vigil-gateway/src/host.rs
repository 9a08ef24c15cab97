//! Host resource snapshot (CPU / memory / disk utilisation).
//!
//! Counters are read at call time; nothing is cached between calls. A
//! counter that cannot be read turns the whole snapshot into an explicit
//! error status instead of a silently zeroed field.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::{Disks, System, MINIMUM_CPU_UPDATE_INTERVAL};

use vigil_core::error::{Result, VigilError};

/// Raw counters as read from the OS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawCounters {
    pub cpu_percent: Option<f64>,
    pub memory_used: u64,
    pub memory_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
}

/// Source of host counters. The gateway uses `SysinfoCounters`; tests plug
/// in fixed readings.
pub trait HostCounters: Send + Sync {
    fn read(&self) -> Result<RawCounters>;
}

pub struct SysinfoCounters {
    sys: Mutex<CpuSampler>,
}

struct CpuSampler {
    sys: System,
    last_cpu_refresh: Instant,
}

impl SysinfoCounters {
    pub fn new() -> Self {
        let mut sys = System::new();
        // CPU usage is a delta between two refreshes; prime the first one.
        sys.refresh_cpu();
        Self {
            sys: Mutex::new(CpuSampler {
                sys,
                last_cpu_refresh: Instant::now(),
            }),
        }
    }
}

impl Default for SysinfoCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Time left before a CPU refresh yields a meaningful delta.
fn cpu_settle_delay(since_last_refresh: Duration) -> Duration {
    MINIMUM_CPU_UPDATE_INTERVAL.saturating_sub(since_last_refresh)
}

impl HostCounters for SysinfoCounters {
    /// Blocking: may sleep up to `MINIMUM_CPU_UPDATE_INTERVAL` when called
    /// right after the previous read. Run it off the async workers.
    fn read(&self) -> Result<RawCounters> {
        let mut sampler = self.sys.lock().unwrap_or_else(PoisonError::into_inner);
        let wait = cpu_settle_delay(sampler.last_cpu_refresh.elapsed());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
        sampler.last_cpu_refresh = Instant::now();

        let sys = &mut sampler.sys;
        sys.refresh_cpu();
        sys.refresh_memory();

        let cpus = sys.cpus();
        let cpu_percent = if cpus.is_empty() {
            None
        } else {
            Some(cpus.iter().map(|c| c.cpu_usage() as f64).sum::<f64>() / cpus.len() as f64)
        };

        let disks = Disks::new_with_refreshed_list();
        let (disk_total, disk_available) = disks.iter().fold((0u64, 0u64), |(t, a), d| {
            (t.saturating_add(d.total_space()), a.saturating_add(d.available_space()))
        });

        Ok(RawCounters {
            cpu_percent,
            memory_used: sys.used_memory(),
            memory_total: sys.total_memory(),
            disk_used: disk_total.saturating_sub(disk_available),
            disk_total,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostSnapshot {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub timestamp: DateTime<Utc>,
}

impl HostSnapshot {
    /// Snapshot as `(metric name, value)` pairs, matching threshold names.
    pub fn as_metrics(&self) -> [(&'static str, f64); 3] {
        [
            ("cpu_percent", self.cpu_percent),
            ("memory_percent", self.memory_percent),
            ("disk_percent", self.disk_percent),
        ]
    }
}

/// Either a full snapshot or an explicit error status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HostStatus {
    Ok(HostSnapshot),
    Error { status: &'static str, message: String },
}

impl HostStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, HostStatus::Ok(_))
    }
}

pub struct HostProbe {
    counters: Box<dyn HostCounters>,
    last_timestamp: Mutex<Option<DateTime<Utc>>>,
}

impl HostProbe {
    pub fn new(counters: Box<dyn HostCounters>) -> Self {
        Self {
            counters,
            last_timestamp: Mutex::new(None),
        }
    }

    pub fn system() -> Self {
        Self::new(Box::new(SysinfoCounters::new()))
    }

    /// Read the host counters now. Failures are logged and returned as
    /// `HostStatus::Error`.
    pub fn snapshot(&self) -> HostStatus {
        match self.read() {
            Ok(s) => HostStatus::Ok(s),
            Err(e) => {
                tracing::warn!(error = %e, "host snapshot failed");
                HostStatus::Error {
                    status: "error",
                    message: e.to_string(),
                }
            }
        }
    }

    pub fn read(&self) -> Result<HostSnapshot> {
        let raw = self.counters.read()?;

        let cpu_percent = raw
            .cpu_percent
            .filter(|v| v.is_finite())
            .ok_or_else(|| VigilError::Unavailable("cpu usage counter unavailable".into()))?;
        let memory_percent = percent(raw.memory_used, raw.memory_total)
            .ok_or_else(|| VigilError::Unavailable("memory counters unavailable".into()))?;
        let disk_percent = percent(raw.disk_used, raw.disk_total)
            .ok_or_else(|| VigilError::Unavailable("disk counters unavailable".into()))?;

        Ok(HostSnapshot {
            cpu_percent: cpu_percent.clamp(0.0, 100.0),
            memory_percent,
            disk_percent,
            timestamp: self.next_timestamp(),
        })
    }

    /// Wall clock, held non-decreasing across calls.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let mut last = self
            .last_timestamp
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let ts = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(ts);
        ts
    }
}

fn percent(used: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some((used.min(total) as f64 / total as f64) * 100.0)
}
