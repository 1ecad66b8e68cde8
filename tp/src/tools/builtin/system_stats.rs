//! system_stats tool - host summary from std and /proc

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::tools::{Arguments, Tool, ToolError};

/// Report host name, platform, CPU count, load, uptime and memory
pub struct SystemStatsTool;

#[derive(Debug, Default, Serialize, PartialEq)]
struct SystemStats {
    hostname: Option<String>,
    os: &'static str,
    arch: &'static str,
    cpus: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    load_average: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uptime_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory_total_kb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory_available_kb: Option<u64>,
}

#[async_trait]
impl Tool for SystemStatsTool {
    fn name(&self) -> &'static str {
        "system_stats"
    }

    fn description(&self) -> &'static str {
        "Report host name, OS, CPU count, load averages, uptime and memory of the machine running the server."
    }

    fn cacheable(&self) -> bool {
        true
    }

    async fn execute(&self, _args: &Arguments) -> Result<String, ToolError> {
        debug!("SystemStatsTool::execute: called");
        let mut stats = SystemStats {
            hostname: read_proc("/proc/sys/kernel/hostname")
                .await
                .map(|s| s.trim().to_string())
                .or_else(|| std::env::var("HOSTNAME").ok()),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            cpus: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            ..Default::default()
        };

        if let Some(text) = read_proc("/proc/loadavg").await {
            stats.load_average = parse_loadavg(&text);
        }
        if let Some(text) = read_proc("/proc/uptime").await {
            stats.uptime_secs = parse_uptime(&text);
        }
        if let Some(text) = read_proc("/proc/meminfo").await {
            stats.memory_total_kb = parse_meminfo(&text, "MemTotal");
            stats.memory_available_kb = parse_meminfo(&text, "MemAvailable");
        }

        Ok(serde_json::to_string_pretty(&stats)?)
    }
}

async fn read_proc(path: &str) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => Some(s),
        Err(e) => {
            debug!(%path, error = %e, "read_proc: unavailable");
            None
        }
    }
}

fn parse_loadavg(text: &str) -> Option<[f64; 3]> {
    let mut it = text.split_whitespace().map(|s| s.parse::<f64>().ok());
    Some([it.next()??, it.next()??, it.next()??])
}

fn parse_uptime(text: &str) -> Option<u64> {
    let secs: f64 = text.split_whitespace().next()?.parse().ok()?;
    Some(secs as u64)
}

fn parse_meminfo(text: &str, key: &str) -> Option<u64> {
    text.lines().find_map(|line| {
        let (name, rest) = line.split_once(':')?;
        if name.trim() != key {
            return None;
        }
        rest.split_whitespace().next()?.parse().ok()
    })
}
