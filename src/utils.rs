//! System facts cached once per process

use std::sync::OnceLock;

static SYSTEM_INFO: OnceLock<SystemInfo> = OnceLock::new();

/// Kernel accounting parameters read from sysconf at first use.
///
/// Every caller after the first observes the same sealed values, so option
/// validation and the samplers agree on the CPU ceiling and tick rate.
#[derive(Debug)]
pub struct SystemInfo {
    /// Number of online CPUs
    pub cpu_count: u32,
    /// Upper bound for CPU thresholds (100 per CPU)
    pub max_cpu: u32,
    /// Kernel clock ticks per second (_SC_CLK_TCK)
    pub clock_ticks: u64,
    /// Page size in bytes (_SC_PAGESIZE)
    pub page_size: u64,
}

impl SystemInfo {
    /// Get the process-wide system info, probing sysconf on the first call.
    pub fn get() -> &'static SystemInfo {
        SYSTEM_INFO.get_or_init(|| {
            let cpu_count = read_sysconf(libc::_SC_NPROCESSORS_ONLN, 1) as u32;
            SystemInfo {
                cpu_count,
                max_cpu: 100 * cpu_count,
                clock_ticks: read_sysconf(libc::_SC_CLK_TCK, 100) as u64,
                page_size: read_sysconf(libc::_SC_PAGESIZE, 4096) as u64,
            }
        })
    }
}

fn read_sysconf(name: libc::c_int, fallback: i64) -> i64 {
    let value = unsafe { libc::sysconf(name) } as i64;
    if value > 0 { value } else { fallback }
}
