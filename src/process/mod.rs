//! Target discovery and sampling against /proc
//!
//! Resolves PID/name pairs from the kernel's per-process directories and
//! reads the stat fields the trigger samplers compare against their
//! thresholds.

use std::fs;
use std::thread;
use std::time::Duration;

use log::{debug, error, info};

use crate::errors::{MonitorError, Result};

/// Backoff between /proc scans while waiting for a named process.
const SCAN_BACKOFF: Duration = Duration::from_millis(100);

/// Probe whether a process with the given PID exists and is visible.
///
/// Opens `/proc/<pid>/stat`; the open succeeds iff the directory exists and
/// is readable by the current user.
pub fn pid_exists(pid: i32) -> bool {
    fs::File::open(format!("/proc/{}/stat", pid)).is_ok()
}

/// Extract an executable name from a NUL-separated cmdline buffer.
///
/// Takes the first non-empty argv element, skipping a leading `sudo`. When
/// the element is a path, only the component after the last `/` is kept.
pub fn name_from_cmdline(buf: &[u8]) -> Option<String> {
    for part in buf.split(|b| *b == 0) {
        if part.is_empty() {
            continue;
        }
        let text = String::from_utf8_lossy(part);
        if text == "sudo" {
            continue;
        }
        let name = match text.rsplit_once('/') {
            Some((_, base)) => base,
            None => text.as_ref(),
        };
        return Some(name.to_string());
    }
    None
}

/// Read the executable name for a PID from `/proc/<pid>/cmdline`.
pub fn process_name(pid: i32) -> Option<String> {
    let path = format!("/proc/{}/cmdline", pid);
    match fs::read(&path) {
        Ok(buf) if !buf.is_empty() => name_from_cmdline(&buf),
        Ok(_) => {
            debug!("Empty cmdline in {}", path);
            None
        }
        Err(e) => {
            debug!("Failed to read {}: {}", path, e);
            None
        }
    }
}

/// Result of one scan pass over /proc for a process name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScan {
    NoMatch,
    Unique(i32),
    Ambiguous,
}

/// Scan /proc once for processes whose executable name matches.
///
/// Entries are filtered to purely numeric directory names and visited in
/// lexicographic order, so the first-match/second-match policy is
/// reproducible across passes.
pub fn scan_for_name(name: &str) -> Result<NameScan> {
    let mut entries: Vec<String> = Vec::new();
    for entry in fs::read_dir("/proc")? {
        let entry = entry?;
        let file_name = entry.file_name();
        let text = file_name.to_string_lossy();
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            entries.push(text.into_owned());
        }
    }
    entries.sort_unstable();

    let mut matching: Option<i32> = None;
    for entry in &entries {
        let Ok(pid) = entry.parse::<i32>() else {
            continue;
        };
        let Some(candidate) = process_name(pid) else {
            continue;
        };
        if candidate == name {
            if matching.is_none() {
                matching = Some(pid);
            } else {
                return Ok(NameScan::Ambiguous);
            }
        }
    }

    Ok(match matching {
        Some(pid) => NameScan::Unique(pid),
        None => NameScan::NoMatch,
    })
}

/// Wait until exactly one process with the given name exists.
///
/// Rescans /proc with a short backoff until a unique match appears. Two or
/// more matches in a single pass fail the wait.
pub fn wait_for_process_name(name: &str) -> Result<i32> {
    info!("Waiting for process '{}' to launch...", name);
    loop {
        match scan_for_name(name)? {
            NameScan::Unique(pid) => {
                info!("Found process with PID {}", pid);
                return Ok(pid);
            }
            NameScan::Ambiguous => {
                error!("More than one matching process found, exiting...");
                return Err(MonitorError::TargetAmbiguous(name.to_string()));
            }
            NameScan::NoMatch => thread::sleep(SCAN_BACKOFF),
        }
    }
}

/// Accounting fields read from `/proc/<pid>/stat` in one sample.
#[derive(Debug, Clone, Copy)]
pub struct ProcStat {
    /// User-mode CPU time in clock ticks
    pub utime_ticks: u64,
    /// Kernel-mode CPU time in clock ticks
    pub stime_ticks: u64,
    /// Resident set size in pages
    pub rss_pages: u64,
}

impl ProcStat {
    pub fn total_ticks(&self) -> u64 {
        self.utime_ticks + self.stime_ticks
    }
}

/// Read the CPU and memory accounting fields for a PID.
///
/// Fields are indexed after the parenthesized comm, which may itself
/// contain spaces.
pub fn read_stat(pid: i32) -> Result<ProcStat> {
    let path = format!("/proc/{}/stat", pid);
    let content = fs::read_to_string(&path)?;

    // stat: pid (comm) state ppid ... utime(13) stime(14) ... rss(23)
    let after_comm = content
        .rsplit_once(')')
        .map(|(_, rest)| rest)
        .ok_or_else(|| MonitorError::Syscall(format!("Malformed {}", path)))?;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    if fields.len() < 22 {
        return Err(MonitorError::Syscall(format!("Malformed {}", path)));
    }

    // after_comm starts at field index 2 (state)
    let parse = |idx: usize| -> Result<u64> {
        fields[idx - 2]
            .parse()
            .map_err(|_| MonitorError::Syscall(format!("Malformed {}", path)))
    };

    Ok(ProcStat {
        utime_ticks: parse(13)?,
        stime_ticks: parse(14)?,
        rss_pages: parse(23)?,
    })
}
