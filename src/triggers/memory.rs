//! Resident-memory trigger sampler

use std::time::Duration;

use log::debug;

use crate::config::MonitorConfig;
use crate::dump::Dumper;
use crate::monitor::WaitOutcome;
use crate::process;
use crate::utils::SystemInfo;

pub(crate) fn run(config: &MonitorConfig, dumper: &dyn Dumper) {
    if !super::await_start(config) {
        return;
    }
    let Some(threshold) = config.options.memory_threshold_mb else {
        return;
    };
    let below = config.options.memory_below;
    let interval = Duration::from_secs(u64::from(config.options.threshold_seconds));
    let page_size = SystemInfo::get().page_size;

    while config.wait_for_quit(interval) == WaitOutcome::Timeout {
        let stat = match process::read_stat(config.process_id()) {
            Ok(stat) => stat,
            Err(e) => {
                debug!("Memory sample failed: {}", e);
                continue;
            }
        };

        let resident_mb = rss_mib(stat.rss_pages, page_size);
        debug!(
            "Resident memory for PID {}: {} MB",
            config.process_id(),
            resident_mb
        );

        let crossed = if below {
            resident_mb < threshold
        } else {
            resident_mb >= threshold
        };
        if crossed {
            super::write_dump(config, dumper);
        }
    }
}

/// Resident set size in MiB from the page count.
pub(crate) fn rss_mib(rss_pages: u64, page_size: u64) -> u64 {
    rss_pages * page_size / (1024 * 1024)
}
