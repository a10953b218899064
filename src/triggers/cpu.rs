//! CPU trigger sampler

use std::time::{Duration, Instant};

use log::debug;

use crate::config::MonitorConfig;
use crate::dump::Dumper;
use crate::monitor::WaitOutcome;
use crate::process::{self, ProcStat};
use crate::utils::SystemInfo;

pub(crate) fn run(config: &MonitorConfig, dumper: &dyn Dumper) {
    if !super::await_start(config) {
        return;
    }
    let Some(threshold) = config.options.cpu_threshold else {
        return;
    };
    let below = config.options.cpu_below;
    let interval = Duration::from_secs(u64::from(config.options.threshold_seconds));
    let clock_ticks = SystemInfo::get().clock_ticks;

    // the first sample only establishes the baseline
    let mut previous: Option<(ProcStat, Instant)> = None;

    while config.wait_for_quit(interval) == WaitOutcome::Timeout {
        let stat = match process::read_stat(config.process_id()) {
            Ok(stat) => stat,
            Err(e) => {
                debug!("CPU sample failed: {}", e);
                continue;
            }
        };
        let now = Instant::now();

        if let Some((prev, sampled_at)) = previous {
            let delta = stat.total_ticks().saturating_sub(prev.total_ticks());
            let percent = cpu_percent(delta, now.duration_since(sampled_at), clock_ticks);
            debug!("CPU usage for PID {}: {}%", config.process_id(), percent);

            let crossed = if below {
                percent < threshold
            } else {
                percent >= threshold
            };
            if crossed {
                super::write_dump(config, dumper);
            }
        }

        previous = Some((stat, now));
    }
}

/// CPU usage over a sampling window, in percent of one CPU.
///
/// Values above 100 mean the target ran on more than one CPU.
pub(crate) fn cpu_percent(delta_ticks: u64, window: Duration, clock_ticks: u64) -> u32 {
    let window_secs = window.as_secs_f64();
    if window_secs <= 0.0 || clock_ticks == 0 {
        return 0;
    }
    ((delta_ticks as f64 * 100.0) / (clock_ticks as f64 * window_secs)).round() as u32
}
