//! Timer trigger sampler
//!
//! Active when neither threshold is configured: every elapsed interval is a
//! trigger, so dumps are written on a fixed cadence until the budget is
//! spent.

use std::time::Duration;

use crate::config::MonitorConfig;
use crate::dump::Dumper;
use crate::monitor::WaitOutcome;

pub(crate) fn run(config: &MonitorConfig, dumper: &dyn Dumper) {
    if !super::await_start(config) {
        return;
    }
    let interval = Duration::from_secs(u64::from(config.options.threshold_seconds));

    while config.wait_for_quit(interval) == WaitOutcome::Timeout {
        super::write_dump(config, dumper);
    }
}
