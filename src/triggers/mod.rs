//! Trigger samplers: CPU, resident memory, and timer
//!
//! One thread per enabled trigger. Every sampler waits for the
//! start-monitoring latch, then loops on the quit-aware timed wait; a
//! timeout is a sampling tick, anything else ends the loop. On trigger the
//! sampler takes the dump slot, re-checks the monitoring state, and invokes
//! the dumper.

mod cpu;
mod memory;
mod timer;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info};

use crate::config::MonitorConfig;
use crate::dump::Dumper;
use crate::errors::{MonitorError, Result};
use crate::sync::{WaitAny, wait_any};

pub fn spawn_cpu_sampler(
    config: Arc<MonitorConfig>,
    dumper: Arc<dyn Dumper>,
) -> Result<JoinHandle<()>> {
    spawn_sampler("cpu-sampler", move || cpu::run(&config, dumper.as_ref()))
}

pub fn spawn_memory_sampler(
    config: Arc<MonitorConfig>,
    dumper: Arc<dyn Dumper>,
) -> Result<JoinHandle<()>> {
    spawn_sampler("memory-sampler", move || {
        memory::run(&config, dumper.as_ref())
    })
}

pub fn spawn_timer_sampler(
    config: Arc<MonitorConfig>,
    dumper: Arc<dyn Dumper>,
) -> Result<JoinHandle<()>> {
    spawn_sampler("timer-sampler", move || timer::run(&config, dumper.as_ref()))
}

fn spawn_sampler<F>(name: &str, body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|e| MonitorError::Thread(format!("failed to create {}: {}", name, e)))
}

/// Sampler prologue: block until monitoring starts.
///
/// False when the quit event fires first, so a sampler spawned into an
/// already-aborted run exits without a cold-start read.
fn await_start(config: &MonitorConfig) -> bool {
    matches!(
        wait_any(
            &[&config.evt_quit, &config.evt_start_monitoring],
            Duration::MAX,
        ),
        WaitAny::Event(1)
    )
}

/// Take the dump slot and invoke the dumper once.
///
/// The monitoring state is re-checked with the slot held: a concurrent
/// sampler may have spent the last budget slot while we were blocked, and
/// the budget must never be exceeded.
fn write_dump(config: &MonitorConfig, dumper: &dyn Dumper) {
    config.dump_slots.acquire();
    if config.continue_monitoring() {
        let seq = config.dumps_collected() + 1;
        match dumper.dump(config, seq) {
            Ok(path) => {
                let collected = config.increment_dumps_collected();
                info!(
                    "Core dump {} of {} written to {}",
                    collected,
                    config.options.dumps_to_collect,
                    path.display()
                );
            }
            Err(e) => error!("Failed to write core dump: {}", e),
        }
    }
    config.dump_slots.release();
}
