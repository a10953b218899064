//! Monitor controller: thread roster, liveness, and the sampler contract
//!
//! The controller resolves the target, blocks the quit signals, spawns the
//! signal coordinator and one sampler per enabled trigger, releases the
//! start latch, and joins everything at shutdown. Samplers drive their
//! loops through [`MonitorConfig::wait_for_quit`] and
//! [`MonitorConfig::continue_monitoring`].

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::error;
use nix::sys::signal::kill;
use nix::unistd::Pid;

use crate::config::{MonitorConfig, NO_PID, Target};
use crate::dump::Dumper;
use crate::errors::{MonitorError, Result};
use crate::process;
use crate::signals::{self, SignalCoordinator};
use crate::sync::{Event, WaitAny, WaitResult, wait_any};
use crate::triggers;

/// Outcome of a sampler's timed wait against the quit gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The quit event was signaled.
    Quit,
    /// The supplied companion event was signaled.
    Event,
    /// The timeout elapsed and monitoring should continue.
    Timeout,
    /// Monitoring is over: dump limit reached or target gone.
    Abandoned,
}

impl MonitorConfig {
    /// Whether samplers should keep running.
    ///
    /// False once the dump budget is spent, the terminated flag is set, or
    /// the liveness probe fails; each of those conditions is one-way, so a
    /// false answer is final.
    pub fn continue_monitoring(&self) -> bool {
        if self.dumps_collected() >= self.options.dumps_to_collect {
            return false;
        }

        if self.is_terminated() {
            return false;
        }

        // kill with signal 0 delivers nothing but performs the existence
        // and permission checks
        let pid = self.process_id();
        if pid <= NO_PID || kill(Pid::from_raw(pid), None).is_err() {
            self.set_terminated();
            error!("Target process is no longer alive");
            return false;
        }

        true
    }

    /// Timed wait on the quit event, aware of the monitoring state.
    pub fn wait_for_quit(&self, timeout: Duration) -> WaitOutcome {
        if !self.continue_monitoring() {
            return WaitOutcome::Abandoned;
        }

        match self.evt_quit.wait(timeout) {
            WaitResult::Signaled => WaitOutcome::Quit,
            WaitResult::TimedOut => {
                if !self.continue_monitoring() {
                    WaitOutcome::Abandoned
                } else {
                    WaitOutcome::Timeout
                }
            }
        }
    }

    /// Timed wait on the quit event or a companion event.
    ///
    /// Quit wins when both are signaled. A quit observed after monitoring
    /// already ended reports `Abandoned` so callers unwind the same way.
    pub fn wait_for_quit_or_event(&self, event: &Event, timeout: Duration) -> WaitOutcome {
        if !self.continue_monitoring() {
            return WaitOutcome::Abandoned;
        }

        match wait_any(&[&self.evt_quit, event], timeout) {
            WaitAny::Event(0) => {
                if !self.continue_monitoring() {
                    WaitOutcome::Abandoned
                } else {
                    WaitOutcome::Quit
                }
            }
            WaitAny::Event(_) => WaitOutcome::Event,
            WaitAny::TimedOut => {
                if !self.continue_monitoring() {
                    WaitOutcome::Abandoned
                } else {
                    WaitOutcome::Timeout
                }
            }
        }
    }
}

/// The monitor: owns the shared configuration and the dumper.
pub struct Monitor {
    config: Arc<MonitorConfig>,
    dumper: Arc<dyn Dumper>,
}

impl Monitor {
    pub fn new(config: Arc<MonitorConfig>, dumper: Arc<dyn Dumper>) -> Self {
        Self { config, dumper }
    }

    pub fn config(&self) -> &Arc<MonitorConfig> {
        &self.config
    }

    /// Run the monitor to completion.
    ///
    /// Returns once every sampler has exited and the coordinator is joined.
    /// Operator interrupt, a spent dump budget, and a vanished target are
    /// all normal completion; an ambiguous name wait is an error.
    pub fn run(&self) -> Result<()> {
        self.resolve_target()?;

        signals::block_quit_signals()?;
        let coordinator = SignalCoordinator::spawn(Arc::clone(&self.config))?;

        let samplers = self.spawn_samplers()?;
        self.config.begin_monitoring();

        for sampler in samplers {
            sampler
                .join()
                .map_err(|_| MonitorError::Thread("sampler thread panicked".to_string()))?;
        }

        coordinator.shutdown()
    }

    /// Fill in whichever half of the PID/name pair is still missing.
    fn resolve_target(&self) -> Result<()> {
        match &self.config.options.target {
            Target::Name(name) => {
                let pid = process::wait_for_process_name(name).inspect_err(|_| {
                    self.config.set_terminated();
                })?;
                self.config.set_process_id(pid);
            }
            Target::Pid(pid) => {
                if self.config.process_name().is_none() {
                    if let Some(name) = process::process_name(*pid) {
                        self.config.set_process_name(name);
                    }
                }
            }
        }
        Ok(())
    }

    fn spawn_samplers(&self) -> Result<Vec<JoinHandle<()>>> {
        let mut samplers = Vec::with_capacity(3);

        if self.config.options.cpu_threshold.is_some() {
            samplers.push(triggers::spawn_cpu_sampler(
                Arc::clone(&self.config),
                Arc::clone(&self.dumper),
            )?);
        }

        if self.config.options.memory_threshold_mb.is_some() {
            samplers.push(triggers::spawn_memory_sampler(
                Arc::clone(&self.config),
                Arc::clone(&self.dumper),
            )?);
        }

        if self.config.options.timer_only {
            samplers.push(triggers::spawn_timer_sampler(
                Arc::clone(&self.config),
                Arc::clone(&self.dumper),
            )?);
        }

        Ok(samplers)
    }
}
