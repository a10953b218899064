//! Monitor configuration: the one record every thread shares
//!
//! The record is sealed before samplers start; the handful of runtime
//! fields (dump budget, terminated flag, quit counter, gcore child PID) are
//! atomics so no broader lock is needed.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::time::Duration;

use log::error;

use crate::process;
use crate::sync::{Event, EventSet, Semaphore, WaitResult};

/// Sentinel for "no gcore child in flight".
pub const NO_PID: i32 = 0;

/// Default number of dumps collected before the monitor exits.
pub const DEFAULT_NUMBER_OF_DUMPS: u32 = 1;

/// Default seconds between samples.
pub const DEFAULT_THRESHOLD_SECONDS: u32 = 10;

/// How the target process is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A PID supplied on the command line, verified to exist.
    Pid(i32),
    /// An executable name to wait for.
    Name(String),
}

/// Validated option set produced by the CLI layer.
///
/// Parsing the same argv twice yields equal option sets; everything mutable
/// at runtime lives in [`MonitorConfig`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    pub target: Target,
    /// CPU threshold in percent; `None` disables the CPU trigger.
    pub cpu_threshold: Option<u32>,
    /// Trigger when CPU drops below the threshold instead of at-or-above.
    pub cpu_below: bool,
    /// Resident memory threshold in MiB; `None` disables the memory trigger.
    pub memory_threshold_mb: Option<u64>,
    /// Trigger when memory drops below the threshold instead of at-or-above.
    pub memory_below: bool,
    /// True iff neither threshold is set and dumps run on a pure timer.
    pub timer_only: bool,
    /// Seconds between samples, > 0.
    pub threshold_seconds: u32,
    pub dumps_to_collect: u32,
    pub diagnostics: bool,
}

/// The shared monitor configuration record.
///
/// Construction resolves the target name for the PID form, creates the
/// named events and the dump-slot semaphore, and zeroes the counters. The
/// record is then shared as `Arc<MonitorConfig>`; only the runtime fields
/// below change after monitoring begins.
pub struct MonitorConfig {
    pub options: MonitorOptions,

    // Target identity; the name form's PID is resolved by the controller
    // before any sampler spawns.
    process_id: AtomicI32,
    process_name: Mutex<Option<String>>,

    // Runtime state
    dumps_collected: AtomicU32,
    terminated: AtomicBool,
    quit: AtomicU32,
    gcore_pid: AtomicI32,

    // Named events, all members of one set so samplers can multi-wait
    pub evt_quit: Event,
    pub evt_start_monitoring: Event,
    evt_banner_printed: Event,
    evt_configuration_printed: Event,

    /// Dump slot: at most one dump child in flight.
    pub dump_slots: Semaphore,
}

impl MonitorConfig {
    pub fn new(options: MonitorOptions) -> Self {
        let events = EventSet::new();
        let evt_quit = events.register("Quit");
        let evt_start_monitoring = events.register("StartMonitoring");
        let evt_banner_printed = events.register("BannerPrinted");
        let evt_configuration_printed = events.register("ConfigurationPrinted");

        let (pid, name) = match &options.target {
            Target::Pid(pid) => {
                let name = process::process_name(*pid);
                if name.is_none() {
                    error!("Error getting process name.");
                }
                (*pid, name)
            }
            Target::Name(name) => (NO_PID, Some(name.clone())),
        };

        Self {
            options,
            process_id: AtomicI32::new(pid),
            process_name: Mutex::new(name),
            dumps_collected: AtomicU32::new(0),
            terminated: AtomicBool::new(false),
            quit: AtomicU32::new(0),
            gcore_pid: AtomicI32::new(NO_PID),
            evt_quit,
            evt_start_monitoring,
            evt_banner_printed,
            evt_configuration_printed,
            dump_slots: Semaphore::new(1),
        }
    }

    pub fn process_id(&self) -> i32 {
        self.process_id.load(Ordering::Acquire)
    }

    pub fn set_process_id(&self, pid: i32) {
        self.process_id.store(pid, Ordering::Release);
    }

    pub fn process_name(&self) -> Option<String> {
        self.process_name.lock().expect("name poisoned").clone()
    }

    pub fn set_process_name(&self, name: String) {
        *self.process_name.lock().expect("name poisoned") = Some(name);
    }

    pub fn waiting_for_name(&self) -> bool {
        matches!(self.options.target, Target::Name(_))
    }

    pub fn dumps_collected(&self) -> u32 {
        self.dumps_collected.load(Ordering::Acquire)
    }

    /// Count one collected dump; called with the dump slot held, after the
    /// dump child succeeded and before the slot is released.
    pub fn increment_dumps_collected(&self) -> u32 {
        self.dumps_collected.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// One-way: the target is known dead or ambiguous.
    pub fn set_terminated(&self) {
        self.terminated.store(true, Ordering::Release);
    }

    pub fn is_quit(&self) -> bool {
        self.quit.load(Ordering::Acquire) != 0
    }

    /// Set the quit counter and signal the quit event, waking every sampler.
    pub fn set_quit(&self) {
        self.quit.store(1, Ordering::Release);
        self.evt_quit.signal();
    }

    pub fn gcore_pid(&self) -> i32 {
        self.gcore_pid.load(Ordering::Acquire)
    }

    pub fn set_gcore_pid(&self, pid: i32) {
        self.gcore_pid.store(pid, Ordering::Release);
    }

    pub fn clear_gcore_pid(&self) {
        self.gcore_pid.store(NO_PID, Ordering::Release);
    }

    /// Release the samplers waiting in their cold-start prologue.
    pub fn begin_monitoring(&self) {
        self.evt_start_monitoring.signal();
    }

    /// Print the startup banner, at most once per process lifetime.
    pub fn print_banner(&self) -> bool {
        if self.evt_banner_printed.wait(Duration::ZERO) == WaitResult::TimedOut {
            println!(
                "\nProcDump v{} - process dump utility for Linux",
                env!("CARGO_PKG_VERSION")
            );
            println!("Monitors a process and writes a core dump when it exceeds the specified criteria.\n");
            self.evt_banner_printed.signal();
            return true;
        }
        false
    }

    /// Echo the active configuration, at most once per process lifetime.
    pub fn print_configuration(&self) -> bool {
        if self.evt_configuration_printed.wait(Duration::ZERO) != WaitResult::TimedOut {
            return false;
        }

        let name = self.process_name().unwrap_or_else(|| "<unknown>".to_string());
        if self.waiting_for_name() {
            println!("Process:\t\t{} (pending)", name);
        } else {
            println!("Process:\t\t{} ({})", name, self.process_id());
        }

        match self.options.cpu_threshold {
            Some(threshold) if self.options.cpu_below => {
                println!("CPU Threshold:\t\t<{}", threshold)
            }
            Some(threshold) => println!("CPU Threshold:\t\t>={}", threshold),
            None => println!("CPU Threshold:\t\tn/a"),
        }

        match self.options.memory_threshold_mb {
            Some(threshold) if self.options.memory_below => {
                println!("Commit Threshold:\t<{}", threshold)
            }
            Some(threshold) => println!("Commit Threshold:\t>={}", threshold),
            None => println!("Commit Threshold:\tn/a"),
        }

        println!("Threshold Seconds:\t{}", self.options.threshold_seconds);
        println!("Number of Dumps:\t{}", self.options.dumps_to_collect);

        self.evt_configuration_printed.signal();
        true
    }
}
