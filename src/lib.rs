//! procdump-rs: process dump utility for Linux
//!
//! Watches a single target process and writes a bounded number of core
//! dumps when the target crosses configured CPU or resident-memory
//! thresholds, or on a pure timer. Several sampler threads share one dump
//! budget, honor a global quit signal, and handle the target dying
//! mid-sample.
//!
//! # Modules
//!
//! - **sync**: manual-reset events and the dump-slot semaphore
//! - **process**: PID/name discovery and /proc sampling
//! - **cli** / **config**: option grammar and the shared configuration record
//! - **signals**: the dedicated INT/TERM coordinator thread
//! - **monitor**: the controller and the sampler contract
//! - **triggers**: CPU, resident-memory, and timer samplers
//! - **dump**: core dump generation via a gcore child
//!
//! # Example
//!
//! ```ignore
//! use procdump_rs::{Cli, GcoreDumper, Monitor, MonitorConfig};
//! use clap::Parser;
//! use std::sync::Arc;
//!
//! let options = Cli::parse().into_options()?;
//! let config = Arc::new(MonitorConfig::new(options));
//! config.print_banner();
//! config.print_configuration();
//!
//! let monitor = Monitor::new(config, Arc::new(GcoreDumper::default()));
//! monitor.run()?;
//! ```

// Core modules
pub mod errors;
pub mod utils;

// Layered modules
pub mod cli;
pub mod config;
pub mod dump;
pub mod logging;
pub mod process;
pub mod signals;
pub mod sync;
pub mod triggers;

// Main controller
pub mod monitor;

// Public API
pub use cli::Cli;
pub use config::{MonitorConfig, MonitorOptions, Target};
pub use dump::{Dumper, GcoreDumper};
pub use errors::{MonitorError, Result};
pub use monitor::{Monitor, WaitOutcome};
pub use sync::{Event, EventSet, Semaphore};
