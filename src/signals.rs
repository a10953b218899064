//! Signal coordination for graceful shutdown
//!
//! INT and TERM are blocked on the controller thread before any worker
//! spawns, so every thread inherits the mask. A dedicated coordinator
//! thread then waits on the set and converts delivery into the quit event,
//! killing any in-flight gcore child's process group on the way out.

use std::os::unix::thread::JoinHandleExt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, info, warn};
use nix::sys::pthread::pthread_kill;
use nix::sys::signal::{self, SigSet, Signal, SigmaskHow};
use nix::unistd::Pid;

use crate::config::MonitorConfig;
use crate::errors::{MonitorError, Result};

fn quit_sigset() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGINT);
    set.add(Signal::SIGTERM);
    set
}

/// Block INT and TERM on the calling thread.
///
/// Must run before any sampler spawns; threads created afterwards inherit
/// the mask and leave delivery to the coordinator.
pub fn block_quit_signals() -> Result<()> {
    signal::pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&quit_sigset()), None)
        .map_err(|e| MonitorError::Syscall(format!("pthread_sigmask failed: {}", e)))
}

/// Handle to the running coordinator thread.
pub struct SignalCoordinator {
    handle: JoinHandle<()>,
}

impl SignalCoordinator {
    /// Spawn the coordinator. Call after [`block_quit_signals`].
    pub fn spawn(config: Arc<MonitorConfig>) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("signal-coordinator".to_string())
            .spawn(move || coordinator_loop(&config))
            .map_err(|e| {
                MonitorError::Thread(format!("failed to create signal thread: {}", e))
            })?;
        Ok(Self { handle })
    }

    /// Wake the coordinator out of its blocking wait and join it.
    ///
    /// The coordinator blocks in sigwait with no cancellation point, so
    /// shutdown delivers TERM directly to the thread. If a real signal
    /// already ended the loop the delivery is a no-op.
    pub fn shutdown(self) -> Result<()> {
        let _ = pthread_kill(self.handle.as_pthread_t(), Signal::SIGTERM);
        self.handle
            .join()
            .map_err(|_| MonitorError::Thread("signal coordinator panicked".to_string()))
    }
}

fn coordinator_loop(config: &MonitorConfig) {
    let set = quit_sigset();
    loop {
        match set.wait() {
            Ok(Signal::SIGINT) | Ok(Signal::SIGTERM) => {
                config.set_quit();

                let gcore_pid = config.gcore_pid();
                if gcore_pid > 0 {
                    info!("Shutting down gcore");
                    // negative PID: kill the whole process group so gcore's
                    // own children are reaped too
                    if let Err(e) = signal::killpg(Pid::from_raw(gcore_pid), Signal::SIGKILL) {
                        error!("Failed to shutdown gcore: {}", e);
                    }
                }

                info!("Quit");
                break;
            }
            Ok(other) => {
                warn!("Unexpected signal {}", other);
            }
            Err(e) => {
                error!("Failed to wait on signal set: {}", e);
                std::process::exit(-1);
            }
        }
    }
}
