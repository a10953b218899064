//! Core dump generation via a gcore child process

use std::path::PathBuf;
use std::process::{Command, Stdio};

use log::{debug, info};

use crate::config::MonitorConfig;
use crate::errors::{MonitorError, Result};

/// Writes one core-image snapshot of the target.
///
/// Implementations run with the dump slot held, so at most one dump is in
/// flight at any time.
pub trait Dumper: Send + Sync {
    /// Write dump number `seq` for the configured target, returning the
    /// path of the image.
    fn dump(&self, config: &MonitorConfig, seq: u32) -> Result<PathBuf>;
}

/// Dumper that shells out to gcore.
///
/// The child runs in its own process group and its PID is published to the
/// configuration while it is in flight, so the signal coordinator can kill
/// the whole group on operator interrupt.
pub struct GcoreDumper {
    program: String,
    output_dir: PathBuf,
}

impl GcoreDumper {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            program: "gcore".to_string(),
            output_dir,
        }
    }

    #[cfg(test)]
    fn with_program(program: &str, output_dir: PathBuf) -> Self {
        Self {
            program: program.to_string(),
            output_dir,
        }
    }
}

impl Default for GcoreDumper {
    fn default() -> Self {
        Self::new(PathBuf::from("."))
    }
}

impl Dumper for GcoreDumper {
    fn dump(&self, config: &MonitorConfig, seq: u32) -> Result<PathBuf> {
        use std::os::unix::process::CommandExt;

        let pid = config.process_id();
        let name = config
            .process_name()
            .unwrap_or_else(|| format!("pid{}", pid));
        let prefix = self.output_dir.join(format!("{}_{}", name, seq));

        debug!("Spawning {} for PID {}", self.program, pid);
        let mut child = Command::new(&self.program)
            .arg("-o")
            .arg(&prefix)
            .arg(pid.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .map_err(|e| MonitorError::Dump(format!("failed to launch {}: {}", self.program, e)))?;

        config.set_gcore_pid(child.id() as i32);
        let status = child.wait();
        config.clear_gcore_pid();

        let status =
            status.map_err(|e| MonitorError::Dump(format!("failed to reap dump child: {}", e)))?;
        if !status.success() {
            return Err(MonitorError::Dump(format!(
                "{} exited with {}",
                self.program, status
            )));
        }

        // gcore appends the PID to the requested prefix
        let path = PathBuf::from(format!("{}.{}", prefix.display(), pid));
        info!("Core dump generated: {}", path.display());
        Ok(path)
    }
}
