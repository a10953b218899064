//! Command line interface for procdump

use clap::{ArgAction, Parser};

use crate::config::{
    DEFAULT_NUMBER_OF_DUMPS, DEFAULT_THRESHOLD_SECONDS, MonitorOptions, Target,
};
use crate::errors::{MonitorError, Result};
use crate::process;
use crate::utils::SystemInfo;

#[derive(Parser, Debug)]
#[command(name = "procdump")]
#[command(version, about = "Monitors a process and writes a core dump when it exceeds the specified criteria", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Write 3 dumps of PID 4242, one per second
    procdump -p 4242 -n 3 -s 1

    # Dump when CPU usage reaches 65%
    procdump -p 4242 -C 65

    # Dump when resident memory drops below 100 MB
    procdump -p 4242 -m 100

    # Wait for a process named stress to launch, then monitor it
    procdump -w stress -M 512
")]
pub struct Cli {
    /// PID of the target process
    #[arg(short = 'p', long = "pid", value_name = "PID", conflicts_with = "wait")]
    pub pid: Option<i32>,

    /// CPU threshold at or above which to write a dump (0 to 100 * nCPU)
    ///
    /// Thresholds collect into vectors so a repeated flag is caught during
    /// validation instead of silently keeping the last value.
    #[arg(
        short = 'C',
        long = "cpu",
        value_name = "PERCENT",
        action = ArgAction::Append,
        conflicts_with = "lower_cpu"
    )]
    pub cpu: Vec<u32>,

    /// CPU threshold below which to write a dump
    #[arg(
        short = 'c',
        long = "lower-cpu",
        value_name = "PERCENT",
        action = ArgAction::Append
    )]
    pub lower_cpu: Vec<u32>,

    /// Resident memory threshold in MB at or above which to write a dump
    #[arg(
        short = 'M',
        long = "memory",
        value_name = "MB",
        action = ArgAction::Append,
        conflicts_with = "lower_mem"
    )]
    pub memory: Vec<u64>,

    /// Resident memory threshold in MB below which to write a dump
    #[arg(
        short = 'm',
        long = "lower-mem",
        value_name = "MB",
        action = ArgAction::Append
    )]
    pub lower_mem: Vec<u64>,

    /// Number of dumps to write before exiting
    #[arg(
        short = 'n',
        long = "number-of-dumps",
        value_name = "COUNT",
        default_value_t = DEFAULT_NUMBER_OF_DUMPS
    )]
    pub number_of_dumps: u32,

    /// Consecutive seconds between samples before a dump is written
    #[arg(
        short = 's',
        long = "time-between-dumps",
        value_name = "SECONDS",
        default_value_t = DEFAULT_THRESHOLD_SECONDS
    )]
    pub time_between_dumps: u32,

    /// Wait for a process with this executable name to launch
    #[arg(short = 'w', long = "wait", value_name = "NAME")]
    pub wait: Option<String>,

    /// Write diagnostic logs
    #[arg(short = 'd', long = "diag")]
    pub diag: bool,
}

/// Reduce a repeatable flag to at most one occurrence.
fn at_most_once<T: Copy>(values: &[T], flag: &str) -> Result<Option<T>> {
    match values {
        [] => Ok(None),
        [value] => Ok(Some(*value)),
        _ => Err(MonitorError::InvalidConfig(format!(
            "Please only specify {} once",
            flag
        ))),
    }
}

impl Cli {
    /// Validate the parsed arguments into a sealed option set.
    ///
    /// Checks the bounds clap cannot express: each threshold given at most
    /// once, the CPU ceiling for this machine, threshold seconds > 0,
    /// exactly one target, and that a PID target actually exists.
    pub fn into_options(self) -> Result<MonitorOptions> {
        let sys = SystemInfo::get();

        let cpu = at_most_once(&self.cpu, "-C")?;
        let lower_cpu = at_most_once(&self.lower_cpu, "-c")?;
        let (cpu_threshold, cpu_below) = match (cpu, lower_cpu) {
            (Some(threshold), None) => (Some(threshold), false),
            (None, Some(threshold)) => (Some(threshold), true),
            (None, None) => (None, false),
            (Some(_), Some(_)) => {
                return Err(MonitorError::InvalidConfig(
                    "Please only specify one of -C or -c".to_string(),
                ));
            }
        };
        if let Some(threshold) = cpu_threshold {
            if threshold > sys.max_cpu {
                return Err(MonitorError::InvalidConfig(format!(
                    "Invalid CPU threshold specified: must lie between 0 and {}",
                    sys.max_cpu
                )));
            }
        }

        let memory = at_most_once(&self.memory, "-M")?;
        let lower_mem = at_most_once(&self.lower_mem, "-m")?;
        let (memory_threshold_mb, memory_below) = match (memory, lower_mem) {
            (Some(threshold), None) => (Some(threshold), false),
            (None, Some(threshold)) => (Some(threshold), true),
            (None, None) => (None, false),
            (Some(_), Some(_)) => {
                return Err(MonitorError::InvalidConfig(
                    "Please only specify one of -M or -m".to_string(),
                ));
            }
        };

        if self.time_between_dumps == 0 {
            return Err(MonitorError::InvalidConfig(
                "Invalid time threshold specified: must be greater than zero".to_string(),
            ));
        }

        let target = match (self.pid, self.wait) {
            (Some(pid), None) => {
                if !process::pid_exists(pid) {
                    return Err(MonitorError::TargetNotFound(pid));
                }
                Target::Pid(pid)
            }
            (None, Some(name)) => Target::Name(name),
            (None, None) => {
                return Err(MonitorError::InvalidConfig(
                    "A valid PID or process name must be specified".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(MonitorError::InvalidConfig(
                    "Please only specify one of -p or -w".to_string(),
                ));
            }
        };

        // No thresholds but a dump count: run on a pure timer.
        let timer_only = cpu_threshold.is_none() && memory_threshold_mb.is_none();

        Ok(MonitorOptions {
            target,
            cpu_threshold,
            cpu_below,
            memory_threshold_mb,
            memory_below,
            timer_only,
            threshold_seconds: self.time_between_dumps,
            dumps_to_collect: self.number_of_dumps,
            diagnostics: self.diag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn self_pid() -> String {
        std::process::id().to_string()
    }

    #[test]
    fn test_timer_only_derived_when_no_thresholds() {
        let pid = self_pid();
        let options = parse(&["procdump", "-p", &pid, "-n", "3", "-s", "1"])
            .into_options()
            .unwrap();
        assert!(options.timer_only);
        assert_eq!(options.dumps_to_collect, 3);
        assert_eq!(options.threshold_seconds, 1);
    }

    #[test]
    fn test_thresholds_disable_timer_only() {
        let pid = self_pid();
        let options = parse(&["procdump", "-p", &pid, "-C", "50"])
            .into_options()
            .unwrap();
        assert!(!options.timer_only);
        assert_eq!(options.cpu_threshold, Some(50));
        assert!(!options.cpu_below);
    }

    #[test]
    fn test_lower_cpu_sets_below_direction() {
        let pid = self_pid();
        let options = parse(&["procdump", "-p", &pid, "-c", "10"])
            .into_options()
            .unwrap();
        assert_eq!(options.cpu_threshold, Some(10));
        assert!(options.cpu_below);
    }

    #[test]
    fn test_lower_mem_sets_below_direction() {
        let pid = self_pid();
        let options = parse(&["procdump", "-p", &pid, "-m", "100"])
            .into_options()
            .unwrap();
        assert_eq!(options.memory_threshold_mb, Some(100));
        assert!(options.memory_below);
    }

    #[test]
    fn test_cpu_zero_accepted() {
        let pid = self_pid();
        let options = parse(&["procdump", "-p", &pid, "-C", "0"])
            .into_options()
            .unwrap();
        assert_eq!(options.cpu_threshold, Some(0));
    }

    #[test]
    fn test_cpu_over_machine_ceiling_rejected() {
        let pid = self_pid();
        let over = (SystemInfo::get().max_cpu + 1).to_string();
        let result = parse(&["procdump", "-p", &pid, "-C", &over]).into_options();
        assert!(matches!(result, Err(MonitorError::InvalidConfig(_))));
    }

    #[test]
    fn test_cpu_non_numeric_rejected() {
        assert!(Cli::try_parse_from(["procdump", "-p", "1", "-C", "fifty"]).is_err());
    }

    #[test]
    fn test_both_cpu_forms_rejected() {
        assert!(Cli::try_parse_from(["procdump", "-p", "1", "-C", "50", "-c", "10"]).is_err());
    }

    #[test]
    fn test_both_memory_forms_rejected() {
        assert!(Cli::try_parse_from(["procdump", "-p", "1", "-M", "50", "-m", "10"]).is_err());
    }

    #[test]
    fn test_duplicate_cpu_rejected() {
        let pid = self_pid();
        let result = parse(&["procdump", "-p", &pid, "-C", "50", "-C", "60"]).into_options();
        assert!(matches!(result, Err(MonitorError::InvalidConfig(_))));
    }

    #[test]
    fn test_duplicate_lower_cpu_rejected() {
        let pid = self_pid();
        let result = parse(&["procdump", "-p", &pid, "-c", "10", "-c", "20"]).into_options();
        assert!(matches!(result, Err(MonitorError::InvalidConfig(_))));
    }

    #[test]
    fn test_duplicate_memory_rejected() {
        let pid = self_pid();
        let result = parse(&["procdump", "-p", &pid, "-M", "100", "-M", "200"]).into_options();
        assert!(matches!(result, Err(MonitorError::InvalidConfig(_))));
    }

    #[test]
    fn test_duplicate_lower_mem_rejected() {
        let pid = self_pid();
        let result = parse(&["procdump", "-p", &pid, "-m", "100", "-m", "200"]).into_options();
        assert!(matches!(result, Err(MonitorError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_seconds_rejected() {
        let pid = self_pid();
        let result = parse(&["procdump", "-p", &pid, "-s", "0"]).into_options();
        assert!(matches!(result, Err(MonitorError::InvalidConfig(_))));
    }

    #[test]
    fn test_one_second_accepted() {
        let pid = self_pid();
        let options = parse(&["procdump", "-p", &pid, "-s", "1"])
            .into_options()
            .unwrap();
        assert_eq!(options.threshold_seconds, 1);
    }

    #[test]
    fn test_zero_dumps_accepted() {
        let pid = self_pid();
        let options = parse(&["procdump", "-p", &pid, "-n", "0"])
            .into_options()
            .unwrap();
        assert_eq!(options.dumps_to_collect, 0);
    }

    #[test]
    fn test_missing_target_rejected() {
        let result = parse(&["procdump", "-C", "50"]).into_options();
        assert!(matches!(result, Err(MonitorError::InvalidConfig(_))));
    }

    #[test]
    fn test_both_targets_rejected() {
        assert!(Cli::try_parse_from(["procdump", "-p", "1", "-w", "stress"]).is_err());
    }

    #[test]
    fn test_nonexistent_pid_rejected() {
        let result = parse(&["procdump", "-p", &i32::MAX.to_string()]).into_options();
        assert!(matches!(result, Err(MonitorError::TargetNotFound(_))));
    }

    #[test]
    fn test_wait_form_carries_name() {
        let options = parse(&["procdump", "-w", "stress", "-M", "512"])
            .into_options()
            .unwrap();
        assert_eq!(options.target, Target::Name("stress".to_string()));
        assert_eq!(options.memory_threshold_mb, Some(512));
    }

    #[test]
    fn test_defaults() {
        let pid = self_pid();
        let options = parse(&["procdump", "-p", &pid]).into_options().unwrap();
        assert_eq!(options.dumps_to_collect, DEFAULT_NUMBER_OF_DUMPS);
        assert_eq!(options.threshold_seconds, DEFAULT_THRESHOLD_SECONDS);
        assert!(!options.diagnostics);
    }

    #[test]
    fn test_long_form_aliases() {
        let pid = self_pid();
        let options = parse(&[
            "procdump",
            "--pid",
            &pid,
            "--cpu",
            "50",
            "--number-of-dumps",
            "2",
            "--time-between-dumps",
            "5",
            "--diag",
        ])
        .into_options()
        .unwrap();
        assert_eq!(options.cpu_threshold, Some(50));
        assert_eq!(options.dumps_to_collect, 2);
        assert_eq!(options.threshold_seconds, 5);
        assert!(options.diagnostics);
    }

    #[test]
    fn test_same_argv_parses_to_equal_options() {
        let pid = self_pid();
        let argv = ["procdump", "-p", pid.as_str(), "-C", "50", "-n", "5"];
        let first = parse(&argv).into_options().unwrap();
        let second = parse(&argv).into_options().unwrap();
        assert_eq!(first, second);
    }
}
