//! Log sink initialization
//!
//! Wires the `log` facade to stderr with a syslog-style `procdump[pid]`
//! tag. Diagnostics mode lowers the filter to debug and adds the module
//! path to each line, so interleaved sampler output can be told apart.

use console::style;
use env_logger::{Builder, Env};
use log::{Level, LevelFilter};
use std::io::Write;

/// Initialize the logger; diagnostics mode enables debug output
pub fn init_logger(diagnostics: bool) {
    let env = Env::default().filter_or("RUST_LOG", if diagnostics { "debug" } else { "info" });
    let tag = format!("procdump[{}]", std::process::id());

    Builder::from_env(env)
        .format(move |buf, record| {
            let message = match record.level() {
                Level::Error => format!("{} {}", style("error:").red().bold(), record.args()),
                Level::Warn => format!("{} {}", style("warn:").yellow().bold(), record.args()),
                Level::Info => format!("{}", record.args()),
                Level::Debug | Level::Trace => format!("{}", style(record.args()).dim()),
            };
            if record.level() >= Level::Debug {
                writeln!(
                    buf,
                    "{} <{}> {}",
                    style(&tag).dim(),
                    record.target(),
                    message
                )
            } else {
                writeln!(buf, "{} {}", style(&tag).dim(), message)
            }
        })
        .filter_level(if diagnostics {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();
}
