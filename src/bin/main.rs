//! procdump - monitors a process and writes core dumps on resource triggers

use std::sync::Arc;

use clap::{CommandFactory, Parser};
use log::error;

use procdump_rs::{Cli, GcoreDumper, Monitor, MonitorConfig, logging};

fn main() {
    let cli = Cli::parse();

    logging::init_logger(cli.diag);

    let options = match cli.into_options() {
        Ok(options) => options,
        Err(e) => {
            error!("{}", e);
            let _ = Cli::command().print_help();
            std::process::exit(1);
        }
    };

    let config = Arc::new(MonitorConfig::new(options));
    config.print_banner();
    config.print_configuration();

    let monitor = Monitor::new(config, Arc::new(GcoreDumper::default()));
    if let Err(e) = monitor.run() {
        error!("{}", e);
        std::process::exit(1);
    }
}
