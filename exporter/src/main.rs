mod assemble;
mod cli;
mod config;
mod export;
mod failure;
mod remote;
mod traverse;

use std::{path::Path, process::ExitCode, time::Duration};

use clap::Parser;
use log::LevelFilter;

use crate::{
    cli::{parse_connect_string, Cli, CliError},
    export::ExportJob,
    failure::{make_graceful, Failure},
    traverse::TraverseOptions,
};

const TARGET: &str = "zktree_export";

/// Flushes the log sinks when the process is done.
struct LoggerGuard;

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        log::logger().flush();
    }
}

fn init_logger(level: LevelFilter, log_file: Option<&Path>) -> LoggerGuard {
    use fern::colors::{Color, ColoredLevelConfig};

    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let stderr = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let mut dispatch = fern::Dispatch::new()
        .level(LevelFilter::Off)
        .level_for(TARGET, level)
        .chain(stderr);

    if let Some(path) = log_file {
        match fern::log_file(path) {
            Ok(file) => {
                dispatch = dispatch.chain(
                    fern::Dispatch::new()
                        .format(|out, message, record| {
                            out.finish(format_args!(
                                "{} [{}] {}",
                                record.level(),
                                record.target(),
                                message
                            ))
                        })
                        .chain(file),
                )
            }
            Err(e) => eprintln!("Failed to open the log file {:?}: {}", path, e),
        }
    }

    dispatch.apply().expect("no logger should have been set yet");
    LoggerGuard
}

fn make_job(cli: Cli) -> Result<ExportJob, CliError> {
    let target = parse_connect_string(&cli.connect_string)?;
    Ok(ExportJob {
        host: target.host,
        root: target.root,
        credentials: cli.credentials,
        destination: cli.destination,
        connect_timeout: cli
            .connect_timeout
            .map(Duration::from_secs)
            .unwrap_or_else(config::connect_timeout),
        options: TraverseOptions {
            max_in_flight: cli
                .max_in_flight
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
                .or_else(config::max_in_flight),
            fetch_timeout: cli
                .fetch_timeout
                .map(Duration::from_secs)
                .or_else(config::fetch_timeout),
        },
    })
}

#[tokio::main(flavor = "current_thread")]
async fn async_main(job: ExportJob) -> Result<(), Failure> {
    let summary = export::run(&job).await?;
    log::info!(
        "Exported {} nodes from '{}' to {:?} in {:?}",
        summary.nodes,
        job.root,
        job.destination,
        summary.elapsed
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help and --version
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _logger = init_logger(LevelFilter::Info, None);
            let _ = e.print();
            return make_graceful(&CliError::from(e).into());
        }
    };

    if let Err(e) = config::init_config(cli.config.as_deref()) {
        let _logger = init_logger(LevelFilter::Info, cli.log_file.as_deref());
        return make_graceful(&e.into());
    }

    let level = config::raise(config::log_level(), cli.verbose);
    let log_file = cli.log_file.clone();
    let _logger = init_logger(level, log_file.as_deref().or_else(|| config::log_file()));
    log::debug!("Starting {}", env!("CARGO_PKG_VERSION"));

    let job = match make_job(cli) {
        Ok(job) => job,
        Err(e) => return make_graceful(&e.into()),
    };

    match async_main(job) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => make_graceful(&failure),
    }
}
