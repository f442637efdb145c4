use clap::error::ErrorKind;
use clap::Parser;
use std::process;
use std::sync::Arc;
use worlddiff_engine::config::{CliArgs, USAGE};
use worlddiff_engine::runner;
use worlddiff_logger::log::log;
use worlddiff_logger::severity::LogSeverity::{Fatal, Info};
use worlddiff_world::Registries;

#[tokio::main]
async fn main() {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return;
        }
        Err(e) => {
            eprintln!("{}", USAGE);
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let config = args.run_config();
    log(
        format!(
            "Diffing {} against {} into {} ({}, {})",
            config.world1.display(),
            config.world2.display(),
            config.output.display(),
            config.mode,
            config.dimension
        ),
        Info,
    );

    let registries = match Registries::load(&args.blocks) {
        Ok(registries) => Arc::new(registries),
        Err(e) => {
            log(format!("Failed to load {}: {}", args.blocks.display(), e), Fatal);
            process::exit(1);
        }
    };

    if let Err(e) = runner::run(config, registries).await {
        log(format!("Diff aborted: {}", e), Fatal);
        process::exit(1);
    }
}
