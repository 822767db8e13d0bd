use client_harness::LogLevel;
use logging::build_logger;
use slog::{crit, info, Logger};
use std::process::exit;
use wrong_price::cli::{cli_app, RunOptions};

fn main() {
    let matches = cli_app().get_matches();
    let options = match RunOptions::from_cli(&matches) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            exit(1)
        }
    };

    let level = if options.quiet {
        LogLevel::None
    } else {
        options.config.harness.args.log_level
    };
    let log = match build_logger(level.as_slog(), options.log_format) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Failed to start logger: {}", e);
            exit(1)
        }
    };

    let result = run(&options, &log);
    // Flush the async drain before printing the verdict.
    drop(log);

    match result {
        Ok(()) => println!("Flag captured."),
        Err(e) => {
            eprintln!("Flag not captured: {}", e);
            exit(1)
        }
    }
}

fn run(options: &RunOptions, log: &Logger) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {:?}", e))?;

    runtime.block_on(async {
        let (signal, exit) = exit_future::signal();
        let ctrl_c_log = log.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!(ctrl_c_log, "Received Ctrl+C, shutting down");
                signal.fire().ok();
            }
        });

        wrong_price::run(&options.config, log, Some(exit))
            .await
            .map_err(|e| {
                crit!(log, "Flag check failed"; "error" => %e);
                e.to_string()
            })
    })
}
