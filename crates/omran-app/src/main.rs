// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Omran: desktop host process for the Omran business UI.
//
// Entry point. Initialises logging, resolves paths and configuration, runs
// the startup gates, and opens the main window.

mod lifecycle;
mod services;
mod shell;

use std::process::ExitCode;

use omran_security::FingerprintGenerator;

use services::app_services::load_config;
use services::data_dir::AppPaths;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Omran starting");

    let paths = match AppPaths::resolve() {
        Ok(paths) => paths,
        Err(e) => {
            tracing::error!(error = %e, "cannot resolve application directories");
            return ExitCode::FAILURE;
        }
    };
    let config = load_config(&paths.config_file);

    let ctx = match lifecycle::prepare(paths, config, FingerprintGenerator::new()) {
        Ok(ctx) => ctx,
        Err(exit) => {
            tracing::info!(reason = ?exit, "exiting before window creation");
            return exit.exit_code();
        }
    };

    // Window close exits from inside the event loop; the root component
    // removes the instance port file on its way out.
    shell::launch(&ctx);
    ExitCode::SUCCESS
}
