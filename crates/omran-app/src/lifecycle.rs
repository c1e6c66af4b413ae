// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Startup sequencing.
//
// Order is fixed: instance arbitration, fingerprint, device lock, egress
// filter, bridge. Nothing that creates a window runs before the device
// lock has returned `Proceed`.

use std::process::ExitCode;

use omran_core::{AppConfig, LockOutcome};
use omran_security::{
    Acquisition, DeviceLockStore, EgressFilter, FingerprintGenerator, InstanceGuard,
    SingleInstanceArbiter,
};
use tracing::{error, info, warn};

use crate::services::app_services::AppServices;
use crate::services::data_dir::AppPaths;

/// Why startup stopped before a window was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyExit {
    /// Another instance is primary and has been asked to activate.
    Deferred,
    /// The device lock belongs to another machine.
    DeviceMismatch,
    /// Instance arbitration failed outright.
    Failed,
}

impl EarlyExit {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Deferred => ExitCode::SUCCESS,
            Self::DeviceMismatch | Self::Failed => ExitCode::FAILURE,
        }
    }
}

/// Everything the primary instance owns for the lifetime of its window.
///
/// Dropping the context releases the primary-instance role.
pub struct ProcessContext {
    pub paths: AppPaths,
    pub config: AppConfig,
    pub egress: EgressFilter,
    pub services: AppServices,
    _instance: InstanceGuard,
}

/// Run every pre-window startup step.
pub fn prepare(
    paths: AppPaths,
    config: AppConfig,
    fingerprint: FingerprintGenerator,
) -> Result<ProcessContext, EarlyExit> {
    paths.ensure_app_dir();

    let arbiter = SingleInstanceArbiter::new(&paths.app_dir);
    let instance = match arbiter.try_acquire() {
        Ok(Acquisition::Primary(guard)) => guard,
        Ok(Acquisition::Secondary) => {
            info!("another instance is running, handing over");
            if let Err(e) = arbiter.notify_primary() {
                warn!(error = %e, "could not reach primary instance");
            }
            return Err(EarlyExit::Deferred);
        }
        Err(e) => {
            error!(error = %e, "instance arbitration failed");
            return Err(EarlyExit::Failed);
        }
    };

    let current = fingerprint.compute();
    if let LockOutcome::Mismatch { expected, actual } =
        DeviceLockStore::new(&paths.lock_file).initialize(&current)
    {
        error!(%expected, %actual, "this installation is bound to another device");
        return Err(EarlyExit::DeviceMismatch);
    }

    let egress = EgressFilter::new(config.mode);
    info!(mode = ?config.mode, "egress filter installed");

    let (activate_tx, activate_rx) = tokio::sync::mpsc::unbounded_channel();
    if let Err(e) = instance.listen(move || {
        let _ = activate_tx.send(());
    }) {
        warn!(error = %e, "activation listener unavailable");
    }

    let services = AppServices::new(
        &paths,
        &config,
        fingerprint,
        activate_rx,
        instance.port_file().to_path_buf(),
    );

    Ok(ProcessContext {
        paths,
        config,
        egress,
        services,
        _instance: instance,
    })
}
