// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-instance arbitration.
//
// The primary instance holds an exclusive advisory lock (fs2 flock /
// LockFileEx) on `instance.lock` for its whole lifetime and listens on a
// loopback port recorded in `instance.port`. A later launch fails to take
// the lock, sends `activate` to that port, and exits; the primary then
// restores and focuses its main window.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fs2::FileExt;
use omran_core::error::{OmranError, Result};
use tracing::{debug, info, warn};

use crate::atomic::write_atomic;

pub const INSTANCE_LOCK_FILE: &str = "instance.lock";
pub const INSTANCE_PORT_FILE: &str = "instance.port";

/// The only message the activation listener accepts.
const ACTIVATE: &str = "activate";

/// Upper bound on an activation message, newline included.
const MAX_MESSAGE_LEN: u64 = 64;

const IO_TIMEOUT: Duration = Duration::from_secs(2);

/// The main window as seen by the activation handler.
pub trait WindowHandle {
    fn is_minimized(&self) -> bool;
    fn restore(&self);
    fn focus(&self);
}

/// Un-minimise `window` if needed and give it focus.
pub fn bring_to_front(window: &dyn WindowHandle) {
    if window.is_minimized() {
        window.restore();
    }
    window.focus();
}

/// Outcome of [`SingleInstanceArbiter::try_acquire`].
pub enum Acquisition {
    /// This process is the primary instance while the guard lives.
    Primary(InstanceGuard),
    /// Another process already is. Notify it and exit.
    Secondary,
}

/// Decides which process on this machine owns the primary-instance role.
#[derive(Debug, Clone)]
pub struct SingleInstanceArbiter {
    dir: PathBuf,
}

impl SingleInstanceArbiter {
    /// `dir` is the per-user application data directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(INSTANCE_LOCK_FILE)
    }

    fn port_path(&self) -> PathBuf {
        self.dir.join(INSTANCE_PORT_FILE)
    }

    /// Try to become the primary instance. Never blocks.
    pub fn try_acquire(&self) -> Result<Acquisition> {
        fs::create_dir_all(&self.dir)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(ref e) if is_contended(e) => {
                debug!("instance lock held by another process");
                return Ok(Acquisition::Secondary);
            }
            Err(e) => return Err(OmranError::Instance(format!("lock failed: {e}"))),
        }

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
        let port = listener.local_addr()?.port();
        write_atomic(&self.port_path(), port.to_string().as_bytes())?;

        info!(port, "acquired primary instance role");
        Ok(Acquisition::Primary(InstanceGuard {
            lock: file,
            listener,
            port,
            port_path: self.port_path(),
        }))
    }

    /// Ask the primary instance to bring its window to the front.
    pub fn notify_primary(&self) -> Result<()> {
        let raw = fs::read_to_string(self.port_path())?;
        let port: u16 = raw
            .trim()
            .parse()
            .map_err(|e| OmranError::Instance(format!("bad port file {raw:?}: {e}")))?;

        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let mut stream = TcpStream::connect_timeout(&addr, IO_TIMEOUT)?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        stream.write_all(format!("{ACTIVATE}\n").as_bytes())?;
        debug!(port, "activation sent to primary instance");
        Ok(())
    }
}

/// Held by the primary instance. Dropping it releases the role.
pub struct InstanceGuard {
    lock: File,
    listener: TcpListener,
    port: u16,
    port_path: PathBuf,
}

impl InstanceGuard {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accept one connection and, if it is a valid activation request,
    /// bring `window` to the front. Blocks until a connection arrives.
    pub fn serve_one(&self, window: &dyn WindowHandle) -> Result<bool> {
        let (stream, _) = self.listener.accept()?;
        let activated = read_activation(stream)?;
        if activated {
            bring_to_front(window);
        }
        Ok(activated)
    }

    /// Run the accept loop on a background thread, calling `on_activate`
    /// for every valid activation request.
    pub fn listen<F>(&self, mut on_activate: F) -> Result<JoinHandle<()>>
    where
        F: FnMut() + Send + 'static,
    {
        let listener = self.listener.try_clone()?;
        let handle = thread::Builder::new()
            .name("omran-instance".into())
            .spawn(move || {
                for stream in listener.incoming() {
                    match stream.map_err(OmranError::from).and_then(read_activation) {
                        Ok(true) => {
                            info!("second launch detected, activating main window");
                            on_activate();
                        }
                        Ok(false) => warn!("ignored malformed activation request"),
                        Err(e) => warn!(error = %e, "activation connection failed"),
                    }
                }
            })?;
        Ok(handle)
    }

    pub fn port_file(&self) -> &Path {
        &self.port_path
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.port_path);
        let _ = FileExt::unlock(&self.lock);
    }
}

fn read_activation(stream: TcpStream) -> Result<bool> {
    stream.set_read_timeout(Some(IO_TIMEOUT))?;
    let mut line = String::new();
    BufReader::new(stream.take(MAX_MESSAGE_LEN)).read_line(&mut line)?;
    Ok(line.trim() == ACTIVATE)
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::mpsc;

    #[derive(Default)]
    struct FakeWindow {
        minimized: Cell<bool>,
        focused: Cell<bool>,
        restores: Cell<u32>,
    }

    impl WindowHandle for FakeWindow {
        fn is_minimized(&self) -> bool {
            self.minimized.get()
        }

        fn restore(&self) {
            self.minimized.set(false);
            self.restores.set(self.restores.get() + 1);
        }

        fn focus(&self) {
            self.focused.set(true);
        }
    }

    fn primary(arbiter: &SingleInstanceArbiter) -> InstanceGuard {
        match arbiter.try_acquire().unwrap() {
            Acquisition::Primary(guard) => guard,
            Acquisition::Secondary => panic!("expected primary role"),
        }
    }

    #[test]
    fn second_launch_focuses_primary_window() {
        let tmp = tempfile::tempdir().unwrap();
        let guard = primary(&SingleInstanceArbiter::new(tmp.path()));

        let second = SingleInstanceArbiter::new(tmp.path());
        assert!(matches!(second.try_acquire().unwrap(), Acquisition::Secondary));
        second.notify_primary().unwrap();

        let window = FakeWindow::default();
        window.minimized.set(true);
        assert!(guard.serve_one(&window).unwrap());
        assert!(!window.minimized.get());
        assert!(window.focused.get());
        assert_eq!(window.restores.get(), 1);
    }

    #[test]
    fn visible_window_is_focused_without_restore() {
        let tmp = tempfile::tempdir().unwrap();
        let arbiter = SingleInstanceArbiter::new(tmp.path());
        let guard = primary(&arbiter);
        arbiter.notify_primary().unwrap();

        let window = FakeWindow::default();
        assert!(guard.serve_one(&window).unwrap());
        assert!(window.focused.get());
        assert_eq!(window.restores.get(), 0);
    }

    #[test]
    fn malformed_request_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let guard = primary(&SingleInstanceArbiter::new(tmp.path()));

        let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, guard.port())).unwrap();
        stream.write_all(b"shutdown\n").unwrap();
        drop(stream);

        let window = FakeWindow::default();
        assert!(!guard.serve_one(&window).unwrap());
        assert!(!window.focused.get());
    }

    #[test]
    fn listener_thread_forwards_activations() {
        let tmp = tempfile::tempdir().unwrap();
        let arbiter = SingleInstanceArbiter::new(tmp.path());
        let guard = primary(&arbiter);

        let (tx, rx) = mpsc::channel();
        guard
            .listen(move || {
                let _ = tx.send(());
            })
            .unwrap();

        SingleInstanceArbiter::new(tmp.path()).notify_primary().unwrap();
        rx.recv_timeout(Duration::from_secs(5)).expect("activation forwarded");
    }

    #[test]
    fn dropping_guard_releases_role() {
        let tmp = tempfile::tempdir().unwrap();
        let arbiter = SingleInstanceArbiter::new(tmp.path());
        let guard = primary(&arbiter);
        let port_file = guard.port_file().to_path_buf();
        assert!(port_file.exists());

        drop(guard);
        assert!(!port_file.exists());
        let _again = primary(&arbiter);
    }

    #[test]
    fn notify_without_primary_fails_softly() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(SingleInstanceArbiter::new(tmp.path()).notify_primary().is_err());
    }
}
