// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop shell: the single main window and the page-script side of the
// bridge.
//
// The document head is fixed before the window exists: the egress policy
// as a CSP `<meta>`, the `window.hostAPI` object, and the UI entry module.
// Bridge traffic goes through one long-lived eval channel and is dispatched
// off the UI thread.

use std::sync::Arc;

use dioxus::desktop::{Config, DesktopContext, LogicalSize, WindowBuilder, window};
use dioxus::prelude::*;
use omran_bridge::{BridgeReply, HostBridge, dispatch};
use omran_core::AppConfig;
use omran_security::instance::bring_to_front;
use omran_security::{EgressFilter, WindowHandle};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::lifecycle::ProcessContext;
use crate::services::app_services::AppServices;

const WINDOW_TITLE: &str = "Omran";

/// Defines `window.hostAPI`. Calls made before the bridge channel attaches
/// are queued and flushed on attach.
const HOST_API_SCRIPT: &str = r#"(() => {
  const pending = new Map();
  const outbox = [];
  let nextId = 1;
  let send = null;
  const call = (op, args) => new Promise((resolve, reject) => {
    const id = nextId++;
    pending.set(id, { resolve, reject });
    const message = { id, op, args };
    if (send) { send(message); } else { outbox.push(message); }
  });
  const settle = (reply) => {
    const waiter = pending.get(reply.id);
    if (!waiter) { return; }
    pending.delete(reply.id);
    if (reply.ok) { waiter.resolve(reply.value); } else { waiter.reject(new Error(reply.error)); }
  };
  Object.defineProperty(window, "hostAPI", {
    value: Object.freeze({
      getMachineId: () => call("get-machine-id", null),
      getDefaultBackupDir: () => call("get-default-backup-dir", null),
      saveBackup: (backupId, json, dir) =>
        call("save-backup", { backupId, json, dir: dir ?? null }),
    }),
  });
  Object.defineProperty(window, "__omranAttach", {
    value: (sender) => {
      if (send) { return null; }
      send = sender;
      outbox.splice(0).forEach(send);
      return settle;
    },
  });
})();"#;

/// Runs inside the eval channel for the life of the window.
const BRIDGE_PUMP_SCRIPT: &str = r#"
const settle = window.__omranAttach((message) => dioxus.send(message));
if (settle) {
  while (true) {
    settle(await dioxus.recv());
  }
}
"#;

/// Open the main window. The desktop event loop ends the process when the
/// window closes, so this does not return on supported platforms.
pub fn launch(ctx: &ProcessContext) {
    let geometry = ctx.config.window;
    let builder = WindowBuilder::new()
        .with_title(WINDOW_TITLE)
        .with_inner_size(LogicalSize::new(geometry.width, geometry.height))
        .with_min_inner_size(LogicalSize::new(geometry.min_width, geometry.min_height));

    let cfg = Config::new()
        .with_window(builder)
        .with_custom_head(document_head(&ctx.config, &ctx.egress));

    info!(mode = ?ctx.config.mode, app_dir = %ctx.paths.app_dir.display(), "opening main window");
    dioxus::LaunchBuilder::new()
        .with_cfg(cfg)
        .with_context(ctx.services.clone())
        .launch(app);
}

/// Everything placed in `<head>` ahead of the UI.
pub fn document_head(config: &AppConfig, egress: &EgressFilter) -> String {
    let mut head = egress.csp_meta_tag();
    head.push_str("<script>");
    head.push_str(HOST_API_SCRIPT);
    head.push_str("</script>");

    let entry = config.ui_source();
    if entry.contains(['"', '<', '>']) {
        warn!(entry, "UI entry contains markup characters, not loading it");
        return head;
    }
    // Bare relative paths are bundled assets; anything with a scheme is
    // an outbound load and goes through the filter.
    if !entry.contains(':') || egress.intercept(entry) {
        head.push_str(&format!(r#"<script type="module" src="{entry}"></script>"#));
    }
    head
}

/// Root component. Renders the mount point and runs the two host tasks.
fn app() -> Element {
    let services = use_context::<AppServices>();
    let bridge = services.bridge();
    let on_close = services.clone();

    use_drop(move || on_close.release_instance());

    use_future(move || pump_bridge(Arc::clone(&bridge)));
    use_future(move || activate_on_request(services.clone()));

    rsx! {
        div { id: "root" }
    }
}

async fn pump_bridge(bridge: Arc<HostBridge>) {
    let mut channel = document::eval(BRIDGE_PUMP_SCRIPT);
    loop {
        let message: Value = match channel.recv().await {
            Ok(message) => message,
            Err(e) => {
                debug!(error = ?e, "bridge channel closed");
                return;
            }
        };

        let id = message.get("id").and_then(Value::as_u64);
        let bridge = Arc::clone(&bridge);
        let reply = match tokio::task::spawn_blocking(move || dispatch(&*bridge, message))
            .await
        {
            Ok(reply) => reply,
            Err(e) => BridgeReply::rejected(id, format!("bridge task failed: {e}")),
        };

        if let Err(e) = channel.send(reply) {
            warn!(error = ?e, "could not deliver bridge reply");
            return;
        }
    }
}

/// The main window as the instance arbiter sees it.
struct MainWindow(DesktopContext);

impl WindowHandle for MainWindow {
    fn is_minimized(&self) -> bool {
        self.0.window.is_minimized()
    }

    fn restore(&self) {
        self.0.window.set_minimized(false);
    }

    fn focus(&self) {
        self.0.window.set_focus();
    }
}

async fn activate_on_request(services: AppServices) {
    let Some(mut activations) = services.take_activations() else {
        return;
    };
    let main = MainWindow(window());
    while activations.recv().await.is_some() {
        bring_to_front(&main);
    }
}
