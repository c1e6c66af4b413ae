// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Egress allowlist for the rendering surface.
//
// Default deny. `file:` and `devtools:` are always allowed; plain HTTP and
// WebSocket to the loopback host only in development mode. Hosts are
// compared exactly after parsing, so `http://localhost.example.com` and
// `http://localhost@example.com` are denied even though they share the
// `http://localhost` prefix.

use omran_core::config::RunMode;
use omran_core::types::EgressDecision;
use tracing::{debug, warn};

/// Schemes allowed in every mode.
const ALWAYS_ALLOWED_SCHEMES: &[&str] = &["file", "devtools"];

/// Schemes allowed towards loopback in development mode.
const DEV_LOOPBACK_SCHEMES: &[&str] = &["http", "ws"];

/// Hosts treated as loopback.
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];

/// Static allow/deny policy, parameterised only by run mode.
#[derive(Debug, Clone, Copy)]
pub struct EgressFilter {
    mode: RunMode,
}

impl EgressFilter {
    pub fn new(mode: RunMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Pure policy decision for one URL.
    pub fn decide(&self, url: &str) -> EgressDecision {
        let Some((scheme, rest)) = split_scheme(url) else {
            return EgressDecision::Deny;
        };

        if ALWAYS_ALLOWED_SCHEMES.contains(&scheme.as_str()) {
            return EgressDecision::Allow;
        }

        if self.mode.is_development()
            && DEV_LOOPBACK_SCHEMES.contains(&scheme.as_str())
            && host_of(rest).is_some_and(|h| LOOPBACK_HOSTS.contains(&h.as_str()))
        {
            return EgressDecision::Allow;
        }

        EgressDecision::Deny
    }

    /// Decide and log. Returns `true` when the request may proceed; a
    /// `false` request is cancelled, never redirected or retried.
    pub fn intercept(&self, url: &str) -> bool {
        match self.decide(url) {
            EgressDecision::Allow => {
                debug!(url, "egress allowed");
                true
            }
            EgressDecision::Deny => {
                warn!(url, mode = ?self.mode, "egress denied");
                false
            }
        }
    }

    /// The same allowlist expressed as a Content-Security-Policy, so the
    /// webview enforces it on every subresource, fetch, and socket.
    pub fn content_security_policy(&self) -> String {
        let mut local = vec!["'self'", "file:", "devtools:"];
        let mut connect = vec!["'self'", "ipc:", "http://ipc.localhost"];
        if self.mode.is_development() {
            let dev = [
                "http://localhost:*",
                "ws://localhost:*",
                "http://127.0.0.1:*",
                "ws://127.0.0.1:*",
                "http://[::1]:*",
                "ws://[::1]:*",
            ];
            local.extend(dev);
            connect.extend(dev);
        }
        let local = local.join(" ");

        [
            format!("default-src {local}"),
            format!("script-src {local} 'unsafe-inline' 'unsafe-eval'"),
            format!("style-src {local} 'unsafe-inline'"),
            format!("img-src {local} data: blob:"),
            format!("font-src {local} data:"),
            format!("connect-src {}", connect.join(" ")),
            "object-src 'none'".to_owned(),
            "base-uri 'self'".to_owned(),
            "form-action 'none'".to_owned(),
        ]
        .join("; ")
    }

    /// `<meta>` tag carrying [`Self::content_security_policy`].
    pub fn csp_meta_tag(&self) -> String {
        format!(
            r#"<meta http-equiv="Content-Security-Policy" content="{}">"#,
            self.content_security_policy()
        )
    }
}

/// Lowercased scheme and the remainder after `:`.
fn split_scheme(url: &str) -> Option<(String, &str)> {
    let (scheme, rest) = url.trim().split_once(':')?;
    let valid = !scheme.is_empty()
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| (scheme.to_ascii_lowercase(), rest))
}

/// Lowercased host of a hierarchical URL remainder (`//host:port/...`),
/// with userinfo and port stripped.
fn host_of(rest: &str) -> Option<String> {
    let authority = rest.strip_prefix("//")?;
    let end = authority
        .find(|c| matches!(c, '/' | '?' | '#'))
        .unwrap_or(authority.len());
    let authority = &authority[..end];
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);

    let host = if host_port.starts_with('[') {
        let close = host_port.find(']')?;
        &host_port[..=close]
    } else {
        host_port.split(':').next().unwrap_or_default()
    };

    (!host.is_empty()).then(|| host.to_ascii_lowercase())
}
