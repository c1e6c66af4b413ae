// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host-side services: filesystem layout, configuration, and the shared
// context handed to the window.

pub mod app_services;
pub mod data_dir;
