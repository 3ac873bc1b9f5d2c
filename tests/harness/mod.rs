// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for load simulation against the limiter and cache.
//!
//! Provides client/key generators and outcome accounting used by the
//! resilience tests.

pub mod generators;
pub mod metrics;
