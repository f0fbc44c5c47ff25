// This file is part of sharded-ledger.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::targets::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        use LogLevel::*;
        match level {
            Off => LevelFilter::OFF,
            Trace => LevelFilter::TRACE,
            Debug => LevelFilter::DEBUG,
            Info => LevelFilter::INFO,
            Warn => LevelFilter::WARN,
            Error => LevelFilter::ERROR,
        }
    }
}

/// Installs a global `fmt` subscriber. Subsequent calls are no-ops.
pub fn init_logger(level: LogLevel) {
    init_logger_with_targets(level, &[]);
}

/// As [`init_logger`], with overriding levels for individual targets such as
/// `"sharded_ledger::relayed"`.
pub fn init_logger_with_targets(default: LogLevel, targets: &[(&str, LogLevel)]) {
    let filter = targets
        .iter()
        .fold(Targets::new().with_default(default), |filter, (target, level)| {
            filter.with_target(target.to_string(), *level)
        });
    Registry::default()
        .with(tracing_subscriber::fmt::layer().with_filter(filter))
        .try_init()
        .ok();
    info!("sharded ledger v{} logging initialised", env!("CARGO_PKG_VERSION"));
}
