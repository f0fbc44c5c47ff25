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

#![deny(unreachable_pub)]
#![deny(warnings)]

//! Shard-local transaction execution: validation, fee charging, balance
//! transfers, relayed transactions and the receipts and smart contract
//! results they leave behind.

#[macro_use]
extern crate tracing;

pub mod accounts;
mod base;
pub mod economics;
pub mod error;
pub mod forwarder;
pub mod interfaces;
#[path = "tracing.rs"]
mod ledger_tracing;
pub mod parameters;
pub mod parser;
mod relayed;
pub mod semantics;
pub mod sharding;
pub mod structure;
pub mod tx_type;

pub use ledger_tracing::{LogLevel, init_logger, init_logger_with_targets};

#[cfg(feature = "test-utilities")]
pub mod test_utilities;
