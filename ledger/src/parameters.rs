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

//! Tunable parameters of the fee engine and the shard layout.

use crate::structure::METACHAIN_SHARD_ID;
use anyhow::{Context, bail};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicsParameters {
    pub min_gas_price: u64,
    /// Gas charged for any transaction before its payload is considered.
    pub min_gas_limit: u64,
    pub gas_per_data_byte: u64,
    pub max_gas_limit_per_block: u64,
}

pub const INITIAL_ECONOMICS: EconomicsParameters = EconomicsParameters {
    min_gas_price: 1_000_000_000,
    min_gas_limit: 50_000,
    gas_per_data_byte: 1_500,
    max_gas_limit_per_block: 1_500_000_000,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingParameters {
    pub number_of_shards: u32,
    pub self_shard: u32,
}

pub const INITIAL_SHARDING: ShardingParameters = ShardingParameters {
    number_of_shards: 3,
    self_shard: 0,
};

lazy_static! {
    /// Protocol functions executed natively rather than by a contract.
    pub static ref DEFAULT_BUILT_IN_FUNCTIONS: Vec<String> = [
        "ClaimDeveloperRewards",
        "ChangeOwnerAddress",
        "SetUserName",
        "SaveUserName",
        "SaveKeyValue",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect();
}

fn default_built_in_functions() -> Vec<String> {
    DEFAULT_BUILT_IN_FUNCTIONS.clone()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub economics: EconomicsParameters,
    pub sharding: ShardingParameters,
    #[serde(default = "default_built_in_functions")]
    pub built_in_functions: Vec<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        ProcessorConfig {
            economics: INITIAL_ECONOMICS,
            sharding: INITIAL_SHARDING,
            built_in_functions: default_built_in_functions(),
        }
    }
}

impl ProcessorConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: ProcessorConfig =
            serde_json::from_str(json).context("failed to parse processor configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let ShardingParameters {
            number_of_shards,
            self_shard,
        } = self.sharding;
        if number_of_shards == 0 {
            bail!("number of shards must be positive");
        }
        if self_shard >= number_of_shards && self_shard != METACHAIN_SHARD_ID {
            bail!("self shard {self_shard} is out of range for {number_of_shards} shards");
        }
        if self.economics.min_gas_limit > self.economics.max_gas_limit_per_block {
            bail!(
                "minimum gas limit {} exceeds the block maximum {}",
                self.economics.min_gas_limit,
                self.economics.max_gas_limit_per_block
            );
        }
        Ok(())
    }
}
