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

use crate::interfaces::ShardCoordinator;
use crate::structure::{ADDRESS_LEN, Address, METACHAIN_SHARD_ID};
use anyhow::bail;

/// Maps addresses onto shards by the trailing bits of the address.
///
/// Addresses whose masked suffix exceeds the last shard fall back to a mask
/// one bit narrower, so that every shard receives a share of the space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiShardCoordinator {
    number_of_shards: u32,
    self_id: u32,
    mask_high: u32,
    mask_low: u32,
}

impl MultiShardCoordinator {
    pub fn new(number_of_shards: u32, self_id: u32) -> anyhow::Result<Self> {
        if number_of_shards == 0 {
            bail!("number of shards must be positive");
        }
        if self_id >= number_of_shards && self_id != METACHAIN_SHARD_ID {
            bail!("shard {self_id} is out of range for {number_of_shards} shards");
        }
        let (mask_high, mask_low) = Self::calculate_masks(number_of_shards);
        Ok(MultiShardCoordinator {
            number_of_shards,
            self_id,
            mask_high,
            mask_low,
        })
    }

    fn calculate_masks(number_of_shards: u32) -> (u32, u32) {
        // ceil(log2(n))
        let bits = u32::BITS - (number_of_shards - 1).leading_zeros();
        let mask_high = (1u32 << bits) - 1;
        let mask_low = if bits == 0 { 0 } else { (1u32 << (bits - 1)) - 1 };
        (mask_high, mask_low)
    }

    fn suffix(&self, address: &Address) -> u32 {
        let bytes_needed = if self.number_of_shards <= 256 { 1 } else { 2 };
        address.0[ADDRESS_LEN - bytes_needed..]
            .iter()
            .fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
    }
}

impl ShardCoordinator for MultiShardCoordinator {
    fn self_id(&self) -> u32 {
        self.self_id
    }

    fn number_of_shards(&self) -> u32 {
        self.number_of_shards
    }

    fn compute_id(&self, address: &Address) -> u32 {
        if address.is_smart_contract_on_metachain() {
            return METACHAIN_SHARD_ID;
        }
        let suffix = self.suffix(address);
        let shard = suffix & self.mask_high;
        if shard > self.number_of_shards - 1 {
            suffix & self.mask_low
        } else {
            shard
        }
    }
}
