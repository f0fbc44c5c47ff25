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

//! Collectors for the records a processed transaction leaves behind.

use crate::error::ProcessError;
use crate::interfaces::{IntermediateTransactionHandler, ShardCoordinator};
use crate::structure::IntermediateTransaction;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The kind of record a collector accepts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockType {
    Receipt,
    InvalidTransaction,
    SmartContractResult,
}

impl BlockType {
    fn accepts(self, record: &IntermediateTransaction) -> bool {
        matches!(
            (self, record),
            (BlockType::Receipt, IntermediateTransaction::Receipt(_))
                | (BlockType::InvalidTransaction, IntermediateTransaction::Transaction(_))
                | (
                    BlockType::SmartContractResult,
                    IntermediateTransaction::ContractResult(_)
                )
        )
    }
}

/// Groups forwarded records by destination shard, ready to be packed into
/// mini-blocks when the block is sealed.
pub struct IntermediateResults {
    block_type: BlockType,
    shard_coordinator: Arc<dyn ShardCoordinator>,
    pending: Mutex<BTreeMap<u32, Vec<IntermediateTransaction>>>,
}

impl IntermediateResults {
    pub fn new(block_type: BlockType, shard_coordinator: Arc<dyn ShardCoordinator>) -> Self {
        IntermediateResults {
            block_type,
            shard_coordinator,
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    pub fn len(&self) -> usize {
        self.pending.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every pending record, ordered by destination shard and then arrival.
    pub fn records(&self) -> Vec<IntermediateTransaction> {
        self.pending.lock().values().flatten().cloned().collect()
    }

    pub fn records_for_shard(&self, shard: u32) -> Vec<IntermediateTransaction> {
        self.pending.lock().get(&shard).cloned().unwrap_or_default()
    }

    /// Takes every pending record, keyed by destination shard.
    pub fn create_all_inter_mini_blocks(&self) -> BTreeMap<u32, Vec<IntermediateTransaction>> {
        std::mem::take(&mut *self.pending.lock())
    }
}

impl IntermediateTransactionHandler for IntermediateResults {
    fn add_intermediate_transactions(
        &self,
        txs: Vec<IntermediateTransaction>,
    ) -> Result<(), ProcessError> {
        if let Some(rejected) = txs.iter().find(|tx| !self.block_type.accepts(tx)) {
            return Err(ProcessError::Forwarding(format!(
                "{:?} collector cannot hold {rejected:?}",
                self.block_type
            )));
        }
        let mut pending = self.pending.lock();
        for tx in txs {
            let shard = match self.block_type {
                BlockType::Receipt => self.shard_coordinator.self_id(),
                _ => self.shard_coordinator.compute_id(tx.destination()),
            };
            pending.entry(shard).or_default().push(tx);
        }
        Ok(())
    }
}
