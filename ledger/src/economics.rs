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

//! Gas and fee arithmetic, and the accumulator of fees collected per block.

use crate::error::TransactionInvalid;
use crate::interfaces::{FeeHandler, TransactionFeeHandler};
use crate::parameters::EconomicsParameters;
use crate::structure::{Amount, TransactionHandler, TransactionHash};
use num_traits::Zero;
use parking_lot::Mutex;
use std::collections::HashMap;

/// The fee engine driven by [`EconomicsParameters`].
#[derive(Clone, Debug)]
pub struct EconomicsData {
    params: EconomicsParameters,
}

impl EconomicsData {
    pub fn new(params: EconomicsParameters) -> Self {
        EconomicsData { params }
    }

    pub fn parameters(&self) -> &EconomicsParameters {
        &self.params
    }
}

impl FeeHandler for EconomicsData {
    fn compute_gas_limit(&self, tx: &dyn TransactionHandler) -> u64 {
        let data_gas = (tx.data().len() as u64).saturating_mul(self.params.gas_per_data_byte);
        self.params.min_gas_limit.saturating_add(data_gas)
    }

    fn compute_fee(&self, tx: &dyn TransactionHandler) -> Amount {
        Amount::from(self.compute_gas_limit(tx)) * tx.gas_price()
    }

    fn check_validity_tx_values(
        &self,
        tx: &dyn TransactionHandler,
    ) -> Result<(), TransactionInvalid> {
        if tx.gas_price() < self.params.min_gas_price {
            return Err(TransactionInvalid::InsufficientGasPrice {
                provided: tx.gas_price(),
                minimum: self.params.min_gas_price,
            });
        }
        let required = self.compute_gas_limit(tx);
        if tx.gas_limit() < required {
            return Err(TransactionInvalid::InsufficientGasLimit {
                provided: tx.gas_limit(),
                required,
            });
        }
        if tx.gas_limit() > self.params.max_gas_limit_per_block {
            return Err(TransactionInvalid::TooMuchGas {
                provided: tx.gas_limit(),
                maximum: self.params.max_gas_limit_per_block,
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct FeeState {
    accumulated: Amount,
    developer: Amount,
    by_hash: HashMap<TransactionHash, (Amount, Amount)>,
}

/// Sums the fees charged by every processed transaction in the current block.
#[derive(Default)]
pub struct FeeAccumulator {
    state: Mutex<FeeState>,
}

impl FeeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the accumulator for a new block.
    pub fn create_block_started(&self) {
        *self.state.lock() = FeeState::default();
    }

    pub fn accumulated_fees(&self) -> Amount {
        self.state.lock().accumulated.clone()
    }

    pub fn developer_fees(&self) -> Amount {
        self.state.lock().developer.clone()
    }

    pub fn fee_for(&self, tx_hash: &TransactionHash) -> Option<Amount> {
        self.state
            .lock()
            .by_hash
            .get(tx_hash)
            .map(|(fee, _)| fee.clone())
    }

    /// Withdraws the fees recorded for the given transactions.
    pub fn revert_fees(&self, tx_hashes: &[TransactionHash]) {
        let mut state = self.state.lock();
        for hash in tx_hashes {
            if let Some((fee, dev_fee)) = state.by_hash.remove(hash) {
                state.accumulated -= &fee;
                state.developer -= &dev_fee;
            }
        }
    }
}

impl TransactionFeeHandler for FeeAccumulator {
    fn process_transaction_fee(&self, cost: &Amount, dev_fee: &Amount, tx_hash: &TransactionHash) {
        let mut state = self.state.lock();
        state.accumulated += cost;
        state.developer += dev_fee;
        let entry = state
            .by_hash
            .entry(*tx_hash)
            .or_insert_with(|| (Amount::zero(), Amount::zero()));
        entry.0 += cost;
        entry.1 += dev_fee;
    }
}
