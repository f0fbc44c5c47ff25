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

//! The capabilities a [`TxProcessor`](crate::semantics::TxProcessor) needs
//! from its surroundings. Every collaborator is shared as an `Arc<dyn _>`.

use crate::error::{ParseError, ProcessError, TransactionInvalid};
use crate::structure::{
    Account, Address, Amount, IntermediateTransaction, ReturnCode, TransactionHandler,
    TransactionHash, TransactionType,
};

/// Account persistence. Loading an address that was never written yields a
/// fresh, empty account.
pub trait AccountsAdapter: Send + Sync {
    fn load_account(&self, address: &Address) -> Result<Account, ProcessError>;
    fn save_account(&self, account: &Account) -> Result<(), ProcessError>;
}

pub trait ShardCoordinator: Send + Sync {
    fn self_id(&self) -> u32;
    fn number_of_shards(&self) -> u32;
    fn compute_id(&self, address: &Address) -> u32;

    fn is_in_self_shard(&self, address: &Address) -> bool {
        self.compute_id(address) == self.self_id()
    }
}

/// The fee engine.
pub trait FeeHandler: Send + Sync {
    fn compute_gas_limit(&self, tx: &dyn TransactionHandler) -> u64;
    fn compute_fee(&self, tx: &dyn TransactionHandler) -> Amount;
    fn check_validity_tx_values(&self, tx: &dyn TransactionHandler)
    -> Result<(), TransactionInvalid>;
}

/// Accumulates the fees collected in the block under construction.
pub trait TransactionFeeHandler: Send + Sync {
    fn process_transaction_fee(&self, cost: &Amount, dev_fee: &Amount, tx_hash: &TransactionHash);
}

pub trait TxTypeHandler: Send + Sync {
    fn compute_transaction_type(&self, tx: &dyn TransactionHandler) -> TransactionType;
}

/// Executes contract deployments and calls. `None` accounts are not hosted
/// in this shard.
pub trait SmartContractProcessor: Send + Sync {
    fn deploy_smart_contract(
        &self,
        tx: &dyn TransactionHandler,
        sender: Option<Account>,
    ) -> Result<ReturnCode, ProcessError>;

    fn execute_smart_contract_transaction(
        &self,
        tx: &dyn TransactionHandler,
        sender: Option<Account>,
        receiver: Option<Account>,
    ) -> Result<ReturnCode, ProcessError>;
}

/// A sink for derived records bound for other processors or shards.
pub trait IntermediateTransactionHandler: Send + Sync {
    fn add_intermediate_transactions(
        &self,
        txs: Vec<IntermediateTransaction>,
    ) -> Result<(), ProcessError>;
}

pub trait ArgumentsParser: Send + Sync {
    /// Splits call data into its function name and decoded arguments.
    fn parse_call_data(&self, data: &[u8]) -> Result<(String, Vec<Vec<u8>>), ParseError>;
}
