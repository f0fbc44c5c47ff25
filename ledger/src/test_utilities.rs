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

use crate::accounts::InMemoryAccounts;
use crate::economics::FeeAccumulator;
use crate::error::{ProcessError, TransactionInvalid};
use crate::forwarder::{BlockType, IntermediateResults};
use crate::interfaces::{
    AccountsAdapter, FeeHandler, IntermediateTransactionHandler, ShardCoordinator,
    SmartContractProcessor,
};
use crate::parameters::DEFAULT_BUILT_IN_FUNCTIONS;
use crate::parser::CallDataParser;
use crate::semantics::{TxProcessor, TxProcessorBuilder};
use crate::sharding::MultiShardCoordinator;
use crate::structure::{
    Account, Address, Amount, IntermediateTransaction, Receipt, ReturnCode, SmartContractResult,
    Transaction, TransactionHandler, TransactionHash,
};
use crate::tx_type::TxTypeClassifier;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;

pub const TEST_SHARDS: u32 = 2;
pub const SELF_SHARD: u32 = 0;

/// A fee engine whose gas limit is an arbitrary function of the transaction
/// and which accepts any gas price and limit.
pub struct StubEconomics {
    gas_limit: Box<dyn Fn(&dyn TransactionHandler) -> u64 + Send + Sync>,
}

impl StubEconomics {
    pub fn new(gas_limit: impl Fn(&dyn TransactionHandler) -> u64 + Send + Sync + 'static) -> Self {
        StubEconomics {
            gas_limit: Box::new(gas_limit),
        }
    }

    pub fn flat(gas_limit: u64) -> Self {
        Self::new(move |_| gas_limit)
    }
}

impl FeeHandler for StubEconomics {
    fn compute_gas_limit(&self, tx: &dyn TransactionHandler) -> u64 {
        (self.gas_limit)(tx)
    }

    fn compute_fee(&self, tx: &dyn TransactionHandler) -> Amount {
        Amount::from(self.compute_gas_limit(tx)) * tx.gas_price()
    }

    fn check_validity_tx_values(
        &self,
        _tx: &dyn TransactionHandler,
    ) -> Result<(), TransactionInvalid> {
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScCallKind {
    Deploy,
    Execute,
}

/// A contract execution request as seen by [`RecordingScProcessor`].
#[derive(Clone, Debug)]
pub struct ScCall {
    pub kind: ScCallKind,
    pub sender: Address,
    pub receiver: Address,
    pub value: Amount,
    pub data: Vec<u8>,
    pub relayer: Option<Address>,
    pub original_tx_hash: Option<TransactionHash>,
    pub sender_account: Option<Account>,
    pub receiver_account: Option<Account>,
}

/// Records contract requests and answers them with a configurable outcome.
pub struct RecordingScProcessor {
    calls: Mutex<Vec<ScCall>>,
    outcome: Mutex<Result<ReturnCode, String>>,
}

impl Default for RecordingScProcessor {
    fn default() -> Self {
        RecordingScProcessor {
            calls: Mutex::new(Vec::new()),
            outcome: Mutex::new(Ok(ReturnCode::Ok)),
        }
    }
}

impl RecordingScProcessor {
    pub fn respond_with(&self, code: ReturnCode) {
        *self.outcome.lock() = Ok(code);
    }

    pub fn fail_with(&self, reason: &str) {
        *self.outcome.lock() = Err(reason.to_string());
    }

    pub fn calls(&self) -> Vec<ScCall> {
        self.calls.lock().clone()
    }

    fn record(
        &self,
        kind: ScCallKind,
        tx: &dyn TransactionHandler,
        sender_account: Option<Account>,
        receiver_account: Option<Account>,
    ) -> Result<ReturnCode, ProcessError> {
        self.calls.lock().push(ScCall {
            kind,
            sender: *tx.sender(),
            receiver: *tx.receiver(),
            value: tx.value().clone(),
            data: tx.data().to_vec(),
            relayer: tx.relayer().copied(),
            original_tx_hash: tx.original_tx_hash().copied(),
            sender_account,
            receiver_account,
        });
        self.outcome.lock().clone().map_err(ProcessError::SmartContract)
    }
}

impl SmartContractProcessor for RecordingScProcessor {
    fn deploy_smart_contract(
        &self,
        tx: &dyn TransactionHandler,
        sender: Option<Account>,
    ) -> Result<ReturnCode, ProcessError> {
        self.record(ScCallKind::Deploy, tx, sender, None)
    }

    fn execute_smart_contract_transaction(
        &self,
        tx: &dyn TransactionHandler,
        sender: Option<Account>,
        receiver: Option<Account>,
    ) -> Result<ReturnCode, ProcessError> {
        self.record(ScCallKind::Execute, tx, sender, receiver)
    }
}

/// A forwarder that refuses every record.
pub struct FailingForwarder;

impl IntermediateTransactionHandler for FailingForwarder {
    fn add_intermediate_transactions(
        &self,
        _txs: Vec<IntermediateTransaction>,
    ) -> Result<(), ProcessError> {
        Err(ProcessError::Forwarding("forwarder unavailable".into()))
    }
}

/// An account store that fails every write.
#[derive(Default)]
pub struct ReadOnlyAccounts {
    inner: InMemoryAccounts,
}

impl ReadOnlyAccounts {
    pub fn with_accounts<I: IntoIterator<Item = Account>>(accounts: I) -> Self {
        ReadOnlyAccounts {
            inner: InMemoryAccounts::with_accounts(accounts),
        }
    }
}

impl AccountsAdapter for ReadOnlyAccounts {
    fn load_account(&self, address: &Address) -> Result<Account, ProcessError> {
        self.inner.load_account(address)
    }

    fn save_account(&self, account: &Account) -> Result<(), ProcessError> {
        Err(ProcessError::AccountsStorage(format!(
            "store is read-only, cannot save {}",
            account.address
        )))
    }
}

/// A shard of [`TEST_SHARDS`] with in-memory collaborators, viewed from
/// shard [`SELF_SHARD`].
pub struct TestState {
    pub accounts: Arc<InMemoryAccounts>,
    pub fees: Arc<FeeAccumulator>,
    pub receipts: Arc<IntermediateResults>,
    pub bad_txs: Arc<IntermediateResults>,
    pub scrs: Arc<IntermediateResults>,
    pub sc_processor: Arc<RecordingScProcessor>,
    pub shard_coordinator: Arc<MultiShardCoordinator>,
    pub economics: Arc<dyn FeeHandler>,
    pub processor: TxProcessor,
}

impl TestState {
    pub fn new(economics: Arc<dyn FeeHandler>) -> Self {
        let shard_coordinator = Arc::new(
            MultiShardCoordinator::new(TEST_SHARDS, SELF_SHARD)
                .expect("test shard layout is valid"),
        );
        let coordinator: Arc<dyn ShardCoordinator> = shard_coordinator.clone();
        let accounts = Arc::new(InMemoryAccounts::new());
        let fees = Arc::new(FeeAccumulator::new());
        let receipts = Arc::new(IntermediateResults::new(
            BlockType::Receipt,
            coordinator.clone(),
        ));
        let bad_txs = Arc::new(IntermediateResults::new(
            BlockType::InvalidTransaction,
            coordinator.clone(),
        ));
        let scrs = Arc::new(IntermediateResults::new(
            BlockType::SmartContractResult,
            coordinator.clone(),
        ));
        let sc_processor = Arc::new(RecordingScProcessor::default());
        let processor = Self::wire(
            &accounts,
            &fees,
            &receipts,
            &bad_txs,
            &scrs,
            &sc_processor,
            &coordinator,
            &economics,
        )
        .build()
        .expect("every collaborator is wired");
        TestState {
            accounts,
            fees,
            receipts,
            bad_txs,
            scrs,
            sc_processor,
            shard_coordinator,
            economics,
            processor,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn wire(
        accounts: &Arc<InMemoryAccounts>,
        fees: &Arc<FeeAccumulator>,
        receipts: &Arc<IntermediateResults>,
        bad_txs: &Arc<IntermediateResults>,
        scrs: &Arc<IntermediateResults>,
        sc_processor: &Arc<RecordingScProcessor>,
        coordinator: &Arc<dyn ShardCoordinator>,
        economics: &Arc<dyn FeeHandler>,
    ) -> TxProcessorBuilder {
        let args_parser = Arc::new(CallDataParser);
        TxProcessor::builder()
            .accounts(accounts.clone())
            .shard_coordinator(coordinator.clone())
            .economics(economics.clone())
            .sc_processor(sc_processor.clone())
            .tx_fee_handler(fees.clone())
            .tx_type_handler(Arc::new(TxTypeClassifier::new(
                args_parser.clone(),
                coordinator.clone(),
                DEFAULT_BUILT_IN_FUNCTIONS.iter().cloned(),
            )))
            .args_parser(args_parser)
            .receipt_forwarder(receipts.clone())
            .bad_tx_forwarder(bad_txs.clone())
            .scr_forwarder(scrs.clone())
    }

    /// A builder wired to this state's collaborators, for swapping one out.
    pub fn processor_builder(&self) -> TxProcessorBuilder {
        let coordinator: Arc<dyn ShardCoordinator> = self.shard_coordinator.clone();
        Self::wire(
            &self.accounts,
            &self.fees,
            &self.receipts,
            &self.bad_txs,
            &self.scrs,
            &self.sc_processor,
            &coordinator,
            &self.economics,
        )
    }

    /// Draws a user address hosted by `shard`.
    pub fn user_in<R: Rng>(&self, rng: &mut R, shard: u32) -> Address {
        loop {
            let address = Address(rng.r#gen());
            if !address.is_smart_contract() && self.shard_coordinator.compute_id(&address) == shard {
                return address;
            }
        }
    }

    /// Draws a contract address hosted by `shard`.
    pub fn contract_in<R: Rng>(&self, rng: &mut R, shard: u32) -> Address {
        loop {
            let mut bytes: [u8; 32] = rng.r#gen();
            bytes[..8].fill(0);
            let address = Address(bytes);
            if !address.is_zero() && self.shard_coordinator.compute_id(&address) == shard {
                return address;
            }
        }
    }

    pub fn fund(&self, address: Address, balance: u64) {
        let mut account = self
            .accounts
            .load_account(&address)
            .expect("in-memory load");
        account.balance = Amount::from(balance);
        self.accounts.save_account(&account).expect("in-memory save");
    }

    pub fn set_user_name(&self, address: Address, user_name: &[u8]) {
        let mut account = self
            .accounts
            .load_account(&address)
            .expect("in-memory load");
        account.user_name = user_name.to_vec();
        self.accounts.save_account(&account).expect("in-memory save");
    }

    pub fn balance(&self, address: &Address) -> Amount {
        self.accounts
            .get_existing_account(address)
            .map(|account| account.balance)
            .unwrap_or_default()
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        self.accounts
            .get_existing_account(address)
            .map(|account| account.nonce)
            .unwrap_or_default()
    }

    pub fn apply(&self, tx: &Transaction) -> Result<ReturnCode, ProcessError> {
        self.processor.process_transaction(tx)
    }

    pub fn assert_apply(&self, tx: &Transaction, expected: ReturnCode) {
        match self.apply(tx) {
            Ok(code) => assert_eq!(code, expected, "unexpected return code"),
            Err(err) => panic!("transaction failed: {err}"),
        }
    }

    pub fn receipts(&self) -> Vec<Receipt> {
        self.receipts
            .records()
            .into_iter()
            .filter_map(|record| match record {
                IntermediateTransaction::Receipt(receipt) => Some(receipt),
                _ => None,
            })
            .collect()
    }

    pub fn scrs(&self) -> Vec<SmartContractResult> {
        self.scrs
            .records()
            .into_iter()
            .filter_map(|record| match record {
                IntermediateTransaction::ContractResult(scr) => Some(scr),
                _ => None,
            })
            .collect()
    }

    pub fn bad_txs(&self) -> Vec<Transaction> {
        self.bad_txs
            .records()
            .into_iter()
            .filter_map(|record| match record {
                IntermediateTransaction::Transaction(tx) => Some(tx),
                _ => None,
            })
            .collect()
    }
}

pub fn transfer(
    sender: Address,
    receiver: Address,
    nonce: u64,
    value: u64,
    gas_price: u64,
    gas_limit: u64,
) -> Transaction {
    Transaction {
        nonce,
        value: Amount::from(value),
        sender,
        receiver,
        gas_price,
        gas_limit,
        ..Default::default()
    }
}

/// Wraps `inner` into a relayed transaction sent by `relayer` to the inner sender.
pub fn relayed(
    relayer: Address,
    nonce: u64,
    inner: &Transaction,
    value: u64,
    gas_price: u64,
    gas_limit: u64,
) -> Transaction {
    Transaction {
        data: inner
            .to_relayed_data()
            .expect("transactions always marshal"),
        ..transfer(relayer, inner.sender, nonce, value, gas_price, gas_limit)
    }
}
