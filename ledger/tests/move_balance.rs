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

use num_traits::Zero;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use sharded_ledger::economics::EconomicsData;
use sharded_ledger::error::{ProcessError, TransactionInvalid};
use sharded_ledger::interfaces::ShardCoordinator;
use sharded_ledger::parameters::EconomicsParameters;
use sharded_ledger::sharding::MultiShardCoordinator;
use sharded_ledger::structure::{
    ADDRESS_LEN, Address, Amount, METACHAIN_ADDRESS_MARKER, METACHAIN_SHARD_ID,
    REFUNDED_GAS_MARKER, ReturnCode,
};
use sharded_ledger::test_utilities::{SELF_SHARD, TEST_SHARDS, TestState, transfer};
use std::sync::Arc;

// fee = (10 + 2 * data bytes) * gas price
fn economics() -> Arc<EconomicsData> {
    Arc::new(EconomicsData::new(EconomicsParameters {
        min_gas_price: 1,
        min_gas_limit: 10,
        gas_per_data_byte: 2,
        max_gas_limit_per_block: 10_000,
    }))
}

fn setup() -> (TestState, StdRng) {
    (TestState::new(economics()), StdRng::seed_from_u64(0x42))
}

#[test]
fn local_transfer() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    let receiver = state.user_in(&mut rng, 0);
    state.fund(sender, 1_000);

    let tx = transfer(sender, receiver, 0, 100, 2, 50);
    state.assert_apply(&tx, ReturnCode::Ok);

    assert_eq!(state.balance(&sender), Amount::from(880u32));
    assert_eq!(state.balance(&receiver), Amount::from(100u32));
    assert_eq!(state.nonce(&sender), 1);
    assert_eq!(state.nonce(&receiver), 0);
    assert_eq!(state.fees.accumulated_fees(), Amount::from(20u32));
    assert_eq!(state.fees.fee_for(&tx.hash()), Some(Amount::from(20u32)));

    let receipts = state.receipts();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].data, REFUNDED_GAS_MARKER);
    assert_eq!(receipts[0].value, Amount::from(80u32));
    assert_eq!(receipts[0].tx_hash, tx.hash());
    assert!(state.bad_txs().is_empty());
}

#[test]
fn exact_gas_budget_issues_no_refund() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    let receiver = state.user_in(&mut rng, 0);
    state.fund(sender, 1_000);

    state.assert_apply(&transfer(sender, receiver, 0, 1, 3, 10), ReturnCode::Ok);
    assert_eq!(state.balance(&sender), Amount::from(969u32));
    assert!(state.receipts().is_empty());
}

#[test]
fn insufficient_funds_charges_the_fee() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    let receiver = state.user_in(&mut rng, 0);
    state.fund(sender, 110);

    let tx = transfer(sender, receiver, 0, 100, 2, 50);
    state.assert_apply(&tx, ReturnCode::UserError);

    assert_eq!(state.balance(&sender), Amount::from(90u32));
    assert_eq!(state.nonce(&sender), 1);
    assert!(state.balance(&receiver).is_zero());
    assert_eq!(state.bad_txs(), vec![tx.clone()]);

    let receipts = state.receipts();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].value, Amount::from(20u32));
    assert_eq!(receipts[0].tx_hash, tx.hash());
    assert!(receipts[0].data_str().starts_with("insufficient funds"));
    assert_eq!(state.fees.accumulated_fees(), Amount::from(20u32));
}

#[test]
fn rejected_transactions_leave_no_trace() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    let receiver = state.user_in(&mut rng, 0);
    state.fund(sender, 10);

    let poor = transfer(sender, receiver, 0, 0, 2, 50);
    assert!(matches!(
        state.apply(&poor),
        Err(ProcessError::TransactionInvalid(
            TransactionInvalid::InsufficientFee { .. }
        ))
    ));

    let early = transfer(sender, receiver, 3, 0, 1, 50);
    let err = state.apply(&early).unwrap_err();
    assert!(matches!(
        err,
        ProcessError::TransactionInvalid(TransactionInvalid::HigherNonceInTransaction {
            account_nonce: 0,
            tx_nonce: 3
        })
    ));
    assert_eq!(err.return_code(), Some(ReturnCode::UserError));

    let cheap = transfer(sender, receiver, 0, 0, 0, 50);
    assert!(matches!(
        state.apply(&cheap),
        Err(ProcessError::TransactionInvalid(
            TransactionInvalid::InsufficientGasPrice { .. }
        ))
    ));

    assert_eq!(state.balance(&sender), Amount::from(10u32));
    assert_eq!(state.nonce(&sender), 0);
    assert!(state.receipts().is_empty());
    assert!(state.bad_txs().is_empty());
}

#[test]
fn self_transfer_pays_the_fee_once() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    state.fund(sender, 500);

    state.assert_apply(&transfer(sender, sender, 0, 100, 2, 10), ReturnCode::Ok);
    assert_eq!(state.balance(&sender), Amount::from(480u32));
    assert_eq!(state.nonce(&sender), 1);
}

#[test]
fn outgoing_cross_shard_transfer_debits_only_the_sender() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    let receiver = state.user_in(&mut rng, 1);
    state.fund(sender, 1_000);

    state.assert_apply(&transfer(sender, receiver, 0, 100, 2, 50), ReturnCode::Ok);
    assert_eq!(state.balance(&sender), Amount::from(880u32));
    assert!(state.accounts.get_existing_account(&receiver).is_none());
}

#[test]
fn incoming_cross_shard_transfer_credits_the_receiver() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 1);
    let receiver = state.user_in(&mut rng, 0);

    state.assert_apply(&transfer(sender, receiver, 7, 100, 2, 50), ReturnCode::Ok);
    assert_eq!(state.balance(&receiver), Amount::from(100u32));
    assert!(state.accounts.get_existing_account(&sender).is_none());
    assert!(state.receipts().is_empty());
    assert!(state.fees.accumulated_fees().is_zero());
}

#[test]
fn cross_shard_contract_call_locks_the_gas_budget() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    let contract = state.contract_in(&mut rng, 1);
    state.fund(sender, 1_000);

    let mut tx = transfer(sender, contract, 0, 100, 2, 100);
    tx.data = b"increment".to_vec();
    state.assert_apply(&tx, ReturnCode::Ok);

    // whole budget of 200 plus the value
    assert_eq!(state.balance(&sender), Amount::from(700u32));
    assert_eq!(state.fees.accumulated_fees(), Amount::from(56u32));
    assert!(state.receipts().is_empty());
    assert!(state.sc_processor.calls().is_empty());
}

#[test]
fn plain_transfer_to_a_metachain_contract_is_refused() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    state.fund(sender, 1_000);
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes[12] = 0x51;
    bytes[ADDRESS_LEN - 1] = METACHAIN_ADDRESS_MARKER;
    let system_contract = Address(bytes);
    assert_eq!(
        state.shard_coordinator.compute_id(&system_contract),
        METACHAIN_SHARD_ID
    );

    let tx = transfer(sender, system_contract, 0, 100, 1, 10);
    state.assert_apply(&tx, ReturnCode::UserError);

    assert_eq!(state.balance(&sender), Amount::from(990u32));
    assert_eq!(state.nonce(&sender), 1);
    let receipts = state.receipts();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].data_str(), "invalid meta transaction");
}

// Routes one extra address into the metachain.
struct MetachainAlias {
    inner: MultiShardCoordinator,
    alias: Address,
}

impl ShardCoordinator for MetachainAlias {
    fn self_id(&self) -> u32 {
        self.inner.self_id()
    }

    fn number_of_shards(&self) -> u32 {
        self.inner.number_of_shards()
    }

    fn compute_id(&self, address: &Address) -> u32 {
        if *address == self.alias {
            METACHAIN_SHARD_ID
        } else {
            self.inner.compute_id(address)
        }
    }
}

#[test]
fn metachain_routing_comes_from_the_shard_coordinator() {
    let (state, mut rng) = setup();
    let alias = Address([0x42; ADDRESS_LEN]);
    assert!(!alias.is_smart_contract_on_metachain());
    let processor = state
        .processor_builder()
        .shard_coordinator(Arc::new(MetachainAlias {
            inner: MultiShardCoordinator::new(TEST_SHARDS, SELF_SHARD).unwrap(),
            alias,
        }))
        .build()
        .unwrap();
    let sender = state.user_in(&mut rng, 0);
    state.fund(sender, 1_000);

    let tx = transfer(sender, alias, 0, 100, 1, 10);
    assert_eq!(processor.process_transaction(&tx).unwrap(), ReturnCode::UserError);

    assert_eq!(state.balance(&sender), Amount::from(990u32));
    assert_eq!(state.nonce(&sender), 1);
    let receipts = state.receipts();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].data_str(), "invalid meta transaction");
    assert_eq!(state.bad_txs(), vec![tx]);
}

#[test]
fn transfer_to_a_local_contract_issues_no_refund() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    let contract = state.contract_in(&mut rng, 0);
    state.fund(sender, 1_000);

    let tx = transfer(sender, contract, 0, 100, 2, 50);
    state.assert_apply(&tx, ReturnCode::Ok);

    assert_eq!(state.balance(&sender), Amount::from(880u32));
    assert_eq!(state.balance(&contract), Amount::from(100u32));
    assert_eq!(state.fees.fee_for(&tx.hash()), Some(Amount::from(20u32)));
    assert!(state.receipts().is_empty());
    assert!(state.sc_processor.calls().is_empty());
}

#[test]
fn mismatched_receiver_user_name_from_another_shard_returns_the_value() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 1);
    let receiver = state.user_in(&mut rng, 0);
    state.set_user_name(receiver, b"alice");

    let mut tx = transfer(sender, receiver, 0, 100, 1, 10);
    tx.receiver_user_name = b"bob".to_vec();
    state.assert_apply(&tx, ReturnCode::UserError);

    assert!(state.balance(&receiver).is_zero());
    let scrs = state.scrs();
    assert_eq!(scrs.len(), 1);
    assert_eq!(scrs[0].sender, receiver);
    assert_eq!(scrs[0].receiver, sender);
    assert_eq!(scrs[0].value, Amount::from(100u32));
    assert_eq!(scrs[0].original_tx_hash, tx.hash());
    assert_eq!(scrs[0].prev_tx_hash, tx.hash());
    assert_eq!(
        scrs[0].return_message_str(),
        "user name does not match in destination shard"
    );
    assert_eq!(state.bad_txs(), vec![tx]);
}

#[test]
fn mismatched_user_name_within_the_shard_is_rejected() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    let receiver = state.user_in(&mut rng, 0);
    state.fund(sender, 1_000);
    state.set_user_name(receiver, b"alice");

    let mut tx = transfer(sender, receiver, 0, 100, 1, 10);
    tx.receiver_user_name = b"bob".to_vec();
    assert!(matches!(
        state.apply(&tx),
        Err(ProcessError::TransactionInvalid(
            TransactionInvalid::UserNameDoesNotMatch
        ))
    ));

    tx.receiver_user_name = b"alice".to_vec();
    state.assert_apply(&tx, ReturnCode::Ok);
    assert_eq!(state.balance(&receiver), Amount::from(100u32));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn local_transfers_conserve_value(
        balance in 0u64..10_000,
        value in 0u64..10_000,
        gas_price in 1u64..20,
        extra_gas in 0u64..100,
    ) {
        let (state, mut rng) = setup();
        let sender = state.user_in(&mut rng, 0);
        let receiver = state.user_in(&mut rng, 0);
        state.fund(sender, balance);

        let tx = transfer(sender, receiver, 0, value, gas_price, 10 + extra_gas);
        let fee = 10 * gas_price;
        let result = state.apply(&tx);

        if balance < fee {
            prop_assert!(result.is_err());
            prop_assert_eq!(state.balance(&sender), Amount::from(balance));
        } else if balance < fee + value {
            prop_assert_eq!(result.ok(), Some(ReturnCode::UserError));
            prop_assert_eq!(state.balance(&sender), Amount::from(balance - fee));
            prop_assert!(state.balance(&receiver).is_zero());
        } else {
            prop_assert_eq!(result.ok(), Some(ReturnCode::Ok));
            prop_assert_eq!(state.balance(&sender), Amount::from(balance - fee - value));
            prop_assert_eq!(state.balance(&receiver), Amount::from(value));
        }
        let total = state.balance(&sender) + state.balance(&receiver) + state.fees.accumulated_fees();
        prop_assert_eq!(total, Amount::from(balance));
    }
}
