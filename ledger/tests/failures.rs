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

use rand::SeedableRng;
use rand::rngs::StdRng;
use sharded_ledger::economics::EconomicsData;
use sharded_ledger::error::{ProcessError, TransactionInvalid};
use sharded_ledger::parameters::EconomicsParameters;
use sharded_ledger::structure::{Account, Address, Amount, ReturnCode, Transaction};
use sharded_ledger::test_utilities::{
    FailingForwarder, ReadOnlyAccounts, ScCallKind, TestState, relayed, transfer,
};
use std::sync::Arc;

fn setup() -> (TestState, StdRng) {
    let economics = EconomicsData::new(EconomicsParameters {
        min_gas_price: 1,
        min_gas_limit: 10,
        gas_per_data_byte: 1,
        max_gas_limit_per_block: 10_000,
    });
    (TestState::new(Arc::new(economics)), StdRng::seed_from_u64(0x42))
}

#[test]
fn zero_sender_is_malformed() {
    let (state, mut rng) = setup();
    let receiver = state.user_in(&mut rng, 0);
    let tx = transfer(Address::ZERO, receiver, 0, 1, 1, 10);
    assert!(matches!(
        state.apply(&tx),
        Err(ProcessError::MalformedTransaction(_))
    ));
}

#[test]
fn deployment_goes_to_the_executor() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    state.fund(sender, 1_000);

    let tx = Transaction {
        data: b"0061736d".to_vec(),
        ..transfer(sender, Address::ZERO, 0, 0, 1, 100)
    };
    state.assert_apply(&tx, ReturnCode::Ok);

    let calls = state.sc_processor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, ScCallKind::Deploy);
    assert_eq!(
        calls[0].sender_account.as_ref().map(|a| a.address),
        Some(sender)
    );
    assert!(calls[0].relayer.is_none());
}

#[test]
fn deployment_without_code_is_wrong() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    state.fund(sender, 1_000);

    let tx = transfer(sender, Address::ZERO, 0, 0, 1, 100);
    assert!(matches!(
        state.apply(&tx),
        Err(ProcessError::TransactionInvalid(
            TransactionInvalid::WrongTransaction
        ))
    ));
    assert!(state.sc_processor.calls().is_empty());
    assert_eq!(state.nonce(&sender), 0);
}

#[test]
fn local_contract_calls_and_built_ins_are_executed() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    let contract = state.contract_in(&mut rng, 0);
    state.fund(sender, 1_000);

    let call = Transaction {
        data: b"increment@01".to_vec(),
        ..transfer(sender, contract, 0, 5, 1, 100)
    };
    state.assert_apply(&call, ReturnCode::Ok);

    let built_in = Transaction {
        data: b"SetUserName@616c696365".to_vec(),
        ..transfer(sender, sender, 0, 0, 1, 100)
    };
    state.assert_apply(&built_in, ReturnCode::Ok);

    let calls = state.sc_processor.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call.kind == ScCallKind::Execute));
    assert_eq!(calls[0].receiver, contract);
    assert!(calls[0].receiver_account.is_some());
    assert_eq!(calls[0].value, Amount::from(5u32));
    assert_eq!(calls[1].sender_account, calls[1].receiver_account);
}

#[test]
fn executor_user_error_is_reported() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    let contract = state.contract_in(&mut rng, 0);
    state.fund(sender, 1_000);
    state.sc_processor.respond_with(ReturnCode::UserError);

    let call = Transaction {
        data: b"increment".to_vec(),
        ..transfer(sender, contract, 0, 5, 1, 100)
    };
    state.assert_apply(&call, ReturnCode::UserError);
}

#[test]
fn failing_receipt_forwarder_aborts_before_charging() {
    let (state, mut rng) = setup();
    let processor = state
        .processor_builder()
        .receipt_forwarder(Arc::new(FailingForwarder))
        .build()
        .unwrap();
    let sender = state.user_in(&mut rng, 0);
    let receiver = state.user_in(&mut rng, 0);
    state.fund(sender, 50);

    let tx = transfer(sender, receiver, 0, 100, 1, 10);
    let err = processor.process_transaction(&tx).unwrap_err();
    assert!(matches!(err, ProcessError::Forwarding(_)));
    assert!(err.is_fatal());
    assert_eq!(state.balance(&sender), Amount::from(50u32));
    assert_eq!(state.nonce(&sender), 0);
}

#[test]
fn journal_reverts_a_relayed_transaction_that_failed_to_forward() {
    let (state, mut rng) = setup();
    let processor = state
        .processor_builder()
        .scr_forwarder(Arc::new(FailingForwarder))
        .build()
        .unwrap();
    let relayer = state.user_in(&mut rng, 0);
    let user = state.user_in(&mut rng, 0);
    let destination = state.user_in(&mut rng, 0);
    state.fund(relayer, 10_000);
    let root = state.accounts.commit();

    let inner = transfer(user, destination, 0, 100, 1, 10);
    let outer = relayed(relayer, 0, &inner, 100, 1, 2_000);
    let snapshot = state.accounts.journal_len();

    let err = processor.process_transaction(&outer).unwrap_err();
    assert!(matches!(err, ProcessError::Forwarding(_)));
    assert_eq!(state.balance(&destination), Amount::from(100u32));

    state.accounts.revert_to_snapshot(snapshot).unwrap();
    state.fees.revert_fees(&[outer.hash(), inner.hash()]);
    assert_eq!(state.accounts.commit(), root);
    assert_eq!(state.balance(&relayer), Amount::from(10_000u32));
    assert!(state.fees.accumulated_fees() == Amount::from(0u32));
}

#[test]
fn storage_failures_propagate() {
    let (state, mut rng) = setup();
    let sender = state.user_in(&mut rng, 0);
    let receiver = state.user_in(&mut rng, 0);
    let processor = state
        .processor_builder()
        .accounts(Arc::new(ReadOnlyAccounts::with_accounts([
            Account::with_balance(sender, 1_000u32),
        ])))
        .build()
        .unwrap();

    let err = processor
        .process_transaction(&transfer(sender, receiver, 0, 1, 1, 10))
        .unwrap_err();
    assert!(matches!(err, ProcessError::AccountsStorage(_)));
    assert_eq!(err.return_code(), None);
}
