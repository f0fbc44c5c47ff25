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

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use sharded_ledger::economics::EconomicsData;
use sharded_ledger::interfaces::ArgumentsParser;
use sharded_ledger::parameters::EconomicsParameters;
use sharded_ledger::parser::CallDataParser;
use sharded_ledger::structure::Transaction;
use sharded_ledger::test_utilities::{TestState, relayed, transfer};
use std::hint::black_box;
use std::sync::Arc;

fn state() -> TestState {
    TestState::new(Arc::new(EconomicsData::new(EconomicsParameters {
        min_gas_price: 1,
        min_gas_limit: 10,
        gas_per_data_byte: 1,
        max_gas_limit_per_block: 1_000_000,
    })))
}

/// Applies `tx` and rolls the accounts back, so every iteration sees the same nonce.
fn apply_and_revert(state: &TestState, tx: &Transaction) {
    let snapshot = state.accounts.journal_len();
    black_box(state.apply(tx).unwrap());
    state.accounts.revert_to_snapshot(snapshot).unwrap();
    state.fees.create_block_started();
    state.receipts.create_all_inter_mini_blocks();
    state.scrs.create_all_inter_mini_blocks();
}

pub fn move_balance(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0x42);
    let state = state();
    let sender = state.user_in(&mut rng, 0);
    let local = state.user_in(&mut rng, 0);
    let foreign = state.user_in(&mut rng, 1);
    state.fund(sender, 1_000_000);

    let local_tx = transfer(sender, local, 0, 100, 1, 50);
    c.bench_function("move_balance_local", |b| {
        b.iter(|| apply_and_revert(&state, &local_tx))
    });
    let cross_tx = transfer(sender, foreign, 0, 100, 1, 50);
    c.bench_function("move_balance_cross_shard", |b| {
        b.iter(|| apply_and_revert(&state, &cross_tx))
    });
}

pub fn relayed_transfer(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0x42);
    let state = state();
    let relayer = state.user_in(&mut rng, 0);
    let user = state.user_in(&mut rng, 0);
    let destination = state.user_in(&mut rng, 0);
    state.fund(relayer, 1_000_000);

    let inner = transfer(user, destination, 0, 100, 1, 10);
    let outer = relayed(relayer, 0, &inner, 100, 1, 5_000);
    c.bench_function("relayed_transfer", |b| {
        b.iter(|| apply_and_revert(&state, &outer))
    });
}

pub fn call_data_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_data_parsing");
    for args in [1usize, 8, 64] {
        let data = format!("function{}", "@0a0b0c0d".repeat(args)).into_bytes();
        group.bench_with_input(BenchmarkId::from_parameter(args), &data, |b, data| {
            b.iter(|| CallDataParser.parse_call_data(black_box(data)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(processing, move_balance, relayed_transfer);
criterion_group!(parsing, call_data_parsing);
criterion_main!(processing, parsing);
