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

use crate::interfaces::{ArgumentsParser, ShardCoordinator, TxTypeHandler};
use crate::structure::{CallType, RELAYED_TX_FUNCTION, TransactionHandler, TransactionType};
use std::collections::HashSet;
use std::sync::Arc;

/// Classifies transactions by their receiver and call data.
///
/// Calls to contracts hosted by another shard are plain transfers here; the
/// destination shard executes them.
pub struct TxTypeClassifier {
    args_parser: Arc<dyn ArgumentsParser>,
    shard_coordinator: Arc<dyn ShardCoordinator>,
    built_in_functions: HashSet<String>,
}

impl TxTypeClassifier {
    pub fn new<I, S>(
        args_parser: Arc<dyn ArgumentsParser>,
        shard_coordinator: Arc<dyn ShardCoordinator>,
        built_in_functions: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TxTypeClassifier {
            args_parser,
            shard_coordinator,
            built_in_functions: built_in_functions.into_iter().map(Into::into).collect(),
        }
    }

    /// The function name in the call data; empty when it cannot be parsed.
    fn function_name(&self, data: &[u8]) -> String {
        self.args_parser
            .parse_call_data(data)
            .map(|(function, _)| function)
            .unwrap_or_default()
    }
}

impl TxTypeHandler for TxTypeClassifier {
    fn compute_transaction_type(&self, tx: &dyn TransactionHandler) -> TransactionType {
        if tx.receiver().is_zero() {
            return if tx.data().is_empty() {
                TransactionType::Invalid
            } else {
                TransactionType::SCDeployment
            };
        }
        if tx.data().is_empty() {
            return TransactionType::MoveBalance;
        }

        let function = self.function_name(tx.data());
        if function.is_empty() {
            return TransactionType::MoveBalance;
        }
        if self.built_in_functions.contains(&function) {
            return TransactionType::BuiltInFunctionCall;
        }
        if tx.call_type() == CallType::AsynchronousCallBack {
            return TransactionType::SCInvoking;
        }
        if function == RELAYED_TX_FUNCTION {
            return TransactionType::RelayedTx;
        }
        if tx.receiver().is_smart_contract() && self.shard_coordinator.is_in_self_shard(tx.receiver())
        {
            return TransactionType::SCInvoking;
        }
        TransactionType::MoveBalance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::CallDataParser;
    use crate::sharding::MultiShardCoordinator;
    use crate::structure::{ADDRESS_LEN, Address, SmartContractResult, Transaction};

    fn classifier() -> TxTypeClassifier {
        TxTypeClassifier::new(
            Arc::new(CallDataParser),
            Arc::new(MultiShardCoordinator::new(2, 0).unwrap()),
            ["SetUserName"],
        )
    }

    fn contract() -> Address {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[20] = 9;
        Address(bytes)
    }

    fn foreign_contract() -> Address {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[20] = 9;
        bytes[ADDRESS_LEN - 1] = 1;
        Address(bytes)
    }

    fn tx(receiver: Address, data: &[u8]) -> Transaction {
        Transaction {
            sender: Address([1; ADDRESS_LEN]),
            receiver,
            data: data.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn deployment_needs_a_payload() {
        let classifier = classifier();
        assert_eq!(
            classifier.compute_transaction_type(&tx(Address::ZERO, b"code")),
            TransactionType::SCDeployment
        );
        assert_eq!(
            classifier.compute_transaction_type(&tx(Address::ZERO, b"")),
            TransactionType::Invalid
        );
    }

    #[test]
    fn classifies_by_function_and_receiver() {
        let classifier = classifier();
        let user = Address([3; ADDRESS_LEN]);
        let cases = [
            (user, "", TransactionType::MoveBalance),
            (user, "a note", TransactionType::MoveBalance),
            (user, "SetUserName@616c696365", TransactionType::BuiltInFunctionCall),
            (user, "relayedTx@00", TransactionType::RelayedTx),
            (contract(), "", TransactionType::MoveBalance),
            (contract(), "increment", TransactionType::SCInvoking),
            (contract(), "@00", TransactionType::MoveBalance),
            (foreign_contract(), "increment", TransactionType::MoveBalance),
        ];
        for (receiver, data, expected) in cases {
            assert_eq!(
                classifier.compute_transaction_type(&tx(receiver, data.as_bytes())),
                expected,
                "data {data:?}"
            );
        }
    }

    #[test]
    fn callbacks_invoke_contracts() {
        let scr = SmartContractResult {
            sender: contract(),
            receiver: Address([3; ADDRESS_LEN]),
            data: b"callBack".to_vec(),
            call_type: CallType::AsynchronousCallBack,
            ..Default::default()
        };
        assert_eq!(
            classifier().compute_transaction_type(&scr),
            TransactionType::SCInvoking
        );
    }
}
