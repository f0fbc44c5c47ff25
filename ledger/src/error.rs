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

use crate::structure::{Address, Amount, ReturnCode};
use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Reasons a transaction is rejected at user level.
///
/// The `Display` text of these is what receipts and smart contract results
/// carry back to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionInvalid {
    HigherNonceInTransaction {
        account_nonce: u64,
        tx_nonce: u64,
    },
    LowerNonceInTransaction {
        account_nonce: u64,
        tx_nonce: u64,
    },
    InsufficientGasPrice {
        provided: u64,
        minimum: u64,
    },
    InsufficientGasLimit {
        provided: u64,
        required: u64,
    },
    TooMuchGas {
        provided: u64,
        maximum: u64,
    },
    InsufficientFee {
        balance: Amount,
        fee: Amount,
    },
    InsufficientFunds {
        balance: Amount,
        required: Amount,
    },
    UserNameDoesNotMatch,
    UserNameDoesNotMatchInCrossShardTx,
    WrongTransaction,
    InvalidMetaTransaction,
    InvalidArguments {
        expected: usize,
        actual: usize,
    },
    MalformedUserTransaction(String),
    RelayedTxBeneficiaryDoesNotMatchReceiver {
        beneficiary: Address,
        receiver: Address,
    },
    RelayedTxValueHigherThanUserTxValue {
        relayed: Amount,
        user: Amount,
    },
}

impl Display for TransactionInvalid {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        use TransactionInvalid::*;
        match self {
            HigherNonceInTransaction {
                account_nonce,
                tx_nonce,
            } => write!(
                formatter,
                "higher nonce in transaction: account is at {account_nonce}, transaction has {tx_nonce}"
            ),
            LowerNonceInTransaction {
                account_nonce,
                tx_nonce,
            } => write!(
                formatter,
                "lower nonce in transaction: account is at {account_nonce}, transaction has {tx_nonce}"
            ),
            InsufficientGasPrice { provided, minimum } => write!(
                formatter,
                "insufficient gas price: {provided} is below the minimum of {minimum}"
            ),
            InsufficientGasLimit { provided, required } => write!(
                formatter,
                "insufficient gas limit: {provided} provided, {required} required"
            ),
            TooMuchGas { provided, maximum } => write!(
                formatter,
                "higher gas limit than the block maximum: {provided} > {maximum}"
            ),
            InsufficientFee { balance, fee } => write!(
                formatter,
                "insufficient balance for fees: balance {balance}, fee {fee}"
            ),
            InsufficientFunds { balance, required } => write!(
                formatter,
                "insufficient funds: balance {balance}, required {required}"
            ),
            UserNameDoesNotMatch => formatter.write_str("user name does not match"),
            UserNameDoesNotMatchInCrossShardTx => {
                formatter.write_str("user name does not match in destination shard")
            }
            WrongTransaction => formatter.write_str("wrong transaction"),
            InvalidMetaTransaction => formatter.write_str("invalid meta transaction"),
            InvalidArguments { expected, actual } => write!(
                formatter,
                "invalid arguments: expected {expected}, got {actual}"
            ),
            MalformedUserTransaction(reason) => {
                write!(formatter, "malformed relayed user transaction: {reason}")
            }
            RelayedTxBeneficiaryDoesNotMatchReceiver {
                beneficiary,
                receiver,
            } => write!(
                formatter,
                "relayed tx beneficiary does not match receiver: user transaction sender {beneficiary}, relayed receiver {receiver}"
            ),
            RelayedTxValueHigherThanUserTxValue { relayed, user } => write!(
                formatter,
                "relayed tx value higher than user tx value: {relayed} > {user}"
            ),
        }
    }
}

impl Error for TransactionInvalid {}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    EmptyCallData,
    MissingFunctionName,
    InvalidFunctionName,
    InvalidHexArgument { index: usize, source: hex::FromHexError },
}

impl Display for ParseError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::EmptyCallData => formatter.write_str("call data is empty"),
            ParseError::MissingFunctionName => formatter.write_str("call data has no function name"),
            ParseError::InvalidFunctionName => {
                formatter.write_str("call data function name is not valid UTF-8")
            }
            ParseError::InvalidHexArgument { index, source } => {
                write!(formatter, "argument {index} is not valid hex: {source}")
            }
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParseError::InvalidHexArgument { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ProcessError {
    MalformedTransaction(String),
    TransactionInvalid(TransactionInvalid),
    MissingAccount(Address),
    BalanceCheckOutOfBounds {
        address: Address,
        current_balance: Amount,
        operation_value: Amount,
    },
    AccountsStorage(String),
    CallData(ParseError),
    Forwarding(String),
    SmartContract(String),
    MissingCollaborator(&'static str),
}

impl ProcessError {
    /// Whether the error signals an infrastructure fault rather than a
    /// rejected transaction.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ProcessError::TransactionInvalid(_))
    }

    /// The return code that accompanies this error, if the transaction was
    /// rejected at user level.
    pub fn return_code(&self) -> Option<ReturnCode> {
        match self {
            ProcessError::TransactionInvalid(_) => Some(ReturnCode::UserError),
            _ => None,
        }
    }
}

impl Display for ProcessError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        use ProcessError::*;
        match self {
            MalformedTransaction(reason) => write!(formatter, "malformed transaction: {reason}"),
            TransactionInvalid(reason) => write!(formatter, "transaction invalid: {reason}"),
            MissingAccount(address) => write!(formatter, "account {address} is not available"),
            BalanceCheckOutOfBounds {
                address,
                current_balance,
                operation_value,
            } => write!(
                formatter,
                "Balance check failed: couldn't subtract {operation_value} from {current_balance} for account {address}: underflow"
            ),
            AccountsStorage(reason) => write!(formatter, "accounts storage failure: {reason}"),
            CallData(err) => write!(formatter, "failed to parse call data: {err}"),
            Forwarding(reason) => write!(formatter, "failed to forward derived records: {reason}"),
            SmartContract(reason) => write!(formatter, "smart contract execution failed: {reason}"),
            MissingCollaborator(name) => {
                write!(formatter, "transaction processor is missing its {name}")
            }
        }
    }
}

impl Error for ProcessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProcessError::TransactionInvalid(e) => Some(e),
            ProcessError::CallData(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransactionInvalid> for ProcessError {
    fn from(err: TransactionInvalid) -> Self {
        ProcessError::TransactionInvalid(err)
    }
}

impl From<ParseError> for ProcessError {
    fn from(err: ParseError) -> Self {
        ProcessError::CallData(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rejections_carry_a_return_code() {
        let rejected: ProcessError = TransactionInvalid::WrongTransaction.into();
        assert_eq!(rejected.return_code(), Some(ReturnCode::UserError));
        assert!(!rejected.is_fatal());

        let fatal = ProcessError::Forwarding("closed".into());
        assert_eq!(fatal.return_code(), None);
        assert!(fatal.is_fatal());
    }

    #[test]
    fn receipt_text_names_the_reason() {
        let reason = TransactionInvalid::InsufficientFunds {
            balance: Amount::from(5u32),
            required: Amount::from(9u32),
        };
        assert_eq!(reason.to_string(), "insufficient funds: balance 5, required 9");
    }
}
