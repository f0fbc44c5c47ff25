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

//! The data model processed by a shard: transactions, accounts and the
//! derived records (receipts and smart contract results) emitted while
//! executing them.

use crate::error::ProcessError;
use base_crypto::hash::{HashOutput, domain_hash};
use base_crypto::repr::{BinaryHashRepr, MemWrite};
use num_bigint::BigUint;
use num_traits::{CheckedSub, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Debug, Display, Formatter};

/// An arbitrary-precision, non-negative token amount.
pub type Amount = BigUint;

/// The number of bytes in an [`Address`].
pub const ADDRESS_LEN: usize = 32;
/// Leading zero bytes that mark an address as a smart contract.
pub const SMART_CONTRACT_PREFIX_LEN: usize = 8;
/// The last byte of a smart contract address hosted on the metachain.
pub const METACHAIN_ADDRESS_MARKER: u8 = 0xff;
/// The shard identifier of the coordination shard.
pub const METACHAIN_SHARD_ID: u32 = u32::MAX;
/// The call data function name that marks a relayed transaction.
pub const RELAYED_TX_FUNCTION: &str = "relayedTx";
/// Receipt data for gas refunds.
pub const REFUNDED_GAS_MARKER: &[u8] = b"refundedGas";

const TRANSACTION_HASH_DOMAIN: &str = "sharded-ledger:transaction";
const CONTRACT_RESULT_HASH_DOMAIN: &str = "sharded-ledger:contract-result";

#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The deployment target: transactions sent here with a payload deploy a contract.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn is_smart_contract(&self) -> bool {
        self.0[..SMART_CONTRACT_PREFIX_LEN].iter().all(|b| *b == 0)
    }

    pub fn is_smart_contract_on_metachain(&self) -> bool {
        self.is_smart_contract() && self.0[ADDRESS_LEN - 1] == METACHAIN_ADDRESS_MARKER
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl BinaryHashRepr for Address {
    fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
        self.0.binary_repr(writer)
    }
    fn binary_len(&self) -> usize {
        ADDRESS_LEN
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(&encoded, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(Address(bytes))
    }
}

/// The correlation key linking receipts and smart contract results to the
/// transaction that caused them.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub HashOutput);

impl Debug for TransactionHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for TransactionHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl BinaryHashRepr for TransactionHash {
    fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
        self.0.binary_repr(writer)
    }
    fn binary_len(&self) -> usize {
        self.0.binary_len()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    /// The ledger accepted the transaction's effects as intended.
    Ok,
    /// The transaction is included, fees apply, but its intended effect was rejected.
    UserError,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransactionType {
    MoveBalance,
    SCDeployment,
    SCInvoking,
    BuiltInFunctionCall,
    RelayedTx,
    Invalid,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallType {
    #[default]
    DirectCall,
    AsynchronousCall,
    AsynchronousCallBack,
}

impl BinaryHashRepr for CallType {
    fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
        let tag: u8 = match self {
            CallType::DirectCall => 0,
            CallType::AsynchronousCall => 1,
            CallType::AsynchronousCallBack => 2,
        };
        tag.binary_repr(writer)
    }
    fn binary_len(&self) -> usize {
        1
    }
}

/// Uniform read access to anything that moves value between two addresses.
///
/// Classification and smart contract execution accept both user transactions
/// and smart contract results through this trait.
pub trait TransactionHandler: Debug {
    fn nonce(&self) -> u64;
    fn value(&self) -> &Amount;
    fn sender(&self) -> &Address;
    fn receiver(&self) -> &Address;
    fn data(&self) -> &[u8];
    fn gas_price(&self) -> u64;
    fn gas_limit(&self) -> u64;
    fn call_type(&self) -> CallType {
        CallType::DirectCall
    }
    fn relayer(&self) -> Option<&Address> {
        None
    }
    fn original_tx_hash(&self) -> Option<&TransactionHash> {
        None
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub nonce: u64,
    #[serde(with = "decimal_amount")]
    pub value: Amount,
    pub receiver: Address,
    pub sender: Address,
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "hex_bytes")]
    pub receiver_user_name: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "hex_bytes")]
    pub sender_user_name: Vec<u8>,
    pub gas_price: u64,
    pub gas_limit: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "hex_bytes")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "hex_bytes")]
    pub signature: Vec<u8>,
}

impl Transaction {
    pub fn hash(&self) -> TransactionHash {
        TransactionHash(domain_hash(TRANSACTION_HASH_DOMAIN, self))
    }

    pub fn check_well_formed(&self) -> Result<(), ProcessError> {
        if self.sender.is_zero() {
            return Err(ProcessError::MalformedTransaction(
                "sender address is empty".into(),
            ));
        }
        Ok(())
    }

    /// Encodes this transaction as the single argument of a relayed transaction's call data.
    pub fn to_relayed_data(&self) -> Result<Vec<u8>, serde_json::Error> {
        let marshalled = serde_json::to_vec(self)?;
        Ok(format!("{RELAYED_TX_FUNCTION}@{}", hex::encode(marshalled)).into_bytes())
    }

    /// Decodes a relayed transaction's (already hex-decoded) argument.
    pub fn from_relayed_argument(argument: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(argument)
    }

    pub fn total_gas_budget(&self) -> Amount {
        Amount::from(self.gas_limit) * self.gas_price
    }
}

impl BinaryHashRepr for Transaction {
    fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
        self.nonce.binary_repr(writer);
        self.value.binary_repr(writer);
        self.receiver.binary_repr(writer);
        self.sender.binary_repr(writer);
        self.receiver_user_name.binary_repr(writer);
        self.sender_user_name.binary_repr(writer);
        self.gas_price.binary_repr(writer);
        self.gas_limit.binary_repr(writer);
        self.data.binary_repr(writer);
        self.signature.binary_repr(writer);
    }
    fn binary_len(&self) -> usize {
        self.nonce.binary_len()
            + self.value.binary_len()
            + self.receiver.binary_len()
            + self.sender.binary_len()
            + self.receiver_user_name.binary_len()
            + self.sender_user_name.binary_len()
            + self.gas_price.binary_len()
            + self.gas_limit.binary_len()
            + self.data.binary_len()
            + self.signature.binary_len()
    }
}

impl TransactionHandler for Transaction {
    fn nonce(&self) -> u64 {
        self.nonce
    }
    fn value(&self) -> &Amount {
        &self.value
    }
    fn sender(&self) -> &Address {
        &self.sender
    }
    fn receiver(&self) -> &Address {
        &self.receiver
    }
    fn data(&self) -> &[u8] {
        &self.data
    }
    fn gas_price(&self) -> u64 {
        self.gas_price
    }
    fn gas_limit(&self) -> u64 {
        self.gas_limit
    }
}

/// A system-generated record carrying a relay or cross-shard side effect.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartContractResult {
    pub nonce: u64,
    #[serde(with = "decimal_amount")]
    pub value: Amount,
    pub receiver: Address,
    pub sender: Address,
    pub relayer: Option<Address>,
    #[serde(with = "decimal_amount")]
    pub relayed_value: Amount,
    #[serde(default, with = "hex_bytes")]
    pub data: Vec<u8>,
    pub prev_tx_hash: TransactionHash,
    pub original_tx_hash: TransactionHash,
    pub gas_limit: u64,
    pub gas_price: u64,
    pub call_type: CallType,
    #[serde(default, with = "hex_bytes")]
    pub return_message: Vec<u8>,
}

impl SmartContractResult {
    pub fn hash(&self) -> TransactionHash {
        TransactionHash(domain_hash(CONTRACT_RESULT_HASH_DOMAIN, self))
    }

    pub fn return_message_str(&self) -> String {
        String::from_utf8_lossy(&self.return_message).into_owned()
    }
}

impl BinaryHashRepr for SmartContractResult {
    fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
        (self.nonce, self.value.clone(), self.receiver, self.sender, self.relayer)
            .binary_repr(writer);
        self.relayed_value.binary_repr(writer);
        self.data.binary_repr(writer);
        (self.prev_tx_hash, self.original_tx_hash).binary_repr(writer);
        (self.gas_limit, self.gas_price, self.call_type).binary_repr(writer);
        self.return_message.binary_repr(writer);
    }
    fn binary_len(&self) -> usize {
        let mut len = 8 + self.value.binary_len() + 2 * ADDRESS_LEN;
        len += self.relayer.binary_len() + self.relayed_value.binary_len();
        len += self.data.binary_len() + 2 * self.prev_tx_hash.binary_len();
        len + 8 + 8 + 1 + self.return_message.binary_len()
    }
}

impl TransactionHandler for SmartContractResult {
    fn nonce(&self) -> u64 {
        self.nonce
    }
    fn value(&self) -> &Amount {
        &self.value
    }
    fn sender(&self) -> &Address {
        &self.sender
    }
    fn receiver(&self) -> &Address {
        &self.receiver
    }
    fn data(&self) -> &[u8] {
        &self.data
    }
    fn gas_price(&self) -> u64 {
        self.gas_price
    }
    fn gas_limit(&self) -> u64 {
        self.gas_limit
    }
    fn call_type(&self) -> CallType {
        self.call_type
    }
    fn relayer(&self) -> Option<&Address> {
        self.relayer.as_ref()
    }
    fn original_tx_hash(&self) -> Option<&TransactionHash> {
        Some(&self.original_tx_hash)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(with = "decimal_amount")]
    pub value: Amount,
    pub sender: Address,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    pub tx_hash: TransactionHash,
}

impl Receipt {
    pub fn data_str(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// A derived record handed to one of the intermediate forwarders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntermediateTransaction {
    Transaction(Transaction),
    Receipt(Receipt),
    ContractResult(SmartContractResult),
}

impl IntermediateTransaction {
    /// The address whose shard the record must be delivered to.
    pub fn destination(&self) -> &Address {
        match self {
            IntermediateTransaction::Transaction(tx) => &tx.receiver,
            IntermediateTransaction::Receipt(receipt) => &receipt.sender,
            IntermediateTransaction::ContractResult(scr) => &scr.receiver,
        }
    }
}

impl From<Transaction> for IntermediateTransaction {
    fn from(tx: Transaction) -> Self {
        IntermediateTransaction::Transaction(tx)
    }
}

impl From<Receipt> for IntermediateTransaction {
    fn from(receipt: Receipt) -> Self {
        IntermediateTransaction::Receipt(receipt)
    }
}

impl From<SmartContractResult> for IntermediateTransaction {
    fn from(scr: SmartContractResult) -> Self {
        IntermediateTransaction::ContractResult(scr)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    pub nonce: u64,
    pub balance: Amount,
    pub user_name: Vec<u8>,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Account {
            address,
            ..Default::default()
        }
    }

    pub fn with_balance(address: Address, balance: impl Into<Amount>) -> Self {
        Account {
            address,
            balance: balance.into(),
            ..Default::default()
        }
    }

    pub fn add_to_balance(&mut self, value: &Amount) {
        self.balance += value;
    }

    /// Debits `value`, leaving the balance untouched if it does not cover it.
    pub fn sub_from_balance(&mut self, value: &Amount) -> Result<(), ProcessError> {
        match self.balance.checked_sub(value) {
            Some(balance) => {
                self.balance = balance;
                Ok(())
            }
            None => Err(ProcessError::BalanceCheckOutOfBounds {
                address: self.address,
                current_balance: self.balance.clone(),
                operation_value: value.clone(),
            }),
        }
    }

    pub fn increase_nonce(&mut self, by: u64) {
        self.nonce += by;
    }

    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.user_name.is_empty()
    }
}

impl BinaryHashRepr for Account {
    fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
        self.address.binary_repr(writer);
        self.nonce.binary_repr(writer);
        self.balance.binary_repr(writer);
        self.user_name.binary_repr(writer);
    }
    fn binary_len(&self) -> usize {
        ADDRESS_LEN + 8 + self.balance.binary_len() + self.user_name.binary_len()
    }
}

mod decimal_amount {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Amount::parse_bytes(encoded.as_bytes(), 10)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount '{encoded}'")))
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded).map_err(serde::de::Error::custom)
    }
}
