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

//! Applying transactions to the accounts of a single shard.

use crate::base::{BaseContext, ResolvedAccounts};
use crate::error::{ProcessError, TransactionInvalid};
use crate::interfaces::{
    AccountsAdapter, ArgumentsParser, FeeHandler, IntermediateTransactionHandler,
    ShardCoordinator, SmartContractProcessor, TransactionFeeHandler, TxTypeHandler,
};
use crate::structure::{
    Account, Amount, CallType, METACHAIN_SHARD_ID, REFUNDED_GAS_MARKER, Receipt, ReturnCode,
    SmartContractResult, Transaction, TransactionHash, TransactionType,
};
use num_traits::Zero;
use std::sync::Arc;

/// What happened to a rejected transaction that is still included in the block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// The local sender paid the fee and the transaction was recorded as invalid.
    ChargedFee { fee: Amount },
    /// The sender lives in another shard, which charges it.
    SenderNotInShard,
}

/// Executes transactions against the accounts hosted by this shard.
pub struct TxProcessor {
    pub(crate) base: BaseContext,
    pub(crate) tx_fee_handler: Arc<dyn TransactionFeeHandler>,
    pub(crate) tx_type_handler: Arc<dyn TxTypeHandler>,
    pub(crate) args_parser: Arc<dyn ArgumentsParser>,
    pub(crate) receipt_forwarder: Arc<dyn IntermediateTransactionHandler>,
    pub(crate) bad_tx_forwarder: Arc<dyn IntermediateTransactionHandler>,
    pub(crate) scr_forwarder: Arc<dyn IntermediateTransactionHandler>,
}

#[derive(Default)]
pub struct TxProcessorBuilder {
    accounts: Option<Arc<dyn AccountsAdapter>>,
    shard_coordinator: Option<Arc<dyn ShardCoordinator>>,
    economics: Option<Arc<dyn FeeHandler>>,
    sc_processor: Option<Arc<dyn SmartContractProcessor>>,
    tx_fee_handler: Option<Arc<dyn TransactionFeeHandler>>,
    tx_type_handler: Option<Arc<dyn TxTypeHandler>>,
    args_parser: Option<Arc<dyn ArgumentsParser>>,
    receipt_forwarder: Option<Arc<dyn IntermediateTransactionHandler>>,
    bad_tx_forwarder: Option<Arc<dyn IntermediateTransactionHandler>>,
    scr_forwarder: Option<Arc<dyn IntermediateTransactionHandler>>,
}

impl TxProcessorBuilder {
    pub fn accounts(mut self, accounts: Arc<dyn AccountsAdapter>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    pub fn shard_coordinator(mut self, shard_coordinator: Arc<dyn ShardCoordinator>) -> Self {
        self.shard_coordinator = Some(shard_coordinator);
        self
    }

    pub fn economics(mut self, economics: Arc<dyn FeeHandler>) -> Self {
        self.economics = Some(economics);
        self
    }

    pub fn sc_processor(mut self, sc_processor: Arc<dyn SmartContractProcessor>) -> Self {
        self.sc_processor = Some(sc_processor);
        self
    }

    pub fn tx_fee_handler(mut self, tx_fee_handler: Arc<dyn TransactionFeeHandler>) -> Self {
        self.tx_fee_handler = Some(tx_fee_handler);
        self
    }

    pub fn tx_type_handler(mut self, tx_type_handler: Arc<dyn TxTypeHandler>) -> Self {
        self.tx_type_handler = Some(tx_type_handler);
        self
    }

    pub fn args_parser(mut self, args_parser: Arc<dyn ArgumentsParser>) -> Self {
        self.args_parser = Some(args_parser);
        self
    }

    pub fn receipt_forwarder(mut self, forwarder: Arc<dyn IntermediateTransactionHandler>) -> Self {
        self.receipt_forwarder = Some(forwarder);
        self
    }

    pub fn bad_tx_forwarder(mut self, forwarder: Arc<dyn IntermediateTransactionHandler>) -> Self {
        self.bad_tx_forwarder = Some(forwarder);
        self
    }

    pub fn scr_forwarder(mut self, forwarder: Arc<dyn IntermediateTransactionHandler>) -> Self {
        self.scr_forwarder = Some(forwarder);
        self
    }

    pub fn build(self) -> Result<TxProcessor, ProcessError> {
        fn require<T>(value: Option<T>, name: &'static str) -> Result<T, ProcessError> {
            value.ok_or(ProcessError::MissingCollaborator(name))
        }
        Ok(TxProcessor {
            base: BaseContext {
                accounts: require(self.accounts, "accounts adapter")?,
                shard_coordinator: require(self.shard_coordinator, "shard coordinator")?,
                economics: require(self.economics, "fee handler")?,
                sc_processor: require(self.sc_processor, "smart contract processor")?,
            },
            tx_fee_handler: require(self.tx_fee_handler, "transaction fee handler")?,
            tx_type_handler: require(self.tx_type_handler, "transaction type handler")?,
            args_parser: require(self.args_parser, "arguments parser")?,
            receipt_forwarder: require(self.receipt_forwarder, "receipt forwarder")?,
            bad_tx_forwarder: require(self.bad_tx_forwarder, "bad transaction forwarder")?,
            scr_forwarder: require(self.scr_forwarder, "smart contract result forwarder")?,
        })
    }
}

fn display_process_tx_details(message: &str, account: Option<&Account>, tx: &Transaction) {
    match account {
        Some(account) => trace!(
            address = %account.address,
            balance = %account.balance,
            nonce = account.nonce,
            tx_nonce = tx.nonce,
            value = %tx.value,
            gas_price = tx.gas_price,
            gas_limit = tx.gas_limit,
            "{message}"
        ),
        None => trace!(sender = %tx.sender, "{message}: sender not in shard"),
    }
}

impl TxProcessor {
    pub fn builder() -> TxProcessorBuilder {
        TxProcessorBuilder::default()
    }

    /// Applies `tx` to the accounts hosted by this shard.
    ///
    /// `Ok(ReturnCode::UserError)` means the transaction is included but its
    /// effect was rejected. `Err(ProcessError::TransactionInvalid(_))` means
    /// it was rejected without touching any account; every other error is an
    /// infrastructure fault after which the caller must revert the block
    /// state.
    #[instrument(skip(self, tx), fields(sender = %tx.sender, nonce = tx.nonce))]
    pub fn process_transaction(&self, tx: &Transaction) -> Result<ReturnCode, ProcessError> {
        tx.check_well_formed()?;

        let accounts = self.base.get_accounts(&tx.sender, &tx.receiver)?;
        display_process_tx_details("processing transaction", accounts.sender(), tx);

        if let Err(invalid) = self.base.check_tx_values(tx, &accounts) {
            if matches!(invalid, TransactionInvalid::InsufficientFunds { .. }) {
                debug!(%invalid, "charging fee for underfunded transaction");
                self.executing_failed_transaction(tx, accounts.take_sender(), &invalid)?;
                return Ok(ReturnCode::UserError);
            }
            if invalid == TransactionInvalid::UserNameDoesNotMatchInCrossShardTx {
                self.process_if_tx_error_cross_shard(tx, &invalid)?;
                return Ok(ReturnCode::UserError);
            }
            debug!(%invalid, "transaction rejected");
            return Err(invalid.into());
        }

        let tx_type = self.tx_type_handler.compute_transaction_type(tx);
        debug!(?tx_type, "dispatching transaction");
        match tx_type {
            TransactionType::MoveBalance => self.process_move_balance(tx),
            TransactionType::SCDeployment => self.process_sc_deployment(tx),
            TransactionType::SCInvoking | TransactionType::BuiltInFunctionCall => {
                self.process_sc_invoking(tx, accounts)
            }
            TransactionType::RelayedTx => self.process_relayed_tx(tx),
            TransactionType::Invalid => Err(TransactionInvalid::WrongTransaction.into()),
        }
    }

    /// Transfers value and charges the fee of a plain transfer.
    pub(crate) fn process_move_balance(&self, tx: &Transaction) -> Result<ReturnCode, ProcessError> {
        let mut accounts = self.base.get_accounts(&tx.sender, &tx.receiver)?;

        if self.is_plain_transfer_to_metachain(tx) {
            debug!("rejecting plain transfer to a metachain contract");
            self.executing_failed_transaction(
                tx,
                accounts.take_sender(),
                &TransactionInvalid::InvalidMetaTransaction,
            )?;
            return Ok(ReturnCode::UserError);
        }

        let fee = self.process_tx_fee(tx, &mut accounts)?;
        move_balances(&mut accounts, &tx.value)?;

        let sender_is_local = match accounts.sender_mut() {
            Some(sender) => {
                sender.increase_nonce(1);
                true
            }
            None => false,
        };

        let tx_hash = tx.hash();
        self.create_receipt_with_returned_gas(&tx_hash, tx, sender_is_local)?;
        self.tx_fee_handler
            .process_transaction_fee(&fee, &Amount::zero(), &tx_hash);

        accounts.save(self.base.accounts.as_ref())?;
        Ok(ReturnCode::Ok)
    }

    /// A payload-free transfer into the metachain, which only accepts
    /// contract calls.
    pub(crate) fn is_plain_transfer_to_metachain(&self, tx: &Transaction) -> bool {
        tx.data.is_empty()
            && self.base.shard_coordinator.compute_id(&tx.receiver) == METACHAIN_SHARD_ID
    }

    /// Debits the local sender's fee and returns it. A contract call whose
    /// receiver lives in another shard locks the whole gas budget, since the
    /// destination shard refunds what execution leaves over.
    fn process_tx_fee(
        &self,
        tx: &Transaction,
        accounts: &mut ResolvedAccounts,
    ) -> Result<Amount, ProcessError> {
        let is_cross_shard_sc_call = accounts.receiver().is_none()
            && !tx.data.is_empty()
            && tx.receiver.is_smart_contract();
        let Some(sender) = accounts.sender_mut() else {
            return Ok(Amount::zero());
        };

        let cost = self.base.economics.compute_fee(tx);
        if is_cross_shard_sc_call {
            sender.sub_from_balance(&tx.total_gas_budget())?;
        } else {
            sender.sub_from_balance(&cost)?;
        }
        Ok(cost)
    }

    fn create_receipt_with_returned_gas(
        &self,
        tx_hash: &TransactionHash,
        tx: &Transaction,
        sender_is_local: bool,
    ) -> Result<(), ProcessError> {
        if !sender_is_local || tx.receiver.is_smart_contract() {
            return Ok(());
        }
        let total_provided = tx.total_gas_budget();
        let actual_cost = self.base.economics.compute_fee(tx);
        if total_provided <= actual_cost {
            return Ok(());
        }

        let receipt = Receipt {
            value: total_provided - actual_cost,
            sender: tx.sender,
            data: REFUNDED_GAS_MARKER.to_vec(),
            tx_hash: *tx_hash,
        };
        trace!(refund = %receipt.value, "issuing gas refund receipt");
        self.receipt_forwarder
            .add_intermediate_transactions(vec![receipt.into()])
    }

    fn process_sc_deployment(&self, tx: &Transaction) -> Result<ReturnCode, ProcessError> {
        let sender = self.base.get_account_from_address(&tx.sender)?;
        self.base.sc_processor.deploy_smart_contract(tx, sender)
    }

    fn process_sc_invoking(
        &self,
        tx: &Transaction,
        accounts: ResolvedAccounts,
    ) -> Result<ReturnCode, ProcessError> {
        let (sender, receiver) = accounts.into_parts();
        self.base
            .sc_processor
            .execute_smart_contract_transaction(tx, sender, receiver)
    }

    /// Charges the local sender the fee of a rejected transaction, records
    /// it as invalid and issues a receipt carrying the reason.
    pub(crate) fn executing_failed_transaction(
        &self,
        tx: &Transaction,
        sender: Option<Account>,
        reason: &TransactionInvalid,
    ) -> Result<Rejection, ProcessError> {
        let Some(mut sender) = sender else {
            return Ok(Rejection::SenderNotInShard);
        };

        let fee = self.base.economics.compute_fee(tx);
        sender.sub_from_balance(&fee)?;
        sender.increase_nonce(1);

        self.bad_tx_forwarder
            .add_intermediate_transactions(vec![tx.clone().into()])?;

        let tx_hash = tx.hash();
        let receipt = Receipt {
            value: fee.clone(),
            sender: tx.sender,
            data: reason.to_string().into_bytes(),
            tx_hash,
        };
        self.receipt_forwarder
            .add_intermediate_transactions(vec![receipt.into()])?;

        self.tx_fee_handler
            .process_transaction_fee(&fee, &Amount::zero(), &tx_hash);
        self.base.save_account(&sender)?;

        debug!(%fee, %reason, "charged fee for failed transaction");
        Ok(Rejection::ChargedFee { fee })
    }

    /// Records a transfer the destination shard refuses: the value travels
    /// back to the sender as a smart contract result.
    fn process_if_tx_error_cross_shard(
        &self,
        tx: &Transaction,
        reason: &TransactionInvalid,
    ) -> Result<(), ProcessError> {
        let tx_hash = tx.hash();
        self.bad_tx_forwarder
            .add_intermediate_transactions(vec![tx.clone().into()])?;

        let scr = SmartContractResult {
            nonce: tx.nonce,
            value: tx.value.clone(),
            receiver: tx.sender,
            sender: tx.receiver,
            prev_tx_hash: tx_hash,
            original_tx_hash: tx_hash,
            gas_price: tx.gas_price,
            call_type: CallType::DirectCall,
            return_message: reason.to_string().into_bytes(),
            ..Default::default()
        };
        debug!(%reason, "returning value of cross-shard transaction");
        self.scr_forwarder
            .add_intermediate_transactions(vec![scr.into()])
    }
}

fn move_balances(accounts: &mut ResolvedAccounts, value: &Amount) -> Result<(), ProcessError> {
    if let Some(sender) = accounts.sender_mut() {
        sender.sub_from_balance(value)?;
    }
    if let Some(receiver) = accounts.receiver_mut() {
        receiver.add_to_balance(value);
    }
    Ok(())
}
