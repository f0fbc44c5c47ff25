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

//! Relayed transactions: an outer transaction whose sender (the relayer)
//! pays gas for an inner user transaction carried in its call data.

use crate::base::ResolvedAccounts;
use crate::error::{ProcessError, TransactionInvalid};
use crate::semantics::TxProcessor;
use crate::structure::{
    Address, Amount, CallType, ReturnCode, SmartContractResult, Transaction, TransactionHash,
    TransactionType,
};
use num_traits::{CheckedSub, Zero};

impl TxProcessor {
    #[instrument(skip(self, tx), fields(relayer = %tx.sender))]
    pub(crate) fn process_relayed_tx(&self, tx: &Transaction) -> Result<ReturnCode, ProcessError> {
        let (_, args) = self.args_parser.parse_call_data(&tx.data)?;
        let mut accounts = self.base.get_accounts(&tx.sender, &tx.receiver)?;

        if args.len() != 1 {
            let reason = TransactionInvalid::InvalidArguments {
                expected: 1,
                actual: args.len(),
            };
            return self.reject_relayed_tx(tx, accounts, reason);
        }
        let user_tx = match Transaction::from_relayed_argument(&args[0]) {
            Ok(user_tx) => user_tx,
            Err(err) => {
                let reason = TransactionInvalid::MalformedUserTransaction(err.to_string());
                return self.reject_relayed_tx(tx, accounts, reason);
            }
        };
        if user_tx.sender != tx.receiver {
            let reason = TransactionInvalid::RelayedTxBeneficiaryDoesNotMatchReceiver {
                beneficiary: user_tx.sender,
                receiver: tx.receiver,
            };
            return self.reject_relayed_tx(tx, accounts, reason);
        }
        if user_tx.value < tx.value {
            let reason = TransactionInvalid::RelayedTxValueHigherThanUserTxValue {
                relayed: tx.value.clone(),
                user: user_tx.value.clone(),
            };
            return self.reject_relayed_tx(tx, accounts, reason);
        }

        let (total_fee, remaining_fee) = self.compute_relayed_tx_fees(tx)?;
        let tx_hash = tx.hash();

        if let Some(relayer) = accounts.sender_mut() {
            relayer.sub_from_balance(&(&tx.value + &total_fee))?;
            relayer.increase_nonce(1);
            self.base.save_account(relayer)?;
            self.tx_fee_handler
                .process_transaction_fee(&total_fee, &Amount::zero(), &tx_hash);
        }

        let Some(receiver) = accounts.receiver_mut() else {
            debug!("user transaction continues in the receiver's shard");
            return Ok(ReturnCode::Ok);
        };
        receiver.add_to_balance(&(&tx.value + &remaining_fee));
        self.base.save_account(receiver)?;

        self.process_user_tx(&user_tx, &tx.sender, &tx.value, tx.nonce, &tx_hash)
    }

    /// Splits the relayed gas budget into the total the relayer pays and the
    /// part handed to the user to fund the inner transaction.
    pub(crate) fn compute_relayed_tx_fees(
        &self,
        tx: &Transaction,
    ) -> Result<(Amount, Amount), ProcessError> {
        let relayer_gas_limit = self.base.economics.compute_gas_limit(tx);
        let relayer_fee = Amount::from(relayer_gas_limit) * tx.gas_price;
        let total_fee = tx.total_gas_budget();
        let remaining_fee = total_fee.checked_sub(&relayer_fee).ok_or(
            TransactionInvalid::InsufficientGasLimit {
                provided: tx.gas_limit,
                required: relayer_gas_limit,
            },
        )?;
        Ok((total_fee, remaining_fee))
    }

    fn reject_relayed_tx(
        &self,
        tx: &Transaction,
        accounts: ResolvedAccounts,
        reason: TransactionInvalid,
    ) -> Result<ReturnCode, ProcessError> {
        debug!(%reason, "relayed transaction rejected");
        self.executing_failed_transaction(tx, accounts.take_sender(), &reason)?;
        Ok(ReturnCode::UserError)
    }

    fn process_user_tx(
        &self,
        user_tx: &Transaction,
        relayer: &Address,
        relayed_value: &Amount,
        relayed_nonce: u64,
        tx_hash: &TransactionHash,
    ) -> Result<ReturnCode, ProcessError> {
        let accounts = self.base.get_accounts(&user_tx.sender, &user_tx.receiver)?;
        if let Err(invalid) = self.base.check_tx_values(user_tx, &accounts) {
            self.execute_failed_relayed_transaction(
                user_tx,
                relayer,
                relayed_value,
                relayed_nonce,
                tx_hash,
                &invalid,
            )?;
            return Ok(ReturnCode::UserError);
        }

        let scr = make_scr_from_user_tx(user_tx, relayer, relayed_value, tx_hash);
        let tx_type = self.tx_type_handler.compute_transaction_type(&scr);
        debug!(?tx_type, "dispatching relayed user transaction");
        let return_code = match tx_type {
            TransactionType::MoveBalance if self.is_plain_transfer_to_metachain(user_tx) => {
                self.execute_failed_relayed_transaction(
                    user_tx,
                    relayer,
                    relayed_value,
                    relayed_nonce,
                    tx_hash,
                    &TransactionInvalid::InvalidMetaTransaction,
                )?;
                return Ok(ReturnCode::UserError);
            }
            TransactionType::MoveBalance => self.process_move_balance(user_tx)?,
            TransactionType::SCDeployment => {
                let (sender, _) = accounts.into_parts();
                self.base.sc_processor.deploy_smart_contract(&scr, sender)?
            }
            TransactionType::SCInvoking | TransactionType::BuiltInFunctionCall => {
                let (sender, receiver) = accounts.into_parts();
                self.base
                    .sc_processor
                    .execute_smart_contract_transaction(&scr, sender, receiver)?
            }
            TransactionType::RelayedTx | TransactionType::Invalid => {
                self.execute_failed_relayed_transaction(
                    user_tx,
                    relayer,
                    relayed_value,
                    relayed_nonce,
                    tx_hash,
                    &TransactionInvalid::WrongTransaction,
                )?;
                return Ok(ReturnCode::UserError);
            }
        };

        if return_code != ReturnCode::Ok {
            return Ok(return_code);
        }
        self.scr_forwarder
            .add_intermediate_transactions(vec![scr.into()])?;
        Ok(ReturnCode::Ok)
    }

    /// Hands the relayed value back from the user to the relayer after the
    /// user transaction failed.
    fn execute_failed_relayed_transaction(
        &self,
        user_tx: &Transaction,
        relayer: &Address,
        relayed_value: &Amount,
        relayed_nonce: u64,
        original_tx_hash: &TransactionHash,
        reason: &TransactionInvalid,
    ) -> Result<(), ProcessError> {
        let mut user = self
            .base
            .get_account_from_address(&user_tx.sender)?
            .ok_or(ProcessError::MissingAccount(user_tx.sender))?;
        user.sub_from_balance(relayed_value)?;
        self.base.save_account(&user)?;

        let scr = SmartContractResult {
            nonce: relayed_nonce,
            value: relayed_value.clone(),
            receiver: *relayer,
            sender: user_tx.sender,
            prev_tx_hash: *original_tx_hash,
            original_tx_hash: *original_tx_hash,
            call_type: CallType::DirectCall,
            return_message: reason.to_string().into_bytes(),
            ..Default::default()
        };

        if let Some(mut relayer_account) = self.base.get_account_from_address(relayer)? {
            relayer_account.add_to_balance(relayed_value);
            self.base.save_account(&relayer_account)?;
        }

        debug!(%reason, value = %relayed_value, "rolled back relayed value");
        self.scr_forwarder
            .add_intermediate_transactions(vec![scr.into()])
    }
}

/// The record through which the user transaction is executed and forwarded.
fn make_scr_from_user_tx(
    user_tx: &Transaction,
    relayer: &Address,
    relayed_value: &Amount,
    tx_hash: &TransactionHash,
) -> SmartContractResult {
    SmartContractResult {
        nonce: user_tx.nonce,
        value: user_tx.value.clone(),
        receiver: user_tx.receiver,
        sender: user_tx.sender,
        relayer: Some(*relayer),
        relayed_value: relayed_value.clone(),
        data: user_tx.data.clone(),
        prev_tx_hash: *tx_hash,
        original_tx_hash: *tx_hash,
        gas_limit: user_tx.gas_limit,
        gas_price: user_tx.gas_price,
        call_type: CallType::DirectCall,
        return_message: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::ADDRESS_LEN;

    #[test]
    fn user_scr_points_back_at_the_relayed_transaction() {
        let user_tx = Transaction {
            nonce: 4,
            value: Amount::from(9u32),
            sender: Address([1; ADDRESS_LEN]),
            receiver: Address([2; ADDRESS_LEN]),
            data: b"ping".to_vec(),
            gas_limit: 30,
            gas_price: 2,
            ..Default::default()
        };
        let relayer = Address([3; ADDRESS_LEN]);
        let hash = user_tx.hash();
        let scr = make_scr_from_user_tx(&user_tx, &relayer, &Amount::from(5u32), &hash);
        assert_eq!(scr.prev_tx_hash, hash);
        assert_eq!(scr.original_tx_hash, hash);
        assert_eq!(scr.relayer, Some(relayer));
        assert_eq!(scr.relayed_value, Amount::from(5u32));
        assert_eq!((scr.sender, scr.receiver), (user_tx.sender, user_tx.receiver));
        assert_eq!(scr.call_type, CallType::DirectCall);
    }
}
