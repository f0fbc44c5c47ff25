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

//! State shared by the plain and relayed processing paths.

use crate::error::{ProcessError, TransactionInvalid};
use crate::interfaces::{AccountsAdapter, FeeHandler, ShardCoordinator, SmartContractProcessor};
use crate::structure::{Account, Address, Transaction};
use std::sync::Arc;

pub(crate) struct BaseContext {
    pub(crate) accounts: Arc<dyn AccountsAdapter>,
    pub(crate) shard_coordinator: Arc<dyn ShardCoordinator>,
    pub(crate) economics: Arc<dyn FeeHandler>,
    pub(crate) sc_processor: Arc<dyn SmartContractProcessor>,
}

/// The locally hosted sides of a transfer.
///
/// When sender and receiver are the same address only one account is held,
/// and both sides resolve to it.
#[derive(Debug)]
pub(crate) struct ResolvedAccounts {
    sender: Option<Account>,
    receiver: Option<Account>,
    aliased: bool,
}

impl ResolvedAccounts {
    pub(crate) fn sender(&self) -> Option<&Account> {
        self.sender.as_ref()
    }

    pub(crate) fn receiver(&self) -> Option<&Account> {
        if self.aliased {
            self.sender.as_ref()
        } else {
            self.receiver.as_ref()
        }
    }

    pub(crate) fn sender_mut(&mut self) -> Option<&mut Account> {
        self.sender.as_mut()
    }

    pub(crate) fn receiver_mut(&mut self) -> Option<&mut Account> {
        if self.aliased {
            self.sender.as_mut()
        } else {
            self.receiver.as_mut()
        }
    }

    pub(crate) fn take_sender(self) -> Option<Account> {
        self.sender
    }

    /// Splits into owned sender and receiver, duplicating an aliased account.
    pub(crate) fn into_parts(self) -> (Option<Account>, Option<Account>) {
        if self.aliased {
            (self.sender.clone(), self.sender)
        } else {
            (self.sender, self.receiver)
        }
    }

    /// Persists every locally held account.
    pub(crate) fn save(&self, accounts: &dyn AccountsAdapter) -> Result<(), ProcessError> {
        if let Some(sender) = &self.sender {
            accounts.save_account(sender)?;
        }
        if let Some(receiver) = &self.receiver {
            accounts.save_account(receiver)?;
        }
        Ok(())
    }
}

impl BaseContext {
    pub(crate) fn is_in_self_shard(&self, address: &Address) -> bool {
        self.shard_coordinator.is_in_self_shard(address)
    }

    pub(crate) fn get_account_from_address(
        &self,
        address: &Address,
    ) -> Result<Option<Account>, ProcessError> {
        if !self.is_in_self_shard(address) {
            return Ok(None);
        }
        self.accounts.load_account(address).map(Some)
    }

    pub(crate) fn get_accounts(
        &self,
        sender: &Address,
        receiver: &Address,
    ) -> Result<ResolvedAccounts, ProcessError> {
        if sender == receiver {
            return Ok(ResolvedAccounts {
                sender: self.get_account_from_address(sender)?,
                receiver: None,
                aliased: true,
            });
        }
        Ok(ResolvedAccounts {
            sender: self.get_account_from_address(sender)?,
            receiver: self.get_account_from_address(receiver)?,
            aliased: false,
        })
    }

    pub(crate) fn save_account(&self, account: &Account) -> Result<(), ProcessError> {
        self.accounts.save_account(account)
    }

    /// Checks user names, nonce, gas and balance of `tx` against the
    /// resolved accounts. Transactions from a foreign sender only have their
    /// receiver user name checked.
    pub(crate) fn check_tx_values(
        &self,
        tx: &Transaction,
        accounts: &ResolvedAccounts,
    ) -> Result<(), TransactionInvalid> {
        check_user_names(tx, accounts)?;

        let Some(sender) = accounts.sender() else {
            return Ok(());
        };
        if sender.nonce < tx.nonce {
            return Err(TransactionInvalid::HigherNonceInTransaction {
                account_nonce: sender.nonce,
                tx_nonce: tx.nonce,
            });
        }
        if sender.nonce > tx.nonce {
            return Err(TransactionInvalid::LowerNonceInTransaction {
                account_nonce: sender.nonce,
                tx_nonce: tx.nonce,
            });
        }

        self.economics.check_validity_tx_values(tx)?;

        let fee = self.economics.compute_fee(tx);
        if sender.balance < fee {
            return Err(TransactionInvalid::InsufficientFee {
                balance: sender.balance.clone(),
                fee,
            });
        }
        let required = fee + &tx.value;
        if sender.balance < required {
            return Err(TransactionInvalid::InsufficientFunds {
                balance: sender.balance.clone(),
                required,
            });
        }
        Ok(())
    }
}

fn check_user_names(tx: &Transaction, accounts: &ResolvedAccounts) -> Result<(), TransactionInvalid> {
    if !tx.sender_user_name.is_empty() {
        if let Some(sender) = accounts.sender() {
            if sender.user_name != tx.sender_user_name {
                return Err(TransactionInvalid::UserNameDoesNotMatch);
            }
        }
    }
    if !tx.receiver_user_name.is_empty() {
        if let Some(receiver) = accounts.receiver() {
            if receiver.user_name != tx.receiver_user_name {
                return Err(if accounts.sender().is_none() {
                    TransactionInvalid::UserNameDoesNotMatchInCrossShardTx
                } else {
                    TransactionInvalid::UserNameDoesNotMatch
                });
            }
        }
    }
    Ok(())
}
