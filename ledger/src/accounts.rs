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

//! A journaled in-memory account store.

use crate::error::ProcessError;
use crate::interfaces::AccountsAdapter;
use crate::structure::{Account, Address};
use base_crypto::hash::{HashOutput, PersistentHashWriter};
use base_crypto::repr::BinaryHashRepr;
use parking_lot::Mutex;
use std::collections::BTreeMap;

struct JournalEntry {
    address: Address,
    previous: Option<Account>,
}

#[derive(Default)]
struct AccountsState {
    accounts: BTreeMap<Address, Account>,
    journal: Vec<JournalEntry>,
}

/// Stores accounts keyed by address. Every save is journaled until
/// [`InMemoryAccounts::commit`], so a caller can undo a partially applied
/// transaction with [`InMemoryAccounts::revert_to_snapshot`].
#[derive(Default)]
pub struct InMemoryAccounts {
    state: Mutex<AccountsState>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts<I: IntoIterator<Item = Account>>(accounts: I) -> Self {
        let state = AccountsState {
            accounts: accounts
                .into_iter()
                .map(|account| (account.address, account))
                .collect(),
            journal: Vec::new(),
        };
        InMemoryAccounts {
            state: Mutex::new(state),
        }
    }

    /// Returns the stored account, without materialising a fresh one.
    pub fn get_existing_account(&self, address: &Address) -> Option<Account> {
        self.state.lock().accounts.get(address).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn journal_len(&self) -> usize {
        self.state.lock().journal.len()
    }

    pub fn revert_to_snapshot(&self, snapshot: usize) -> Result<(), ProcessError> {
        let mut state = self.state.lock();
        if snapshot > state.journal.len() {
            return Err(ProcessError::AccountsStorage(format!(
                "snapshot {snapshot} is ahead of the journal ({} entries)",
                state.journal.len()
            )));
        }
        let undone = state.journal.split_off(snapshot);
        for entry in undone.into_iter().rev() {
            match entry.previous {
                Some(account) => state.accounts.insert(entry.address, account),
                None => state.accounts.remove(&entry.address),
            };
        }
        trace!(snapshot, "reverted account journal");
        Ok(())
    }

    /// Clears the journal and returns a digest over every stored account.
    pub fn commit(&self) -> HashOutput {
        let mut state = self.state.lock();
        state.journal.clear();
        let mut writer = PersistentHashWriter::new();
        for account in state.accounts.values() {
            account.binary_repr(&mut writer);
        }
        writer.finalize()
    }
}

impl AccountsAdapter for InMemoryAccounts {
    fn load_account(&self, address: &Address) -> Result<Account, ProcessError> {
        Ok(self
            .state
            .lock()
            .accounts
            .get(address)
            .cloned()
            .unwrap_or_else(|| Account::new(*address)))
    }

    fn save_account(&self, account: &Account) -> Result<(), ProcessError> {
        let mut state = self.state.lock();
        let previous = state.accounts.insert(account.address, account.clone());
        state.journal.push(JournalEntry {
            address: account.address,
            previous,
        });
        Ok(())
    }
}
