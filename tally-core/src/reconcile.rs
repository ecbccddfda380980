//! Merging per-source transaction batches into one canonical ledger.
//!
//! Every imported file becomes a named batch. Batches are merged into a
//! single ascending-date sequence with duplicates removed, where two
//! transactions are duplicates if their identities match or if they are
//! mirrors of one transfer (the same economic event exported by both
//! participating accounts). Which copy of a duplicate pair survives is
//! unobservable, so the merged multiset does not depend on the order in
//! which batches were added.

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, Result};
use crate::observe::ObserverList;
use crate::transaction::SourceTransaction;
use crate::util::find_new_name;

#[derive(Debug, Clone)]
struct SourceBatch {
    name: String,
    /// Sorted ascending by date at insertion.
    transactions: Vec<SourceTransaction>,
}

/// Summary of one batch, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInfo {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub n_accounts: usize,
    pub n_transactions: usize,
}

/// Summary of the whole ledger. Recomputed as a fresh snapshot per call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerInfo {
    pub total_accounts: usize,
    pub total_transactions: usize,
    pub batches: Vec<BatchInfo>,
}

/// The canonical, deduplicated, date-ordered transaction sequence, built
/// from named source batches.
#[derive(Debug, Default)]
pub struct Ledger {
    batches: Vec<SourceBatch>,
    merged: Vec<SourceTransaction>,
    observers: ObserverList,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a batch of transactions under `name`, resolving name
    /// collisions with a ` (k)` suffix, and merges it into the ledger.
    /// Returns the name actually stored. An empty batch is rejected.
    pub fn add_batch(
        &mut self,
        name: &str,
        mut transactions: Vec<SourceTransaction>,
    ) -> Result<String> {
        if transactions.is_empty() {
            return Err(LedgerError::Validation(format!(
                "batch \"{name}\" contains no transactions"
            )));
        }

        let taken: Vec<&str> = self.batches.iter().map(|b| b.name.as_str()).collect();
        let new_name = find_new_name(name, &taken);

        transactions.sort_by_key(SourceTransaction::date);
        self.merged = merge_run(&self.merged, &transactions);
        self.batches.push(SourceBatch {
            name: new_name.clone(),
            transactions,
        });

        self.observers.notify();
        Ok(new_name)
    }

    /// Removes the named batch and rebuilds the ledger from the remaining
    /// batches in their original insertion order. Removing an unknown name
    /// is a no-op.
    pub fn remove_batch(&mut self, name: &str) {
        let Some(position) = self.batches.iter().position(|b| b.name == name) else {
            return;
        };
        self.batches.remove(position);

        let mut merged = Vec::new();
        for batch in &self.batches {
            merged = merge_run(&merged, &batch.transactions);
        }
        self.merged = merged;

        self.observers.notify();
    }

    /// The canonical sequence, ascending by date, free of duplicates.
    pub fn all_transactions(&self) -> &[SourceTransaction] {
        &self.merged
    }

    pub fn batch_names(&self) -> Vec<&str> {
        self.batches.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn info(&self) -> LedgerInfo {
        let batches = self
            .batches
            .iter()
            .map(|batch| BatchInfo {
                name: batch.name.clone(),
                start_date: batch.transactions[0].date(),
                end_date: batch.transactions[batch.transactions.len() - 1].date(),
                n_accounts: distinct_accounts(&batch.transactions),
                n_transactions: batch.transactions.len(),
            })
            .collect();

        // Account for sources whose only transactions were merged away as
        // duplicates: count accounts across all batches, not the ledger.
        let all: Vec<&SourceTransaction> = self
            .batches
            .iter()
            .flat_map(|b| b.transactions.iter())
            .collect();
        let mut accounts: Vec<&str> = all.iter().map(|tx| tx.account()).collect();
        accounts.sort_unstable();
        accounts.dedup();

        LedgerInfo {
            total_accounts: accounts.len(),
            total_transactions: self.merged.len(),
            batches,
        }
    }

    pub fn subscribe(&self, callback: impl FnMut() + 'static) {
        self.observers.subscribe(callback);
    }
}

fn distinct_accounts(transactions: &[SourceTransaction]) -> usize {
    let mut accounts: Vec<&str> = transactions.iter().map(|tx| tx.account()).collect();
    accounts.sort_unstable();
    accounts.dedup();
    accounts.len()
}

/// Merges a date-sorted incoming run into the date-sorted ledger,
/// dropping incoming transactions that duplicate an existing entry with
/// the same date. Linear in the total size plus, per incoming
/// transaction, the width of the same-date run: O(n * W + n log n)
/// including the caller's sort, with W the widest single-date run.
fn merge_run(
    existing: &[SourceTransaction],
    incoming: &[SourceTransaction],
) -> Vec<SourceTransaction> {
    let mut merged = Vec::with_capacity(existing.len() + incoming.len());
    let mut index = 0;

    for transaction in incoming {
        while index < existing.len() && existing[index].date() < transaction.date() {
            merged.push(existing[index].clone());
            index += 1;
        }

        let is_duplicate = existing[index..]
            .iter()
            .take_while(|entry| entry.date() == transaction.date())
            .any(|entry| entry.is_duplicate_of(transaction));

        if !is_duplicate {
            merged.push(transaction.clone());
        }
    }

    merged.extend(existing[index..].iter().cloned());
    merged
}
