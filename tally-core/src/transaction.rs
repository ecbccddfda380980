//! Immutable transaction records and their content-hash identity.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::filter::FilterKind;

/// Minor currency units per major unit.
pub const DECIMAL: i64 = 100;

/// A single bank transaction as exported by a source.
///
/// Amounts are integer minor units; a positive amount is money received by
/// `account`, a negative amount is money paid out. The identity `hash` is
/// derived from the field contents at construction, so two records with
/// the same contents are the same economic event. A hash collision between
/// genuinely distinct transactions would cause an incorrect dedup; at 64
/// bits this is negligible for realistic ledger sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTransaction {
    date: DateTime<Utc>,
    amount: i64,
    account: String,
    contra_account: Option<String>,
    contra_account_name: Option<String>,
    description: String,
    hash: u64,
}

impl SourceTransaction {
    pub fn new(
        date: DateTime<Utc>,
        amount: i64,
        account: impl Into<String>,
        contra_account: Option<String>,
        contra_account_name: Option<String>,
        description: impl Into<String>,
    ) -> Self {
        let account = account.into();
        let description = description.into();
        let hash = content_hash(
            date,
            amount,
            &account,
            contra_account.as_deref(),
            contra_account_name.as_deref(),
            &description,
        );
        Self {
            date,
            amount,
            account,
            contra_account,
            contra_account_name,
            description,
            hash,
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn contra_account(&self) -> Option<&str> {
        self.contra_account.as_deref()
    }

    pub fn contra_account_name(&self) -> Option<&str> {
        self.contra_account_name.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Stable content hash, used as the transaction's identity.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// True if `other` is the same transfer seen from the counter-account's
    /// export: same date, negated amount, and one side's account is the
    /// other side's contra-account.
    pub fn is_mirror_of(&self, other: &Self) -> bool {
        self.date == other.date
            && self.amount == -other.amount
            && (other.contra_account.as_deref() == Some(self.account.as_str())
                || self.contra_account.as_deref() == Some(other.account.as_str()))
    }

    /// True if the two records describe the same economic event, either by
    /// identity or as mirrors of one transfer.
    pub fn is_duplicate_of(&self, other: &Self) -> bool {
        self.hash == other.hash || self.is_mirror_of(other)
    }
}

fn content_hash(
    date: DateTime<Utc>,
    amount: i64,
    account: &str,
    contra_account: Option<&str>,
    contra_account_name: Option<&str>,
    description: &str,
) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(date.to_rfc3339().as_bytes());
    hasher.update([0x1f]);
    hasher.update(amount.to_be_bytes());
    hasher.update(account.as_bytes());
    hasher.update([0x1f]);
    for field in [contra_account, contra_account_name] {
        match field {
            Some(value) => {
                hasher.update([0x01]);
                hasher.update(value.as_bytes());
            }
            None => hasher.update([0x00]),
        }
        hasher.update([0x1f]);
    }
    hasher.update(description.as_bytes());

    let digest = hasher.finalize();
    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

/// The record that a specific filter of a specific category matched a
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub category_name: String,
    pub filter_id: u32,
    pub filter_kind: FilterKind,
}

impl Assignment {
    pub fn new(category_name: impl Into<String>, filter_id: u32, filter_kind: FilterKind) -> Self {
        Self {
            category_name: category_name.into(),
            filter_id,
            filter_kind,
        }
    }
}

/// A ledger transaction together with every assignment it received.
///
/// Zero assignments is a normal state, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignedTransaction {
    pub transaction: SourceTransaction,
    pub assignments: Vec<Assignment>,
}
