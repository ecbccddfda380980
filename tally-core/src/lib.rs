//! tally-core: transaction reconciliation, categorization, and cached
//! cash-flow queries over bank-exported ledgers.
//!
//! The pipeline is strictly downstream: source batches merge into one
//! canonical ledger, categories assign themselves to its transactions via
//! filters, searches and cash-flow totals are answered over the assigned
//! transactions through bounded caches. Each stage notifies its observers
//! after mutating, which is how downstream caches invalidate.

pub mod assign;
mod cache;
pub mod cashflow;
pub mod category;
pub mod error;
pub mod filter;
pub mod observe;
pub mod period;
pub mod reconcile;
pub mod search;
pub mod transaction;
pub mod util;

pub use assign::{assign, AssignmentProvider, TransactionAssigner};
pub use cashflow::{CashFlow, CashFlowCalculator};
pub use category::{Budget, Category, CategoryCollection};
pub use error::{LedgerError, Result};
pub use filter::{Filter, FilterKind, ManualFilter, MatchKind, MatchPatterns, TextFilter};
pub use observe::ObserverList;
pub use period::{Period, PeriodType};
pub use reconcile::{BatchInfo, Ledger, LedgerInfo};
pub use search::{SearchProvider, SearchQuery, TransactionSearcher, MAX_CACHE_ENTRIES};
pub use transaction::{AssignedTransaction, Assignment, SourceTransaction, DECIMAL};
pub use util::find_new_name;
