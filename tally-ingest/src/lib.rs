//! tally-ingest: bank statement parsers producing ledger transactions.

pub mod parsers;

pub use parsers::{parse_transactions, BankCsv, IngCsv, SnsCsv};
