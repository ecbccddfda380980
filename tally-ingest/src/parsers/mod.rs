//! Bank-specific CSV parsers and format auto-detection.

pub mod ing_csv;
pub mod sns_csv;

pub use ing_csv::IngCsv;
pub use sns_csv::SnsCsv;

use tally_core::{LedgerError, Result, SourceTransaction};

/// A bank export format: a cheap header probe plus a full parser.
pub trait BankCsv {
    /// Checks whether the data looks parsable, based on its first line.
    fn has_valid_header(&self, data: &str) -> bool;

    /// Parses the full export. Does not sort the result.
    fn parse(&self, data: &str) -> Result<Vec<SourceTransaction>>;
}

/// Parses transaction data in whichever supported bank format it is in,
/// sorted ascending by date.
///
/// Fails with a format error when no parser recognizes the data, and with
/// an empty-result error when the data parses but holds no transactions.
/// A batch with any invalid row fails as a whole; there is no partial
/// ingestion.
pub fn parse_transactions(data: &str) -> Result<Vec<SourceTransaction>> {
    let formats: [&dyn BankCsv; 2] = [&IngCsv, &SnsCsv];

    for format in formats {
        if !format.has_valid_header(data) {
            continue;
        }
        let mut transactions = format.parse(data)?;
        if transactions.is_empty() {
            return Err(LedgerError::EmptyResult);
        }
        transactions.sort_by_key(SourceTransaction::date);
        return Ok(transactions);
    }

    Err(LedgerError::Format("unrecognized format".to_string()))
}

/// Parses a decimal amount string into minor units without going through
/// floating point. Accepts both `,` and `.` as the decimal separator.
pub(crate) fn parse_amount_minor(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() {
        return None;
    }

    let normalized = digits.replace(',', ".");
    let (whole, fraction) = normalized
        .split_once('.')
        .unwrap_or((normalized.as_str(), ""));

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().ok()?
    };
    let cents: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        2 => fraction.parse().ok()?,
        _ => return None,
    };

    Some(sign * (whole * 100 + cents))
}

pub(crate) fn row_error(line: usize, message: impl AsRef<str>) -> LedgerError {
    LedgerError::Format(format!(
        "invalid transaction data on line {line}: {}",
        message.as_ref()
    ))
}
