//! Parser for SNS Bank's official CSV exports ("CSV" and "CSV2004").
//!
//! The format has no header row; fields are positional. Only a handful of
//! the 18+ columns carry data this ledger uses: date (`DD-MM-YYYY`), the
//! account, the counterparty IBAN and name, the signed amount, and the
//! description (sometimes wrapped in single quotes).

use chrono::{NaiveDate, NaiveTime};
use csv::{ReaderBuilder, StringRecord};
use tally_core::{Result, SourceTransaction};

use super::{parse_amount_minor, row_error, BankCsv};

const DATE_COLUMN: usize = 0;
const ACCOUNT_COLUMN: usize = 1;
const CONTRA_ACCOUNT_COLUMN: usize = 2;
const CONTRA_NAME_COLUMN: usize = 3;
const AMOUNT_COLUMN: usize = 10;
const DESCRIPTION_COLUMN: usize = 17;

pub struct SnsCsv;

fn optional(record: &StringRecord, column: usize) -> Option<&str> {
    let value = record.get(column)?.trim();
    (!value.is_empty()).then_some(value)
}

fn required<'r>(
    record: &'r StringRecord,
    column: usize,
    line: usize,
    description: &str,
) -> Result<&'r str> {
    optional(record, column).ok_or_else(|| {
        row_error(
            line,
            format!("could not determine {description} (column {} is empty)", column + 1),
        )
    })
}

impl BankCsv for SnsCsv {
    fn has_valid_header(&self, data: &str) -> bool {
        let first_line = data.lines().next().unwrap_or("");
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .from_reader(first_line.as_bytes());

        match reader.records().next() {
            // The description column must be present.
            Some(Ok(record)) => record.len() > DESCRIPTION_COLUMN,
            _ => false,
        }
    }

    fn parse(&self, data: &str) -> Result<Vec<SourceTransaction>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data.as_bytes());

        let mut transactions = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let line = index + 1;
            let record = result.map_err(|err| row_error(line, err.to_string()))?;

            let raw_date = required(&record, DATE_COLUMN, line, "date")?;
            let date = NaiveDate::parse_from_str(raw_date, "%d-%m-%Y").map_err(|_| {
                row_error(line, format!("could not determine date from value \"{raw_date}\""))
            })?;

            let raw_amount = required(&record, AMOUNT_COLUMN, line, "amount")?;
            let amount = parse_amount_minor(raw_amount).ok_or_else(|| {
                row_error(line, format!("could not determine amount from value \"{raw_amount}\""))
            })?;

            let raw_description = required(&record, DESCRIPTION_COLUMN, line, "description")?;
            let description = raw_description
                .strip_prefix('\'')
                .and_then(|rest| rest.strip_suffix('\''))
                .unwrap_or(raw_description);

            transactions.push(SourceTransaction::new(
                date.and_time(NaiveTime::MIN).and_utc(),
                amount,
                required(&record, ACCOUNT_COLUMN, line, "account")?,
                optional(&record, CONTRA_ACCOUNT_COLUMN).map(String::from),
                optional(&record, CONTRA_NAME_COLUMN).map(String::from),
                description,
            ));
        }

        Ok(transactions)
    }
}
