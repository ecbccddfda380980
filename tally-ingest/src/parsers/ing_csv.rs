//! Parser for ING Bank's official CSV export, in both the English and the
//! Dutch header variant.
//!
//! Columns used: date (`YYYYMMDD`), name/description (the counterparty's
//! display name), account, counterparty IBAN, debit/credit marker
//! (`Af`/`Bij` or `Debit`/`Credit`), unsigned amount with a comma decimal
//! separator, and the free-text notifications column.

use chrono::{NaiveDate, NaiveTime};
use csv::{ReaderBuilder, StringRecord};
use tally_core::{Result, SourceTransaction};

use super::{parse_amount_minor, row_error, BankCsv};

const NL_HEADERS: [&str; 7] = [
    "Datum",
    "Naam / Omschrijving",
    "Rekening",
    "Tegenrekening",
    "Af Bij",
    "Bedrag (EUR)",
    "Mededelingen",
];
const EN_HEADERS: [&str; 7] = [
    "Date",
    "Name / Description",
    "Account",
    "Counterparty",
    "Debit/credit",
    "Amount (EUR)",
    "Notifications",
];

pub struct IngCsv;

/// ING exports use either `,` or `;` as the field delimiter.
fn detect_delimiter(data: &str) -> u8 {
    let first_line = data.lines().next().unwrap_or("");
    if first_line.matches(';').count() > first_line.matches(',').count() {
        b';'
    } else {
        b','
    }
}

fn header_fields(data: &str) -> Vec<String> {
    let first_line = data.lines().next().unwrap_or("");
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(detect_delimiter(data))
        .from_reader(first_line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(|field| field.trim().to_string()).collect(),
        _ => Vec::new(),
    }
}

/// One resolved column, by English and Dutch name.
struct Column {
    index: Option<usize>,
    name: &'static str,
}

impl Column {
    fn resolve(fields: &[String], en: &'static str, nl: &'static str) -> Self {
        let index = fields
            .iter()
            .position(|field| field == en || field == nl);
        Self { index, name: en }
    }

    fn get<'r>(&self, record: &'r StringRecord) -> Option<&'r str> {
        let value = record.get(self.index?)?.trim();
        (!value.is_empty()).then_some(value)
    }

    fn require<'r>(&self, record: &'r StringRecord, line: usize) -> Result<&'r str> {
        self.get(record).ok_or_else(|| {
            row_error(line, format!("could not determine {} (empty column)", self.name))
        })
    }
}

impl BankCsv for IngCsv {
    fn has_valid_header(&self, data: &str) -> bool {
        let fields = header_fields(data);
        NL_HEADERS
            .iter()
            .all(|header| fields.iter().any(|field| field == header))
            || EN_HEADERS
                .iter()
                .all(|header| fields.iter().any(|field| field == header))
    }

    fn parse(&self, data: &str) -> Result<Vec<SourceTransaction>> {
        let fields = header_fields(data);
        let date = Column::resolve(&fields, "Date", "Datum");
        let contra_name = Column::resolve(&fields, "Name / Description", "Naam / Omschrijving");
        let account = Column::resolve(&fields, "Account", "Rekening");
        let contra_account = Column::resolve(&fields, "Counterparty", "Tegenrekening");
        let direction = Column::resolve(&fields, "Debit/credit", "Af Bij");
        let amount = Column::resolve(&fields, "Amount (EUR)", "Bedrag (EUR)");
        let description = Column::resolve(&fields, "Notifications", "Mededelingen");

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(detect_delimiter(data))
            .from_reader(data.as_bytes());

        let mut transactions = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let line = index + 2; // 1-based, after the header line
            let record =
                result.map_err(|err| row_error(line, err.to_string()))?;

            let raw_date = date.require(&record, line)?;
            let parsed_date = NaiveDate::parse_from_str(raw_date, "%Y%m%d").map_err(|_| {
                row_error(line, format!("could not determine date from value \"{raw_date}\""))
            })?;

            let raw_direction = direction.require(&record, line)?;
            let outgoing = match raw_direction {
                "Af" | "Debit" => true,
                "Bij" | "Credit" => false,
                other => {
                    return Err(row_error(
                        line,
                        format!("could not determine direction from value \"{other}\""),
                    ));
                }
            };

            let raw_amount = amount.require(&record, line)?;
            let minor = parse_amount_minor(raw_amount).ok_or_else(|| {
                row_error(line, format!("could not determine amount from value \"{raw_amount}\""))
            })?;

            transactions.push(SourceTransaction::new(
                parsed_date.and_time(NaiveTime::MIN).and_utc(),
                if outgoing { -minor } else { minor },
                account.require(&record, line)?,
                contra_account.get(&record).map(String::from),
                Some(contra_name.require(&record, line)?.to_string()),
                description.get(&record).unwrap_or_default(),
            ));
        }

        Ok(transactions)
    }
}
