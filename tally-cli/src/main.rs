use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;

mod engine;
mod store;

use engine::Engine;
use store::Store;
use tally_core::{
    Budget, Filter, FilterKind, ManualFilter, MatchKind, MatchPatterns, Period, PeriodType,
    SearchProvider, SearchQuery, TextFilter,
};
use tally_ingest::parse_transactions;

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version,
    about = "Reconcile bank exports into one ledger, categorize, and total cash flow"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a bank CSV export as a new source
    Import {
        file: PathBuf,
    },

    /// Show imported sources and ledger totals
    Sources,

    /// Remove an imported source and rebuild the ledger
    DropSource {
        name: String,
    },

    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },

    /// Manage a category's filters
    Filter {
        #[command(subcommand)]
        command: FilterCommand,
    },

    /// List transactions matching a query
    Search {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Total income and expenses for a query
    Cashflow {
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    /// Add a category (name collisions get a numeric suffix)
    Add { name: String },

    /// Remove a category and its filters
    Remove { name: String },

    /// Rename a category
    Rename { name: String, new_name: String },

    /// Set or clear a category's budget
    Budget {
        name: String,

        /// Budget amount per period, e.g. 400.00
        #[arg(long, conflicts_with = "clear")]
        amount: Option<String>,

        #[arg(long, value_enum, default_value_t = PeriodArg::Month)]
        period: PeriodArg,

        /// Remove the budget instead
        #[arg(long)]
        clear: bool,
    },

    /// List categories
    List,
}

#[derive(Subcommand, Debug)]
enum FilterCommand {
    /// Add or replace a text filter (matching an existing id replaces it)
    AddText {
        category: String,

        #[arg(long)]
        id: u32,

        /// Display name (defaults to showing the contra pattern)
        #[arg(long, default_value = "")]
        name: String,

        #[arg(long = "match", value_enum, default_value_t = MatchArg::Wildcard)]
        match_kind: MatchArg,

        /// Pattern for the contra-account and its display name
        #[arg(long, default_value = "")]
        contra: String,

        /// Pattern for the description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Pin one transaction to a category by its identity
    AddManual {
        category: String,

        #[arg(long)]
        id: u32,

        /// Transaction identity as printed by `tally search`
        #[arg(long)]
        transaction: String,
    },

    /// Remove a filter from a category
    Remove {
        category: String,

        #[arg(long)]
        id: u32,
    },
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[arg(long)]
    category: Option<String>,

    /// Account or contra-account identifier
    #[arg(long)]
    account: Option<String>,

    #[arg(long, value_enum)]
    filter_kind: Option<KindArg>,

    #[arg(long)]
    filter_id: Option<u32>,

    #[arg(long)]
    year: Option<i32>,

    #[arg(long, requires = "year", conflicts_with_all = ["quarter", "week", "day"])]
    month: Option<u32>,

    #[arg(long, requires = "year", conflicts_with_all = ["week", "day"])]
    quarter: Option<u32>,

    #[arg(long, requires = "year", conflicts_with = "day")]
    week: Option<u32>,

    /// Day of the year (1-366)
    #[arg(long, requires = "year")]
    day: Option<u32>,
}

impl QueryArgs {
    fn into_query(self) -> Result<SearchQuery> {
        let period = match self.year {
            None => None,
            Some(year) => {
                let period = if let Some(month) = self.month {
                    Period::new(PeriodType::Month, year, Some(month))?
                } else if let Some(quarter) = self.quarter {
                    Period::new(PeriodType::Quarter, year, Some(quarter))?
                } else if let Some(week) = self.week {
                    Period::new(PeriodType::Week, year, Some(week))?
                } else if let Some(day) = self.day {
                    Period::new(PeriodType::Day, year, Some(day))?
                } else {
                    Period::year(year)
                };
                Some(period)
            }
        };

        Ok(SearchQuery {
            category_name: self.category,
            account_id: self.account,
            filter_kind: self.filter_kind.map(FilterKind::from),
            filter_id: self.filter_id,
            period,
        })
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Manual,
    Text,
}

impl From<KindArg> for FilterKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Manual => FilterKind::Manual,
            KindArg::Text => FilterKind::Text,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MatchArg {
    Wildcard,
    Regexp,
}

impl From<MatchArg> for MatchKind {
    fn from(kind: MatchArg) -> Self {
        match kind {
            MatchArg::Wildcard => MatchKind::Wildcard,
            MatchArg::Regexp => MatchKind::Regexp,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PeriodArg {
    Year,
    Quarter,
    Month,
    Week,
    Day,
}

impl From<PeriodArg> for PeriodType {
    fn from(period: PeriodArg) -> Self {
        match period {
            PeriodArg::Year => PeriodType::Year,
            PeriodArg::Quarter => PeriodType::Quarter,
            PeriodArg::Month => PeriodType::Month,
            PeriodArg::Week => PeriodType::Week,
            PeriodArg::Day => PeriodType::Day,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = Store::open_default()?;
    let engine = Engine::load(&store)?;

    match cli.command {
        Command::Import { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let transactions = parse_transactions(&text)?;
            let count = transactions.len();

            let name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "import".to_string());
            let stored = engine.ledger.borrow_mut().add_batch(&name, transactions)?;
            store.store_source(&stored, &text)?;

            println!("Imported {count} transactions as \"{stored}\"");
            println!(
                "Ledger now holds {} transactions",
                engine.ledger.borrow().all_transactions().len()
            );
        }

        Command::Sources => {
            let info = engine.ledger.borrow().info();
            println!(
                "{} sources | {} accounts | {} transactions after reconciliation\n",
                info.batches.len(),
                info.total_accounts,
                info.total_transactions
            );
            for batch in &info.batches {
                println!(
                    "{:<24} {:>5} transactions  {:>2} accounts  {} .. {}",
                    batch.name,
                    batch.n_transactions,
                    batch.n_accounts,
                    batch.start_date.format("%Y-%m-%d"),
                    batch.end_date.format("%Y-%m-%d"),
                );
            }
        }

        Command::DropSource { name } => {
            engine.ledger.borrow_mut().remove_batch(&name);
            store.remove_source(&name)?;
            println!(
                "Removed \"{name}\"; ledger now holds {} transactions",
                engine.ledger.borrow().all_transactions().len()
            );
        }

        Command::Category { command } => {
            run_category_command(&store, &engine, command)?;
        }

        Command::Filter { command } => {
            run_filter_command(&store, &engine, command)?;
        }

        Command::Search { query } => {
            let results = engine.searcher.search(&query.into_query()?);
            for assigned in results.iter() {
                let transaction = &assigned.transaction;
                let categories: Vec<&str> = assigned
                    .assignments
                    .iter()
                    .map(|assignment| assignment.category_name.as_str())
                    .collect();
                println!(
                    "{}  {:>12}  {:016x}  {:<22}  {}{}",
                    transaction.date().format("%Y-%m-%d"),
                    format_minor(transaction.amount()),
                    transaction.hash(),
                    transaction
                        .contra_account_name()
                        .or(transaction.contra_account())
                        .unwrap_or("-"),
                    transaction.description(),
                    if categories.is_empty() {
                        String::new()
                    } else {
                        format!("  [{}]", categories.join(", "))
                    },
                );
            }
            println!("\n{} transactions", results.len());
        }

        Command::Cashflow { query } => {
            let result = engine.calculator.calculate(&query.into_query()?);
            println!("Income:   {:>14}", format_minor(result.income));
            println!("Expenses: {:>14}", format_minor(result.expenses));
            println!("Net:      {:>14}", format_minor(result.income - result.expenses));
        }
    }

    Ok(())
}

fn run_category_command(store: &Store, engine: &Engine, command: CategoryCommand) -> Result<()> {
    match command {
        CategoryCommand::Add { name } => {
            let stored = engine.categories.borrow_mut().add(&name);
            println!("Added category \"{stored}\"");
        }
        CategoryCommand::Remove { name } => {
            engine.categories.borrow_mut().remove(&name)?;
            println!("Removed category \"{name}\"");
        }
        CategoryCommand::Rename { name, new_name } => {
            engine.categories.borrow_mut().rename(&name, &new_name)?;
            println!("Renamed \"{name}\" to \"{new_name}\"");
        }
        CategoryCommand::Budget {
            name,
            amount,
            period,
            clear,
        } => {
            let budget = match (amount, clear) {
                (_, true) => None,
                (Some(amount), false) => Some(Budget {
                    amount: parse_major_amount(&amount)?,
                    period_type: period.into(),
                }),
                (None, false) => bail!("pass --amount or --clear"),
            };
            engine.categories.borrow_mut().set_budget(&name, budget)?;
            match budget {
                Some(budget) => println!(
                    "Budget for \"{name}\": {} per {:?}",
                    format_minor(budget.amount),
                    budget.period_type
                ),
                None => println!("Cleared budget for \"{name}\""),
            }
        }
        CategoryCommand::List => {
            let categories = engine.categories.borrow();
            for category in categories.all() {
                let budget = category
                    .budget
                    .map(|budget| {
                        format!(
                            "  (budget {} per {:?})",
                            format_minor(budget.amount),
                            budget.period_type
                        )
                    })
                    .unwrap_or_default();
                println!(
                    "{:<24} {} filters{budget}",
                    category.name,
                    category.filters.len()
                );
            }
            return Ok(()); // nothing changed
        }
    }

    store.store_categories(engine.categories.borrow().all())
}

fn run_filter_command(store: &Store, engine: &Engine, command: FilterCommand) -> Result<()> {
    match command {
        FilterCommand::AddText {
            category,
            id,
            name,
            match_kind,
            contra,
            description,
        } => {
            let filter = TextFilter::new(
                id,
                name,
                match_kind.into(),
                MatchPatterns {
                    contra_account: contra,
                    description,
                },
            )?;
            engine
                .categories
                .borrow_mut()
                .add_filter(&category, Filter::Text(filter))?;
            println!("Added text filter {id} to \"{category}\"");
        }
        FilterCommand::AddManual {
            category,
            id,
            transaction,
        } => {
            let transaction_hash = parse_identity(&transaction)?;
            engine.categories.borrow_mut().add_filter(
                &category,
                Filter::Manual(ManualFilter {
                    id,
                    transaction_hash,
                }),
            )?;
            println!("Pinned transaction {transaction_hash:016x} to \"{category}\"");
        }
        FilterCommand::Remove { category, id } => {
            engine.categories.borrow_mut().remove_filter(&category, id)?;
            println!("Removed filter {id} from \"{category}\"");
        }
    }

    store.store_categories(engine.categories.borrow().all())
}

/// Parses a major-unit amount like "400.00" or "400,00" into minor units.
fn parse_major_amount(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw),
    };
    if digits.is_empty() {
        bail!("invalid amount \"{raw}\"");
    }

    let normalized = digits.replace(',', ".");
    let (whole, fraction) = normalized
        .split_once('.')
        .unwrap_or((normalized.as_str(), ""));

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().with_context(|| format!("invalid amount \"{raw}\""))?
    };
    let cents: i64 = match fraction.len() {
        0 => 0,
        1 => {
            10 * fraction
                .parse::<i64>()
                .with_context(|| format!("invalid amount \"{raw}\""))?
        }
        2 => fraction
            .parse()
            .with_context(|| format!("invalid amount \"{raw}\""))?,
        _ => bail!("invalid amount \"{raw}\" (at most two decimal places)"),
    };

    Ok(sign * (whole * 100 + cents))
}

/// Formats minor units as a major-unit decimal string.
fn format_minor(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let absolute = minor.abs();
    format!("{sign}{}.{:02}", absolute / 100, absolute % 100)
}

/// Parses a transaction identity as printed by `tally search`.
fn parse_identity(raw: &str) -> Result<u64> {
    let digits = raw.trim().trim_start_matches("0x");
    u64::from_str_radix(digits, 16)
        .with_context(|| format!("invalid transaction identity \"{raw}\""))
}
