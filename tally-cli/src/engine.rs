//! Wires the pipeline stages together and rebuilds them from storage.

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::rc::Rc;

use tally_core::{
    AssignmentProvider, CashFlowCalculator, CategoryCollection, Ledger, SearchProvider,
    TransactionAssigner, TransactionSearcher,
};
use tally_ingest::parse_transactions;

use crate::store::Store;

/// The assembled pipeline. Mutations go through `ledger` and `categories`;
/// queries through `searcher` and `calculator`. Invalidation flows through
/// the stages' change subscriptions set up here.
pub struct Engine {
    pub ledger: Rc<RefCell<Ledger>>,
    pub categories: Rc<RefCell<CategoryCollection>>,
    pub searcher: Rc<TransactionSearcher>,
    pub calculator: CashFlowCalculator,
}

impl Engine {
    pub fn new() -> Self {
        let ledger = Rc::new(RefCell::new(Ledger::new()));
        let categories = Rc::new(RefCell::new(CategoryCollection::new()));
        let assigner: Rc<dyn AssignmentProvider> =
            Rc::new(TransactionAssigner::new(&ledger, &categories));
        let searcher = Rc::new(TransactionSearcher::new(assigner));
        let calculator = CashFlowCalculator::new(Rc::clone(&searcher) as Rc<dyn SearchProvider>);

        Self {
            ledger,
            categories,
            searcher,
            calculator,
        }
    }

    /// Reconstructs the engine state by replaying every stored source in
    /// its original import order, then loading the stored categories.
    pub fn load(store: &Store) -> Result<Self> {
        let engine = Self::new();

        for (name, text) in store.list_sources()? {
            let transactions = parse_transactions(&text)
                .with_context(|| format!("replaying source \"{name}\""))?;
            engine
                .ledger
                .borrow_mut()
                .add_batch(&name, transactions)
                .with_context(|| format!("replaying source \"{name}\""))?;
        }

        let categories = store.load_categories()?;
        engine
            .categories
            .borrow_mut()
            .load(categories)
            .context("loading stored categories")?;

        Ok(engine)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
