//! Income and expense totals for a search query.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::cache::BoundedCache;
use crate::observe::ObserverList;
use crate::search::{SearchProvider, SearchQuery, MAX_CACHE_ENTRIES};

/// Totals in minor units; both fields are non-negative. A zero-amount
/// transaction contributes to neither.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlow {
    pub income: i64,
    pub expenses: i64,
}

/// Sums income and expenses over the transactions matching a query,
/// caching recent results. The cache is cleared when the searcher signals
/// a change, which itself chains from assignment and ledger changes.
pub struct CashFlowCalculator {
    searcher: Rc<dyn SearchProvider>,
    cache: Rc<RefCell<BoundedCache<CashFlow>>>,
    observers: ObserverList,
}

impl CashFlowCalculator {
    pub fn new(searcher: Rc<dyn SearchProvider>) -> Self {
        let cache = Rc::new(RefCell::new(BoundedCache::new(MAX_CACHE_ENTRIES)));
        let observers = ObserverList::new();

        {
            let cache = Rc::clone(&cache);
            let observers = observers.clone();
            searcher.subscribe(Box::new(move || {
                cache.borrow_mut().clear();
                observers.notify();
            }));
        }

        Self {
            searcher,
            cache,
            observers,
        }
    }

    pub fn calculate(&self, query: &SearchQuery) -> CashFlow {
        if let Some(cash_flow) = self.cache.borrow().get(query) {
            return *cash_flow;
        }

        let mut cash_flow = CashFlow::default();
        for assigned in self.searcher.search(query).iter() {
            let amount = assigned.transaction.amount();
            if amount > 0 {
                cash_flow.income += amount;
            } else {
                cash_flow.expenses += -amount;
            }
        }

        self.cache.borrow_mut().insert(query.clone(), cash_flow);
        cash_flow
    }

    pub fn subscribe(&self, callback: impl FnMut() + 'static) {
        self.observers.subscribe(callback);
    }
}
