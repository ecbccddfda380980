//! Assigning categories to ledger transactions through their filters.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::category::{Category, CategoryCollection};
use crate::filter::Filter;
use crate::observe::ObserverList;
use crate::reconcile::Ledger;
use crate::transaction::{AssignedTransaction, Assignment, SourceTransaction};

/// Computes the assignments for every transaction.
///
/// Manual filters are resolved through an identity index and come first in
/// each transaction's assignment list, in category order; text filter
/// assignments follow in category order, then per-category filter order.
/// A transaction that no filter matches gets an empty list.
pub fn assign(
    transactions: &[SourceTransaction],
    categories: &[Category],
) -> Vec<AssignedTransaction> {
    let mut pinned: HashMap<u64, Vec<Assignment>> = HashMap::new();
    for category in categories {
        for filter in &category.filters {
            if let Filter::Manual(manual) = filter {
                pinned
                    .entry(manual.transaction_hash)
                    .or_default()
                    .push(Assignment::new(&category.name, manual.id, filter.kind()));
            }
        }
    }

    transactions
        .iter()
        .map(|transaction| {
            let mut assignments = pinned.get(&transaction.hash()).cloned().unwrap_or_default();
            for category in categories {
                for filter in &category.filters {
                    if let Filter::Text(text) = filter {
                        if text.matches(transaction) {
                            assignments.push(Assignment::new(
                                &category.name,
                                text.id,
                                filter.kind(),
                            ));
                        }
                    }
                }
            }
            AssignedTransaction {
                transaction: transaction.clone(),
                assignments,
            }
        })
        .collect()
}

/// Anything that can hand out the current assigned transactions and signal
/// when they change. Lets downstream stages be tested against mocks.
pub trait AssignmentProvider {
    fn all_transactions(&self) -> Rc<[AssignedTransaction]>;
    fn subscribe(&self, callback: Box<dyn FnMut()>);
}

/// Watches the ledger and the category collection, recomputing the
/// assigned transactions lazily when either changed since the last read.
pub struct TransactionAssigner {
    ledger: Rc<RefCell<Ledger>>,
    categories: Rc<RefCell<CategoryCollection>>,
    assigned: RefCell<Rc<[AssignedTransaction]>>,
    stale: Rc<Cell<bool>>,
    observers: ObserverList,
}

impl TransactionAssigner {
    pub fn new(
        ledger: &Rc<RefCell<Ledger>>,
        categories: &Rc<RefCell<CategoryCollection>>,
    ) -> Self {
        let stale = Rc::new(Cell::new(true));
        let observers = ObserverList::new();

        {
            let stale = Rc::clone(&stale);
            let observers = observers.clone();
            ledger.borrow().subscribe(move || {
                stale.set(true);
                observers.notify();
            });
        }
        {
            let stale = Rc::clone(&stale);
            let observers = observers.clone();
            categories.borrow().subscribe(move || {
                stale.set(true);
                observers.notify();
            });
        }

        Self {
            ledger: Rc::clone(ledger),
            categories: Rc::clone(categories),
            assigned: RefCell::new(Rc::from(Vec::new())),
            stale,
            observers,
        }
    }
}

impl AssignmentProvider for TransactionAssigner {
    fn all_transactions(&self) -> Rc<[AssignedTransaction]> {
        if self.stale.get() {
            let ledger = self.ledger.borrow();
            let categories = self.categories.borrow();
            let assigned = assign(ledger.all_transactions(), categories.all());
            *self.assigned.borrow_mut() = Rc::from(assigned);
            self.stale.set(false);
        }
        Rc::clone(&self.assigned.borrow())
    }

    fn subscribe(&self, callback: Box<dyn FnMut()>) {
        self.observers.subscribe(callback);
    }
}
