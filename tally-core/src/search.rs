//! Query evaluation over assigned transactions, with a recency cache.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::assign::AssignmentProvider;
use crate::cache::BoundedCache;
use crate::filter::FilterKind;
use crate::observe::ObserverList;
use crate::period::Period;
use crate::transaction::AssignedTransaction;

/// How many recent query results each caching stage keeps.
pub const MAX_CACHE_ENTRIES: usize = 5;

/// A partial-match descriptor over assigned transactions. Present fields
/// are ANDed; absent fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub category_name: Option<String>,
    /// Matched against the transaction's own account and contra-account.
    pub account_id: Option<String>,
    pub filter_kind: Option<FilterKind>,
    pub filter_id: Option<u32>,
    pub period: Option<Period>,
}

impl SearchQuery {
    /// True if the assigned transaction satisfies every present field.
    /// The assignment-scoped fields must all hold on a single assignment.
    pub fn matches(&self, assigned: &AssignedTransaction) -> bool {
        let transaction = &assigned.transaction;

        let assignment_scoped = self.category_name.is_some()
            || self.filter_kind.is_some()
            || self.filter_id.is_some();
        if assignment_scoped {
            let satisfied = assigned.assignments.iter().any(|assignment| {
                self.category_name
                    .as_deref()
                    .is_none_or(|name| assignment.category_name == name)
                    && self
                        .filter_kind
                        .is_none_or(|kind| assignment.filter_kind == kind)
                    && self.filter_id.is_none_or(|id| assignment.filter_id == id)
            });
            if !satisfied {
                return false;
            }
        }

        if let Some(account) = &self.account_id {
            let own = transaction.account() == account;
            let contra = transaction.contra_account() == Some(account.as_str());
            if !own && !contra {
                return false;
            }
        }

        if let Some(period) = &self.period {
            if !period.contains(transaction.date()) {
                return false;
            }
        }

        true
    }
}

/// Anything that can answer search queries and signal result staleness.
pub trait SearchProvider {
    fn search(&self, query: &SearchQuery) -> Rc<[AssignedTransaction]>;
    fn subscribe(&self, callback: Box<dyn FnMut()>);
}

/// Evaluates search queries against the assigner's transactions, serving
/// repeated queries from a bounded recency cache. The cache is cleared
/// whenever the assignments change; the clear is propagated downstream.
pub struct TransactionSearcher {
    assigner: Rc<dyn AssignmentProvider>,
    cache: Rc<RefCell<BoundedCache<Rc<[AssignedTransaction]>>>>,
    observers: ObserverList,
}

impl TransactionSearcher {
    pub fn new(assigner: Rc<dyn AssignmentProvider>) -> Self {
        let cache = Rc::new(RefCell::new(BoundedCache::new(MAX_CACHE_ENTRIES)));
        let observers = ObserverList::new();

        {
            let cache = Rc::clone(&cache);
            let observers = observers.clone();
            assigner.subscribe(Box::new(move || {
                cache.borrow_mut().clear();
                observers.notify();
            }));
        }

        Self {
            assigner,
            cache,
            observers,
        }
    }
}

impl SearchProvider for TransactionSearcher {
    /// Matching transactions in ledger order. Callers share the returned
    /// slice and must not rely on it reflecting later mutations.
    fn search(&self, query: &SearchQuery) -> Rc<[AssignedTransaction]> {
        if let Some(results) = self.cache.borrow().get(query) {
            return Rc::clone(results);
        }

        let all = self.assigner.all_transactions();
        let results: Rc<[AssignedTransaction]> = all
            .iter()
            .filter(|assigned| query.matches(assigned))
            .cloned()
            .collect::<Vec<_>>()
            .into();

        self.cache
            .borrow_mut()
            .insert(query.clone(), Rc::clone(&results));
        results
    }

    fn subscribe(&self, callback: Box<dyn FnMut()>) {
        self.observers.subscribe(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Assignment, SourceTransaction, DECIMAL};
    use chrono::{TimeZone, Utc};
    use std::cell::Cell;

    fn assigned(
        date: (i32, u32, u32),
        amount: i64,
        account: &str,
        contra_account: &str,
        description: &str,
        assignments: Vec<Assignment>,
    ) -> AssignedTransaction {
        AssignedTransaction {
            transaction: SourceTransaction::new(
                Utc.with_ymd_and_hms(date.0, date.1, date.2, 0, 0, 0).unwrap(),
                amount,
                account,
                Some(contra_account.to_string()),
                None,
                description,
            ),
            assignments,
        }
    }

    fn test_transactions() -> Vec<AssignedTransaction> {
        vec![
            assigned(
                (2022, 2, 23),
                -255 * DECIMAL / 10,
                "NL00MAIN1234567890",
                "NL57RABO0329443948",
                "Ticket 2022-293302",
                vec![Assignment::new("Events", 0x06, FilterKind::Text)],
            ),
            assigned(
                (2021, 11, 16),
                -200 * DECIMAL,
                "NL00SCND0987654321",
                "NL23ABNA9349042743",
                "Invoice 934830293, laptop model VT94",
                vec![Assignment::new("Tools", 0x01, FilterKind::Manual)],
            ),
            assigned(
                (2021, 10, 13),
                -20 * DECIMAL,
                "NL00MAIN1234567890",
                "NL98INGB2152156592",
                "Lunch",
                vec![
                    Assignment::new("Catering", 0x02, FilterKind::Manual),
                    Assignment::new("Food", 0x03, FilterKind::Manual),
                ],
            ),
            assigned(
                (2021, 9, 2),
                -430 * DECIMAL,
                "NL00MAIN1234567890",
                "NL23ABNA0983409855",
                "13th of November tire sale, 4x sports tires",
                vec![
                    Assignment::new("Tools", 0x04, FilterKind::Manual),
                    Assignment::new("Tools", 0x05, FilterKind::Text),
                ],
            ),
        ]
    }

    /// Counts recomputations so cache behavior is observable.
    struct CountingAssigner {
        transactions: RefCell<Rc<[AssignedTransaction]>>,
        reads: Cell<usize>,
        observers: ObserverList,
    }

    impl CountingAssigner {
        fn new(transactions: Vec<AssignedTransaction>) -> Self {
            Self {
                transactions: RefCell::new(transactions.into()),
                reads: Cell::new(0),
                observers: ObserverList::new(),
            }
        }

        fn change_transactions(&self, transactions: Vec<AssignedTransaction>) {
            *self.transactions.borrow_mut() = transactions.into();
            self.observers.notify();
        }
    }

    impl AssignmentProvider for CountingAssigner {
        fn all_transactions(&self) -> Rc<[AssignedTransaction]> {
            self.reads.set(self.reads.get() + 1);
            Rc::clone(&self.transactions.borrow())
        }

        fn subscribe(&self, callback: Box<dyn FnMut()>) {
            self.observers.subscribe(callback);
        }
    }

    fn searcher_with(
        transactions: Vec<AssignedTransaction>,
    ) -> (Rc<CountingAssigner>, TransactionSearcher) {
        let assigner = Rc::new(CountingAssigner::new(transactions));
        let searcher = TransactionSearcher::new(Rc::clone(&assigner) as Rc<dyn AssignmentProvider>);
        (assigner, searcher)
    }

    fn category_query(name: &str) -> SearchQuery {
        SearchQuery {
            category_name: Some(name.to_string()),
            ..SearchQuery::default()
        }
    }

    #[test]
    fn searches_by_category_name() {
        let (_, searcher) = searcher_with(test_transactions());

        let results = searcher.search(&category_query("Tools"));
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].transaction.description(),
            "Invoice 934830293, laptop model VT94"
        );
        assert_eq!(
            results[1].transaction.description(),
            "13th of November tire sale, 4x sports tires"
        );

        assert!(searcher.search(&category_query("Nonexistent")).is_empty());
    }

    #[test]
    fn searches_by_filter_kind() {
        let (_, searcher) = searcher_with(test_transactions());

        let manual = searcher.search(&SearchQuery {
            filter_kind: Some(FilterKind::Manual),
            ..SearchQuery::default()
        });
        assert_eq!(manual.len(), 3);

        let text = searcher.search(&SearchQuery {
            filter_kind: Some(FilterKind::Text),
            ..SearchQuery::default()
        });
        assert_eq!(text.len(), 2);
        assert_eq!(text[0].transaction.description(), "Ticket 2022-293302");
    }

    #[test]
    fn searches_by_filter_id() {
        let (_, searcher) = searcher_with(test_transactions());

        let results = searcher.search(&SearchQuery {
            filter_id: Some(0x05),
            ..SearchQuery::default()
        });
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].transaction.description(),
            "13th of November tire sale, 4x sports tires"
        );
    }

    #[test]
    fn assignment_scoped_fields_must_hold_on_one_assignment() {
        let (_, searcher) = searcher_with(test_transactions());

        // "Tools" has filter 0x04 (manual) and 0x05 (text); a query pairing
        // the category with a filter id from another assignment matches
        // nothing on other categories.
        let results = searcher.search(&SearchQuery {
            category_name: Some("Catering".to_string()),
            filter_id: Some(0x03),
            ..SearchQuery::default()
        });
        assert!(results.is_empty());

        let results = searcher.search(&SearchQuery {
            category_name: Some("Food".to_string()),
            filter_id: Some(0x03),
            ..SearchQuery::default()
        });
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn searches_by_account() {
        let (_, searcher) = searcher_with(test_transactions());

        let own = searcher.search(&SearchQuery {
            account_id: Some("NL00SCND0987654321".to_string()),
            ..SearchQuery::default()
        });
        assert_eq!(own.len(), 1);

        let contra = searcher.search(&SearchQuery {
            account_id: Some("NL98INGB2152156592".to_string()),
            ..SearchQuery::default()
        });
        assert_eq!(contra.len(), 1);
        assert_eq!(contra[0].transaction.description(), "Lunch");
    }

    #[test]
    fn searches_by_period() {
        let (_, searcher) = searcher_with(test_transactions());

        let in_2021 = searcher.search(&SearchQuery {
            period: Some(Period::year(2021)),
            ..SearchQuery::default()
        });
        assert_eq!(in_2021.len(), 3);
    }

    #[test]
    fn empty_query_matches_unassigned_transactions() {
        let mut transactions = test_transactions();
        transactions.push(assigned(
            (2021, 8, 1),
            -5 * DECIMAL,
            "NL00MAIN1234567890",
            "NL11OTHR0000000001",
            "Parking",
            Vec::new(),
        ));
        let (_, searcher) = searcher_with(transactions);

        assert_eq!(searcher.search(&SearchQuery::default()).len(), 5);
        // But an assignment-scoped query never matches them.
        assert!(searcher
            .search(&SearchQuery {
                filter_kind: Some(FilterKind::Text),
                ..SearchQuery::default()
            })
            .iter()
            .all(|t| !t.assignments.is_empty()));
    }

    #[test]
    fn repeated_queries_are_served_from_the_cache() {
        let (assigner, searcher) = searcher_with(test_transactions());

        let first = searcher.search(&category_query("Tools"));
        let second = searcher.search(&category_query("Tools"));
        assert_eq!(first, second);
        assert_eq!(assigner.reads.get(), 1);
    }

    #[test]
    fn cache_keeps_at_most_the_configured_number_of_queries() {
        let (assigner, searcher) = searcher_with(test_transactions());

        for index in 0..(MAX_CACHE_ENTRIES + 2) {
            searcher.search(&category_query(&format!("Category {index}")));
        }
        assert_eq!(assigner.reads.get(), MAX_CACHE_ENTRIES + 2);

        // The two oldest queries were evicted, the rest still hit.
        searcher.search(&category_query("Category 2"));
        assert_eq!(assigner.reads.get(), MAX_CACHE_ENTRIES + 2);
        searcher.search(&category_query("Category 0"));
        assert_eq!(assigner.reads.get(), MAX_CACHE_ENTRIES + 3);
    }

    #[test]
    fn upstream_change_clears_the_cache_and_notifies_downstream() {
        let (assigner, searcher) = searcher_with(test_transactions());
        let notified = Rc::new(Cell::new(0));
        {
            let notified = Rc::clone(&notified);
            searcher.subscribe(Box::new(move || notified.set(notified.get() + 1)));
        }

        let before = searcher.search(&category_query("Tools"));
        assert_eq!(before.len(), 2);

        assigner.change_transactions(test_transactions()[..1].to_vec());
        assert_eq!(notified.get(), 1);

        let after = searcher.search(&category_query("Tools"));
        assert!(after.is_empty());
        assert_eq!(assigner.reads.get(), 2);
    }

    #[test]
    fn period_queries_compare_by_value_in_the_cache() {
        let (assigner, searcher) = searcher_with(test_transactions());

        let query = SearchQuery {
            period: Some(Period::year(2021)),
            ..SearchQuery::default()
        };
        searcher.search(&query);
        searcher.search(&query.clone());
        assert_eq!(assigner.reads.get(), 1);

        searcher.search(&SearchQuery {
            period: Some(Period::year(2022)),
            ..SearchQuery::default()
        });
        assert_eq!(assigner.reads.get(), 2);
    }
}
