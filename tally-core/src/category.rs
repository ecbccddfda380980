//! User-defined categories and their mutation surface.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::filter::Filter;
use crate::observe::ObserverList;
use crate::period::PeriodType;
use crate::util::find_new_name;

/// An optional spending budget attached to a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    /// Minor currency units per period.
    pub amount: i64,
    pub period_type: PeriodType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub budget: Option<Budget>,
    pub filters: Vec<Filter>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            budget: None,
            filters: Vec::new(),
        }
    }
}

/// The ordered set of categories. Every successful mutation fires a change
/// notification after it has fully applied.
#[derive(Debug, Default)]
pub struct CategoryCollection {
    categories: Vec<Category>,
    observers: ObserverList,
}

impl CategoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the collection contents with categories loaded from
    /// storage, re-validating every stored filter pattern.
    pub fn load(&mut self, categories: Vec<Category>) -> Result<()> {
        for category in &categories {
            for filter in &category.filters {
                filter.validate()?;
            }
        }
        self.categories = categories;
        self.observers.notify();
        Ok(())
    }

    /// Adds a category, resolving name collisions with a ` (k)` suffix.
    /// Returns the name actually used.
    pub fn add(&mut self, name: &str) -> String {
        let taken: Vec<&str> = self.categories.iter().map(|c| c.name.as_str()).collect();
        let new_name = find_new_name(name, &taken);
        self.categories.push(Category::new(new_name.clone()));
        self.observers.notify();
        new_name
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        let position = self.position(name)?;
        self.categories.remove(position);
        self.observers.notify();
        Ok(())
    }

    pub fn rename(&mut self, name: &str, new_name: &str) -> Result<()> {
        if name == new_name {
            return Ok(());
        }
        if self.categories.iter().any(|c| c.name == new_name) {
            return Err(LedgerError::Validation(format!(
                "a category named \"{new_name}\" already exists"
            )));
        }
        let position = self.position(name)?;
        self.categories[position].name = new_name.to_string();
        self.observers.notify();
        Ok(())
    }

    pub fn set_budget(&mut self, name: &str, budget: Option<Budget>) -> Result<()> {
        let position = self.position(name)?;
        self.categories[position].budget = budget;
        self.observers.notify();
        Ok(())
    }

    /// Adds a filter to a category. A filter with the same id replaces the
    /// existing one in place (upsert).
    pub fn add_filter(&mut self, name: &str, filter: Filter) -> Result<()> {
        filter.validate()?;
        let position = self.position(name)?;
        let filters = &mut self.categories[position].filters;
        match filters.iter_mut().find(|f| f.id() == filter.id()) {
            Some(existing) => *existing = filter,
            None => filters.push(filter),
        }
        self.observers.notify();
        Ok(())
    }

    pub fn remove_filter(&mut self, name: &str, filter_id: u32) -> Result<()> {
        let position = self.position(name)?;
        let filters = &mut self.categories[position].filters;
        let filter_position = filters
            .iter()
            .position(|f| f.id() == filter_id)
            .ok_or_else(|| LedgerError::NotFound(format!("filter {filter_id} in \"{name}\"")))?;
        filters.remove(filter_position);
        self.observers.notify();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Category> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| LedgerError::NotFound(name.to_string()))
    }

    pub fn list(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn all(&self) -> &[Category] {
        &self.categories
    }

    pub fn subscribe(&self, callback: impl FnMut() + 'static) {
        self.observers.subscribe(callback);
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.categories
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| LedgerError::NotFound(name.to_string()))
    }
}
