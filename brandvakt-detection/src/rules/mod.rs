//! ## brandvakt-detection::rules
//! **Priority-ordered static rule store with thread-safe updates**
//!
//! ### Expectations:
//! - Rules are always held sorted ascending by priority
//! - Equal priorities keep insertion order, so ties are deterministic
//! - Readers on the packet path never observe a half-applied insert/remove

use brandvakt_core::{PacketInfo, Rule, RuleMatcher, StageError};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Rule index {index} out of range (store holds {len} rules)")]
    IndexOutOfRange { index: usize, len: usize },
}

pub struct RuleStore {
    rules: RwLock<Vec<Rule>>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
        }
    }

    /// Builds a store from rules in configuration order.
    pub fn with_rules<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = Rule>,
    {
        let store = Self::new();
        for rule in rules {
            store.rule_insert(rule);
        }
        store
    }

    /// Inserts a rule after every rule of lower or equal priority.
    ///
    /// Returns the index the rule now occupies.
    pub fn rule_insert(&self, rule: Rule) -> usize {
        let mut rules = self.rules.write();
        let index = rules.partition_point(|existing| existing.priority <= rule.priority);
        debug!(name = %rule.name, priority = rule.priority, index, "Inserting rule");
        rules.insert(index, rule);
        index
    }

    /// Removes the rule at `index` in priority order.
    pub fn rule_remove(&self, index: usize) -> Result<Rule, RuleError> {
        let mut rules = self.rules.write();
        if index >= rules.len() {
            return Err(RuleError::IndexOutOfRange {
                index,
                len: rules.len(),
            });
        }
        let removed = rules.remove(index);
        info!(name = %removed.name, index, "Removed rule");
        Ok(removed)
    }

    /// First rule, in priority order, whose set fields all match the packet.
    #[inline]
    pub fn rule_match(&self, packet: &PacketInfo) -> Option<Rule> {
        let rules = self.rules.read();
        rules.iter().find(|rule| rule.matches(packet)).cloned()
    }

    /// Copy of the current rules in evaluation order.
    pub fn rules_list(&self) -> Vec<Rule> {
        self.rules.read().clone()
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleMatcher for RuleStore {
    fn rule_match(&self, packet: &PacketInfo) -> Result<Option<Rule>, StageError> {
        Ok(RuleStore::rule_match(self, packet))
    }
}
