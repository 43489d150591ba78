//! Per-source ordering of candidate layers

use std::collections::{BTreeMap, HashSet};

use super::crawl_types::{LayerKind, TargetSource};
use super::errors::{ManagerError, ManagerResult};

/// Ordered candidate layers for every target source
///
/// Built once and handed to the manager, which only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerStrategyTable {
    orders: BTreeMap<TargetSource, Vec<LayerKind>>,
}

impl Default for LayerStrategyTable {
    fn default() -> Self {
        let stealth_first = vec![LayerKind::Browser, LayerKind::FallbackBrowser, LayerKind::Http];
        let http_first = vec![LayerKind::Http, LayerKind::Browser, LayerKind::FallbackBrowser];

        let orders = TargetSource::ALL
            .iter()
            .map(|target| {
                let order = match target {
                    TargetSource::GooglePatents | TargetSource::PatentFamily => stealth_first.clone(),
                    TargetSource::Wipo | TargetSource::Inpi | TargetSource::PubChem => http_first.clone(),
                };
                (*target, order)
            })
            .collect();

        Self { orders }
    }
}

impl LayerStrategyTable {
    /// Table with no entries at all
    #[must_use]
    pub fn empty() -> Self {
        Self {
            orders: BTreeMap::new(),
        }
    }

    /// Replace the order for one target
    pub fn with_order(mut self, target: TargetSource, order: Vec<LayerKind>) -> ManagerResult<Self> {
        if order.is_empty() {
            return Err(ManagerError::Config(format!(
                "layer order for '{target}' must not be empty"
            )));
        }
        let mut seen = HashSet::with_capacity(order.len());
        if let Some(dup) = order.iter().find(|kind| !seen.insert(**kind)) {
            return Err(ManagerError::Config(format!(
                "layer '{dup}' appears twice in the order for '{target}'"
            )));
        }

        self.orders.insert(target, order);
        Ok(self)
    }

    /// Keep only `kinds` in every order, preserving relative order
    ///
    /// Fails when a target would be left without candidates.
    pub fn restrict_to(mut self, kinds: &[LayerKind]) -> ManagerResult<Self> {
        for (target, order) in &mut self.orders {
            order.retain(|kind| kinds.contains(kind));
            if order.is_empty() {
                return Err(ManagerError::Config(format!(
                    "no permitted layer left for '{target}'"
                )));
            }
        }
        Ok(self)
    }

    /// Candidate layers for `target` in try order
    pub fn candidates(&self, target: TargetSource) -> ManagerResult<&[LayerKind]> {
        self.orders
            .get(&target)
            .map(Vec::as_slice)
            .ok_or(ManagerError::InvalidTarget(target))
    }

    /// Every kind named by any order
    #[must_use]
    pub fn referenced_kinds(&self) -> Vec<LayerKind> {
        let mut kinds: Vec<LayerKind> = self.orders.values().flatten().copied().collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    pub fn targets(&self) -> impl Iterator<Item = TargetSource> + '_ {
        self.orders.keys().copied()
    }
}
