//! Process-wide cache of adapter plans.
//!
//! Backed by `DashMap` so concurrent adaptations of different pairs never
//! contend. A plan is built outside any shard lock; when two threads race
//! to build the same pair, the first insert wins and both get that plan.

use std::sync::Arc;

use dashmap::DashMap;
use shimr_core::TypeId;

use crate::error::RuntimeError;
use crate::plan::AdapterPlan;

#[derive(Debug, Default)]
pub struct AdapterCache {
    plans: DashMap<(TypeId, TypeId), Arc<AdapterPlan>>,
}

impl AdapterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, contract: TypeId, target: TypeId) -> Option<Arc<AdapterPlan>> {
        self.plans.get(&(contract, target)).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the cached plan for the pair, building it on first use.
    /// Failed builds are not cached.
    pub fn get_or_build<F>(
        &self,
        contract: TypeId,
        target: TypeId,
        build: F,
    ) -> Result<Arc<AdapterPlan>, RuntimeError>
    where
        F: FnOnce() -> Result<AdapterPlan, RuntimeError>,
    {
        if let Some(plan) = self.get(contract, target) {
            return Ok(plan);
        }
        let plan = Arc::new(build()?);
        tracing::debug!(
            contract = %plan.contract_name,
            target = %plan.target_name,
            "adapter plan built"
        );
        let entry = self.plans.entry((contract, target)).or_insert(plan);
        Ok(Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
