//! The deferred backend's entry point.

use std::fmt;
use std::sync::Arc;

use dashmap::DashSet;
use shimr_core::{TypeCatalog, TypeId};

use crate::adapter::Adapter;
use crate::cache::AdapterCache;
use crate::error::RuntimeError;
use crate::plan::AdapterPlan;
use crate::value::Value;

struct RuntimeInner {
    catalog: Arc<dyn TypeCatalog>,
    cache: AdapterCache,
    lenient: DashSet<TypeId>,
}

/// Adapts values to contracts at first use.
///
/// Cheap to clone; clones share the catalog, the plan cache and the
/// leniency settings for the lifetime of the process.
#[derive(Clone)]
pub struct ShimRuntime {
    inner: Arc<RuntimeInner>,
}

impl ShimRuntime {
    pub fn new(catalog: Arc<dyn TypeCatalog>) -> Self {
        ShimRuntime {
            inner: Arc::new(RuntimeInner {
                catalog,
                cache: AdapterCache::new(),
                lenient: DashSet::new(),
            }),
        }
    }

    pub fn catalog(&self) -> &dyn TypeCatalog {
        self.inner.catalog.as_ref()
    }

    pub fn cache(&self) -> &AdapterCache {
        &self.inner.cache
    }

    /// From now on, adapters for `contract` stub members the target lacks
    /// instead of refusing to adapt. Cannot be undone.
    pub fn ignore_missing_members(&self, contract: TypeId) {
        if self.inner.lenient.insert(contract) {
            tracing::info!(contract = %self.catalog().display_name(contract), "missing members will be stubbed");
        }
    }

    pub fn is_lenient(&self, contract: TypeId) -> bool {
        self.inner.lenient.contains(&contract)
    }

    /// The cached plan for adapting `target` values to `contract`.
    pub fn plan(&self, contract: TypeId, target: TypeId) -> Result<Arc<AdapterPlan>, RuntimeError> {
        let lenient = self.is_lenient(contract);
        self.inner.cache.get_or_build(contract, target, || {
            AdapterPlan::build(self.catalog(), contract, target, lenient)
        })
    }

    /// Adapts `value` to `contract`.
    ///
    /// - unit stays unit
    /// - arrays are adapted element-wise
    /// - objects (and adapters) whose type already satisfies the contract are returned as-is
    /// - adapters for another contract are re-adapted from their wrapped object
    pub fn shim(&self, contract: TypeId, value: Value) -> Result<Value, RuntimeError> {
        let catalog = self.catalog();
        if !catalog.is_interface(contract) {
            return Err(RuntimeError::NotAContract {
                contract: catalog.display_name(contract),
            });
        }

        match value {
            Value::Unit => Ok(Value::Unit),
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.shim(contract, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Shim(adapter) => {
                if catalog.is_assignable(adapter.contract(), contract) {
                    Ok(Value::Shim(adapter))
                } else {
                    self.shim(contract, adapter.unshim())
                }
            }
            Value::Object(object) => {
                let ty = object.runtime_type();
                if catalog.is_assignable(ty, contract) {
                    return Ok(Value::Object(object));
                }
                let plan = self.plan(contract, ty)?;
                Ok(Value::Shim(Arc::new(Adapter::new(plan, object, self.clone()))))
            }
            scalar => Err(RuntimeError::UnresolvedTarget {
                contract: catalog.display_name(contract),
                value: scalar.describe(),
            }),
        }
    }
}

impl fmt::Debug for ShimRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShimRuntime")
            .field("plans", &self.inner.cache.len())
            .field("lenient", &self.inner.lenient.len())
            .finish()
    }
}
