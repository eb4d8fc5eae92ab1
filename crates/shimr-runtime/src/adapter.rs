//! Adapters: a host object viewed through a contract.

use std::fmt;
use std::sync::Arc;

use shimr_core::TypeId;
use shimr_resolve::{Accessor, Conversions, NestedConversion, ParamConversion};

use crate::error::RuntimeError;
use crate::plan::{AdapterPlan, Slot, SlotKey};
use crate::runtime::ShimRuntime;
use crate::value::{DynObject, Value};

/// Name under which indexers are declared.
const INDEXER: &str = "Item";

/// A wrapped object dispatching contract members through an [`AdapterPlan`].
pub struct Adapter {
    plan: Arc<AdapterPlan>,
    inner: Arc<dyn DynObject>,
    runtime: ShimRuntime,
}

impl Adapter {
    pub(crate) fn new(plan: Arc<AdapterPlan>, inner: Arc<dyn DynObject>, runtime: ShimRuntime) -> Self {
        Adapter {
            plan,
            inner,
            runtime,
        }
    }

    pub fn contract(&self) -> TypeId {
        self.plan.contract
    }

    pub fn plan(&self) -> &AdapterPlan {
        &self.plan
    }

    /// The wrapped object, bypassing the contract.
    pub fn unshim(&self) -> Value {
        Value::Object(Arc::clone(&self.inner))
    }

    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        let key = SlotKey::new(name, 0, Some(Accessor::Get));
        let (target, conversions) = self.bound(&key, &[])?;
        let value = self.inner.get(target)?;
        self.outbound(value, conversions.value)
    }

    /// Assigns through the set accessor, or the init accessor if that is
    /// all the contract declares.
    pub fn set(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let set = SlotKey::new(name, 0, Some(Accessor::Set));
        let key = if self.plan.contains(&set) {
            set
        } else {
            SlotKey::new(name, 0, Some(Accessor::Init))
        };
        let (target, conversions) = self.bound(&key, &[])?;
        let value = inbound(value, conversions.value);
        self.inner.set(target, value)
    }

    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let key = SlotKey::new(name, args.len(), None);
        let (target, conversions) = self.bound(&key, &args)?;
        let args = inbound_args(args, &conversions.params);
        let result = self.inner.call(target, args)?;
        self.outbound(result, conversions.value)
    }

    pub fn index(&self, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let key = SlotKey::new(INDEXER, args.len(), Some(Accessor::Get));
        let (_, conversions) = self.bound(&key, &args)?;
        let args = inbound_args(args, &conversions.params);
        let result = self.inner.index(args)?;
        self.outbound(result, conversions.value)
    }

    pub fn set_index(&self, args: Vec<Value>, value: Value) -> Result<(), RuntimeError> {
        let key = SlotKey::new(INDEXER, args.len(), Some(Accessor::Set));
        let (_, conversions) = self.bound(&key, &args)?;
        let args = inbound_args(args, &conversions.params);
        let value = inbound(value, conversions.value);
        self.inner.set_index(args, value)
    }

    fn bound(&self, key: &SlotKey, args: &[Value]) -> Result<(&str, &Conversions), RuntimeError> {
        match self.plan.select(key, args, self.runtime.catalog())? {
            Some(Slot::Bound {
                target_name,
                conversions,
                ..
            }) => Ok((target_name.as_str(), conversions)),
            Some(Slot::NotImplemented) => Err(RuntimeError::NotImplemented {
                contract: self.plan.contract_name.clone(),
                member: key.name.clone(),
                target: self.plan.target_name.clone(),
            }),
            None => Err(RuntimeError::UnknownMember {
                contract: self.plan.contract_name.clone(),
                member: key.name.clone(),
                arity: key.arity,
            }),
        }
    }

    /// Values leaving the target as a nested contract are adapted on demand.
    fn outbound(&self, value: Value, conversion: Option<NestedConversion>) -> Result<Value, RuntimeError> {
        match conversion {
            Some(nested) => self.runtime.shim(nested.contract, value),
            None => Ok(value),
        }
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("contract", &self.plan.contract_name)
            .field("target", &self.plan.target_name)
            .field("inner", &self.inner)
            .finish()
    }
}

/// Strips adapters from a value, element-wise for arrays.
pub fn unshim(value: Value) -> Value {
    match value {
        Value::Shim(adapter) => adapter.unshim(),
        Value::Array(items) => Value::Array(items.into_iter().map(unshim).collect()),
        other => other,
    }
}

fn inbound(value: Value, conversion: Option<NestedConversion>) -> Value {
    match conversion {
        Some(_) => unshim(value),
        None => value,
    }
}

fn inbound_args(args: Vec<Value>, params: &[ParamConversion]) -> Vec<Value> {
    args.into_iter()
        .enumerate()
        .map(|(index, arg)| {
            let conversion = params.iter().find(|p| p.index == index).map(|p| p.conversion);
            inbound(arg, conversion)
        })
        .collect()
}
