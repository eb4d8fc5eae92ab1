//! Dynamic values passed through adapters.
//!
//! [`Value`] is what flows in and out of an [`Adapter`](crate::Adapter):
//! scalars by value, objects behind `Arc<dyn DynObject>`, and adapters
//! themselves. [`DynObject`] is the seam to the host object model; it
//! reports its runtime type and answers member accesses by name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use shimr_core::TypeId;

use crate::adapter::Adapter;
use crate::error::RuntimeError;

/// A host object that members can be forwarded to.
///
/// Overloads are told apart by argument count only.
pub trait DynObject: Send + Sync + fmt::Debug {
    /// Runtime type, as registered in the catalog.
    fn runtime_type(&self) -> TypeId;

    fn get(&self, name: &str) -> Result<Value, RuntimeError>;

    fn set(&self, name: &str, value: Value) -> Result<(), RuntimeError>;

    fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError>;

    fn index(&self, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let _ = args;
        Err(RuntimeError::fault(self.runtime_type(), "Item", "not indexable"))
    }

    fn set_index(&self, args: Vec<Value>, value: Value) -> Result<(), RuntimeError> {
        let _ = (args, value);
        Err(RuntimeError::fault(self.runtime_type(), "Item", "not indexable"))
    }
}

/// A runtime value crossing an adapter boundary.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value; also the result of void members.
    Unit,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Str(String),
    Array(Vec<Value>),
    Object(Arc<dyn DynObject>),
    Shim(Arc<Adapter>),
}

impl Value {
    pub fn object(object: impl DynObject + 'static) -> Value {
        Value::Object(Arc::new(object))
    }

    /// Built-in type of scalar values; `None` for arrays, objects and adapters.
    pub fn builtin_type(&self) -> Option<TypeId> {
        match self {
            Value::Unit => Some(TypeId::VOID),
            Value::Bool(_) => Some(TypeId::BOOL),
            Value::I32(_) => Some(TypeId::I32),
            Value::I64(_) => Some(TypeId::I64),
            Value::F64(_) => Some(TypeId::F64),
            Value::Str(_) => Some(TypeId::STRING),
            Value::Array(_) | Value::Object(_) | Value::Shim(_) => None,
        }
    }

    /// Short description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Value::Unit => "unit".into(),
            Value::Bool(_) => "bool".into(),
            Value::I32(_) => "int".into(),
            Value::I64(_) => "long".into(),
            Value::F64(_) => "double".into(),
            Value::Str(_) => "string".into(),
            Value::Array(items) => format!("array of {}", items.len()),
            Value::Object(obj) => format!("object {}", obj.runtime_type()),
            Value::Shim(adapter) => format!("adapter for {}", adapter.contract()),
        }
    }

    pub fn as_shim(&self) -> Option<&Arc<Adapter>> {
        match self {
            Value::Shim(adapter) => Some(adapter),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<dyn DynObject>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

/// Objects and adapters compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Shim(a), Value::Shim(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

type Method = Arc<dyn Fn(&Record, Vec<Value>) -> Result<Value, RuntimeError> + Send + Sync>;

/// A general-purpose [`DynObject`]: named fields plus named methods.
///
/// Methods are keyed by name and argument count.
pub struct Record {
    ty: TypeId,
    fields: Mutex<IndexMap<String, Value>>,
    methods: HashMap<(String, usize), Method>,
}

impl Record {
    pub fn new(ty: TypeId) -> Self {
        Record {
            ty,
            fields: Mutex::new(IndexMap::new()),
            methods: HashMap::new(),
        }
    }

    pub fn with_field(self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.lock().insert(name.to_string(), value.into());
        self
    }

    pub fn with_method<F>(mut self, name: &str, arity: usize, body: F) -> Self
    where
        F: Fn(&Record, Vec<Value>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.methods.insert((name.to_string(), arity), Arc::new(body));
        self
    }

    /// Current value of a field, or `Unit` if it was never set.
    pub fn field(&self, name: &str) -> Value {
        self.fields.lock().get(name).cloned().unwrap_or(Value::Unit)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("ty", &self.ty)
            .field("fields", &self.fields.lock().keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DynObject for Record {
    fn runtime_type(&self) -> TypeId {
        self.ty
    }

    fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        self.fields
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::fault(self.ty, name, "no such field"))
    }

    fn set(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.fields.lock().insert(name.to_string(), value);
        Ok(())
    }

    fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let method = self
            .methods
            .get(&(name.to_string(), args.len()))
            .cloned()
            .ok_or_else(|| RuntimeError::fault(self.ty, name, "no such method"))?;
        method(self, args)
    }
}
