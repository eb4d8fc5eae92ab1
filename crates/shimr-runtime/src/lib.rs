//! Deferred (first-use) contract adaptation.
//!
//! Where the ahead-of-time resolver produces bindings for an emitter, this
//! crate matches a contract against a live object's runtime type when the
//! object is first adapted, memoizes the resulting dispatch table per
//! (contract, runtime type), and forwards calls through it. Only the
//! instance target applies here; nested contracts are adapted on demand.

pub mod adapter;
pub mod cache;
pub mod error;
pub mod plan;
pub mod runtime;
pub mod value;

pub use adapter::{unshim, Adapter};
pub use cache::AdapterCache;
pub use error::RuntimeError;
pub use plan::{AdapterPlan, Slot, SlotKey};
pub use runtime::ShimRuntime;
pub use value::{DynObject, Record, Value};
