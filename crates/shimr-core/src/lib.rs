pub mod types;
pub mod type_id;
pub mod id;
pub mod error;

// Re-export commonly used types
pub use types::{
    Accessors, MemberDef, MemberHints, MemberKind, ParamDef, ProxyBehaviour, ProxyDirective,
    TypeDef, TypeKind,
};
pub use type_id::{TypeCatalog, TypeId, TypeRegistry};
pub use id::MemberId;
pub use error::CoreError;
