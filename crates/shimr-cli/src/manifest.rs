//! JSON manifest: described types, discovery requests and resolver options.
//!
//! The manifest stands in for a source scanner. Types refer to each other
//! by full name (`App.Models.IUser`), built-ins by their short name (`int`,
//! `string`, ...) and arrays by a `[]` suffix.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shimr_core::{
    Accessors, MemberDef, MemberId, ParamDef, ProxyBehaviour, ProxyDirective,
    TypeCatalog, TypeDef, TypeId, TypeKind, TypeRegistry,
};
use shimr_resolve::{Registry, ResolveOptions};

use crate::error::CliError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub types: Vec<TypeSpec>,
    #[serde(default)]
    pub requests: Vec<RequestSpec>,
    #[serde(default)]
    pub options: OptionsSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindSpec {
    Interface,
    Class,
    Struct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSpec {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    pub kind: KindSpec,
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub static_target: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKindSpec {
    Field,
    Property,
    Method,
    Indexer,
    Event,
    Constructor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessorSpec {
    Get,
    Set,
    Init,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviourSpec {
    Add,
    Override,
}

impl From<BehaviourSpec> for ProxyBehaviour {
    fn from(b: BehaviourSpec) -> Self {
        match b {
            BehaviourSpec::Add => ProxyBehaviour::Add,
            BehaviourSpec::Override => ProxyBehaviour::Override,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub underlying: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxySpec {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub behaviour: Option<BehaviourSpec>,
    #[serde(default)]
    pub implementation_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSpec {
    /// Ignored for constructors and indexers.
    #[serde(default)]
    pub name: String,
    pub kind: MemberKindSpec,
    /// Value type or return type; `void` when omitted.
    #[serde(rename = "type", default)]
    pub ty: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    /// Properties and indexers default to get-only.
    #[serde(default)]
    pub accessors: Vec<AccessorSpec>,
    #[serde(rename = "static", default)]
    pub is_static: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub static_target: Option<String>,
    #[serde(default)]
    pub proxy: Option<ProxySpec>,
    /// The contract member constructs its target.
    #[serde(default)]
    pub constructor: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RequestSpec {
    /// `shim<contract>(value)`; a missing instance means the value is untyped.
    Instance {
        contract: String,
        #[serde(default)]
        instance: Option<String>,
    },
    /// `create<contract>()`.
    Factory { contract: String },
    /// Explicit static (no behaviour) or proxy target for one member.
    Annotate {
        contract: String,
        member: String,
        target: String,
        #[serde(default)]
        behaviour: Option<BehaviourSpec>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionsSpec {
    #[serde(default)]
    pub parallel: bool,
    /// Contracts, by full name, whose missing members become stubs.
    #[serde(default)]
    pub ignore_missing: Vec<String>,
}

/// Reads and parses a manifest file.
pub fn read(path: &Path) -> Result<Manifest, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// A manifest turned into a populated registry, ready to resolve.
pub struct Loaded {
    pub catalog: Arc<TypeRegistry>,
    pub registry: Registry,
    pub options: ResolveOptions,
}

impl Manifest {
    /// Registers all types, then replays the requests in manifest order.
    ///
    /// Requests only fail here on internal faults; anything member- or
    /// request-level ends up in the registry's reporter.
    pub fn load(&self) -> Result<Loaded, CliError> {
        let types = self.build_types()?;

        let mut ignore_missing = BTreeSet::new();
        for name in &self.options.ignore_missing {
            ignore_missing.insert(lookup(&types, name)?);
        }
        let options = ResolveOptions {
            parallel: self.options.parallel,
            ignore_missing,
        };

        let catalog = Arc::new(types);
        let registry = Registry::new(Arc::clone(&catalog) as Arc<dyn TypeCatalog>);
        for request in &self.requests {
            replay(&catalog, &registry, request)?;
        }
        tracing::debug!(
            types = catalog.len(),
            contracts = registry.len(),
            "manifest loaded"
        );

        Ok(Loaded {
            catalog,
            registry,
            options,
        })
    }

    fn build_types(&self) -> Result<TypeRegistry, CliError> {
        let mut types = TypeRegistry::new();

        // Shells first so that members and bases may refer to any type.
        let mut ids = Vec::with_capacity(self.types.len());
        for spec in &self.types {
            let kind = match spec.kind {
                KindSpec::Interface => TypeKind::Interface,
                KindSpec::Class => TypeKind::Class,
                KindSpec::Struct => TypeKind::Struct,
            };
            ids.push(types.register_named(TypeDef::new(&spec.namespace, &spec.name, kind))?);
        }

        for (spec, &owner) in self.types.iter().zip(&ids) {
            for base in &spec.bases {
                let base = resolve_type(&mut types, base)?;
                types.add_base(owner, base)?;
            }
            if let Some(target) = &spec.static_target {
                let target = resolve_type(&mut types, target)?;
                types.set_static_target(owner, target)?;
            }
            for member in &spec.members {
                let def = build_member(&mut types, owner, member)?;
                types.add_member(owner, def)?;
            }
        }
        Ok(types)
    }
}

fn lookup(types: &TypeRegistry, name: &str) -> Result<TypeId, CliError> {
    types.get_by_name(name).ok_or_else(|| CliError::UnknownType {
        name: name.to_string(),
    })
}

/// Resolves a type reference, creating array types on demand.
fn resolve_type(types: &mut TypeRegistry, name: &str) -> Result<TypeId, CliError> {
    match name.trim().strip_suffix("[]") {
        Some(element) => {
            let element = resolve_type(types, element)?;
            Ok(types.array_of(element))
        }
        None => lookup(types, name.trim()),
    }
}

fn build_member(
    types: &mut TypeRegistry,
    owner: TypeId,
    spec: &MemberSpec,
) -> Result<MemberDef, CliError> {
    let ty = match &spec.ty {
        Some(name) => resolve_type(types, name)?,
        None if spec.kind == MemberKindSpec::Constructor => owner,
        None => TypeId::VOID,
    };

    let mut params = Vec::with_capacity(spec.params.len());
    for (index, param) in spec.params.iter().enumerate() {
        let name = param.name.clone().unwrap_or_else(|| format!("arg{index}"));
        let mut def = ParamDef::new(&name, resolve_type(types, &param.ty)?);
        if let Some(underlying) = &param.underlying {
            def.underlying = Some(resolve_type(types, underlying)?);
        }
        params.push(def);
    }
    let param_types: Vec<TypeId> = params.iter().map(|p| p.ty).collect();

    let accessors = if spec.accessors.is_empty() {
        Accessors::GET
    } else {
        let mut a = Accessors::NONE;
        for accessor in &spec.accessors {
            match accessor {
                AccessorSpec::Get => a.get = true,
                AccessorSpec::Set => a.set = true,
                AccessorSpec::Init => a.init = true,
            }
        }
        a
    };

    let mut def = match spec.kind {
        MemberKindSpec::Field if spec.read_only => MemberDef::readonly_field(&spec.name, ty),
        MemberKindSpec::Field => MemberDef::field(&spec.name, ty),
        MemberKindSpec::Property => MemberDef::property(&spec.name, ty, accessors),
        MemberKindSpec::Method => MemberDef::method(&spec.name, &param_types, ty),
        MemberKindSpec::Indexer => MemberDef::indexer(&param_types, ty, accessors),
        MemberKindSpec::Event => MemberDef::event(&spec.name, ty),
        MemberKindSpec::Constructor => MemberDef::constructor(&param_types, ty),
    };
    if !params.is_empty() {
        def.params = params;
    }
    if spec.is_static {
        def = def.as_static();
    }
    if let Some(alias) = &spec.alias {
        def = def.with_alias(alias);
    }
    if let Some(target) = &spec.static_target {
        def = def.with_static_target(resolve_type(types, target)?);
    }
    if let Some(proxy) = &spec.proxy {
        def.hints.proxy = Some(ProxyDirective {
            proxy_type: resolve_type(types, &proxy.ty)?,
            behaviour: proxy.behaviour.map(Into::into),
            implementation_name: proxy.implementation_name.clone(),
        });
    }
    if spec.constructor {
        def = def.as_constructor();
    }
    Ok(def)
}

/// Contract members are named by their declared name; the first match in
/// declaration order (own members before inherited ones) wins.
fn member_by_name(catalog: &TypeRegistry, contract: TypeId, name: &str) -> Result<MemberId, CliError> {
    catalog
        .members(contract)?
        .into_iter()
        .find(|(_, m)| m.name == name)
        .map(|(id, _)| id)
        .ok_or_else(|| CliError::UnknownMember {
            contract: catalog.display_name(contract),
            member: name.to_string(),
        })
}

fn replay(catalog: &TypeRegistry, registry: &Registry, request: &RequestSpec) -> Result<(), CliError> {
    match request {
        RequestSpec::Instance { contract, instance } => {
            let contract = lookup(catalog, contract)?;
            let hint = match instance {
                Some(name) => Some(lookup_existing(catalog, name)?),
                None => None,
            };
            registry.request_instance_contract(contract, hint)?;
        }
        RequestSpec::Factory { contract } => {
            registry.request_factory_contract(lookup(catalog, contract)?)?;
        }
        RequestSpec::Annotate {
            contract,
            member,
            target,
            behaviour,
        } => {
            let contract = lookup(catalog, contract)?;
            let member = member_by_name(catalog, contract, member)?;
            let target = lookup_existing(catalog, target)?;
            registry.annotate_explicit_target(contract, member, target, behaviour.map(Into::into))?;
        }
    }
    Ok(())
}

/// Like [`lookup`], but also accepts array types already in the catalog.
fn lookup_existing(catalog: &TypeRegistry, name: &str) -> Result<TypeId, CliError> {
    let name = name.trim();
    if let Some(id) = catalog.get_by_name(name) {
        return Ok(id);
    }
    if let Some(element) = name.strip_suffix("[]") {
        let element = lookup_existing(catalog, element)?;
        for index in 0..catalog.len() as u32 {
            let id = TypeId(index);
            if matches!(catalog.get(id).map(|d| d.kind), Some(TypeKind::Array { element: e }) if e == element) {
                return Ok(id);
            }
        }
    }
    Err(CliError::UnknownType {
        name: name.to_string(),
    })
}
