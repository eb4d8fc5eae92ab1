//! The contract registry.
//!
//! One registry lives for one resolution run. Discovery requests and the
//! resolver both feed it; every contract identity maps to exactly one
//! [`Contract`], however many times it is requested. All mutation happens
//! under a single lock so requests arriving from parallel resolution of
//! different contracts stay consistent.
//!
//! The registry also keeps the nesting graph: an edge `A -> B` records that
//! resolving contract `A` required `B` as a nested contract.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use shimr_core::{MemberId, ProxyBehaviour, TypeCatalog, TypeId};

use crate::contract::{Contract, ContractKey, Flavor};
use crate::diagnostics::{ErrorReporter, ResolveError, ShimError, Site};

/// One unit of resolver work: a contract and the instance targets it has
/// not yet been resolved against.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub contract: Contract,
    /// Instance targets added since the contract was last processed.
    pub targets: Vec<TypeId>,
    /// The contract has never been processed; target-independent members
    /// (static, proxy, factory) still need resolving.
    pub first_pass: bool,
    /// Number of instance targets covered once this item is processed.
    pub upto: usize,
}

#[derive(Debug)]
struct Entry {
    contract: Contract,
    resolved: bool,
    resolved_targets: usize,
}

#[derive(Debug, Default)]
struct Pool {
    contracts: IndexMap<TypeId, Entry>,
    nesting: DiGraph<TypeId, ()>,
    nodes: HashMap<TypeId, NodeIndex>,
    /// Flavor conflicts already reported, by contract and requested flavor.
    conflicts: HashSet<(TypeId, Flavor)>,
}

impl Pool {
    fn node(&mut self, id: TypeId) -> NodeIndex {
        if let Some(&node) = self.nodes.get(&id) {
            return node;
        }
        let node = self.nesting.add_node(id);
        self.nodes.insert(id, node);
        node
    }

    fn get_or_create(
        &mut self,
        catalog: &dyn TypeCatalog,
        reporter: &ErrorReporter,
        identity: TypeId,
        flavor: Flavor,
    ) -> Result<&mut Entry, ResolveError> {
        if !self.contracts.contains_key(&identity) {
            let contract = Contract::new(catalog, identity, flavor)?;
            tracing::debug!(contract = %contract.display_name, %flavor, "registered contract");
            self.node(identity);
            self.contracts.insert(
                identity,
                Entry {
                    contract,
                    resolved: false,
                    resolved_targets: 0,
                },
            );
        }

        let entry = self
            .contracts
            .get_mut(&identity)
            .ok_or(shimr_core::CoreError::TypeNotFound { id: identity })?;
        if entry.contract.flavor != flavor && self.conflicts.insert((identity, flavor)) {
            reporter.report(ShimError::ContractIdentityConflict {
                site: Site::Contract(identity),
                contract: entry.contract.display_name.clone(),
                existing: entry.contract.flavor,
                requested: flavor,
            });
        }
        Ok(entry)
    }
}

/// The set of all contracts known to one resolution run.
pub struct Registry {
    catalog: Arc<dyn TypeCatalog>,
    pool: Mutex<Pool>,
    reporter: ErrorReporter,
}

impl Registry {
    pub fn new(catalog: Arc<dyn TypeCatalog>) -> Self {
        Registry {
            catalog,
            pool: Mutex::new(Pool::default()),
            reporter: ErrorReporter::new(),
        }
    }

    pub fn catalog(&self) -> &dyn TypeCatalog {
        self.catalog.as_ref()
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    /// Returns the contract for `identity`, creating it if this is the first
    /// request. A request with a different flavor than the stored one is
    /// reported and answered with the stored contract.
    pub fn get_or_create(&self, identity: TypeId, flavor: Flavor) -> Result<ContractKey, ResolveError> {
        let mut pool = self.pool.lock();
        let entry = pool.get_or_create(self.catalog(), &self.reporter, identity, flavor)?;
        Ok(entry.contract.key())
    }

    fn check_contract_argument(&self, contract: TypeId) -> Result<bool, ResolveError> {
        if self.catalog.is_interface(contract) {
            return Ok(true);
        }
        self.reporter.report(ShimError::NonContractArgument {
            site: Site::Contract(contract),
            contract: self.catalog.display_name(contract),
        });
        Ok(false)
    }

    /// An adaptation request `shim<contract>(value)` where the value's static
    /// type is `hint`.
    ///
    /// Returns `None` when the request contributes nothing: the contract is
    /// not an interface (reported as an error), or the value's type is
    /// unknown or `object` (reported as a warning and left to the runtime).
    pub fn request_instance_contract(
        &self,
        contract: TypeId,
        hint: Option<TypeId>,
    ) -> Result<Option<ContractKey>, ResolveError> {
        if !self.check_contract_argument(contract)? {
            return Ok(None);
        }

        let mut pool = self.pool.lock();
        let entry = pool.get_or_create(self.catalog(), &self.reporter, contract, Flavor::Instance)?;
        match hint {
            Some(_) if entry.contract.flavor != Flavor::Instance => {}
            Some(instance) if instance != TypeId::OBJECT => {
                if entry.contract.add_target(instance) {
                    tracing::debug!(
                        contract = %entry.contract.display_name,
                        instance = %instance,
                        "instance target discovered"
                    );
                }
            }
            _ => {
                self.reporter.report(ShimError::UnresolvedTarget {
                    site: Site::Contract(contract),
                    contract: entry.contract.display_name.clone(),
                    reason: "the adapted value's type is not known at build time".into(),
                });
                return Ok(None);
            }
        }
        Ok(Some(entry.contract.key()))
    }

    /// A request `create<contract>()`.
    pub fn request_factory_contract(&self, contract: TypeId) -> Result<Option<ContractKey>, ResolveError> {
        if !self.check_contract_argument(contract)? {
            return Ok(None);
        }
        self.get_or_create(contract, Flavor::Factory).map(Some)
    }

    /// An explicit request binding `member` of `contract` to a static member
    /// (`behaviour == None`) or a proxy member of `target`.
    ///
    /// Applies to the existing contract whatever its flavor; otherwise the
    /// contract is created as a factory.
    pub fn annotate_explicit_target(
        &self,
        contract: TypeId,
        member: MemberId,
        target: TypeId,
        behaviour: Option<ProxyBehaviour>,
    ) -> Result<ContractKey, ResolveError> {
        let mut pool = self.pool.lock();
        let flavor = pool
            .contracts
            .get(&contract)
            .map_or(Flavor::Factory, |e| e.contract.flavor);
        let entry = pool.get_or_create(self.catalog(), &self.reporter, contract, flavor)?;
        if !entry.contract.set_member_target(member, target, behaviour) {
            return Err(ResolveError::UnknownContractMember { contract, member });
        }
        // A new explicit target invalidates earlier resolution of this contract.
        entry.resolved = false;
        entry.resolved_targets = 0;
        Ok(entry.contract.key())
    }

    /// Nested contract discovered while resolving `parent`: `contract` must
    /// adapt values of the concrete type `concrete`.
    ///
    /// If `contract` is already stored as a factory, the conflict is reported
    /// once and the stored contract is returned unchanged.
    pub fn request_nested(
        &self,
        parent: TypeId,
        contract: TypeId,
        concrete: TypeId,
    ) -> Result<ContractKey, ResolveError> {
        let mut pool = self.pool.lock();
        let entry = pool.get_or_create(self.catalog(), &self.reporter, contract, Flavor::Instance)?;
        // A contract stored as a factory has no instance targets to extend.
        if entry.contract.flavor == Flavor::Instance && entry.contract.add_target(concrete) {
            tracing::debug!(
                contract = %entry.contract.display_name,
                instance = %concrete,
                "nested target discovered"
            );
        }
        let key = entry.contract.key();

        let from = pool.node(parent);
        let to = pool.node(contract);
        if pool.nesting.find_edge(from, to).is_none() {
            pool.nesting.add_edge(from, to, ());
        }
        Ok(key)
    }

    pub fn contract(&self, identity: TypeId) -> Option<Contract> {
        self.pool
            .lock()
            .contracts
            .get(&identity)
            .map(|e| e.contract.clone())
    }

    /// Every contract, in registration order.
    pub fn contracts(&self) -> Vec<Contract> {
        self.pool
            .lock()
            .contracts
            .values()
            .map(|e| e.contract.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pool.lock().contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Contracts with unprocessed work, in registration order.
    pub fn pending(&self) -> Vec<WorkItem> {
        self.pool
            .lock()
            .contracts
            .values()
            .filter_map(|e| {
                let upto = e.contract.instance_targets.len();
                if e.resolved && e.resolved_targets == upto {
                    return None;
                }
                let from = if e.resolved { e.resolved_targets } else { 0 };
                Some(WorkItem {
                    contract: e.contract.clone(),
                    targets: e.contract.instance_targets.iter().skip(from).copied().collect(),
                    first_pass: !e.resolved,
                    upto,
                })
            })
            .collect()
    }

    /// Marks the given work as done. Targets added after the snapshot was
    /// taken stay pending.
    pub fn mark_processed(&self, items: &[WorkItem]) {
        let mut pool = self.pool.lock();
        for item in items {
            if let Some(entry) = pool.contracts.get_mut(&item.contract.identity) {
                entry.resolved = true;
                entry.resolved_targets = entry.resolved_targets.max(item.upto);
            }
        }
    }

    /// Contracts `parent` directly depends on as nested contracts.
    pub fn nested_contracts(&self, parent: TypeId) -> Vec<TypeId> {
        let pool = self.pool.lock();
        let Some(&node) = pool.nodes.get(&parent) else {
            return Vec::new();
        };
        let mut out: Vec<TypeId> = pool
            .nesting
            .neighbors(node)
            .map(|n| pool.nesting[n])
            .collect();
        out.sort();
        out
    }

    /// Every contract transitively reachable from `root` through nesting,
    /// `root` included.
    pub fn reachable_from(&self, root: TypeId) -> Vec<TypeId> {
        let pool = self.pool.lock();
        let Some(&start) = pool.nodes.get(&root) else {
            return Vec::new();
        };
        let mut bfs = Bfs::new(&pool.nesting, start);
        let mut out = Vec::new();
        while let Some(node) = bfs.next(&pool.nesting) {
            out.push(pool.nesting[node]);
        }
        out
    }
}
