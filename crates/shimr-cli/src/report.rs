//! Human- and machine-readable views of a [`Resolution`].
//!
//! Ids are replaced by names so the JSON form can be diffed and read
//! without the manifest at hand.

use std::fmt::Write as _;

use serde::Serialize;
use shimr_core::{CoreError, MemberId, TypeCatalog, TypeId};
use shimr_resolve::{
    Accessor, Binding, ErrorKind, Flavor, Resolution, Severity, ShimError, Strategy, TargetKind,
};

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub contracts: Vec<ContractReport>,
    pub diagnostics: Vec<DiagnosticReport>,
    pub summary: Summary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractReport {
    pub name: String,
    pub flavor: Flavor,
    pub implementation_name: String,
    pub instances: Vec<String>,
    pub bindings: Vec<BindingReport>,
    pub stubs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BindingReport {
    pub member: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessor: Option<Accessor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub target_kind: TargetKind,
    pub target: String,
    pub target_member: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overridden: Option<String>,
    pub strategy: Strategy,
    /// Nested contracts crossed by this binding.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub severity: Severity,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub contracts: usize,
    pub bindings: usize,
    pub stubs: usize,
    pub errors: usize,
    pub warnings: usize,
    pub passes: usize,
}

impl Report {
    pub fn build(resolution: &Resolution, catalog: &dyn TypeCatalog) -> Result<Report, CoreError> {
        let mut contracts = Vec::with_capacity(resolution.contracts.len());
        for resolved in &resolution.contracts {
            let bindings = resolved
                .bindings
                .iter()
                .map(|b| binding_report(b, catalog))
                .collect::<Result<Vec<_>, _>>()?;
            contracts.push(ContractReport {
                name: resolved.contract.display_name.clone(),
                flavor: resolved.contract.flavor,
                implementation_name: resolved.contract.implementation_name.clone(),
                instances: resolved
                    .contract
                    .instance_targets
                    .iter()
                    .map(|&ty| catalog.display_name(ty))
                    .collect(),
                bindings,
                stubs: resolved.stubs.iter().map(|s| s.name.clone()).collect(),
            });
        }

        let diagnostics: Vec<DiagnosticReport> =
            resolution.errors.iter().map(diagnostic_report).collect();
        let errors = diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();

        let summary = Summary {
            contracts: contracts.len(),
            bindings: contracts.iter().map(|c| c.bindings.len()).sum(),
            stubs: contracts.iter().map(|c| c.stubs.len()).sum(),
            errors,
            warnings: diagnostics.len() - errors,
            passes: resolution.passes,
        };

        Ok(Report {
            contracts,
            diagnostics,
            summary,
        })
    }

    /// Only the diagnostics, for `shimr check`.
    pub fn diagnostics_only(mut self) -> Report {
        self.contracts.clear();
        self
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for contract in &self.contracts {
            let _ = write!(out, "{} ({}) -> {}", contract.name, contract.flavor, contract.implementation_name);
            if !contract.instances.is_empty() {
                let _ = write!(out, " [{}]", contract.instances.join(", "));
            }
            out.push('\n');
            for b in &contract.bindings {
                let accessor = match b.accessor {
                    Some(Accessor::Get) => ".get",
                    Some(Accessor::Set) => ".set",
                    Some(Accessor::Init) => ".init",
                    None => "",
                };
                let _ = writeln!(
                    out,
                    "  {}{} => {}::{} ({:?}, {:?})",
                    b.member, accessor, b.target, b.target_member, b.target_kind, b.strategy
                );
            }
            for stub in &contract.stubs {
                let _ = writeln!(out, "  {stub} => not implemented");
            }
        }
        for d in &self.diagnostics {
            let label = match d.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            let _ = writeln!(out, "{label}[{:?}]: {}", d.kind, d.message);
        }
        let s = &self.summary;
        let _ = writeln!(
            out,
            "{} contract(s), {} binding(s), {} stub(s), {} error(s), {} warning(s) in {} pass(es)",
            s.contracts, s.bindings, s.stubs, s.errors, s.warnings, s.passes
        );
        out
    }
}

fn member_name(id: MemberId, catalog: &dyn TypeCatalog) -> Result<String, CoreError> {
    Ok(catalog.member(id)?.name.clone())
}

fn type_name(id: TypeId, catalog: &dyn TypeCatalog) -> String {
    catalog.display_name(id)
}

fn binding_report(b: &Binding, catalog: &dyn TypeCatalog) -> Result<BindingReport, CoreError> {
    Ok(BindingReport {
        member: member_name(b.member, catalog)?,
        accessor: b.accessor,
        instance: b.instance.map(|ty| type_name(ty, catalog)),
        target_kind: b.target.kind,
        target: type_name(b.target.ty, catalog),
        target_member: member_name(b.target_member, catalog)?,
        overridden: b
            .overridden
            .map(|id| member_name(id, catalog))
            .transpose()?,
        strategy: b.strategy,
        nested: b
            .conversions
            .nested()
            .map(|n| type_name(n.contract, catalog))
            .collect(),
    })
}

fn diagnostic_report(error: &ShimError) -> DiagnosticReport {
    DiagnosticReport {
        severity: error.severity(),
        kind: error.kind(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use shimr_core::{MemberDef, TypeDef, TypeRegistry};
    use shimr_resolve::{Registry, ResolveOptions, Resolver};

    fn resolve(types: TypeRegistry, setup: impl FnOnce(&Registry)) -> (Arc<TypeRegistry>, Resolution) {
        let catalog = Arc::new(types);
        let registry = Registry::new(Arc::clone(&catalog) as Arc<dyn TypeCatalog>);
        setup(&registry);
        let resolution = Resolver::new(&registry, ResolveOptions::default())
            .resolve()
            .unwrap();
        (catalog, resolution)
    }

    #[test]
    fn bindings_are_named() {
        let mut types = TypeRegistry::new();
        let target = types
            .register_named(
                TypeDef::class("App", "Greeter")
                    .with_member(MemberDef::method("Greet", &[], TypeId::STRING)),
            )
            .unwrap();
        let iface = types
            .register_named(
                TypeDef::interface("App", "IGreeter")
                    .with_member(MemberDef::method("Greet", &[], TypeId::STRING)),
            )
            .unwrap();
        let (catalog, resolution) = resolve(types, |r| {
            r.request_instance_contract(iface, Some(target)).unwrap();
        });

        let report = Report::build(&resolution, catalog.as_ref()).unwrap();
        assert_eq!(report.summary.contracts, 1);
        assert_eq!(report.summary.bindings, 1);
        assert!(!report.has_errors());

        let contract = &report.contracts[0];
        assert_eq!(contract.name, "App.IGreeter");
        assert_eq!(contract.instances, vec!["App.Greeter".to_string()]);
        let binding = &contract.bindings[0];
        assert_eq!(binding.member, "Greet");
        assert_eq!(binding.target, "App.Greeter");
        assert_eq!(binding.target_member, "Greet");
        assert_eq!(binding.strategy, Strategy::Direct);

        let text = report.to_text();
        assert!(text.contains("Greet => App.Greeter::Greet (Instance, Direct)"));
        assert!(text.contains("1 contract(s), 1 binding(s)"));
    }

    #[test]
    fn diagnostics_are_counted_by_severity() {
        let mut types = TypeRegistry::new();
        let target = types.register_named(TypeDef::class("App", "Empty")).unwrap();
        let iface = types
            .register_named(
                TypeDef::interface("App", "INeeds")
                    .with_member(MemberDef::method("Run", &[], TypeId::VOID)),
            )
            .unwrap();
        let other = types.register_named(TypeDef::interface("App", "IOther")).unwrap();
        let (catalog, resolution) = resolve(types, |r| {
            r.request_instance_contract(iface, Some(target)).unwrap();
            r.request_instance_contract(other, None).unwrap();
        });

        let report = Report::build(&resolution, catalog.as_ref()).unwrap();
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.warnings, 1);
        assert!(report.has_errors());
        assert!(report.to_text().contains("error[MissingMember]"));

        let check = report.diagnostics_only();
        assert!(check.contracts.is_empty());
        assert_eq!(check.diagnostics.len(), 2);
    }

    #[test]
    fn json_omits_empty_optionals() {
        let mut types = TypeRegistry::new();
        let target = types
            .register_named(
                TypeDef::class("App", "T").with_member(MemberDef::method("M", &[], TypeId::VOID)),
            )
            .unwrap();
        let iface = types
            .register_named(
                TypeDef::interface("App", "IT").with_member(MemberDef::method("M", &[], TypeId::VOID)),
            )
            .unwrap();
        let (catalog, resolution) = resolve(types, |r| {
            r.request_instance_contract(iface, Some(target)).unwrap();
        });
        let report = Report::build(&resolution, catalog.as_ref()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        let binding = &json["contracts"][0]["bindings"][0];
        assert!(binding.get("accessor").is_none());
        assert!(binding.get("nested").is_none());
        assert_eq!(binding["strategy"], "direct");
        assert_eq!(binding["instance"], "App.T");
    }
}
