//! The lint orchestrator
//!
//! Sequences the pipeline: plugin discovery, reference resolution, the FHIR
//! knowledge index, the BPMN phase, and the FHIR phase, merging all items
//! into one report. Per-file work inside the two rule phases runs on rayon
//! with order-preserving collection; the deadline is checked between files
//! and an expired run closes its section with a TimedOut marker.

use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use dsflint_core::{
    discover, select_resource_root, ArchiveProvider, ClassIndex, DirProvider, LintContext,
    LintItem, LintTarget, Producer, Report, ResolutionSource, ResolvedResource, ResolverTarget,
    ResourceLocation, ResourceProvider, ResourceResolver, Result, RuleKind,
};

use crate::bpmn::{self, BpmnDocument};
use crate::fhir::{self, short_name, FhirDocument, FhirIndex};

enum TargetProvider {
    Archive(ArchiveProvider),
    Dir(DirProvider),
}

impl TargetProvider {
    fn as_dyn(&self) -> &dyn ResourceProvider {
        match self {
            TargetProvider::Archive(a) => a,
            TargetProvider::Dir(d) => d,
        }
    }
}

/// A FHIR reference after parsing, kept in manifest order
enum FhirEntry {
    Unparsable(LintItem),
    Parsed(FhirDocument),
    Unresolved,
}

pub struct Linter {
    ctx: LintContext,
}

impl Linter {
    pub fn new(ctx: LintContext) -> Self {
        Self { ctx }
    }

    /// Run the full pipeline; consumes the linter so the run's temporary
    /// files are deleted on every exit path
    pub fn run(mut self, target: &LintTarget) -> Result<Report> {
        let provider = match target {
            LintTarget::Archive(path) => {
                TargetProvider::Archive(ArchiveProvider::new(path).with_nested_scan(true))
            }
            LintTarget::Directory(path) => TargetProvider::Dir(DirProvider::new(path)),
        };

        let mut report = Report::new();

        // Discovery: fatal failures surface as typed errors with no report
        let outcome = discover(provider.as_dyn(), &target.plugin_name())?;
        self.ctx.set_api_generation(outcome.manifest.api_generation);
        info!(
            plugin = %outcome.manifest.name,
            generation = %outcome.manifest.api_generation,
            processes = outcome.manifest.process_models.len(),
            "plugin discovered"
        );
        let manifest = outcome.manifest;
        report.push_section(Producer::Discovery, outcome.items);

        // Resolution, in manifest declaration order
        let class_index = ClassIndex::new(provider.as_dyn());
        let resolver_target = match (&provider, target) {
            (TargetProvider::Archive(archive), _) => ResolverTarget::Archive { archive },
            (TargetProvider::Dir(_), LintTarget::Directory(project_root)) => {
                let code_source =
                    code_source_root(project_root, &class_index, &manifest.source_class_name);
                let (resource_root, strategy) =
                    select_resource_root(project_root, code_source.as_deref());
                debug!(root = %resource_root.display(), %strategy, "resource root selected");
                ResolverTarget::Directory {
                    project_root,
                    resource_root,
                    strategy,
                }
            }
            _ => unreachable!("provider variant follows the target variant"),
        };
        let resolver =
            ResourceResolver::new(resolver_target, &self.ctx.cache, self.ctx.temp_path());

        let mut resolver_items = Vec::new();
        let process_models: Vec<ResolvedResource> = manifest
            .process_models
            .iter()
            .map(|reference| {
                let resolved = resolver.resolve(reference);
                push_resolution_items(
                    &resolved,
                    RuleKind::ProcessModelFileFound,
                    RuleKind::ProcessModelFileNotFound,
                    &mut resolver_items,
                );
                resolved
            })
            .collect();
        let fhir_refs: Vec<(String, ResolvedResource)> = manifest
            .fhir_references()
            .map(|(process_id, reference)| {
                let resolved = resolver.resolve(reference);
                push_resolution_items(
                    &resolved,
                    RuleKind::FhirResourceFileFound,
                    RuleKind::FhirResourceFileNotFound,
                    &mut resolver_items,
                );
                (process_id.to_string(), resolved)
            })
            .collect();
        report.push_section(Producer::Resolver, resolver_items);

        // Parse FHIR documents up front; both engines need the index
        let fhir_entries: Vec<FhirEntry> = fhir_refs
            .par_iter()
            .map(|(process_id, resolved)| self.parse_fhir_entry(&provider, process_id, resolved))
            .collect();
        let parsed_docs: Vec<FhirDocument> = fhir_entries
            .iter()
            .filter_map(|entry| match entry {
                FhirEntry::Parsed(doc) => Some(doc.clone()),
                _ => None,
            })
            .collect();
        let fhir_index = FhirIndex::build(&parsed_docs);

        // BPMN phase
        let mut bpmn_items: Vec<LintItem> = process_models
            .par_iter()
            .map(|resolved| {
                if self.ctx.deadline_expired() {
                    return Vec::new();
                }
                self.lint_bpmn_file(&provider, &class_index, &fhir_index, resolved)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();
        if self.ctx.deadline_expired() {
            bpmn_items.push(timed_out_item());
            report.timed_out = true;
            report.push_section(Producer::Bpmn, bpmn_items);
            return Ok(report);
        }
        report.push_section(Producer::Bpmn, bpmn_items);

        // FHIR phase
        let mut fhir_items: Vec<LintItem> = fhir_entries
            .par_iter()
            .map(|entry| {
                if self.ctx.deadline_expired() {
                    return Vec::new();
                }
                match entry {
                    FhirEntry::Unresolved => Vec::new(),
                    FhirEntry::Unparsable(item) => vec![item.clone()],
                    FhirEntry::Parsed(doc) => {
                        let result = catch_unwind(AssertUnwindSafe(|| {
                            fhir::lint_document(doc, &fhir_index, &self.ctx)
                        }));
                        match result {
                            Ok(items) => items,
                            Err(_) => vec![rule_evaluation_failed(&doc.file_name)],
                        }
                    }
                }
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();
        if self.ctx.deadline_expired() {
            fhir_items.push(timed_out_item());
            report.timed_out = true;
        }
        report.push_section(Producer::Fhir, fhir_items);

        Ok(report)
    }

    fn lint_bpmn_file(
        &self,
        provider: &TargetProvider,
        class_index: &ClassIndex<'_>,
        fhir_index: &FhirIndex,
        resolved: &ResolvedResource,
    ) -> Vec<LintItem> {
        let name = short_name(&resolved.reference).to_string();
        let Some(bytes) = read_resource(provider, &resolved.location) else {
            return Vec::new();
        };
        let doc = match BpmnDocument::parse(&resolved.reference, &bytes) {
            Ok(doc) => doc,
            Err(err) => {
                return vec![
                    LintItem::new(RuleKind::UnparsableBpmnFile, &name, &name)
                        .with_message(format!("BPMN file could not be parsed: {err}")),
                ];
            }
        };
        let result = catch_unwind(AssertUnwindSafe(|| {
            bpmn::lint_document(&doc, class_index, fhir_index, &self.ctx)
        }));
        match result {
            Ok(items) => items,
            Err(_) => vec![rule_evaluation_failed(&name)],
        }
    }

    fn parse_fhir_entry(
        &self,
        provider: &TargetProvider,
        process_id: &str,
        resolved: &ResolvedResource,
    ) -> FhirEntry {
        let Some(bytes) = read_resource(provider, &resolved.location) else {
            return FhirEntry::Unresolved;
        };
        match FhirDocument::parse(&resolved.reference, process_id, &bytes) {
            Ok(doc) => FhirEntry::Parsed(doc),
            Err(err) => {
                let name = short_name(&resolved.reference).to_string();
                FhirEntry::Unparsable(
                    LintItem::new(RuleKind::UnparsableFhirResource, &name, &name)
                        .with_message(format!("FHIR resource could not be parsed: {err}")),
                )
            }
        }
    }
}

/// Locate the directory the manifest class was loaded from, the equivalent
/// of the class's code source
fn code_source_root(
    project_root: &Path,
    class_index: &ClassIndex<'_>,
    class_name: &str,
) -> Option<std::path::PathBuf> {
    let entry = class_index.find_entry(class_name)?;
    let relative = format!("{}.class", class_name.replace('.', "/"));
    let prefix = entry.strip_suffix(&relative)?;
    Some(project_root.join(prefix))
}

fn read_resource(provider: &TargetProvider, location: &ResourceLocation) -> Option<Vec<u8>> {
    match location {
        ResourceLocation::File(path) => match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!(path = %path.display(), %err, "resolved resource unreadable");
                None
            }
        },
        ResourceLocation::Entry(entry) => match provider.as_dyn().open(entry) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!(%entry, %err, "resolved entry unreadable");
                None
            }
        },
        ResourceLocation::Missing => None,
    }
}

/// Items a single resolution contributes: found/not-found plus provenance
fn push_resolution_items(
    resolved: &ResolvedResource,
    found_kind: RuleKind,
    not_found_kind: RuleKind,
    items: &mut Vec<LintItem>,
) {
    let name = short_name(&resolved.reference);
    match &resolved.source {
        ResolutionSource::NotFound => {
            items.push(
                LintItem::new(not_found_kind, &resolved.reference, name).with_message(format!(
                    "'{}' could not be resolved under {} (strategy: {})",
                    resolved.reference, resolved.expected_root, resolved.strategy
                )),
            );
        }
        source => {
            items.push(
                LintItem::new(found_kind, &resolved.reference, name).with_message(format!(
                    "'{}' resolved (strategy: {})",
                    resolved.reference, resolved.strategy
                )),
            );
            match source {
                ResolutionSource::OutsideRoot { actual } => items.push(
                    LintItem::new(RuleKind::ResourceOutsideResourceRoot, &resolved.reference, name)
                        .with_message(format!(
                            "'{}' lies outside the resource root {}, found at {}",
                            resolved.reference,
                            resolved.expected_root,
                            actual.display()
                        )),
                ),
                ResolutionSource::FromDependency { archive } => items.push(
                    LintItem::new(
                        RuleKind::ResourceFromDependencyArchive,
                        &resolved.reference,
                        name,
                    )
                    .with_message(format!(
                        "'{}' originates from dependency archive {archive}",
                        resolved.reference
                    )),
                ),
                _ => {}
            }
        }
    }
}

fn timed_out_item() -> LintItem {
    LintItem::new(RuleKind::TimedOut, "deadline", "deadline")
}

fn rule_evaluation_failed(file: &str) -> LintItem {
    LintItem::new(RuleKind::RuleEvaluationFailed, file, file)
        .with_message(format!("Rule evaluation failed for '{file}'"))
}

/// Convenience entry: detect the target, build a default context, run
pub fn lint_path(path: &Path) -> Result<Report> {
    let target = LintTarget::detect(path)?;
    let ctx = LintContext::new()?;
    Linter::new(ctx).run(&target)
}
