//! FHIR rule engine
//!
//! Parses FHIR R4 documents (XML directly, JSON through the core's
//! JSON-to-XML projection) and routes each document to at most one
//! per-resource-type linter. Cross-file knowledge lives in the [`FhirIndex`]
//! built over all parsed documents before any rule runs.

pub mod activity_definition;
pub mod code_system;
pub mod questionnaire;
pub mod structure_definition;
pub mod task;
pub mod value_set;

use std::collections::HashSet;

use tracing::debug;

use dsflint_core::{parse_document, project_json, Element, LintContext, LintItem, Result};

/// DSF canonical url prefix for StructureDefinitions
pub const STRUCTURE_DEFINITION_PREFIX: &str = "http://dsf.dev/fhir/StructureDefinition/";
/// The ActivityDefinition profile every DSF process declares
pub const ACTIVITY_DEFINITION_PROFILE: &str =
    "http://dsf.dev/fhir/StructureDefinition/activity-definition";
/// System of the DSF read-access tag
pub const READ_ACCESS_TAG_SYSTEM: &str = "http://dsf.dev/fhir/CodeSystem/read-access-tag";
/// Url of the process-authorization extension
pub const PROCESS_AUTHORIZATION_EXTENSION: &str =
    "http://dsf.dev/fhir/StructureDefinition/extension-process-authorization";
/// System of the process-authorization code system
pub const PROCESS_AUTHORIZATION_SYSTEM: &str =
    "http://dsf.dev/fhir/CodeSystem/process-authorization";
/// Element id of the message-name slice value in Task profiles
pub const MESSAGE_NAME_ELEMENT_ID: &str = "Task.input:message-name.value[x]";

/// Placeholders substituted at deployment time
pub const VERSION_PLACEHOLDER: &str = "#{version}";
pub const DATE_PLACEHOLDER: &str = "#{date}";

/// Canonical url without its `|version` suffix: the substring before the
/// first pipe, regardless of how many pipes follow
pub fn strip_version(url: &str) -> &str {
    url.split('|').next().unwrap_or(url)
}

/// One parsed FHIR document
#[derive(Debug, Clone)]
pub struct FhirDocument {
    /// Short file name, used as location and as reference fallback
    pub file_name: String,
    /// Process id the manifest grouped this resource under
    pub process_id: String,
    pub root: Element,
}

impl FhirDocument {
    /// Parse XML or JSON depending on the file suffix (case-insensitive)
    pub fn parse(file_name: &str, process_id: &str, bytes: &[u8]) -> Result<Self> {
        let root = if file_name.to_ascii_lowercase().ends_with(".json") {
            project_json(file_name, bytes)?
        } else {
            parse_document(file_name, bytes)?
        };
        Ok(Self {
            file_name: short_name(file_name).to_string(),
            process_id: process_id.to_string(),
            root,
        })
    }

    pub fn resource_type(&self) -> &str {
        &self.root.name
    }

    pub fn canonical_url(&self) -> Option<&str> {
        self.root.child_value("url")
    }

    /// Canonical url when known, the file short name otherwise
    pub fn reference(&self) -> &str {
        self.canonical_url().unwrap_or(&self.file_name)
    }
}

pub fn short_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Cross-file knowledge shared by the BPMN and FHIR engines; built once,
/// never mutated during rule evaluation
#[derive(Debug, Clone, Default)]
pub struct FhirIndex {
    /// ActivityDefinition canonical urls, version suffixes stripped
    pub activity_definition_urls: HashSet<String>,
    /// StructureDefinition canonical urls, version suffixes stripped
    pub structure_definition_urls: HashSet<String>,
    /// CodeSystem canonical urls
    pub code_system_urls: HashSet<String>,
    /// Message names declared by ActivityDefinition process-authorization
    /// `message-name` sub-extensions
    pub activity_definition_message_names: HashSet<String>,
    /// Message names fixed by StructureDefinition Task.input slices
    pub structure_definition_message_names: HashSet<String>,
}

impl FhirIndex {
    pub fn build(documents: &[FhirDocument]) -> Self {
        let mut index = Self::default();
        for doc in documents {
            index.add(doc);
        }
        index
    }

    fn add(&mut self, doc: &FhirDocument) {
        let url = doc.canonical_url().map(|u| strip_version(u).to_string());
        match doc.resource_type() {
            "ActivityDefinition" => {
                if let Some(url) = url {
                    self.activity_definition_urls.insert(url);
                }
                for authorization in doc.root.extensions(PROCESS_AUTHORIZATION_EXTENSION) {
                    for message_name in authorization.extensions("message-name") {
                        if let Some(value) = message_name.child_value("valueString") {
                            self.activity_definition_message_names
                                .insert(value.to_string());
                        }
                    }
                }
            }
            "StructureDefinition" => {
                if let Some(url) = url {
                    self.structure_definition_urls.insert(url);
                }
                if let Some(differential) = doc.root.child("differential") {
                    for element in differential.children_named("element") {
                        if element.attr("id") == Some(MESSAGE_NAME_ELEMENT_ID)
                            && let Some(fixed) = element.child_value("fixedString")
                        {
                            self.structure_definition_message_names
                                .insert(fixed.to_string());
                        }
                    }
                }
            }
            "CodeSystem" => {
                if let Some(url) = url {
                    self.code_system_urls.insert(url);
                }
            }
            _ => {}
        }
    }
}

/// Route a document to its per-type linter; unknown types are skipped
pub fn lint_document(
    doc: &FhirDocument,
    index: &FhirIndex,
    ctx: &LintContext,
) -> Vec<LintItem> {
    match doc.resource_type() {
        "ActivityDefinition" => activity_definition::lint(doc, ctx),
        "StructureDefinition" => structure_definition::lint(doc),
        "CodeSystem" => code_system::lint(doc),
        "ValueSet" => value_set::lint(doc, index),
        "Questionnaire" => questionnaire::lint(doc),
        "Task" => task::lint(doc, index),
        other => {
            debug!(resource_type = other, file = %doc.file_name, "resource type not linted");
            Vec::new()
        }
    }
}

/// Shared check: the first `meta.tag` must be the read-access tag with
/// code ALL
pub(crate) fn check_read_access_tag(
    doc: &FhirDocument,
    items: &mut Vec<LintItem>,
) {
    use dsflint_core::RuleKind;

    let first_tag = doc.root.child("meta").and_then(|m| m.child("tag"));
    match first_tag {
        None => items.push(LintItem::new(
            RuleKind::ReadAccessTagMissing,
            &doc.file_name,
            doc.reference(),
        )),
        Some(tag) => {
            let system = tag.child_value("system");
            let code = tag.child_value("code");
            if system == Some(READ_ACCESS_TAG_SYSTEM) && code == Some("ALL") {
                items.push(LintItem::new(
                    RuleKind::ReadAccessTagValid,
                    &doc.file_name,
                    doc.reference(),
                ));
            } else {
                items.push(
                    LintItem::new(
                        RuleKind::ReadAccessTagInvalid,
                        &doc.file_name,
                        doc.reference(),
                    )
                    .with_message(format!(
                        "First meta.tag must have system {READ_ACCESS_TAG_SYSTEM} and code ALL, found system {} and code {}",
                        system.unwrap_or("<none>"),
                        code.unwrap_or("<none>")
                    )),
                );
            }
        }
    }
}

/// Shared check: an element's `value` must contain a placeholder literal
pub(crate) fn check_placeholder(
    doc: &FhirDocument,
    element_name: &str,
    placeholder: &str,
    missing_kind: dsflint_core::RuleKind,
    items: &mut Vec<LintItem>,
) {
    let value = doc.root.child_value(element_name);
    if !value.is_some_and(|v| v.contains(placeholder)) {
        items.push(
            LintItem::new(missing_kind, &doc.file_name, doc.reference()).with_message(format!(
                "{element_name} must contain the literal {placeholder}, found '{}'",
                value.unwrap_or("<none>")
            )),
        );
    }
}
