//! Plugin manifest discovery
//!
//! Locates the single process plugin definition inside the resource tree,
//! determines the DSF API generation, and extracts the manifest's process
//! model and FHIR reference lists. Lookup order: service-registration files
//! first, structural class scan as fallback. Discovery is deterministic for
//! a given resource tree.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classfile::ClassFile;
use crate::classpath::ClassIndex;
use crate::error::DsflintError;
use crate::provider::ResourceProvider;
use crate::report::{LintItem, RuleKind};
use crate::resolver::normalize_reference;
use crate::Result;

/// Leaf-name suffix of plugin definition classes
pub const PLUGIN_DEFINITION_SUFFIX: &str = "ProcessPluginDefinition";

/// Conventional locations of service-registration directories, in order
pub const SERVICE_DIRS: [&str; 4] = [
    "META-INF/services",
    "src/main/resources/META-INF/services",
    "target/classes/META-INF/services",
    "build/resources/main/META-INF/services",
];

static RESOURCE_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<rv>\d+\.\d+)\.\d+\.\d+$").expect("valid regex"));

/// DSF API generation with its well-known type names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiGeneration {
    V1,
    V2,
}

impl ApiGeneration {
    /// Both generations, in priority order
    pub const PRIORITIZED: [ApiGeneration; 2] = [ApiGeneration::V2, ApiGeneration::V1];

    /// Leaf name of the service-registration file; doubles as the marker
    /// type plugin definitions must declare in their super-type chain
    pub fn plugin_definition_type(&self) -> &'static str {
        match self {
            ApiGeneration::V1 => "dev.dsf.bpe.v1.ProcessPluginDefinition",
            ApiGeneration::V2 => "dev.dsf.bpe.v2.ProcessPluginDefinition",
        }
    }

    /// Types a service or message-send implementation class must reach in
    /// its super-type chain
    pub fn delegate_types(&self) -> &'static [&'static str] {
        match self {
            ApiGeneration::V1 => &[
                "org.camunda.bpm.engine.delegate.JavaDelegate",
                "dev.dsf.bpe.v1.activity.AbstractServiceDelegate",
                "dev.dsf.bpe.v1.activity.AbstractTaskMessageSend",
            ],
            ApiGeneration::V2 => &[
                "dev.dsf.bpe.v2.activity.ServiceTask",
                "dev.dsf.bpe.v2.activity.MessageSendTask",
            ],
        }
    }

    /// Types a user-task listener must reach: the generation's default
    /// listener super-class or its listener interface
    pub fn user_task_listener_types(&self) -> &'static [&'static str] {
        match self {
            ApiGeneration::V1 => &[
                "dev.dsf.bpe.v1.activity.DefaultUserTaskListener",
                "org.camunda.bpm.engine.delegate.TaskListener",
            ],
            ApiGeneration::V2 => &[
                "dev.dsf.bpe.v2.activity.DefaultUserTaskListener",
                "dev.dsf.bpe.v2.activity.UserTaskListener",
            ],
        }
    }
}

impl std::fmt::Display for ApiGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiGeneration::V1 => write!(f, "v1"),
            ApiGeneration::V2 => write!(f, "v2"),
        }
    }
}

/// The plugin's self-description; immutable after discovery
#[derive(Debug, Clone)]
pub struct PluginManifest {
    pub name: String,
    pub api_generation: ApiGeneration,
    /// `<major>.<minor>` prefix of the declared four-part version, if any
    pub resource_version: Option<String>,
    /// Process model references in declaration order
    pub process_models: Vec<String>,
    /// FHIR references per process id, in declaration order
    pub fhir_by_process_id: IndexMap<String, Vec<String>>,
    pub source_class_name: String,
}

impl PluginManifest {
    /// All FHIR references in declaration order
    pub fn fhir_references(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fhir_by_process_id
            .iter()
            .flat_map(|(process, refs)| refs.iter().map(move |r| (process.as_str(), r.as_str())))
    }
}

/// Manifest plus the items discovery itself contributes to the report
#[derive(Debug)]
pub struct DiscoveryOutcome {
    pub manifest: PluginManifest,
    pub items: Vec<LintItem>,
}

/// Outcome of classifying one candidate class from the structural scan
#[derive(Debug, Clone, PartialEq, Eq)]
enum Candidate {
    Rejected,
    Accepted(ApiGeneration),
    InvalidApi,
}

/// Locate the plugin manifest in the resource tree
pub fn discover(provider: &dyn ResourceProvider, plugin_name: &str) -> Result<DiscoveryOutcome> {
    let index = ClassIndex::new(provider);

    if let Some((service_path, generation)) = find_service_registration(provider) {
        let class_name = read_service_class_name(provider, &service_path)?;
        info!(%generation, %class_name, "plugin definition registered via services file");
        let class = index.load(&class_name).ok_or_else(|| {
            DsflintError::class_file_error(
                class_name.clone(),
                "registered plugin definition class not found in the plugin",
            )
        })?;

        let mut items = vec![LintItem::new(
            RuleKind::ServiceLoaderRegistrationFound,
            service_path,
            &class_name,
        )];
        let manifest = build_manifest(plugin_name, generation, &class, &mut items);
        return Ok(DiscoveryOutcome { manifest, items });
    }

    structural_scan(provider, &index, plugin_name)
}

/// Check the conventional meta paths for a service-registration file.
/// Within each directory the v2 file beats the v1 file; the first
/// directory with either wins.
fn find_service_registration(provider: &dyn ResourceProvider) -> Option<(String, ApiGeneration)> {
    for dir in SERVICE_DIRS {
        for generation in ApiGeneration::PRIORITIZED {
            let path = format!("{dir}/{}", generation.plugin_definition_type());
            if provider.exists(&path) {
                return Some((path, generation));
            }
        }
    }
    None
}

/// First non-blank, non-comment line of a service-registration file
fn read_service_class_name(provider: &dyn ResourceProvider, path: &str) -> Result<String> {
    let bytes = provider.open(path)?;
    let content = String::from_utf8_lossy(&bytes);
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .ok_or_else(|| {
            DsflintError::class_file_error(path, "service-registration file names no class")
        })
}

/// Walk the tree for classes named like plugin definitions and classify them
fn structural_scan(
    provider: &dyn ResourceProvider,
    index: &ClassIndex<'_>,
    plugin_name: &str,
) -> Result<DiscoveryOutcome> {
    let mut accepted: Vec<(ApiGeneration, String, ClassFile)> = Vec::new();
    let mut invalid: Vec<String> = Vec::new();

    for entry in provider.list("") {
        if !is_candidate_entry(&entry) {
            continue;
        }
        let Ok(bytes) = provider.open(&entry) else {
            continue;
        };
        let Ok(class) = ClassFile::parse(&entry, &bytes) else {
            debug!(%entry, "candidate class unparsable, skipping");
            continue;
        };
        match classify_candidate(&class, index) {
            Candidate::Rejected => {}
            Candidate::InvalidApi => invalid.push(class.class_name.clone()),
            Candidate::Accepted(generation) => {
                debug!(class = %class.class_name, %generation, "plugin definition candidate accepted");
                accepted.push((generation, entry.clone(), class));
            }
        }
    }

    for generation in ApiGeneration::PRIORITIZED {
        let of_generation: Vec<_> = accepted
            .iter()
            .filter(|(g, _, _)| *g == generation)
            .collect();
        match of_generation.as_slice() {
            [] => {}
            [(generation, entry, class)] => {
                let mut items = vec![
                    LintItem::new(
                        RuleKind::ServiceLoaderRegistrationFound,
                        entry.clone(),
                        &class.class_name,
                    )
                    .with_message("Process plugin definition found by structural class scan"),
                    LintItem::new(
                        RuleKind::ProcessPluginDefinitionClassFound,
                        entry.clone(),
                        &class.class_name,
                    ),
                ];
                let manifest = build_manifest(plugin_name, *generation, class, &mut items);
                return Ok(DiscoveryOutcome { manifest, items });
            }
            multiple => {
                return Err(DsflintError::multiple_manifests(
                    generation.to_string(),
                    multiple
                        .iter()
                        .map(|(_, _, c)| c.class_name.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                ));
            }
        }
    }

    if let Some(class_name) = invalid.first() {
        return Err(DsflintError::invalid_api_version(class_name));
    }
    Err(DsflintError::missing_service_registration(format!(
        "service files in {SERVICE_DIRS:?} and classes named *{PLUGIN_DEFINITION_SUFFIX}"
    )))
}

fn is_candidate_entry(entry: &str) -> bool {
    let Some(stem) = entry.strip_suffix(".class") else {
        return false;
    };
    let leaf = stem.rsplit('/').next().unwrap_or(stem);
    leaf.ends_with(PLUGIN_DEFINITION_SUFFIX) && !leaf.contains('$')
}

fn classify_candidate(class: &ClassFile, index: &ClassIndex<'_>) -> Candidate {
    if !class.has_methods(&["getName", "getProcessModels", "getFhirResourcesByProcessId"]) {
        return Candidate::Rejected;
    }
    for generation in ApiGeneration::PRIORITIZED {
        if index.reaches(class, &[generation.plugin_definition_type()]) {
            return Candidate::Accepted(generation);
        }
    }
    Candidate::InvalidApi
}

/// Construct the manifest from a class's constant pool
fn build_manifest(
    plugin_name: &str,
    generation: ApiGeneration,
    class: &ClassFile,
    items: &mut Vec<LintItem>,
) -> PluginManifest {
    let process_models: Vec<String> = class
        .string_constants
        .iter()
        .filter(|s| s.to_ascii_lowercase().ends_with(".bpmn"))
        .map(|s| normalize_reference(s))
        .collect();

    let fhir_refs: Vec<String> = class
        .string_constants
        .iter()
        .filter(|s| is_fhir_reference(s))
        .map(|s| normalize_reference(s))
        .collect();

    let fhir_by_process_id = group_fhir_references(plugin_name, &process_models, fhir_refs);

    let resource_version = class.string_constants.iter().find_map(|s| {
        RESOURCE_VERSION
            .captures(s.trim())
            .map(|c| c["rv"].to_string())
    });
    match &resource_version {
        Some(version) => items.push(
            LintItem::new(
                RuleKind::PluginDefinitionResourceVersionValid,
                &class.class_name,
                &class.class_name,
            )
            .with_message(format!("Plugin resource version {version} declared")),
        ),
        None => items.push(LintItem::new(
            RuleKind::PluginDefinitionResourceVersionNull,
            &class.class_name,
            &class.class_name,
        )),
    }

    PluginManifest {
        name: plugin_name.to_string(),
        api_generation: generation,
        resource_version,
        process_models,
        fhir_by_process_id,
        source_class_name: class.class_name.clone(),
    }
}

fn is_fhir_reference(constant: &str) -> bool {
    if constant.contains("://") {
        return false;
    }
    let lower = constant.to_ascii_lowercase();
    if lower.ends_with(".bpmn") {
        return false;
    }
    lower.contains("fhir/") && (lower.ends_with(".xml") || lower.ends_with(".json"))
}

/// Group FHIR references under process-model stems: a reference naming a
/// stem as a path segment belongs to that process; everything else belongs
/// to the first process
fn group_fhir_references(
    plugin_name: &str,
    process_models: &[String],
    fhir_refs: Vec<String>,
) -> IndexMap<String, Vec<String>> {
    let stems: Vec<String> = process_models
        .iter()
        .map(|path| {
            let leaf = path.rsplit('/').next().unwrap_or(path);
            leaf.strip_suffix(".bpmn")
                .or_else(|| leaf.strip_suffix(".BPMN"))
                .unwrap_or(leaf)
                .to_string()
        })
        .collect();

    let mut grouped: IndexMap<String, Vec<String>> = IndexMap::new();
    for stem in &stems {
        grouped.entry(stem.clone()).or_default();
    }
    if grouped.is_empty() {
        grouped.entry(plugin_name.to_string()).or_default();
    }

    let first_key = grouped
        .keys()
        .next()
        .cloned()
        .unwrap_or_else(|| plugin_name.to_string());
    for reference in fhir_refs {
        let key = stems
            .iter()
            .find(|stem| {
                reference
                    .split('/')
                    .any(|segment| segment == stem.as_str())
            })
            .cloned()
            .unwrap_or_else(|| first_key.clone());
        grouped.entry(key).or_default().push(reference);
    }
    grouped
}
