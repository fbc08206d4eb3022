//! dsflint core
//!
//! Core engine for linting DSF process-plugin archives: resource providers,
//! plugin discovery, class-file inspection, resource resolution, the XML
//! document model, and the lint report types shared by the rule engines.

pub mod classfile;
pub mod classpath;
pub mod context;
pub mod discovery;
pub mod error;
pub mod provider;
pub mod report;
pub mod resolver;
pub mod test_helpers;
pub mod xml;

// Re-export commonly used types
pub use classfile::ClassFile;
pub use classpath::ClassIndex;
pub use context::{AuthorizationCodes, LintContext, LintTarget};
pub use discovery::{discover, ApiGeneration, DiscoveryOutcome, PluginManifest};
pub use error::{DsflintError, ErrorKind};
pub use provider::{
    bpmn_entry_filter, fhir_entry_filter, ArchiveProvider, CompositeProvider, DirProvider,
    EntryFilter, ResourceProvider,
};
pub use report::{
    ExitDisposition, LintItem, Producer, Report, ReportCounts, ReportSection, RuleKind, Severity,
};
pub use resolver::{
    normalize_reference, select_resource_root, MaterializationCache, ResolutionSource,
    ResolutionStrategy, ResolvedResource, ResolverTarget, ResourceLocation, ResourceResolver,
};
pub use xml::{parse_document, project_json, Element};

pub type Result<T> = std::result::Result<T, DsflintError>;

/// Initialize the tracing subscriber; RUST_LOG overrides the verbosity flag
pub fn init_tracing(verbosity: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default = match verbosity {
        0 => "dsflint=info",
        1 => "dsflint=debug",
        _ => "dsflint=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
