//! dsflint rules
//!
//! The BPMN and FHIR rule engines plus the orchestrator that sequences
//! discovery, resolution and the two engines into a single report.

pub mod bpmn;
pub mod fhir;
pub mod linter;

pub use bpmn::BpmnDocument;
pub use fhir::{FhirDocument, FhirIndex};
pub use linter::{lint_path, Linter};
