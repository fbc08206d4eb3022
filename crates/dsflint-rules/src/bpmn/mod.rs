//! BPMN rule engine
//!
//! Parses BPMN 2.0 process models and applies the process- and element-level
//! rule families. Listener and reference discovery walks the DOM through the
//! schema attachment points (extensionElements, event definitions, message
//! and error references), never through string search.

pub mod activities;
pub mod events;
pub mod listeners;
pub mod process;

use std::collections::HashMap;

use dsflint_core::{parse_document, ClassIndex, Element, LintContext, LintItem, Result};

use crate::fhir::FhirIndex;

/// BPMN 2.0 model namespace
pub const BPMN_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
/// Camunda extension namespace
pub const CAMUNDA_NS: &str = "http://camunda.org/schema/1.0/bpmn";
/// XML Schema instance namespace (xsi:type on condition expressions)
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// One parsed BPMN file
#[derive(Debug, Clone)]
pub struct BpmnDocument {
    /// Short file name
    pub file_name: String,
    /// The `definitions` root
    pub root: Element,
}

impl BpmnDocument {
    pub fn parse(file_name: &str, bytes: &[u8]) -> Result<Self> {
        let root = parse_document(file_name, bytes)?;
        Ok(Self {
            file_name: crate::fhir::short_name(file_name).to_string(),
            root,
        })
    }

    /// All `process` elements under `definitions`
    pub fn processes(&self) -> Vec<&Element> {
        self.root.children_named("process").collect()
    }

    /// Definitions-level `message` elements: id to name
    pub fn messages(&self) -> HashMap<&str, &str> {
        self.root
            .children_named("message")
            .filter_map(|m| Some((m.attr("id")?, m.attr("name")?)))
            .collect()
    }

    /// Definitions-level `error` elements by id
    pub fn errors(&self) -> HashMap<&str, &Element> {
        self.root
            .children_named("error")
            .filter_map(|e| Some((e.attr("id")?, e)))
            .collect()
    }
}

/// Everything the element-level rule families need to see
pub struct ElementScope<'a> {
    pub doc: &'a BpmnDocument,
    /// Process id; the reference of every element-level item
    pub process_id: &'a str,
    pub messages: HashMap<&'a str, &'a str>,
    pub errors: HashMap<&'a str, &'a Element>,
    pub classes: &'a ClassIndex<'a>,
    pub fhir: &'a FhirIndex,
    pub ctx: &'a LintContext,
}

impl ElementScope<'_> {
    /// Element id for item locations; falls back to the element name
    pub fn location(&self, element: &Element) -> String {
        element
            .attr("id")
            .map(str::to_string)
            .unwrap_or_else(|| element.name.clone())
    }

    /// Camunda-namespaced attribute with plain-attribute fallback for
    /// models written without the prefix
    pub fn camunda_attr<'e>(&self, element: &'e Element, name: &str) -> Option<&'e str> {
        element
            .attr_ns(CAMUNDA_NS, name)
            .or_else(|| element.attr(name))
    }
}

/// Lint one parsed BPMN document
pub fn lint_document(
    doc: &BpmnDocument,
    classes: &ClassIndex<'_>,
    fhir: &FhirIndex,
    ctx: &LintContext,
) -> Vec<LintItem> {
    let (mut items, single_process) = process::check_process_level(doc);

    let Some((process, process_id)) = single_process else {
        return items;
    };

    let scope = ElementScope {
        doc,
        process_id: &process_id,
        messages: doc.messages(),
        errors: doc.errors(),
        classes,
        fhir,
        ctx,
    };

    for element in process.descendants() {
        match element.name.as_str() {
            "serviceTask" => activities::check_service_task(&scope, element, &mut items),
            "sendTask" => activities::check_send_task(&scope, element, &mut items),
            "receiveTask" => activities::check_message_reference(&scope, element, &mut items),
            "intermediateThrowEvent" | "endEvent" => {
                activities::check_message_throw_event(&scope, element, &mut items)
            }
            "startEvent" | "intermediateCatchEvent" => {
                activities::check_message_reference(&scope, element, &mut items);
                events::check_timer_event(&scope, element, &mut items);
                events::check_conditional_event(&scope, element, &mut items);
            }
            "boundaryEvent" => events::check_error_boundary_event(&scope, element, &mut items),
            "userTask" => listeners::check_user_task_listeners(&scope, element, &mut items),
            _ => {}
        }
        listeners::check_execution_listeners(&scope, element, &mut items);
    }

    items
}
