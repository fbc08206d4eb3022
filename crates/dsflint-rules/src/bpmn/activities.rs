//! Service and message activity rules
//!
//! Implementation classes must ship with the plugin and reach the delegate
//! type of the plugin's API generation. Message names must be backed by the
//! plugin's FHIR resources, and message-send activities must inject a
//! profile and an instantiatesCanonical carrying the version placeholder.

use dsflint_core::{Element, LintItem, RuleKind};

use super::ElementScope;
use crate::fhir::{strip_version, VERSION_PLACEHOLDER};

pub fn check_service_task(scope: &ElementScope<'_>, element: &Element, items: &mut Vec<LintItem>) {
    let location = scope.location(element);
    check_implementation_class(scope, &location, scope.camunda_attr(element, "class"), items);
}

pub fn check_send_task(scope: &ElementScope<'_>, element: &Element, items: &mut Vec<LintItem>) {
    let location = scope.location(element);
    check_implementation_class(scope, &location, scope.camunda_attr(element, "class"), items);
    check_message_reference(scope, element, items);
    check_field_injections(scope, element, items);
}

/// Throw-side message events: end events and intermediate throw events with
/// a message event definition
pub fn check_message_throw_event(
    scope: &ElementScope<'_>,
    element: &Element,
    items: &mut Vec<LintItem>,
) {
    let Some(definition) = element.child("messageEventDefinition") else {
        return;
    };
    let location = scope.location(element);
    check_implementation_class(
        scope,
        &location,
        scope.camunda_attr(definition, "class"),
        items,
    );
    check_message_name(scope, &location, message_name(scope, element), items);
    check_field_injections(scope, element, items);
}

/// Catch-side message references: receive tasks and message catch/start
/// events. Elements without a message attachment are skipped.
pub fn check_message_reference(
    scope: &ElementScope<'_>,
    element: &Element,
    items: &mut Vec<LintItem>,
) {
    let is_message_element =
        element.name == "receiveTask" || element.name == "sendTask" || {
            element.child("messageEventDefinition").is_some()
        };
    if !is_message_element {
        return;
    }
    let location = scope.location(element);
    check_message_name(scope, &location, message_name(scope, element), items);
}

/// Resolve the message name through the messageRef attachment point
fn message_name<'a>(scope: &ElementScope<'a>, element: &Element) -> Option<&'a str> {
    let message_ref = element.attr("messageRef").or_else(|| {
        element
            .child("messageEventDefinition")
            .and_then(|d| d.attr("messageRef"))
    })?;
    scope.messages.get(message_ref).copied()
}

fn check_implementation_class(
    scope: &ElementScope<'_>,
    location: &str,
    class: Option<&str>,
    items: &mut Vec<LintItem>,
) {
    let Some(class_name) = class.map(str::trim).filter(|c| !c.is_empty()) else {
        items.push(LintItem::new(
            RuleKind::ImplementationClassMissing,
            location,
            scope.process_id,
        ));
        return;
    };

    let Some(class) = scope.classes.load(class_name) else {
        items.push(
            LintItem::new(
                RuleKind::ImplementationClassNotFound,
                location,
                scope.process_id,
            )
            .with_message(format!(
                "Implementation class '{class_name}' not found in the plugin"
            )),
        );
        return;
    };

    let generation = scope.ctx.api_generation();
    if scope.classes.reaches(&class, generation.delegate_types()) {
        items.push(
            LintItem::new(
                RuleKind::ImplementationClassValid,
                location,
                scope.process_id,
            )
            .with_message(format!(
                "Implementation class '{class_name}' implements the {generation} delegate"
            )),
        );
    } else {
        items.push(
            LintItem::new(
                RuleKind::ImplementationClassNotImplementingDelegate,
                location,
                scope.process_id,
            )
            .with_message(format!(
                "Implementation class '{class_name}' does not implement the {generation} service delegate"
            )),
        );
    }
}

fn check_message_name(
    scope: &ElementScope<'_>,
    location: &str,
    name: Option<&str>,
    items: &mut Vec<LintItem>,
) {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        items.push(LintItem::new(
            RuleKind::MessageNameMissing,
            location,
            scope.process_id,
        ));
        return;
    };

    if scope.fhir.activity_definition_message_names.contains(name) {
        items.push(
            LintItem::new(
                RuleKind::FhirActivityDefinitionMessageNameFound,
                location,
                scope.process_id,
            )
            .with_message(format!(
                "Message name '{name}' declared by an ActivityDefinition"
            )),
        );
    } else {
        items.push(
            LintItem::new(
                RuleKind::FhirActivityDefinitionMessageNameNotFound,
                location,
                scope.process_id,
            )
            .with_message(format!(
                "Message name '{name}' is not declared by any ActivityDefinition message-name extension"
            )),
        );
    }

    if scope.fhir.structure_definition_message_names.contains(name) {
        items.push(
            LintItem::new(
                RuleKind::FhirStructureDefinitionMessageNameFound,
                location,
                scope.process_id,
            )
            .with_message(format!(
                "Message name '{name}' fixed by a StructureDefinition Task.input slice"
            )),
        );
    } else {
        items.push(
            LintItem::new(
                RuleKind::FhirStructureDefinitionMessageNameNotFound,
                location,
                scope.process_id,
            )
            .with_message(format!(
                "Message name '{name}' is not fixed by any StructureDefinition Task.input:message-name.value[x]"
            )),
        );
    }
}

/// Value of one Camunda field injection: nested string or expression
fn field_value<'e>(field: &'e Element) -> Option<&'e str> {
    field
        .child("string")
        .and_then(|s| s.text_trim())
        .or_else(|| field.child("expression").and_then(|e| e.text_trim()))
}

fn check_field_injections(
    scope: &ElementScope<'_>,
    element: &Element,
    items: &mut Vec<LintItem>,
) {
    let location = scope.location(element);
    let mut profile: Option<&str> = None;
    let mut instantiates_canonical: Option<&str> = None;
    for field in element.descendants().filter(|e| e.name == "field") {
        match field.attr("name") {
            Some("profile") => profile = field_value(field),
            Some("instantiatesCanonical") => instantiates_canonical = field_value(field),
            _ => {}
        }
    }

    let mut valid = true;
    match profile.map(str::trim).filter(|v| !v.is_empty()) {
        None => {
            items.push(LintItem::new(
                RuleKind::FieldInjectionProfileMissing,
                &location,
                scope.process_id,
            ));
            valid = false;
        }
        Some(profile) => {
            if !profile.contains(VERSION_PLACEHOLDER) {
                items.push(
                    LintItem::new(
                        RuleKind::FieldInjectionProfilePlaceholderMissing,
                        &location,
                        scope.process_id,
                    )
                    .with_message(format!(
                        "Field injection 'profile' must contain {VERSION_PLACEHOLDER}, found '{profile}'"
                    )),
                );
                valid = false;
            }
            let url = strip_version(profile);
            if !scope.fhir.structure_definition_urls.contains(url) {
                items.push(
                    LintItem::new(
                        RuleKind::FieldInjectionProfileStructureDefinitionNotFound,
                        &location,
                        scope.process_id,
                    )
                    .with_message(format!(
                        "Field injection 'profile' references unknown StructureDefinition {url}"
                    )),
                );
                valid = false;
            }
        }
    }

    match instantiates_canonical.map(str::trim).filter(|v| !v.is_empty()) {
        None => {
            items.push(LintItem::new(
                RuleKind::FieldInjectionInstantiatesCanonicalMissing,
                &location,
                scope.process_id,
            ));
            valid = false;
        }
        Some(canonical) => {
            if !canonical.contains(VERSION_PLACEHOLDER) {
                items.push(
                    LintItem::new(
                        RuleKind::FieldInjectionInstantiatesCanonicalPlaceholderMissing,
                        &location,
                        scope.process_id,
                    )
                    .with_message(format!(
                        "Field injection 'instantiatesCanonical' must contain {VERSION_PLACEHOLDER}, found '{canonical}'"
                    )),
                );
                valid = false;
            }
        }
    }

    if valid {
        items.push(LintItem::new(
            RuleKind::FieldInjectionsValid,
            &location,
            scope.process_id,
        ));
    }
}
