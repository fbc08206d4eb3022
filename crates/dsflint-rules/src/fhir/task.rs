//! Task rules
//!
//! Task templates shipped with a plugin are draft messages: their profile
//! must be one of the plugin's StructureDefinitions, their
//! instantiatesCanonical must name a known ActivityDefinition, and the
//! message-name input is mandatory.

use dsflint_core::{LintItem, RuleKind};

use super::{strip_version, FhirDocument, FhirIndex};

pub fn lint(doc: &FhirDocument, index: &FhirIndex) -> Vec<LintItem> {
    let mut items = Vec::new();
    let reference = doc.reference().to_string();

    let profile = doc
        .root
        .child("meta")
        .and_then(|m| m.child_value("profile"))
        .filter(|p| !p.trim().is_empty());
    match profile {
        None => items.push(LintItem::new(
            RuleKind::TaskProfileMissing,
            &doc.file_name,
            &reference,
        )),
        Some(profile) => {
            if !index
                .structure_definition_urls
                .contains(strip_version(profile))
            {
                items.push(
                    LintItem::new(
                        RuleKind::TaskProfileStructureDefinitionNotFound,
                        &doc.file_name,
                        &reference,
                    )
                    .with_message(format!(
                        "Task profile {profile} references no StructureDefinition in the plugin"
                    )),
                );
            }
        }
    }

    let canonical = doc
        .root
        .child_value("instantiatesCanonical")
        .filter(|c| !c.trim().is_empty());
    match canonical {
        None => items.push(LintItem::new(
            RuleKind::TaskInstantiatesCanonicalMissing,
            &doc.file_name,
            &reference,
        )),
        Some(canonical) => {
            let target = strip_version(canonical);
            if index.activity_definition_urls.contains(target) {
                items.push(
                    LintItem::new(RuleKind::ActivityDefinitionExists, &doc.file_name, target)
                        .with_message(format!("Referenced ActivityDefinition {target} exists")),
                );
            } else {
                items.push(
                    LintItem::new(
                        RuleKind::TaskUnknownInstantiatesCanonical,
                        &doc.file_name,
                        &reference,
                    )
                    .with_message(format!(
                        "Task instantiatesCanonical {canonical} references no ActivityDefinition in the plugin"
                    )),
                );
            }
        }
    }

    let status = doc.root.child_value("status");
    if status != Some("draft") {
        items.push(
            LintItem::new(RuleKind::TaskStatusNotDraft, &doc.file_name, &reference).with_message(
                format!(
                    "Task status must be 'draft', found '{}'",
                    status.unwrap_or("<none>")
                ),
            ),
        );
    }

    if !has_message_name_input(doc) {
        items.push(LintItem::new(
            RuleKind::TaskMessageNameInputMissing,
            &doc.file_name,
            &reference,
        ));
    }

    items
}

/// An input slot whose type coding carries the code `message-name`
fn has_message_name_input(doc: &FhirDocument) -> bool {
    doc.root.children_named("input").any(|input| {
        input
            .child("type")
            .into_iter()
            .flat_map(|t| t.children_named("coding"))
            .any(|coding| coding.child_value("code") == Some("message-name"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsflint_core::Severity;

    fn parse_json(json: &str) -> FhirDocument {
        FhirDocument::parse("fhir/Task/task.json", "proc", json.as_bytes()).unwrap()
    }

    fn index() -> FhirIndex {
        let mut index = FhirIndex::default();
        index
            .activity_definition_urls
            .insert("http://dsf.dev/bpe/Process/ping".to_string());
        index
            .structure_definition_urls
            .insert("http://dsf.dev/fhir/StructureDefinition/task-ping".to_string());
        index
    }

    fn task_json(canonical: &str) -> String {
        format!(
            r#"{{
                "resourceType": "Task",
                "meta": {{"profile": ["http://dsf.dev/fhir/StructureDefinition/task-ping|#{{version}}"]}},
                "instantiatesCanonical": "{canonical}",
                "status": "draft",
                "input": [{{
                    "type": {{"coding": [{{
                        "system": "http://dsf.dev/fhir/CodeSystem/bpmn-message",
                        "code": "message-name"
                    }}]}},
                    "valueString": "startPing"
                }}]
            }}"#
        )
    }

    #[test]
    fn known_canonical_in_json_task_is_a_success() {
        let items = lint(
            &parse_json(&task_json("http://dsf.dev/bpe/Process/ping|#{version}")),
            &index(),
        );
        assert!(
            !items
                .iter()
                .any(|i| i.kind == RuleKind::TaskUnknownInstantiatesCanonical),
            "unexpected unknown-canonical item: {items:?}"
        );
        let exists = items
            .iter()
            .find(|i| i.kind == RuleKind::ActivityDefinitionExists)
            .unwrap();
        assert_eq!(exists.severity, Severity::Success);
        assert_eq!(exists.reference, "http://dsf.dev/bpe/Process/ping");
    }

    #[test]
    fn unknown_canonical_is_an_error() {
        let items = lint(
            &parse_json(&task_json("http://dsf.dev/bpe/Process/absent")),
            &index(),
        );
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::TaskUnknownInstantiatesCanonical));
        assert!(!items
            .iter()
            .any(|i| i.kind == RuleKind::ActivityDefinitionExists));
    }

    #[test]
    fn missing_message_name_input_and_wrong_status() {
        let json = r#"{
            "resourceType": "Task",
            "meta": {"profile": ["http://dsf.dev/fhir/StructureDefinition/task-ping"]},
            "instantiatesCanonical": "http://dsf.dev/bpe/Process/ping",
            "status": "requested"
        }"#;
        let items = lint(&parse_json(json), &index());
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::TaskMessageNameInputMissing));
        assert!(items.iter().any(|i| i.kind == RuleKind::TaskStatusNotDraft));
    }

    #[test]
    fn unknown_profile_is_reported() {
        let json = r#"{
            "resourceType": "Task",
            "meta": {"profile": ["http://dsf.dev/fhir/StructureDefinition/other"]},
            "instantiatesCanonical": "http://dsf.dev/bpe/Process/ping",
            "status": "draft",
            "input": [{"type": {"coding": [{"code": "message-name"}]}, "valueString": "x"}]
        }"#;
        let items = lint(&parse_json(json), &index());
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::TaskProfileStructureDefinitionNotFound));
    }
}
