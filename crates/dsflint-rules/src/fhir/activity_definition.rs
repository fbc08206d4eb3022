//! ActivityDefinition rules
//!
//! DSF processes are announced through ActivityDefinitions: status and kind
//! are fixed values, the meta block carries the activity-definition profile
//! and the read-access tag, and every process-authorization extension names
//! at least one requester and one recipient with known authorization codes.

use dsflint_core::{Element, LintContext, LintItem, RuleKind};

use super::{
    check_read_access_tag, FhirDocument, ACTIVITY_DEFINITION_PROFILE,
    PROCESS_AUTHORIZATION_EXTENSION, PROCESS_AUTHORIZATION_SYSTEM,
};

pub fn lint(doc: &FhirDocument, ctx: &LintContext) -> Vec<LintItem> {
    let mut items = Vec::new();
    let reference = doc.reference();

    match doc.canonical_url().filter(|u| !u.trim().is_empty()) {
        Some(_) => items.push(LintItem::new(
            RuleKind::ActivityDefinitionUrlFound,
            &doc.file_name,
            reference,
        )),
        None => items.push(LintItem::new(
            RuleKind::ActivityDefinitionUrlMissing,
            &doc.file_name,
            reference,
        )),
    }

    let status = doc.root.child_value("status");
    if status != Some("unknown") {
        items.push(
            LintItem::new(
                RuleKind::ActivityDefinitionStatusNotUnknown,
                &doc.file_name,
                reference,
            )
            .with_message(format!(
                "ActivityDefinition status must be 'unknown', found '{}'",
                status.unwrap_or("<none>")
            )),
        );
    }

    let kind = doc.root.child_value("kind");
    if kind != Some("Task") {
        items.push(
            LintItem::new(
                RuleKind::ActivityDefinitionKindNotTask,
                &doc.file_name,
                reference,
            )
            .with_message(format!(
                "ActivityDefinition kind must be 'Task', found '{}'",
                kind.unwrap_or("<none>")
            )),
        );
    }

    let profile = doc
        .root
        .child("meta")
        .and_then(|m| m.child_value("profile"));
    if profile != Some(ACTIVITY_DEFINITION_PROFILE) {
        items.push(
            LintItem::new(
                RuleKind::ActivityDefinitionProfileInvalid,
                &doc.file_name,
                reference,
            )
            .with_message(format!(
                "meta.profile must be {ACTIVITY_DEFINITION_PROFILE} without a version suffix, found '{}'",
                profile.unwrap_or("<none>")
            )),
        );
    }

    check_read_access_tag(doc, &mut items);
    check_process_authorization(doc, ctx, &mut items);

    items
}

fn check_process_authorization(doc: &FhirDocument, ctx: &LintContext, items: &mut Vec<LintItem>) {
    let authorizations: Vec<&Element> = doc
        .root
        .extensions(PROCESS_AUTHORIZATION_EXTENSION)
        .collect();
    if authorizations.is_empty() {
        items.push(LintItem::new(
            RuleKind::ProcessAuthorizationExtensionMissing,
            &doc.file_name,
            doc.reference(),
        ));
        return;
    }

    let mut valid = true;
    for authorization in authorizations {
        for (role, missing_kind) in [
            ("requester", RuleKind::ProcessAuthorizationRequesterMissing),
            ("recipient", RuleKind::ProcessAuthorizationRecipientMissing),
        ] {
            let parties: Vec<&Element> = authorization.extensions(role).collect();
            if parties.is_empty() {
                items.push(LintItem::new(missing_kind, &doc.file_name, doc.reference()));
                valid = false;
                continue;
            }
            for party in parties {
                if !check_coding(doc, role, party, ctx, items) {
                    valid = false;
                }
            }
        }
    }
    if valid {
        items.push(LintItem::new(
            RuleKind::ProcessAuthorizationValid,
            &doc.file_name,
            doc.reference(),
        ));
    }
}

/// Validate one requester/recipient value coding: system and known code
fn check_coding(
    doc: &FhirDocument,
    role: &str,
    party: &Element,
    ctx: &LintContext,
    items: &mut Vec<LintItem>,
) -> bool {
    let Some(coding) = party.child("valueCoding") else {
        // no coding at all counts as an unknown code
        items.push(
            LintItem::new(
                RuleKind::ProcessAuthorizationCodeUnknown,
                &doc.file_name,
                doc.reference(),
            )
            .with_message(format!("{role} extension carries no valueCoding")),
        );
        return false;
    };

    let mut ok = true;
    let system = coding.child_value("system");
    if system != Some(PROCESS_AUTHORIZATION_SYSTEM) {
        items.push(
            LintItem::new(
                RuleKind::ProcessAuthorizationCodingSystemInvalid,
                &doc.file_name,
                doc.reference(),
            )
            .with_message(format!(
                "{role} coding system must be {PROCESS_AUTHORIZATION_SYSTEM}, found '{}'",
                system.unwrap_or("<none>")
            )),
        );
        ok = false;
    }
    let code = coding.child_value("code");
    match code {
        Some(code) if ctx.authorization_codes.contains(code) => {}
        _ => {
            items.push(
                LintItem::new(
                    RuleKind::ProcessAuthorizationCodeUnknown,
                    &doc.file_name,
                    doc.reference(),
                )
                .with_message(format!(
                    "{role} authorization code '{}' is not a known process-authorization code",
                    code.unwrap_or("<none>")
                )),
            );
            ok = false;
        }
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsflint_core::Severity;

    fn parse(xml: &str) -> FhirDocument {
        FhirDocument::parse("fhir/ActivityDefinition/ad.xml", "proc", xml.as_bytes()).unwrap()
    }

    fn well_formed() -> String {
        r#"<ActivityDefinition xmlns="http://hl7.org/fhir">
            <meta>
                <tag>
                    <system value="http://dsf.dev/fhir/CodeSystem/read-access-tag"/>
                    <code value="ALL"/>
                </tag>
                <profile value="http://dsf.dev/fhir/StructureDefinition/activity-definition"/>
            </meta>
            <url value="http://dsf.dev/bpe/Process/ping"/>
            <status value="unknown"/>
            <kind value="Task"/>
            <extension url="http://dsf.dev/fhir/StructureDefinition/extension-process-authorization">
                <extension url="requester">
                    <valueCoding>
                        <system value="http://dsf.dev/fhir/CodeSystem/process-authorization"/>
                        <code value="LOCAL_ALL"/>
                    </valueCoding>
                </extension>
                <extension url="recipient">
                    <valueCoding>
                        <system value="http://dsf.dev/fhir/CodeSystem/process-authorization"/>
                        <code value="LOCAL_ALL"/>
                    </valueCoding>
                </extension>
            </extension>
        </ActivityDefinition>"#
            .to_string()
    }

    #[test]
    fn well_formed_activity_definition_has_no_errors() {
        let ctx = LintContext::new().unwrap();
        let items = lint(&parse(&well_formed()), &ctx);
        assert!(
            items.iter().all(|i| i.severity != Severity::Error),
            "unexpected errors: {items:?}"
        );
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::ProcessAuthorizationValid));
    }

    #[test]
    fn active_status_is_an_error_naming_both_values() {
        let ctx = LintContext::new().unwrap();
        let xml = well_formed().replace("value=\"unknown\"", "value=\"active\"");
        let items = lint(&parse(&xml), &ctx);
        let status_items: Vec<_> = items
            .iter()
            .filter(|i| i.kind == RuleKind::ActivityDefinitionStatusNotUnknown)
            .collect();
        assert_eq!(status_items.len(), 1);
        assert_eq!(status_items[0].severity, Severity::Error);
        assert!(status_items[0].message.contains("unknown"));
        assert!(status_items[0].message.contains("active"));
    }

    #[test]
    fn versioned_profile_is_invalid() {
        let ctx = LintContext::new().unwrap();
        let xml = well_formed().replace(
            "StructureDefinition/activity-definition\"",
            "StructureDefinition/activity-definition|1.0\"",
        );
        let items = lint(&parse(&xml), &ctx);
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::ActivityDefinitionProfileInvalid));
    }

    #[test]
    fn unknown_authorization_code_is_reported() {
        let ctx = LintContext::new().unwrap();
        let xml = well_formed().replace("LOCAL_ALL", "EVERYONE");
        let items = lint(&parse(&xml), &ctx);
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::ProcessAuthorizationCodeUnknown));
        assert!(!items
            .iter()
            .any(|i| i.kind == RuleKind::ProcessAuthorizationValid));
    }

    #[test]
    fn missing_extension_and_missing_recipient() {
        let ctx = LintContext::new().unwrap();
        let bare = r#"<ActivityDefinition xmlns="http://hl7.org/fhir">
            <url value="http://x/ad"/>
            <status value="unknown"/>
            <kind value="Task"/>
        </ActivityDefinition>"#;
        let items = lint(&parse(bare), &ctx);
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::ProcessAuthorizationExtensionMissing));

        let xml = well_formed().replace("recipient", "requester");
        let items = lint(&parse(&xml), &ctx);
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::ProcessAuthorizationRecipientMissing));
    }
}
