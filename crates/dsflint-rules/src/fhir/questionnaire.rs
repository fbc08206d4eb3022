//! Questionnaire rules
//!
//! DSF user tasks render Questionnaires; the BPE correlates answers through
//! the business-key and user-task-id items, so both must exist.

use std::collections::HashSet;

use dsflint_core::{LintItem, RuleKind};

use super::{check_placeholder, check_read_access_tag, FhirDocument, VERSION_PLACEHOLDER};

const BUSINESS_KEY_LINK_ID: &str = "business-key";
const USER_TASK_ID_LINK_ID: &str = "user-task-id";

pub fn lint(doc: &FhirDocument) -> Vec<LintItem> {
    let mut items = Vec::new();
    let reference = doc.reference().to_string();

    if doc
        .canonical_url()
        .filter(|u| !u.trim().is_empty())
        .is_none()
    {
        items.push(LintItem::new(
            RuleKind::QuestionnaireUrlMissing,
            &doc.file_name,
            &reference,
        ));
    }

    let status = doc.root.child_value("status");
    if status != Some("unknown") {
        items.push(
            LintItem::new(
                RuleKind::QuestionnaireStatusNotUnknown,
                &doc.file_name,
                &reference,
            )
            .with_message(format!(
                "Questionnaire status must be 'unknown', found '{}'",
                status.unwrap_or("<none>")
            )),
        );
    }

    check_placeholder(
        doc,
        "version",
        VERSION_PLACEHOLDER,
        RuleKind::QuestionnaireVersionPlaceholderMissing,
        &mut items,
    );
    check_read_access_tag(doc, &mut items);

    // Items nest arbitrarily; linkIds are unique over the whole tree
    let mut link_ids: HashSet<&str> = HashSet::new();
    for item in doc.root.descendants().filter(|e| e.name == "item") {
        if let Some(link_id) = item.child_value("linkId")
            && !link_ids.insert(link_id)
        {
            items.push(
                LintItem::new(
                    RuleKind::QuestionnaireItemLinkIdDuplicate,
                    &doc.file_name,
                    &reference,
                )
                .with_message(format!(
                    "Questionnaire item linkId '{link_id}' occurs more than once"
                )),
            );
        }
    }

    if !link_ids.contains(BUSINESS_KEY_LINK_ID) {
        items.push(LintItem::new(
            RuleKind::QuestionnaireBusinessKeyItemMissing,
            &doc.file_name,
            &reference,
        ));
    }
    if !link_ids.contains(USER_TASK_ID_LINK_ID) {
        items.push(LintItem::new(
            RuleKind::QuestionnaireUserTaskIdItemMissing,
            &doc.file_name,
            &reference,
        ));
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsflint_core::Severity;

    fn parse(xml: &str) -> FhirDocument {
        FhirDocument::parse("fhir/Questionnaire/q.xml", "proc", xml.as_bytes()).unwrap()
    }

    fn questionnaire(extra_items: &str) -> String {
        format!(
            r##"<Questionnaire xmlns="http://hl7.org/fhir">
                <meta>
                    <tag>
                        <system value="http://dsf.dev/fhir/CodeSystem/read-access-tag"/>
                        <code value="ALL"/>
                    </tag>
                </meta>
                <url value="http://dsf.dev/fhir/Questionnaire/release"/>
                <version value="#{{version}}"/>
                <status value="unknown"/>
                <item><linkId value="business-key"/></item>
                <item><linkId value="user-task-id"/></item>
                {extra_items}
            </Questionnaire>"##
        )
    }

    #[test]
    fn well_formed_questionnaire_has_no_errors() {
        let items = lint(&parse(&questionnaire("")));
        assert!(
            items.iter().all(|i| i.severity != Severity::Error),
            "unexpected errors: {items:?}"
        );
    }

    #[test]
    fn duplicate_link_ids_are_reported() {
        let items = lint(&parse(&questionnaire(
            "<item><linkId value=\"release\"/></item><item><linkId value=\"release\"/></item>",
        )));
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::QuestionnaireItemLinkIdDuplicate));
    }

    #[test]
    fn missing_correlation_items_are_reported() {
        let xml = r##"<Questionnaire xmlns="http://hl7.org/fhir">
            <url value="http://x/q"/>
            <version value="#{version}"/>
            <status value="unknown"/>
        </Questionnaire>"##;
        let items = lint(&parse(xml));
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::QuestionnaireBusinessKeyItemMissing));
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::QuestionnaireUserTaskIdItemMissing));
    }
}
