//! CodeSystem rules

use std::collections::HashSet;

use dsflint_core::{LintItem, RuleKind};

use super::{
    check_placeholder, check_read_access_tag, FhirDocument, DATE_PLACEHOLDER, VERSION_PLACEHOLDER,
};

pub fn lint(doc: &FhirDocument) -> Vec<LintItem> {
    let mut items = Vec::new();
    let reference = doc.reference().to_string();

    if doc
        .canonical_url()
        .filter(|u| !u.trim().is_empty())
        .is_none()
    {
        items.push(LintItem::new(
            RuleKind::CodeSystemUrlMissing,
            &doc.file_name,
            &reference,
        ));
    }

    let status = doc.root.child_value("status");
    if status != Some("unknown") {
        items.push(
            LintItem::new(
                RuleKind::CodeSystemStatusNotUnknown,
                &doc.file_name,
                &reference,
            )
            .with_message(format!(
                "CodeSystem status must be 'unknown', found '{}'",
                status.unwrap_or("<none>")
            )),
        );
    }

    check_placeholder(
        doc,
        "version",
        VERSION_PLACEHOLDER,
        RuleKind::CodeSystemVersionPlaceholderMissing,
        &mut items,
    );
    check_placeholder(
        doc,
        "date",
        DATE_PLACEHOLDER,
        RuleKind::CodeSystemDatePlaceholderMissing,
        &mut items,
    );
    check_read_access_tag(doc, &mut items);

    // Concepts may nest; codes must be unique over the whole hierarchy
    let mut seen: HashSet<&str> = HashSet::new();
    for concept in doc
        .root
        .descendants()
        .filter(|e| e.name == "concept")
    {
        if let Some(code) = concept.child_value("code")
            && !seen.insert(code)
        {
            items.push(
                LintItem::new(
                    RuleKind::CodeSystemConceptCodeDuplicate,
                    &doc.file_name,
                    &reference,
                )
                .with_message(format!("CodeSystem concept code '{code}' occurs more than once")),
            );
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsflint_core::Severity;

    fn parse(xml: &str) -> FhirDocument {
        FhirDocument::parse("fhir/CodeSystem/cs.xml", "proc", xml.as_bytes()).unwrap()
    }

    #[test]
    fn well_formed_code_system_has_no_errors() {
        let xml = r##"<CodeSystem xmlns="http://hl7.org/fhir">
            <meta>
                <tag>
                    <system value="http://dsf.dev/fhir/CodeSystem/read-access-tag"/>
                    <code value="ALL"/>
                </tag>
            </meta>
            <url value="http://dsf.dev/fhir/CodeSystem/feasibility"/>
            <version value="#{version}"/>
            <date value="#{date}"/>
            <status value="unknown"/>
            <concept><code value="a"/></concept>
            <concept><code value="b"/></concept>
        </CodeSystem>"##;
        let items = lint(&parse(xml));
        assert!(items.iter().all(|i| i.severity != Severity::Error));
    }

    #[test]
    fn duplicate_concept_codes_are_reported() {
        let xml = r##"<CodeSystem xmlns="http://hl7.org/fhir">
            <url value="http://x/cs"/>
            <version value="#{version}"/>
            <date value="#{date}"/>
            <status value="unknown"/>
            <concept><code value="a"/>
                <concept><code value="a"/></concept>
            </concept>
        </CodeSystem>"##;
        let items = lint(&parse(xml));
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::CodeSystemConceptCodeDuplicate));
    }

    #[test]
    fn missing_placeholders_are_reported() {
        let xml = r#"<CodeSystem xmlns="http://hl7.org/fhir">
            <url value="http://x/cs"/>
            <version value="1.0"/>
            <date value="2024-01-01"/>
            <status value="unknown"/>
        </CodeSystem>"#;
        let items = lint(&parse(xml));
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::CodeSystemVersionPlaceholderMissing));
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::CodeSystemDatePlaceholderMissing));
    }
}
