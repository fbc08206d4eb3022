//! ValueSet rules

use dsflint_core::{LintItem, RuleKind};

use super::{
    check_placeholder, check_read_access_tag, strip_version, FhirDocument, FhirIndex,
    DATE_PLACEHOLDER, VERSION_PLACEHOLDER,
};

pub fn lint(doc: &FhirDocument, index: &FhirIndex) -> Vec<LintItem> {
    let mut items = Vec::new();
    let reference = doc.reference().to_string();

    if doc
        .canonical_url()
        .filter(|u| !u.trim().is_empty())
        .is_none()
    {
        items.push(LintItem::new(
            RuleKind::ValueSetUrlMissing,
            &doc.file_name,
            &reference,
        ));
    }

    let status = doc.root.child_value("status");
    if status != Some("unknown") {
        items.push(
            LintItem::new(
                RuleKind::ValueSetStatusNotUnknown,
                &doc.file_name,
                &reference,
            )
            .with_message(format!(
                "ValueSet status must be 'unknown', found '{}'",
                status.unwrap_or("<none>")
            )),
        );
    }

    check_placeholder(
        doc,
        "version",
        VERSION_PLACEHOLDER,
        RuleKind::ValueSetVersionPlaceholderMissing,
        &mut items,
    );
    check_placeholder(
        doc,
        "date",
        DATE_PLACEHOLDER,
        RuleKind::ValueSetDatePlaceholderMissing,
        &mut items,
    );
    check_read_access_tag(doc, &mut items);

    // Includes referencing DSF code systems must find them in the plugin;
    // foreign systems are outside this linter's knowledge
    if let Some(compose) = doc.root.child("compose") {
        for include in compose.children_named("include") {
            let Some(system) = include.child_value("system") else {
                continue;
            };
            if index.code_system_urls.contains(strip_version(system)) {
                items.push(
                    LintItem::new(
                        RuleKind::ValueSetIncludedCodeSystemFound,
                        &doc.file_name,
                        &reference,
                    )
                    .with_message(format!("Included CodeSystem {system} found")),
                );
            } else if system.starts_with("http://dsf.dev/") {
                items.push(
                    LintItem::new(
                        RuleKind::ValueSetIncludedCodeSystemNotFound,
                        &doc.file_name,
                        &reference,
                    )
                    .with_message(format!(
                        "Included CodeSystem {system} was not found in the plugin"
                    )),
                );
            }
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsflint_core::Severity;

    fn parse(xml: &str) -> FhirDocument {
        FhirDocument::parse("fhir/ValueSet/vs.xml", "proc", xml.as_bytes()).unwrap()
    }

    fn value_set(system: &str) -> String {
        format!(
            r##"<ValueSet xmlns="http://hl7.org/fhir">
                <meta>
                    <tag>
                        <system value="http://dsf.dev/fhir/CodeSystem/read-access-tag"/>
                        <code value="ALL"/>
                    </tag>
                </meta>
                <url value="http://dsf.dev/fhir/ValueSet/feasibility"/>
                <version value="#{{version}}"/>
                <date value="#{{date}}"/>
                <status value="unknown"/>
                <compose><include><system value="{system}"/></include></compose>
            </ValueSet>"##
        )
    }

    fn index_with(url: &str) -> FhirIndex {
        let mut index = FhirIndex::default();
        index.code_system_urls.insert(url.to_string());
        index
    }

    #[test]
    fn known_include_is_a_success() {
        let index = index_with("http://dsf.dev/fhir/CodeSystem/feasibility");
        let items = lint(
            &parse(&value_set("http://dsf.dev/fhir/CodeSystem/feasibility")),
            &index,
        );
        assert!(items.iter().all(|i| i.severity != Severity::Error));
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::ValueSetIncludedCodeSystemFound));
    }

    #[test]
    fn unknown_dsf_include_is_an_error() {
        let items = lint(
            &parse(&value_set("http://dsf.dev/fhir/CodeSystem/absent")),
            &FhirIndex::default(),
        );
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::ValueSetIncludedCodeSystemNotFound));
    }

    #[test]
    fn foreign_include_is_ignored() {
        let items = lint(
            &parse(&value_set("http://loinc.org")),
            &FhirIndex::default(),
        );
        assert!(!items.iter().any(|i| matches!(
            i.kind,
            RuleKind::ValueSetIncludedCodeSystemFound | RuleKind::ValueSetIncludedCodeSystemNotFound
        )));
    }
}
