//! StructureDefinition rules
//!
//! DSF profiles ship differential-only with deployment-time placeholders in
//! version and date. Beyond the metadata checks this module enforces the
//! slice cardinality arithmetic: no slice may allow more repetitions than
//! its base element, and the slice minimums may neither exceed the base
//! maximum (error) nor the base minimum (warning).

use std::collections::{HashMap, HashSet};

use dsflint_core::{Element, LintItem, RuleKind};

use super::{
    check_placeholder, check_read_access_tag, FhirDocument, DATE_PLACEHOLDER,
    STRUCTURE_DEFINITION_PREFIX, VERSION_PLACEHOLDER,
};

pub fn lint(doc: &FhirDocument) -> Vec<LintItem> {
    let mut items = Vec::new();
    let reference = doc.reference().to_string();

    match doc.canonical_url().filter(|u| !u.trim().is_empty()) {
        None => items.push(LintItem::new(
            RuleKind::StructureDefinitionUrlMissing,
            &doc.file_name,
            &reference,
        )),
        Some(url) if !url.starts_with(STRUCTURE_DEFINITION_PREFIX) => items.push(
            LintItem::new(
                RuleKind::StructureDefinitionUrlInvalid,
                &doc.file_name,
                &reference,
            )
            .with_message(format!(
                "StructureDefinition url must start with {STRUCTURE_DEFINITION_PREFIX}, found '{url}'"
            )),
        ),
        Some(_) => {}
    }

    let status = doc.root.child_value("status");
    if status != Some("unknown") {
        items.push(
            LintItem::new(
                RuleKind::StructureDefinitionStatusNotUnknown,
                &doc.file_name,
                &reference,
            )
            .with_message(format!(
                "StructureDefinition status must be 'unknown', found '{}'",
                status.unwrap_or("<none>")
            )),
        );
    }

    check_placeholder(
        doc,
        "version",
        VERSION_PLACEHOLDER,
        RuleKind::StructureDefinitionVersionPlaceholderMissing,
        &mut items,
    );
    check_placeholder(
        doc,
        "date",
        DATE_PLACEHOLDER,
        RuleKind::StructureDefinitionDatePlaceholderMissing,
        &mut items,
    );
    check_read_access_tag(doc, &mut items);

    if doc.root.child("snapshot").is_some() {
        items.push(LintItem::new(
            RuleKind::StructureDefinitionSnapshotPresent,
            &doc.file_name,
            &reference,
        ));
    }

    match doc.root.child("differential") {
        None => items.push(LintItem::new(
            RuleKind::StructureDefinitionDifferentialMissing,
            &doc.file_name,
            &reference,
        )),
        Some(differential) => {
            check_element_ids(doc, differential, &reference, &mut items);
            check_slice_cardinalities(differential, &reference, &mut items);
        }
    }

    items
}

fn check_element_ids(
    doc: &FhirDocument,
    differential: &Element,
    reference: &str,
    items: &mut Vec<LintItem>,
) {
    let mut seen: HashSet<&str> = HashSet::new();
    for element in differential.children_named("element") {
        match element.attr("id").map(str::trim).filter(|id| !id.is_empty()) {
            None => items.push(LintItem::new(
                RuleKind::ElementIdMissing,
                &doc.file_name,
                reference,
            )),
            Some(id) => {
                if !seen.insert(id) {
                    items.push(
                        LintItem::new(RuleKind::ElementIdDuplicate, id, reference).with_message(
                            format!("Differential element id '{id}' occurs more than once"),
                        ),
                    );
                }
            }
        }
    }
}

/// Upper cardinality bound; `*` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Max {
    Bounded(u32),
    Unbounded,
}

impl Max {
    fn parse(value: &str) -> Option<Max> {
        if value.trim() == "*" {
            Some(Max::Unbounded)
        } else {
            value.trim().parse().ok().map(Max::Bounded)
        }
    }

    fn exceeds(self, other: Max) -> bool {
        match (self, other) {
            (_, Max::Unbounded) => false,
            (Max::Unbounded, Max::Bounded(_)) => true,
            (Max::Bounded(a), Max::Bounded(b)) => a > b,
        }
    }
}

impl std::fmt::Display for Max {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Max::Bounded(n) => write!(f, "{n}"),
            Max::Unbounded => write!(f, "*"),
        }
    }
}

#[derive(Debug)]
struct Cardinality {
    id: String,
    min: Option<u32>,
    max: Option<Max>,
}

/// An element id names a slice iff the segment after its last colon
/// contains no dot; the part before the colon names the sliced base
fn slice_base(id: &str) -> Option<&str> {
    let (base, slice_name) = id.rsplit_once(':')?;
    if slice_name.contains('.') {
        return None;
    }
    Some(base)
}

fn check_slice_cardinalities(differential: &Element, reference: &str, items: &mut Vec<LintItem>) {
    let elements: Vec<Cardinality> = differential
        .children_named("element")
        .filter_map(|element| {
            let id = element.attr("id")?.trim();
            if id.is_empty() {
                return None;
            }
            Some(Cardinality {
                id: id.to_string(),
                min: element
                    .child_value("min")
                    .and_then(|v| v.trim().parse().ok()),
                max: element.child_value("max").and_then(Max::parse),
            })
        })
        .collect();

    let by_id: HashMap<&str, &Cardinality> =
        elements.iter().map(|e| (e.id.as_str(), e)).collect();

    // Group slices under their base, keeping document order of the bases
    let mut base_order: Vec<&str> = Vec::new();
    let mut slices_by_base: HashMap<&str, Vec<&Cardinality>> = HashMap::new();
    for element in &elements {
        if let Some(base) = slice_base(&element.id) {
            let entry = slices_by_base.entry(base).or_default();
            if entry.is_empty() {
                base_order.push(base);
            }
            entry.push(element);
        }
    }

    for base_id in base_order {
        let Some(base) = by_id.get(base_id) else {
            continue;
        };
        let slices = &slices_by_base[base_id];

        let min_sum: u64 = slices
            .iter()
            .map(|slice| u64::from(slice.min.unwrap_or(0)))
            .sum();

        // Only the max-bound rules need the base max; the min-sum warning
        // is a function of the base min alone
        if let Some(base_max) = base.max {
            for slice in slices {
                let slice_max = slice.max.unwrap_or(base_max);
                if slice_max.exceeds(base_max) {
                    items.push(
                        LintItem::new(RuleKind::SliceMaxExceedsBaseMax, &slice.id, reference)
                            .with_message(format!(
                                "Slice '{}' max cardinality ({slice_max}) exceeds base '{base_id}' max ({base_max})",
                                slice.id
                            )),
                    );
                }
            }

            if let Max::Bounded(n) = base_max
                && min_sum > u64::from(n)
            {
                items.push(
                    LintItem::new(RuleKind::SliceMinSumExceedsMax, base_id, reference)
                        .with_message(format!(
                            "Sum of slice min cardinalities ({min_sum}) under '{base_id}' exceeds the base max ({n})"
                        )),
                );
            }
        }

        if let Some(m) = base.min
            && min_sum > u64::from(m)
        {
            items.push(
                LintItem::new(RuleKind::SliceMinSumAboveBaseMin, base_id, reference)
                    .with_message(format!(
                        "Sum of slice min cardinalities ({min_sum}) under '{base_id}' exceeds the base min ({m})"
                    )),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsflint_core::Severity;

    fn parse(xml: &str) -> FhirDocument {
        FhirDocument::parse("fhir/StructureDefinition/sd.xml", "proc", xml.as_bytes()).unwrap()
    }

    fn profile(differential: &str) -> String {
        format!(
            r##"<StructureDefinition xmlns="http://hl7.org/fhir">
                <meta>
                    <tag>
                        <system value="http://dsf.dev/fhir/CodeSystem/read-access-tag"/>
                        <code value="ALL"/>
                    </tag>
                </meta>
                <url value="http://dsf.dev/fhir/StructureDefinition/task-ping"/>
                <version value="#{{version}}"/>
                <date value="#{{date}}"/>
                <status value="unknown"/>
                <differential>{differential}</differential>
            </StructureDefinition>"##
        )
    }

    fn element(id: &str, min: Option<u32>, max: Option<&str>) -> String {
        let min = min.map(|m| format!("<min value=\"{m}\"/>")).unwrap_or_default();
        let max = max.map(|m| format!("<max value=\"{m}\"/>")).unwrap_or_default();
        format!("<element id=\"{id}\">{min}{max}</element>")
    }

    fn slice_kinds(items: &[LintItem]) -> Vec<RuleKind> {
        items
            .iter()
            .filter(|i| {
                matches!(
                    i.kind,
                    RuleKind::SliceMaxExceedsBaseMax
                        | RuleKind::SliceMinSumExceedsMax
                        | RuleKind::SliceMinSumAboveBaseMin
                )
            })
            .map(|i| i.kind)
            .collect()
    }

    #[test]
    fn well_formed_profile_has_no_errors() {
        let xml = profile(&element("Task.input", Some(0), Some("*")));
        let items = lint(&parse(&xml));
        assert!(
            items.iter().all(|i| i.severity != Severity::Error),
            "unexpected errors: {items:?}"
        );
    }

    #[test]
    fn min_sum_above_base_min_is_the_only_slice_finding() {
        // base 1..2, two slices 1..2 each: sum of mins 2 > base min 1 (warn),
        // 2 <= base max 2 (no error), each slice max 2 <= 2 (no error)
        let differential = [
            element("Task.input", Some(1), Some("2")),
            element("Task.input:a", Some(1), Some("2")),
            element("Task.input:b", Some(1), Some("2")),
        ]
        .join("");
        let items = lint(&parse(&profile(&differential)));
        assert_eq!(slice_kinds(&items), vec![RuleKind::SliceMinSumAboveBaseMin]);
        let warn = items
            .iter()
            .find(|i| i.kind == RuleKind::SliceMinSumAboveBaseMin)
            .unwrap();
        assert_eq!(warn.severity, Severity::Warning);
        assert!(warn.message.contains('2') && warn.message.contains('1'));
    }

    #[test]
    fn slice_max_exceeding_base_max_is_an_error() {
        let differential = [
            element("Task.input", Some(0), Some("2")),
            element("Task.input:a", Some(0), Some("3")),
        ]
        .join("");
        let items = lint(&parse(&profile(&differential)));
        assert_eq!(slice_kinds(&items), vec![RuleKind::SliceMaxExceedsBaseMax]);
    }

    #[test]
    fn min_sum_exceeding_base_max_is_an_error() {
        let differential = [
            element("Task.input", Some(2), Some("2")),
            element("Task.input:a", Some(2), Some("2")),
            element("Task.input:b", Some(1), Some("2")),
        ]
        .join("");
        let items = lint(&parse(&profile(&differential)));
        let kinds = slice_kinds(&items);
        assert!(kinds.contains(&RuleKind::SliceMinSumExceedsMax));
        assert!(kinds.contains(&RuleKind::SliceMinSumAboveBaseMin));
    }

    #[test]
    fn min_sum_is_checked_when_the_base_declares_no_max() {
        // slicing that only narrows min need not re-declare the base max
        let differential = [
            element("Task.input", Some(1), None),
            element("Task.input:a", Some(1), None),
            element("Task.input:b", Some(1), None),
        ]
        .join("");
        let items = lint(&parse(&profile(&differential)));
        assert_eq!(slice_kinds(&items), vec![RuleKind::SliceMinSumAboveBaseMin]);
    }

    #[test]
    fn unbounded_slice_max_exceeds_bounded_base() {
        let differential = [
            element("Task.input", Some(0), Some("2")),
            element("Task.input:a", Some(0), Some("*")),
        ]
        .join("");
        let items = lint(&parse(&profile(&differential)));
        assert_eq!(slice_kinds(&items), vec![RuleKind::SliceMaxExceedsBaseMax]);
    }

    #[test]
    fn omitted_slice_max_inherits_the_base_max() {
        let differential = [
            element("Task.input", Some(0), Some("2")),
            element("Task.input:a", Some(0), None),
        ]
        .join("");
        let items = lint(&parse(&profile(&differential)));
        assert!(slice_kinds(&items).is_empty());
    }

    #[test]
    fn slice_sub_elements_are_not_slices() {
        // Task.input:a.value[x] is an element inside the slice, not a slice
        assert_eq!(slice_base("Task.input:a"), Some("Task.input"));
        assert_eq!(slice_base("Task.input:a.value[x]"), None);
        assert_eq!(slice_base("Task.input"), None);
    }

    #[test]
    fn duplicate_and_missing_element_ids() {
        let differential = [
            element("Task.input", Some(0), Some("1")),
            element("Task.input", Some(0), Some("1")),
            "<element><min value=\"0\"/></element>".to_string(),
        ]
        .join("");
        let items = lint(&parse(&profile(&differential)));
        assert!(items.iter().any(|i| i.kind == RuleKind::ElementIdDuplicate));
        assert!(items.iter().any(|i| i.kind == RuleKind::ElementIdMissing));
    }

    #[test]
    fn snapshot_is_a_warning_and_missing_differential_an_error() {
        let xml = r##"<StructureDefinition xmlns="http://hl7.org/fhir">
            <url value="http://dsf.dev/fhir/StructureDefinition/x"/>
            <version value="#{version}"/>
            <date value="#{date}"/>
            <status value="unknown"/>
            <snapshot/>
        </StructureDefinition>"##;
        let items = lint(&parse(xml));
        let snapshot = items
            .iter()
            .find(|i| i.kind == RuleKind::StructureDefinitionSnapshotPresent)
            .unwrap();
        assert_eq!(snapshot.severity, Severity::Warning);
        assert!(items
            .iter()
            .any(|i| i.kind == RuleKind::StructureDefinitionDifferentialMissing));
    }
}
