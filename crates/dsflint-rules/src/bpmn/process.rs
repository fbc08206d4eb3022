//! Process-level BPMN rules

use once_cell::sync::Lazy;
use regex::Regex;

use dsflint_core::{Element, LintItem, RuleKind};

use super::{BpmnDocument, CAMUNDA_NS};

/// DSF process ids are `<domain>_<name>`
static PROCESS_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+_[A-Za-z0-9-]+$").expect("valid regex"));

/// Check the file-level invariants and, for a file with exactly one
/// process, the process attributes. Returns the single process so element
/// rules can run; files with zero or multiple processes contribute only
/// their file-level item.
pub fn check_process_level<'a>(
    doc: &'a BpmnDocument,
) -> (Vec<LintItem>, Option<(&'a Element, String)>) {
    let mut items = Vec::new();
    let processes = doc.processes();

    let process = match processes.as_slice() {
        [] => {
            items.push(LintItem::new(
                RuleKind::BpmnFileNoProcess,
                &doc.file_name,
                &doc.file_name,
            ));
            return (items, None);
        }
        [process] => *process,
        multiple => {
            items.push(
                LintItem::new(
                    RuleKind::BpmnFileMultipleProcesses,
                    &doc.file_name,
                    &doc.file_name,
                )
                .with_message(format!(
                    "BPMN file must contain exactly one process, found {}",
                    multiple.len()
                )),
            );
            return (items, None);
        }
    };

    let id = process.attr("id").map(str::trim).unwrap_or_default();
    let reference = if id.is_empty() {
        doc.file_name.clone()
    } else {
        id.to_string()
    };

    if id.is_empty() {
        items.push(LintItem::new(
            RuleKind::BpmnProcessIdEmpty,
            &doc.file_name,
            &reference,
        ));
    } else if !PROCESS_ID.is_match(id) {
        items.push(
            LintItem::new(RuleKind::BpmnProcessIdPatternMismatch, &doc.file_name, id)
                .with_message(format!(
                    "Process id '{id}' does not match ^[A-Za-z0-9-]+_[A-Za-z0-9-]+$"
                )),
        );
    } else {
        items.push(LintItem::new(
            RuleKind::BpmnProcessIdValid,
            &doc.file_name,
            id,
        ));
    }

    if process.attr("isExecutable") == Some("true") {
        items.push(LintItem::new(
            RuleKind::BpmnProcessExecutable,
            &doc.file_name,
            &reference,
        ));
    } else {
        items.push(LintItem::new(
            RuleKind::BpmnProcessNotExecutable,
            &doc.file_name,
            &reference,
        ));
    }

    let history_ttl = process
        .attr_ns(CAMUNDA_NS, "historyTimeToLive")
        .map(str::trim)
        .filter(|v| !v.is_empty());
    match history_ttl {
        Some(_) => items.push(LintItem::new(
            RuleKind::BpmnProcessHistoryTimeToLiveSet,
            &doc.file_name,
            &reference,
        )),
        None => items.push(LintItem::new(
            RuleKind::BpmnProcessHistoryTimeToLiveMissing,
            &doc.file_name,
            &reference,
        )),
    }

    (items, Some((process, reference)))
}
