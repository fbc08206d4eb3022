//! Boundary, timer and conditional event rules

use dsflint_core::{Element, LintItem, RuleKind};

use super::{ElementScope, XSI_NS};

pub fn check_error_boundary_event(
    scope: &ElementScope<'_>,
    element: &Element,
    items: &mut Vec<LintItem>,
) {
    let Some(definition) = element.child("errorEventDefinition") else {
        return;
    };
    let location = scope.location(element);
    let mut valid = true;

    if element.attr("name").map(str::trim).unwrap_or_default().is_empty() {
        items.push(LintItem::new(
            RuleKind::ErrorBoundaryEventNameMissing,
            &location,
            scope.process_id,
        ));
        valid = false;
    }

    let error = definition
        .attr("errorRef")
        .and_then(|id| scope.errors.get(id).copied());
    match error {
        None => {
            items.push(LintItem::new(
                RuleKind::ErrorRefMissing,
                &location,
                scope.process_id,
            ));
            valid = false;
        }
        Some(error) => {
            if error.attr("name").map(str::trim).unwrap_or_default().is_empty() {
                items.push(LintItem::new(
                    RuleKind::ErrorNameMissing,
                    &location,
                    scope.process_id,
                ));
                valid = false;
            }
            if error
                .attr("errorCode")
                .map(str::trim)
                .unwrap_or_default()
                .is_empty()
            {
                items.push(LintItem::new(
                    RuleKind::ErrorCodeMissing,
                    &location,
                    scope.process_id,
                ));
                valid = false;
            }
        }
    }

    if scope
        .camunda_attr(definition, "errorCodeVariable")
        .map(str::trim)
        .unwrap_or_default()
        .is_empty()
    {
        items.push(LintItem::new(
            RuleKind::ErrorCodeVariableMissing,
            &location,
            scope.process_id,
        ));
        valid = false;
    }

    if valid {
        items.push(LintItem::new(
            RuleKind::ErrorBoundaryEventValid,
            &location,
            scope.process_id,
        ));
    }
}

pub fn check_timer_event(scope: &ElementScope<'_>, element: &Element, items: &mut Vec<LintItem>) {
    let Some(definition) = element.child("timerEventDefinition") else {
        return;
    };
    let location = scope.location(element);

    let values: Vec<(&str, Option<&str>)> = ["timeDate", "timeCycle", "timeDuration"]
        .into_iter()
        .map(|name| (name, definition.child(name).and_then(|e| e.text_trim())))
        .collect();
    let present: Vec<&(&str, Option<&str>)> =
        values.iter().filter(|(_, v)| v.is_some()).collect();

    match present.as_slice() {
        [] => {
            items.push(LintItem::new(
                RuleKind::TimerDefinitionMissing,
                &location,
                scope.process_id,
            ));
            return;
        }
        [(kind, value)] => {
            let value = value.unwrap_or_default();
            if *kind == "timeDate" {
                items.push(
                    LintItem::new(RuleKind::TimerFixedTimeDate, &location, scope.process_id)
                        .with_message(format!("Timer event uses the fixed timeDate '{value}'")),
                );
            } else if !has_placeholder(value) {
                items.push(
                    LintItem::new(
                        RuleKind::TimerValueWithoutPlaceholder,
                        &location,
                        scope.process_id,
                    )
                    .with_message(format!(
                        "Timer {kind} '{value}' contains no expression placeholder"
                    )),
                );
            } else {
                items.push(LintItem::new(
                    RuleKind::TimerDefinitionValid,
                    &location,
                    scope.process_id,
                ));
            }
        }
        multiple => {
            let names: Vec<&str> = multiple.iter().map(|(name, _)| *name).collect();
            items.push(
                LintItem::new(
                    RuleKind::TimerMultipleDefinitions,
                    &location,
                    scope.process_id,
                )
                .with_message(format!(
                    "Timer event must declare exactly one of timeDate, timeCycle and timeDuration, found {}",
                    names.join(", ")
                )),
            );
        }
    }
}

fn has_placeholder(value: &str) -> bool {
    value.contains("#{") || value.contains("${")
}

pub fn check_conditional_event(
    scope: &ElementScope<'_>,
    element: &Element,
    items: &mut Vec<LintItem>,
) {
    let Some(definition) = element.child("conditionalEventDefinition") else {
        return;
    };
    let location = scope.location(element);
    let mut valid = true;

    if scope
        .camunda_attr(definition, "variableName")
        .map(str::trim)
        .unwrap_or_default()
        .is_empty()
    {
        items.push(LintItem::new(
            RuleKind::ConditionalVariableNameMissing,
            &location,
            scope.process_id,
        ));
        valid = false;
    }
    if scope
        .camunda_attr(definition, "variableEvents")
        .map(str::trim)
        .unwrap_or_default()
        .is_empty()
    {
        items.push(LintItem::new(
            RuleKind::ConditionalVariableEventsMissing,
            &location,
            scope.process_id,
        ));
        valid = false;
    }

    let condition = definition.child("condition");
    let condition_type = condition.and_then(|c| c.attr_ns(XSI_NS, "type"));
    let expression = condition.and_then(|c| c.text_trim());

    match condition_type {
        None if expression.is_some() => {
            // treated as type 'expression'
            items.push(LintItem::new(
                RuleKind::ConditionalTypeMissingExpressionPresent,
                &location,
                scope.process_id,
            ));
        }
        None => {
            items.push(LintItem::new(
                RuleKind::ConditionalExpressionMissing,
                &location,
                scope.process_id,
            ));
            valid = false;
        }
        Some(type_name) if is_formal_expression(type_name) => {
            if expression.is_none() {
                items.push(LintItem::new(
                    RuleKind::ConditionalExpressionMissing,
                    &location,
                    scope.process_id,
                ));
                valid = false;
            }
        }
        Some(type_name) => {
            items.push(
                LintItem::new(
                    RuleKind::ConditionalTypeNotExpression,
                    &location,
                    scope.process_id,
                )
                .with_message(format!("Condition type '{type_name}' is not 'expression'")),
            );
        }
    }

    if valid {
        items.push(LintItem::new(
            RuleKind::ConditionalEventValid,
            &location,
            scope.process_id,
        ));
    }
}

/// xsi:type values name tFormalExpression with an arbitrary prefix
fn is_formal_expression(type_name: &str) -> bool {
    type_name
        .rsplit(':')
        .next()
        .is_some_and(|local| local == "tFormalExpression")
}
