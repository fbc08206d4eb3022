//! Task and execution listener rules

use dsflint_core::{Element, LintItem, RuleKind};

use super::ElementScope;

/// User tasks must declare a task listener that ships with the plugin and
/// extends the generation's default listener or implements its interface
pub fn check_user_task_listeners(
    scope: &ElementScope<'_>,
    element: &Element,
    items: &mut Vec<LintItem>,
) {
    let location = scope.location(element);
    let listeners: Vec<&Element> = element
        .child("extensionElements")
        .into_iter()
        .flat_map(|ext| ext.children_named("taskListener"))
        .collect();

    if listeners.is_empty() {
        items.push(LintItem::new(
            RuleKind::UserTaskListenerMissing,
            &location,
            scope.process_id,
        ));
        return;
    }

    let generation = scope.ctx.api_generation();
    let mut valid = true;
    for listener in listeners {
        let Some(class_name) = scope
            .camunda_attr(listener, "class")
            .map(str::trim)
            .filter(|c| !c.is_empty())
        else {
            items.push(
                LintItem::new(
                    RuleKind::UserTaskListenerMissing,
                    &location,
                    scope.process_id,
                )
                .with_message("Task listener declares no class"),
            );
            valid = false;
            continue;
        };

        let Some(class) = scope.classes.load(class_name) else {
            items.push(
                LintItem::new(
                    RuleKind::UserTaskListenerClassNotFound,
                    &location,
                    scope.process_id,
                )
                .with_message(format!(
                    "User task listener class '{class_name}' not found in the plugin"
                )),
            );
            valid = false;
            continue;
        };

        if !scope
            .classes
            .reaches(&class, generation.user_task_listener_types())
        {
            items.push(
                LintItem::new(
                    RuleKind::UserTaskListenerInvalidType,
                    &location,
                    scope.process_id,
                )
                .with_message(format!(
                    "User task listener '{class_name}' neither extends the default {generation} listener nor implements its listener interface"
                )),
            );
            valid = false;
        }
    }

    if valid {
        items.push(LintItem::new(
            RuleKind::UserTaskListenerValid,
            &location,
            scope.process_id,
        ));
    }
}

/// Every execution listener class declared on any element must ship with
/// the plugin
pub fn check_execution_listeners(
    scope: &ElementScope<'_>,
    element: &Element,
    items: &mut Vec<LintItem>,
) {
    let classes: Vec<&str> = element
        .child("extensionElements")
        .into_iter()
        .flat_map(|ext| ext.children_named("executionListener"))
        .filter_map(|listener| scope.camunda_attr(listener, "class"))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if classes.is_empty() {
        return;
    }

    let location = scope.location(element);
    let mut all_found = true;
    for class_name in &classes {
        if !scope.classes.contains(class_name) {
            items.push(
                LintItem::new(
                    RuleKind::ExecutionListenerClassNotFound,
                    &location,
                    scope.process_id,
                )
                .with_message(format!(
                    "Execution listener class '{class_name}' not found in the plugin"
                )),
            );
            all_found = false;
        }
    }
    if all_found {
        items.push(
            LintItem::new(
                RuleKind::ExecutionListenerClassesValid,
                &location,
                scope.process_id,
            )
            .with_message(format!(
                "All {} execution listener classes were found",
                classes.len()
            )),
        );
    }
}
