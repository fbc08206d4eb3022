//! Element-level BPMN rule tests against an exploded fixture tree

use std::fs;
use std::path::Path;

use dsflint_core::test_helpers::ClassFileBuilder;
use dsflint_core::{
    ApiGeneration, ClassIndex, DirProvider, LintContext, LintItem, RuleKind, Severity,
};
use dsflint_rules::bpmn::{lint_document, BpmnDocument};
use dsflint_rules::FhirIndex;

fn write_class(root: &Path, binary_name: &str, bytes: Vec<u8>) {
    let rel = format!("{}.class", binary_name.replace('.', "/"));
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

/// Fixture tree with a v2 delegate, a user-task listener and an execution
/// listener class
fn class_fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_class(
        dir.path(),
        "org.example.PingDelegate",
        ClassFileBuilder::new("org.example.PingDelegate")
            .interface("dev.dsf.bpe.v2.activity.ServiceTask")
            .build(),
    );
    write_class(
        dir.path(),
        "org.example.SendPong",
        ClassFileBuilder::new("org.example.SendPong")
            .interface("dev.dsf.bpe.v2.activity.MessageSendTask")
            .build(),
    );
    write_class(
        dir.path(),
        "org.example.ReleaseListener",
        ClassFileBuilder::new("org.example.ReleaseListener")
            .super_class("dev.dsf.bpe.v2.activity.DefaultUserTaskListener")
            .build(),
    );
    write_class(
        dir.path(),
        "org.example.LogListener",
        ClassFileBuilder::new("org.example.LogListener").build(),
    );
    write_class(
        dir.path(),
        "org.example.PlainClass",
        ClassFileBuilder::new("org.example.PlainClass").build(),
    );
    dir
}

fn fhir_index() -> FhirIndex {
    let mut index = FhirIndex::default();
    index
        .activity_definition_message_names
        .insert("startPong".to_string());
    index
        .structure_definition_message_names
        .insert("startPong".to_string());
    index
        .structure_definition_urls
        .insert("http://dsf.dev/fhir/StructureDefinition/task-pong".to_string());
    index
}

fn v2_context() -> LintContext {
    let mut ctx = LintContext::new().unwrap();
    ctx.set_api_generation(ApiGeneration::V2);
    ctx
}

fn lint(body: &str, definitions_extra: &str) -> Vec<LintItem> {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
    xmlns:camunda="http://camunda.org/schema/1.0/bpmn"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <bpmn:process id="org_ping" isExecutable="true" camunda:historyTimeToLive="30">{body}</bpmn:process>
  {definitions_extra}
</bpmn:definitions>"#
    );
    let fixture = class_fixture();
    let provider = DirProvider::new(fixture.path());
    let classes = ClassIndex::new(&provider);
    let doc = BpmnDocument::parse("ping.bpmn", xml.as_bytes()).unwrap();
    lint_document(&doc, &classes, &fhir_index(), &v2_context())
}

fn kinds(items: &[LintItem]) -> Vec<RuleKind> {
    items.iter().map(|i| i.kind).collect()
}

#[test]
fn service_task_with_delegate_is_valid() {
    let items = lint(
        r#"<bpmn:serviceTask id="T1" camunda:class="org.example.PingDelegate"/>"#,
        "",
    );
    assert!(kinds(&items).contains(&RuleKind::ImplementationClassValid));
}

#[test]
fn service_task_class_missing_not_found_and_not_implementing() {
    let items = lint(r#"<bpmn:serviceTask id="T1"/>"#, "");
    assert!(kinds(&items).contains(&RuleKind::ImplementationClassMissing));

    let items = lint(
        r#"<bpmn:serviceTask id="T1" camunda:class="org.example.Absent"/>"#,
        "",
    );
    assert!(kinds(&items).contains(&RuleKind::ImplementationClassNotFound));

    let items = lint(
        r#"<bpmn:serviceTask id="T1" camunda:class="org.example.PlainClass"/>"#,
        "",
    );
    assert!(kinds(&items).contains(&RuleKind::ImplementationClassNotImplementingDelegate));
}

#[test]
fn message_throw_event_checks_class_message_and_fields() {
    let body = r#"<bpmn:intermediateThrowEvent id="Send_1">
        <bpmn:extensionElements>
            <camunda:field name="profile">
                <camunda:string>http://dsf.dev/fhir/StructureDefinition/task-pong|#{version}</camunda:string>
            </camunda:field>
            <camunda:field name="instantiatesCanonical">
                <camunda:string>http://dsf.dev/bpe/Process/pong|#{version}</camunda:string>
            </camunda:field>
        </bpmn:extensionElements>
        <bpmn:messageEventDefinition messageRef="Message_1" camunda:class="org.example.SendPong"/>
    </bpmn:intermediateThrowEvent>"#;
    let items = lint(body, r#"<bpmn:message id="Message_1" name="startPong"/>"#);
    let kinds = kinds(&items);
    assert!(kinds.contains(&RuleKind::ImplementationClassValid));
    assert!(kinds.contains(&RuleKind::FhirActivityDefinitionMessageNameFound));
    assert!(kinds.contains(&RuleKind::FhirStructureDefinitionMessageNameFound));
    assert!(kinds.contains(&RuleKind::FieldInjectionsValid));
    assert!(items.iter().all(|i| i.severity != Severity::Error));
}

#[test]
fn unknown_message_name_misses_both_fhir_anchors() {
    let body = r#"<bpmn:intermediateCatchEvent id="Catch_1">
        <bpmn:messageEventDefinition messageRef="Message_1"/>
    </bpmn:intermediateCatchEvent>"#;
    let items = lint(body, r#"<bpmn:message id="Message_1" name="unheardOf"/>"#);
    let kinds = kinds(&items);
    assert!(kinds.contains(&RuleKind::FhirActivityDefinitionMessageNameNotFound));
    assert!(kinds.contains(&RuleKind::FhirStructureDefinitionMessageNameNotFound));
}

#[test]
fn message_without_name_is_reported() {
    let body = r#"<bpmn:receiveTask id="R1" messageRef="Message_1"/>"#;
    let items = lint(body, r#"<bpmn:message id="Message_1"/>"#);
    assert!(kinds(&items).contains(&RuleKind::MessageNameMissing));
}

#[test]
fn field_injection_violations_are_separate_items() {
    let body = r#"<bpmn:endEvent id="End_1">
        <bpmn:extensionElements>
            <camunda:field name="profile">
                <camunda:string>http://dsf.dev/fhir/StructureDefinition/unknown-profile</camunda:string>
            </camunda:field>
        </bpmn:extensionElements>
        <bpmn:messageEventDefinition messageRef="Message_1" camunda:class="org.example.SendPong"/>
    </bpmn:endEvent>"#;
    let items = lint(body, r#"<bpmn:message id="Message_1" name="startPong"/>"#);
    let kinds = kinds(&items);
    assert!(kinds.contains(&RuleKind::FieldInjectionProfilePlaceholderMissing));
    assert!(kinds.contains(&RuleKind::FieldInjectionProfileStructureDefinitionNotFound));
    assert!(kinds.contains(&RuleKind::FieldInjectionInstantiatesCanonicalMissing));
    assert!(!kinds.contains(&RuleKind::FieldInjectionsValid));
}

#[test]
fn complete_error_boundary_event_is_valid() {
    let body = r#"<bpmn:boundaryEvent id="B1" name="timeout" attachedToRef="T1">
        <bpmn:errorEventDefinition errorRef="Error_1" camunda:errorCodeVariable="errorCode"/>
    </bpmn:boundaryEvent>"#;
    let items = lint(
        body,
        r#"<bpmn:error id="Error_1" name="pingError" errorCode="PING_FAILED"/>"#,
    );
    assert!(kinds(&items).contains(&RuleKind::ErrorBoundaryEventValid));
}

#[test]
fn error_boundary_event_missing_pieces_each_report() {
    let body = r#"<bpmn:boundaryEvent id="B1" attachedToRef="T1">
        <bpmn:errorEventDefinition errorRef="Error_1"/>
    </bpmn:boundaryEvent>"#;
    let items = lint(body, r#"<bpmn:error id="Error_1"/>"#);
    let kinds = kinds(&items);
    assert!(kinds.contains(&RuleKind::ErrorBoundaryEventNameMissing));
    assert!(kinds.contains(&RuleKind::ErrorNameMissing));
    assert!(kinds.contains(&RuleKind::ErrorCodeMissing));
    assert!(kinds.contains(&RuleKind::ErrorCodeVariableMissing));
    assert!(!kinds.contains(&RuleKind::ErrorBoundaryEventValid));
}

#[test]
fn timer_rules() {
    let valid = r#"<bpmn:intermediateCatchEvent id="T1">
        <bpmn:timerEventDefinition>
            <bpmn:timeDuration xsi:type="bpmn:tFormalExpression">#{timerDuration}</bpmn:timeDuration>
        </bpmn:timerEventDefinition>
    </bpmn:intermediateCatchEvent>"#;
    assert!(kinds(&lint(valid, "")).contains(&RuleKind::TimerDefinitionValid));

    let fixed_date = r#"<bpmn:intermediateCatchEvent id="T1">
        <bpmn:timerEventDefinition>
            <bpmn:timeDate>2030-01-01T00:00:00Z</bpmn:timeDate>
        </bpmn:timerEventDefinition>
    </bpmn:intermediateCatchEvent>"#;
    let items = lint(fixed_date, "");
    let item = items
        .iter()
        .find(|i| i.kind == RuleKind::TimerFixedTimeDate)
        .unwrap();
    assert_eq!(item.severity, Severity::Info);

    let no_placeholder = r#"<bpmn:intermediateCatchEvent id="T1">
        <bpmn:timerEventDefinition>
            <bpmn:timeCycle>R/PT10M</bpmn:timeCycle>
        </bpmn:timerEventDefinition>
    </bpmn:intermediateCatchEvent>"#;
    let items = lint(no_placeholder, "");
    let item = items
        .iter()
        .find(|i| i.kind == RuleKind::TimerValueWithoutPlaceholder)
        .unwrap();
    assert_eq!(item.severity, Severity::Warning);

    let none = r#"<bpmn:intermediateCatchEvent id="T1">
        <bpmn:timerEventDefinition/>
    </bpmn:intermediateCatchEvent>"#;
    assert!(kinds(&lint(none, "")).contains(&RuleKind::TimerDefinitionMissing));

    let both = r#"<bpmn:intermediateCatchEvent id="T1">
        <bpmn:timerEventDefinition>
            <bpmn:timeDate>2030-01-01</bpmn:timeDate>
            <bpmn:timeDuration>#{d}</bpmn:timeDuration>
        </bpmn:timerEventDefinition>
    </bpmn:intermediateCatchEvent>"#;
    assert!(kinds(&lint(both, "")).contains(&RuleKind::TimerMultipleDefinitions));
}

#[test]
fn conditional_rules() {
    let valid = r#"<bpmn:intermediateCatchEvent id="C1">
        <bpmn:conditionalEventDefinition camunda:variableName="ping" camunda:variableEvents="create, update">
            <bpmn:condition xsi:type="bpmn:tFormalExpression">${ping != null}</bpmn:condition>
        </bpmn:conditionalEventDefinition>
    </bpmn:intermediateCatchEvent>"#;
    assert!(kinds(&lint(valid, "")).contains(&RuleKind::ConditionalEventValid));

    let untyped = r#"<bpmn:intermediateCatchEvent id="C1">
        <bpmn:conditionalEventDefinition camunda:variableName="ping" camunda:variableEvents="create">
            <bpmn:condition>${ping != null}</bpmn:condition>
        </bpmn:conditionalEventDefinition>
    </bpmn:intermediateCatchEvent>"#;
    let items = lint(untyped, "");
    let item = items
        .iter()
        .find(|i| i.kind == RuleKind::ConditionalTypeMissingExpressionPresent)
        .unwrap();
    assert_eq!(item.severity, Severity::Info);

    let empty = r#"<bpmn:intermediateCatchEvent id="C1">
        <bpmn:conditionalEventDefinition>
            <bpmn:condition xsi:type="bpmn:tFormalExpression"></bpmn:condition>
        </bpmn:conditionalEventDefinition>
    </bpmn:intermediateCatchEvent>"#;
    let items = lint(empty, "");
    let kinds = kinds(&items);
    assert!(kinds.contains(&RuleKind::ConditionalVariableNameMissing));
    assert!(kinds.contains(&RuleKind::ConditionalVariableEventsMissing));
    assert!(kinds.contains(&RuleKind::ConditionalExpressionMissing));
}

#[test]
fn user_task_listener_rules() {
    let valid = r#"<bpmn:userTask id="U1">
        <bpmn:extensionElements>
            <camunda:taskListener class="org.example.ReleaseListener" event="create"/>
        </bpmn:extensionElements>
    </bpmn:userTask>"#;
    assert!(kinds(&lint(valid, "")).contains(&RuleKind::UserTaskListenerValid));

    let missing = r#"<bpmn:userTask id="U1"/>"#;
    assert!(kinds(&lint(missing, "")).contains(&RuleKind::UserTaskListenerMissing));

    let not_found = r#"<bpmn:userTask id="U1">
        <bpmn:extensionElements>
            <camunda:taskListener class="org.example.Absent" event="create"/>
        </bpmn:extensionElements>
    </bpmn:userTask>"#;
    assert!(kinds(&lint(not_found, "")).contains(&RuleKind::UserTaskListenerClassNotFound));

    let wrong_type = r#"<bpmn:userTask id="U1">
        <bpmn:extensionElements>
            <camunda:taskListener class="org.example.PlainClass" event="create"/>
        </bpmn:extensionElements>
    </bpmn:userTask>"#;
    assert!(kinds(&lint(wrong_type, "")).contains(&RuleKind::UserTaskListenerInvalidType));
}

#[test]
fn execution_listener_rules() {
    let valid = r#"<bpmn:serviceTask id="T1" camunda:class="org.example.PingDelegate">
        <bpmn:extensionElements>
            <camunda:executionListener class="org.example.LogListener" event="start"/>
        </bpmn:extensionElements>
    </bpmn:serviceTask>"#;
    assert!(kinds(&lint(valid, "")).contains(&RuleKind::ExecutionListenerClassesValid));

    let missing = r#"<bpmn:serviceTask id="T1" camunda:class="org.example.PingDelegate">
        <bpmn:extensionElements>
            <camunda:executionListener class="org.example.Absent" event="start"/>
        </bpmn:extensionElements>
    </bpmn:serviceTask>"#;
    assert!(kinds(&lint(missing, "")).contains(&RuleKind::ExecutionListenerClassNotFound));
}
