//! Lint report model: severities, the rule catalogue, items, and the report
//!
//! The rule catalogue is a single closed enum. Each kind carries a stable
//! SCREAMING_SNAKE code, a default severity, and a default English message;
//! constructing an item composes the kind with an optional per-call message.

use serde::{Deserialize, Serialize};

/// Severity levels for lint items
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// A check that passed; the report doubles as a coverage view
    Success,
    /// Informational findings
    Info,
    /// Findings that should be addressed
    Warning,
    /// Findings that must be fixed
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Success => write!(f, "success"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// The closed rule catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    // Plugin discovery
    ServiceLoaderRegistrationFound,
    ProcessPluginDefinitionClassFound,
    PluginDefinitionResourceVersionNull,
    PluginDefinitionResourceVersionValid,

    // Resource resolution
    ProcessModelFileFound,
    ProcessModelFileNotFound,
    FhirResourceFileFound,
    FhirResourceFileNotFound,
    ResourceOutsideResourceRoot,
    ResourceFromDependencyArchive,

    // BPMN process level
    UnparsableBpmnFile,
    BpmnFileNoProcess,
    BpmnFileMultipleProcesses,
    BpmnProcessIdEmpty,
    BpmnProcessIdPatternMismatch,
    BpmnProcessIdValid,
    BpmnProcessNotExecutable,
    BpmnProcessExecutable,
    BpmnProcessHistoryTimeToLiveMissing,
    BpmnProcessHistoryTimeToLiveSet,

    // BPMN service and message-send activities
    ImplementationClassMissing,
    ImplementationClassNotFound,
    ImplementationClassNotImplementingDelegate,
    ImplementationClassValid,
    MessageNameMissing,
    FhirActivityDefinitionMessageNameFound,
    FhirActivityDefinitionMessageNameNotFound,
    FhirStructureDefinitionMessageNameFound,
    FhirStructureDefinitionMessageNameNotFound,
    FieldInjectionProfileMissing,
    FieldInjectionProfilePlaceholderMissing,
    FieldInjectionProfileStructureDefinitionNotFound,
    FieldInjectionInstantiatesCanonicalMissing,
    FieldInjectionInstantiatesCanonicalPlaceholderMissing,
    FieldInjectionsValid,

    // BPMN boundary, timer and conditional events
    ErrorBoundaryEventNameMissing,
    ErrorRefMissing,
    ErrorNameMissing,
    ErrorCodeMissing,
    ErrorCodeVariableMissing,
    ErrorBoundaryEventValid,
    TimerDefinitionMissing,
    TimerMultipleDefinitions,
    TimerFixedTimeDate,
    TimerValueWithoutPlaceholder,
    TimerDefinitionValid,
    ConditionalVariableNameMissing,
    ConditionalVariableEventsMissing,
    ConditionalTypeMissingExpressionPresent,
    ConditionalTypeNotExpression,
    ConditionalExpressionMissing,
    ConditionalEventValid,

    // BPMN listeners
    UserTaskListenerMissing,
    UserTaskListenerClassNotFound,
    UserTaskListenerInvalidType,
    UserTaskListenerValid,
    ExecutionListenerClassNotFound,
    ExecutionListenerClassesValid,

    // FHIR, generic
    UnparsableFhirResource,
    ReadAccessTagMissing,
    ReadAccessTagInvalid,
    ReadAccessTagValid,

    // FHIR ActivityDefinition
    ActivityDefinitionUrlMissing,
    ActivityDefinitionUrlFound,
    ActivityDefinitionStatusNotUnknown,
    ActivityDefinitionKindNotTask,
    ActivityDefinitionProfileInvalid,
    ProcessAuthorizationExtensionMissing,
    ProcessAuthorizationRequesterMissing,
    ProcessAuthorizationRecipientMissing,
    ProcessAuthorizationCodingSystemInvalid,
    ProcessAuthorizationCodeUnknown,
    ProcessAuthorizationValid,

    // FHIR StructureDefinition
    StructureDefinitionUrlMissing,
    StructureDefinitionUrlInvalid,
    StructureDefinitionStatusNotUnknown,
    StructureDefinitionVersionPlaceholderMissing,
    StructureDefinitionDatePlaceholderMissing,
    StructureDefinitionDifferentialMissing,
    StructureDefinitionSnapshotPresent,
    ElementIdMissing,
    ElementIdDuplicate,
    SliceMaxExceedsBaseMax,
    SliceMinSumExceedsMax,
    SliceMinSumAboveBaseMin,

    // FHIR CodeSystem
    CodeSystemUrlMissing,
    CodeSystemStatusNotUnknown,
    CodeSystemVersionPlaceholderMissing,
    CodeSystemDatePlaceholderMissing,
    CodeSystemConceptCodeDuplicate,

    // FHIR ValueSet
    ValueSetUrlMissing,
    ValueSetStatusNotUnknown,
    ValueSetVersionPlaceholderMissing,
    ValueSetDatePlaceholderMissing,
    ValueSetIncludedCodeSystemNotFound,
    ValueSetIncludedCodeSystemFound,

    // FHIR Questionnaire
    QuestionnaireUrlMissing,
    QuestionnaireStatusNotUnknown,
    QuestionnaireVersionPlaceholderMissing,
    QuestionnaireItemLinkIdDuplicate,
    QuestionnaireBusinessKeyItemMissing,
    QuestionnaireUserTaskIdItemMissing,

    // FHIR Task
    TaskProfileMissing,
    TaskProfileStructureDefinitionNotFound,
    TaskInstantiatesCanonicalMissing,
    TaskUnknownInstantiatesCanonical,
    ActivityDefinitionExists,
    TaskStatusNotDraft,
    TaskMessageNameInputMissing,

    // Orchestrator
    RuleEvaluationFailed,
    TimedOut,
}

impl RuleKind {
    /// Stable code used in rendered reports
    pub fn as_code(&self) -> &'static str {
        use RuleKind::*;
        match self {
            ServiceLoaderRegistrationFound => "SERVICE_LOADER_REGISTRATION_FOUND",
            ProcessPluginDefinitionClassFound => "PROCESS_PLUGIN_DEFINITION_CLASS_FOUND",
            PluginDefinitionResourceVersionNull => "PLUGIN_DEFINITION_RESOURCE_VERSION_NULL",
            PluginDefinitionResourceVersionValid => "PLUGIN_DEFINITION_RESOURCE_VERSION_VALID",
            ProcessModelFileFound => "PROCESS_MODEL_FILE_FOUND",
            ProcessModelFileNotFound => "PROCESS_MODEL_FILE_NOT_FOUND",
            FhirResourceFileFound => "FHIR_RESOURCE_FILE_FOUND",
            FhirResourceFileNotFound => "FHIR_RESOURCE_FILE_NOT_FOUND",
            ResourceOutsideResourceRoot => "RESOURCE_OUTSIDE_RESOURCE_ROOT",
            ResourceFromDependencyArchive => "RESOURCE_FROM_DEPENDENCY_ARCHIVE",
            UnparsableBpmnFile => "UNPARSABLE_BPMN_FILE",
            BpmnFileNoProcess => "BPMN_FILE_NO_PROCESS",
            BpmnFileMultipleProcesses => "BPMN_FILE_MULTIPLE_PROCESSES",
            BpmnProcessIdEmpty => "BPMN_PROCESS_ID_EMPTY",
            BpmnProcessIdPatternMismatch => "BPMN_PROCESS_ID_PATTERN_MISMATCH",
            BpmnProcessIdValid => "BPMN_PROCESS_ID_VALID",
            BpmnProcessNotExecutable => "BPMN_PROCESS_NOT_EXECUTABLE",
            BpmnProcessExecutable => "BPMN_PROCESS_EXECUTABLE",
            BpmnProcessHistoryTimeToLiveMissing => "BPMN_PROCESS_HISTORY_TIME_TO_LIVE_MISSING",
            BpmnProcessHistoryTimeToLiveSet => "BPMN_PROCESS_HISTORY_TIME_TO_LIVE_SET",
            ImplementationClassMissing => "IMPLEMENTATION_CLASS_MISSING",
            ImplementationClassNotFound => "IMPLEMENTATION_CLASS_NOT_FOUND",
            ImplementationClassNotImplementingDelegate => {
                "IMPLEMENTATION_CLASS_NOT_IMPLEMENTING_DELEGATE"
            }
            ImplementationClassValid => "IMPLEMENTATION_CLASS_VALID",
            MessageNameMissing => "MESSAGE_NAME_MISSING",
            FhirActivityDefinitionMessageNameFound => {
                "FHIR_ACTIVITY_DEFINITION_MESSAGE_NAME_FOUND"
            }
            FhirActivityDefinitionMessageNameNotFound => {
                "FHIR_ACTIVITY_DEFINITION_MESSAGE_NAME_NOT_FOUND"
            }
            FhirStructureDefinitionMessageNameFound => {
                "FHIR_STRUCTURE_DEFINITION_MESSAGE_NAME_FOUND"
            }
            FhirStructureDefinitionMessageNameNotFound => {
                "FHIR_STRUCTURE_DEFINITION_MESSAGE_NAME_NOT_FOUND"
            }
            FieldInjectionProfileMissing => "FIELD_INJECTION_PROFILE_MISSING",
            FieldInjectionProfilePlaceholderMissing => {
                "FIELD_INJECTION_PROFILE_PLACEHOLDER_MISSING"
            }
            FieldInjectionProfileStructureDefinitionNotFound => {
                "FIELD_INJECTION_PROFILE_STRUCTURE_DEFINITION_NOT_FOUND"
            }
            FieldInjectionInstantiatesCanonicalMissing => {
                "FIELD_INJECTION_INSTANTIATES_CANONICAL_MISSING"
            }
            FieldInjectionInstantiatesCanonicalPlaceholderMissing => {
                "FIELD_INJECTION_INSTANTIATES_CANONICAL_PLACEHOLDER_MISSING"
            }
            FieldInjectionsValid => "FIELD_INJECTIONS_VALID",
            ErrorBoundaryEventNameMissing => "ERROR_BOUNDARY_EVENT_NAME_MISSING",
            ErrorRefMissing => "ERROR_REF_MISSING",
            ErrorNameMissing => "ERROR_NAME_MISSING",
            ErrorCodeMissing => "ERROR_CODE_MISSING",
            ErrorCodeVariableMissing => "ERROR_CODE_VARIABLE_MISSING",
            ErrorBoundaryEventValid => "ERROR_BOUNDARY_EVENT_VALID",
            TimerDefinitionMissing => "TIMER_DEFINITION_MISSING",
            TimerMultipleDefinitions => "TIMER_MULTIPLE_DEFINITIONS",
            TimerFixedTimeDate => "TIMER_FIXED_TIME_DATE",
            TimerValueWithoutPlaceholder => "TIMER_VALUE_WITHOUT_PLACEHOLDER",
            TimerDefinitionValid => "TIMER_DEFINITION_VALID",
            ConditionalVariableNameMissing => "CONDITIONAL_VARIABLE_NAME_MISSING",
            ConditionalVariableEventsMissing => "CONDITIONAL_VARIABLE_EVENTS_MISSING",
            ConditionalTypeMissingExpressionPresent => {
                "CONDITIONAL_TYPE_MISSING_EXPRESSION_PRESENT"
            }
            ConditionalTypeNotExpression => "CONDITIONAL_TYPE_NOT_EXPRESSION",
            ConditionalExpressionMissing => "CONDITIONAL_EXPRESSION_MISSING",
            ConditionalEventValid => "CONDITIONAL_EVENT_VALID",
            UserTaskListenerMissing => "USER_TASK_LISTENER_MISSING",
            UserTaskListenerClassNotFound => "USER_TASK_LISTENER_CLASS_NOT_FOUND",
            UserTaskListenerInvalidType => "USER_TASK_LISTENER_INVALID_TYPE",
            UserTaskListenerValid => "USER_TASK_LISTENER_VALID",
            ExecutionListenerClassNotFound => "EXECUTION_LISTENER_CLASS_NOT_FOUND",
            ExecutionListenerClassesValid => "EXECUTION_LISTENER_CLASSES_VALID",
            UnparsableFhirResource => "UNPARSABLE_FHIR_RESOURCE",
            ReadAccessTagMissing => "READ_ACCESS_TAG_MISSING",
            ReadAccessTagInvalid => "READ_ACCESS_TAG_INVALID",
            ReadAccessTagValid => "READ_ACCESS_TAG_VALID",
            ActivityDefinitionUrlMissing => "ACTIVITY_DEFINITION_URL_MISSING",
            ActivityDefinitionUrlFound => "ACTIVITY_DEFINITION_URL_FOUND",
            ActivityDefinitionStatusNotUnknown => "ACTIVITY_DEFINITION_STATUS_NOT_UNKNOWN",
            ActivityDefinitionKindNotTask => "ACTIVITY_DEFINITION_KIND_NOT_TASK",
            ActivityDefinitionProfileInvalid => "ACTIVITY_DEFINITION_PROFILE_INVALID",
            ProcessAuthorizationExtensionMissing => "PROCESS_AUTHORIZATION_EXTENSION_MISSING",
            ProcessAuthorizationRequesterMissing => "PROCESS_AUTHORIZATION_REQUESTER_MISSING",
            ProcessAuthorizationRecipientMissing => "PROCESS_AUTHORIZATION_RECIPIENT_MISSING",
            ProcessAuthorizationCodingSystemInvalid => {
                "PROCESS_AUTHORIZATION_CODING_SYSTEM_INVALID"
            }
            ProcessAuthorizationCodeUnknown => "PROCESS_AUTHORIZATION_CODE_UNKNOWN",
            ProcessAuthorizationValid => "PROCESS_AUTHORIZATION_VALID",
            StructureDefinitionUrlMissing => "STRUCTURE_DEFINITION_URL_MISSING",
            StructureDefinitionUrlInvalid => "STRUCTURE_DEFINITION_URL_INVALID",
            StructureDefinitionStatusNotUnknown => "STRUCTURE_DEFINITION_STATUS_NOT_UNKNOWN",
            StructureDefinitionVersionPlaceholderMissing => {
                "STRUCTURE_DEFINITION_VERSION_PLACEHOLDER_MISSING"
            }
            StructureDefinitionDatePlaceholderMissing => {
                "STRUCTURE_DEFINITION_DATE_PLACEHOLDER_MISSING"
            }
            StructureDefinitionDifferentialMissing => "STRUCTURE_DEFINITION_DIFFERENTIAL_MISSING",
            StructureDefinitionSnapshotPresent => "STRUCTURE_DEFINITION_SNAPSHOT_PRESENT",
            ElementIdMissing => "ELEMENT_ID_MISSING",
            ElementIdDuplicate => "ELEMENT_ID_DUPLICATE",
            SliceMaxExceedsBaseMax => "SLICE_MAX_EXCEEDS_BASE_MAX",
            SliceMinSumExceedsMax => "SLICE_MIN_SUM_EXCEEDS_MAX",
            SliceMinSumAboveBaseMin => "SLICE_MIN_SUM_ABOVE_BASE_MIN",
            CodeSystemUrlMissing => "CODE_SYSTEM_URL_MISSING",
            CodeSystemStatusNotUnknown => "CODE_SYSTEM_STATUS_NOT_UNKNOWN",
            CodeSystemVersionPlaceholderMissing => "CODE_SYSTEM_VERSION_PLACEHOLDER_MISSING",
            CodeSystemDatePlaceholderMissing => "CODE_SYSTEM_DATE_PLACEHOLDER_MISSING",
            CodeSystemConceptCodeDuplicate => "CODE_SYSTEM_CONCEPT_CODE_DUPLICATE",
            ValueSetUrlMissing => "VALUE_SET_URL_MISSING",
            ValueSetStatusNotUnknown => "VALUE_SET_STATUS_NOT_UNKNOWN",
            ValueSetVersionPlaceholderMissing => "VALUE_SET_VERSION_PLACEHOLDER_MISSING",
            ValueSetDatePlaceholderMissing => "VALUE_SET_DATE_PLACEHOLDER_MISSING",
            ValueSetIncludedCodeSystemNotFound => "VALUE_SET_INCLUDED_CODE_SYSTEM_NOT_FOUND",
            ValueSetIncludedCodeSystemFound => "VALUE_SET_INCLUDED_CODE_SYSTEM_FOUND",
            QuestionnaireUrlMissing => "QUESTIONNAIRE_URL_MISSING",
            QuestionnaireStatusNotUnknown => "QUESTIONNAIRE_STATUS_NOT_UNKNOWN",
            QuestionnaireVersionPlaceholderMissing => "QUESTIONNAIRE_VERSION_PLACEHOLDER_MISSING",
            QuestionnaireItemLinkIdDuplicate => "QUESTIONNAIRE_ITEM_LINK_ID_DUPLICATE",
            QuestionnaireBusinessKeyItemMissing => "QUESTIONNAIRE_BUSINESS_KEY_ITEM_MISSING",
            QuestionnaireUserTaskIdItemMissing => "QUESTIONNAIRE_USER_TASK_ID_ITEM_MISSING",
            TaskProfileMissing => "TASK_PROFILE_MISSING",
            TaskProfileStructureDefinitionNotFound => {
                "TASK_PROFILE_STRUCTURE_DEFINITION_NOT_FOUND"
            }
            TaskInstantiatesCanonicalMissing => "TASK_INSTANTIATES_CANONICAL_MISSING",
            TaskUnknownInstantiatesCanonical => "TASK_UNKNOWN_INSTANTIATES_CANONICAL",
            ActivityDefinitionExists => "ACTIVITY_DEFINITION_EXISTS",
            TaskStatusNotDraft => "TASK_STATUS_NOT_DRAFT",
            TaskMessageNameInputMissing => "TASK_MESSAGE_NAME_INPUT_MISSING",
            RuleEvaluationFailed => "RULE_EVALUATION_FAILED",
            TimedOut => "TIMED_OUT",
        }
    }

    /// The severity this kind reports with unless overridden
    pub fn default_severity(&self) -> Severity {
        use RuleKind::*;
        match self {
            ServiceLoaderRegistrationFound
            | ProcessPluginDefinitionClassFound
            | PluginDefinitionResourceVersionValid
            | ProcessModelFileFound
            | FhirResourceFileFound
            | BpmnProcessIdValid
            | BpmnProcessExecutable
            | BpmnProcessHistoryTimeToLiveSet
            | ImplementationClassValid
            | FhirActivityDefinitionMessageNameFound
            | FhirStructureDefinitionMessageNameFound
            | FieldInjectionsValid
            | ErrorBoundaryEventValid
            | TimerDefinitionValid
            | ConditionalEventValid
            | UserTaskListenerValid
            | ExecutionListenerClassesValid
            | ReadAccessTagValid
            | ActivityDefinitionUrlFound
            | ProcessAuthorizationValid
            | ValueSetIncludedCodeSystemFound
            | ActivityDefinitionExists => Severity::Success,
            ResourceFromDependencyArchive
            | TimerFixedTimeDate
            | ConditionalTypeMissingExpressionPresent
            | ConditionalTypeNotExpression => Severity::Info,
            ResourceOutsideResourceRoot
            | BpmnProcessHistoryTimeToLiveMissing
            | TimerValueWithoutPlaceholder
            | StructureDefinitionSnapshotPresent
            | SliceMinSumAboveBaseMin
            | TimedOut => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// The default English message for this kind
    pub fn default_message(&self) -> &'static str {
        use RuleKind::*;
        match self {
            ServiceLoaderRegistrationFound => {
                "Process plugin definition registered via META-INF/services"
            }
            ProcessPluginDefinitionClassFound => {
                "Process plugin definition class found by structural scan"
            }
            PluginDefinitionResourceVersionNull => {
                "Plugin definition declares no resource version matching <major>.<minor>.<x>.<y>"
            }
            PluginDefinitionResourceVersionValid => "Plugin resource version declared",
            ProcessModelFileFound => "Process model file resolved",
            ProcessModelFileNotFound => "Process model file could not be resolved",
            FhirResourceFileFound => "FHIR resource file resolved",
            FhirResourceFileNotFound => "FHIR resource file could not be resolved",
            ResourceOutsideResourceRoot => "Resource resolved outside the plugin resource root",
            ResourceFromDependencyArchive => "Resource resolved from a dependency archive",
            UnparsableBpmnFile => "BPMN file could not be parsed",
            BpmnFileNoProcess => "BPMN file contains no process",
            BpmnFileMultipleProcesses => "BPMN file contains more than one process",
            BpmnProcessIdEmpty => "BPMN process id is empty",
            BpmnProcessIdPatternMismatch => {
                "BPMN process id does not match ^[A-Za-z0-9-]+_[A-Za-z0-9-]+$"
            }
            BpmnProcessIdValid => "BPMN process id is valid",
            BpmnProcessNotExecutable => "BPMN process is not marked executable",
            BpmnProcessExecutable => "BPMN process is executable",
            BpmnProcessHistoryTimeToLiveMissing => {
                "Camunda historyTimeToLive is missing or blank"
            }
            BpmnProcessHistoryTimeToLiveSet => "Camunda historyTimeToLive is set",
            ImplementationClassMissing => "No implementation class declared",
            ImplementationClassNotFound => "Implementation class not found in the plugin",
            ImplementationClassNotImplementingDelegate => {
                "Implementation class does not implement the service delegate of its API generation"
            }
            ImplementationClassValid => "Implementation class found and implements the delegate",
            MessageNameMissing => "Message has no name",
            FhirActivityDefinitionMessageNameFound => {
                "Message name declared by an ActivityDefinition"
            }
            FhirActivityDefinitionMessageNameNotFound => {
                "Message name is not declared by any ActivityDefinition message-name extension"
            }
            FhirStructureDefinitionMessageNameFound => {
                "Message name fixed by a StructureDefinition Task.input slice"
            }
            FhirStructureDefinitionMessageNameNotFound => {
                "Message name is not fixed by any StructureDefinition Task.input:message-name.value[x]"
            }
            FieldInjectionProfileMissing => "Field injection 'profile' is missing or blank",
            FieldInjectionProfilePlaceholderMissing => {
                "Field injection 'profile' does not contain the #{version} placeholder"
            }
            FieldInjectionProfileStructureDefinitionNotFound => {
                "Field injection 'profile' references no known StructureDefinition"
            }
            FieldInjectionInstantiatesCanonicalMissing => {
                "Field injection 'instantiatesCanonical' is missing or blank"
            }
            FieldInjectionInstantiatesCanonicalPlaceholderMissing => {
                "Field injection 'instantiatesCanonical' does not contain the #{version} placeholder"
            }
            FieldInjectionsValid => "Message-send field injections are valid",
            ErrorBoundaryEventNameMissing => "Error boundary event has no name",
            ErrorRefMissing => "Error boundary event references no error",
            ErrorNameMissing => "Referenced error has no name",
            ErrorCodeMissing => "Referenced error has no error code",
            ErrorCodeVariableMissing => "Error boundary event declares no errorCodeVariable",
            ErrorBoundaryEventValid => "Error boundary event is fully declared",
            TimerDefinitionMissing => {
                "Timer event declares none of timeDate, timeCycle or timeDuration"
            }
            TimerMultipleDefinitions => {
                "Timer event declares more than one of timeDate, timeCycle and timeDuration"
            }
            TimerFixedTimeDate => "Timer event uses a fixed timeDate",
            TimerValueWithoutPlaceholder => "Timer value contains no expression placeholder",
            TimerDefinitionValid => "Timer event definition is valid",
            ConditionalVariableNameMissing => "Conditional event declares no variableName",
            ConditionalVariableEventsMissing => "Conditional event declares no variableEvents",
            ConditionalTypeMissingExpressionPresent => {
                "Condition type missing, treating present expression as type 'expression'"
            }
            ConditionalTypeNotExpression => "Condition type is not 'expression'",
            ConditionalExpressionMissing => "Condition of type 'expression' has no expression",
            ConditionalEventValid => "Conditional event definition is valid",
            UserTaskListenerMissing => "User task declares no task listener",
            UserTaskListenerClassNotFound => "User task listener class not found in the plugin",
            UserTaskListenerInvalidType => {
                "User task listener neither extends the default listener nor implements the listener interface"
            }
            UserTaskListenerValid => "User task listener is valid",
            ExecutionListenerClassNotFound => "Execution listener class not found in the plugin",
            ExecutionListenerClassesValid => "All execution listener classes were found",
            UnparsableFhirResource => "FHIR resource could not be parsed",
            ReadAccessTagMissing => "meta.tag carries no read-access tag",
            ReadAccessTagInvalid => {
                "First meta.tag is not the read-access tag with code ALL"
            }
            ReadAccessTagValid => "Read-access tag is present",
            ActivityDefinitionUrlMissing => "ActivityDefinition url is missing or blank",
            ActivityDefinitionUrlFound => "ActivityDefinition url is present",
            ActivityDefinitionStatusNotUnknown => "ActivityDefinition status is not 'unknown'",
            ActivityDefinitionKindNotTask => "ActivityDefinition kind is not 'Task'",
            ActivityDefinitionProfileInvalid => {
                "meta.profile is not the activity-definition profile without version suffix"
            }
            ProcessAuthorizationExtensionMissing => {
                "ActivityDefinition declares no process-authorization extension"
            }
            ProcessAuthorizationRequesterMissing => {
                "Process-authorization extension declares no requester"
            }
            ProcessAuthorizationRecipientMissing => {
                "Process-authorization extension declares no recipient"
            }
            ProcessAuthorizationCodingSystemInvalid => {
                "Authorization coding system is not the process-authorization code system"
            }
            ProcessAuthorizationCodeUnknown => "Authorization code is not a known code",
            ProcessAuthorizationValid => "Process-authorization extension is valid",
            StructureDefinitionUrlMissing => "StructureDefinition url is missing or blank",
            StructureDefinitionUrlInvalid => {
                "StructureDefinition url does not start with http://dsf.dev/fhir/StructureDefinition/"
            }
            StructureDefinitionStatusNotUnknown => "StructureDefinition status is not 'unknown'",
            StructureDefinitionVersionPlaceholderMissing => {
                "StructureDefinition version does not contain #{version}"
            }
            StructureDefinitionDatePlaceholderMissing => {
                "StructureDefinition date does not contain #{date}"
            }
            StructureDefinitionDifferentialMissing => "StructureDefinition has no differential",
            StructureDefinitionSnapshotPresent => {
                "StructureDefinition ships a snapshot; differential-only is expected"
            }
            ElementIdMissing => "Differential element has no id",
            ElementIdDuplicate => "Differential element id occurs more than once",
            SliceMaxExceedsBaseMax => "Slice max cardinality exceeds the base element max",
            SliceMinSumExceedsMax => "Sum of slice min cardinalities exceeds the base element max",
            SliceMinSumAboveBaseMin => {
                "Sum of slice min cardinalities exceeds the base element min"
            }
            CodeSystemUrlMissing => "CodeSystem url is missing or blank",
            CodeSystemStatusNotUnknown => "CodeSystem status is not 'unknown'",
            CodeSystemVersionPlaceholderMissing => "CodeSystem version does not contain #{version}",
            CodeSystemDatePlaceholderMissing => "CodeSystem date does not contain #{date}",
            CodeSystemConceptCodeDuplicate => "CodeSystem concept code occurs more than once",
            ValueSetUrlMissing => "ValueSet url is missing or blank",
            ValueSetStatusNotUnknown => "ValueSet status is not 'unknown'",
            ValueSetVersionPlaceholderMissing => "ValueSet version does not contain #{version}",
            ValueSetDatePlaceholderMissing => "ValueSet date does not contain #{date}",
            ValueSetIncludedCodeSystemNotFound => {
                "ValueSet include references no known CodeSystem"
            }
            ValueSetIncludedCodeSystemFound => "ValueSet include references a known CodeSystem",
            QuestionnaireUrlMissing => "Questionnaire url is missing or blank",
            QuestionnaireStatusNotUnknown => "Questionnaire status is not 'unknown'",
            QuestionnaireVersionPlaceholderMissing => {
                "Questionnaire version does not contain #{version}"
            }
            QuestionnaireItemLinkIdDuplicate => "Questionnaire item linkId occurs more than once",
            QuestionnaireBusinessKeyItemMissing => {
                "Questionnaire declares no business-key item"
            }
            QuestionnaireUserTaskIdItemMissing => {
                "Questionnaire declares no user-task-id item"
            }
            TaskProfileMissing => "Task declares no profile",
            TaskProfileStructureDefinitionNotFound => {
                "Task profile references no known StructureDefinition"
            }
            TaskInstantiatesCanonicalMissing => "Task instantiatesCanonical is missing or blank",
            TaskUnknownInstantiatesCanonical => {
                "Task instantiatesCanonical references no known ActivityDefinition"
            }
            ActivityDefinitionExists => "Referenced ActivityDefinition exists",
            TaskStatusNotDraft => "Task status is not 'draft'",
            TaskMessageNameInputMissing => "Task declares no message-name input",
            RuleEvaluationFailed => "Rule evaluation failed",
            TimedOut => "Deadline expired, report is partial",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

/// One lint finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintItem {
    pub severity: Severity,
    pub kind: RuleKind,
    /// File name or BPMN element id the finding is anchored to
    pub location: String,
    /// Canonical url, process id, or the file short name; never empty
    pub reference: String,
    pub message: String,
}

impl LintItem {
    /// Create an item with the kind's default severity and message
    pub fn new(kind: RuleKind, location: impl Into<String>, reference: impl Into<String>) -> Self {
        let reference = non_empty(reference.into(), &kind);
        Self {
            severity: kind.default_severity(),
            kind,
            location: location.into(),
            reference,
            message: kind.default_message().to_string(),
        }
    }

    /// Override the message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Override the severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

fn non_empty(reference: String, kind: &RuleKind) -> String {
    if reference.trim().is_empty() {
        kind.as_code().to_string()
    } else {
        reference
    }
}

/// Which pipeline phase produced a section of the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Producer {
    Discovery,
    Resolver,
    Bpmn,
    Fhir,
    Orchestrator,
}

impl std::fmt::Display for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Producer::Discovery => write!(f, "plugin discovery"),
            Producer::Resolver => write!(f, "resource resolution"),
            Producer::Bpmn => write!(f, "bpmn"),
            Producer::Fhir => write!(f, "fhir"),
            Producer::Orchestrator => write!(f, "orchestrator"),
        }
    }
}

/// Items of one producer, in emission order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub producer: Producer,
    pub items: Vec<LintItem>,
}

/// Aggregate counts over a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounts {
    pub success: usize,
    pub info: usize,
    pub warning: usize,
    pub error: usize,
}

impl ReportCounts {
    pub fn total(&self) -> usize {
        self.success + self.info + self.warning + self.error
    }
}

/// The full lint report: ordered sections, one per producer run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub sections: Vec<ReportSection>,
    pub timed_out: bool,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section; empty sections are kept so the report shape is stable
    pub fn push_section(&mut self, producer: Producer, items: Vec<LintItem>) {
        self.sections.push(ReportSection { producer, items });
    }

    /// All items in emission order
    pub fn items(&self) -> impl Iterator<Item = &LintItem> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }

    pub fn counts(&self) -> ReportCounts {
        let mut counts = ReportCounts::default();
        for item in self.items() {
            match item.severity {
                Severity::Success => counts.success += 1,
                Severity::Info => counts.info += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Error => counts.error += 1,
            }
        }
        counts
    }

    pub fn has_errors(&self) -> bool {
        self.items().any(|i| i.severity == Severity::Error)
    }

    /// Exit disposition, honoring the no-fail flag
    pub fn disposition(&self, no_fail: bool) -> ExitDisposition {
        if self.has_errors() && !no_fail {
            ExitDisposition::ErrorsPresent
        } else {
            ExitDisposition::Ok
        }
    }
}

/// How the run ended, as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitDisposition {
    Ok,
    ErrorsPresent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_severity_matches_catalogue() {
        assert_eq!(
            RuleKind::BpmnProcessIdPatternMismatch.default_severity(),
            Severity::Error
        );
        assert_eq!(
            RuleKind::BpmnProcessHistoryTimeToLiveMissing.default_severity(),
            Severity::Warning
        );
        assert_eq!(
            RuleKind::TimerFixedTimeDate.default_severity(),
            Severity::Info
        );
        assert_eq!(
            RuleKind::ServiceLoaderRegistrationFound.default_severity(),
            Severity::Success
        );
    }

    #[test]
    fn item_reference_is_never_empty() {
        let item = LintItem::new(RuleKind::BpmnProcessIdEmpty, "file.bpmn", "  ");
        assert!(!item.reference.trim().is_empty());
    }

    #[test]
    fn report_counts_and_disposition() {
        let mut report = Report::new();
        report.push_section(
            Producer::Bpmn,
            vec![
                LintItem::new(RuleKind::BpmnProcessIdValid, "f.bpmn", "a_b"),
                LintItem::new(RuleKind::BpmnProcessNotExecutable, "f.bpmn", "a_b"),
            ],
        );
        let counts = report.counts();
        assert_eq!(counts.success, 1);
        assert_eq!(counts.error, 1);
        assert_eq!(report.disposition(false), ExitDisposition::ErrorsPresent);
        assert_eq!(report.disposition(true), ExitDisposition::Ok);
    }

    #[test]
    fn message_override_keeps_kind() {
        let item = LintItem::new(
            RuleKind::ActivityDefinitionStatusNotUnknown,
            "ad.xml",
            "http://example.com/ad",
        )
        .with_message("status must be 'unknown' but was 'active'");
        assert_eq!(item.kind, RuleKind::ActivityDefinitionStatusNotUnknown);
        assert!(item.message.contains("active"));
    }
}
