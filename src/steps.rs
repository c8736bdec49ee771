// ABOUTME: Fixed ordered list of assessment workflow steps
// ABOUTME: Used for display ordering and for the preconditions of workflow actions

pub const SELECT_CERTIFICATION: &str = "select_certification";
pub const COLLECT_RESPONSES: &str = "collect_responses";

/// Step the backend places a freshly created workflow on.
pub const INITIAL_STEP: &str = SELECT_CERTIFICATION;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDefinition {
    pub key: &'static str,
    pub label: &'static str,
}

pub const WORKFLOW_STEPS: &[StepDefinition] = &[
    StepDefinition {
        key: SELECT_CERTIFICATION,
        label: "Select certification",
    },
    StepDefinition {
        key: "generate_questions",
        label: "Generate questions",
    },
    StepDefinition {
        key: "create_assessment",
        label: "Create assessment",
    },
    StepDefinition {
        key: "distribute_assessment",
        label: "Distribute assessment",
    },
    StepDefinition {
        key: COLLECT_RESPONSES,
        label: "Collect responses",
    },
    StepDefinition {
        key: "analyze_gaps",
        label: "Analyze gaps",
    },
    StepDefinition {
        key: "generate_presentation",
        label: "Generate presentation",
    },
    StepDefinition {
        key: "deliver_results",
        label: "Deliver results",
    },
];

pub fn step_index(key: &str) -> Option<usize> {
    WORKFLOW_STEPS.iter().position(|s| s.key == key)
}

/// Human label for a step key; unknown keys are shown as-is.
pub fn step_label(key: &str) -> &str {
    WORKFLOW_STEPS
        .iter()
        .find(|s| s.key == key)
        .map(|s| s.label)
        .unwrap_or(key)
}

/// "3/8"-style position for display, if the step is known.
pub fn step_position(key: &str) -> Option<String> {
    step_index(key).map(|i| format!("{}/{}", i + 1, WORKFLOW_STEPS.len()))
}
