use leadflow::workflow::{REJECTED, Role, SUBMITTED, Stage, WorkflowError, WorkflowGraph};

#[test]
fn self_transition_is_always_legal() {
    let graph = WorkflowGraph::standard();
    for stage in graph.stages() {
        assert!(
            graph.is_valid_transition(&stage.code, &stage.code),
            "self-transition must hold for {}",
            stage.code
        );
    }
}

#[test]
fn every_non_terminal_stage_can_reach_rejected() {
    let graph = WorkflowGraph::standard();
    for stage in graph.stages() {
        if stage.is_terminal || stage.code == REJECTED {
            continue;
        }
        let options = graph.next_options(&stage.code);
        assert!(
            options.iter().any(|s| s.code == REJECTED),
            "{} is missing the Rejected exit",
            stage.code
        );
    }
}

#[test]
fn terminal_stages_have_no_options() {
    let graph = WorkflowGraph::standard();
    assert!(graph.next_options("Disbursed").is_empty());
    assert!(graph.next_options(REJECTED).is_empty());
}

#[test]
fn options_keep_rendering_order() {
    let graph = WorkflowGraph::standard();
    let options = graph.next_options("Credit_Review");
    let codes: Vec<&str> = options.iter().map(|s| s.code.as_str()).collect();
    // Advance first (the primary action), then the failure exit, then the
    // optional branch; Rejected is already present as the failure exit.
    assert_eq!(codes, vec!["Sanctioned", REJECTED, "PD_Scheduled"]);
}

#[test]
fn rejected_is_appended_when_not_a_failure_exit() {
    let graph = WorkflowGraph::standard();
    let codes: Vec<String> = graph
        .next_options("Login")
        .into_iter()
        .map(|s| s.code)
        .collect();
    assert_eq!(codes, vec!["Credit_Review".to_string(), REJECTED.to_string()]);
}

#[test]
fn submitted_only_exits_to_rejected() {
    let graph = WorkflowGraph::standard();
    let codes: Vec<String> = graph
        .next_options(SUBMITTED)
        .into_iter()
        .map(|s| s.code)
        .collect();
    assert_eq!(codes, vec![REJECTED.to_string()]);

    assert!(graph.is_valid_transition(SUBMITTED, REJECTED));
    assert!(!graph.is_valid_transition(SUBMITTED, "Disbursed"));
    assert!(!graph.is_valid_transition(SUBMITTED, "Credit_Review"));
}

#[test]
fn unknown_codes_get_a_synthetic_stage() {
    let graph = WorkflowGraph::standard();
    let stage = graph.get_stage("Adhoc_Import_State");
    assert_eq!(stage.code, "Adhoc_Import_State");
    assert_eq!(stage.label, "Adhoc_Import_State");
    assert_eq!(stage.progress_percent, 0);
    assert!(!stage.is_terminal);
}

#[test]
fn transitions_from_unknown_stages_are_permitted() {
    // Admin override: inconsistent upstream data must never lock a lead.
    let graph = WorkflowGraph::standard();
    assert!(graph.is_valid_transition("Adhoc_Import_State", "Disbursed"));
    assert!(graph.is_valid_transition("Adhoc_Import_State", REJECTED));
}

#[test]
fn transitions_out_of_known_terminals_are_rejected() {
    let graph = WorkflowGraph::standard();
    assert!(!graph.is_valid_transition("Disbursed", SUBMITTED));
    assert!(!graph.is_valid_transition(REJECTED, "Credit_Review"));
}

#[test]
fn progress_is_monotonic_along_the_happy_path() {
    let graph = WorkflowGraph::standard();
    // Walk the advance chain from document verification to disbursal; the
    // loop-back stages (Docs_Pending, PD_Scheduled) sit off this chain.
    let mut code = "Docs_Validation".to_string();
    let mut last = 0;
    loop {
        let progress = graph.progress_of(&code);
        assert!(progress >= last, "progress dipped at {code}");
        last = progress;
        match graph.get_stage(&code).advance_to {
            Some(next) => code = next,
            None => break,
        }
    }
    assert_eq!(code, "Disbursed");
}

fn minimal_stage(code: &str, terminal: bool) -> Stage {
    Stage {
        code: code.to_string(),
        label: code.to_string(),
        progress_percent: 50,
        owning_role: Role::Admin,
        advance_to: None,
        fail_to: None,
        optional_to: None,
        is_terminal: terminal,
    }
}

#[test]
fn catalog_validation_rejects_duplicates() {
    let stages = vec![
        minimal_stage(SUBMITTED, false),
        minimal_stage(SUBMITTED, false),
        minimal_stage(REJECTED, true),
    ];
    assert!(matches!(
        WorkflowGraph::from_stages(stages),
        Err(WorkflowError::DuplicateStage { .. })
    ));
}

#[test]
fn catalog_validation_rejects_unknown_targets() {
    let mut submitted = minimal_stage(SUBMITTED, false);
    submitted.advance_to = Some("Nowhere".to_string());
    let stages = vec![submitted, minimal_stage(REJECTED, true)];
    assert!(matches!(
        WorkflowGraph::from_stages(stages),
        Err(WorkflowError::UnknownTarget { .. })
    ));
}

#[test]
fn catalog_validation_requires_submitted_and_rejected() {
    let stages = vec![minimal_stage(SUBMITTED, false)];
    assert!(matches!(
        WorkflowGraph::from_stages(stages),
        Err(WorkflowError::MissingRequiredStage { code: REJECTED })
    ));
}

#[test]
fn catalog_validation_rejects_terminal_with_edges() {
    let mut rejected = minimal_stage(REJECTED, true);
    rejected.advance_to = Some(SUBMITTED.to_string());
    let stages = vec![minimal_stage(SUBMITTED, false), rejected];
    assert!(matches!(
        WorkflowGraph::from_stages(stages),
        Err(WorkflowError::TerminalWithEdges { .. })
    ));
}

#[test]
fn catalog_loads_from_json() {
    // The catalog is data: deployments can ship their own stage table.
    let stages: Vec<Stage> = serde_json::from_str(
        r#"[
            {"code": "Submitted", "label": "In", "progress_percent": 10, "owning_role": "Agent", "advance_to": "Done"},
            {"code": "Done", "label": "Done", "progress_percent": 100, "owning_role": "Finance", "is_terminal": true},
            {"code": "Rejected", "label": "Out", "progress_percent": 100, "owning_role": "System", "is_terminal": true}
        ]"#,
    )
    .unwrap();
    let graph = WorkflowGraph::from_stages(stages).unwrap();
    let codes: Vec<String> = graph
        .next_options(SUBMITTED)
        .into_iter()
        .map(|s| s.code)
        .collect();
    assert_eq!(codes, vec!["Done".to_string(), REJECTED.to_string()]);
}
