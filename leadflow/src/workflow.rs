//! Lead lifecycle stage graph.
//!
//! This module is the single source of truth for the legal lifecycle of a
//! lead: which stages exist, who owns them, and which transitions are
//! allowed. Both UI action rendering and the reconciler's transition
//! validation consume the same [`WorkflowGraph`].
//!
//! The graph is **data**: a catalog of [`Stage`] entries (serde-friendly, so
//! deployments can load their own) with three kinds of outgoing edges per
//! stage — the happy-path `advance_to`, the failure-exit `fail_to`, and an
//! `optional_to` side branch. `Rejected` is additionally reachable from
//! every non-terminal stage as an implicit fail-exit.
//!
//! # Examples
//!
//! ```
//! use leadflow::workflow::WorkflowGraph;
//!
//! let graph = WorkflowGraph::standard();
//!
//! // First option is the caller's "primary" action.
//! let options = graph.next_options("Credit_Review");
//! assert_eq!(options[0].code, "Sanctioned");
//!
//! // Idempotent self-transitions are always legal.
//! assert!(graph.is_valid_transition("Login", "Login"));
//!
//! // Terminal stages have no way out.
//! assert!(graph.next_options("Disbursed").is_empty());
//! ```

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stage code of the entry point every lead starts at.
pub const SUBMITTED: &str = "Submitted";

/// Stage code of the universal failure exit.
pub const REJECTED: &str = "Rejected";

/// The actor responsible for advancing a lead out of a stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Agent,
    Admin,
    Credit,
    Field,
    Ops,
    Finance,
    /// Automated or shared ownership; also the fallback for synthetic stages.
    #[default]
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Agent => "Agent",
            Role::Admin => "Admin",
            Role::Credit => "Credit",
            Role::Field => "Field",
            Role::Ops => "Ops",
            Role::Finance => "Finance",
            Role::System => "System",
        };
        write!(f, "{name}")
    }
}

/// One named point in the lead lifecycle.
///
/// `advance_to` is absent for terminal stages; `fail_to` and `optional_to`
/// are sparse. Upstream sources may report status strings the catalog does
/// not know — see [`WorkflowGraph::get_stage`] for how those are absorbed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub code: String,
    pub label: String,
    /// Position along the happy path, 0–100, monotonic.
    pub progress_percent: u8,
    #[serde(default)]
    pub owning_role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advance_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_to: Option<String>,
    #[serde(default)]
    pub is_terminal: bool,
}

impl Stage {
    /// Placeholder stage for codes the catalog does not know.
    ///
    /// Upstream sources introduce ad hoc status strings; callers get a
    /// usable definition instead of an error.
    #[must_use]
    pub fn synthetic(code: &str) -> Self {
        Stage {
            code: code.to_string(),
            label: code.to_string(),
            progress_percent: 0,
            owning_role: Role::System,
            advance_to: None,
            fail_to: None,
            optional_to: None,
            is_terminal: false,
        }
    }

    fn entry(
        code: &str,
        label: &str,
        progress_percent: u8,
        owning_role: Role,
        advance_to: Option<&str>,
        fail_to: Option<&str>,
        optional_to: Option<&str>,
        is_terminal: bool,
    ) -> Self {
        Stage {
            code: code.to_string(),
            label: label.to_string(),
            progress_percent,
            owning_role,
            advance_to: advance_to.map(str::to_string),
            fail_to: fail_to.map(str::to_string),
            optional_to: optional_to.map(str::to_string),
            is_terminal,
        }
    }
}

/// Catalog validation failures for user-supplied stage tables.
#[derive(Debug, Error, Diagnostic)]
pub enum WorkflowError {
    #[error("duplicate stage code: {code}")]
    #[diagnostic(code(leadflow::workflow::duplicate_stage))]
    DuplicateStage { code: String },

    #[error("stage {from} routes to unknown stage {to}")]
    #[diagnostic(
        code(leadflow::workflow::unknown_target),
        help("Every advance_to/fail_to/optional_to must name a stage in the catalog.")
    )]
    UnknownTarget { from: String, to: String },

    #[error("required stage missing from catalog: {code}")]
    #[diagnostic(
        code(leadflow::workflow::missing_required_stage),
        help("The catalog must contain both the Submitted entry stage and the Rejected exit.")
    )]
    MissingRequiredStage { code: &'static str },

    #[error("terminal stage {code} has outgoing edges")]
    #[diagnostic(code(leadflow::workflow::terminal_with_edges))]
    TerminalWithEdges { code: String },
}

/// Static directed graph of lead lifecycle stages.
///
/// Pure and stateless: construction validates the catalog once, every query
/// afterwards is a lookup. Unknown stage codes are handled, not thrown.
#[derive(Clone, Debug)]
pub struct WorkflowGraph {
    stages: Vec<Stage>,
}

impl WorkflowGraph {
    /// The built-in loan pipeline catalog.
    #[must_use]
    pub fn standard() -> Self {
        let stages = vec![
            Stage::entry("Submitted", "Lead Submitted", 10, Role::Agent, None, None, None, false),
            Stage::entry(
                "Docs_Validation",
                "Document Verification",
                20,
                Role::Ops,
                Some("Login"),
                Some("Docs_Pending"),
                None,
                false,
            ),
            Stage::entry(
                "Docs_Pending",
                "Docs Pending (Action Req)",
                15,
                Role::Agent,
                Some("Docs_Validation"),
                None,
                None,
                false,
            ),
            Stage::entry(
                "Login",
                "Bank Login Done",
                30,
                Role::Admin,
                Some("Credit_Review"),
                None,
                None,
                false,
            ),
            Stage::entry(
                "Credit_Review",
                "Underwriting",
                45,
                Role::Credit,
                Some("Sanctioned"),
                Some("Rejected"),
                Some("PD_Scheduled"),
                false,
            ),
            Stage::entry(
                "PD_Scheduled",
                "Field Investigation",
                55,
                Role::Field,
                Some("Credit_Review"),
                None,
                None,
                false,
            ),
            Stage::entry(
                "Sanctioned",
                "Sanction Letter Issued",
                70,
                Role::Admin,
                Some("Offer_Accepted"),
                None,
                None,
                false,
            ),
            Stage::entry(
                "Offer_Accepted",
                "Offer Accepted by Client",
                80,
                Role::Agent,
                Some("Agreement_Stage"),
                None,
                None,
                false,
            ),
            Stage::entry(
                "Agreement_Stage",
                "Agreement & eNACH",
                90,
                Role::Ops,
                Some("Disbursed"),
                None,
                None,
                false,
            ),
            Stage::entry("Disbursed", "Funds Disbursed", 100, Role::Finance, None, None, None, true),
            Stage::entry("Rejected", "File Closed / Rejected", 100, Role::System, None, None, None, true),
        ];
        Self::from_stages(stages).expect("builtin catalog is valid")
    }

    /// Build a graph from a user-supplied catalog, validating its invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] when stage codes collide, an edge targets
    /// an unknown stage, `Submitted`/`Rejected` are missing, or a terminal
    /// stage carries outgoing edges.
    pub fn from_stages(stages: Vec<Stage>) -> Result<Self, WorkflowError> {
        let mut seen: Vec<&str> = Vec::with_capacity(stages.len());
        for stage in &stages {
            if seen.contains(&stage.code.as_str()) {
                return Err(WorkflowError::DuplicateStage {
                    code: stage.code.clone(),
                });
            }
            seen.push(&stage.code);
        }
        for required in [SUBMITTED, REJECTED] {
            if !seen.contains(&required) {
                return Err(WorkflowError::MissingRequiredStage { code: required });
            }
        }
        for stage in &stages {
            let edges = [&stage.advance_to, &stage.fail_to, &stage.optional_to];
            if stage.is_terminal && edges.iter().any(|e| e.is_some()) {
                return Err(WorkflowError::TerminalWithEdges {
                    code: stage.code.clone(),
                });
            }
            for target in edges.into_iter().flatten() {
                if !seen.contains(&target.as_str()) {
                    return Err(WorkflowError::UnknownTarget {
                        from: stage.code.clone(),
                        to: target.clone(),
                    });
                }
            }
        }
        Ok(Self { stages })
    }

    /// The full catalog, in definition order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Look up a stage definition by code.
    ///
    /// Unknown codes yield a [`Stage::synthetic`] placeholder rather than an
    /// error — callers must tolerate ad hoc status strings from upstream
    /// sources.
    #[must_use]
    pub fn get_stage(&self, code: &str) -> Stage {
        self.find(code)
            .cloned()
            .unwrap_or_else(|| Stage::synthetic(code))
    }

    /// Legal next stages from `code`, in rendering order.
    ///
    /// Order is significant: advance target first (the primary action), then
    /// the failure exit, then the optional branch, and finally `Rejected`
    /// unless the current stage is terminal or is itself `Rejected`.
    #[must_use]
    pub fn next_options(&self, code: &str) -> Vec<Stage> {
        let current = self.get_stage(code);
        let mut options = Vec::new();
        for target in [&current.advance_to, &current.fail_to, &current.optional_to]
            .into_iter()
            .flatten()
        {
            options.push(self.get_stage(target));
        }
        // Skip the append when Rejected is already the failure exit.
        if !current.is_terminal
            && current.code != REJECTED
            && !options.iter().any(|s| s.code == REJECTED)
        {
            options.push(self.get_stage(REJECTED));
        }
        options
    }

    /// Whether a status change from `from` to `to` is legal.
    ///
    /// True when `to` appears in [`next_options`](Self::next_options), when
    /// `to == from` (idempotent no-op), or when `from` is unknown to the
    /// catalog. The last case is deliberate permissiveness: administrators
    /// must be able to force a corrective state even under inconsistent
    /// upstream data. Transitions out of *known* terminal stages remain
    /// rejected.
    #[must_use]
    pub fn is_valid_transition(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        if self.find(from).is_none() {
            return true;
        }
        self.next_options(from).iter().any(|s| s.code == to)
    }

    /// Happy-path progress percentage for a stage code.
    #[must_use]
    pub fn progress_of(&self, code: &str) -> u8 {
        self.get_stage(code).progress_percent
    }

    fn find(&self, code: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.code == code)
    }
}

impl Default for WorkflowGraph {
    fn default() -> Self {
        Self::standard()
    }
}
