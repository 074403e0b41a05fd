//! Pipeline Demo: Capture, Sync, Transition
//!
//! Drives the full lead pipeline against a file-backed local store:
//! capture a couple of leads, pull the feed through the reconciler,
//! advance one lead through the workflow, and watch the event stream a
//! UI layer would subscribe to.
//!
//! Running This Demo:
//! ```bash
//! cargo run --example pipeline_demo
//! ```

use miette::{IntoDiagnostic, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use leadflow::config::{ReconcilerConfig, StoreSelector};
use leadflow::lead::{LeadDraft, Priority};
use leadflow::reconciler::{LeadReconciler, QueryFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let dir = std::env::temp_dir().join("leadflow_demo");
    std::fs::create_dir_all(&dir).into_diagnostic()?;
    let config = ReconcilerConfig::default()
        .with_store(StoreSelector::Local {
            path: dir.join("db.json"),
        })
        .with_snapshot_path(dir.join("backup.json"));

    let mut reconciler = LeadReconciler::new(config).into_diagnostic()?;
    let events = reconciler.subscribe();

    // Capture two leads the way an agent form would.
    reconciler
        .submit(LeadDraft {
            client: "Rajesh Kumar".into(),
            phone: "9876543210".into(),
            amount: "50,00,000".into(),
            product_type: "BL".into(),
            agent: "AGENT_001".into(),
            cibil_score: Some(750),
            ..Default::default()
        })
        .await;
    let urgent = reconciler
        .submit(LeadDraft {
            client: "TechFlow Systems".into(),
            amount: "1,20,00,000".into(),
            product_type: "LAP".into(),
            agent: "AGENT_001".into(),
            priority: Priority::Urgent,
            ..Default::default()
        })
        .await;

    // Pull the canonical feed back out.
    let report = reconciler.sync().await;
    info!(count = report.leads.len(), source = ?report.source, "feed synced");

    // Render what AGENT_001 would see.
    let view = reconciler.query(&QueryFilter::for_agent("AGENT_001"));
    for lead in &view.leads {
        let stage = reconciler.graph().get_stage(&lead.status);
        info!(
            id = %lead.id,
            client = %lead.client,
            stage = %stage.label,
            progress = stage.progress_percent,
            "pipeline entry"
        );
    }

    // The urgent lead gets rejected after review.
    let options = reconciler.graph().next_options(&urgent.lead.status);
    info!(primary = %options[0].label, "available actions");
    let outcome = reconciler.transition(&urgent.lead.id, "Rejected").await;
    info!(success = outcome.success(), "transition applied");

    // Everything above was also announced on the event stream.
    for event in events.drain() {
        info!(?event, "observed");
    }

    Ok(())
}
