//! tenet - decision logging and compliance checks from the command line
//!
//! Usage:
//!   tenet --check full [--messages sample.json]
//!   tenet --check daily
//!   tenet --decide communication --input inputs.json
//!   tenet --status --json
//!
//! Data problems (unreadable inputs, corrupt logs) are reported and the
//! command still exits 0. Only a bad policy file or an unusable data
//! directory aborts.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Parser, ValueEnum};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing_subscriber::EnvFilter;

use tenet_core::trees::{BUILD_NEW_FEATURE, FIX_MAINTENANCE};
use tenet_core::{
    AuditStore, ComplianceMonitor, ComplianceSnapshot, DailyReport, DecisionDraft,
    DecisionOutcome, MessageSample, Orchestrator, Policy, SystemClock,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CheckKind {
    /// Run the communication, transparency, and safety checks now
    Full,
    /// Summarize the last day of checks
    Daily,
}

#[derive(Parser, Debug)]
#[command(name = "tenet", version)]
#[command(about = "Decision logging and compliance auditing for autonomous agents")]
#[command(group(
    ArgGroup::new("command")
        .required(true)
        .args(["check", "log_decision", "decide", "status"])
))]
struct Args {
    /// Run a compliance check
    #[arg(long, value_enum, value_name = "KIND")]
    check: Option<CheckKind>,

    /// Log a fixed example decision
    #[arg(long)]
    log_decision: bool,

    /// Run one decision tree and record the result
    #[arg(long, value_name = "SCENARIO")]
    decide: Option<String>,

    /// JSON inputs for --decide ("-" reads stdin)
    #[arg(long, value_name = "FILE", requires = "decide")]
    input: Option<PathBuf>,

    /// JSON array of recent outbound messages for --check full
    #[arg(long, value_name = "FILE")]
    messages: Option<PathBuf>,

    /// Show the latest compliance snapshot and recent alerts
    #[arg(long)]
    status: bool,

    /// Directory holding the audit logs
    #[arg(long, value_name = "DIR", default_value = "compliance")]
    data_dir: PathBuf,

    /// Policy file (YAML or JSON); built-in defaults otherwise
    #[arg(long, value_name = "FILE")]
    policy: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,

    /// Verbosity level (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let policy = match &args.policy {
        Some(path) => Policy::from_file(path)
            .with_context(|| format!("Failed to load policy from {}", path.display()))?,
        None => Policy::default(),
    };
    let store = AuditStore::open(&args.data_dir, &policy.retention)
        .with_context(|| format!("Cannot use data directory {}", args.data_dir.display()))?;
    let monitor = Arc::new(ComplianceMonitor::new(store, policy, Arc::new(SystemClock)));

    if let Some(kind) = args.check {
        match kind {
            CheckKind::Full => check_full(&monitor, args.messages.as_deref(), args.json),
            CheckKind::Daily => check_daily(&monitor, args.json),
        }
    } else if args.log_decision {
        log_example_decision(&monitor, args.json);
    } else if let Some(scenario) = &args.decide {
        decide(monitor, scenario, args.input.as_deref(), args.json);
    } else if args.status {
        status(&monitor, args.json);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tenet={level},tenet_core={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn check_full(monitor: &ComplianceMonitor, messages: Option<&Path>, as_json: bool) {
    let messages = messages.map(load_messages).unwrap_or_default();
    let snapshot = monitor.run_compliance_check(&messages);

    if as_json {
        print_json(&snapshot);
        return;
    }
    print_snapshot(&snapshot);
    if snapshot.compliance_score < monitor.policy().thresholds.alert_score {
        println!("\nAlert raised: score below {:.2}", monitor.policy().thresholds.alert_score);
    }
}

fn check_daily(monitor: &ComplianceMonitor, as_json: bool) {
    let Some(report) = monitor.generate_daily_report() else {
        if as_json {
            print_json(&JsonValue::Null);
        } else {
            println!("No compliance data for the last day; run `tenet --check full` first.");
        }
        return;
    };

    if as_json {
        print_json(&report);
    } else {
        print_report(&report);
    }
}

fn log_example_decision(monitor: &ComplianceMonitor, as_json: bool) {
    let draft = DecisionDraft::new(
        "maintenance_vs_feature",
        vec![FIX_MAINTENANCE.to_string(), BUILD_NEW_FEATURE.to_string()],
        FIX_MAINTENANCE,
        "Example entry: the flaky deploy step threatens stability, so maintenance goes first.",
    )
    .with_score(0.85);

    let outcome = monitor.log_decision(draft);
    print_outcome(&outcome, as_json);
}

fn decide(monitor: Arc<ComplianceMonitor>, scenario: &str, input: Option<&Path>, as_json: bool) {
    let inputs = input.map(load_inputs).unwrap_or(JsonValue::Null);
    let orchestrator = Orchestrator::new(monitor);

    match orchestrator.make_decision(scenario, &inputs) {
        Ok(outcome) => print_outcome(&outcome, as_json),
        Err(e) => {
            let known: Vec<&str> = orchestrator.scenarios().iter().map(|s| s.as_str()).collect();
            eprintln!("{} (known: {})", e, known.join(", "));
        }
    }
}

fn status(monitor: &ComplianceMonitor, as_json: bool) {
    let latest = monitor.latest_snapshot();
    let alerts = monitor.recent_alerts(5);

    if as_json {
        print_json(&json!({ "latest_snapshot": latest, "recent_alerts": alerts }));
        return;
    }

    match &latest {
        Some(snapshot) => print_snapshot(snapshot),
        None => println!("No compliance checks recorded yet."),
    }
    if !alerts.is_empty() {
        println!("\nRecent alerts:");
        for alert in &alerts {
            println!(
                "  [{}] {:?}: {}",
                alert.timestamp.format("%Y-%m-%d %H:%M"),
                alert.severity,
                alert.message
            );
        }
    }
}

fn print_outcome(outcome: &DecisionOutcome, as_json: bool) {
    if as_json {
        print_json(outcome);
        return;
    }

    let decision = &outcome.decision;
    println!("Decision {}", decision.id);
    println!("  Scenario:  {}", decision.scenario);
    println!("  Chosen:    {}", decision.chosen);
    println!("  Options:   {}", decision.options.join(" | "));
    if let Some(score) = decision.score {
        println!("  Score:     {:.2}", score);
    }
    println!("  Reasoning: {}", decision.reasoning);
    if let Some(violation) = &outcome.violation {
        println!("  Flagged:   {}", violation.kind);
    }
    if let tenet_core::LogStatus::Failed { reason } = &outcome.log_status {
        println!("  Not recorded: {}", reason);
    }
}

fn print_snapshot(snapshot: &ComplianceSnapshot) {
    println!(
        "Compliance score: {:.2} at {}{}",
        snapshot.compliance_score,
        snapshot.timestamp.format("%Y-%m-%d %H:%M"),
        if snapshot.quiet_hours { " (quiet hours)" } else { "" }
    );
    for (name, check) in snapshot.checks.iter() {
        println!(
            "  {:<13} {} ({} violations)",
            name,
            if check.passed { "pass" } else { "FAIL" },
            check.violations.len()
        );
    }
}

fn print_report(report: &DailyReport) {
    println!("Daily compliance report for {}", report.date);
    println!("  Checks:          {}", report.snapshot_count);
    println!("  Average score:   {:.2}", report.average_score);
    println!("  Violations:      {}", report.total_violations);
    println!("  Quiet-hour runs: {}", report.quiet_hours_checks);
    for (kind, count) in &report.violation_counts {
        println!("    {}: {}", kind, count);
    }
    if report.recommendations.is_empty() {
        println!("\nNo recommendations.");
    } else {
        println!("\nRecommendations:");
        for recommendation in &report.recommendations {
            println!("  [{:?}] {}", recommendation.priority, recommendation.message);
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to render JSON: {}", e),
    }
}

fn load_messages(path: &Path) -> Vec<MessageSample> {
    let parsed = fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|text| serde_json::from_str(&text).map_err(anyhow::Error::from));
    parsed.unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable message sample");
        Vec::new()
    })
}

fn load_inputs(path: &Path) -> JsonValue {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map(|_| buf)
    } else {
        fs::read_to_string(path)
    };

    let parsed = text
        .map_err(anyhow::Error::from)
        .and_then(|text| serde_json::from_str(&text).map_err(anyhow::Error::from));
    parsed.unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Unreadable decision inputs, using defaults");
        JsonValue::Null
    })
}
