use crate::cli::{ReportArgs, ScreenArgs, SessionArgs};
use crate::infra::ConsoleNotificationSink;
use aml_screening::config::AppConfig;
use aml_screening::error::AppError;
use aml_screening::screening::views::{CaseReport, RankedMatch, RiskScreening, Severity};
use aml_screening::screening::{
    DetailBody, DetailView, HttpScreeningGateway, JsonFileResultStore, ScreeningOrchestrator,
    SessionView,
};
use aml_screening::telemetry::{self, LogSink};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::info;

type CliOrchestrator =
    ScreeningOrchestrator<HttpScreeningGateway, JsonFileResultStore, ConsoleNotificationSink>;

fn open_orchestrator(args: &SessionArgs) -> Result<CliOrchestrator, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogSink::Stderr)?;

    let store = JsonFileResultStore::open(&args.session_file)?;
    info!(path = %args.session_file.display(), session = %args.session, "opened session file");

    Ok(ScreeningOrchestrator::new(
        Arc::new(HttpScreeningGateway::new(config.gateways)),
        Arc::new(store),
        Arc::new(ConsoleNotificationSink),
    ))
}

pub(crate) async fn run_screen(args: ScreenArgs) -> Result<(), AppError> {
    let orchestrator = open_orchestrator(&args.session)?;
    let session = &args.session.session;

    let handle = orchestrator.submit(session, args.subject_form())?;
    println!("Screening submitted for session {session}; waiting for all gateways");
    handle.settled().await;

    let view = orchestrator.session_view(session)?;
    print!("{}", render_session(&view));
    Ok(())
}

pub(crate) fn run_status(args: SessionArgs) -> Result<(), AppError> {
    let orchestrator = open_orchestrator(&args)?;
    let view = orchestrator.session_view(&args.session)?;
    print!("{}", render_session(&view));
    Ok(())
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let orchestrator = open_orchestrator(&args.session)?;
    let view = orchestrator.detail_view(&args.session.session, &args.view_id, &args.case_query())?;
    print!("{}", render_detail(&view));
    Ok(())
}

pub(crate) fn run_clear(args: SessionArgs) -> Result<(), AppError> {
    let orchestrator = open_orchestrator(&args)?;
    orchestrator.clear(&args.session)?;
    println!("Session {} cleared", args.session);
    Ok(())
}

pub(crate) fn render_session(view: &SessionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Session: {}", view.session_id);
    match &view.display_name {
        Some(name) => {
            let _ = writeln!(out, "Subject: {name}");
        }
        None if view.submitted => {
            let _ = writeln!(out, "Subject: (stored form is incomplete)");
        }
        None => {
            let _ = writeln!(out, "Subject: none submitted");
            return out;
        }
    }

    let _ = writeln!(out, "\nGateway calls");
    for call in &view.calls {
        let _ = write!(out, "  {}. {:<30} {}", call.gateway.number(), call.label, call.status);
        if let Some(reason) = &call.reason {
            let _ = write!(out, " ({reason})");
        }
        out.push('\n');
    }
    if view.all_settled {
        let _ = writeln!(out, "\nAll gateways settled.");
    }
    out
}

pub(crate) fn render_detail(view: &DetailView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.title);
    let _ = writeln!(out, "{}", "=".repeat(view.title.chars().count()));

    match &view.body {
        DetailBody::Message { message } => {
            let _ = writeln!(out, "{message}");
        }
        DetailBody::Markdown(markdown) => {
            let _ = writeln!(out, "{}", markdown.source.trim_end());
        }
        DetailBody::CaseReport(report) => render_case_report(&mut out, report),
        DetailBody::RiskScreening(screening) => render_risk_screening(&mut out, screening),
    }
    out
}

fn render_case_report(out: &mut String, report: &CaseReport) {
    let _ = writeln!(out, "Subject: {}", report.subject.name);
    if !report.subject.identifier.is_empty() {
        let _ = writeln!(out, "Identifier: {}", report.subject.identifier);
    }
    let summary = &report.summary;
    let _ = writeln!(out, "Overall risk: {}", summary.overall_risk_level);
    let _ = writeln!(
        out,
        "Cases: {} total, {} lost, {} won, {} pending",
        summary.total_cases, summary.lost_cases, summary.won_cases, summary.pending_cases
    );

    if !report.narrative_summary.is_empty() {
        let _ = writeln!(out, "\n{}", report.narrative_summary);
    }

    if !report.flagged_categories.is_empty() {
        let _ = writeln!(out, "\nFlagged categories");
        for flag in &report.flagged_categories {
            let _ = writeln!(out, "  - {} ({})", flag.category, flag.case_numbers.join(", "));
        }
    }

    let _ = writeln!(out, "\nCase history");
    if let Some(notice) = &report.notice {
        let _ = writeln!(out, "  {notice}");
        return;
    }
    for case in &report.cases {
        let _ = writeln!(
            out,
            "  {:<14} {:<12} {:<8} {} [{} flags]",
            case.case_number,
            case.decision_date,
            case.outcome_for_subject,
            case.case_topic,
            case.aml_esg_dd_flags_in_case.len()
        );
    }
}

fn render_risk_screening(out: &mut String, screening: &RiskScreening) {
    let _ = writeln!(out, "Result: {}", screening.result);
    if !screening.subject.requested_names.is_empty() {
        let _ = writeln!(
            out,
            "Requested names: {}",
            screening.subject.requested_names.join(", ")
        );
    }
    if let Some(conclusion) = &screening.conclusion {
        let marker = match conclusion.severity {
            Severity::Critical => "CRITICAL",
            Severity::Advisory => "note",
        };
        let _ = writeln!(out, "\nRisk conclusion [{marker}]: {}", conclusion.text);
    }
    if let Some(best) = &screening.best_match {
        let _ = writeln!(out, "\nBest match");
        render_match(out, best);
    }
    if !screening.alternate_candidates.is_empty() {
        let _ = writeln!(out, "\nOther high score candidates");
        for candidate in &screening.alternate_candidates {
            render_match(out, candidate);
        }
    }
}

fn render_match(out: &mut String, ranked: &RankedMatch) {
    let _ = write!(
        out,
        "  {} (name {}/100, entity {}/100)",
        ranked.name, ranked.best_name_score, ranked.entity_score
    );
    if let Some(confidence) = ranked.confidence {
        let _ = write!(out, " confidence {confidence:?}");
    }
    out.push('\n');
    if !ranked.risk_tags.is_empty() {
        let tags: Vec<&str> = ranked.risk_tags.iter().map(|tag| tag.label.as_str()).collect();
        let _ = writeln!(out, "    tags: {}", tags.join(", "));
    }
    if !ranked.reason_listed.is_empty() {
        let _ = writeln!(out, "    listed: {}", ranked.reason_listed);
    }
    if let Some(updated) = ranked.last_updated_display.as_deref() {
        let _ = writeln!(out, "    updated: {updated}");
    }
    for link in &ranked.adverse_media_links {
        let _ = writeln!(out, "    media: {link}");
    }
}
