use std::fmt::Write;

use chrono::{Local, TimeZone};
use stackflow_core::{
    ActiveStage, AppViewModel, InputKind, JobStatus, LogKind, Millis, Stage,
};

use super::constants::*;

/// Renders the whole dashboard as plain text.
pub fn render(view: &AppViewModel) -> String {
    let mut out = String::new();
    let _ = render_into(&mut out, view);
    out
}

fn render_into(out: &mut String, view: &AppViewModel) -> std::fmt::Result {
    writeln!(out, "{TITLE}")?;
    if view.credential_missing {
        writeln!(out, "{CREDENTIAL_BANNER}")?;
    }
    writeln!(out, "{RULE}")?;

    writeln!(out, "{}", pipeline_line(view.active_stage))?;
    let stats = &view.stats;
    writeln!(
        out,
        "processed {} | avg {}ms | queue {} | success {}%",
        stats.completed_jobs, stats.avg_processing_ms, stats.queue_depth, stats.success_rate
    )?;
    if let Some(last) = view.history.last() {
        writeln!(
            out,
            "last run {}ms at {} ({} samples)",
            last.duration_ms,
            last.time,
            view.history.len()
        )?;
    }
    writeln!(out, "{RULE}")?;

    // Completed jobs move to the report panel; the list shows the rest.
    let open: Vec<_> = view
        .jobs
        .iter()
        .filter(|job| job.status != JobStatus::Completed)
        .collect();
    writeln!(out, "Jobs ({})", open.len())?;
    for job in open.iter().rev().take(JOB_ROWS) {
        writeln!(
            out,
            "  #{:<4} {} {:<10} {:<8} {} {}",
            job.job_id,
            clock(job.created_at),
            job.status.to_string(),
            job.stage.to_string(),
            kind_tag(job.kind, job.status),
            clip(&job.input, INPUT_WIDTH)
        )?;
    }

    if let Some(report) = &view.latest_result {
        writeln!(out, "{RULE}")?;
        writeln!(out, "Latest report")?;
        for line in report.lines() {
            writeln!(out, "  {line}")?;
        }
    }

    writeln!(out, "{RULE}")?;
    let skip = view.logs.len().saturating_sub(LOG_TAIL);
    for entry in view.logs.iter().skip(skip) {
        writeln!(
            out,
            "{} {:<6} {:<7} {}",
            clock(entry.timestamp),
            entry.source.to_string(),
            kind_label(entry.kind),
            entry.message
        )?;
    }
    writeln!(out, "{RULE}")?;
    if !view.credential_missing {
        write!(out, "{PROMPT}")?;
    }
    Ok(())
}

fn pipeline_line(active: ActiveStage) -> String {
    let stages = [
        Stage::Queued,
        Stage::Scraping,
        Stage::AiAnalysis,
        Stage::Saving,
    ];
    let cells: Vec<String> = stages
        .iter()
        .map(|stage| {
            if active == ActiveStage::Stage(*stage) {
                format!("[{stage}]")
            } else {
                format!(" {stage} ")
            }
        })
        .collect();
    format!("{} -> {active}", cells.join(">"))
}

fn kind_tag(kind: InputKind, status: JobStatus) -> &'static str {
    match (status, kind) {
        (JobStatus::Failed, _) => "[x]",
        (_, InputKind::Url) => "url",
        (_, InputKind::Topic) => "txt",
    }
}

fn kind_label(kind: LogKind) -> &'static str {
    match kind {
        LogKind::Info => "info",
        LogKind::Success => "success",
        LogKind::Error => "error",
        LogKind::System => "system",
    }
}

fn clock(at: Millis) -> String {
    Local
        .timestamp_millis_opt(at)
        .single()
        .map(|time| time.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

fn clip(text: &str, width: usize) -> String {
    let single_line = text.replace(['\n', '\r'], " ");
    if single_line.chars().count() <= width {
        return single_line;
    }
    let mut clipped: String = single_line.chars().take(width.saturating_sub(3)).collect();
    clipped.push_str("...");
    clipped
}
