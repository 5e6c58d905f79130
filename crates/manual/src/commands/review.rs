//! Review command handlers.
//!
//! Every handler opens a session for the named manual, performs one
//! operation, waits for the store's confirmation to settle, and prints the
//! result. The session is closed by the caller.

use std::fmt::Write as _;

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::Tabled;

use manual_core::{
    ProgressStage, SessionView, Suggestion, SuggestionId, SuggestionStore, TranscriptSource,
};

use crate::cli::{CombineArgs, GlobalOpts, ManualArgs, StageArgs, SuggestionArgs};
use crate::error::CliError;
use crate::output;

use super::ReviewContext;
use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SuggestionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Decision")]
    decision: String,
    #[tabled(rename = "Content")]
    content: String,
    #[tabled(rename = "Sources")]
    sources: String,
}

impl From<&Suggestion> for SuggestionRow {
    fn from(s: &Suggestion) -> Self {
        let decision = if s.being_processed {
            format!("{} (in flight)", s.decision)
        } else {
            s.decision.to_string()
        };
        Self {
            id: s.id.to_string(),
            field: s.field_label().to_owned(),
            decision,
            content: util::truncate(&s.content, 56),
            sources: s
                .source_flags
                .channels()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

// ── Detail renderers ────────────────────────────────────────────────

/// `show` output: the derived view plus the full collection.
#[derive(Serialize)]
struct ManualReport<'a> {
    #[serde(flatten)]
    view: &'a SessionView,
    suggestions: &'a [Suggestion],
}

fn manual_detail(report: &ManualReport<'_>, color: bool) -> String {
    let view = report.view;
    let mut out = String::new();
    let manual_id = view
        .manual_id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();
    let _ = writeln!(out, "Manual:    {manual_id}");
    if let Some(stage) = view.stage {
        let _ = writeln!(
            out,
            "Stage:     {} ({})",
            output::paint_stage(stage, color),
            stage.label()
        );
    }
    let counts = view.counts;
    let _ = writeln!(
        out,
        "Pending:   {} of {} (accepted {}, ignored {}, combined {})",
        counts.pending,
        counts.total(),
        counts.accepted,
        counts.ignored,
        counts.combined
    );
    if view.is_processing {
        let _ = writeln!(out, "\nSuggestions are still being generated.");
    } else if view.is_empty {
        let _ = writeln!(out, "\nNothing left to review.");
    }
    if !report.suggestions.is_empty() {
        let rows: Vec<SuggestionRow> = report.suggestions.iter().map(SuggestionRow::from).collect();
        let _ = write!(out, "\n{}", output::render_table(&rows));
    }
    out.trim_end().to_owned()
}

fn suggestion_detail(s: &Suggestion, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:        {}", s.id);
    let _ = writeln!(out, "Field:     {}", s.field_label());
    let _ = writeln!(out, "Decision:  {}", output::paint_decision(s.decision, color));
    let channels = s.source_flags.channels();
    if !channels.is_empty() {
        let names: Vec<String> = channels.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "Sources:   {}", names.join(", "));
    }
    if let Some(previous) = &s.previous_content {
        let _ = writeln!(out, "\nPrevious:\n{previous}");
    }
    let _ = writeln!(out, "\nContent:\n{}", s.content);
    out.trim_end().to_owned()
}

fn print_pending(view: &SessionView, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_list(
        &global.output_format(),
        &view.pending,
        |s| SuggestionRow::from(s),
        |s| s.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn status(global: &GlobalOpts, message: &str) {
    if global.quiet {
        return;
    }
    if output::should_color(&global.color_mode()) {
        eprintln!("{} {message}", "✓".green());
    } else {
        eprintln!("✓ {message}");
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn show(ctx: &ReviewContext, args: ManualArgs, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.open(&args.manual).await?;
    let state = ctx.controller.state();
    let view = SessionView::project(&state);
    let report = ManualReport {
        view: &view,
        suggestions: &state.suggestions,
    };
    let color = output::should_color(&global.color_mode());
    let out = output::render_single(
        &global.output_format(),
        &report,
        |r| manual_detail(r, color),
        |r| {
            r.view
                .manual_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default()
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn pending(
    ctx: &ReviewContext,
    args: ManualArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    ctx.open(&args.manual).await?;
    let view = ctx.controller.view();
    if view.is_processing && !global.quiet {
        eprintln!("Suggestions for {} are still being generated.", args.manual);
    }
    print_pending(&view, global)
}

pub async fn accept(
    ctx: &ReviewContext,
    args: SuggestionArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    ctx.open(&args.manual).await?;
    let id = SuggestionId::from(args.id);
    ctx.controller.accept(id.clone()).await?;
    ctx.settle().await?;
    status(global, &format!("Accepted {id}"));
    print_decided(ctx, &id, global)
}

pub async fn ignore(
    ctx: &ReviewContext,
    args: SuggestionArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    ctx.open(&args.manual).await?;
    let id = SuggestionId::from(args.id);
    ctx.controller.ignore(id.clone()).await?;
    ctx.settle().await?;
    status(global, &format!("Ignored {id}"));
    print_decided(ctx, &id, global)
}

pub async fn combine(
    ctx: &ReviewContext,
    args: CombineArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    ctx.open(&args.manual).await?;
    let id = SuggestionId::from(args.id);
    let merged = match args.text {
        Some(text) => text,
        None => ctx.controller.begin_combine(id.clone()).await?,
    };
    ctx.controller.combine(id.clone(), &merged).await?;
    ctx.settle().await?;
    status(global, &format!("Combined {id}"));
    print_decided(ctx, &id, global)
}

fn print_decided(ctx: &ReviewContext, id: &SuggestionId, global: &GlobalOpts) -> Result<(), CliError> {
    let state = ctx.controller.state();
    let suggestion = state.suggestion(id).ok_or_else(|| CliError::NotFound {
        resource_type: "suggestion".into(),
        identifier: id.to_string(),
        list_command: "show <MANUAL>".into(),
    })?;
    let color = output::should_color(&global.color_mode());
    let out = output::render_single(
        &global.output_format(),
        suggestion,
        |s| suggestion_detail(s, color),
        |s| s.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn accept_all(
    ctx: &ReviewContext,
    args: ManualArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    ctx.open(&args.manual).await?;
    let count = ctx.controller.view().pending.len();
    if count == 0 {
        if !global.quiet {
            eprintln!("No pending suggestions for {}.", args.manual);
        }
        return Ok(());
    }
    if !util::confirm(
        &format!("Accept all {count} pending suggestions?"),
        global.yes,
    )? {
        if !global.quiet {
            eprintln!("Aborted.");
        }
        return Ok(());
    }

    let report = ctx.controller.accept_all().await?;
    for failure in &report.failed {
        eprintln!("✗ {}: {}", failure.id, failure.error);
    }
    if !report.failed.is_empty() {
        return Err(CliError::PartialAccept {
            failed: report.failed.len(),
            attempted: report.accepted.len() + report.failed.len(),
        });
    }

    ctx.settle().await?;
    status(
        global,
        &format!("Accepted {} suggestions", report.accepted.len()),
    );
    let out = output::render_list(
        &global.output_format(),
        &report.accepted,
        |s| SuggestionRow::from(s),
        |s| s.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn reuse(ctx: &ReviewContext, args: ManualArgs, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.open(&args.manual).await?;
    let before = ctx.controller.view().pending.len();
    ctx.controller.reuse_previous().await?;
    ctx.settle().await?;

    let view = ctx.controller.view();
    status(
        global,
        &format!(
            "Reused {} suggestions from the previous manual",
            view.pending.len().saturating_sub(before)
        ),
    );
    print_pending(&view, global)
}

#[derive(Serialize)]
struct TranscriptOutput {
    manual_id: String,
    source: Option<TranscriptSource>,
    transcript: String,
}

pub async fn transcript(
    ctx: &ReviewContext,
    args: ManualArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    ctx.open(&args.manual).await?;
    ctx.controller.toggle_transcript().await?;
    let view = ctx.controller.view();
    let transcript = view.transcript.ok_or_else(|| CliError::NotFound {
        resource_type: "transcript for".into(),
        identifier: args.manual.clone(),
        list_command: format!("show {}", args.manual),
    })?;
    let source = ctx
        .controller
        .state()
        .manual
        .as_ref()
        .and_then(|m| m.transcript_source);

    let data = TranscriptOutput {
        manual_id: args.manual,
        source,
        transcript,
    };
    let out = output::render_single(
        &global.output_format(),
        &data,
        |t| t.transcript.clone(),
        |t| t.transcript.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn stage(ctx: &ReviewContext, args: StageArgs, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.open(&args.manual).await?;
    let manual_id = ctx
        .controller
        .state()
        .manual_id
        .clone()
        .ok_or_else(|| CliError::Internal("session opened without a manual id".into()))?;

    let mut states = ctx.controller.subscribe();
    ctx.store
        .update_progress_stage(&manual_id, args.stage)
        .await
        .map_err(manual_core::CoreError::from)?;

    // The stage change reaches the session through the manual push.
    let target = args.stage;
    let limit = ctx.controller.config().request_timeout;
    let arrived = tokio::time::timeout(
        limit,
        states.wait_for(|s| s.manual.as_ref().map(|m| m.progress_stage) == Some(target)),
    )
    .await;
    if !matches!(arrived, Ok(Some(_))) {
        return Err(CliError::Timeout {
            seconds: limit.as_secs(),
        });
    }

    let view = ctx.controller.view();
    status(
        global,
        &format!("{manual_id} is now {target} ({})", target.label()),
    );
    let out = output::render_single(
        &global.output_format(),
        &view,
        |v| stage_detail(v, output::should_color(&global.color_mode())),
        |v| v.stage.map(|s| s.to_string()).unwrap_or_default(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn stage_detail(view: &SessionView, color: bool) -> String {
    let stage = view.stage.unwrap_or(ProgressStage::Idle);
    let mut out = format!("Stage:     {}", output::paint_stage(stage, color));
    let _ = write!(
        out,
        "\nProcessing: {}\nPending:   {}",
        if view.is_processing { "yes" } else { "no" },
        view.pending.len()
    );
    out
}
