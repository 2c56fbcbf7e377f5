// Text reports for plans and impact analyses

use crate::orchestrator::OrchestrationResult;
use ledecouverte::{AffectedFile, ChangeKind, PhaseOutcome};
use leplanification::{FileAction, ImpactAnalysisResult};
use std::fmt::Write;

/// Default character budget of a text report.
pub const DEFAULT_MAX_CHARS: usize = 12_000;

/// Token-aware formatter utilities.
pub struct TokenFormatter;

impl TokenFormatter {
    /// Truncate a string to a max character count while preserving UTF-8 boundaries.
    pub fn truncate(input: &str, max_chars: usize) -> String {
        if input.chars().count() <= max_chars {
            return input.to_string();
        }

        let mut out: String = input.chars().take(max_chars).collect();
        out.push_str("\n\n…[truncated]");
        out
    }
}

fn action_label(action: FileAction) -> &'static str {
    match action {
        FileAction::Create => "create",
        FileAction::Modify => "modify",
        FileAction::Delete => "delete",
        FileAction::Rename => "rename",
    }
}

fn change_label(change: ChangeKind) -> &'static str {
    match change {
        ChangeKind::Create => "create",
        ChangeKind::Update => "update",
        ChangeKind::Delete => "delete",
        ChangeKind::Rename => "rename",
    }
}

/// Render an orchestration result, cut to `max_chars`.
pub fn format_plan(result: &OrchestrationResult, max_chars: usize) -> String {
    let impact = &result.discovered_impact;
    let plan = &result.execution_plan;
    let mut out = String::new();

    let _ = writeln!(out, "Plan for: {}", impact.query);
    let _ = writeln!(
        out,
        "Intent: {} | Strategy: {:?} | Confidence: {:?} | Budget: {} tokens/task",
        impact.intent, result.processing_strategy, result.confidence, result.token_budget
    );
    let _ = writeln!(
        out,
        "Discovered {} files in {} ms",
        impact.files.len(),
        result.processing_time_ms
    );
    for phase in impact
        .phases
        .iter()
        .filter(|p| p.outcome != PhaseOutcome::Completed)
    {
        let _ = writeln!(
            out,
            "  ! {:?} phase {:?}: {}/{} operations fell back",
            phase.phase, phase.outcome, phase.failures, phase.operations
        );
    }

    if result.orchestrated_tasks.is_empty() {
        let _ = writeln!(out, "\nNo tasks: nothing in the project matched the request.");
        return TokenFormatter::truncate(&out, max_chars);
    }

    let _ = writeln!(
        out,
        "\nTasks ({}, about {}):",
        plan.total_tasks, plan.estimated_duration
    );
    for task in &result.orchestrated_tasks {
        let deps = if task.dependencies.is_empty() {
            "none".to_string()
        } else {
            task.dependencies.join(", ")
        };
        let _ = writeln!(
            out,
            "\n[{}] {} (priority {}, ~{} tokens, after: {})",
            task.id, task.title, task.priority, task.estimated_tokens, deps
        );
        for file in &task.files {
            let _ = writeln!(out, "    {:<7} {}", action_label(file.action), file.path);
        }
    }

    let _ = writeln!(out, "\nWaves:");
    for (i, wave) in plan.waves.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, wave.join(", "));
    }
    let _ = writeln!(out, "Sequential: {}", plan.sequential_order.join(" -> "));

    TokenFormatter::truncate(&out, max_chars)
}

fn write_bucket(out: &mut String, title: &str, files: &[AffectedFile]) {
    if files.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{} ({}):", title, files.len());
    for file in files {
        let _ = writeln!(
            out,
            "  [{:<8}] {:<6} {}",
            file.priority.to_string(),
            change_label(file.change_kind),
            file.file_path
        );
        let _ = writeln!(out, "             {}", file.task_description);
    }
}

/// Render an impact analysis, cut to `max_chars`.
pub fn format_impact(result: &ImpactAnalysisResult, max_chars: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Impact: {} files | Risk: {} ({}) | About {}",
        result.total_files,
        result.risk_level,
        result.risk_level.description(),
        result.estimated_time
    );

    write_bucket(&mut out, "Primary", &result.primary_files);
    write_bucket(&mut out, "Cascading", &result.cascading_files);
    write_bucket(&mut out, "Configuration", &result.config_files);
    write_bucket(&mut out, "Documentation", &result.documentation_files);
    write_bucket(&mut out, "Tests", &result.test_files);
    write_bucket(&mut out, "Deployment", &result.deployment_files);

    TokenFormatter::truncate(&out, max_chars)
}
