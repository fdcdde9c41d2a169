//! Markdown export and its inverse.
//!
//! Layout, in order: title, metadata lines, `## Steps` with one `### n.`
//! heading per step, the three output sections named after the toolkit's
//! output labels, structured payload sections, then a `---` footer.
//!
//! Step content is written verbatim except that lines starting with `#` or
//! `\`, and lines equal to `---`, get a leading backslash. Multi-line list
//! items continue on indented lines. [`parse_markdown`] reverses both, so
//! steps, insights, the sentence of truth and the moves survive a round trip.

use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::model::{OutputLabels, StructuredPayload, ToolkitSession, ToolkitType, Workspace};

const NONE_YET: &str = "_None yet_";
const FOOTER_RULE: &str = "---";
const INSIGHT_INDENT: &str = "  ";
const MOVE_INDENT: &str = "   ";

static STEP_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^### (\d+)\. (.*)$").expect("static regex"));
static MOVE_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\. (.*)$").expect("static regex"));

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn escape_line(line: &str) -> String {
    if line.starts_with('#') || line.starts_with('\\') || line == FOOTER_RULE {
        format!("\\{}", line)
    } else {
        line.to_string()
    }
}

fn unescape_line(line: &str) -> &str {
    line.strip_prefix('\\').unwrap_or(line)
}

/// Collapse a value onto one line for tables and inline fields.
fn inline(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn table_cell(text: &str) -> String {
    inline(text).replace('|', "\\|")
}

fn write_list(out: &mut String, items: &[String], marker: impl Fn(usize) -> String, indent: &str) {
    if items.is_empty() {
        let _ = writeln!(out, "{}", NONE_YET);
        return;
    }
    for (i, item) in items.iter().enumerate() {
        let mut lines = item.split('\n');
        let first = lines.next().unwrap_or_default();
        let _ = writeln!(out, "{}{}", marker(i), first);
        for line in lines {
            let _ = writeln!(out, "{}{}", indent, line);
        }
    }
}

fn write_payload(out: &mut String, payload: &StructuredPayload) {
    let _ = writeln!(out, "## {}\n", payload.title());
    match payload {
        StructuredPayload::SystemsDiagram(diagram) => {
            for (heading, items) in [
                ("Elements", &diagram.elements),
                ("Feedback Loops", &diagram.feedback_loops),
                ("Leverage Points", &diagram.leverage_points),
            ] {
                let _ = writeln!(out, "### {}\n", heading);
                for item in items {
                    let _ = writeln!(out, "- {}", inline(item));
                }
                out.push('\n');
            }
        }
        StructuredPayload::FuturesScenarios(futures) => {
            let _ = writeln!(out, "**Optimistic:** {}\n", inline(&futures.optimistic));
            let _ = writeln!(out, "**Pessimistic:** {}\n", inline(&futures.pessimistic));
            let _ = writeln!(out, "**Wildcard:** {}\n", inline(&futures.wildcard));
        }
        StructuredPayload::EthicalMatrix(entries) => {
            out.push_str("| Stakeholder | Impact | Consideration |\n| --- | --- | --- |\n");
            for entry in entries {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} |",
                    table_cell(&entry.stakeholder),
                    table_cell(&entry.impact),
                    table_cell(&entry.consideration)
                );
            }
            out.push('\n');
        }
        StructuredPayload::FirstPrinciplesList(principles) => {
            for (i, principle) in principles.iter().enumerate() {
                let _ = writeln!(out, "{}. {}", i + 1, inline(principle));
            }
            out.push('\n');
        }
        StructuredPayload::NarrativeArc(arc) => {
            let _ = writeln!(out, "**Setup:** {}\n", inline(&arc.setup));
            let _ = writeln!(out, "**Conflict:** {}\n", inline(&arc.conflict));
            let _ = writeln!(out, "**Turning Point:** {}\n", inline(&arc.turning_point));
            let _ = writeln!(out, "**Resolution:** {}\n", inline(&arc.resolution));
        }
        StructuredPayload::StakeholderMatrix(entries) => {
            out.push_str("| Stakeholder | Influence | Interest | Need |\n| --- | --- | --- | --- |\n");
            for entry in entries {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {} |",
                    table_cell(&entry.name),
                    table_cell(&entry.influence),
                    table_cell(&entry.interest),
                    table_cell(&entry.need)
                );
            }
            out.push('\n');
        }
    }
}

/// Render a session as a standalone Markdown document.
pub fn to_markdown(
    session: &ToolkitSession,
    workspace: Option<&Workspace>,
    exported_at: DateTime<Utc>,
) -> String {
    let toolkit = session.toolkit_type;
    let labels = toolkit.output_labels();
    let outputs = &session.outputs;
    let mut out = String::new();

    let _ = writeln!(out, "# {}\n", toolkit.display_name());
    if let Some(workspace) = workspace {
        let _ = writeln!(out, "**Workspace:** {}  ", inline(&workspace.title));
    }
    let _ = writeln!(out, "**Toolkit:** {} ({})  ", toolkit.display_name(), toolkit.category());
    let _ = writeln!(out, "**Lens:** {}  ", session.thinking_lens.display_name());
    let _ = writeln!(out, "**Created:** {}  ", format_timestamp(&session.created_at));
    let _ = writeln!(out, "**Updated:** {}", format_timestamp(&session.updated_at));
    if let Some(refinement) = &session.refinement {
        let _ = writeln!(
            out,
            "**Refined:** through {} on {}",
            refinement.lens.display_name(),
            format_timestamp(&refinement.refined_at)
        );
    }

    out.push_str("\n## Steps\n\n");
    for (i, step) in session.steps.iter().enumerate() {
        let _ = writeln!(out, "### {}. {}\n", i + 1, step.label);
        for line in step.content.split('\n') {
            let _ = writeln!(out, "{}", escape_line(line));
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## {}\n", labels.primary);
    write_list(&mut out, &outputs.insights, |_| "- ".to_string(), INSIGHT_INDENT);
    out.push('\n');

    if !outputs.sentence_of_truth.is_empty() {
        let _ = writeln!(out, "## {}\n", labels.secondary);
        for line in outputs.sentence_of_truth.split('\n') {
            if line.is_empty() {
                out.push_str(">\n");
            } else {
                let _ = writeln!(out, "> {}", line);
            }
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## {}\n", labels.action);
    write_list(
        &mut out,
        &outputs.necessary_moves,
        |i| format!("{}. ", i + 1),
        MOVE_INDENT,
    );
    out.push('\n');

    if let Some(payload) = &outputs.structured_payload {
        write_payload(&mut out, payload);
    }

    let _ = writeln!(
        out,
        "{}\n\n*Exported from Clarity on {}*",
        FOOTER_RULE,
        format_timestamp(&exported_at)
    );
    out
}

/// Content recovered from an exported document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedExport {
    pub toolkit: Option<ToolkitType>,
    pub steps: Vec<(String, String)>,
    pub insights: Vec<String>,
    pub sentence_of_truth: String,
    pub necessary_moves: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Steps,
    Insights,
    Truth,
    Moves,
    Other,
}

/// Drop the blank line the writer puts after the heading and before the next one.
fn finish_step(steps: &mut Vec<(String, String)>, label: String, mut lines: Vec<&str>) {
    if lines.first() == Some(&"") {
        lines.remove(0);
    }
    if lines.last() == Some(&"") {
        lines.pop();
    }
    let content = lines
        .into_iter()
        .map(unescape_line)
        .collect::<Vec<_>>()
        .join("\n");
    steps.push((label, content));
}

/// Parse a document written by [`to_markdown`].
pub fn parse_markdown(markdown: &str) -> ParsedExport {
    let mut parsed = ParsedExport::default();
    let mut labels = OutputLabels::default();
    let mut section = Section::Preamble;
    let mut current_step: Option<(String, Vec<&str>)> = None;
    let mut truth_lines: Vec<&str> = Vec::new();

    for line in markdown.split('\n') {
        if section == Section::Preamble {
            if let Some(title) = line.strip_prefix("# ") {
                parsed.toolkit = title.trim().parse().ok();
                if let Some(toolkit) = parsed.toolkit {
                    labels = toolkit.output_labels();
                }
                continue;
            }
        }

        if let Some(heading) = line.strip_prefix("## ") {
            if let Some((label, lines)) = current_step.take() {
                finish_step(&mut parsed.steps, label, lines);
            }
            let heading = heading.trim();
            section = if heading == "Steps" {
                Section::Steps
            } else if heading == labels.primary {
                Section::Insights
            } else if heading == labels.secondary {
                Section::Truth
            } else if heading == labels.action {
                Section::Moves
            } else {
                Section::Other
            };
            continue;
        }

        if line == FOOTER_RULE {
            break;
        }

        match section {
            Section::Preamble | Section::Other => {}
            Section::Steps => {
                if let Some(caps) = STEP_HEADING.captures(line) {
                    if let Some((label, lines)) = current_step.take() {
                        finish_step(&mut parsed.steps, label, lines);
                    }
                    current_step = Some((caps[2].to_string(), Vec::new()));
                } else if let Some((_, lines)) = current_step.as_mut() {
                    lines.push(line);
                }
            }
            Section::Insights => {
                if let Some(item) = line.strip_prefix("- ") {
                    parsed.insights.push(item.to_string());
                } else if let Some(rest) = line.strip_prefix(INSIGHT_INDENT) {
                    if let Some(last) = parsed.insights.last_mut() {
                        last.push('\n');
                        last.push_str(rest);
                    }
                }
            }
            Section::Truth => {
                if let Some(rest) = line.strip_prefix("> ") {
                    truth_lines.push(rest);
                } else if line == ">" {
                    truth_lines.push("");
                }
            }
            Section::Moves => {
                if let Some(caps) = MOVE_ITEM.captures(line) {
                    parsed.necessary_moves.push(caps[1].to_string());
                } else if let Some(rest) = line.strip_prefix(MOVE_INDENT) {
                    if let Some(last) = parsed.necessary_moves.last_mut() {
                        last.push('\n');
                        last.push_str(rest);
                    }
                }
            }
        }
    }

    if let Some((label, lines)) = current_step.take() {
        finish_step(&mut parsed.steps, label, lines);
    }
    parsed.sentence_of_truth = truth_lines.join("\n");
    parsed
}
