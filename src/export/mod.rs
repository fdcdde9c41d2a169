//! Session export to Markdown and HTML.

mod html;
mod markdown;

pub use html::to_html;
pub use markdown::{parse_markdown, to_markdown, ParsedExport};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::model::{ToolkitSession, Workspace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Markdown,
    Html,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Html => "html",
        }
    }

    pub fn render(
        &self,
        session: &ToolkitSession,
        workspace: Option<&Workspace>,
        exported_at: DateTime<Utc>,
    ) -> String {
        match self {
            Self::Markdown => to_markdown(session, workspace, exported_at),
            Self::Html => to_html(session, workspace, exported_at),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "md" | "markdown" => Ok(Self::Markdown),
            "html" | "htm" => Ok(Self::Html),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

/// `pre-mortem-2026-03-01.md` style name for an exported session.
pub fn export_file_name(session: &ToolkitSession, extension: &str) -> String {
    format!(
        "{}-{}.{}",
        slug(session.toolkit_type.display_name()),
        session.created_at.format("%Y-%m-%d"),
        extension.trim_start_matches('.')
    )
}
