//! Print-ready HTML export, rendered from the Markdown export.

use chrono::{DateTime, Utc};
use pulldown_cmark::{html, Event, Options, Parser};

use super::markdown::to_markdown;
use crate::model::{ToolkitSession, Workspace};

const STYLE: &str = r#"
  body { font-family: Georgia, "Times New Roman", serif; max-width: 42rem; margin: 2.5rem auto; padding: 0 1.25rem; color: #1f2328; line-height: 1.6; }
  h1 { font-size: 1.9rem; margin-bottom: 0.25rem; }
  h2 { font-size: 1.25rem; margin-top: 2rem; border-bottom: 1px solid #d0d7de; padding-bottom: 0.25rem; }
  h3 { font-size: 1.05rem; margin-top: 1.25rem; }
  blockquote { margin: 1rem 0; padding: 0.5rem 1rem; border-left: 4px solid #8250df; background: #f6f8fa; font-style: italic; }
  table { border-collapse: collapse; width: 100%; }
  th, td { border: 1px solid #d0d7de; padding: 0.4rem 0.6rem; text-align: left; vertical-align: top; }
  hr { border: none; border-top: 1px solid #d0d7de; margin-top: 2.5rem; }
  @media print { body { margin: 0; max-width: none; } a { color: inherit; text-decoration: none; } }
"#;

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render a session as a self-contained HTML page.
pub fn to_html(
    session: &ToolkitSession,
    workspace: Option<&Workspace>,
    exported_at: DateTime<Utc>,
) -> String {
    let markdown = to_markdown(session, workspace, exported_at);

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    // Raw HTML in user text is shown, not interpreted
    let parser = Parser::new_ext(&markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut body = String::new();
    html::push_html(&mut body, parser);

    let title = match workspace {
        Some(workspace) => format!(
            "{} - {}",
            session.toolkit_type.display_name(),
            workspace.title
        ),
        None => session.toolkit_type.display_name().to_string(),
    };

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        title = escape_html(&title),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AiOutputs, ToolkitType};
    use chrono::TimeZone;

    #[test]
    fn test_html_wraps_rendered_markdown() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let mut session = ToolkitSession::new("s".into(), "w".into(), ToolkitType::PreMortem, now);
        session.steps[0].content = "Ship <fast> & loud".into();
        session.outputs = AiOutputs {
            insights: vec!["Nobody owns QA".into()],
            sentence_of_truth: "We skip testing".into(),
            necessary_moves: vec!["Name an owner".into()],
            structured_payload: None,
        };
        let workspace = Workspace {
            id: "w".into(),
            title: "Launch <2026>".into(),
            description: String::new(),
            created_at: now,
            updated_at: now,
        };

        let page = to_html(&session, Some(&workspace), now);
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Pre-Mortem - Launch &lt;2026&gt;</title>"));
        assert!(page.contains("<h1>Pre-Mortem</h1>"));
        assert!(page.contains("<blockquote>"));
        assert!(page.contains("<li>Nobody owns QA</li>"));
        assert!(page.contains("Ship &lt;fast&gt; &amp; loud"));
        assert!(page.contains("@media print"));
    }
}
