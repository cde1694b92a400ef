use crate::{Phase, QueryPanel, QueryResponse};

pub const BUSY_LINE: &str = "Analyzing...";

pub fn render_panel(panel: &QueryPanel) -> String {
    match panel.phase() {
        Phase::Idle => String::new(),
        Phase::Loading => BUSY_LINE.to_string(),
        Phase::Success => panel.last_response().map(render_answer).unwrap_or_default(),
        Phase::Error => format!("Error: {}", panel.last_error_message().unwrap_or_default()),
    }
}

pub fn render_answer(response: &QueryResponse) -> String {
    let mut out = String::from("Answer\n");
    if let Some(tokens) = response.display_tokens() {
        out.push_str(&format!("Tokens: {tokens}\n"));
    }
    out.push('\n');
    out.push_str(response.answer.trim_end());
    out.push('\n');

    if !response.sources.is_empty() {
        out.push_str("\nSources\n");
        for source in &response.sources {
            match source.line {
                Some(line) if line > 0 => out.push_str(&format!("  {}:{line}\n", source.file)),
                _ => out.push_str(&format!("  {}\n", source.file)),
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Completion, QueryError, SourceRef};

    fn settled(outcome: Result<QueryResponse, QueryError>) -> QueryPanel {
        let mut panel = QueryPanel::new();
        panel.edit_draft("hello");
        let pending = panel.submit().unwrap();
        panel.apply(Completion {
            generation: pending.generation(),
            outcome,
        });
        panel
    }

    #[test]
    fn idle_and_loading_views() {
        let mut panel = QueryPanel::new();
        assert_eq!(render_panel(&panel), "");

        panel.edit_draft("hello");
        let _pending = panel.submit().unwrap();
        assert_eq!(render_panel(&panel), BUSY_LINE);
    }

    #[test]
    fn answer_view_lists_tokens_and_sources() {
        let panel = settled(Ok(QueryResponse {
            answer: "Auth lives in the login hook.".to_string(),
            token_usage: Some(42),
            sources: vec![
                SourceRef {
                    file: "src/auth.ts".to_string(),
                    line: Some(12),
                    snippet: None,
                },
                SourceRef {
                    file: "src/App.tsx".to_string(),
                    line: None,
                    snippet: Some("<App />".to_string()),
                },
            ],
        }));

        let view = render_panel(&panel);
        assert!(view.contains("Tokens: 42"));
        assert!(view.contains("Auth lives in the login hook."));
        assert!(view.contains("  src/auth.ts:12\n"));
        assert!(view.contains("  src/App.tsx\n"));
    }

    #[test]
    fn zero_line_is_not_shown() {
        let response = QueryResponse {
            answer: "A".to_string(),
            token_usage: None,
            sources: vec![SourceRef {
                file: "src/main.ts".to_string(),
                line: Some(0),
                snippet: None,
            }],
        };

        let view = render_answer(&response);
        assert!(view.contains("  src/main.ts\n"));
        assert!(!view.contains("src/main.ts:0"));
    }

    #[test]
    fn answer_view_hides_zero_tokens_and_empty_sources() {
        let panel = settled(Ok(QueryResponse {
            answer: "A".to_string(),
            token_usage: Some(0),
            sources: Vec::new(),
        }));

        let view = render_panel(&panel);
        assert!(!view.contains("Tokens"));
        assert!(!view.contains("Sources"));
    }

    #[test]
    fn error_view_is_one_line() {
        let panel = settled(Err(QueryError::Status { status: 500 }));
        let view = render_panel(&panel);
        assert_eq!(view.lines().count(), 1);
        assert!(view.starts_with("Error: "));
    }
}
