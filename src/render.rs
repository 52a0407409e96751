use html2text::from_read;
use serde_json::Value;
use std::fmt::Write;

use crate::api::models::AnswerResponse;
use crate::data_models::{Message, Sender};

const WRAP_WIDTH: usize = 80;

/// Snippets come back with highlighting markup such as `<b>`.
fn html_to_text(html: &str) -> String {
    from_read(html.as_bytes(), WRAP_WIDTH)
        .map(|text| text.trim().to_string())
        .unwrap_or_else(|_| html.to_string())
}

pub fn render_message(message: &Message) -> String {
    let mut out = String::new();
    match message.sender {
        Sender::User => {
            let _ = writeln!(out, "you> {}", message.text);
        }
        Sender::System => {
            let _ = writeln!(out, "  ({})", message.text);
        }
        Sender::Bot => {
            if !message.text.is_empty() {
                let _ = writeln!(out, "doe> {}", message.text);
            }
            if let Some(summary) = &message.search_summary {
                let _ = writeln!(out, "doe> {summary}");
            }
            match message.search_results.as_deref() {
                Some([]) | None => {
                    let _ = writeln!(out, "doe> no results");
                }
                Some(results) => {
                    for (i, result) in results.iter().enumerate() {
                        let title = if result.title.is_empty() {
                            "(untitled)"
                        } else {
                            result.title.as_str()
                        };
                        let _ = writeln!(out, "  {}. {title}", i + 1);
                        if !result.link.is_empty() {
                            let _ = writeln!(out, "     {}", result.link);
                        }
                        let snippet = html_to_text(&result.snippet);
                        for line in snippet.lines().filter(|l| !l.trim().is_empty()) {
                            let _ = writeln!(out, "     {line}");
                        }
                    }
                }
            }
        }
    }
    out
}

pub fn render_transcript(messages: &[Message]) -> String {
    messages.iter().map(render_message).collect()
}

pub fn render_answer(answer: &AnswerResponse) -> String {
    let mut out = String::new();
    let text = answer
        .answer
        .as_ref()
        .and_then(|a| a.get("answerText"))
        .and_then(Value::as_str);
    match text {
        Some(text) => {
            let _ = writeln!(out, "doe> {text}");
        }
        None => {
            let _ = writeln!(out, "doe> no answer generated");
        }
    }
    if !answer.related_questions.is_empty() {
        let _ = writeln!(out, "  related:");
        for question in &answer.related_questions {
            let question = question
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| question.to_string());
            let _ = writeln!(out, "   - {question}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::SearchResultItem;
    use serde_json::json;

    #[test]
    fn test_user_and_system_lines() {
        assert_eq!(render_message(&Message::user("hello")), "you> hello\n");
        assert_eq!(render_message(&Message::system("Error: x")), "  (Error: x)\n");
    }

    #[test]
    fn test_bot_results_strip_markup() {
        let message = Message::bot(
            "pairwise",
            vec![SearchResultItem {
                id: "1".to_string(),
                title: "Pairwise testing".to_string(),
                link: "https://example.org/pairwise".to_string(),
                snippet: "<b>Pairwise</b> testing covers all pairs".to_string(),
            }],
            None,
        );
        let out = render_message(&message);
        assert!(out.contains("1. Pairwise testing"));
        assert!(out.contains("https://example.org/pairwise"));
        assert!(out.contains("testing covers all pairs"));
        assert!(!out.contains("<b>"));
    }

    #[test]
    fn test_bot_without_results() {
        let out = render_message(&Message::bot("x", vec![], Some("Nothing found.".to_string())));
        assert!(out.contains("doe> Nothing found."));
        assert!(out.contains("no results"));
    }

    #[test]
    fn test_render_answer_with_related_questions() {
        let answer = AnswerResponse {
            answer: Some(json!({"answerText": "Use a covering array."})),
            related_questions: vec![json!("What is t-way testing?")],
        };
        let out = render_answer(&answer);
        assert!(out.contains("doe> Use a covering array."));
        assert!(out.contains("- What is t-way testing?"));
    }
}
