//! Prompt templates for the evaluate and generate stages
//!
//! Evidence is rendered as numbered, labeled blocks so the generator can cite
//! `[Internal 1]` or `[External 2]` and the evaluator can tell the two
//! origins apart.

use chrono::Utc;

use crate::state::{truncate_chars, ResultRecord};

/// Per-result content cap inside a prompt
const MAX_EVIDENCE_CHARS: usize = 2000;

/// Prompt templates for the RAG loop
pub struct RagPrompts;

impl RagPrompts {
    /// Get the current date formatted for prompts
    fn current_date() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    /// System prompt for the sufficiency evaluator
    pub fn evaluator_system() -> String {
        format!(
            r#"# Evidence Evaluator

For context, today's date is {date}.

You judge whether the evidence collected so far is enough to answer a user's question accurately and completely.

## Output

Respond with a single JSON object inside a ```json code block:

```json
{{
  "is_sufficient": true,
  "confidence": 0.0,
  "missing_information": ["specific fact still needed"],
  "reasoning": "one or two sentences"
}}
```

## Guidelines

- `is_sufficient` is true only if the evidence directly supports a complete answer
- `confidence` is a number between 0 and 1
- `missing_information` lists concrete, searchable gaps; leave it empty when sufficient
- Do not answer the question itself
"#,
            date = Self::current_date()
        )
    }

    /// User prompt for one evaluation
    pub fn evaluation(query: &str, internal: &[ResultRecord], external: &[ResultRecord]) -> String {
        format!(
            "## Question\n\n{query}\n\n## Internal Evidence\n\n{internal}\n\n## External Evidence\n\n{external}\n\nIs this evidence sufficient to answer the question?",
            query = query,
            internal = render_evidence("Internal", internal),
            external = render_evidence("External", external),
        )
    }

    /// System prompt for the answer generator
    pub fn generator_system() -> String {
        format!(
            r#"# Answer Writer

For context, today's date is {date}.

You answer the user's question using only the evidence provided.

## Guidelines

- Cite evidence inline with its label, e.g. [Internal 1] or [External 2]
- Prefer internal evidence when it is relevant and current
- If sources disagree, say so explicitly and cite both sides
- If the evidence does not cover part of the question, say what is missing instead of guessing
- Write in clear paragraphs without meta-commentary ("I found...", "Based on my search...")
"#,
            date = Self::current_date()
        )
    }

    /// User prompt for the final answer
    pub fn generation(query: &str, internal: &[ResultRecord], external: &[ResultRecord]) -> String {
        format!(
            "## Internal Documents\n\n{internal}\n\n## Web Results\n\n{external}\n\n## Question\n\n{query}",
            query = query,
            internal = render_evidence("Internal", internal),
            external = render_evidence("External", external),
        )
    }
}

/// Render results as `[Label N] title (url)` blocks
fn render_evidence(label: &str, results: &[ResultRecord]) -> String {
    if results.is_empty() {
        return "(none)".to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let mut header = format!("[{} {}] {}", label, i + 1, record.label());
            if let Some(url) = &record.url {
                header.push_str(&format!(" ({})", url));
            }
            format!(
                "{}\n{}",
                header,
                truncate_chars(&record.content, MAX_EVIDENCE_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_evidence() {
        assert_eq!(render_evidence("Internal", &[]), "(none)");
    }

    #[test]
    fn test_render_labels_and_urls() {
        let rendered = render_evidence(
            "External",
            &[
                ResultRecord::external("Tokio", "https://tokio.rs", "An async runtime."),
                ResultRecord::external("Serde", "https://serde.rs", "Serialization."),
            ],
        );

        assert!(rendered.starts_with("[External 1] Tokio (https://tokio.rs)\nAn async runtime."));
        assert!(rendered.contains("[External 2] Serde (https://serde.rs)"));
    }

    #[test]
    fn test_long_content_is_capped() {
        let record = ResultRecord::internal("doc", "x".repeat(5000));
        let rendered = render_evidence("Internal", &[record]);

        assert!(rendered.len() < 2100);
    }

    #[test]
    fn test_evaluation_prompt_keeps_origins_apart() {
        let prompt = RagPrompts::evaluation(
            "What is RRF?",
            &[ResultRecord::internal("doc-1", "RRF fuses rankings.")],
            &[],
        );

        assert!(prompt.contains("What is RRF?"));
        assert!(prompt.contains("[Internal 1] doc-1"));
        assert!(prompt.contains("## External Evidence\n\n(none)"));
    }

    #[test]
    fn test_system_prompts_include_date() {
        let date = RagPrompts::current_date();
        assert!(RagPrompts::evaluator_system().contains(&date));
        assert!(RagPrompts::evaluator_system().contains("\"is_sufficient\""));
        assert!(RagPrompts::generator_system().contains(&date));
    }
}
