//! Terminal rendering of answers and status.

use std::fmt::Write as _;

use cite_core::Status;
use cite_llm::{Message, Role};
use cite_rag::Answer;

/// Answer text, then numbered sources. With `show_chunks` each source also shows
/// its distance and full passage text.
pub fn render_answer(answer: &Answer, show_chunks: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", answer.text.trim());

    if answer.sources.is_empty() {
        return out;
    }
    let _ = writeln!(out, "\nSources:");
    for (i, r) in answer.sources.iter().enumerate() {
        let _ = writeln!(out, "[{i}] passage #{} ({})", r.passage.id, r.passage.source);
        if show_chunks {
            let _ = writeln!(out, "    distance: {:.4}", r.distance);
            for line in r.passage.text.lines() {
                let _ = writeln!(out, "    | {line}");
            }
        }
    }

    if !answer.citations.out_of_range.is_empty() {
        let markers: Vec<String> = answer
            .citations
            .out_of_range
            .iter()
            .map(|m| format!("[{m}]"))
            .collect();
        let _ = writeln!(
            out,
            "\nwarning: answer cites unknown sources {}",
            markers.join(", ")
        );
    }
    out
}

/// Prior chat turns, oldest first, with answers cut to their first line.
pub fn render_history(turns: &[Message]) -> String {
    if turns.is_empty() {
        return "(no questions yet)\n".to_owned();
    }
    let mut out = String::new();
    for turn in turns {
        let prefix = match turn.role {
            Role::User => "you",
            Role::Assistant => "cite",
            Role::System => continue,
        };
        let first = turn.content.lines().next().unwrap_or_default();
        let _ = writeln!(out, "{prefix:>4}: {first}");
    }
    out
}

pub fn render_status(status: &Status) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "data dir:   {}", status.data_dir.display());
    match &status.generation {
        Some(generation) => {
            let _ = writeln!(out, "generation: {generation}");
            let _ = writeln!(out, "passages:   {}", status.passages);
            let _ = writeln!(out, "dimension:  {}", status.dimension);
            if status.passages != status.vectors {
                let _ = writeln!(
                    out,
                    "warning: index holds {} vectors; run `cite ingest` to rebuild",
                    status.vectors
                );
            }
        }
        None => {
            let _ = writeln!(out, "generation: none (run `cite ingest <paths>...`)");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use cite_rag::{CitationReport, Passage, RetrievalResult};

    use super::*;

    fn answer() -> Answer {
        Answer {
            text: "Paris is the capital [0]. Also [4].".into(),
            sources: vec![RetrievalResult {
                passage: Passage {
                    id: 12,
                    text: "Paris is the capital of France.".into(),
                    source: "fr.txt".into(),
                },
                distance: 0.123_456,
            }],
            citations: CitationReport::analyze("Paris is the capital [0]. Also [4].", 1),
        }
    }

    #[test]
    fn sources_listed_by_position() {
        let out = render_answer(&answer(), false);
        assert!(out.starts_with("Paris is the capital [0]."));
        assert!(out.contains("[0] passage #12 (fr.txt)"));
        assert!(!out.contains("distance"));
        assert!(out.contains("unknown sources [4]"));
    }

    #[test]
    fn show_chunks_adds_distance_and_text() {
        let out = render_answer(&answer(), true);
        assert!(out.contains("distance: 0.1235"));
        assert!(out.contains("| Paris is the capital of France."));
    }

    #[test]
    fn refusal_has_no_sources_block() {
        let refusal = Answer {
            text: cite_rag::REFUSAL.into(),
            sources: Vec::new(),
            citations: CitationReport::analyze(cite_rag::REFUSAL, 0),
        };
        assert_eq!(render_answer(&refusal, true), "I don't know\n");
    }

    #[test]
    fn history_lists_turns_in_order() {
        let turns = vec![
            Message::user("What is the capital of France?"),
            Message::assistant("Paris is the capital [0].\n\nSources: ..."),
        ];
        assert_eq!(
            render_history(&turns),
            " you: What is the capital of France?\ncite: Paris is the capital [0].\n"
        );
        assert_eq!(render_history(&[]), "(no questions yet)\n");
    }

    #[test]
    fn status_without_generation() {
        let status = Status {
            data_dir: PathBuf::from(".cite"),
            generation: None,
            passages: 0,
            vectors: 0,
            dimension: 0,
        };
        assert!(render_status(&status).contains("generation: none"));
    }
}
