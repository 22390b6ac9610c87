//! Prompt assembly for grounded answers.
//!
//! The prompt pins the model to the provided material: retrieved page
//! content first, then the conversation so far, then the new question. The
//! instructions forbid invented history and require an explicit "not enough
//! information" answer when neither section covers the question.

use std::fmt::Write;

use crate::index::ScoredChunk;
use crate::session::{Role, Turn};

pub(crate) const CONTEXT_HEADER: &str = "=== PAGE CONTENT ===";
pub(crate) const HISTORY_HEADER: &str = "=== CONVERSATION HISTORY ===";
pub(crate) const QUESTION_HEADER: &str = "=== CURRENT QUESTION ===";
pub(crate) const NO_CONTEXT: &str = "No relevant page content was retrieved for this question.";
const NO_HISTORY: &str = "No previous conversation history.";

/// Builds the full generation prompt.
///
/// `history` must not include the question being asked; the orchestrator
/// appends turns only after generation succeeds.
pub(crate) fn build_prompt(
    page_label: &str,
    hits: &[ScoredChunk],
    history: &[Turn],
    query: &str,
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are a helpful assistant answering questions about the web page \"{page_label}\".\n\
         Use only the page content and the conversation history below; if the answer is in\n\
         neither, say you do not have enough information rather than guessing. When asked\n\
         about earlier exchanges, rely on the recorded history only and never invent past\n\
         interactions. Answer in a single well-structured paragraph unless the user\n\
         explicitly asks for a list or steps.\n"
    );

    let _ = writeln!(prompt, "{CONTEXT_HEADER}");
    if hits.is_empty() {
        let _ = writeln!(prompt, "{NO_CONTEXT}");
    } else {
        for hit in hits {
            let _ = writeln!(prompt, "{}\n", hit.chunk.text);
        }
    }

    let _ = writeln!(prompt, "{HISTORY_HEADER}");
    if history.is_empty() {
        let _ = writeln!(prompt, "{NO_HISTORY}");
    } else {
        for turn in history {
            let speaker = match turn.role {
                Role::User => "Human",
                Role::Assistant => "Assistant",
            };
            let _ = writeln!(prompt, "{speaker}: {}", turn.content);
        }
    }

    let _ = writeln!(prompt, "\n{QUESTION_HEADER}\n{query}");
    prompt
}

/// The page-content section of a built prompt, used by the offline
/// generation provider to echo the top excerpt.
pub(crate) fn context_section(prompt: &str) -> Option<&str> {
    let start = prompt.find(CONTEXT_HEADER)? + CONTEXT_HEADER.len();
    let rest = &prompt[start..];
    let end = rest.find(HISTORY_HEADER).unwrap_or(rest.len());
    Some(rest[..end].trim())
}
