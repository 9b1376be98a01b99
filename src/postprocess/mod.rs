//! Post-processing of recognized text
//!
//! The AI pipeline is an external collaborator consumed through a trait; it
//! may stream improved drafts while it works. The deterministic simple
//! cleanup is the always-available fallback: recognition succeeded, so a
//! post-processing failure must never surface to the user.

use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;

/// Result of one post-processing run. Consumed once per session.
#[derive(Debug, Clone)]
pub struct PostProcessOutcome {
    /// The improved text. Blank means the pipeline produced nothing usable
    /// and the caller falls back to the simple cleanup.
    pub text: String,
    /// Whether the AI result was actually used.
    pub used_ai: bool,
    /// Whether the AI step ran at all.
    pub attempted: bool,
    /// Wall time spent in the pipeline.
    pub elapsed: Duration,
}

/// AI post-processing capability.
#[async_trait::async_trait]
pub trait PostProcessPipeline: Send + Sync {
    /// Improve `text`, optionally streaming intermediate drafts through
    /// `updates`. Each draft replaces the previous one.
    async fn apply_with_ai(
        &self,
        text: &str,
        updates: mpsc::UnboundedSender<String>,
    ) -> Result<PostProcessOutcome>;
}

/// Deterministic cleanup of raw recognized text.
///
/// Rules: trim, collapse inner whitespace runs to single spaces, uppercase
/// the first letter, and append a period when the text ends in a letter or
/// digit. Pure and total: the input text is never lost.
pub fn apply_simple(text: &str) -> String {
    let collapsed: Vec<&str> = text.split_whitespace().collect();
    if collapsed.is_empty() {
        return String::new();
    }
    let joined = collapsed.join(" ");

    let mut chars = joined.chars();
    let mut result: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => return String::new(),
    };

    if result.chars().last().is_some_and(|c| c.is_alphanumeric()) {
        result.push('.');
    }

    result
}
