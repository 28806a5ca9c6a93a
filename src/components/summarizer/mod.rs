mod client;
pub mod prompt;

pub use client::{OpenAiClient, TextGenerator, TEMPERATURE};
pub use prompt::{build_prompt, MeetingContext, PREREAD_SECTIONS};

use crate::error::PrereadResult;
use std::sync::Arc;
use tracing::info;

/// Turns meeting context into a preread through a [`TextGenerator`]
#[derive(Clone)]
pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Preread text for one meeting, trimmed
    pub async fn summarize(&self, context: &MeetingContext) -> PrereadResult<String> {
        let prompt = build_prompt(context);
        info!("Summarizing meeting: {}", context.title);
        let summary = self.generator.complete(&prompt).await?;
        Ok(summary.trim().to_string())
    }
}
