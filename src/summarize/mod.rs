use async_trait::async_trait;

use crate::SummarizerError;

pub mod openai;

pub use openai::OpenAiSummarizer;

/// Turns a prompt into summary text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, prompt: &str) -> Result<String, SummarizerError>;
}

/// Prompt asking for a summary of `transcript` in `language`, formatted with Telegram Markdown
pub fn build_prompt(transcript: &str, language: &str) -> String {
    format!(
        "Summarize the following video in {language}. Use Telegram Markdown (asterisks for bold, \
         underscores for italics, backticks for inline code) and structure the summary into logical \
         paragraphs or lists as needed.\n\n{transcript}"
    )
}

/// System message sent alongside every prompt
pub fn system_prompt(language: &str) -> String {
    format!(
        "You are a concise assistant responding in {language}. Format the answer using Telegram \
         Markdown (bold with *, italic with _, code with `) and feel free to use numbered or \
         bulleted lists."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_embeds_transcript_last() {
        let prompt = build_prompt("hello world", "Russian");
        assert!(prompt.starts_with("Summarize the following video in Russian."));
        assert!(prompt.contains("Telegram Markdown"));
        assert!(prompt.ends_with("\n\nhello world"));
    }

    #[test]
    fn test_system_prompt_language() {
        assert!(system_prompt("English").contains("responding in English"));
    }
}
