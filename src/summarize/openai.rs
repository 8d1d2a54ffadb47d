use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::{system_prompt, Summarizer};
use crate::config::OpenAiConfig;
use crate::SummarizerError;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

/// OpenAI chat-completions client
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    system_prompt: String,
}

impl OpenAiSummarizer {
    pub fn new(client: reqwest::Client, config: &OpenAiConfig, summary_language: &str) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            system_prompt: system_prompt(summary_language),
        }
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        }
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String, SummarizerError> {
        debug!("Summarizing via OpenAI API with model {}", self.model);

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| SummarizerError::SummarizerFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SummarizerError::SummarizerFailed(format!(
                "OpenAI API returned {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SummarizerError::SummarizerFailed(e.to_string()))?;
        extract_openai_text(&json)
    }
}

fn extract_openai_text(json: &serde_json::Value) -> Result<String, SummarizerError> {
    let choices = json
        .get("choices")
        .and_then(|c| c.as_array())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| SummarizerError::SummarizerFailed("empty completion response".to_string()))?;

    choices[0]
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| SummarizerError::SummarizerFailed("unexpected OpenAI API response format".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarizer() -> OpenAiSummarizer {
        let config = OpenAiConfig {
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1/".to_string(),
            temperature: 0.3,
        };
        OpenAiSummarizer::new(reqwest::Client::new(), &config, "Russian")
    }

    #[test]
    fn test_request_body() {
        let summarizer = summarizer();
        assert_eq!(summarizer.base_url, "https://api.openai.com/v1");

        let body = serde_json::to_value(summarizer.request("summarize this")).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][0]["content"]
            .as_str()
            .unwrap()
            .contains("responding in Russian"));
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "summarize this");
    }

    #[test]
    fn test_extract_openai_text() {
        let json = serde_json::json!({
            "choices": [
                {
                    "message": {
                        "role": "assistant",
                        "content": "Summary of the video."
                    }
                }
            ]
        });
        assert_eq!(extract_openai_text(&json).unwrap(), "Summary of the video.");
    }

    #[test]
    fn test_extract_openai_text_empty() {
        let json = serde_json::json!({"choices": []});
        assert!(matches!(
            extract_openai_text(&json),
            Err(SummarizerError::SummarizerFailed(msg)) if msg == "empty completion response"
        ));

        let json = serde_json::json!({"choices": [{"message": {}}]});
        assert!(extract_openai_text(&json).is_err());
    }
}
