//! Turning retrieved chunks into a grounded answer.
//!
//! The retrieved chunks are rendered into a structured context block from
//! their typed metadata (not from the raw chunk text, which may be cut
//! mid-section), wrapped in a fixed prompt template, and sent to a chat
//! model. [`ChatModel`] is the seam; [`GroqClient`] is the stock
//! implementation speaking the OpenAI-compatible chat completions API.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::corpus::{parse_duration_minutes, render_value};
use crate::retrieval::retriever::{ScoredChunk, dedup_by_document};

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const GROQ_DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// A chat completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete a single-turn prompt and return the model's text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// A composed answer with the recipes it drew on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Distinct dish names behind the answer, best match first
    pub sources: Vec<String>,
}

/// Render retrieved chunks into the context block fed to the chat model.
///
/// One block per chunk, rebuilt from the chunk's typed metadata so the model
/// always sees whole sections. Duration fields are shown in minutes when they
/// parse, verbatim otherwise.
pub fn render_context(scored: &[ScoredChunk]) -> String {
    scored
        .iter()
        .map(|s| render_chunk_block(s))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

fn render_chunk_block(scored: &ScoredChunk) -> String {
    let meta = &scored.chunk.metadata;
    let mut lines = vec![
        format!("Dish: {}", meta.dish_name),
        format!("Origin: {}", meta.origin),
    ];

    for (label, value) in [
        ("Prep time", &meta.prep_time),
        ("Cook time", &meta.cook_time),
        ("Total time", &meta.total_time),
    ] {
        if let Some(duration) = value {
            let rendered = match parse_duration_minutes(duration) {
                Some(minutes) => format!("{minutes} minutes"),
                None => duration.clone(),
            };
            lines.push(format!("{label}: {rendered}"));
        }
    }
    if let Some(servings) = meta.servings {
        lines.push(format!("Servings: {servings}"));
    }
    if !meta.ingredients.is_empty() {
        lines.push(format!("Ingredients:\n- {}", meta.ingredients.join("\n- ")));
    }
    if !meta.steps.is_empty() {
        let steps = meta
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {}", i + 1, s))
            .collect::<Vec<_>>()
            .join("\n");
        lines.push(format!("Steps:\n{steps}"));
    }
    if let Some(notes) = &meta.notes {
        lines.push(format!("Notes: {notes}"));
    }
    if !meta.nutrition.is_empty() {
        let nutrition = meta
            .nutrition
            .iter()
            .map(|(k, v)| format!("{}: {}", k, render_value(v)))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("Nutrition: {nutrition}"));
    }
    if let Some(source_url) = &meta.source_url {
        lines.push(format!("Source: {source_url}"));
    }

    lines.join("\n")
}

/// Build the full single-turn prompt for a question over retrieved context.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a helpful recipe assistant. Answer the question using only \
         the recipe context below. If the answer isn't found in the context, \
         say so plainly instead of guessing.\n\n\
         Context:\n{context}\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}

/// Compose an answer to `question` from retrieved chunks, best match first.
///
/// With no chunks the model is never called and a fixed fallback is returned.
pub async fn compose_answer(
    question: &str,
    scored: &[ScoredChunk],
    model: &dyn ChatModel,
) -> Result<Answer> {
    if scored.is_empty() {
        return Ok(Answer {
            text: "I couldn't find any recipes matching your question.".to_string(),
            sources: vec![],
        });
    }

    let context = render_context(scored);
    let prompt = build_prompt(question, &context);

    tracing::debug!(
        "Asking {} with {} context chunks",
        model.model_name(),
        scored.len()
    );
    let text = model.complete(&prompt).await?;

    let sources = dedup_by_document(scored)
        .into_iter()
        .map(|s| s.chunk.metadata.dish_name)
        .collect();

    Ok(Answer { text, sources })
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Chat model backed by Groq's OpenAI-compatible API.
#[derive(Clone, Debug)]
pub struct GroqClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GroqClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// Build a client from the `GROQ_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .context("GROQ_API_KEY environment variable is not set")?;
        Ok(Self::new(api_key, GROQ_DEFAULT_MODEL.to_string()))
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(GROQ_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("chat completion returned {status}: {body}");
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("malformed chat completion response")?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content);
        match content {
            Some(text) => Ok(text),
            None => bail!("chat completion returned no choices"),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
