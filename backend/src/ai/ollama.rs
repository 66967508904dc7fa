//! Ollama-compatible `/api/generate` client

use super::{build_prompt, DateRange, GenerationError, PlanGenerator};
use crate::config::AiConfig;
use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use helix_shared::types::DraftTask;
use helix_shared::TaskType;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

pub struct OllamaPlanGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    format: Value,
}

#[derive(Deserialize)]
struct GenerateReply {
    response: String,
}

/// Task as the model emits it; loosely typed so one bad row does not sink
/// the whole plan
#[derive(Deserialize)]
struct GeneratedTask {
    date: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type")]
    task_type: String,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    calories: Option<i32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GeneratedPlan {
    Wrapped { tasks: Vec<GeneratedTask> },
    Bare(Vec<GeneratedTask>),
}

impl OllamaPlanGenerator {
    pub fn new(config: &AiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build AI HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", config.ollama_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone().map(SecretString::new),
        })
    }

    /// JSON schema the model output must follow
    fn response_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "tasks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "date": { "type": "string" },
                            "title": { "type": "string" },
                            "description": { "type": "string" },
                            "type": { "type": "string", "enum": ["MEAL", "ACTIVITY"] },
                            "time": { "type": "string" },
                            "calories": { "type": "integer" }
                        },
                        "required": ["date", "title", "description", "type", "time"]
                    }
                }
            },
            "required": ["tasks"]
        })
    }
}

/// Keep rows that parse and fall inside `range`
fn into_draft_tasks(generated: Vec<GeneratedTask>, range: DateRange) -> Vec<DraftTask> {
    generated
        .into_iter()
        .filter_map(|task| {
            let date = NaiveDate::parse_from_str(task.date.trim(), "%Y-%m-%d").ok()?;
            if !range.contains(date) {
                return None;
            }
            let task_type: TaskType = task.task_type.trim().to_uppercase().parse().ok()?;
            let title = task.title.trim();
            if title.is_empty() {
                return None;
            }

            Some(DraftTask {
                date,
                title: title.chars().take(200).collect(),
                description: task.description.trim().chars().take(2000).collect(),
                task_type,
                time: task.time.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
                calories: task.calories.filter(|c| (0..=10_000).contains(c)),
            })
        })
        .collect()
}

fn parse_plan(raw: &str, range: DateRange) -> Result<Vec<DraftTask>, GenerationError> {
    let plan: GeneratedPlan =
        serde_json::from_str(raw).map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
    let generated = match plan {
        GeneratedPlan::Wrapped { tasks } | GeneratedPlan::Bare(tasks) => tasks,
    };

    let total = generated.len();
    let tasks = into_draft_tasks(generated, range);
    if tasks.len() < total {
        debug!(dropped = total - tasks.len(), "Discarded generated tasks");
    }
    if tasks.is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(tasks)
}

#[async_trait]
impl PlanGenerator for OllamaPlanGenerator {
    async fn generate_plan(
        &self,
        notes: &str,
        range: DateRange,
    ) -> Result<Vec<DraftTask>, GenerationError> {
        let body = GenerateBody {
            model: &self.model,
            prompt: build_prompt(notes, range),
            stream: false,
            format: Self::response_schema(),
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else {
                GenerationError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "AI service returned an error status");
            return Err(GenerationError::Http(format!("status {status}")));
        }

        let reply: GenerateReply = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else {
                GenerationError::InvalidResponse(e.to_string())
            }
        })?;

        parse_plan(&reply.response, range)
    }
}
