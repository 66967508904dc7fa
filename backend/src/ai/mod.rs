//! AI-assisted plan drafting
//!
//! A [`PlanGenerator`] turns a doctor's free-text notes into candidate
//! draft tasks for a date range. Generation never touches stored state;
//! callers decide what to do with the result.

mod ollama;

pub use ollama::OllamaPlanGenerator;

use crate::config::AiConfig;
use async_trait::async_trait;
use chrono::NaiveDate;
use helix_shared::types::DraftTask;
use helix_shared::validation::validate_date_range;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Inclusive calendar range a plan covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Fails when `start > end` or the span is too long
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        validate_date_range(start, end)?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("AI plan generation is disabled")]
    Disabled,

    #[error("AI service timed out")]
    Timeout,

    #[error("AI service request failed: {0}")]
    Http(String),

    #[error("AI service returned an unreadable plan: {0}")]
    InvalidResponse(String),

    #[error("AI service returned no tasks for the requested dates")]
    Empty,
}

impl GenerationError {
    /// Label for the `outcome` metric dimension
    pub fn outcome(&self) -> &'static str {
        match self {
            GenerationError::Disabled => "disabled",
            GenerationError::Timeout => "timeout",
            GenerationError::Http(_) => "http_error",
            GenerationError::InvalidResponse(_) => "invalid_response",
            GenerationError::Empty => "empty",
        }
    }
}

#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate_plan(
        &self,
        notes: &str,
        range: DateRange,
    ) -> Result<Vec<DraftTask>, GenerationError>;
}

/// Used when no AI backend is configured
pub struct DisabledPlanGenerator;

#[async_trait]
impl PlanGenerator for DisabledPlanGenerator {
    async fn generate_plan(
        &self,
        _notes: &str,
        _range: DateRange,
    ) -> Result<Vec<DraftTask>, GenerationError> {
        Err(GenerationError::Disabled)
    }
}

/// Pick the generator described by `config`
pub fn from_config(config: &AiConfig) -> anyhow::Result<Arc<dyn PlanGenerator>> {
    if !config.enabled {
        info!("AI plan generation disabled");
        return Ok(Arc::new(DisabledPlanGenerator));
    }

    info!(url = %config.ollama_url, model = %config.model, "AI plan generation enabled");
    Ok(Arc::new(OllamaPlanGenerator::new(config)?))
}

/// Instruction text sent to the model
pub fn build_prompt(notes: &str, range: DateRange) -> String {
    format!(
        "You are a medical dietary assistant.\n\
         Create a daily plan for a patient based on the doctor's notes: \"{notes}\".\n\
         The plan must cover every day from {start} to {end} inclusive.\n\
         For each day generate 3-5 specific tasks (meals or activities), varying \
         meals slightly where the diet allows.\n\
         Dates use YYYY-MM-DD, type is MEAL or ACTIVITY, time looks like 08:00 AM.",
        notes = notes.trim(),
        start = range.start,
        end = range.end,
    )
}
