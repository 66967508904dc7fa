//! API request and response types
//!
//! All JSON bodies use camelCase field names.

use crate::models::{PlanStatus, Role, TaskStatus, TaskType};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<crate::errors::FieldError>>,
}

// ============================================================================
// Authentication
// ============================================================================

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Portal the user is signing into; must match the account role when given
    #[serde(default)]
    pub role: Option<Role>,
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters"))]
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Refresh token request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Successful authentication: the user snapshot plus session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

// ============================================================================
// Users and Packages
// ============================================================================

/// Public view of a user account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_package: Option<PackageResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Admin update of a user account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub package_id: Option<Uuid>,
    #[serde(default)]
    pub package_end_date: Option<DateTime<Utc>>,
}

/// Package catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageResponse {
    pub id: Uuid,
    pub name: String,
    pub duration_days: i32,
    pub price: Decimal,
    pub features: Vec<String>,
    pub is_active: bool,
}

/// Create a package
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePackageRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(range(min = 1, max = 3650, message = "Duration must be between 1 and 3650 days"))]
    pub duration_days: i32,
    pub price: Decimal,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Partial package update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePackageRequest {
    #[validate(length(min = 1, max = 100, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(range(min = 1, max = 3650, message = "Duration must be between 1 and 3650 days"))]
    pub duration_days: Option<i32>,
    pub price: Option<Decimal>,
    pub features: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Subscribe the caller to a package
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub package_id: Uuid,
}

// ============================================================================
// Plan Requests
// ============================================================================

/// Health intake questionnaire submitted with a plan request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IntakeForm {
    #[validate(length(min = 1, max = 2000, message = "Please describe your goals"))]
    pub goals: String,
    #[validate(range(min = 20.0, max = 500.0, message = "Weight must be between 20 and 500 kg"))]
    pub current_weight: Option<f64>,
    #[validate(range(min = 20.0, max = 500.0, message = "Weight must be between 20 and 500 kg"))]
    pub target_weight: Option<f64>,
    #[validate(range(min = 50.0, max = 300.0, message = "Height must be between 50 and 300 cm"))]
    pub height: Option<f64>,
    #[validate(range(min = 1, max = 120, message = "Age must be between 1 and 120"))]
    pub age: Option<i32>,
    #[validate(length(max = 32))]
    pub gender: Option<String>,
    #[validate(length(max = 64))]
    pub activity_level: Option<String>,
    #[validate(length(max = 1000))]
    pub allergies: Option<String>,
    #[validate(length(max = 1000))]
    pub preferred_meals: Option<String>,
}

/// One task of a doctor-authored draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DraftTask {
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub time: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, max = 10000, message = "Calories must be between 0 and 10000"))]
    pub calories: Option<i32>,
}

/// A plan request as seen by its viewers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequestResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    pub status: PlanStatus,
    pub request_date: DateTime<Utc>,
    #[serde(flatten)]
    pub intake: IntakeForm,
    pub draft_tasks: Vec<DraftTask>,
}

/// Admin assigns a doctor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDoctorRequest {
    pub doctor_id: Uuid,
}

/// Doctor submits a draft schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitDraftRequest {
    pub tasks: Vec<DraftTask>,
}

/// Admin publishes, optionally with an edited task list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    #[serde(default)]
    pub draft_tasks: Option<Vec<DraftTask>>,
}

/// Result of a publish
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    pub tasks_created: usize,
    pub request: PlanRequestResponse,
}

/// Ask the plan generator for a candidate draft
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanRequest {
    #[validate(length(min = 1, max = 4000, message = "Notes are required"))]
    pub notes: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Candidate draft from the generator. An empty list with a
/// `fallbackReason` means the doctor should write the plan by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub tasks: Vec<DraftTask>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

// ============================================================================
// Daily Tasks and Stats
// ============================================================================

/// Task list filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub client_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

/// A materialized daily task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTaskResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub date: NaiveDate,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<i32>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
}

/// Stats window selector; parsed leniently so bad values become field errors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsQuery {
    pub range: Option<String>,
}

// ============================================================================
// Chat
// ============================================================================

/// A persisted chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageResponse {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub text: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub read: bool,
}

/// REST fallback for sending a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// Events a websocket client may emit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    Join { user_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Send {
        #[serde(default)]
        sender_id: Option<Uuid>,
        receiver_id: Uuid,
        text: String,
    },
}

/// Events the server pushes to websocket clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    Joined { user_id: Uuid },
    MessageReceived { message: ChatMessageResponse },
    MessageSent { message: ChatMessageResponse },
    Error { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_task_wire_format() {
        let json = r#"{"date":"2026-03-02","title":"Breakfast","type":"MEAL","time":"08:00 AM"}"#;
        let task: DraftTask = serde_json::from_str(json).unwrap();
        assert_eq!(task.task_type, TaskType::Meal);
        assert_eq!(task.description, "");
        assert!(task.calories.is_none());
    }

    #[test]
    fn test_client_event_tagging() {
        let receiver = Uuid::new_v4();
        let json = format!(r#"{{"type":"send","receiverId":"{}","text":"hi"}}"#, receiver);
        let event: ClientEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(
            event,
            ClientEvent::Send {
                sender_id: None,
                receiver_id: receiver,
                text: "hi".to_string()
            }
        );
    }

    #[test]
    fn test_server_event_tagging() {
        let event = ServerEvent::Error {
            code: "FORBIDDEN".to_string(),
            message: "nope".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "FORBIDDEN");
    }

    #[test]
    fn test_plan_request_flattens_intake() {
        let response = PlanRequestResponse {
            id: Uuid::nil(),
            client_id: Uuid::nil(),
            client_name: "Alice".to_string(),
            doctor_id: None,
            doctor_name: None,
            status: PlanStatus::Requested,
            request_date: Utc::now(),
            intake: IntakeForm {
                goals: "Lose weight".to_string(),
                current_weight: Some(80.0),
                ..Default::default()
            },
            draft_tasks: vec![],
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["goals"], "Lose weight");
        assert_eq!(value["currentWeight"], 80.0);
        assert_eq!(value["status"], "REQUESTED");
    }
}
