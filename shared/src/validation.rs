//! Input validation functions
//!
//! Field-level rules live on the request types as `validator` derives;
//! this module holds the cross-field rules and the conversion of
//! `validator` output into per-field errors for the API.

use crate::errors::FieldError;
use crate::types::DraftTask;
use chrono::NaiveDate;
use std::sync::OnceLock;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Longest span a single plan draft or generation call may cover
pub const MAX_PLAN_DAYS: i64 = 31;

/// Upper bound on tasks in one draft
pub const MAX_DRAFT_TASKS: usize = 500;

/// Longest chat message accepted
pub const MAX_MESSAGE_CHARS: usize = 2000;

fn email_regex() -> &'static regex_lite::Regex {
    static EMAIL: OnceLock<regex_lite::Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        regex_lite::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex is valid")
    })
}

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    if email.len() > 255 {
        return Err("Email too long".to_string());
    }
    if !email_regex().is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

/// Emails are compared case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    if password.len() > 128 {
        return Err("Password too long".to_string());
    }
    Ok(())
}

/// Validate a plan date range
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), String> {
    if end < start {
        return Err("End date must not be before start date".to_string());
    }
    if (end - start).num_days() + 1 > MAX_PLAN_DAYS {
        return Err(format!("A plan may cover at most {} days", MAX_PLAN_DAYS));
    }
    Ok(())
}

/// Validate every task of a draft, reporting fields as `tasks[i].field`
pub fn validate_draft_tasks(tasks: &[DraftTask]) -> Result<(), Vec<FieldError>> {
    if tasks.is_empty() {
        return Err(vec![FieldError::new("tasks", "A draft needs at least one task")]);
    }
    if tasks.len() > MAX_DRAFT_TASKS {
        return Err(vec![FieldError::new(
            "tasks",
            format!("A draft may hold at most {} tasks", MAX_DRAFT_TASKS),
        )]);
    }

    let mut errors = Vec::new();
    for (i, task) in tasks.iter().enumerate() {
        if let Err(e) = task.validate() {
            collect_field_errors(&format!("tasks[{}]", i), &e, &mut errors);
        }
        if task.title.trim().is_empty() {
            errors.push(FieldError::new(format!("tasks[{}].title", i), "Title is required"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Trim and bound a chat message
pub fn validate_message_text(text: &str) -> Result<String, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("Message cannot be empty".to_string());
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(format!("Message may be at most {} characters", MAX_MESSAGE_CHARS));
    }
    Ok(trimmed.to_string())
}

/// Flatten `validator` output into per-field errors with camelCase paths
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect_field_errors("", errors, &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn collect_field_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (name, kind) in errors.errors() {
        let field = camel_case(&name.to_string());
        let path = if prefix.is_empty() {
            field
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", err.code));
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (i, inner) in items {
                    collect_field_errors(&format!("{}[{}]", path, i), inner, out);
                }
            }
        }
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
