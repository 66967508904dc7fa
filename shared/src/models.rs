//! Domain enums for the Helix application
//!
//! Every enum is stored as upper-case text in the database and travels
//! as the same text on the wire.

use crate::errors::ParseEnumError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Implements `Display`, `FromStr`, `TryFrom<String>` and `as_str` for a
/// unit-only enum from a fixed list of variant/text pairs.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Canonical text form
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseEnumError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

/// Account role. Fixed for the lifetime of a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Client,
    Doctor,
    Admin,
}

text_enum!(Role, "role", {
    Client => "CLIENT",
    Doctor => "DOCTOR",
    Admin => "ADMIN",
});

/// Lifecycle of a plan request.
///
/// ```text
/// REQUESTED        -> PROCESSING        (admin assigns a doctor)
/// PROCESSING       -> PROCESSING        (admin reassigns)
/// PROCESSING       -> PENDING_APPROVAL  (doctor submits a draft)
/// PENDING_APPROVAL -> ACTIVE            (admin publishes)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Requested,
    Processing,
    PendingApproval,
    Active,
}

text_enum!(PlanStatus, "plan status", {
    Requested => "REQUESTED",
    Processing => "PROCESSING",
    PendingApproval => "PENDING_APPROVAL",
    Active => "ACTIVE",
});

impl PlanStatus {
    /// Whether `from -> to` is an edge of the lifecycle graph
    pub fn can_transition(from: PlanStatus, to: PlanStatus) -> bool {
        matches!(
            (from, to),
            (PlanStatus::Requested, PlanStatus::Processing)
                | (PlanStatus::Processing, PlanStatus::Processing)
                | (PlanStatus::Processing, PlanStatus::PendingApproval)
                | (PlanStatus::PendingApproval, PlanStatus::Active)
        )
    }

    /// Open requests still move through the workflow
    pub fn is_open(&self) -> bool {
        !matches!(self, PlanStatus::Active)
    }
}

/// Kind of daily task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Meal,
    Activity,
}

text_enum!(TaskType, "task type", {
    Meal => "MEAL",
    Activity => "ACTIVITY",
});

/// Completion state of a daily task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

text_enum!(TaskStatus, "task status", {
    Pending => "PENDING",
    Completed => "COMPLETED",
});

impl TaskStatus {
    /// The other state
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }
}

/// Window for progress statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsRange {
    #[default]
    Week,
    Month,
}

text_enum!(StatsRange, "stats range", {
    Week => "week",
    Month => "month",
});

impl StatsRange {
    /// Number of calendar days covered, today included
    pub fn days(&self) -> u32 {
        match self {
            StatsRange::Week => 7,
            StatsRange::Month => 30,
        }
    }
}
