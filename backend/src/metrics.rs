//! Prometheus metrics
//!
//! Counter names are shared between the services that bump them and the
//! recorder that describes them.

use anyhow::Context;
use metrics::{describe_counter, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const REGISTRATIONS: &str = "helix_registrations_total";
pub const REQUESTS_SUBMITTED: &str = "helix_requests_submitted_total";
pub const PLANS_PUBLISHED: &str = "helix_plans_published_total";
pub const TASKS_PUBLISHED: &str = "helix_tasks_published_total";
pub const TASK_TOGGLES: &str = "helix_task_toggles_total";
pub const CHAT_MESSAGES: &str = "helix_chat_messages_total";
pub const PLAN_GENERATIONS: &str = "helix_plan_generation_total";

/// Install the global recorder; call once at startup
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    describe();
    Ok(handle)
}

fn describe() {
    describe_counter!(REGISTRATIONS, Unit::Count, "Accounts created via public registration");
    describe_counter!(REQUESTS_SUBMITTED, Unit::Count, "Plan requests submitted by clients");
    describe_counter!(PLANS_PUBLISHED, Unit::Count, "Plan requests published to ACTIVE");
    describe_counter!(TASKS_PUBLISHED, Unit::Count, "Daily tasks created by plan publishes");
    describe_counter!(TASK_TOGGLES, Unit::Count, "Daily task completion toggles");
    describe_counter!(CHAT_MESSAGES, Unit::Count, "Chat messages persisted");
    describe_counter!(
        PLAN_GENERATIONS,
        Unit::Count,
        "AI plan generation attempts by outcome"
    );
}
