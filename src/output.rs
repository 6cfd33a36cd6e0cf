//! Output formatting for CLI display.
//!
//! Provides the [`PrettyPrint`] trait for human-readable output
//! as an alternative to JSON serialization.

use chrono::{DateTime, Utc};

use crate::{
    App, AppInstance, AppRevision, Build, BuildRun, ConfigMap, EnvVar, EnvVarType, Job, JobRun,
    Project, Secret,
};

/// Trait for human-readable key-value output.
///
/// Implemented by resource types to provide formatted output
/// suitable for terminal display when `--json` is not specified.
pub trait PrettyPrint {
    /// Returns a formatted string for terminal display.
    fn pretty_print(&self) -> String;
}

/// Collects `Label: value` lines under a header.
struct Lines(Vec<String>);

impl Lines {
    fn new(kind: &str, name: &str) -> Self {
        let header = format!("{kind}: {name}");
        let divider = "─".repeat(header.chars().count().max(30));
        Self(vec![header, divider])
    }

    fn field(&mut self, label: &str, value: impl std::fmt::Display) {
        self.0.push(format!("{:<16}{}", format!("{label}:"), value));
    }

    fn opt(&mut self, label: &str, value: Option<impl std::fmt::Display>) {
        if let Some(value) = value {
            self.field(label, value);
        }
    }

    fn time(&mut self, label: &str, value: Option<&DateTime<Utc>>) {
        self.opt(label, value.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC")));
    }

    fn finish(self) -> String {
        self.0.join("\n")
    }
}

fn describe_env_var(var: &EnvVar) -> String {
    let name = var.name.as_deref().unwrap_or("*");
    let reference = var.reference.as_deref().unwrap_or_default();
    match var.env_type {
        EnvVarType::Literal => format!("{}={}", name, var.value.as_deref().unwrap_or_default()),
        EnvVarType::ConfigMapKeyReference | EnvVarType::SecretKeyReference => format!(
            "{} <- {}[{}]",
            name,
            reference,
            var.key.as_deref().unwrap_or_default()
        ),
        EnvVarType::ConfigMapFullReference | EnvVarType::SecretFullReference => {
            format!("{}* <- {}", var.prefix.as_deref().unwrap_or_default(), reference)
        }
    }
}

impl PrettyPrint for Project {
    fn pretty_print(&self) -> String {
        let mut lines = Lines::new("Project", &self.name);
        lines.field("ID", &self.id);
        lines.opt("Region", self.region.as_deref());
        lines.opt("Status", self.status.as_deref());
        lines.opt("Resource Group", self.resource_group_id.as_deref());
        lines.opt("CRN", self.crn.as_deref());
        lines.time("Created", self.created_at.as_ref());
        lines.finish()
    }
}

impl PrettyPrint for App {
    fn pretty_print(&self) -> String {
        let mut lines = Lines::new("App", &self.name);
        lines.field("Image", &self.image_reference);
        lines.opt("Status", self.status.as_deref());
        lines.opt("URL", self.endpoint.as_deref());
        lines.opt("Internal URL", self.endpoint_internal.as_deref());
        lines.opt("Latest Ready", self.latest_ready_revision());
        if let (Some(min), Some(max)) = (self.scale_min_instances, self.scale_max_instances) {
            lines.field("Instances", format!("{min}-{max}"));
        }
        if let (Some(cpu), Some(memory)) = (&self.scale_cpu_limit, &self.scale_memory_limit) {
            lines.field("Resources", format!("{cpu} vCPU, {memory}"));
        }
        for var in &self.run_env_variables {
            lines.field("Env", describe_env_var(var));
        }
        lines.opt(
            "Reason",
            self.status_details.as_ref().and_then(|d| d.reason.as_deref()),
        );
        lines.time("Created", self.created_at.as_ref());
        lines.finish()
    }
}

impl PrettyPrint for AppRevision {
    fn pretty_print(&self) -> String {
        let mut lines = Lines::new("Revision", &self.name);
        lines.opt("App", self.app_name.as_deref());
        lines.opt("Image", self.image_reference.as_deref());
        lines.opt("Status", self.status.as_deref());
        lines.opt(
            "Instances",
            self.status_details.as_ref().and_then(|d| d.actual_instances),
        );
        lines.time("Created", self.created_at.as_ref());
        lines.finish()
    }
}

impl PrettyPrint for AppInstance {
    fn pretty_print(&self) -> String {
        let mut lines = Lines::new("Instance", &self.name);
        lines.opt("App", self.app_name.as_deref());
        lines.opt("Revision", self.revision_name.as_deref());
        lines.opt("Status", self.status.as_deref());
        lines.opt("Restarts", self.restarts);
        lines.time("Created", self.created_at.as_ref());
        lines.finish()
    }
}

impl PrettyPrint for Job {
    fn pretty_print(&self) -> String {
        let mut lines = Lines::new("Job", &self.name);
        lines.field("Image", &self.image_reference);
        lines.opt("Mode", self.run_mode.as_deref());
        lines.opt("Array Spec", self.scale_array_spec.as_deref());
        lines.opt("Retry Limit", self.scale_retry_limit);
        lines.opt(
            "Max Exec Time",
            self.scale_max_execution_time.map(|s| format!("{s}s")),
        );
        for var in &self.run_env_variables {
            lines.field("Env", describe_env_var(var));
        }
        lines.time("Created", self.created_at.as_ref());
        lines.finish()
    }
}

impl PrettyPrint for JobRun {
    fn pretty_print(&self) -> String {
        let mut lines = Lines::new("Job Run", &self.name);
        lines.opt("Job", self.job_name.as_deref());
        lines.opt("Image", self.image_reference.as_deref());
        lines.opt("Status", self.status.as_deref());
        if let Some(ref details) = self.status_details {
            lines.field(
                "Instances",
                format!(
                    "{} requested, {} succeeded, {} failed, {} running",
                    details.requested.unwrap_or(0),
                    details.succeeded.unwrap_or(0),
                    details.failed.unwrap_or(0),
                    details.running.unwrap_or(0)
                ),
            );
            lines.time("Started", details.start_time.as_ref());
            lines.time("Completed", details.completion_time.as_ref());
        }
        lines.finish()
    }
}

impl PrettyPrint for Build {
    fn pretty_print(&self) -> String {
        let mut lines = Lines::new("Build", &self.name);
        lines.field("Output Image", &self.output_image);
        lines.field("Strategy", &self.strategy_type);
        lines.opt("Size", self.strategy_size.as_deref());
        lines.opt("Source", self.source_url.as_deref());
        lines.opt("Revision", self.source_revision.as_deref());
        lines.opt("Status", self.status.as_deref());
        lines.time("Created", self.created_at.as_ref());
        lines.finish()
    }
}

impl PrettyPrint for BuildRun {
    fn pretty_print(&self) -> String {
        let mut lines = Lines::new("Build Run", &self.name);
        lines.opt("Build", self.build_name.as_deref());
        lines.opt("Output Image", self.output_image.as_deref());
        lines.opt("Status", self.status.as_deref());
        if let Some(ref details) = self.status_details {
            lines.opt("Digest", details.output_digest.as_deref());
            lines.opt("Reason", details.reason.as_deref());
            lines.time("Started", details.start_time.as_ref());
            lines.time("Completed", details.completion_time.as_ref());
        }
        lines.finish()
    }
}

impl PrettyPrint for ConfigMap {
    fn pretty_print(&self) -> String {
        let mut lines = Lines::new("Config Map", &self.name);
        lines.field("Entries", self.data.len());
        for (key, value) in &self.data {
            lines.field(&format!("  {key}"), value);
        }
        lines.time("Created", self.created_at.as_ref());
        lines.finish()
    }
}

impl PrettyPrint for Secret {
    fn pretty_print(&self) -> String {
        let mut lines = Lines::new("Secret", &self.name);
        lines.field("Format", self.format);
        // Values are never printed.
        lines.field("Keys", self.keys().collect::<Vec<_>>().join(", "));
        lines.time("Created", self.created_at.as_ref());
        lines.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_pretty_print_format() {
        let project: Project = serde_json::from_value(serde_json::json!({
            "id": "4e49b3e0-27a8-48d2-a784-c7ee48bb863b",
            "name": "my-project",
            "status": "active"
        }))
        .unwrap();

        let output = project.pretty_print();
        assert!(output.starts_with("Project: my-project"));
        assert!(output.contains("ID:"));
        assert!(output.contains("active"));
        assert!(!output.contains("Region:"));
    }

    #[test]
    fn test_describe_env_var() {
        assert_eq!(describe_env_var(&EnvVar::literal("A", "1")), "A=1");
        assert_eq!(
            describe_env_var(&EnvVar::secret_key("PASS", "db", "password")),
            "PASS <- db[password]"
        );
        assert_eq!(describe_env_var(&EnvVar::config_map("settings")), "* <- settings");
    }
}
