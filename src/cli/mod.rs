//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the codeengine binary.

use clap::{Parser, Subcommand, ValueEnum};

/// Code Engine API command-line interface.
#[derive(Parser, Debug)]
#[command(name = "codeengine", about = "Code Engine API CLI", version)]
pub struct Cli {
    /// Output results as JSON instead of a table.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Get a single resource by name (or ID for projects).
    Get {
        /// The type of resource to get.
        entity: Entity,

        /// Resource name, or the project ID for projects.
        name: String,

        /// Project ID (required for everything except projects).
        #[arg(long, env = "CODE_ENGINE_PROJECT")]
        project: Option<String>,

        /// Owning app (required for app revisions).
        #[arg(long)]
        app: Option<String>,
    },

    /// List resources, one page at a time or all at once.
    List {
        /// The type of resource to list.
        entity: Entity,

        /// Project ID (required for everything except projects).
        #[arg(long, env = "CODE_ENGINE_PROJECT")]
        project: Option<String>,

        /// Number of items per page (max 100).
        #[arg(long)]
        limit: Option<u32>,

        /// Cursor from a previous page.
        #[arg(long)]
        start: Option<String>,

        /// Fetch every page.
        #[arg(long, conflicts_with = "start")]
        all: bool,

        /// Owning app (required for app revisions and instances).
        #[arg(long)]
        app: Option<String>,

        /// Only list runs of this job.
        #[arg(long)]
        job: Option<String>,

        /// Only list runs of this build.
        #[arg(long)]
        build: Option<String>,
    },

    /// Create a resource.
    Create {
        /// The type of resource to create.
        entity: Entity,

        /// Name of the new resource (generated for runs when omitted).
        name: Option<String>,

        /// Project ID (required for everything except projects).
        #[arg(long, env = "CODE_ENGINE_PROJECT")]
        project: Option<String>,

        /// Container image (apps, jobs, standalone job runs).
        #[arg(long)]
        image: Option<String>,

        /// Job to submit a run of.
        #[arg(long)]
        job: Option<String>,

        /// Build to submit a run of.
        #[arg(long)]
        build: Option<String>,

        /// Key-value entry for config maps and secrets (repeatable).
        #[arg(long = "from-literal", value_parser = parse_key_val)]
        from_literal: Vec<(String, String)>,
    },

    /// Delete a resource.
    Delete {
        /// The type of resource to delete.
        entity: Entity,

        /// Resource name, or the project ID for projects.
        name: String,

        /// Project ID (required for everything except projects).
        #[arg(long, env = "CODE_ENGINE_PROJECT")]
        project: Option<String>,

        /// Owning app (required for app revisions).
        #[arg(long)]
        app: Option<String>,
    },
}

/// Resource types that can be operated on.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    /// A project.
    #[value(alias = "projects")]
    Project,
    /// An app.
    #[value(alias = "apps")]
    App,
    /// An app revision.
    #[value(alias = "app-revisions", alias = "revisions")]
    AppRevision,
    /// A running app instance.
    #[value(alias = "app-instances", alias = "instances")]
    AppInstance,
    /// A job.
    #[value(alias = "jobs")]
    Job,
    /// A job run.
    #[value(alias = "job-runs", alias = "jobruns")]
    JobRun,
    /// A build.
    #[value(alias = "builds")]
    Build,
    /// A build run.
    #[value(alias = "build-runs", alias = "buildruns")]
    BuildRun,
    /// A config map.
    #[value(alias = "config-maps", alias = "configmaps", alias = "cm")]
    ConfigMap,
    /// A secret.
    #[value(alias = "secrets")]
    Secret,
}

/// Parse a `KEY=VALUE` literal.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("LOG_LEVEL=debug"),
            Ok(("LOG_LEVEL".to_string(), "debug".to_string()))
        );
        assert_eq!(
            parse_key_val("URL=http://x?a=b"),
            Ok(("URL".to_string(), "http://x?a=b".to_string()))
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }
}
