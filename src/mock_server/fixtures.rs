//! Test data fixtures for the mock server.
//!
//! Provides factory functions for creating realistic test data.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::state::MockState;
use crate::{
    App, AppInstance, AppRevision, Build, BuildRun, ConfigMap, Job, JobRun, Project, Secret,
    SecretFormat,
};

/// Region reported by every fixture.
pub const MOCK_REGION: &str = "mock-south";

/// Collection of fixture factories for test data.
pub struct Fixtures;

/// Deserialize a fixture document into its model type.
///
/// Fixture documents are static and always match the models, so a failure
/// here is a bug in this file.
fn build<T: DeserializeOwned>(value: Value) -> T {
    match serde_json::from_value(value) {
        Ok(item) => item,
        Err(e) => panic!("fixture does not match model: {e}"),
    }
}

fn href(project_id: &str, collection: &str, name: &str) -> String {
    format!("/v2/projects/{project_id}/{collection}/{name}")
}

impl Fixtures {
    /// The project that [`Fixtures::default_scenario`] populates.
    pub const DEFAULT_PROJECT_ID: &'static str = "15314cc3-85b4-4338-903f-c28cdee6d005";

    // Projects

    /// Create an active project.
    pub fn project(id: &str, name: &str) -> Project {
        build(json!({
            "id": id,
            "name": name,
            "region": MOCK_REGION,
            "account_id": "mock-account",
            "resource_group_id": "mock-resource-group",
            "crn": format!("crn:v1:bluemix:public:codeengine:{MOCK_REGION}:a/mock-account:{id}::"),
            "href": format!("/v2/projects/{id}"),
            "created_at": "2024-05-01T09:00:00Z",
            "status": "active",
            "resource_type": "project_v2"
        }))
    }

    // Apps

    /// Create a ready app without revisions.
    ///
    /// Use [`MockState::with`] and the revision fixtures for a complete app,
    /// or create it through the API to have revisions rolled out.
    pub fn app(project_id: &str, name: &str, image: &str) -> App {
        build(json!({
            "name": name,
            "id": format!("app-{name}"),
            "project_id": project_id,
            "region": MOCK_REGION,
            "href": href(project_id, "apps", name),
            "created_at": "2024-05-01T10:00:00Z",
            "resource_type": "app_v2",
            "entity_tag": "1",
            "image_reference": image,
            "image_port": 8080,
            "endpoint": format!("https://{name}.{project_id}.mock.codeengine.test"),
            "scale_cpu_limit": "1",
            "scale_memory_limit": "4G",
            "scale_min_instances": 0,
            "scale_max_instances": 10,
            "status": "ready",
            "status_details": {
                "latest_created_revision": format!("{name}-00001"),
                "latest_ready_revision": format!("{name}-00001")
            }
        }))
    }

    /// Create a ready revision of an app.
    pub fn app_revision(project_id: &str, app_name: &str, name: &str, image: &str) -> AppRevision {
        build(json!({
            "name": name,
            "app_name": app_name,
            "id": format!("rev-{name}"),
            "project_id": project_id,
            "region": MOCK_REGION,
            "href": format!("/v2/projects/{project_id}/apps/{app_name}/revisions/{name}"),
            "resource_type": "app_revision_v2",
            "image_reference": image,
            "status": "ready",
            "status_details": { "actual_instances": 1 }
        }))
    }

    /// Create a running instance of an app revision.
    pub fn app_instance(
        project_id: &str,
        app_name: &str,
        revision_name: &str,
        name: &str,
    ) -> AppInstance {
        build(json!({
            "name": name,
            "app_name": app_name,
            "revision_name": revision_name,
            "project_id": project_id,
            "href": format!("/v2/projects/{project_id}/apps/{app_name}/instances/{name}"),
            "resource_type": "app_instance_v2",
            "restarts": 0,
            "status": "running",
            "user_container": {
                "current_state": { "container_status": "running" }
            }
        }))
    }

    // Jobs

    /// Create a batch job.
    pub fn job(project_id: &str, name: &str) -> Job {
        build(json!({
            "name": name,
            "id": format!("job-{name}"),
            "project_id": project_id,
            "region": MOCK_REGION,
            "href": href(project_id, "jobs", name),
            "created_at": "2024-05-01T11:00:00Z",
            "resource_type": "job_v2",
            "entity_tag": "1",
            "image_reference": "icr.io/codeengine/firstjob",
            "run_mode": "task",
            "scale_array_spec": "0",
            "scale_max_execution_time": 7200,
            "scale_retry_limit": 3
        }))
    }

    /// Create a run of a job with the given status.
    pub fn job_run(project_id: &str, job_name: &str, name: &str, status: &str) -> JobRun {
        let failed = u32::from(status == "failed");
        build(json!({
            "name": name,
            "job_name": job_name,
            "id": format!("jobrun-{name}"),
            "project_id": project_id,
            "region": MOCK_REGION,
            "href": href(project_id, "job_runs", name),
            "created_at": "2024-05-02T01:00:00Z",
            "resource_type": "job_run_v2",
            "image_reference": "icr.io/codeengine/firstjob",
            "run_mode": "task",
            "scale_array_spec": "0",
            "status": status,
            "status_details": {
                "requested": 1,
                "succeeded": 1 - failed,
                "failed": failed,
                "start_time": "2024-05-02T01:00:05Z",
                "completion_time": "2024-05-02T01:02:00Z"
            }
        }))
    }

    // Builds

    /// Create a buildpacks build from a git repository.
    pub fn build(project_id: &str, name: &str) -> Build {
        build(json!({
            "name": name,
            "id": format!("build-{name}"),
            "project_id": project_id,
            "region": MOCK_REGION,
            "href": href(project_id, "builds", name),
            "created_at": "2024-05-01T12:00:00Z",
            "resource_type": "build_v2",
            "entity_tag": "1",
            "output_image": format!("private.de.icr.io/mock/{name}"),
            "output_secret": "registry-creds",
            "source_type": "git",
            "source_url": "https://github.com/IBM/CodeEngine",
            "source_revision": "main",
            "strategy_type": "buildpacks",
            "strategy_size": "medium",
            "timeout": 600,
            "status": "ready"
        }))
    }

    /// Create a successful run of a build.
    pub fn build_run(project_id: &str, build_name: &str, name: &str) -> BuildRun {
        build(json!({
            "name": name,
            "build_name": build_name,
            "id": format!("buildrun-{name}"),
            "project_id": project_id,
            "region": MOCK_REGION,
            "href": href(project_id, "build_runs", name),
            "created_at": "2024-05-02T02:00:00Z",
            "resource_type": "build_run_v2",
            "output_image": format!("private.de.icr.io/mock/{build_name}"),
            "output_secret": "registry-creds",
            "strategy_type": "buildpacks",
            "status": "succeeded",
            "status_details": {
                "reason": "all done",
                "output_digest": "sha256:9a3fbd2b0ed4c8c1e5a1c0f5b5b7e7b4c0d3e2a1f0e9d8c7b6a5f4e3d2c1b0a9",
                "start_time": "2024-05-02T02:00:03Z",
                "completion_time": "2024-05-02T02:04:41Z"
            }
        }))
    }

    // Config maps and secrets

    /// Create an empty config map.
    pub fn config_map(project_id: &str, name: &str) -> ConfigMap {
        build(json!({
            "name": name,
            "id": format!("cm-{name}"),
            "project_id": project_id,
            "region": MOCK_REGION,
            "href": href(project_id, "config_maps", name),
            "created_at": "2024-05-01T13:00:00Z",
            "resource_type": "config_map_v2",
            "entity_tag": "1"
        }))
    }

    /// Create a config map holding the given entries.
    pub fn config_map_with(project_id: &str, name: &str, entries: &[(&str, &str)]) -> ConfigMap {
        let mut config_map = Self::config_map(project_id, name);
        config_map.data = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config_map
    }

    /// Create a generic secret with a single `password` entry.
    pub fn secret(project_id: &str, name: &str) -> Secret {
        build(json!({
            "name": name,
            "id": format!("secret-{name}"),
            "project_id": project_id,
            "region": MOCK_REGION,
            "href": href(project_id, "secrets", name),
            "created_at": "2024-05-01T14:00:00Z",
            "resource_type": "secret_v2",
            "entity_tag": "1",
            "format": "generic",
            "data": { "password": "hunter2" }
        }))
    }

    /// Create a container registry secret.
    pub fn registry_secret(project_id: &str, name: &str) -> Secret {
        let mut secret = Self::secret(project_id, name);
        secret.format = SecretFormat::Registry;
        secret.data = [
            ("server", "private.de.icr.io"),
            ("username", "iamapikey"),
            ("password", "mock-api-key"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        secret
    }

    // Scenarios

    /// Create a default test scenario with common entities.
    pub fn default_scenario() -> DefaultScenario {
        DefaultScenario::new()
    }
}

/// A complete test scenario with related entities.
///
/// One project holds an app with a live revision, a job with two runs, a
/// build with one run, a config map and two secrets. A second, empty project
/// exists for listing tests.
pub struct DefaultScenario {
    pub projects: Vec<Project>,
    pub apps: Vec<App>,
    pub app_revisions: Vec<AppRevision>,
    pub app_instances: Vec<AppInstance>,
    pub jobs: Vec<Job>,
    pub job_runs: Vec<JobRun>,
    pub builds: Vec<Build>,
    pub build_runs: Vec<BuildRun>,
    pub config_maps: Vec<ConfigMap>,
    pub secrets: Vec<Secret>,
}

impl DefaultScenario {
    fn new() -> Self {
        let p = Fixtures::DEFAULT_PROJECT_ID;
        let image = "icr.io/codeengine/helloworld";

        Self {
            projects: vec![
                Fixtures::project(p, "test-project"),
                Fixtures::project("8f6bc2a0-7b3c-4e59-9c1d-2e8a0d6f4b11", "empty-project"),
            ],
            apps: vec![Fixtures::app(p, "hello", image)],
            app_revisions: vec![Fixtures::app_revision(p, "hello", "hello-00001", image)],
            app_instances: vec![Fixtures::app_instance(
                p,
                "hello",
                "hello-00001",
                "hello-00001-deployment-6c9b7d5f4-x2k8q",
            )],
            jobs: vec![Fixtures::job(p, "nightly-report")],
            job_runs: vec![
                Fixtures::job_run(p, "nightly-report", "nightly-report-run-1", "completed"),
                Fixtures::job_run(p, "nightly-report", "nightly-report-run-2", "failed"),
            ],
            builds: vec![Fixtures::build(p, "hello-build")],
            build_runs: vec![Fixtures::build_run(p, "hello-build", "hello-build-run-1")],
            config_maps: vec![Fixtures::config_map_with(
                p,
                "app-settings",
                &[("LOG_LEVEL", "debug"), ("FEATURE_X", "on")],
            )],
            secrets: vec![
                Fixtures::registry_secret(p, "registry-creds"),
                Fixtures::secret(p, "db-password"),
            ],
        }
    }

    /// Load the scenario into a fresh state.
    pub fn into_state(self) -> MockState {
        fn owner(project_id: &Option<String>) -> &str {
            project_id.as_deref().unwrap_or(Fixtures::DEFAULT_PROJECT_ID)
        }

        let mut state = MockState::new();
        for project in self.projects {
            state = state.with_project(project);
        }
        for app in self.apps {
            let project = owner(&app.project_id).to_string();
            state = state.with(&project, app);
        }
        for revision in self.app_revisions {
            let project = owner(&revision.project_id).to_string();
            state = state.with(&project, revision);
        }
        for instance in self.app_instances {
            let project = owner(&instance.project_id).to_string();
            state = state.with(&project, instance);
        }
        for job in self.jobs {
            let project = owner(&job.project_id).to_string();
            state = state.with(&project, job);
        }
        for run in self.job_runs {
            let project = owner(&run.project_id).to_string();
            state = state.with(&project, run);
        }
        for build in self.builds {
            let project = owner(&build.project_id).to_string();
            state = state.with(&project, build);
        }
        for run in self.build_runs {
            let project = owner(&run.project_id).to_string();
            state = state.with(&project, run);
        }
        for config_map in self.config_maps {
            let project = owner(&config_map.project_id).to_string();
            state = state.with(&project, config_map);
        }
        for secret in self.secrets {
            let project = owner(&secret.project_id).to_string();
            state = state.with(&project, secret);
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_build() {
        let app = Fixtures::app("p1", "web", "nginx");
        assert!(app.is_ready());
        assert_eq!(app.entity_tag(), "1");

        let run = Fixtures::job_run("p1", "j", "j-run-1", "failed");
        assert!(run.is_failed());

        let secret = Fixtures::registry_secret("p1", "r");
        assert_eq!(secret.format, SecretFormat::Registry);
        assert_eq!(secret.keys().count(), 3);
    }

    #[test]
    fn test_default_scenario_state() {
        let state = Fixtures::default_scenario().into_state();
        let p = Fixtures::DEFAULT_PROJECT_ID;

        assert_eq!(state.projects.len(), 2);
        assert!(state.get::<App>(p, "hello").is_some());
        assert_eq!(state.list::<JobRun>(p).len(), 2);
        assert_eq!(state.list::<Secret>(p).len(), 2);
    }
}
