//! Mock server state management.
//!
//! Provides the in-memory data store for the mock Code Engine API server.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use super::fixtures::Fixtures;
use crate::{
    App, AppInstance, AppRevision, Build, BuildRun, ConfigMap, Job, JobRun, Project, Secret,
};

/// Resources stored per project, keyed by `(project_id, name)`.
pub type Scoped<T> = BTreeMap<(String, String), T>;

/// Shared state for the mock server.
///
/// Every store is ordered, so list endpoints page through items by name and
/// the next item's name doubles as the `start` cursor.
#[derive(Debug, Default)]
pub struct MockState {
    /// Projects indexed by ID.
    pub projects: BTreeMap<String, Project>,
    pub apps: Scoped<App>,
    /// Revisions indexed by revision name (which embeds the app name).
    pub app_revisions: Scoped<AppRevision>,
    pub app_instances: Scoped<AppInstance>,
    pub jobs: Scoped<Job>,
    pub job_runs: Scoped<JobRun>,
    pub builds: Scoped<Build>,
    pub build_runs: Scoped<BuildRun>,
    pub config_maps: Scoped<ConfigMap>,
    pub secrets: Scoped<Secret>,

    /// Optional authentication token. If set, requests must send it as a bearer token.
    pub required_token: Option<String>,

    sequence: u64,
}

impl MockState {
    /// Create a new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    /// Add a project to the state.
    pub fn with_project(mut self, project: Project) -> Self {
        self.projects.insert(project.id.clone(), project);
        self
    }

    /// Add a project-scoped resource (app, job, secret, ...) to the state.
    ///
    /// Kinds that support `If-Match` get an entity tag from the state's own
    /// sequence, replacing whatever tag the item carried.
    pub fn with<T: MockResource>(mut self, project_id: &str, mut item: T) -> Self {
        if let Some(tag) = item.entity_tag_mut() {
            *tag = self.next_entity_tag();
        }
        let key = (project_id.to_string(), item.name().to_string());
        T::store_mut(&mut self).insert(key, item);
        self
    }

    /// Set the required authentication token.
    pub fn with_required_token(mut self, token: &str) -> Self {
        self.required_token = Some(token.to_string());
        self
    }

    /// Get a project by ID.
    pub fn get_project(&self, id: &str) -> Option<&Project> {
        self.projects.get(id)
    }

    /// Get a project-scoped resource by name.
    pub fn get<T: MockResource>(&self, project_id: &str, name: &str) -> Option<&T> {
        T::store(self).get(&(project_id.to_string(), name.to_string()))
    }

    /// All resources of one kind in a project, ordered by name.
    pub fn list<T: MockResource>(&self, project_id: &str) -> Vec<&T> {
        T::store(self)
            .iter()
            .filter(|((project, _), _)| project == project_id)
            .map(|(_, item)| item)
            .collect()
    }

    /// Remove a project and everything it contains.
    pub fn remove_project(&mut self, id: &str) -> Option<Project> {
        let project = self.projects.remove(id)?;
        fn purge<T>(store: &mut Scoped<T>, id: &str) {
            store.retain(|(project, _), _| project != id);
        }
        purge(&mut self.apps, id);
        purge(&mut self.app_revisions, id);
        purge(&mut self.app_instances, id);
        purge(&mut self.jobs, id);
        purge(&mut self.job_runs, id);
        purge(&mut self.builds, id);
        purge(&mut self.build_runs, id);
        purge(&mut self.config_maps, id);
        purge(&mut self.secrets, id);
        Some(project)
    }

    /// Next value of the server-wide sequence.
    pub(crate) fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// A fresh entity tag.
    pub(crate) fn next_entity_tag(&mut self) -> String {
        self.next_sequence().to_string()
    }

    /// A fresh UUID-shaped resource ID.
    pub(crate) fn next_id(&mut self) -> String {
        format!("00000000-0000-4000-8000-{:012x}", self.next_sequence())
    }
}

/// A project-scoped resource kept by the mock server.
///
/// Generic handlers use this to find the right store and fill in
/// server-managed fields.
pub trait MockResource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Display name used in error messages.
    const KIND: &'static str;
    /// Path segment under `/projects/{id}/`.
    const COLLECTION: &'static str;
    /// Value of `resource_type`.
    const RESOURCE_TYPE: &'static str;
    /// Status assigned on creation, if the kind has one.
    const INITIAL_STATUS: Option<&'static str> = None;

    fn name(&self) -> &str;

    fn store(state: &MockState) -> &Scoped<Self>;

    fn store_mut(state: &mut MockState) -> &mut Scoped<Self>;

    /// The entity tag, for kinds updated under `If-Match`.
    fn entity_tag_mut(&mut self) -> Option<&mut String> {
        None
    }

    /// Whether the item passes the `job_name`/`build_name` list filter.
    fn matches(&self, _job_name: Option<&str>, _build_name: Option<&str>) -> bool {
        true
    }

    /// Runs after the item was created or updated, before it is stored.
    fn after_write(&mut self, _state: &mut MockState, _project_id: &str) {}

    /// Runs after the item was removed.
    fn after_delete(_state: &mut MockState, _project_id: &str, _name: &str) {}
}

impl MockResource for App {
    const KIND: &'static str = "App";
    const COLLECTION: &'static str = "apps";
    const RESOURCE_TYPE: &'static str = "app_v2";
    const INITIAL_STATUS: Option<&'static str> = Some("ready");

    fn name(&self) -> &str {
        &self.name
    }

    fn store(state: &MockState) -> &Scoped<Self> {
        &state.apps
    }

    fn store_mut(state: &mut MockState) -> &mut Scoped<Self> {
        &mut state.apps
    }

    fn entity_tag_mut(&mut self) -> Option<&mut String> {
        Some(&mut self.entity_tag)
    }

    /// Every write rolls out a new ready revision with one instance.
    fn after_write(&mut self, state: &mut MockState, project_id: &str) {
        let generation = state
            .list::<AppRevision>(project_id)
            .iter()
            .filter(|r| r.app_name.as_deref() == Some(self.name.as_str()))
            .count()
            + 1;
        let revision_name = format!("{}-{:05}", self.name, generation);
        let revision =
            Fixtures::app_revision(project_id, &self.name, &revision_name, &self.image_reference);
        let instance_name = format!("{}-deployment-{}", revision_name, state.next_sequence());
        let instance =
            Fixtures::app_instance(project_id, &self.name, &revision_name, &instance_name);

        let app_name = self.name.clone();
        state
            .app_instances
            .retain(|(project, _), i| {
                project != project_id || i.app_name.as_deref() != Some(app_name.as_str())
            });
        state
            .app_revisions
            .insert((project_id.to_string(), revision_name.clone()), revision);
        state
            .app_instances
            .insert((project_id.to_string(), instance_name), instance);

        let details = self.status_details.get_or_insert_with(Default::default);
        details.latest_created_revision = Some(revision_name.clone());
        details.latest_ready_revision = Some(revision_name);
        self.status = Some("ready".to_string());
        if self.endpoint.is_none() {
            self.endpoint = Some(format!(
                "https://{}.{}.mock.codeengine.test",
                self.name, project_id
            ));
            self.endpoint_internal = Some(format!(
                "http://{}.{}.svc.cluster.local",
                self.name, project_id
            ));
        }
    }

    fn after_delete(state: &mut MockState, project_id: &str, name: &str) {
        let owned = |p: &String, app: Option<&str>| p == project_id && app == Some(name);
        state.app_revisions.retain(|(p, _), r| !owned(p, r.app_name.as_deref()));
        state.app_instances.retain(|(p, _), i| !owned(p, i.app_name.as_deref()));
    }
}

impl MockResource for AppRevision {
    const KIND: &'static str = "AppRevision";
    const COLLECTION: &'static str = "revisions";
    const RESOURCE_TYPE: &'static str = "app_revision_v2";

    fn name(&self) -> &str {
        &self.name
    }

    fn store(state: &MockState) -> &Scoped<Self> {
        &state.app_revisions
    }

    fn store_mut(state: &mut MockState) -> &mut Scoped<Self> {
        &mut state.app_revisions
    }

    fn after_delete(state: &mut MockState, project_id: &str, name: &str) {
        state
            .app_instances
            .retain(|(p, _), i| p != project_id || i.revision_name.as_deref() != Some(name));
    }
}

impl MockResource for AppInstance {
    const KIND: &'static str = "AppInstance";
    const COLLECTION: &'static str = "instances";
    const RESOURCE_TYPE: &'static str = "app_instance_v2";

    fn name(&self) -> &str {
        &self.name
    }

    fn store(state: &MockState) -> &Scoped<Self> {
        &state.app_instances
    }

    fn store_mut(state: &mut MockState) -> &mut Scoped<Self> {
        &mut state.app_instances
    }
}

impl MockResource for Job {
    const KIND: &'static str = "Job";
    const COLLECTION: &'static str = "jobs";
    const RESOURCE_TYPE: &'static str = "job_v2";

    fn name(&self) -> &str {
        &self.name
    }

    fn store(state: &MockState) -> &Scoped<Self> {
        &state.jobs
    }

    fn store_mut(state: &mut MockState) -> &mut Scoped<Self> {
        &mut state.jobs
    }

    fn entity_tag_mut(&mut self) -> Option<&mut String> {
        Some(&mut self.entity_tag)
    }

    fn after_delete(state: &mut MockState, project_id: &str, name: &str) {
        state
            .job_runs
            .retain(|(p, _), r| p != project_id || r.job_name.as_deref() != Some(name));
    }
}

impl MockResource for JobRun {
    const KIND: &'static str = "JobRun";
    const COLLECTION: &'static str = "job_runs";
    const RESOURCE_TYPE: &'static str = "job_run_v2";
    const INITIAL_STATUS: Option<&'static str> = Some("completed");

    fn name(&self) -> &str {
        &self.name
    }

    fn store(state: &MockState) -> &Scoped<Self> {
        &state.job_runs
    }

    fn store_mut(state: &mut MockState) -> &mut Scoped<Self> {
        &mut state.job_runs
    }

    fn matches(&self, job_name: Option<&str>, _build_name: Option<&str>) -> bool {
        job_name.map_or(true, |job| self.job_name.as_deref() == Some(job))
    }
}

impl MockResource for Build {
    const KIND: &'static str = "Build";
    const COLLECTION: &'static str = "builds";
    const RESOURCE_TYPE: &'static str = "build_v2";
    const INITIAL_STATUS: Option<&'static str> = Some("ready");

    fn name(&self) -> &str {
        &self.name
    }

    fn store(state: &MockState) -> &Scoped<Self> {
        &state.builds
    }

    fn store_mut(state: &mut MockState) -> &mut Scoped<Self> {
        &mut state.builds
    }

    fn entity_tag_mut(&mut self) -> Option<&mut String> {
        Some(&mut self.entity_tag)
    }

    fn after_delete(state: &mut MockState, project_id: &str, name: &str) {
        state
            .build_runs
            .retain(|(p, _), r| p != project_id || r.build_name.as_deref() != Some(name));
    }
}

impl MockResource for BuildRun {
    const KIND: &'static str = "BuildRun";
    const COLLECTION: &'static str = "build_runs";
    const RESOURCE_TYPE: &'static str = "build_run_v2";
    const INITIAL_STATUS: Option<&'static str> = Some("succeeded");

    fn name(&self) -> &str {
        &self.name
    }

    fn store(state: &MockState) -> &Scoped<Self> {
        &state.build_runs
    }

    fn store_mut(state: &mut MockState) -> &mut Scoped<Self> {
        &mut state.build_runs
    }

    fn matches(&self, _job_name: Option<&str>, build_name: Option<&str>) -> bool {
        build_name.map_or(true, |build| self.build_name.as_deref() == Some(build))
    }
}

impl MockResource for ConfigMap {
    const KIND: &'static str = "ConfigMap";
    const COLLECTION: &'static str = "config_maps";
    const RESOURCE_TYPE: &'static str = "config_map_v2";

    fn name(&self) -> &str {
        &self.name
    }

    fn store(state: &MockState) -> &Scoped<Self> {
        &state.config_maps
    }

    fn store_mut(state: &mut MockState) -> &mut Scoped<Self> {
        &mut state.config_maps
    }

    fn entity_tag_mut(&mut self) -> Option<&mut String> {
        Some(&mut self.entity_tag)
    }
}

impl MockResource for Secret {
    const KIND: &'static str = "Secret";
    const COLLECTION: &'static str = "secrets";
    const RESOURCE_TYPE: &'static str = "secret_v2";

    fn name(&self) -> &str {
        &self.name
    }

    fn store(state: &MockState) -> &Scoped<Self> {
        &state.secrets
    }

    fn store_mut(state: &mut MockState) -> &mut Scoped<Self> {
        &mut state.secrets
    }

    fn entity_tag_mut(&mut self) -> Option<&mut String> {
        Some(&mut self.entity_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_is_scoped_and_ordered() {
        let state = MockState::new()
            .with("p1", Fixtures::config_map("p1", "zeta"))
            .with("p1", Fixtures::config_map("p1", "alpha"))
            .with("p2", Fixtures::config_map("p2", "beta"));

        let names: Vec<_> = state.list::<ConfigMap>("p1").iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_remove_project_cascades() {
        let mut state = MockState::new()
            .with_project(Fixtures::project("p1", "one"))
            .with("p1", Fixtures::job("p1", "nightly"))
            .with("p1", Fixtures::secret("p1", "creds"));

        assert!(state.remove_project("p1").is_some());
        assert!(state.jobs.is_empty());
        assert!(state.secrets.is_empty());
        assert!(state.remove_project("p1").is_none());
    }

    #[test]
    fn test_app_write_rolls_out_revision() {
        let mut state = MockState::new();
        let mut app = Fixtures::app("p1", "web", "icr.io/codeengine/helloworld");

        app.after_write(&mut state, "p1");
        app.after_write(&mut state, "p1");

        assert_eq!(app.latest_ready_revision(), Some("web-00002"));
        assert_eq!(state.list::<AppRevision>("p1").len(), 2);
        assert_eq!(state.list::<AppInstance>("p1").len(), 1);

        App::after_delete(&mut state, "p1", "web");
        assert!(state.app_revisions.is_empty());
        assert!(state.app_instances.is_empty());
    }

    #[test]
    fn test_sequence_values_are_unique() {
        let mut state = MockState::new();
        assert_ne!(state.next_entity_tag(), state.next_entity_tag());
        assert!(state.next_id().starts_with("00000000-0000-4000-8000-"));
    }

    #[test]
    fn test_seeded_items_get_fresh_entity_tags() {
        let mut state = MockState::new()
            .with("p1", Fixtures::config_map("p1", "a"))
            .with("p1", Fixtures::config_map("p1", "b"))
            .with("p1", Fixtures::job("p1", "nightly"));

        let a = state.get::<ConfigMap>("p1", "a").unwrap().entity_tag.clone();
        let b = state.get::<ConfigMap>("p1", "b").unwrap().entity_tag.clone();
        let job = state.get::<Job>("p1", "nightly").unwrap().entity_tag.clone();
        assert_ne!(a, b);
        assert_ne!(b, job);

        let next = state.next_entity_tag();
        assert!(![a, b, job].contains(&next));
    }
}
