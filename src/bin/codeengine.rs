//! Code Engine API CLI binary.
//!
//! A command-line interface for the Code Engine v2 management API.

use std::collections::BTreeMap;
use std::process::ExitCode;

use clap::Parser;
use codeengine::cli::{Cli, Command, Entity};
use codeengine::output::PrettyPrint;
use codeengine::{
    App, AppCreateParams, AppInstance, AppInstanceListQuery, AppListQuery, AppRevision,
    AppRevisionId, AppRevisionListQuery, Build, BuildListQuery, BuildRun, BuildRunCreateParams,
    BuildRunListQuery, CodeEngineClient, CodeEngineError, ConfigMap, ConfigMapCreateParams,
    ConfigMapListQuery, Create, Delete, Get, Job, JobCreateParams, JobListQuery, JobRun,
    JobRunCreateParams, JobRunListQuery, List, Page, Project, ProjectCreateParams,
    ProjectListQuery, ResourceId, Secret, SecretCreateParams, SecretFormat, SecretListQuery,
    DEFAULT_PAGE_SIZE,
};
use serde::Serialize;
use tabled::{Table, Tabled};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CODE_ENGINE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let client = match CodeEngineClient::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!(
                "Hint: Set CODE_ENGINE_APIKEY \
                 (or CODE_ENGINE_BEARER_TOKEN with CODE_ENGINE_AUTH_TYPE=bearertoken)"
            );
            return ExitCode::FAILURE;
        }
    };

    match run(&client, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &CodeEngineClient, cli: Cli) -> codeengine::Result<()> {
    match cli.command {
        Command::Get {
            entity,
            name,
            project,
            app,
        } => handle_get(client, entity, &name, project.as_deref(), app.as_deref(), cli.json).await,
        Command::List {
            entity,
            project,
            limit,
            start,
            all,
            app,
            job,
            build,
        } => {
            let opts = ListOptions {
                project,
                limit,
                start,
                all,
                app,
                job,
                build,
            };
            handle_list(client, entity, opts, cli.json).await
        }
        Command::Create {
            entity,
            name,
            project,
            image,
            job,
            build,
            from_literal,
        } => {
            let opts = CreateOptions {
                name,
                project,
                image,
                job,
                build,
                data: from_literal.into_iter().collect(),
            };
            handle_create(client, entity, opts, cli.json).await
        }
        Command::Delete {
            entity,
            name,
            project,
            app,
        } => handle_delete(client, entity, &name, project.as_deref(), app.as_deref()).await,
    }
}

fn required<'a>(value: Option<&'a str>, flag: &str) -> codeengine::Result<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CodeEngineError::InvalidArgument(format!("--{flag} is required")))
}

fn scoped(project: Option<&str>, name: &str) -> codeengine::Result<ResourceId> {
    Ok(ResourceId::new(required(project, "project")?, name))
}

async fn handle_get(
    client: &CodeEngineClient,
    entity: Entity,
    name: &str,
    project: Option<&str>,
    app: Option<&str>,
    json: bool,
) -> codeengine::Result<()> {
    match entity {
        Entity::Project => output_single(&Project::get(client, name.to_string()).await?, json),
        Entity::App => output_single(&App::get(client, scoped(project, name)?).await?, json),
        Entity::AppRevision => {
            let id = AppRevisionId::new(
                required(project, "project")?,
                required(app, "app")?,
                name,
            );
            output_single(&AppRevision::get(client, id).await?, json)
        }
        Entity::AppInstance => {
            eprintln!("Error: App instances can only be listed, not retrieved individually");
            eprintln!("Hint: Use 'codeengine list app-instances --app <name>'");
            Err(CodeEngineError::InvalidArgument(
                "get app-instance not supported".to_string(),
            ))
        }
        Entity::Job => output_single(&Job::get(client, scoped(project, name)?).await?, json),
        Entity::JobRun => output_single(&JobRun::get(client, scoped(project, name)?).await?, json),
        Entity::Build => output_single(&Build::get(client, scoped(project, name)?).await?, json),
        Entity::BuildRun => {
            output_single(&BuildRun::get(client, scoped(project, name)?).await?, json)
        }
        Entity::ConfigMap => {
            output_single(&ConfigMap::get(client, scoped(project, name)?).await?, json)
        }
        Entity::Secret => output_single(&Secret::get(client, scoped(project, name)?).await?, json),
    }
}

struct ListOptions {
    project: Option<String>,
    limit: Option<u32>,
    start: Option<String>,
    all: bool,
    app: Option<String>,
    job: Option<String>,
    build: Option<String>,
}

impl ListOptions {
    fn project_id(&self) -> codeengine::Result<String> {
        required(self.project.as_deref(), "project").map(str::to_string)
    }

    fn app_name(&self) -> codeengine::Result<String> {
        required(self.app.as_deref(), "app").map(str::to_string)
    }
}

async fn handle_list(
    client: &CodeEngineClient,
    entity: Entity,
    opts: ListOptions,
    json: bool,
) -> codeengine::Result<()> {
    match entity {
        Entity::Project => {
            let query = ProjectListQuery::default();
            list_and_print::<Project, _, _>(client, query, &opts, json, |r| ProjectRow::from(r))
                .await
        }
        Entity::App => {
            let query = AppListQuery::for_project(opts.project_id()?);
            list_and_print::<App, _, _>(client, query, &opts, json, |r| AppRow::from(r)).await
        }
        Entity::AppRevision => {
            let query = AppRevisionListQuery::for_app(opts.project_id()?, opts.app_name()?);
            list_and_print::<AppRevision, _, _>(client, query, &opts, json, |r| {
                RevisionRow::from(r)
            })
            .await
        }
        Entity::AppInstance => {
            let query = AppInstanceListQuery::for_app(opts.project_id()?, opts.app_name()?);
            list_and_print::<AppInstance, _, _>(client, query, &opts, json, |r| {
                InstanceRow::from(r)
            })
            .await
        }
        Entity::Job => {
            let query = JobListQuery::for_project(opts.project_id()?);
            list_and_print::<Job, _, _>(client, query, &opts, json, |r| JobRow::from(r)).await
        }
        Entity::JobRun => {
            let mut query = JobRunListQuery::for_project(opts.project_id()?);
            query.job_name = opts.job.clone();
            list_and_print::<JobRun, _, _>(client, query, &opts, json, |r| JobRunRow::from(r)).await
        }
        Entity::Build => {
            let query = BuildListQuery::for_project(opts.project_id()?);
            list_and_print::<Build, _, _>(client, query, &opts, json, |r| BuildRow::from(r)).await
        }
        Entity::BuildRun => {
            let mut query = BuildRunListQuery::for_project(opts.project_id()?);
            query.build_name = opts.build.clone();
            list_and_print::<BuildRun, _, _>(client, query, &opts, json, |r| BuildRunRow::from(r))
                .await
        }
        Entity::ConfigMap => {
            let query = ConfigMapListQuery::for_project(opts.project_id()?);
            list_and_print::<ConfigMap, _, _>(client, query, &opts, json, |r| DataRow::from(r))
                .await
        }
        Entity::Secret => {
            let query = SecretListQuery::for_project(opts.project_id()?);
            list_and_print::<Secret, _, _>(client, query, &opts, json, |r| DataRow::from(r)).await
        }
    }
}

async fn list_and_print<T, R, F>(
    client: &CodeEngineClient,
    query: T::Query,
    opts: &ListOptions,
    json: bool,
    to_row: F,
) -> codeengine::Result<()>
where
    T: List + Serialize,
    R: Tabled,
    F: Fn(&T) -> R,
{
    if opts.all {
        let items = T::list_all(client, &query).await?;
        let page = Page::new(items, 0, None);
        return output_page(&page, json, to_row);
    }

    let limit = opts.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let page = T::list_page(client, &query, opts.start.as_deref(), limit).await?;
    output_page(&page, json, to_row)
}

struct CreateOptions {
    name: Option<String>,
    project: Option<String>,
    image: Option<String>,
    job: Option<String>,
    build: Option<String>,
    data: BTreeMap<String, String>,
}

async fn handle_create(
    client: &CodeEngineClient,
    entity: Entity,
    opts: CreateOptions,
    json: bool,
) -> codeengine::Result<()> {
    let name = opts.name.clone().unwrap_or_default();
    let project_id = || required(opts.project.as_deref(), "project").map(str::to_string);

    match entity {
        Entity::Project => {
            let project = Project::create(client, ProjectCreateParams::new(name)).await?;
            output_single(&project, json)
        }
        Entity::App => {
            let image = required(opts.image.as_deref(), "image")?;
            let params = AppCreateParams::new(project_id()?, name, image);
            output_single(&App::create(client, params).await?, json)
        }
        Entity::Job => {
            let image = required(opts.image.as_deref(), "image")?;
            let params = JobCreateParams::new(project_id()?, name, image);
            output_single(&Job::create(client, params).await?, json)
        }
        Entity::JobRun => {
            let params = JobRunCreateParams {
                project_id: project_id()?,
                job_name: opts.job.clone(),
                name: opts.name.clone(),
                image_reference: opts.image.clone(),
                ..Default::default()
            };
            output_single(&JobRun::create(client, params).await?, json)
        }
        Entity::BuildRun => {
            let build = required(opts.build.as_deref(), "build")?;
            let mut params = BuildRunCreateParams::for_build(project_id()?, build);
            params.name = opts.name.clone();
            output_single(&BuildRun::create(client, params).await?, json)
        }
        Entity::ConfigMap => {
            let mut params = ConfigMapCreateParams::new(project_id()?, name);
            params.data = opts.data.clone();
            output_single(&ConfigMap::create(client, params).await?, json)
        }
        Entity::Secret => {
            let mut params = SecretCreateParams::new(project_id()?, name, SecretFormat::Generic);
            params.data = opts.data.clone();
            output_single(&Secret::create(client, params).await?, json)
        }
        Entity::AppRevision | Entity::AppInstance | Entity::Build => {
            eprintln!("Error: This resource cannot be created via CLI");
            Err(CodeEngineError::InvalidArgument(format!(
                "create {} not supported",
                entity_label(entity)
            )))
        }
    }
}

async fn handle_delete(
    client: &CodeEngineClient,
    entity: Entity,
    name: &str,
    project: Option<&str>,
    app: Option<&str>,
) -> codeengine::Result<()> {
    match entity {
        Entity::Project => Project::delete(client, name.to_string()).await?,
        Entity::App => App::delete(client, scoped(project, name)?).await?,
        Entity::AppRevision => {
            let id = AppRevisionId::new(
                required(project, "project")?,
                required(app, "app")?,
                name,
            );
            AppRevision::delete(client, id).await?
        }
        Entity::Job => Job::delete(client, scoped(project, name)?).await?,
        Entity::JobRun => JobRun::delete(client, scoped(project, name)?).await?,
        Entity::Build => Build::delete(client, scoped(project, name)?).await?,
        Entity::BuildRun => BuildRun::delete(client, scoped(project, name)?).await?,
        Entity::ConfigMap => ConfigMap::delete(client, scoped(project, name)?).await?,
        Entity::Secret => Secret::delete(client, scoped(project, name)?).await?,
        Entity::AppInstance => {
            return Err(CodeEngineError::InvalidArgument(
                "delete app instance not supported".to_string(),
            ));
        }
    }
    println!("Deletion of {} {name} requested", entity_label(entity));
    Ok(())
}

fn entity_label(entity: Entity) -> &'static str {
    match entity {
        Entity::Project => "project",
        Entity::App => "app",
        Entity::AppRevision => "app revision",
        Entity::AppInstance => "app instance",
        Entity::Job => "job",
        Entity::JobRun => "job run",
        Entity::Build => "build",
        Entity::BuildRun => "build run",
        Entity::ConfigMap => "config map",
        Entity::Secret => "secret",
    }
}

fn output_single<T: Serialize + PrettyPrint>(item: &T, json: bool) -> codeengine::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(item)?);
    } else {
        println!("{}", item.pretty_print());
    }
    Ok(())
}

fn output_page<T, R, F>(page: &Page<T>, json: bool, to_row: F) -> codeengine::Result<()>
where
    T: Serialize,
    R: Tabled,
    F: Fn(&T) -> R,
{
    if json {
        println!("{}", serde_json::to_string_pretty(&page.items)?);
    } else {
        let rows: Vec<R> = page.items.iter().map(to_row).collect();
        println!("{}", Table::new(rows));
        match page.next_start.as_deref() {
            Some(start) => println!("\n{} items (more available: --start {start})", page.len()),
            None => println!("\n{} items (end)", page.len()),
        }
    }
    Ok(())
}

// Table row types for non-JSON output

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

fn age(created: Option<&chrono::DateTime<chrono::Utc>>) -> String {
    created
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[derive(Tabled)]
struct ProjectRow {
    name: String,
    id: String,
    region: String,
    status: String,
}

impl From<&Project> for ProjectRow {
    fn from(p: &Project) -> Self {
        Self {
            name: p.name.clone(),
            id: p.id.clone(),
            region: or_dash(p.region.as_deref()),
            status: or_dash(p.status.as_deref()),
        }
    }
}

#[derive(Tabled)]
struct AppRow {
    name: String,
    status: String,
    url: String,
    created: String,
}

impl From<&App> for AppRow {
    fn from(a: &App) -> Self {
        Self {
            name: a.name.clone(),
            status: or_dash(a.status.as_deref()),
            url: or_dash(a.endpoint.as_deref()),
            created: age(a.created_at.as_ref()),
        }
    }
}

#[derive(Tabled)]
struct RevisionRow {
    name: String,
    status: String,
    instances: String,
    created: String,
}

impl From<&AppRevision> for RevisionRow {
    fn from(r: &AppRevision) -> Self {
        Self {
            name: r.name.clone(),
            status: or_dash(r.status.as_deref()),
            instances: r
                .status_details
                .as_ref()
                .and_then(|d| d.actual_instances)
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            created: age(r.created_at.as_ref()),
        }
    }
}

#[derive(Tabled)]
struct InstanceRow {
    name: String,
    revision: String,
    status: String,
    restarts: u32,
}

impl From<&AppInstance> for InstanceRow {
    fn from(i: &AppInstance) -> Self {
        Self {
            name: i.name.clone(),
            revision: or_dash(i.revision_name.as_deref()),
            status: or_dash(i.status.as_deref()),
            restarts: i.restarts.unwrap_or(0),
        }
    }
}

#[derive(Tabled)]
struct JobRow {
    name: String,
    image: String,
    mode: String,
    created: String,
}

impl From<&Job> for JobRow {
    fn from(j: &Job) -> Self {
        Self {
            name: j.name.clone(),
            image: j.image_reference.clone(),
            mode: or_dash(j.run_mode.as_deref()),
            created: age(j.created_at.as_ref()),
        }
    }
}

#[derive(Tabled)]
struct JobRunRow {
    name: String,
    job: String,
    status: String,
    succeeded: String,
}

impl From<&JobRun> for JobRunRow {
    fn from(r: &JobRun) -> Self {
        let details = r.status_details.clone().unwrap_or_default();
        Self {
            name: r.name.clone(),
            job: or_dash(r.job_name.as_deref()),
            status: or_dash(r.status.as_deref()),
            succeeded: format!(
                "{}/{}",
                details.succeeded.unwrap_or(0),
                details.requested.unwrap_or(0)
            ),
        }
    }
}

#[derive(Tabled)]
struct BuildRow {
    name: String,
    strategy: String,
    output: String,
    status: String,
}

impl From<&Build> for BuildRow {
    fn from(b: &Build) -> Self {
        Self {
            name: b.name.clone(),
            strategy: b.strategy_type.clone(),
            output: b.output_image.clone(),
            status: or_dash(b.status.as_deref()),
        }
    }
}

#[derive(Tabled)]
struct BuildRunRow {
    name: String,
    build: String,
    status: String,
    created: String,
}

impl From<&BuildRun> for BuildRunRow {
    fn from(r: &BuildRun) -> Self {
        Self {
            name: r.name.clone(),
            build: or_dash(r.build_name.as_deref()),
            status: or_dash(r.status.as_deref()),
            created: age(r.created_at.as_ref()),
        }
    }
}

#[derive(Tabled)]
struct DataRow {
    name: String,
    keys: usize,
    created: String,
}

impl From<&ConfigMap> for DataRow {
    fn from(c: &ConfigMap) -> Self {
        Self {
            name: c.name.clone(),
            keys: c.data.len(),
            created: age(c.created_at.as_ref()),
        }
    }
}

impl From<&Secret> for DataRow {
    fn from(s: &Secret) -> Self {
        Self {
            name: s.name.clone(),
            keys: s.data.len(),
            created: age(s.created_at.as_ref()),
        }
    }
}
