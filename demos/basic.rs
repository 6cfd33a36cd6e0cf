//! Basic example demonstrating the Code Engine API client.
//!
//! Run with:
//! ```
//! CODE_ENGINE_APIKEY=your-key CODE_ENGINE_REGION=eu-de cargo run --example basic
//! ```

use codeengine::{
    list_job_runs, App, AppListQuery, CodeEngineClient, ConfigMap, ConfigMapListQuery, Get,
    List, Pager, Project, ProjectListQuery, ResourceId,
};

#[tokio::main]
async fn main() -> codeengine::Result<()> {
    // Initialize tracing for debugging (optional)
    tracing_subscriber::fmt::init();

    // Create client from environment variables
    println!("Creating Code Engine client...");
    let client = CodeEngineClient::from_env()?;
    println!("Connected to: {}", client.base_url());

    // List first page of projects
    println!("\n--- Listing Projects (first page) ---");
    let projects_page = Project::list_page(&client, &ProjectListQuery::default(), None, 10).await?;
    println!(
        "Found {} projects (more: {})",
        projects_page.len(),
        projects_page.has_more
    );

    for project in &projects_page {
        println!(
            "  - {} ({}) [{}]",
            project.name,
            project.id,
            project.status.as_deref().unwrap_or("unknown")
        );
    }

    let Some(first_project) = projects_page.items.first() else {
        println!("\nNo projects found.");
        return Ok(());
    };

    println!("\n--- Getting Project Details ---");
    let project = Project::get(&client, first_project.id.clone()).await?;
    println!("Project: {}", project.name);
    println!("  Region: {}", project.region.as_deref().unwrap_or("unknown"));
    let egress = project.egress_ips(&client).await?;
    println!("  Public egress IPs: {:?}", egress.public);

    // Walk apps page by page
    println!("\n--- Listing Apps ---");
    let mut pager = Pager::<App>::with_limit(&client, AppListQuery::for_project(&project.id), 20);
    while pager.has_next() {
        for app in pager.get_next().await? {
            println!(
                "  - {} -> {}",
                app.name,
                app.endpoint.as_deref().unwrap_or("(no endpoint)")
            );
            for revision in app.revisions(&client).await?.iter().take(3) {
                println!("      revision {}", revision.name);
            }
        }
    }

    // Recent job runs
    println!("\n--- Job Runs ---");
    let runs = list_job_runs(&client, &project.id, None).await?;
    for run in runs.iter().take(5) {
        println!(
            "  - {} ({}): {}",
            run.name,
            run.job_name.as_deref().unwrap_or("ad hoc"),
            run.status.as_deref().unwrap_or("unknown")
        );
    }

    // Config maps with their keys
    println!("\n--- Config Maps ---");
    let query = ConfigMapListQuery::for_project(&project.id);
    let config_maps = ConfigMap::list_all(&client, &query).await?;
    for config_map in &config_maps {
        let id = ResourceId::new(&project.id, &config_map.name);
        let config_map = ConfigMap::get(&client, id).await?;
        let keys: Vec<_> = config_map.data.keys().map(String::as_str).collect();
        println!("  - {} [{}]", config_map.name, keys.join(", "));
    }

    println!("\nDone!");
    Ok(())
}
