//! walkai submit

use colored::Colorize;
use std::path::Path;
use walkai_api::JobRequest;
use walkai_config::ConfigStore;
use walkai_core::load_project;

pub async fn handle(
    store: &ConfigStore,
    path: &Path,
    image: Option<String>,
    secrets: Vec<String>,
) -> anyhow::Result<()> {
    let project = load_project(path)?;
    let gpu = project.require_gpu()?.to_string();
    let client = super::api_client(store)?;

    let request = JobRequest {
        image: image.unwrap_or_else(|| project.default_image()),
        gpu,
        storage: project.storage,
        secret_names: secrets,
    };

    match client.submit_job(&request).await? {
        Some(submission) => match submission.job_id {
            Some(job_id) => println!(
                "{}",
                format!(
                    "Job submitted successfully with ID: {} and pod {}",
                    job_id,
                    submission.pod.as_deref().unwrap_or("-")
                )
                .green()
            ),
            None => println!("{}", "Job submitted successfully.".green()),
        },
        None => {
            println!("{}", "Job submission didn't emit a response".yellow());
            println!("{}", "Job submitted successfully.".green());
        }
    }

    Ok(())
}
