//! walkai inputs

use crate::InputsCommands;
use anyhow::bail;
use colored::Colorize;
use walkai_config::ConfigStore;
use walkai_core::load_project;

pub async fn handle(store: &ConfigStore, cmd: InputsCommands) -> anyhow::Result<()> {
    let client = super::api_client(store)?;

    match cmd {
        InputsCommands::List => {
            let volumes = client.list_input_volumes().await?;
            if volumes.is_empty() {
                println!("{}", "No input volumes found.".yellow());
                return Ok(());
            }
            println!("{}", format!("{:<8} {:<32} {:>6}", "ID", "NAME", "SIZE").bold());
            for volume in volumes {
                println!("{:<8} {:<32} {:>6}", volume.id, volume.name, volume.size);
            }
        }
        InputsCommands::Objects { id } => {
            let objects = client.list_volume_objects(id).await?;
            if objects.is_empty() {
                println!("{}", format!("Volume '{}' is empty.", id).yellow());
                return Ok(());
            }
            for object in objects {
                println!(
                    "{:>12}  {:<25}  {}",
                    object.size,
                    object.last_modified.as_deref().unwrap_or("-"),
                    object.key
                );
            }
        }
        InputsCommands::Create { size } => {
            let volume = client.create_input_volume(size).await?;
            println!(
                "{}",
                format!(
                    "Input volume created: id={} name={} size={}",
                    volume.id, volume.name, volume.size
                )
                .green()
            );
        }
        InputsCommands::Upload { id, files, project } => {
            let files = if files.is_empty() {
                load_project(&project)?.inputs
            } else {
                files
            };
            if files.is_empty() {
                bail!("No files to upload. Pass file paths or declare [tool.walkai].inputs.");
            }

            let uploaded = client.upload_inputs(id, &files).await?;
            for name in &uploaded {
                println!("  {} {}", "↑".cyan(), name);
            }
            println!(
                "{}",
                format!("Uploaded {} file(s) to volume {}.", uploaded.len(), id).green()
            );
        }
    }

    Ok(())
}
