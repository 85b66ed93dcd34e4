//! walkai build

use colored::Colorize;
use std::path::{Path, PathBuf};
use walkai_build::{BuildOptions, ImageBuilder, SystemRunner};

pub fn handle(
    path: &Path,
    image: Option<String>,
    env: Vec<(String, String)>,
    env_file: Option<PathBuf>,
    builder: &str,
) -> anyhow::Result<()> {
    let options = BuildOptions {
        image,
        env,
        env_file,
    };

    println!("{}", "Building image with Cloud Native Buildpacks...".blue());
    let built = ImageBuilder::new(SystemRunner)
        .with_builder(builder)
        .build(path, &options)?;

    println!(
        "{}",
        format!("Image built successfully: {}", built).green()
    );
    Ok(())
}
