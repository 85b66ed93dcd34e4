//! WalkAI プロジェクト記述子
//!
//! 対象プロジェクトの `pyproject.toml` から `[tool.walkai]` セクションを読み込み、
//! ビルド・ジョブ投入に必要な設定を型付きで提供します。

pub mod error;
pub mod project;

pub use error::{ProjectConfigError, Result};
pub use project::{PROJECT_FILE, ProjectDescriptor, dedup_packages, load_project};
