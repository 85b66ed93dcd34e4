//! Cloud Native Buildpacks のプロジェクト記述子（`project.toml`）
//!
//! OS パッケージは heroku の deb-packages buildpack でインストールします。

use serde::Serialize;
use walkai_core::dedup_packages;

pub const DESCRIPTOR_FILE: &str = "project.toml";

const SCHEMA_VERSION: &str = "0.2";

/// deb-packages buildpack のインストール指定
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageInstall {
    pub name: String,
    pub force: bool,
}

/// ビルド用に生成する `project.toml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDescriptor {
    packages: Vec<String>,
}

impl BuildDescriptor {
    /// パッケージ一覧から記述子を作成（重複除去後に空なら `None`）
    pub fn from_packages<'a>(packages: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let packages = dedup_packages(packages);
        if packages.is_empty() {
            None
        } else {
            Some(Self { packages })
        }
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn install_entries(&self) -> Vec<PackageInstall> {
        self.packages
            .iter()
            .map(|name| PackageInstall {
                name: name.clone(),
                force: true,
            })
            .collect()
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        let document = Document {
            meta: Meta {
                schema_version: SCHEMA_VERSION,
            },
            com: Com {
                heroku: Heroku {
                    buildpacks: Buildpacks {
                        deb_packages: DebPackages {
                            install: self.install_entries(),
                        },
                    },
                },
            },
        };
        toml::to_string(&document)
    }
}

#[derive(Serialize)]
struct Document {
    #[serde(rename = "_")]
    meta: Meta,
    com: Com,
}

#[derive(Serialize)]
struct Meta {
    #[serde(rename = "schema-version")]
    schema_version: &'static str,
}

#[derive(Serialize)]
struct Com {
    heroku: Heroku,
}

#[derive(Serialize)]
struct Heroku {
    buildpacks: Buildpacks,
}

#[derive(Serialize)]
struct Buildpacks {
    #[serde(rename = "deb-packages")]
    deb_packages: DebPackages,
}

#[derive(Serialize)]
struct DebPackages {
    install: Vec<PackageInstall>,
}
