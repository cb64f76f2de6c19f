//! Manifest parsing for dependency-derived signals

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Upper bound on requirement files followed from one entry file
const MAX_REQUIREMENT_FILES: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeManifest {
    pub dependencies: BTreeSet<String>,
    pub dev_dependencies: BTreeSet<String>,
}

#[derive(Deserialize)]
struct RawPackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, serde_json::Value>,
}

impl NodeManifest {
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawPackageJson =
            serde_json::from_str(content).context("package.json is not valid JSON")?;

        Ok(Self {
            dependencies: raw.dependencies.into_keys().collect(),
            dev_dependencies: raw.dev_dependencies.into_keys().collect(),
        })
    }

    /// Declared in either dependency table
    pub fn has(&self, name: &str) -> bool {
        self.dependencies.contains(name) || self.dev_dependencies.contains(name)
    }
}

/// Lower-cased distribution names from `requirements.txt` and `pyproject.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PythonManifest {
    pub packages: BTreeSet<String>,
}

impl PythonManifest {
    pub fn has(&self, name: &str) -> bool {
        self.packages.contains(name)
    }

    /// Adds the packages listed in `content`; include lines are not followed
    pub fn add_requirements(&mut self, content: &str) {
        self.parse_requirements(content);
    }

    /// Reads `entry` below `root` and every file it pulls in through `-r` or
    /// `--requirement`, each resolved against the including file's directory.
    ///
    /// Every file is read at most once. Problems with individual files are
    /// returned and do not stop the walk.
    pub fn add_requirements_tree(&mut self, root: &Path, entry: &str) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();
        let mut pending = vec![PathBuf::from(entry)];

        while let Some(relative) = pending.pop() {
            if seen.contains(&relative) {
                continue;
            }
            if seen.len() == MAX_REQUIREMENT_FILES {
                problems.push(format!(
                    "stopped following requirement includes after {} files",
                    MAX_REQUIREMENT_FILES
                ));
                break;
            }
            seen.insert(relative.clone());

            let content = match fs::read_to_string(root.join(&relative)) {
                Ok(content) => content,
                Err(err) => {
                    problems.push(format!("could not read {}: {}", relative.display(), err));
                    continue;
                }
            };

            for target in self.parse_requirements(&content) {
                match resolve_include(&relative, &target) {
                    Some(path) => pending.push(path),
                    None => problems.push(format!(
                        "{} includes {} outside the repository",
                        relative.display(),
                        target
                    )),
                }
            }
        }

        problems
    }

    /// Records package lines and returns the include targets
    fn parse_requirements(&mut self, content: &str) -> Vec<String> {
        let mut includes = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('-') {
                if let Some(target) = include_target(line) {
                    includes.push(target.to_string());
                }
                continue;
            }
            if let Some(name) = requirement_name(line) {
                self.packages.insert(name);
            }
        }
        includes
    }

    /// Reads PEP 621 `[project].dependencies` and Poetry dependency tables
    pub fn add_pyproject(&mut self, content: &str) -> Result<()> {
        let doc: toml::Value = toml::from_str(content).context("pyproject.toml is not valid TOML")?;

        if let Some(deps) = doc
            .get("project")
            .and_then(|p| p.get("dependencies"))
            .and_then(|d| d.as_array())
        {
            for spec in deps.iter().filter_map(|d| d.as_str()) {
                if let Some(name) = requirement_name(spec) {
                    self.packages.insert(name);
                }
            }
        }

        if let Some(table) = doc
            .get("tool")
            .and_then(|t| t.get("poetry"))
            .and_then(|p| p.get("dependencies"))
            .and_then(|d| d.as_table())
        {
            for name in table.keys().filter(|k| k.as_str() != "python") {
                self.packages.insert(name.to_lowercase());
            }
        }

        Ok(())
    }
}

/// Target of `-r file`, `-rfile`, `--requirement file` or `--requirement=file`
fn include_target(line: &str) -> Option<&str> {
    let rest = match line.strip_prefix("--requirement") {
        Some(rest) => rest.strip_prefix('=').unwrap_or(rest),
        None => line.strip_prefix("-r")?,
    };
    rest.split_whitespace().next()
}

/// Lexically joins `target` onto the directory of `including`; `None` when the
/// result would leave the repository root
fn resolve_include(including: &Path, target: &str) -> Option<PathBuf> {
    let base = including.parent().unwrap_or_else(|| Path::new(""));
    let mut resolved = PathBuf::new();
    for component in base.join(target).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

fn requirement_name(spec: &str) -> Option<String> {
    let end = spec
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
        .unwrap_or(spec.len());
    let name = spec[..end].trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase().replace('_', "-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_package_json() {
        let manifest = NodeManifest::parse(
            r#"{
                "name": "web",
                "dependencies": {"react": "^18.0.0", "express": "*"},
                "devDependencies": {"typescript": "^5.0.0"}
            }"#,
        )
        .unwrap();

        assert!(manifest.has("react"));
        assert!(manifest.has("express"));
        assert!(manifest.dev_dependencies.contains("typescript"));
        assert!(!manifest.dependencies.contains("typescript"));
    }

    #[test]
    fn test_package_json_without_dependencies() {
        let manifest = NodeManifest::parse(r#"{"name": "bare"}"#).unwrap();
        assert!(manifest.dependencies.is_empty());
    }

    #[test]
    fn test_malformed_package_json() {
        assert!(NodeManifest::parse("{ \"dependencies\": ").is_err());
    }

    #[test]
    fn test_requirements_parsing() {
        let mut manifest = PythonManifest::default();
        manifest.add_requirements(
            "# web\nDjango>=4.2\nfastapi[all]==0.110\n-r base.txt\npsycopg2_binary ; python_version > '3'\n\n",
        );

        assert!(manifest.has("django"));
        assert!(manifest.has("fastapi"));
        assert!(manifest.has("psycopg2-binary"));
        assert_eq!(manifest.packages.len(), 3);
    }

    fn write(root: &Path, files: &[(&str, &str)]) {
        for (path, content) in files {
            let full = root.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
    }

    #[test]
    fn test_include_target_forms() {
        assert_eq!(include_target("-r base.txt"), Some("base.txt"));
        assert_eq!(include_target("-rbase.txt"), Some("base.txt"));
        assert_eq!(include_target("--requirement dev.txt  # dev"), Some("dev.txt"));
        assert_eq!(include_target("--requirement=prod.txt"), Some("prod.txt"));
        assert_eq!(include_target("-c constraints.txt"), None);
        assert_eq!(include_target("--index-url https://pypi.org/simple"), None);
    }

    #[test]
    fn test_requirements_tree_follows_includes() {
        let dir = tempfile::TempDir::new().unwrap();
        write(
            dir.path(),
            &[
                ("requirements.txt", "-r requirements/base.txt
gunicorn
"),
                ("requirements/base.txt", "flask>=3
--requirement=./db.txt
"),
                ("requirements/db.txt", "psycopg2-binary
"),
            ],
        );

        let mut manifest = PythonManifest::default();
        let problems = manifest.add_requirements_tree(dir.path(), "requirements.txt");

        assert!(problems.is_empty(), "{:?}", problems);
        assert!(manifest.has("gunicorn"));
        assert!(manifest.has("flask"));
        assert!(manifest.has("psycopg2-binary"));
    }

    #[test]
    fn test_requirements_tree_stops_on_cycles() {
        let dir = tempfile::TempDir::new().unwrap();
        write(
            dir.path(),
            &[
                ("requirements.txt", "-r dev.txt
requests
"),
                ("dev.txt", "-r requirements.txt
-r ./requirements.txt
pytest
"),
            ],
        );

        let mut manifest = PythonManifest::default();
        let problems = manifest.add_requirements_tree(dir.path(), "requirements.txt");

        assert!(problems.is_empty(), "{:?}", problems);
        assert_eq!(manifest.packages.len(), 2);
    }

    #[test]
    fn test_requirements_tree_reports_bad_includes() {
        let dir = tempfile::TempDir::new().unwrap();
        write(
            dir.path(),
            &[("requirements.txt", "-r missing.txt
-r ../../etc/passwd
fastapi
")],
        );

        let mut manifest = PythonManifest::default();
        let problems = manifest.add_requirements_tree(dir.path(), "requirements.txt");

        assert!(manifest.has("fastapi"));
        assert_eq!(problems.len(), 2);
        assert!(problems.iter().any(|p| p.starts_with("could not read missing.txt")));
        assert!(problems.iter().any(|p| p.contains("outside the repository")));
    }

    #[test]
    fn test_pyproject_parsing() {
        let mut manifest = PythonManifest::default();
        manifest
            .add_pyproject(
                r#"
[project]
name = "svc"
dependencies = ["flask>=3", "redis"]

[tool.poetry.dependencies]
python = "^3.11"
pymongo = "^4"
"#,
            )
            .unwrap();

        assert!(manifest.has("flask"));
        assert!(manifest.has("redis"));
        assert!(manifest.has("pymongo"));
        assert!(!manifest.has("python"));
    }

    #[test]
    fn test_malformed_pyproject() {
        let mut manifest = PythonManifest::default();
        assert!(manifest.add_pyproject("[project\nname=").is_err());
    }
}
