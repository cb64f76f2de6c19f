use super::NodePackageManager;
use crate::profile::CodebaseAnalysis;
use crate::scan::ProjectStructure;
use crate::stack::{Platform, TechStackProfile};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct Workflow {
    name: &'static str,
    on: Triggers,
    jobs: Jobs,
}

#[derive(Serialize)]
struct Triggers {
    push: BranchFilter,
    pull_request: BranchFilter,
}

#[derive(Serialize)]
struct BranchFilter {
    branches: Vec<&'static str>,
}

#[derive(Serialize)]
struct Jobs {
    build: Job,
    docker: Job,
}

#[derive(Serialize)]
struct Job {
    name: String,
    #[serde(rename = "runs-on")]
    runs_on: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    needs: Option<&'static str>,
    steps: Vec<Step>,
}

#[derive(Serialize)]
struct Step {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    uses: Option<&'static str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    with: BTreeMap<&'static str, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    run: Option<String>,
}

impl Step {
    fn uses(name: &str, action: &'static str) -> Self {
        Self {
            name: name.to_string(),
            uses: Some(action),
            with: BTreeMap::new(),
            run: None,
        }
    }

    fn run(name: &str, command: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            uses: None,
            with: BTreeMap::new(),
            run: Some(command.into()),
        }
    }

    fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.with.insert(key, value.into());
        self
    }

    fn with_opt(self, key: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }
}

/// GitHub Actions workflow: a platform build/test job followed by a
/// container image build.
pub fn generate_workflow(
    stack: &TechStackProfile,
    structure: &ProjectStructure,
    analysis: &CodebaseAnalysis,
) -> Result<String, serde_yaml::Error> {
    let mut steps = vec![Step::uses("Checkout", "actions/checkout@v4")];
    steps.extend(platform_steps(stack, structure, analysis.has_tests));

    let workflow = Workflow {
        name: "Build and Deploy",
        on: Triggers {
            push: BranchFilter {
                branches: vec!["main"],
            },
            pull_request: BranchFilter {
                branches: vec!["main"],
            },
        },
        jobs: Jobs {
            build: Job {
                name: format!("Build ({})", stack.primary),
                runs_on: "ubuntu-latest",
                needs: None,
                steps,
            },
            docker: Job {
                name: "Container image".to_string(),
                runs_on: "ubuntu-latest",
                needs: Some("build"),
                steps: vec![
                    Step::uses("Checkout", "actions/checkout@v4"),
                    Step::uses("Set up Docker Buildx", "docker/setup-buildx-action@v3"),
                    Step::uses("Build image", "docker/build-push-action@v6")
                        .with("context", ".")
                        .with("push", "false")
                        .with("tags", "${{ github.repository }}:${{ github.sha }}"),
                ],
            },
        },
    };

    let body = serde_yaml::to_string(&workflow)?;
    Ok(format!("# Generated by stackpilot for {}\n{}", stack.primary, body))
}

fn platform_steps(stack: &TechStackProfile, structure: &ProjectStructure, has_tests: bool) -> Vec<Step> {
    let mut steps = Vec::new();
    match stack.primary {
        Platform::NodeJs => {
            let packages = NodePackageManager::detect(structure);
            steps.push(
                Step::uses("Set up Node.js", "actions/setup-node@v4")
                    .with("node-version", "20")
                    .with_opt("cache", packages.setup_node_cache()),
            );
            steps.push(Step::run("Install dependencies", packages.install(false)));
            if has_tests {
                steps.push(Step::run("Test", "npm test --if-present"));
            }
            steps.push(Step::run("Build", "npm run build --if-present"));
        }
        Platform::Python => {
            steps.push(
                Step::uses("Set up Python", "actions/setup-python@v5").with("python-version", "3.12"),
            );
            let install = if structure.has_file("requirements.txt") {
                "pip install -r requirements.txt"
            } else {
                "pip install ."
            };
            steps.push(Step::run("Install dependencies", install));
            if has_tests {
                steps.push(Step::run("Test", "pip install pytest && pytest"));
            }
        }
        Platform::Go => {
            steps.push(Step::uses("Set up Go", "actions/setup-go@v5").with("go-version", "1.22"));
            steps.push(Step::run("Build", "go build ./..."));
            if has_tests {
                steps.push(Step::run("Test", "go test ./..."));
            }
        }
        Platform::Rust => {
            steps.push(Step::uses("Set up Rust", "dtolnay/rust-toolchain@stable"));
            steps.push(Step::run("Build", "cargo build --release --locked"));
            if has_tests {
                steps.push(Step::run("Test", "cargo test --locked"));
            }
        }
        Platform::Java => {
            steps.push(
                Step::uses("Set up JDK", "actions/setup-java@v4")
                    .with("distribution", "temurin")
                    .with("java-version", "21"),
            );
            let build = if stack.has_framework("Gradle") && !stack.has_framework("Maven") {
                if has_tests {
                    "gradle build --no-daemon"
                } else {
                    "gradle build -x test --no-daemon"
                }
            } else if has_tests {
                "mvn -B verify"
            } else {
                "mvn -B package -DskipTests"
            };
            steps.push(Step::run("Build", build));
        }
        Platform::Unknown => {
            steps.push(Step::run(
                "Build",
                "echo \"No build steps detected; customize this job\"",
            ));
        }
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::InventoryEntry;
    use serde_yaml::Value;

    fn parse(workflow: &str) -> Value {
        serde_yaml::from_str(workflow).expect("workflow must be valid YAML")
    }

    fn render(stack: &TechStackProfile, structure: &ProjectStructure, has_tests: bool) -> Value {
        parse(&generate_workflow(stack, structure, &analysis(has_tests)).unwrap())
    }

    fn node_stack() -> TechStackProfile {
        TechStackProfile {
            primary: Platform::NodeJs,
            ..TechStackProfile::unknown()
        }
    }

    fn files(names: &[&str]) -> ProjectStructure {
        names
            .iter()
            .map(|name| (name.to_string(), InventoryEntry::file(1, "")))
            .collect()
    }

    fn setup_node(workflow: &Value) -> Value {
        workflow["jobs"]["build"]["steps"]
            .as_sequence()
            .unwrap()
            .iter()
            .find(|step| step["uses"].as_str() == Some("actions/setup-node@v4"))
            .cloned()
            .unwrap()
    }

    fn step_runs(workflow: &Value) -> Vec<String> {
        workflow["jobs"]["build"]["steps"]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(|step| step.get("run").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    fn analysis(has_tests: bool) -> CodebaseAnalysis {
        CodebaseAnalysis {
            has_tests,
            ..CodebaseAnalysis::default()
        }
    }

    #[test]
    fn test_node_workflow() {
        let stack = TechStackProfile {
            primary: Platform::NodeJs,
            ..TechStackProfile::unknown()
        };
        let structure: ProjectStructure = [("package-lock.json".to_string(), InventoryEntry::file(1, ".json"))]
            .into_iter()
            .collect();

        let workflow = render(&stack, &structure, true);

        let runs = step_runs(&workflow);
        assert!(runs.contains(&"npm ci".to_string()));
        assert_eq!(setup_node(&workflow)["with"]["cache"].as_str(), Some("npm"));
        assert!(runs.contains(&"npm test --if-present".to_string()));
        assert_eq!(workflow["jobs"]["docker"]["needs"].as_str(), Some("build"));
        assert_eq!(workflow["jobs"]["build"]["runs-on"].as_str(), Some("ubuntu-latest"));
    }

    #[test]
    fn test_test_step_follows_analysis() {
        let stack = TechStackProfile {
            primary: Platform::Go,
            ..TechStackProfile::unknown()
        };

        let without = step_runs(&render(&stack, &ProjectStructure::new(), false));
        assert_eq!(without, vec!["go build ./...".to_string()]);

        let with = step_runs(&render(&stack, &ProjectStructure::new(), true));
        assert!(with.contains(&"go test ./...".to_string()));
    }

    #[test]
    fn test_every_platform_yields_valid_yaml() {
        for primary in [
            Platform::NodeJs,
            Platform::Python,
            Platform::Go,
            Platform::Rust,
            Platform::Java,
            Platform::Unknown,
        ] {
            let stack = TechStackProfile {
                primary,
                ..TechStackProfile::unknown()
            };
            let text = generate_workflow(&stack, &ProjectStructure::new(), &analysis(true)).unwrap();
            let workflow = parse(&text);
            assert!(workflow["jobs"]["build"]["steps"].as_sequence().is_some());
            assert!(text.contains("${{ github.repository }}"));
        }
    }

    #[test]
    fn test_node_without_lockfile_skips_cache() {
        let workflow = render(&node_stack(), &files(&["package.json"]), false);

        let setup = setup_node(&workflow);
        assert_eq!(setup["with"]["node-version"].as_str(), Some("20"));
        assert!(setup["with"].get("cache").is_none());
        assert!(step_runs(&workflow).contains(&"npm install".to_string()));
    }

    #[test]
    fn test_yarn_lockfile_matches_dockerfile() {
        let structure = files(&["package.json", "yarn.lock"]);
        let workflow = render(&node_stack(), &structure, false);

        assert_eq!(setup_node(&workflow)["with"]["cache"].as_str(), Some("yarn"));
        let runs = step_runs(&workflow);
        assert!(runs.contains(&"yarn install --frozen-lockfile".to_string()));
        assert!(!runs.iter().any(|run| run.starts_with("npm install") || run == "npm ci"));

        let dockerfile = super::super::generate_dockerfile(&node_stack(), &structure);
        assert!(dockerfile.contains("yarn install --frozen-lockfile"));
    }
}
