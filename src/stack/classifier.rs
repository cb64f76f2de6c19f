use super::manifest::{NodeManifest, PythonManifest};
use super::{Platform, TechStackProfile};
use crate::scan::ProjectStructure;
use std::path::Path;
use tracing::{debug, warn};

const NODE_FRONTEND: &[(&str, &str)] = &[
    ("react", "React"),
    ("vue", "Vue.js"),
    ("@angular/core", "Angular"),
    ("svelte", "Svelte"),
];

const NODE_BACKEND: &[(&str, &str)] = &[
    ("express", "Express.js"),
    ("fastify", "Fastify"),
    ("koa", "Koa"),
    ("@nestjs/core", "NestJS"),
];

const NODE_FRAMEWORKS: &[(&str, &str)] = &[("next", "Next.js"), ("nuxt", "Nuxt")];

const NODE_DATABASES: &[(&str, &str)] = &[
    ("mongoose", "MongoDB"),
    ("mongodb", "MongoDB"),
    ("pg", "PostgreSQL"),
    ("mysql", "MySQL"),
    ("mysql2", "MySQL"),
    ("redis", "Redis"),
    ("ioredis", "Redis"),
    ("sqlite3", "SQLite"),
];

const PYTHON_DATABASES: &[(&str, &str)] = &[
    ("psycopg2", "PostgreSQL"),
    ("psycopg2-binary", "PostgreSQL"),
    ("asyncpg", "PostgreSQL"),
    ("pymongo", "MongoDB"),
    ("motor", "MongoDB"),
    ("mysqlclient", "MySQL"),
    ("pymysql", "MySQL"),
    ("redis", "Redis"),
];

/// Root-level Python entrypoints and the backend assumed for each when
/// neither the manifest nor the imports name one
const PYTHON_ENTRYPOINTS: &[(&str, &str)] = &[("app.py", "Flask"), ("main.py", "FastAPI")];

/// Web framework imported by a Python module, if any
fn framework_from_imports(source: &str) -> Option<&'static str> {
    source.lines().find_map(|line| {
        let line = line.trim_start();
        let rest = line
            .strip_prefix("from ")
            .or_else(|| line.strip_prefix("import "))?;
        let module = rest
            .split(|c: char| c.is_whitespace() || c == '.' || c == ',')
            .next()?;
        match module {
            "fastapi" => Some("FastAPI"),
            "flask" => Some("Flask"),
            _ => None,
        }
    })
}

/// Classification outcome plus the non-fatal problems hit on the way
#[derive(Debug, Clone)]
pub struct Classification {
    pub profile: TechStackProfile,
    pub warnings: Vec<String>,
}

/// Infers the technology stack of the snapshot at `root_path`.
///
/// Never fails: unreadable or malformed manifests fall back to inference
/// from file presence alone.
pub fn classify(root_path: &Path, inventory: &ProjectStructure) -> TechStackProfile {
    classify_with_diagnostics(root_path, inventory).profile
}

pub fn classify_with_diagnostics(root_path: &Path, inventory: &ProjectStructure) -> Classification {
    let mut builder = ProfileBuilder::default();

    if inventory.has_file("package.json") {
        builder.platform(Platform::NodeJs);
        builder.language("JavaScript");

        if let Some(content) = builder.read(root_path, "package.json") {
            match NodeManifest::parse(&content) {
                Ok(manifest) => apply_node_manifest(&mut builder, &manifest),
                Err(err) => builder.warn(format!("{:#}; using file presence only", err)),
            }
        }
    }

    let has_requirements = inventory.has_file("requirements.txt");
    let has_pyproject = inventory.has_file("pyproject.toml");
    if has_requirements || has_pyproject {
        builder.platform(Platform::Python);
        builder.language("Python");

        let mut manifest = PythonManifest::default();
        if has_requirements {
            for problem in manifest.add_requirements_tree(root_path, "requirements.txt") {
                builder.warn(problem);
            }
        }
        if has_pyproject {
            if let Some(content) = builder.read(root_path, "pyproject.toml") {
                if let Err(err) = manifest.add_pyproject(&content) {
                    builder.warn(format!("{:#}; using file presence only", err));
                }
            }
        }
        apply_python(&mut builder, root_path, inventory, &manifest);
    }

    if inventory.has_file("go.mod") {
        builder.platform(Platform::Go);
        builder.language("Go");
    }

    if inventory.has_file("Cargo.toml") {
        builder.platform(Platform::Rust);
        builder.language("Rust");
    }

    let has_maven = inventory.has_file("pom.xml");
    let has_gradle = inventory.has_file("build.gradle") || inventory.has_file("build.gradle.kts");
    if has_maven || has_gradle {
        builder.platform(Platform::Java);
        builder.language("Java");
        if has_maven {
            builder.add(Category::Frameworks, "Maven");
        }
        if has_gradle {
            builder.add(Category::Frameworks, "Gradle");
        }
    }

    let file_names = || {
        inventory
            .files()
            .map(|(path, _)| path.rsplit('/').next().unwrap_or(path))
    };
    if file_names().any(|name| name.starts_with("docker-compose")) {
        builder.add(Category::Deployment, "Docker Compose");
    }
    if file_names().any(|name| name == "Dockerfile") {
        builder.add(Category::Deployment, "Docker");
    }

    builder.finish()
}

fn apply_node_manifest(builder: &mut ProfileBuilder, manifest: &NodeManifest) {
    if manifest.dev_dependencies.contains("typescript") {
        builder.language("TypeScript");
    }
    for (dep, name) in NODE_FRONTEND {
        if manifest.has(dep) {
            builder.add(Category::Frontend, name);
        }
    }
    for (dep, name) in NODE_BACKEND {
        if manifest.has(dep) {
            builder.add(Category::Backend, name);
        }
    }
    for (dep, name) in NODE_FRAMEWORKS {
        if manifest.has(dep) {
            builder.add(Category::Frameworks, name);
        }
    }
    for (dep, name) in NODE_DATABASES {
        if manifest.has(dep) {
            builder.add(Category::Database, name);
        }
    }
}

fn apply_python(
    builder: &mut ProfileBuilder,
    root_path: &Path,
    inventory: &ProjectStructure,
    manifest: &PythonManifest,
) {
    let has_django = inventory.has_file("manage.py");
    if has_django {
        builder.add(Category::Backend, "Django");
    }

    let entrypoints: Vec<&str> = inventory
        .root_files_matching(|name| PYTHON_ENTRYPOINTS.iter().any(|(file, _)| *file == name))
        .collect();
    if let Some(first) = entrypoints.first() {
        let declared = if manifest.has("fastapi") {
            Some("FastAPI")
        } else if manifest.has("flask") {
            Some("Flask")
        } else {
            None
        };
        let backend = declared
            .or_else(|| {
                entrypoints.iter().find_map(|name| {
                    builder
                        .read(root_path, name)
                        .and_then(|source| framework_from_imports(&source))
                })
            })
            .or_else(|| {
                if has_django {
                    return None;
                }
                let assumed = PYTHON_ENTRYPOINTS
                    .iter()
                    .find(|(file, _)| file == first)
                    .map(|(_, backend)| *backend);
                debug!(entrypoint = %first, backend = ?assumed, "No Python web framework declared or imported");
                assumed
            });
        if let Some(backend) = backend {
            builder.add(Category::Backend, backend);
        }
    }

    for (dep, name) in PYTHON_DATABASES {
        if manifest.has(dep) {
            builder.add(Category::Database, name);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Category {
    Frontend,
    Backend,
    Database,
    Deployment,
    Frameworks,
}

#[derive(Default)]
struct ProfileBuilder {
    primary: Option<Platform>,
    profile: TechStackProfile,
    signals: usize,
    warnings: Vec<String>,
}

impl ProfileBuilder {
    /// First matching platform becomes primary; every match counts as a signal
    fn platform(&mut self, platform: Platform) {
        self.signals += 1;
        if self.primary.is_none() {
            self.primary = Some(platform);
        }
    }

    fn language(&mut self, name: &str) {
        push_unique(&mut self.profile.languages, name);
    }

    fn add(&mut self, category: Category, name: &str) {
        let list = match category {
            Category::Frontend => &mut self.profile.frontend,
            Category::Backend => &mut self.profile.backend,
            Category::Database => &mut self.profile.database,
            Category::Deployment => &mut self.profile.deployment,
            Category::Frameworks => &mut self.profile.frameworks,
        };
        if push_unique(list, name) {
            self.signals += 1;
        }
    }

    fn read(&mut self, root: &Path, name: &str) -> Option<String> {
        match std::fs::read_to_string(root.join(name)) {
            Ok(content) => Some(content),
            Err(err) => {
                self.warn(format!("could not read {}: {}", name, err));
                None
            }
        }
    }

    fn warn(&mut self, message: String) {
        warn!(message = %message, "Manifest problem during classification");
        self.warnings.push(message);
    }

    fn finish(mut self) -> Classification {
        self.profile.primary = self.primary.unwrap_or(Platform::Unknown);
        self.profile.confidence = TechStackProfile::confidence_for(self.signals);
        Classification {
            profile: self.profile,
            warnings: self.warnings,
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|v| v == value) {
        false
    } else {
        list.push(value.to_string());
        true
    }
}
