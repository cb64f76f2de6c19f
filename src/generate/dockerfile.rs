use super::{default_port, is_static_frontend, NodePackageManager};
use crate::scan::ProjectStructure;
use crate::stack::{Platform, TechStackProfile};
use std::fmt::Write as _;

const NODE_IMAGE: &str = "node:20-alpine";
const PYTHON_IMAGE: &str = "python:3.12-slim";

pub fn generate_dockerfile(stack: &TechStackProfile, structure: &ProjectStructure) -> String {
    let mut out = header(stack);
    let port = default_port(stack);

    let body = match stack.primary {
        Platform::NodeJs => node(stack, structure, port),
        Platform::Python => python(stack, structure, port),
        Platform::Go => go(port),
        Platform::Rust => rust(port),
        Platform::Java => java(stack, port),
        Platform::Unknown => generic(port),
    };
    out.push_str(&body);
    out
}

fn header(stack: &TechStackProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Generated by stackpilot");
    let _ = writeln!(
        out,
        "# Platform: {} (confidence {}%)",
        stack.primary, stack.confidence
    );
    let components: Vec<&str> = stack
        .frontend
        .iter()
        .chain(&stack.backend)
        .chain(&stack.frameworks)
        .map(String::as_str)
        .collect();
    if !components.is_empty() {
        let _ = writeln!(out, "# Stack: {}", components.join(", "));
    }
    out.push('\n');
    out
}

fn node(stack: &TechStackProfile, structure: &ProjectStructure, port: u16) -> String {
    let packages = NodePackageManager::detect(structure);
    let manifests = packages.copy_manifests();
    let install = format!("RUN {}", packages.install(false));
    let prod_install = format!("RUN {}", packages.install(true));

    if stack.frameworks.iter().any(|f| f == "Next.js" || f == "Nuxt") {
        return format!(
            "FROM {image} AS deps\n\
             WORKDIR /app\n\
             {manifests}\n\
             {install}\n\
             \n\
             FROM {image} AS builder\n\
             WORKDIR /app\n\
             COPY --from=deps /app/node_modules ./node_modules\n\
             COPY . .\n\
             RUN npm run build\n\
             \n\
             FROM {image} AS runner\n\
             WORKDIR /app\n\
             ENV NODE_ENV=production\n\
             ENV PORT={port}\n\
             COPY --from=builder /app ./\n\
             EXPOSE {port}\n\
             CMD [\"npm\", \"start\"]\n",
            image = NODE_IMAGE,
            manifests = manifests,
            install = install,
            port = port,
        );
    }

    let output_dir = frontend_output_dir(stack);

    if is_static_frontend(stack) {
        return format!(
            "FROM {image} AS builder\n\
             WORKDIR /app\n\
             {manifests}\n\
             {install}\n\
             COPY . .\n\
             RUN npm run build\n\
             \n\
             FROM nginx:alpine\n\
             COPY --from=builder /app/{output_dir} /usr/share/nginx/html\n\
             EXPOSE {port}\n\
             CMD [\"nginx\", \"-g\", \"daemon off;\"]\n",
            image = NODE_IMAGE,
            manifests = manifests,
            install = install,
            output_dir = output_dir,
            port = port,
        );
    }

    if stack.has_frontend() {
        // The runtime stage takes sources from the build context and only the
        // bundle from the builder, so its node_modules stays production-only.
        return format!(
            "FROM {image} AS builder\n\
             WORKDIR /app\n\
             {manifests}\n\
             {install}\n\
             COPY . .\n\
             RUN npm run build --if-present\n\
             \n\
             FROM {image}\n\
             WORKDIR /app\n\
             ENV NODE_ENV=production\n\
             ENV PORT={port}\n\
             COPY . .\n\
             {prod_install}\n\
             COPY --from=builder /app/{output_dir} ./{output_dir}\n\
             EXPOSE {port}\n\
             CMD [\"npm\", \"start\"]\n",
            image = NODE_IMAGE,
            manifests = manifests,
            install = install,
            prod_install = prod_install,
            output_dir = output_dir,
            port = port,
        );
    }

    format!(
        "FROM {image}\n\
         WORKDIR /app\n\
         ENV NODE_ENV=production\n\
         ENV PORT={port}\n\
         {manifests}\n\
         {install}\n\
         COPY . .\n\
         EXPOSE {port}\n\
         CMD [\"npm\", \"start\"]\n",
        image = NODE_IMAGE,
        manifests = manifests,
        install = prod_install,
        port = port,
    )
}

/// Bundle directory: Create React App writes `build`, Vite and Vue CLI `dist`
fn frontend_output_dir(stack: &TechStackProfile) -> &'static str {
    if stack.frontend.iter().any(|f| f == "React") {
        "build"
    } else {
        "dist"
    }
}

fn python(stack: &TechStackProfile, structure: &ProjectStructure, port: u16) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "FROM {}", PYTHON_IMAGE);
    let _ = writeln!(out, "WORKDIR /app");
    let _ = writeln!(out, "ENV PYTHONUNBUFFERED=1");
    let _ = writeln!(out, "ENV PYTHONDONTWRITEBYTECODE=1");

    if structure.has_file("requirements.txt") {
        let _ = writeln!(out, "COPY requirements.txt ./");
        let _ = writeln!(out, "RUN pip install --no-cache-dir -r requirements.txt");
        let _ = writeln!(out, "COPY . .");
    } else {
        let _ = writeln!(out, "COPY . .");
        let _ = writeln!(out, "RUN pip install --no-cache-dir .");
    }

    let entry_module = if structure.has_file("main.py") {
        "main"
    } else {
        "app"
    };
    let bind = format!("0.0.0.0:{}", port);

    let cmd = if stack.has_framework("Django") {
        format!(
            "CMD [\"python\", \"manage.py\", \"runserver\", \"{}\"]",
            bind
        )
    } else if stack.has_framework("FastAPI") {
        format!(
            "CMD [\"uvicorn\", \"{}:app\", \"--host\", \"0.0.0.0\", \"--port\", \"{}\"]",
            entry_module, port
        )
    } else if stack.has_framework("Flask") {
        let _ = writeln!(out, "RUN pip install --no-cache-dir gunicorn");
        format!(
            "CMD [\"gunicorn\", \"--bind\", \"{}\", \"{}:app\"]",
            bind, entry_module
        )
    } else {
        format!("CMD [\"python\", \"{}.py\"]", entry_module)
    };

    let _ = writeln!(out, "EXPOSE {}", port);
    let _ = writeln!(out, "{}", cmd);
    out
}

fn go(port: u16) -> String {
    format!(
        "FROM golang:1.22-alpine AS builder\n\
         WORKDIR /src\n\
         COPY go.mod go.sum* ./\n\
         RUN go mod download\n\
         COPY . .\n\
         RUN CGO_ENABLED=0 go build -o /out/app .\n\
         \n\
         FROM alpine:3.20\n\
         RUN adduser -D -u 10001 app\n\
         COPY --from=builder /out/app /usr/local/bin/app\n\
         USER app\n\
         EXPOSE {port}\n\
         ENTRYPOINT [\"/usr/local/bin/app\"]\n",
        port = port
    )
}

fn rust(port: u16) -> String {
    format!(
        "FROM rust:1.79-slim AS builder\n\
         WORKDIR /src\n\
         COPY . .\n\
         RUN cargo build --release \\\n    \
         && find target/release -maxdepth 1 -type f -perm -u+x -exec cp {{}} /usr/local/bin/app \\;\n\
         \n\
         FROM debian:bookworm-slim\n\
         RUN apt-get update && apt-get install -y --no-install-recommends ca-certificates \\\n    \
         && rm -rf /var/lib/apt/lists/*\n\
         COPY --from=builder /usr/local/bin/app /usr/local/bin/app\n\
         EXPOSE {port}\n\
         ENTRYPOINT [\"/usr/local/bin/app\"]\n",
        port = port
    )
}

fn java(stack: &TechStackProfile, port: u16) -> String {
    let (builder_image, build, artifact) = if stack.has_framework("Gradle") && !stack.has_framework("Maven") {
        (
            "gradle:8-jdk21",
            "RUN gradle build -x test --no-daemon \\\n    && find build/libs -name '*-plain.jar' -delete",
            "/app/build/libs/*.jar",
        )
    } else {
        (
            "maven:3.9-eclipse-temurin-21",
            "RUN mvn -B package -DskipTests",
            "/app/target/*.jar",
        )
    };

    format!(
        "FROM {builder_image} AS builder\n\
         WORKDIR /app\n\
         COPY . .\n\
         {build}\n\
         \n\
         FROM eclipse-temurin:21-jre\n\
         WORKDIR /app\n\
         COPY --from=builder {artifact} app.jar\n\
         EXPOSE {port}\n\
         ENTRYPOINT [\"java\", \"-jar\", \"app.jar\"]\n",
        builder_image = builder_image,
        build = build,
        artifact = artifact,
        port = port
    )
}

fn generic(port: u16) -> String {
    format!(
        "# No recognized platform; adjust the base image and start command.\n\
         FROM alpine:3.20\n\
         WORKDIR /app\n\
         COPY . .\n\
         EXPOSE {port}\n\
         CMD [\"sh\", \"-c\", \"echo 'Configure a start command for this image' && sleep infinity\"]\n",
        port = port
    )
}
