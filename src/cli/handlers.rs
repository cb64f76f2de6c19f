//! Subcommand handlers. Each returns the process exit code.

use super::commands::{AnalyzeArgs, ConfigArgs, InspectArgs, ServeArgs};
use super::output::{AnalysisReport, OutputFormatter};
use crate::config::StackpilotConfig;
use crate::generate;
use crate::profile::profile;
use crate::scan::{ScanConfig, Scanner};
use crate::service::{AnalysisService, CloneRequest};
use crate::session::spawn_sweeper;
use crate::stack::classify_with_diagnostics;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

pub async fn handle_serve(args: &ServeArgs) -> i32 {
    let mut config = StackpilotConfig::default();
    if let Some(bind) = &args.bind {
        config.bind_addr = bind.clone();
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return 1;
    }
    debug!("{}", config);

    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let service = match AnalysisService::from_config(&config) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("{}", e.help_message());
            return 1;
        }
    };

    let sweeper = spawn_sweeper(
        service.registry(),
        config.retention(),
        config.sweep_interval(),
    );

    let result = crate::server::serve(service, addr).await;
    sweeper.abort();

    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("Server error: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

pub async fn handle_analyze(args: &AnalyzeArgs, quiet: bool) -> i32 {
    let config = StackpilotConfig::default();
    let service = match AnalysisService::from_config(&config) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("{}", e.help_message());
            return 1;
        }
    };

    let mut request = CloneRequest::new(&args.repo_url);
    if let Some(token) = &args.token {
        request = request.with_token(token);
    }

    let cloned = match service.clone_repository(request).await {
        Ok(cloned) => cloned,
        Err(e) => {
            eprintln!("{}", e.help_message());
            return 1;
        }
    };
    info!(session_id = %cloned.session_id, "Repository cloned");

    let outcome = analyze_session(&service, &cloned.session_id, args, quiet).await;

    if let Err(e) = service.cleanup(&cloned.session_id).await {
        debug!(error = %e, "Session cleanup failed");
    }

    match outcome {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

async fn analyze_session(
    service: &AnalysisService,
    session_id: &str,
    args: &AnalyzeArgs,
    quiet: bool,
) -> Result<()> {
    service
        .run_analysis(session_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.help_message()))?;
    let results = service
        .results(session_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.help_message()))?;

    if let Some(dir) = &args.output_dir {
        write_artifacts(dir, results.files.iter().map(|(n, c)| (n.as_str(), c.as_str()))).await?;
    }

    if !quiet {
        let report = AnalysisReport::from(&results);
        println!("{}", OutputFormatter::new(args.format.into()).format_report(&report)?);
    }
    Ok(())
}

pub async fn handle_inspect(args: &InspectArgs, quiet: bool) -> i32 {
    let path = args.path.clone().unwrap_or_else(|| PathBuf::from("."));

    match inspect(&path, args, quiet).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

async fn inspect(path: &Path, args: &InspectArgs, quiet: bool) -> Result<()> {
    let root = path
        .canonicalize()
        .with_context(|| format!("Repository path does not exist: {}", path.display()))?;
    let source = root.display().to_string();

    let (report, files) = tokio::task::spawn_blocking(move || -> Result<_> {
        let structure = Scanner::new(ScanConfig::default())
            .scan(&root)
            .context("Failed to scan repository")?;
        let classification = classify_with_diagnostics(&root, &structure);
        let analysis = profile(&structure);
        let artifacts = generate::generate(&classification.profile, &structure, &analysis)?;

        let files: Vec<(String, String)> = artifacts
            .named()
            .iter()
            .map(|(name, content)| (name.to_string(), content.to_string()))
            .collect();

        let report = AnalysisReport {
            source,
            tech_stack: classification.profile,
            codebase_analysis: analysis,
            verification: None,
            generated_files: files.iter().map(|(name, _)| name.clone()).collect(),
            messages: Vec::new(),
            errors: classification.warnings,
        };
        Ok((report, files))
    })
    .await
    .context("Inspect task panicked")??;

    if let Some(dir) = &args.output_dir {
        write_artifacts(dir, files.iter().map(|(n, c)| (n.as_str(), c.as_str()))).await?;
    }

    if !quiet {
        println!("{}", OutputFormatter::new(args.format.into()).format_report(&report)?);
    }
    Ok(())
}

pub fn handle_config(args: &ConfigArgs) -> i32 {
    let config = StackpilotConfig::default();
    match OutputFormatter::new(args.format.into()).format_config(&config) {
        Ok(output) => {
            println!("{}", output);
            if let Err(e) = config.validate() {
                eprintln!("\u{26A0} {}", e);
                return 1;
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

async fn write_artifacts<'a>(
    dir: &Path,
    files: impl Iterator<Item = (&'a str, &'a str)>,
) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    for (name, content) in files {
        let target = dir.join(name);
        tokio::fs::write(&target, content)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;
        info!(path = %target.display(), "Wrote artifact");
    }
    Ok(())
}
