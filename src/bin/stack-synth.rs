// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Synthesizer
//!
//! Validates deployment parameters, synthesizes the stack and prints the
//! deployment template as JSON. With `--plan` it prints the change set
//! against a previously applied template instead; with `--teardown` the
//! teardown plan.
//!
//! Parameters are read from a context file, then the environment
//! (`ENV_NAME`, `HOSTED_ZONE_ID`, `HOSTED_ZONE_NAME`, `AWS_REGION`, ...),
//! then command-line flags; later sources win.
//!
//! Run with: cargo run --bin stack-synth -- --context cdk.json

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use cim_stack::config::DeploymentParameters;
use cim_stack::orchestrator::StackOrchestrator;
use cim_stack::plan;
use cim_stack::template::Template;

#[derive(Parser, Debug)]
#[command(name = "stack-synth", version, about = "Synthesize a multi-tier deployment stack")]
struct Args {
    /// Context file (`{"context": {...}}`)
    #[arg(short, long)]
    context: Option<PathBuf>,

    #[arg(long)]
    env_name: Option<String>,

    #[arg(long)]
    hosted_zone_id: Option<String>,

    #[arg(long)]
    hosted_zone_name: Option<String>,

    #[arg(long)]
    region: Option<String>,

    /// `destroy` or `retain`
    #[arg(long)]
    data_retention: Option<String>,

    #[arg(long)]
    container_image: Option<String>,

    /// Print the change set against this previously applied template
    #[arg(long, value_name = "PREVIOUS_TEMPLATE", conflicts_with = "teardown")]
    plan: Option<PathBuf>,

    /// Print the teardown plan for the synthesized stack
    #[arg(long)]
    teardown: bool,
}

impl Args {
    fn parameters(&self) -> Result<DeploymentParameters> {
        let from_file = match &self.context {
            Some(path) => DeploymentParameters::from_context_file(path)
                .with_context(|| format!("Failed to load context file {}", path.display()))?,
            None => DeploymentParameters::default(),
        };
        let from_env = DeploymentParameters::from_env().context("Invalid environment parameters")?;
        let from_flags = DeploymentParameters {
            env_name: self.env_name.clone(),
            hosted_zone_id: self.hosted_zone_id.clone(),
            hosted_zone_name: self.hosted_zone_name.clone(),
            region: self.region.clone(),
            data_retention: self.data_retention.clone(),
            container_image: self.container_image.clone(),
            ..Default::default()
        };
        Ok(from_file.overlay(from_env).overlay(from_flags))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let params = args.parameters()?;

    let synthesis = StackOrchestrator::new()
        .synthesize(&params)
        .context("Stack synthesis failed")?;
    for warning in &synthesis.warnings {
        warn!("{}", warning);
    }
    let template = synthesis.template();

    let output = if let Some(previous) = &args.plan {
        let raw = std::fs::read_to_string(previous)
            .with_context(|| format!("Failed to read {}", previous.display()))?;
        let previous = Template::from_json(&raw).context("Invalid previous template")?;
        let changes = plan::diff(Some(&previous), &template)?;
        info!(changes = changes.len(), "Change set computed");
        serde_json::to_string_pretty(&changes)?
    } else if args.teardown {
        let changes = plan::teardown(&template)?;
        serde_json::to_string_pretty(&changes)?
    } else {
        template.to_json_pretty()?
    };

    println!("{output}");
    Ok(())
}
