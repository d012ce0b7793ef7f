// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Orchestrator
//!
//! Entry point of a synthesis run. Validates the deployment parameters
//! before any resource exists, then builds the tiers in dependency order:
//!
//! ```text
//! Network → SecurityPolicyGraph → DataTier → ComputeTier → EdgeSecurityLayer → ObservabilityLayer
//! ```
//!
//! and exports the stack outputs. A failure anywhere discards the whole
//! graph; there is no partially synthesized stack.

use tracing::{debug, info, instrument};

use crate::config::{DeploymentParameters, StackConfig};
use crate::errors::SynthesisResult;
use crate::graph::{Output, ResourceGraph, Value};
use crate::template::Template;
use crate::tiers::{
    ComputeTier, ComputeTierProvisioner, DataTier, DataTierProvisioner, EdgeSecurityLayer,
    EdgeTier, NetworkTopology, NetworkTopologyBuilder, ObservabilityLayer, ObservabilityTier,
    SecurityGroups, SecurityPolicy, SecurityPolicyGraph,
};

/// Result of one synthesis run
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub config: StackConfig,
    pub graph: ResourceGraph,
    /// Non-fatal findings, such as a defaulted environment name
    pub warnings: Vec<String>,
    pub network: NetworkTopology,
    pub security: SecurityPolicy,
    pub security_groups: SecurityGroups,
    pub data: DataTier,
    pub compute: ComputeTier,
    pub edge: EdgeTier,
    pub observability: ObservabilityTier,
}

impl Synthesis {
    pub fn template(&self) -> Template {
        Template::from_graph(
            &self.graph,
            format!(
                "Multi-tier deployment stack for the {} environment",
                self.config.environment.name
            ),
        )
    }
}

/// Builds a complete stack from deployment parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct StackOrchestrator;

impl StackOrchestrator {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(env = params.env_name.as_deref().unwrap_or("")))]
    pub fn synthesize(&self, params: &DeploymentParameters) -> SynthesisResult<Synthesis> {
        let (config, warnings) = StackConfig::from_parameters(params)?;
        let mut graph = ResourceGraph::new();

        let network = NetworkTopologyBuilder::new(&config).build(&mut graph)?;
        let security = SecurityPolicyGraph::standard(&config)?.seal();
        let security_groups = security.materialize(&config, &network, &mut graph)?;
        let data =
            DataTierProvisioner::new(&config, &network, &security_groups).provision(&mut graph)?;
        let compute = ComputeTierProvisioner::new(&config, &network, &security_groups, &data)
            .provision(&mut graph)?;
        let edge = EdgeSecurityLayer::new(&config, &compute).build(&mut graph)?;
        let observability = ObservabilityLayer::new(&config, &compute).build(&mut graph)?;

        export_outputs(&config, &mut graph, &data, &compute, &edge)?;

        // Reject an unorderable graph before it leaves synthesis.
        graph.provisioning_order()?;

        info!(
            environment = %config.environment.name,
            resources = graph.len(),
            warnings = warnings.len(),
            "Stack synthesized"
        );
        for (category, count) in graph.count_by_category() {
            debug!(%category, resources = count, "Tier resources");
        }

        Ok(Synthesis {
            config,
            graph,
            warnings,
            network,
            security,
            security_groups,
            data,
            compute,
            edge,
            observability,
        })
    }
}

fn export_outputs(
    config: &StackConfig,
    graph: &mut ResourceGraph,
    data: &DataTier,
    compute: &ComputeTier,
    edge: &EdgeTier,
) -> SynthesisResult<()> {
    let env = &config.environment.name;
    let outputs = [
        (
            "LoadBalancerDNS",
            compute.load_balancer_dns(),
            "DNS name of the load balancer",
        ),
        (
            "RecordDomainName",
            Value::from(format!("https://{}", edge.domain)),
            "Fully qualified domain name of the environment",
        ),
        (
            "DBEndpoint",
            data.endpoint(),
            "Writer endpoint of the database cluster",
        ),
        (
            "DBReadEndpoint",
            data.read_endpoint(),
            "Reader endpoint of the database cluster",
        ),
        (
            "EnvName",
            Value::from(env.as_str()),
            "Environment identifier",
        ),
    ];

    for (name, value, description) in outputs {
        graph.add_output(
            name,
            Output {
                value,
                description: description.to_string(),
                export_name: Some(env.scoped(name)),
            },
        )?;
    }
    Ok(())
}
