use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use node_rotator::{
    CapacityProvider, NodeOutcome, NodeRotator, ProviderError, Rotation, RotationCriterion,
    RotationReport, RotationSet, RotatorConfig, RunSummary, SelfManagedProvider,
};
use node_rotator_kubeapi::KubeApi;
use node_rotator_oci::{
    DEFAULT_PROFILE, HttpContainerEngine, ManagedClusterProvider, OciProfile, ProviderConfig,
    RequestSigner,
};
use tracing_subscriber::EnvFilter;

mod duration;

const CURRENT_CONTEXT: &str = "default";

/// Replaces aged Kubernetes worker nodes with fresh capacity.
#[derive(Debug, Parser)]
#[command(name = "node-rotator", version, about)]
struct Cli {
    /// Kubeconfig context of the cluster; `default` uses the current context
    #[arg(default_value = CURRENT_CONTEXT, env = "NODE_ROTATOR_CLUSTER")]
    cluster: String,

    /// Narrate and wait without changing the cluster or the node pool
    #[arg(long, env = "NODE_ROTATOR_DRY_RUN")]
    dry_run: bool,

    #[arg(long, value_enum, default_value_t = Provider::SelfManaged, env = "NODE_ROTATOR_PROVIDER")]
    provider: Provider,

    #[arg(long, value_enum, default_value_t = RotateType::Days, env = "NODE_ROTATOR_ROTATE_TYPE")]
    rotate_type: RotateType,

    /// Minimum node age, in units of `--rotate-type`
    #[arg(long, default_value_t = 60, env = "NODE_ROTATOR_ROTATE_VALUE")]
    rotate_value: u32,

    /// Wait after each node pool resize
    #[arg(long, default_value = "60s", value_parser = duration::parse_duration, env = "NODE_ROTATOR_PROVISION_TIME")]
    provision_time: Duration,

    /// Wait between evictions and the forced drain of a node
    #[arg(long, value_parser = duration::parse_duration, env = "NODE_ROTATOR_DRAIN_SETTLE")]
    drain_settle: Option<Duration>,

    #[command(flatten)]
    oci: OciArgs,
}

#[derive(Debug, clap::Args)]
struct OciArgs {
    /// Compartment of the cluster; read from the node annotations when unset
    #[arg(long = "oci-compartment-id", env = "OCI_COMPARTMENT_ID")]
    compartment_id: Option<String>,

    #[arg(long = "oci-cluster-id", env = "OCI_CLUSTER_ID")]
    cluster_id: Option<String>,

    /// Region of the container engine; defaults to the profile's region
    #[arg(long = "oci-region", env = "OCI_REGION")]
    region: Option<String>,

    /// Container engine endpoint, overrides the region
    #[arg(long = "oci-endpoint", env = "OCI_ENDPOINT")]
    endpoint: Option<String>,

    /// OCI CLI config file holding the API signing key; defaults to `~/.oci/config`
    #[arg(long = "oci-config", env = "OCI_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    #[arg(long = "oci-profile", default_value = DEFAULT_PROFILE, env = "OCI_CLI_PROFILE")]
    profile: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Provider {
    Oci,
    SelfManaged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum RotateType {
    Days,
}

impl Cli {
    fn criterion(&self) -> RotationCriterion {
        match self.rotate_type {
            RotateType::Days => RotationCriterion::days(self.rotate_value),
        }
    }

    fn rotator_config(&self) -> RotatorConfig {
        let config = RotatorConfig::new(self.criterion(), self.dry_run);
        match self.drain_settle {
            Some(drain_settle) => config.drain_settle(drain_settle),
            None => config,
        }
    }

    fn context(&self) -> Option<&str> {
        Some(self.cluster.as_str()).filter(|cluster| *cluster != CURRENT_CONTEXT)
    }

    fn capacity_provider(
        &self,
        set: &RotationSet,
    ) -> Result<Box<dyn CapacityProvider>, ProviderError> {
        match self.provider {
            Provider::SelfManaged => Ok(Box::new(SelfManagedProvider::new())),
            Provider::Oci => {
                let config = ProviderConfig::resolve(
                    self.oci.cluster_id.clone(),
                    self.oci.compartment_id.clone(),
                    set,
                )?;
                let engine = self.oci.engine()?;
                tracing::info!(endpoint = engine.endpoint(), "Using container engine");
                let provider = ManagedClusterProvider::new(engine, config, set)
                    .provision_wait(self.provision_time)
                    .dry_run(self.dry_run);
                Ok(Box::new(provider))
            }
        }
    }
}

impl OciArgs {
    fn profile(&self) -> Result<OciProfile, ProviderError> {
        let path = match &self.config_file {
            Some(path) => path.clone(),
            None => OciProfile::default_path().ok_or_else(|| {
                ProviderError::configuration("cannot locate the OCI config file")
            })?,
        };
        OciProfile::from_file(path, &self.profile)
    }

    fn engine(&self) -> Result<HttpContainerEngine, ProviderError> {
        let profile = self.profile()?;
        let signer = RequestSigner::from_profile(&profile)?;
        let region = non_blank(&self.region).or(profile.region());
        let engine = match (non_blank(&self.endpoint), region) {
            (Some(endpoint), _) => HttpContainerEngine::new(endpoint)?,
            (None, Some(region)) => HttpContainerEngine::for_region(region)?,
            (None, None) => {
                return Err(ProviderError::configuration(
                    "provider 'region' or 'endpoint' is missing",
                ));
            }
        };
        tracing::debug!(key_id = signer.key_id(), "Signing requests with API key");
        Ok(engine.signer(signer))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    tracing::info!(
        cluster = %cli.cluster,
        provider = ?cli.provider,
        "Starting node-rotator"
    );
    tracing::info!("Nodes {} will be rotated", cli.criterion());
    if cli.dry_run {
        tracing::info!("Running in dry mode");
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    let progress = spinner.clone();

    let cluster = KubeApi::new(cli.context()).await?;
    let rotator = NodeRotator::new(cluster, cli.rotator_config());
    let rotation = Rotation::new(&cli.cluster, rotator)
        .on_phase(move |phase| progress.set_message(format!("{phase} ..")));

    let summary = rotation.run(|set| cli.capacity_provider(set)).await;
    spinner.finish_and_clear();

    match summary? {
        RunSummary::NothingToRotate => tracing::info!("Nothing to rotate"),
        RunSummary::Rotated(report) => log_report(&report),
    }

    Ok(())
}

fn log_report(report: &RotationReport) {
    for node in report.nodes() {
        match &node.outcome {
            NodeOutcome::Succeeded => {
                tracing::info!(node = %node.node, evicted = node.evicted, "Node rotated");
            }
            NodeOutcome::CordonFailed { reason } => {
                tracing::error!(node = %node.node, %reason, "Node needs manual follow-up");
            }
            NodeOutcome::PartiallyEvicted { failed_pods } => {
                tracing::warn!(node = %node.node, ?failed_pods, "Node drained with failures");
            }
        }
    }
    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        dry_run = report.dry_run(),
        "Rotation finished"
    );
}
