use tracing::Instrument as _;

use super::*;

#[derive(Debug)]
pub enum RunSummary {
    /// No node met the policy; no provider was built or called.
    NothingToRotate,
    Rotated(RotationReport),
}

/// Steps of a run, reported to the observer as each one starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Scanning,
    Provisioning,
    Rotating,
    Restoring,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Scanning => "Scanning nodes",
            Self::Provisioning => "Provisioning additional nodes",
            Self::Rotating => "Rotating older nodes",
            Self::Restoring => "Restoring original cluster capacity",
        };
        f.write_str(text)
    }
}

type Observer = Box<dyn Fn(Phase) + Send + Sync>;

/// Sequences `scan → expand → rotate → shrink` for one cluster.
pub struct Rotation<C> {
    cluster: String,
    rotator: NodeRotator<C>,
    observer: Option<Observer>,
}

impl<C: ClusterApi> Rotation<C> {
    pub fn new(cluster: impl ToString, rotator: NodeRotator<C>) -> Self {
        let cluster = cluster.to_string();
        Self {
            cluster,
            rotator,
            observer: None,
        }
    }

    /// Calls `observer` whenever a phase starts, e.g. to drive a progress display.
    pub fn on_phase(self, observer: impl Fn(Phase) + Send + Sync + 'static) -> Self {
        Self {
            observer: Some(Box::new(observer)),
            ..self
        }
    }

    pub fn rotator(&self) -> &NodeRotator<C> {
        &self.rotator
    }

    /// Runs one rotation. `provider` is called with the scanned set only when it
    /// is not empty; configuration errors it returns end the run before any
    /// provider call is made.
    pub async fn run<F>(&self, provider: F) -> Result<RunSummary>
    where
        F: FnOnce(&RotationSet) -> Result<Box<dyn CapacityProvider>, ProviderError>,
    {
        let span = tracing::info_span!(
            "rotation",
            cluster = %self.cluster,
            dry_run = self.rotator.config().dry_run
        );
        self.run_phases(provider).instrument(span).await
    }

    async fn run_phases<F>(&self, provider: F) -> Result<RunSummary>
    where
        F: FnOnce(&RotationSet) -> Result<Box<dyn CapacityProvider>, ProviderError>,
    {
        self.enter(Phase::Scanning);
        let set = self.rotator.scan().await?;
        if set.is_empty() {
            tracing::info!("There are no eligible nodes to rotate");
            return Ok(RunSummary::NothingToRotate);
        }

        let count = set.len();
        let mut provider = provider(&set)?;

        self.enter(Phase::Provisioning);
        tracing::info!(provider = provider.name(), count, "Expanding capacity");
        provider.expand_for_rotation(count).await?;

        self.enter(Phase::Rotating);
        let report = self.rotator.rotate(&set).await?;
        for node in report.nodes() {
            if node.state != NodeState::Drained {
                tracing::warn!(node = %node.node, state = %node.state, "Keeping undrained node out of the scale down");
                provider.keep_node(&node.node);
            }
        }

        self.enter(Phase::Restoring);
        tracing::info!(provider = provider.name(), count, "Shrinking capacity");
        provider.shrink_after_rotation(count).await?;

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Rotation done"
        );
        Ok(RunSummary::Rotated(report))
    }

    fn enter(&self, phase: Phase) {
        tracing::info!("{phase}");
        if let Some(observer) = &self.observer {
            observer(phase);
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for Rotation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rotation")
            .field("cluster", &self.cluster)
            .field("rotator", &self.rotator)
            .field("observer", &self.observer.as_ref().map(|_| "<observer>"))
            .finish()
    }
}
