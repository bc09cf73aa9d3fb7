use super::*;

/// Identifiers the managed provider needs, resolved once per run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
    cluster_id: String,
    compartment_id: String,
}

impl ProviderConfig {
    pub fn new(cluster_id: impl ToString, compartment_id: impl ToString) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            compartment_id: compartment_id.to_string(),
        }
    }

    /// Explicit identifiers win. A missing compartment falls back to the
    /// annotation on the first node of the rotation set.
    pub fn resolve(
        cluster_id: Option<String>,
        compartment_id: Option<String>,
        set: &RotationSet,
    ) -> Result<Self, ProviderError> {
        let compartment_id = explicit(compartment_id)
            .or_else(|| inferred_compartment(set))
            .ok_or_else(|| ProviderError::configuration("provider 'compartment_id' is missing"))?;
        let cluster_id = explicit(cluster_id)
            .ok_or_else(|| ProviderError::configuration("provider 'cluster_id' is missing"))?;

        tracing::info!(compartment = %compartment_id, cluster = %cluster_id, "Provider configuration");
        Ok(Self {
            cluster_id,
            compartment_id,
        })
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    pub fn compartment_id(&self) -> &str {
        &self.compartment_id
    }
}

fn explicit(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn inferred_compartment(set: &RotationSet) -> Option<String> {
    let node = set.first()?;
    let compartment = node
        .annotation(COMPARTMENT_ANNOTATION)
        .filter(|compartment| !compartment.is_empty())?;
    tracing::debug!(node = node.name(), compartment, "Inferred compartment from node annotations");
    Some(compartment.to_string())
}
