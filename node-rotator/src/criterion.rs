use super::*;

/// A rule deciding whether a single node is due for rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationCriterion {
    /// Node has been up for at least this many whole days.
    MinimumAge { days: i64 },
}

impl RotationCriterion {
    pub fn days(days: u32) -> Self {
        Self::MinimumAge {
            days: i64::from(days),
        }
    }

    pub fn is_satisfied_by(&self, node: &RotatableNode, now: Timestamp) -> bool {
        match self {
            Self::MinimumAge { days } => whole_days(node.age(now)) >= *days,
        }
    }
}

impl fmt::Display for RotationCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinimumAge { days } => write!(f, "up for at least {days} days"),
        }
    }
}

/// All criteria must hold for a node to be eligible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RotationPolicy {
    criteria: Vec<RotationCriterion>,
}

impl RotationPolicy {
    pub fn new(criterion: RotationCriterion) -> Self {
        let criteria = vec![criterion];
        Self { criteria }
    }

    pub fn and(mut self, criterion: RotationCriterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn criteria(&self) -> &[RotationCriterion] {
        &self.criteria
    }

    pub fn is_eligible(&self, node: &RotatableNode, now: Timestamp) -> bool {
        self.criteria
            .iter()
            .all(|criterion| criterion.is_satisfied_by(node, now))
    }
}

/// Elapsed whole days, rounded down.
fn whole_days(age: SignedDuration) -> i64 {
    age.as_hours().div_euclid(24)
}

impl From<RotationCriterion> for RotationPolicy {
    fn from(criterion: RotationCriterion) -> Self {
        Self::new(criterion)
    }
}
