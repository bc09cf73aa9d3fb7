use k8s_openapi::jiff::SignedDuration;
use k8s_openapi::jiff::Timestamp;

use super::*;

pub trait TimeExt {
    fn now() -> metav1::Time;
    fn days_ago(days: i64) -> metav1::Time;
}

impl TimeExt for metav1::Time {
    /// Create a metav1::Time set to the current UTC time.
    ///
    /// # Examples
    ///
    /// ```
    /// # use node_rotator_ext::{metav1, TimeExt as _};
    /// let now = metav1::Time::now();
    /// ```
    fn now() -> metav1::Time {
        Self(Timestamp::now())
    }

    /// Create a metav1::Time set `days` whole days before the current UTC time.
    fn days_ago(days: i64) -> metav1::Time {
        Self(Timestamp::now() - SignedDuration::from_hours(days * 24))
    }
}
