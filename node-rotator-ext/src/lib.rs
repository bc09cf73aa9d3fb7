pub use k8s_openapi as openapi;
pub use k8s_openapi::api::core::v1 as corev1;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
pub use k8s_openapi::jiff;

pub use node::NodeExt;
pub use pod::PodExt;
pub use time::TimeExt;

use std::collections::BTreeMap;

mod node;
mod pod;
mod time;

pub trait ObjectMetaExt {
    fn new(name: impl ToString) -> Self;
    fn with_namespace(name: impl ToString, namespace: impl ToString) -> Self;
    fn created(self, ts: impl Into<Option<metav1::Time>>) -> Self;
    fn labels<K, V>(self, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: ToString,
        V: ToString;
    fn annotations<K, V>(self, annotations: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: ToString,
        V: ToString;
}

impl ObjectMetaExt for metav1::ObjectMeta {
    fn new(name: impl ToString) -> Self {
        let name = Some(name.to_string());
        Self { name, ..default() }
    }

    fn with_namespace(name: impl ToString, namespace: impl ToString) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            ..Self::new(name)
        }
    }

    fn created(self, ts: impl Into<Option<metav1::Time>>) -> Self {
        Self {
            creation_timestamp: ts.into(),
            ..self
        }
    }

    fn labels<K, V>(self, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: ToString,
        V: ToString,
    {
        Self {
            labels: Some(string_map(labels)),
            ..self
        }
    }

    fn annotations<K, V>(self, annotations: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: ToString,
        V: ToString,
    {
        Self {
            annotations: Some(string_map(annotations)),
            ..self
        }
    }
}

fn string_map<K, V>(items: impl IntoIterator<Item = (K, V)>) -> BTreeMap<String, String>
where
    K: ToString,
    V: ToString,
{
    items
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub fn default<T: Default>() -> T {
    T::default()
}
