use tokio::time::Instant;

use crate::fake::{Call, FakeCluster};

use super::*;

fn rotator(cluster: FakeCluster, dry_run: bool) -> NodeRotator<FakeCluster> {
    let config = RotatorConfig::new(RotationCriterion::days(60), dry_run);
    NodeRotator::new(cluster, config)
}

fn cordoned(calls: &[Call]) -> Vec<&str> {
    calls
        .iter()
        .filter_map(|call| match call {
            Call::Cordon(node) => Some(node.as_str()),
            _ => None,
        })
        .collect()
}

fn force_drained(calls: &[Call]) -> Vec<&str> {
    calls
        .iter()
        .filter_map(|call| match call {
            Call::ForceDrain(node) => Some(node.as_str()),
            _ => None,
        })
        .collect()
}

fn evicted(calls: &[Call]) -> Vec<String> {
    calls
        .iter()
        .filter_map(|call| match call {
            Call::Evict {
                namespace,
                pod,
                grace,
            } => {
                assert_eq!(*grace, Duration::from_secs(60));
                Some(format!("{namespace}/{pod}"))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn default_config() {
    let live = RotatorConfig::new(RotationCriterion::days(60), false);
    assert_eq!(live.drain_settle, Duration::from_secs(60));
    assert_eq!(live.eviction_grace_period, Duration::from_secs(60));
    assert!(!live.dry_run);

    let dry = RotatorConfig::new(RotationCriterion::days(25), true);
    assert_eq!(dry.drain_settle, Duration::from_secs(5));
    assert!(dry.dry_run);

    let tuned = dry
        .drain_settle(Duration::from_secs(1))
        .eviction_grace_period(Duration::from_secs(30));
    assert_eq!(tuned.drain_settle, Duration::from_secs(1));
    assert_eq!(tuned.eviction_grace_period, Duration::from_secs(30));
}

#[tokio::test]
async fn scan_selects_aged_nodes_in_listing_order() {
    let cluster = FakeCluster::new()
        .with_node("worker-young", 5)
        .with_node("worker-exact", 60)
        .with_node("worker-almost", 59)
        .with_node("worker-old", 90)
        .with_node("worker-older", 61);
    let rotator = rotator(cluster, false);

    let set = rotator.scan().await.unwrap();

    assert_eq!(set.names(), ["worker-exact", "worker-old", "worker-older"]);
    assert_eq!(set.len(), 3);
    assert!(rotator.cluster().mutating_calls().is_empty());
}

#[tokio::test]
async fn scan_at_uses_given_time() {
    let cluster = FakeCluster::new().with_node("worker-1", 30);
    let rotator = rotator(cluster, false);

    let now = rotator.scan().await.unwrap();
    let later = rotator
        .scan_at(Timestamp::now() + SignedDuration::from_hours(31 * 24))
        .await
        .unwrap();

    assert!(now.is_empty());
    assert_eq!(later.names(), ["worker-1"]);
}

#[tokio::test]
async fn scan_of_empty_or_young_cluster_is_empty() {
    let empty = rotator(FakeCluster::new(), false);
    assert!(empty.scan().await.unwrap().is_empty());

    let young = rotator(
        FakeCluster::new()
            .with_node("worker-1", 1)
            .with_node("worker-2", 59),
        false,
    );
    assert!(young.scan().await.unwrap().is_empty());
}

#[tokio::test]
async fn scan_surfaces_cluster_query_error() {
    let rotator = rotator(FakeCluster::new().nodes_unreachable(), false);
    let err = rotator.scan().await.unwrap_err();
    assert!(matches!(err, Error::ClusterQuery(_)));
    assert_eq!(rotator.cluster().calls(), [Call::ListNodes]);
}

#[tokio::test(start_paused = true)]
async fn rotate_cordons_evicts_and_drains_in_order() {
    let cluster = FakeCluster::new()
        .with_node("worker-1", 70)
        .with_pod("default", "web-0", "worker-1")
        .with_pod("default", "other-node", "worker-9");
    let rotator = rotator(cluster, false);
    let set = rotator.scan().await.unwrap();

    let report = rotator.rotate(&set).await.unwrap();

    let mutating = rotator.cluster().mutating_calls();
    assert_eq!(
        mutating,
        [
            Call::Cordon("worker-1".to_string()),
            Call::Evict {
                namespace: "default".to_string(),
                pod: "web-0".to_string(),
                grace: Duration::from_secs(60),
            },
            Call::ForceDrain("worker-1".to_string()),
        ]
    );
    assert_eq!(evicted(&mutating), ["default/web-0"]);

    let node = report.node("worker-1").unwrap();
    assert_eq!(node.outcome, NodeOutcome::Succeeded);
    assert_eq!(node.state, NodeState::Drained);
    assert_eq!(node.evicted, 1);
    assert!(report.is_complete());
    assert!(!report.dry_run());
}

#[tokio::test(start_paused = true)]
async fn eviction_count_sums_every_namespace() {
    let cluster = FakeCluster::new()
        .with_node("worker-1", 70)
        .with_pod("shop", "cart-0", "worker-1")
        .with_pod("shop", "cart-1", "worker-1")
        .with_pod("shop", "checkout-0", "worker-1")
        .with_pod("monitoring", "exporter-0", "worker-1");
    let rotator = rotator(cluster, false);
    let set = rotator.scan().await.unwrap();

    let report = rotator.rotate(&set).await.unwrap();

    let calls = rotator.cluster().calls();
    let listed = calls
        .iter()
        .filter_map(|call| match call {
            Call::ListPods { namespace, node } if node == "worker-1" => Some(namespace.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(listed, ["default", "kube-system", "monitoring", "shop"]);
    assert_eq!(evicted(&calls).len(), 4);
    assert_eq!(report.node("worker-1").unwrap().evicted, 4);
}

#[tokio::test(start_paused = true)]
async fn cordon_failure_does_not_stop_the_batch() {
    let cluster = FakeCluster::new()
        .with_node("worker-x", 80)
        .with_node("worker-y", 75)
        .with_pod("default", "x-pod", "worker-x")
        .with_pod("default", "y-pod", "worker-y")
        .with_stuck_cordon("worker-x");
    let rotator = rotator(cluster, false);
    let set = rotator.scan().await.unwrap();

    let report = rotator.rotate(&set).await.unwrap();

    let x = report.node("worker-x").unwrap();
    assert!(matches!(x.outcome, NodeOutcome::CordonFailed { .. }));
    assert_eq!(x.state, NodeState::Discovered);
    let y = report.node("worker-y").unwrap();
    assert_eq!(y.outcome, NodeOutcome::Succeeded);
    assert_eq!(y.state, NodeState::Drained);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);

    let calls = rotator.cluster().calls();
    assert_eq!(cordoned(&calls), ["worker-x", "worker-y"]);
    assert_eq!(force_drained(&calls), ["worker-y"]);
    assert_eq!(evicted(&calls), ["default/y-pod"]);
}

#[tokio::test(start_paused = true)]
async fn failed_eviction_does_not_block_remaining_pods() {
    let cluster = FakeCluster::new()
        .with_node("worker-1", 70)
        .with_pod("default", "db-0", "worker-1")
        .with_pod("default", "web-0", "worker-1")
        .with_pod("default", "web-1", "worker-1")
        .with_failing_eviction("db-0");
    let rotator = rotator(cluster, false);
    let set = rotator.scan().await.unwrap();

    let report = rotator.rotate(&set).await.unwrap();

    assert_eq!(
        evicted(&rotator.cluster().calls()),
        ["default/db-0", "default/web-0", "default/web-1"]
    );
    let node = report.node("worker-1").unwrap();
    assert_eq!(node.evicted, 2);
    assert_eq!(node.state, NodeState::Drained);
    assert_eq!(
        node.outcome,
        NodeOutcome::PartiallyEvicted {
            failed_pods: vec!["default/db-0".to_string()]
        }
    );
}

#[tokio::test(start_paused = true)]
async fn forced_drain_leftovers_are_reported() {
    let cluster = FakeCluster::new()
        .with_node("worker-1", 70)
        .with_pod("default", "stubborn-0", "worker-1")
        .with_drain_leftover("worker-1", "default/stubborn-0");
    let rotator = rotator(cluster, false);
    let set = rotator.scan().await.unwrap();

    let report = rotator.rotate(&set).await.unwrap();

    assert_eq!(
        report.node("worker-1").unwrap().outcome,
        NodeOutcome::PartiallyEvicted {
            failed_pods: vec!["default/stubborn-0".to_string()]
        }
    );
}

#[tokio::test(start_paused = true)]
async fn namespace_listing_failure_aborts_rotation() {
    let cluster = FakeCluster::new()
        .with_node("worker-1", 70)
        .with_node("worker-2", 70)
        .namespaces_unreachable();
    let rotator = rotator(cluster, false);
    let set = rotator.scan().await.unwrap();

    let err = rotator.rotate(&set).await.unwrap_err();

    assert!(matches!(err, Error::ClusterQuery(_)));
    assert_eq!(cordoned(&rotator.cluster().calls()), ["worker-1"]);
}

#[tokio::test(start_paused = true)]
async fn dry_run_never_mutates_but_reports_and_waits() {
    let cluster = FakeCluster::new()
        .with_node("worker-1", 70)
        .with_node("worker-2", 65)
        .with_pod("default", "web-0", "worker-1")
        .with_pod("default", "web-1", "worker-2")
        .with_stuck_cordon("worker-2");
    let rotator = rotator(cluster, true);
    let set = rotator.scan().await.unwrap();

    let started = Instant::now();
    let report = rotator.rotate(&set).await.unwrap();
    let elapsed = started.elapsed();

    assert!(rotator.cluster().mutating_calls().is_empty());
    assert!(report.dry_run());
    assert_eq!(report.nodes().len(), 2);
    assert!(report.is_complete());
    assert_eq!(report.node("worker-1").unwrap().evicted, 1);
    assert!(elapsed >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn live_run_waits_before_forced_drain() {
    let cluster = FakeCluster::new().with_node("worker-1", 70);
    let rotator = rotator(cluster, false);
    let set = rotator.scan().await.unwrap();

    let started = Instant::now();
    rotator.rotate(&set).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(60));
}
