use proptest::prelude::*;
use zkmcp_discovery::{
    event_from_path, ProviderEvent, ProviderInfo, ServiceCatalog, ServiceKey, Transition,
};

fn key() -> ServiceKey {
    ServiceKey::new("com.example.UserService").with_version("1.0.0")
}

#[test]
fn replays_registry_paths_into_catalog() {
    let catalog = ServiceCatalog::new();
    let node = urlencoding::encode(
        "dubbo://10.0.0.1:20880/com.example.UserService?version=1.0.0&methods=getUserById",
    )
    .into_owned();
    let path = format!("/dubbo/com.example.UserService/providers/{node}");

    let add = event_from_path(&path, true).unwrap();
    assert_eq!(catalog.apply(&add), Transition::WentOnline);

    let remove = event_from_path(&path, false).unwrap();
    assert_eq!(catalog.apply(&remove), Transition::WentOffline);

    let d = catalog.get(&key()).unwrap();
    assert_eq!(d.online_count(), 0);
    assert!(d.methods.contains("getUserById"));
}

proptest! {
    // Online count always equals the number of distinct addresses added and
    // not yet removed, however events are ordered or repeated.
    #[test]
    fn online_count_tracks_distinct_live_addresses(
        ops in proptest::collection::vec((any::<bool>(), 0u8..5), 0..40)
    ) {
        let catalog = ServiceCatalog::new();
        let mut live = std::collections::BTreeSet::new();
        for (add, host) in ops {
            let info = ProviderInfo::new(key(), format!("10.0.0.{host}:20880"));
            if add {
                live.insert(host);
                catalog.apply(&ProviderEvent::Added(info));
            } else {
                live.remove(&host);
                catalog.apply(&ProviderEvent::Removed(info));
            }
            prop_assert_eq!(catalog.online_count(&key()), live.len());
        }
    }
}
