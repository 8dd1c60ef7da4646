//! Resolution across all three tiers over one catalog document.

use std::sync::Arc;

use zkmcp_metadata::{
    HeuristicOptions, HeuristicTier, MemMetadataStore, MetadataCatalog, MethodDescriptor,
    ParameterDescriptor, SignatureResolver, SignatureSource, TypeRegistry,
};

const CATALOG: &str = r#"{
  "services": [
    {"interface": "com.shop.service.AccountService",
     "methods": [
       {"name": "getAccountById", "description": "Fetch one account",
        "parameters": [{"name": "accountId", "type": "java.lang.Long", "order": 0}]},
       {"name": "transfer",
        "parameters": [
          {"name": "amount", "type": "java.math.BigDecimal", "order": 1, "description": "Amount"},
          {"name": "from", "type": "java.lang.Long", "order": 0, "description": "Source account"}
        ]}
     ]}
  ],
  "types": [
    {"name": "com.shop.model.Account",
     "fields": [{"name": "id", "type": "java.lang.Long"}, {"name": "owner", "type": "java.lang.String"}]}
  ],
  "interfaces": [
    {"name": "com.shop.service.AccountService",
     "methods": [
       {"name": "transfer", "parameters": [{"type": "java.lang.Long"}, {"type": "java.math.BigDecimal"}]},
       {"name": "ping", "parameters": []}
     ]}
  ]
}"#;

const IFACE: &str = "com.shop.service.AccountService";

struct Fixture {
    store: Arc<MemMetadataStore>,
    resolver: SignatureResolver,
}

fn fixture(options: HeuristicOptions) -> Fixture {
    let catalog = MetadataCatalog::from_json(CATALOG).unwrap();
    let store = Arc::new(MemMetadataStore::new());
    let types = Arc::new(TypeRegistry::new());
    catalog.load_into(&store, &types);
    let resolver = SignatureResolver::builder()
        .heuristics(
            HeuristicTier::new(catalog.entity_types())
                .with_types(types.clone())
                .with_options(options),
        )
        .persisted(store.clone())
        .introspection(types)
        .build();
    Fixture { store, resolver }
}

#[test]
fn each_tier_answers_what_it_knows() {
    let f = fixture(HeuristicOptions::default());

    let transfer = f.resolver.resolve(IFACE, "transfer").unwrap();
    assert_eq!(transfer.source, SignatureSource::Introspection);
    // unnamed introspected parameters take curated descriptions by position
    let names: Vec<_> = transfer.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["param0", "param1"]);
    assert_eq!(
        transfer.parameters[0].description.as_deref(),
        Some("Source account")
    );
    assert_eq!(transfer.parameters[1].type_name, "java.math.BigDecimal");

    let ping = f.resolver.resolve(IFACE, "ping").unwrap();
    assert_eq!(ping.source, SignatureSource::Introspection);
    assert!(ping.parameters.is_empty());

    let get = f.resolver.resolve(IFACE, "getAccountById").unwrap();
    assert_eq!(get.source, SignatureSource::PersistedMetadata);
    assert_eq!(get.description.as_deref(), Some("Fetch one account"));

    let update = f.resolver.resolve(IFACE, "updateAccount").unwrap();
    assert_eq!(update.source, SignatureSource::Heuristic);
    assert_eq!(update.parameters[0].name, "account");
    assert_eq!(update.parameters[0].type_name, "com.shop.model.Account");
}

#[test]
fn repeated_resolution_shares_one_entry() {
    let f = fixture(HeuristicOptions::default());
    let first = f.resolver.resolve(IFACE, "getAccountById").unwrap();
    let second = f.resolver.resolve(IFACE, "getAccountById").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(f.resolver.cache_len(), 1);
}

#[test]
fn misses_are_not_cached_when_fallback_is_off() {
    let f = fixture(HeuristicOptions {
        unmatched_as_no_args: false,
    });
    assert!(f.resolver.resolve(IFACE, "recalculate").is_none());
    assert_eq!(f.resolver.cache_len(), 0);

    let id = f.store.upsert_service(IFACE, None, None);
    f.store.upsert_method(
        id,
        MethodDescriptor {
            name: "recalculate".into(),
            return_type: None,
            description: None,
        },
        vec![ParameterDescriptor::new("year", "int", 0)],
    );
    let sig = f.resolver.resolve(IFACE, "recalculate").unwrap();
    assert_eq!(sig.source, SignatureSource::PersistedMetadata);
}

#[test]
fn invalidation_picks_up_changed_metadata() {
    let f = fixture(HeuristicOptions::default());
    let before = f.resolver.resolve(IFACE, "getAccountById").unwrap();
    assert_eq!(before.parameters.len(), 1);

    let id = f.store.upsert_service(IFACE, None, None);
    f.store.upsert_method(
        id,
        MethodDescriptor {
            name: "getAccountById".into(),
            return_type: None,
            description: Some("Fetch one account".into()),
        },
        vec![
            ParameterDescriptor::new("accountId", "java.lang.Long", 0),
            ParameterDescriptor::new("withHistory", "boolean", 1),
        ],
    );
    // cached until invalidated
    assert_eq!(
        f.resolver.resolve(IFACE, "getAccountById").unwrap().parameters.len(),
        1
    );

    assert!(f.resolver.invalidate(IFACE, "getAccountById"));
    let after = f.resolver.resolve(IFACE, "getAccountById").unwrap();
    assert_eq!(after.parameters.len(), 2);
    assert!(!Arc::ptr_eq(&before, &after));

    f.resolver.resolve(IFACE, "ping").unwrap();
    assert_eq!(f.resolver.invalidate_interface(IFACE), 2);
    assert_eq!(f.resolver.cache_len(), 0);
}
