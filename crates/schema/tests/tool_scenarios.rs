use serde_json::{json, Map, Value};
use std::sync::Arc;

use zkmcp_metadata::{
    EntityTypes, HeuristicTier, SignatureResolver, SignatureSource, TypeDescriptorProvider,
};
use zkmcp_schema::{ArgValue, ParameterConverter, SchemaSynthesizer};
use zkmcp_test_utils::{sample_metadata, CATEGORY_SERVICE, ORDER_SERVICE, USER_SERVICE};

fn heuristic_only() -> SignatureResolver {
    SignatureResolver::builder()
        .heuristics(HeuristicTier::new(EntityTypes::new()))
        .build()
}

fn sample_resolver() -> (SignatureResolver, Arc<dyn TypeDescriptorProvider>) {
    let sample = sample_metadata();
    let types: Arc<dyn TypeDescriptorProvider> = sample.types.clone();
    let resolver = SignatureResolver::builder()
        .introspection(Arc::clone(&types))
        .persisted(sample.store.clone())
        .heuristics(HeuristicTier::new(sample.entities).with_types(Arc::clone(&types)))
        .build();
    (resolver, types)
}

fn object(v: Value) -> Map<String, Value> {
    v.as_object().cloned().expect("object literal")
}

#[test]
fn get_by_id_without_metadata_yields_int64_id_schema() {
    let sig = heuristic_only()
        .resolve("com.acme.UserService", "getUserById")
        .unwrap();
    assert_eq!(sig.source, SignatureSource::Heuristic);

    let schema = SchemaSynthesizer::new(None).build_input_schema(&sig);
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["properties"]["userId"]["type"], "integer");
    assert_eq!(schema["properties"]["userId"]["format"], "int64");
    assert_eq!(schema["required"], json!(["userId"]));
}

#[test]
fn list_all_yields_empty_schema() {
    let sig = heuristic_only()
        .resolve("com.acme.UserService", "getAllUsers")
        .unwrap();
    let schema = SchemaSynthesizer::new(None).build_input_schema(&sig);
    assert_eq!(schema["properties"], json!({}));
    assert!(schema.get("required").is_none());
}

#[test]
fn numeric_string_id_converts_to_long() {
    let sig = heuristic_only()
        .resolve("com.acme.UserService", "getUserById")
        .unwrap();
    let converted = ParameterConverter::new(None).convert(&object(json!({"userId": "42"})), &sig);
    assert_eq!(converted.values, vec![ArgValue::Long(42)]);
    assert_eq!(converted.json_values(), vec![json!(42)]);
    assert_eq!(converted.types, vec!["java.lang.Long"]);
}

#[test]
fn curated_metadata_shapes_the_tool() {
    let (resolver, types) = sample_resolver();
    let sig = resolver.resolve(USER_SERVICE, "getUserById").unwrap();
    assert_eq!(sig.source, SignatureSource::PersistedMetadata);

    let tool = SchemaSynthesizer::new(Some(types)).build_tool(&sig);
    assert_eq!(tool.name, format!("{USER_SERVICE}.getUserById"));
    assert_eq!(tool.description, "Look up one user by primary key");
    assert_eq!(
        tool.input_schema["properties"]["userId"]["description"],
        "Primary key of the user (类型: java.lang.Long)"
    );
}

#[test]
fn introspected_optional_parameter_stays_optional() {
    let (resolver, types) = sample_resolver();
    let sig = resolver.resolve(USER_SERVICE, "findUsers").unwrap();
    assert_eq!(sig.source, SignatureSource::Introspection);
    // curated `limit` matches the unnamed second parameter by position
    let schema = SchemaSynthesizer::new(Some(types)).build_input_schema(&sig);
    assert_eq!(schema["required"], json!(["keyword"]));
}

#[test]
fn nested_order_schema_and_conversion() {
    let (resolver, types) = sample_resolver();
    let sig = resolver.resolve(ORDER_SERVICE, "createOrder").unwrap();
    assert_eq!(sig.source, SignatureSource::Introspection);

    let schema = SchemaSynthesizer::new(Some(Arc::clone(&types))).build_input_schema(&sig);
    let order = &schema["properties"]["order"];
    assert_eq!(order["type"], "object");
    assert_eq!(order["properties"]["orderItems"]["type"], "array");
    assert_eq!(
        order["properties"]["orderItems"]["items"]["properties"]["quantity"]["format"],
        "int32"
    );
    assert_eq!(order["properties"]["tags"]["items"]["type"], "string");
    // inherited from BaseEntity
    assert_eq!(order["properties"]["id"]["format"], "int64");

    let args = object(json!({
        "order": {
            "userId": "7",
            "orderItems": [{"productId": 1, "quantity": "3", "price": "9.90"}],
            "tags": ["gift", "gift", "rush"],
            "attributes": {"channel": "web"}
        }
    }));
    let converted = ParameterConverter::new(Some(types)).convert(&args, &sig);
    assert!(converted.issues.is_empty(), "{:?}", converted.issues);
    let ArgValue::Object { fields, .. } = &converted.values[0] else {
        panic!("expected object, got {:?}", converted.values[0]);
    };
    let field = |name: &str| {
        fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .unwrap()
    };
    assert_eq!(field("userId"), ArgValue::Long(7));
    assert_eq!(
        field("tags"),
        ArgValue::Set(vec![ArgValue::Str("gift".into()), ArgValue::Str("rush".into())])
    );
    let ArgValue::List(items) = field("orderItems") else {
        panic!("expected list");
    };
    assert_eq!(
        items[0].to_json(),
        json!({"productId": 1, "quantity": 3, "price": 9.9})
    );
}

#[test]
fn self_referential_type_terminates() {
    let (resolver, types) = sample_resolver();
    let sig = resolver.resolve(CATEGORY_SERVICE, "saveCategory").unwrap();
    let schema = SchemaSynthesizer::new(Some(Arc::clone(&types))).build_input_schema(&sig);
    let category = &schema["properties"]["category"];
    assert!(category["properties"]["parent"].get("properties").is_none());
    assert!(category["properties"]["children"]["items"]
        .get("properties")
        .is_none());

    let args = object(json!({
        "category": {"name": "root", "children": [{"name": "leaf", "children": []}]}
    }));
    let converted = ParameterConverter::new(Some(types)).convert(&args, &sig);
    assert_eq!(
        converted.values[0].to_json(),
        json!({"name": "root", "children": [{"name": "leaf", "children": []}]})
    );
}

#[test]
fn argument_order_follows_declaration() {
    let (resolver, types) = sample_resolver();
    let sig = resolver.resolve(ORDER_SERVICE, "cancelOrder").unwrap();
    let converted = ParameterConverter::new(Some(types))
        .convert(&object(json!({"reason": "dup", "orderId": 5})), &sig);
    assert_eq!(
        converted.values,
        vec![ArgValue::Long(5), ArgValue::Str("dup".into())]
    );
}
