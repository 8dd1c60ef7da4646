//! Name-pattern guesses for methods with no other metadata.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use crate::introspect::TypeDescriptorProvider;
use crate::resolve::ResolutionTier;
use crate::type_mapper::OBJECT_TYPE;
use crate::types::{ParameterDescriptor, ResolvedSignature, SignatureSource};

const ID_TYPE: &str = "java.lang.Long";

static LIST_ALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:getAll|list|queryAll)").expect("valid regex"));
static GET_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^get(\w*?)By\w*$").expect("valid regex"));
static MUTATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:create|add|update)(\w*)$").expect("valid regex"));
static DELETE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:delete|remove)(\w*?)(?:By\w+)?$").expect("valid regex"));

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn id_parameter(entity: &str) -> ParameterDescriptor {
    let name = if entity.is_empty() {
        "id".to_string()
    } else {
        format!("{}Id", lower_first(entity))
    };
    ParameterDescriptor::new(name, ID_TYPE, 0)
}

/// Behaviour switches for the heuristic tier.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicOptions {
    /// Unmatched method names resolve to zero parameters instead of a miss.
    pub unmatched_as_no_args: bool,
}

impl Default for HeuristicOptions {
    fn default() -> Self {
        Self {
            unmatched_as_no_args: true,
        }
    }
}

/// Lowercase entity name to concrete type, e.g. `user` to `com.example.model.User`.
#[derive(Debug, Clone, Default)]
pub struct EntityTypes {
    map: HashMap<String, String>,
}

impl EntityTypes {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity type.
    pub fn insert(&mut self, entity: &str, type_name: impl Into<String>) {
        self.map.insert(entity.to_lowercase(), type_name.into());
    }

    /// Registered type for an entity, case-insensitively.
    pub fn get(&self, entity: &str) -> Option<&str> {
        self.map.get(&entity.to_lowercase()).map(String::as_str)
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no entities are registered.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for EntityTypes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut types = EntityTypes::new();
        for (k, v) in iter {
            types.insert(k.as_ref(), v);
        }
        types
    }
}

/// Candidate model packages for an interface: `a.b.service.UserService`
/// suggests `a.b.model`, `a.b.api.UserApi` suggests `a.b.model`, anything
/// else suggests `<package>.model`.
fn model_packages(interface: &str) -> Vec<String> {
    let Some((package, _)) = interface.rsplit_once('.') else {
        return Vec::new();
    };
    let mut candidates = Vec::new();
    for suffix in [".service", ".api"] {
        if let Some(base) = package.strip_suffix(suffix) {
            candidates.push(format!("{base}.model"));
        }
    }
    candidates.push(format!("{package}.model"));
    candidates.dedup();
    candidates
}

/// Third resolution tier: guesses arity and one parameter from the method name.
pub struct HeuristicTier {
    entities: EntityTypes,
    types: Option<Arc<dyn TypeDescriptorProvider>>,
    options: HeuristicOptions,
}

impl HeuristicTier {
    /// Creates a tier with the given entity registry.
    pub fn new(entities: EntityTypes) -> Self {
        Self {
            entities,
            types: None,
            options: HeuristicOptions::default(),
        }
    }

    /// Lets entity types be inferred from registered model types.
    pub fn with_types(mut self, types: Arc<dyn TypeDescriptorProvider>) -> Self {
        self.types = Some(types);
        self
    }

    /// Overrides the default options.
    pub fn with_options(mut self, options: HeuristicOptions) -> Self {
        self.options = options;
        self
    }

    fn entity_type(&self, interface: &str, entity: &str) -> String {
        if entity.is_empty() {
            return OBJECT_TYPE.to_string();
        }
        if let Some(found) = self.entities.get(entity) {
            return found.to_string();
        }
        if let Some(types) = &self.types {
            for package in model_packages(interface) {
                let candidate = format!("{package}.{entity}");
                if types.load_type(&candidate).is_some() {
                    return candidate;
                }
            }
        }
        OBJECT_TYPE.to_string()
    }

    /// Guessed parameters for a method name, or `None` when nothing matches
    /// and unmatched names are configured as misses.
    pub fn guess(&self, interface: &str, method: &str) -> Option<Vec<ParameterDescriptor>> {
        if LIST_ALL.is_match(method) {
            return Some(Vec::new());
        }
        if let Some(caps) = GET_BY.captures(method) {
            let entity = caps.get(1).map_or("", |m| m.as_str());
            return Some(vec![id_parameter(entity)]);
        }
        if let Some(caps) = MUTATE.captures(method) {
            let entity = caps.get(1).map_or("", |m| m.as_str());
            let name = if entity.is_empty() {
                "entity".to_string()
            } else {
                lower_first(entity)
            };
            let type_name = self.entity_type(interface, entity);
            return Some(vec![ParameterDescriptor::new(name, type_name, 0)]);
        }
        if let Some(caps) = DELETE.captures(method) {
            let entity = caps.get(1).map_or("", |m| m.as_str());
            return Some(vec![id_parameter(entity)]);
        }
        self.options.unmatched_as_no_args.then(Vec::new)
    }
}

impl ResolutionTier for HeuristicTier {
    fn source(&self) -> SignatureSource {
        SignatureSource::Heuristic
    }

    fn try_resolve(&self, interface: &str, method: &str) -> Option<ResolvedSignature> {
        let parameters = self.guess(interface, method)?;
        Some(ResolvedSignature::new(
            interface,
            method,
            parameters,
            SignatureSource::Heuristic,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::TypeRegistry;
    use crate::types::TypeDescriptor;

    fn tier() -> HeuristicTier {
        HeuristicTier::new([("order", "com.example.model.Order")].into_iter().collect())
    }

    fn names(params: &[ParameterDescriptor]) -> Vec<(&str, &str)> {
        params
            .iter()
            .map(|p| (p.name.as_str(), p.type_name.as_str()))
            .collect()
    }

    #[test]
    fn list_patterns_take_no_arguments() {
        for m in ["getAllUsers", "listOrders", "queryAllProducts"] {
            assert_eq!(tier().guess("a.UserService", m), Some(vec![]), "{m}");
        }
    }

    #[test]
    fn get_by_yields_entity_id() {
        let params = tier().guess("a.UserService", "getUserById").unwrap();
        assert_eq!(names(&params), vec![("userId", ID_TYPE)]);
        let params = tier().guess("a.UserService", "getByName").unwrap();
        assert_eq!(names(&params), vec![("id", ID_TYPE)]);
        let params = tier().guess("a.UserService", "getUserBy").unwrap();
        assert_eq!(names(&params), vec![("userId", ID_TYPE)]);
    }

    #[test]
    fn mutations_use_entity_registry() {
        let params = tier().guess("a.OrderService", "createOrder").unwrap();
        assert_eq!(names(&params), vec![("order", "com.example.model.Order")]);
        let params = tier().guess("a.OrderService", "updateInvoice").unwrap();
        assert_eq!(names(&params), vec![("invoice", OBJECT_TYPE)]);
        let params = tier().guess("a.OrderService", "add").unwrap();
        assert_eq!(names(&params), vec![("entity", OBJECT_TYPE)]);
    }

    #[test]
    fn mutation_type_inferred_from_model_package() {
        let registry = Arc::new(TypeRegistry::new());
        registry.register_type(TypeDescriptor::new("com.shop.model.Cart", vec![]));
        let tier = HeuristicTier::new(EntityTypes::new()).with_types(registry);
        let params = tier.guess("com.shop.service.CartService", "addCart").unwrap();
        assert_eq!(params[0].type_name, "com.shop.model.Cart");
    }

    #[test]
    fn deletes_take_an_id() {
        let params = tier().guess("a.S", "deleteUser").unwrap();
        assert_eq!(names(&params), vec![("userId", ID_TYPE)]);
        let params = tier().guess("a.S", "removeOrderById").unwrap();
        assert_eq!(names(&params), vec![("orderId", ID_TYPE)]);
        let params = tier().guess("a.S", "remove").unwrap();
        assert_eq!(names(&params), vec![("id", ID_TYPE)]);
    }

    #[test]
    fn unmatched_names_are_configurable() {
        assert_eq!(tier().guess("a.S", "ping"), Some(vec![]));
        let strict = tier().with_options(HeuristicOptions {
            unmatched_as_no_args: false,
        });
        assert_eq!(strict.guess("a.S", "ping"), None);
    }

    #[test]
    fn model_package_candidates() {
        assert_eq!(
            model_packages("com.x.service.UserService"),
            vec!["com.x.model", "com.x.service.model"]
        );
        assert_eq!(model_packages("com.x.UserApi"), vec!["com.x.model"]);
        assert!(model_packages("Bare").is_empty());
    }
}
