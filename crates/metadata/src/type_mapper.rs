//! Mapping of RPC type identifiers onto JSON-Schema kinds.
//!
//! Every function here is pure: the result depends only on the type string,
//! so `long`, `Long` and `java.lang.Long` all map to `integer`/`int64`.

use serde_json::{json, Value};

/// Type assumed when a generic argument or element type is missing.
pub const OBJECT_TYPE: &str = "java.lang.Object";

/// JSON-Schema `type` keyword values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonKind {
    /// `string`
    String,
    /// `integer`
    Integer,
    /// `number`
    Number,
    /// `boolean`
    Boolean,
    /// `array`
    Array,
    /// `object`
    Object,
}

impl JsonKind {
    /// Keyword as it appears in a schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonKind::String => "string",
            JsonKind::Integer => "integer",
            JsonKind::Number => "number",
            JsonKind::Boolean => "boolean",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        }
    }
}

/// Scalar types that need no structural introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `boolean` / `Boolean`
    Boolean,
    /// `byte` / `Byte`
    Byte,
    /// `short` / `Short`
    Short,
    /// `int` / `Integer`
    Int,
    /// `long` / `Long`
    Long,
    /// `float` / `Float`
    Float,
    /// `double` / `Double`
    Double,
    /// `char` / `Character`
    Char,
    /// `String` and other char sequences
    String,
    /// Arbitrary precision integer
    BigInteger,
    /// Arbitrary precision decimal
    BigDecimal,
    /// Timestamps, carried as strings on the wire
    DateTime,
    /// Calendar dates, carried as strings on the wire
    Date,
}

impl PrimitiveKind {
    /// JSON kind for this primitive.
    pub fn json_kind(&self) -> JsonKind {
        match self {
            PrimitiveKind::Boolean => JsonKind::Boolean,
            PrimitiveKind::Byte
            | PrimitiveKind::Short
            | PrimitiveKind::Int
            | PrimitiveKind::Long
            | PrimitiveKind::BigInteger => JsonKind::Integer,
            PrimitiveKind::Float | PrimitiveKind::Double | PrimitiveKind::BigDecimal => {
                JsonKind::Number
            }
            PrimitiveKind::Char
            | PrimitiveKind::String
            | PrimitiveKind::DateTime
            | PrimitiveKind::Date => JsonKind::String,
        }
    }

    /// JSON-Schema `format`, if any.
    pub fn format(&self) -> Option<&'static str> {
        match self {
            PrimitiveKind::Int => Some("int32"),
            PrimitiveKind::Long => Some("int64"),
            PrimitiveKind::Float => Some("float"),
            PrimitiveKind::Double => Some("double"),
            PrimitiveKind::DateTime => Some("date-time"),
            PrimitiveKind::Date => Some("date"),
            _ => None,
        }
    }

    /// Example value shown to callers.
    pub fn example(&self) -> Option<Value> {
        match self {
            PrimitiveKind::Boolean => Some(json!(false)),
            PrimitiveKind::Byte
            | PrimitiveKind::Short
            | PrimitiveKind::Int
            | PrimitiveKind::Long
            | PrimitiveKind::BigInteger => Some(json!(0)),
            PrimitiveKind::Float | PrimitiveKind::Double | PrimitiveKind::BigDecimal => {
                Some(json!(0.0))
            }
            PrimitiveKind::String => Some(json!("string_value")),
            PrimitiveKind::Char | PrimitiveKind::DateTime | PrimitiveKind::Date => None,
        }
    }
}

/// Whether a collection keeps duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionFlavor {
    /// Ordered, duplicates kept.
    List,
    /// Duplicates removed, first occurrence order kept.
    Set,
}

/// Structural category of a type identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    /// Scalar value.
    Primitive(PrimitiveKind),
    /// `List<X>`, `Set<X>`, `Collection<X>`.
    Collection {
        /// List or set semantics.
        flavor: CollectionFlavor,
        /// Element type, `java.lang.Object` when undeclared.
        element: String,
    },
    /// `X[]`.
    Array {
        /// Element type.
        element: String,
    },
    /// Any map type; values are forwarded as-is.
    Map {
        /// Declared value type, `java.lang.Object` when undeclared.
        value: String,
    },
    /// `java.lang.Object` or an empty type.
    Any,
    /// Anything else: a structured type known (or not) to a type provider.
    Object(String),
}

impl TypeCategory {
    /// JSON kind for this category.
    pub fn json_kind(&self) -> JsonKind {
        match self {
            TypeCategory::Primitive(p) => p.json_kind(),
            TypeCategory::Collection { .. } | TypeCategory::Array { .. } => JsonKind::Array,
            TypeCategory::Map { .. } | TypeCategory::Any | TypeCategory::Object(_) => {
                JsonKind::Object
            }
        }
    }
}

/// Removes generic arguments: `java.util.List<a.B>` becomes `java.util.List`.
pub fn erase_generics(type_name: &str) -> &str {
    let trimmed = type_name.trim();
    match trimmed.find('<') {
        Some(idx) => trimmed[..idx].trim_end(),
        None => trimmed,
    }
}

/// Top-level generic arguments: `Map<String, List<X>>` yields `["String", "List<X>"]`.
pub fn generic_args(type_name: &str) -> Vec<String> {
    let trimmed = type_name.trim();
    let (Some(open), Some(close)) = (trimmed.find('<'), trimmed.rfind('>')) else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }
    let inner = &trimmed[open + 1..close];
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, ch) in inner.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(inner[start..idx].trim().to_string());
                start = idx + 1;
            }
            _ => {}
        }
    }
    let last = inner[start..].trim();
    if !last.is_empty() {
        args.push(last.to_string());
    }
    args.retain(|a| !a.is_empty() && a != "?");
    args
}

/// Element type of an array or collection, `java.lang.Object` when undeclared.
pub fn element_type(type_name: &str) -> String {
    let trimmed = type_name.trim();
    if let Some(stripped) = trimmed.strip_suffix("[]") {
        return stripped.trim().to_string();
    }
    generic_args(trimmed)
        .into_iter()
        .next()
        .unwrap_or_else(|| OBJECT_TYPE.to_string())
}

/// Unqualified name without generics or array brackets: `a.b.User[]` yields `User`.
pub fn simple_name(type_name: &str) -> String {
    let erased = erase_generics(type_name);
    let mut base = erased;
    while let Some(stripped) = base.strip_suffix("[]") {
        base = stripped.trim_end();
    }
    base.rsplit(['.', '$']).next().unwrap_or(base).to_string()
}

fn primitive_kind(erased: &str) -> Option<PrimitiveKind> {
    let unqualified = erased
        .strip_prefix("java.lang.")
        .or_else(|| erased.strip_prefix("java.math."))
        .unwrap_or(erased);
    let kind = match unqualified {
        "boolean" | "Boolean" => PrimitiveKind::Boolean,
        "byte" | "Byte" => PrimitiveKind::Byte,
        "short" | "Short" => PrimitiveKind::Short,
        "int" | "Integer" => PrimitiveKind::Int,
        "long" | "Long" => PrimitiveKind::Long,
        "float" | "Float" => PrimitiveKind::Float,
        "double" | "Double" => PrimitiveKind::Double,
        "char" | "Character" => PrimitiveKind::Char,
        "String" | "CharSequence" => PrimitiveKind::String,
        "BigInteger" => PrimitiveKind::BigInteger,
        "BigDecimal" => PrimitiveKind::BigDecimal,
        _ => match erased {
            "java.util.Date" | "java.sql.Timestamp" | "java.time.LocalDateTime"
            | "java.time.Instant" | "java.time.OffsetDateTime" | "java.time.ZonedDateTime" => {
                PrimitiveKind::DateTime
            }
            "java.time.LocalDate" | "java.sql.Date" => PrimitiveKind::Date,
            _ => return None,
        },
    };
    Some(kind)
}

fn collection_flavor(simple: &str) -> Option<CollectionFlavor> {
    match simple {
        "List" | "ArrayList" | "LinkedList" | "Collection" | "Iterable" | "Queue" | "Deque" => {
            Some(CollectionFlavor::List)
        }
        "Set" | "HashSet" | "LinkedHashSet" | "TreeSet" | "SortedSet" => {
            Some(CollectionFlavor::Set)
        }
        _ => None,
    }
}

fn is_map(erased: &str, simple: &str) -> bool {
    match simple {
        "Map" | "HashMap" | "LinkedHashMap" | "TreeMap" | "SortedMap" | "NavigableMap"
        | "ConcurrentHashMap" | "ConcurrentMap" | "Hashtable" | "Properties" => true,
        _ => erased.starts_with("java.util.") && simple.ends_with("Map"),
    }
}

/// Categorizes a type identifier.
///
/// ```
/// use zkmcp_metadata::type_mapper::{categorize, CollectionFlavor, TypeCategory};
///
/// assert_eq!(
///     categorize("java.util.Set<java.lang.String>"),
///     TypeCategory::Collection {
///         flavor: CollectionFlavor::Set,
///         element: "java.lang.String".into(),
///     }
/// );
/// assert_eq!(categorize("java.lang.Object"), TypeCategory::Any);
/// ```
pub fn categorize(type_name: &str) -> TypeCategory {
    let trimmed = type_name.trim();
    if trimmed.is_empty() {
        return TypeCategory::Any;
    }
    if trimmed.ends_with("[]") {
        return TypeCategory::Array {
            element: element_type(trimmed),
        };
    }
    let erased = erase_generics(trimmed);
    if let Some(kind) = primitive_kind(erased) {
        return TypeCategory::Primitive(kind);
    }
    if matches!(erased, "java.lang.Object" | "Object") {
        return TypeCategory::Any;
    }
    let simple = simple_name(erased);
    if let Some(flavor) = collection_flavor(&simple) {
        return TypeCategory::Collection {
            flavor,
            element: element_type(trimmed),
        };
    }
    if is_map(erased, &simple) {
        let value = generic_args(trimmed)
            .into_iter()
            .nth(1)
            .unwrap_or_else(|| OBJECT_TYPE.to_string());
        return TypeCategory::Map { value };
    }
    TypeCategory::Object(erased.to_string())
}

/// JSON kind of a type identifier.
pub fn json_kind(type_name: &str) -> JsonKind {
    categorize(type_name).json_kind()
}

/// JSON-Schema `format` of a type identifier, if any.
pub fn format_for(type_name: &str) -> Option<&'static str> {
    match categorize(type_name) {
        TypeCategory::Primitive(kind) => kind.format(),
        _ => None,
    }
}

/// Example value for primitive leaf types only.
pub fn example_for(type_name: &str) -> Option<Value> {
    match categorize(type_name) {
        TypeCategory::Primitive(kind) => kind.example(),
        _ => None,
    }
}

/// Whether the type is a structured object that may have introspectable fields.
pub fn is_structured(type_name: &str) -> bool {
    matches!(categorize(type_name), TypeCategory::Object(_))
}
