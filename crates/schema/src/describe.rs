//! Human-readable descriptions for parameters, fields, and methods.

use zkmcp_metadata::type_mapper::simple_name;
use zkmcp_metadata::ResolvedSignature;

const TYPE_HINT_PREFIX: &str = "(类型: ";

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Splits `camelCase`, `PascalCase`, and `snake_case` names into words.
fn words(name: &str) -> Vec<String> {
    let mut out = Vec::new();
    for part in name.split(['_', '-']).filter(|p| !p.is_empty()) {
        let mut current = String::new();
        let mut prev_lower = false;
        for ch in part.chars() {
            if ch.is_uppercase() && prev_lower && !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
            current.push(ch);
        }
        if !current.is_empty() {
            out.push(current);
        }
    }
    out
}

/// Friendly label derived from a parameter or field name.
///
/// ```
/// use zkmcp_schema::describe::friendly_label;
///
/// assert_eq!(friendly_label("userId", "java.lang.Long"), "User's ID");
/// assert_eq!(friendly_label("product_name", "java.lang.String"), "Product's Name");
/// assert_eq!(friendly_label("createdAt", "java.util.Date"), "Created At");
/// assert_eq!(friendly_label("keyword", "java.lang.String"), "Keyword");
/// ```
pub fn friendly_label(name: &str, type_name: &str) -> String {
    let words = words(name);
    match words.as_slice() {
        [] => return simple_name(type_name),
        [.., last] if words.len() > 1 && last.eq_ignore_ascii_case("id") => {
            let entity: Vec<_> = words[..words.len() - 1].iter().map(|w| capitalize(w)).collect();
            format!("{}'s ID", entity.join(" "))
        }
        [.., last] if words.len() > 1 && last.eq_ignore_ascii_case("name") => {
            let entity: Vec<_> = words[..words.len() - 1].iter().map(|w| capitalize(w)).collect();
            format!("{}'s Name", entity.join(" "))
        }
        _ => words.iter().map(|w| capitalize(w)).collect::<Vec<_>>().join(" "),
    }
}

/// Removes every `(类型: ...)` hint from a description.
fn strip_type_hints(text: &str) -> String {
    let mut out = text.to_string();
    while let Some(start) = out.find(TYPE_HINT_PREFIX) {
        let end = out[start..]
            .find(')')
            .map_or(out.len(), |offset| start + offset + 1);
        out.replace_range(start..end, "");
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Description of a parameter or field: curated text when present,
/// otherwise a friendly label, always followed by the type hint.
pub fn describe_parameter(name: &str, type_name: &str, curated: Option<&str>) -> String {
    let curated = curated.map(strip_type_hints).filter(|c| !c.is_empty());
    let base = curated.unwrap_or_else(|| friendly_label(name, type_name));
    format!("{base} {TYPE_HINT_PREFIX}{})", type_name.trim())
}

/// Recovers the fully-qualified type from a description's type hint.
///
/// ```
/// use zkmcp_schema::describe::{describe_parameter, type_hint};
///
/// let d = describe_parameter("userId", "java.lang.Long", None);
/// assert_eq!(type_hint(&d), Some("java.lang.Long"));
/// assert_eq!(type_hint("no hint here"), None);
/// ```
pub fn type_hint(description: &str) -> Option<&str> {
    let start = description.rfind(TYPE_HINT_PREFIX)? + TYPE_HINT_PREFIX.len();
    let rest = &description[start..];
    let end = rest.find(')')?;
    let hint = rest[..end].trim();
    (!hint.is_empty()).then_some(hint)
}

/// Method description: the curated text, or a summary of the signature.
pub fn describe_method(sig: &ResolvedSignature) -> String {
    if let Some(text) = sig.description.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        return text.to_string();
    }
    let mut out = format!("Invoke {}.{}", simple_name(&sig.interface), sig.method);
    if let Some(ret) = sig.return_type.as_deref() {
        out.push_str(&format!(". Returns: {}", simple_name(ret)));
    }
    if sig.parameters.is_empty() {
        out.push_str(". Parameters: none");
    } else {
        let params: Vec<_> = sig
            .parameters
            .iter()
            .map(|p| match p.description.as_deref() {
                Some(d) => format!("{} ({}) - {}", p.name, simple_name(&p.type_name), d),
                None => format!("{} ({})", p.name, simple_name(&p.type_name)),
            })
            .collect();
        out.push_str(&format!(". Parameters: {}", params.join("; ")));
    }
    out
}
