use proptest::prelude::*;
use zkmcp_metadata::type_mapper::{element_type, format_for, json_kind, JsonKind};

// (primitive, boxed simple name)
const SCALARS: &[(&str, &str)] = &[
    ("boolean", "Boolean"),
    ("byte", "Byte"),
    ("short", "Short"),
    ("int", "Integer"),
    ("long", "Long"),
    ("float", "Float"),
    ("double", "Double"),
    ("char", "Character"),
];

fn scalar() -> impl Strategy<Value = (&'static str, &'static str)> {
    proptest::sample::select(SCALARS)
}

const CONTAINERS: &[&str] = &[
    "java.util.List",
    "java.util.ArrayList",
    "java.util.Set",
    "java.util.HashSet",
    "java.util.Collection",
];

fn container() -> impl Strategy<Value = &'static str> {
    proptest::sample::select(CONTAINERS)
}

proptest! {
    #[test]
    fn every_spelling_of_a_scalar_maps_alike((primitive, boxed) in scalar()) {
        let qualified = format!("java.lang.{boxed}");
        for name in [boxed, qualified.as_str()] {
            prop_assert_eq!(json_kind(name), json_kind(primitive));
            prop_assert_eq!(format_for(name), format_for(primitive));
        }
    }

    #[test]
    fn containers_are_arrays_of_their_element((_, boxed) in scalar(), outer in container()) {
        let element = format!("java.lang.{boxed}");
        for name in [format!("{outer}<{element}>"), format!("{element}[]")] {
            prop_assert_eq!(json_kind(&name), JsonKind::Array);
            prop_assert_eq!(element_type(&name), element.clone());
        }
    }

    #[test]
    fn formats_only_attach_to_scalars(name in "\\PC{0,40}") {
        if format_for(&name).is_some() {
            prop_assert!(matches!(
                json_kind(&name),
                JsonKind::Integer | JsonKind::Number | JsonKind::String
            ));
        }
    }
}
