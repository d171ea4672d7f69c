use indexmap::IndexSet;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static RE_INT_TYPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^i\d+$").unwrap());
static RE_ARRAY_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\d+ x (.*)\]$").unwrap());

/// Marker for an operand whose type the front end cannot know.
pub const UNKNOWN_TYPE: &str = "?";

const FLOAT_TYPES: &[&str] = &["float", "double", "x86_fp80", "half", "fp128"];

pub fn is_number_type(ty: &str) -> bool {
    RE_INT_TYPE.is_match(ty) || FLOAT_TYPES.contains(&ty)
}

pub fn is_void_type(ty: &str) -> bool {
    ty == "void"
}

pub fn is_pointer_type(ty: &str) -> bool {
    ty.ends_with('*')
}

pub fn is_struct_type(ty: &str) -> bool {
    if is_pointer_type(ty) {
        return false;
    }
    if RE_ARRAY_TYPE.is_match(ty) {
        return true;
    }
    if ty.starts_with('{') || (ty.starts_with("<{") && ty.ends_with("}>")) {
        return true;
    }
    ty.starts_with('%')
}

/// `ret (args)` with an optional trailing run of `*`.
pub fn is_function_type(ty: &str) -> bool {
    let Some(split) = ty.find(" (") else {
        return false;
    };
    let signature = remove_all_pointing(&ty[split + 1..]);
    signature.starts_with('(') && signature.ends_with(')') && is_type(&ty[..split])
}

pub fn is_type(ty: &str) -> bool {
    is_void_type(ty)
        || is_number_type(ty)
        || is_struct_type(ty)
        || is_pointer_type(ty)
        || is_function_type(ty)
}

pub fn remove_pointing(ty: &str) -> String {
    ty.strip_suffix('*').unwrap_or(ty).to_string()
}

pub fn remove_all_pointing(ty: &str) -> &str {
    ty.trim_end_matches('*')
}

pub fn add_pointing(ty: &str) -> String {
    format!("{}*", ty)
}

pub fn pointing_levels(ty: &str) -> usize {
    ty.len() - remove_all_pointing(ty).len()
}

/// Type names seen while parsing that the analyzer still has to resolve.
///
/// Insertion order is kept so that repeated runs over the same input
/// produce identical output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PendingTypes(IndexSet<String>);

impl PendingTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ty: &str) {
        if ty.is_empty() || ty == UNKNOWN_TYPE {
            return;
        }
        if !self.0.contains(ty) {
            self.0.insert(ty.to_string());
        }
    }

    pub fn contains(&self, ty: &str) -> bool {
        self.0.contains(ty)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_types() {
        assert!(is_number_type("i1"));
        assert!(is_number_type("i64"));
        assert!(is_number_type("double"));
        assert!(!is_number_type("i32*"));
        assert!(!is_number_type("label"));
    }

    #[test]
    fn test_struct_types() {
        assert!(is_struct_type("%struct.point"));
        assert!(is_struct_type("[4 x i8]"));
        assert!(is_struct_type("{ i32, i8 }"));
        assert!(is_struct_type("<{ i8, i32 }>"));
        assert!(!is_struct_type("%struct.point*"));
        assert!(!is_struct_type("@global"));
    }

    #[test]
    fn test_function_types() {
        assert!(is_function_type("i32 (i8*, ...)*"));
        assert!(is_function_type("void ()"));
        assert!(!is_function_type("call (i8*)"));
        assert!(is_type("void (i32)*"));
    }

    #[test]
    fn test_non_types() {
        assert!(!is_type("store"));
        assert!(!is_type("@f"));
        assert!(!is_type("5"));
        assert!(!is_type("getelementptr"));
    }

    #[test]
    fn test_pointing() {
        assert_eq!(remove_pointing("i8**"), "i8*");
        assert_eq!(remove_all_pointing("i8**"), "i8");
        assert_eq!(add_pointing("i32"), "i32*");
        assert_eq!(pointing_levels("i8**"), 2);
    }

    #[test]
    fn test_registry_is_idempotent() {
        let mut types = PendingTypes::new();
        types.insert("i32");
        types.insert("%struct.S*");
        types.insert("i32");
        types.insert(UNKNOWN_TYPE);
        assert_eq!(types.len(), 2);
        assert_eq!(types.iter().collect::<Vec<_>>(), vec!["i32", "%struct.S*"]);
    }
}
