//! Identifier and string helpers shared across derivation and generation.

/// Capitalize the first letter of a string.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Convert a string to PascalCase, splitting on `-`, `_`, `.`, `/` and spaces.
///
/// Used by the default naming strategy to build type declaration names from
/// interface paths, so `/user/get-info` becomes `UserGetInfo`.
pub fn to_pascal_case(s: &str) -> String {
    s.split(['-', '_', '.', '/', ' ', '{', '}', ':'])
        .filter(|part| !part.is_empty())
        .map(capitalize_first)
        .collect()
}

/// Convert a string to camelCase via PascalCase.
pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// Sanitize a name into a valid identifier for the target type system.
///
/// Strips characters outside `[A-Za-z0-9_$]` after case conversion and
/// prepends an underscore when the result starts with a digit.
pub fn sanitize_identifier(name: &str) -> String {
    let mut result: String = to_pascal_case(name)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
        .collect();
    if result.is_empty() {
        return "_Empty".to_string();
    }
    if result
        .chars()
        .next()
        .map(|c| c.is_ascii_digit())
        .unwrap_or(false)
    {
        result = format!("_{result}");
    }
    result
}

/// Normalize a project basepath: ensure a single leading slash, strip any
/// trailing slash, and collapse a bare `/` to the empty string.
pub fn normalize_basepath(basepath: &str) -> String {
    let trimmed = basepath.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first("foo"), "Foo");
        assert_eq!(capitalize_first(""), "");
        assert_eq!(capitalize_first("ABC"), "ABC");
    }

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("user/get-info"), "UserGetInfo");
        assert_eq!(to_pascal_case("get_user_list"), "GetUserList");
        assert_eq!(to_pascal_case("/api/v1/{id}"), "ApiV1Id");
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("user/get-info"), "userGetInfo");
        assert_eq!(to_camel_case("GetUser"), "getUser");
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("user info"), "UserInfo");
        assert_eq!(sanitize_identifier("123abc"), "_123abc");
        assert_eq!(sanitize_identifier("!!!"), "_Empty");
    }

    #[test]
    fn test_normalize_basepath() {
        assert_eq!(normalize_basepath("/api/"), "/api");
        assert_eq!(normalize_basepath("api"), "/api");
        assert_eq!(normalize_basepath("/"), "");
        assert_eq!(normalize_basepath(""), "");
    }
}
