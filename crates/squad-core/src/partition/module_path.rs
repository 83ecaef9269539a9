//! Module inference from target identifiers

/// Module key of an identifier, or `None` when it has no module structure.
///
/// - `src/auth/login.rs::validate` → `src/auth` (parent directory of the path part)
/// - `auth::login::validate` → `auth::login`
/// - `auth.login.validate` → `auth.login`
pub fn module_of(id: &str) -> Option<String> {
    let id = id.trim();

    if id.contains('/') || id.contains('\\') {
        let path = id.split("::").next().unwrap_or(id).replace('\\', "/");
        let parent = path.trim_end_matches('/').rsplit_once('/')?.0;
        return (!parent.is_empty()).then(|| parent.to_string());
    }

    if id.contains("::") {
        return parent_segments(id, "::");
    }

    if id.contains('.') && !id.contains(char::is_whitespace) {
        return parent_segments(id, ".");
    }

    None
}

fn parent_segments(id: &str, separator: &str) -> Option<String> {
    let segments: Vec<&str> = id.split(separator).collect();
    if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments[..segments.len() - 1].join(separator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(module_of("src/auth/login.rs::validate").as_deref(), Some("src/auth"));
        assert_eq!(module_of("src/auth/login.rs").as_deref(), Some("src/auth"));
        assert_eq!(module_of("src\\db\\pool.rs").as_deref(), Some("src/db"));
        assert_eq!(module_of("/login.rs"), None);
    }

    #[test]
    fn test_rust_paths() {
        assert_eq!(module_of("auth::login::validate").as_deref(), Some("auth::login"));
        assert_eq!(module_of("auth::validate").as_deref(), Some("auth"));
        assert_eq!(module_of("::validate"), None);
    }

    #[test]
    fn test_dotted_paths() {
        assert_eq!(module_of("auth.login.validate").as_deref(), Some("auth.login"));
        assert_eq!(module_of("not a.path"), None);
        assert_eq!(module_of("trailing."), None);
    }

    #[test]
    fn test_flat_identifiers() {
        assert_eq!(module_of("validate"), None);
        assert_eq!(module_of(""), None);
    }
}
