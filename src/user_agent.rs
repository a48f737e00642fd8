//! User-Agent string shared by every HTTP client the crate builds.

/// Product token sent before the version.
const PRODUCT: &str = "converter";

/// Default User-Agent identifying the tool and its version.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (document-conversion-client)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_product_and_version() {
        let ua = default_user_agent();
        assert!(ua.starts_with("converter/"), "UA must start with converter/: {ua}");
        assert!(ua.contains(env!("CARGO_PKG_VERSION")));
        assert!(!ua.contains('\n'));
    }
}
