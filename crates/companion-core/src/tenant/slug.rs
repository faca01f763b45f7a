//! Slug normalization shared by the registry and the key builder.

/// Normalize a tenant identifier: trim, lowercase, and replace every character
/// outside `[a-z0-9-]` with `-`.
///
/// Idempotent: `normalize_slug(&normalize_slug(s)) == normalize_slug(s)`.
pub fn normalize_slug(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Key under which a tenant's JSON configuration blob is looked up
/// (`my-brand` -> `MY_BRAND`).
pub fn tenant_config_key(slug: &str) -> String {
    normalize_slug(slug).replace('-', "_").to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_slug() {
        assert_eq!(normalize_slug("  Acme Corp "), "acme-corp");
        assert_eq!(normalize_slug("beta_2"), "beta-2");
        assert_eq!(normalize_slug("already-ok"), "already-ok");
        assert_eq!(normalize_slug(""), "");
        assert_eq!(normalize_slug("Ünïcode!"), "-n-code-");
    }

    #[test]
    fn test_normalize_slug_is_idempotent() {
        let inputs = [
            "Acme",
            " spaced  out ",
            "MiXeD_case.42",
            "ßtraße",
            "İstanbul",
            "--x--",
            "\t tab\n",
            "emoji🚀brand",
        ];
        for input in inputs {
            let once = normalize_slug(input);
            assert_eq!(normalize_slug(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_tenant_config_key() {
        assert_eq!(tenant_config_key("my-brand"), "MY_BRAND");
        assert_eq!(tenant_config_key("Acme Corp"), "ACME_CORP");
    }
}
