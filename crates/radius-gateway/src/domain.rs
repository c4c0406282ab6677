//! Username shape checks and the mail-domain allow-list
//!
//! Domain matching is a plain case-sensitive substring test: an allow-list
//! entry `example.com` accepts `mail.example.com`, and also
//! `example.com.evil.org`. Deployments relying on this must keep their
//! entries specific enough.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// `local-part@host.tld`: exactly one `@`, no whitespace, at least one dot
/// in the host
pub fn is_email(username: &str) -> bool {
    EMAIL.is_match(username)
}

/// Everything after the first `@`
pub fn domain_of(username: &str) -> Option<&str> {
    username.split_once('@').map(|(_, domain)| domain)
}

/// True iff some entry of `allow_list` occurs inside `domain`
pub fn domain_matches(domain: &str, allow_list: &[String]) -> bool {
    allow_list.iter().any(|entry| domain.contains(entry.as_str()))
}

/// Accepted mail domains, in configuration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    domains: Vec<String>,
}

impl AllowList {
    pub fn new(domains: Vec<String>) -> Self {
        AllowList { domains }
    }

    /// Parse a comma-separated list, trimming entries and dropping empty ones
    pub fn parse(raw: &str) -> Self {
        let domains = raw
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect();
        AllowList { domains }
    }

    pub fn matches(&self, domain: &str) -> bool {
        domain_matches(domain, &self.domains)
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl fmt::Display for AllowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.domains.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_is_email() {
        assert!(is_email("alice@example.com"));
        assert!(is_email("first.last+tag@mail.example.co.uk"));

        assert!(!is_email("bob"));
        assert!(!is_email("bob@"));
        assert!(!is_email("bob@@x"));
        assert!(!is_email("bob@x"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("bob smith@example.com"));
        assert!(!is_email(""));
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("alice@example.com"), Some("example.com"));
        assert_eq!(domain_of("a@b@c.d"), Some("b@c.d"));
        assert_eq!(domain_of("alice"), None);
    }

    #[test]
    fn test_domain_matches_exact_and_subdomain() {
        let allowed = list(&["example.com"]);
        assert!(domain_matches("example.com", &allowed));
        assert!(domain_matches("mail.example.com", &allowed));
        assert!(!domain_matches("other.org", &allowed));
    }

    #[test]
    fn test_domain_matches_is_permissive_substring() {
        // Known permissive behaviour: any domain containing an entry matches
        let allowed = list(&["example.com"]);
        assert!(domain_matches("example.com.evil.org", &allowed));
        assert!(domain_matches("evil-example.com.attacker.net", &allowed));
    }

    #[test]
    fn test_domain_matches_case_sensitive() {
        let allowed = list(&["example.com"]);
        assert!(!domain_matches("EXAMPLE.COM", &allowed));
    }

    #[test]
    fn test_empty_allow_list_rejects_everything() {
        assert!(!domain_matches("example.com", &[]));
        assert!(!AllowList::default().matches("example.com"));
    }

    #[test]
    fn test_any_entry_matches() {
        let allowed = AllowList::parse("example.org, example.com");
        assert!(allowed.matches("example.com"));
        assert!(allowed.matches("example.org"));
        assert!(!allowed.matches("example.net"));
        assert_eq!(allowed.to_string(), "example.org, example.com");
    }
}
