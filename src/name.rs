//! Query name validation and suffix decomposition (C2).

use crate::error::{CoreError, Result};

/// Suffix lists are capped at 16 entries — this covers real-world
/// domain depths with headroom while keeping the per-lookup suffix
/// walk bounded regardless of how deep an adversarial name goes.
pub const MAX_SUFFIXES: usize = 16;

/// A validated, lowercase DNS query name.
///
/// Non-empty, at most 255 octets, no trailing dot. Construction
/// lowercases the input so every downstream component (cache keys,
/// filter hashes, store lookups) compares case-insensitively by
/// comparing the stored bytes directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(String);

impl Name {
    pub fn new(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(CoreError::InvalidName("empty name".to_string()));
        }
        if raw.len() > 255 {
            return Err(CoreError::InvalidName(format!(
                "name exceeds 255 octets: {} bytes",
                raw.len()
            )));
        }
        if raw.ends_with('.') {
            return Err(CoreError::InvalidName("trailing dot".to_string()));
        }
        Ok(Name(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Produces the ordered suffix list: the full name, then each
    /// successive tail after a `.`, capped at [`MAX_SUFFIXES`] entries.
    /// No allocation — every entry is a slice into `self`.
    ///
    /// Walks the bytes once, pushes the full name first, then pushes
    /// the byte after every `.` found, skipping a dot that would
    /// produce an empty trailing suffix (handles consecutive dots and
    /// a trailing dot gracefully even though `Name::new` already
    /// rejects the latter).
    pub fn suffixes(&self) -> Vec<&str> {
        let s = self.0.as_str();
        let mut out = Vec::with_capacity(MAX_SUFFIXES);
        out.push(s);

        for (i, b) in s.bytes().enumerate() {
            if out.len() >= MAX_SUFFIXES {
                break;
            }
            if b == b'.' {
                let tail = &s[i + 1..];
                if !tail.is_empty() {
                    out.push(tail);
                }
            }
        }

        out
    }

    /// The parent domain: everything after the first `.`, or `None` if
    /// this name has no labels beneath a TLD.
    pub fn parent(&self) -> Option<&str> {
        let s = self.0.as_str();
        let dot = s.find('.')?;
        let tail = &s[dot + 1..];
        if tail.is_empty() {
            None
        } else {
            Some(tail)
        }
    }

    /// The subdomain prefix up to and including the first `.`, e.g.
    /// `"www."` for `"www.intel.com"`. Empty if this name has no parent.
    pub fn subdomain_prefix(&self) -> &str {
        let s = self.0.as_str();
        match s.find('.') {
            Some(dot) => &s[..=dot],
            None => "",
        }
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases() {
        let n = Name::new("WWW.Example.COM").unwrap();
        assert_eq!(n.as_str(), "www.example.com");
    }

    #[test]
    fn rejects_empty() {
        assert!(Name::new("").is_err());
    }

    #[test]
    fn rejects_trailing_dot() {
        assert!(Name::new("example.com.").is_err());
    }

    #[test]
    fn rejects_oversized() {
        let long = "a".repeat(256);
        assert!(Name::new(&long).is_err());
    }

    #[test]
    fn suffixes_walk_toward_tld() {
        let n = Name::new("www.ads.example.com").unwrap();
        assert_eq!(
            n.suffixes(),
            vec!["www.ads.example.com", "ads.example.com", "example.com", "com"]
        );
    }

    #[test]
    fn suffixes_first_entry_is_full_name() {
        let n = Name::new("example.com").unwrap();
        assert_eq!(n.suffixes()[0], "example.com");
    }

    #[test]
    fn suffixes_cap_at_sixteen() {
        let deep = (0..20).map(|i| i.to_string()).collect::<Vec<_>>().join(".");
        let n = Name::new(&deep).unwrap();
        assert_eq!(n.suffixes().len(), MAX_SUFFIXES);
    }

    #[test]
    fn suffixes_skip_consecutive_dots() {
        // A name this malformed wouldn't normally validate through a
        // wire parser, but the decomposer must not panic or produce an
        // empty suffix even if one slips through.
        let n = Name("a..b".to_string());
        let sfx = n.suffixes();
        assert!(sfx.iter().all(|s| !s.is_empty()));
    }

    #[test]
    fn parent_and_subdomain_prefix() {
        let n = Name::new("www.intel.com").unwrap();
        assert_eq!(n.parent(), Some("intel.com"));
        assert_eq!(n.subdomain_prefix(), "www.");

        let root = Name::new("com").unwrap();
        assert_eq!(root.parent(), None);
        assert_eq!(root.subdomain_prefix(), "");
    }
}
