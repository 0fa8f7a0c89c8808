// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache keys and flush requests.
//!
//! A key is a triple of id, site and opaque scope strings. Common scopes are
//! the site id, the post URL, a user id, and the `"last"` tag used by the
//! homepage feed. Flushes match by site plus scope intersection.

/// Scope separator inside a serialized key.
const SCOPE_SEP: &str = "$$";
/// Field separator between scopes, id and site.
const FIELD_SEP: &str = "@@";

/// Cache key: `(id, site, scopes[])`, serialized as
/// `scope1$$scope2@@id@@site`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    id: String,
    site: String,
    scopes: Vec<String>,
}

impl Key {
    pub fn new(id: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            site: site.into(),
            scopes: Vec::new(),
        }
    }

    /// Attach the scopes this entry should be evicted under.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn serialize(&self) -> String {
        format!(
            "{}{FIELD_SEP}{}{FIELD_SEP}{}",
            self.scopes.join(SCOPE_SEP),
            self.id,
            self.site
        )
    }

    /// Parse a serialized key. Returns `None` when the field layout does not
    /// match.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(FIELD_SEP);
        let scopes_raw = parts.next()?;
        let id = parts.next()?;
        let site = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        let scopes = if scopes_raw.is_empty() {
            Vec::new()
        } else {
            scopes_raw.split(SCOPE_SEP).map(str::to_string).collect()
        };
        Some(Self {
            id: id.to_string(),
            site: site.to_string(),
            scopes,
        })
    }
}

/// Eviction request: every cached entry for `site` whose scopes intersect
/// `scopes` is dropped. Empty scopes match every entry of the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlusherRequest {
    pub site: String,
    pub scopes: Vec<String>,
}

impl FlusherRequest {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            scopes: Vec::new(),
        }
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Wire form used on the invalidation bus.
    pub fn serialize(&self) -> String {
        format!("{}{FIELD_SEP}{}", self.site, self.scopes.join(SCOPE_SEP))
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (site, scopes_raw) = raw.split_once(FIELD_SEP)?;
        let scopes = if scopes_raw.is_empty() {
            Vec::new()
        } else {
            scopes_raw.split(SCOPE_SEP).map(str::to_string).collect()
        };
        Some(Self {
            site: site.to_string(),
            scopes,
        })
    }

    /// Does this flush cover an entry with the given site and scopes?
    pub fn matches(&self, site: &str, scopes: &[String]) -> bool {
        if self.site != site {
            return false;
        }
        if self.scopes.is_empty() {
            return true;
        }
        scopes.iter().any(|s| self.scopes.contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_serialization_layout() {
        let key = Key::new("post-1", "site-1").with_scopes(["site-1", "https://example.com/p1"]);
        assert_eq!(
            key.serialize(),
            "site-1$$https://example.com/p1@@post-1@@site-1"
        );
    }

    #[test]
    fn key_parse_round_trip() {
        let key = Key::new("last", "site-1").with_scopes(["last", "site-1"]);
        let parsed = Key::parse(&key.serialize()).unwrap();
        assert_eq!(parsed, key);

        let bare = Key::new("counts", "site-2");
        let parsed = Key::parse(&bare.serialize()).unwrap();
        assert!(parsed.scopes().is_empty());
    }

    #[test]
    fn flush_matching_rules() {
        let req = FlusherRequest::new("site-1").with_scopes(["url-a", "user-1"]);
        assert!(req.matches("site-1", &["url-a".into()]));
        assert!(req.matches("site-1", &["other".into(), "user-1".into()]));
        assert!(!req.matches("site-1", &["other".into()]));
        assert!(!req.matches("site-2", &["url-a".into()]));

        let all = FlusherRequest::new("site-1");
        assert!(all.matches("site-1", &["anything".into()]));
        assert!(all.matches("site-1", &[]));
    }

    #[test]
    fn flusher_request_wire_round_trip() {
        let req = FlusherRequest::new("site-1").with_scopes(["a", "b"]);
        assert_eq!(FlusherRequest::parse(&req.serialize()).unwrap(), req);
    }
}
