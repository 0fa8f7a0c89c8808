// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Restricted-words matcher: tokenizer plus wildcard trie.
//!
//! Patterns are matched against whole tokens; `*` inside a pattern matches
//! any substring at that position, including the empty one. Tries are built
//! lazily per site and rebuilt when the word list changes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Split on every non-alphanumeric codepoint and lowercase the pieces.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

#[derive(Default)]
struct Node {
    children: HashMap<char, Node>,
    wildcard: Option<Box<Node>>,
    terminal: bool,
}

impl Node {
    fn insert(&mut self, pattern: &str) {
        let mut node = self;
        for c in pattern.chars() {
            node = if c == '*' {
                node.wildcard.get_or_insert_with(Box::default)
            } else {
                node.children.entry(c).or_default()
            };
        }
        node.terminal = true;
    }

    fn matches(&self, token: &[char]) -> bool {
        if let Some(wild) = &self.wildcard {
            // a wildcard consumes zero or more characters
            for skip in 0..=token.len() {
                if wild.matches(&token[skip..]) {
                    return true;
                }
            }
        }
        match token.split_first() {
            None => self.terminal,
            Some((c, rest)) => self.children.get(c).is_some_and(|n| n.matches(rest)),
        }
    }
}

/// Anchored wildcard trie over lowercase tokens.
pub struct WildcardTrie {
    root: Node,
}

impl WildcardTrie {
    pub fn build<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut root = Node::default();
        for p in patterns {
            let p = p.as_ref().trim().to_lowercase();
            if !p.is_empty() {
                root.insert(&p);
            }
        }
        Self { root }
    }

    pub fn matches(&self, token: &str) -> bool {
        let chars: Vec<char> = token.chars().collect();
        self.root.matches(&chars)
    }
}

/// Source of the per-site restricted word list.
pub trait WordLister: Send + Sync + 'static {
    fn list(&self, site: &str) -> Vec<String>;
}

/// Fixed list shared by every site, loaded from configuration.
pub struct StaticWordLister {
    words: Vec<String>,
}

impl StaticWordLister {
    pub fn new(words: Vec<String>) -> Self {
        Self { words }
    }
}

impl WordLister for StaticWordLister {
    fn list(&self, _site: &str) -> Vec<String> {
        self.words.clone()
    }
}

struct SiteTrie {
    words: Vec<String>,
    trie: Arc<WildcardTrie>,
}

/// Per-site matcher with memoized tries.
pub struct RestrictedWordsMatcher {
    lister: Arc<dyn WordLister>,
    cache: Mutex<HashMap<String, SiteTrie>>,
}

impl RestrictedWordsMatcher {
    pub fn new(lister: Arc<dyn WordLister>) -> Self {
        Self {
            lister,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// True when any token of `text` hits a restricted pattern for the site.
    pub fn matches(&self, site: &str, text: &str) -> bool {
        let trie = self.site_trie(site);
        tokenize(text).iter().any(|t| trie.matches(t))
    }

    fn site_trie(&self, site: &str) -> Arc<WildcardTrie> {
        let words = self.lister.list(site);
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match cache.get(site) {
            Some(entry) if entry.words == words => Arc::clone(&entry.trie),
            _ => {
                let trie = Arc::new(WildcardTrie::build(&words));
                cache.insert(
                    site.to_string(),
                    SiteTrie {
                        words,
                        trie: Arc::clone(&trie),
                    },
                );
                trie
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_splits_and_lowercases() {
        assert_eq!(
            tokenize("Hello, WORLD! 42-x"),
            vec!["hello", "world", "42", "x"]
        );
        assert!(tokenize("...").is_empty());
    }

    #[test]
    fn tokenize_is_idempotent_on_normalized_form() {
        let tokens = tokenize("Some, Text with-punctuation!");
        let joined = tokens.join(" ");
        assert_eq!(tokenize(&joined), tokens);
    }

    #[test]
    fn wildcard_trie_scenario() {
        let trie = WildcardTrie::build(&["abc", "*ck", "*z"]);
        for hit in ["abc", "duck", "quack", "ck", "xyz"] {
            assert!(trie.matches(hit), "{hit} should match");
        }
        for miss in ["quacker", "buzzer"] {
            assert!(!trie.matches(miss), "{miss} should not match");
        }
    }

    #[test]
    fn infix_wildcard() {
        let trie = WildcardTrie::build(&["a*c"]);
        assert!(trie.matches("ac"));
        assert!(trie.matches("abc"));
        assert!(trie.matches("axxxc"));
        assert!(!trie.matches("abcd"));
    }

    #[test]
    fn matcher_memoizes_until_list_changes() {
        struct Flipping(Mutex<Vec<String>>);
        impl WordLister for Flipping {
            fn list(&self, _site: &str) -> Vec<String> {
                self.0.lock().unwrap().clone()
            }
        }
        let lister = Arc::new(Flipping(Mutex::new(vec!["bad".into()])));
        let matcher = RestrictedWordsMatcher::new(Arc::clone(&lister) as Arc<dyn WordLister>);

        assert!(matcher.matches("s", "this is bad"));
        assert!(!matcher.matches("s", "this is worse"));

        *lister.0.lock().unwrap() = vec!["worse".into()];
        assert!(matcher.matches("s", "this is worse"));
        assert!(!matcher.matches("s", "this is bad"));
    }

    #[test]
    fn matcher_is_case_insensitive() {
        let matcher = RestrictedWordsMatcher::new(Arc::new(StaticWordLister::new(vec![
            "Spam".into(),
        ])));
        assert!(matcher.matches("s", "SPAM and eggs"));
    }
}
