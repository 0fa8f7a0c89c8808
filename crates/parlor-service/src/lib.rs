// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Business layer of the Parlor commenting service.
//!
//! Wraps the storage engine with validation, formatting, vote accounting,
//! edit windows and tree assembly, and hosts the pluggable admin store,
//! restricted-words matcher and page-title extractor.

pub mod admin;
pub mod format;
pub mod service;
pub mod title;
pub mod tree;
pub mod words;

pub use admin::{AdminStores, RpcAdminStore, StaticAdminStore};
pub use format::CommentFormatter;
pub use service::{DataService, EditRequest, ServiceParams, hash_if_needed};
pub use title::TitleExtractor;
pub use tree::{Node, make_tree};
pub use words::{RestrictedWordsMatcher, StaticWordLister, WildcardTrie, WordLister, tokenize};
