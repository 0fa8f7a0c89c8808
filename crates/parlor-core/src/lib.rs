// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parlor commenting service.
//!
//! This crate provides the domain model, the error type, and the adapter
//! traits used throughout the Parlor workspace. The pluggable subsystems
//! (storage engine, admin store, image and avatar stores, notification
//! destinations) all implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ParlorError;
pub use types::{
    BlockedMeta, BlockedUser, Comment, DeleteMode, Edit, Locator, NotifyRequest, PostInfo,
    PostMetaData, SortField, SortKey, User, UserMetaData, controversy,
};

pub use traits::{AdminStore, AvatarStore, BusHandler, CacheBus, Destination, Engine, ImageStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_json_round_trip() {
        let c = Comment {
            id: "id-1".into(),
            parent_id: "id-0".into(),
            text: "<p>rendered</p>".into(),
            orig: "rendered".into(),
            user: User {
                id: "u1".into(),
                name: "dev".into(),
                ..User::default()
            },
            locator: Locator::new("site-1", "https://example.com/post/1"),
            score: 3,
            ..Comment::default()
        };
        let json = serde_json::to_string(&c).unwrap();
        let back: Comment = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, c.id);
        assert_eq!(back.locator, c.locator);
        assert_eq!(back.score, 3);
    }

    #[test]
    fn traits_are_object_safe() {
        fn _engine(_: &dyn Engine) {}
        fn _admin(_: &dyn AdminStore) {}
        fn _image(_: &dyn ImageStore) {}
        fn _avatar(_: &dyn AvatarStore) {}
        fn _destination(_: &dyn Destination) {}
    }
}
