// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits implemented by the pluggable subsystems.
//!
//! Every pluggable store (engine, admin, image, avatar, notification sink)
//! is a capability set with at least a local and a remote variant; the server
//! boot wires one concrete choice per subsystem from configuration.

pub mod admin;
pub mod avatar;
pub mod bus;
pub mod destination;
pub mod engine;
pub mod image;

pub use admin::AdminStore;
pub use avatar::AvatarStore;
pub use bus::{BusHandler, CacheBus};
pub use destination::Destination;
pub use engine::Engine;
pub use image::ImageStore;
