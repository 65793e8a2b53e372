//! Wire types for persisted browser session snapshots.
//!
//! The session file written after a successful login uses the Playwright
//! storage-state JSON shape (`{ "cookies": [...], "origins": [...] }`),
//! so any consumer seeding a browser context can load it unchanged.

mod storage;

pub use storage::{Cookie, LocalStorageEntry, OriginState, SameSite, StorageState};
