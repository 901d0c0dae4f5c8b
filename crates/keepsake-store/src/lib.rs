//! `keepsake-store` – The Journal Store.
//!
//! Keeps the media journal's records, persists them to a local key-value
//! slot, and moves them in and out of JSON bundles.
//!
//! # Modules
//!
//! - [`store`] – [`MemoryStore`][store::MemoryStore]: the newest-first record
//!   collection with gallery filtering, search, edit, import and export.
//! - [`storage`] – [`SlotStorage`][storage::SlotStorage] and its SQLite and
//!   in-memory implementations.
//! - [`bundle`] – the export envelope, import parsing and preview, and async
//!   bundle file I/O.
//! - [`media`] – turning uploaded files into embedded data URLs and back.

pub mod bundle;
pub mod media;
pub mod storage;
pub mod store;
