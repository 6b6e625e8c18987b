//! Registry of locked folders.
//!
//! The registry is a single JSON document holding the master-key hash and a
//! mapping from absolute folder path to [`LockEntry`]. It is loaded once when
//! the engine starts and rewritten in full after every successful mutation.
//!
//! # File Format
//!
//! ```json
//! {
//!   "master_key_hash": "$argon2id$v=19$...",
//!   "locks": {
//!     "/home/me/private": {
//!       "password_hash": "$argon2id$v=19$...",
//!       "original_path": "/home/me/private",
//!       "system": "Linux",
//!       "name": "private"
//!     }
//!   }
//! }
//! ```
//!
//! Older files stored only the `locks` mapping at the document root. Those are
//! recognised at load time and wrapped into the current shape.

mod model;
mod store;


pub use model::{DocumentShape, LockEntry, Platform, RegistryDocument, display_name_for};
pub use store::{RegistryStore, load};
