//! Typed key/value preference store persisted to a single file.
//!
//! Records carry a key, a type tag and a raw text value. Typed accessors
//! fall back to a caller-supplied default when a key is missing or its
//! stored text is corrupt, and panic when a key is read as the wrong type.
//!
//! # Examples
//!
//! Synchronous usage with [`prefs::Prefs`]:
//! ```no_run
//! use prefstore::{config::PrefsConfig, prefs::Prefs};
//!
//! let mut prefs = Prefs::open(&PrefsConfig::new("prefs.json").with_initial_revision(3))
//!     .expect("open prefs");
//! prefs.set_int("window.width", 1280).expect("set");
//! assert_eq!(prefs.get_int("window.width", 800), 1280);
//! assert_eq!(prefs.get_bool("telemetry", false), false);
//!
//! prefs.add_to_set("recent", "scene_a").expect("add");
//! assert!(prefs.set_contains("recent", "scene_a"));
//! prefs.close().expect("close");
//! ```
//!
//! In-memory store without persistence:
//! ```
//! use prefstore::core::store::PrefStore;
//!
//! let mut store = PrefStore::new(1);
//! store.set("volume", &0.5f32).expect("set");
//! store.add_to_set("tags", "b").expect("add");
//! store.add_to_set("tags", "a").expect("add");
//! assert_eq!(store.get("volume", 1.0f32), 0.5);
//! assert_eq!(store.get("tags", Vec::<String>::new()), vec!["b".to_string(), "a".to_string()]);
//! ```
//!
//! Shared across tasks with [`runtime::handle::spawn_prefs`]:
//! ```no_run
//! use prefstore::{
//!     prefs::Prefs,
//!     runtime::handle::{spawn_prefs, RuntimeConfig},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let prefs = Prefs::open_path("prefs.json", 1).expect("open prefs");
//! let handle = spawn_prefs(prefs, RuntimeConfig::default());
//! handle.set("theme", "dark".to_string()).await.expect("set");
//! let theme = handle.get("theme", String::new()).await.expect("get");
//! assert_eq!(theme, "dark");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Open-time configuration.
pub mod config;
/// Core in-memory store and set codec.
pub mod core;
/// Manual editing session.
pub mod editor;
/// Persistence abstraction with JSON and SQLite implementations.
pub mod persist;
/// File-backed store.
pub mod prefs;
/// Persisted record type.
pub mod record;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Shared primitive types and enums.
pub mod types;
/// Typed value conversions.
pub mod value;
