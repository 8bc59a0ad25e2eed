//! Melatonin is a key-value based in-memory store where every entry expires
//! after a fixed time-to-live.
//!
//! Every successful insertion schedules exactly one deferred removal, executed
//! by a per-store background thread once the entry's deadline has passed.
//! Reads never refresh an entry's lifetime; this is a pure TTL store, not an
//! LRU-refresh cache.
//!
//! # Examples
//! ```
//! use std::thread::sleep;
//! use std::time::Duration;
//!
//! use melatonin::TtlStore;
//!
//! let store = TtlStore::new(Duration::from_millis(50));
//!
//! store.insert("session", "alive".to_string()).unwrap();
//! assert_eq!(store.get("session").unwrap(), Some("alive".to_string()));
//!
//! sleep(Duration::from_millis(150));
//! assert_eq!(store.get("session").unwrap(), None);
//! ```

// for internal use.
pub(crate) mod instrinsic;
pub(crate) mod reaper;

mod entry;
mod error;
mod value;

/// The store itself, a mapping from string keys to expiring entries.
pub mod store;

#[doc(inline)]
pub use crate::store::TtlStore;

pub use crate::entry::EntryMetadata;
pub use crate::error::{Error, Result};
pub use crate::value::NullValue;
