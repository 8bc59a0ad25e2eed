use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Sender};
use hashbrown::HashMap;
use log::warn;
use parking_lot::Mutex;

use crate::entry::{Entry, EntryMetadata, Generation};
use crate::error::{Error, Result};
use crate::instrinsic::unlikely;
use crate::reaper::{self, Command};
use crate::value::NullValue;

/// An in-memory key-value store whose entries expire after a fixed
/// time-to-live.
///
/// Every successful [`insert`] stores the value and schedules exactly one
/// deferred removal with the store's reaper thread, to fire no earlier than
/// `ttl` after insertion. Reads never extend an entry's lifetime, and
/// [`update`] replaces the value without touching the deadline.
///
/// All operations take `&self` and are atomic with respect to the backing
/// map; the store can be shared across threads behind an [`Arc`].
/// Dropping the store shuts the reaper down and releases every pending
/// removal.
///
/// # Examples
///
/// ```
/// use std::thread::sleep;
/// use std::time::Duration;
///
/// use melatonin::TtlStore;
///
/// let store = TtlStore::new(Duration::from_millis(50));
///
/// assert_eq!(store.insert("a", "x".to_string()), Ok(true));
/// assert_eq!(store.get("a"), Ok(Some("x".to_string())));
///
/// sleep(Duration::from_millis(150));
/// assert_eq!(store.get("a"), Ok(None));
/// ```
///
/// [`insert`]: TtlStore::insert
/// [`update`]: TtlStore::update
pub struct TtlStore<T> {
    entries: Arc<Mutex<HashMap<String, Entry<T>>>>,
    ttl: Duration,
    generation: AtomicU64,

    tx: Sender<Command>,
    reaper: Option<JoinHandle<()>>,
}

impl<T> TtlStore<T>
where
    T: Send + 'static,
{
    /// Creates an empty `TtlStore` whose entries live for `ttl`, and spawns
    /// its reaper thread.
    ///
    /// A zero `ttl` is legal and makes entries expire near-immediately.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use melatonin::TtlStore;
    ///
    /// let store = TtlStore::<String>::new(Duration::from_secs(30));
    /// assert_eq!(store.ttl(), Duration::from_secs(30));
    /// ```
    pub fn new(ttl: Duration) -> Self {
        let entries = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = channel::unbounded();

        let reaper = {
            let entries = Arc::clone(&entries);
            thread::Builder::new()
                .name("ttl-reaper".to_owned())
                .spawn(move || reaper::run(entries, rx))
                .expect("failed to spawn reaper thread")
        };

        Self {
            entries,
            ttl,
            generation: AtomicU64::new(0),
            tx,
            reaper: Some(reaper),
        }
    }
}

impl<T> TtlStore<T> {
    /// Inserts a key-value pair and schedules its removal after the store's
    /// ttl.
    ///
    /// If the key is already present and not yet expired this is a no-op:
    /// the existing value, ttl and scheduled removal are left untouched, and
    /// `Ok(true)` is returned all the same. An expired occupant counts as
    /// absent and is replaced by a fresh lifecycle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `key` is empty or `value` is
    /// its type's null sentinel (see [`NullValue`]).
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use melatonin::TtlStore;
    ///
    /// let store = TtlStore::new(Duration::from_secs(30));
    ///
    /// assert_eq!(store.insert("a", "x".to_string()), Ok(true));
    ///
    /// // second insert on a live key is a silent no-op.
    /// assert_eq!(store.insert("a", "y".to_string()), Ok(true));
    /// assert_eq!(store.get("a"), Ok(Some("x".to_string())));
    ///
    /// assert!(store.insert("", "x".to_string()).is_err());
    /// assert!(store.insert("b", String::new()).is_err());
    /// ```
    pub fn insert(&self, key: &str, value: T) -> Result<bool>
    where
        T: NullValue,
    {
        check_key(key)?;
        check_value(&value)?;

        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(key) {
            if !existing.is_expired() {
                return Ok(true);
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let entry = Entry::new(value, self.ttl, generation);
        let deadline = entry.expires_at();
        entries.insert(key.to_owned(), entry);
        drop(entries);

        self.schedule(key, generation, deadline);
        Ok(true)
    }

    /// Returns a clone of the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key is absent or its entry has expired.
    /// Reading never refreshes the ttl.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `key` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use melatonin::TtlStore;
    ///
    /// let store = TtlStore::new(Duration::from_secs(30));
    ///
    /// assert_eq!(store.get("a"), Ok(None));
    /// store.insert("a", "x".to_string()).unwrap();
    /// assert_eq!(store.get("a"), Ok(Some("x".to_string())));
    /// ```
    pub fn get(&self, key: &str) -> Result<Option<T>>
    where
        T: Clone,
    {
        check_key(key)?;

        let entries = self.entries.lock();
        Ok(entries.get(key).and_then(|entry| {
            if unlikely(entry.is_expired()) {
                None
            } else {
                Some(entry.value().clone())
            }
        }))
    }

    /// Replaces the value stored under `key`, leaving its ttl and scheduled
    /// removal untouched.
    ///
    /// Returns `Ok(false)` without creating an entry if the key is absent or
    /// expired. Sliding expiration is deliberately not provided; an updated
    /// entry still dies at its original deadline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `key` is empty or `value` is
    /// its type's null sentinel.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use melatonin::TtlStore;
    ///
    /// let store = TtlStore::new(Duration::from_secs(30));
    ///
    /// assert_eq!(store.update("a", "y".to_string()), Ok(false));
    ///
    /// store.insert("a", "x".to_string()).unwrap();
    /// assert_eq!(store.update("a", "y".to_string()), Ok(true));
    /// assert_eq!(store.get("a"), Ok(Some("y".to_string())));
    /// ```
    pub fn update(&self, key: &str, value: T) -> Result<bool>
    where
        T: NullValue,
    {
        check_key(key)?;
        check_value(&value)?;

        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.set_value(value);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Removes the entry stored under `key`.
    ///
    /// Returns `Ok(false)` if the key is absent or already expired. The
    /// removal scheduled at insertion is left to fire; its generation no
    /// longer matches anything, so it is a no-op, and a later re-insertion
    /// of the same key is not clipped by it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `key` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use melatonin::TtlStore;
    ///
    /// let store = TtlStore::new(Duration::from_secs(30));
    ///
    /// store.insert("a", "x".to_string()).unwrap();
    /// assert_eq!(store.remove("a"), Ok(true));
    /// assert_eq!(store.remove("a"), Ok(false));
    /// assert_eq!(store.get("a"), Ok(None));
    /// ```
    pub fn remove(&self, key: &str) -> Result<bool> {
        check_key(key)?;

        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                entries.remove(key);
                Ok(true)
            }
            Some(_) => {
                // physically present but logically gone; drop it quietly.
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Returns a snapshot of the live entry under `key`: the value together
    /// with the ttl it was created with.
    ///
    /// Mirrors [`get`] in validation and expiry semantics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `key` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use melatonin::TtlStore;
    ///
    /// let store = TtlStore::new(Duration::from_secs(30));
    /// store.insert("a", "x".to_string()).unwrap();
    ///
    /// let meta = store.entry("a").unwrap().unwrap();
    /// assert_eq!(meta.value, "x".to_string());
    /// assert_eq!(meta.ttl, Duration::from_secs(30));
    /// ```
    ///
    /// [`get`]: TtlStore::get
    pub fn entry(&self, key: &str) -> Result<Option<EntryMetadata<T>>>
    where
        T: Clone,
    {
        check_key(key)?;

        let entries = self.entries.lock();
        Ok(entries.get(key).and_then(|entry| {
            if unlikely(entry.is_expired()) {
                None
            } else {
                Some(EntryMetadata {
                    value: entry.value().clone(),
                    ttl: entry.ttl(),
                })
            }
        }))
    }

    /// Returns `true` if a live (unexpired) entry is stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `key` is empty.
    pub fn contains_key(&self, key: &str) -> Result<bool> {
        check_key(key)?;

        let entries = self.entries.lock();
        Ok(entries.get(key).map_or(false, |entry| !entry.is_expired()))
    }

    /// Returns the time-to-live applied to every insertion.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the number of live entries.
    ///
    /// Entries whose deadline has passed are not counted, even when the
    /// reaper has not removed them yet.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock();
        entries.values().filter(|entry| !entry.is_expired()).count()
    }

    /// Returns `true` if the store holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry. Pending removals fire into a generation mismatch
    /// and are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use melatonin::TtlStore;
    ///
    /// let store = TtlStore::new(Duration::from_secs(30));
    /// store.insert("a", "x".to_string()).unwrap();
    ///
    /// store.clear();
    /// assert!(store.is_empty());
    /// ```
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn schedule(&self, key: &str, generation: Generation, deadline: Instant) {
        let command = Command::Schedule {
            key: key.to_owned(),
            generation,
            deadline,
        };

        if self.tx.send(command).is_err() {
            warn!("reaper thread is gone; {:?} will not expire on time", key);
        }
    }
}

impl<T> Drop for TtlStore<T> {
    fn drop(&mut self) {
        // shutting the reaper down releases every pending removal.
        let _ = self.tx.send(Command::Shutdown);
        if let Some(reaper) = self.reaper.take() {
            let _ = reaper.join();
        }
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        Err(Error::InvalidArgument("key must not be empty"))
    } else {
        Ok(())
    }
}

fn check_value<T>(value: &T) -> Result<()>
where
    T: NullValue,
{
    if value.is_null() {
        Err(Error::InvalidArgument("value must not be empty"))
    } else {
        Ok(())
    }
}
