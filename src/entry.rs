use std::time::{Duration, Instant};

/// Token distinguishing successive occupants of the same key.
///
/// A scheduled removal captures the generation of the entry it was created
/// for and only deletes on match, so a stale timer can never clip an entry
/// that re-occupied the key after a remove or an expiry.
pub(crate) type Generation = u64;

/// A stored value together with its expiration bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct Entry<T> {
    value: T,
    ttl: Duration,
    expires_at: Instant,
    generation: Generation,
}

impl<T> Entry<T> {
    pub(crate) fn new(value: T, ttl: Duration, generation: Generation) -> Self {
        Self {
            value,
            ttl,
            expires_at: Instant::now() + ttl,
            generation,
        }
    }

    pub(crate) fn value(&self) -> &T {
        &self.value
    }

    /// Replaces the value in place. The ttl, deadline and generation are
    /// untouched; the removal scheduled at insertion stays in force.
    pub(crate) fn set_value(&mut self, value: T) {
        self.value = value;
    }

    pub(crate) fn ttl(&self) -> Duration {
        self.ttl
    }

    pub(crate) fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }

    /// Logical expiry check, performed lazily on every access so an entry
    /// whose deadline passed is unobservable even before the reaper runs.
    pub(crate) fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Snapshot of a live entry, as returned by [`TtlStore::entry`].
///
/// [`TtlStore::entry`]: crate::TtlStore::entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata<T> {
    /// The stored value.
    pub value: T,
    /// The time-to-live the entry was created with.
    pub ttl: Duration,
}

#[cfg(test)]
mod test_entry {
    use super::Entry;

    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_not_expired_before_deadline() {
        let entry = Entry::new("v", Duration::from_secs(60), 0);

        assert_eq!(*entry.value(), "v");
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_expired_after_deadline() {
        let entry = Entry::new("v", Duration::from_millis(10), 0);

        sleep(Duration::from_millis(20));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let entry = Entry::new("v", Duration::from_millis(0), 0);

        sleep(Duration::from_millis(1));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_set_value_keeps_deadline() {
        let mut entry = Entry::new("a", Duration::from_millis(10), 7);
        let deadline = entry.expires_at();

        entry.set_value("b");

        assert_eq!(*entry.value(), "b");
        assert_eq!(entry.expires_at(), deadline);
        assert_eq!(entry.generation(), 7);
        assert_eq!(entry.ttl(), Duration::from_millis(10));
    }
}
