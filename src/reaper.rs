//! Deferred removal of expired entries.
//!
//! Each store spawns one reaper thread. The thread keeps pending removals in
//! a `BTreeMap` keyed by deadline, sleeps until the earliest one, and drains
//! every slot that has come due. A removal only takes effect when the
//! generation captured at scheduling time still matches the entry currently
//! occupying the key; anything else is a stale timer and is ignored.

use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError};
use hashbrown::HashMap;
use log::{debug, trace};
use parking_lot::Mutex;

use crate::entry::{Entry, Generation};
use crate::instrinsic::likely;

pub(crate) enum Command {
    /// Remove `key` once `deadline` has passed, if its generation still matches.
    Schedule {
        key: String,
        generation: Generation,
        deadline: Instant,
    },
    /// Stop the reaper, dropping every pending removal.
    Shutdown,
}

type Pending = BTreeMap<Instant, Vec<(String, Generation)>>;

pub(crate) fn run<T>(entries: Arc<Mutex<HashMap<String, Entry<T>>>>, rx: Receiver<Command>) {
    let mut pending = Pending::new();

    loop {
        let command = match pending.keys().next().copied() {
            Some(deadline) => {
                let now = Instant::now();
                if deadline <= now {
                    reap(&entries, &mut pending, now);
                    continue;
                }

                match rx.recv_timeout(deadline - now) {
                    Ok(command) => command,
                    Err(RecvTimeoutError::Timeout) => {
                        reap(&entries, &mut pending, Instant::now());
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
        };

        match command {
            Command::Schedule {
                key,
                generation,
                deadline,
            } => {
                trace!("scheduled removal of {:?} at {:?}", key, deadline);
                pending
                    .entry(deadline)
                    .or_insert_with(Vec::new)
                    .push((key, generation));
            }
            Command::Shutdown => break,
        }
    }
}

fn reap<T>(entries: &Mutex<HashMap<String, Entry<T>>>, pending: &mut Pending, now: Instant) {
    // split_off keeps everything strictly after `now`; slots at `now` are due
    // and belong to the drained half.
    let mut due = pending.split_off(&(now + Duration::from_nanos(1)));
    mem::swap(pending, &mut due);

    let mut entries = entries.lock();
    for (_, slot) in due {
        for (key, generation) in slot {
            let matches = entries
                .get(&key)
                .map_or(false, |e| e.generation() == generation);

            if likely(matches) {
                entries.remove(&key);
                debug!("entry {:?} expired", key);
            } else {
                // key was removed by hand, or re-occupied by a fresh lifecycle.
                trace!("stale removal of {:?} ignored", key);
            }
        }
    }
}

#[cfg(test)]
mod test_reaper {
    use super::{reap, Pending};
    use crate::entry::Entry;

    use std::time::{Duration, Instant};

    use hashbrown::HashMap;
    use parking_lot::Mutex;

    fn store_with(entries: Vec<(&str, Entry<&'static str>)>) -> Mutex<HashMap<String, Entry<&'static str>>> {
        let mut map = HashMap::new();
        for (k, e) in entries {
            map.insert(k.to_owned(), e);
        }
        Mutex::new(map)
    }

    #[test]
    fn test_reap_removes_due_entries() {
        let entries = store_with(vec![("a", Entry::new("x", Duration::from_millis(0), 1))]);

        let mut pending = Pending::new();
        let deadline = Instant::now();
        pending.insert(deadline, vec![("a".to_owned(), 1)]);

        reap(&entries, &mut pending, deadline);

        assert!(entries.lock().get("a").is_none());
        assert!(pending.is_empty());
    }

    #[test]
    fn test_reap_skips_mismatched_generation() {
        // the key was re-occupied by generation 2; the stale timer for
        // generation 1 must leave it alone.
        let entries = store_with(vec![("a", Entry::new("x", Duration::from_secs(60), 2))]);

        let mut pending = Pending::new();
        let deadline = Instant::now();
        pending.insert(deadline, vec![("a".to_owned(), 1)]);

        reap(&entries, &mut pending, deadline);

        assert!(entries.lock().get("a").is_some());
    }

    #[test]
    fn test_reap_ignores_absent_key() {
        let entries = store_with(vec![]);

        let mut pending = Pending::new();
        let deadline = Instant::now();
        pending.insert(deadline, vec![("gone".to_owned(), 1)]);

        reap(&entries, &mut pending, deadline);

        assert!(entries.lock().is_empty());
    }

    #[test]
    fn test_reap_leaves_future_slots() {
        let entries = store_with(vec![
            ("a", Entry::new("x", Duration::from_millis(0), 1)),
            ("b", Entry::new("y", Duration::from_secs(60), 2)),
        ]);

        let now = Instant::now();
        let mut pending = Pending::new();
        pending.insert(now, vec![("a".to_owned(), 1)]);
        pending.insert(now + Duration::from_secs(60), vec![("b".to_owned(), 2)]);

        reap(&entries, &mut pending, now);

        assert!(entries.lock().get("a").is_none());
        assert!(entries.lock().get("b").is_some());
        assert_eq!(pending.len(), 1);
    }
}
