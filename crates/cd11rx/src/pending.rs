//! Registry of files announced by manifests

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Files which have been announced but not yet processed
///
/// Maps each file name to the time a manifest *last* announced it.
/// Announcing a file which is already pending moves its time
/// forward; it does not create a second entry.
///
/// ```
/// use cd11rx::PendingFiles;
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let mut pending = PendingFiles::new();
/// pending.announce(["a.json", "b.json"], now - Duration::minutes(5));
/// pending.announce(["b.json"], now);
/// assert_eq!(2, pending.len());
///
/// let evicted = pending.evict_older_than(now - Duration::minutes(1));
/// assert_eq!(vec!["a.json".to_owned()], evicted);
/// assert_eq!(1, pending.len());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingFiles {
    files: HashMap<String, DateTime<Utc>>,
}

impl PendingFiles {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `names` were announced at `now`
    ///
    /// Each name is created or has its time overwritten.
    pub fn announce<I, S>(&mut self, names: I, now: DateTime<Utc>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.files.insert(name.into(), now);
        }
    }

    /// Remove and return all entries announced before `threshold`
    ///
    /// Entries announced exactly at `threshold` are kept. The
    /// returned names are sorted.
    pub fn evict_older_than(&mut self, threshold: DateTime<Utc>) -> Vec<String> {
        let mut evicted: Vec<String> = self
            .files
            .iter()
            .filter(|(_, announced)| **announced < threshold)
            .map(|(name, _)| name.clone())
            .collect();
        evicted.sort_unstable();

        for name in &evicted {
            self.files.remove(name);
        }
        evicted
    }

    /// Forget `name`, returning true if it was pending
    pub fn remove(&mut self, name: &str) -> bool {
        self.files.remove(name).is_some()
    }

    /// Time `name` was last announced, if it is pending
    pub fn last_announced(&self, name: &str) -> Option<DateTime<Utc>> {
        self.files.get(name).copied()
    }

    /// Pending names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut out: Vec<String> = self.files.keys().cloned().collect();
        out.sort_unstable();
        out
    }

    /// Number of pending files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_announce() {
        let mut pending = PendingFiles::new();
        assert!(pending.is_empty());

        pending.announce(vec!["a".to_owned(), "b".to_owned()], t0());
        assert_eq!(2, pending.len());
        assert_eq!(Some(t0()), pending.last_announced("a"));
        assert_eq!(Some(t0()), pending.last_announced("b"));
        assert_eq!(None, pending.last_announced("c"));

        // re-announcement is a last-seen clock
        let later = t0() + Duration::seconds(30);
        pending.announce(["a"], later);
        assert_eq!(2, pending.len());
        assert_eq!(Some(later), pending.last_announced("a"));
        assert_eq!(Some(t0()), pending.last_announced("b"));

        // duplicates within one announcement collapse
        pending.announce(["c", "c"], later);
        assert_eq!(vec!["a", "b", "c"], pending.names());
    }

    #[test]
    fn test_evict_older_than() {
        let mut pending = PendingFiles::new();
        pending.announce(["old"], t0());
        pending.announce(["edge"], t0() + Duration::seconds(10));
        pending.announce(["new", "newer"], t0() + Duration::seconds(20));

        assert!(pending.evict_older_than(t0()).is_empty());
        assert_eq!(4, pending.len());

        let evicted = pending.evict_older_than(t0() + Duration::seconds(10));
        assert_eq!(vec!["old".to_owned()], evicted);
        assert_eq!(vec!["edge", "new", "newer"], pending.names());

        let evicted = pending.evict_older_than(t0() + Duration::days(1));
        assert_eq!(vec!["edge", "new", "newer"], evicted);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut pending = PendingFiles::new();
        pending.announce(["a", "b"], t0());
        assert!(pending.remove("a"));
        assert!(!pending.remove("a"));
        assert_eq!(vec!["b"], pending.names());
    }
}
