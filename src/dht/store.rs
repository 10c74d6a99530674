use std::collections::HashMap;
use std::sync::Mutex;

use crate::identity::NodeId;

const SHARD_COUNT: usize = 32;

#[derive(Clone, Debug)]
pub struct Entry {
    pub value: Vec<u8>,
    pub version: u64,
    /// Originating node's id, used to break version ties.
    pub originator: NodeId,
}

/// Local key/value storage for one node's DHT shard. Sharded by key hash
/// into independent locks so a reader of one key never blocks a writer of
/// another.
pub struct Store {
    shards: Vec<Mutex<HashMap<Vec<u8>, Entry>>>,
}

impl Store {
    pub fn new() -> Store {
        let mut shards = Vec::with_capacity(SHARD_COUNT);
        for _ in 0..SHARD_COUNT {
            shards.push(Mutex::new(HashMap::new()));
        }
        Store { shards }
    }

    fn shard_for(&self, key: &[u8]) -> &Mutex<HashMap<Vec<u8>, Entry>> {
        let idx = (blake3::hash(key).as_bytes()[0] as usize) % self.shards.len();
        &self.shards[idx]
    }

    pub fn get(&self, key: &[u8]) -> Option<Entry> {
        self.shard_for(key).lock().unwrap().get(key).cloned()
    }

    /// Accepts the write only if `entry.version` is strictly greater than
    /// any stored version, ties broken by originator `NodeId`. Returns
    /// `true` if applied.
    pub fn put_if_newer(&self, key: Vec<u8>, entry: Entry) -> bool {
        let mut shard = self.shard_for(&key).lock().unwrap();
        let accept = match shard.get(&key) {
            None => true,
            Some(existing) => {
                entry.version > existing.version
                    || (entry.version == existing.version && entry.originator > existing.originator)
            }
        };
        if accept {
            shard.insert(key, entry);
        }
        accept
    }

    /// Local primary write: allocates the next monotonic version for
    /// `key` and stores it unconditionally.
    pub fn put_local(&self, key: Vec<u8>, value: Vec<u8>, originator: NodeId) -> Entry {
        let mut shard = self.shard_for(&key).lock().unwrap();
        let next_version = shard.get(&key).map(|e| e.version + 1).unwrap_or(1);
        let entry = Entry {
            value,
            version: next_version,
            originator,
        };
        shard.insert(key, entry.clone());
        entry
    }

    pub fn delete(&self, key: &[u8]) -> bool {
        self.shard_for(key).lock().unwrap().remove(key).is_some()
    }

    pub fn keys_with_prefix(&self, prefix: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        for shard in &self.shards {
            let guard = shard.lock().unwrap();
            out.extend(guard.keys().filter(|k| k.starts_with(prefix)).cloned());
        }
        out
    }

    pub fn entries_with_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Entry)> {
        let mut out = Vec::new();
        for shard in &self.shards {
            let guard = shard.lock().unwrap();
            out.extend(
                guard
                    .iter()
                    .filter(|(k, _)| k.starts_with(prefix))
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }
        out
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().unwrap().len()).sum()
    }

    pub fn bytes_used_with_prefix(&self, prefix: &[u8]) -> u64 {
        self.entries_with_prefix(prefix)
            .iter()
            .map(|(k, e)| (k.len() + e.value.len()) as u64)
            .sum()
    }
}

impl Default for Store {
    fn default() -> Store {
        Store::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let store = Store::new();
        let id = NodeId::of(b"n");
        let entry = store.put_local(b"k".to_vec(), b"v".to_vec(), id);
        assert_eq!(entry.version, 1);
        let got = store.get(b"k").unwrap();
        assert_eq!(got.value, b"v");
    }

    #[test]
    fn put_local_increments_version_monotonically() {
        let store = Store::new();
        let id = NodeId::of(b"n");
        store.put_local(b"k".to_vec(), b"v1".to_vec(), id);
        let second = store.put_local(b"k".to_vec(), b"v2".to_vec(), id);
        assert_eq!(second.version, 2);
    }

    #[test]
    fn stale_version_is_rejected() {
        let store = Store::new();
        let id = NodeId::of(b"n");
        store.put_if_newer(
            b"k".to_vec(),
            Entry {
                value: b"new".to_vec(),
                version: 5,
                originator: id,
            },
        );
        let accepted = store.put_if_newer(
            b"k".to_vec(),
            Entry {
                value: b"stale".to_vec(),
                version: 3,
                originator: id,
            },
        );
        assert!(!accepted);
        assert_eq!(store.get(b"k").unwrap().value, b"new");
    }

    #[test]
    fn tied_version_breaks_on_originator_id() {
        let store = Store::new();
        let low = NodeId::of(b"a");
        let high = NodeId::of(b"zzzzzzzzzzzzzzz");
        let (low, high) = if low < high { (low, high) } else { (high, low) };

        store.put_if_newer(
            b"k".to_vec(),
            Entry {
                value: b"from-low".to_vec(),
                version: 1,
                originator: low,
            },
        );
        let accepted = store.put_if_newer(
            b"k".to_vec(),
            Entry {
                value: b"from-high".to_vec(),
                version: 1,
                originator: high,
            },
        );
        assert!(accepted);
        assert_eq!(store.get(b"k").unwrap().value, b"from-high");
    }

    #[test]
    fn delete_removes_the_key() {
        let store = Store::new();
        let id = NodeId::of(b"n");
        store.put_local(b"k".to_vec(), b"v".to_vec(), id);
        assert!(store.delete(b"k"));
        assert!(store.get(b"k").is_none());
    }

    #[test]
    fn keys_with_prefix_filters_correctly() {
        let store = Store::new();
        let id = NodeId::of(b"n");
        store.put_local(b"job/1/a".to_vec(), b"x".to_vec(), id);
        store.put_local(b"job/1/b".to_vec(), b"y".to_vec(), id);
        store.put_local(b"job/2/a".to_vec(), b"z".to_vec(), id);
        let keys = store.keys_with_prefix(b"job/1/");
        assert_eq!(keys.len(), 2);
    }
}
