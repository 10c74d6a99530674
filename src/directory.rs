//! Name resolution: `register(name, address)`, `lookup(name) -> address`,
//! `list(prefix) -> [(name, address)]`. The real directory is an
//! external collaborator; this trait is the seam a production
//! deployment plugs a real name service into. [`InMemoryDirectory`] backs
//! tests and single-process demos.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{CoreError, CoreResult};

pub trait Directory: Send + Sync {
    fn register(&self, name: &str, address: &str) -> CoreResult<()>;
    fn lookup(&self, name: &str) -> CoreResult<String>;
    fn list(&self, prefix: &str) -> CoreResult<Vec<(String, String)>>;
}

#[derive(Default)]
pub struct InMemoryDirectory {
    entries: Mutex<BTreeMap<String, String>>,
}

impl InMemoryDirectory {
    pub fn new() -> InMemoryDirectory {
        InMemoryDirectory::default()
    }

    /// `mapreduce.node.<NodeId>`, the stable symbolic name a node
    /// registers itself under.
    pub fn node_name(id: &crate::identity::NodeId) -> String {
        format!("mapreduce.node.{}", id)
    }
}

impl Directory for InMemoryDirectory {
    fn register(&self, name: &str, address: &str) -> CoreResult<()> {
        self.entries
            .lock()
            .map_err(|_| CoreError::Internal("directory lock poisoned".into()))?
            .insert(name.to_string(), address.to_string());
        Ok(())
    }

    fn lookup(&self, name: &str) -> CoreResult<String> {
        self.entries
            .lock()
            .map_err(|_| CoreError::Internal("directory lock poisoned".into()))?
            .get(name)
            .cloned()
            .ok_or(CoreError::KeyNotFound)
    }

    fn list(&self, prefix: &str) -> CoreResult<Vec<(String, String)>> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| CoreError::Internal("directory lock poisoned".into()))?
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, address)| (name.clone(), address.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup_round_trips() {
        let dir = InMemoryDirectory::new();
        dir.register("mapreduce.node.abc", "127.0.0.1:5601").unwrap();
        assert_eq!(dir.lookup("mapreduce.node.abc").unwrap(), "127.0.0.1:5601");
    }

    #[test]
    fn lookup_missing_name_is_key_not_found() {
        let dir = InMemoryDirectory::new();
        assert!(matches!(dir.lookup("nope"), Err(CoreError::KeyNotFound)));
    }

    #[test]
    fn list_filters_by_prefix() {
        let dir = InMemoryDirectory::new();
        dir.register("mapreduce.node.a", "a:1").unwrap();
        dir.register("mapreduce.node.b", "b:1").unwrap();
        dir.register("other.c", "c:1").unwrap();
        let matches = dir.list("mapreduce.node.").unwrap();
        assert_eq!(matches.len(), 2);
    }
}
