//! Storage collaborator. Records are opaque serialized values addressed by `(type, id)` with a
//! map of string tags that searches match on.

use crate::error::WalletError;
use ark_std::collections::BTreeMap;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub type Tags = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub type_: String,
    pub id: String,
    pub value: String,
    pub tags: Tags,
}

impl WalletRecord {
    pub fn deserialize_value<T: DeserializeOwned>(&self) -> Result<T, WalletError> {
        Ok(serde_json::from_str(&self.value)?)
    }

    /// Whether every tag in `query` is present with the same value
    pub fn matches(&self, query: &Tags) -> bool {
        query.iter().all(|(k, v)| self.tags.get(k) == Some(v))
    }
}

pub type WalletSearch = Box<dyn Iterator<Item = WalletRecord> + Send>;

pub trait WalletStore: Send + Sync {
    /// Fails with `AlreadyExists` if a record with the same type and id is present
    fn put(&self, type_: &str, id: &str, value: &str, tags: &Tags) -> Result<(), WalletError>;

    fn get(&self, type_: &str, id: &str) -> Result<WalletRecord, WalletError>;

    /// Replace the value of an existing record, keeping its tags
    fn update(&self, type_: &str, id: &str, value: &str) -> Result<(), WalletError>;

    fn delete(&self, type_: &str, id: &str) -> Result<(), WalletError>;

    /// Records of the given type whose tags contain all of `query`
    fn search(&self, type_: &str, query: &Tags) -> Result<WalletSearch, WalletError>;

    fn put_json<T: Serialize>(
        &self,
        type_: &str,
        id: &str,
        value: &T,
        tags: &Tags,
    ) -> Result<(), WalletError>
    where
        Self: Sized,
    {
        self.put(type_, id, &serde_json::to_string(value)?, tags)
    }

    fn update_json<T: Serialize>(&self, type_: &str, id: &str, value: &T) -> Result<(), WalletError>
    where
        Self: Sized,
    {
        self.update(type_, id, &serde_json::to_string(value)?)
    }

    fn get_json<T: DeserializeOwned>(&self, type_: &str, id: &str) -> Result<T, WalletError>
    where
        Self: Sized,
    {
        self.get(type_, id)?.deserialize_value()
    }
}

/// Wallet kept in process memory
#[derive(Default, Debug)]
pub struct InMemoryWallet {
    records: RwLock<BTreeMap<(String, String), WalletRecord>>,
}

impl InMemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

fn key(type_: &str, id: &str) -> (String, String) {
    (type_.to_string(), id.to_string())
}

impl WalletStore for InMemoryWallet {
    fn put(&self, type_: &str, id: &str, value: &str, tags: &Tags) -> Result<(), WalletError> {
        let mut records = self.records.write();
        let k = key(type_, id);
        if records.contains_key(&k) {
            return Err(WalletError::AlreadyExists(type_.to_string(), id.to_string()));
        }
        records.insert(
            k,
            WalletRecord {
                type_: type_.to_string(),
                id: id.to_string(),
                value: value.to_string(),
                tags: tags.clone(),
            },
        );
        Ok(())
    }

    fn get(&self, type_: &str, id: &str) -> Result<WalletRecord, WalletError> {
        self.records
            .read()
            .get(&key(type_, id))
            .cloned()
            .ok_or_else(|| WalletError::ItemNotFound(type_.to_string(), id.to_string()))
    }

    fn update(&self, type_: &str, id: &str, value: &str) -> Result<(), WalletError> {
        match self.records.write().get_mut(&key(type_, id)) {
            Some(r) => {
                r.value = value.to_string();
                Ok(())
            }
            None => Err(WalletError::ItemNotFound(type_.to_string(), id.to_string())),
        }
    }

    fn delete(&self, type_: &str, id: &str) -> Result<(), WalletError> {
        self.records
            .write()
            .remove(&key(type_, id))
            .map(|_| ())
            .ok_or_else(|| WalletError::ItemNotFound(type_.to_string(), id.to_string()))
    }

    fn search(&self, type_: &str, query: &Tags) -> Result<WalletSearch, WalletError> {
        let found: Vec<WalletRecord> = self
            .records
            .read()
            .values()
            .filter(|r| r.type_ == type_ && r.matches(query))
            .cloned()
            .collect();
        Ok(Box::new(found.into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn crud() {
        let wallet = InMemoryWallet::new();
        assert!(wallet.is_empty());
        wallet.put("t", "1", "v1", &Tags::new()).unwrap();
        assert_eq!(wallet.get("t", "1").unwrap().value, "v1");
        assert_eq!(
            wallet.put("t", "1", "v2", &Tags::new()).unwrap_err(),
            WalletError::AlreadyExists("t".to_string(), "1".to_string())
        );
        // Same id under another type is a different record
        wallet.put("u", "1", "v3", &Tags::new()).unwrap();
        assert_eq!(wallet.len(), 2);

        wallet.update("t", "1", "v2").unwrap();
        assert_eq!(wallet.get("t", "1").unwrap().value, "v2");
        assert!(matches!(
            wallet.update("t", "2", "v"),
            Err(WalletError::ItemNotFound(..))
        ));

        wallet.delete("t", "1").unwrap();
        assert!(matches!(
            wallet.get("t", "1"),
            Err(WalletError::ItemNotFound(..))
        ));
        assert!(matches!(
            wallet.delete("t", "1"),
            Err(WalletError::ItemNotFound(..))
        ));
    }

    #[test]
    fn search_by_tags() {
        let wallet = InMemoryWallet::new();
        wallet
            .put("cred", "a", "1", &tags(&[("schema", "s1"), ("issuer", "i1")]))
            .unwrap();
        wallet
            .put("cred", "b", "2", &tags(&[("schema", "s1"), ("issuer", "i2")]))
            .unwrap();
        wallet
            .put("other", "c", "3", &tags(&[("schema", "s1")]))
            .unwrap();

        let all: Vec<_> = wallet.search("cred", &Tags::new()).unwrap().collect();
        assert_eq!(all.len(), 2);
        let s1: Vec<_> = wallet
            .search("cred", &tags(&[("schema", "s1")]))
            .unwrap()
            .map(|r| r.id)
            .collect();
        assert_eq!(s1, vec!["a".to_string(), "b".to_string()]);
        let i2: Vec<_> = wallet
            .search("cred", &tags(&[("schema", "s1"), ("issuer", "i2")]))
            .unwrap()
            .map(|r| r.id)
            .collect();
        assert_eq!(i2, vec!["b".to_string()]);
        assert_eq!(
            wallet
                .search("cred", &tags(&[("issuer", "i3")]))
                .unwrap()
                .count(),
            0
        );
    }

    #[test]
    fn json_values() {
        let wallet = InMemoryWallet::new();
        let value: BTreeMap<String, u32> = [("x".to_string(), 1u32)].into_iter().collect();
        wallet.put_json("map", "m", &value, &Tags::new()).unwrap();
        assert_eq!(
            wallet.get_json::<BTreeMap<String, u32>>("map", "m").unwrap(),
            value
        );
        wallet.put("map", "bad", "not json", &Tags::new()).unwrap();
        assert!(matches!(
            wallet.get_json::<BTreeMap<String, u32>>("map", "bad"),
            Err(WalletError::Serialization(_))
        ));
    }
}
