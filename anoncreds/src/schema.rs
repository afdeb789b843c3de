use crate::{
    constants::{MASTER_SECRET, MAX_ATTRIBUTES},
    encoding::attr_common_view,
    error::CredentialError,
};
use ark_std::collections::BTreeSet;
use serde::{Deserialize, Serialize};

/// Ordered set of attribute names of a schema
pub type AttributeNames = BTreeSet<String>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub id: String,
    pub name: String,
    pub version: String,
    pub attr_names: AttributeNames,
}

impl Schema {
    /// Attribute names must be non-empty, unique after normalization and must not collide with
    /// the master secret.
    pub fn new(
        issuer_did: &str,
        name: &str,
        version: &str,
        attr_names: &[&str],
    ) -> Result<Self, CredentialError> {
        if attr_names.is_empty() {
            return Err(CredentialError::InvalidSchema(
                "no attribute names".to_string(),
            ));
        }
        if attr_names.len() > MAX_ATTRIBUTES {
            return Err(CredentialError::InvalidSchema(format!(
                "more than {} attributes",
                MAX_ATTRIBUTES
            )));
        }
        let mut common = BTreeSet::new();
        for attr in attr_names {
            if attr.is_empty() {
                return Err(CredentialError::InvalidSchema(
                    "empty attribute name".to_string(),
                ));
            }
            let view = attr_common_view(attr);
            // Separators are ignored so no spelling of the link secret gets through
            if view.replace('_', "") == MASTER_SECRET.replace('_', "") {
                return Err(CredentialError::InvalidSchema(format!(
                    "{} is a reserved attribute name",
                    attr
                )));
            }
            if !common.insert(view) {
                return Err(CredentialError::InvalidSchema(format!(
                    "duplicate attribute name {}",
                    attr
                )));
            }
        }
        Ok(Self {
            id: schema_id(issuer_did, name, version),
            name: name.to_string(),
            version: version.to_string(),
            attr_names: attr_names.iter().map(|a| a.to_string()).collect(),
        })
    }

    /// Schema attribute matching a requested name after normalization
    pub fn find_attribute(&self, requested: &str) -> Option<&str> {
        let view = attr_common_view(requested);
        self.attr_names
            .iter()
            .find(|a| attr_common_view(a) == view)
            .map(|a| a.as_str())
    }
}

pub fn schema_id(issuer_did: &str, name: &str, version: &str) -> String {
    format!("{}:2:{}:{}", issuer_did, name, version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::test_serialization;

    #[test]
    fn schema_validation() {
        let schema = Schema::new("NcYxiDXkpYi6ov5FcYDi1e", "gvt", "1.0", &["name", "age"]).unwrap();
        assert_eq!(schema.id, "NcYxiDXkpYi6ov5FcYDi1e:2:gvt:1.0");
        assert_eq!(
            schema.attr_names.iter().collect::<Vec<_>>(),
            vec!["age", "name"]
        );
        assert_eq!(schema.find_attribute("Name"), Some("name"));
        assert_eq!(schema.find_attribute("height"), None);
        test_serialization!(Schema, schema);

        for bad in [
            vec![],
            vec!["name", "Name"],
            vec!["name", ""],
            vec!["master_secret"],
            vec!["Master Secret"],
            vec!["name", "Master_Secret"],
        ] {
            assert!(matches!(
                Schema::new("did", "gvt", "1.0", &bad),
                Err(CredentialError::InvalidSchema(_))
            ));
        }
        let many = (0..=MAX_ATTRIBUTES).map(|i| format!("a{}", i)).collect::<Vec<_>>();
        let many = many.iter().map(|s| s.as_str()).collect::<Vec<_>>();
        assert!(Schema::new("did", "big", "1.0", &many).is_err());
        assert!(Schema::new("did", "big", "1.0", &many[1..]).is_ok());
    }
}
