use super::PackageManager;
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};
use url::form_urlencoded::byte_serialize;

/// A package URL of the form `manager:namespace/name@version`.
///
/// Namespace and name are form-URL-escaped. For scoped ecosystems the escaped
/// namespace carries a leading `@`. Used as the deduplication key while selecting
/// dependencies and as the literal value stored in edge sets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Purl(String);

impl Purl {
    #[must_use]
    pub fn encode(manager: PackageManager, namespace: &str, name: &str, version: &str) -> Self {
        let namespace: String = byte_serialize(namespace.as_bytes()).collect();
        let name: String = byte_serialize(name.as_bytes()).collect();
        let scope = if manager.is_scoped() { "@" } else { "" };

        Self(format!("{manager}:{scope}{namespace}/{name}@{version}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Purl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Purl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
