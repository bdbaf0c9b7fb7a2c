use crate::error::ScheduleError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Namespace assumed when an identifier is written without one.
pub const DEFAULT_NAMESPACE: &str = "railsched";

// ---------------------------------------------------------------------------
// Identifier
// ---------------------------------------------------------------------------

/// Stable namespaced name of a registered instruction or condition kind,
/// persisted in schedule data and used for registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    namespace: String,
    path: String,
}

impl Identifier {
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
        }
    }

    /// An identifier in the crate's own namespace.
    pub fn local(path: impl Into<String>) -> Self {
        Self::new(DEFAULT_NAMESPACE, path)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Translation key consumed by the localization layer, e.g.
    /// `railsched.schedule.instruction.destination`.
    pub fn lang_key(&self, section: &str) -> String {
        format!("{}.schedule.{}.{}", self.namespace, section, self.path)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for Identifier {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, path) = match s.split_once(':') {
            Some((ns, p)) => (ns, p),
            None => (DEFAULT_NAMESPACE, s),
        };
        let malformed = namespace.is_empty()
            || path.is_empty()
            || path.contains(':')
            || namespace.contains(char::is_whitespace)
            || path.contains(char::is_whitespace);
        if malformed {
            return Err(ScheduleError::InvalidIdentifier(s.to_string()));
        }
        Ok(Identifier::new(namespace, path))
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_roundtrip() {
        let id = Identifier::new("addonmod", "launch");
        assert_eq!(id.to_string(), "addonmod:launch");
        let parsed: Identifier = "addonmod:launch".parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn bare_path_takes_default_namespace() {
        let parsed: Identifier = "delay".parse().unwrap();
        assert_eq!(parsed, Identifier::local("delay"));
        assert_eq!(parsed.namespace(), DEFAULT_NAMESPACE);
    }

    #[test]
    fn rejects_malformed_text() {
        for bad in [":", "a:", ":b", "", "a:b:c", "a b", "ns:p th"] {
            assert!(
                bad.parse::<Identifier>().is_err(),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn lang_key_shape() {
        let id = Identifier::local("delay");
        assert_eq!(id.lang_key("condition"), "railsched.schedule.condition.delay");
        let id = Identifier::local("destination");
        assert_eq!(
            id.lang_key("instruction"),
            "railsched.schedule.instruction.destination"
        );
    }

    #[test]
    fn serde_as_string() {
        let id = Identifier::local("powered");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"railsched:powered\"");
        let parsed: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
