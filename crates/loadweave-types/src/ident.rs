// Identifier types
//
// `UnitId` names one in-flight (or completed) load in the environment's
// ID namespace. `CorrelationTag` is the side-channel tag attached to an
// issued request so an environment-wide failure observer can route a
// failure back to the exact pending unit it belongs to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Environment-wide unique identifier for a single load unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        UnitId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UnitId {
    fn from(id: &str) -> Self {
        UnitId::new(id)
    }
}

/// Non-owning back-reference from an issued request to its pending unit.
///
/// Holds the list name and the unit's position within that list, never
/// the unit itself, so no cyclic ownership arises between the failure
/// observer and the lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationTag {
    pub list: String,
    pub index: usize,
}

impl CorrelationTag {
    pub fn new(list: impl Into<String>, index: usize) -> Self {
        Self {
            list: list.into(),
            index,
        }
    }
}

impl fmt::Display for CorrelationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.list, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_id_display() {
        let id = UnitId::new("ld_0042");
        assert_eq!(id.as_str(), "ld_0042");
        assert_eq!(id.to_string(), "ld_0042");
    }

    #[test]
    fn test_tag_identity() {
        let a = CorrelationTag::new("scripts", 3);
        let b = CorrelationTag::new("scripts", 3);
        let c = CorrelationTag::new("scripts", 4);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "scripts[3]");
    }
}
