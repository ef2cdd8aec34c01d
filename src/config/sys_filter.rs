use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::version::compare_versions;
use crate::models::{DistroFamily, OsFamily, System};

/// System attribute a filter clause inspects
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FilterAttribute {
    SystemName,
    OsFamily,
    DistroFamily,
    Producer,
    ProducerVersion,
}

impl FilterAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterAttribute::SystemName => "system_name",
            FilterAttribute::OsFamily => "os_family",
            FilterAttribute::DistroFamily => "distro_family",
            FilterAttribute::Producer => "producer",
            FilterAttribute::ProducerVersion => "producer_version",
        }
    }

    /// Value of this attribute on a system; `None` when the system has none
    pub fn value_of<'a>(&self, system: &'a System) -> Option<&'a str> {
        match self {
            FilterAttribute::SystemName => Some(system.system_name.as_str()),
            FilterAttribute::OsFamily => Some(system.os_family.as_str()),
            FilterAttribute::DistroFamily => system.distro_family.map(|d| d.as_str()),
            FilterAttribute::Producer => Some(system.producer.as_str()),
            FilterAttribute::ProducerVersion => Some(system.producer_version.as_str()),
        }
    }
}

/// Comparison operator of a filter clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

impl Comparator {
    pub fn is_ordered(&self) -> bool {
        !matches!(self, Comparator::Eq | Comparator::Ne)
    }

    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Comparator::Eq => ordering == Ordering::Equal,
            Comparator::Ne => ordering != Ordering::Equal,
            Comparator::Ge => ordering != Ordering::Less,
            Comparator::Le => ordering != Ordering::Greater,
            Comparator::Gt => ordering == Ordering::Greater,
            Comparator::Lt => ordering == Ordering::Less,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Lt => "<",
        }
    }
}

impl FromStr for Comparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "==" | "=" | "eq" => Ok(Comparator::Eq),
            "!=" | "<>" | "ne" => Ok(Comparator::Ne),
            ">=" | "ge" => Ok(Comparator::Ge),
            "<=" | "le" => Ok(Comparator::Le),
            ">" | "gt" => Ok(Comparator::Gt),
            "<" | "lt" => Ok(Comparator::Lt),
            other => Err(format!("unknown comparison operator '{}'", other)),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for Comparator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for Comparator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One `(attribute, comparison, value)` eligibility clause
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SystemFilterClause {
    pub attribute: FilterAttribute,
    #[serde(alias = "comparator", alias = "operator")]
    pub comparison: Comparator,
    #[serde(deserialize_with = "scalar_string")]
    pub value: String,
}

impl SystemFilterClause {
    pub fn new(attribute: FilterAttribute, comparison: Comparator, value: &str) -> Self {
        Self {
            attribute,
            comparison,
            value: value.to_string(),
        }
    }

    /// Evaluate the clause against a system.
    ///
    /// Ordered comparisons and any comparison on `producer_version` use
    /// dotted-version semantics; the rest compare case-insensitively. A
    /// missing attribute only satisfies `!=`.
    pub fn matches(&self, system: &System) -> bool {
        let Some(actual) = self.attribute.value_of(system) else {
            return self.comparison == Comparator::Ne;
        };

        let expected = self.normalized_value();
        let ordering = if self.comparison.is_ordered()
            || self.attribute == FilterAttribute::ProducerVersion
        {
            compare_versions(actual, &expected)
        } else {
            actual.to_lowercase().cmp(&expected.to_lowercase())
        };

        self.comparison.accepts(ordering)
    }

    /// Canonical spelling of family values so `macOS` matches `Darwin`
    fn normalized_value(&self) -> Cow<'_, str> {
        match self.attribute {
            FilterAttribute::OsFamily => OsFamily::parse(&self.value)
                .map(|f| Cow::Borrowed(f.as_str()))
                .unwrap_or(Cow::Borrowed(self.value.as_str())),
            FilterAttribute::DistroFamily => DistroFamily::from_token(&self.value)
                .map(|d| Cow::Borrowed(d.as_str()))
                .unwrap_or(Cow::Borrowed(self.value.as_str())),
            _ => Cow::Borrowed(self.value.as_str()),
        }
    }
}

impl fmt::Display for SystemFilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.attribute.as_str(), self.comparison, self.value)
    }
}

/// True when the system passes every clause (AND semantics; empty passes)
pub fn passes_all(clauses: &[SystemFilterClause], system: &System) -> bool {
    clauses.iter().all(|clause| clause.matches(system))
}

/// Accept YAML strings, numbers and booleans as a string value
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a scalar filter value, found {:?}",
            other
        ))),
    }
}
