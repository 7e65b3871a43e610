//! Identifier types used within a [crate::param::Parameter].
//!
//! These have value validation, so their inner value is private.


use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
#[error("got {value:?} which is not {expected}")]
pub struct ValueError<V> {
    pub value: V,
    pub expected: &'static str,
}

/// Display name of a [crate::param::Parameter], unique within a [crate::form::Form].
///
/// Scripts see the values of referenced parameters as variables of this name, so it must be a
/// plain identifier.
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ParameterName(String);

impl ParameterName {
    const EXPECTED: &str = r#"a parameter name matching ^[a-zA-Z_][a-zA-Z0-9_]*$"#;

    #[cfg(any(test, feature = "testing"))]
    pub fn test_name(s: &str) -> Self {
        s.to_string()
            .try_into()
            .expect("expected valid ParameterName value")
    }

    fn valid_regex() -> &'static lazy_regex::Regex {
        lazy_regex::regex!(r#"^[a-zA-Z_][a-zA-Z0-9_]*$"#)
    }

    fn try_from_string<S>(value: S) -> std::result::Result<Self, S>
    where
        S: Into<String> + AsRef<str>,
    {
        if Self::valid_regex().is_match(value.as_ref()) {
            Ok(Self(value.into()))
        } else {
            Err(value)
        }
    }

    #[cfg(test)]
    fn new_unchecked(value: String) -> Self {
        Self(value)
    }
}

impl From<&ParameterName> for ParameterName {
    fn from(value: &ParameterName) -> Self {
        value.clone()
    }
}

impl TryFrom<&str> for ParameterName {
    type Error = ValueError<String>;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from_string(value).map_err(|value| ValueError {
            value: value.to_string(),
            expected: Self::EXPECTED,
        })
    }
}

impl TryFrom<String> for ParameterName {
    type Error = ValueError<String>;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from_string(value).map_err(|value| ValueError {
            value,
            expected: Self::EXPECTED,
        })
    }
}

impl<'de> Deserialize<'de> for ParameterName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        Self::try_from_string(s).map_err(|s| {
            serde::de::Error::invalid_value(serde::de::Unexpected::Str(&s), &Self::EXPECTED)
        })
    }
}

impl AsRef<str> for ParameterName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ParameterName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ParameterName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.0, f)
    }
}

impl std::fmt::Display for ParameterName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a comma separated list of parameter names, as authored in a parameter's
/// `referenced_parameters` field.
///
/// Whitespace around names and empty entries are ignored. Repeated names are kept once, at their
/// first position.
pub fn parse_name_list(value: &str) -> Result<Vec<ParameterName>, ValueError<String>> {
    let mut names: Vec<ParameterName> = Vec::new();
    for part in value.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let name = ParameterName::try_from(part)?;
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(names)
}

/// Randomly generated, stable identifier of a [crate::param::Parameter].
///
/// The UI binds form elements to this rather than to the display name, so it is created once per
/// parameter and then persisted with its configuration.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct RandomName(String);

impl RandomName {
    const PREFIX: &str = "choice-parameter";
    const EXPECTED: &str = "a non-blank random name";

    /// Generates a new random name.
    pub fn generate() -> Self {
        Self(format!("{}-{}", Self::PREFIX, uuid::Uuid::new_v4().simple()))
    }

    /// Keeps `existing` if it is given and not blank, otherwise generates a new random name.
    pub fn existing_or_generate(existing: Option<&str>) -> Self {
        match existing.map(str::trim) {
            Some(existing) if !existing.is_empty() => Self(existing.to_string()),
            _ => Self::generate(),
        }
    }
}

impl TryFrom<String> for RandomName {
    type Error = ValueError<String>;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            Err(ValueError {
                value,
                expected: Self::EXPECTED,
            })
        } else {
            Ok(Self(value))
        }
    }
}

impl<'de> Deserialize<'de> for RandomName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        Self::try_from(s).map_err(|err| {
            serde::de::Error::invalid_value(serde::de::Unexpected::Str(&err.value), &Self::EXPECTED)
        })
    }
}

impl AsRef<str> for RandomName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
