//! Ordered, duplicate-free list of result columns.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Ordered set of field names.
///
/// Defines both the `fields` parameter sent to the search API and the
/// column order of every normalized asset table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FieldSet(Vec<String>);

impl FieldSet {
    /// Build a field set, rejecting blank and repeated names.
    pub fn new<I, S>(names: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(Error::InvalidInput("field names must not be blank".into()));
            }
            if fields.contains(&name) {
                return Err(Error::InvalidInput(format!("duplicate field: {name}")));
            }
            fields.push(name);
        }
        Ok(Self(fields))
    }

    /// An empty field set.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|f| f == name)
    }

    /// Comma-joined names, as the API expects them.
    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

impl TryFrom<Vec<String>> for FieldSet {
    type Error = Error;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<FieldSet> for Vec<String> {
    fn from(fields: FieldSet) -> Self {
        fields.0
    }
}
