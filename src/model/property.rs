//! A value looked up from a source, together with where it came from.

use std::fmt;

use serde::Serialize;

use super::Value;
use crate::name::PropertyName;

/// A single resolved configuration property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: PropertyName,
    pub value: Value,
    /// Human readable location, e.g. `application config [server.port]`.
    pub origin: Option<String>,
}

impl Property {
    pub fn new(name: PropertyName, value: impl Into<Value>) -> Self {
        Self { name, value: value.into(), origin: None }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// The same value and origin, reported under another name.
    pub fn renamed(self, name: PropertyName) -> Self {
        Self { name, ..self }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(origin) = &self.origin {
            write!(f, " ({origin})")?;
        }
        Ok(())
    }
}
