//! Typed binding of a whole configuration section.
//!
//! A [`ConfigurationProperties`] names the prefix a Rust type is bound
//! from and how strict binding is about bad or leftover values.

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::bind::{
    BindHandler, Bindable, Binder, DefaultBindHandler, IgnoreErrorsBindHandler, NoUnboundElementsBindHandler,
    deserialize, serialize,
};
use crate::model::Describe;
use crate::name::PropertyName;
use crate::Result;

/// Where and how strictly a configuration type is bound.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigurationProperties {
    /// Root name of the section; empty binds from the top.
    pub prefix: String,
    /// Replace values that fail to bind with their defaults instead of
    /// failing.
    pub ignore_invalid_fields: bool,
    /// Accept names below the prefix that no field consumed.
    pub ignore_unknown_fields: bool,
}

impl Default for ConfigurationProperties {
    fn default() -> Self {
        Self { prefix: String::new(), ignore_invalid_fields: false, ignore_unknown_fields: true }
    }
}

impl ConfigurationProperties {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), ..Self::default() }
    }

    pub fn ignore_invalid_fields(mut self, ignore: bool) -> Self {
        self.ignore_invalid_fields = ignore;
        self
    }

    pub fn ignore_unknown_fields(mut self, ignore: bool) -> Self {
        self.ignore_unknown_fields = ignore;
        self
    }

    /// The handler chain these settings call for.
    pub fn handler(&self) -> Box<dyn BindHandler> {
        let mut handler: Box<dyn BindHandler> = Box::new(DefaultBindHandler);
        if self.ignore_invalid_fields {
            handler = Box::new(IgnoreErrorsBindHandler::new(handler));
        }
        if !self.ignore_unknown_fields {
            handler = Box::new(NoUnboundElementsBindHandler::new(handler));
        }
        handler
    }

    fn name(&self) -> Result<PropertyName> {
        Ok(PropertyName::parse(self.prefix.trim())?)
    }

    /// Bind a `T`, default-constructing whatever no source mentions.
    pub fn bind<T: Describe + DeserializeOwned>(&self, binder: &Binder) -> Result<T> {
        let name = self.name()?;
        let handler = self.handler();
        tracing::debug!(prefix = %name, "binding configuration properties");
        let value = binder.bind_or_create_with_handler(&name, &Bindable::of_type::<T>(), &*handler)?;
        deserialize(&name, value)
    }

    /// Bind onto a copy of `existing`.
    pub fn bind_into<T>(&self, binder: &Binder, existing: &T) -> Result<T>
    where
        T: Describe + Serialize + DeserializeOwned,
    {
        let name = self.name()?;
        let handler = self.handler();
        let target = Bindable::of_type::<T>().with_existing(serialize(&name, existing)?);
        let value = binder.bind_or_create_with_handler(&name, &target, &*handler)?;
        deserialize(&name, value)
    }
}

/// Bind the section `properties` describes into a `T`.
pub fn bind_configuration<T: Describe + DeserializeOwned>(binder: &Binder, properties: &ConfigurationProperties) -> Result<T> {
    properties.bind(binder)
}
