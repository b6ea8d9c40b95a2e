//! # propbind: Typed Binding of Hierarchical Configuration
//!
//! Binds flat, dotted configuration (`app.servers[0].port=8080`) from an
//! ordered list of sources into typed values: scalars, collections, maps and
//! composite objects built through constructors or field by field.
//!
//! ## Design Principles
//!
//! 1. **Names are values**: `PropertyName` parses once, compares leniently
//!    (`fooBar` == `foo-bar`) and orders indexes numerically
//! 2. **Trait-first sources**: `PropertySource` is the contract between the
//!    binder and wherever configuration lives
//! 3. **Shape-driven binding**: targets are described by a `Shape`, the
//!    binder never reflects on Rust types
//! 4. **Not found is not an error**: missing configuration is `Ok(None)`
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use propbind::{Bindable, Binder, MapPropertySource, PropertySource, Value};
//!
//! # fn example() -> propbind::Result<()> {
//! let source = MapPropertySource::new("defaults")
//!     .with("app.ports[0]", "8080")
//!     .with("app.ports[1]", "8443");
//! let binder = Binder::new([Arc::new(source) as Arc<dyn PropertySource>]);
//!
//! let ports = binder.bind("app.ports", &Bindable::of_type::<Vec<u16>>())?;
//! assert_eq!(ports, Some(Value::from(vec![8080, 8443])));
//!
//! let typed: Option<Vec<u16>> = binder.bind_as("app.ports")?;
//! assert_eq!(typed, Some(vec![8080, 8443]));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Sources
//!
//! | Source | Description |
//! |--------|-------------|
//! | `MapPropertySource` | In-memory, iterable |
//! | `FilteredSource` | Hides names rejected by a predicate |
//! | `AliasedSource` | Resolves alternate names |
//! | `PrefixedSource` | Relocates lookups under a prefix |

// ============================================================================
// Modules
// ============================================================================

pub mod name;
pub mod model;
pub mod source;
pub mod bind;
pub mod properties;

// ============================================================================
// Re-exports: Names and model
// ============================================================================

pub use name::{ElementKind, Form, InvalidNameError, PropertyName};

pub use model::{
    CompositeKind, CompositeShape, Constructor, Describe, DescribeKey,
    ParamDefault, Parameter, Property, ScalarKind, Shape, Value,
};

// ============================================================================
// Re-exports: Sources
// ============================================================================

pub use source::{
    AliasedSource, DescendantState, FilteredSource, MapPropertySource,
    PrefixedSource, PropertyNameAliases, PropertySource, PropertySourceExt,
};

// ============================================================================
// Re-exports: Binding
// ============================================================================

pub use bind::{
    BindContext, BindError, BindHandler, BindMethod, BindRestriction, Bindable,
    Binder, BinderOptions, ConversionFailure, Converter, DefaultBindHandler,
    DefaultConverter, IgnoreErrorsBindHandler, NoUnboundElementsBindHandler,
};

pub use properties::{ConfigurationProperties, bind_configuration};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),

    #[error("Failed to bind '{name}': {source}")]
    Bind { name: PropertyName, source: BindError },
}

pub type Result<T> = std::result::Result<T, Error>;
