//! Retort Core - provider-based data morphing and conversion engine
//!
//! Given a type, a retort synthesises a *loader* turning untyped data into
//! a model value, a *dumper* turning the model value back into untyped
//! data, and *converters* mapping one model into another.
//!
//! # Main Components
//!
//! - **Types**: type expressions, class declarations and their normal form
//! - **Shapes**: how a model is constructed and read, from introspectors
//! - **Predicates**: routing of providers to locations
//! - **Mediator**: the request bus walking the recipe
//! - **Name layout**: mapping between field ids and wire keys or paths
//! - **Morphing**: loaders and dumpers for every supported type
//! - **Conversion**: coercers, linkings and converters
//!
//! # Example
//!
//! ```no_run
//! use retort_core::{types::{ClassDef, TypeExpr}, Result, Retort, Value};
//!
//! fn example() -> Result<()> {
//!     let book = ClassDef::record("Book")
//!         .field("title", TypeExpr::str())
//!         .field("price", TypeExpr::int())
//!         .build();
//!     let retort = Retort::new();
//!     let model = retort.load_json(r#"{"title": "F451", "price": 100}"#, &book)?;
//!     let data = retort.dump(&model, &book)?;
//!     assert_eq!(data.get_item("price"), Some(&Value::Int(100)));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod conversion;
pub mod error;
pub mod facade;
pub mod introspection;
pub mod location;
pub mod morphing;
pub mod name_layout;
pub mod predicate;
pub mod provider;
pub mod retort;
pub mod shape;
pub mod types;
pub mod value;

// Re-export main types for convenience
pub use config::RetortConfig;
pub use error::{Error, Result};
pub use retort::{builtin_recipe, Retort};
pub use value::{EnumValue, Instance, Value};

pub use conversion::{
    allow_unlinked_optional, bind, coercer, forbid_unlinked_optional, from_param, link, link_constant,
    link_constant_factory, link_function, ConversionError, Converter, ConverterBuilder, LinkFunction,
};
pub use facade::{bound, constructor, name_mapping, with_property};
pub use morphing::{
    as_is_dumper, as_is_loader, datetime_by_format, datetime_by_timestamp, dumper, enum_by_exact_value,
    enum_by_name, enum_by_value, loader, validator, DebugTrail, DumpError, Dumper, LoadError, Loader,
};
pub use name_layout::{ExtraIn, ExtraOut, NameMapEntry, NameMappingProvider, NameStyle};
pub use predicate::{LocStackChecker, P};
pub use provider::{Chain, Provider, Recipe};
pub use types::{ClassDef, ClassRef, Namespace, TypeExpr};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
