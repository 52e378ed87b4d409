//! Catalog walker and dataset metadata for the datos.gob.es API.
//!
//! [`Catalog`] pages through the dataset listing and the title search,
//! yielding [`Dataset`]s whose [`Distribution`]s can be handed to a
//! [`datos_core::Resolver`].
//!
//! # Example
//!
//! ```no_run
//! use datos_config::Config;
//! use datos_core::Resolver;
//! use datos_registry::Catalog;
//!
//! fn first_csv() -> datos_registry::Result<()> {
//!     let config = Config::new().unwrap_or_default();
//!     let catalog = Catalog::from_config(&config)?;
//!     let resolver = Resolver::from_config(&config);
//!
//!     for dataset in catalog.search_datasets("paro", 0, Some(1))? {
//!         if let Some(dist) = dataset.distributions_by_format("text/csv").first() {
//!             println!("{dataset}: {:?}", dist.data(&resolver));
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod dataset;
pub mod error;
pub mod metadata;

pub use catalog::Catalog;
pub use dataset::Dataset;
pub use error::{RegistryError, Result};
pub use metadata::{DatasetMetadata, Distribution, LangValue};
