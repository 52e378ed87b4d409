//! Content resolution for catalog distributions.
//!
//! Given a distribution's access URL and its declared content-type, the
//! [`Resolver`] decides how to materialize the resource: streamed into a file,
//! decoded into a [`Table`], or handed back as raw bytes. Every failure is
//! contained and reported as [`Materialization::ResolutionFailed`].
//!
//! # Example
//!
//! ```no_run
//! use datos_core::{Materialization, ResourceRef, Resolver};
//!
//! let resolver = Resolver::default();
//! let resource = ResourceRef::new("https://example.com/paro.csv").with_content_type("text/csv");
//!
//! match resolver.resolve(&resource, None) {
//!     Materialization::Table(table) => println!("{table}"),
//!     Materialization::RawBytes(bytes) => println!("{} opaque bytes", bytes.len()),
//!     Materialization::ResolutionFailed(failure) => eprintln!("{failure}"),
//!     Materialization::SavedToFile { .. } => unreachable!(),
//! }
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod resolver;
pub mod resource;
pub mod table;

pub use decode::{DecodeOptions, Format};
pub use error::{DecodeError, FailureStage, ResolutionFailure};
pub use resolver::{Resolver, ResolverOptions};
pub use resource::{Materialization, ResourceRef};
pub use table::{Cell, Table};
