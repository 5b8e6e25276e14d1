pub mod date;
pub mod error;
pub mod media;
pub mod report;
pub mod scan;
pub mod tools;

pub use date::{Provenance, ResolvedTimestamp, Resolver, ResolverOptions, Source};
pub use error::{ConfigError, ResolveError};
pub use media::{classify, MediaKind};
