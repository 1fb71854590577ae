//! Résolution DNS des domaines destinataires, avec cache TTL.
//!
//! Le point d'entrée est [`DomainResolver::resolvable`]; les sources
//! d'enregistrements implémentent [`RecordLookup`].

mod error;
mod lookup;
mod options;
mod resolver;
mod types;

pub use error::DnsError;
pub use lookup::{DigTool, LibraryLookup, RecordLookup};
pub use options::DnsOptions;
pub use resolver::DomainResolver;
pub use types::RecordKind;

#[cfg(test)]
pub(crate) mod tests;
