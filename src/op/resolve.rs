//! Configuration Resolution
//!
//! The `resolve` operation turns a manifest into a resolved configuration.
//! It builds the fragments declared by the manifest, looking up injected
//! values through the given provider, and resolves them with the standard
//! Android rules.

use crate::manifest::Manifest;
use crate::provider::Provider;
use crate::resolver::{Resolved, Resolver};

/// Resolve Errors
///
/// This is the exhaustive list of possible errors raised by the resolve
/// operation. See each error for details.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The manifest fragments could not be built.
    #[error(transparent)]
    Manifest(#[from] crate::manifest::Error),
    /// The fragments could not be resolved.
    #[error(transparent)]
    Resolve(#[from] crate::resolver::Error),
}

/// Resolve manifest configuration
///
/// Build all fragments of the manifest and resolve them for `variant`. If
/// no variant is given, only unrestricted fragments are used.
pub fn resolve(
    manifest: &Manifest,
    provider: &dyn Provider,
    variant: Option<&str>,
) -> Result<Resolved, Error> {
    let mut resolver = Resolver::android();

    if let Some(v) = variant {
        resolver = resolver.with_variant(v);
    }

    for fragment in manifest.fragments(provider)? {
        resolver.add_fragment(fragment);
    }

    Ok(resolver.resolve()?)
}
