//! Osiris Build Configuration Resolver
//!
//! The osiris config module resolves the build configuration of Android
//! application modules. An application module is configured by several
//! layers: static defaults declared with the application, values injected
//! by the build tooling of a hosting framework (like the SDK levels chosen
//! by Flutter), and overrides for individual build variants. Native build
//! tools merge these layers implicitly. This module merges them explicitly
//! and reproducibly, and validates the result before any toolchain is
//! invoked.
//!
//! Model
//! -----
//!
//! Configuration layers are represented as [fragments](fragment::Fragment).
//! A fragment is an ordered list of settings from one source, with a
//! precedence rank. A [resolver](resolver::Resolver) is created for every
//! build invocation, collects fragments and [rules](rule::Rule), and
//! produces one immutable [resolved configuration](resolver::Resolved).
//!
//! For each setting, the fragment with the highest rank wins. Within a
//! rank, the fragment registered last wins. Values of known settings are
//! then coerced into their semantic type (see [`key`]), and all rules are
//! checked. Every problem is reported at once; a configuration is only
//! returned if there are none.
//!
//! Values injected by the build tooling are looked up through an explicit
//! [provider](provider::Provider). There is no global state.
//!
//! Manifest
//! --------
//!
//! Fragments can be declared in the Osiris Configuration Manifest, a
//! TOML-formatted file usually called `osiris-config.toml`. See
//! [`manifest`] for the format. The `osiris-config` command-line tool
//! resolves the manifest and exports the result for the Gradle build.

pub mod fragment;
pub mod key;
pub mod manifest;
pub mod provider;
pub mod resolver;
pub mod rule;
pub mod value;

/// Configuration Operations
///
/// The `op` module is a collection of all operations that can be performed via
/// the command-line interface. Each operation is implemented in a submodule
/// and can be used independently.
pub mod op {
    pub mod emit;
    pub mod resolve;
}
