//! Tether Codegen - Weak subscriber proxy generation.
//!
//! This crate turns subscriber declarations into forwarding proxy types.
//! It is used in two places:
//! - the `#[weak_subscriber]` and `#[subscriber]` attribute macros, which
//!   scan an `impl` block and emit tokens in place
//! - the `tether-gen` build tool, which reads serialized declarations and
//!   writes one source file per proxy
//!
//! The pipeline is staged and pure:
//!
//!   scan → validate → describe → emit
//!
//! [`scan`] produces a [`SubscriberClassDecl`] from syntax, [`validate`]
//! checks every method and collects [`Diagnostic`]s, the [`Generator`]
//! builds a [`ProxyTypeDescriptor`] for each type with at least one valid
//! method, and [`emit`] renders it. Nothing here touches the filesystem
//! except [`GenerationReport::write_to`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod emit;
pub mod generator;
pub mod model;
pub mod naming;
pub mod native;
pub mod scan;
pub mod validate;
pub mod weak;

mod error;

pub use emit::{DEFAULT_RUNTIME_PATH, EmitOptions};
pub use error::{GenerateError, GenerateResult};
pub use generator::{ClassReport, GeneratedProxy, GenerationReport, Generator};
pub use model::{
    Markers, Param, ParamKind, Placement, ProxyTypeDescriptor, Receiver, SubscriberClassDecl,
    SubscriberMethod, Visibility,
};
pub use naming::{NamingError, PROXY_PREFIX, proxy_name};
pub use validate::{Diagnostic, DiagnosticKind, InvalidDeclaration, Severity};
pub use native::expand_subscriber;
pub use weak::expand_weak_subscriber;
