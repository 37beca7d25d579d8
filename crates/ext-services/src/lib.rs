//! Service definition compiler
//!
//! Providers describe their services declaratively as a [`ServiceMap`].
//! The [`ServiceCompiler`] validates each map, translates it into concrete
//! [`Definition`]s, and writes them into a [`ContainerBuilder`]. The
//! container itself (storage and resolution) lives outside this crate; an
//! [`InMemoryContainer`] is provided for hosts that only need the compiled
//! graph.
//!
//! ```
//! use ext_services::{ContainerBuilder, InMemoryContainer, ServiceCompiler, ServiceMap, ServiceSpec};
//!
//! let services = ServiceMap::new()
//!     .service("logger", ServiceSpec::new().class("App.Log.FileLogger"))
//!     .service("mailer", ServiceSpec::new().class("App.Mail.Mailer").argument("@logger"));
//!
//! let mut container = InMemoryContainer::new();
//! let mut compiler = ServiceCompiler::new();
//! compiler.compile("App.Mail.MailProvider", &services, &mut container).unwrap();
//! compiler.verify_references(&container).unwrap();
//! assert!(container.has("mailer"));
//! ```

pub mod compiler;
pub mod container;
pub mod definition;
pub mod error;

/// Prefix marking a string argument as a reference to another service.
pub const REFERENCE_SIGIL: char = '@';

pub use compiler::{Collision, CollisionKind, CompileReport, ServiceCompiler};
pub use container::{ContainerBuilder, InMemoryContainer};
pub use definition::{
    AliasSpec, Argument, DecorateSpec, Decoration, Definition, Factory, FactoryTarget,
    ServiceMap, ServiceSpec, Tag, TagSpec,
};
pub use error::{Error, ReferenceIssue, Result};
