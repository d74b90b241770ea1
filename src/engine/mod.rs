//! Visual mapping and style resolution engine.
//!
//! Turns CX network documents into a renderer-ready style cascade and keeps
//! that cascade consistent while mappings are edited:
//! - Property lookup between CX visual properties and style keys
//! - Discrete, continuous and passthrough mappings with stable handles
//! - Priority-ordered cascade with per-rule element targets
//! - Edit/preview/commit cycle over loaded networks
//!
//! # Example
//!
//! ```ignore
//! use cx_vizmap::engine::{DiscreteEntry, DiscreteMappingRequest, ElementGroup, Session};
//!
//! let mut session = Session::with_builtin_lookup();
//! let id = session.load(&document, "network.cx")?;
//! let net = session.network_mut(id).unwrap();
//! net.add_discrete_mapping(DiscreteMappingRequest {
//!     group: ElementGroup::Node,
//!     classifier: "type".into(),
//!     css_key: "background-color".into(),
//!     entries: vec![DiscreteEntry::new("A", "#ff0000")],
//! });
//! ```

pub mod cascade;
pub mod color;
pub mod config;
mod convert;
mod cx;
mod definition;
pub mod interpolate;
pub mod lookup;
mod mappings;
mod session;
mod stats;
mod types;

pub use cascade::{Priority, Selector};
pub use config::StyleConfig;
pub use convert::{ConvertError, convert};
pub use lookup::{Direction, LookupError, LookupTable, Property, StyleComponent};
pub use mappings::{
	BreakpointInput, ContinuousMappingRequest, DiscreteEntry, DiscreteMappingRequest, EditOutcome,
	MappingEdit, classify,
};
pub use session::{EditStage, MappingEditor, Session};
pub use types::*;
