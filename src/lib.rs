//! cx-vizmap: Visual mapping and style resolution for CX network documents.
//!
//! This crate converts CX documents into a priority-ordered style cascade for
//! a graph renderer and maintains it while users add, edit and remove
//! discrete, continuous and passthrough mappings. It builds natively and as a
//! WASM module for the browser-side editor.

use log::{Level, info};
use wasm_bindgen::prelude::*;

pub mod bindings;
pub mod engine;

pub use bindings::EditorSession;
pub use engine::{
	ConvertError, LookupTable, MappingEdit, Network, NetworkId, Session, StyleConfig, convert,
};

/// Initialize logging and panic hooks for the WASM target.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("cx-vizmap: logging initialized");
}
