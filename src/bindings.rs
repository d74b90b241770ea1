//! JavaScript facade over [`Session`].
//!
//! Networks cross the boundary as JSON strings; edits come in as JSON
//! [`MappingEdit`] objects tagged by `op`.

use wasm_bindgen::prelude::*;

use crate::engine::{LookupTable, MappingEdit, NetworkId, Session, StyleConfig};

/// Mapping editor session exposed to the host page.
#[wasm_bindgen]
pub struct EditorSession {
	session: Session,
}

#[wasm_bindgen]
impl EditorSession {
	/// Start a session. A custom lookup table replaces the bundled one; an
	/// unusable table degrades to resolving nothing.
	#[wasm_bindgen(constructor)]
	pub fn new(lookup_json: Option<String>) -> EditorSession {
		let lookup = match lookup_json {
			Some(json) => LookupTable::load_or_empty(&json),
			None => LookupTable::builtin(),
		};
		EditorSession {
			session: Session::new(lookup, StyleConfig::default()),
		}
	}

	/// Load a CX document; returns the network id.
	pub fn load(&mut self, document: &str, filename: &str) -> Result<u32, JsError> {
		Ok(self.session.load(document, filename)?.0)
	}

	/// Current state of a network as JSON.
	#[wasm_bindgen(js_name = networkJson)]
	pub fn network_json(&self, id: u32) -> Result<String, JsError> {
		let network = self
			.session
			.network(NetworkId(id))
			.ok_or_else(|| JsError::new("unknown network"))?;
		Ok(serde_json::to_string(network)?)
	}

	/// Apply a JSON edit; returns the JSON outcome.
	#[wasm_bindgen(js_name = applyEdit)]
	pub fn apply_edit(&mut self, id: u32, edit_json: &str) -> Result<String, JsError> {
		let edit: MappingEdit = serde_json::from_str(edit_json)?;
		let network = self
			.session
			.network_mut(NetworkId(id))
			.ok_or_else(|| JsError::new("unknown network"))?;
		Ok(serde_json::to_string(&network.apply(edit))?)
	}

	#[wasm_bindgen(js_name = removeNetwork)]
	pub fn remove_network(&mut self, id: u32) -> bool {
		self.session.remove(NetworkId(id)).is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn edits_round_trip_through_json() {
		let mut session = EditorSession::new(None);
		let id = session
			.load(
				r#"[{"nodes": [{"@id": 1}]},
					{"nodeAttributes": [{"po": 1, "n": "type", "v": "A"}]}]"#,
				"a.cx",
			)
			.unwrap_or_default();
		let edit = r##"{"op": "addDiscrete", "group": "node", "classifier": "type",
			"cssKey": "background-color", "entries": [{"value": "A", "cssValue": "#ff0000"}]}"##;
		let outcome = session.apply_edit(id, edit).unwrap_or_default();
		assert_eq!(outcome, r#"{"status":"mapped","id":1}"#);
		let json = session.network_json(id).unwrap_or_default();
		assert!(json.contains(r#""selector":".node_type_a""#));
		assert!(session.remove_network(id));
	}
}
