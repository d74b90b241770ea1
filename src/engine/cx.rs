//! CX document records.
//!
//! A CX document is a JSON array of single-key fragments, each holding one
//! list of aspect records (`nodes`, `edges`, `nodeAttributes`, ...). The same
//! aspect may be split over several fragments; they are concatenated. Records
//! that fail to deserialize are skipped.

use std::collections::BTreeMap;

use log::debug;
use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::Deserialize;
use serde_json::Value;

use super::convert::{ConvertError, Result};

/// Accept numeric or string ids.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
	match Value::deserialize(deserializer)? {
		Value::String(s) => Ok(s),
		Value::Number(n) => Ok(n.to_string()),
		other => Err(D::Error::custom(format!("invalid id {other}"))),
	}
}

fn optional_id<'de, D: Deserializer<'de>>(
	deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
	id_string(deserializer).map(Some)
}

/// Render an attribute value as text; lists are joined with `,`.
pub fn value_text(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(","),
		other => other.to_string(),
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct CxNode {
	#[serde(rename = "@id", deserialize_with = "id_string")]
	pub id: String,
	#[serde(default)]
	pub n: Option<String>,
	#[serde(default)]
	pub r: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CxEdge {
	#[serde(rename = "@id", deserialize_with = "id_string")]
	pub id: String,
	#[serde(deserialize_with = "id_string")]
	pub s: String,
	#[serde(deserialize_with = "id_string")]
	pub t: String,
	#[serde(default)]
	pub i: Option<String>,
}

/// Attribute record; network attributes carry no `po`.
#[derive(Clone, Debug, Deserialize)]
pub struct CxAttribute {
	#[serde(default, deserialize_with = "optional_id")]
	pub po: Option<String>,
	pub n: String,
	#[serde(default)]
	pub v: Value,
	#[serde(default)]
	pub d: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CxLayout {
	#[serde(deserialize_with = "id_string")]
	pub node: String,
	pub x: f64,
	pub y: f64,
}

/// Mapping declaration: `type` is DISCRETE, CONTINUOUS or PASSTHROUGH.
#[derive(Clone, Debug, Deserialize)]
pub struct CxMapping {
	#[serde(rename = "type")]
	pub kind: String,
	pub definition: String,
}

/// One visual property block (`network`, `nodes:default`, `nodes`, ...).
#[derive(Clone, Debug, Deserialize)]
pub struct CxVisualProperty {
	pub properties_of: String,
	#[serde(default, deserialize_with = "optional_id")]
	pub applies_to: Option<String>,
	#[serde(default)]
	pub properties: BTreeMap<String, Value>,
	#[serde(default)]
	pub dependencies: BTreeMap<String, Value>,
	#[serde(default)]
	pub mappings: BTreeMap<String, CxMapping>,
}

impl CxVisualProperty {
	/// Properties with their values rendered as text.
	pub fn property_text(&self) -> BTreeMap<&str, String> {
		self.properties
			.iter()
			.map(|(k, v)| (k.as_str(), value_text(v)))
			.collect()
	}

	/// Whether a boolean dependency is set.
	pub fn dependency(&self, name: &str) -> bool {
		self.dependencies
			.get(name)
			.is_some_and(|v| value_text(v).eq_ignore_ascii_case("true"))
	}
}

/// Aspects of a CX document the engine uses.
#[derive(Clone, Debug, Default)]
pub struct CxDocument {
	pub network_attributes: Vec<CxAttribute>,
	pub nodes: Vec<CxNode>,
	pub edges: Vec<CxEdge>,
	pub node_attributes: Vec<CxAttribute>,
	pub edge_attributes: Vec<CxAttribute>,
	pub layout: Vec<CxLayout>,
	pub visual_properties: Vec<CxVisualProperty>,
}

fn records<T: DeserializeOwned>(aspect: &str, records: Value, out: &mut Vec<T>) {
	let Value::Array(items) = records else {
		debug!("cx-vizmap: {} fragment is not a list, skipped", aspect);
		return;
	};
	for item in items {
		match serde_json::from_value(item) {
			Ok(record) => out.push(record),
			Err(e) => debug!("cx-vizmap: skipping malformed {} record: {}", aspect, e),
		}
	}
}

impl CxDocument {
	/// Parse a document, concatenating split aspects.
	pub fn parse(document: &str, filename: &str) -> Result<Self> {
		let value: Value = serde_json::from_str(document).map_err(|source| ConvertError::Parse {
			filename: filename.to_string(),
			source,
		})?;
		let Value::Array(fragments) = value else {
			return Err(ConvertError::NotAnAspectList {
				filename: filename.to_string(),
			});
		};

		let mut doc = CxDocument::default();
		for fragment in fragments {
			let Value::Object(map) = fragment else {
				continue;
			};
			for (aspect, body) in map {
				match aspect.as_str() {
					"networkAttributes" => records(&aspect, body, &mut doc.network_attributes),
					"nodes" => records(&aspect, body, &mut doc.nodes),
					"edges" => records(&aspect, body, &mut doc.edges),
					"nodeAttributes" => records(&aspect, body, &mut doc.node_attributes),
					"edgeAttributes" => records(&aspect, body, &mut doc.edge_attributes),
					"cartesianLayout" => records(&aspect, body, &mut doc.layout),
					"cyVisualProperties" | "visualProperties" => {
						records(&aspect, body, &mut doc.visual_properties)
					}
					_ => {}
				}
			}
		}
		Ok(doc)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn split_fragments_are_concatenated() {
		let doc = CxDocument::parse(
			r#"[
				{"metaData": [{"name": "nodes"}]},
				{"nodes": [{"@id": 1, "n": "a"}]},
				{"nodes": [{"@id": "2"}, {"bogus": true}]},
				{"edges": [{"@id": 3, "s": 1, "t": 2, "i": "pp"}]},
				{"visualProperties": [
					{"properties_of": "nodes", "applies_to": 1, "properties": {"NODE_WIDTH": 40}}
				]}
			]"#,
			"t.cx",
		)
		.unwrap();
		let ids: Vec<_> = doc.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["1", "2"]);
		assert_eq!(doc.edges[0].s, "1");
		let vp = &doc.visual_properties[0];
		assert_eq!(vp.applies_to.as_deref(), Some("1"));
		assert_eq!(vp.property_text()["NODE_WIDTH"], "40");
	}

	#[test]
	fn list_values_are_joined() {
		let attr: CxAttribute = serde_json::from_str(
			r#"{"po": 5, "n": "aliases", "v": ["x", "y"], "d": "list_of_string"}"#,
		)
		.unwrap();
		assert_eq!(attr.po.as_deref(), Some("5"));
		assert_eq!(value_text(&attr.v), "x,y");
		assert_eq!(value_text(&serde_json::json!(true)), "true");
		assert_eq!(value_text(&serde_json::json!(2.5)), "2.5");
	}

	#[test]
	fn rejects_non_list_documents() {
		assert!(matches!(
			CxDocument::parse("{}", "t.cx"),
			Err(ConvertError::NotAnAspectList { .. })
		));
		assert!(matches!(
			CxDocument::parse("[", "t.cx"),
			Err(ConvertError::Parse { .. })
		));
	}
}
