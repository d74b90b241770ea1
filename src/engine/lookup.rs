//! Property lookup between the CX visual-property vocabulary and renderer
//! style keys.
//!
//! The table is a JSON asset. Each entry names a source property, the target
//! keys it produces and an optional conversion:
//!
//! - no conversion: the value is copied verbatim to every target key;
//! - `method`: a chain of value transforms (case, separator replacement,
//!   0-255 to 0-1 normalization and back);
//! - `split`: the value is split by a delimiter and individual tokens are
//!   translated through per-target match tables.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use super::cascade::{Priority, Selector};
use super::interpolate::format_number;

const BUILTIN_LOOKUP_JSON: &str = include_str!("../../assets/cx_lookup.json");

/// Source property that always fans out into width and height.
pub const NODE_SIZE: &str = "NODE_SIZE";

#[derive(Debug, Error)]
pub enum LookupError {
	#[error("failed to parse lookup table JSON: {0}")]
	Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LookupError>;

/// How an entry converts values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionType {
	Method,
	Split,
}

/// A single value transform.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueMethod {
	Lowercase,
	Uppercase,
	Replace { from: String, to: String },
	/// 0-255 to 0-1.
	Normalize,
	/// 0-1 to 0-255.
	Denormalize,
}

impl ValueMethod {
	fn apply(&self, value: &str) -> String {
		match self {
			ValueMethod::Lowercase => value.to_lowercase(),
			ValueMethod::Uppercase => value.to_uppercase(),
			ValueMethod::Replace { from, to } => value.replace(from.as_str(), to),
			ValueMethod::Normalize => match value.trim().parse::<f64>() {
				Ok(v) => format_number(v / 255.0, 5),
				Err(_) => value.to_string(),
			},
			ValueMethod::Denormalize => match value.trim().parse::<f64>() {
				Ok(v) => format!("{}", (v * 255.0).round()),
				Err(_) => value.to_string(),
			},
		}
	}

	fn inverse(&self) -> ValueMethod {
		match self {
			ValueMethod::Lowercase => ValueMethod::Uppercase,
			ValueMethod::Uppercase => ValueMethod::Lowercase,
			ValueMethod::Replace { from, to } => ValueMethod::Replace {
				from: to.clone(),
				to: from.clone(),
			},
			ValueMethod::Normalize => ValueMethod::Denormalize,
			ValueMethod::Denormalize => ValueMethod::Normalize,
		}
	}
}

/// One target produced from one token of a split value.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPick {
	pub target: String,
	pub index: usize,
	/// Token translations. An empty table copies the token verbatim.
	#[serde(default)]
	pub match_rules: BTreeMap<String, String>,
}

/// Conversion rules of an entry.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Conversion {
	pub methods: Vec<ValueMethod>,
	pub delimiter: Option<String>,
	pub picks: Vec<SplitPick>,
}

/// One row of the lookup table.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupEntry {
	pub source: String,
	pub targets: Vec<String>,
	/// Appended to the selector, e.g. `:selected`.
	#[serde(default)]
	pub selector_suffix: Option<String>,
	#[serde(default)]
	pub conversion_type: Option<ConversionType>,
	#[serde(default)]
	pub conversion: Conversion,
}

#[derive(Deserialize)]
struct LookupFile {
	properties: Vec<LookupEntry>,
}

/// Which way a lookup translates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
	/// CX visual property to renderer style key.
	SourceToTarget,
	/// Renderer style key back to CX visual property.
	TargetToSource,
}

/// A property/value pair to resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Property<'a> {
	pub key: &'a str,
	pub value: &'a str,
}

impl<'a> Property<'a> {
	pub const fn new(key: &'a str, value: &'a str) -> Self {
		Self { key, value }
	}
}

/// A resolved style declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleComponent {
	pub selector: String,
	pub key: String,
	pub value: String,
	pub priority: Priority,
}

impl StyleComponent {
	pub fn new(selector: &str, key: &str, value: impl Into<String>) -> Self {
		Self {
			selector: selector.to_string(),
			key: key.to_string(),
			value: value.into(),
			priority: Priority::of(selector),
		}
	}
}

/// Read-only property lookup table.
#[derive(Clone, Debug, Default)]
pub struct LookupTable {
	entries: Vec<LookupEntry>,
	by_source: HashMap<String, usize>,
}

impl LookupTable {
	/// Parse a table from its JSON form.
	pub fn from_json(json: &str) -> Result<Self> {
		let file: LookupFile = serde_json::from_str(json)?;
		Ok(Self::from_entries(file.properties))
	}

	/// Build a table from entries; a repeated source keeps its first entry.
	pub fn from_entries(entries: Vec<LookupEntry>) -> Self {
		let mut by_source = HashMap::new();
		for (i, entry) in entries.iter().enumerate() {
			by_source.entry(entry.source.clone()).or_insert(i);
		}
		Self { entries, by_source }
	}

	/// Parse a table, degrading to an empty one when the JSON is unusable.
	pub fn load_or_empty(json: &str) -> Self {
		match Self::from_json(json) {
			Ok(table) => table,
			Err(e) => {
				warn!("cx-vizmap: lookup table unusable, resolving nothing: {}", e);
				Self::default()
			}
		}
	}

	/// The table bundled with the crate.
	pub fn builtin() -> Self {
		Self::load_or_empty(BUILTIN_LOOKUP_JSON)
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Entry for a source property.
	pub fn entry(&self, source: &str) -> Option<&LookupEntry> {
		self.by_source.get(source).map(|&i| &self.entries[i])
	}

	/// Resolve a property into zero or more style components for `selector`.
	///
	/// Unknown keys resolve to nothing.
	pub fn resolve(
		&self,
		property: Property<'_>,
		selector: &str,
		direction: Direction,
	) -> Vec<StyleComponent> {
		match direction {
			Direction::SourceToTarget => self.resolve_forward(property, selector),
			Direction::TargetToSource => self.resolve_reverse(property, selector),
		}
	}

	fn resolve_forward(&self, property: Property<'_>, selector: &str) -> Vec<StyleComponent> {
		let Some(entry) = self.entry(property.key) else {
			debug!("cx-vizmap: no lookup entry for {}", property.key);
			return Vec::new();
		};
		let selector = match &entry.selector_suffix {
			Some(suffix) => format!("{selector}{suffix}"),
			None => selector.to_string(),
		};

		let mut out: Vec<StyleComponent> = match entry.conversion_type {
			None => entry
				.targets
				.iter()
				.map(|t| StyleComponent::new(&selector, t, property.value))
				.collect(),
			Some(ConversionType::Method) => {
				let value = entry
					.conversion
					.methods
					.iter()
					.fold(property.value.to_string(), |v, m| m.apply(&v));
				entry
					.targets
					.iter()
					.map(|t| StyleComponent::new(&selector, t, value.clone()))
					.collect()
			}
			Some(ConversionType::Split) => {
				let delimiter = entry.conversion.delimiter.as_deref().unwrap_or(",");
				let tokens: Vec<&str> = property.value.split(delimiter).map(str::trim).collect();
				entry
					.conversion
					.picks
					.iter()
					.filter_map(|pick| {
						let token = *tokens.get(pick.index)?;
						let value = if pick.match_rules.is_empty() {
							token.to_string()
						} else {
							pick.match_rules.get(token)?.clone()
						};
						Some(StyleComponent::new(&selector, &pick.target, value))
					})
					.collect()
			}
		};

		if entry.source == NODE_SIZE {
			for (missing, present) in [("height", "width"), ("width", "height")] {
				if out.iter().any(|c| c.key == missing) {
					continue;
				}
				let value = out.iter().find(|c| c.key == present).map(|c| c.value.clone());
				if let Some(value) = value {
					out.push(StyleComponent::new(&selector, missing, value));
				}
			}
		}
		out
	}

	fn resolve_reverse(&self, property: Property<'_>, selector: &str) -> Vec<StyleComponent> {
		let parsed = Selector::parse(selector);
		let prefix = match (parsed.tag, parsed.class) {
			(Some("core"), _) => "NETWORK_",
			(Some("edge"), _) => "EDGE_",
			(_, Some(class)) if class.starts_with("edge_") => "EDGE_",
			_ => "NODE_",
		};
		let suffix_matches = |entry: &LookupEntry| match &entry.selector_suffix {
			Some(suffix) => selector.ends_with(suffix.as_str()),
			None => parsed.pseudo.is_none(),
		};
		let produces = |entry: &LookupEntry| {
			entry.targets.iter().any(|t| t == property.key)
				|| entry.conversion.picks.iter().any(|p| p.target == property.key)
		};
		let candidates = || self.entries.iter().filter(|e| produces(e) && suffix_matches(e));
		let Some(entry) = candidates()
			.find(|e| e.source.starts_with(prefix))
			.or_else(|| candidates().next())
		else {
			debug!("cx-vizmap: no reverse lookup entry for {}", property.key);
			return Vec::new();
		};
		let base = match &entry.selector_suffix {
			Some(suffix) => selector.strip_suffix(suffix.as_str()).unwrap_or(selector),
			None => selector,
		};

		let value = match entry.conversion_type {
			None => Some(property.value.to_string()),
			Some(ConversionType::Method) => Some(
				entry
					.conversion
					.methods
					.iter()
					.rev()
					.fold(property.value.to_string(), |v, m| m.inverse().apply(&v)),
			),
			Some(ConversionType::Split) => entry
				.conversion
				.picks
				.iter()
				.find(|p| p.target == property.key)
				.and_then(|pick| {
					if pick.match_rules.is_empty() {
						Some(property.value.to_string())
					} else {
						pick.match_rules
							.iter()
							.find(|(_, v)| v.as_str() == property.value)
							.map(|(token, _)| token.clone())
					}
				}),
		};
		value
			.map(|v| vec![StyleComponent::new(base, &entry.source, v)])
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn forward(
		table: &LookupTable,
		key: &str,
		value: &str,
		selector: &str,
	) -> Vec<(String, String, String)> {
		table
			.resolve(Property::new(key, value), selector, Direction::SourceToTarget)
			.into_iter()
			.map(|c| (c.selector, c.key, c.value))
			.collect()
	}

	fn own(selector: &str, key: &str, value: &str) -> (String, String, String) {
		(selector.to_string(), key.to_string(), value.to_string())
	}

	#[test]
	fn builtin_table_parses() {
		let table = LookupTable::builtin();
		assert!(!table.is_empty());
		assert!(table.entry("NODE_FILL_COLOR").is_some());
	}

	#[test]
	fn direct_entry_copies_value() {
		let table = LookupTable::builtin();
		assert_eq!(
			forward(&table, "NODE_FILL_COLOR", "#FF0000", "node"),
			[own("node", "background-color", "#FF0000")]
		);
	}

	#[test]
	fn unknown_key_resolves_to_nothing() {
		let table = LookupTable::builtin();
		assert!(forward(&table, "NODE_CUSTOMGRAPHICS_1", "x", "node").is_empty());
	}

	#[test]
	fn node_size_fans_out() {
		let table = LookupTable::builtin();
		let keys: Vec<_> = forward(&table, "NODE_SIZE", "35.0", "node")
			.into_iter()
			.map(|(_, k, v)| (k, v))
			.collect();
		assert_eq!(
			keys,
			[("width".to_string(), "35.0".to_string()), ("height".to_string(), "35.0".to_string())]
		);
	}

	#[test]
	fn node_size_fans_out_even_with_single_target() {
		let table =
			LookupTable::from_json(r#"{"properties":[{"source":"NODE_SIZE","targets":["width"]}]}"#)
				.unwrap();
		let keys: Vec<_> = forward(&table, "NODE_SIZE", "20", "node")
			.into_iter()
			.map(|(_, k, _)| k)
			.collect();
		assert_eq!(keys, ["width", "height"]);
	}

	#[test]
	fn method_conversions_apply_in_order() {
		let table = LookupTable::builtin();
		let shape = forward(&table, "NODE_SHAPE", "ROUND_RECTANGLE", "node");
		assert_eq!(shape[0].2, "round-rectangle");
		assert_eq!(forward(&table, "NODE_TRANSPARENCY", "255", "node")[0].2, "1");
		assert_eq!(forward(&table, "NODE_TRANSPARENCY", "0", "node")[0].2, "0");
	}

	#[test]
	fn split_conversion_matches_tokens() {
		let table = LookupTable::builtin();
		let out = forward(&table, "NODE_LABEL_POSITION", "NE,C,c,0.00,0.00", "node");
		assert_eq!(
			out,
			[own("node", "text-valign", "top"), own("node", "text-halign", "right")]
		);
		assert!(forward(&table, "EDGE_LINE_TYPE", "ZIGZAG", "edge").is_empty());
	}

	#[test]
	fn selector_suffix_yields_pseudo_priority() {
		let table = LookupTable::builtin();
		let out = table.resolve(
			Property::new("NODE_SELECTED_PAINT", "#FFFF00"),
			"node",
			Direction::SourceToTarget,
		);
		assert_eq!(out[0].selector, "node:selected");
		assert_eq!(out[0].priority, Priority::Pseudo);
	}

	#[test]
	fn reverse_lookup_inverts_conversions() {
		let table = LookupTable::builtin();
		let back = |key: &str, value: &str, selector: &str| {
			let out = table.resolve(Property::new(key, value), selector, Direction::TargetToSource);
			(out[0].key.clone(), out[0].value.clone())
		};
		assert_eq!(
			back("shape", "round-rectangle", "node"),
			("NODE_SHAPE".into(), "ROUND_RECTANGLE".into())
		);
		assert_eq!(back("opacity", "1", "edge"), ("EDGE_TRANSPARENCY".into(), "255".into()));
		assert_eq!(back("width", "3", "edge"), ("EDGE_WIDTH".into(), "3".into()));
		assert_eq!(back("width", "30", "node"), ("NODE_WIDTH".into(), "30".into()));
		assert_eq!(back("line-style", "dotted", "edge"), ("EDGE_LINE_TYPE".into(), "DOT".into()));
		assert_eq!(
			back("background-color", "#ff0", "node:selected"),
			("NODE_SELECTED_PAINT".into(), "#ff0".into())
		);
	}

	#[test]
	fn malformed_table_degrades_to_empty() {
		let table = LookupTable::load_or_empty("{ not json");
		assert!(table.is_empty());
		assert!(forward(&table, "NODE_FILL_COLOR", "#fff", "node").is_empty());
	}
}
