//! CX document to network conversion.
//!
//! Builds the element list, aspects and initial style cascade of a
//! [`Network`] from a CX document. Visual properties are resolved through the
//! [`LookupTable`]; declared mappings are replayed through the mapping engine
//! so converted and user-created mappings are indistinguishable.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info};
use thiserror::Error;

use super::config::StyleConfig;
use super::cx::{CxAttribute, CxDocument, CxVisualProperty, value_text};
use super::definition::Definition;
use super::lookup::{Direction, LookupTable, NODE_SIZE, Property, StyleComponent};
use super::mappings::{
	ARROW_COLOR_KEYS, BreakpointInput, ContinuousMappingRequest, DiscreteEntry,
	DiscreteMappingRequest,
};
use super::stats::build_aspects;
use super::types::{
	Attribute, Element, ElementGroup, Network, Position, clean, clean_column, mapping_selector,
};

/// Errors raised while loading a document.
#[derive(Debug, Error)]
pub enum ConvertError {
	/// The document is not valid JSON.
	#[error("{filename}: malformed JSON: {source}")]
	Parse {
		filename: String,
		#[source]
		source: serde_json::Error,
	},
	/// The document is JSON but not a list of aspect fragments.
	#[error("{filename}: expected a list of aspect fragments")]
	NotAnAspectList { filename: String },
}

pub type Result<T> = std::result::Result<T, ConvertError>;

fn attribute(reference: &str, name: &str, text: String, datatype: Option<String>) -> Attribute {
	Attribute {
		reference: reference.to_string(),
		key: clean_column(name),
		key_human_readable: name.to_string(),
		value: clean(&text),
		value_human_readable: text,
		datatype,
	}
}

fn cx_attribute(reference: &str, record: &CxAttribute) -> Attribute {
	attribute(reference, &record.n, value_text(&record.v), record.d.clone())
}

fn element(id: &str, group: ElementGroup) -> Element {
	Element {
		id: id.to_string(),
		group,
		name: None,
		source: None,
		target: None,
		attributes: Vec::new(),
		classes: Default::default(),
		position: None,
	}
}

fn build_elements(doc: &CxDocument) -> Vec<Element> {
	let mut elements: Vec<Element> = Vec::with_capacity(doc.nodes.len() + doc.edges.len());
	let mut names: HashMap<&str, &str> = HashMap::new();

	for node in &doc.nodes {
		let mut e = element(&node.id, ElementGroup::Node);
		if let Some(name) = &node.n {
			e.attributes.push(attribute(&node.id, "name", name.clone(), None));
			names.insert(node.id.as_str(), name.as_str());
		}
		if let Some(represents) = &node.r {
			e.attributes.push(attribute(&node.id, "represents", represents.clone(), None));
		}
		e.name = node.n.clone();
		elements.push(e);
	}

	for edge in &doc.edges {
		let mut e = element(&edge.id, ElementGroup::Edge);
		let source = names.get(edge.s.as_str()).copied().unwrap_or(edge.s.as_str());
		let target = names.get(edge.t.as_str()).copied().unwrap_or(edge.t.as_str());
		let name = format!("{source} ({}) {target}", edge.i.as_deref().unwrap_or_default());
		e.attributes.push(attribute(&edge.id, "name", name.clone(), None));
		if let Some(interaction) = &edge.i {
			e.attributes.push(attribute(&edge.id, "interaction", interaction.clone(), None));
		}
		e.name = Some(name);
		e.source = Some(edge.s.clone());
		e.target = Some(edge.t.clone());
		elements.push(e);
	}

	let index: HashMap<(ElementGroup, &str), usize> = doc
		.nodes
		.iter()
		.map(|n| (ElementGroup::Node, n.id.as_str()))
		.chain(doc.edges.iter().map(|e| (ElementGroup::Edge, e.id.as_str())))
		.enumerate()
		.map(|(i, key)| (key, i))
		.collect();

	for (group, records) in [
		(ElementGroup::Node, &doc.node_attributes),
		(ElementGroup::Edge, &doc.edge_attributes),
	] {
		for record in records {
			let Some(po) = record.po.as_deref() else {
				continue;
			};
			let Some(&i) = index.get(&(group, po)) else {
				debug!(
					"cx-vizmap: attribute {} refers to unknown {} {}",
					record.n,
					group.as_str(),
					po
				);
				continue;
			};
			let attr = cx_attribute(po, record);
			let e = &mut elements[i];
			if e.attributes.iter().all(|a| a.key != attr.key) {
				e.attributes.push(attr);
			}
		}
	}

	for layout in &doc.layout {
		if let Some(&i) = index.get(&(ElementGroup::Node, layout.node.as_str())) {
			elements[i].position = Some(Position {
				x: layout.x,
				y: layout.y,
			});
		}
	}
	elements
}

/// Node size keys to leave out given what a block declares.
///
/// A locked size wins over width and height; otherwise explicit width or
/// height win over size. A block declaring none of the three writes no size
/// key at all, leaving the renderer's default node size in effect.
fn suppressed_size_keys(
	properties: &BTreeMap<&str, String>,
	locked: bool,
) -> &'static [&'static str] {
	let has_size = properties.contains_key(NODE_SIZE);
	let has_dimensions =
		properties.contains_key("NODE_WIDTH") || properties.contains_key("NODE_HEIGHT");
	if locked && has_size {
		&["NODE_WIDTH", "NODE_HEIGHT"]
	} else if has_dimensions {
		&[NODE_SIZE]
	} else {
		&[]
	}
}

struct Converter<'a> {
	lookup: &'a LookupTable,
	net: Network,
	node_size_locked: bool,
}

impl Converter<'_> {
	fn resolve_block(
		&self,
		vp: &CxVisualProperty,
		group: Option<ElementGroup>,
		selector: &str,
	) -> Vec<StyleComponent> {
		let properties = vp.property_text();
		let suppressed: &[&str] = match group {
			Some(ElementGroup::Node) => suppressed_size_keys(&properties, self.node_size_locked),
			_ => &[],
		};
		properties
			.iter()
			.filter(|(key, _)| !suppressed.contains(*key))
			.flat_map(|(key, value)| {
				self.lookup
					.resolve(Property::new(key, value), selector, Direction::SourceToTarget)
			})
			.collect()
	}

	/// Arrow colors follow the line color when enabled; otherwise the edge
	/// defaults fall back to the configured arrow color.
	fn arrow_rule(&self, components: &mut Vec<StyleComponent>, group_default: bool) {
		if self.net.arrow_color_matches_edge {
			let copies: Vec<StyleComponent> = components
				.iter()
				.filter(|c| c.key == "line-color")
				.flat_map(|c| {
					ARROW_COLOR_KEYS
						.map(|key| StyleComponent::new(&c.selector, key, c.value.clone()))
				})
				.collect();
			components.extend(copies);
		} else if group_default {
			let fallback = self.net.config.default_arrow_color.clone();
			for key in ARROW_COLOR_KEYS {
				if !components.iter().any(|c| c.key == key && c.selector == "edge") {
					components.push(StyleComponent::new("edge", key, fallback.clone()));
				}
			}
		}
	}

	fn write(&mut self, components: Vec<StyleComponent>) {
		for c in components {
			self.net.set_style(&c.selector, &c.key, &c.value);
		}
	}

	/// Resolved `(key, value)` pairs that land on `selector` itself.
	fn resolve_plain(&self, property: &str, value: &str, selector: &str) -> Vec<(String, String)> {
		self.lookup
			.resolve(Property::new(property, value), selector, Direction::SourceToTarget)
			.into_iter()
			.filter(|c| {
				let plain = c.selector == selector;
				if !plain {
					debug!("cx-vizmap: {} mapping targets {}, skipped", property, c.selector);
				}
				plain
			})
			.map(|c| (c.key, c.value))
			.collect()
	}

	fn discrete(&mut self, group: ElementGroup, property: &str, def: &Definition) {
		let Some(column) = def.column.as_deref() else {
			debug!("cx-vizmap: discrete {} mapping without column, skipped", property);
			return;
		};
		let mut by_key: Vec<(String, Vec<DiscreteEntry>)> = Vec::new();
		for (value, declared) in def.discrete_pairs() {
			let selector = mapping_selector(group, column, &value);
			for (key, css_value) in self.resolve_plain(property, &declared, &selector) {
				let entry = DiscreteEntry::new(value.clone(), css_value);
				match by_key.iter_mut().find(|(k, _)| *k == key) {
					Some((_, entries)) => entries.push(entry),
					None => by_key.push((key, vec![entry])),
				}
			}
		}
		for (css_key, entries) in by_key {
			self.net.add_discrete_mapping(DiscreteMappingRequest {
				group,
				classifier: column.to_string(),
				css_key,
				entries,
			});
		}
	}

	fn continuous(&mut self, group: ElementGroup, property: &str, def: &Definition) {
		let Some(column) = def.column.as_deref() else {
			debug!("cx-vizmap: continuous {} mapping without column, skipped", property);
			return;
		};
		let points = def.continuous_points();
		let (Some(first), Some(last)) = (points.first(), points.last()) else {
			return;
		};
		let selector = group.as_str();
		let resolve = |value: Option<&String>| -> Vec<(String, String)> {
			value.map_or_else(Vec::new, |v| self.resolve_plain(property, v, selector))
		};
		let pick = |resolved: &[(String, String)], key: &str| {
			resolved.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
		};

		let lower = resolve(first.lesser.as_ref());
		let greater = resolve(last.greater.as_ref());
		let equals: Vec<(Option<&String>, Vec<(String, String)>)> = points
			.iter()
			.map(|p| (p.threshold.as_ref(), resolve(p.equal.as_ref())))
			.collect();
		let keys: Vec<String> = equals
			.iter()
			.flat_map(|(_, resolved)| resolved.iter().map(|(k, _)| k.clone()))
			.fold(Vec::new(), |mut keys, k| {
				if !keys.contains(&k) {
					keys.push(k);
				}
				keys
			});

		let mut requests = Vec::new();
		for css_key in keys {
			let breakpoints: Vec<BreakpointInput> = equals
				.iter()
				.filter_map(|(threshold, resolved)| {
					Some(BreakpointInput::new((*threshold)?.clone(), pick(resolved, &css_key)?))
				})
				.collect();
			let first_equal = breakpoints.first().map(|b| b.equal.clone()).unwrap_or_default();
			let last_equal = breakpoints.last().map(|b| b.equal.clone()).unwrap_or_default();
			requests.push(ContinuousMappingRequest {
				group,
				column: column.to_string(),
				lower: pick(&lower, &css_key).unwrap_or(first_equal),
				greater: pick(&greater, &css_key).unwrap_or(last_equal),
				css_key,
				breakpoints,
			});
		}
		for request in requests {
			self.net.add_continuous_mapping(request);
		}
	}

	fn passthrough(&mut self, group: ElementGroup, property: &str, def: &Definition) {
		let Some(column) = def.column.as_deref() else {
			return;
		};
		let Some(entry) = self.lookup.entry(property) else {
			debug!("cx-vizmap: no lookup entry for passthrough {}", property);
			return;
		};
		if entry.selector_suffix.is_some() {
			debug!("cx-vizmap: {} passthrough targets a pseudo-selector, skipped", property);
			return;
		}
		let mut keys: Vec<String> = entry.targets.clone();
		for pick in &entry.conversion.picks {
			if !keys.contains(&pick.target) {
				keys.push(pick.target.clone());
			}
		}
		self.net.add_passthrough_mapping(group, column, keys);
	}

	fn mappings(&mut self, group: ElementGroup, vp: &CxVisualProperty) {
		for (property, mapping) in &vp.mappings {
			let def = Definition::parse(&mapping.definition);
			match mapping.kind.as_str() {
				"DISCRETE" => self.discrete(group, property, &def),
				"CONTINUOUS" => self.continuous(group, property, &def),
				"PASSTHROUGH" => self.passthrough(group, property, &def),
				other => debug!("cx-vizmap: unknown mapping type {} on {}", other, property),
			}
		}
	}
}

fn default_group(properties_of: &str) -> Option<ElementGroup> {
	match properties_of {
		"nodes:default" => Some(ElementGroup::Node),
		"edges:default" => Some(ElementGroup::Edge),
		_ => None,
	}
}

fn element_group(properties_of: &str) -> Option<ElementGroup> {
	match properties_of {
		"nodes" => Some(ElementGroup::Node),
		"edges" => Some(ElementGroup::Edge),
		_ => None,
	}
}

/// Convert a CX document into a network.
///
/// Missing sections produce an empty but valid network; only malformed JSON
/// or a non-list document fails.
pub fn convert(
	document: &str,
	filename: &str,
	lookup: &LookupTable,
	config: &StyleConfig,
) -> Result<Network> {
	let doc = CxDocument::parse(document, filename)?;
	let mut net = Network::new(filename, config.clone());

	net.network_attributes = doc.network_attributes.iter().map(|a| cx_attribute("", a)).collect();
	if let Some(name) = net.network_attributes.iter().find(|a| a.key == "name") {
		net.name = name.value_human_readable.clone();
	}
	net.elements = build_elements(&doc);
	net.aspects_by_node = build_aspects(&net.elements, ElementGroup::Node);
	net.aspects_by_edge = build_aspects(&net.elements, ElementGroup::Edge);

	let defaults = |group: ElementGroup| {
		doc.visual_properties
			.iter()
			.filter(move |vp| default_group(&vp.properties_of) == Some(group))
	};
	net.arrow_color_matches_edge =
		defaults(ElementGroup::Edge).any(|vp| vp.dependency("arrowColorMatchesEdge"));
	let node_size_locked = defaults(ElementGroup::Node).any(|vp| vp.dependency("nodeSizeLocked"));

	let mut conv = Converter {
		lookup,
		net,
		node_size_locked,
	};

	for vp in doc.visual_properties.iter().filter(|vp| vp.properties_of == "network") {
		let components = conv.resolve_block(vp, None, "core");
		conv.write(components);
	}

	let mut saw_edge_defaults = false;
	for group in [ElementGroup::Node, ElementGroup::Edge] {
		for vp in defaults(group) {
			let mut components = conv.resolve_block(vp, Some(group), group.as_str());
			if group == ElementGroup::Edge {
				conv.arrow_rule(&mut components, true);
				saw_edge_defaults = true;
			}
			conv.write(components);
			conv.mappings(group, vp);
		}
	}
	if !saw_edge_defaults {
		let mut components = Vec::new();
		conv.arrow_rule(&mut components, true);
		conv.write(components);
	}

	for vp in &doc.visual_properties {
		let Some(group) = element_group(&vp.properties_of) else {
			continue;
		};
		let Some(id) = vp.applies_to.as_deref() else {
			debug!("cx-vizmap: {} block without applies_to, skipped", vp.properties_of);
			continue;
		};
		let mut components = conv.resolve_block(vp, Some(group), &format!("#{id}"));
		if group == ElementGroup::Edge {
			conv.arrow_rule(&mut components, false);
		}
		conv.write(components);
	}

	let mut net = conv.net;
	net.install_utility_rules();
	net.finish();
	info!(
		"cx-vizmap: converted {}: {} nodes, {} edges, {} rules",
		filename,
		doc.nodes.len(),
		doc.edges.len(),
		net.style.len()
	);
	Ok(net)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::cascade::Priority;
	use crate::engine::types::Representation;

	fn load(document: &str) -> Network {
		convert(document, "test.cx", &LookupTable::builtin(), &StyleConfig::default()).unwrap()
	}

	const DOC: &str = r##"[
		{"networkAttributes": [{"n": "name", "v": "Demo"}]},
		{"nodes": [{"@id": 1, "n": "a"}, {"@id": 2, "n": "b"}, {"@id": 3, "n": "c"}]},
		{"edges": [{"@id": 10, "s": 1, "t": 2, "i": "pp"}]},
		{"nodeAttributes": [
			{"po": 1, "n": "type", "v": "A"}, {"po": 2, "n": "type", "v": "B"},
			{"po": 3, "n": "type", "v": "A"}, {"po": 99, "n": "type", "v": "Z"},
			{"po": 1, "n": "score", "v": 0, "d": "double"},
			{"po": 2, "n": "score", "v": 50, "d": "double"},
			{"po": 3, "n": "score", "v": 100, "d": "double"}
		]},
		{"cartesianLayout": [{"node": 1, "x": 1.5, "y": -2}]},
		{"cyVisualProperties": [
			{"properties_of": "network", "properties": {"NETWORK_BACKGROUND_PAINT": "#FFFFFF"}},
			{"properties_of": "nodes:default",
			 "properties": {"NODE_FILL_COLOR": "#CCCCCC", "NODE_SHAPE": "ROUND_RECTANGLE",
				"NODE_SIZE": "35", "NODE_WIDTH": "60"},
			 "mappings": {
				"NODE_FILL_COLOR": {"type": "DISCRETE",
					"definition": "COL=type,T=string,K=0=A,V=0=#FF0000,K=1=B,V=1=#00FF00"},
				"NODE_WIDTH": {"type": "CONTINUOUS",
"definition": "COL=score,T=double,L=0=0,E=0=10,G=0=10,OV=0=0,L=1=150,E=1=150,G=1=200,OV=1=100"},
				"NODE_LABEL": {"type": "PASSTHROUGH", "definition": "COL=name,T=string"}
			 }},
			{"properties_of": "edges:default",
			 "properties": {"EDGE_STROKE_UNSELECTED_PAINT": "#333333"}},
			{"properties_of": "nodes", "applies_to": 2,
			 "properties": {"NODE_FILL_COLOR": "#0000FF"}}
		]}
	]"##;

	#[test]
	fn elements_and_attributes() {
		let net = load(DOC);
		assert_eq!(net.name, "Demo");
		assert_eq!(net.elements.len(), 4);
		let edge = net.element("10").unwrap();
		assert_eq!(edge.name.as_deref(), Some("a (pp) b"));
		assert_eq!(edge.attribute("interaction").unwrap().value, "pp");
		let node = net.element("1").unwrap();
		assert_eq!(node.position, Some(Position { x: 1.5, y: -2.0 }));
		assert_eq!(node.attribute("score").unwrap().datatype.as_deref(), Some("double"));
		assert!(net.aspect(ElementGroup::Node, "type").unwrap().values.iter().all(|v| v != "Z"));
	}

	#[test]
	fn defaults_and_size_precedence() {
		let net = load(DOC);
		assert_eq!(net.rule("core").unwrap().style["background-color"], "#FFFFFF");
		let node = net.rule("node").unwrap();
		assert_eq!(node.style["shape"], "round-rectangle");
		assert_eq!(node.style["width"], "60");
		assert!(!node.style.contains_key("height"));
		assert_eq!(node.style["label"], "data(name)");
		let edge = net.rule("edge").unwrap();
		assert_eq!(edge.style["line-color"], "#333333");
		assert_eq!(edge.style["target-arrow-color"], "#000000");
	}

	#[test]
	fn declared_mappings_are_replayed() {
		let net = load(DOC);
		assert_eq!(net.rule(".node_type_a").unwrap().style["background-color"], "#FF0000");
		assert_eq!(net.rule(".node_score_50").unwrap().style["width"], "80");
		let continuous = &net.mappings.nodes_continuous[0];
		assert_eq!(continuous.lower_default, "0");
		assert_eq!(continuous.greater_default, "200");
		assert!(matches!(continuous.representation, Representation::Chart(_)));
		assert_eq!(net.mappings.nodes_passthrough[0].column, "name");
		assert_eq!(net.aspect(ElementGroup::Node, "type").unwrap().map_pointer_discrete.len(), 1);
	}

	#[test]
	fn bypasses_and_utility_rules() {
		let net = load(DOC);
		let bypass = net.rule("#2").unwrap();
		assert_eq!(bypass.style["background-color"], "#0000FF");
		assert_eq!(bypass.priority, Priority::Element);
		assert_eq!(bypass.applied_to, ["2"]);
		assert!(net.rule("node.custom_highlight_color:selected").is_some());
		assert_eq!(net.style.last().unwrap().priority, Priority::Override);
		assert!(net.element("3").unwrap().classes.contains("text-wrap"));
	}

	#[test]
	fn arrow_colors_follow_line_color_when_enabled() {
		let net = load(
			r##"[
			{"edges": [{"@id": 1, "s": 1, "t": 1}]},
			{"cyVisualProperties": [
				{"properties_of": "edges:default",
				 "properties": {"EDGE_STROKE_UNSELECTED_PAINT": "#ABCDEF",
					"EDGE_TARGET_ARROW_UNSELECTED_PAINT": "#111111"},
				 "dependencies": {"arrowColorMatchesEdge": "true"}},
				{"properties_of": "edges", "applies_to": 1,
				 "properties": {"EDGE_STROKE_UNSELECTED_PAINT": "#222222"}}
			]}
		]"##,
		);
		assert!(net.arrow_color_matches_edge);
		let edge = net.rule("edge").unwrap();
		assert_eq!(edge.style["target-arrow-color"], "#ABCDEF");
		assert_eq!(edge.style["source-arrow-color"], "#ABCDEF");
		assert_eq!(net.rule("#1").unwrap().style["source-arrow-color"], "#222222");
	}

	#[test]
	fn locked_size_wins() {
		let net = load(
			r##"[{"cyVisualProperties": [{"properties_of": "nodes:default",
				"properties": {"NODE_SIZE": "35", "NODE_WIDTH": "60", "NODE_HEIGHT": "20"},
				"dependencies": {"nodeSizeLocked": "true"}}]}]"##,
		);
		let node = net.rule("node").unwrap();
		assert_eq!((node.style["width"].as_str(), node.style["height"].as_str()), ("35", "35"));
	}

	#[test]
	fn undeclared_size_leaves_renderer_default() {
		let net = load(
			r##"[{"nodes": [{"@id": 1}]}, {"cyVisualProperties": [{"properties_of": "nodes:default",
				"properties": {"NODE_SHAPE": "ELLIPSE"}}]}]"##,
		);
		let node = net.rule("node").unwrap();
		assert_eq!(node.style["shape"], "ellipse");
		assert!(["width", "height"].iter().all(|key| !node.style.contains_key(*key)));
	}

	#[test]
	fn empty_document_is_valid() {
		let net = load("[]");
		assert!(net.elements.is_empty());
		assert_eq!(net.rule("edge").unwrap().style["target-arrow-color"], "#000000");
		assert!(net.rule("node").is_none());
	}

	#[test]
	fn malformed_json_fails() {
		let err =
			convert("[{", "bad.cx", &LookupTable::builtin(), &StyleConfig::default()).unwrap_err();
		assert!(err.to_string().starts_with("bad.cx: malformed JSON"));
	}
}
