//! Network model: elements, attributes, per-column aspects, style rules and
//! the grouped mapping collections that reference them.
//!
//! The converter creates a [`Network`] once per loaded document. Everything
//! after that goes through the mapping engine in [`super::mappings`], which is
//! the only code that mutates classes, rules and mapping collections.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::cascade::Priority;
use super::config::StyleConfig;

/// Element group a record belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementGroup {
	/// A node record.
	Node,
	/// An edge record.
	Edge,
}

impl ElementGroup {
	/// Bare selector and class prefix for this group.
	pub const fn as_str(self) -> &'static str {
		match self {
			ElementGroup::Node => "node",
			ElementGroup::Edge => "edge",
		}
	}
}

/// Kind of value-to-style mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
	/// One style value per distinct data value.
	Discrete,
	/// Style value interpolated from a numeric column.
	Continuous,
	/// Column value copied into the style verbatim.
	Passthrough,
}

/// Identifies one mapping collection of a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingTarget {
	/// Element group the collection maps.
	pub group: ElementGroup,
	/// Mapping kind stored in the collection.
	pub kind: MappingKind,
}

/// Stable handle to a mapping.
///
/// Aspects point at mappings through these handles, so removing a mapping
/// never invalidates the back-pointers of unrelated columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingId(u64);

impl MappingId {
	/// Create a handle from a raw value received across the wasm boundary.
	#[must_use]
	pub const fn from_raw(id: u64) -> Self {
		Self(id)
	}

	/// Raw handle value.
	#[must_use]
	pub const fn raw(self) -> u64 {
		self.0
	}
}

/// Identifier of a loaded network within a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub u32);

/// Element identifier as it appears in the document.
pub type ElementId = String;

/// Layout position of a node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Position {
	pub x: f64,
	pub y: f64,
}

/// One data attribute attached to an element (or to the network itself).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
	/// Id of the element carrying the attribute.
	pub reference: ElementId,
	/// Cleaned column key, usable inside class names.
	pub key: String,
	/// Column key as written in the document.
	pub key_human_readable: String,
	/// Cleaned value, usable inside class names.
	pub value: String,
	/// Value as written in the document.
	pub value_human_readable: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub datatype: Option<String>,
}

/// A node or edge of the network.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
	pub id: ElementId,
	pub group: ElementGroup,
	pub name: Option<String>,
	/// Source node id, edges only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source: Option<ElementId>,
	/// Target node id, edges only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target: Option<ElementId>,
	pub attributes: Vec<Attribute>,
	/// Class names (without the leading dot) matched by class selectors.
	pub classes: BTreeSet<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub position: Option<Position>,
}

impl Element {
	/// Attribute with the given cleaned key.
	pub fn attribute(&self, key: &str) -> Option<&Attribute> {
		self.attributes.iter().find(|a| a.key == key)
	}

	/// Key/value view of the attributes, used when editing discrete mappings.
	pub fn map_object(&self) -> BTreeMap<&str, &str> {
		self.attributes
			.iter()
			.map(|a| (a.key.as_str(), a.value_human_readable.as_str()))
			.collect()
	}
}

/// Occurrence count of one distinct value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistogramBin {
	pub value: String,
	pub count: usize,
}

/// One point of the ordered scatter series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScatterPoint {
	pub x: usize,
	pub y: f64,
}

/// Value distribution of a column.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Distribution {
	/// Distinct values with their counts, in first-seen order.
	pub histogram: Vec<HistogramBin>,
	/// Numeric values sorted ascending, indexed by rank.
	pub scatter: Vec<ScatterPoint>,
}

/// Aggregate statistics and mapping back-pointers for one column of one group.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aspect {
	/// Column name as written in the document.
	pub name: String,
	/// Cleaned column key.
	pub key: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub datatype: Option<String>,
	/// Distinct raw values in first-seen order, numeric or not.
	pub values: Vec<String>,
	pub min: Option<f64>,
	pub max: Option<f64>,
	pub map_pointer_discrete: Vec<MappingId>,
	pub map_pointer_continuous: Vec<MappingId>,
	pub distribution: Distribution,
}

/// Selector with its style declarations.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRule {
	pub selector: String,
	pub style: BTreeMap<String, String>,
	/// Ids of the elements the selector currently matches.
	pub applied_to: Vec<ElementId>,
	pub priority: Priority,
}

impl StyleRule {
	/// Empty rule whose priority is derived from the selector.
	pub fn new(selector: impl Into<String>) -> Self {
		let selector = selector.into();
		let priority = Priority::of(&selector);
		Self {
			selector,
			style: BTreeMap::new(),
			applied_to: Vec::new(),
			priority,
		}
	}
}

/// One data value of a discrete mapping paired with its style value and selector.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscretePair {
	/// Data value as written by the user or the document.
	pub value: String,
	pub css_value: String,
	pub selector: String,
}

/// All pairs of a discrete mapping that drive one style key.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleMapEntry {
	pub css_key: String,
	/// Keys written alongside `css_key` (arrow colors following the line color).
	pub implied_keys: Vec<String>,
	pub pairs: Vec<DiscretePair>,
}

impl StyleMapEntry {
	/// Style values in pair order.
	pub fn css_values(&self) -> Vec<&str> {
		self.pairs.iter().map(|p| p.css_value.as_str()).collect()
	}

	/// Selectors in pair order.
	pub fn selectors(&self) -> Vec<&str> {
		self.pairs.iter().map(|p| p.selector.as_str()).collect()
	}
}

/// Discrete mappings of one column, grouped by style key.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscreteMapping {
	pub id: MappingId,
	pub group: ElementGroup,
	/// Cleaned column key.
	pub classifier: String,
	/// Distinct data values any entry maps.
	pub values: Vec<String>,
	pub style_map: Vec<StyleMapEntry>,
}

impl DiscreteMapping {
	/// Style keys driven by this mapping.
	pub fn style_keys(&self) -> Vec<&str> {
		self.style_map.iter().map(|e| e.css_key.as_str()).collect()
	}

	/// Distinct selectors across all entries.
	pub fn selectors(&self) -> Vec<&str> {
		let mut out: Vec<&str> = Vec::new();
		for selector in self.style_map.iter().flat_map(|e| e.selectors()) {
			if !out.contains(&selector) {
				out.push(selector);
			}
		}
		out
	}

	/// Entry for a style key.
	pub fn entry(&self, css_key: &str) -> Option<&StyleMapEntry> {
		self.style_map.iter().find(|e| e.css_key == css_key)
	}
}

/// Threshold with the style value used exactly at it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Breakpoint {
	pub threshold: f64,
	pub equal: String,
}

/// Color stop of a gradient, offset in percent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GradientStop {
	pub offset: f64,
	pub color: String,
}

/// Point of a line chart; the two flanking points carry an empty label.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartPoint {
	pub label: String,
	pub value: f64,
}

/// Visual summary of a continuous mapping: a chart or a gradient, never both.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Representation {
	/// Numeric values, rendered as a line chart.
	Chart(Vec<ChartPoint>),
	/// Hex colors, rendered as a gradient.
	Gradient(Vec<GradientStop>),
}

/// Continuous mapping of one numeric column onto one style key.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuousMapping {
	pub id: MappingId,
	pub group: ElementGroup,
	/// Cleaned column key.
	pub applies_to: String,
	pub style_key: String,
	pub implied_keys: Vec<String>,
	pub lower_default: String,
	pub greater_default: String,
	/// Strictly ascending by threshold.
	pub breakpoints: Vec<Breakpoint>,
	pub representation: Representation,
	/// Selectors this mapping wrote `style_key` into.
	pub selectors: Vec<String>,
}

impl ContinuousMapping {
	/// Thresholds in ascending order.
	pub fn thresholds(&self) -> Vec<f64> {
		self.breakpoints.iter().map(|b| b.threshold).collect()
	}

	/// Style values at each threshold.
	pub fn equals_at_threshold(&self) -> Vec<&str> {
		self.breakpoints.iter().map(|b| b.equal.as_str()).collect()
	}

	/// Whether the mapping produces colors.
	pub fn is_color(&self) -> bool {
		matches!(self.representation, Representation::Gradient(_))
	}
}

/// Column copied into group-default style keys as `data(<column>)`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassthroughMapping {
	pub id: MappingId,
	pub group: ElementGroup,
	pub column: String,
	pub style_keys: Vec<String>,
}

/// Mapping collections of a network.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mappings {
	pub nodes_discrete: Vec<DiscreteMapping>,
	pub edges_discrete: Vec<DiscreteMapping>,
	pub nodes_continuous: Vec<ContinuousMapping>,
	pub edges_continuous: Vec<ContinuousMapping>,
	pub nodes_passthrough: Vec<PassthroughMapping>,
	pub edges_passthrough: Vec<PassthroughMapping>,
}

impl Mappings {
	/// Discrete collection of a group.
	pub fn discrete(&self, group: ElementGroup) -> &Vec<DiscreteMapping> {
		match group {
			ElementGroup::Node => &self.nodes_discrete,
			ElementGroup::Edge => &self.edges_discrete,
		}
	}

	/// Mutable discrete collection of a group.
	pub fn discrete_mut(&mut self, group: ElementGroup) -> &mut Vec<DiscreteMapping> {
		match group {
			ElementGroup::Node => &mut self.nodes_discrete,
			ElementGroup::Edge => &mut self.edges_discrete,
		}
	}

	/// Continuous collection of a group.
	pub fn continuous(&self, group: ElementGroup) -> &Vec<ContinuousMapping> {
		match group {
			ElementGroup::Node => &self.nodes_continuous,
			ElementGroup::Edge => &self.edges_continuous,
		}
	}

	/// Mutable continuous collection of a group.
	pub fn continuous_mut(&mut self, group: ElementGroup) -> &mut Vec<ContinuousMapping> {
		match group {
			ElementGroup::Node => &mut self.nodes_continuous,
			ElementGroup::Edge => &mut self.edges_continuous,
		}
	}

	/// Passthrough collection of a group.
	pub fn passthrough(&self, group: ElementGroup) -> &Vec<PassthroughMapping> {
		match group {
			ElementGroup::Node => &self.nodes_passthrough,
			ElementGroup::Edge => &self.edges_passthrough,
		}
	}

	/// Mutable passthrough collection of a group.
	pub fn passthrough_mut(&mut self, group: ElementGroup) -> &mut Vec<PassthroughMapping> {
		match group {
			ElementGroup::Node => &mut self.nodes_passthrough,
			ElementGroup::Edge => &mut self.edges_passthrough,
		}
	}

	/// Collection and current index of a mapping.
	pub fn locate(&self, id: MappingId) -> Option<(MappingTarget, usize)> {
		for group in [ElementGroup::Node, ElementGroup::Edge] {
			if let Some(i) = self.discrete(group).iter().position(|m| m.id == id) {
				return Some((
					MappingTarget {
						group,
						kind: MappingKind::Discrete,
					},
					i,
				));
			}
			if let Some(i) = self.continuous(group).iter().position(|m| m.id == id) {
				return Some((
					MappingTarget {
						group,
						kind: MappingKind::Continuous,
					},
					i,
				));
			}
			if let Some(i) = self.passthrough(group).iter().position(|m| m.id == id) {
				return Some((
					MappingTarget {
						group,
						kind: MappingKind::Passthrough,
					},
					i,
				));
			}
		}
		None
	}
}

/// A loaded network: the aggregate root every engine operation works on.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
	pub id: NetworkId,
	pub name: String,
	pub filename: String,
	pub network_attributes: Vec<Attribute>,
	pub elements: Vec<Element>,
	/// Style cascade, kept sorted ascending by priority.
	pub style: Vec<StyleRule>,
	pub aspects_by_node: Vec<Aspect>,
	pub aspects_by_edge: Vec<Aspect>,
	pub mappings: Mappings,
	/// Line colors imply matching arrow colors.
	pub arrow_color_matches_edge: bool,
	#[serde(skip)]
	pub config: StyleConfig,
	#[serde(skip)]
	next_mapping_id: u64,
}

impl Network {
	/// Empty network for a document.
	pub fn new(filename: impl Into<String>, config: StyleConfig) -> Self {
		let filename = filename.into();
		Self {
			id: NetworkId::default(),
			name: filename.clone(),
			filename,
			network_attributes: Vec::new(),
			elements: Vec::new(),
			style: Vec::new(),
			aspects_by_node: Vec::new(),
			aspects_by_edge: Vec::new(),
			mappings: Mappings::default(),
			arrow_color_matches_edge: false,
			config,
			next_mapping_id: 0,
		}
	}

	/// Allocate a fresh mapping handle.
	pub(crate) fn next_mapping_id(&mut self) -> MappingId {
		self.next_mapping_id += 1;
		MappingId(self.next_mapping_id)
	}

	/// Elements of one group.
	pub fn elements_of(&self, group: ElementGroup) -> impl Iterator<Item = &Element> {
		self.elements.iter().filter(move |e| e.group == group)
	}

	/// Element by id.
	pub fn element(&self, id: &str) -> Option<&Element> {
		self.elements.iter().find(|e| e.id == id)
	}

	/// Aspects of one group.
	pub fn aspects(&self, group: ElementGroup) -> &Vec<Aspect> {
		match group {
			ElementGroup::Node => &self.aspects_by_node,
			ElementGroup::Edge => &self.aspects_by_edge,
		}
	}

	/// Mutable aspects of one group.
	pub fn aspects_mut(&mut self, group: ElementGroup) -> &mut Vec<Aspect> {
		match group {
			ElementGroup::Node => &mut self.aspects_by_node,
			ElementGroup::Edge => &mut self.aspects_by_edge,
		}
	}

	/// Aspect of a cleaned column key.
	pub fn aspect(&self, group: ElementGroup, key: &str) -> Option<&Aspect> {
		self.aspects(group).iter().find(|a| a.key == key)
	}

	/// Style rule by selector.
	pub fn rule(&self, selector: &str) -> Option<&StyleRule> {
		self.style.iter().find(|r| r.selector == selector)
	}

	/// Current collection indices of an aspect's back-pointers.
	///
	/// Handles that no longer resolve are left out, so the result always
	/// points at valid positions of the collection.
	pub fn pointer_positions(
		&self,
		group: ElementGroup,
		kind: MappingKind,
		key: &str,
	) -> Vec<usize> {
		let Some(aspect) = self.aspect(group, key) else {
			return Vec::new();
		};
		let ids = match kind {
			MappingKind::Discrete => &aspect.map_pointer_discrete,
			MappingKind::Continuous => &aspect.map_pointer_continuous,
			MappingKind::Passthrough => return Vec::new(),
		};
		ids.iter()
			.filter_map(|id| match kind {
				MappingKind::Discrete => {
					self.mappings.discrete(group).iter().position(|m| m.id == *id)
				}
				_ => self.mappings.continuous(group).iter().position(|m| m.id == *id),
			})
			.collect()
	}
}

/// Clean a raw key or value into a fragment usable inside a class name.
///
/// Lowercases, keeps ASCII alphanumerics, `-` and `_`, turns `.` into `_`
/// and drops everything else.
pub fn clean(raw: &str) -> String {
	raw.chars()
		.filter_map(|c| match c {
			'.' => Some('_'),
			c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => Some(c.to_ascii_lowercase()),
			_ => None,
		})
		.collect()
}

/// Clean a column name, folding Cytoscape's shared interaction column into `interaction`.
pub fn clean_column(raw: &str) -> String {
	let cleaned = clean(raw);
	if cleaned == "sharedinteraction" {
		"interaction".to_string()
	} else {
		cleaned
	}
}

/// Selector of the rule that carries one mapped value.
pub fn mapping_selector(group: ElementGroup, column: &str, value: &str) -> String {
	format!(".{}_{}_{}", group.as_str(), clean_column(column), clean(value))
}
