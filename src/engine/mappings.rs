//! Mapping maintenance.
//!
//! Adds, edits and removes discrete, continuous and passthrough mappings on a
//! live [`Network`]. Each operation keeps four things consistent:
//!
//! - the style rules the mapping writes into (a rule left without
//!   declarations is dropped);
//! - the element classes its selectors match (a class is stripped once no
//!   rule references it any more);
//! - the aspect back-pointers, which hold stable [`MappingId`]s;
//! - the cascade order and each rule's `applied_to` list.
//!
//! Callers are expected to validate input. Empty style values are skipped,
//! never written.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::cascade::{
	self, HIDE_LABEL_CLASS, HIGHLIGHT_CLASS, Selector, TEXT_WRAP_CLASS, UTILITY_CLASSES,
};
use super::color::is_hex;
use super::interpolate::{Bound, format_number, interpolate};
use super::types::{
	Breakpoint, ChartPoint, ContinuousMapping, DiscreteMapping, DiscretePair, ElementGroup,
	GradientStop, MappingId, MappingKind, Network, PassthroughMapping, Representation,
	StyleMapEntry, StyleRule, clean, clean_column, mapping_selector,
};

pub(crate) const ARROW_COLOR_KEYS: [&str; 2] = ["target-arrow-color", "source-arrow-color"];

/// One data value and the style value it maps to.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscreteEntry {
	pub value: String,
	pub css_value: String,
}

impl DiscreteEntry {
	pub fn new(value: impl Into<String>, css_value: impl Into<String>) -> Self {
		Self {
			value: value.into(),
			css_value: css_value.into(),
		}
	}
}

/// Discrete mapping of one column onto one style key.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscreteMappingRequest {
	pub group: ElementGroup,
	/// Column name, raw or cleaned.
	pub classifier: String,
	pub css_key: String,
	pub entries: Vec<DiscreteEntry>,
}

/// Threshold and style value as typed by the user; thresholds may be empty.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BreakpointInput {
	pub threshold: String,
	pub equal: String,
}

impl BreakpointInput {
	pub fn new(threshold: impl Into<String>, equal: impl Into<String>) -> Self {
		Self {
			threshold: threshold.into(),
			equal: equal.into(),
		}
	}
}

/// Continuous mapping of one numeric column onto one style key.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuousMappingRequest {
	pub group: ElementGroup,
	pub column: String,
	pub css_key: String,
	pub lower: String,
	pub greater: String,
	pub breakpoints: Vec<BreakpointInput>,
}

/// A user edit, applied through [`Network::apply`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum MappingEdit {
	AddDiscrete(DiscreteMappingRequest),
	EditDiscrete(DiscreteMappingRequest),
	AddContinuous(ContinuousMappingRequest),
	EditContinuous {
		id: MappingId,
		lower: String,
		greater: String,
		breakpoints: Vec<BreakpointInput>,
	},
	AddPassthrough {
		group: ElementGroup,
		column: String,
		#[serde(rename = "styleKeys")]
		style_keys: Vec<String>,
	},
	Remove {
		id: MappingId,
	},
	RemoveStyleColumn {
		id: MappingId,
		#[serde(rename = "cssKey")]
		css_key: String,
	},
	SetLabelsHidden {
		hidden: bool,
	},
	SetHighlightColor {
		color: String,
	},
}

/// Result of [`Network::apply`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum EditOutcome {
	/// A mapping was created or replaced.
	Mapped { id: MappingId },
	/// The network changed.
	Updated,
	/// Nothing matched; the network is unchanged.
	Skipped,
}

impl EditOutcome {
	fn from_id(id: Option<MappingId>) -> Self {
		id.map_or(EditOutcome::Skipped, |id| EditOutcome::Mapped { id })
	}

	fn from_flag(changed: bool) -> Self {
		if changed { EditOutcome::Updated } else { EditOutcome::Skipped }
	}
}

/// Style value of a continuous mapping for one input.
///
/// Inputs below the lowest threshold interpolate from `(min, lower)` to the
/// first breakpoint, inputs above the highest from the last breakpoint to
/// `(max, greater)`. `breakpoints` must be non-empty and strictly ascending.
pub fn classify(
	input: f64,
	breakpoints: &[Breakpoint],
	lower: &str,
	greater: &str,
	(min, max): (f64, f64),
	digits: u32,
) -> String {
	if let Some(exact) = breakpoints.iter().find(|b| b.threshold == input) {
		return exact.equal.clone();
	}
	match breakpoints.iter().position(|b| b.threshold > input) {
		Some(0) => interpolate(input, Bound::new(min, lower), bound(&breakpoints[0]), digits),
		Some(i) => interpolate(input, bound(&breakpoints[i - 1]), bound(&breakpoints[i]), digits),
		None => {
			let last = &breakpoints[breakpoints.len() - 1];
			interpolate(input, bound(last), Bound::new(max, greater), digits)
		}
	}
}

fn bound(b: &Breakpoint) -> Bound<'_> {
	Bound::new(b.threshold, &b.equal)
}

/// Parse user breakpoints: cleared or non-numeric thresholds and empty values
/// are dropped, the rest sorted with duplicate thresholds keeping the first.
pub fn parse_breakpoints(inputs: &[BreakpointInput]) -> Vec<Breakpoint> {
	let mut out: Vec<Breakpoint> = inputs
		.iter()
		.filter(|b| !b.equal.is_empty())
		.filter_map(|b| {
			let threshold = b.threshold.trim();
			if threshold.is_empty() {
				return None;
			}
			match threshold.parse::<f64>() {
				Ok(t) if t.is_finite() => Some(Breakpoint {
					threshold: t,
					equal: b.equal.clone(),
				}),
				_ => {
					debug!("cx-vizmap: dropping non-numeric threshold {:?}", b.threshold);
					None
				}
			}
		})
		.collect();
	out.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
	out.dedup_by(|a, b| a.threshold == b.threshold);
	out
}

fn representation(
	breakpoints: &[Breakpoint],
	lower: &str,
	greater: &str,
	(min, max): (f64, f64),
	network: &Network,
) -> Representation {
	if is_hex(lower) {
		let span = max - min;
		let mut stops = vec![GradientStop {
			offset: network.config.gradient_lower_offset,
			color: lower.to_string(),
		}];
		stops.extend(breakpoints.iter().map(|b| GradientStop {
			offset: if span > 0.0 {
				((b.threshold - min) / span * 100.0).clamp(0.0, 100.0)
			} else {
				50.0
			},
			color: b.equal.clone(),
		}));
		stops.push(GradientStop {
			offset: network.config.gradient_upper_offset,
			color: greater.to_string(),
		});
		Representation::Gradient(stops)
	} else {
		let point = |label: String, value: &str| {
			value
				.trim()
				.parse::<f64>()
				.ok()
				.map(|value| ChartPoint { label, value })
		};
		let mut points: Vec<ChartPoint> = point(String::new(), lower).into_iter().collect();
		let digits = network.config.significant_digits;
		points.extend(
			breakpoints
				.iter()
				.filter_map(|b| point(format_number(b.threshold, digits), &b.equal)),
		);
		points.extend(point(String::new(), greater));
		Representation::Chart(points)
	}
}

fn entry_keys(entry: &StyleMapEntry) -> impl Iterator<Item = &str> {
	std::iter::once(entry.css_key.as_str()).chain(entry.implied_keys.iter().map(String::as_str))
}

impl Network {
	/// Apply a user edit.
	pub fn apply(&mut self, edit: MappingEdit) -> EditOutcome {
		match edit {
			MappingEdit::AddDiscrete(request) => {
				EditOutcome::from_id(self.add_discrete_mapping(request))
			}
			MappingEdit::EditDiscrete(request) => {
				EditOutcome::from_flag(self.edit_discrete_mapping(request))
			}
			MappingEdit::AddContinuous(request) => {
				EditOutcome::from_id(self.add_continuous_mapping(request))
			}
			MappingEdit::EditContinuous {
				id,
				lower,
				greater,
				breakpoints,
			} => {
				let edited = self.edit_continuous_mapping(id, &lower, &greater, &breakpoints);
				EditOutcome::from_flag(edited)
			}
			MappingEdit::AddPassthrough {
				group,
				column,
				style_keys,
			} => EditOutcome::from_id(self.add_passthrough_mapping(group, &column, style_keys)),
			MappingEdit::Remove { id } => EditOutcome::from_flag(self.remove_mapping(id)),
			MappingEdit::RemoveStyleColumn { id, css_key } => {
				EditOutcome::from_flag(self.remove_style_column(id, &css_key))
			}
			MappingEdit::SetLabelsHidden { hidden } => {
				self.set_labels_hidden(hidden);
				EditOutcome::Updated
			}
			MappingEdit::SetHighlightColor { color } => {
				EditOutcome::from_flag(self.set_highlight_color(&color))
			}
		}
	}

	/// Add discrete entries for a column, creating the grouped mapping on first use.
	///
	/// Entries for selectors the mapping already has overwrite their value.
	/// Returns `None` when nothing non-empty was mapped.
	pub fn add_discrete_mapping(&mut self, request: DiscreteMappingRequest) -> Option<MappingId> {
		let group = request.group;
		let column = clean_column(&request.classifier);
		let existing = self
			.mappings
			.discrete(group)
			.iter()
			.position(|m| m.classifier == column);

		let (index, created) = match existing {
			Some(i) => (i, false),
			None => {
				if request.entries.iter().all(|e| e.css_value.is_empty()) {
					debug!("cx-vizmap: discrete mapping on {} has no values, skipped", column);
					return None;
				}
				let id = self.next_mapping_id();
				let collection = self.mappings.discrete_mut(group);
				collection.push(DiscreteMapping {
					id,
					group,
					classifier: column.clone(),
					values: Vec::new(),
					style_map: Vec::new(),
				});
				(collection.len() - 1, true)
			}
		};

		self.upsert_discrete(group, index, &request.css_key, &request.entries);
		let id = self.mappings.discrete(group)[index].id;
		if created {
			if let Some(aspect) = self.aspects_mut(group).iter_mut().find(|a| a.key == column) {
				if !aspect.map_pointer_discrete.contains(&id) {
					aspect.map_pointer_discrete.push(id);
				}
			}
		}
		self.finish();
		Some(id)
	}

	/// Edit the entries of an existing discrete mapping for one style key.
	///
	/// Returns false when no mapping on the classifier drives that key.
	pub fn edit_discrete_mapping(&mut self, request: DiscreteMappingRequest) -> bool {
		let group = request.group;
		let column = clean_column(&request.classifier);
		let Some(index) = self
			.mappings
			.discrete(group)
			.iter()
			.position(|m| m.classifier == column && m.entry(&request.css_key).is_some())
		else {
			return false;
		};
		self.upsert_discrete(group, index, &request.css_key, &request.entries);
		self.finish();
		true
	}

	fn upsert_discrete(
		&mut self,
		group: ElementGroup,
		index: usize,
		css_key: &str,
		entries: &[DiscreteEntry],
	) {
		let implied = self.implied_keys(group, css_key);
		let column = self.mappings.discrete(group)[index].classifier.clone();

		for entry in entries {
			if entry.css_value.is_empty() {
				continue;
			}
			let selector = mapping_selector(group, &column, &entry.value);
			let mapping = &mut self.mappings.discrete_mut(group)[index];
			let style_entry = match mapping.style_map.iter().position(|e| e.css_key == css_key) {
				Some(i) => &mut mapping.style_map[i],
				None => {
					mapping.style_map.push(StyleMapEntry {
						css_key: css_key.to_string(),
						implied_keys: implied.clone(),
						pairs: Vec::new(),
					});
					let last = mapping.style_map.len() - 1;
					&mut mapping.style_map[last]
				}
			};
			let keys = style_entry.implied_keys.clone();
			let introduced = match style_entry.pairs.iter_mut().find(|p| p.selector == selector) {
				Some(pair) => {
					pair.value = entry.value.clone();
					pair.css_value = entry.css_value.clone();
					false
				}
				None => {
					style_entry.pairs.push(DiscretePair {
						value: entry.value.clone(),
						css_value: entry.css_value.clone(),
						selector: selector.clone(),
					});
					true
				}
			};
			if !mapping.values.contains(&entry.value) {
				mapping.values.push(entry.value.clone());
			}

			if introduced {
				self.tag_matching(group, &column, &clean(&entry.value), &selector[1..]);
			}
			self.set_style(&selector, css_key, &entry.css_value);
			for key in &keys {
				self.set_style(&selector, key, &entry.css_value);
			}
		}
	}

	/// Add a continuous mapping, or replace the one already driving the same
	/// column and style key.
	///
	/// Returns `None` when no breakpoint has a numeric threshold.
	pub fn add_continuous_mapping(
		&mut self,
		request: ContinuousMappingRequest,
	) -> Option<MappingId> {
		let group = request.group;
		let column = clean_column(&request.column);
		let breakpoints = parse_breakpoints(&request.breakpoints);
		if breakpoints.is_empty() {
			warn!(
				"cx-vizmap: continuous mapping {} -> {} has no usable breakpoint, skipped",
				column, request.css_key
			);
			return None;
		}

		let existing = self
			.mappings
			.continuous(group)
			.iter()
			.position(|m| m.applies_to == column && m.style_key == request.css_key);
		if let Some(index) = existing {
			self.rebuild_continuous(group, index, &request.lower, &request.greater, breakpoints);
			self.finish();
			return Some(self.mappings.continuous(group)[index].id);
		}

		let id = self.next_mapping_id();
		let implied_keys = self.implied_keys(group, &request.css_key);
		self.mappings.continuous_mut(group).push(ContinuousMapping {
			id,
			group,
			applies_to: column.clone(),
			style_key: request.css_key,
			implied_keys,
			lower_default: request.lower,
			greater_default: request.greater,
			breakpoints,
			representation: Representation::Chart(Vec::new()),
			selectors: Vec::new(),
		});
		let index = self.mappings.continuous(group).len() - 1;
		self.apply_continuous(group, index);
		if let Some(aspect) = self.aspects_mut(group).iter_mut().find(|a| a.key == column) {
			aspect.map_pointer_continuous.push(id);
		}
		self.finish();
		Some(id)
	}

	/// Replace the breakpoints and defaults of a continuous mapping and restyle
	/// every element of its column.
	///
	/// Empty defaults keep their previous value. Returns false when the mapping
	/// does not exist or no breakpoint survives.
	pub fn edit_continuous_mapping(
		&mut self,
		id: MappingId,
		lower: &str,
		greater: &str,
		breakpoints: &[BreakpointInput],
	) -> bool {
		let Some((target, index)) = self.mappings.locate(id) else {
			return false;
		};
		if target.kind != MappingKind::Continuous {
			return false;
		}
		let breakpoints = parse_breakpoints(breakpoints);
		if breakpoints.is_empty() {
			warn!("cx-vizmap: edit leaves mapping {} without breakpoints, ignored", id.raw());
			return false;
		}
		self.rebuild_continuous(target.group, index, lower, greater, breakpoints);
		self.finish();
		true
	}

	fn rebuild_continuous(
		&mut self,
		group: ElementGroup,
		index: usize,
		lower: &str,
		greater: &str,
		breakpoints: Vec<Breakpoint>,
	) {
		self.unapply_continuous(group, index);
		let mapping = &mut self.mappings.continuous_mut(group)[index];
		if !lower.is_empty() {
			mapping.lower_default = lower.to_string();
		}
		if !greater.is_empty() {
			mapping.greater_default = greater.to_string();
		}
		mapping.breakpoints = breakpoints;
		self.apply_continuous(group, index);
	}

	fn apply_continuous(&mut self, group: ElementGroup, index: usize) {
		let mapping = &self.mappings.continuous(group)[index];
		let column = mapping.applies_to.clone();
		let range = self.column_range(group, &column).unwrap_or_else(|| {
			let first = mapping.breakpoints[0].threshold;
			let last = mapping.breakpoints[mapping.breakpoints.len() - 1].threshold;
			(first, last)
		});
		let digits = self.config.significant_digits;
		let keys: Vec<String> = std::iter::once(mapping.style_key.clone())
			.chain(mapping.implied_keys.iter().cloned())
			.collect();

		let mut assignments: Vec<(String, String, String)> = Vec::new();
		for element in self.elements_of(group) {
			let Some(attr) = element.attribute(&column) else {
				continue;
			};
			let Ok(input) = attr.value_human_readable.trim().parse::<f64>() else {
				continue;
			};
			if !input.is_finite() {
				continue;
			}
			let value = classify(
				input,
				&mapping.breakpoints,
				&mapping.lower_default,
				&mapping.greater_default,
				range,
				digits,
			);
			let selector = mapping_selector(group, &column, &attr.value_human_readable);
			assignments.push((element.id.clone(), selector, value));
		}
		let representation = representation(
			&mapping.breakpoints,
			&mapping.lower_default,
			&mapping.greater_default,
			range,
			self,
		);

		let mut selectors: Vec<String> = Vec::new();
		for (element_id, selector, value) in assignments {
			let element = self
				.elements
				.iter_mut()
				.find(|e| e.id == element_id && e.group == group);
			if let Some(element) = element {
				element.classes.insert(selector[1..].to_string());
			}
			for key in &keys {
				self.set_style(&selector, key, &value);
			}
			if !selectors.contains(&selector) {
				selectors.push(selector);
			}
		}
		let mapping = &mut self.mappings.continuous_mut(group)[index];
		mapping.selectors = selectors;
		mapping.representation = representation;
	}

	fn unapply_continuous(&mut self, group: ElementGroup, index: usize) {
		let mapping = &mut self.mappings.continuous_mut(group)[index];
		let selectors = std::mem::take(&mut mapping.selectors);
		let keys: Vec<String> = std::iter::once(mapping.style_key.clone())
			.chain(mapping.implied_keys.iter().cloned())
			.collect();
		for selector in &selectors {
			for key in &keys {
				self.clear_style(selector, key);
			}
		}
	}

	/// Copy a column into group-default style keys as `data(<column>)`.
	pub fn add_passthrough_mapping(
		&mut self,
		group: ElementGroup,
		column: &str,
		style_keys: Vec<String>,
	) -> Option<MappingId> {
		if style_keys.is_empty() {
			return None;
		}
		let column = clean_column(column);
		let value = format!("data({column})");
		for key in &style_keys {
			self.set_style(group.as_str(), key, &value);
		}
		let id = self.next_mapping_id();
		self.mappings.passthrough_mut(group).push(PassthroughMapping {
			id,
			group,
			column,
			style_keys,
		});
		self.finish();
		Some(id)
	}

	/// Remove a whole mapping and every effect it had.
	pub fn remove_mapping(&mut self, id: MappingId) -> bool {
		let Some((target, index)) = self.mappings.locate(id) else {
			return false;
		};
		let group = target.group;
		match target.kind {
			MappingKind::Discrete => {
				let mapping = self.mappings.discrete_mut(group).remove(index);
				let mut cleared = Vec::new();
				for entry in &mapping.style_map {
					self.unapply_style_entry(entry);
					cleared.extend(entry_keys(entry).map(str::to_string));
				}
				self.restore_column(group, &mapping.classifier, &cleared);
			}
			MappingKind::Continuous => {
				self.unapply_continuous(group, index);
				let mapping = self.mappings.continuous_mut(group).remove(index);
				let cleared: Vec<String> = std::iter::once(mapping.style_key)
					.chain(mapping.implied_keys)
					.collect();
				self.restore_column(group, &mapping.applies_to, &cleared);
			}
			MappingKind::Passthrough => {
				let mapping = self.mappings.passthrough_mut(group).remove(index);
				for key in &mapping.style_keys {
					self.clear_style(group.as_str(), key);
				}
			}
		}
		self.drop_pointer(group, id);
		self.finish();
		true
	}

	/// Remove one style key of a discrete mapping; the mapping goes away with
	/// its last key. Continuous mappings drive a single key, so this removes
	/// them when the key matches.
	pub fn remove_style_column(&mut self, id: MappingId, css_key: &str) -> bool {
		let Some((target, index)) = self.mappings.locate(id) else {
			return false;
		};
		let group = target.group;
		match target.kind {
			MappingKind::Discrete => {
				let mapping = &mut self.mappings.discrete_mut(group)[index];
				let Some(pos) = mapping.style_map.iter().position(|e| e.css_key == css_key) else {
					return false;
				};
				let entry = mapping.style_map.remove(pos);
				let remaining: Vec<String> = mapping
					.style_map
					.iter()
					.flat_map(|e| e.pairs.iter().map(|p| p.value.clone()))
					.collect();
				mapping.values.retain(|v| remaining.contains(v));
				let column = mapping.classifier.clone();
				if mapping.style_map.is_empty() {
					self.mappings.discrete_mut(group).remove(index);
					self.drop_pointer(group, id);
				}
				self.unapply_style_entry(&entry);
				let cleared: Vec<String> = entry_keys(&entry).map(str::to_string).collect();
				self.restore_column(group, &column, &cleared);
				self.finish();
				true
			}
			MappingKind::Continuous => {
				if self.mappings.continuous(group)[index].style_key != css_key {
					return false;
				}
				self.remove_mapping(id)
			}
			MappingKind::Passthrough => false,
		}
	}

	/// Show or hide every label through the utility override rule.
	pub fn set_labels_hidden(&mut self, hidden: bool) {
		let selector = format!(".{HIDE_LABEL_CLASS}");
		if hidden {
			self.set_style(&selector, "text-opacity", "0");
		} else if let Some(rule) = self.style.iter_mut().find(|r| r.selector == selector) {
			rule.style.remove("text-opacity");
		}
		self.finish();
	}

	/// Change the color of the selection highlight rules.
	pub fn set_highlight_color(&mut self, color: &str) -> bool {
		if color.is_empty() {
			return false;
		}
		self.config.highlight_color = color.to_string();
		self.write_highlight_rules();
		self.finish();
		true
	}

	/// Tag every element with the utility classes and make sure their rules exist.
	pub(crate) fn install_utility_rules(&mut self) {
		for element in &mut self.elements {
			for class in UTILITY_CLASSES {
				element.classes.insert(class.to_string());
			}
		}
		self.write_highlight_rules();
		let hide = format!(".{HIDE_LABEL_CLASS}");
		if self.rule(&hide).is_none() {
			self.style.push(StyleRule::new(hide));
		}
		self.set_style(&format!(".{TEXT_WRAP_CLASS}"), "text-wrap", "wrap");
	}

	fn write_highlight_rules(&mut self) {
		let color = self.config.highlight_color.clone();
		self.set_style(&format!("node.{HIGHLIGHT_CLASS}:selected"), "background-color", &color);
		let edge = format!("edge.{HIGHLIGHT_CLASS}:selected");
		for key in std::iter::once("line-color").chain(ARROW_COLOR_KEYS) {
			self.set_style(&edge, key, &color);
		}
	}

	/// Write one declaration, creating the rule when missing. Empty values are skipped.
	pub(crate) fn set_style(&mut self, selector: &str, key: &str, value: &str) {
		if value.is_empty() {
			return;
		}
		match self.style.iter_mut().find(|r| r.selector == selector) {
			Some(rule) => {
				rule.style.insert(key.to_string(), value.to_string());
			}
			None => {
				let mut rule = StyleRule::new(selector);
				rule.style.insert(key.to_string(), value.to_string());
				self.style.push(rule);
			}
		}
	}

	/// Remove one declaration. A rule left empty is dropped, and its class is
	/// stripped from elements once no remaining rule uses it.
	pub(crate) fn clear_style(&mut self, selector: &str, key: &str) {
		let Some(pos) = self.style.iter().position(|r| r.selector == selector) else {
			return;
		};
		self.style[pos].style.remove(key);
		if !self.style[pos].style.is_empty() {
			return;
		}
		self.style.remove(pos);
		let Some(class) = Selector::parse(selector).class else {
			return;
		};
		if UTILITY_CLASSES.contains(&class) {
			return;
		}
		let still_used = self
			.style
			.iter()
			.any(|r| Selector::parse(&r.selector).class == Some(class));
		if !still_used {
			for element in &mut self.elements {
				element.classes.remove(class);
			}
		}
	}

	fn unapply_style_entry(&mut self, entry: &StyleMapEntry) {
		for pair in &entry.pairs {
			self.clear_style(&pair.selector, &entry.css_key);
			for key in &entry.implied_keys {
				self.clear_style(&pair.selector, key);
			}
		}
	}

	/// Rewrite the `keys` that surviving mappings on `column` declare.
	///
	/// Discrete and continuous mappings on one column share per-value
	/// selectors, so unapplying one of them also clears the other's
	/// declarations and may strip its classes.
	fn restore_column(&mut self, group: ElementGroup, column: &str, keys: &[String]) {
		let writes = |key: &str| keys.iter().any(|k| k == key);
		let entries: Vec<StyleMapEntry> = self
			.mappings
			.discrete(group)
			.iter()
			.filter(|m| m.classifier == column)
			.flat_map(|m| m.style_map.iter())
			.filter(|e| entry_keys(e).any(writes))
			.cloned()
			.collect();
		for entry in &entries {
			for pair in &entry.pairs {
				self.tag_matching(group, column, &clean(&pair.value), &pair.selector[1..]);
				for key in entry_keys(entry) {
					self.set_style(&pair.selector, key, &pair.css_value);
				}
			}
		}

		let continuous: Vec<usize> = self
			.mappings
			.continuous(group)
			.iter()
			.enumerate()
			.filter(|(_, m)| m.applies_to == column)
			.filter(|(_, m)| {
				writes(m.style_key.as_str()) || m.implied_keys.iter().any(|k| writes(k.as_str()))
			})
			.map(|(i, _)| i)
			.collect();
		for index in continuous {
			debug!("cx-vizmap: restoring continuous mapping on {}", column);
			self.apply_continuous(group, index);
		}
	}

	fn tag_matching(&mut self, group: ElementGroup, column: &str, value: &str, class: &str) {
		for element in self.elements.iter_mut().filter(|e| e.group == group) {
			if element.attribute(column).is_some_and(|a| a.value == value) {
				element.classes.insert(class.to_string());
			}
		}
	}

	fn drop_pointer(&mut self, group: ElementGroup, id: MappingId) {
		for aspect in self.aspects_mut(group) {
			aspect.map_pointer_discrete.retain(|p| *p != id);
			aspect.map_pointer_continuous.retain(|p| *p != id);
		}
	}

	fn implied_keys(&self, group: ElementGroup, css_key: &str) -> Vec<String> {
		if group == ElementGroup::Edge && css_key == "line-color" && self.arrow_color_matches_edge {
			ARROW_COLOR_KEYS.iter().map(|k| k.to_string()).collect()
		} else {
			Vec::new()
		}
	}

	/// Numeric min/max of a column across the group's elements.
	pub fn column_range(&self, group: ElementGroup, column: &str) -> Option<(f64, f64)> {
		self.elements_of(group)
			.filter_map(|e| e.attribute(column))
			.filter_map(|a| a.value_human_readable.trim().parse::<f64>().ok())
			.filter(|v| v.is_finite())
			.fold(None, |acc, v| match acc {
				None => Some((v, v)),
				Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
			})
	}

	/// Refresh rule targets and cascade order after a mutation.
	pub(crate) fn finish(&mut self) {
		let targets: Vec<Vec<String>> = self
			.style
			.iter()
			.map(|r| cascade::targets_of(&r.selector, &self.elements))
			.collect();
		for (rule, applied_to) in self.style.iter_mut().zip(targets) {
			rule.applied_to = applied_to;
		}
		cascade::order(&mut self.style);
		#[cfg(debug_assertions)]
		self.check_invariants();
	}

	#[cfg(debug_assertions)]
	fn check_invariants(&self) {
		for group in [ElementGroup::Node, ElementGroup::Edge] {
			for aspect in self.aspects(group) {
				for id in &aspect.map_pointer_discrete {
					debug_assert!(
						self.mappings.discrete(group).iter().any(|m| m.id == *id),
						"dangling discrete pointer on {}",
						aspect.key
					);
				}
				for id in &aspect.map_pointer_continuous {
					debug_assert!(
						self.mappings.continuous(group).iter().any(|m| m.id == *id),
						"dangling continuous pointer on {}",
						aspect.key
					);
				}
			}
			for mapping in self.mappings.continuous(group) {
				debug_assert!(
					mapping.breakpoints.windows(2).all(|w| w[0].threshold < w[1].threshold),
					"thresholds not strictly ascending"
				);
			}
			for mapping in self.mappings.discrete(group) {
				for entry in &mapping.style_map {
					let selectors = entry.selectors();
					debug_assert!(
						selectors.iter().enumerate().all(|(i, s)| !selectors[..i].contains(s)),
						"duplicate selector in {} entry",
						entry.css_key
					);
				}
			}
		}
		debug_assert!(self.style.windows(2).all(|w| w[0].priority <= w[1].priority));
	}
}
