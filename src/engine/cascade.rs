//! Style cascade ordering.
//!
//! Every rule gets a priority derived from the shape of its selector alone:
//!
//! | selector                                   | priority |
//! |--------------------------------------------|----------|
//! | bare tag (`node`, `edge`, `core`)          | 0        |
//! | class without digits (`.node_type_a`)      | 1        |
//! | class with digits, or an id (`#12`)        | 2        |
//! | pseudo-selector (`node:selected`)          | 3        |
//! | utility override class (`.hide_label`)     | 4        |
//!
//! The renderer applies rules in order, so the cascade is kept sorted
//! ascending and later, more specific rules win.

use serde::Serialize;

use super::types::{Element, ElementGroup, StyleRule};

/// Class tagging elements for the highlight override rules.
pub const HIGHLIGHT_CLASS: &str = "custom_highlight_color";
/// Class tagging elements for the label hiding override rule.
pub const HIDE_LABEL_CLASS: &str = "hide_label";
/// Class tagging elements for the label wrapping override rule.
pub const TEXT_WRAP_CLASS: &str = "text-wrap";

/// Utility classes every element carries.
pub const UTILITY_CLASSES: [&str; 3] = [HIGHLIGHT_CLASS, HIDE_LABEL_CLASS, TEXT_WRAP_CLASS];

/// Cascade priority of a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "u8")]
pub enum Priority {
	/// Bare tag selector.
	Default = 0,
	/// Column-level class selector.
	Aspect = 1,
	/// Element- or value-specific selector.
	Element = 2,
	/// Pseudo-selector such as `:selected`.
	Pseudo = 3,
	/// Utility override class.
	Override = 4,
}

impl From<Priority> for u8 {
	fn from(p: Priority) -> u8 {
		p as u8
	}
}

impl Priority {
	/// Derive the priority of a selector.
	pub fn of(selector: &str) -> Priority {
		let parsed = Selector::parse(selector);
		if parsed
			.class
			.as_deref()
			.is_some_and(|c| UTILITY_CLASSES.contains(&c))
		{
			return Priority::Override;
		}
		if parsed.pseudo.is_some() {
			return Priority::Pseudo;
		}
		if parsed.id.is_some() {
			return Priority::Element;
		}
		match parsed.class {
			Some(class) if class.chars().any(|c| c.is_ascii_digit()) => Priority::Element,
			Some(_) => Priority::Aspect,
			None => Priority::Default,
		}
	}
}

/// Parts of the selector shapes the engine produces.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector<'a> {
	/// `node`, `edge` or `core` when the selector starts with a tag.
	pub tag: Option<&'a str>,
	pub class: Option<&'a str>,
	pub id: Option<&'a str>,
	/// Pseudo-class without the colon.
	pub pseudo: Option<&'a str>,
}

impl<'a> Selector<'a> {
	/// Split `tag.class#id:pseudo` into its parts. Every part is optional.
	pub fn parse(selector: &'a str) -> Self {
		let (base, pseudo) = match selector.split_once(':') {
			Some((base, pseudo)) => (base, Some(pseudo)),
			None => (selector, None),
		};
		let mut out = Selector {
			pseudo,
			..Selector::default()
		};
		let (head, id) = match base.split_once('#') {
			Some((head, id)) => (head, Some(id)),
			None => (base, None),
		};
		out.id = id.filter(|s| !s.is_empty());
		let (tag, class) = match head.split_once('.') {
			Some((tag, class)) => (tag, Some(class)),
			None => (head, None),
		};
		out.tag = Some(tag).filter(|s| !s.is_empty());
		out.class = class.filter(|s| !s.is_empty());
		out
	}

	/// Whether the selector's base part matches an element.
	pub fn matches(&self, element: &Element) -> bool {
		match self.tag {
			Some("node") if element.group != ElementGroup::Node => return false,
			Some("edge") if element.group != ElementGroup::Edge => return false,
			Some("node") | Some("edge") | None => {}
			Some(_) => return false,
		}
		if self.id.is_some_and(|id| id != element.id) {
			return false;
		}
		if self.class.is_some_and(|c| !element.classes.contains(c)) {
			return false;
		}
		self.tag.is_some() || self.class.is_some() || self.id.is_some()
	}
}

/// Ids of the elements a selector matches.
pub fn targets_of(selector: &str, elements: &[Element]) -> Vec<String> {
	let parsed = Selector::parse(selector);
	elements
		.iter()
		.filter(|e| parsed.matches(e))
		.map(|e| e.id.clone())
		.collect()
}

/// Sort rules ascending by priority, in place. Ties keep their relative order.
pub fn order(rules: &mut [StyleRule]) {
	rules.sort_by_key(|r| r.priority);
}

/// Owned variant of [`order`].
pub fn ordered(mut rules: Vec<StyleRule>) -> Vec<StyleRule> {
	order(&mut rules);
	rules
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn priority_follows_selector_shape() {
		assert_eq!(Priority::of("node"), Priority::Default);
		assert_eq!(Priority::of("core"), Priority::Default);
		assert_eq!(Priority::of(".node_type_a"), Priority::Aspect);
		assert_eq!(Priority::of(".node_score_50"), Priority::Element);
		assert_eq!(Priority::of("#12"), Priority::Element);
		assert_eq!(Priority::of("node:selected"), Priority::Pseudo);
		assert_eq!(Priority::of(".hide_label"), Priority::Override);
		assert_eq!(Priority::of(".text-wrap"), Priority::Override);
		assert_eq!(
			Priority::of("edge.custom_highlight_color:selected"),
			Priority::Override
		);
	}

	#[test]
	fn selector_parse_splits_parts() {
		let s = Selector::parse("node.custom_highlight_color:selected");
		assert_eq!(s.tag, Some("node"));
		assert_eq!(s.class, Some("custom_highlight_color"));
		assert_eq!(s.pseudo, Some("selected"));
		assert_eq!(Selector::parse("#7").id, Some("7"));
	}

	#[test]
	fn ordering_is_stable_for_ties() {
		let rules = ordered(vec![
			StyleRule::new(".b"),
			StyleRule::new("node"),
			StyleRule::new(".a"),
			StyleRule::new("edge"),
		]);
		let selectors: Vec<_> = rules.iter().map(|r| r.selector.as_str()).collect();
		assert_eq!(selectors, ["node", "edge", ".b", ".a"]);
	}

	fn arb_selector() -> impl Strategy<Value = String> {
		prop_oneof![
			Just("node".to_string()),
			Just("edge".to_string()),
			"[a-z]{1,6}".prop_map(|s| format!(".node_{s}")),
			"[a-z]{1,3}[0-9]{1,3}".prop_map(|s| format!(".edge_{s}")),
			"[0-9]{1,4}".prop_map(|s| format!("#{s}")),
			Just("node:selected".to_string()),
			Just(".hide_label".to_string()),
		]
	}

	proptest! {
		#[test]
		fn ordered_cascade_never_decreases(
			selectors in proptest::collection::vec(arb_selector(), 0..32),
		) {
			let rules = ordered(selectors.into_iter().map(StyleRule::new).collect());
			for pair in rules.windows(2) {
				prop_assert!(pair[0].priority <= pair[1].priority);
			}
		}
	}
}
