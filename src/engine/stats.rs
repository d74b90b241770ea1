//! Per-column statistics ("aspects") for the editor's mapping widgets.

use std::collections::HashMap;

use super::types::{Aspect, Distribution, Element, ElementGroup, HistogramBin, ScatterPoint};

/// Build one aspect per distinct column of a group, in first-seen order.
pub fn build_aspects(elements: &[Element], group: ElementGroup) -> Vec<Aspect> {
	let mut aspects: Vec<Aspect> = Vec::new();
	let mut occurrences: Vec<Vec<&str>> = Vec::new();
	let mut index: HashMap<&str, usize> = HashMap::new();

	for attr in elements.iter().filter(|e| e.group == group).flat_map(|e| &e.attributes) {
		let i = *index.entry(attr.key.as_str()).or_insert_with(|| {
			aspects.push(Aspect {
				name: attr.key_human_readable.clone(),
				key: attr.key.clone(),
				datatype: attr.datatype.clone(),
				values: Vec::new(),
				min: None,
				max: None,
				map_pointer_discrete: Vec::new(),
				map_pointer_continuous: Vec::new(),
				distribution: Distribution::default(),
			});
			occurrences.push(Vec::new());
			aspects.len() - 1
		});
		occurrences[i].push(attr.value_human_readable.as_str());
	}

	for (aspect, values) in aspects.iter_mut().zip(&occurrences) {
		summarize(aspect, values);
	}
	aspects
}

fn summarize(aspect: &mut Aspect, occurrences: &[&str]) {
	let mut histogram: Vec<HistogramBin> = Vec::new();
	for value in occurrences {
		match histogram.iter_mut().find(|b| b.value == *value) {
			Some(bin) => bin.count += 1,
			None => histogram.push(HistogramBin {
				value: value.to_string(),
				count: 1,
			}),
		}
	}
	aspect.values = histogram.iter().map(|b| b.value.clone()).collect();

	let mut numbers: Vec<f64> = occurrences
		.iter()
		.filter_map(|v| v.trim().parse::<f64>().ok())
		.filter(|v| v.is_finite())
		.collect();
	numbers.sort_by(f64::total_cmp);
	aspect.min = numbers.first().copied();
	aspect.max = numbers.last().copied();
	aspect.distribution = Distribution {
		histogram,
		scatter: numbers
			.into_iter()
			.enumerate()
			.map(|(x, y)| ScatterPoint { x, y })
			.collect(),
	};
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use super::*;
	use crate::engine::types::Attribute;

	fn node(id: &str, attrs: &[(&str, &str)]) -> Element {
		Element {
			id: id.to_string(),
			group: ElementGroup::Node,
			name: None,
			source: None,
			target: None,
			attributes: attrs
				.iter()
				.map(|(k, v)| Attribute {
					reference: id.to_string(),
					key: k.to_lowercase(),
					key_human_readable: k.to_string(),
					value: v.to_lowercase(),
					value_human_readable: v.to_string(),
					datatype: None,
				})
				.collect(),
			classes: BTreeSet::new(),
			position: None,
		}
	}

	#[test]
	fn aspects_collect_values_and_ranges() {
		let elements = vec![
			node("1", &[("Type", "A"), ("score", "3")]),
			node("2", &[("Type", "B"), ("score", "-1.5")]),
			node("3", &[("Type", "A"), ("score", "n/a")]),
		];
		let aspects = build_aspects(&elements, ElementGroup::Node);
		assert_eq!(aspects.len(), 2);

		let ty = &aspects[0];
		assert_eq!((ty.name.as_str(), ty.key.as_str()), ("Type", "type"));
		assert_eq!(ty.values, ["A", "B"]);
		assert_eq!(ty.min, None);
		let counts: Vec<_> = ty.distribution.histogram.iter().map(|b| b.count).collect();
		assert_eq!(counts, [2, 1]);

		let score = &aspects[1];
		assert_eq!((score.min, score.max), (Some(-1.5), Some(3.0)));
		let ys: Vec<_> = score.distribution.scatter.iter().map(|p| p.y).collect();
		assert_eq!(ys, [-1.5, 3.0]);
		assert!(build_aspects(&elements, ElementGroup::Edge).is_empty());
	}
}
