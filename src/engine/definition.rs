//! Mapping definition strings.
//!
//! A definition is a comma-separated list of `KEY=VALUE` parts, where a
//! doubled comma (`,,`) stands for a literal comma inside a value:
//!
//! ```text
//! COL=type,T=string,K=0=A,V=0=#FF0000,K=1=B,V=1=#00FF00
//! COL=score,T=double,L=0=0,E=0=10,G=0=10,OV=0=0,...
//! ```
//!
//! Indexed parts may also be written without the inner `=` (`K0=A`).

use std::collections::BTreeMap;

const ESCAPED_COMMA: &str = ",,";
const PLACEHOLDER: char = '\u{1f}';

/// One breakpoint of a continuous definition, as written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawPoint {
	pub threshold: Option<String>,
	pub lesser: Option<String>,
	pub equal: Option<String>,
	pub greater: Option<String>,
}

/// Parsed mapping definition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Definition {
	pub column: Option<String>,
	pub datatype: Option<String>,
	indexed: BTreeMap<usize, BTreeMap<String, String>>,
}

fn split_indexed(head: &str, rest: &str) -> Option<(String, usize, String)> {
	if matches!(head, "K" | "V" | "L" | "E" | "G" | "OV") {
		let (index, value) = rest.split_once('=')?;
		return Some((head.to_string(), index.parse().ok()?, value.to_string()));
	}
	let digits = head.find(|c: char| c.is_ascii_digit())?;
	let (key, index) = head.split_at(digits);
	if key.is_empty() {
		return None;
	}
	Some((key.to_string(), index.parse().ok()?, rest.to_string()))
}

impl Definition {
	pub fn parse(definition: &str) -> Self {
		let escaped = definition.replace(ESCAPED_COMMA, &PLACEHOLDER.to_string());
		let mut out = Definition::default();
		for part in escaped.split(',') {
			let part = part.replace(PLACEHOLDER, ",");
			let Some((head, rest)) = part.split_once('=') else {
				continue;
			};
			match head {
				"COL" => out.column = Some(rest.to_string()),
				"T" => out.datatype = Some(rest.to_string()),
				_ => {
					if let Some((key, index, value)) = split_indexed(head, rest) {
						out.indexed.entry(index).or_default().insert(key, value);
					}
				}
			}
		}
		out
	}

	/// `(K, V)` pairs by index; indices missing either side are skipped.
	pub fn discrete_pairs(&self) -> Vec<(String, String)> {
		self.indexed
			.values()
			.filter_map(|parts| Some((parts.get("K")?.clone(), parts.get("V")?.clone())))
			.collect()
	}

	/// Continuous breakpoints by index.
	pub fn continuous_points(&self) -> Vec<RawPoint> {
		self.indexed
			.values()
			.map(|parts| RawPoint {
				threshold: parts.get("OV").cloned(),
				lesser: parts.get("L").cloned(),
				equal: parts.get("E").cloned(),
				greater: parts.get("G").cloned(),
			})
			.collect()
	}
}
