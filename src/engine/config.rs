//! Tunables for style resolution.
//!
//! Everything here has a sensible default; hosts only override what they
//! need, e.g. from a JSON settings blob.

use serde::Deserialize;

use super::interpolate::SIGNIFICANT_DIGITS;

/// Style resolution configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleConfig {
	/// Arrow color used when arrows do not follow the edge color.
	pub default_arrow_color: String,
	/// Color of the utility highlight rules for selected elements.
	pub highlight_color: String,
	/// Significant digits of interpolated numbers.
	pub significant_digits: u32,
	/// Gradient offset (percent) of the lower default color.
	pub gradient_lower_offset: f64,
	/// Gradient offset (percent) of the greater default color.
	pub gradient_upper_offset: f64,
}

impl Default for StyleConfig {
	fn default() -> Self {
		Self {
			default_arrow_color: "#000000".to_string(),
			highlight_color: "#ffff00".to_string(),
			significant_digits: SIGNIFICANT_DIGITS,
			gradient_lower_offset: -1.0,
			gradient_upper_offset: 101.0,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_json_keeps_defaults() {
		let config: StyleConfig =
			serde_json::from_str(r##"{"highlightColor": "#00ffff"}"##).unwrap();
		assert_eq!(config.highlight_color, "#00ffff");
		assert_eq!(config.default_arrow_color, "#000000");
		assert_eq!(config.significant_digits, 5);
	}
}
