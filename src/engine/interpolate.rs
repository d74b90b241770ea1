//! Continuous value interpolation between two breakpoints.

use log::debug;

use super::color::Color;

/// A threshold paired with the style value that applies at it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bound<'a> {
	pub threshold: f64,
	pub value: &'a str,
}

impl<'a> Bound<'a> {
	pub const fn new(threshold: f64, value: &'a str) -> Self {
		Self { threshold, value }
	}
}

/// Default significant digits for numeric results.
pub const SIGNIFICANT_DIGITS: u32 = 5;

/// Interpolate the style value for `input` between two bounds.
///
/// Hex colors are interpolated per channel; numbers linearly and rounded to
/// `digits` significant digits. An input sitting exactly on a bound returns
/// that bound's value untouched. A zero-width span returns the lower value.
/// Values that are neither both colors nor both numbers step: the lower
/// value applies below the upper threshold.
pub fn interpolate(input: f64, lower: Bound<'_>, upper: Bound<'_>, digits: u32) -> String {
	if input == lower.threshold {
		return lower.value.to_string();
	}
	if input == upper.threshold {
		return upper.value.to_string();
	}
	let span = upper.threshold - lower.threshold;
	if span == 0.0 || !span.is_finite() {
		debug!(
			"cx-vizmap: degenerate interpolation range at {}, using lower value",
			lower.threshold
		);
		return lower.value.to_string();
	}
	let t = (input - lower.threshold) / span;

	if let (Some(a), Some(b)) = (Color::from_hex(lower.value), Color::from_hex(upper.value)) {
		return a.lerp(b, t).to_css_rgb();
	}
	match (lower.value.trim().parse::<f64>(), upper.value.trim().parse::<f64>()) {
		(Ok(a), Ok(b)) => format_number(a + t * (b - a), digits),
		_ if input < upper.threshold => lower.value.to_string(),
		_ => upper.value.to_string(),
	}
}

/// Round to `digits` significant digits and print without trailing zeros.
pub fn format_number(x: f64, digits: u32) -> String {
	if x == 0.0 || !x.is_finite() {
		return if x.is_finite() { "0".to_string() } else { x.to_string() };
	}
	let magnitude = x.abs().log10().floor() as i32;
	let shift = digits as i32 - 1 - magnitude;
	let rounded = if shift >= 0 {
		let factor = 10f64.powi(shift);
		(x * factor).round() / factor
	} else {
		let factor = 10f64.powi(-shift);
		(x / factor).round() * factor
	};
	rounded.to_string()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn numeric_midpoint() {
		let out = interpolate(50.0, Bound::new(0.0, "10"), Bound::new(100.0, "150"), 5);
		assert_eq!(out, "80");
	}

	#[test]
	fn numeric_rounds_to_significant_digits() {
		let out = interpolate(1.0, Bound::new(0.0, "0"), Bound::new(3.0, "1"), 5);
		assert_eq!(out, "0.33333");
		assert_eq!(format_number(123456.0, 5), "123460");
		assert_eq!(format_number(-0.000123456, 5), "-0.00012346");
	}

	#[test]
	fn color_channels_interpolate_independently() {
		let out = interpolate(25.0, Bound::new(0.0, "#000000"), Bound::new(50.0, "#ff8040"), 5);
		assert_eq!(out, "#804020");
	}

	#[test]
	fn zero_width_span_uses_lower_value() {
		let out = interpolate(7.0, Bound::new(5.0, "1"), Bound::new(5.0, "9"), 5);
		assert_eq!(out, "1");
	}

	#[test]
	fn non_interpolable_values_step() {
		let lower = Bound::new(0.0, "ellipse");
		let upper = Bound::new(10.0, "rectangle");
		assert_eq!(interpolate(3.0, lower, upper, 5), "ellipse");
		assert_eq!(interpolate(11.0, lower, upper, 5), "rectangle");
	}

	proptest! {
		#[test]
		fn bounds_return_their_values(
			lt in -1e6f64..1e6,
			width in 1e-3f64..1e6,
			lv in -1e3f64..1e3,
			uv in -1e3f64..1e3,
		) {
			let (lv, uv) = (lv.to_string(), uv.to_string());
			let lower = Bound::new(lt, &lv);
			let upper = Bound::new(lt + width, &uv);
			prop_assert_eq!(interpolate(lt, lower, upper, 5), lv.clone());
			prop_assert_eq!(interpolate(lt + width, lower, upper, 5), uv.clone());
		}

		#[test]
		fn color_bounds_return_their_values(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
			let hi = Color::rgb(r, g, b).to_css_rgb();
			let lower = Bound::new(0.0, "#000000");
			let upper = Bound::new(100.0, &hi);
			prop_assert_eq!(interpolate(0.0, lower, upper, 5), "#000000");
			prop_assert_eq!(interpolate(100.0, lower, upper, 5), hi.clone());
		}

		#[test]
		fn numeric_is_monotonic(
			a in 1f64..99.0,
			b in 1f64..99.0,
			lv in 0f64..50.0,
			delta in 0f64..50.0,
		) {
			let (lo_in, hi_in) = if a <= b { (a, b) } else { (b, a) };
			let (lv_s, uv_s) = (lv.to_string(), (lv + delta).to_string());
			let lower = Bound::new(0.0, &lv_s);
			let upper = Bound::new(100.0, &uv_s);
			let lo_out: f64 = interpolate(lo_in, lower, upper, 5).parse().unwrap();
			let hi_out: f64 = interpolate(hi_in, lower, upper, 5).parse().unwrap();
			prop_assert!(lo_out <= hi_out);
		}
	}
}
