//! Hex color parsing and per-channel interpolation.

/// RGB color parsed from a `#rrggbb` (or `#rgb`) string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

impl Color {
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b }
	}

	/// Parse a hex color string; `None` when the string is not one.
	pub fn from_hex(s: &str) -> Option<Self> {
		let hex = s.trim().strip_prefix('#')?;
		if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
			return None;
		}
		let channel = |i: usize, width: usize| -> Option<u8> {
			let digits = hex.get(i * width..(i + 1) * width)?;
			let v = u8::from_str_radix(digits, 16).ok()?;
			Some(if width == 1 { v * 17 } else { v })
		};
		match hex.len() {
			6 => Some(Self::rgb(channel(0, 2)?, channel(1, 2)?, channel(2, 2)?)),
			3 => Some(Self::rgb(channel(0, 1)?, channel(1, 1)?, channel(2, 1)?)),
			_ => None,
		}
	}

	/// Interpolate each channel independently with slope `t`, clamped to `[0, 255]`.
	///
	/// Unlike a plain lerp `t` is not clamped, so callers may extrapolate and
	/// still get a valid color.
	pub fn lerp(self, other: Color, t: f64) -> Self {
		let channel = |a: u8, b: u8| -> u8 {
			let v = a as f64 + t * (b as f64 - a as f64);
			v.round().clamp(0.0, 255.0) as u8
		};
		Self {
			r: channel(self.r, other.r),
			g: channel(self.g, other.g),
			b: channel(self.b, other.b),
		}
	}

	pub fn to_css_rgb(self) -> String {
		format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
	}
}

/// Whether a string is a hex color.
pub fn is_hex(s: &str) -> bool {
	Color::from_hex(s).is_some()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_long_and_short_hex() {
		assert_eq!(Color::from_hex("#FF8000"), Some(Color::rgb(255, 128, 0)));
		assert_eq!(Color::from_hex("#f80"), Some(Color::rgb(255, 136, 0)));
		assert_eq!(Color::from_hex("red"), None);
		assert_eq!(Color::from_hex("#12345"), None);
		assert_eq!(Color::from_hex("#gg0000"), None);
	}

	#[test]
	fn lerp_is_per_channel_and_clamped() {
		let black = Color::rgb(0, 0, 0);
		let gray = Color::rgb(128, 128, 128);
		assert_eq!(black.lerp(gray, 0.5), Color::rgb(64, 64, 64));
		assert_eq!(black.lerp(Color::rgb(200, 0, 100), 2.0), Color::rgb(255, 0, 200));
		assert_eq!(Color::rgb(10, 10, 10).lerp(black, 3.0), black);
	}

	#[test]
	fn css_output_is_zero_padded() {
		assert_eq!(Color::rgb(1, 2, 255).to_css_rgb(), "#0102ff");
	}
}
