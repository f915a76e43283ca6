//! Visual theming for the dependency graph.
//!
//! The surrounding console supplies a light/dark signal; [`Theme::for_mode`]
//! maps it to colours. Nothing here affects layout geometry.

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: f64,
}

impl Color {
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Multiply the alpha channel, used for dimming.
	pub fn fade(self, factor: f64) -> Self {
		Self {
			a: self.a * factor.clamp(0.0, 1.0),
			..self
		}
	}

	/// Darken the color by a factor (0.0 = unchanged, 1.0 = black)
	pub fn darken(self, factor: f64) -> Self {
		let f = 1.0 - factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 * f) as u8,
			g: (self.g as f64 * f) as u8,
			b: (self.b as f64 * f) as u8,
			a: self.a,
		}
	}

	/// Linear interpolation between two colors
	pub fn lerp(self, other: Color, t: f64) -> Self {
		let t = t.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 * (1.0 - t) + other.r as f64 * t) as u8,
			g: (self.g as f64 * (1.0 - t) + other.g as f64 * t) as u8,
			b: (self.b as f64 * (1.0 - t) + other.b as f64 * t) as u8,
			a: self.a * (1.0 - t) + other.a * t,
		}
	}

	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

/// Ambient colour scheme of the console.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
	#[default]
	Light,
	Dark,
}

impl ColorMode {
	pub fn from_dark(dark: bool) -> Self {
		if dark { ColorMode::Dark } else { ColorMode::Light }
	}
}

/// Accent colours assigned to teams.
#[derive(Clone, Debug)]
pub struct TeamPalette {
	pub colors: Vec<Color>,
	/// Used for applications with no known team.
	pub unknown: Color,
}

impl TeamPalette {
	fn muted() -> Self {
		Self {
			colors: vec![
				Color::rgb(94, 129, 172),  // Steel blue
				Color::rgb(100, 148, 160), // Teal gray
				Color::rgb(130, 120, 150), // Wisteria
				Color::rgb(180, 136, 100), // Tan
				Color::rgb(119, 158, 165), // Desaturated cyan
				Color::rgb(175, 125, 105), // Clay
				Color::rgb(125, 145, 140), // Sage
				Color::rgb(110, 125, 155), // Storm
			],
			unknown: Color::rgb(140, 140, 140),
		}
	}

	/// Stable colour for a team: the same name always maps to the same slot.
	pub fn for_team(&self, team: Option<&str>) -> Color {
		let Some(team) = team else {
			return self.unknown;
		};
		// FNV-1a keeps the mapping stable across builds and platforms.
		let hash = team.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
			(h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
		});
		self.colors[(hash % self.colors.len() as u64) as usize]
	}
}

#[derive(Clone, Debug)]
pub struct EdgeStyle {
	pub color: Color,
	/// Colour of an edge touching the hovered node.
	pub highlight: Color,
	/// Colour of edges touching the standout node.
	pub animated: Color,
}

#[derive(Clone, Debug)]
pub struct NodeStyle {
	pub fill: Color,
	pub border: Color,
	/// Border of the standout node.
	pub standout_border: Color,
	pub label: Color,
	pub sublabel: Color,
	/// Width of the team accent bar on the left side of a node.
	pub accent_width: f64,
	pub corner_radius: f64,
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	pub name: &'static str,
	pub background: Color,
	pub edge: EdgeStyle,
	pub node: NodeStyle,
	pub palette: TeamPalette,
	/// Opacity multiplier for de-emphasised elements while hovering.
	pub dim_alpha: f64,
}

impl Theme {
	pub fn light() -> Self {
		Self {
			name: "light",
			background: Color::rgb(248, 249, 251),
			edge: EdgeStyle {
				color: Color::rgba(120, 130, 145, 0.8),
				highlight: Color::rgb(60, 90, 140),
				animated: Color::rgb(25, 118, 210),
			},
			node: NodeStyle {
				fill: Color::rgb(255, 255, 255),
				border: Color::rgb(205, 210, 218),
				standout_border: Color::rgb(25, 118, 210),
				label: Color::rgb(33, 37, 41),
				sublabel: Color::rgb(108, 117, 125),
				accent_width: 6.0,
				corner_radius: 6.0,
			},
			palette: TeamPalette::muted(),
			dim_alpha: 0.2,
		}
	}

	pub fn dark() -> Self {
		Self {
			name: "dark",
			background: Color::rgb(22, 27, 34),
			edge: EdgeStyle {
				color: Color::rgba(140, 160, 180, 0.6),
				highlight: Color::rgb(200, 215, 235),
				animated: Color::rgb(100, 181, 246),
			},
			node: NodeStyle {
				fill: Color::rgb(33, 38, 46),
				border: Color::rgb(60, 68, 80),
				standout_border: Color::rgb(100, 181, 246),
				label: Color::rgb(230, 235, 240),
				sublabel: Color::rgb(150, 160, 172),
				accent_width: 6.0,
				corner_radius: 6.0,
			},
			palette: TeamPalette::muted(),
			dim_alpha: 0.25,
		}
	}

	pub fn for_mode(mode: ColorMode) -> Self {
		match mode {
			ColorMode::Light => Self::light(),
			ColorMode::Dark => Self::dark(),
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::light()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn team_colours_are_stable_and_unknown_is_grey() {
		let palette = TeamPalette::muted();
		assert_eq!(palette.for_team(Some("payments")), palette.for_team(Some("payments")));
		assert_eq!(palette.for_team(None), palette.unknown);
	}

	#[test]
	fn mode_selects_theme() {
		assert_eq!(Theme::for_mode(ColorMode::from_dark(true)).name, "dark");
		assert_eq!(Theme::for_mode(ColorMode::from_dark(false)).name, "light");
	}

	#[test]
	fn css_output() {
		assert_eq!(Color::rgb(255, 0, 16).to_css(), "#ff0010");
		assert_eq!(Color::rgb(1, 2, 3).fade(0.5).to_css(), "rgba(1, 2, 3, 0.5)");
	}
}
