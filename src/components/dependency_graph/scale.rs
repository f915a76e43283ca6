//! Zoom-dependent sizing for graph visuals.
//!
//! Node boxes live in world space: they are laid out with a fixed size and
//! scale with the view. Strokes, hit tolerances and label fonts are specified
//! in screen pixels and converted to world units for the current zoom `k`.

/// Defines how a visual property scales with zoom level.
#[derive(Clone, Debug)]
#[allow(
	dead_code,
	reason = "World variant completes the API for callers customizing ScaleConfig"
)]
pub enum ScaleBehavior {
	/// Constant world-space size. Appears larger when zoomed in.
	World,
	/// Constant screen-space size (pixels). Unaffected by zoom.
	Screen,
	/// World-space scaling, clamped to min/max screen-space bounds.
	Clamped { min_screen: f64, max_screen: f64 },
}

impl ScaleBehavior {
	/// World-space value for a given base value and zoom level.
	pub fn apply(&self, base: f64, k: f64) -> f64 {
		match self {
			ScaleBehavior::World => base,
			ScaleBehavior::Screen => base / k,
			ScaleBehavior::Clamped {
				min_screen,
				max_screen,
			} => base.clamp(min_screen / k, max_screen / k),
		}
	}
}

/// Size of the node box handed to the layout engine, in world units.
#[derive(Clone, Debug)]
pub struct NodeScaleConfig {
	pub width: f64,
	pub height: f64,
	/// Label font size in world units.
	pub label_size: f64,
	pub label_behavior: ScaleBehavior,
	/// Below this zoom the team line under the label is skipped.
	pub sublabel_min_k: f64,
	/// Border width in screen pixels.
	pub border_width: f64,
}

#[derive(Clone, Debug)]
pub struct EdgeScaleConfig {
	/// Line width in screen pixels.
	pub line_width: f64,
	/// Dash pattern (dash, gap) for animated edges, in world units.
	pub dash_pattern: (f64, f64),
	/// Flow animation speed (world units per second).
	pub flow_speed: f64,
	/// Arrow head length in world units.
	pub arrow_size: f64,
	pub arrow_behavior: ScaleBehavior,
	/// Click tolerance around an edge in screen pixels.
	pub hit_tolerance: f64,
}

#[derive(Clone, Debug)]
pub struct ZoomConfig {
	pub min_k: f64,
	pub max_k: f64,
	/// Factor applied by one press of a zoom button.
	pub step: f64,
	/// Margin kept around the graph by "fit view", in screen pixels.
	pub fit_padding: f64,
}

impl ZoomConfig {
	pub fn clamp(&self, k: f64) -> f64 {
		k.clamp(self.min_k, self.max_k)
	}
}

/// Complete scale configuration for all graph elements.
#[derive(Clone, Debug)]
pub struct ScaleConfig {
	pub node: NodeScaleConfig,
	pub edge: EdgeScaleConfig,
	pub zoom: ZoomConfig,
}

impl ScaleConfig {
	pub fn node_size(&self) -> (f64, f64) {
		(self.node.width, self.node.height)
	}
}

impl Default for ScaleConfig {
	fn default() -> Self {
		Self {
			node: NodeScaleConfig {
				width: 180.0,
				height: 52.0,
				label_size: 14.0,
				label_behavior: ScaleBehavior::Clamped {
					min_screen: 8.0,
					max_screen: 28.0,
				},
				sublabel_min_k: 0.6,
				border_width: 1.0,
			},
			edge: EdgeScaleConfig {
				line_width: 1.5,
				dash_pattern: (8.0, 5.0),
				flow_speed: 24.0,
				arrow_size: 9.0,
				arrow_behavior: ScaleBehavior::Clamped {
					min_screen: 4.0,
					max_screen: 18.0,
				},
				hit_tolerance: 6.0,
			},
			zoom: ZoomConfig {
				min_k: 0.1,
				max_k: 4.0,
				step: 1.2,
				fit_padding: 40.0,
			},
		}
	}
}

/// Pre-computed scale values for a specific zoom level.
///
/// Create this once per frame and pass it to rendering functions.
/// All sizes are in world-space (ready to use after canvas transform).
#[derive(Clone, Debug)]
pub struct ScaledValues {
	pub k: f64,
	pub label_font: String,
	pub sublabel_font: String,
	pub show_sublabel: bool,
	pub border_width: f64,
	pub edge_line_width: f64,
	pub arrow_size: f64,
	pub hit_tolerance: f64,
}

impl ScaledValues {
	pub fn new(config: &ScaleConfig, k: f64) -> Self {
		let label = config
			.node
			.label_behavior
			.apply(config.node.label_size, k);
		Self {
			k,
			label_font: format!("600 {}px sans-serif", label),
			sublabel_font: format!("{}px sans-serif", label * 0.8),
			show_sublabel: k >= config.node.sublabel_min_k,
			border_width: ScaleBehavior::Screen.apply(config.node.border_width, k),
			edge_line_width: ScaleBehavior::Screen.apply(config.edge.line_width, k),
			arrow_size: config.edge.arrow_behavior.apply(config.edge.arrow_size, k),
			hit_tolerance: ScaleBehavior::Screen.apply(config.edge.hit_tolerance, k),
		}
	}

	/// Dash offset for the flow animation of animated edges.
	pub fn dash_offset(&self, flow_time: f64, flow_speed: f64) -> f64 {
		-flow_time * flow_speed
	}
}
