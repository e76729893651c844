use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter};

use super::viewport::PlotLayout;

pub const MOBILE_MAX_WIDTH: f64 = 640.0;
pub const TABLET_MAX_WIDTH: f64 = 1024.0;
const MIN_WIDTH: f64 = 1.0;

/// Responsive breakpoint selected from the available width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Breakpoint {
    Mobile,
    Tablet,
    Desktop,
}

impl Breakpoint {
    pub fn for_width(width: f64) -> Self {
        if width < MOBILE_MAX_WIDTH {
            Breakpoint::Mobile
        } else if width < TABLET_MAX_WIDTH {
            Breakpoint::Tablet
        } else {
            Breakpoint::Desktop
        }
    }

    fn rules(&self) -> BreakpointRules {
        match self {
            Breakpoint::Mobile => BreakpointRules {
                aspect: 0.75,
                min_height: 240.0,
                max_height: 360.0,
                pads: [8.0, 56.0, 12.0, 28.0],
            },
            Breakpoint::Tablet => BreakpointRules {
                aspect: 0.55,
                min_height: 320.0,
                max_height: 480.0,
                pads: [12.0, 64.0, 16.0, 32.0],
            },
            Breakpoint::Desktop => BreakpointRules {
                aspect: 0.5,
                min_height: 400.0,
                max_height: 600.0,
                pads: [16.0, 72.0, 20.0, 36.0],
            },
        }
    }
}

struct BreakpointRules {
    aspect: f64,
    min_height: f64,
    max_height: f64,
    /// left, right, top, bottom
    pads: [f64; 4],
}

/// Explicit size requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    #[serde(default)]
    pub height: Option<f64>,
}

/// Pure mapping from available width to plot layout
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutResolver;

impl LayoutResolver {
    pub fn new() -> Self {
        Self
    }

    /// Explicit `dimensions` win over the measured width; paddings always
    /// follow the breakpoint of the final width.
    pub fn resolve(&self, available_width: f64, dimensions: Option<Dimensions>) -> PlotLayout {
        let requested = dimensions.map(|d| d.width).unwrap_or(available_width);
        let width = if requested.is_finite() { requested.max(MIN_WIDTH) } else { MIN_WIDTH };

        let breakpoint = Breakpoint::for_width(width);
        let rules = breakpoint.rules();
        let height = dimensions
            .and_then(|d| d.height)
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or_else(|| (width * rules.aspect).clamp(rules.min_height, rules.max_height));

        let [left_pad, right_pad, top_pad, bottom_pad] = rules.pads;
        PlotLayout { width, height, left_pad, right_pad, top_pad, bottom_pad }
    }
}
