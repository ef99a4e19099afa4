//! Auto scroll-height calculator
//!
//! Computes a CSS height expression from viewport height minus a caller
//! offset, clamped to optional bounds. A pure function of its inputs (no
//! measurement, no resize listeners), so the layout tracks viewport changes
//! without recomputation.

/// Configuration for the automatic vertical scroll height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollHeight {
    /// Pixels of page chrome above/below the table viewport.
    pub offset: u32,
    /// Lower bound in pixels.
    pub min_height: Option<u32>,
    /// Upper bound in pixels.
    pub max_height: Option<u32>,
}

impl ScrollHeight {
    /// Unclamped height with the given chrome offset.
    pub fn offset(offset: u32) -> Self {
        Self {
            offset,
            min_height: None,
            max_height: None,
        }
    }

    /// Sets the lower bound.
    pub fn min(mut self, min_height: u32) -> Self {
        self.min_height = Some(min_height);
        self
    }

    /// Sets the upper bound.
    pub fn max(mut self, max_height: u32) -> Self {
        self.max_height = Some(max_height);
        self
    }
}

/// Computes the vertical scroll height expression.
///
/// An explicit caller-specified height wins unconditionally. Otherwise the
/// base expression is `calc(100vh - {offset}px)`, wrapped in `clamp` when
/// both bounds are present, or `max`/`min` when only one is.
///
/// # Example
///
/// ```
/// use tablekit::scroll::{ScrollHeight, compute_scroll_y};
///
/// let config = ScrollHeight::offset(350).min(300).max(800);
/// assert_eq!(
///     compute_scroll_y(&config, None),
///     "clamp(300px, calc(100vh - 350px), 800px)"
/// );
/// ```
pub fn compute_scroll_y(config: &ScrollHeight, user_scroll_y: Option<&str>) -> String {
    if let Some(explicit) = user_scroll_y {
        return explicit.to_string();
    }
    let base = format!("calc(100vh - {}px)", config.offset);
    match (config.min_height, config.max_height) {
        (Some(min), Some(max)) => format!("clamp({min}px, {base}, {max}px)"),
        (Some(min), None) => format!("max({min}px, {base})"),
        (None, Some(max)) => format!("min({base}, {max}px)"),
        (None, None) => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_override_wins() {
        let config = ScrollHeight::offset(350).min(300).max(800);
        assert_eq!(compute_scroll_y(&config, Some("420px")), "420px");
    }

    #[test]
    fn test_clamp_with_both_bounds() {
        let config = ScrollHeight::offset(350).min(300).max(800);
        assert_eq!(
            compute_scroll_y(&config, None),
            "clamp(300px, calc(100vh - 350px), 800px)"
        );
    }

    #[test]
    fn test_min_only() {
        let config = ScrollHeight::offset(200).min(300);
        assert_eq!(
            compute_scroll_y(&config, None),
            "max(300px, calc(100vh - 200px))"
        );
    }

    #[test]
    fn test_max_only() {
        let config = ScrollHeight::offset(200).max(640);
        assert_eq!(
            compute_scroll_y(&config, None),
            "min(calc(100vh - 200px), 640px)"
        );
    }

    #[test]
    fn test_unclamped() {
        let config = ScrollHeight::offset(120);
        assert_eq!(compute_scroll_y(&config, None), "calc(100vh - 120px)");
    }
}
