use std::fmt::Write as _;

use crate::{reveal::hidden_length, PatternSpec, RevealedPattern};

/// Renders a pattern as standalone SVG, each chord drawn to `fraction` with
/// the classic dash-array/dash-offset trick.
pub fn render_svg(pattern: &PatternSpec, fraction: f64) -> String {
    let size = pattern.size;
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {size} {size}" fill="none" stroke="currentColor">"#
    );
    for segment in &pattern.segments {
        let offset = hidden_length(segment.length, fraction);
        // Writing into a String cannot fail.
        let _ = write!(
            svg,
            r#"<path d="M {:.3},{:.3} L {:.3},{:.3}" stroke-dasharray="{:.3}" stroke-dashoffset="{:.3}"/>"#,
            segment.x1, segment.y1, segment.x2, segment.y2, segment.length, offset
        );
    }
    svg.push_str("</svg>");
    svg
}

/// Renders a pattern at its current reveal.
pub fn render_revealed(revealed: &RevealedPattern) -> String {
    render_svg(revealed.pattern(), revealed.fraction())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::generate;

    #[test]
    fn emits_one_path_per_segment() {
        let pattern = generate(36).unwrap();
        let svg = render_svg(&pattern, 0.25);

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<path").count(), 36);
        assert!(svg.contains(r#"viewBox="0 0 400 400""#));
    }

    #[test]
    fn fully_revealed_paths_have_zero_offset() {
        let mut revealed = RevealedPattern::new(generate(36).unwrap());
        revealed.set_fraction(1.0);

        let svg = render_revealed(&revealed);
        assert_eq!(svg.matches(r#"stroke-dashoffset="0.000""#).count(), 36);
    }
}
