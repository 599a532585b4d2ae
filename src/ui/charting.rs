use crate::report::Summary;

/// One bar per recorded question, labelled `Q1`, `Q2`, ...
pub fn bar_data(summary: &Summary) -> Vec<(String, u64)> {
    summary
        .question_points
        .iter()
        .map(|qp| (format!("Q{}", qp.question_number), qp.points as u64))
        .collect()
}

/// Widest bar that still fits `bars` bars (with a one-cell gap) in `width`.
pub fn bar_width(width: u16, bars: usize) -> u16 {
    if bars == 0 {
        return 1;
    }
    let per_bar = width as usize / bars;
    per_bar.saturating_sub(1).clamp(1, 9) as u16
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
