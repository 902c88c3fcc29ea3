//! Candidate width lists: derivation from a range, and selection against a viewport.

use crate::types::SizeRange;

/// Expands a range into a descending candidate width list with roughly equal steps.
///
/// `step_count = ceil(span / step_size)`; the actual step is `span / step_count` and may
/// be fractional, so the first and last candidates always hit `min` and `max` (up to
/// truncation) with the minimal number of steps. A zero span produces `[min]`.
pub fn build_width_list(range: SizeRange, step_size: u32) -> Vec<u32> {
    let span = range.span();
    if span == 0 || step_size == 0 {
        return vec![range.min];
    }
    let step_count = span.div_ceil(step_size);
    let actual_step = span as f64 / step_count as f64;

    let mut widths = Vec::with_capacity(step_count as usize + 1);
    for i in 0..=step_count {
        widths.push((range.min as f64 + i as f64 * actual_step) as u32);
    }
    widths.reverse();
    widths
}

/// Picks the smallest candidate `>=` the viewport width from a descending list, or the
/// largest candidate when every candidate is smaller. Returns `None` only for an empty
/// list.
pub fn select_width(widths: &[u32], viewport_width: u32) -> Option<u32> {
    let mut selected = *widths.first()?;
    for &candidate in &widths[1..] {
        if candidate < viewport_width {
            break;
        }
        selected = candidate;
    }
    Some(selected)
}
