//! Shared inference utilities.

/// Index and value of the largest element.
///
/// Ties resolve to the lowest index and NaN never wins. Returns `None` for
/// an empty slice or one containing only NaN.
#[must_use]
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best
}
