//! Hue assignment: new parties take the midpoint of the widest free arc.

use super::value_object::Hue;

/// Pick a hue for a newcomer given the hues already in use.
///
/// The first party gets `random_degrees`. Everyone after gets the midpoint of
/// the largest circular gap between existing hues, so colours stay as far
/// apart as the ring allows. Ties go to the first gap in ascending order.
pub fn assign_hue(existing: &[Hue], random_degrees: f64) -> Hue {
    if existing.is_empty() {
        return Hue::new(random_degrees);
    }

    let mut sorted: Vec<f64> = existing.iter().map(Hue::value).collect();
    sorted.sort_by(f64::total_cmp);

    let mut max_gap = 0.0;
    let mut gap_start = sorted[0];
    for (i, &hue) in sorted.iter().enumerate() {
        let gap = match sorted.get(i + 1) {
            Some(next) => next - hue,
            None => 360.0 - hue + sorted[0],
        };
        if gap > max_gap {
            max_gap = gap;
            gap_start = hue;
        }
    }

    Hue::new(gap_start + max_gap / 2.0)
}
