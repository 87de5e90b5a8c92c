use crate::models::progression::MAX_LEVEL;

/// Cumulative points required to reach each level; index 0 is level 1.
pub const LEVEL_THRESHOLDS: [i64; MAX_LEVEL as usize] = [
    0, 100, 250, 500, 1_000, 2_000, 3_500, 5_500, 8_000, 11_000, 14_500, 18_500, 23_000, 28_000,
    33_500, 39_500, 46_000, 53_000, 60_500, 68_500, 77_000, 86_000, 95_500, 105_500, 116_000,
];

/// Threshold for `level`, clamped into `1..=MAX_LEVEL`.
pub fn threshold_for(level: u32) -> i64 {
    let index = level.clamp(1, MAX_LEVEL) as usize - 1;
    LEVEL_THRESHOLDS[index]
}

/// Highest level whose threshold `points` reaches.
pub fn calculate_level(points: i64) -> u32 {
    let mut current = 1;
    for (index, threshold) in LEVEL_THRESHOLDS.iter().enumerate() {
        if points >= *threshold {
            current = index as u32 + 1;
        } else {
            break;
        }
    }
    current
}

/// Points still missing for the next level, `None` at the cap.
pub fn points_to_next_level(level: u32, points: i64) -> Option<i64> {
    if level >= MAX_LEVEL {
        return None;
    }
    let needed = threshold_for(level + 1) - points;
    Some(needed.max(0))
}

pub fn level_progress_percentage(level: u32, points: i64) -> f64 {
    if level >= MAX_LEVEL {
        return 100.0;
    }

    let current = threshold_for(level);
    let next = threshold_for(level + 1);
    let span = (next - current) as f64;
    let earned = (points - current) as f64;
    (earned / span * 100.0).clamp(0.0, 100.0)
}
