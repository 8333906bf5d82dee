//! Small numeric helpers shared by the generative stages

use fastrand::Rng;

use crate::error::{NootoneError, Result};

/// Uniform random value in `[min, max)`.
pub fn random_range(rng: &mut Rng, min: f64, max: f64) -> Result<f64> {
    if min >= max {
        return Err(NootoneError::InvalidRange { min, max });
    }
    Ok(rng.f64() * (max - min) + min)
}

/// Wrap `value` into the half-open range `[min, max)`.
pub fn wrap_value(value: f64, min: f64, max: f64) -> Result<f64> {
    if min >= max {
        return Err(NootoneError::InvalidRange { min, max });
    }
    let span = max - min;
    Ok(min + (value - min).rem_euclid(span))
}

/// Index of the value nearest to `target` in an ascending slice.
///
/// Returns `None` for an empty slice. Ties resolve to the lower index.
pub fn find_nearest_index(sorted: &[f64], target: f64) -> Option<usize> {
    if sorted.is_empty() {
        return None;
    }
    let upper = sorted.partition_point(|&v| v < target);
    if upper == 0 {
        return Some(0);
    }
    if upper == sorted.len() {
        return Some(sorted.len() - 1);
    }
    let lower = upper - 1;
    if (sorted[upper] - target).abs() < (target - sorted[lower]).abs() {
        Some(upper)
    } else {
        Some(lower)
    }
}

/// Every pitch in `[min_pitch, max_pitch)` whose pitch class appears in `pitch_classes`, ascending.
pub fn fill_pitch_range(pitch_classes: &[i32], min_pitch: i32, max_pitch: i32) -> Result<Vec<i32>> {
    if max_pitch <= min_pitch {
        return Err(NootoneError::InvalidPitchRange {
            min: min_pitch,
            max: max_pitch,
            reason: "max must be greater than min",
        });
    }
    if max_pitch - min_pitch < 12 {
        return Err(NootoneError::InvalidPitchRange {
            min: min_pitch,
            max: max_pitch,
            reason: "range must span at least an octave",
        });
    }

    let octave_offset = min_pitch.div_euclid(12) * 12;
    let mut pitches = Vec::new();
    for &pc in pitch_classes {
        let mut pitch = pc.rem_euclid(12) + octave_offset;
        while pitch < max_pitch {
            if pitch >= min_pitch {
                pitches.push(pitch);
            }
            pitch += 12;
        }
    }
    pitches.sort_unstable();
    pitches.dedup();
    Ok(pitches)
}

/// Pick one element uniformly at random.
pub fn random_choice<'a, T>(rng: &mut Rng, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.usize(..items.len()))
}
