//! Octave placement that keeps each voice moving as little as possible

use fastrand::Rng;

pub const CONNECT_LOWER_PITCH: i32 = 36;
pub const CONNECT_UPPER_PITCH: i32 = 85;
pub const VOICE_LEADING_LOWER_PITCH: i32 = 48;
pub const VOICE_LEADING_UPPER_PITCH: i32 = 85;

/// Shift `pitch` by whole octaves until it is no longer outside `[lower, upper]`.
fn fold_into_range(pitch: i32, lower: i32, upper: i32) -> i32 {
    if pitch < lower {
        pitch + 12 * (lower - pitch + 11).div_euclid(12)
    } else if pitch > upper {
        pitch - 12 * (pitch - upper + 11).div_euclid(12)
    } else {
        pitch
    }
}

/// Smallest signed step from pitch class `from` to pitch class `to`; a tritone goes down.
fn closest_step(from: i32, to: i32) -> i32 {
    let up = (to - from).rem_euclid(12);
    let down = up - 12;
    if up.abs() < down.abs() { up } else { down }
}

/// Place the pitch classes of `target` as close as possible to the pitches of `source`.
///
/// Each source pitch moves to the nearest unvisited target pitch class. Target
/// pitch classes still unvisited afterwards are connected again and appended,
/// so every one of them sounds. Output is sorted and free of duplicates.
pub fn connect_chords(source: &[i32], target: &[i32], lower: i32, upper: i32, rng: &mut Rng) -> Vec<i32> {
    if target.is_empty() {
        return Vec::new();
    }

    let mut classes: Vec<i32> = Vec::with_capacity(target.len());
    for pc in target.iter().map(|p| p.rem_euclid(12)) {
        if !classes.contains(&pc) {
            classes.push(pc);
        }
    }
    rng.shuffle(&mut classes);

    if source.is_empty() {
        let mut placed: Vec<i32> = target.iter().map(|&p| fold_into_range(p, lower, upper)).collect();
        placed.sort_unstable();
        placed.dedup();
        return placed;
    }

    let mut visited: Vec<i32> = Vec::with_capacity(classes.len());
    let mut connected = Vec::with_capacity(source.len() + classes.len());
    for &pitch in source {
        let from = pitch.rem_euclid(12);
        let mut best: Option<(i32, i32)> = None;
        for &pc in &classes {
            if visited.contains(&pc) && visited.len() < classes.len() {
                continue;
            }
            let step = closest_step(from, pc);
            if best.is_none_or(|(s, _)| step.abs() < s.abs()) {
                best = Some((step, pc));
            }
        }
        if let Some((step, pc)) = best {
            connected.push(fold_into_range(pitch + step, lower, upper));
            if !visited.contains(&pc) {
                visited.push(pc);
            }
        }
    }

    let missing: Vec<i32> = classes.iter().copied().filter(|pc| !visited.contains(pc)).collect();
    if !missing.is_empty() {
        connected.extend(connect_chords(source, &missing, lower, upper, rng));
    }

    connected.sort_unstable();
    connected.dedup();
    connected
}

/// Voice-lead a chord progression, treating the bass and the upper voices separately.
///
/// The first chord is kept as given (sorted). Each following chord's lowest
/// note is connected to the previous bass, and the rest to the previous upper
/// voices.
pub fn apply_voice_leading(chords: &[Vec<i32>], lower: i32, upper: i32, rng: &mut Rng) -> Vec<Vec<i32>> {
    let mut led: Vec<Vec<i32>> = Vec::with_capacity(chords.len());
    for chord in chords {
        let mut chord = chord.clone();
        chord.sort_unstable();

        let Some(previous) = led.last() else {
            led.push(chord);
            continue;
        };
        if chord.is_empty() {
            led.push(chord);
            continue;
        }

        let split = previous.len().min(1);
        let bass = connect_chords(&previous[..split], &chord[..1], lower, upper, rng);
        let upper_voices = connect_chords(&previous[split..], &chord[1..], lower, upper, rng);

        let mut voiced: Vec<i32> = bass.into_iter().chain(upper_voices).collect();
        voiced.sort_unstable();
        voiced.dedup();
        led.push(voiced);
    }
    led
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_step() {
        assert_eq!(closest_step(0, 4), 4);
        assert_eq!(closest_step(0, 8), -4);
        assert_eq!(closest_step(0, 6), -6); // tritone goes down
        assert_eq!(closest_step(11, 0), 1);
    }

    #[test]
    fn test_fold_into_range() {
        assert_eq!(fold_into_range(30, 36, 85), 42);
        assert_eq!(fold_into_range(100, 36, 85), 76);
        assert_eq!(fold_into_range(60, 36, 85), 60);
    }

    #[test]
    fn test_connect_chords_moves_minimally() {
        let mut rng = Rng::with_seed(1);
        // C major to F major: C stays, E up to F, G up to A
        let out = connect_chords(&[60, 64, 67], &[65, 69, 72], 36, 85, &mut rng);
        assert_eq!(out, vec![60, 65, 69]);
    }

    #[test]
    fn test_connect_chords_covers_every_target_class() {
        for seed in 0..20 {
            let mut rng = Rng::with_seed(seed);
            let out = connect_chords(&[60], &[64, 67, 71], 36, 85, &mut rng);
            let mut pcs: Vec<i32> = out.iter().map(|p| p % 12).collect();
            pcs.sort_unstable();
            assert_eq!(pcs, vec![4, 7, 11]);
        }
    }

    #[test]
    fn test_connect_chords_empty_target() {
        let mut rng = Rng::with_seed(1);
        assert!(connect_chords(&[60], &[], 36, 85, &mut rng).is_empty());
        assert_eq!(connect_chords(&[], &[20, 64], 36, 85, &mut rng), vec![44, 64]);
    }

    #[test]
    fn test_apply_voice_leading() {
        let mut rng = Rng::with_seed(9);
        let chords = vec![vec![48, 60, 64, 67], vec![53, 65, 69, 72]];
        let led = apply_voice_leading(&chords, VOICE_LEADING_LOWER_PITCH, VOICE_LEADING_UPPER_PITCH, &mut rng);
        assert_eq!(led[0], vec![48, 60, 64, 67]);
        // bass C3 -> F3, upper voices to the nearest F major tones
        assert_eq!(led[1], vec![53, 60, 65, 69]);
    }
}
