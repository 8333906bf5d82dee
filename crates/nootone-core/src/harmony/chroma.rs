//! Pitch-class histograms

use std::f64::consts::PI;

use crate::music::NoteEvent;

/// 12-bin pitch-class histogram, 0 = C.
pub type Chroma = [f64; 12];

/// Metrical emphasis of an onset within a segment.
///
/// Product of three raised cosines at half, equal and double the segment
/// pulse; onsets on strong subdivisions score close to 1.
pub fn metric_weight(onset: f64, segment_size: f64) -> f64 {
    let product: f64 = (-1..=1)
        .map(|i| 0.25 * (onset * 2f64.powi(i) * PI * (4.0 / segment_size)).cos() + 0.75)
        .product();
    product.sqrt()
}

/// Duration-weighted chroma of `notes`, normalized to a peak of 1.
///
/// `origin` is the start of the enclosing segment; onsets are measured from it.
pub fn chroma_from_notes<'a, I>(notes: I, segment_size: f64, origin: f64) -> Chroma
where
    I: IntoIterator<Item = &'a NoteEvent>,
{
    let mut chroma = [0.0; 12];
    for note in notes {
        chroma[(note.pitch % 12) as usize] += note.duration * metric_weight(note.onset - origin, segment_size);
    }
    normalize(chroma)
}

/// Scale so the largest bin is 1. An all-zero chroma is returned unchanged.
pub fn normalize(mut chroma: Chroma) -> Chroma {
    let max = chroma.iter().copied().fold(0.0, f64::max);
    if max > 0.0 {
        for v in &mut chroma {
            *v /= max;
        }
    }
    chroma
}

/// `a * (1 - weight) + b * weight`
pub fn blend(a: &Chroma, b: &Chroma, weight: f64) -> Chroma {
    let mut out = [0.0; 12];
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b)) {
        *o = x * (1.0 - weight) + y * weight;
    }
    out
}

pub fn argmax(chroma: &Chroma) -> usize {
    let mut best = 0;
    for (i, &v) in chroma.iter().enumerate() {
        if v > chroma[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_weight_emphasises_downbeats() {
        assert!((metric_weight(0.0, 2.0) - 1.0).abs() < 1e-12);
        let off_beat = metric_weight(0.5, 2.0);
        let mid = metric_weight(1.0, 2.0);
        assert!(off_beat < mid && mid < 1.0);
        assert!((mid - 0.5_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_chroma_from_notes() {
        let notes = [
            NoteEvent::new(60, 0.0, 1.0, 1.0),
            NoteEvent::new(72, 0.0, 1.0, 1.0),
            NoteEvent::new(67, 0.0, 1.0, 1.0),
        ];
        let chroma = chroma_from_notes(&notes, 1.0, 0.0);
        assert_eq!(chroma[0], 1.0);
        assert_eq!(chroma[7], 0.5);
        assert_eq!(argmax(&chroma), 0);
    }

    #[test]
    fn test_normalize_empty_chroma() {
        assert_eq!(normalize([0.0; 12]), [0.0; 12]);
    }

    #[test]
    fn test_blend() {
        let a = [1.0; 12];
        let b = [0.0; 12];
        assert_eq!(blend(&a, &b, 0.25), [0.75; 12]);
    }
}
