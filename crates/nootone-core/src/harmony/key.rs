//! Key signatures and their chroma templates

use std::fmt;

use serde::{Deserialize, Serialize};

use super::chroma::Chroma;

const MAJOR_PROFILE: [f64; 12] = [7.0, 0.0, 2.0, 0.0, 5.0, 3.0, 0.5, 6.0, 0.0, 1.0, 0.0, 4.0];
const MINOR_PROFILE: [f64; 12] = [7.0, 0.0, 2.0, 5.0, 0.0, 3.0, 0.5, 6.0, 1.0, 0.0, 0.5, 4.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

/// Tonal centre plus mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeySignature {
    /// Pitch class of the tonic (0 = C)
    pub root: u8,
    pub mode: Mode,
}

impl KeySignature {
    pub fn new(root: u8, mode: Mode) -> Self {
        Self { root: root % 12, mode }
    }

    /// Keys are indexed 0..12 for major roots, 12..24 for minor roots.
    pub fn from_index(index: usize) -> Self {
        let mode = if index < 12 { Mode::Major } else { Mode::Minor };
        Self::new((index % 12) as u8, mode)
    }

    pub fn index(&self) -> usize {
        match self.mode {
            Mode::Major => self.root as usize,
            Mode::Minor => 12 + self.root as usize,
        }
    }

    /// Profile rotated so the tonic lands on `root`, scaled to a peak of 1.
    pub fn chroma_template(&self) -> Chroma {
        let profile = match self.mode {
            Mode::Major => &MAJOR_PROFILE,
            Mode::Minor => &MINOR_PROFILE,
        };
        let mut template = [0.0; 12];
        for (pc, value) in template.iter_mut().enumerate() {
            *value = profile[(pc + 12 - self.root as usize) % 12] / 7.0;
        }
        template
    }
}

impl Default for KeySignature {
    fn default() -> Self {
        Self::new(0, Mode::Major)
    }
}

impl fmt::Display for KeySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 12] = ["C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B"];
        let suffix = match self.mode {
            Mode::Major => "",
            Mode::Minor => "m",
        };
        write!(f, "{}{}", NAMES[self.root as usize], suffix)
    }
}

/// All 24 key templates in index order.
pub fn key_templates() -> Vec<Chroma> {
    (0..24).map(|i| KeySignature::from_index(i).chroma_template()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_rotation() {
        let g_major = KeySignature::new(7, Mode::Major).chroma_template();
        assert_eq!(g_major[7], 1.0); // tonic
        assert_eq!(g_major[2], 6.0 / 7.0); // dominant
        assert_eq!(g_major[8], 0.0);

        let a_minor = KeySignature::new(9, Mode::Minor).chroma_template();
        assert_eq!(a_minor[9], 1.0);
        assert_eq!(a_minor[0], 5.0 / 7.0); // minor third
    }

    #[test]
    fn test_index_round_trip() {
        for i in 0..24 {
            assert_eq!(KeySignature::from_index(i).index(), i);
        }
        assert_eq!(key_templates().len(), 24);
    }
}
