//! Enharmonic spelling of pitch classes against a key

use std::fmt;

use crate::harmony::{KeySignature, Mode};

/// Scale degree (0..7) of each semitone above the tonic.
const DIATONIC_SCHEMA: [usize; 12] = [0, 1, 1, 2, 2, 3, 3, 4, 5, 5, 6, 6];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    const ALL: [Letter; 7] = [Letter::C, Letter::D, Letter::E, Letter::F, Letter::G, Letter::A, Letter::B];

    fn pitch_class(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn as_str(self) -> &'static str {
        match self {
            Letter::C => "C",
            Letter::D => "D",
            Letter::E => "E",
            Letter::F => "F",
            Letter::G => "G",
            Letter::A => "A",
            Letter::B => "B",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accidental {
    Sharp,
    Flat,
    DoubleSharp,
    DoubleFlat,
}

impl Accidental {
    fn semitones(self) -> i32 {
        match self {
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
            Accidental::DoubleSharp => 2,
            Accidental::DoubleFlat => -2,
        }
    }

    fn from_semitones(semitones: i32) -> Option<Self> {
        match semitones {
            1 => Some(Accidental::Sharp),
            -1 => Some(Accidental::Flat),
            2 => Some(Accidental::DoubleSharp),
            -2 => Some(Accidental::DoubleFlat),
            _ => None,
        }
    }

    /// Accidental marker placed before a note
    fn note_marker(self) -> &'static str {
        match self {
            Accidental::Sharp => "^",
            Accidental::Flat => "_",
            Accidental::DoubleSharp => "^^",
            Accidental::DoubleFlat => "__",
        }
    }

    /// Accidental suffix in a key field
    fn key_marker(self) -> &'static str {
        match self {
            Accidental::Sharp => "#",
            Accidental::Flat => "b",
            Accidental::DoubleSharp => "##",
            Accidental::DoubleFlat => "bb",
        }
    }
}

/// A letter name with an optional accidental.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpelledPitch {
    pub letter: Letter,
    pub accidental: Option<Accidental>,
}

impl SpelledPitch {
    const fn natural(letter: Letter) -> Self {
        Self { letter, accidental: None }
    }

    const fn with(letter: Letter, accidental: Accidental) -> Self {
        Self { letter, accidental: Some(accidental) }
    }

    fn pitch_class(&self) -> i32 {
        (self.letter.pitch_class() + self.accidental.map_or(0, Accidental::semitones)).rem_euclid(12)
    }
}

impl fmt::Display for SpelledPitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(accidental) = self.accidental {
            f.write_str(accidental.note_marker())?;
        }
        f.write_str(self.letter.as_str())
    }
}

const MAJOR_KEYS: [SpelledPitch; 12] = [
    SpelledPitch::natural(Letter::C),
    SpelledPitch::with(Letter::D, Accidental::Flat),
    SpelledPitch::natural(Letter::D),
    SpelledPitch::with(Letter::E, Accidental::Flat),
    SpelledPitch::natural(Letter::E),
    SpelledPitch::natural(Letter::F),
    SpelledPitch::with(Letter::G, Accidental::Flat),
    SpelledPitch::natural(Letter::G),
    SpelledPitch::with(Letter::A, Accidental::Flat),
    SpelledPitch::natural(Letter::A),
    SpelledPitch::with(Letter::B, Accidental::Flat),
    SpelledPitch::natural(Letter::B),
];

const MINOR_KEYS: [SpelledPitch; 12] = [
    SpelledPitch::natural(Letter::C),
    SpelledPitch::with(Letter::C, Accidental::Sharp),
    SpelledPitch::natural(Letter::D),
    SpelledPitch::with(Letter::E, Accidental::Flat),
    SpelledPitch::natural(Letter::E),
    SpelledPitch::natural(Letter::F),
    SpelledPitch::with(Letter::F, Accidental::Sharp),
    SpelledPitch::natural(Letter::G),
    SpelledPitch::with(Letter::G, Accidental::Sharp),
    SpelledPitch::natural(Letter::A),
    SpelledPitch::with(Letter::B, Accidental::Flat),
    SpelledPitch::natural(Letter::B),
];

/// A key with a spelled tonic, as written in the `K:` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpelledKey {
    pub tonic: SpelledPitch,
    pub mode: Mode,
}

impl SpelledKey {
    pub fn new(key: KeySignature) -> Self {
        let table = match key.mode {
            Mode::Major => &MAJOR_KEYS,
            Mode::Minor => &MINOR_KEYS,
        };
        Self { tonic: table[key.root as usize % 12], mode: key.mode }
    }

    /// Spell `pitch_class` as the scale degree it occupies in this key.
    pub fn spell(&self, pitch_class: u8) -> SpelledPitch {
        let pitch_class = pitch_class as i32 % 12;
        let tonic = self.tonic.pitch_class();
        let degree = DIATONIC_SCHEMA[(pitch_class - tonic).rem_euclid(12) as usize];
        let letter = Letter::ALL[(self.tonic.letter.index() + degree) % 7];

        let mut offset = pitch_class - letter.pitch_class();
        if offset > 6 {
            offset -= 12;
        } else if offset < -6 {
            offset += 12;
        }
        SpelledPitch { letter, accidental: Accidental::from_semitones(offset) }
    }
}

impl fmt::Display for SpelledKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tonic.letter.as_str())?;
        if let Some(accidental) = self.tonic.accidental {
            f.write_str(accidental.key_marker())?;
        }
        if self.mode == Mode::Minor {
            f.write_str("m")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(root: u8, mode: Mode) -> SpelledKey {
        SpelledKey::new(KeySignature::new(root, mode))
    }

    #[test]
    fn test_key_names() {
        assert_eq!(key(0, Mode::Major).to_string(), "C");
        assert_eq!(key(3, Mode::Major).to_string(), "Eb");
        assert_eq!(key(6, Mode::Major).to_string(), "Gb");
        assert_eq!(key(1, Mode::Minor).to_string(), "C#m");
        assert_eq!(key(9, Mode::Minor).to_string(), "Am");
    }

    #[test]
    fn test_spelling_in_c_major() {
        let c = key(0, Mode::Major);
        let spelled: Vec<String> = (0..12).map(|pc| c.spell(pc).to_string()).collect();
        assert_eq!(spelled, ["C", "_D", "D", "_E", "E", "F", "^F", "G", "_A", "A", "_B", "B"]);
    }

    #[test]
    fn test_spelling_follows_the_key() {
        // leading tone of A minor
        assert_eq!(key(9, Mode::Minor).spell(8).to_string(), "^G");
        // D sharp in B major
        assert_eq!(key(11, Mode::Major).spell(3).to_string(), "^D");
        // C flat in D flat major
        assert_eq!(key(1, Mode::Major).spell(11).to_string(), "_C");
        assert_eq!(key(3, Mode::Major).spell(3).to_string(), "_E");
    }
}
