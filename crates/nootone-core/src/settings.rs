//! Arrangement settings
//!
//! [`HarmonizerSettings`] holds ranges and choices; [`HarmonizerSettings::parse`]
//! draws one concrete [`ArrangementParams`] from them for a given tempo.

use fastrand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NootoneError, Result};
use crate::harmony::{ChordVocabulary, HarmonizeParams};
use crate::music::{InstrumentName, TimeSignature};
use crate::numeric::random_choice;
use crate::rhythm::ArpeggiateParams;

/// Grooviness at or above which arpeggio notes are cut to their pattern length
const GROOVE_THRESHOLD: f64 = 0.5;
const MIN_CONTOUR_SIZE: usize = 6;

/// Closed interval a value is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Uniform draw; a degenerate range yields `min`.
    pub fn sample(&self, rng: &mut Rng) -> f64 {
        rng.f64() * (self.max - self.min) + self.min
    }

    fn validate_unit(&self, name: &'static str) -> Result<()> {
        if self.min > self.max {
            return Err(NootoneError::InvalidRange { min: self.min, max: self.max });
        }
        for value in [self.min, self.max] {
            if !(0.0..=1.0).contains(&value) {
                return Err(NootoneError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonizerSettings {
    /// Chord vocabulary: a collection name or a list of interval sets
    pub style: ChordVocabulary,
    /// Arpeggio pattern length in beats
    pub pattern_size: usize,
    /// Candidate harmonic segment lengths in beats
    pub segment_sizes: Vec<f64>,
    /// Share of the pattern grid that carries attacks
    pub rhythmic_complexity: ValueRange,
    /// Grid subdivisions per beat
    pub max_subdiv: usize,
    pub grooviness: ValueRange,
    pub instrument: InstrumentName,
    pub time_signature: TimeSignature,
    /// Chroma matching knobs; `segment_size` is replaced on parse
    pub harmonizer: HarmonizeParams,
}

impl Default for HarmonizerSettings {
    fn default() -> Self {
        Self {
            style: ChordVocabulary::default(),
            pattern_size: 2,
            segment_sizes: vec![2.0, 4.0],
            rhythmic_complexity: ValueRange::new(0.25, 0.75),
            max_subdiv: 4,
            grooviness: ValueRange::new(0.0, 0.5),
            instrument: InstrumentName::NylonGuitar,
            time_signature: TimeSignature::COMMON,
            harmonizer: HarmonizeParams::default(),
        }
    }
}

/// One concrete draw of [`HarmonizerSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrangementParams {
    pub vocabulary: ChordVocabulary,
    pub harmonize: HarmonizeParams,
    pub arpeggio: ArpeggiateParams,
    /// False when the complexity range tops out at zero: chords are held, not arpeggiated
    pub arpeggiate: bool,
    pub grooviness: f64,
    pub instrument: InstrumentName,
    pub time_signature: TimeSignature,
}

impl HarmonizerSettings {
    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pattern_size == 0 {
            return Err(NootoneError::InvalidParameter { name: "pattern_size", value: 0.0 });
        }
        if self.max_subdiv == 0 {
            return Err(NootoneError::InvalidParameter { name: "max_subdiv", value: 0.0 });
        }
        if let Some(&bad) = self.segment_sizes.iter().find(|s| !(**s > 0.0 && s.is_finite())) {
            return Err(NootoneError::InvalidParameter { name: "segment_sizes", value: bad });
        }
        if self.segment_sizes.is_empty() {
            return Err(NootoneError::InvalidParameter { name: "segment_sizes", value: 0.0 });
        }
        self.rhythmic_complexity.validate_unit("rhythmic_complexity")?;
        self.grooviness.validate_unit("grooviness")?;
        Ok(())
    }

    /// Draw concrete arrangement parameters for a recording at `tempo` BPM.
    pub fn parse(&self, tempo: f64, rng: &mut Rng) -> Result<ArrangementParams> {
        if !(tempo > 0.0 && tempo.is_finite()) {
            return Err(NootoneError::InvalidTempo(tempo));
        }
        self.validate()?;

        let max_attacks = (self.pattern_size * self.max_subdiv) as f64;
        let num_attacks = ((max_attacks * self.rhythmic_complexity.sample(rng)).ceil() as usize).max(1);
        let contour_size = ((rng.f64() * num_attacks as f64 * 2.0 + num_attacks as f64).floor() as usize)
            .max(MIN_CONTOUR_SIZE);

        let segment_beats = random_choice(rng, &self.segment_sizes).copied().unwrap_or(2.0);
        let segment_size = 60.0 / tempo * segment_beats;
        let grooviness = self.grooviness.sample(rng);

        let params = ArrangementParams {
            vocabulary: self.style.clone(),
            harmonize: HarmonizeParams { segment_size, ..self.harmonizer },
            arpeggio: ArpeggiateParams {
                num_attacks,
                max_subdiv: self.max_subdiv,
                pattern_size: self.pattern_size,
                contour_size,
                tempo,
                groove: grooviness >= GROOVE_THRESHOLD,
            },
            arpeggiate: self.rhythmic_complexity.max > 0.0,
            grooviness,
            instrument: self.instrument,
            time_signature: self.time_signature,
        };
        tracing::debug!(num_attacks, contour_size, segment_size, grooviness, "parsed harmonizer settings");
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = HarmonizerSettings::default();
        assert_eq!(settings.style, ChordVocabulary::named("classical"));
        assert_eq!(settings.segment_sizes, vec![2.0, 4.0]);
        assert_eq!(settings.instrument, InstrumentName::NylonGuitar);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_parse_ranges() {
        let settings = HarmonizerSettings::default();
        for seed in 0..50 {
            let mut rng = Rng::with_seed(seed);
            let params = settings.parse(120.0, &mut rng).unwrap();
            // 8 grid slots at 25%..75% complexity
            assert!((2..=6).contains(&params.arpeggio.num_attacks));
            assert!(params.arpeggio.contour_size >= 6);
            assert!(params.arpeggio.contour_size <= (params.arpeggio.num_attacks * 3).max(6));
            assert!(params.harmonize.segment_size == 1.0 || params.harmonize.segment_size == 2.0);
            assert!((0.0..0.5).contains(&params.grooviness));
            assert!(!params.arpeggio.groove);
            assert!(params.arpeggiate);
        }
    }

    #[test]
    fn test_parse_is_seeded() {
        let settings = HarmonizerSettings::default();
        let a = settings.parse(96.0, &mut Rng::with_seed(5)).unwrap();
        let b = settings.parse(96.0, &mut Rng::with_seed(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_complexity_disables_arpeggio() {
        let settings = HarmonizerSettings {
            rhythmic_complexity: ValueRange::new(0.0, 0.0),
            grooviness: ValueRange::new(0.8, 0.8),
            ..Default::default()
        };
        let params = settings.parse(100.0, &mut Rng::with_seed(1)).unwrap();
        assert!(!params.arpeggiate);
        assert_eq!(params.arpeggio.num_attacks, 1);
        assert!(params.arpeggio.groove);
    }

    #[test]
    fn test_invalid_settings() {
        let mut rng = Rng::with_seed(0);
        assert!(HarmonizerSettings::default().parse(0.0, &mut rng).is_err());
        let empty = HarmonizerSettings { segment_sizes: vec![], ..Default::default() };
        assert!(empty.parse(120.0, &mut rng).is_err());
        let inverted = HarmonizerSettings { grooviness: ValueRange::new(0.6, 0.2), ..Default::default() };
        assert!(inverted.parse(120.0, &mut rng).is_err());
    }

    #[test]
    fn test_from_toml() {
        let settings = HarmonizerSettings::from_toml(
            r#"
            style = "jazz"
            pattern_size = 4
            instrument = "electricPiano"

            [time_signature]
            numerator = 3
            denominator = 4

            [harmonizer]
            harmonic_memory = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(settings.style, ChordVocabulary::named("jazz"));
        assert_eq!(settings.pattern_size, 4);
        assert_eq!(settings.max_subdiv, 4);
        assert_eq!(settings.instrument, InstrumentName::ElectricPiano);
        assert_eq!(settings.time_signature, TimeSignature::new(3, 4).unwrap());
        assert_eq!(settings.harmonizer.harmonic_memory, 0.5);
        assert_eq!(settings.harmonizer.look_ahead, 2);

        let custom = HarmonizerSettings::from_toml("style = [[0, 4, 7], [0, 3, 7]]").unwrap();
        assert_eq!(custom.style, ChordVocabulary::Custom(vec![vec![0, 4, 7], vec![0, 3, 7]]));
        assert!(HarmonizerSettings::from_toml("pattern_size = \"two\"").is_err());
    }
}
