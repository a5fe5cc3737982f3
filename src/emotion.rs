//! Circumplex emotion classification
//!
//! The provider scores every reply on two axes (valence, arousal). This module
//! snaps that continuous signal onto one of thirteen named emotions so the
//! client can pick a matching character pose.
//!
//! Reference points sit on a circle of radius [`EXTREME`] around a neutral
//! origin, at the angles of the classic circumplex model of affect.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Radius of the reference circle on the normalized [-1, 1] scale
pub const EXTREME: f64 = 11.0 / 13.0;

/// sin(60°) / cos(30°)
const HALF_SQRT_3: f64 = 0.866_025_403_784_438_6;

/// sin(45°) / cos(45°)
const HALF_SQRT_2: f64 = std::f64::consts::FRAC_1_SQRT_2;

// ============================================================================
// Types
// ============================================================================

/// Raw affect signal as reported by the provider.
///
/// Untrusted: a provider may return values outside [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffectVector {
    pub valence: f64,
    pub arousal: f64,
}

impl AffectVector {
    pub const fn new(valence: f64, arousal: f64) -> Self {
        Self { valence, arousal }
    }

    /// Both components are finite numbers
    pub fn is_finite(&self) -> bool {
        self.valence.is_finite() && self.arousal.is_finite()
    }

    /// Clamp both components into [-1, 1]
    pub fn clamped(self) -> Self {
        Self {
            valence: self.valence.clamp(-1.0, 1.0),
            arousal: self.arousal.clamp(-1.0, 1.0),
        }
    }
}

/// The closed set of emotions the client knows how to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Neutral,
    Happy,
    Excited,
    Alert,
    Tense,
    Angry,
    Distressed,
    Sad,
    Depressed,
    Bored,
    Calm,
    Relaxed,
    Content,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 13] = [
        EmotionLabel::Neutral,
        EmotionLabel::Happy,
        EmotionLabel::Excited,
        EmotionLabel::Alert,
        EmotionLabel::Tense,
        EmotionLabel::Angry,
        EmotionLabel::Distressed,
        EmotionLabel::Sad,
        EmotionLabel::Depressed,
        EmotionLabel::Bored,
        EmotionLabel::Calm,
        EmotionLabel::Relaxed,
        EmotionLabel::Content,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Happy => "happy",
            EmotionLabel::Excited => "excited",
            EmotionLabel::Alert => "alert",
            EmotionLabel::Tense => "tense",
            EmotionLabel::Angry => "angry",
            EmotionLabel::Distressed => "distressed",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Depressed => "depressed",
            EmotionLabel::Bored => "bored",
            EmotionLabel::Calm => "calm",
            EmotionLabel::Relaxed => "relaxed",
            EmotionLabel::Content => "content",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmotionLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| format!("unknown emotion label: {}", s))
    }
}

/// A named point on the circumplex.
///
/// `precedence` only matters when two points are exactly equidistant from the
/// input; the higher value wins.
#[derive(Debug, Clone, Copy)]
pub struct ReferencePoint {
    pub label: EmotionLabel,
    pub valence: f64,
    pub arousal: f64,
    pub precedence: u8,
}

impl ReferencePoint {
    const fn new(label: EmotionLabel, valence: f64, arousal: f64, precedence: u8) -> Self {
        Self {
            label,
            valence: valence * EXTREME,
            arousal: arousal * EXTREME,
            precedence,
        }
    }

    /// Euclidean distance to `vector` in (valence, arousal) space
    pub fn distance_to(&self, vector: AffectVector) -> f64 {
        let dv = self.valence - vector.valence;
        let da = self.arousal - vector.arousal;
        (dv * dv + da * da).sqrt()
    }
}

/// Thresholds adapted from the circumplex model of emotion diagram
/// (Wikimedia Commons, CC BY-SA 4.0).
pub static REFERENCE_POINTS: [ReferencePoint; 13] = [
    ReferencePoint::new(EmotionLabel::Neutral, 0.0, 0.0, 13),
    ReferencePoint::new(EmotionLabel::Happy, HALF_SQRT_3, 0.5, 12),
    ReferencePoint::new(EmotionLabel::Excited, HALF_SQRT_2, HALF_SQRT_2, 11),
    ReferencePoint::new(EmotionLabel::Alert, 0.5, HALF_SQRT_3, 10),
    ReferencePoint::new(EmotionLabel::Tense, -0.5, HALF_SQRT_3, 9),
    ReferencePoint::new(EmotionLabel::Angry, -HALF_SQRT_2, HALF_SQRT_2, 8),
    ReferencePoint::new(EmotionLabel::Distressed, -HALF_SQRT_3, 0.5, 7),
    ReferencePoint::new(EmotionLabel::Sad, -HALF_SQRT_3, -0.5, 6),
    ReferencePoint::new(EmotionLabel::Depressed, -HALF_SQRT_2, -HALF_SQRT_2, 5),
    ReferencePoint::new(EmotionLabel::Bored, -0.5, -HALF_SQRT_3, 4),
    ReferencePoint::new(EmotionLabel::Calm, 0.5, -HALF_SQRT_3, 3),
    ReferencePoint::new(EmotionLabel::Relaxed, HALF_SQRT_2, -HALF_SQRT_2, 2),
    ReferencePoint::new(EmotionLabel::Content, HALF_SQRT_3, -0.5, 1),
];

// ============================================================================
// Classification
// ============================================================================

/// Nearest reference point to `vector`, ties broken by precedence.
///
/// Returns `None` only for an empty `points` slice.
pub fn nearest(vector: AffectVector, points: &[ReferencePoint]) -> Option<EmotionLabel> {
    let mut best: Option<(&ReferencePoint, f64)> = None;

    for point in points {
        let distance = point.distance_to(vector);
        let replace = match best {
            None => true,
            Some((current, best_distance)) => {
                distance < best_distance
                    || (distance == best_distance && point.precedence > current.precedence)
            }
        };
        if replace {
            best = Some((point, distance));
        }
    }

    best.map(|(point, _)| point.label)
}

/// Classify an affect vector into one of the thirteen labels.
///
/// Total over all inputs: out-of-range values are measured as-is, and a
/// non-finite component maps to neutral.
pub fn classify(vector: AffectVector) -> EmotionLabel {
    if !vector.is_finite() {
        return EmotionLabel::Neutral;
    }
    nearest(vector, &REFERENCE_POINTS).unwrap_or(EmotionLabel::Neutral)
}

/// Clamp into [-1, 1] first, then classify
pub fn classify_clamped(vector: AffectVector) -> EmotionLabel {
    classify(vector.clamped())
}

/// Label for a reply that may not carry a usable vector
pub fn classify_reply(vector: Option<AffectVector>) -> EmotionLabel {
    vector.map(classify).unwrap_or(EmotionLabel::Neutral)
}
