//! Emotion labels and ordered label sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::InferenceError;

/// One of the eight emotions the classifier is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionLabel {
    Anger,
    Contempt,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl EmotionLabel {
    /// All labels in training order.
    pub const ALL: [Self; 8] = [
        Self::Anger,
        Self::Contempt,
        Self::Disgust,
        Self::Fear,
        Self::Happy,
        Self::Neutral,
        Self::Sad,
        Self::Surprise,
    ];

    /// Canonical lowercase name, as used in artifacts and JSON output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anger => "anger",
            Self::Contempt => "contempt",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Happy => "happy",
            Self::Neutral => "neutral",
            Self::Sad => "sad",
            Self::Surprise => "surprise",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known emotion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown emotion label '{0}'")]
pub struct UnknownLabel(pub String);

impl FromStr for EmotionLabel {
    type Err = UnknownLabel;

    /// Parses canonical names and the adjective forms used by the web client
    /// (`angry`, `fearful`, `surprised`), ignoring case and surrounding space.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anger" | "angry" => Ok(Self::Anger),
            "contempt" => Ok(Self::Contempt),
            "disgust" | "disgusted" => Ok(Self::Disgust),
            "fear" | "fearful" => Ok(Self::Fear),
            "happy" => Ok(Self::Happy),
            "neutral" => Ok(Self::Neutral),
            "sad" => Ok(Self::Sad),
            "surprise" | "surprised" => Ok(Self::Surprise),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// Ordered list of labels. Index `i` of the classifier output is `labels[i]`.
///
/// Never empty and never contains the same label twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet(Vec<EmotionLabel>);

impl LabelSet {
    /// Creates a label set, rejecting empty or duplicated lists.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::InvalidLabels`] if `labels` is empty or has duplicates.
    pub fn new(labels: Vec<EmotionLabel>) -> Result<Self, InferenceError> {
        if labels.is_empty() {
            return Err(InferenceError::InvalidLabels("label set is empty".into()));
        }
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(InferenceError::InvalidLabels(format!(
                    "label '{label}' appears more than once"
                )));
            }
        }
        Ok(Self(labels))
    }

    /// Parses a label set from names, in order.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::InvalidLabels`] on unknown names, duplicates or an empty list.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, InferenceError> {
        let labels = names
            .iter()
            .map(|n| n.as_ref().parse::<EmotionLabel>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| InferenceError::InvalidLabels(e.to_string()))?;
        Self::new(labels)
    }

    /// Number of labels (and classifier outputs).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Label at a classifier output index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<EmotionLabel> {
        self.0.get(index).copied()
    }

    /// Iterates labels in output order.
    pub fn iter(&self) -> impl Iterator<Item = EmotionLabel> + '_ {
        self.0.iter().copied()
    }

    /// Canonical names in output order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(EmotionLabel::as_str).collect()
    }
}

impl Default for LabelSet {
    /// The training-time order.
    fn default() -> Self {
        Self(EmotionLabel::ALL.to_vec())
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(","))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_and_aliases() {
        assert_eq!("happy".parse::<EmotionLabel>(), Ok(EmotionLabel::Happy));
        assert_eq!("Angry".parse::<EmotionLabel>(), Ok(EmotionLabel::Anger));
        assert_eq!(" fearful ".parse::<EmotionLabel>(), Ok(EmotionLabel::Fear));
        assert_eq!("SURPRISED".parse::<EmotionLabel>(), Ok(EmotionLabel::Surprise));
        assert!("stressed".parse::<EmotionLabel>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for label in EmotionLabel::ALL {
            assert_eq!(label.to_string().parse::<EmotionLabel>(), Ok(label));
        }
    }

    #[test]
    fn test_default_label_set_is_training_order() {
        let labels = LabelSet::default();
        assert_eq!(labels.len(), 8);
        assert_eq!(labels.get(0), Some(EmotionLabel::Anger));
        assert_eq!(labels.get(4), Some(EmotionLabel::Happy));
        assert_eq!(labels.get(8), None);
        assert_eq!(
            labels.to_string(),
            "anger,contempt,disgust,fear,happy,neutral,sad,surprise"
        );
    }

    #[test]
    fn test_label_set_rejects_duplicates() {
        let result = LabelSet::parse(&["happy", "sad", "happy"]);
        assert!(matches!(result, Err(InferenceError::InvalidLabels(_))));
    }

    #[test]
    fn test_label_set_rejects_empty() {
        let names: [&str; 0] = [];
        assert!(LabelSet::parse(&names).is_err());
    }

    #[test]
    fn test_label_set_parse_keeps_order() {
        let labels = LabelSet::parse(&["happy", "sad", "angry"]).unwrap();
        assert_eq!(
            labels.iter().collect::<Vec<_>>(),
            vec![EmotionLabel::Happy, EmotionLabel::Sad, EmotionLabel::Anger]
        );
    }

    #[test]
    fn test_label_serializes_snake_case() {
        let json = serde_json::to_string(&EmotionLabel::Surprise).unwrap();
        assert_eq!(json, "\"surprise\"");
    }
}
