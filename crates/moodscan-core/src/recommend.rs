//! Advisory text for detected emotions.

use crate::domain::{Detection, EmotionLabel};

/// Returned for keys with no entry, including the no-face sentinel.
pub const FALLBACK_RECOMMENDATION: &str = "No recommendation available.";

/// Advice for self-reported stress, which is not a classifier label.
const STRESSED_RECOMMENDATION: &str = "Take a short break, meditate, or go for a walk.";

/// Recommendation for a classifier label. Every label has an entry.
#[must_use]
pub const fn recommendation_for(label: EmotionLabel) -> &'static str {
    match label {
        EmotionLabel::Anger => "Try deep breathing exercises and listening to calming music.",
        EmotionLabel::Contempt => {
            "Pause before reacting and try to see the situation from another point of view."
        }
        EmotionLabel::Disgust => "Engage in positive distractions or focus on something uplifting.",
        EmotionLabel::Fear => "Practice mindfulness and talk to someone you trust.",
        EmotionLabel::Happy => "Keep doing what makes you happy and share the joy with others!",
        EmotionLabel::Neutral => "Maintain balance in your activities and stay mindful.",
        EmotionLabel::Sad => "Engage in hobbies you enjoy, or connect with friends.",
        EmotionLabel::Surprise => "Embrace the unexpected and stay open-minded.",
    }
}

/// Recommendation for a pipeline outcome.
#[must_use]
pub const fn recommend_detection(detection: Detection) -> &'static str {
    match detection {
        Detection::Emotion(label) => recommendation_for(label),
        Detection::NoFace => FALLBACK_RECOMMENDATION,
    }
}

/// Looks up a recommendation by free-form key.
///
/// Accepts label names and their aliases in any case, plus `stressed`.
/// Anything else gets [`FALLBACK_RECOMMENDATION`].
#[must_use]
pub fn recommend(key: &str) -> &'static str {
    if let Ok(label) = key.parse::<EmotionLabel>() {
        return recommendation_for(label);
    }
    if key.trim().eq_ignore_ascii_case("stressed") {
        return STRESSED_RECOMMENDATION;
    }
    FALLBACK_RECOMMENDATION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_label_has_a_recommendation() {
        for label in EmotionLabel::ALL {
            let text = recommendation_for(label);
            assert_ne!(text, FALLBACK_RECOMMENDATION, "{label} has no entry");
            assert!(!text.is_empty());
            assert_eq!(recommend(label.as_str()), text);
        }
    }

    #[test]
    fn test_happy_recommendation() {
        assert_eq!(
            recommend("happy"),
            "Keep doing what makes you happy and share the joy with others!"
        );
        assert_eq!(recommend("Happy"), recommend("happy"));
    }

    #[test]
    fn test_aliases_and_stressed() {
        assert_eq!(recommend("Angry"), recommendation_for(EmotionLabel::Anger));
        assert_eq!(recommend("stressed"), STRESSED_RECOMMENDATION);
    }

    #[test]
    fn test_unknown_key_falls_back() {
        assert_eq!(recommend("bored"), FALLBACK_RECOMMENDATION);
        assert_eq!(recommend(""), FALLBACK_RECOMMENDATION);
        assert_eq!(recommend("no_face"), FALLBACK_RECOMMENDATION);
    }

    #[test]
    fn test_no_face_detection_falls_back() {
        assert_eq!(recommend_detection(Detection::NoFace), FALLBACK_RECOMMENDATION);
    }
}
