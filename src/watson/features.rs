//! Feature extraction for the structured prediction model.

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Number of values in every [`FeatureVector`].
pub const FEATURE_COUNT: usize = 6;

/// Patient attributes sent alongside the symptom text.
///
/// Every field is optional; absent (or `null`) values fall back to zero or
/// the empty string during extraction.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientData {
    #[serde(default)]
    pub age: Option<Number>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub medical_history: Option<String>,
    #[serde(default)]
    pub current_meds: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
}

/// Fixed-length numeric encoding of symptoms and patient attributes.
///
/// Order: symptom count, age, is-male flag, medical history word count,
/// current medication word count, allergy word count. Values are JSON numbers
/// so integers stay integers on the wire and age passes through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector([Number; FEATURE_COUNT]);

impl FeatureVector {
    /// Lossy numeric view, mainly for assertions and logging.
    pub fn as_f64(&self) -> [f64; FEATURE_COUNT] {
        self.0.clone().map(|n| n.as_f64().unwrap_or_default())
    }
}

/// Word separators: Unicode White_Space plus the ASCII information
/// separators U+001C..=U+001F.
fn is_split_whitespace(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

fn word_count(text: Option<&str>) -> usize {
    text.unwrap_or_default()
        .split(is_split_whitespace)
        .filter(|word| !word.is_empty())
        .count()
}

/// Map symptom text and patient attributes to a [`FeatureVector`].
///
/// Symptoms are counted as comma-separated segments, so an empty string still
/// counts as one segment.
pub fn extract_features(symptoms: &str, patient: &PatientData) -> FeatureVector {
    let symptom_count = symptoms.to_lowercase().split(',').count();
    let age = patient.age.clone().unwrap_or_else(|| Number::from(0u8));
    let is_male = u8::from(patient.gender.as_deref() == Some("Male"));

    FeatureVector([
        Number::from(symptom_count),
        age,
        Number::from(is_male),
        Number::from(word_count(patient.medical_history.as_deref())),
        Number::from(word_count(patient.current_meds.as_deref())),
        Number::from(word_count(patient.allergies.as_deref())),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patient(value: serde_json::Value) -> PatientData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_input_counts_one_segment() {
        let features = extract_features("", &PatientData::default());
        assert_eq!(features.as_f64(), [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(serde_json::to_value(&features).unwrap(), json!([1, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn full_patient_record() {
        let data = patient(json!({
            "age": 30,
            "gender": "Male",
            "medicalHistory": "asthma since childhood",
            "currentMeds": "",
            "allergies": "pollen"
        }));
        let features = extract_features("fever, cough", &data);
        assert_eq!(serde_json::to_value(&features).unwrap(), json!([2, 30, 1, 3, 0, 1]));
    }

    #[test]
    fn gender_match_is_case_sensitive() {
        for gender in ["male", "MALE", "Female", " Male"] {
            let data = patient(json!({ "gender": gender }));
            assert_eq!(extract_features("x", &data).as_f64()[2], 0.0, "{}", gender);
        }
    }

    #[test]
    fn trailing_comma_adds_a_segment() {
        let features = extract_features("Fever,Cough,", &PatientData::default());
        assert_eq!(features.as_f64()[0], 3.0);
    }

    #[test]
    fn fractional_age_passes_through() {
        let data = patient(json!({ "age": 42.5 }));
        let value = serde_json::to_value(extract_features("a", &data)).unwrap();
        assert_eq!(value[1], json!(42.5));
    }

    #[test]
    fn null_fields_use_defaults() {
        let data = patient(json!({ "age": null, "medicalHistory": null }));
        assert_eq!(
            extract_features("a, b", &data).as_f64(),
            [2.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn word_counts_collapse_runs_of_whitespace() {
        let data = patient(json!({
            "medicalHistory": "  diabetes\ttype  2 \n",
            "currentMeds": "metformin insulin",
            "allergies": "   "
        }));
        let features = extract_features("thirst", &data);
        assert_eq!(features.as_f64()[3..], [3.0, 2.0, 0.0]);
    }

    #[test]
    fn information_separators_split_words() {
        let data = patient(json!({
            "medicalHistory": "asthma\u{1c}eczema\u{1d}flu",
            "allergies": "a\u{1f}b"
        }));
        let features = extract_features("x", &data);
        assert_eq!(features.as_f64()[3], 3.0);
        assert_eq!(features.as_f64()[5], 2.0);
    }
}
