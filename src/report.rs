use crate::models::DetectionResult;

const NOT_AVAILABLE: &str = "N/A";

/// Capitalize the first letter of every word, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Plain-text summary of the subject face.
pub fn summary_text(face: &DetectionResult) -> String {
    let age = face
        .age()
        .map(|a| a.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    format!(
        "Result:\nAge: {}\nGender: {}\nRace: {}\nEmotion: {}",
        age,
        face.dominant_gender().unwrap_or(NOT_AVAILABLE),
        face.dominant_race().unwrap_or(NOT_AVAILABLE),
        face.dominant_emotion().unwrap_or(NOT_AVAILABLE),
    )
}

/// Per-class emotion listing with aligned labels.
pub fn emotion_text(face: &DetectionResult) -> String {
    if face.emotion().is_empty() {
        return format!("Emotion Probabilities:\n{}", NOT_AVAILABLE);
    }
    let lines: Vec<String> = face
        .emotion()
        .iter()
        .map(|(label, p)| format!("{:<10}: {:.2}%", title_case(label), p))
        .collect();
    format!("Emotion Probabilities:\n{}", lines.join("\n"))
}
