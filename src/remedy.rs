pub const DEFAULT_REMEDY: &str = "Follow best agronomic practices and consult local guidance.";

/// Advice for a predicted label, falling back to general guidance.
pub fn remedy_for(label: &str) -> &'static str {
    match label {
        "Powdery Mildew" => "Use fungicide sprays, ensure proper air circulation.",
        "Leaf Spot" => "Avoid overhead watering, remove infected leaves.",
        "Blight" => "Apply copper-based sprays, crop rotation helps.",
        "Healthy" => "No disease detected. Maintain regular care!",
        _ => DEFAULT_REMEDY,
    }
}
