//! Prompt shaping for FDM-printable output.

const PRINTABILITY_HINTS: [&str; 4] = [
    "solid base for stability",
    "no thin overhanging parts",
    "minimum wall thickness 2mm",
    "suitable for FDM 3D printing",
];

const POSED_SUBJECTS: [&str; 4] = ["character", "figure", "person", "animal"];

/// Append printability hints to a user prompt.
pub fn enhance_prompt(prompt: &str) -> String {
    format!("{}, {}", prompt.trim(), PRINTABILITY_HINTS.join(", "))
}

/// Figures print better in an A-pose (limbs clear of the torso).
pub fn wants_a_pose(prompt: &str) -> bool {
    let lower = prompt.to_lowercase();
    POSED_SUBJECTS.iter().any(|word| lower.contains(word))
}
