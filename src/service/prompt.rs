use serde::{Deserialize, Serialize};

/// Appended to every edit instruction.
pub(crate) const EDIT_GUIDANCE: &str = "Treat pure black areas as empty background that may be replaced. \
Keep the subjects, their positions and the 16:9 framing unchanged unless the instruction says otherwise.";

/// Appended to every background generation prompt.
pub(crate) const BACKGROUND_GUIDANCE: &str =
    "Render a 16:9 YouTube thumbnail background with no text and no people.";

/// Ready-made restyle instructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StylePreset {
    ReplaceBackground,
    DramaticLighting,
    NeonGlow,
    CinematicGrade,
    ComicStyle,
}

impl StylePreset {
    pub const ALL: [StylePreset; 5] = [
        Self::ReplaceBackground,
        Self::DramaticLighting,
        Self::NeonGlow,
        Self::CinematicGrade,
        Self::ComicStyle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::ReplaceBackground => "Replace background",
            Self::DramaticLighting => "Dramatic lighting",
            Self::NeonGlow => "Neon glow",
            Self::CinematicGrade => "Cinematic grade",
            Self::ComicStyle => "Comic style",
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            Self::ReplaceBackground => {
                "Replace the black background with a vivid, high-contrast scene that suits the subject."
            }
            Self::DramaticLighting => {
                "Add dramatic rim lighting and strong contrast so the subject pops."
            }
            Self::NeonGlow => "Add a saturated neon glow around the subject and cutouts.",
            Self::CinematicGrade => "Apply a teal and orange cinematic color grade.",
            Self::ComicStyle => "Redraw the whole image as a bold comic book illustration.",
        }
    }
}

/// Full edit instruction for a user prompt.
pub(crate) fn edit_instruction(prompt: &str) -> String {
    format!("{}\n\n{EDIT_GUIDANCE}", prompt.trim())
}

/// Full generation prompt for a user description.
pub(crate) fn background_prompt(prompt: &str) -> String {
    format!("{}\n\n{BACKGROUND_GUIDANCE}", prompt.trim())
}
