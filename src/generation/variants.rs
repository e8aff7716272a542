//! Named prompt styles and the selector that rotates through them

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prompt style applied on top of an artifact prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Professional,
    Enthusiastic,
    Concise,
    Storyteller,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Self::Professional,
        Self::Enthusiastic,
        Self::Concise,
        Self::Storyteller,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Professional => "Professional",
            Self::Enthusiastic => "Enthusiastic",
            Self::Concise => "Concise",
            Self::Storyteller => "Storyteller",
        }
    }

    /// Style instructions appended to the generation prompt
    pub fn instructions(&self) -> &'static str {
        match self {
            Self::Professional => {
                "Use a polished, formal tone. Lead with qualifications and measurable outcomes. \
                 Avoid slang and exclamation marks."
            }
            Self::Enthusiastic => {
                "Use a warm, energetic tone that shows genuine excitement about the company's mission. \
                 Stay specific; enthusiasm must be backed by concrete experience."
            }
            Self::Concise => {
                "Be brief and direct. Short paragraphs, no filler, every sentence must carry a fact. \
                 Aim for roughly half the usual length."
            }
            Self::Storyteller => {
                "Open with a short, relevant anecdote from the candidate's experience and build the \
                 narrative around it. Keep the story tied to the role's requirements."
            }
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Uniformly random variant from `all` that is not in `used`.
///
/// Falls back to any variant once `used` covers them all. `None` only when
/// `all` is empty.
pub fn select_variant<R: Rng + ?Sized>(
    all: &[Variant],
    used: &[Variant],
    rng: &mut R,
) -> Option<Variant> {
    let unused: Vec<Variant> = all.iter().copied().filter(|v| !used.contains(v)).collect();
    if unused.is_empty() {
        all.choose(rng).copied()
    } else {
        unused.choose(rng).copied()
    }
}

/// [`select_variant`] with the thread-local RNG
pub fn pick_variant(all: &[Variant], used: &[Variant]) -> Option<Variant> {
    select_variant(all, used, &mut rand::rng())
}
