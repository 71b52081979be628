//! Mascot personalities guiding each journey phase.
//!
//! Each [`Mascot`] resolves to a `&'static dyn MascotPersonality` through a
//! fixed lookup table; dialogue is produced by pure template substitution.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::journey::Phase;

/// The four mascots, one per journey phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mascot {
    Aqua,
    Verde,
    Mystic,
    Coral,
}

impl Mascot {
    pub const ALL: [Mascot; 4] = [Mascot::Aqua, Mascot::Verde, Mascot::Mystic, Mascot::Coral];

    /// Mascot that guides the given phase.
    pub fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::One => Mascot::Aqua,
            Phase::Two => Mascot::Verde,
            Phase::Three => Mascot::Mystic,
            Phase::Four => Mascot::Coral,
        }
    }

    /// Stable identifier used in event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mascot::Aqua => "aqua",
            Mascot::Verde => "verde",
            Mascot::Mystic => "mystic",
            Mascot::Coral => "coral",
        }
    }

    pub fn personality(self) -> &'static dyn MascotPersonality {
        PERSONALITIES[self as usize]
    }
}

impl fmt::Display for Mascot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Voice of a mascot.
pub trait MascotPersonality: Send + Sync {
    fn mascot(&self) -> Mascot;

    fn display_name(&self) -> &'static str;

    fn tone(&self) -> &'static str;

    /// Template with `{name}` and `{phase}` placeholders.
    fn phase_template(&self) -> &'static str;

    fn phase_message(&self, phase: Phase) -> String {
        let phase = phase.number().to_string();
        render_template(
            self.phase_template(),
            &[("name", self.display_name()), ("phase", &phase)],
        )
    }
}

struct AquaPersonality;
struct VerdePersonality;
struct MysticPersonality;
struct CoralPersonality;

impl MascotPersonality for AquaPersonality {
    fn mascot(&self) -> Mascot {
        Mascot::Aqua
    }
    fn display_name(&self) -> &'static str {
        "Aqua"
    }
    fn tone(&self) -> &'static str {
        "gentle"
    }
    fn phase_template(&self) -> &'static str {
        "Hi, I'm {name}! Welcome to phase {phase}. Let's take the first steps together."
    }
}

impl MascotPersonality for VerdePersonality {
    fn mascot(&self) -> Mascot {
        Mascot::Verde
    }
    fn display_name(&self) -> &'static str {
        "Verde"
    }
    fn tone(&self) -> &'static str {
        "encouraging"
    }
    fn phase_template(&self) -> &'static str {
        "{name} here. Phase {phase} is where your portfolio starts to grow."
    }
}

impl MascotPersonality for MysticPersonality {
    fn mascot(&self) -> Mascot {
        Mascot::Mystic
    }
    fn display_name(&self) -> &'static str {
        "Mystic"
    }
    fn tone(&self) -> &'static str {
        "thoughtful"
    }
    fn phase_template(&self) -> &'static str {
        "I am {name}. In phase {phase} we look at balance and diversification."
    }
}

impl MascotPersonality for CoralPersonality {
    fn mascot(&self) -> Mascot {
        Mascot::Coral
    }
    fn display_name(&self) -> &'static str {
        "Coral"
    }
    fn tone(&self) -> &'static str {
        "confident"
    }
    fn phase_template(&self) -> &'static str {
        "{name} reporting in. Phase {phase} unlocks the advanced strategies."
    }
}

// Indexed by `Mascot as usize`.
static PERSONALITIES: [&dyn MascotPersonality; 4] = [
    &AquaPersonality,
    &VerdePersonality,
    &MysticPersonality,
    &CoralPersonality,
];

/// Replaces each `{key}` in `template` with its value. Unknown placeholders
/// are left untouched.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{key}}}"), value)
    })
}
