// src/mode.rs
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Inference mode; selects the endpoint and whether a question is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// ATM interaction guidance (image only)
    Atm,
    /// Walking / obstacle assistance (image + optional question)
    #[value(alias = "obstacle")]
    Walking,
    /// Visual question answering (image + required question)
    #[value(alias = "vlm")]
    Vqa,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Atm, Mode::Walking, Mode::Vqa];

    pub fn accepts_question(self) -> bool {
        !matches!(self, Mode::Atm)
    }

    pub fn requires_question(self) -> bool {
        matches!(self, Mode::Vqa)
    }

    /// Whether the server's `result` field is free text worth showing as-is.
    pub fn answers_in_text(self) -> bool {
        self.accepts_question()
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Atm => "ATM Assistance",
            Mode::Walking => "Walking Assistance",
            Mode::Vqa => "Vision AI",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Atm => "atm",
            Mode::Walking => "walking",
            Mode::Vqa => "vqa",
        };
        f.pad(name)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atm" => Ok(Mode::Atm),
            "walking" | "obstacle" => Ok(Mode::Walking),
            "vqa" | "vlm" => Ok(Mode::Vqa),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("atm".parse::<Mode>(), Ok(Mode::Atm));
        assert_eq!("Obstacle".parse::<Mode>(), Ok(Mode::Walking));
        assert_eq!(" vlm ".parse::<Mode>(), Ok(Mode::Vqa));
        assert!("drive".parse::<Mode>().is_err());
    }

    #[test]
    fn question_rules_follow_mode() {
        assert!(!Mode::Atm.accepts_question());
        assert!(Mode::Walking.accepts_question());
        assert!(!Mode::Walking.requires_question());
        assert!(Mode::Vqa.requires_question());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for mode in Mode::ALL {
            assert_eq!(mode.to_string().parse::<Mode>(), Ok(mode));
        }
    }
}
