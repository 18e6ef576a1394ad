use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::reward::{PolicyDecision, RewardPolicy};

/// Programs shipped with the binary, used when no override file is configured.
const DEFAULT_REWARD_PROGRAMS: &str = include_str!("../../config/reward_programs.toml");

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Failed to read reward programs from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed reward programs: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("At least one reward program must be configured")]
    NoPrograms,

    #[error("Reward program '{0}' is defined more than once")]
    DuplicateProgram(String),

    #[error("Default reward program '{0}' is not defined")]
    UnknownDefault(String),

    #[error("Reward program '{0}' has no bands")]
    NoBands(String),

    #[error("Reward program '{program}': first band must start at 0 (starts at {min_rate})")]
    FirstBandNotZero { program: String, min_rate: f64 },

    #[error("Reward program '{program}': band '{band}' must start where the previous one ends")]
    NotContiguous { program: String, band: String },

    #[error(
        "Reward program '{program}': only the last band may be open ended ('{band}' is not last)"
    )]
    OpenBandNotLast { program: String, band: String },

    #[error("Reward program '{program}': last band '{band}' must be open ended")]
    LastBandBounded { program: String, band: String },

    #[error("Reward program '{program}': band '{band}' has an empty or invalid rate range")]
    InvalidRange { program: String, band: String },

    #[error("Reward program '{program}': band '{band}' amounts must be finite and non-negative")]
    InvalidAmount { program: String, band: String },

    #[error("Unknown reward program '{0}'")]
    UnknownProgram(String),
}

/// Achievement-rate band: `[min_rate, max_rate)`, `max_rate` absent for the top band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RewardBand {
    #[schema(example = "Đạt 80%")]
    pub name: String,
    #[schema(example = 80.0)]
    pub min_rate: f64,
    #[serde(default)]
    #[schema(example = 100.0)]
    pub max_rate: Option<f64>,
    #[schema(example = 500000.0)]
    pub reward_amount: f64,
    #[schema(example = 0.0)]
    pub penalty_amount: f64,
}

impl RewardBand {
    fn contains(&self, rate: f64) -> bool {
        rate >= self.min_rate && self.max_rate.is_none_or(|max| rate < max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RewardProgram {
    #[schema(example = "standard")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub bands: Vec<RewardBand>,
}

impl RewardProgram {
    fn validate(&self) -> Result<(), PolicyError> {
        let program = || self.id.clone();

        let first = self
            .bands
            .first()
            .ok_or_else(|| PolicyError::NoBands(program()))?;
        if first.min_rate != 0.0 {
            return Err(PolicyError::FirstBandNotZero {
                program: program(),
                min_rate: first.min_rate,
            });
        }

        let last_index = self.bands.len() - 1;
        for (i, band) in self.bands.iter().enumerate() {
            let amounts_ok = [band.reward_amount, band.penalty_amount]
                .iter()
                .all(|a| a.is_finite() && *a >= 0.0);
            if !amounts_ok {
                return Err(PolicyError::InvalidAmount {
                    program: program(),
                    band: band.name.clone(),
                });
            }

            match band.max_rate {
                Some(max) if !(max.is_finite() && max > band.min_rate) => {
                    return Err(PolicyError::InvalidRange {
                        program: program(),
                        band: band.name.clone(),
                    });
                }
                Some(_) if i == last_index => {
                    return Err(PolicyError::LastBandBounded {
                        program: program(),
                        band: band.name.clone(),
                    });
                }
                None if i != last_index => {
                    return Err(PolicyError::OpenBandNotLast {
                        program: program(),
                        band: band.name.clone(),
                    });
                }
                _ => {}
            }

            if i > 0 && self.bands[i - 1].max_rate != Some(band.min_rate) {
                return Err(PolicyError::NotContiguous {
                    program: program(),
                    band: band.name.clone(),
                });
            }
        }

        Ok(())
    }
}

impl RewardPolicy for RewardProgram {
    /// Rates below zero are treated as zero.
    fn lookup(&self, achievement_rate: f64) -> PolicyDecision {
        let rate = achievement_rate.max(0.0);
        match self
            .bands
            .iter()
            .find(|b| b.contains(rate))
            .or_else(|| self.bands.last())
        {
            Some(band) => PolicyDecision {
                band: band.name.clone(),
                reward_amount: band.reward_amount,
                penalty_amount: band.penalty_amount,
            },
            None => PolicyDecision {
                band: "none".to_string(),
                reward_amount: 0.0,
                penalty_amount: 0.0,
            },
        }
    }
}

#[derive(Deserialize)]
struct RewardProgramsFile {
    default_program: String,
    programs: Vec<RewardProgram>,
}

/// Validated set of reward programs, built once at startup.
#[derive(Debug, Clone)]
pub struct RewardPrograms {
    programs: Vec<RewardProgram>,
    default_index: usize,
}

impl RewardPrograms {
    /// Load from `path`, or the embedded defaults when no path is configured.
    pub fn load(path: Option<&Path>) -> Result<Self, PolicyError> {
        match path {
            Some(path) => {
                tracing::info!("Loading reward programs from: {}", path.display());
                let contents = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&contents)
            }
            None => {
                tracing::info!("Using embedded default reward programs");
                Self::from_toml_str(DEFAULT_REWARD_PROGRAMS)
            }
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, PolicyError> {
        let file: RewardProgramsFile = toml::from_str(contents)?;

        if file.programs.is_empty() {
            return Err(PolicyError::NoPrograms);
        }

        let mut seen = HashSet::new();
        for program in &file.programs {
            if !seen.insert(program.id.as_str()) {
                return Err(PolicyError::DuplicateProgram(program.id.clone()));
            }
            program.validate()?;
        }

        let default_index = file
            .programs
            .iter()
            .position(|p| p.id == file.default_program)
            .ok_or_else(|| PolicyError::UnknownDefault(file.default_program.clone()))?;

        Ok(Self {
            programs: file.programs,
            default_index,
        })
    }

    pub fn all(&self) -> &[RewardProgram] {
        &self.programs
    }

    pub fn default_program(&self) -> &RewardProgram {
        &self.programs[self.default_index]
    }

    pub fn get(&self, id: &str) -> Option<&RewardProgram> {
        self.programs.iter().find(|p| p.id == id)
    }

    /// Program named by a KPI definition, or the default one when unset.
    pub fn resolve(&self, id: Option<&str>) -> Result<&RewardProgram, PolicyError> {
        match id {
            Some(id) => self
                .get(id)
                .ok_or_else(|| PolicyError::UnknownProgram(id.to_string())),
            None => Ok(self.default_program()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::reward::calculate_reward_penalty;

    fn defaults() -> RewardPrograms {
        RewardPrograms::from_toml_str(DEFAULT_REWARD_PROGRAMS).unwrap()
    }

    #[test]
    fn embedded_defaults_load() {
        let programs = defaults();
        assert_eq!(programs.all().len(), 2);
        assert_eq!(programs.default_program().id, "standard");
        assert_eq!(programs.default_program().bands.len(), 4);
        assert!(programs.resolve(None).is_ok());
        assert!(matches!(
            programs.resolve(Some("missing")),
            Err(PolicyError::UnknownProgram(_))
        ));
    }

    #[test]
    fn default_bands_map_rates() {
        let programs = defaults();
        let program = programs.default_program();

        let top = calculate_reward_penalty(150.0, 100.0, program).unwrap();
        assert_eq!(top.achievement_rate, 150.0);
        assert_eq!(top.reward_amount, 2_000_000.0);
        assert!(top.notes.contains("Vượt chỉ tiêu"));

        let eighty = calculate_reward_penalty(80.0, 100.0, program).unwrap();
        assert_eq!(eighty.achievement_rate, 80.0);
        assert_eq!(eighty.reward_amount, 500_000.0);
        assert_eq!(eighty.penalty_amount, 0.0);

        let exactly_hundred = program.lookup(100.0);
        assert_eq!(exactly_hundred.band, "Vượt chỉ tiêu");

        let low = program.lookup(-20.0);
        assert_eq!(low.band, "Không đạt");
        assert_eq!(low.penalty_amount, 1_000_000.0);
    }

    #[test]
    fn rejects_gap_between_bands() {
        let toml = r#"
            default_program = "p"
            [[programs]]
            id = "p"
            name = "P"
            [[programs.bands]]
            name = "low"
            min_rate = 0.0
            max_rate = 50.0
            reward_amount = 0.0
            penalty_amount = 0.0
            [[programs.bands]]
            name = "high"
            min_rate = 60.0
            reward_amount = 1.0
            penalty_amount = 0.0
        "#;
        assert!(matches!(
            RewardPrograms::from_toml_str(toml),
            Err(PolicyError::NotContiguous { .. })
        ));
    }

    #[test]
    fn rejects_bounded_last_band_and_bad_default() {
        let bounded = r#"
            default_program = "p"
            [[programs]]
            id = "p"
            name = "P"
            [[programs.bands]]
            name = "only"
            min_rate = 0.0
            max_rate = 100.0
            reward_amount = 0.0
            penalty_amount = 0.0
        "#;
        assert!(matches!(
            RewardPrograms::from_toml_str(bounded),
            Err(PolicyError::LastBandBounded { .. })
        ));

        let unknown_default = r#"
            default_program = "nope"
            [[programs]]
            id = "p"
            name = "P"
            [[programs.bands]]
            name = "all"
            min_rate = 0.0
            reward_amount = 0.0
            penalty_amount = 0.0
        "#;
        assert!(matches!(
            RewardPrograms::from_toml_str(unknown_default),
            Err(PolicyError::UnknownDefault(_))
        ));
    }

    #[test]
    fn rejects_negative_amounts_and_missing_keys() {
        let negative = r#"
            default_program = "p"
            [[programs]]
            id = "p"
            name = "P"
            [[programs.bands]]
            name = "all"
            min_rate = 0.0
            reward_amount = -1.0
            penalty_amount = 0.0
        "#;
        assert!(matches!(
            RewardPrograms::from_toml_str(negative),
            Err(PolicyError::InvalidAmount { .. })
        ));

        let missing = r#"
            default_program = "p"
            [[programs]]
            id = "p"
            name = "P"
            [[programs.bands]]
            name = "all"
            min_rate = 0.0
        "#;
        assert!(matches!(
            RewardPrograms::from_toml_str(missing),
            Err(PolicyError::Parse(_))
        ));
    }

    #[test]
    fn sales_program_never_penalizes() {
        let programs = defaults();
        let sales = programs.resolve(Some("sales")).unwrap();
        assert_eq!(sales.lookup(125.0).reward_amount, 5_000_000.0);
        assert_eq!(sales.lookup(40.0).penalty_amount, 0.0);
        assert!(sales.bands.iter().all(|b| b.penalty_amount == 0.0));
    }
}
