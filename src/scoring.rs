// src/scoring.rs

use crate::heuristics::ParsedValues;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Regulatory/advisory threshold per canonical analyte name.
pub type LimitsTable = BTreeMap<String, f64>;

pub const BASELINE_SCORE: f64 = 5.0;
pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 5.0;

/// Deducted once for every reading above its limit.
pub const PENALTY_PER_EXCEEDANCE: f64 = 0.5;

/// The reference limits the dashboard scores against.
pub fn reference_limits() -> LimitsTable {
    [
        ("Lead (ppm)", 0.015),
        ("Copper (ppm)", 1.3),
        ("Nitrate (ppm)", 10.0),
        ("Arsenic (ppb)", 10.0),
        ("PFOA (ppt)", 4.0),
        ("PFOS (ppt)", 4.0),
        ("pH", 8.5),
    ]
    .into_iter()
    .map(|(name, limit)| (name.to_string(), limit))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub score: f64,
    pub penalties: Vec<String>,
}

/// Round to one decimal place from the exact binary value of `value`,
/// ties away from zero. `2.6000000000000001` gives 2.6 and the double
/// nearest 3.05 (just below it) gives 3.0. NaN and infinities pass
/// through.
pub fn round_to_tenth(value: f64) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Clamp into the [1.0, 5.0] score band. NaN passes through.
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(MIN_SCORE, MAX_SCORE)
}

/// Overall CLEAR score for one report.
pub fn compute_clear_score(parsed: &ParsedValues, limits: &LimitsTable) -> ScoreResult {
    let mut score = BASELINE_SCORE;
    let mut penalties = Vec::new();

    for (analyte, reading) in parsed.iter() {
        let Some(&limit) = limits.get(analyte) else {
            continue;
        };
        if reading > limit {
            score -= PENALTY_PER_EXCEEDANCE;
            penalties.push(format!("{analyte} > limit ({reading} > {limit})"));
        }
    }

    ScoreResult {
        score: round_to_tenth(score).max(MIN_SCORE),
        penalties,
    }
}

/// Primary pipe material of the water main.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Lead,
    Galvanized,
    CastIron,
    DuctileIron,
    Copper,
    Pvc,
    Hdpe,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Material {
    /// Parse a form value by exact key, the same way deserialisation
    /// does; anything unrecognised is `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value {
            "lead" => Material::Lead,
            "galvanized" => Material::Galvanized,
            "cast_iron" => Material::CastIron,
            "ductile_iron" => Material::DuctileIron,
            "copper" => Material::Copper,
            "pvc" => Material::Pvc,
            "hdpe" => Material::Hdpe,
            _ => Material::Unknown,
        }
    }

    pub fn adjustment(self) -> f64 {
        match self {
            Material::Lead => -2.0,
            Material::Galvanized => -1.0,
            Material::CastIron => -0.5,
            Material::DuctileIron => 0.2,
            Material::Copper => 0.6,
            Material::Pvc => 0.8,
            Material::Hdpe => 1.0,
            Material::Unknown => 0.0,
        }
    }
}

/// Infrastructure facts collected alongside a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterMainInput {
    pub age_years: f64,
    pub material: Material,
    pub upgraded_pct: f64,
}

impl Default for WaterMainInput {
    fn default() -> Self {
        Self {
            age_years: 40.0,
            material: Material::CastIron,
            upgraded_pct: 10.0,
        }
    }
}

/// Water main infrastructure score in [1.0, 5.0].
pub fn compute_water_main_score(input: &WaterMainInput) -> f64 {
    // one point per 20 years, at most four
    let age_score = 5.0 - (input.age_years / 20.0).clamp(0.0, 4.0);
    let upgrade_adj = input.upgraded_pct / 100.0;
    let raw = age_score + input.material.adjustment() + upgrade_adj;
    clamp_score(round_to_tenth(raw))
}
