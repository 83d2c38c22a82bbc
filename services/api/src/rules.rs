use async_trait::async_trait;
use serde_json::{json, Value};

use loan_orchestrator::workflows::loan::{DecisionEngine, DecisionEngineFailure, DecisionInput};

/// Tier rules: minimum qualifying income, eligibility multiplier, and rate.
const CITY_RULES: &[(&str, f64, f64, &str)] = &[
    ("Tier-1", 30_000.0, 10.0, "10.5%"),
    ("Tier-2", 20_000.0, 8.0, "11.5%"),
    ("Rural", 10_000.0, 5.0, "13.0%"),
];

const HIGH_RISK_STATES: &[&str] = &[
    "Bihar",
    "Chhattisgarh",
    "Jharkhand",
    "Odisha",
    "Uttar Pradesh",
];

const UNSERVICEABLE_PINS: &[&str] = &["744101", "792001", "190001"];

const MIN_BUREAU_SCORE: u16 = 600;
const REVIEW_SCORE_CEILING: u16 = 680;
const MAX_DEBT_RATIO: f64 = 0.5;

/// Declarative stand-in for the external rule evaluation service. The
/// workflow treats it as an opaque function; this table version keeps demos
/// and the local service self-contained.
#[derive(Debug, Default, Clone)]
pub(crate) struct TableDecisionEngine;

impl TableDecisionEngine {
    fn verdict(&self, input: &DecisionInput) -> Value {
        // Unknown tiers qualify under the most conservative bracket.
        let (tier, min_income, multiplier, rate) = CITY_RULES
            .iter()
            .find(|(tier, ..)| *tier == input.city_tier)
            .copied()
            .unwrap_or(CITY_RULES[CITY_RULES.len() - 1]);

        let risk_assessment = risk_level(input);

        if UNSERVICEABLE_PINS.contains(&input.pin_code.as_str()) {
            return rejection("PIN code is outside the serviceable area", &risk_assessment);
        }
        if input.bureau_score < MIN_BUREAU_SCORE {
            return rejection("bureau score below the lending cutoff", &risk_assessment);
        }
        if input.debt_ratio > MAX_DEBT_RATIO {
            return rejection("existing debt obligations too high", &risk_assessment);
        }
        if input.monthly_income < min_income {
            return rejection("income below the tier minimum", &risk_assessment);
        }

        if input.disaster_affected_area || input.bureau_score < REVIEW_SCORE_CEILING {
            let reason = if input.disaster_affected_area {
                "disaster-affected area requires underwriter review"
            } else {
                "bureau score in the manual review band"
            };
            return json!({
                "decision": "REVIEW",
                "manual_review": true,
                "risk_assessment": risk_assessment,
                "reason": reason,
                "tier_applied": tier,
            });
        }

        let max_eligible = input.monthly_income * multiplier;
        let approved_amount = input.loan_requested.min(max_eligible);
        json!({
            "decision": "APPROVED",
            "approved_amount": approved_amount,
            "manual_review": false,
            "risk_assessment": risk_assessment,
            "reason": "meets all published criteria",
            "interest_rate": rate,
            "tier_applied": tier,
            "max_eligible_amount": max_eligible,
        })
    }
}

fn rejection(reason: &str, risk_assessment: &str) -> Value {
    json!({
        "decision": "REJECTED",
        "manual_review": false,
        "risk_assessment": risk_assessment,
        "reason": reason,
    })
}

fn risk_level(input: &DecisionInput) -> String {
    let high_risk_state = HIGH_RISK_STATES.contains(&input.state.as_str());
    if high_risk_state || input.debt_ratio > 0.4 {
        "HIGH".to_string()
    } else if input.bureau_score >= 750 && input.debt_ratio <= 0.25 {
        "LOW".to_string()
    } else {
        "MEDIUM".to_string()
    }
}

#[async_trait]
impl DecisionEngine for TableDecisionEngine {
    async fn evaluate(&self, input: &DecisionInput) -> Result<Value, DecisionEngineFailure> {
        Ok(self.verdict(input))
    }
}
