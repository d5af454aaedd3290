//! Debrief payload and preceptor prompt.
//!
//! At session end the engine packages a [`DebriefRequest`]: level, result,
//! starting and final vitals, the regimen at the end, and the chronological
//! decision log. Field names on the wire match what the debrief server
//! expects (`startingStats`, `HbA1c_at_time`, ...). [`build_debrief_prompt`]
//! renders the text-generation prompt from a request.

use serde::{Deserialize, Serialize};

use crate::decisions::{DecisionLog, DecisionLogEntry, ToggleAction};
use crate::drugs::Drug;
use crate::guidelines::{level_context, CITATION};
use crate::level::{LevelConfig, PatientProfile};
use crate::outcome::Outcome;
use crate::patient::{Patient, Vitals};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartingStats {
    #[serde(rename = "HbA1c")]
    pub hba1c: f32,
    #[serde(rename = "eGFR")]
    pub egfr: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalStats {
    #[serde(rename = "HbA1c")]
    pub hba1c: f32,
    #[serde(rename = "eGFR")]
    pub egfr: f32,
    #[serde(rename = "hypoRisk")]
    pub hypo_risk: f32,
}

/// One decision-log entry as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub time: f64,
    /// Display name.
    pub drug: String,
    #[serde(rename = "drugId")]
    pub drug_id: Drug,
    pub action: ToggleAction,
    #[serde(default)]
    pub forced: bool,
    #[serde(rename = "HbA1c_at_time")]
    pub hba1c_at_time: f32,
    #[serde(rename = "eGFR_at_time")]
    pub egfr_at_time: f32,
    #[serde(rename = "hypoRisk_at_time")]
    pub hypo_risk_at_time: f32,
    #[serde(
        rename = "adherence_at_time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub adherence_at_time: Option<f32>,
}

impl From<&DecisionLogEntry> for DecisionRecord {
    fn from(entry: &DecisionLogEntry) -> Self {
        Self {
            time: (entry.time_seconds * 10.0).round() / 10.0,
            drug: entry.drug.name().to_string(),
            drug_id: entry.drug,
            action: entry.action,
            forced: entry.forced,
            hba1c_at_time: round1(entry.vitals.hba1c),
            egfr_at_time: round1(entry.vitals.egfr),
            hypo_risk_at_time: round1(entry.vitals.hypo_risk),
            adherence_at_time: entry.adherence.map(round1),
        }
    }
}

/// Terminal session snapshot handed to the debrief service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebriefRequest {
    pub level: u8,
    pub win: bool,
    pub outcome: String,
    pub patient_profile: PatientProfile,
    pub starting_stats: StartingStats,
    pub final_stats: FinalStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adherence: Option<f32>,
    pub active_drugs_at_end: Vec<String>,
    pub decision_history: Vec<DecisionRecord>,
}

impl DebriefRequest {
    pub fn from_session(
        config: &LevelConfig,
        outcome: Outcome,
        starting: Vitals,
        patient: &Patient,
        log: &DecisionLog,
    ) -> Self {
        Self {
            level: config.level,
            win: outcome.is_win(),
            outcome: outcome.description().to_string(),
            patient_profile: config.profile.clone(),
            starting_stats: StartingStats {
                hba1c: round1(starting.hba1c),
                egfr: round1(starting.egfr),
            },
            final_stats: FinalStats {
                hba1c: round1(patient.hba1c),
                egfr: round1(patient.egfr),
                hypo_risk: round1(patient.hypo_risk),
            },
            adherence: config
                .has_adherence_model()
                .then_some(round1(patient.adherence)),
            active_drugs_at_end: patient
                .active_drugs
                .iter()
                .map(|d| d.name().to_string())
                .collect(),
            decision_history: log.entries().iter().map(DecisionRecord::from).collect(),
        }
    }
}

/// Debrief service reply. Error replies carry the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebriefResponse {
    #[serde(default)]
    pub text: Option<String>,
}

fn round1(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}

fn action_label(record: &DecisionRecord) -> &'static str {
    match (record.action, record.forced) {
        (ToggleAction::On, _) => "ON",
        (ToggleAction::Off, false) => "OFF",
        (ToggleAction::Off, true) => "OFF (forced stop)",
    }
}

/// Append `text` and a newline.
fn line(out: &mut String, text: impl AsRef<str>) {
    out.push_str(text.as_ref());
    out.push('\n');
}

/// Render the preceptor prompt for a finished session.
pub fn build_debrief_prompt(req: &DebriefRequest) -> String {
    let ctx = level_context(req.level);
    let mut out = String::new();

    line(
        &mut out,
        "You are a clinical preceptor debriefing a medical student after a Type 2 Diabetes \
management simulation. Act as a Socratic coach, not a quiz grader: help the learner reflect on \
their decisions and build clinical reasoning.",
    );

    line(&mut out, format!("\n=== LEVEL: {} — {} ===", req.level, ctx.title));

    line(&mut out, "\n=== PATIENT PROFILE ===");
    line(&mut out, format!("Name: {}", req.patient_profile.name));
    line(&mut out, format!("History: {}", req.patient_profile.history));
    line(&mut out, format!("Starting HbA1c: {:.1}%", req.starting_stats.hba1c));
    line(&mut out, format!("Starting eGFR: {:.1}", req.starting_stats.egfr));
    if req.level == 4 {
        line(
            &mut out,
            "Special Context: Recent immigrant. No drug coverage. Food insecurity. Limited English.",
        );
    }

    line(&mut out, "\n=== OUTCOME ===");
    if req.win {
        line(&mut out, "Result: PATIENT STABILIZED (Win)");
    } else {
        line(&mut out, format!("Result: PATIENT LOST — {}", req.outcome));
    }
    line(&mut out, format!("Final HbA1c: {:.1}%", req.final_stats.hba1c));
    line(&mut out, format!("Final eGFR: {:.1}", req.final_stats.egfr));
    line(&mut out, format!("Final Hypo Risk: {:.1}%", req.final_stats.hypo_risk));
    if let Some(adherence) = req.adherence {
        line(&mut out, format!("Final Adherence: {adherence:.1}%"));
    }
    line(
        &mut out,
        format!("Active drugs at end: [{}]", req.active_drugs_at_end.join(", ")),
    );

    line(&mut out, "\n=== PLAYER DECISION LOG (chronological) ===");
    if req.decision_history.is_empty() {
        line(&mut out, "  (No drugs were activated)");
    }
    for (i, d) in req.decision_history.iter().enumerate() {
        let mut entry = format!(
            "  {}. t={:.1}s Drug: {} {} | HbA1c: {:.1}% | eGFR: {:.1} | HypoRisk: {:.1}",
            i + 1,
            d.time,
            d.drug,
            action_label(d),
            d.hba1c_at_time,
            d.egfr_at_time,
            d.hypo_risk_at_time
        );
        if let Some(a) = d.adherence_at_time {
            entry.push_str(&format!(" | Adherence: {a:.1}%"));
        }
        line(&mut out, entry);
    }

    line(&mut out, "\n=== GUIDELINE REFERENCE ===");
    line(&mut out, format!("Source: {CITATION}"));
    line(&mut out, format!("\n{}", ctx.guideline_key));

    line(
        &mut out,
        format!("\n=== OPTIMAL PATH FOR THIS LEVEL ===\n{}", ctx.optimal_path),
    );

    line(&mut out, "\n=== COMMON ERRORS TO CHECK FOR ===");
    for (i, e) in ctx.common_errors.iter().enumerate() {
        line(&mut out, format!("{}. {}", i + 1, e));
    }

    line(&mut out, "\n=== YOUR TASK ===");
    line(&mut out, "Write a clinical debrief that does ALL of the following:\n");
    out.push_str(if req.win { WIN_TASK } else { LOSS_TASK });

    line(&mut out, "\n=== FORMAT RULES ===");
    line(&mut out, "- Plain text only. No markdown, no **, no ##, no bullet symbols.");
    line(&mut out, "- Use line breaks between sections.");
    line(&mut out, "- Keep the whole response under 200 words.");
    line(
        &mut out,
        if req.win {
            "- Tone: warm, encouraging, collegial; proud but still teaching."
        } else {
            "- Tone: supportive but direct; wants the student to succeed next time."
        },
    );
    line(&mut out, "- NEVER say \"fatal flaw\" on a win.");
    line(&mut out, "- ALWAYS reference specific drug names and stat values from the session.");
    line(
        &mut out,
        "- When citing guidelines, always reference \"ADA/EASD 2022 Consensus Report\".",
    );
    line(
        &mut out,
        "- End with the 2 Socratic questions, labeled \"REFLECTION QUESTIONS:\"",
    );

    out
}

const WIN_TASK: &str = "\
1. ACKNOWLEDGE THE WIN. Start with what the student did right, naming the drugs and timing that worked.
2. GUIDELINE ALIGNMENT: Note how the approach aligns or partially misaligns with the ADA/EASD 2022 Consensus Report, citing the relevant section or figure.
3. OPTIMIZATION OPPORTUNITY: Name ONE thing to improve next time, constructively.
4. SOCRATIC REFLECTION: Ask 2 targeted \"why\" questions that test whether the learner understood why their choices worked.
";

const LOSS_TASK: &str = "\
1. CLINICAL SUMMARY: State what happened to the patient in 1 sentence. Call it a \"critical decision point\", not a \"fatal flaw\".
2. THE KEY DECISION: Identify the specific drug-stat interaction that caused the loss, citing the exact eGFR or HbA1c values from the decision log.
3. GUIDELINE CORRECTION: Explain what the ADA/EASD 2022 Consensus Report recommends instead, citing the section, figure or table.
4. THE BETTER PATH: In 1-2 sentences, describe what to try differently.
5. SOCRATIC REFLECTION: Ask 2 targeted \"why\" questions about mechanism rather than rules.
";

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals(hba1c: f32, egfr: f32) -> Vitals {
        Vitals {
            hba1c,
            egfr,
            hypo_risk: 5.0,
            adherence: 100.0,
        }
    }

    fn sample(level: u8, outcome: Outcome) -> DebriefRequest {
        let config = LevelConfig::for_level(level).unwrap();
        let mut patient = Patient::new(6.84, 41.27);
        patient.active_drugs.insert(Drug::Metformin);
        patient.active_drugs.insert(Drug::Sglt2Inhibitor);
        let mut log = DecisionLog::new();
        log.record(DecisionLogEntry {
            time_seconds: 1.26,
            drug: Drug::Metformin,
            action: ToggleAction::On,
            forced: false,
            vitals: vitals(8.53, 52.0),
            adherence: config.has_adherence_model().then_some(100.0),
        });
        DebriefRequest::from_session(&config, outcome, vitals(8.8, 52.0), &patient, &log)
    }

    #[test]
    fn test_request_fields() {
        let req = sample(2, Outcome::Stabilized);
        assert!(req.win);
        assert_eq!(req.outcome, "Patient stabilized");
        assert_eq!(req.final_stats.hba1c, 6.8);
        assert_eq!(req.final_stats.egfr, 41.3);
        assert_eq!(req.active_drugs_at_end, vec!["Metformin", "SGLT2 inhibitor"]);
        assert_eq!(req.decision_history.len(), 1);
        assert_eq!(req.decision_history[0].hba1c_at_time, 8.5);
        assert!(req.adherence.is_none());
    }

    #[test]
    fn test_wire_names() {
        let req = sample(4, Outcome::KidneyFailure);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["win"], false);
        assert!(json["startingStats"]["HbA1c"].is_number());
        assert!(json["finalStats"]["hypoRisk"].is_number());
        assert!(json["patientProfile"]["name"].is_string());
        assert!(json["activeDrugsAtEnd"].is_array());
        let first = &json["decisionHistory"][0];
        assert_eq!(first["drug"], "Metformin");
        assert_eq!(first["drugId"], "metformin");
        assert_eq!(first["action"], "on");
        assert!(first["HbA1c_at_time"].is_number());
        assert!(first["eGFR_at_time"].is_number());
        assert!(first["adherence_at_time"].is_number());
        assert!(json["adherence"].is_number());
    }

    #[test]
    fn test_adherence_omitted_below_level_four() {
        let json = serde_json::to_value(sample(3, Outcome::Stabilized)).unwrap();
        assert!(json.get("adherence").is_none());
        assert!(json["decisionHistory"][0].get("adherence_at_time").is_none());
    }

    #[test]
    fn test_response_without_text() {
        let resp: DebriefResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.text, None);
        let resp: DebriefResponse = serde_json::from_str(r#"{"text":"Well done"}"#).unwrap();
        assert_eq!(resp.text.as_deref(), Some("Well done"));
    }

    #[test]
    fn test_prompt_win() {
        let prompt = build_debrief_prompt(&sample(2, Outcome::Stabilized));
        assert!(prompt.contains("The Kidney Gate"));
        assert!(prompt.contains("PATIENT STABILIZED (Win)"));
        assert!(prompt.contains("ACKNOWLEDGE THE WIN"));
        assert!(prompt.contains("Drug: Metformin ON"));
        assert!(prompt.contains("REFLECTION QUESTIONS:"));
        assert!(!prompt.contains("Special Context"));
    }

    #[test]
    fn test_prompt_loss_level_four() {
        let prompt = build_debrief_prompt(&sample(4, Outcome::KidneyFailure));
        assert!(prompt.contains("PATIENT LOST — Kidney failure"));
        assert!(prompt.contains("CLINICAL SUMMARY"));
        assert!(prompt.contains("Special Context"));
        assert!(prompt.contains("Final Adherence"));
        assert!(prompt.contains("Adherence: 100.0%"));
    }

    #[test]
    fn test_prompt_empty_log() {
        let config = LevelConfig::for_level(1).unwrap();
        let patient = Patient::new(10.2, 90.0);
        let req = DebriefRequest::from_session(
            &config,
            Outcome::HyperglycemicCrisis,
            vitals(8.5, 90.0),
            &patient,
            &DecisionLog::new(),
        );
        let prompt = build_debrief_prompt(&req);
        assert!(prompt.contains("(No drugs were activated)"));
        assert!(prompt.contains("Active drugs at end: []"));
    }

    #[test]
    fn test_forced_stop_label() {
        let record = DecisionRecord {
            time: 3.0,
            drug: "Metformin".into(),
            drug_id: Drug::Metformin,
            action: ToggleAction::Off,
            forced: true,
            hba1c_at_time: 8.0,
            egfr_at_time: 29.0,
            hypo_risk_at_time: 5.0,
            adherence_at_time: None,
        };
        assert_eq!(action_label(&record), "OFF (forced stop)");
    }
}
