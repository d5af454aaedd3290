//! Per-level clinical teaching context used by the debrief prompt.
//!
//! Source for every level: ADA/EASD 2022 Consensus Report, "Management of
//! Hyperglycemia in Type 2 Diabetes, 2022" (Davies MJ, Aroda VR, Collins BS,
//! et al. Diabetes Care 2022;45:2753-2786, doi:10.2337/dci22-0034).

pub const CITATION: &str = "ADA/EASD 2022 Consensus Report — \"Management of Hyperglycemia \
in Type 2 Diabetes, 2022\" (Davies MJ, Aroda VR, Collins BS, et al. Diabetes Care \
2022;45:2753-2786. DOI: 10.2337/dci22-0034)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelContext {
    pub title: &'static str,
    pub guideline_key: &'static str,
    pub optimal_path: &'static str,
    pub common_errors: &'static [&'static str],
}

const LEVEL_1: LevelContext = LevelContext {
    title: "Glycemic Basics — New-Onset T2DM",
    guideline_key: "Metformin is the preferred first-line agent for most people with T2DM: \
high glucose-lowering efficacy, minimal hypoglycemia as monotherapy, weight neutral, safe and \
inexpensive (section \"Metformin\"). Insulin lowers glucose dose-dependently and can address \
almost any glucose level, but carries significant hypoglycemia risk (section \"Insulin\"). \
Sulfonylureas are highly effective but raise hypoglycemia risk through glucose-independent \
insulin secretion (section \"Sulfonylureas\"). Target HbA1c < 7% for many adults (section \
\"Glycemic Assessment\").",
    optimal_path: "Start Metformin first. Add Insulin only if HbA1c stays uncontrolled. Do not \
leave the patient on Insulin alone when Metformin is safe.",
    common_errors: &[
        "Starting Insulin before Metformin (skipping first-line therapy)",
        "Running Insulin and Metformin together from the start of a new diagnosis",
        "Leaving Insulin on as HbA1c approaches target (failure to de-intensify)",
    ],
};

const LEVEL_2: LevelContext = LevelContext {
    title: "The Kidney Gate — T2DM + CKD",
    guideline_key: "In T2DM with CKD, an SGLT2 inhibitor with proven kidney benefit should be \
started for organ protection regardless of HbA1c (section \"People With Cardiorenal \
Comorbidities\", Figure 3). SGLT2i may be started at eGFR >= 20; glucose lowering falls below \
eGFR 45 but kidney protection continues. The initial hemodynamic eGFR dip is expected and is \
not a reason to stop. Metformin must not be used below eGFR 30 and needs a dose reduction below \
45 (section \"Metformin\").",
    optimal_path: "Start Metformin and an SGLT2i early. Accept the SGLT2i dip. Stop Metformin \
if eGFR falls below 30 and keep the SGLT2i for kidney protection.",
    common_errors: &[
        "Never activating the SGLT2i (missing the central CKD recommendation)",
        "Removing the SGLT2i after its expected eGFR dip",
        "Keeping Metformin active after eGFR drops below 30",
        "Using Insulin as primary therapy when an SGLT2i covers glucose and kidney",
    ],
};

const LEVEL_3: LevelContext = LevelContext {
    title: "Full Pharmacy — Contraindication Traps",
    guideline_key: "Metformin: first line; stop below eGFR 30. SGLT2i: start at eGFR >= 20; \
kidney and CV protection persist below 45. GLP-1 RA: high efficacy, low hypoglycemia risk, GI \
side effects common at initiation. DPP-4i: modest efficacy, well tolerated, but should not be \
combined with a GLP-1 RA since both act on the incretin pathway (Table 1). Sulfonylurea: \
effective and cheap, hypoglycemia risk amplified with Insulin. Insulin: strongest lowering, \
highest hypoglycemia risk, doubled with a sulfonylurea.",
    optimal_path: "Metformin + SGLT2i as the foundation. Add a GLP-1 RA for further lowering. \
Avoid a DPP-4i alongside the GLP-1 RA. Insulin last. Never combine Sulfonylurea and Insulin. \
Watch eGFR.",
    common_errors: &[
        "GLP-1 RA and DPP-4i together (redundant incretin pathway, Table 1)",
        "Sulfonylurea and Insulin together (doubled hypoglycemia risk)",
        "Keeping Metformin after eGFR < 30",
        "Ignoring the SGLT2i for kidney protection in CKD",
        "Activating too many drugs at once (section \"Treatment Behaviors, Persistence, and \
Adherence\")",
    ],
};

const LEVEL_4: LevelContext = LevelContext {
    title: "The Real Patient — Social Determinants of Health",
    guideline_key: "Care should be person-centred and account for social determinants of \
health, including access, cost, and language (Figure 4). Suboptimal medication taking affects \
almost half of people with T2DM; polypharmacy, cost, adverse effects and fear of hypoglycemia \
all contribute. SGLT2i and GLP-1 RA are clinically ideal but expensive, and access may need \
prioritization. Sulfonylureas are cheap but food insecurity amplifies their hypoglycemia risk. \
Patient context: recent immigrant, no drug coverage, food insecurity, limited English. GLP-1 RA \
is denied by insurance. Adherence falls with more than two drugs and efficacy collapses below \
30%.",
    optimal_path: "Metformin + SGLT2i, a two-drug regimen that protects adherence. Avoid the \
sulfonylurea. Accept that the GLP-1 RA is unavailable. Stabilize for 25 seconds.",
    common_errors: &[
        "Attempting the GLP-1 RA despite the insurance denial",
        "Using a Sulfonylurea without considering food insecurity (3x hypoglycemia risk)",
        "Polypharmacy (> 2 drugs) pushing adherence below 30%",
        "Ignoring adherence as a clinical outcome",
        "Treating a systems problem as a pure pharmacology problem (Figure 4)",
    ],
};

/// Teaching context for `level`; unknown levels fall back to level 1.
pub fn level_context(level: u8) -> &'static LevelContext {
    match level {
        2 => &LEVEL_2,
        3 => &LEVEL_3,
        4 => &LEVEL_4,
        _ => &LEVEL_1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_level_has_context() {
        for level in 1..=4 {
            let ctx = level_context(level);
            assert!(!ctx.title.is_empty());
            assert!(!ctx.guideline_key.is_empty());
            assert!(!ctx.optimal_path.is_empty());
            assert!(ctx.common_errors.len() >= 3);
        }
    }

    #[test]
    fn test_unknown_level_falls_back() {
        assert_eq!(level_context(0), level_context(1));
        assert_eq!(level_context(9), level_context(1));
    }

    #[test]
    fn test_level_four_mentions_coverage() {
        assert!(level_context(4).guideline_key.contains("denied by insurance"));
    }
}
