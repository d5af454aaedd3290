//! GlucoGuard Headless Simulation Harness
//!
//! Validates the patient rules and plays scripted sessions on every level.
//! Runs entirely in-process: no rendering, no debrief server.
//!
//! Usage:
//!   cargo run -p glucoguard-simtest
//!   cargo run -p glucoguard-simtest -- --verbose
//!   cargo run -p glucoguard-simtest -- --level 2 --seed 7 --dump-debrief
//!   cargo run -p glucoguard-simtest -- --config my_level.json

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::Parser;

use glucoguard_core::debrief::{
    decode_response, encode_request, request_debrief, DebriefError, DebriefService,
    FALLBACK_EMPTY, FALLBACK_SERVER, FALLBACK_TRANSPORT,
};
use glucoguard_core::prelude::*;
use glucoguard_logic::debrief::{build_debrief_prompt, DebriefRequest, DebriefResponse};
use glucoguard_logic::decisions::DecisionLog;
use glucoguard_logic::drugs::{effective_efficacy, effective_hypo_chance};
use glucoguard_logic::level::{validate_config, MAX_LEVEL, MIN_LEVEL};
use glucoguard_logic::outcome::{evaluate, required_stable_seconds};
use glucoguard_logic::patient::Patient;
use glucoguard_logic::tick::tick_patient;
use glucoguard_logic::toggle::{enforce_contraindications, toggle_drug, BlockReason};
use log::LevelFilter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

#[derive(Parser)]
#[command(
    name = "glucoguard-simtest",
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,
)]
struct Args {
    /// Print every check, session notices and engine info logs
    #[arg(long)]
    verbose: bool,

    /// Print each debrief payload and prompt
    #[arg(long)]
    dump_debrief: bool,

    /// Only run this built-in level
    #[arg(long)]
    level: Option<u8>,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Validate and play a level config loaded from JSON
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            LevelFilter::Info
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    println!("=== GlucoGuard Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Level catalog
    results.extend(validate_levels(&args));

    // 2. Drug catalog & interactions
    results.extend(validate_drug_rules(args.verbose));

    // 3. Tick updater bounds sweep
    results.extend(validate_tick_bounds(args.seed));

    // 4. Toggle guards
    results.extend(validate_toggle_guards());

    // 5. Outcome evaluator
    results.extend(validate_outcomes());

    // 6. Scripted sessions
    results.extend(validate_sessions(&args));

    // 7. Debrief replies
    results.extend(validate_debrief_replies());

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || args.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn selected_levels(args: &Args) -> Vec<u8> {
    match args.level {
        Some(l) => vec![l],
        None => (MIN_LEVEL..=MAX_LEVEL).collect(),
    }
}

// ── 1. Level Catalog ────────────────────────────────────────────────────

fn validate_levels(args: &Args) -> Vec<TestResult> {
    println!("--- Level Catalog ---");
    let mut results = Vec::new();

    for level in selected_levels(args) {
        let Some(config) = LevelConfig::for_level(level) else {
            results.push(TestResult {
                name: format!("level{level}_exists"),
                passed: false,
                detail: format!("no built-in level {level}"),
            });
            continue;
        };
        let errors = validate_config(&config);
        results.push(TestResult {
            name: format!("level{level}_valid"),
            passed: errors.is_empty(),
            detail: if errors.is_empty() {
                format!(
                    "{}: HbA1c {:.1}, eGFR {:.0}, {} drugs",
                    config.title,
                    config.start_hba1c,
                    config.start_egfr,
                    config.formulary.len()
                )
            } else {
                format!("{} problems: {}", errors.len(), join_errors(&errors))
            },
        });

        let round_trip = serde_json::to_string(&config)
            .and_then(|json| serde_json::from_str::<LevelConfig>(&json));
        results.push(TestResult {
            name: format!("level{level}_json_round_trip"),
            passed: matches!(&round_trip, Ok(c) if *c == config),
            detail: "LevelConfig survives JSON".into(),
        });
    }

    if let Some(path) = &args.config {
        results.push(load_config_file(path));
    }

    results
}

fn load_config_file(path: &Path) -> TestResult {
    let name = "config_file_valid".to_string();
    let shown = path.display();
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            return TestResult {
                name,
                passed: false,
                detail: format!("{shown}: {e}"),
            }
        }
    };
    let config: LevelConfig = match serde_json::from_str(&text) {
        Ok(c) => c,
        Err(e) => {
            return TestResult {
                name,
                passed: false,
                detail: format!("{shown}: JSON parse error: {e}"),
            }
        }
    };
    let errors = validate_config(&config);
    if !errors.is_empty() {
        return TestResult {
            name,
            passed: false,
            detail: format!("{shown}: {}", join_errors(&errors)),
        };
    }
    let outcome = SimulationEngine::new(config, 0)
        .map(|mut engine| play(&mut engine, 300.0))
        .ok()
        .flatten();
    TestResult {
        name,
        passed: true,
        detail: format!("{shown}: valid, untreated run → {outcome:?}"),
    }
}

fn join_errors(errors: &[glucoguard_logic::level::ConfigError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// ── 2. Drug Rules ───────────────────────────────────────────────────────

fn validate_drug_rules(verbose: bool) -> Vec<TestResult> {
    println!("--- Drug Catalog & Interactions ---");
    let mut results = Vec::new();

    let set = |drugs: &[Drug]| drugs.iter().copied().collect::<BTreeSet<_>>();

    let incretins = set(&[Drug::Glp1Agonist, Drug::Dpp4Inhibitor]);
    results.push(TestResult {
        name: "drugs_incretin_redundancy".into(),
        passed: effective_efficacy(Drug::Dpp4Inhibitor, &incretins, 90.0) == 0.0,
        detail: "DPP-4i adds nothing on top of GLP-1 RA".into(),
    });

    let renal = [Drug::Sglt2Inhibitor, Drug::Dpp4Inhibitor];
    let halved = renal.iter().all(|&d| {
        effective_efficacy(d, &set(&[d]), 40.0) == d.spec().base_efficacy * 0.5
    });
    results.push(TestResult {
        name: "drugs_renal_reduction".into(),
        passed: halved,
        detail: "SGLT2i and DPP-4i halved below eGFR 45".into(),
    });

    let pair = set(&[Drug::Insulin, Drug::Sulfonylurea]);
    let su = Drug::Sulfonylurea.spec().base_hypo_chance;
    let ins = Drug::Insulin.spec().base_hypo_chance;
    results.push(TestResult {
        name: "drugs_hypo_amplification".into(),
        passed: effective_hypo_chance(Drug::Insulin, &pair, 3) == 2.0 * ins
            && effective_hypo_chance(Drug::Sulfonylurea, &pair, 4) == 6.0 * su,
        detail: format!(
            "SU+Insulin ×2; SU on level 4 ×3 → {:.3}/s",
            effective_hypo_chance(Drug::Sulfonylurea, &pair, 4)
        ),
    });

    if verbose {
        println!("  Catalog:");
        for &drug in Drug::all() {
            let spec = drug.spec();
            println!(
                "    {:16} efficacy {:.2}/s  hypo {:.3}/s  min eGFR {}",
                spec.display_name,
                spec.base_efficacy,
                spec.base_hypo_chance,
                spec.min_egfr.map_or("-".to_string(), |v| format!("{v:.0}"))
            );
        }
    }

    results
}

// ── 3. Tick Bounds Sweep ────────────────────────────────────────────────

fn validate_tick_bounds(seed: u64) -> Vec<TestResult> {
    println!("--- Tick Updater ---");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut violations = 0;
    let mut ticks = 0;

    for level in MIN_LEVEL..=MAX_LEVEL {
        let Some(config) = LevelConfig::for_level(level) else {
            continue;
        };
        for _ in 0..200 {
            let mut p = Patient::new(rng.gen_range(4.0..15.0), rng.gen_range(0.0..120.0));
            p.hypo_risk = rng.gen_range(0.0..100.0);
            p.adherence = rng.gen_range(0.0..100.0);
            for &drug in &config.formulary {
                if rng.gen_bool(0.4) {
                    p.active_drugs.insert(drug);
                }
            }
            let dt = rng.gen_range(0.0..2.0);
            tick_patient(&mut p, &config, dt, &mut rng);
            ticks += 1;
            if !p.in_bounds() {
                violations += 1;
            }
        }
    }

    vec![TestResult {
        name: "tick_clamps_all_fields".into(),
        passed: violations == 0,
        detail: format!("{ticks} random ticks, {violations} out of bounds"),
    }]
}

// ── 4. Toggle Guards ────────────────────────────────────────────────────

fn validate_toggle_guards() -> Vec<TestResult> {
    println!("--- Toggle Guards ---");
    let mut results = Vec::new();

    let (Some(level2), Some(level4)) = (LevelConfig::for_level(2), LevelConfig::for_level(4)) else {
        return vec![TestResult {
            name: "toggle_levels".into(),
            passed: false,
            detail: "built-in levels missing".into(),
        }];
    };

    let mut p = Patient::new(8.0, 29.0);
    let mut log = DecisionLog::new();
    let outcome = toggle_drug(&mut p, &level2, &mut log, Drug::Metformin, true, 0.0);
    results.push(TestResult {
        name: "toggle_metformin_contraindicated".into(),
        passed: matches!(outcome, ToggleOutcome::Blocked(BlockReason::Contraindicated { .. }))
            && !p.is_active(Drug::Metformin),
        detail: format!("eGFR 29 → {outcome:?}"),
    });

    let mut p = Patient::new(9.0, 60.0);
    let outcome = toggle_drug(&mut p, &level4, &mut log, Drug::Glp1Agonist, true, 0.0);
    results.push(TestResult {
        name: "toggle_coverage_denied".into(),
        passed: outcome == ToggleOutcome::Blocked(BlockReason::CoverageDenied(Drug::Glp1Agonist)),
        detail: "GLP-1 RA denied on level 4".into(),
    });

    let mut p = Patient::new(9.0, 52.0);
    toggle_drug(&mut p, &level2, &mut log, Drug::Sglt2Inhibitor, true, 0.0);
    results.push(TestResult {
        name: "toggle_sglt2_dip".into(),
        passed: p.egfr == 49.0,
        detail: format!("eGFR 52 → {:.1} on SGLT2i start", p.egfr),
    });

    let mut p = Patient::new(9.0, 52.0);
    let mut log = DecisionLog::new();
    toggle_drug(&mut p, &level2, &mut log, Drug::Metformin, true, 0.0);
    p.egfr = 28.0;
    let stopped = enforce_contraindications(&mut p, &level2, &mut log, 1.0);
    results.push(TestResult {
        name: "toggle_forced_stop".into(),
        passed: stopped == vec![Drug::Metformin] && log.entries().iter().any(|e| e.forced),
        detail: "Metformin auto-stopped below eGFR 30 and logged".into(),
    });

    results
}

// ── 5. Outcome Evaluator ────────────────────────────────────────────────

fn validate_outcomes() -> Vec<TestResult> {
    println!("--- Outcome Evaluator ---");
    let mut results = Vec::new();
    let dt = 0.1;

    let Some(config) = LevelConfig::for_level(4) else {
        return results;
    };

    let mut p = Patient::new(12.0, 10.0);
    p.hypo_risk = 100.0;
    results.push(TestResult {
        name: "outcome_priority".into(),
        passed: evaluate(&mut p, &config, dt) == Some(Outcome::HypoglycemicComa),
        detail: "coma outranks crisis and kidney failure".into(),
    });

    let mut p = Patient::new(6.5, 60.0);
    p.adherence = 40.0;
    let mut held = true;
    for _ in 0..400 {
        held &= evaluate(&mut p, &config, dt).is_none();
    }
    results.push(TestResult {
        name: "outcome_adherence_gate".into(),
        passed: held && p.stable_seconds == 0.0,
        detail: "no win on level 4 with adherence below 50".into(),
    });

    p.adherence = 100.0;
    let mut ticks = 0;
    while evaluate(&mut p, &config, dt).is_none() && ticks < 1000 {
        ticks += 1;
    }
    let secs = (ticks + 1) as f32 * dt;
    results.push(TestResult {
        name: "outcome_stable_duration".into(),
        passed: (secs - required_stable_seconds(4)).abs() < 0.2,
        detail: format!("won after {secs:.1}s of stability"),
    });

    results
}

// ── 6. Scripted Sessions ────────────────────────────────────────────────

/// Regimen expected to win and one expected to lose, per level.
fn scripts(level: u8) -> [(&'static str, Vec<Drug>, bool); 2] {
    match level {
        1 => [
            ("metformin", vec![Drug::Metformin], true),
            ("untreated", vec![], false),
        ],
        2 => [
            ("metformin_sglt2", vec![Drug::Metformin, Drug::Sglt2Inhibitor], true),
            ("metformin_only", vec![Drug::Metformin], false),
        ],
        3 => [
            ("metformin_sglt2", vec![Drug::Metformin, Drug::Sglt2Inhibitor], true),
            ("untreated", vec![], false),
        ],
        _ => [
            ("metformin_sglt2", vec![Drug::Metformin, Drug::Sglt2Inhibitor], true),
            (
                "polypharmacy",
                vec![Drug::Metformin, Drug::Sglt2Inhibitor, Drug::Dpp4Inhibitor],
                false,
            ),
        ],
    }
}

/// Step at 60 FPS until the session ends or `max_seconds` pass.
fn play(engine: &mut SimulationEngine, max_seconds: f32) -> Option<Outcome> {
    let dt = 1.0 / 60.0;
    let steps = (max_seconds / dt) as usize;
    for _ in 0..steps {
        engine.update(dt);
        if engine.outcome().is_some() {
            break;
        }
    }
    engine.outcome()
}

/// Stands in for the debrief server so the fallback path is exercised.
struct OfflineService;

impl DebriefService for OfflineService {
    fn request(&self, _req: &DebriefRequest) -> Result<DebriefResponse, DebriefError> {
        Err(DebriefError::Transport("no debrief server in the harness".into()))
    }
}

fn validate_sessions(args: &Args) -> Vec<TestResult> {
    println!("--- Scripted Sessions ---");
    let mut results = Vec::new();

    for level in selected_levels(args) {
        for (label, drugs, expect_win) in scripts(level) {
            let name = format!("session_l{level}_{label}");
            let mut engine = match SimulationEngine::for_level(level, args.seed) {
                Ok(e) => e,
                Err(e) => {
                    results.push(TestResult {
                        name,
                        passed: false,
                        detail: e.to_string(),
                    });
                    continue;
                }
            };
            for &drug in &drugs {
                engine.toggle_drug(drug, true);
            }
            let outcome = play(&mut engine, 300.0);
            let start = engine.starting_vitals();
            let p = engine.patient();
            results.push(TestResult {
                name,
                passed: outcome.is_some_and(|o| o.is_win() == expect_win),
                detail: format!(
                    "{:?} at t={:.1}s (HbA1c {:.1} → {:.1}, eGFR {:.1} → {:.1}, adherence {:.0}, {} decisions)",
                    outcome,
                    engine.elapsed(),
                    start.hba1c,
                    p.hba1c,
                    start.egfr,
                    p.egfr,
                    p.adherence,
                    engine.decision_log().len()
                ),
            });

            let notices = engine.drain_notices();
            if args.verbose {
                for notice in &notices {
                    if !matches!(notice, Notice::ThreatArrived(_)) {
                        println!("    [l{level} {label}] {notice}");
                    }
                }
            }
            if level == 2 && label == "metformin_only" {
                let forced = notices
                    .iter()
                    .any(|n| matches!(n, Notice::ForcedStop { drug: Drug::Metformin, .. }));
                results.push(TestResult {
                    name: format!("session_l{level}_{label}_forced_stop"),
                    passed: forced && engine.decision_log().entries().iter().any(|e| e.forced),
                    detail: "Metformin force-stopped once eGFR fell below 30".into(),
                });
            }

            if let Some(req) = engine.debrief_request() {
                if args.dump_debrief {
                    dump_debrief(&req);
                }
                let text = request_debrief(&OfflineService, &req);
                results.push(TestResult {
                    name: format!("debrief_l{level}_{label}_fallback"),
                    passed: !text.is_empty(),
                    detail: text,
                });
            }
        }
    }

    results
}

fn dump_debrief(req: &DebriefRequest) {
    match encode_request(req) {
        Ok(json) => println!("\n{json}"),
        Err(e) => println!("\n(debrief encode failed: {e})"),
    }
    println!("\n{}", build_debrief_prompt(req));
}

// ── 7. Debrief Replies ──────────────────────────────────────────────────

/// Replays a fixed HTTP reply, as the debrief server would send it.
struct ReplayService {
    status: u16,
    body: &'static str,
}

impl DebriefService for ReplayService {
    fn request(&self, req: &DebriefRequest) -> Result<DebriefResponse, DebriefError> {
        encode_request(req)?;
        decode_response(self.status, self.body)
    }
}

fn validate_debrief_replies() -> Vec<TestResult> {
    println!("--- Debrief Replies ---");

    let mut engine = match SimulationEngine::for_level(1, 0) {
        Ok(e) => e,
        Err(e) => {
            return vec![TestResult {
                name: "debrief_replies".into(),
                passed: false,
                detail: e.to_string(),
            }]
        }
    };
    play(&mut engine, 300.0);
    let Some(req) = engine.debrief_request() else {
        return vec![TestResult {
            name: "debrief_replies".into(),
            passed: false,
            detail: "untreated level 1 session never ended".into(),
        }];
    };

    let cases: [(&str, u16, &'static str, &str); 5] = [
        ("ok", 200, r#"{"text":"Review your Metformin timing."}"#, "Review your Metformin timing."),
        ("ok_without_text", 200, "{}", FALLBACK_EMPTY),
        ("server_error_with_text", 500, r#"{"text":"Model overloaded"}"#, "Model overloaded"),
        ("server_error_html", 502, "<html>Bad Gateway</html>", FALLBACK_SERVER),
        ("garbled_body", 200, "not json", FALLBACK_TRANSPORT),
    ];

    cases
        .into_iter()
        .map(|(label, status, body, expected)| {
            let text = request_debrief(&ReplayService { status, body }, &req);
            TestResult {
                name: format!("debrief_reply_{label}"),
                passed: text == expected,
                detail: format!("HTTP {status} → {text:?}"),
            }
        })
        .collect()
}
