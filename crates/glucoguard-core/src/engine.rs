//! Session engine - main entry point for running one level

use hecs::World;
use rand::rngs::StdRng;
use rand::SeedableRng;

use glucoguard_logic::debrief::DebriefRequest;
use glucoguard_logic::decisions::DecisionLog;
use glucoguard_logic::drugs::Drug;
use glucoguard_logic::level::{check_config, ConfigError, LevelConfig};
use glucoguard_logic::outcome::{evaluate, Outcome};
use glucoguard_logic::patient::{Patient, Vitals};
use glucoguard_logic::spawner::{apply_arrival, Spawner, ThreatKind};
use glucoguard_logic::tick::tick_patient;
use glucoguard_logic::toggle::{self, ToggleOutcome};

use crate::notices::Notice;
use crate::systems::*;

/// Longest slice of simulated time a single `update` will apply.
pub const MAX_FRAME_SECONDS: f32 = 0.25;

/// One running session: a patient, the threats heading for them, and the
/// player's decisions so far.
pub struct SimulationEngine {
    /// ECS world holding in-flight threats
    pub world: World,
    patient: Patient,
    config: LevelConfig,
    spawner: Spawner,
    rng: StdRng,
    decision_log: DecisionLog,
    starting: Vitals,
    notices: Vec<Notice>,
    /// Simulated seconds since session start
    elapsed: f64,
    hypo_events: u32,
    outcome: Option<Outcome>,
    paused: bool,
    time_scale: f32,
}

impl SimulationEngine {
    /// Start a session on `config`. Rejects configurations that fail validation.
    pub fn new(config: LevelConfig, seed: u64) -> Result<Self, ConfigError> {
        check_config(&config)?;
        let patient = Patient::new(config.start_hba1c, config.start_egfr);
        log::info!(
            "Session start: level {} ({}), seed {}, HbA1c {:.1}, eGFR {:.1}",
            config.level,
            config.title,
            seed,
            patient.hba1c,
            patient.egfr
        );
        Ok(Self {
            world: World::new(),
            starting: patient.vitals(),
            spawner: Spawner::for_level(&config),
            patient,
            config,
            rng: StdRng::seed_from_u64(seed),
            decision_log: DecisionLog::new(),
            notices: Vec::new(),
            elapsed: 0.0,
            hypo_events: 0,
            outcome: None,
            paused: false,
            time_scale: 1.0,
        })
    }

    /// Start a session on one of the built-in levels.
    pub fn for_level(level: u8, seed: u64) -> Result<Self, ConfigError> {
        let config = LevelConfig::for_level(level).ok_or(ConfigError::InvalidLevel(level))?;
        Self::new(config, seed)
    }

    /// Advance the session by `delta_seconds` of wall time. The scaled slice
    /// is capped at [`MAX_FRAME_SECONDS`]; non-finite slices are dropped.
    pub fn update(&mut self, delta_seconds: f32) {
        if self.paused || self.outcome.is_some() {
            return;
        }
        let dt = delta_seconds * self.time_scale;
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let dt = dt.min(MAX_FRAME_SECONDS);
        self.elapsed += dt as f64;

        // Threats already in the lane move first; new releases start at 0
        let arrivals = threat_movement_system(&mut self.world, dt, self.config.lane_length);
        for kind in arrivals {
            apply_arrival(kind, &mut self.patient);
            log::debug!(
                "{} arrived at t={:.2}: HbA1c {:.2}, eGFR {:.1}, hypo {:.0}",
                kind.label(),
                self.elapsed,
                self.patient.hba1c,
                self.patient.egfr,
                self.patient.hypo_risk
            );
            self.notices.push(Notice::ThreatArrived(kind));
        }

        for kind in self.spawner.advance(dt) {
            spawn_threat(&mut self.world, kind, self.spawner.now(), self.config.threat_speed);
        }

        let report = tick_patient(&mut self.patient, &self.config, dt, &mut self.rng);
        if report.gi_triggered {
            log::info!("GI distress at t={:.1}", self.elapsed);
            self.notices.push(Notice::GiDistress);
        }
        for drug in report.hypo_events {
            log::info!("Hypoglycemia episode from {} at t={:.1}", drug, self.elapsed);
            self.hypo_events += 1;
            self.spawner.schedule_hypo();
            self.notices.push(Notice::HypoScheduled(drug));
        }

        let stopped = toggle::enforce_contraindications(
            &mut self.patient,
            &self.config,
            &mut self.decision_log,
            self.elapsed,
        );
        for drug in stopped {
            log::warn!("Forced stop: {} at eGFR {:.1}", drug, self.patient.egfr);
            self.notices.push(Notice::ForcedStop {
                drug,
                egfr: self.patient.egfr,
            });
        }

        if let Some(outcome) = evaluate(&mut self.patient, &self.config, dt) {
            self.finish(outcome);
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        log::info!(
            "Session over at t={:.1}: {} (HbA1c {:.1}, eGFR {:.1}, hypo {:.0})",
            self.elapsed,
            outcome,
            self.patient.hba1c,
            self.patient.egfr,
            self.patient.hypo_risk
        );
        self.outcome = Some(outcome);
        self.notices.push(Notice::SessionOver(outcome));
    }

    /// Player request to start or stop `drug`.
    pub fn toggle_drug(&mut self, drug: Drug, on: bool) -> ToggleOutcome {
        if self.paused || self.outcome.is_some() {
            return ToggleOutcome::Ignored;
        }
        let result = toggle::toggle_drug(
            &mut self.patient,
            &self.config,
            &mut self.decision_log,
            drug,
            on,
            self.elapsed,
        );
        match &result {
            ToggleOutcome::Activated { advisories } => {
                log::info!("{} started at t={:.1}", drug, self.elapsed);
                for advisory in advisories {
                    log::warn!("{}", advisory);
                    self.notices.push(Notice::Advisory {
                        drug,
                        advisory: *advisory,
                    });
                }
            }
            ToggleOutcome::Deactivated => log::info!("{} stopped at t={:.1}", drug, self.elapsed),
            ToggleOutcome::Blocked(reason) => {
                log::warn!("{} blocked: {}", drug, reason);
                self.notices.push(Notice::Blocked(*reason));
            }
            ToggleOutcome::Unchanged | ToggleOutcome::Ignored => {}
        }
        result
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Throw the session away and start the same level again.
    pub fn restart(&mut self, seed: u64) {
        log::info!("Restarting level {}", self.config.level);
        self.patient = Patient::new(self.config.start_hba1c, self.config.start_egfr);
        self.starting = self.patient.vitals();
        self.spawner = Spawner::for_level(&self.config);
        self.rng = StdRng::seed_from_u64(seed);
        self.world.clear();
        self.decision_log = DecisionLog::new();
        self.notices.clear();
        self.elapsed = 0.0;
        self.hypo_events = 0;
        self.outcome = None;
        self.paused = false;
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f32) {
        if !scale.is_finite() {
            log::warn!("Ignoring time scale {}", scale);
            return;
        }
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn patient(&self) -> &Patient {
        &self.patient
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn decision_log(&self) -> &DecisionLog {
        &self.decision_log
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Vitals at session start.
    pub fn starting_vitals(&self) -> Vitals {
        self.starting
    }

    /// Hypoglycemia episodes rolled so far.
    pub fn hypo_events(&self) -> u32 {
        self.hypo_events
    }

    /// Threats in the lane with their progress toward the patient.
    pub fn threats(&self) -> Vec<(ThreatKind, f32)> {
        threats_in_lane(&self.world, self.config.lane_length)
    }

    /// The threat closest to the patient and the seconds until it lands.
    pub fn next_arrival(&self) -> Option<(ThreatKind, f32)> {
        self.threats()
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(kind, progress)| (kind, (1.0 - progress) * self.config.travel_time()))
    }

    /// Take every notice queued since the last call.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Debrief payload, once the session has ended.
    pub fn debrief_request(&self) -> Option<DebriefRequest> {
        self.outcome.map(|outcome| {
            DebriefRequest::from_session(
                &self.config,
                outcome,
                self.starting,
                &self.patient,
                &self.decision_log,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glucoguard_logic::toggle::BlockReason;

    const DT: f32 = 0.1;

    fn run(engine: &mut SimulationEngine, seconds: f32) {
        let steps = (seconds / DT).round() as usize;
        for _ in 0..steps {
            engine.update(DT);
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = LevelConfig::for_level(1).unwrap();
        config.glucose_period = 0.0;
        assert!(SimulationEngine::new(config, 1).is_err());
        assert!(matches!(
            SimulationEngine::for_level(7, 1),
            Err(ConfigError::InvalidLevel(7))
        ));
    }

    #[test]
    fn test_first_threat_released_at_start() {
        let mut engine = SimulationEngine::for_level(1, 1).unwrap();
        engine.update(DT);
        let threats = engine.threats();
        assert_eq!(threats.len(), 1);
        assert_eq!(threats[0].0, ThreatKind::Glucose);
    }

    #[test]
    fn test_glucose_threat_lands_after_travel() {
        let mut engine = SimulationEngine::for_level(1, 1).unwrap();
        run(&mut engine, 2.0);
        let notices = engine.drain_notices();
        assert!(notices.contains(&Notice::ThreatArrived(ThreatKind::Glucose)));
        // 0.5 from the hit, 0.02 of drift
        assert!((engine.patient().hba1c - 9.02).abs() < 0.01);
        assert!(engine.drain_notices().is_empty());
    }

    #[test]
    fn test_pause_freezes_everything() {
        let mut engine = SimulationEngine::for_level(2, 3).unwrap();
        run(&mut engine, 1.0);
        engine.pause();
        let before = engine.patient().clone();
        let t = engine.elapsed();
        run(&mut engine, 10.0);
        assert_eq!(engine.patient(), &before);
        assert_eq!(engine.elapsed(), t);
        assert_eq!(engine.toggle_drug(Drug::Metformin, true), ToggleOutcome::Ignored);
        assert!(engine.decision_log().is_empty());

        engine.resume();
        engine.update(DT);
        assert!(engine.elapsed() > t);
    }

    #[test]
    fn test_zero_time_scale_stops_time() {
        let mut engine = SimulationEngine::for_level(1, 3).unwrap();
        engine.set_time_scale(-2.0);
        assert_eq!(engine.time_scale(), 0.0);
        run(&mut engine, 1.0);
        assert_eq!(engine.elapsed(), 0.0);
    }

    #[test]
    fn test_non_finite_frames_are_dropped() {
        let mut engine = SimulationEngine::for_level(2, 3).unwrap();
        engine.update(f32::NAN);
        engine.update(f32::INFINITY);
        assert_eq!(engine.elapsed(), 0.0);
        assert!(engine.patient().in_bounds());
        assert!(!engine.patient().hba1c.is_nan());

        engine.set_time_scale(f32::INFINITY);
        engine.set_time_scale(f32::NAN);
        assert_eq!(engine.time_scale(), 1.0);
        engine.update(0.016);
        assert!((engine.elapsed() - 0.016).abs() < 1e-6);
    }

    #[test]
    fn test_long_frame_is_capped() {
        let mut engine = SimulationEngine::for_level(1, 3).unwrap();
        engine.set_time_scale(1.0e6);
        engine.update(1.0);
        assert!((engine.elapsed() - MAX_FRAME_SECONDS as f64).abs() < 1e-6);
        assert!(engine.patient().in_bounds());
        assert_eq!(engine.threats().len(), 1);
    }

    #[test]
    fn test_sglt2_dip_forces_metformin_off_next_tick() {
        let mut engine = SimulationEngine::for_level(2, 9).unwrap();
        engine.patient.egfr = 31.5;
        assert!(engine.toggle_drug(Drug::Metformin, true).changed_state());
        assert!(engine.toggle_drug(Drug::Sglt2Inhibitor, true).changed_state());
        assert!(engine.patient().egfr < 30.0);
        engine.drain_notices();

        engine.update(DT);
        assert!(!engine.patient().is_active(Drug::Metformin));
        assert!(engine.patient().is_active(Drug::Sglt2Inhibitor));
        assert!(engine
            .drain_notices()
            .iter()
            .any(|n| matches!(n, Notice::ForcedStop { drug: Drug::Metformin, .. })));
        let last = engine.decision_log().entries().last().unwrap();
        assert_eq!(last.drug, Drug::Metformin);
        assert!(last.forced);
        assert!(last.vitals.egfr < 30.0);
    }

    #[test]
    fn test_next_arrival_counts_down() {
        let mut engine = SimulationEngine::for_level(1, 1).unwrap();
        assert!(engine.next_arrival().is_none());
        engine.update(DT);
        let (kind, eta) = engine.next_arrival().unwrap();
        assert_eq!(kind, ThreatKind::Glucose);
        // Released this frame, so it has not moved yet
        assert!((eta - engine.config().travel_time()).abs() < 1e-4);
        engine.update(0.5);
        let (_, later) = engine.next_arrival().unwrap();
        assert!((eta - later - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_blocked_toggle_queues_notice() {
        let mut engine = SimulationEngine::for_level(1, 1).unwrap();
        let result = engine.toggle_drug(Drug::Glp1Agonist, true);
        assert_eq!(result, ToggleOutcome::Blocked(BlockReason::NotOnFormulary(Drug::Glp1Agonist)));
        assert_eq!(
            engine.drain_notices(),
            vec![Notice::Blocked(BlockReason::NotOnFormulary(Drug::Glp1Agonist))]
        );
    }

    #[test]
    fn test_toggles_ignored_after_end() {
        let mut engine = SimulationEngine::for_level(1, 1).unwrap();
        // no treatment: crisis once drift and threats reach 10
        run(&mut engine, 60.0);
        assert_eq!(engine.outcome(), Some(Outcome::HyperglycemicCrisis));
        assert_eq!(engine.toggle_drug(Drug::Metformin, true), ToggleOutcome::Ignored);
        let t = engine.elapsed();
        engine.update(DT);
        assert_eq!(engine.elapsed(), t);
    }

    #[test]
    fn test_restart_resets_session() {
        let mut engine = SimulationEngine::for_level(2, 5).unwrap();
        engine.toggle_drug(Drug::Metformin, true);
        run(&mut engine, 5.0);
        engine.pause();
        engine.restart(6);
        assert!(!engine.is_paused());
        assert_eq!(engine.elapsed(), 0.0);
        assert!(engine.decision_log().is_empty());
        assert!(engine.patient().active_drugs.is_empty());
        assert_eq!(engine.patient().hba1c, 8.8);
        assert!(engine.threats().is_empty());
        assert!(engine.outcome().is_none());
    }

    #[test]
    fn test_debrief_request_only_after_end() {
        let mut engine = SimulationEngine::for_level(1, 1).unwrap();
        assert!(engine.debrief_request().is_none());
        run(&mut engine, 60.0);
        let req = engine.debrief_request().unwrap();
        assert!(!req.win);
        assert_eq!(req.starting_stats.hba1c, 8.5);
        assert_eq!(req.outcome, "Hyperglycemic crisis");
    }
}
