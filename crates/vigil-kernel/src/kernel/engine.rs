//! Engine - the per-agent aggregate and its life-cycle step.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use vigil_core::{
    ActionCatalog, ActionKind, DayPhase, DeterministicRng, InternalState, SimClock, SplitMix64,
    WallPhase, WorldState,
};
use vigil_utility::UtilityPolicy;

use super::dashboard::DashboardAggregator;
use super::events::{self, RareEventKind};
use super::gating::{self, GateInput};
use super::meta::{self, MetaFactors};
use super::outcome;
use super::scheduler::{ConsolidationReport, ConsolidationScheduler};
use super::scoring::{ScoringContext, SCORE_NOISE};
use super::wall::{SystemWallClock, WallClock};
use crate::adapters::{ContextPacket, InferenceMode, RouterSettings};
use crate::config::EngineConfig;
use crate::error::{EngineError, SnapshotError};
use crate::goals::{active_objectives, IdeaBacklog, Intention, IntentionManager, Objective};
use crate::observability::{
    human_line, DecisionRecord, Journal, JournalEmitter, JournalEvent, StateSnapshot,
};
use crate::policy::{ExecutionPolicy, Permissions};
use crate::state::{
    context_key, CompetenceTracker, MemoryStore, NotableMemory, OutcomeRecord, ShortTermEvent,
    SnapshotDocument, SnapshotStore, SNAPSHOT_VERSION,
};

/// Chosen actions kept for anti-loop and consolidation.
const HISTORY_CAPACITY: usize = 500;

/// Context packets carry at most this many events and ideas.
const CONTEXT_ITEMS: usize = 8;

/// What one life-cycle step did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub sim_minutes: f64,
    pub phase: DayPhase,
    pub action: ActionKind,
    pub success: bool,
    pub reward: f64,
    pub cost: f64,
    pub effective_risk: f64,
    pub rare_event: Option<RareEventKind>,
    pub objectives: Vec<Objective>,
    pub intention: Option<String>,
    pub candidates: Vec<ActionKind>,
    pub scores: Vec<(ActionKind, f64)>,
    pub leveled_up: bool,
    #[serde(skip)]
    pub consolidation: Option<ConsolidationReport>,
    pub day_rollover: bool,
    pub human: String,
}

impl TickReport {
    pub fn rare_event_name(&self) -> &'static str {
        events::event_name(self.rare_event)
    }
}

/// Preview of the next decision. Computing it never mutates the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proposal {
    pub action: ActionKind,
    pub score: f64,
    pub candidates: Vec<ActionKind>,
    pub scores: Vec<(ActionKind, f64)>,
    pub intention: Option<String>,
}

/// One agent's full lifetime. Single-threaded; callers serialize access.
pub struct Engine {
    config: EngineConfig,
    clock: SimClock,
    internal: InternalState,
    world: WorldState,
    catalog: ActionCatalog,
    competence: CompetenceTracker,
    memory: MemoryStore,
    intentions: IntentionManager,
    ideas: IdeaBacklog,
    meta: MetaFactors,
    history: Vec<ActionKind>,
    last_action_tick: BTreeMap<ActionKind, u64>,
    cooldowns: BTreeMap<ActionKind, u64>,
    dashboard: DashboardAggregator,
    router_settings: RouterSettings,
    paused: bool,
    rng: SplitMix64,

    policy: ExecutionPolicy,
    permissions: Permissions,
    utility: UtilityPolicy<ActionKind>,
    consolidation: ConsolidationScheduler,
    journal: Journal,
    emitter: Option<JournalEmitter>,
    wall: Box<dyn WallClock>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let seed = config
            .seed
            .unwrap_or_else(|| chrono::Utc::now().timestamp_micros() as u64);
        tracing::debug!(seed, "engine created");

        Self {
            clock: SimClock::new(),
            internal: InternalState::default(),
            world: WorldState::default(),
            catalog: ActionCatalog::standard(),
            competence: CompetenceTracker::default(),
            memory: MemoryStore::with_capacity(
                config.memory.short_term_capacity,
                config.memory.notable_capacity,
            ),
            intentions: IntentionManager::default(),
            ideas: IdeaBacklog::with_capacity(config.idea_capacity),
            meta: MetaFactors::default(),
            history: Vec::new(),
            last_action_tick: BTreeMap::new(),
            cooldowns: BTreeMap::new(),
            dashboard: DashboardAggregator::default(),
            router_settings: RouterSettings::from_config(&config.backend),
            paused: false,
            rng: SplitMix64::new(seed),
            policy: ExecutionPolicy::new(&config),
            permissions: Permissions::new(&config.permissions),
            utility: UtilityPolicy::new(),
            consolidation: ConsolidationScheduler::new(config.consolidation_every_ticks),
            journal: Journal::new(config.memory.decision_log_capacity),
            emitter: None,
            wall: Box::new(SystemWallClock),
            config,
        }
    }

    /// Engine with a fixed seed and default configuration.
    pub fn seeded(seed: u64) -> Self {
        Self::new(EngineConfig::seeded(seed))
    }

    pub fn with_wall_clock(mut self, wall: impl WallClock + 'static) -> Self {
        self.wall = Box::new(wall);
        self
    }

    /// Mirror every tick into a JSONL journal file.
    pub fn with_journal(mut self, emitter: JournalEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn internal(&self) -> &InternalState {
        &self.internal
    }

    pub fn internal_mut(&mut self) -> &mut InternalState {
        &mut self.internal
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn competence(&self) -> &CompetenceTracker {
        &self.competence
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn intention(&self) -> Option<&Intention> {
        self.intentions.current()
    }

    pub fn ideas(&self) -> &IdeaBacklog {
        &self.ideas
    }

    pub fn meta(&self) -> &MetaFactors {
        &self.meta
    }

    pub fn history(&self) -> &[ActionKind] {
        &self.history
    }

    pub fn action_history_mut(&mut self) -> &mut Vec<ActionKind> {
        &mut self.history
    }

    pub fn cooldowns(&self) -> &BTreeMap<ActionKind, u64> {
        &self.cooldowns
    }

    pub fn set_cooldown(&mut self, action: ActionKind, until: u64) {
        self.cooldowns.insert(action, until);
    }

    pub fn dashboard(&self) -> &DashboardAggregator {
        &self.dashboard
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    pub fn policy_mut(&mut self) -> &mut ExecutionPolicy {
        &mut self.policy
    }

    pub fn router_settings(&self) -> &RouterSettings {
        &self.router_settings
    }

    pub fn set_router_settings(&mut self, settings: RouterSettings) {
        self.router_settings = settings;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Checks a capability against the permission lists; refusals are audited.
    pub fn request(&mut self, capability: &str) -> bool {
        let tick = self.clock.tick();
        self.permissions.authorize(capability, tick)
    }

    /// Install an intention for `objective`, replacing any current one.
    pub fn set_intention(&mut self, objective: Objective) {
        let intention = Intention::for_objective(objective, self.clock.tick(), &mut self.rng);
        self.intentions.install(intention);
    }

    pub fn clear_intention(&mut self) -> Option<Intention> {
        self.intentions.clear()
    }

    /// A suggestion is accepted iff it fits the active intention (or there is none).
    pub fn suggest(&mut self, action: ActionKind) -> bool {
        let accepted = self
            .intentions
            .current()
            .map_or(true, |intention| intention.prefers(action));
        let line = if accepted {
            format!("Suggestion {action} accepted.")
        } else {
            format!("Suggestion {action} declined: it does not serve my current intention.")
        };
        self.journal.push_human(line);
        accepted
    }

    fn state_snapshot(&self, wall_phase: WallPhase) -> StateSnapshot {
        StateSnapshot {
            tick: self.clock.tick(),
            sim_minutes: self.clock.sim_minutes(),
            day_phase: self.clock.phase(),
            wall_phase,
            internal: self.internal,
            world: self.world,
        }
    }

    fn gate_input(&self) -> GateInput<'_> {
        GateInput {
            tick: self.clock.tick(),
            state: &self.internal,
            memory: &self.memory,
            cooldowns: &self.cooldowns,
            intention: self.intentions.current(),
        }
    }

    /// Candidates the gate would allow right now.
    pub fn gated_candidates(&self) -> Vec<ActionKind> {
        gating::gate(&self.gate_input())
    }

    pub fn anti_loop_penalty(&self, action: ActionKind) -> f64 {
        gating::anti_loop_penalty(&self.history, action)
    }

    /// Puts the trailing action on cooldown if it has been repeated too often.
    pub fn enforce_anti_loop(&mut self) -> Option<u64> {
        let (action, until) = gating::loop_cooldown(&self.history, self.clock.tick())?;
        self.cooldowns.insert(action, until);
        Some(until)
    }

    /// Score the current candidates without changing anything.
    pub fn propose(&self) -> Proposal {
        let objectives = active_objectives(&self.internal);
        let candidates = self.gated_candidates();
        let context = context_key(self.world.danger(), self.world.opportunity());
        let ctx = ScoringContext {
            tick: self.clock.tick(),
            phase: self.clock.phase(),
            state: &self.internal,
            world: &self.world,
            catalog: &self.catalog,
            competence: &self.competence,
            memory: &self.memory,
            objectives: &objectives,
            meta: &self.meta,
            history: &self.history,
            last_action_tick: &self.last_action_tick,
            context_key: &context,
        };

        let mut rng = self.rng;
        let mut policy = UtilityPolicy::new();
        let selection = policy.select(&ctx, &candidates, |action, ctx| {
            ctx.score(action) + rng.jitter(SCORE_NOISE)
        });

        let (action, score, scores) = match selection {
            Some(s) => (s.key, s.score, s.scores),
            None => (ActionKind::Rest, 0.0, Vec::new()),
        };
        Proposal {
            action,
            score,
            candidates,
            scores,
            intention: self.intentions.label().map(str::to_string),
        }
    }

    /// Advance the agent by one tick.
    ///
    /// Runs to completion; the only error is a policy violation, checked before anything moves.
    pub fn life_cycle_step(&mut self) -> Result<TickReport, EngineError> {
        self.policy.verify()?;

        self.clock.advance();
        let tick = self.clock.tick();
        let phase = self.clock.phase();
        let wall_phase = self.wall.phase();

        self.world.drift(&mut self.rng);
        outcome::passive_recovery(&mut self.internal, phase, wall_phase);

        let state_before = self.state_snapshot(wall_phase);
        let objectives = active_objectives(&self.internal);

        self.ideas.decay();
        self.intentions.refresh(
            tick,
            &self.internal,
            &self.world,
            &objectives,
            &mut self.ideas,
            &mut self.rng,
        );
        let intention = self.intentions.label().map(str::to_string);

        let candidates = gating::gate(&self.gate_input());
        let context = context_key(self.world.danger(), self.world.opportunity());

        let selection = {
            let ctx = ScoringContext {
                tick,
                phase,
                state: &self.internal,
                world: &self.world,
                catalog: &self.catalog,
                competence: &self.competence,
                memory: &self.memory,
                objectives: &objectives,
                meta: &self.meta,
                history: &self.history,
                last_action_tick: &self.last_action_tick,
                context_key: &context,
            };
            let rng = &mut self.rng;
            self.utility.select(&ctx, &candidates, |action, ctx| {
                ctx.score(action) + rng.jitter(SCORE_NOISE)
            })
        };
        let (action, scores) = match selection {
            Some(s) => (s.key, s.scores),
            None => (ActionKind::Rest, Vec::new()),
        };
        tracing::debug!(tick, action = %action, ?scores, ?candidates, "decision");

        let profile = *self.catalog.profile(action);
        let mods = self.competence.modifiers(action);
        let result = outcome::execute(&profile, &mods, &mut self.internal, &self.world, &mut self.rng);
        outcome::apply_world_effect(action, result.success, &mut self.world);

        let rare = events::roll(&self.world, &mut self.rng);
        if let Some(event) = rare {
            events::apply(event, &mut self.internal, &mut self.world);
            self.memory.push_notable(NotableMemory {
                kind: event.kind,
                severity: event.severity,
                action,
                tick,
                state: self.internal,
            });
            events::aftermath(event, &mut self.internal);
            tracing::info!(tick, event = %event.kind, severity = event.severity, "rare event");
        }
        let rare_event = rare.map(|e| e.kind);

        self.last_action_tick.insert(action, tick);
        self.history.push(action);
        if self.history.len() > HISTORY_CAPACITY {
            let excess = self.history.len() - HISTORY_CAPACITY;
            self.history.drain(..excess);
        }
        self.memory.bump_routine(action, phase);
        let leveled_up = self.competence.record(action, result.success);
        self.memory.action_mut(action).record(OutcomeRecord {
            tick,
            success: result.success,
            reward: result.reward,
            cost: result.cost,
            stress: self.internal.stress(),
            context: &context,
            notable: rare.is_some(),
        });
        self.memory.push_event(ShortTermEvent {
            tick,
            action,
            success: result.success,
            reward: result.reward,
            cost: result.cost,
            stress: self.internal.stress(),
            fatigue: self.internal.fatigue(),
            rare_event,
        });

        self.cooldowns.retain(|_, until| *until > tick);
        if let Some((looped, until)) = gating::loop_cooldown(&self.history, tick) {
            tracing::debug!(tick, action = %looped, until, "anti-loop cooldown");
            self.cooldowns.insert(looped, until);
        }

        if let Some(event) = rare {
            self.ideas
                .seed_from_event(&self.catalog, event.kind, event.severity, action, tick);
        }
        if leveled_up {
            let level = self.competence.level(action);
            tracing::info!(tick, action = %action, level, "skill level up");
            self.ideas
                .seed_from_skill_up(&self.catalog, action, level, tick);
        }
        self.ideas
            .check_stagnation(&self.catalog, self.memory.short_term().iter(), tick);

        meta::meta_learn(
            self.memory.short_term().iter(),
            &mut self.internal,
            &mut self.meta,
        );
        let consolidation =
            self.consolidation
                .run(tick, &self.history, &mut self.internal, &mut self.memory);

        self.dashboard
            .observe(action, result.success, result.reward, rare_event);
        let day_rollover = self
            .dashboard
            .roll_over(
                self.clock.day_index(),
                self.competence.levels(),
                &self.internal,
                self.memory.notable(),
            )
            .is_some();

        if rare_event.is_some_and(RareEventKind::is_severe) {
            if let Some(cleared) = self.intentions.clear() {
                tracing::debug!(tick, label = %cleared.label, "intention cleared by severe event");
            }
        }

        let human = human_line(action, result.success, rare_event);
        self.journal.push_human(human.clone());
        self.journal.push_decision(DecisionRecord {
            tick,
            state_before,
            objectives: objectives.iter().map(|o| o.name().to_string()).collect(),
            intention: intention.clone(),
            candidates: candidates.clone(),
            scores: scores.clone(),
            chosen: action,
            success: result.success,
            effective_risk: result.effective_risk,
            reward: result.reward,
            cost: result.cost,
            rare_event,
            skill_level: self.competence.level(action),
            state_after: self.state_snapshot(wall_phase),
        });

        let report = TickReport {
            tick,
            sim_minutes: self.clock.sim_minutes(),
            phase,
            action,
            success: result.success,
            reward: result.reward,
            cost: result.cost,
            effective_risk: result.effective_risk,
            rare_event,
            objectives,
            intention,
            candidates,
            scores,
            leveled_up,
            consolidation,
            day_rollover,
            human,
        };

        tracing::info!(
            tick,
            action = %action,
            success = result.success,
            event = report.rare_event_name(),
            "tick"
        );
        self.emit(&report);
        Ok(report)
    }

    fn emit(&self, report: &TickReport) {
        let Some(emitter) = &self.emitter else {
            return;
        };
        let event = JournalEvent {
            timestamp: chrono::Utc::now(),
            event_type: "tick".to_string(),
            tick: Some(report.tick),
            message: report.human.clone(),
            metadata: serde_json::to_value(report).unwrap_or(serde_json::Value::Null),
        };
        if let Err(e) = emitter.emit(event) {
            tracing::warn!(error = %e, "failed to write journal event");
        }
    }

    /// Structured context for the text backend.
    pub fn context_packet(&self, mode: InferenceMode, style: &str) -> ContextPacket {
        let skip = self.memory.short_term().len().saturating_sub(CONTEXT_ITEMS);
        ContextPacket {
            tick: self.clock.tick(),
            phase: self.clock.phase(),
            state: self.internal,
            world: self.world,
            intention: self.intentions.current().cloned(),
            objectives: active_objectives(&self.internal)
                .into_iter()
                .map(|o| o.name().to_string())
                .collect(),
            recent_events: self.memory.short_term().iter().skip(skip).cloned().collect(),
            ideas: self.ideas.top_n(CONTEXT_ITEMS).to_vec(),
            style: style.to_string(),
            mode,
        }
    }

    /// Capture the full persisted state.
    pub fn to_document(&self) -> SnapshotDocument {
        SnapshotDocument {
            version: SNAPSHOT_VERSION,
            tick: self.clock.tick(),
            sim_minutes: self.clock.sim_minutes(),
            internal: self.internal,
            world: self.world,
            meta: self.meta,
            competence: self.competence.clone(),
            memory: self.memory.clone(),
            intention: self.intentions.current().cloned(),
            ideas: self.ideas.clone(),
            router: self.router_settings.clone(),
            history: self.history.clone(),
            last_action_tick: self.last_action_tick.clone(),
            cooldowns: self.cooldowns.clone(),
            dashboard: self.dashboard.clone(),
            paused: self.paused,
            rng: self.rng,
        }
    }

    /// Replace the engine's state with a loaded document.
    pub fn restore(&mut self, doc: SnapshotDocument) {
        self.clock = SimClock::restore(doc.tick, doc.sim_minutes);
        self.internal = doc.internal;
        self.world = doc.world;
        self.meta = doc.meta;
        self.competence = doc.competence;
        self.memory = doc.memory;
        self.intentions = IntentionManager::new(doc.intention);
        self.ideas = doc.ideas;
        self.router_settings = doc.router;
        self.history = doc.history;
        self.last_action_tick = doc.last_action_tick;
        self.cooldowns = doc.cooldowns;
        self.dashboard = doc.dashboard;
        self.paused = doc.paused;
        self.rng = doc.rng;
    }

    /// Save to `path` (plus its `.bak`). Requires the `snapshot` capability.
    pub fn save_snapshot(&mut self, path: &Path) -> Result<(), EngineError> {
        if !self.request("snapshot") {
            return Err(SnapshotError::NotPermitted.into());
        }
        SnapshotStore::new(path).save(&self.to_document())?;
        Ok(())
    }

    /// Load from `path`, falling back to its `.bak`. State is untouched on error.
    pub fn try_load_snapshot(&mut self, path: &Path) -> Result<(), EngineError> {
        if !self.request("snapshot") {
            return Err(SnapshotError::NotPermitted.into());
        }
        let doc = SnapshotStore::new(path).load()?;
        self.restore(doc);
        Ok(())
    }

    /// Boolean form of [`Engine::try_load_snapshot`].
    pub fn load_snapshot(&mut self, path: &Path) -> bool {
        match self.try_load_snapshot(path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "snapshot load failed");
                false
            }
        }
    }
}
