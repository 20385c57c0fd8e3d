//! Authority planner - the turn pipeline
//!
//! Owns the long-lived planner state and runs one planning cycle per call:
//! gather and score, build pools, select, execute, tick timers. World
//! access goes through the [`Services`] handed in by the caller.

use crate::ai::context::TurnContext;
use crate::ai::decisions::{DecisionCatalog, DecisionMetrics, EffectContext};
use crate::ai::executor::{ActionExecutor, TurnReport};
use crate::ai::personality::AuthorityPersonality;
use crate::ai::pools;
use crate::ai::selector::TurnSelector;
use crate::ai::task::CandidateTask;
use crate::ai::tracker::ActivityRecord;
use crate::core::config::PlannerConfig;
use crate::core::error::Result;
use crate::core::types::{NodeId, Side, Turn};
use crate::persistence::{PlannerSave, SAVE_VERSION};
use crate::security::{DetectionModifiers, GearEffect, HackOutcome, SecurityState, TimerExpiry};
use crate::world::{NoticeKind, Services};

/// AI planner for the Authority faction
pub struct AuthorityPlanner {
    config: PlannerConfig,
    personality: AuthorityPersonality,
    catalog: DecisionCatalog,
    security: SecurityState,
    metrics: DecisionMetrics,
    /// Resistance sightings reported since the last gather
    sightings: Vec<ActivityRecord<NodeId>>,
    potential: Vec<CandidateTask>,
    final_tasks: Vec<CandidateTask>,
}

impl AuthorityPlanner {
    /// Create a planner, rejecting inconsistent config
    pub fn new(config: PlannerConfig, personality: AuthorityPersonality) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            catalog: DecisionCatalog::new(&config.decisions),
            security: SecurityState::new(&config.security),
            metrics: DecisionMetrics::default(),
            sightings: Vec::new(),
            potential: Vec::new(),
            final_tasks: Vec::new(),
            config,
            personality,
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn personality(&self) -> &AuthorityPersonality {
        &self.personality
    }

    pub fn security(&self) -> &SecurityState {
        &self.security
    }

    pub fn metrics(&self) -> &DecisionMetrics {
        &self.metrics
    }

    /// Potential list from the last planning cycle
    pub fn potential(&self) -> &[CandidateTask] {
        &self.potential
    }

    /// Final list from the last planning cycle
    pub fn final_tasks(&self) -> &[CandidateTask] {
        &self.final_tasks
    }

    /// Note a direct sighting of the Resistance for the next gather
    pub fn report_sighting(&mut self, node: NodeId, turn: Turn) {
        self.sightings.push(ActivityRecord { id: node, turn });
    }

    /// The Resistance's gear changed
    pub fn refresh_masking(&mut self, gear: &[GearEffect]) {
        self.security.refresh_masking(gear);
    }

    fn effect_context(&mut self, turn: Turn) -> (&DecisionCatalog, EffectContext<'_>) {
        let Self {
            config,
            personality,
            catalog,
            security,
            metrics,
            ..
        } = self;
        let env = EffectContext {
            turn,
            config,
            personality,
            security,
            metrics,
        };
        (catalog, env)
    }

    /// Stage 1: scan the map and record candidate nodes
    pub fn gather_and_score(&mut self, turn: Turn, services: &mut Services<'_>) -> TurnContext {
        let mut ctx = TurnContext::new(turn, self.personality.preferred_arc);
        ctx.resources_insufficient = std::mem::take(&mut self.metrics.resources_insufficient);
        pools::gather(&mut ctx, &*services.world, &self.config, &self.sightings);
        self.sightings.clear();
        ctx
    }

    /// Stage 2: deployment pools plus gated decisions
    pub fn build_pools(&mut self, ctx: &mut TurnContext, services: &mut Services<'_>) {
        pools::build_pools(ctx, services, &self.config);
        let (catalog, mut env) = self.effect_context(ctx.turn);
        catalog.emit(ctx, &mut env, services);
        self.potential = ctx.potential.clone();
    }

    /// Stage 3: choose the final tasks and their chances
    pub fn select_final_tasks(&mut self, ctx: &mut TurnContext, budget: usize, services: &mut Services<'_>) {
        let selector = TurnSelector::new(budget, self.config.selection.final_task_pool);
        ctx.final_tasks = selector.select(&ctx.potential, services.rng);
        self.final_tasks = ctx.final_tasks.clone();
        tracing::info!(
            "Turn {}: {} potential tasks ({} critical), {} selected",
            ctx.turn,
            ctx.potential.len(),
            ctx.critical_count(),
            ctx.final_tasks.len()
        );
    }

    /// Stage 4: run the final tasks
    pub fn execute(&mut self, ctx: &mut TurnContext, budget: usize, services: &mut Services<'_>) -> TurnReport {
        let mut report = TurnReport::new(ctx.turn);
        let tasks = std::mem::take(&mut ctx.final_tasks);
        let retry_ceiling = self.config.selection.retry_ceiling;
        let (catalog, mut env) = self.effect_context(ctx.turn);
        ActionExecutor::new(catalog, budget, retry_ceiling).execute(tasks, &mut env, services, &mut report);
        report.skipped.append(&mut ctx.skipped);
        report
    }

    /// Stage 5: advance every timer and apply expiry effects
    pub fn tick_timers(&mut self, turn: Turn, services: &mut Services<'_>) -> Vec<TimerExpiry> {
        let expired = self.security.tick(&self.config.security);
        self.metrics.tick();

        for expiry in &expired {
            match expiry {
                TimerExpiry::Countermeasure(kind) => {
                    services.notify(
                        turn,
                        NoticeKind::Countermeasure,
                        format!("{} expired", kind.decision_name()),
                    );
                }
                TimerExpiry::Policy(policy) => {
                    let loyalty = services.world.city_loyalty();
                    services.world.set_city_loyalty(loyalty + policy.loyalty_delta);
                    services.world.set_crisis_modifier(0);
                    services.notify(
                        turn,
                        NoticeKind::Policy,
                        format!("{} lifted", policy.policy.name()),
                    );
                }
                TimerExpiry::RebootComplete => {
                    services.notify(
                        turn,
                        NoticeKind::Security,
                        format!(
                            "Security systems back online, hacking now costs {}",
                            self.security.hacking_cost
                        ),
                    );
                }
            }
        }
        expired
    }

    /// Run the full pipeline for one turn
    pub fn run_turn(&mut self, turn: Turn, services: &mut Services<'_>) -> TurnReport {
        let budget = self.config.selection.action_budget;
        let mut ctx = self.gather_and_score(turn, services);
        self.build_pools(&mut ctx, services);
        self.select_final_tasks(&mut ctx, budget, services);
        let report = self.execute(&mut ctx, budget, services);
        self.tick_timers(turn, services);
        report
    }

    /// Resolve a Resistance hacking attempt
    ///
    /// The attempt is charged to the Resistance ledger. An unmasked trace
    /// turns `hacker_node` into a sighting for the next turn.
    pub fn on_hacking_attempt(
        &mut self,
        turn: Turn,
        hacker_node: Option<NodeId>,
        mut mods: DetectionModifiers,
        services: &mut Services<'_>,
    ) -> Result<HackOutcome> {
        mods.trait_bonus += self.personality.traits.detection_bonus;
        let outcome = self
            .security
            .attempt_hack(&mods, &self.config.security, services.rng)?;

        let funds = services.world.resources(Side::Resistance);
        services
            .world
            .set_resources(Side::Resistance, (funds - outcome.cost).max(0));

        if outcome.detected {
            services.notify(
                turn,
                NoticeKind::Security,
                format!("Hacking attempt detected, alert level {:?}", outcome.alert_level),
            );
        }
        if outcome.reboot_started {
            services.notify(turn, NoticeKind::Security, "Security systems rebooting");
        }
        if outcome.traced {
            if let Some(node) = hacker_node {
                self.report_sighting(node, turn);
                services.notify(turn, NoticeKind::Countermeasure, "Trace Back located the hacker");
            }
        }
        Ok(outcome)
    }

    pub fn save(&self) -> PlannerSave {
        PlannerSave {
            version: SAVE_VERSION,
            security: self.security.clone(),
            metrics: self.metrics.clone(),
            potential: self.potential.clone(),
            final_tasks: self.final_tasks.clone(),
        }
    }

    pub fn restore(&mut self, save: PlannerSave) {
        self.security = save.security;
        self.metrics = save.metrics;
        self.potential = save.potential;
        self.final_tasks = save.final_tasks;
    }
}
