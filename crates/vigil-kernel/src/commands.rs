//! Line command surface shared by the REPL and chat slash commands.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;

use vigil_core::ActionKind;

use crate::adapters::{BackendRouter, InferenceMode};
use crate::error::{CommandError, EngineError, SnapshotError};
use crate::kernel::Engine;

/// Upper bound for `tick <n>` so one line cannot stall the host.
const MAX_TICKS_PER_COMMAND: u32 = 10_000;

/// Lines of tick narration echoed back by `tick <n>`.
const TICK_ECHO: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendVerb {
    Status,
    Auto,
    Force(String),
    Mode(InferenceMode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    State,
    Propose,
    Ideas,
    Summary,
    Suggest(ActionKind),
    Pause,
    Resume,
    Tick(u32),
    Request(String),
    Save(Option<PathBuf>),
    Load(Option<PathBuf>),
    Backend(BackendVerb),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim().trim_start_matches('/');
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or(CommandError::NotRecognized)?.to_lowercase();
        let arg = parts.next();

        let command = match verb.as_str() {
            "state" => Command::State,
            "propose" => Command::Propose,
            "ideas" => Command::Ideas,
            "summary" => Command::Summary,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "suggest" => {
                let name = arg.ok_or_else(|| {
                    CommandError::InvalidArgument("suggest needs an action".to_string())
                })?;
                let action = ActionKind::from_name(&name.to_lowercase())
                    .ok_or_else(|| CommandError::UnknownAction(name.to_string()))?;
                Command::Suggest(action)
            }
            "tick" => {
                let n = match arg {
                    None => 1,
                    Some(raw) => raw
                        .parse::<u32>()
                        .ok()
                        .filter(|n| (1..=MAX_TICKS_PER_COMMAND).contains(n))
                        .ok_or_else(|| CommandError::InvalidArgument(format!("tick count {raw}")))?,
                };
                Command::Tick(n)
            }
            "request" => {
                let capability = arg.ok_or_else(|| {
                    CommandError::InvalidArgument("request needs a capability".to_string())
                })?;
                Command::Request(capability.to_lowercase())
            }
            "save" => Command::Save(arg.map(PathBuf::from)),
            "load" => Command::Load(arg.map(PathBuf::from)),
            "backend" => {
                let sub = arg.map(str::to_lowercase);
                let value = parts.next();
                match (sub.as_deref(), value) {
                    (None | Some("status"), _) => Command::Backend(BackendVerb::Status),
                    (Some("auto"), _) => Command::Backend(BackendVerb::Auto),
                    (Some("force"), Some(key)) => {
                        Command::Backend(BackendVerb::Force(key.to_lowercase()))
                    }
                    (Some("force"), None) => {
                        return Err(CommandError::InvalidArgument(
                            "backend force needs a key".to_string(),
                        ))
                    }
                    (Some("mode"), Some(mode)) => {
                        let mode = InferenceMode::from_name(mode)
                            .ok_or_else(|| CommandError::InvalidArgument(format!("mode {mode}")))?;
                        Command::Backend(BackendVerb::Mode(mode))
                    }
                    _ => return Err(CommandError::NotRecognized),
                }
            }
            _ => return Err(CommandError::NotRecognized),
        };
        Ok(command)
    }
}

impl Command {
    /// Run against the engine and router. Only a policy violation from `tick` is an error.
    pub fn execute(&self, engine: &mut Engine, router: &mut BackendRouter) -> Result<String, EngineError> {
        let text = match self {
            Command::State => render_state(engine),
            Command::Propose => {
                if !engine.request("propose") {
                    return Ok(not_permitted("propose"));
                }
                let proposal = engine.propose();
                format!(
                    "Proposal: {} (score {:.3}); intention: {}",
                    proposal.action,
                    proposal.score,
                    proposal.intention.as_deref().unwrap_or("none")
                )
            }
            Command::Ideas => {
                let ideas = engine.ideas().top_n(5);
                if ideas.is_empty() {
                    "No ideas yet.".to_string()
                } else {
                    let mut out = String::new();
                    for idea in ideas {
                        let _ = writeln!(out, "[{:.2}] {} ({})", idea.priority, idea.description, idea.rationale);
                    }
                    out.trim_end().to_string()
                }
            }
            Command::Summary => match engine.dashboard().last_summary() {
                None => "No day summary yet.".to_string(),
                Some(summary) => {
                    let actions: Vec<String> = summary
                        .top_actions
                        .iter()
                        .map(|(a, n)| format!("{a} x{n}"))
                        .collect();
                    let events: Vec<&str> = summary.recent_events.iter().map(|k| k.name()).collect();
                    format!(
                        "Day {}: top actions [{}]; recent events [{}]",
                        summary.day_index,
                        actions.join(", "),
                        events.join(", ")
                    )
                }
            },
            Command::Suggest(action) => {
                if engine.suggest(*action) {
                    format!("Suggestion accepted: {action}.")
                } else {
                    let label = engine.intention().map(|i| i.label.as_str()).unwrap_or("none");
                    format!("Suggestion declined: {action} does not serve '{label}'.")
                }
            }
            Command::Pause => {
                engine.pause();
                "Paused.".to_string()
            }
            Command::Resume => {
                engine.resume();
                "Resumed.".to_string()
            }
            Command::Tick(n) => {
                if engine.is_paused() {
                    return Ok("Paused; no tick.".to_string());
                }
                let mut lines = Vec::with_capacity(*n as usize);
                for _ in 0..*n {
                    let report = engine.life_cycle_step()?;
                    lines.push(format!("tick {}: {}", report.tick, report.human));
                }
                let skip = lines.len().saturating_sub(TICK_ECHO);
                lines[skip..].join("\n")
            }
            Command::Request(capability) => {
                if engine.request(capability) {
                    format!("Granted: {capability}.")
                } else {
                    not_permitted(capability)
                }
            }
            Command::Save(path) => {
                let path = path.clone().unwrap_or_else(|| engine.config().snapshot_path.clone());
                engine.set_router_settings(router.settings().clone());
                match engine.save_snapshot(&path) {
                    Ok(()) => format!("Saved to {}.", path.display()),
                    Err(EngineError::Snapshot(SnapshotError::NotPermitted)) => not_permitted("snapshot"),
                    Err(e) => format!("Save failed: {e}"),
                }
            }
            Command::Load(path) => {
                let path = path.clone().unwrap_or_else(|| engine.config().snapshot_path.clone());
                if engine.load_snapshot(&path) {
                    router.apply_settings(engine.router_settings().clone());
                    format!("Loaded from {} (tick {}).", path.display(), engine.tick())
                } else {
                    "Load failed; state unchanged.".to_string()
                }
            }
            Command::Backend(verb) => {
                let text = match verb {
                    BackendVerb::Status => render_status(router),
                    BackendVerb::Auto => {
                        router.set_auto(true);
                        "Backend selection: automatic.".to_string()
                    }
                    BackendVerb::Force(key) => match router.force_model(key) {
                        Ok(()) => format!("Backend forced: {key}."),
                        Err(_) => CommandError::UnknownModel(key.clone()).to_string(),
                    },
                    BackendVerb::Mode(mode) => {
                        router.set_mode(*mode);
                        format!("Mode: {mode}.")
                    }
                };
                engine.set_router_settings(router.settings().clone());
                text
            }
        };
        Ok(text)
    }
}

/// Parse and run one line. Parse failures come back as their message.
pub fn run_line(line: &str, engine: &mut Engine, router: &mut BackendRouter) -> Result<String, EngineError> {
    match line.parse::<Command>() {
        Ok(command) => command.execute(engine, router),
        Err(e) => Ok(e.to_string()),
    }
}

fn not_permitted(capability: &str) -> String {
    format!("Not permitted: {capability}.")
}

fn render_state(engine: &Engine) -> String {
    let s = engine.internal();
    let w = engine.world();
    format!(
        "tick {} ({}){}\n\
         energy {:.2} clarity {:.2} stability {:.2} curiosity {:.2} risk {:.2} fatigue {:.2} stress {:.2}\n\
         world: noise {:.2} opportunity {:.2} danger {:.2} novelty {:.2} stability {:.2}\n\
         intention: {}",
        engine.tick(),
        engine.clock().phase().name(),
        if engine.is_paused() { " [paused]" } else { "" },
        s.energy(),
        s.clarity(),
        s.stability(),
        s.curiosity(),
        s.risk_tolerance(),
        s.fatigue(),
        s.stress(),
        w.instability_noise(),
        w.opportunity(),
        w.danger(),
        w.novelty(),
        w.global_stability(),
        engine.intention().map(|i| i.label.as_str()).unwrap_or("none"),
    )
}

fn render_status(router: &BackendRouter) -> String {
    let status = router.status();
    format!(
        "auto: {} | mode: {} | forced: {} | active: {} | loaded: [{}] | avg latency: {:.1} ms | primary: {}",
        status.auto_mode,
        status.mode,
        status.forced_model.as_deref().unwrap_or("none"),
        status.active_model,
        status.loaded.join(", "),
        status.avg_latency_ms,
        if status.primary_available { "up" } else { "down" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!("STATE".parse::<Command>(), Ok(Command::State));
        assert_eq!("/Pause".parse::<Command>(), Ok(Command::Pause));
        assert_eq!(
            "Suggest REST".parse::<Command>(),
            Ok(Command::Suggest(ActionKind::Rest))
        );
        assert_eq!(
            "backend MODE Reflection".parse::<Command>(),
            Ok(Command::Backend(BackendVerb::Mode(InferenceMode::Reflection)))
        );
    }

    #[test]
    fn bad_lines_are_rejected() {
        assert_eq!("dance".parse::<Command>(), Err(CommandError::NotRecognized));
        assert_eq!("".parse::<Command>(), Err(CommandError::NotRecognized));
        assert_eq!(
            "suggest fly".parse::<Command>(),
            Err(CommandError::UnknownAction("fly".to_string()))
        );
        assert!(matches!(
            "tick 0".parse::<Command>(),
            Err(CommandError::InvalidArgument(_))
        ));
        assert!(matches!(
            "backend mode turbo".parse::<Command>(),
            Err(CommandError::InvalidArgument(_))
        ));
    }

    #[test]
    fn tick_defaults_to_one() {
        assert_eq!("tick".parse::<Command>(), Ok(Command::Tick(1)));
        assert_eq!("tick 12".parse::<Command>(), Ok(Command::Tick(12)));
    }
}
