//! Chat service - one engine plus one router behind a message-in, reply-out API.

use std::collections::VecDeque;

use serde::Serialize;
use vigil_core::{DayPhase, InternalState, WorldState};

use crate::adapters::{BackendCommand, BackendRouter, InferenceMode, ReplyMeta, RouterStatus};
use crate::commands;
use crate::error::EngineError;
use crate::goals::{Idea, Intention, Objective};
use crate::kernel::Engine;

/// Conversation turns kept in memory.
const HISTORY_CAPACITY: usize = 200;

/// Inspection payload returned by `GET /state` and with every reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatePayload {
    pub tick: u64,
    pub phase: DayPhase,
    pub paused: bool,
    pub intention: Option<Intention>,
    pub state: InternalState,
    pub world: WorldState,
    pub router: RouterStatus,
    pub ideas: Vec<Idea>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub commands: Vec<BackendCommand>,
    /// `"slash"` for command lines, otherwise the inference mode used.
    pub mode: String,
    pub meta: Option<ReplyMeta>,
    pub tick_log: Vec<String>,
    pub state: StatePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub user: String,
    pub assistant: String,
    pub tick: u64,
}

pub struct ChatService {
    engine: Engine,
    router: BackendRouter,
    style: String,
    history: VecDeque<ChatTurn>,
}

impl ChatService {
    pub fn new(engine: Engine, mut router: BackendRouter) -> Self {
        router.apply_settings(engine.router_settings().clone());
        Self {
            engine,
            router,
            style: "neutral".to_string(),
            history: VecDeque::new(),
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn router(&self) -> &BackendRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut BackendRouter {
        &mut self.router
    }

    pub fn history(&self) -> &VecDeque<ChatTurn> {
        &self.history
    }

    pub fn state_payload(&self) -> StatePayload {
        StatePayload {
            tick: self.engine.tick(),
            phase: self.engine.clock().phase(),
            paused: self.engine.is_paused(),
            intention: self.engine.intention().cloned(),
            state: *self.engine.internal(),
            world: *self.engine.world(),
            router: self.router.status(),
            ideas: self.engine.ideas().top_n(5).to_vec(),
        }
    }

    /// Run one command line without ticking.
    pub fn run_command(&mut self, line: &str) -> Result<String, EngineError> {
        commands::run_line(line, &mut self.engine, &mut self.router)
    }

    /// Handle one user message.
    ///
    /// Lines starting with `/` go to the command surface. Anything else ticks the engine once
    /// (unless paused) and is answered by the router; the reply's validated commands are applied.
    pub async fn handle_message(
        &mut self,
        message: &str,
        mode: Option<InferenceMode>,
    ) -> Result<ChatReply, EngineError> {
        let message = message.trim();

        if let Some(line) = message.strip_prefix('/') {
            let reply = self.run_command(line)?;
            return Ok(self.finish(message, reply, Vec::new(), "slash".to_string(), None, Vec::new()));
        }

        let mut tick_log = Vec::new();
        if !self.engine.is_paused() {
            let report = self.engine.life_cycle_step()?;
            tick_log.push(format!("tick {}: {}", report.tick, report.human));
        }

        let mode = mode.unwrap_or_else(|| self.router.mode());
        if !self.engine.request("local_inference") {
            let reply = "Not permitted: local_inference.".to_string();
            return Ok(self.finish(message, reply, Vec::new(), mode.to_string(), None, tick_log));
        }

        let context = self.engine.context_packet(mode, &self.style);
        let reply = self.router.generate(message, mode, &context).await;
        for command in &reply.commands {
            if let Some(line) = self.apply(command) {
                tick_log.push(line);
            }
        }

        Ok(self.finish(
            message,
            reply.text,
            reply.commands,
            mode.to_string(),
            Some(reply.meta),
            tick_log,
        ))
    }

    fn apply(&mut self, command: &BackendCommand) -> Option<String> {
        match command {
            BackendCommand::GetState | BackendCommand::Propose => None,
            BackendCommand::SetIntention(value) => match Objective::from_name(value) {
                Some(objective) => {
                    self.engine.set_intention(objective);
                    Some(format!("intention set: {objective}"))
                }
                None => {
                    tracing::debug!(value = %value, "ignoring intention for unknown objective");
                    None
                }
            },
            BackendCommand::Pause => {
                self.engine.pause();
                Some("paused".to_string())
            }
            BackendCommand::Resume => {
                self.engine.resume();
                Some("resumed".to_string())
            }
        }
    }

    fn finish(
        &mut self,
        user: &str,
        reply: String,
        commands: Vec<BackendCommand>,
        mode: String,
        meta: Option<ReplyMeta>,
        tick_log: Vec<String>,
    ) -> ChatReply {
        self.history.push_back(ChatTurn {
            user: user.to_string(),
            assistant: reply.clone(),
            tick: self.engine.tick(),
        });
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
        ChatReply {
            reply,
            commands,
            mode,
            meta,
            tick_log,
            state: self.state_payload(),
        }
    }
}
