//! Observability - journals, decision audit trail, and the JSONL event log.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_core::{ActionKind, DayPhase, InternalState, WallPhase, WorldState};

use crate::kernel::events::RareEventKind;

/// Human journal lines kept in memory.
const HUMAN_JOURNAL_CAPACITY: usize = 500;

/// A journal event for the on-disk log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub tick: Option<u64>,
    pub message: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Appends journal events to a JSON-lines file.
#[derive(Debug, Clone)]
pub struct JournalEmitter {
    events_path: PathBuf,
}

impl JournalEmitter {
    pub fn new(events_path: impl Into<PathBuf>) -> Self {
        Self {
            events_path: events_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.events_path
    }

    /// Emit an event.
    pub fn emit(&self, event: JournalEvent) -> Result<()> {
        if let Some(parent) = self.events_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.events_path)?;

        let line = serde_json::to_string(&event)?;
        writeln!(file, "{}", line)?;

        Ok(())
    }

    /// Emit a simple event.
    pub fn emit_simple(&self, event_type: &str, tick: Option<u64>, message: &str) -> Result<()> {
        self.emit(JournalEvent {
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            tick,
            message: message.to_string(),
            metadata: serde_json::Value::Null,
        })
    }

    /// Read recent events.
    pub fn read_recent(&self, limit: usize) -> Vec<JournalEvent> {
        let file = match std::fs::File::open(&self.events_path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let reader = BufReader::new(file);
        let mut events: Vec<JournalEvent> = reader
            .lines()
            .map_while(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        // Return last N events
        if events.len() > limit {
            events.drain(0..events.len() - limit);
        }

        events
    }
}

/// Point-in-time capture of everything a decision saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub tick: u64,
    pub sim_minutes: f64,
    pub day_phase: DayPhase,
    pub wall_phase: WallPhase,
    pub internal: InternalState,
    pub world: WorldState,
}

/// Full audit record of one tick's decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub tick: u64,
    pub state_before: StateSnapshot,
    pub objectives: Vec<String>,
    pub intention: Option<String>,
    pub candidates: Vec<ActionKind>,
    pub scores: Vec<(ActionKind, f64)>,
    pub chosen: ActionKind,
    pub success: bool,
    pub effective_risk: f64,
    pub reward: f64,
    pub cost: f64,
    pub rare_event: Option<RareEventKind>,
    pub skill_level: u32,
    pub state_after: StateSnapshot,
}

/// In-memory journals: one sentence per tick plus the decision audit ring.
#[derive(Debug, Clone)]
pub struct Journal {
    human: VecDeque<String>,
    decisions: VecDeque<DecisionRecord>,
    decision_capacity: usize,
}

impl Default for Journal {
    fn default() -> Self {
        Self::new(500)
    }
}

impl Journal {
    pub fn new(decision_capacity: usize) -> Self {
        Self {
            human: VecDeque::new(),
            decisions: VecDeque::new(),
            decision_capacity: decision_capacity.max(1),
        }
    }

    pub fn push_human(&mut self, line: String) {
        self.human.push_back(line);
        while self.human.len() > HUMAN_JOURNAL_CAPACITY {
            self.human.pop_front();
        }
    }

    pub fn push_decision(&mut self, record: DecisionRecord) {
        self.decisions.push_back(record);
        while self.decisions.len() > self.decision_capacity {
            self.decisions.pop_front();
        }
    }

    pub fn human(&self) -> &VecDeque<String> {
        &self.human
    }

    pub fn decisions(&self) -> &VecDeque<DecisionRecord> {
        &self.decisions
    }

    pub fn last_decision(&self) -> Option<&DecisionRecord> {
        self.decisions.back()
    }
}

/// One sentence describing the choice and how it went.
pub fn human_line(action: ActionKind, success: bool, rare_event: Option<RareEventKind>) -> String {
    let base = match action {
        ActionKind::Rest => "I recover to protect my clarity and energy",
        ActionKind::Explore | ActionKind::Challenge => "I attempt measured progress despite the uncertainty",
        ActionKind::Organize | ActionKind::Reflect => "I stabilize my routines to stay coherent",
        ActionKind::Practice | ActionKind::Idle => "I keep a careful, sustainable pace",
    };
    match rare_event {
        Some(kind) => format!("{base}, and a rare event ({kind}) reshapes my trajectory."),
        None if success => format!("{base} (success)."),
        None => format!("{base} (failed, adjusting)."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitter_round_trips_recent_events() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = JournalEmitter::new(dir.path().join("nested/events.jsonl"));
        for tick in 0..5 {
            emitter
                .emit_simple("tick", Some(tick), &format!("tick {tick}"))
                .unwrap();
        }
        let recent = emitter.read_recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].tick, Some(4));
    }

    #[test]
    fn missing_log_reads_empty() {
        let emitter = JournalEmitter::new("/nonexistent/vigil/events.jsonl");
        assert!(emitter.read_recent(10).is_empty());
    }

    #[test]
    fn human_line_mentions_events() {
        let line = human_line(ActionKind::Explore, true, Some(RareEventKind::Discovery));
        assert!(line.contains("discovery"));
        assert!(human_line(ActionKind::Rest, false, None).ends_with("(failed, adjusting)."));
    }
}
