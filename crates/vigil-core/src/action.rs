use std::fmt;

/// The seven fixed actions available to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ActionKind {
    Rest,
    Organize,
    Practice,
    Explore,
    Reflect,
    Idle,
    Challenge,
}

impl ActionKind {
    /// Declaration order; also the order candidates are scored in.
    pub const ALL: [ActionKind; 7] = [
        ActionKind::Rest,
        ActionKind::Organize,
        ActionKind::Practice,
        ActionKind::Explore,
        ActionKind::Reflect,
        ActionKind::Idle,
        ActionKind::Challenge,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Rest => "rest",
            ActionKind::Organize => "organize",
            ActionKind::Practice => "practice",
            ActionKind::Explore => "explore",
            ActionKind::Reflect => "reflect",
            ActionKind::Idle => "idle",
            ActionKind::Challenge => "challenge",
        }
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "rest" => Some(ActionKind::Rest),
            "organize" => Some(ActionKind::Organize),
            "practice" => Some(ActionKind::Practice),
            "explore" => Some(ActionKind::Explore),
            "reflect" => Some(ActionKind::Reflect),
            "idle" => Some(ActionKind::Idle),
            "challenge" => Some(ActionKind::Challenge),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            ActionKind::Rest => 0,
            ActionKind::Organize => 1,
            ActionKind::Practice => 2,
            ActionKind::Explore => 3,
            ActionKind::Reflect => 4,
            ActionKind::Idle => 5,
            ActionKind::Challenge => 6,
        }
    }

    pub fn is_exploratory(self) -> bool {
        matches!(self, ActionKind::Explore | ActionKind::Challenge)
    }

    pub fn is_stabilizing(self) -> bool {
        matches!(
            self,
            ActionKind::Organize | ActionKind::Reflect | ActionKind::Rest
        )
    }

    /// Actions still permitted when energy is critically low.
    pub fn is_low_energy_safe(self) -> bool {
        matches!(
            self,
            ActionKind::Rest | ActionKind::Idle | ActionKind::Reflect
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static cost/risk/reward profile of an action. Never mutated after construction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionProfile {
    pub base_risk: f64,
    pub energy_cost: f64,
    pub clarity_cost: f64,
    pub stability_gain: f64,
    pub knowledge_gain: f64,
    pub fatigue_gain: f64,
    pub stress_on_fail: f64,
}

impl ActionProfile {
    const fn new(
        base_risk: f64,
        energy_cost: f64,
        clarity_cost: f64,
        stability_gain: f64,
        knowledge_gain: f64,
        fatigue_gain: f64,
        stress_on_fail: f64,
    ) -> Self {
        Self {
            base_risk,
            energy_cost,
            clarity_cost,
            stability_gain,
            knowledge_gain,
            fatigue_gain,
            stress_on_fail,
        }
    }

    /// Knowledge plus stability, the raw "gain" of a successful execution.
    pub fn raw_reward(&self) -> f64 {
        self.knowledge_gain + self.stability_gain
    }
}

/// Fixed table of the seven action profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCatalog {
    profiles: [ActionProfile; 7],
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ActionCatalog {
    pub fn standard() -> Self {
        Self {
            profiles: [
                ActionProfile::new(0.02, -0.10, -0.04, 0.05, 0.00, -0.10, 0.04),
                ActionProfile::new(0.08, 0.08, 0.05, 0.10, 0.03, 0.04, 0.06),
                ActionProfile::new(0.14, 0.12, 0.09, 0.05, 0.12, 0.08, 0.09),
                ActionProfile::new(0.22, 0.16, 0.10, 0.03, 0.18, 0.09, 0.12),
                ActionProfile::new(0.05, 0.05, -0.03, 0.08, 0.09, -0.02, 0.05),
                ActionProfile::new(0.01, -0.03, -0.02, 0.02, 0.00, -0.05, 0.03),
                ActionProfile::new(0.35, 0.20, 0.16, 0.07, 0.20, 0.12, 0.18),
            ],
        }
    }

    pub fn profile(&self, action: ActionKind) -> &ActionProfile {
        &self.profiles[action.index()]
    }

    pub fn actions(&self) -> impl Iterator<Item = ActionKind> {
        ActionKind::ALL.into_iter()
    }
}
