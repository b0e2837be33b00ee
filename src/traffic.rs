//! Traffic weight editor for a service's weighted forward rule.

use crossterm::event::{KeyCode, KeyEvent};
use tracing::info;

use crate::config::{MAINTENANCE_TARGET, SECONDARY_TARGET_SUFFIX};
use crate::deploy::CONFIRM_KEY;
use crate::error::FleetError;
use crate::model::{AppView, Service, TrafficRule, MAX_WEIGHT};

/// Amount arrow keys change a weight by.
pub const WEIGHT_STEP: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    AllPrimary,
    AllSecondary,
    EvenSplit,
    Maintenance,
}

impl Preset {
    pub fn from_key(c: char) -> Option<Self> {
        match c {
            '1' => Some(Preset::AllPrimary),
            '2' => Some(Preset::AllSecondary),
            '3' => Some(Preset::EvenSplit),
            '4' => Some(Preset::Maintenance),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Preset::AllPrimary => "all primary",
            Preset::AllSecondary => "all secondary",
            Preset::EvenSplit => "even split",
            Preset::Maintenance => "maintenance",
        }
    }

    fn weight_for(self, name: &str) -> u32 {
        let maint = name == MAINTENANCE_TARGET;
        let secondary = name.ends_with(SECONDARY_TARGET_SUFFIX);
        match self {
            Preset::AllPrimary if secondary || maint => 0,
            Preset::AllPrimary => 100,
            Preset::AllSecondary if secondary => 100,
            Preset::AllSecondary => 0,
            Preset::EvenSplit if maint => 0,
            Preset::EvenSplit => 50,
            Preset::Maintenance if maint => 100,
            Preset::Maintenance => 0,
        }
    }
}

/// Set every target's weight from its name. Applying twice is a no-op.
pub fn apply_preset(rule: &mut TrafficRule, preset: Preset) {
    for target in &mut rule.targets {
        target.weight = preset.weight_for(&target.name);
    }
}

pub fn adjust_weight(weight: u32, delta: i32) -> u32 {
    (i64::from(weight) + i64::from(delta)).clamp(0, i64::from(MAX_WEIGHT)) as u32
}

pub fn weights_changed(rule: &TrafficRule, original: &[u32]) -> bool {
    rule.targets
        .iter()
        .zip(original)
        .any(|(t, w)| t.weight != *w)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrafficStep {
    Editing,
    Confirm,
    Saving,
}

/// What the traffic screen asks of the controller.
#[derive(Clone, Debug, PartialEq)]
pub enum TrafficAction {
    None,
    Apply(TrafficRule),
    Exit(Option<String>),
}

#[derive(Clone, Debug)]
pub struct TrafficState {
    pub session: u64,
    pub service: Service,
    pub prev_view: AppView,
    pub rule: Option<TrafficRule>,
    /// Weights as fetched, for the diff and the no-change check.
    pub original: Vec<u32>,
    pub cursor: usize,
    pub step: TrafficStep,
    pub loading: bool,
    pub error: Option<String>,
}

impl TrafficState {
    pub fn new(session: u64, service: Service, prev_view: AppView) -> Self {
        Self {
            session,
            service,
            prev_view,
            rule: None,
            original: Vec::new(),
            cursor: 0,
            step: TrafficStep::Editing,
            loading: true,
            error: None,
        }
    }

    pub fn fetched(&mut self, result: Result<TrafficRule, FleetError>) {
        self.loading = false;
        match result {
            Err(e) => self.error = Some(e.to_string()),
            Ok(rule) => {
                self.original = rule.weights();
                self.cursor = 0;
                self.rule = Some(rule);
                self.error = None;
            }
        }
    }

    pub fn applied(&mut self, result: Result<(), FleetError>) -> TrafficAction {
        if self.step != TrafficStep::Saving {
            return TrafficAction::None;
        }
        match result {
            Err(e) => {
                self.error = Some(e.to_string());
                self.step = TrafficStep::Editing;
                TrafficAction::None
            }
            Ok(()) => {
                info!(service = %self.service.name, "traffic weights updated");
                TrafficAction::Exit(Some("Traffic weights updated".to_string()))
            }
        }
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> TrafficAction {
        match self.step {
            TrafficStep::Editing => self.edit_key(key),
            TrafficStep::Confirm => {
                if key.code == KeyCode::Char(CONFIRM_KEY) {
                    if let Some(rule) = self.rule.clone() {
                        self.step = TrafficStep::Saving;
                        self.error = None;
                        return TrafficAction::Apply(rule);
                    }
                }
                self.step = TrafficStep::Editing;
                TrafficAction::None
            }
            TrafficStep::Saving => TrafficAction::None,
        }
    }

    fn edit_key(&mut self, key: &KeyEvent) -> TrafficAction {
        if key.code == KeyCode::Esc {
            return TrafficAction::Exit(None);
        }
        let Some(rule) = self.rule.as_mut() else {
            return TrafficAction::None;
        };
        let count = rule.targets.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < count {
                    self.cursor += 1;
                }
            }
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Right | KeyCode::Char('l') => {
                let delta = if matches!(key.code, KeyCode::Left | KeyCode::Char('h')) {
                    -(WEIGHT_STEP as i32)
                } else {
                    WEIGHT_STEP as i32
                };
                if let Some(target) = rule.targets.get_mut(self.cursor) {
                    target.weight = adjust_weight(target.weight, delta);
                }
            }
            KeyCode::Char(c) => {
                if let Some(preset) = Preset::from_key(c) {
                    apply_preset(rule, preset);
                }
            }
            KeyCode::Enter => {
                if count == 0 || self.loading {
                    return TrafficAction::None;
                }
                if !weights_changed(rule, &self.original) {
                    return TrafficAction::Exit(Some("No changes to apply".to_string()));
                }
                self.step = TrafficStep::Confirm;
            }
            _ => {}
        }
        TrafficAction::None
    }
}
