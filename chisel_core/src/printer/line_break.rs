//! Field-aware line-break rules for pretty printing
//!
//! The state is updated for every token before it is printed. Numeric
//! rules only decide where breaks go inside a list; the printer decides
//! whether a break becomes a newline or a comma.

use crate::config::compile_time::printer::COMMA_SLACK_UNIT;
use crate::tokens::TokenKind;

/// Current break rule, ordered so numeric rules follow `BreakOnNegativeOne`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum BreakRule {
    #[default]
    NoBreak,
    AfterUse1,
    AfterUse2,
    BreakOnNegativeOne,
    BreakEverySecondNumber,
    BreakEveryThirdNumber,
}

impl BreakRule {
    /// Rule selected by a field name, if any
    pub fn for_field(name: &str) -> Option<BreakRule> {
        match name {
            "color" | "point" => Some(BreakRule::BreakEveryThirdNumber),
            "texCoord" => Some(BreakRule::BreakEverySecondNumber),
            "coordIndex" | "texCoordIndex" | "colorIndex" | "normalIndex" => {
                Some(BreakRule::BreakOnNegativeOne)
            }
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        *self >= BreakRule::BreakOnNegativeOne
    }

    /// Characters a comma break may leave free before the line limit
    pub fn comma_slack(&self) -> usize {
        match self {
            BreakRule::BreakOnNegativeOne => COMMA_SLACK_UNIT,
            BreakRule::BreakEverySecondNumber => 2 * COMMA_SLACK_UNIT,
            BreakRule::BreakEveryThirdNumber => 3 * COMMA_SLACK_UNIT,
            _ => 0,
        }
    }
}

/// Break decision for one token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BreakDecision {
    pub before: bool,
    pub after: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LineBreaker {
    rule: BreakRule,
    numbers_seen: usize,
}

impl LineBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(&self) -> BreakRule {
        self.rule
    }

    /// Advance the state machine over one token
    pub fn observe(&mut self, kind: TokenKind, text: &str, int_value: Option<i64>) -> BreakDecision {
        let mut decision = BreakDecision::default();

        if self.rule == BreakRule::AfterUse2 {
            decision.before = true;
            self.rule = BreakRule::NoBreak;
        }

        match kind {
            TokenKind::LeftBracket | TokenKind::LeftBrace => {
                self.numbers_seen = 0;
            }
            TokenKind::RightBracket | TokenKind::RightBrace => {
                self.rule = BreakRule::NoBreak;
                self.numbers_seen = 0;
            }
            TokenKind::Keyword1 if text == "USE" => {
                self.rule = BreakRule::AfterUse1;
            }
            _ if self.rule == BreakRule::AfterUse1 => {
                self.rule = BreakRule::AfterUse2;
            }
            TokenKind::Identifier => {
                if let Some(rule) = BreakRule::for_field(text) {
                    if self.rule != BreakRule::BreakEverySecondNumber {
                        self.rule = rule;
                        self.numbers_seen = 0;
                    }
                }
            }
            TokenKind::Number => match self.rule {
                BreakRule::BreakEverySecondNumber | BreakRule::BreakEveryThirdNumber => {
                    self.numbers_seen += 1;
                    let width = if self.rule == BreakRule::BreakEverySecondNumber { 2 } else { 3 };
                    decision.after = self.numbers_seen % width == 0;
                }
                BreakRule::BreakOnNegativeOne => {
                    decision.after = int_value == Some(-1);
                }
                _ => {}
            },
            _ => {}
        }

        decision
    }
}
