//! Task restriction evaluation.
//!
//! A task carries a list of atomic restrictions and a combination string such as `"#A(#O#)"`
//! saying how their results combine. Every restriction is evaluated, in order, whether or not
//! the overall result is already decided; when the combination fails, the lowest-numbered
//! restriction that evaluated false supplies the fail message.

use drifter_data::{
    Character, CharacterSelector, CharacterTest, GameDef, IntOperand, LocationTest, ObjectSelector, Openness,
    Position, Restriction, StateTest, TaskDef, TaskSelector, TextOp, VariableSelector, VariableTest,
};
use log::trace;
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser as PestParser;
use thiserror::Error;

use crate::state::{GameState, Posture};
use crate::sysvars;
use crate::vars::{VarError, VarValue};

#[derive(PestParser)]
#[grammar = "src/restriction.pest"]
struct CombinationParser;

#[derive(Debug, Error)]
pub enum RestrictionError {
    #[error("malformed restriction combination '{text}': {message}")]
    Grammar { text: String, message: String },
    #[error("combination '{text}' uses {used} restrictions but {available} are defined")]
    CountMismatch {
        text: String,
        used: usize,
        available: usize,
    },
    #[error("variable '{0}' does not hold an integer")]
    NotInteger(String),
    #[error(transparent)]
    Variable(#[from] VarError),
}

/// Parsed combination tree. Leaves hold restriction indices in the order they appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Combination {
    Restriction(usize),
    All(Vec<Combination>),
    Any(Vec<Combination>),
}

impl Combination {
    /// Parse a combination string, numbering `#` leaves left to right.
    ///
    /// # Errors
    /// Returns `RestrictionError::Grammar` for anything the grammar rejects.
    pub fn parse(text: &str) -> Result<Self, RestrictionError> {
        let grammar_error = |message: String| RestrictionError::Grammar {
            text: text.to_string(),
            message,
        };
        let mut pairs = CombinationParser::parse(Rule::combination, text).map_err(|e| grammar_error(e.to_string()))?;
        let root = pairs
            .next()
            .and_then(|combination| combination.into_inner().next())
            .ok_or_else(|| grammar_error("empty combination".into()))?;
        let mut next_index = 0;
        Ok(build(root, &mut next_index))
    }

    /// Number of restrictions the combination refers to.
    pub fn leaf_count(&self) -> usize {
        match self {
            Combination::Restriction(_) => 1,
            Combination::All(parts) | Combination::Any(parts) => parts.iter().map(Combination::leaf_count).sum(),
        }
    }

    /// Combine precomputed restriction results.
    pub fn evaluate(&self, results: &[bool]) -> bool {
        match self {
            Combination::Restriction(idx) => results.get(*idx).copied().unwrap_or(false),
            Combination::All(parts) => parts.iter().fold(true, |acc, part| part.evaluate(results) & acc),
            Combination::Any(parts) => parts.iter().fold(false, |acc, part| part.evaluate(results) | acc),
        }
    }
}

fn build(pair: Pair<Rule>, next_index: &mut usize) -> Combination {
    match pair.as_rule() {
        Rule::restriction => {
            let idx = *next_index;
            *next_index += 1;
            Combination::Restriction(idx)
        },
        Rule::and_expr | Rule::or_expr => {
            let is_and = pair.as_rule() == Rule::and_expr;
            let mut parts: Vec<Combination> = pair.into_inner().map(|inner| build(inner, next_index)).collect();
            if parts.len() == 1 {
                parts.remove(0)
            } else if is_and {
                Combination::All(parts)
            } else {
                Combination::Any(parts)
            }
        },
        // The grammar only nests the rules above below the root.
        _ => Combination::All(Vec::new()),
    }
}

/// Result of checking one task's restrictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestrictionOutcome {
    pub passed: bool,
    /// Lowest-indexed restriction that evaluated false, when the task failed.
    pub fail_index: Option<usize>,
}

impl RestrictionOutcome {
    /// The fail message to show the player, if the failing restriction has one.
    pub fn fail_message<'a>(&self, task: &'a TaskDef) -> Option<&'a str> {
        self.fail_index
            .and_then(|idx| task.restrictions.get(idx))
            .and_then(|r| r.fail_message.as_deref())
            .filter(|message| !message.is_empty())
    }
}

/// Evaluate a combination string directly against restriction results.
///
/// # Errors
/// Fails on malformed combinations or when the number of `#` tokens differs from the
/// number of results.
pub fn evaluate_combination(text: &str, results: &[bool]) -> Result<RestrictionOutcome, RestrictionError> {
    if results.is_empty() {
        return Ok(RestrictionOutcome {
            passed: true,
            fail_index: None,
        });
    }
    let combination = Combination::parse(text)?;
    let used = combination.leaf_count();
    if used != results.len() {
        return Err(RestrictionError::CountMismatch {
            text: text.to_string(),
            used,
            available: results.len(),
        });
    }
    let passed = combination.evaluate(results);
    let fail_index = if passed {
        None
    } else {
        results.iter().position(|holds| !holds)
    };
    Ok(RestrictionOutcome { passed, fail_index })
}

/// Checks restrictions against one game state.
pub struct RestrictionEvaluator<'a> {
    def: &'a GameDef,
    state: &'a GameState,
    trace: bool,
}

impl<'a> RestrictionEvaluator<'a> {
    pub fn new(def: &'a GameDef, state: &'a GameState, trace: bool) -> Self {
        Self { def, state, trace }
    }

    /// Evaluate all of a task's restrictions and combine them.
    ///
    /// # Errors
    /// Grammar and count errors from the combination, or variable lookups that fail.
    pub fn evaluate(&self, task: &TaskDef) -> Result<RestrictionOutcome, RestrictionError> {
        let results = task
            .restrictions
            .iter()
            .map(|r| self.holds(&r.restriction))
            .collect::<Result<Vec<_>, _>>()?;
        let default_combination;
        let text = match &task.combination {
            Some(text) => text.as_str(),
            None => {
                default_combination = vec!["#"; results.len()].join("A");
                default_combination.as_str()
            },
        };
        let outcome = evaluate_combination(text, &results)?;
        if self.trace {
            trace!("restrictions {text} over {results:?} -> {outcome:?}");
        }
        Ok(outcome)
    }

    /// Evaluate a single restriction.
    ///
    /// # Errors
    /// Only variable restrictions can fail, when the variable is missing or mistyped.
    pub fn holds(&self, restriction: &Restriction) -> Result<bool, RestrictionError> {
        let result = match restriction {
            Restriction::ObjectLocation { object, test, negate } => self.object_location(*object, *test) != *negate,
            Restriction::ObjectState { object, test } => self.object_state(*object, *test),
            Restriction::TaskState { task, done } => match task {
                TaskSelector::All => self.state.tasks.iter().all(|t| t.done == *done),
                TaskSelector::Task(task) => self.state.tasks.get(*task).is_some_and(|t| t.done == *done),
            },
            Restriction::Character { character, test, negate } => self.character(*character, *test) != *negate,
            Restriction::Variable { variable, test } => self.variable(variable, test)?,
        };
        if self.trace {
            trace!("restriction {restriction:?} -> {result}");
        }
        Ok(result)
    }

    fn resolve(&self, selector: CharacterSelector) -> Option<Character> {
        self.state.resolve_character(selector)
    }

    fn object_location(&self, selector: ObjectSelector, test: LocationTest) -> bool {
        let count = self.state.objects.len();
        match selector {
            ObjectSelector::Object(obj) => self.object_passes(obj, test),
            ObjectSelector::Referenced => self
                .state
                .vars
                .ref_object
                .is_some_and(|obj| self.object_passes(obj, test)),
            ObjectSelector::Anything => (0..count).any(|obj| self.object_passes(obj, test)),
            ObjectSelector::Nothing => !(0..count).any(|obj| self.object_passes(obj, test)),
        }
    }

    fn object_passes(&self, obj: usize, test: LocationTest) -> bool {
        let state = self.state;
        match test {
            LocationTest::InRoom(room) => state.directly_in_room(self.def, obj, room),
            LocationTest::Hidden => state
                .objects
                .get(obj)
                .is_some_and(|o| !o.static_unmoved && o.position == Position::Hidden),
            LocationTest::HeldBy(who) => match self.resolve(who) {
                Some(Character::Player) => state.held_by_player(obj),
                Some(Character::Npc(npc)) => state.held_by_npc(obj, npc),
                None => false,
            },
            LocationTest::WornBy(who) => match self.resolve(who) {
                Some(Character::Player) => state.worn_by_player(obj),
                Some(Character::Npc(npc)) => state.worn_by_npc(obj, npc),
                None => false,
            },
            LocationTest::VisibleTo(who) => self
                .resolve(who)
                .and_then(|character| state.character_room(character))
                .is_some_and(|room| state.indirectly_in_room(self.def, obj, room)),
            LocationTest::Inside(container) => state.inside(obj, container),
            LocationTest::OnTopOf(surface) => state.on_top_of(obj, surface),
        }
    }

    fn object_state(&self, obj: usize, test: StateTest) -> bool {
        let Some(object) = self.state.objects.get(obj) else {
            return false;
        };
        match test {
            StateTest::Open => object.openness == Openness::Open,
            StateTest::Closed => object.openness == Openness::Closed,
            StateTest::Locked => object.openness == Openness::Locked,
            StateTest::State(wanted) => object.state == wanted,
        }
    }

    fn character(&self, selector: CharacterSelector, test: CharacterTest) -> bool {
        let Some(character) = self.resolve(selector) else {
            return false;
        };
        let state = self.state;
        let (posture, parent) = match character {
            Character::Player => (state.player.posture, state.player.parent),
            Character::Npc(npc) => match state.npcs.get(npc) {
                Some(n) => (n.posture, n.parent),
                None => return false,
            },
        };
        match test {
            CharacterTest::SameRoomAs(other) => {
                let here = state.character_room(character);
                let there = self.resolve(other).and_then(|other| state.character_room(other));
                here.is_some() && here == there
            },
            CharacterTest::Alone => {
                let Some(room) = state.character_room(character) else {
                    return false;
                };
                let npcs_present = state
                    .npcs
                    .iter()
                    .enumerate()
                    .any(|(idx, npc)| Character::Npc(idx) != character && npc.location == Some(room));
                let player_present = character != Character::Player && state.player.room == room;
                !npcs_present && !player_present
            },
            CharacterTest::StandingOn(obj) => posture == Posture::Standing && parent == Some(obj),
            CharacterTest::SittingOn(obj) => posture == Posture::Sitting && parent == Some(obj),
            CharacterTest::LyingOn(obj) => posture == Posture::Lying && parent == Some(obj),
            CharacterTest::Gender(gender) => match character {
                Character::Player => self.def.player.gender == gender,
                Character::Npc(npc) => self.def.npcs.get(npc).is_some_and(|n| n.gender == gender),
            },
        }
    }

    fn variable(&self, selector: &VariableSelector, test: &VariableTest) -> Result<bool, RestrictionError> {
        let vars = &self.state.vars;
        let (name, value) = match selector {
            VariableSelector::ReferencedNumber => ("number", VarValue::Integer(vars.ref_number)),
            VariableSelector::ReferencedText => ("text", VarValue::Text(vars.ref_text.clone())),
            VariableSelector::Named(name) => (name.as_str(), sysvars::lookup(self.def, self.state, name)?),
        };
        match test {
            VariableTest::Int { op, operand } => {
                let left = value
                    .as_integer()
                    .ok_or_else(|| RestrictionError::NotInteger(name.to_string()))?;
                let right = match operand {
                    IntOperand::Literal(value) => *value,
                    IntOperand::Variable(other) => sysvars::lookup(self.def, self.state, other)?
                        .as_integer()
                        .ok_or_else(|| RestrictionError::NotInteger(other.clone()))?,
                };
                Ok(op.compare(left, right))
            },
            VariableTest::Text { op, value: wanted } => {
                let equal = value.to_string().eq_ignore_ascii_case(wanted);
                Ok(match op {
                    TextOp::Equal => equal,
                    TextOp::NotEqual => !equal,
                })
            },
        }
    }
}
