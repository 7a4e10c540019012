use std::collections::HashSet;
use std::fmt;

use crate::*;

/// Validation error for malformed or dangling references in a `GameDef`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateName { kind: &'static str, name: String },
    MissingReference { kind: &'static str, index: usize, context: String },
    UnknownVariable { name: String, context: String },
    InvalidValue { context: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateName { kind, name } => {
                write!(f, "duplicate {kind} name '{name}'")
            },
            ValidationError::MissingReference { kind, index, context } => {
                write!(f, "missing {kind} #{index} ({context})")
            },
            ValidationError::UnknownVariable { name, context } => {
                write!(f, "unknown variable '{name}' ({context})")
            },
            ValidationError::InvalidValue { context } => {
                write!(f, "invalid value ({context})")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate cross-references and basic invariants in a `GameDef`.
///
/// ```
/// use drifter_data::{GameDef, HeaderDef, PlayerDef, RoomDef, validate_game};
///
/// let game = GameDef {
///     header: HeaderDef { name: "Demo".into(), ..HeaderDef::default() },
///     player: PlayerDef { name: "you".into(), ..PlayerDef::default() },
///     rooms: vec![RoomDef { short: "Cellar".into(), ..RoomDef::default() }],
///     ..GameDef::default()
/// };
/// assert!(validate_game(&game).is_empty());
/// ```
pub fn validate_game(game: &GameDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let counts = Counts::of(game);

    if game.rooms.is_empty() {
        errors.push(ValidationError::InvalidValue {
            context: "a game needs at least one room".into(),
        });
    }
    counts.room(game.player.start_room, "player start room", &mut errors);

    let mut names = HashSet::new();
    for var in &game.variables {
        if !names.insert(var.name.as_str()) {
            errors.push(ValidationError::DuplicateName {
                kind: "variable",
                name: var.name.clone(),
            });
        }
        if var.kind == VariableKind::Integer && var.initial.trim().parse::<i64>().is_err() && !var.initial.is_empty() {
            errors.push(ValidationError::InvalidValue {
                context: format!("variable '{}' initial value '{}' is not an integer", var.name, var.initial),
            });
        }
    }

    for (idx, room) in game.rooms.iter().enumerate() {
        for exit in &room.exits {
            counts.room(exit.destination, &format!("room #{idx} exit {}", exit.direction.name()), &mut errors);
        }
    }
    for (idx, group) in game.room_groups.iter().enumerate() {
        if group.rooms.is_empty() {
            errors.push(ValidationError::InvalidValue {
                context: format!("room group #{idx} '{}' is empty", group.name),
            });
        }
        for room in &group.rooms {
            counts.room(*room, &format!("room group #{idx}"), &mut errors);
        }
    }

    for (idx, obj) in game.objects.iter().enumerate() {
        let ctx = format!("object #{idx} '{}'", obj.short);
        match &obj.placement {
            ObjectPlacement::Static { rooms } => counts.room_list(rooms, &ctx, &mut errors),
            ObjectPlacement::StaticPartOf(character) => counts.character(*character, &ctx, &mut errors),
            ObjectPlacement::Dynamic { initial } => {
                counts.position(*initial, &ctx, &mut errors);
                if *initial == Position::InObject(idx) || *initial == Position::OnObject(idx) {
                    errors.push(ValidationError::InvalidValue {
                        context: format!("{ctx} starts inside itself"),
                    });
                }
            },
        }
        if obj.is_stateful() && (obj.initial_state < 1 || obj.initial_state as usize > obj.states.len()) {
            errors.push(ValidationError::InvalidValue {
                context: format!("{ctx} initial state {} out of range", obj.initial_state),
            });
        }
    }

    for (idx, task) in game.tasks.iter().enumerate() {
        let ctx = format!("task #{idx}");
        if let Some(room) = task.show_room {
            counts.room(room, &ctx, &mut errors);
        }
        counts.room_list(&task.rooms, &ctx, &mut errors);
        for restriction in &task.restrictions {
            check_restriction(game, &counts, &restriction.restriction, &ctx, &mut errors);
        }
        for action in &task.actions {
            check_action(game, &counts, action, &ctx, &mut errors);
        }
    }

    for (idx, event) in game.events.iter().enumerate() {
        let ctx = format!("event #{idx} '{}'", event.short);
        if let EventStarter::AfterTask(task) = event.starter {
            counts.task(task, &ctx, &mut errors);
        }
        for cond in [event.pauser, event.resumer].into_iter().flatten() {
            counts.task(cond.task, &ctx, &mut errors);
        }
        if let Some(affected) = event.affected_task {
            counts.task(affected.task, &ctx, &mut errors);
        }
        if event.finish_moves.len() > 2 {
            errors.push(ValidationError::InvalidValue {
                context: format!("{ctx} has more than two finish moves"),
            });
        }
        for movement in event.start_move.iter().chain(event.finish_moves.iter()) {
            counts.object(movement.object, &ctx, &mut errors);
            counts.destination(movement.destination, &ctx, &mut errors);
        }
        counts.room_list(&event.rooms, &ctx, &mut errors);
    }

    for (idx, npc) in game.npcs.iter().enumerate() {
        let ctx = format!("npc #{idx} '{}'", npc.name);
        if let Some(room) = npc.start_room {
            counts.room(room, &ctx, &mut errors);
        }
        for (walk_idx, walk) in npc.walks.iter().enumerate() {
            let wctx = format!("{ctx} walk #{walk_idx}");
            if walk.legs.is_empty() {
                errors.push(ValidationError::InvalidValue {
                    context: format!("{wctx} has no legs"),
                });
            }
            for leg in &walk.legs {
                if leg.duration <= 0 {
                    errors.push(ValidationError::InvalidValue {
                        context: format!("{wctx} leg duration {} must be positive", leg.duration),
                    });
                }
                match leg.destination {
                    WalkDestination::Room(room) => counts.room(room, &wctx, &mut errors),
                    WalkDestination::RoomGroup(group) => counts.group(group, &wctx, &mut errors),
                    WalkDestination::Hidden | WalkDestination::FollowPlayer => {},
                }
            }
            if walk.legs.iter().try_fold(0i32, |total, leg| total.checked_add(leg.duration)).is_none() {
                errors.push(ValidationError::InvalidValue {
                    context: format!("{wctx} total duration is too long"),
                });
            }
            if let Some(task) = walk.start_task {
                counts.task(task, &wctx, &mut errors);
            }
            if let Some(cond) = walk.stopping_task {
                counts.task(cond.task, &wctx, &mut errors);
            }
            if let Some(meet) = walk.meet_character {
                counts.selector(meet.character, &wctx, &mut errors);
                counts.task(meet.task, &wctx, &mut errors);
            }
            if let Some(meet) = walk.meet_object {
                counts.object(meet.object, &wctx, &mut errors);
                counts.task(meet.task, &wctx, &mut errors);
            }
        }
    }

    errors
}

fn check_restriction(
    game: &GameDef,
    counts: &Counts,
    restriction: &Restriction,
    ctx: &str,
    errors: &mut Vec<ValidationError>,
) {
    match restriction {
        Restriction::ObjectLocation { object, test, .. } => {
            if let ObjectSelector::Object(obj) = object {
                counts.object(*obj, ctx, errors);
            }
            match test {
                LocationTest::InRoom(room) => counts.room(*room, ctx, errors),
                LocationTest::Hidden => {},
                LocationTest::HeldBy(sel) | LocationTest::WornBy(sel) | LocationTest::VisibleTo(sel) => {
                    counts.selector(*sel, ctx, errors);
                },
                LocationTest::Inside(obj) | LocationTest::OnTopOf(obj) => counts.object(*obj, ctx, errors),
            }
        },
        Restriction::ObjectState { object, test } => {
            counts.object(*object, ctx, errors);
            if let (Some(def), StateTest::State(state)) = (game.objects.get(*object), test)
                && (*state < 1 || *state as usize > def.states.len())
            {
                errors.push(ValidationError::InvalidValue {
                    context: format!("{ctx} tests object #{object} for state {state}"),
                });
            }
        },
        Restriction::TaskState { task, .. } => {
            if let TaskSelector::Task(task) = task {
                counts.task(*task, ctx, errors);
            }
        },
        Restriction::Character { character, test, .. } => {
            counts.selector(*character, ctx, errors);
            match test {
                CharacterTest::SameRoomAs(other) => counts.selector(*other, ctx, errors),
                CharacterTest::StandingOn(obj) | CharacterTest::SittingOn(obj) | CharacterTest::LyingOn(obj) => {
                    counts.object(*obj, ctx, errors);
                },
                CharacterTest::Alone | CharacterTest::Gender(_) => {},
            }
        },
        Restriction::Variable { variable, test } => {
            if let VariableSelector::Named(name) = variable {
                check_variable(game, name, ctx, errors);
            }
            if let VariableTest::Int {
                operand: IntOperand::Variable(name),
                ..
            } = test
            {
                check_variable(game, name, ctx, errors);
            }
        },
    }
}

fn check_action(game: &GameDef, counts: &Counts, action: &TaskAction, ctx: &str, errors: &mut Vec<ValidationError>) {
    match action {
        TaskAction::MoveObject { object, destination } => {
            if let MoveSelector::Object(obj) = object {
                counts.object(*obj, ctx, errors);
            }
            counts.destination(*destination, ctx, errors);
        },
        TaskAction::MoveCharacter { character, destination } => {
            counts.selector(*character, ctx, errors);
            match destination {
                CharacterDestination::Hidden => {},
                CharacterDestination::Room(room) => counts.room(*room, ctx, errors),
                CharacterDestination::RoomGroup(group) => counts.group(*group, ctx, errors),
                CharacterDestination::SameRoomAs(other) => counts.selector(*other, ctx, errors),
                CharacterDestination::StandingOn(obj)
                | CharacterDestination::SittingOn(obj)
                | CharacterDestination::LyingOn(obj) => counts.object(*obj, ctx, errors),
            }
        },
        TaskAction::ChangeObjectStatus { object, .. } => counts.object(*object, ctx, errors),
        TaskAction::ChangeVariable { variable, change } => {
            check_variable(game, variable, ctx, errors);
            if let VariableChange::SetFromVariable(other) | VariableChange::AddVariable(other) = change {
                check_variable(game, other, ctx, errors);
            }
        },
        TaskAction::SetTask { task, .. } => counts.task(*task, ctx, errors),
        TaskAction::ChangeScore(_) | TaskAction::EndGame(_) => {},
    }
}

fn check_variable(game: &GameDef, name: &str, ctx: &str, errors: &mut Vec<ValidationError>) {
    if game.variable_index(name).is_none() {
        errors.push(ValidationError::UnknownVariable {
            name: name.to_string(),
            context: ctx.to_string(),
        });
    }
}

/// Entity counts, captured once so reference checks stay cheap.
struct Counts {
    rooms: usize,
    groups: usize,
    objects: usize,
    tasks: usize,
    npcs: usize,
}

impl Counts {
    fn of(game: &GameDef) -> Self {
        Self {
            rooms: game.rooms.len(),
            groups: game.room_groups.len(),
            objects: game.objects.len(),
            tasks: game.tasks.len(),
            npcs: game.npcs.len(),
        }
    }

    fn check(kind: &'static str, index: usize, limit: usize, ctx: &str, errors: &mut Vec<ValidationError>) {
        if index >= limit {
            errors.push(ValidationError::MissingReference {
                kind,
                index,
                context: ctx.to_string(),
            });
        }
    }

    fn room(&self, index: usize, ctx: &str, errors: &mut Vec<ValidationError>) {
        Self::check("room", index, self.rooms, ctx, errors);
    }

    fn group(&self, index: usize, ctx: &str, errors: &mut Vec<ValidationError>) {
        Self::check("room group", index, self.groups, ctx, errors);
    }

    fn object(&self, index: usize, ctx: &str, errors: &mut Vec<ValidationError>) {
        Self::check("object", index, self.objects, ctx, errors);
    }

    fn task(&self, index: usize, ctx: &str, errors: &mut Vec<ValidationError>) {
        Self::check("task", index, self.tasks, ctx, errors);
    }

    fn npc(&self, index: usize, ctx: &str, errors: &mut Vec<ValidationError>) {
        Self::check("npc", index, self.npcs, ctx, errors);
    }

    fn character(&self, character: Character, ctx: &str, errors: &mut Vec<ValidationError>) {
        if let Character::Npc(npc) = character {
            self.npc(npc, ctx, errors);
        }
    }

    fn selector(&self, selector: CharacterSelector, ctx: &str, errors: &mut Vec<ValidationError>) {
        if let CharacterSelector::Npc(npc) = selector {
            self.npc(npc, ctx, errors);
        }
    }

    fn room_list(&self, list: &RoomList, ctx: &str, errors: &mut Vec<ValidationError>) {
        match list {
            RoomList::OneRoom(room) => self.room(*room, ctx, errors),
            RoomList::SomeRooms(flags) if flags.len() > self.rooms => {
                errors.push(ValidationError::InvalidValue {
                    context: format!("{ctx} room list has {} entries for {} rooms", flags.len(), self.rooms),
                });
            },
            _ => {},
        }
    }

    fn position(&self, position: Position, ctx: &str, errors: &mut Vec<ValidationError>) {
        match position {
            Position::Hidden | Position::HeldByPlayer | Position::WornByPlayer => {},
            Position::HeldByNpc(npc) | Position::WornByNpc(npc) => self.npc(npc, ctx, errors),
            Position::PartOf(character) => self.character(character, ctx, errors),
            Position::OnObject(obj) | Position::InObject(obj) => self.object(obj, ctx, errors),
            Position::InRoom(room) => self.room(room, ctx, errors),
        }
    }

    fn destination(&self, destination: ObjectDestination, ctx: &str, errors: &mut Vec<ValidationError>) {
        match destination {
            ObjectDestination::Hidden => {},
            ObjectDestination::Room(room) => self.room(room, ctx, errors),
            ObjectDestination::RoomGroup(group) => self.group(group, ctx, errors),
            ObjectDestination::Into(obj) | ObjectDestination::Onto(obj) => self.object(obj, ctx, errors),
            ObjectDestination::HeldBy(sel) | ObjectDestination::WornBy(sel) | ObjectDestination::SameRoomAs(sel) => {
                self.selector(sel, ctx, errors);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> GameDef {
        GameDef {
            header: HeaderDef {
                name: "Test".into(),
                ..HeaderDef::default()
            },
            player: PlayerDef {
                name: "you".into(),
                ..PlayerDef::default()
            },
            rooms: vec![RoomDef {
                short: "Hall".into(),
                ..RoomDef::default()
            }],
            ..GameDef::default()
        }
    }

    #[test]
    fn minimal_game_is_valid() {
        assert!(validate_game(&minimal()).is_empty());
    }

    #[test]
    fn dangling_task_reference_is_reported() {
        let mut game = minimal();
        game.tasks.push(TaskDef {
            actions: vec![TaskAction::SetTask {
                task: 4,
                mode: SetTaskMode::Set,
            }],
            ..TaskDef::default()
        });
        let errors = validate_game(&game);
        assert_eq!(
            errors,
            vec![ValidationError::MissingReference {
                kind: "task",
                index: 4,
                context: "task #0".into()
            }]
        );
    }

    #[test]
    fn duplicate_variable_names_are_defects() {
        let mut game = minimal();
        for _ in 0..2 {
            game.variables.push(VariableDef {
                name: "count".into(),
                kind: VariableKind::Integer,
                initial: "0".into(),
            });
        }
        let errors = validate_game(&game);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateName { .. })));
    }

    #[test]
    fn walk_legs_need_positive_durations() {
        let mut game = minimal();
        game.npcs.push(NpcDef {
            name: "Gus".into(),
            walks: vec![WalkDef {
                legs: vec![WalkLeg {
                    destination: WalkDestination::Room(0),
                    duration: 0,
                }],
                ..WalkDef::default()
            }],
            ..NpcDef::default()
        });
        let errors = validate_game(&game);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("must be positive"));
    }

    #[test]
    fn walk_total_duration_must_fit() {
        let mut game = minimal();
        let leg = WalkLeg {
            destination: WalkDestination::Room(0),
            duration: i32::MAX,
        };
        game.npcs.push(NpcDef {
            name: "Gus".into(),
            walks: vec![WalkDef {
                legs: vec![leg, leg],
                ..WalkDef::default()
            }],
            ..NpcDef::default()
        });
        let errors = validate_game(&game);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("total duration is too long"));
    }

    #[test]
    fn unknown_variable_in_restriction() {
        let mut game = minimal();
        game.tasks.push(TaskDef {
            restrictions: vec![RestrictionDef {
                restriction: Restriction::Variable {
                    variable: VariableSelector::Named("ghost".into()),
                    test: VariableTest::Int {
                        op: IntOp::Equal,
                        operand: IntOperand::Literal(1),
                    },
                },
                fail_message: None,
            }],
            ..TaskDef::default()
        });
        let errors = validate_game(&game);
        assert!(matches!(&errors[0], ValidationError::UnknownVariable { name, .. } if name == "ghost"));
    }
}
