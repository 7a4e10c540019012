use serde::{Deserialize, Serialize};

/// Top-level compiled game data loaded by the engine.
///
/// Entity references are plain indices into the sibling vectors (`rooms`, `objects`, ...).
/// `validate_game` checks every one of them before the engine is allowed to run the game.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GameDef {
    pub header: HeaderDef,
    pub player: PlayerDef,
    #[serde(default)]
    pub rooms: Vec<RoomDef>,
    #[serde(default)]
    pub room_groups: Vec<RoomGroupDef>,
    #[serde(default)]
    pub objects: Vec<ObjectDef>,
    #[serde(default)]
    pub tasks: Vec<TaskDef>,
    #[serde(default)]
    pub events: Vec<EventDef>,
    #[serde(default)]
    pub npcs: Vec<NpcDef>,
    #[serde(default)]
    pub variables: Vec<VariableDef>,
}

impl GameDef {
    /// Sum of every positive score change any task can award.
    pub fn max_score(&self) -> i64 {
        self.tasks
            .iter()
            .flat_map(|task| task.actions.iter())
            .filter_map(|action| match action {
                TaskAction::ChangeScore(points) if *points > 0 => Some(*points),
                _ => None,
            })
            .sum()
    }

    /// Look up a variable definition index by name.
    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|var| var.name == name)
    }
}

/// Game-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HeaderDef {
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub version: DataVersion,
    #[serde(default)]
    pub compile_date: String,
    #[serde(default)]
    pub startup_text: String,
}

/// Data format generation the game was compiled with.
///
/// Older generations carry a few scheduling quirks that must be reproduced exactly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum DataVersion {
    V380,
    V390,
    #[default]
    V400,
}

impl DataVersion {
    pub fn is_legacy(self) -> bool {
        matches!(self, DataVersion::V380 | DataVersion::V390)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlayerDef {
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub start_room: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum Gender {
    #[default]
    Male,
    Female,
    Neuter,
}

impl Gender {
    pub fn subject(self) -> &'static str {
        match self {
            Gender::Male => "he",
            Gender::Female => "she",
            Gender::Neuter => "it",
        }
    }

    pub fn object(self) -> &'static str {
        match self {
            Gender::Male => "him",
            Gender::Female => "her",
            Gender::Neuter => "it",
        }
    }

    pub fn possessive(self) -> &'static str {
        match self {
            Gender::Male => "his",
            Gender::Female => "her",
            Gender::Neuter => "its",
        }
    }
}

/// Compass and vertical exit directions, in authored exit-table order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
    Up,
    Down,
    In,
    Out,
    NorthEast,
    SouthEast,
    SouthWest,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 12] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::Up,
        Direction::Down,
        Direction::In,
        Direction::Out,
        Direction::NorthEast,
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::NorthWest,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::In => "in",
            Direction::Out => "out",
            Direction::NorthEast => "northeast",
            Direction::SouthEast => "southeast",
            Direction::SouthWest => "southwest",
            Direction::NorthWest => "northwest",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoomDef {
    pub short: String,
    #[serde(default)]
    pub long: String,
    #[serde(default)]
    pub exits: Vec<ExitDef>,
}

impl RoomDef {
    /// First exit direction that leads to `destination`, if any.
    pub fn exit_to(&self, destination: usize) -> Option<Direction> {
        self.exits
            .iter()
            .find(|exit| exit.destination == destination)
            .map(|exit| exit.direction)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitDef {
    pub direction: Direction,
    pub destination: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoomGroupDef {
    pub name: String,
    pub rooms: Vec<usize>,
}

/// Authored set of rooms something applies to.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum RoomList {
    #[default]
    NoRooms,
    AllRooms,
    OneRoom(usize),
    /// Membership flags indexed by room.
    SomeRooms(Vec<bool>),
}

impl RoomList {
    pub fn contains(&self, room: usize) -> bool {
        match self {
            RoomList::NoRooms => false,
            RoomList::AllRooms => true,
            RoomList::OneRoom(only) => *only == room,
            RoomList::SomeRooms(flags) => flags.get(room).copied().unwrap_or(false),
        }
    }
}

/// Someone who can hold, wear, or be part of things.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Character {
    Player,
    Npc(usize),
}

/// Where an object currently is. Parents live inside the variant that needs one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
pub enum Position {
    #[default]
    Hidden,
    HeldByPlayer,
    HeldByNpc(usize),
    WornByPlayer,
    WornByNpc(usize),
    PartOf(Character),
    OnObject(usize),
    InObject(usize),
    InRoom(usize),
}

/// Open/close status codes; the numeric values are the ones stored in save files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum Openness {
    #[default]
    WontClose = 0,
    Open = 5,
    Closed = 6,
    Locked = 7,
}

impl Openness {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Openness::WontClose),
            5 => Some(Openness::Open),
            6 => Some(Openness::Closed),
            7 => Some(Openness::Locked),
            _ => None,
        }
    }

    /// Whether things inside can be seen and reached.
    pub fn is_see_through(self) -> bool {
        matches!(self, Openness::Open | Openness::WontClose)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ObjectPlacement {
    /// Scenery fixed to a set of rooms.
    Static { rooms: RoomList },
    /// Scenery attached to a character.
    StaticPartOf(Character),
    /// Portable object starting at the given position.
    Dynamic { initial: Position },
}

impl Default for ObjectPlacement {
    fn default() -> Self {
        ObjectPlacement::Dynamic {
            initial: Position::Hidden,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObjectDef {
    #[serde(default)]
    pub prefix: String,
    pub short: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub placement: ObjectPlacement,
    #[serde(default)]
    pub container: bool,
    #[serde(default)]
    pub surface: bool,
    /// `WontClose` means the object is not openable at all.
    #[serde(default)]
    pub openable: Openness,
    /// Names of the discrete states; empty for stateless objects.
    #[serde(default)]
    pub states: Vec<String>,
    /// Starting state, 1-based. Ignored when `states` is empty.
    #[serde(default)]
    pub initial_state: i32,
    /// Tens digit is the size exponent, units digit the weight exponent.
    #[serde(default)]
    pub size_weight: i32,
    /// Tens digit is the item count, units digit the largest size exponent accepted.
    #[serde(default)]
    pub capacity: i32,
}

impl ObjectDef {
    pub fn is_static(&self) -> bool {
        !matches!(self.placement, ObjectPlacement::Dynamic { .. })
    }

    pub fn is_openable(&self) -> bool {
        self.openable != Openness::WontClose
    }

    pub fn is_stateful(&self) -> bool {
        !self.states.is_empty()
    }

    /// Display name including the article or prefix.
    pub fn full_name(&self) -> String {
        if self.prefix.is_empty() {
            self.short.clone()
        } else {
            format!("{} {}", self.prefix, self.short)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResourceDef {
    #[serde(default)]
    pub sound: Option<ResourceRef>,
    #[serde(default)]
    pub graphic: Option<ResourceRef>,
    #[serde(default)]
    pub stop_sound: bool,
}

/// A media blob inside the game file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRef {
    pub name: String,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub length: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDef {
    #[serde(default)]
    pub commands: Vec<String>,
    /// Commands that run the task backwards.
    #[serde(default)]
    pub reverse_commands: Vec<String>,
    #[serde(default)]
    pub completion_text: String,
    #[serde(default)]
    pub reverse_text: String,
    #[serde(default)]
    pub repeat_text: String,
    #[serde(default)]
    pub additional_text: String,
    /// Room whose description is printed after the actions run.
    #[serde(default)]
    pub show_room: Option<usize>,
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default)]
    pub reversible: bool,
    #[serde(default)]
    pub restrictions: Vec<RestrictionDef>,
    /// Boolean combination of the restrictions; `None` means all of them must pass.
    #[serde(default)]
    pub combination: Option<String>,
    #[serde(default)]
    pub actions: Vec<TaskAction>,
    #[serde(default)]
    pub resource: Option<ResourceDef>,
    #[serde(default = "all_rooms")]
    pub rooms: RoomList,
    /// Allow positive score changes to be awarded every time the task runs.
    #[serde(default)]
    pub rescore: bool,
    #[serde(default)]
    pub hint: Option<HintDef>,
}

/// Help offered to a stuck player while the task can still be run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HintDef {
    pub question: String,
    #[serde(default)]
    pub subtle: String,
    #[serde(default)]
    pub unsubtle: String,
}

fn all_rooms() -> RoomList {
    RoomList::AllRooms
}

impl Default for TaskDef {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            reverse_commands: Vec::new(),
            completion_text: String::new(),
            reverse_text: String::new(),
            repeat_text: String::new(),
            additional_text: String::new(),
            show_room: None,
            repeatable: false,
            reversible: false,
            restrictions: Vec::new(),
            combination: None,
            actions: Vec::new(),
            resource: None,
            rooms: all_rooms(),
            rescore: false,
            hint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictionDef {
    pub restriction: Restriction,
    #[serde(default)]
    pub fail_message: Option<String>,
}

/// An atomic precondition gating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Restriction {
    ObjectLocation {
        object: ObjectSelector,
        test: LocationTest,
        #[serde(default)]
        negate: bool,
    },
    ObjectState {
        object: usize,
        test: StateTest,
    },
    TaskState {
        task: TaskSelector,
        done: bool,
    },
    Character {
        character: CharacterSelector,
        test: CharacterTest,
        #[serde(default)]
        negate: bool,
    },
    Variable {
        variable: VariableSelector,
        test: VariableTest,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ObjectSelector {
    /// No object satisfies the test.
    Nothing,
    /// At least one object satisfies the test.
    Anything,
    Referenced,
    Object(usize),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CharacterSelector {
    Player,
    Referenced,
    Npc(usize),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LocationTest {
    InRoom(usize),
    Hidden,
    HeldBy(CharacterSelector),
    WornBy(CharacterSelector),
    VisibleTo(CharacterSelector),
    Inside(usize),
    OnTopOf(usize),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StateTest {
    Open,
    Closed,
    Locked,
    /// 1-based state index.
    State(i32),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskSelector {
    All,
    Task(usize),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CharacterTest {
    SameRoomAs(CharacterSelector),
    Alone,
    StandingOn(usize),
    SittingOn(usize),
    LyingOn(usize),
    Gender(Gender),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum VariableSelector {
    ReferencedNumber,
    ReferencedText,
    Named(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum VariableTest {
    Int { op: IntOp, operand: IntOperand },
    Text { op: TextOp, value: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IntOp {
    Less,
    LessOrEqual,
    Equal,
    GreaterOrEqual,
    Greater,
    NotEqual,
}

impl IntOp {
    pub fn compare(self, left: i64, right: i64) -> bool {
        match self {
            IntOp::Less => left < right,
            IntOp::LessOrEqual => left <= right,
            IntOp::Equal => left == right,
            IntOp::GreaterOrEqual => left >= right,
            IntOp::Greater => left > right,
            IntOp::NotEqual => left != right,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum IntOperand {
    Literal(i64),
    Variable(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TextOp {
    Equal,
    NotEqual,
}

/// One step of a task's effect list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskAction {
    MoveObject {
        object: MoveSelector,
        destination: ObjectDestination,
    },
    MoveCharacter {
        character: CharacterSelector,
        destination: CharacterDestination,
    },
    ChangeObjectStatus {
        object: usize,
        status: StateTest,
    },
    ChangeVariable {
        variable: String,
        change: VariableChange,
    },
    ChangeScore(i64),
    SetTask {
        task: usize,
        mode: SetTaskMode,
    },
    EndGame(GameEnding),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MoveSelector {
    AllHeldByPlayer,
    AllWornByPlayer,
    Referenced,
    Object(usize),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ObjectDestination {
    Hidden,
    Room(usize),
    RoomGroup(usize),
    Into(usize),
    Onto(usize),
    HeldBy(CharacterSelector),
    WornBy(CharacterSelector),
    SameRoomAs(CharacterSelector),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CharacterDestination {
    Hidden,
    Room(usize),
    RoomGroup(usize),
    SameRoomAs(CharacterSelector),
    StandingOn(usize),
    SittingOn(usize),
    LyingOn(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum VariableChange {
    Set(i64),
    Add(i64),
    Random { low: i64, high: i64 },
    SetFromReferenced,
    SetFromVariable(String),
    AddVariable(String),
    SetText(String),
    SetTextFromReferenced,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SetTaskMode {
    /// Mark the task done without running it.
    Set,
    /// Redirect: run the task forwards, restrictions and all.
    Execute,
    /// Run the task backwards.
    Unset,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GameEnding {
    Win,
    Lose,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventDef {
    #[serde(default)]
    pub short: String,
    #[serde(default)]
    pub starter: EventStarter,
    #[serde(default)]
    pub restart: RestartType,
    #[serde(default)]
    pub pauser: Option<TaskCondition>,
    #[serde(default)]
    pub resumer: Option<TaskCondition>,
    #[serde(default)]
    pub time1: i32,
    #[serde(default)]
    pub time2: i32,
    #[serde(default)]
    pub start_text: String,
    #[serde(default)]
    pub finish_text: String,
    #[serde(default)]
    pub look_text: String,
    /// Messages shown while running, when the remaining time reaches `at`.
    #[serde(default)]
    pub notifications: Vec<EventNotification>,
    /// Rooms from which the event's texts can be seen.
    #[serde(default)]
    pub rooms: RoomList,
    #[serde(default)]
    pub start_move: Option<EventMove>,
    #[serde(default)]
    pub finish_moves: Vec<EventMove>,
    #[serde(default)]
    pub affected_task: Option<AffectedTask>,
    #[serde(default)]
    pub start_resource: Option<ResourceDef>,
    #[serde(default)]
    pub finish_resource: Option<ResourceDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum EventStarter {
    #[default]
    Immediate,
    Random {
        low: i32,
        high: i32,
    },
    AfterTask(usize),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum RestartType {
    #[default]
    Never,
    Immediately,
    AfterDelay,
}

/// A task completion state to watch for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskCondition {
    pub task: usize,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventNotification {
    pub at: i32,
    pub text: String,
    #[serde(default)]
    pub resource: Option<ResourceDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventMove {
    pub object: usize,
    pub destination: ObjectDestination,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AffectedTask {
    pub task: usize,
    pub forwards: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NpcDef {
    #[serde(default)]
    pub prefix: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub start_room: Option<usize>,
    #[serde(default)]
    pub show_enter_exit: bool,
    #[serde(default = "default_enter_text")]
    pub enter_text: String,
    #[serde(default = "default_leave_text")]
    pub leave_text: String,
    #[serde(default)]
    pub walks: Vec<WalkDef>,
}

fn default_enter_text() -> String {
    "enters".into()
}

fn default_leave_text() -> String {
    "leaves".into()
}

impl NpcDef {
    pub fn full_name(&self) -> String {
        if self.prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.prefix, self.name)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WalkDef {
    /// Task that switches the walk on; walks without one start with the game.
    #[serde(default)]
    pub start_task: Option<usize>,
    #[serde(default)]
    pub stopping_task: Option<TaskCondition>,
    #[serde(default)]
    pub looping: bool,
    pub legs: Vec<WalkLeg>,
    #[serde(default)]
    pub meet_character: Option<MeetCharacter>,
    #[serde(default)]
    pub meet_object: Option<MeetObject>,
}

impl WalkDef {
    /// Ticks needed to walk every leg once, saturating at `i32::MAX`.
    pub fn total_duration(&self) -> i32 {
        self.legs.iter().fold(0, |total: i32, leg| total.saturating_add(leg.duration))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalkLeg {
    pub destination: WalkDestination,
    pub duration: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WalkDestination {
    Hidden,
    FollowPlayer,
    Room(usize),
    RoomGroup(usize),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeetCharacter {
    pub character: CharacterSelector,
    pub task: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeetObject {
    pub object: usize,
    pub task: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    pub kind: VariableKind,
    #[serde(default)]
    pub initial: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VariableKind {
    Integer,
    Text,
}
