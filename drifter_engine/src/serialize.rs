//! Saved game format.
//!
//! A save is a sequence of CRLF-terminated ASCII fields, one per line, in a fixed order:
//!
//! 1. header: game name, room/object/task/event/NPC counts, score, player room, player
//!    posture, player parent (`-1` for none), then four encumbrance sentinels
//! 2. rooms: visited
//! 3. objects: position code, parent (`-1` for none), seen, openness (openable objects only),
//!    state (stateful objects only), unmoved, static unmoved (static objects only)
//! 4. tasks: done, scored
//! 5. events: time, status code
//! 6. NPCs: location (room + 1, `0` hidden), posture, parent, seen, one counter per walk
//! 7. variables in declaration order, then elapsed seconds and the turn count
//!
//! Booleans are written as `-1`/`0` and read as "nonzero is true".

use std::io::{self, BufRead, Lines, Write};

use drifter_data::{Character, GameDef, Openness, Position, VariableKind};
use log::trace;
use thiserror::Error;

use crate::state::{EventStatus, GameState, Posture};
use crate::vars::VarValue;

/// Encumbrance is derived from object sizes when needed; saves carry fixed values.
const ENCUMBRANCE_SENTINELS: [i64; 4] = [90, 0, 90, 0];

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save stream I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("save data ends early")]
    Truncated,
    #[error("line {line}: cannot read \"{text}\"")]
    Parse { line: usize, text: String },
    #[error("save belongs to \"{found}\", not \"{expected}\"")]
    NameMismatch { expected: String, found: String },
    #[error("save has {found} {what}, game has {expected}")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid {what} {code}")]
    InvalidCode { line: usize, what: &'static str, code: i64 },
}

struct FieldWriter<'a, W: Write> {
    out: &'a mut W,
    trace: bool,
}

impl<W: Write> FieldWriter<'_, W> {
    fn text(&mut self, value: &str) -> io::Result<()> {
        if self.trace {
            trace!("save <- {value}");
        }
        write!(self.out, "{value}\r\n")
    }

    fn int(&mut self, value: i64) -> io::Result<()> {
        self.text(&value.to_string())
    }

    fn flag(&mut self, value: bool) -> io::Result<()> {
        self.int(if value { -1 } else { 0 })
    }

    fn index(&mut self, value: Option<usize>) -> io::Result<()> {
        self.int(value.map_or(-1, to_i64))
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

struct FieldReader<R: BufRead> {
    lines: Lines<R>,
    line: usize,
    trace: bool,
}

impl<R: BufRead> FieldReader<R> {
    fn text(&mut self) -> Result<String, SaveError> {
        let line = self.lines.next().ok_or(SaveError::Truncated)??;
        self.line += 1;
        let value = line.trim_end_matches('\r').to_string();
        if self.trace {
            trace!("save -> {value}");
        }
        Ok(value)
    }

    fn int(&mut self) -> Result<i64, SaveError> {
        let text = self.text()?;
        text.trim().parse().map_err(|_| SaveError::Parse { line: self.line, text })
    }

    fn int32(&mut self) -> Result<i32, SaveError> {
        let value = self.int()?;
        i32::try_from(value).map_err(|_| self.invalid("number", value))
    }

    fn flag(&mut self) -> Result<bool, SaveError> {
        Ok(self.int()? != 0)
    }

    fn count(&mut self, what: &'static str, expected: usize) -> Result<(), SaveError> {
        let value = self.int()?;
        let found = usize::try_from(value).map_err(|_| self.invalid("count", value))?;
        if found == expected {
            Ok(())
        } else {
            Err(SaveError::CountMismatch { what, expected, found })
        }
    }

    /// An index below `limit`, or `None` for `-1`.
    fn index(&mut self, what: &'static str, limit: usize) -> Result<Option<usize>, SaveError> {
        let value = self.int()?;
        if value == -1 {
            return Ok(None);
        }
        match usize::try_from(value) {
            Ok(idx) if idx < limit => Ok(Some(idx)),
            _ => Err(self.invalid(what, value)),
        }
    }

    fn required_index(&mut self, what: &'static str, limit: usize) -> Result<usize, SaveError> {
        let line = self.line + 1;
        self.index(what, limit)?
            .ok_or(SaveError::InvalidCode { line, what, code: -1 })
    }

    fn posture(&mut self) -> Result<Posture, SaveError> {
        let code = self.int32()?;
        Posture::from_code(code).ok_or_else(|| self.invalid("posture", i64::from(code)))
    }

    fn invalid(&self, what: &'static str, code: i64) -> SaveError {
        SaveError::InvalidCode {
            line: self.line,
            what,
            code,
        }
    }
}

fn position_code(position: Position) -> (i64, Option<usize>) {
    match position {
        Position::Hidden => (0, None),
        Position::HeldByPlayer => (1, None),
        Position::HeldByNpc(npc) => (2, Some(npc)),
        Position::WornByPlayer => (3, None),
        Position::WornByNpc(npc) => (4, Some(npc)),
        Position::PartOf(Character::Player) => (5, None),
        Position::PartOf(Character::Npc(npc)) => (5, Some(npc)),
        Position::OnObject(obj) => (6, Some(obj)),
        Position::InObject(obj) => (7, Some(obj)),
        Position::InRoom(room) => (8, Some(room)),
    }
}

/// Write `state` to `out`.
///
/// # Errors
/// Only I/O errors from `out`.
pub fn save_game<W: Write>(def: &GameDef, state: &GameState, out: &mut W, trace: bool) -> Result<(), SaveError> {
    let mut w = FieldWriter { out, trace };

    w.text(&def.header.name)?;
    for count in [
        state.rooms.len(),
        state.objects.len(),
        state.tasks.len(),
        state.events.len(),
        state.npcs.len(),
    ] {
        w.int(to_i64(count))?;
    }
    w.int(state.score)?;
    w.int(to_i64(state.player.room))?;
    w.int(i64::from(state.player.posture.code()))?;
    w.index(state.player.parent)?;
    for sentinel in ENCUMBRANCE_SENTINELS {
        w.int(sentinel)?;
    }

    for room in &state.rooms {
        w.flag(room.visited)?;
    }

    for (obj, object) in state.objects.iter().enumerate() {
        let (code, parent) = position_code(object.position);
        w.int(code)?;
        w.index(parent)?;
        w.flag(object.seen)?;
        let obj_def = &def.objects[obj];
        if obj_def.is_openable() {
            w.int(i64::from(object.openness.code()))?;
        }
        if obj_def.is_stateful() {
            w.int(i64::from(object.state))?;
        }
        w.flag(object.unmoved)?;
        if obj_def.is_static() {
            w.flag(object.static_unmoved)?;
        }
    }

    for task in &state.tasks {
        w.flag(task.done)?;
        w.flag(task.scored)?;
    }

    for event in &state.events {
        w.int(i64::from(event.time))?;
        w.int(i64::from(event.status.code() - 1))?;
    }

    for npc in &state.npcs {
        w.int(npc.location.map_or(0, |room| to_i64(room) + 1))?;
        w.int(i64::from(npc.posture.code()))?;
        w.index(npc.parent)?;
        w.flag(npc.seen)?;
        for steps in &npc.walksteps {
            w.int(i64::from(*steps))?;
        }
    }

    for var in &def.variables {
        match state.vars.get(&var.name) {
            Some(VarValue::Integer(value)) => w.int(*value)?,
            Some(VarValue::Text(text)) => w.text(text)?,
            None => w.text("")?,
        }
    }
    w.int(state.vars.elapsed_seconds())?;
    w.int(i64::from(state.turns))?;
    w.out.flush()?;
    Ok(())
}

/// Restore a saved game into `live`.
///
/// The save is read into a scratch copy of `live`, which replaces it only once every field
/// has been read and checked. On error `live` is left exactly as it was. Display settings,
/// pending resources and reference context are not part of a save and keep their current
/// values.
///
/// # Errors
/// Truncated or unparsable data, a save from another game, or out-of-range codes.
pub fn load_game<R: BufRead>(def: &GameDef, live: &mut GameState, input: R, trace: bool) -> Result<(), SaveError> {
    let mut r = FieldReader {
        lines: input.lines(),
        line: 0,
        trace,
    };
    let mut scratch = live.clone();

    let name = r.text()?;
    if name != def.header.name {
        return Err(SaveError::NameMismatch {
            expected: def.header.name.clone(),
            found: name,
        });
    }
    r.count("rooms", def.rooms.len())?;
    r.count("objects", def.objects.len())?;
    r.count("tasks", def.tasks.len())?;
    r.count("events", def.events.len())?;
    r.count("NPCs", def.npcs.len())?;

    let (rooms, objects, npcs) = (def.rooms.len(), def.objects.len(), def.npcs.len());
    scratch.score = r.int()?;
    scratch.player.room = r.required_index("room", rooms)?;
    scratch.player.posture = r.posture()?;
    scratch.player.parent = r.index("object", objects)?;
    for _ in ENCUMBRANCE_SENTINELS {
        r.int()?;
    }

    for room in &mut scratch.rooms {
        room.visited = r.flag()?;
    }

    for (obj, object) in scratch.objects.iter_mut().enumerate() {
        let code = r.int()?;
        let position = match code {
            0 => {
                r.int()?;
                Position::Hidden
            },
            1 => {
                r.int()?;
                Position::HeldByPlayer
            },
            2 => Position::HeldByNpc(r.required_index("NPC", npcs)?),
            3 => {
                r.int()?;
                Position::WornByPlayer
            },
            4 => Position::WornByNpc(r.required_index("NPC", npcs)?),
            5 => match r.index("NPC", npcs)? {
                Some(npc) => Position::PartOf(Character::Npc(npc)),
                None => Position::PartOf(Character::Player),
            },
            6 => Position::OnObject(r.required_index("object", objects)?),
            7 => Position::InObject(r.required_index("object", objects)?),
            8 => Position::InRoom(r.required_index("room", rooms)?),
            _ => return Err(r.invalid("position", code)),
        };
        object.position = position;
        object.seen = r.flag()?;
        let obj_def = &def.objects[obj];
        if obj_def.is_openable() {
            let code = r.int32()?;
            object.openness = Openness::from_code(code).ok_or_else(|| r.invalid("openness", i64::from(code)))?;
        }
        if obj_def.is_stateful() {
            object.state = r.int32()?;
        }
        object.unmoved = r.flag()?;
        if obj_def.is_static() {
            object.static_unmoved = r.flag()?;
        }
    }

    for task in &mut scratch.tasks {
        task.done = r.flag()?;
        task.scored = r.flag()?;
    }

    for event in &mut scratch.events {
        event.time = r.int32()?;
        let code = r.int32()?;
        event.status = code
            .checked_add(1)
            .and_then(EventStatus::from_code)
            .ok_or_else(|| r.invalid("event status", i64::from(code)))?;
    }

    for npc in &mut scratch.npcs {
        let location = r.int()?;
        npc.location = match location {
            0 => None,
            room => match room.checked_sub(1).map(usize::try_from) {
                Some(Ok(room)) if room < rooms => Some(room),
                _ => return Err(r.invalid("room", location)),
            },
        };
        npc.posture = r.posture()?;
        npc.parent = r.index("object", objects)?;
        npc.seen = r.flag()?;
        for steps in &mut npc.walksteps {
            *steps = r.int32()?;
        }
    }

    for var in &def.variables {
        let value = match var.kind {
            VariableKind::Integer => VarValue::Integer(r.int()?),
            VariableKind::Text => VarValue::Text(r.text()?),
        };
        let line = r.line;
        scratch
            .vars
            .put(&var.name, value)
            .map_err(|_| SaveError::Parse { line, text: var.name.clone() })?;
    }
    let elapsed = r.int()?;
    let turns = r.int()?;
    scratch.turns = u32::try_from(turns).map_err(|_| r.invalid("turn count", turns))?;

    scratch.vars.set_elapsed_seconds(elapsed);
    scratch.is_running = true;
    scratch.has_completed = false;
    *live = scratch;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use drifter_data::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn def() -> GameDef {
        GameDef {
            header: HeaderDef {
                name: "Saved".into(),
                ..HeaderDef::default()
            },
            rooms: vec![RoomDef::default(), RoomDef::default()],
            objects: vec![
                ObjectDef {
                    short: "box".into(),
                    openable: Openness::Closed,
                    container: true,
                    ..ObjectDef::default()
                },
                ObjectDef {
                    short: "statue".into(),
                    placement: ObjectPlacement::Static {
                        rooms: RoomList::OneRoom(0),
                    },
                    ..ObjectDef::default()
                },
            ],
            variables: vec![
                VariableDef {
                    name: "count".into(),
                    kind: VariableKind::Integer,
                    initial: "3".into(),
                },
                VariableDef {
                    name: "motto".into(),
                    kind: VariableKind::Text,
                    initial: "onward".into(),
                },
            ],
            ..GameDef::default()
        }
    }

    fn state(def: &GameDef) -> GameState {
        GameState::new(def, &mut StdRng::seed_from_u64(0)).unwrap()
    }

    fn saved(def: &GameDef, state: &GameState) -> String {
        let mut out = Vec::new();
        save_game(def, state, &mut out, false).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn header_layout() {
        let def = def();
        let text = saved(&def, &state(&def));
        let lines: Vec<&str> = text.split("\r\n").collect();
        assert_eq!(&lines[..14], ["Saved", "2", "2", "0", "0", "0", "0", "0", "0", "-1", "90", "0", "90", "0"]);
        assert!(text.ends_with("\r\n"));
    }

    #[test]
    fn object_fields_depend_on_kind() {
        let def = def();
        let mut state = state(&def);
        state.objects[0].position = Position::InRoom(1);
        let text = saved(&def, &state);
        let lines: Vec<&str> = text.split("\r\n").collect();
        // rooms at 14..16, box at 16..21, statue at 21..26
        assert_eq!(&lines[16..21], ["8", "1", "0", "6", "-1"]);
        assert_eq!(&lines[21..26], ["0", "-1", "0", "-1", "-1"]);
    }

    #[test]
    fn round_trip_restores_fields() {
        let def = def();
        let mut original = state(&def);
        original.score = 12;
        original.turns = 9;
        original.rooms[1].visited = true;
        original.objects[0].openness = Openness::Open;
        original.objects[1].static_unmoved = false;
        original.objects[1].position = Position::OnObject(0);
        original.vars.put_integer("count", -4).unwrap();
        original.vars.put_text("motto", "never give up").unwrap();
        let text = saved(&def, &original);

        let mut restored = state(&def);
        load_game(&def, &mut restored, text.as_bytes(), false).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn crlf_and_lf_both_load() {
        let def = def();
        let original = state(&def);
        let text = saved(&def, &original).replace("\r\n", "\n");
        let mut restored = state(&def);
        load_game(&def, &mut restored, text.as_bytes(), false).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn wrong_game_is_refused() {
        let def = def();
        let text = saved(&def, &state(&def)).replacen("Saved", "Other", 1);
        let mut live = state(&def);
        live.score = 5;
        let before = live.clone();
        let err = load_game(&def, &mut live, text.as_bytes(), false).unwrap_err();
        assert!(matches!(err, SaveError::NameMismatch { .. }));
        assert_eq!(live, before);
    }

    #[test]
    fn truncated_save_is_refused() {
        let def = def();
        let text = saved(&def, &state(&def));
        let cut: Vec<&str> = text.split("\r\n").take(20).collect();
        let mut live = state(&def);
        live.score = 5;
        let before = live.clone();
        let err = load_game(&def, &mut live, cut.join("\r\n").as_bytes(), false).unwrap_err();
        assert!(matches!(err, SaveError::Truncated));
        assert_eq!(live, before);
    }

    #[test]
    fn bad_position_code_is_refused() {
        let def = def();
        let text = saved(&def, &state(&def));
        let mut lines: Vec<&str> = text.split("\r\n").collect();
        lines[16] = "12";
        let mut live = state(&def);
        let err = load_game(&def, &mut live, lines.join("\r\n").as_bytes(), false).unwrap_err();
        assert!(matches!(err, SaveError::InvalidCode { what: "position", code: 12, .. }));
    }

    fn with_event_and_npc() -> GameDef {
        GameDef {
            events: vec![EventDef::default()],
            npcs: vec![NpcDef::default()],
            ..def()
        }
    }

    #[test]
    fn extreme_event_status_is_refused() {
        let def = with_event_and_npc();
        let text = saved(&def, &state(&def));
        let mut lines: Vec<&str> = text.split("\r\n").collect();
        // event time at 26, status at 27
        lines[27] = "2147483647";
        let mut live = state(&def);
        let before = live.clone();
        let err = load_game(&def, &mut live, lines.join("\r\n").as_bytes(), false).unwrap_err();
        assert!(matches!(
            err,
            SaveError::InvalidCode {
                what: "event status",
                code: 2_147_483_647,
                ..
            }
        ));
        assert_eq!(live, before);
    }

    #[test]
    fn extreme_npc_location_is_refused() {
        let def = with_event_and_npc();
        let text = saved(&def, &state(&def));
        let mut lines: Vec<&str> = text.split("\r\n").collect();
        let min = i64::MIN.to_string();
        lines[28] = &min;
        let mut live = state(&def);
        let err = load_game(&def, &mut live, lines.join("\r\n").as_bytes(), false).unwrap_err();
        assert!(matches!(err, SaveError::InvalidCode { what: "room", code: i64::MIN, .. }));
    }
}
