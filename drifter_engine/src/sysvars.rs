//! Computed system variables.
//!
//! These are never stored: each lookup derives its value from the current state and the game
//! definition. User variables with the same name win over system ones.

use drifter_data::GameDef;

use crate::state::GameState;
use crate::vars::{ENGINE_VERSION_NUMBER, VarError, VarValue};

/// Look up a variable by name: user variables first, then the computed system values.
///
/// # Errors
/// Fails only when neither a user variable nor a system variable matches.
pub fn lookup(def: &GameDef, state: &GameState, name: &str) -> Result<VarValue, VarError> {
    if let Some(value) = state.vars.get(name) {
        return Ok(value.clone());
    }
    system_variable(def, state, name).ok_or_else(|| VarError::Unknown(name.to_string()))
}

fn system_variable(def: &GameDef, state: &GameState, name: &str) -> Option<VarValue> {
    let vars = &state.vars;
    let text = |s: String| Some(VarValue::Text(s));
    let ref_gender = vars
        .ref_character
        .and_then(|npc| def.npcs.get(npc))
        .map_or(drifter_data::Gender::Neuter, |npc| npc.gender);
    let ref_object = vars.ref_object.and_then(|obj| def.objects.get(obj).map(|o| (obj, o)));

    match name {
        "author" => text(def.header.author.clone()),
        "character" => text(
            vars.ref_character
                .and_then(|npc| def.npcs.get(npc))
                .map_or_else(|| "[character]".to_string(), drifter_data::NpcDef::full_name),
        ),
        "heshe" => text(ref_gender.subject().into()),
        "himher" => text(ref_gender.object().into()),
        "hisher" => text(ref_gender.possessive().into()),
        "maxscore" => Some(VarValue::Integer(def.max_score())),
        "modified" => text(def.header.compile_date.clone()),
        "number" => Some(VarValue::Integer(vars.ref_number)),
        "object" => text(ref_object.map_or_else(|| "[object]".to_string(), |(_, o)| o.full_name())),
        "obstate" => text(ref_object.map_or_else(String::new, |(obj, o)| {
            let current = state.objects[obj].state;
            usize::try_from(current - 1)
                .ok()
                .and_then(|idx| o.states.get(idx))
                .cloned()
                .unwrap_or_default()
        })),
        "obstatus" => text(ref_object.map_or_else(String::new, |(obj, o)| {
            if o.is_openable() {
                openness_word(state.objects[obj].openness).to_string()
            } else {
                String::new()
            }
        })),
        "player" => text(def.player.name.clone()),
        "room" => text(
            def.rooms
                .get(state.player.room)
                .map(|room| room.short.clone())
                .unwrap_or_default(),
        ),
        "score" => Some(VarValue::Integer(state.score)),
        "text" => text(vars.ref_text.clone()),
        "theobject" => text(ref_object.map_or_else(|| "[object]".to_string(), |(obj, _)| definite_name(def, obj))),
        "time" => Some(VarValue::Integer(vars.elapsed_seconds())),
        "title" => text(def.header.name.clone()),
        "turns" => Some(VarValue::Integer(i64::from(state.turns))),
        "version" => Some(VarValue::Integer(ENGINE_VERSION_NUMBER)),
        _ => prefixed_variable(def, state, name),
    }
}

/// System variables whose names embed an argument: `in_<obj>`, `on_<obj>`, `onin_<obj>`,
/// and `t_<integer variable>`.
fn prefixed_variable(def: &GameDef, state: &GameState, name: &str) -> Option<VarValue> {
    if let Some(var) = name.strip_prefix("t_") {
        let value = state.vars.get(var)?.as_integer()?;
        return Some(VarValue::Text(number_in_words(value)));
    }
    let (suffix, inside, on_top) = if let Some(rest) = name.strip_prefix("onin_") {
        (rest, true, true)
    } else if let Some(rest) = name.strip_prefix("in_") {
        (rest, true, false)
    } else if let Some(rest) = name.strip_prefix("on_") {
        (rest, false, true)
    } else {
        return None;
    };
    let parent = find_object(def, suffix)?;
    let mut listed = Vec::new();
    if on_top {
        listed.extend(state.contents(parent, true));
    }
    if inside {
        listed.extend(state.contents(parent, false));
    }
    Some(VarValue::Text(list_objects(def, &listed)))
}

/// Match an object by short name; underscores in the query stand in for spaces.
fn find_object(def: &GameDef, query: &str) -> Option<usize> {
    let wanted = query.replace('_', " ");
    def.objects
        .iter()
        .position(|obj| obj.short.eq_ignore_ascii_case(&wanted))
}

/// "a lamp is", "a lamp and some coins are", or "nothing".
pub fn list_objects(def: &GameDef, objects: &[usize]) -> String {
    let Some((last, rest)) = objects.split_last() else {
        return "nothing".to_string();
    };
    let mut out = String::new();
    for (n, obj) in rest.iter().enumerate() {
        if n > 0 {
            out.push_str(", ");
        }
        out.push_str(&indefinite_name(def, *obj));
    }
    if !rest.is_empty() {
        out.push_str(" and ");
    }
    out.push_str(&indefinite_name(def, *last));
    let verb = if rest.is_empty() && !appears_plural(def, *last) {
        "is"
    } else {
        "are"
    };
    format!("{out} {verb}")
}

/// Object name with its authored prefix, or "a" when it has none.
pub fn indefinite_name(def: &GameDef, obj: usize) -> String {
    def.objects.get(obj).map_or_else(String::new, |o| {
        if o.prefix.is_empty() {
            format!("a {}", o.short)
        } else {
            format!("{} {}", o.prefix, o.short)
        }
    })
}

/// Object name with any leading indefinite article swapped for "the".
pub fn definite_name(def: &GameDef, obj: usize) -> String {
    let Some(o) = def.objects.get(obj) else {
        return String::new();
    };
    let prefix = o.prefix.trim();
    let remainder = ["a", "an", "the", "some"]
        .iter()
        .find_map(|article| strip_word(prefix, article))
        .unwrap_or(prefix);
    let short = ["a", "an", "the", "some"]
        .iter()
        .find_map(|article| strip_word(&o.short, article))
        .unwrap_or(&o.short);
    if remainder.is_empty() {
        format!("the {short}")
    } else {
        format!("the {remainder} {short}")
    }
}

fn strip_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let head = text.get(..word.len())?;
    if !head.eq_ignore_ascii_case(word) {
        return None;
    }
    let rest = &text[word.len()..];
    if rest.is_empty() {
        Some(rest)
    } else if rest.starts_with(' ') {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Guess whether an object's display name reads as plural.
pub fn appears_plural(def: &GameDef, obj: usize) -> bool {
    let Some(o) = def.objects.get(obj) else {
        return false;
    };
    let prefix = o.prefix.trim().to_ascii_lowercase();
    if prefix == "some" || prefix.starts_with("some ") {
        return true;
    }
    if prefix == "a" || prefix == "an" || prefix.starts_with("a ") || prefix.starts_with("an ") {
        return false;
    }
    let short = o.short.trim().to_ascii_lowercase();
    short.ends_with('s') && !short.ends_with("ss")
}

fn openness_word(openness: drifter_data::Openness) -> &'static str {
    match openness {
        drifter_data::Openness::Open | drifter_data::Openness::WontClose => "open",
        drifter_data::Openness::Closed => "closed",
        drifter_data::Openness::Locked => "locked",
    }
}

const UNITS: [&str; 20] = [
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];
const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

/// Spell out an integer in English words; values of a million and up stay as digits.
pub fn number_in_words(value: i64) -> String {
    if value < 0 {
        return format!("minus {}", number_in_words(value.saturating_neg()));
    }
    if value >= 1_000_000 {
        return value.to_string();
    }
    let value = usize::try_from(value).unwrap_or(0);
    if value >= 1000 {
        let (thousands, rest) = (value / 1000, value % 1000);
        let head = format!("{} thousand", below_thousand(thousands));
        return match rest {
            0 => head,
            1..=99 => format!("{head} and {}", below_thousand(rest)),
            _ => format!("{head} {}", below_thousand(rest)),
        };
    }
    below_thousand(value)
}

fn below_thousand(value: usize) -> String {
    match value {
        0..=19 => UNITS[value].to_string(),
        20..=99 => {
            let (tens, units) = (value / 10, value % 10);
            if units == 0 {
                TENS[tens].to_string()
            } else {
                format!("{}-{}", TENS[tens], UNITS[units])
            }
        },
        _ => {
            let (hundreds, rest) = (value / 100, value % 100);
            if rest == 0 {
                format!("{} hundred", UNITS[hundreds])
            } else {
                format!("{} hundred and {}", UNITS[hundreds], below_thousand(rest))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drifter_data::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn game() -> GameDef {
        GameDef {
            header: HeaderDef {
                name: "Lighthouse".into(),
                author: "R. Keeper".into(),
                compile_date: "2004-05-01".into(),
                ..HeaderDef::default()
            },
            player: PlayerDef {
                name: "Ada".into(),
                ..PlayerDef::default()
            },
            rooms: vec![RoomDef {
                short: "Lamp Room".into(),
                ..RoomDef::default()
            }],
            objects: vec![
                ObjectDef {
                    prefix: "a".into(),
                    short: "wooden table".into(),
                    surface: true,
                    placement: ObjectPlacement::Dynamic {
                        initial: Position::InRoom(0),
                    },
                    ..ObjectDef::default()
                },
                ObjectDef {
                    prefix: "some".into(),
                    short: "matches".into(),
                    placement: ObjectPlacement::Dynamic {
                        initial: Position::OnObject(0),
                    },
                    ..ObjectDef::default()
                },
                ObjectDef {
                    prefix: "an".into(),
                    short: "oil can".into(),
                    openable: Openness::Closed,
                    states: vec!["empty".into(), "full".into()],
                    initial_state: 2,
                    placement: ObjectPlacement::Dynamic {
                        initial: Position::Hidden,
                    },
                    ..ObjectDef::default()
                },
            ],
            npcs: vec![NpcDef {
                name: "Mara".into(),
                gender: Gender::Female,
                ..NpcDef::default()
            }],
            tasks: vec![TaskDef {
                actions: vec![TaskAction::ChangeScore(25)],
                ..TaskDef::default()
            }],
            variables: vec![VariableDef {
                name: "lamps".into(),
                kind: VariableKind::Integer,
                initial: "42".into(),
            }],
            ..GameDef::default()
        }
    }

    fn state(def: &GameDef) -> GameState {
        GameState::new(def, &mut StdRng::seed_from_u64(0)).unwrap()
    }

    fn text(def: &GameDef, state: &GameState, name: &str) -> String {
        lookup(def, state, name).unwrap().to_string()
    }

    #[test]
    fn header_and_player_values() {
        let def = game();
        let state = state(&def);
        assert_eq!(text(&def, &state, "title"), "Lighthouse");
        assert_eq!(text(&def, &state, "author"), "R. Keeper");
        assert_eq!(text(&def, &state, "modified"), "2004-05-01");
        assert_eq!(text(&def, &state, "player"), "Ada");
        assert_eq!(text(&def, &state, "room"), "Lamp Room");
        assert_eq!(lookup(&def, &state, "maxscore"), Ok(VarValue::Integer(25)));
        assert_eq!(lookup(&def, &state, "version"), Ok(VarValue::Integer(ENGINE_VERSION_NUMBER)));
    }

    #[test]
    fn references_drive_pronouns_and_names() {
        let def = game();
        let mut state = state(&def);
        state.refer_to_npc(0);
        state.refer_to_object(2);
        state.vars.set_ref_number(7);
        state.vars.set_ref_text("xyzzy");
        assert_eq!(text(&def, &state, "character"), "Mara");
        assert_eq!(text(&def, &state, "heshe"), "she");
        assert_eq!(text(&def, &state, "hisher"), "her");
        assert_eq!(text(&def, &state, "object"), "an oil can");
        assert_eq!(text(&def, &state, "theobject"), "the oil can");
        assert_eq!(text(&def, &state, "obstate"), "full");
        assert_eq!(text(&def, &state, "obstatus"), "closed");
        assert_eq!(lookup(&def, &state, "number"), Ok(VarValue::Integer(7)));
        assert_eq!(text(&def, &state, "text"), "xyzzy");
    }

    #[test]
    fn container_listings() {
        let def = game();
        let mut state = state(&def);
        assert_eq!(text(&def, &state, "on_wooden_table"), "some matches are");
        assert_eq!(text(&def, &state, "in_wooden_table"), "nothing");
        state.move_onto(2, 0);
        assert_eq!(text(&def, &state, "onin_wooden_table"), "some matches and an oil can are");
        state.make_hidden(1);
        assert_eq!(text(&def, &state, "on_wooden_table"), "an oil can is");
    }

    #[test]
    fn user_variables_shadow_system_ones() {
        let def = game();
        let mut state = state(&def);
        assert_eq!(text(&def, &state, "t_lamps"), "forty-two");
        state.vars.put_text("room", "shadowed").unwrap();
        assert_eq!(text(&def, &state, "room"), "shadowed");
        assert_eq!(state.vars.get("room").map(VarValue::kind), Some(VariableKind::Text));
        assert!(matches!(lookup(&def, &state, "nonesuch"), Err(VarError::Unknown(_))));
    }

    #[test]
    fn numbers_in_words() {
        assert_eq!(number_in_words(0), "zero");
        assert_eq!(number_in_words(13), "thirteen");
        assert_eq!(number_in_words(70), "seventy");
        assert_eq!(number_in_words(-5), "minus five");
        assert_eq!(number_in_words(305), "three hundred and five");
        assert_eq!(number_in_words(2001), "two thousand and one");
        assert_eq!(number_in_words(12_345), "twelve thousand three hundred and forty-five");
        assert_eq!(number_in_words(5_000_000), "5000000");
    }

    #[test]
    fn plural_guessing() {
        let def = game();
        assert!(!appears_plural(&def, 0));
        assert!(appears_plural(&def, 1));
        assert!(!appears_plural(&def, 2));
    }
}
