//! Object location queries and placement.
//!
//! Objects form a containment forest: things sit in rooms, on or inside other objects, or are
//! carried by characters. The queries here walk that forest to answer "is it here?" and
//! "does the player have it?". A closed container hides what is inside it; an open one (or
//! one that can't close at all) does not.

use drifter_data::{Character, GameDef, ObjectPlacement, Openness, Position};

use crate::state::GameState;

/// Base of the size/weight exponent encoding.
const SIZE_WEIGHT_BASE: i64 = 3;

impl GameState {
    pub fn is_static(def: &GameDef, obj: usize) -> bool {
        def.objects.get(obj).is_some_and(drifter_data::ObjectDef::is_static)
    }

    pub fn is_container(def: &GameDef, obj: usize) -> bool {
        def.objects.get(obj).is_some_and(|o| o.container)
    }

    pub fn is_surface(def: &GameDef, obj: usize) -> bool {
        def.objects.get(obj).is_some_and(|o| o.surface)
    }

    /// True if the object sits directly in `room`, or is static scenery listed for it.
    pub fn directly_in_room(&self, def: &GameDef, obj: usize, room: usize) -> bool {
        let Some(state) = self.objects.get(obj) else {
            return false;
        };
        if state.static_unmoved {
            return static_in_room(def, obj, room);
        }
        state.position == Position::InRoom(room)
    }

    /// True if the object can be found in `room`, following surfaces, open containers and
    /// whoever is carrying it.
    pub fn indirectly_in_room(&self, def: &GameDef, obj: usize, room: usize) -> bool {
        self.locate(obj, self.objects.len(), &|state, position| match position {
            Position::InRoom(r) => r == room,
            Position::HeldByPlayer | Position::WornByPlayer | Position::PartOf(Character::Player) => {
                state.player.room == room
            },
            Position::HeldByNpc(npc) | Position::WornByNpc(npc) | Position::PartOf(Character::Npc(npc)) => {
                state.npcs.get(npc).and_then(|n| n.location) == Some(room)
            },
            _ => false,
        })
        .unwrap_or_else(|| static_root_in_room(self, def, obj, room))
    }

    /// True if the player holds the object, directly or through what they carry.
    pub fn held_by_player(&self, obj: usize) -> bool {
        self.locate(obj, self.objects.len(), &|_, position| position == Position::HeldByPlayer)
            .unwrap_or(false)
    }

    /// True if the player is wearing the object.
    pub fn worn_by_player(&self, obj: usize) -> bool {
        self.objects
            .get(obj)
            .is_some_and(|state| state.position == Position::WornByPlayer)
    }

    /// True if the object is held, directly or indirectly, by the given NPC.
    pub fn held_by_npc(&self, obj: usize, npc: usize) -> bool {
        self.locate(obj, self.objects.len(), &|_, position| position == Position::HeldByNpc(npc))
            .unwrap_or(false)
    }

    pub fn worn_by_npc(&self, obj: usize, npc: usize) -> bool {
        self.objects
            .get(obj)
            .is_some_and(|state| state.position == Position::WornByNpc(npc))
    }

    /// True if `obj` is directly inside `container`.
    pub fn inside(&self, obj: usize, container: usize) -> bool {
        self.objects
            .get(obj)
            .is_some_and(|state| state.position == Position::InObject(container))
    }

    pub fn on_top_of(&self, obj: usize, surface: usize) -> bool {
        self.objects
            .get(obj)
            .is_some_and(|state| state.position == Position::OnObject(surface))
    }

    /// True if the player could see the object from where they are.
    pub fn visible_to_player(&self, def: &GameDef, obj: usize) -> bool {
        self.indirectly_in_room(def, obj, self.player.room)
    }

    /// Walk up the containment chain to the first position that isn't "on" or "in" another
    /// object, then apply `test`. `None` means the chain ended at unmoved static scenery.
    fn locate(
        &self,
        obj: usize,
        budget: usize,
        test: &dyn Fn(&GameState, Position) -> bool,
    ) -> Option<bool> {
        let state = self.objects.get(obj)?;
        if state.static_unmoved {
            return None;
        }
        if budget == 0 {
            return Some(false);
        }
        match state.position {
            Position::OnObject(parent) => self.locate(parent, budget - 1, test),
            Position::InObject(parent) => {
                let see_through = self.objects.get(parent).is_some_and(|p| p.openness.is_see_through());
                if see_through {
                    self.locate(parent, budget - 1, test)
                } else {
                    Some(false)
                }
            },
            position => Some(test(self, position)),
        }
    }

    /// Size of a single object; contents don't count.
    pub fn object_size(def: &GameDef, obj: usize) -> i64 {
        def.objects
            .get(obj)
            .map_or(0, |o| SIZE_WEIGHT_BASE.pow(digit(o.size_weight / 10)))
    }

    /// Weight of an object plus everything in or on it.
    pub fn object_weight(&self, def: &GameDef, obj: usize) -> i64 {
        self.weight_within(def, obj, self.objects.len())
    }

    fn weight_within(&self, def: &GameDef, obj: usize, budget: usize) -> i64 {
        let own = def
            .objects
            .get(obj)
            .map_or(0, |o| SIZE_WEIGHT_BASE.pow(digit(o.size_weight % 10)));
        if budget == 0 {
            return own;
        }
        let carried: i64 = self
            .objects
            .iter()
            .enumerate()
            .filter(|(_, o)| matches!(o.position, Position::InObject(p) | Position::OnObject(p) if p == obj))
            .map(|(idx, _)| self.weight_within(def, idx, budget - 1))
            .sum();
        own + carried
    }

    /// Combined size of what the player is carrying in their hands.
    pub fn player_held_size(&self, def: &GameDef) -> i64 {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, o)| o.position == Position::HeldByPlayer)
            .map(|(idx, _)| Self::object_size(def, idx))
            .sum()
    }

    /// Combined weight of what the player holds and wears.
    pub fn player_held_weight(&self, def: &GameDef) -> i64 {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, o)| matches!(o.position, Position::HeldByPlayer | Position::WornByPlayer))
            .map(|(idx, _)| self.object_weight(def, idx))
            .sum()
    }

    /// How many objects a container accepts and the largest size it accepts.
    pub fn container_capacity(def: &GameDef, obj: usize) -> (i64, i64) {
        def.objects.get(obj).map_or((0, 0), |o| {
            (
                i64::from(o.capacity / 10),
                SIZE_WEIGHT_BASE.pow(digit(o.capacity % 10)),
            )
        })
    }

    /// Objects directly in (or on) `parent`.
    pub fn contents(&self, parent: usize, on_top: bool) -> Vec<usize> {
        let wanted = if on_top {
            Position::OnObject(parent)
        } else {
            Position::InObject(parent)
        };
        self.objects
            .iter()
            .enumerate()
            .filter_map(|(idx, o)| (o.position == wanted).then_some(idx))
            .collect()
    }

    /// Set an object's position, clearing `unmoved` only when the position actually changes.
    pub fn place_object(&mut self, obj: usize, position: Position) {
        let Some(state) = self.objects.get_mut(obj) else {
            return;
        };
        if state.position != position {
            state.position = position;
            state.unmoved = false;
        }
    }

    pub fn move_into(&mut self, obj: usize, container: usize) {
        self.place_object(obj, Position::InObject(container));
    }

    pub fn move_onto(&mut self, obj: usize, surface: usize) {
        self.place_object(obj, Position::OnObject(surface));
    }

    pub fn make_hidden(&mut self, obj: usize) {
        self.place_object(obj, Position::Hidden);
    }

    pub fn player_get(&mut self, obj: usize) {
        self.place_object(obj, Position::HeldByPlayer);
    }

    pub fn npc_get(&mut self, obj: usize, npc: usize) {
        self.place_object(obj, Position::HeldByNpc(npc));
    }

    pub fn player_wear(&mut self, obj: usize) {
        self.place_object(obj, Position::WornByPlayer);
    }

    pub fn npc_wear(&mut self, obj: usize, npc: usize) {
        self.place_object(obj, Position::WornByNpc(npc));
    }

    pub fn to_room(&mut self, obj: usize, room: usize) {
        self.place_object(obj, Position::InRoom(room));
    }

    pub fn set_openness(&mut self, obj: usize, openness: Openness) {
        if let Some(state) = self.objects.get_mut(obj) {
            state.openness = openness;
        }
    }
}

fn static_in_room(def: &GameDef, obj: usize, room: usize) -> bool {
    match def.objects.get(obj).map(|o| &o.placement) {
        Some(ObjectPlacement::Static { rooms }) => rooms.contains(room),
        _ => false,
    }
}

/// Resolve the room membership of a chain that ends at static scenery. Scenery attached to
/// a character is found wherever that character is.
fn static_root_in_room(state: &GameState, def: &GameDef, obj: usize, room: usize) -> bool {
    let mut current = obj;
    for _ in 0..=state.objects.len() {
        let Some(object) = state.objects.get(current) else {
            return false;
        };
        if object.static_unmoved {
            return static_in_room(def, current, room);
        }
        match object.position {
            Position::OnObject(parent) => current = parent,
            Position::InObject(parent) => {
                if !state.objects.get(parent).is_some_and(|p| p.openness.is_see_through()) {
                    return false;
                }
                current = parent;
            },
            _ => return false,
        }
    }
    false
}

fn digit(value: i32) -> u32 {
    value.unsigned_abs() % 10
}
