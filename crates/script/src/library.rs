//! Script storage and script selection for battle models.

use battlefx_core::{ActorId, BattleModelState, AUX_SHARED_SCRIPT_39, MAX_ACTORS};
use serde::{Deserialize, Serialize};

/// First script index redirected to the shared bank.
pub const FIRST_SHARED_INDEX: u8 = 0x2E;
/// Last script index redirected to the shared bank.
pub const LAST_SHARED_INDEX: u8 = 0x3B;
/// Index inside the shared range that stays actor-local.
pub const ACTOR_LOCAL_INDEX: u8 = 0x33;
/// Shared script whose selection marks the model.
pub const MARKED_SHARED_INDEX: u8 = 0x39;

/// Identity of one script buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKey {
    /// Entry `index` of an actor's own script table.
    Actor {
        /// Owning actor.
        actor: ActorId,
        /// Script table index.
        index: u8,
    },
    /// Entry of the shared script bank.
    Shared(u8),
}

/// Shared bank slot for a script table index, if it is redirected.
pub fn shared_slot(index: u8) -> Option<u8> {
    if (FIRST_SHARED_INDEX..=LAST_SHARED_INDEX).contains(&index) && index != ACTOR_LOCAL_INDEX {
        Some(index - FIRST_SHARED_INDEX)
    } else {
        None
    }
}

/// Per-actor script tables plus the shared bank.
///
/// Scripts are byte buffers patched in place when wait operands are scaled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLibrary {
    actors: Vec<Vec<Vec<u8>>>,
    shared: Vec<Vec<u8>>,
}

impl Default for ScriptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptLibrary {
    /// Empty library with a table for every actor slot.
    pub fn new() -> Self {
        Self {
            actors: vec![Vec::new(); MAX_ACTORS],
            shared: Vec::new(),
        }
    }

    /// Store `script` as entry `index` of `actor`'s table.
    pub fn set_actor_script(&mut self, actor: ActorId, index: u8, script: impl Into<Vec<u8>>) {
        if self.actors.len() <= actor.index() {
            self.actors.resize(actor.index() + 1, Vec::new());
        }
        let table = &mut self.actors[actor.index()];
        let index = usize::from(index);
        if table.len() <= index {
            table.resize(index + 1, Vec::new());
        }
        table[index] = script.into();
    }

    /// Store `script` in shared bank `slot`.
    pub fn set_shared_script(&mut self, slot: u8, script: impl Into<Vec<u8>>) {
        let slot = usize::from(slot);
        if self.shared.len() <= slot {
            self.shared.resize(slot + 1, Vec::new());
        }
        self.shared[slot] = script.into();
    }

    /// Script the model's current index refers to, marking the model when
    /// it selects shared script `0x39`.
    pub fn select(&self, actor: ActorId, model: &mut BattleModelState) -> ScriptKey {
        let index = model.anim_script_index;
        match shared_slot(index) {
            Some(slot) => {
                if index == MARKED_SHARED_INDEX {
                    model.aux_flags |= AUX_SHARED_SCRIPT_39;
                }
                ScriptKey::Shared(slot)
            }
            None => ScriptKey::Actor { actor, index },
        }
    }

    /// Bytes of a script.
    pub fn script(&self, key: ScriptKey) -> Option<&[u8]> {
        match key {
            ScriptKey::Actor { actor, index } => self
                .actors
                .get(actor.index())?
                .get(usize::from(index))
                .map(Vec::as_slice),
            ScriptKey::Shared(slot) => self.shared.get(usize::from(slot)).map(Vec::as_slice),
        }
    }

    pub(crate) fn script_mut(&mut self, key: ScriptKey) -> Option<&mut [u8]> {
        match key {
            ScriptKey::Actor { actor, index } => self
                .actors
                .get_mut(actor.index())?
                .get_mut(usize::from(index))
                .map(Vec::as_mut_slice),
            ScriptKey::Shared(slot) => self
                .shared
                .get_mut(usize::from(slot))
                .map(Vec::as_mut_slice),
        }
    }

    /// Byte at `position` of a script.
    pub fn byte(&self, key: ScriptKey, position: u16) -> Option<u8> {
        self.script(key)?.get(usize::from(position)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_range_skips_actor_local_index() {
        assert_eq!(shared_slot(0x2D), None);
        assert_eq!(shared_slot(0x2E), Some(0));
        assert_eq!(shared_slot(0x33), None);
        assert_eq!(shared_slot(0x3B), Some(0x0D));
        assert_eq!(shared_slot(0x3C), None);
    }

    #[test]
    fn select_redirects_and_marks() {
        let library = ScriptLibrary::new();
        let mut model = BattleModelState {
            anim_script_index: 0x39,
            ..BattleModelState::default()
        };
        assert_eq!(library.select(ActorId(2), &mut model), ScriptKey::Shared(0x0B));
        assert_eq!(model.aux_flags & AUX_SHARED_SCRIPT_39, AUX_SHARED_SCRIPT_39);

        let mut model = BattleModelState {
            anim_script_index: 0x33,
            ..BattleModelState::default()
        };
        assert_eq!(
            library.select(ActorId(2), &mut model),
            ScriptKey::Actor {
                actor: ActorId(2),
                index: 0x33
            }
        );
        assert_eq!(model.aux_flags, 0);
    }

    #[test]
    fn scripts_grow_tables_on_demand() {
        let mut library = ScriptLibrary::new();
        library.set_actor_script(ActorId(1), 4, [0x90, 1, 2, 3]);
        library.set_shared_script(3, vec![0xEE]);
        let key = ScriptKey::Actor {
            actor: ActorId(1),
            index: 4,
        };
        assert_eq!(library.byte(key, 0), Some(0x90));
        assert_eq!(library.byte(key, 4), None);
        assert_eq!(library.script(ScriptKey::Shared(3)), Some(&[0xEE][..]));
        assert_eq!(library.script(ScriptKey::Shared(0)), Some(&[][..]));
        assert_eq!(library.script(ScriptKey::Shared(9)), None);
    }
}
