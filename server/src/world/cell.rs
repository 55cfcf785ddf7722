// grid_map_server/server/src/world/cell.rs
use crate::core::error::GridResult;
use crate::core::types::{CategoryMask, ObjectCategory, ObjectGuid};
use crate::world::reference_list::{Reference, ReferenceList};

pub type ObjectList = ReferenceList<ObjectGuid>;

/// Finest spatial bucket. One list per object category, never mixed.
#[derive(Debug, Default)]
pub struct Cell {
    players: ObjectList,
    creatures: ObjectList,
    game_objects: ObjectList,
    dynamic_objects: ObjectList,
    corpses: ObjectList,
    area_triggers: ObjectList,
    scene_objects: ObjectList,
    conversations: ObjectList,
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self, category: ObjectCategory) -> &ObjectList {
        match category {
            ObjectCategory::Player => &self.players,
            ObjectCategory::Creature => &self.creatures,
            ObjectCategory::GameObject => &self.game_objects,
            ObjectCategory::DynamicObject => &self.dynamic_objects,
            ObjectCategory::Corpse => &self.corpses,
            ObjectCategory::AreaTrigger => &self.area_triggers,
            ObjectCategory::SceneObject => &self.scene_objects,
            ObjectCategory::Conversation => &self.conversations,
        }
    }

    pub fn list_mut(&mut self, category: ObjectCategory) -> &mut ObjectList {
        match category {
            ObjectCategory::Player => &mut self.players,
            ObjectCategory::Creature => &mut self.creatures,
            ObjectCategory::GameObject => &mut self.game_objects,
            ObjectCategory::DynamicObject => &mut self.dynamic_objects,
            ObjectCategory::Corpse => &mut self.corpses,
            ObjectCategory::AreaTrigger => &mut self.area_triggers,
            ObjectCategory::SceneObject => &mut self.scene_objects,
            ObjectCategory::Conversation => &mut self.conversations,
        }
    }

    pub fn insert(&mut self, category: ObjectCategory, reference: &mut Reference, guid: ObjectGuid) -> GridResult<()> {
        self.list_mut(category).insert(reference, guid)
    }

    pub fn remove(&mut self, category: ObjectCategory, reference: &mut Reference) -> GridResult<bool> {
        self.list_mut(category).remove(reference)
    }

    pub fn count(&self, category: ObjectCategory) -> usize {
        self.list(category).len()
    }

    pub fn len(&self) -> usize {
        ObjectCategory::ALL.iter().map(|c| self.list(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        ObjectCategory::ALL.iter().all(|c| self.list(*c).is_empty())
    }

    /// Runs `op` over every object of the categories in `mask`. Empty lists are
    /// skipped before a traversal is opened. `op` gets the list being walked and may
    /// unlink the current element through it.
    pub fn visit<F>(&mut self, mask: CategoryMask, mut op: F) -> usize
    where
        F: FnMut(&mut ObjectList, ObjectCategory, ObjectGuid),
    {
        let mut visited = 0;
        for category in mask.categories() {
            let list = self.list_mut(category);
            if list.is_empty() {
                continue;
            }
            visited += list.for_each(|l, guid| op(l, category, guid));
        }
        visited
    }
}
