use indexmap::IndexMap;
use lumen_derive::LevelEntity;

use crate::{
    error::{EngineError, EngineResult},
    level::EntityId,
    resource::Program,
};

/// Texture units a single draw may use.
pub const MAX_TEXTURE_UNITS: usize = 16;

/// A program plus the textures bound to its sampler slots.
///
/// Slots keep insertion order, which is also the order textures are
/// bound in.
#[derive(Debug, Clone, Default, PartialEq, LevelEntity)]
pub struct Material {
    program: EntityId,
    slots: IndexMap<String, EntityId>,
    /// Slot indices in unit order.
    enabled: Vec<usize>,
}

impl Material {
    pub fn new(program: EntityId) -> Self {
        Self {
            program,
            ..Default::default()
        }
    }

    pub fn program_id(&self) -> EntityId {
        self.program
    }

    pub fn add_texture(&mut self, slot: impl Into<String>, texture: EntityId) -> EngineResult<()> {
        let slot = slot.into();
        if self.slots.contains_key(&slot) {
            return Err(EngineError::DuplicateName {
                category: "material slot",
                name: slot,
            });
        }
        self.slots.insert(slot, texture);
        Ok(())
    }

    pub fn texture(&self, slot: &str) -> Option<EntityId> {
        self.slots.get(slot).copied()
    }

    pub fn texture_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.values().copied()
    }

    pub fn slots(&self) -> impl Iterator<Item = (&str, EntityId)> {
        self.slots.iter().map(|(slot, id)| (slot.as_str(), *id))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Adds every slot of `other` this material doesn't define yet.
    pub fn merge(&mut self, other: &Material) {
        for (slot, id) in other.slots() {
            self.slots.entry(slot.to_owned()).or_insert(id);
        }
    }

    /// Assigns the next free texture unit to `texture` and returns the
    /// slot name it is sampled through.
    ///
    /// A texture bound to several slots takes the first slot that isn't
    /// enabled yet.
    pub fn enable_texture(&mut self, texture: EntityId) -> EngineResult<(&str, u32)> {
        let index = self
            .slots
            .values()
            .enumerate()
            .find_map(|(index, id)| (*id == texture && !self.enabled.contains(&index)).then_some(index))
            .ok_or(EngineError::NotFound(texture))?;
        if self.enabled.len() >= MAX_TEXTURE_UNITS {
            return Err(EngineError::TextureUnitsExhausted(MAX_TEXTURE_UNITS));
        }
        let unit = self.enabled.len() as u32;
        self.enabled.push(index);
        let (slot, _) = self
            .slots
            .get_index(index)
            .ok_or(EngineError::NotFound(texture))?;
        Ok((slot.as_str(), unit))
    }

    pub fn enabled_textures(&self) -> Vec<EntityId> {
        self.enabled
            .iter()
            .filter_map(|index| self.slots.get_index(*index).map(|(_, id)| *id))
            .collect()
    }

    pub fn disable_all(&mut self) {
        self.enabled.clear();
    }

    /// Every sampler `program` reads must name one of our slots.
    pub fn check_samplers(&self, program: &Program) -> EngineResult<()> {
        match program
            .samplers()
            .iter()
            .find(|sampler| !self.slots.contains_key(sampler.as_str()))
        {
            Some(missing) => Err(EngineError::MissingSampler(missing.clone())),
            None => Ok(()),
        }
    }
}
