use std::{collections::HashMap, fmt};

use glam::Mat4;
use indexmap::IndexMap;

use crate::{
    error::{EngineError, EngineResult},
    resource::{Buffer, Material, Program, StaticMesh, Texture},
    scene::{self, Node, NodeKind, RenderTime},
};

pub mod description;

/// Opaque handle of an entity stored in a [`Level`].
///
/// `0` is reserved and means "no entity".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub const NULL: EntityId = EntityId(0);

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Texture,
    Program,
    Material,
    StaticMesh,
    Buffer,
    Node,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Texture,
        EntityKind::Program,
        EntityKind::Material,
        EntityKind::StaticMesh,
        EntityKind::Buffer,
        EntityKind::Node,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Texture => "texture",
            EntityKind::Program => "program",
            EntityKind::Material => "material",
            EntityKind::StaticMesh => "static mesh",
            EntityKind::Buffer => "buffer",
            EntityKind::Node => "node",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum Entity {
    Texture(Texture),
    Program(Program),
    Material(Material),
    StaticMesh(StaticMesh),
    Buffer(Buffer),
    Node(Node),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Texture(_) => EntityKind::Texture,
            Entity::Program(_) => EntityKind::Program,
            Entity::Material(_) => EntityKind::Material,
            Entity::StaticMesh(_) => EntityKind::StaticMesh,
            Entity::Buffer(_) => EntityKind::Buffer,
            Entity::Node(_) => EntityKind::Node,
        }
    }
}

/// Types that can be stored in a [`Level`]. Implemented with
/// `#[derive(LevelEntity)]`.
pub trait LevelEntity: Sized {
    const KIND: EntityKind;

    fn into_entity(self) -> Entity;
    fn from_entity(entity: &Entity) -> Option<&Self>;
    fn from_entity_mut(entity: &mut Entity) -> Option<&mut Self>;
}

/// Anything entities can be added to: a finished [`Level`] or a
/// [`LevelBuilder`].
pub trait EntityStore {
    fn store<T: LevelEntity>(&mut self, name: impl Into<String>, entity: T) -> EngineResult<EntityId>;
}

impl EntityStore for Level {
    fn store<T: LevelEntity>(&mut self, name: impl Into<String>, entity: T) -> EngineResult<EntityId> {
        self.add(name, entity)
    }
}

impl EntityStore for LevelBuilder {
    fn store<T: LevelEntity>(&mut self, name: impl Into<String>, entity: T) -> EngineResult<EntityId> {
        self.add(name, entity)
    }
}

/// Position in a [`Level`]'s id sequence, see [`Level::savepoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Savepoint(u64);

#[derive(Debug, Clone, Copy)]
pub struct Defaults {
    pub camera: EntityId,
    pub output_texture: EntityId,
    pub quad: EntityId,
    pub cube: EntityId,
    pub environment_material: Option<EntityId>,
}

/// Registry of every resource a scene needs, addressed by [`EntityId`]
/// or by name. Names are unique per [`EntityKind`].
#[derive(Debug)]
pub struct Level {
    entities: HashMap<EntityId, Entity>,
    names: HashMap<EntityKind, HashMap<String, EntityId>>,
    id_names: HashMap<EntityId, String>,
    next_id: u64,
    mesh_materials: IndexMap<EntityId, (EntityId, RenderTime)>,
    defaults: Defaults,
    environment_model: Mat4,
}

impl Level {
    pub fn builder() -> LevelBuilder {
        LevelBuilder::default()
    }

    fn empty() -> Self {
        Self {
            entities: HashMap::new(),
            names: HashMap::new(),
            id_names: HashMap::new(),
            next_id: 1,
            mesh_materials: IndexMap::new(),
            defaults: Defaults {
                camera: EntityId::NULL,
                output_texture: EntityId::NULL,
                quad: EntityId::NULL,
                cube: EntityId::NULL,
                environment_material: None,
            },
            environment_model: Mat4::IDENTITY,
        }
    }

    /// Stores `entity` under `name` and returns its fresh id.
    ///
    /// Static mesh nodes are also recorded in the mesh/material table,
    /// in insertion order.
    pub fn add<T: LevelEntity>(&mut self, name: impl Into<String>, entity: T) -> EngineResult<EntityId> {
        let name = name.into();
        let names = self.names.entry(T::KIND).or_default();
        if names.contains_key(&name) {
            return Err(EngineError::DuplicateName {
                category: T::KIND.as_str(),
                name,
            });
        }

        let id = EntityId(self.next_id);
        self.next_id += 1;
        names.insert(name.clone(), id);
        self.id_names.insert(id, name);

        let entity = entity.into_entity();
        if let Entity::Node(Node {
            kind: NodeKind::StaticMesh(mesh),
            ..
        }) = &entity
        {
            let material = mesh.material.unwrap_or(EntityId::NULL);
            self.mesh_materials.insert(id, (material, mesh.render_time));
        }
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Marks the current end of the level, for [`Level::rollback`].
    pub fn savepoint(&self) -> Savepoint {
        Savepoint(self.next_id)
    }

    /// Removes every entity added since `savepoint`.
    ///
    /// Defaults pointing at a removed entity are reset. Removed ids are
    /// never handed out again. Device objects the removed entities own are
    /// not released.
    pub fn rollback(&mut self, savepoint: Savepoint) {
        let removed = |id: &EntityId| id.0 >= savepoint.0;
        self.entities.retain(|id, _| !removed(id));
        self.id_names.retain(|id, _| !removed(id));
        for names in self.names.values_mut() {
            names.retain(|_, id| !removed(id));
        }
        self.mesh_materials.retain(|id, _| !removed(id));
        if self.defaults.environment_material.is_some_and(|id| removed(&id)) {
            self.defaults.environment_material = None;
        }
    }

    /// Looks `name` up across every kind, in [`EntityKind::ALL`] order.
    pub fn id_from_name(&self, name: &str) -> Option<EntityId> {
        EntityKind::ALL
            .iter()
            .find_map(|kind| self.id_from_name_of(*kind, name))
    }

    pub fn id_from_name_of(&self, kind: EntityKind, name: &str) -> Option<EntityId> {
        self.names.get(&kind).and_then(|names| names.get(name)).copied()
    }

    /// Like [`Level::id_from_name_of`] but fails with
    /// [`EngineError::NameNotFound`].
    pub fn require_id(&self, kind: EntityKind, name: &str) -> EngineResult<EntityId> {
        self.id_from_name_of(kind, name)
            .ok_or_else(|| EngineError::NameNotFound {
                kind: kind.as_str(),
                name: name.to_owned(),
            })
    }

    pub fn name_of(&self, id: EntityId) -> Option<&str> {
        self.id_names.get(&id).map(String::as_str)
    }

    pub fn kind_of(&self, id: EntityId) -> EngineResult<EntityKind> {
        self.entity(id).map(Entity::kind)
    }

    pub fn entity(&self, id: EntityId) -> EngineResult<&Entity> {
        self.entities.get(&id).ok_or(EngineError::NotFound(id))
    }

    pub fn get<T: LevelEntity>(&self, id: EntityId) -> EngineResult<&T> {
        let entity = self.entity(id)?;
        T::from_entity(entity).ok_or(EngineError::TypeMismatch {
            id,
            expected: T::KIND,
            found: entity.kind(),
        })
    }

    pub fn get_mut<T: LevelEntity>(&mut self, id: EntityId) -> EngineResult<&mut T> {
        let entity = self.entities.get_mut(&id).ok_or(EngineError::NotFound(id))?;
        let found = entity.kind();
        T::from_entity_mut(entity).ok_or(EngineError::TypeMismatch {
            id,
            expected: T::KIND,
            found,
        })
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.names.get(&kind).map_or(0, HashMap::len)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// `(node, material, timing)` for every registered static mesh node.
    pub fn mesh_materials(&self) -> impl Iterator<Item = (EntityId, EntityId, RenderTime)> + '_ {
        self.mesh_materials
            .iter()
            .map(|(node, (material, time))| (*node, *material, *time))
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    pub fn default_camera_id(&self) -> EntityId {
        self.defaults.camera
    }

    pub fn default_output_texture_id(&self) -> EntityId {
        self.defaults.output_texture
    }

    pub fn default_quad_id(&self) -> EntityId {
        self.defaults.quad
    }

    pub fn default_cube_id(&self) -> EntityId {
        self.defaults.cube
    }

    pub fn default_environment_material_id(&self) -> Option<EntityId> {
        self.defaults.environment_material
    }

    pub fn set_default_environment_material(&mut self, id: EntityId) -> EngineResult<()> {
        self.get::<Material>(id)?;
        self.defaults.environment_material = Some(id);
        Ok(())
    }

    pub fn default_camera(&self) -> EngineResult<&scene::Camera> {
        let id = self.defaults.camera;
        match &self.get::<Node>(id)?.kind {
            NodeKind::Camera(camera) => Ok(camera),
            _ => Err(EngineError::UnexpectedNode {
                id,
                expected: "camera",
            }),
        }
    }

    pub fn environment_model(&self) -> Mat4 {
        self.environment_model
    }
}

/// Collects entities, then checks the defaults every scene needs.
#[derive(Debug)]
pub struct LevelBuilder {
    level: Level,
    camera: Option<String>,
    output_texture: Option<String>,
    quad: Option<String>,
    cube: Option<String>,
    environment_material: Option<String>,
}

impl Default for LevelBuilder {
    fn default() -> Self {
        Self {
            level: Level::empty(),
            camera: None,
            output_texture: None,
            quad: None,
            cube: None,
            environment_material: None,
        }
    }
}

impl LevelBuilder {
    pub fn add<T: LevelEntity>(&mut self, name: impl Into<String>, entity: T) -> EngineResult<EntityId> {
        self.level.add(name, entity)
    }

    pub fn id_from_name_of(&self, kind: EntityKind, name: &str) -> Option<EntityId> {
        self.level.id_from_name_of(kind, name)
    }

    pub fn require_id(&self, kind: EntityKind, name: &str) -> EngineResult<EntityId> {
        self.level.require_id(kind, name)
    }

    pub fn get<T: LevelEntity>(&self, id: EntityId) -> EngineResult<&T> {
        self.level.get(id)
    }

    /// The level under construction; defaults are still unset.
    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn default_camera(&mut self, name: impl Into<String>) -> &mut Self {
        self.camera = Some(name.into());
        self
    }

    pub fn default_output_texture(&mut self, name: impl Into<String>) -> &mut Self {
        self.output_texture = Some(name.into());
        self
    }

    pub fn default_quad(&mut self, name: impl Into<String>) -> &mut Self {
        self.quad = Some(name.into());
        self
    }

    pub fn default_cube(&mut self, name: impl Into<String>) -> &mut Self {
        self.cube = Some(name.into());
        self
    }

    pub fn default_environment_material(&mut self, name: impl Into<String>) -> &mut Self {
        self.environment_material = Some(name.into());
        self
    }

    pub fn environment_model(&mut self, model: Mat4) -> &mut Self {
        self.level.environment_model = model;
        self
    }

    fn resolve(&self, role: &'static str, kind: EntityKind, name: &Option<String>) -> EngineResult<EntityId> {
        name.as_deref()
            .and_then(|name| self.level.id_from_name_of(kind, name))
            .ok_or(EngineError::MissingDefaultResource(role))
    }

    /// Fails unless a camera, an output texture, a quad and a cube are
    /// named and present. Every node's parent chain is walked once so
    /// cycles are reported here rather than mid-frame.
    pub fn build(self) -> EngineResult<Level> {
        let camera = self.resolve("camera", EntityKind::Node, &self.camera)?;
        let output_texture = self.resolve("output texture", EntityKind::Texture, &self.output_texture)?;
        let quad = self.resolve("quad", EntityKind::StaticMesh, &self.quad)?;
        let cube = self.resolve("cube", EntityKind::StaticMesh, &self.cube)?;
        let environment_material = match &self.environment_material {
            Some(_) => Some(self.resolve(
                "environment material",
                EntityKind::Material,
                &self.environment_material,
            )?),
            None => None,
        };

        let mut level = self.level;
        level.defaults = Defaults {
            camera,
            output_texture,
            quad,
            cube,
            environment_material,
        };
        level.default_camera()?;

        let nodes: Vec<EntityId> = level
            .names
            .get(&EntityKind::Node)
            .map(|names| names.values().copied().collect())
            .unwrap_or_default();
        for node in nodes {
            scene::world_transform(&level, node, 0.0)?;
        }

        log::info!(
            "Level built with {} entities ({} textures, {} programs, {} materials, {} nodes).",
            level.len(),
            level.count(EntityKind::Texture),
            level.count(EntityKind::Program),
            level.count(EntityKind::Material),
            level.count(EntityKind::Node),
        );
        Ok(level)
    }
}
