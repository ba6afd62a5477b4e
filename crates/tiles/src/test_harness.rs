//! # TestWorld: headless harness for placement integration tests
//!
//! Wraps `bevy::app::App` + `MinimalPlugins` + [`TilesPlugin`] so tests and
//! benches can send build requests and inspect the resulting ECS state
//! without a window or renderer.

use bevy::prelude::*;

use crate::build_log::BuildLog;
use crate::buildings::BuildingManager;
use crate::grid_index::{Facing, GridIndex};
use crate::plane::TilePlane;
use crate::plugin::{BuildTarget, BuildingRegistry, PlaceStructure, RemoveStructure, TilesPlugin};
use crate::structures::{StructureCatalog, StructureId};

pub struct TestWorld {
    app: App,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Empty world with the default plane and stock catalog.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Empty world using `plane` instead of the default one.
    pub fn with_plane(plane: TilePlane) -> Self {
        Self::build(Some(plane))
    }

    fn build(plane: Option<TilePlane>) -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        if let Some(plane) = plane {
            app.insert_resource(plane);
        }
        app.add_plugins(TilesPlugin);
        app.update();
        Self { app }
    }

    // -----------------------------------------------------------------------
    // Requests (each runs one update)
    // -----------------------------------------------------------------------

    /// Request placement of the catalog structure `name` at `(x, y)`.
    pub fn place(&mut self, name: &str, x: i32, y: i32, facing: Facing) -> &mut Self {
        let structure = self.structure(name);
        self.send_place(structure, GridIndex::new(x, y).into(), facing, false)
    }

    pub fn place_overwriting(&mut self, name: &str, x: i32, y: i32, facing: Facing) -> &mut Self {
        let structure = self.structure(name);
        self.send_place(structure, GridIndex::new(x, y).into(), facing, true)
    }

    pub fn send_place(
        &mut self,
        structure: StructureId,
        target: BuildTarget,
        facing: Facing,
        overwrite: bool,
    ) -> &mut Self {
        self.app.world_mut().send_event(PlaceStructure {
            structure,
            target,
            facing,
            overwrite,
        });
        self.update()
    }

    pub fn remove(&mut self, x: i32, y: i32) -> &mut Self {
        self.remove_target(GridIndex::new(x, y).into())
    }

    pub fn remove_target(&mut self, target: BuildTarget) -> &mut Self {
        self.app.world_mut().send_event(RemoveStructure { target });
        self.update()
    }

    pub fn update(&mut self) -> &mut Self {
        self.app.update();
        self
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Catalog id for `name`. Panics if the stock catalog has no such entry.
    pub fn structure(&self, name: &str) -> StructureId {
        self.app
            .world()
            .resource::<StructureCatalog>()
            .find(name)
            .unwrap_or_else(|| panic!("no structure named {name}"))
    }

    pub fn registry(&self) -> &BuildingManager<Entity> {
        &self.app.world().resource::<BuildingRegistry>().0
    }

    pub fn log(&self) -> &BuildLog {
        self.app.world().resource::<BuildLog>()
    }

    /// Number of live entities carrying component `C`.
    pub fn count<C: Component>(&mut self) -> usize {
        let world = self.app.world_mut();
        let mut query = world.query::<&C>();
        query.iter(world).count()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }
}
