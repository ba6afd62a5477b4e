//! Build-mode controls and footprint highlight previews on top of `tiles`.

use bevy::prelude::*;

use tiles::{TilesPlugin, TilesSet};

pub mod build_controls;
pub mod config;
pub mod highlight;

pub use build_controls::{BuildCommand, BuildMode, CursorCell, PreviewColors};
pub use highlight::{HighlightColor, HighlightOverlay, Highlighter};

/// Adds [`TilesPlugin`] if missing, the preview resources and the build
/// control systems. Commands are applied before `TilesSet::Apply` so a
/// confirmed placement lands in the same frame; the preview is computed
/// after it.
pub struct PreviewPlugin;

impl Plugin for PreviewPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<TilesPlugin>() {
            app.add_plugins(TilesPlugin);
        }

        app.init_resource::<HighlightOverlay>()
            .init_resource::<PreviewColors>()
            .init_resource::<BuildMode>()
            .init_resource::<CursorCell>()
            .add_event::<BuildCommand>()
            .add_systems(
                Update,
                (
                    build_controls::apply_build_commands.before(TilesSet::Apply),
                    build_controls::update_build_preview.after(TilesSet::Apply),
                ),
            );
    }
}
