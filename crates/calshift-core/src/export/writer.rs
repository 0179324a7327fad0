use tracing::{debug, info};

use crate::export::display_label;
use crate::map::{
    AxisDefinition, AxisResolution, DefinitionDocument, MapEntity, MapRegistry, format_address,
};

/// Which resolved maps make it into the relocated document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Drop maps that needed surrounding context to resolve
    pub exclude_deep: bool,
}

/// Whether a map is written to the relocated document
pub fn is_exportable(entity: &MapEntity, options: WriteOptions) -> bool {
    entity.match_type().is_resolved() && !(options.exclude_deep && entity.resolution.is_deep())
}

fn relocate_axis(axis: &mut AxisDefinition, resolution: &AxisResolution) {
    axis.address = resolution
        .target_addr
        .map_or_else(|| "0x0".to_string(), format_address);
}

/// Build the target-side document.
///
/// Maps are kept in document order with their Z (and axis) addresses
/// replaced by the resolved target addresses and their names relabelled.
/// Unresolved maps are dropped; an unresolved axis is written as `0x0`.
pub fn relocate_document(
    document: &DefinitionDocument,
    registry: &MapRegistry,
    options: WriteOptions,
) -> DefinitionDocument {
    let mut maps = Vec::new();

    for definition in &document.maps {
        let Some(entity) = registry.get(&definition.name) else {
            debug!("{}: not in registry, dropped", definition.name);
            continue;
        };
        if !is_exportable(entity, options) {
            continue;
        }
        let Some(target) = entity.target_addr() else {
            continue;
        };

        let mut relocated = definition.clone();
        relocated.name = display_label(entity);
        relocated.z.address = format_address(target);
        if !entity.is_scalar() {
            if let Some(x) = relocated.x.as_mut() {
                relocate_axis(x, &entity.x_resolution);
            }
            if let Some(y) = relocated.y.as_mut() {
                relocate_axis(y, &entity.y_resolution);
            }
        }
        maps.push(relocated);
    }

    info!(
        "Relocated document: {} of {} maps kept",
        maps.len(),
        document.maps.len()
    );

    DefinitionDocument {
        title: document.title.clone(),
        maps,
    }
}
