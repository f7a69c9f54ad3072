use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::graph::{Graph, LayerFilter, LayerId, Node};

use super::{LayoutSlot, SlotMap};

/// Assigns grid slots to every node admitted by `filter`.
///
/// Each visible layer forms one band (bands follow layer order). Inside a
/// band, categories are numbered by first appearance in declaration order;
/// category `c` takes column `c % max_columns` of wrap block
/// `c / max_columns`, and its members stack downward in declaration order.
pub fn compute_slots(graph: &Graph, filter: LayerFilter, config: &LayoutConfig) -> SlotMap {
    let mut slots = SlotMap::new();
    let bands: Vec<LayerId> = match filter {
        LayerFilter::All => graph.layer_ids().collect(),
        LayerFilter::Only(layer) => vec![layer],
    };
    let max_columns = config.max_columns.max(1);

    let mut row_offset = 0usize;
    let mut band = 0usize;
    for layer in bands {
        let members = graph.nodes_by_layer(layer);
        if members.is_empty() {
            continue;
        }
        let rows = place_band(&members, max_columns, row_offset, band, &mut slots);
        row_offset += rows;
        band += 1;
    }
    slots
}

fn place_band(
    members: &[&Node],
    max_columns: usize,
    row_offset: usize,
    band: usize,
    slots: &mut SlotMap,
) -> usize {
    let mut categories: Vec<Vec<&Node>> = Vec::new();
    let mut category_index: HashMap<&str, usize> = HashMap::new();
    for &node in members {
        let idx = *category_index
            .entry(node.category.as_str())
            .or_insert_with(|| {
                categories.push(Vec::new());
                categories.len() - 1
            });
        categories[idx].push(node);
    }

    let mut block_top = row_offset;
    let mut total_rows = 0usize;
    for block in categories.chunks(max_columns) {
        let block_rows = block.iter().map(Vec::len).max().unwrap_or(0);
        for (column, category) in block.iter().enumerate() {
            for (k, node) in category.iter().enumerate() {
                slots.insert(
                    node.id.clone(),
                    LayoutSlot {
                        node_id: node.id.clone(),
                        row: block_top + k,
                        column,
                        band,
                    },
                );
            }
        }
        block_top += block_rows;
        total_rows += block_rows;
    }
    total_rows
}

/// Grid extent of a slot map as `(rows, columns, bands)`.
pub fn slot_extent(slots: &SlotMap) -> (usize, usize, usize) {
    let mut rows = 0;
    let mut columns = 0;
    let mut bands = 0;
    for slot in slots.values() {
        rows = rows.max(slot.row + 1);
        columns = columns.max(slot.column + 1);
        bands = bands.max(slot.band + 1);
    }
    (rows, columns, bands)
}
