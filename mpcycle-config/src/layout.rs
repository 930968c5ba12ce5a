//! Derives window positions from the configured arrangement.

use mpcycle_common::{Arrangement, MpcycleError, Result, error::LayoutError};
use crate::{GlobalConfig, Position, SlotConfig, WindowSize};

/// Space left between neighbouring windows in row and column layouts.
pub const WINDOW_GAP: u32 = 5;

fn effective_position(config: &GlobalConfig, slot: &SlotConfig) -> Option<Position> {
    slot.options.window_position.or(config.defaults.window_position)
}

fn effective_size(config: &GlobalConfig, slot: &SlotConfig) -> Option<WindowSize> {
    slot.options
        .window_size
        .filter(WindowSize::is_set)
        .or(config.defaults.window_size)
}

/// Fills in `window_position` for every window after the first when the layout is
/// `row` or `column`. With `none` it only checks that every window has a position.
pub fn resolve_positions(config: &mut GlobalConfig) -> Result<()> {
    match config.layout {
        Arrangement::None => {
            for slot in &config.slots {
                if effective_position(config, slot).is_none() {
                    return Err(MpcycleError::Layout(LayoutError::MissingPosition {
                        slot: slot.index,
                    }));
                }
            }
            Ok(())
        }
        Arrangement::Row | Arrangement::Column => stack(config),
    }
}

fn stack(config: &mut GlobalConfig) -> Result<()> {
    let layout = config.layout;
    let Some(first) = config.slots.first() else {
        return Ok(());
    };

    let mut previous = effective_position(config, first)
        .ok_or(MpcycleError::Layout(LayoutError::MissingPosition { slot: first.index }))?;

    for index in 1..config.slots.len() {
        let prev_slot = &config.slots[index - 1];
        let size = effective_size(config, prev_slot).unwrap_or_default();

        let next = match layout {
            Arrangement::Row => {
                let width = size.width.ok_or(MpcycleError::Layout(LayoutError::MissingSize {
                    slot: prev_slot.index,
                    dimension: "width",
                }))?;
                Position {
                    x: previous.x.saturating_add_unsigned(width.saturating_add(WINDOW_GAP)),
                    y: previous.y,
                }
            }
            _ => {
                let height = size.height.ok_or(MpcycleError::Layout(LayoutError::MissingSize {
                    slot: prev_slot.index,
                    dimension: "height",
                }))?;
                Position {
                    x: previous.x,
                    y: previous.y.saturating_add_unsigned(height.saturating_add(WINDOW_GAP)),
                }
            }
        };

        log::info!("Layout {}: window-{} placed at {}:{}", layout, index, next.x, next.y);
        config.slots[index].options.window_position = Some(next);
        previous = next;
    }

    Ok(())
}
