use helper_functions::crypto::{hash_tree_root, signed_root};
use types::beacon_state::BeaconState;
use types::config::Config;
use types::primitives::{Slot, H256};
use types::types::BeaconBlock;

use crate::blocks::block_processing::process_block;
use crate::epochs::process_epoch::process_epoch;
use crate::error::Error;

/// Advances `state` to the block's slot and applies the block.
///
/// `validate_state_root` is on in production; builders proposing a block
/// with a not-yet-known state root switch it off.
pub fn state_transition<C: Config>(
    state: &mut BeaconState<C>,
    block: &BeaconBlock<C>,
    validate_state_root: bool,
) -> Result<(), Error> {
    process_slots(state, block.slot)?;
    process_block(state, block)?;

    if validate_state_root {
        let computed = hash_tree_root(state);
        if block.state_root != computed {
            return Err(Error::StateRootMismatch {
                in_block: block.state_root,
                computed,
            });
        }
    }

    Ok(())
}

/// Runs slot processing (including empty slots) up to `slot`, processing the
/// epoch on every epoch boundary along the way.
pub fn process_slots<C: Config>(state: &mut BeaconState<C>, slot: Slot) -> Result<(), Error> {
    if state.slot > slot {
        return Err(Error::SlotsOutOfOrder {
            state_slot: state.slot,
            target_slot: slot,
        });
    }

    while state.slot < slot {
        process_slot(state);
        if (state.slot + 1) % C::slots_per_epoch() == 0 {
            process_epoch(state)?;
        }
        state.slot += 1;
    }

    Ok(())
}

fn process_slot<C: Config>(state: &mut BeaconState<C>) {
    let previous_state_root = hash_tree_root(state);
    let history_index = (state.slot % C::slots_per_historical_root()) as usize;

    state.state_roots[history_index] = previous_state_root;

    // The header proposed at this slot committed to a zeroed state root;
    // backfill it now that the state root is known.
    if state.latest_block_header.state_root == H256::zero() {
        state.latest_block_header.state_root = previous_state_root;
    }

    state.block_roots[history_index] = signed_root(&state.latest_block_header);
}
