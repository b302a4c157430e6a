//! Ledger constants

/// Staleness horizon: a block may only extend a branch whose new height is
/// strictly greater than `max_height - CUT_OFF_AGE`
pub const CUT_OFF_AGE: u64 = 10;

/// Height of the genesis block
pub const GENESIS_HEIGHT: u64 = 1;

/// Value minted by every block's coinbase transaction
pub const BLOCK_REWARD: i64 = 25;

/// Index of the single coinbase output
pub const COINBASE_OUTPUT_INDEX: u64 = 0;
