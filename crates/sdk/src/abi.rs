//! Contract bindings generated from the versioned ABI artifacts in `/abi`.
//!
//! Function selectors and event topics are derived from these artifacts at
//! compile time, so a contract upgrade is picked up by replacing the JSON file
//! and bumping `REVISION`.

/// Revision of the matching engine ABI the bindings were generated from.
pub const MATCHING_ENGINE_REVISION: &str = env!("MATCHING_ENGINE_REVISION");

pub mod matching_engine {
    alloy::sol!(
        #[allow(missing_docs)]
        #[derive(Debug)]
        MatchingEngine,
        "../../abi/matching_engine/MatchingEngine.json"
    );
}

pub mod erc20 {
    alloy::sol!(
        #[allow(missing_docs)]
        #[derive(Debug)]
        IERC20,
        "../../abi/erc20/IERC20.json"
    );
}
