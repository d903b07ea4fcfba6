// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ERC-20 call encoding for the funded token.

use alloy::{
    primitives::{Address, U256},
    sol,
    sol_types::SolCall,
};

sol! {
    interface IERC20 {
        function transfer(address to, uint256 value) external returns (bool);
    }
}

/// Convert whole tokens to the contract's base unit.
pub fn to_base_units(amount: u64, decimals: u8) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(decimals))
}

/// ABI-encode a `transfer(to, value)` call.
pub fn encode_transfer(to: Address, value: U256) -> Vec<u8> {
    IERC20::transferCall { to, value }.abi_encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn base_units_scale_by_decimals() {
        assert_eq!(to_base_units(1, 18), U256::from(1_000_000_000_000_000_000u64));
        assert_eq!(to_base_units(1000, 6), U256::from(1_000_000_000u64));
        assert_eq!(to_base_units(0, 18), U256::ZERO);

        let thousand = U256::from(1000u64) * U256::from(10u64).pow(U256::from(18u8));
        assert_eq!(to_base_units(1000, 18), thousand);
    }

    #[test]
    fn transfer_calldata_layout() {
        let to = Address::from_str("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12").unwrap();
        let data = encode_transfer(to, U256::from(5u64));

        // selector + two 32-byte words
        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(&data[..4], IERC20::transferCall::SELECTOR.as_slice());
        assert_eq!(&data[16..36], to.as_slice());
        assert_eq!(data[67], 5);
    }
}
