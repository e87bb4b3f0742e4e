use alloy_sol_types::sol;

sol! {
    function balanceOf(address account) external view returns (uint256);

    struct Call { address target; bytes callData; }
    function aggregate(Call[] calls) external returns (uint256 blockNumber, bytes[] returnData);
    function getEthBalance(address addr) external view returns (uint256 balance);
}

/// Human-readable signatures handed to the dynamic ABI layer by strategies.
pub const ERC20_BALANCE_OF: &str = "function balanceOf(address account) view returns (uint256)";
pub const GET_ETH_BALANCE: &str = "function getEthBalance(address addr) view returns (uint256)";
