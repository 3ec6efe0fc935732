//! Solidity bindings for the metered token contracts.

use alloy_sol_types::sol;

sol! {
    #[sol(rpc)]
    contract IMeteredToken {
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

sol! {
    #[sol(rpc)]
    contract IDepositManager {
        function depositBaseTokens(uint256 amount) external payable;
        function getPrice() external view returns (uint256);
    }
}

sol! {
    #[sol(rpc)]
    contract IQueryTool {
        function queryAI(uint256 cost) external;
    }
}
