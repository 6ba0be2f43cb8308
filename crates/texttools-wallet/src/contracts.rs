//! Contract calls issued by the client.

use alloy::sol;

sol! {
    /// InputBox entry point: queue `payload` for the application at `appContract`.
    #[derive(Debug, PartialEq, Eq)]
    function addInput(address appContract, bytes payload) external returns (bytes32);
}
