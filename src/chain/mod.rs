pub mod abi;
pub mod rpc;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::RentalRecord;

/// Read-only view of the marketplace contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Fetch the rental state for one token.
    async fn rental_record(&self, token_id: u64) -> Result<RentalRecord>;

    /// Highest minted token id; 0 when nothing has been minted yet.
    async fn last_token_id(&self) -> Result<u64>;
}

/// State-changing access to the marketplace contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainWriter: Send + Sync {
    /// Submit the contract's batch expiry check for `[start_id, end_id]`
    /// and wait for the transaction to be included.
    async fn expire_batch(&self, start_id: u64, end_id: u64) -> Result<()>;
}
