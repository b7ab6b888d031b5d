//! PBX OpenAPI integration: token lifecycle, session lookup and transfer

pub mod client;
mod locator;
mod token;
mod transfer;

pub use client::{PbxApi, PbxClient};
pub use locator::SessionLocator;
pub use token::{Credential, TokenManager};
pub use transfer::{SessionTransferClient, TransferOutcome};
