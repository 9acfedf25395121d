use async_trait::async_trait;
use tollgate_common::ConditionalSync;

use crate::{ApiRequest, ApiResponse, TollgateHttpError};

mod network;
pub use network::*;

/// Something that can deliver an [ApiRequest] and return whatever response
/// came back, whatever its status.
///
/// Transports do not interpret statuses; only failures to obtain a response
/// at all are errors.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Transport: ConditionalSync {
    /// Deliver `request`
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TollgateHttpError>;
}
