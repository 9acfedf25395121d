use std::sync::Arc;

use async_trait::async_trait;
use tollgate_common::ConditionalSync;

use crate::{ApiRequest, ApiResponse, TollgateHttpError, Transport};

/// One link in the request pipeline.
///
/// A middleware receives the request and the rest of the chain. It may
/// adjust the request and pass it on with [Next::run] (pass-through), answer
/// without calling `next` at all (short-circuit), or call `next` more than
/// once (retry). Whatever it returns is what the previous link sees.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Middleware: ConditionalSync {
    /// Handle `request`, delegating to `next` as needed
    async fn handle(
        &self,
        request: ApiRequest,
        next: Next<'_>,
    ) -> Result<ApiResponse, TollgateHttpError>;
}

/// The remainder of a middleware chain, ending in a [Transport].
///
/// `Next` is `Copy`, so a middleware can run the rest of the chain again.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    transport: &'a dyn Transport,
    chain: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    /// The chain `chain`, in order, followed by `transport`
    pub fn new(transport: &'a dyn Transport, chain: &'a [Arc<dyn Middleware>]) -> Self {
        Self { transport, chain }
    }

    /// Send `request` through the rest of the chain
    pub async fn run(self, request: ApiRequest) -> Result<ApiResponse, TollgateHttpError> {
        match self.chain.split_first() {
            Some((middleware, rest)) => {
                middleware
                    .handle(
                        request,
                        Next {
                            transport: self.transport,
                            chain: rest,
                        },
                    )
                    .await
            }
            None => self.transport.send(request).await,
        }
    }
}
