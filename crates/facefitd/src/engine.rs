//! Engine: a dedicated OS thread owning the session and the host.
//!
//! All control-socket operations funnel through one mpsc channel, so each
//! request runs to completion before the next starts; the host's modifier
//! and camera state is never touched by two operations at once.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use facefit_core::{LandmarkExtractor, ModelController, Session};

use crate::ops;
use crate::protocol::{Request, Response};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Everything one fitting session needs, owned by the engine thread.
pub struct Engine {
    pub(crate) session: Session,
    pub(crate) host: Box<dyn ModelController + Send>,
    pub(crate) extractor: Box<dyn LandmarkExtractor + Send>,
}

impl Engine {
    pub fn new(
        host: Box<dyn ModelController + Send>,
        extractor: Box<dyn LandmarkExtractor + Send>,
    ) -> Self {
        Self {
            session: Session::new(),
            host,
            extractor,
        }
    }
}

struct EngineRequest {
    request: Request,
    reply: oneshot::Sender<Response>,
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Run one operation on the engine thread and await its response.
    pub async fn call(&self, request: Request) -> Result<Response, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the engine on a dedicated OS thread and return its handle.
pub fn spawn_engine(
    host: Box<dyn ModelController + Send>,
    extractor: Box<dyn LandmarkExtractor + Send>,
    channel_depth: usize,
) -> EngineHandle {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(channel_depth.max(1));

    std::thread::Builder::new()
        .name("facefit-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            let mut engine = Engine::new(host, extractor);
            while let Some(req) = rx.blocking_recv() {
                let response = ops::dispatch(&mut engine, &req.request);
                let _ = req.reply.send(response);
            }
            tracing::info!("engine thread exiting");
        })
        .expect("failed to spawn engine thread");

    EngineHandle { tx }
}
