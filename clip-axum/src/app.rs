use axum::body::Body;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use clip_blob::UploadPipeline;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::intake::read_upload;
use crate::{ClipAxumError, ClipAxumState, UploadGuard, UploadResponse};

/// Path the intake route is mounted on.
pub const UPLOAD_PATH: &str = "/uploads";

/// `POST /uploads`: guard, then hand the parsed form to the pipeline.
pub async fn upload(
    State(state): State<ClipAxumState>,
    headers: HeaderMap,
    body: Body,
) -> Result<UploadResponse, ClipAxumError> {
    let form = read_upload(&headers, body, state.pipeline.config()).await?;
    let actor = state.guard.authorize(&headers, form.nonce.as_deref()).await?;

    let outcome = state.pipeline.process(form.request, &actor).await;
    Ok(UploadResponse(outcome))
}

async fn health() -> &'static str {
    "ok"
}

/// The HTTP face of an upload pipeline.
///
/// `router` holds the bare routes; request-id and trace layers are added by
/// [`ClipApp::into_router`], so routes mounted later get them too.
#[derive(Clone)]
pub struct ClipApp {
    pub state: ClipAxumState,
    pub router: Router<()>,
}

impl ClipApp {
    pub fn new<G: UploadGuard + 'static>(pipeline: UploadPipeline, guard: G) -> Self {
        Self::from_state(ClipAxumState::new(pipeline, guard))
    }

    pub fn from_state(state: ClipAxumState) -> Self {
        let router = Router::new()
            .route(UPLOAD_PATH, post(upload))
            .route("/health", get(health))
            .with_state(state.clone());

        Self { state, router }
    }

    /// Mount extra routes next to the upload route.
    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.router = self.router.nest(path, router);
        self
    }

    /// The finished router: every response carries `x-request-id`.
    pub fn into_router(self) -> Router<()> {
        self.router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "voice upload intake listening");
        axum::serve(listener, self.into_router()).await?;
        Ok(())
    }
}
