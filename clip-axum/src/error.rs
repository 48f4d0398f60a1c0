use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clip_blob::UploadOutcome;
use clip_core::errors::ClipError;

/// Error returned by the upload routes before the pipeline takes over
/// (guard rejections, unreadable bodies).
#[derive(Debug)]
pub struct ClipAxumError(pub anyhow::Error);

impl From<anyhow::Error> for ClipAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<ClipError> for ClipAxumError {
    fn from(e: ClipError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for ClipAxumError {
    fn into_response(self) -> Response {
        // a ClipError anywhere in the chain keeps its status; anything else is a 500
        let clip = ClipError::normalize(self.0);
        if !clip.kind.is_client_error() {
            tracing::error!(error = %clip, "upload request failed");
        }
        let safe = clip.sanitize_for_client();
        let status = StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}

/// An [`UploadOutcome`] rendered as the intake response.
#[derive(Debug)]
pub struct UploadResponse(pub UploadOutcome);

impl IntoResponse for UploadResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clip_blob::{StorageResult, UploadError};

    #[test]
    fn guard_errors_keep_their_status() {
        let res = ClipAxumError::from(ClipError::forbidden("Invalid or missing upload nonce."))
            .into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn foreign_errors_become_500() {
        let res = ClipAxumError(anyhow::anyhow!("identity provider timed out")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn outcome_status_follows_error_kind() {
        let ok = UploadResponse(UploadOutcome::success(StorageResult::new("default")));
        assert_eq!(ok.into_response().status(), StatusCode::OK);

        let too_large = UploadOutcome::from_error(&UploadError::TooLarge { size: 9, max: 5 });
        assert_eq!(
            UploadResponse(too_large).into_response().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
