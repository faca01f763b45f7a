//! Upload routes consumed by the browser upload client, relative to `/api`.

use crate::handlers::{multipart, sign_s3};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/uppy/sign-s3",
            get(sign_s3::sign_s3_query).post(sign_s3::sign_s3_body),
        )
        .route("/uppy/s3/multipart", post(multipart::create_multipart))
        .route(
            "/uppy/s3/multipart/{upload_id}",
            get(multipart::list_parts).delete(multipart::abort_multipart),
        )
        .route(
            "/uppy/s3/multipart/{upload_id}/complete",
            post(multipart::complete_multipart),
        )
        .route(
            "/uppy/s3/multipart/{upload_id}/{part_number}",
            get(multipart::sign_part),
        )
}
