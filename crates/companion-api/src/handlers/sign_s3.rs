use crate::auth::CurrentIdentity;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson, ValidatedQuery};
use crate::middleware::ResolvedTenant;
use crate::services::upload::{metadata_bag, SignS3Params, SignedPut};
use crate::state::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

async fn sign(
    state: &AppState,
    tenant: &ResolvedTenant,
    identity: &CurrentIdentity,
    params: SignS3Params,
) -> Result<Json<SignedPut>, HttpAppError> {
    let content_type = params.content_type().map(str::to_string);
    let mut metadata = metadata_bag(params.metadata);

    let signed = state
        .broker
        .sign_single_put(
            &tenant.0,
            params.filename.as_deref(),
            content_type.as_deref(),
            &identity.0,
            metadata.as_mut(),
        )
        .await?;
    Ok(Json(signed))
}

/// Presign a single PUT upload (query parameters)
#[utoipa::path(
    get,
    path = "/{brand}/api/uppy/sign-s3",
    tag = "uploads",
    params(
        ("brand" = String, Path, description = "Tenant slug"),
        ("filename" = String, Query, description = "Original file name"),
        ("contentType" = String, Query, description = "MIME type (alias: type)")
    ),
    responses(
        (status = 200, description = "Presigned PUT", body = SignedPut),
        (status = 400, description = "Missing parameters or storage configuration", body = ErrorResponse),
        (status = 404, description = "Unknown brand", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn sign_s3_query(
    State(state): State<Arc<AppState>>,
    tenant: ResolvedTenant,
    identity: CurrentIdentity,
    ValidatedQuery(params): ValidatedQuery<SignS3Params>,
) -> Result<Json<SignedPut>, HttpAppError> {
    sign(&state, &tenant, &identity, params).await
}

/// Presign a single PUT upload (JSON body)
#[utoipa::path(
    post,
    path = "/{brand}/api/uppy/sign-s3",
    tag = "uploads",
    params(("brand" = String, Path, description = "Tenant slug")),
    request_body = SignS3Params,
    responses(
        (status = 200, description = "Presigned PUT", body = SignedPut),
        (status = 400, description = "Missing parameters or storage configuration", body = ErrorResponse),
        (status = 404, description = "Unknown brand", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn sign_s3_body(
    State(state): State<Arc<AppState>>,
    tenant: ResolvedTenant,
    identity: CurrentIdentity,
    ValidatedJson(params): ValidatedJson<SignS3Params>,
) -> Result<Json<SignedPut>, HttpAppError> {
    sign(&state, &tenant, &identity, params).await
}
