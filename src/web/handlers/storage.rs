//! Public blob download: `GET /storage/:bucket/:name`.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::blobs::Bucket;
use crate::links::content_type_for;
use crate::web::state::SharedState;
use crate::web::utils::api_error;

pub async fn blob_handler(
    State(state): State<SharedState>,
    Path((bucket, name)): Path<(String, String)>,
) -> Response {
    let Ok(bucket) = bucket.parse::<Bucket>() else {
        return api_error(StatusCode::NOT_FOUND, "bucket not found");
    };
    let data = {
        let st = state.lock().await;
        st.blobs.get(bucket, &name)
    };
    match data {
        Ok(Some(data)) => {
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type_for(&name)),
                    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
                    (header::CONTENT_SECURITY_POLICY, "default-src 'none'; sandbox"),
                    (header::CACHE_CONTROL, "public, max-age=86400, immutable"),
                ],
                data,
            )
                .into_response()
        }
        Ok(None) | Err(crate::storage::StorageError::InvalidBlobName(_)) => {
            api_error(StatusCode::NOT_FOUND, "blob not found")
        }
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
