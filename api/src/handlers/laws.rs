use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::handlers::ErrorResponse;
use crate::state::AppState;
use common::db::repositories::LawRepository;
use common::gii::archive::decode_data_uri;
use common::models::Law;
use common::schemas::{
    ContentItemFields, DataResponse, LawAllFields, LawBasicFields, ListResponse, PageQuery, Pagination,
};

async fn law_by_slug(repo: &LawRepository, slug: &str) -> Result<Law, ErrorResponse> {
    repo.find_by_slug(slug).await?.ok_or_else(|| {
        ErrorResponse::not_found(format!("Law '{}' not found", slug))
            .with_details(serde_json::json!({ "slug": slug }))
    })
}

/// List laws ordered by slug
#[tracing::instrument(skip(state))]
pub async fn list_laws(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ListResponse<LawBasicFields>>, ErrorResponse> {
    let Query(query) = query.map_err(ErrorResponse::from)?;
    let (limit, offset) = query.resolve();
    let repo = state.laws();

    let laws = repo.list(limit, offset).await?;
    let total = repo.count().await?;

    Ok(Json(ListResponse {
        data: laws.iter().map(LawBasicFields::from).collect(),
        pagination: Pagination { limit, offset, total },
    }))
}

#[tracing::instrument(skip(state))]
pub async fn get_law(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<DataResponse<LawAllFields>>, ErrorResponse> {
    let repo = state.laws();
    let law = law_by_slug(&repo, &slug).await?;
    let fields = LawAllFields::load(&repo, &law).await?;
    Ok(Json(DataResponse::new(fields)))
}

#[tracing::instrument(skip(state))]
pub async fn get_law_contents(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<DataResponse<Vec<ContentItemFields>>>, ErrorResponse> {
    let repo = state.laws();
    let law = law_by_slug(&repo, &slug).await?;
    let contents = repo.find_contents(law.id).await?;
    Ok(Json(DataResponse::new(ContentItemFields::from_items(&contents))))
}

/// Serve an attachment's decoded bytes with its MIME type
#[tracing::instrument(skip(state))]
pub async fn get_attachment(
    State(state): State<AppState>,
    Path((slug, name)): Path<(String, String)>,
) -> Result<Response, ErrorResponse> {
    let repo = state.laws();
    let law = law_by_slug(&repo, &slug).await?;
    let attachment = repo
        .find_attachment(law.id, &name)
        .await?
        .ok_or_else(|| ErrorResponse::not_found(format!("Attachment '{}' not found", name)))?;

    attachment_response(&attachment.data_uri)
}

fn attachment_response(data_uri: &str) -> Result<Response, ErrorResponse> {
    let (mime, data) = decode_data_uri(data_uri).ok_or_else(|| {
        tracing::error!("Stored attachment is not a base64 data URI");
        ErrorResponse::new("internal_error", "Attachment data is corrupt")
    })?;

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, mime)], data).into_response())
}
