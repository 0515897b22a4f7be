//! Generic CRUD handlers, instantiated once per [`Resource`].

use axum::{
    extract::{FromRequest, FromRequestParts, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::db::SharedDb;
use crate::error::UmsError;
use crate::resource::Resource;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

/// JSON body whose rejections use the `{success, message}` envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(UmsError))]
pub struct UmsJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(UmsError))]
pub struct UmsQuery<T>(pub T);

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Overlay the keys of `patch` onto the current entity and re-parse.
fn merge<R: Resource>(current: &R, patch: Value) -> Result<R, UmsError> {
    let Value::Object(patch) = patch else {
        return Err(UmsError::Validation("update body must be a JSON object".into()));
    };
    let mut value = serde_json::to_value(current)?;
    if let Some(obj) = value.as_object_mut() {
        obj.extend(patch);
    }
    Ok(serde_json::from_value(value)?)
}

fn prepare<R: Resource>(mut data: R, db: &SharedDb) -> Result<R, UmsError> {
    data.normalize();
    data.validate()?;
    data.check_references(db)?;
    Ok(data)
}

/// GET /api/{resource}?page=&limit=&search=
pub async fn list<R: Resource>(
    State(db): State<SharedDb>,
    UmsQuery(query): UmsQuery<ListQuery>,
) -> Json<Value> {
    let (page, limit) = (query.page(), query.limit());
    let (records, total) = R::collection(&db).page(query.search.as_deref(), page, limit);
    let data: Vec<Value> = records.iter().map(|r| R::populate(r, &db)).collect();
    Json(json!({
        "success": true,
        "data": data,
        "total": total,
        "page": page,
        "pages": total.div_ceil(limit),
    }))
}

/// GET /api/{resource}/{id}
pub async fn get_one<R: Resource>(State(db): State<SharedDb>, Path(id): Path<String>) -> Result<Json<Value>, UmsError> {
    let record = R::collection(&db).get(&id).ok_or(UmsError::NotFound(R::LABEL))?;
    Ok(Json(json!({ "success": true, "data": R::populate(&record, &db) })))
}

/// POST /api/{resource}
pub async fn create<R: Resource>(
    State(db): State<SharedDb>,
    UmsJson(data): UmsJson<R>,
) -> Result<(StatusCode, Json<Value>), UmsError> {
    let record = {
        let _writes = db.write_guard();
        R::collection(&db).insert(prepare(data, &db)?)?
    };
    info!(kind = R::LABEL, id = %record.id, "record created");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": R::populate(&record, &db) }))))
}

/// PUT /api/{resource}/{id}; only the supplied fields change.
pub async fn update<R: Resource>(
    State(db): State<SharedDb>,
    Path(id): Path<String>,
    UmsJson(patch): UmsJson<Value>,
) -> Result<Json<Value>, UmsError> {
    let collection = R::collection(&db);
    let record = {
        let _writes = db.write_guard();
        let current = collection.get(&id).ok_or(UmsError::NotFound(R::LABEL))?;
        let data = prepare(merge(&current.data, patch)?, &db)?;
        collection.replace(&id, data)?.ok_or(UmsError::NotFound(R::LABEL))?
    };
    Ok(Json(json!({ "success": true, "data": R::populate(&record, &db) })))
}

/// DELETE /api/{resource}/{id}
pub async fn remove<R: Resource>(State(db): State<SharedDb>, Path(id): Path<String>) -> Result<Json<Value>, UmsError> {
    let collection = R::collection(&db);
    {
        let _writes = db.write_guard();
        if !collection.contains(&id) {
            return Err(UmsError::NotFound(R::LABEL));
        }
        R::ensure_deletable(&id, &db)?;
        collection.remove(&id).ok_or(UmsError::NotFound(R::LABEL))?;
    }
    info!(kind = R::LABEL, id = %id, "record deleted");
    Ok(Json(json!({ "success": true, "message": format!("{} deleted", R::LABEL) })))
}
