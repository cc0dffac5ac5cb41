use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct CreatePost {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// What `/echo/...` saw: lets clients assert on the exact request they sent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub uri: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Query string accepted by `GET /posts`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Only posts carrying this tag.
    pub tag: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Post>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", get(get_post).delete(delete_post))
        .route("/tags", get(list_tags))
        .route("/echo/{*rest}", get(echo).post(echo).put(echo).delete(echo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Posts ordered by title, optionally narrowed to one tag.
async fn list_posts(State(db): State<Db>, Query(query): Query<ListQuery>) -> Json<Vec<Post>> {
    let posts = db.read().await;
    let mut listed: Vec<Post> = posts
        .values()
        .filter(|post| query.tag.as_ref().map_or(true, |tag| post.tags.contains(tag)))
        .cloned()
        .collect();
    listed.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
    Json(listed)
}

/// Every tag in use, sorted and deduplicated.
async fn list_tags(State(db): State<Db>) -> Json<Vec<String>> {
    let posts = db.read().await;
    let tags: BTreeSet<String> = posts.values().flat_map(|post| post.tags.iter().cloned()).collect();
    Json(tags.into_iter().collect())
}

/// Tags are trimmed, lowercased and deduplicated; a blank title is rejected.
async fn create_post(
    State(db): State<Db>,
    Json(input): Json<CreatePost>,
) -> Result<(StatusCode, Json<Post>), StatusCode> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    let post = Post {
        id: Uuid::new_v4(),
        title: title.to_string(),
        body: input.body,
        tags: normalize_tags(input.tags),
    };
    db.write().await.insert(post.id, post.clone());
    Ok((StatusCode::CREATED, Json(post)))
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

async fn get_post(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, StatusCode> {
    let posts = db.read().await;
    posts.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn delete_post(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let mut posts = db.write().await;
    posts.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or(StatusCode::NOT_FOUND)
}

async fn echo(method: Method, OriginalUri(uri): OriginalUri, headers: HeaderMap, body: String) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        uri: uri.to_string(),
        headers,
        body,
    })
}
