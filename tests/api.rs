use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use photo_feed::{
    auth::JwtService,
    config::JwtConfig,
    domain::{CommentRepository, FileStorage, LikeRepository, PostRepository, StoredObject},
    errors::{RepoError, StorageError},
    memory::{InMemoryDatabase, InMemoryFileStorage},
    models::{Comment, Like, Post, User},
    routes::create_router,
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "photo-feed-test-boundary";
const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

fn jwt() -> JwtService {
    JwtService::new(JwtConfig {
        secret: "integration-secret".to_string(),
        expiration_hours: 1,
        issuer: "photo-feed-tests".to_string(),
    })
}

fn setup() -> (Router, Arc<AppState>) {
    let state = AppState::in_memory(jwt(), "http://media.test");
    (create_router(state.clone()), state)
}

/// In-memory state with some repositories swapped out.
fn assemble(
    db: &Arc<InMemoryDatabase>,
    posts: Arc<dyn PostRepository>,
    likes: Arc<dyn LikeRepository>,
    comments: Arc<dyn CommentRepository>,
    file_storage: Arc<dyn FileStorage>,
) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        users: db.clone(),
        posts,
        likes,
        comments,
        file_storage,
        jwt: jwt(),
        media_base_url: "http://media.test".to_string(),
    });
    (create_router(state.clone()), state)
}

async fn seed_user(state: &AppState, username: &str) -> (Uuid, String) {
    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        password_hash: "unused".to_string(),
        avatar_url: None,
        created_at: Utc::now(),
    };
    state.users.create(&user).await.unwrap();
    (user.id, state.jwt.issue(user.id).unwrap())
}

struct FilePart<'a> {
    name: &'a str,
    file_name: Option<&'a str>,
    content_type: Option<&'a str>,
    data: &'a [u8],
}

fn multipart_body(parts: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(file_name) = part.file_name {
            disposition.push_str(&format!("; filename=\"{}\"", file_name));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn image_part(data: &[u8]) -> FilePart<'_> {
    FilePart { name: "image", file_name: Some("photo.png"), content_type: Some("image/png"), data }
}

fn text_part<'a>(name: &'a str, value: &'a str) -> FilePart<'a> {
    FilePart { name, file_name: None, content_type: None, data: value.as_bytes() }
}

fn multipart_request(method: Method, uri: &str, token: Option<&str>, parts: &[FilePart<'_>]) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY));
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, value)
}

async fn create_post(app: &Router, token: &str, description: Option<&str>) -> Value {
    let mut parts = vec![image_part(PNG)];
    if let Some(description) = description {
        parts.push(text_part("description", description));
    }
    let (status, body) = send(app, multipart_request(Method::POST, "/posts", Some(token), &parts)).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
    body
}

async fn list_posts(app: &Router) -> Vec<Value> {
    let (status, body) = send(app, json_request(Method::GET, "/posts", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    body.as_array().cloned().unwrap()
}

#[tokio::test]
async fn empty_feed_lists_nothing() {
    let (app, _) = setup();
    assert!(list_posts(&app).await.is_empty());

    let (status, body) = send(&app, json_request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn creating_a_post_requires_authentication() {
    let (app, _) = setup();
    let request = multipart_request(Method::POST, "/posts", None, &[image_part(PNG)]);
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
    assert!(list_posts(&app).await.is_empty());

    let request = multipart_request(Method::POST, "/posts", Some("not-a-token"), &[image_part(PNG)]);
    assert_eq!(send(&app, request).await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn creating_a_post_without_an_image_persists_nothing() {
    let (app, state) = setup();
    let (_, token) = seed_user(&state, "alice").await;

    let request = multipart_request(Method::POST, "/posts", Some(token.as_str()), &[text_part("description", "no picture")]);
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Image is required");

    let request = multipart_request(Method::POST, "/posts", Some(token.as_str()), &[image_part(&[])]);
    assert_eq!(send(&app, request).await.0, StatusCode::BAD_REQUEST);

    assert!(list_posts(&app).await.is_empty());
}

#[tokio::test]
async fn created_post_appears_in_feed_with_author_and_image() {
    let (app, state) = setup();
    let (alice, token) = seed_user(&state, "alice").await;

    let post = create_post(&app, &token, Some("  first light  ")).await;
    assert_eq!(post["authorId"], alice.to_string());
    assert_eq!(post["description"], "first light");
    let image_url = post["imageUrl"].as_str().unwrap().to_string();
    assert!(image_url.starts_with("http://media.test/images/posts/"));

    let feed = list_posts(&app).await;
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["id"], post["id"]);
    assert_eq!(feed[0]["author"]["username"], "alice");
    assert_eq!(feed[0]["likes"], json!([]));
    assert_eq!(feed[0]["_count"]["comments"], 0);

    let image_path = image_url.trim_start_matches("http://media.test");
    let response = app.clone().oneshot(json_request(Method::GET, image_path, None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], PNG);
}

#[tokio::test]
async fn feed_is_newest_first() {
    let (app, state) = setup();
    let (_, token) = seed_user(&state, "alice").await;

    let first = create_post(&app, &token, Some("one")).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = create_post(&app, &token, Some("two")).await;

    let feed = list_posts(&app).await;
    assert_eq!(feed[0]["id"], second["id"]);
    assert_eq!(feed[1]["id"], first["id"]);
}

#[tokio::test]
async fn liking_twice_restores_membership() {
    let (app, state) = setup();
    let (_, author_token) = seed_user(&state, "alice").await;
    let (bob, bob_token) = seed_user(&state, "bob").await;
    let post = create_post(&app, &author_token, None).await;
    let like_uri = format!("/posts/{}/like", post["id"].as_str().unwrap());

    let (status, body) = send(&app, json_request(Method::POST, &like_uri, Some(bob_token.as_str()), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "liked": true, "likeCount": 1 }));
    assert_eq!(list_posts(&app).await[0]["likes"], json!([{ "userId": bob.to_string() }]));

    let (status, body) = send(&app, json_request(Method::POST, &like_uri, Some(bob_token.as_str()), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "liked": false, "likeCount": 0 }));
    assert_eq!(list_posts(&app).await[0]["likes"], json!([]));
}

#[tokio::test]
async fn liking_requires_auth_and_an_existing_post() {
    let (app, state) = setup();
    let (_, token) = seed_user(&state, "bob").await;
    let missing = format!("/posts/{}/like", Uuid::new_v4());

    assert_eq!(send(&app, json_request(Method::POST, &missing, None, None)).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(send(&app, json_request(Method::POST, &missing, Some(token.as_str()), None)).await.0, StatusCode::NOT_FOUND);
    assert_eq!(
        send(&app, json_request(Method::POST, "/posts/not-a-uuid/like", Some(token.as_str()), None)).await.0,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn comments_are_listed_in_creation_order_with_authors() {
    let (app, state) = setup();
    let (_, alice_token) = seed_user(&state, "alice").await;
    let (_, bob_token) = seed_user(&state, "bob").await;
    let post = create_post(&app, &alice_token, None).await;
    let uri = format!("/posts/{}/comments", post["id"].as_str().unwrap());

    for (token, text) in [(&bob_token, "nice"), (&alice_token, "thanks"), (&bob_token, "  again  ")] {
        let (status, body) = send(&app, json_request(Method::POST, &uri, Some(token.as_str()), Some(json!({ "content": text })))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["content"], text.trim());
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let (status, body) = send(&app, json_request(Method::GET, &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<&str> = body.as_array().unwrap().iter().map(|c| c["content"].as_str().unwrap()).collect();
    assert_eq!(contents, vec!["nice", "thanks", "again"]);
    assert_eq!(body[0]["author"]["username"], "bob");
    assert_eq!(body[1]["author"]["username"], "alice");

    assert_eq!(list_posts(&app).await[0]["_count"]["comments"], 3);
}

#[tokio::test]
async fn invalid_comments_are_rejected() {
    let (app, state) = setup();
    let (_, token) = seed_user(&state, "alice").await;
    let post = create_post(&app, &token, None).await;
    let uri = format!("/posts/{}/comments", post["id"].as_str().unwrap());

    let unauthenticated = json_request(Method::POST, &uri, None, Some(json!({ "content": "hi" })));
    assert_eq!(send(&app, unauthenticated).await.0, StatusCode::UNAUTHORIZED);

    let blank = json_request(Method::POST, &uri, Some(token.as_str()), Some(json!({ "content": "   " })));
    assert_eq!(send(&app, blank).await.0, StatusCode::BAD_REQUEST);

    let malformed = json_request(Method::POST, &uri, Some(token.as_str()), Some(json!({ "text": "hi" })));
    let (status, body) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let missing_post = format!("/posts/{}/comments", Uuid::new_v4());
    let request = json_request(Method::POST, &missing_post, Some(token.as_str()), Some(json!({ "content": "hi" })));
    assert_eq!(send(&app, request).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_author_cannot_delete_and_nothing_changes() {
    let (app, state) = setup();
    let (_, alice_token) = seed_user(&state, "alice").await;
    let (_, bob_token) = seed_user(&state, "bob").await;
    let post = create_post(&app, &alice_token, Some("mine")).await;
    let id = post["id"].as_str().unwrap().to_string();

    send(&app, json_request(Method::POST, &format!("/posts/{}/like", id), Some(bob_token.as_str()), None)).await;
    let comment = json_request(Method::POST, &format!("/posts/{}/comments", id), Some(bob_token.as_str()), Some(json!({ "content": "hey" })));
    send(&app, comment).await;
    let before = list_posts(&app).await;

    let (status, body) = send(&app, json_request(Method::DELETE, &format!("/posts/{}", id), Some(bob_token.as_str()), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Not allowed");

    let after = list_posts(&app).await;
    assert_eq!(before, after);
    assert_eq!(after[0]["likes"].as_array().unwrap().len(), 1);
    assert_eq!(after[0]["_count"]["comments"], 1);

    let anonymous = json_request(Method::DELETE, &format!("/posts/{}", id), None, None);
    assert_eq!(send(&app, anonymous).await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn author_delete_cascades_to_likes_comments_and_image() {
    let (app, state) = setup();
    let (_, alice_token) = seed_user(&state, "alice").await;
    let (_, bob_token) = seed_user(&state, "bob").await;
    let post = create_post(&app, &alice_token, None).await;
    let keep = create_post(&app, &alice_token, Some("keep")).await;
    let id = post["id"].as_str().unwrap().to_string();
    let post_id = Uuid::parse_str(&id).unwrap();

    send(&app, json_request(Method::POST, &format!("/posts/{}/like", id), Some(bob_token.as_str()), None)).await;
    let comment = json_request(Method::POST, &format!("/posts/{}/comments", id), Some(bob_token.as_str()), Some(json!({ "content": "bye" })));
    send(&app, comment).await;

    let (status, body) = send(&app, json_request(Method::DELETE, &format!("/posts/{}", id), Some(alice_token.as_str()), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let feed = list_posts(&app).await;
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["id"], keep["id"]);

    let (status, comments) = send(&app, json_request(Method::GET, &format!("/posts/{}/comments", id), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments, json!([]));
    assert!(state.likes.list_for_post(post_id).await.unwrap().is_empty());

    let image_path = post["imageUrl"].as_str().unwrap().trim_start_matches("http://media.test").to_string();
    assert_eq!(send(&app, json_request(Method::GET, &image_path, None, None)).await.0, StatusCode::NOT_FOUND);

    let again = json_request(Method::DELETE, &format!("/posts/{}", id), Some(alice_token.as_str()), None);
    assert_eq!(send(&app, again).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_with_a_malformed_id_is_bad_request() {
    let (app, state) = setup();
    let (_, token) = seed_user(&state, "alice").await;
    let request = json_request(Method::DELETE, "/posts/p1", Some(token.as_str()), None);
    assert_eq!(send(&app, request).await.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_login_and_me() {
    let (app, _) = setup();
    let credentials = json!({ "username": "carol", "password": "long-enough-pw" });

    let (status, body) = send(&app, json_request(Method::POST, "/auth/register", None, Some(credentials.clone()))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["username"], "carol");
    assert!(body["user"].get("passwordHash").is_none());

    let duplicate = json!({ "username": "Carol", "password": "another-password" });
    assert_eq!(send(&app, json_request(Method::POST, "/auth/register", None, Some(duplicate))).await.0, StatusCode::CONFLICT);

    let short = json!({ "username": "dave", "password": "short" });
    assert_eq!(send(&app, json_request(Method::POST, "/auth/register", None, Some(short))).await.0, StatusCode::BAD_REQUEST);

    let wrong = json!({ "username": "carol", "password": "wrong-password" });
    assert_eq!(send(&app, json_request(Method::POST, "/auth/login", None, Some(wrong))).await.0, StatusCode::UNAUTHORIZED);

    let unknown = json!({ "username": "nobody", "password": "long-enough-pw" });
    assert_eq!(send(&app, json_request(Method::POST, "/auth/login", None, Some(unknown))).await.0, StatusCode::UNAUTHORIZED);

    let (status, login) = send(&app, json_request(Method::POST, "/auth/login", None, Some(credentials))).await;
    assert_eq!(status, StatusCode::OK);
    let token = login["token"].as_str().unwrap();

    let (status, me) = send(&app, json_request(Method::GET, "/users/me", Some(token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], body["user"]["id"]);
    assert_eq!(send(&app, json_request(Method::GET, "/users/me", None, None)).await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn avatar_update_shows_up_on_posts() {
    let (app, state) = setup();
    let (_, token) = seed_user(&state, "alice").await;
    create_post(&app, &token, None).await;

    let missing = multipart_request(Method::PUT, "/users/avatar", Some(token.as_str()), &[text_part("other", "x")]);
    assert_eq!(send(&app, missing).await.0, StatusCode::BAD_REQUEST);

    let avatar = FilePart { name: "avatar", file_name: Some("avatar.jpg"), content_type: Some("image/jpeg"), data: PNG };
    let (status, profile) = send(&app, multipart_request(Method::PUT, "/users/avatar", Some(token.as_str()), &[avatar])).await;
    assert_eq!(status, StatusCode::OK);
    let avatar_url = profile["avatarUrl"].as_str().unwrap().to_string();
    assert!(avatar_url.starts_with("http://media.test/images/avatars/"));
    assert!(avatar_url.ends_with(".jpg"));

    assert_eq!(list_posts(&app).await[0]["author"]["avatarUrl"], avatar_url);

    let anonymous = multipart_request(Method::PUT, "/users/avatar", None, &[]);
    assert_eq!(send(&app, anonymous).await.0, StatusCode::UNAUTHORIZED);
}

struct FailingStorage;

#[async_trait]
impl FileStorage for FailingStorage {
    async fn upload(&self, key: &str, _data: Vec<u8>, _content_type: Option<String>) -> Result<(), StorageError> {
        Err(StorageError::UploadFailed(format!("refusing {}", key)))
    }

    async fn download(&self, key: &str) -> Result<StoredObject, StorageError> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

#[tokio::test]
async fn failed_upload_persists_no_post() {
    let state = AppState::with_storage(jwt(), "http://media.test", Arc::new(FailingStorage));
    let app = create_router(state.clone());
    let (_, token) = seed_user(&state, "alice").await;

    let (status, body) = send(&app, multipart_request(Method::POST, "/posts", Some(token.as_str()), &[image_part(PNG)])).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "File storage operation failed");
    assert!(list_posts(&app).await.is_empty());
}

#[tokio::test]
async fn concurrent_toggles_by_one_user_stay_consistent() {
    let (app, state) = setup();
    let (_, author_token) = seed_user(&state, "alice").await;
    let (bob, bob_token) = seed_user(&state, "bob").await;
    let post = create_post(&app, &author_token, None).await;
    let like_uri = format!("/posts/{}/like", post["id"].as_str().unwrap());
    let like = || json_request(Method::POST, &like_uri, Some(bob_token.as_str()), None);

    let ((first_status, first), (second_status, second)) = tokio::join!(send(&app, like()), send(&app, like()));
    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_ne!(first["liked"], second["liked"]);

    let likes = list_posts(&app).await[0]["likes"].as_array().cloned().unwrap();
    assert!(likes.len() <= 1);
    assert!(likes.iter().all(|l| l["userId"] == bob.to_string()));

    let (status, third) = send(&app, like()).await;
    assert_eq!(status, StatusCode::OK);
    let after = list_posts(&app).await[0]["likes"].as_array().cloned().unwrap();
    assert_eq!(third["liked"], json!(likes.is_empty()));
    assert_eq!(after.len(), if likes.is_empty() { 1 } else { 0 });
    assert_eq!(third["likeCount"], json!(after.len()));
}

/// Removes the target post right before each like or comment write, as if the
/// owner's delete landed between the request arriving and the write.
struct PostVanishesBeforeWrite {
    db: Arc<InMemoryDatabase>,
}

#[async_trait]
impl CommentRepository for PostVanishesBeforeWrite {
    async fn create(&self, comment: &Comment) -> Result<(), RepoError> {
        PostRepository::delete(&*self.db, comment.post_id).await?;
        CommentRepository::create(&*self.db, comment).await
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        CommentRepository::list_for_post(&*self.db, post_id).await
    }

    async fn count_for_post(&self, post_id: Uuid) -> Result<usize, RepoError> {
        self.db.count_for_post(post_id).await
    }

    async fn delete_for_post(&self, post_id: Uuid) -> Result<usize, RepoError> {
        CommentRepository::delete_for_post(&*self.db, post_id).await
    }
}

#[async_trait]
impl LikeRepository for PostVanishesBeforeWrite {
    async fn toggle(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        PostRepository::delete(&*self.db, post_id).await?;
        self.db.toggle(post_id, user_id).await
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Like>, RepoError> {
        LikeRepository::list_for_post(&*self.db, post_id).await
    }

    async fn delete_for_post(&self, post_id: Uuid) -> Result<usize, RepoError> {
        LikeRepository::delete_for_post(&*self.db, post_id).await
    }
}

#[tokio::test]
async fn writes_after_the_post_vanished_are_refused() {
    let db = Arc::new(InMemoryDatabase::new());
    let vanishing = Arc::new(PostVanishesBeforeWrite { db: db.clone() });
    let (app, state) = assemble(&db, db.clone(), vanishing.clone(), vanishing, Arc::new(InMemoryFileStorage::new()));
    let (_, token) = seed_user(&state, "alice").await;
    let commented = create_post(&app, &token, None).await;
    let liked = create_post(&app, &token, None).await;

    let comments_uri = format!("/posts/{}/comments", commented["id"].as_str().unwrap());
    let request = json_request(Method::POST, &comments_uri, Some(token.as_str()), Some(json!({ "content": "too late" })));
    assert_eq!(send(&app, request).await.0, StatusCode::NOT_FOUND);

    let like_uri = format!("/posts/{}/like", liked["id"].as_str().unwrap());
    assert_eq!(send(&app, json_request(Method::POST, &like_uri, Some(token.as_str()), None)).await.0, StatusCode::NOT_FOUND);

    assert!(list_posts(&app).await.is_empty());
    assert_eq!(send(&app, json_request(Method::GET, &comments_uri, None, None)).await.1, json!([]));
    let liked_id = Uuid::parse_str(liked["id"].as_str().unwrap()).unwrap();
    assert!(state.likes.list_for_post(liked_id).await.unwrap().is_empty());
}

/// Lets a comment and a like land between the cascade steps and the removal of the post row.
struct WritesDuringCascade {
    db: Arc<InMemoryDatabase>,
    late_user: Uuid,
}

#[async_trait]
impl PostRepository for WritesDuringCascade {
    async fn create(&self, post: &Post) -> Result<(), RepoError> {
        PostRepository::create(&*self.db, post).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        PostRepository::get_by_id(&*self.db, id).await
    }

    async fn list_all(&self) -> Result<Vec<Post>, RepoError> {
        self.db.list_all().await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let late = Comment {
            id: Uuid::new_v4(),
            post_id: id,
            author_id: self.late_user,
            content: "just in time".to_string(),
            created_at: Utc::now(),
        };
        CommentRepository::create(&*self.db, &late).await?;
        self.db.toggle(id, self.late_user).await?;
        PostRepository::delete(&*self.db, id).await
    }
}

#[tokio::test]
async fn delete_sweeps_writes_that_landed_during_the_cascade() {
    let db = Arc::new(InMemoryDatabase::new());
    let posts = Arc::new(WritesDuringCascade { db: db.clone(), late_user: Uuid::new_v4() });
    let (app, state) = assemble(&db, posts, db.clone(), db.clone(), Arc::new(InMemoryFileStorage::new()));
    let (_, token) = seed_user(&state, "alice").await;
    let post = create_post(&app, &token, None).await;
    let id = post["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, json_request(Method::DELETE, &format!("/posts/{}", id), Some(token.as_str()), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, comments) = send(&app, json_request(Method::GET, &format!("/posts/{}/comments", id), None, None)).await;
    assert_eq!(comments, json!([]));
    assert!(state.likes.list_for_post(Uuid::parse_str(&id).unwrap()).await.unwrap().is_empty());
}

#[tokio::test]
async fn replacing_an_avatar_removes_the_old_object() {
    let (app, state) = setup();
    let (_, token) = seed_user(&state, "alice").await;

    let mut keys = Vec::new();
    for _ in 0..2 {
        let avatar = FilePart { name: "avatar", file_name: Some("avatar.png"), content_type: Some("image/png"), data: PNG };
        let (status, profile) = send(&app, multipart_request(Method::PUT, "/users/avatar", Some(token.as_str()), &[avatar])).await;
        assert_eq!(status, StatusCode::OK);
        let url = profile["avatarUrl"].as_str().unwrap();
        keys.push(url.trim_start_matches("http://media.test/images/").to_string());
    }

    assert_ne!(keys[0], keys[1]);
    assert!(matches!(state.file_storage.download(&keys[0]).await, Err(StorageError::NotFound(_))));
    assert!(state.file_storage.download(&keys[1]).await.is_ok());
}

/// Memory storage that remembers every key it was asked to store.
#[derive(Default)]
struct RecordingStorage {
    inner: InMemoryFileStorage,
    uploaded: Mutex<Vec<String>>,
}

#[async_trait]
impl FileStorage for RecordingStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: Option<String>) -> Result<(), StorageError> {
        self.uploaded.lock().unwrap().push(key.to_string());
        self.inner.upload(key, data, content_type).await
    }

    async fn download(&self, key: &str) -> Result<StoredObject, StorageError> {
        self.inner.download(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(key).await
    }
}

struct RejectingPosts {
    db: Arc<InMemoryDatabase>,
}

#[async_trait]
impl PostRepository for RejectingPosts {
    async fn create(&self, post: &Post) -> Result<(), RepoError> {
        Err(RepoError::DataCorruption(format!("refusing post {}", post.id)))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        PostRepository::get_by_id(&*self.db, id).await
    }

    async fn list_all(&self) -> Result<Vec<Post>, RepoError> {
        self.db.list_all().await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        PostRepository::delete(&*self.db, id).await
    }
}

#[tokio::test]
async fn failed_post_insert_removes_the_uploaded_image() {
    let db = Arc::new(InMemoryDatabase::new());
    let storage = Arc::new(RecordingStorage::default());
    let posts = Arc::new(RejectingPosts { db: db.clone() });
    let (app, state) = assemble(&db, posts, db.clone(), db.clone(), storage.clone());
    let (_, token) = seed_user(&state, "alice").await;

    let (status, _) = send(&app, multipart_request(Method::POST, "/posts", Some(token.as_str()), &[image_part(PNG)])).await;
    assert!(status.is_server_error());

    let uploaded = storage.uploaded.lock().unwrap().clone();
    assert_eq!(uploaded.len(), 1);
    assert!(matches!(storage.download(&uploaded[0]).await, Err(StorageError::NotFound(_))));
    assert!(list_posts(&app).await.is_empty());
}
