use reqwest::{
    multipart::{Form, Part},
    RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AuthResponse, CommentView, Credentials, LikeToggle, NewComment, Post, PostView, UserProfile};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("Not logged in")]
    NotAuthenticated,
}

/// Thin typed wrapper over the REST endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn logout(&mut self) {
        self.token = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotAuthenticated)?;
        Ok(request.bearer_auth(token))
    }

    /// Registers and keeps the returned token for later calls.
    pub async fn register(&mut self, username: &str, password: &str) -> Result<UserProfile, ClientError> {
        let body = Credentials { username: username.to_string(), password: password.to_string() };
        let auth: AuthResponse = decode(self.http.post(self.url("/auth/register")).json(&body).send().await?).await?;
        self.token = Some(auth.token);
        Ok(auth.user)
    }

    /// Logs in and keeps the returned token for later calls.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<UserProfile, ClientError> {
        let body = Credentials { username: username.to_string(), password: password.to_string() };
        let auth: AuthResponse = decode(self.http.post(self.url("/auth/login")).json(&body).send().await?).await?;
        self.token = Some(auth.token);
        Ok(auth.user)
    }

    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        decode(self.authed(self.http.get(self.url("/users/me")))?.send().await?).await
    }

    pub async fn list_posts(&self) -> Result<Vec<PostView>, ClientError> {
        decode(self.http.get(self.url("/posts")).send().await?).await
    }

    pub async fn create_post(
        &self,
        image: Vec<u8>,
        file_name: &str,
        content_type: &str,
        description: Option<&str>,
    ) -> Result<Post, ClientError> {
        let part = Part::bytes(image).file_name(file_name.to_string()).mime_str(content_type)?;
        let mut form = Form::new().part("image", part);
        if let Some(description) = description {
            form = form.text("description", description.to_string());
        }
        let request = self.authed(self.http.post(self.url("/posts")))?.multipart(form);
        decode(request.send().await?).await
    }

    pub async fn delete_post(&self, post_id: Uuid) -> Result<(), ClientError> {
        let request = self.authed(self.http.delete(self.url(&format!("/posts/{}", post_id))))?;
        let _: Value = decode(request.send().await?).await?;
        Ok(())
    }

    pub async fn toggle_like(&self, post_id: Uuid) -> Result<LikeToggle, ClientError> {
        let request = self.authed(self.http.post(self.url(&format!("/posts/{}/like", post_id))))?;
        decode(request.send().await?).await
    }

    pub async fn create_comment(&self, post_id: Uuid, content: &str) -> Result<CommentView, ClientError> {
        let body = NewComment { content: content.to_string() };
        let request = self
            .authed(self.http.post(self.url(&format!("/posts/{}/comments", post_id))))?
            .json(&body);
        decode(request.send().await?).await
    }

    pub async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentView>, ClientError> {
        decode(self.http.get(self.url(&format!("/posts/{}/comments", post_id))).send().await?).await
    }

    pub async fn update_avatar(&self, image: Vec<u8>, file_name: &str, content_type: &str) -> Result<UserProfile, ClientError> {
        let part = Part::bytes(image).file_name(file_name.to_string()).mime_str(content_type)?;
        let request = self
            .authed(self.http.put(self.url("/users/avatar")))?
            .multipart(Form::new().part("avatar", part));
        decode(request.send().await?).await
    }
}

/// Parses a success body, or turns the `{ "error": ... }` body into `ClientError::Api`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(text);
    tracing::debug!(%status, %message, "API call failed");
    Err(ClientError::Api { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:3000/");
        assert_eq!(client.url("/posts"), "http://localhost:3000/posts");
    }

    #[tokio::test]
    async fn authed_calls_require_a_token() {
        let client = ApiClient::new("http://localhost:3000");
        let result = client.toggle_like(Uuid::new_v4()).await;
        assert!(matches!(result, Err(ClientError::NotAuthenticated)));

        let mut client = client.with_token("abc");
        assert_eq!(client.token(), Some("abc"));
        client.logout();
        assert!(client.token().is_none());
    }
}
