//! HTTP client for the API and the feed state used by front ends.

mod api;
mod feed;

pub use api::{ApiClient, ClientError};
pub use feed::{
    FeedApi, FeedState, AVATAR_FAILED_ALERT, COMMENTS_LOAD_FAILED_ALERT, COMMENT_FAILED_ALERT, DELETE_FAILED_ALERT,
    LIKE_FAILED_ALERT, LOAD_FAILED_ALERT,
};
