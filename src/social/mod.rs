//! Posting to the social platform.
//!
//! - [`oauth`] - OAuth 1.0a request signing
//! - [`twitter`] - The platform client implementing [`Poster`]

pub mod oauth;
pub mod twitter;

use async_trait::async_trait;

pub use oauth::OAuthCredentials;
pub use twitter::TwitterClient;

/// Posting collaborator.
///
/// Implementations retry rate limits internally and report every failure as
/// `None` (or a shorter id list); nothing is raised to the caller.
#[async_trait]
pub trait Poster: Send + Sync {
    /// Post `text`; the new post id on success.
    async fn post_tweet(&self, text: &str) -> Option<String>;

    /// Upload `image` and post it with `text`.
    async fn upload_media_and_post(&self, text: &str, image: &[u8], filename: &str)
        -> Option<String>;

    /// Post `texts` as a reply chain; ids of the items that went out, in order.
    async fn post_thread(&self, texts: &[String]) -> Vec<String>;
}
