//! Connected-user profile reader

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::client::{Client, Content};
use crate::error::{Error, Result};

/// Lazy reader over a user profile.
///
/// With no profile id this reads the connected user (`/user`); with a
/// username it reads `/users/{username}`. Lookups are memoized and failures
/// read as absent rather than erroring, since an anonymous visitor is an
/// expected state.
pub struct Profile<'a> {
    client: &'a Client,
    profile_id: Option<String>,
    details: RwLock<Option<Value>>,
}

impl std::fmt::Debug for Profile<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("profile_id", &self.profile_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct EmailEntry {
    email: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    verified: bool,
}

impl<'a> Profile<'a> {
    pub(crate) fn new(client: &'a Client, profile_id: Option<&str>) -> Result<Self> {
        if let Some(id) = profile_id {
            if id.is_empty() || id.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::invalid_argument(
                    "profile id must be a username, or None for the connected user",
                ));
            }
            if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return Err(Error::invalid_argument("profile id is not a valid username"));
            }
        }

        Ok(Self {
            client,
            profile_id: profile_id.map(String::from),
            details: RwLock::new(None),
        })
    }

    /// The username this profile reads, or the connected user's id.
    pub async fn id(&self) -> String {
        match &self.profile_id {
            Some(id) => id.clone(),
            None => self.client.get_user().await.to_string(),
        }
    }

    /// The profile details, fetched once.
    ///
    /// An anonymous connected-user profile resolves to an empty object; a
    /// failed fetch resolves to `None` and is retried on the next call.
    pub async fn details(&self) -> Option<Value> {
        if let Some(cached) = self.details.read().await.clone() {
            return Some(cached);
        }

        let fetched = match &self.profile_id {
            Some(username) => self.fetch(&format!("/users/{username}")).await,
            None => {
                if self.client.get_user().await != 0 {
                    self.fetch("/user").await
                } else {
                    Some(Value::Object(serde_json::Map::new()))
                }
            }
        };

        if let Some(value) = &fetched {
            *self.details.write().await = Some(value.clone());
        }
        fetched
    }

    /// One field of the profile details.
    ///
    /// An absent `email` falls back to the primary-email lookup, which needs
    /// the `user:email` scope.
    pub async fn detail(&self, key: &str) -> Option<Value> {
        let details = self.details().await?;
        match details.get(key) {
            Some(value) if !value.is_null() => Some(value.clone()),
            _ if key == "email" => self.primary_email().await.map(Value::String),
            _ => None,
        }
    }

    /// The best email on record: primary first, then verified.
    pub async fn primary_email(&self) -> Option<String> {
        if self.profile_id.is_some() {
            return self
                .details()
                .await?
                .get("email")
                .and_then(Value::as_str)
                .map(String::from);
        }

        let listing = match self.client.get("/user/emails", &[]).await {
            Ok(Content::Json(value)) => value,
            Ok(Content::Text(_)) => return None,
            Err(err) => {
                debug!(error = %err, "could not list user emails");
                return None;
            }
        };

        let mut entries: Vec<EmailEntry> = serde_json::from_value(listing).ok()?;
        if entries.is_empty() {
            return None;
        }
        entries.sort_by(|a, b| (b.primary, b.verified).cmp(&(a.primary, a.verified)));
        entries.into_iter().next().map(|entry| entry.email)
    }

    async fn fetch(&self, path: &str) -> Option<Value> {
        match self.client.get(path, &[]).await {
            Ok(content) => content.into_json(),
            Err(err) => {
                debug!(error = %err, path, "could not fetch profile details");
                None
            }
        }
    }
}
