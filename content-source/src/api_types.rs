//! Wire types for the Qiita Team API (only the fields we consume).

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// An article as returned by `GET /items`.
#[derive(Clone, Debug, Deserialize)]
pub struct QiitaArticle {
    pub id: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: QiitaUser,
}

/// Article author.
#[derive(Clone, Debug, Deserialize)]
pub struct QiitaUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl QiitaArticle {
    /// Display author: the profile name when present, the login id otherwise.
    pub fn author(&self) -> &str {
        if self.user.name.trim().is_empty() {
            &self.user.id
        } else {
            &self.user.name
        }
    }
}
