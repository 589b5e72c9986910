use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Deserialize, PartialEq, Eq, Debug)]
pub struct SearchPage {
    #[serde(default)]
    pub items: Vec<RepositoryCandidate>,
}

/// A search hit, not yet fetched in detail.
#[derive(Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct RepositoryCandidate {
    pub full_name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
}

#[derive(Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub struct User {
    pub id: u64,
}

#[derive(Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct PullRequest {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: User,
    pub comments_url: String,
}

#[derive(Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Issue {
    pub created_at: DateTime<Utc>,
    pub user: User,
    pub comments_url: String,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    /// The issues endpoint also lists pull requests, tagged with a `pull_request` object.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Comment {
    /// `null` for comments left by deleted accounts.
    pub user: Option<User>,
    pub created_at: DateTime<Utc>,
}

/// Anything whose discussion thread can be scanned for a first reply.
pub trait Discussion {
    fn opened_at(&self) -> DateTime<Utc>;
    fn author(&self) -> User;
    fn comments_url(&self) -> &str;
}

impl Discussion for PullRequest {
    fn opened_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn author(&self) -> User {
        self.user
    }
    fn comments_url(&self) -> &str {
        &self.comments_url
    }
}

impl Discussion for Issue {
    fn opened_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn author(&self) -> User {
        self.user
    }
    fn comments_url(&self) -> &str {
        &self.comments_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_page_decodes() {
        let page = serde_json::from_str::<SearchPage>(
            r#"
{
  "total_count": 2,
  "incomplete_results": false,
  "items": [
    {
      "full_name": "psf/requests-toolbelt",
      "language": "Python",
      "stargazers_count": 210,
      "forks_count": 40,
      "private": false
    },
    {
      "full_name": "someone/untyped",
      "language": null,
      "stargazers_count": 180
    }
  ]
}
"#,
        )
        .unwrap();
        assert_eq!(
            page,
            SearchPage {
                items: vec![
                    RepositoryCandidate {
                        full_name: "psf/requests-toolbelt".to_string(),
                        language: Some("Python".to_string()),
                        stargazers_count: 210,
                        forks_count: 40,
                    },
                    RepositoryCandidate {
                        full_name: "someone/untyped".to_string(),
                        language: None,
                        stargazers_count: 180,
                        forks_count: 0,
                    }
                ]
            }
        )
    }

    #[test]
    fn search_page_without_items_is_empty() {
        let page = serde_json::from_str::<SearchPage>(r#"{"message": "nothing"}"#).unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn issue_flags_pull_requests() {
        let issues = serde_json::from_str::<Vec<Issue>>(
            r#"
[
  {
    "created_at": "2024-05-01T10:00:00Z",
    "user": {"id": 7, "login": "a"},
    "comments_url": "https://api.github.com/repos/o/r/issues/1/comments"
  },
  {
    "created_at": "2024-05-01T11:00:00Z",
    "user": {"id": 8},
    "comments_url": "https://api.github.com/repos/o/r/issues/2/comments",
    "pull_request": {"url": "https://api.github.com/repos/o/r/pulls/2"}
  }
]
"#,
        )
        .unwrap();
        assert!(!issues[0].is_pull_request());
        assert!(issues[1].is_pull_request());
        assert_eq!(issues[0].author(), User { id: 7 });
    }

    #[test]
    fn comment_from_deleted_account_decodes() {
        let comment = serde_json::from_str::<Comment>(
            r#"{"user": null, "created_at": "2024-05-01T10:00:00+00:00"}"#,
        )
        .unwrap();
        assert_eq!(comment.user, None);
    }

    #[test]
    fn pull_request_missing_fields_fails() {
        assert!(serde_json::from_str::<PullRequest>(r#"{"created_at": "2024-05-01T10:00:00Z"}"#).is_err());
    }
}
