//! Blog entities as resolvers hand them to the GraphQL layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: i32,
    pub user_id: i32,
    pub title: String,
    pub subtitle: String,
    pub post_text: String,
    pub created_at: DateTime<Utc>,
    pub deleted: bool,
    pub published: bool,
}

impl Post {
    /// Title as it appears in post URLs.
    pub fn url_encoded_title(&self) -> String {
        self.title
            .split_whitespace()
            .map(|word| {
                word.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>()
            })
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join("-")
            .to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: i32,
    pub response_to_comment_id: Option<i32>,
    pub post_id: i32,
    pub user_id: i32,
    pub comment_text: String,
    pub created_at: DateTime<Utc>,
    pub deleted: bool,
    #[serde(rename = "hasSubComments")]
    pub has_sub_comments: bool,
}

/// Vote totals of a post or comment. A target nobody voted on has all-zero totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Votes {
    pub upvote: i64,
    pub downvote: i64,
}

impl Votes {
    /// Counts one stored vote value. Neutral (and unknown) values count nowhere.
    pub fn record(&mut self, vote_value: i32) {
        match VoteValue::from(vote_value) {
            VoteValue::Upvote => self.upvote += 1,
            VoteValue::Downvote => self.downvote += 1,
            VoteValue::Neutral => {}
        }
    }
}

/// One page of comments. `more` is set when comments exist past the end of the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedComments {
    pub comments: Vec<Comment>,
    pub more: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
    Upvote,
    Downvote,
    Neutral,
}

impl From<i32> for VoteValue {
    fn from(value: i32) -> Self {
        match value {
            1 => VoteValue::Upvote,
            -1 => VoteValue::Downvote,
            _ => VoteValue::Neutral,
        }
    }
}

impl From<VoteValue> for i32 {
    fn from(value: VoteValue) -> Self {
        match value {
            VoteValue::Upvote => 1,
            VoteValue::Downvote => -1,
            VoteValue::Neutral => 0,
        }
    }
}

/// What a comment search is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentType {
    Post,
    Comment,
}

/// Arguments of a comment search anchored on a post or on a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSearch {
    pub parent_id: i32,
    pub parent_type: ParentType,
    pub offset: i32,
    pub limit: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_values_round_trip_storage() {
        for value in [VoteValue::Upvote, VoteValue::Downvote, VoteValue::Neutral] {
            assert_eq!(VoteValue::from(i32::from(value)), value);
        }
        assert_eq!(VoteValue::from(7), VoteValue::Neutral);
    }

    #[test]
    fn tallies_ignore_neutral_votes() {
        let mut votes = Votes::default();
        for value in [1, 1, -1, 0, 1] {
            votes.record(value);
        }
        assert_eq!(votes, Votes { upvote: 3, downvote: 1 });
    }

    #[test]
    fn url_title() {
        let post = Post {
            post_id: 1,
            user_id: 1,
            title: "Hello,  World! It's 2024".to_owned(),
            subtitle: String::new(),
            post_text: String::new(),
            created_at: Utc::now(),
            deleted: false,
            published: true,
        };
        assert_eq!(post.url_encoded_title(), "hello-world-its-2024");
    }

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&VoteValue::Downvote).unwrap(), "\"downvote\"");
        assert_eq!(serde_json::to_string(&ParentType::Comment).unwrap(), "\"comment\"");
    }
}
