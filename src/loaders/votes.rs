use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{batch_function::BatchFunction, model::Votes};

const POST_VOTES: &str =
    "SELECT post_id, vote_value FROM post_votes WHERE post_id = ANY($1)";
const COMMENT_VOTES: &str =
    "SELECT comment_id, vote_value FROM comment_votes WHERE comment_id = ANY($1)";

/// Vote totals per post id.
pub struct VotesByPost;

/// Vote totals per comment id.
pub struct VotesByComment;

#[async_trait]
impl BatchFunction<i32, Votes> for VotesByPost {
    type Context = PgPool;
    type Error = sqlx::Error;

    async fn load(keys: &[i32], pool: &PgPool) -> Result<Vec<(i32, Votes)>, sqlx::Error> {
        load_votes(POST_VOTES, keys, pool).await
    }
}

#[async_trait]
impl BatchFunction<i32, Votes> for VotesByComment {
    type Context = PgPool;
    type Error = sqlx::Error;

    async fn load(keys: &[i32], pool: &PgPool) -> Result<Vec<(i32, Votes)>, sqlx::Error> {
        load_votes(COMMENT_VOTES, keys, pool).await
    }
}

async fn load_votes(
    sql: &'static str,
    keys: &[i32],
    pool: &PgPool,
) -> Result<Vec<(i32, Votes)>, sqlx::Error> {
    let rows: Vec<(i32, i32)> = sqlx::query_as(sql).bind(keys).fetch_all(pool).await?;
    Ok(tally(keys, rows))
}

/// Counts `(target id, vote value)` rows into one total per key. Every key gets a total, zero
/// when no row mentions it.
fn tally<I>(keys: &[i32], rows: I) -> Vec<(i32, Votes)>
where
    I: IntoIterator<Item = (i32, i32)>,
{
    let mut totals: HashMap<i32, Votes> = keys.iter().map(|key| (*key, Votes::default())).collect();
    for (target, vote_value) in rows {
        if let Some(votes) = totals.get_mut(&target) {
            votes.record(vote_value);
        }
    }
    keys.iter().map(|key| (*key, totals.get(key).copied().unwrap_or_default())).collect()
}
