use async_trait::async_trait;
use sqlx::PgPool;

use crate::{batch_function::BatchFunction, model::User};

const USERS_BY_ID: &str =
    "SELECT user_id, username, email, created_at, active FROM users WHERE user_id = ANY($1)";

/// Users by primary key. Ids without a row resolve to `None`.
pub struct UserById;

#[async_trait]
impl BatchFunction<i32, Option<User>> for UserById {
    type Context = PgPool;
    type Error = sqlx::Error;

    async fn load(keys: &[i32], pool: &PgPool) -> Result<Vec<(i32, Option<User>)>, sqlx::Error> {
        let users: Vec<User> = sqlx::query_as(USERS_BY_ID).bind(keys).fetch_all(pool).await?;
        Ok(users.into_iter().map(|user| (user.user_id, Some(user))).collect())
    }
}
