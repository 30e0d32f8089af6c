//! Batch functions backing the per-request loaders. Each runs one query (two for comment
//! pages) for a whole batch of keys against the Postgres pool.

mod comments;
mod users;
mod votes;

pub use comments::{CommentsByComment, CommentsByPost, CommentsByUser, PageKey, MAX_PAGE_SIZE};
pub use users::UserById;
pub use votes::{VotesByComment, VotesByPost};
