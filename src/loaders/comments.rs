use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::{
    batch_function::BatchFunction,
    model::{Comment, PaginatedComments},
};

/// Largest page a client can ask for.
pub const MAX_PAGE_SIZE: i32 = 50;

const REPLIED_TO: &str = "SELECT DISTINCT response_to_comment_id FROM comments \
     WHERE response_to_comment_id = ANY($1)";

/// One page of comments under one parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageKey {
    pub parent_id: i32,
    pub offset: i32,
    pub limit: i32,
}

impl PageKey {
    /// Builds a key with `limit` clamped to `1..=MAX_PAGE_SIZE` and a non-negative `offset`.
    pub fn new(parent_id: i32, offset: i32, limit: i32) -> Self {
        Self { parent_id, offset: offset.max(0), limit: limit.clamp(1, MAX_PAGE_SIZE) }
    }
}

/// Top-level comments of a post.
pub struct CommentsByPost;

/// Direct replies to a comment.
pub struct CommentsByComment;

/// Everything a user commented, on any post.
pub struct CommentsByUser;

#[derive(Debug, Clone, Copy)]
enum Parent {
    Post,
    Comment,
    User,
}

impl Parent {
    fn filter(self) -> &'static str {
        match self {
            Parent::Post => "c.post_id = k.parent_id AND c.response_to_comment_id IS NULL",
            Parent::Comment => "c.response_to_comment_id = k.parent_id",
            Parent::User => "c.user_id = k.parent_id",
        }
    }

    /// Every page key of the batch is answered by one lateral query. Each page fetches one row
    /// past its limit so `more` can be computed.
    fn page_query(self) -> String {
        format!(
            "SELECT k.parent_id, k.page_offset, k.page_limit, p.comment_id, \
                p.response_to_comment_id, p.post_id, p.user_id, p.comment_text, p.created_at, \
                p.deleted \
             FROM UNNEST($1::int4[], $2::int4[], $3::int4[]) AS k(parent_id, page_offset, page_limit) \
             CROSS JOIN LATERAL ( \
                SELECT c.* FROM comments c \
                WHERE {} \
                ORDER BY c.created_at DESC, c.comment_id DESC \
                OFFSET k.page_offset LIMIT k.page_limit + 1 \
             ) p",
            self.filter()
        )
    }
}

macro_rules! comment_pages {
    ($batch_fn:ty, $parent:expr) => {
        #[async_trait]
        impl BatchFunction<PageKey, PaginatedComments> for $batch_fn {
            type Context = PgPool;
            type Error = sqlx::Error;

            async fn load(
                keys: &[PageKey],
                pool: &PgPool,
            ) -> Result<Vec<(PageKey, PaginatedComments)>, sqlx::Error> {
                load_pages($parent, keys, pool).await
            }
        }
    };
}

comment_pages!(CommentsByPost, Parent::Post);
comment_pages!(CommentsByComment, Parent::Comment);
comment_pages!(CommentsByUser, Parent::User);

#[derive(Debug, Clone, FromRow)]
struct CommentRow {
    parent_id: i32,
    page_offset: i32,
    page_limit: i32,
    comment_id: i32,
    response_to_comment_id: Option<i32>,
    post_id: i32,
    user_id: i32,
    comment_text: String,
    created_at: DateTime<Utc>,
    deleted: bool,
}

impl CommentRow {
    fn key(&self) -> PageKey {
        PageKey { parent_id: self.parent_id, offset: self.page_offset, limit: self.page_limit }
    }

    fn into_comment(self) -> Comment {
        Comment {
            comment_id: self.comment_id,
            response_to_comment_id: self.response_to_comment_id,
            post_id: self.post_id,
            user_id: self.user_id,
            comment_text: self.comment_text,
            created_at: self.created_at,
            deleted: self.deleted,
            has_sub_comments: false,
        }
    }
}

async fn load_pages(
    parent: Parent,
    keys: &[PageKey],
    pool: &PgPool,
) -> Result<Vec<(PageKey, PaginatedComments)>, sqlx::Error> {
    let parent_ids = keys.iter().map(|key| key.parent_id).collect::<Vec<_>>();
    let offsets = keys.iter().map(|key| key.offset).collect::<Vec<_>>();
    let limits = keys.iter().map(|key| key.limit).collect::<Vec<_>>();

    let rows: Vec<CommentRow> = sqlx::query_as(&parent.page_query())
        .bind(&parent_ids)
        .bind(&offsets)
        .bind(&limits)
        .fetch_all(pool)
        .await?;
    let mut pages = collect_pages(keys, rows);

    let comment_ids = page_comment_ids(&pages);
    if !comment_ids.is_empty() {
        let replied_to: Vec<i32> =
            sqlx::query_scalar(REPLIED_TO).bind(&comment_ids).fetch_all(pool).await?;
        mark_replies(&mut pages, &replied_to.into_iter().collect());
    }

    Ok(pages)
}

/// Groups rows into one page per key, newest first, trimmed to the key's limit. Keys without
/// rows get an empty page.
fn collect_pages(keys: &[PageKey], rows: Vec<CommentRow>) -> Vec<(PageKey, PaginatedComments)> {
    let mut grouped: HashMap<PageKey, Vec<CommentRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.key()).or_default().push(row);
    }

    keys.iter()
        .map(|key| {
            let mut rows = grouped.remove(key).unwrap_or_default();
            rows.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then_with(|| b.comment_id.cmp(&a.comment_id))
            });
            let limit = key.limit.max(0) as usize;
            let more = rows.len() > limit;
            rows.truncate(limit);
            let comments = rows.into_iter().map(CommentRow::into_comment).collect();
            (*key, PaginatedComments { comments, more })
        })
        .collect()
}

fn page_comment_ids(pages: &[(PageKey, PaginatedComments)]) -> Vec<i32> {
    let mut ids = pages
        .iter()
        .flat_map(|(_, page)| page.comments.iter().map(|comment| comment.comment_id))
        .collect::<Vec<_>>();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn mark_replies(pages: &mut [(PageKey, PaginatedComments)], replied_to: &HashSet<i32>) {
    for (_, page) in pages.iter_mut() {
        for comment in page.comments.iter_mut() {
            comment.has_sub_comments = replied_to.contains(&comment.comment_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn row(key: PageKey, comment_id: i32, minute: u32) -> CommentRow {
        CommentRow {
            parent_id: key.parent_id,
            page_offset: key.offset,
            page_limit: key.limit,
            comment_id,
            response_to_comment_id: None,
            post_id: 1,
            user_id: 1,
            comment_text: format!("comment {comment_id}"),
            created_at: Utc.with_ymd_and_hms(2021, 6, 1, 12, minute, 0).unwrap(),
            deleted: false,
        }
    }

    fn ids(page: &PaginatedComments) -> Vec<i32> {
        page.comments.iter().map(|comment| comment.comment_id).collect()
    }

    #[test]
    fn page_keys_are_clamped() {
        assert_eq!(PageKey::new(3, -4, 0), PageKey { parent_id: 3, offset: 0, limit: 1 });
        assert_eq!(PageKey::new(3, 10, 500).limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn pages_are_grouped_sorted_and_trimmed() {
        let first = PageKey::new(1, 0, 2);
        let second = PageKey::new(2, 0, 5);
        let rows = vec![row(first, 10, 1), row(second, 20, 1), row(first, 11, 3), row(first, 12, 2)];

        let pages = collect_pages(&[first, second], rows);

        assert_eq!(pages[0].0, first);
        assert_eq!(ids(&pages[0].1), vec![11, 12]);
        assert!(pages[0].1.more);
        assert_eq!(ids(&pages[1].1), vec![20]);
        assert!(!pages[1].1.more);
    }

    #[test]
    fn same_parent_with_different_windows_stays_apart() {
        let head = PageKey::new(1, 0, 1);
        let tail = PageKey::new(1, 1, 1);
        let rows = vec![row(head, 10, 2), row(head, 11, 1), row(tail, 11, 1)];

        let pages = collect_pages(&[head, tail], rows);

        assert_eq!(ids(&pages[0].1), vec![10]);
        assert!(pages[0].1.more);
        assert_eq!(ids(&pages[1].1), vec![11]);
        assert!(!pages[1].1.more);
    }

    #[test]
    fn parents_without_comments_get_empty_pages() {
        let key = PageKey::new(9, 0, 10);
        let pages = collect_pages(&[key], Vec::new());
        assert_eq!(pages, vec![(key, PaginatedComments::default())]);
    }

    #[test]
    fn replies_are_flagged_for_page_comments_only() {
        let key = PageKey::new(1, 0, 10);
        let mut pages = collect_pages(&[key], vec![row(key, 10, 1), row(key, 11, 2)]);

        assert_eq!(page_comment_ids(&pages), vec![10, 11]);
        mark_replies(&mut pages, &[10, 99].into_iter().collect());

        let flags = pages[0]
            .1
            .comments
            .iter()
            .map(|comment| (comment.comment_id, comment.has_sub_comments))
            .collect::<Vec<_>>();
        assert_eq!(flags, vec![(11, false), (10, true)]);
    }
}
