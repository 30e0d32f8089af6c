//! Field resolvers that go through the request's loaders instead of querying per object.

use crate::{
    error::Result,
    loaders::PageKey,
    model::{Comment, CommentSearch, PaginatedComments, ParentType, Post, User, Votes},
    registry::RequestContext,
};

/// Something that can be voted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    Post(i32),
    Comment(i32),
}

pub async fn post_author(ctx: &RequestContext, post: &Post) -> Result<Option<User>> {
    Ok(ctx.loaders()?.user_by_id.load(post.user_id).await?)
}

pub async fn comment_author(ctx: &RequestContext, comment: &Comment) -> Result<Option<User>> {
    Ok(ctx.loaders()?.user_by_id.load(comment.user_id).await?)
}

pub async fn post_votes(ctx: &RequestContext, post: &Post) -> Result<Votes> {
    Ok(ctx.loaders()?.votes_by_post.load(post.post_id).await?)
}

pub async fn comment_votes(ctx: &RequestContext, comment: &Comment) -> Result<Votes> {
    Ok(ctx.loaders()?.votes_by_comment.load(comment.comment_id).await?)
}

/// Top-level comments of a post.
pub async fn post_comments(
    ctx: &RequestContext,
    post: &Post,
    offset: i32,
    limit: i32,
) -> Result<PaginatedComments> {
    let key = PageKey::new(post.post_id, offset, limit);
    Ok(ctx.loaders()?.comments_by_post.load(key).await?)
}

/// Direct replies to a comment. Skips the lookup when the comment is known to have none.
pub async fn comment_replies(
    ctx: &RequestContext,
    comment: &Comment,
    offset: i32,
    limit: i32,
) -> Result<PaginatedComments> {
    if !comment.has_sub_comments {
        return Ok(PaginatedComments::default());
    }
    let key = PageKey::new(comment.comment_id, offset, limit);
    Ok(ctx.loaders()?.comments_by_comment.load(key).await?)
}

pub async fn user_comments(
    ctx: &RequestContext,
    user: &User,
    offset: i32,
    limit: i32,
) -> Result<PaginatedComments> {
    let key = PageKey::new(user.user_id, offset, limit);
    Ok(ctx.loaders()?.comments_by_user.load(key).await?)
}

pub async fn search_comments(
    ctx: &RequestContext,
    search: &CommentSearch,
) -> Result<PaginatedComments> {
    let loaders = ctx.loaders()?;
    let key = PageKey::new(search.parent_id, search.offset, search.limit);
    let page = match search.parent_type {
        ParentType::Post => loaders.comments_by_post.load(key).await?,
        ParentType::Comment => loaders.comments_by_comment.load(key).await?,
    };
    Ok(page)
}

/// Seeds the user loader with a row the caller already has, e.g. the viewer after login.
pub fn remember_user(ctx: &RequestContext, user: User) -> Result<()> {
    ctx.loaders()?.user_by_id.prime(user.user_id, Some(user));
    Ok(())
}

/// Drops a cached tally after a vote changed it, so later fields of the same operation see the
/// new totals.
pub fn forget_votes(ctx: &RequestContext, target: VoteTarget) -> Result<()> {
    let loaders = ctx.loaders()?;
    match target {
        VoteTarget::Post(post_id) => loaders.votes_by_post.clear(post_id),
        VoteTarget::Comment(comment_id) => loaders.votes_by_comment.clear(comment_id),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::error::Error;

    fn comment(has_sub_comments: bool) -> Comment {
        Comment {
            comment_id: 3,
            response_to_comment_id: None,
            post_id: 1,
            user_id: 2,
            comment_text: "first".to_owned(),
            created_at: Utc::now(),
            deleted: false,
            has_sub_comments,
        }
    }

    #[tokio::test]
    async fn resolvers_need_attached_loaders() {
        let ctx = RequestContext::default();
        assert!(matches!(comment_author(&ctx, &comment(false)).await, Err(Error::LoadersUnavailable)));
        assert!(matches!(comment_votes(&ctx, &comment(false)).await, Err(Error::LoadersUnavailable)));
        assert!(matches!(forget_votes(&ctx, VoteTarget::Post(1)), Err(Error::LoadersUnavailable)));
    }

    #[tokio::test]
    async fn replies_skip_comments_without_children() {
        let ctx = RequestContext::default();
        let page = comment_replies(&ctx, &comment(false), 0, 10).await.unwrap();
        assert_eq!(page, PaginatedComments::default());
    }
}
