//! Per-request loader sets and the request-scoped storage resolvers reach them through.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::{LoaderConfig, LoaderKind},
    error::{Error, Result},
    loader::Loader,
    loaders::{
        CommentsByComment, CommentsByPost, CommentsByUser, PageKey, UserById, VotesByComment,
        VotesByPost,
    },
    model::{PaginatedComments, User, Votes},
};

/// Well-known name the loaders are registered under for the duration of a request.
pub const LOADERS_KEY: &str = "dataloaders";

/// One loader per entity relationship, all scoped to a single inbound request.
///
/// Every loader has its own worker, batch and cache, so activity on one never flushes or
/// blocks another. Dropping the set cancels whatever is still pending.
pub struct Loaders {
    pub user_by_id: Loader<i32, Option<User>>,
    pub votes_by_post: Loader<i32, Votes>,
    pub votes_by_comment: Loader<i32, Votes>,
    pub comments_by_post: Loader<PageKey, PaginatedComments>,
    pub comments_by_comment: Loader<PageKey, PaginatedComments>,
    pub comments_by_user: Loader<PageKey, PaginatedComments>,
}

impl Loaders {
    /// Spawns a fresh loader set. Must be called from within a tokio runtime.
    pub fn new(pool: PgPool, config: &LoaderConfig) -> Self {
        let pool = Arc::new(pool);
        Self {
            user_by_id: Loader::with_settings(
                UserById,
                Arc::clone(&pool),
                config.settings(LoaderKind::UserById),
            ),
            votes_by_post: Loader::with_settings(
                VotesByPost,
                Arc::clone(&pool),
                config.settings(LoaderKind::VotesByPost),
            ),
            votes_by_comment: Loader::with_settings(
                VotesByComment,
                Arc::clone(&pool),
                config.settings(LoaderKind::VotesByComment),
            ),
            comments_by_post: Loader::with_settings(
                CommentsByPost,
                Arc::clone(&pool),
                config.settings(LoaderKind::CommentsByPost),
            ),
            comments_by_comment: Loader::with_settings(
                CommentsByComment,
                Arc::clone(&pool),
                config.settings(LoaderKind::CommentsByComment),
            ),
            comments_by_user: Loader::with_settings(
                CommentsByUser,
                pool,
                config.settings(LoaderKind::CommentsByUser),
            ),
        }
    }

    /// Aborts every loader. Outstanding loads resolve to `LoadError::Cancelled`.
    pub fn cancel(&self) {
        self.user_by_id.cancel();
        self.votes_by_post.cancel();
        self.votes_by_comment.cancel();
        self.comments_by_post.cancel();
        self.comments_by_comment.cancel();
        self.comments_by_user.cancel();
    }
}

/// Builds a fresh [`Loaders`] set for every inbound request from an explicitly passed pool and
/// configuration.
#[derive(Debug, Clone)]
pub struct LoaderRegistry {
    pool: PgPool,
    config: LoaderConfig,
}

impl LoaderRegistry {
    pub fn new(pool: PgPool, config: LoaderConfig) -> Self {
        Self { pool, config }
    }

    pub fn loaders(&self) -> Loaders {
        Loaders::new(self.pool.clone(), &self.config)
    }

    /// Attaches a fresh loader set to the request, replacing any previous one.
    pub fn attach(&self, ctx: &mut RequestContext) {
        ctx.attach_loaders(self.loaders());
    }

    /// Starts a request context that already carries its loaders.
    pub fn request_context(&self) -> RequestContext {
        let mut ctx = RequestContext::default();
        self.attach(&mut ctx);
        ctx
    }
}

/// Request-scoped storage handed to every resolver of one GraphQL operation.
///
/// Cloning is cheap and clones share the same loaders, so sibling resolvers running
/// concurrently batch together.
#[derive(Clone, Default)]
pub struct RequestContext {
    loaders: Option<Arc<Loaders>>,
    viewer_id: Option<i32>,
}

impl RequestContext {
    pub fn attach_loaders(&mut self, loaders: Loaders) {
        self.loaders = Some(Arc::new(loaders));
    }

    /// The loaders attached for this request.
    ///
    /// Fails with [`Error::LoadersUnavailable`] when no registry attached them, which is a wiring
    /// bug in the request entry point rather than a transient condition.
    pub fn loaders(&self) -> Result<&Loaders> {
        match self.loaders.as_deref() {
            Some(loaders) => Ok(loaders),
            None => {
                tracing::error!(key = LOADERS_KEY, "resolver used loaders before they were attached");
                Err(Error::LoadersUnavailable)
            }
        }
    }

    /// Records the authenticated user making the request.
    pub fn with_viewer(mut self, user_id: i32) -> Self {
        self.viewer_id = Some(user_id);
        self
    }

    pub fn viewer_id(&self) -> Option<i32> {
        self.viewer_id
    }
}

#[cfg(test)]
mod tests {
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new().connect_lazy("postgres://localhost/blog").unwrap()
    }

    #[test]
    fn missing_loaders_fail_fast() {
        let ctx = RequestContext::default();
        assert!(matches!(ctx.loaders(), Err(Error::LoadersUnavailable)));
    }

    #[tokio::test]
    async fn attached_loaders_are_shared_by_clones() {
        let registry = LoaderRegistry::new(lazy_pool(), LoaderConfig::default());
        let ctx = registry.request_context().with_viewer(4);
        let sibling = ctx.clone();

        assert!(std::ptr::eq(ctx.loaders().unwrap(), sibling.loaders().unwrap()));
        assert_eq!(sibling.viewer_id(), Some(4));
    }

    #[tokio::test]
    async fn every_request_gets_its_own_loaders() {
        let registry = LoaderRegistry::new(lazy_pool(), LoaderConfig::default());
        let first = registry.request_context();
        let second = registry.request_context();

        assert!(!std::ptr::eq(first.loaders().unwrap(), second.loaders().unwrap()));
    }
}
