use std::collections::HashMap;
use std::convert::Infallible;

use async_trait::async_trait;
use blog_dataload::{model::Votes, BatchFunction, Loader};
use futures::future;
use tracing_subscriber::EnvFilter;

// Empty functor that implements the BatchFunction trait. For this example, it trivially
// tallies votes kept in a HashMap of post id to stored vote values.
struct PostVotes;

#[async_trait]
impl BatchFunction<i32, Votes> for PostVotes {
    type Context = HashMap<i32, Vec<i32>>;
    type Error = Infallible;

    async fn load(keys: &[i32], context: &Self::Context) -> Result<Vec<(i32, Votes)>, Infallible> {
        tracing::info!(?keys, "tallying votes");
        Ok(keys
            .iter()
            .filter_map(|k| {
                context.get(k).map(|values| {
                    let mut votes = Votes::default();
                    values.iter().for_each(|value| votes.record(*value));
                    (*k, votes)
                })
            })
            .collect())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut context = HashMap::new();
    context.insert(2001, vec![1, 1, -1]);
    context.insert(7, vec![-1, -1]);
    context.insert(12, vec![1, 0]);

    let loader = Loader::new(PostVotes {}, context);

    // Sibling fields resolving at the same time end up in one batch.
    let (odyssey, samurai, unvoted) =
        future::join3(loader.load(2001), loader.load(7), loader.load(15)).await;
    assert_eq!(odyssey.unwrap(), Votes { upvote: 2, downvote: 1 });
    assert_eq!(samurai.unwrap(), Votes { upvote: 0, downvote: 2 });
    assert_eq!(unvoted.unwrap(), Votes::default());

    // Already resolved keys come from the cache; only 12 is fetched.
    let votes = loader.load_many(vec![12, 2001]).await;
    assert_eq!(
        votes.into_iter().map(Result::unwrap).collect::<Vec<_>>(),
        vec![Votes { upvote: 1, downvote: 0 }, Votes { upvote: 2, downvote: 1 }]
    );
}
