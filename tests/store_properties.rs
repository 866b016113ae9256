//! Property tests for the in-memory content store.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use thread_kernel::{
    Cancellation, CommentId, ContentStore, InMemoryContentStore, Page, PostId, ThreadAssembler,
};

use common::{apply_ops, op_strategy, threads_of};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pagination_clamps_to_result_set(n in 0usize..30, limit in 0usize..40, offset in 0usize..40) {
        let rt = runtime();
        let store = InMemoryContentStore::new();

        let posts = rt.block_on(async {
            for i in 0..n {
                store
                    .create_post(PostId::new(format!("p{i:03}")), "t".into(), true, "a".into())
                    .await
                    .unwrap();
            }
            store.get_all_posts(Page::window(limit, offset)).await.unwrap()
        });

        let expected = if offset >= n { 0 } else { limit.min(n - offset) };
        prop_assert_eq!(posts.len(), expected);

        let all = rt.block_on(store.get_all_posts(Page::new(Some(limit), None))).unwrap();
        prop_assert_eq!(all.len(), n);
    }

    #[test]
    fn replies_keep_their_thread_root(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let rt = runtime();
        let store = InMemoryContentStore::new();
        let applied = rt.block_on(apply_ops(&store, &ops, "prop"));

        let by_id: HashMap<CommentId, _> = applied
            .comments
            .iter()
            .map(|c| (c.id.clone(), c.clone()))
            .collect();

        for comment in &applied.comments {
            // Walk to the top-level ancestor; its post is the thread root
            let mut current = comment;
            while let Some(parent_id) = &current.parent_comment_id {
                let parent = &by_id[parent_id];
                prop_assert_eq!(&parent.post_id, &comment.post_id);
                current = parent;
            }
            prop_assert!(applied.posts.contains(&current.post_id));
        }

        prop_assert_eq!(store.num_comments(), applied.comments.len());
        prop_assert!(!applied.outcomes.contains(&"duplicate_comment"));
    }

    #[test]
    fn assembled_threads_contain_every_comment_once(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let rt = runtime();
        let store = Arc::new(InMemoryContentStore::new());
        let applied = rt.block_on(apply_ops(&*store, &ops, "prop"));
        let assembler = ThreadAssembler::new(Arc::clone(&store));

        let threads = rt.block_on(threads_of(&assembler, &applied.posts));
        let total: usize = threads.iter().map(|t| t.comment_count()).sum();
        prop_assert_eq!(total, applied.comments.len());

        let all = rt
            .block_on(assembler.comment_threads(Page::ALL, &Cancellation::never()))
            .unwrap();
        prop_assert_eq!(all.len(), applied.comments.len());
    }
}
