//! Request-scoped batch loading across parents

mod common;

use async_trait::async_trait;
use common::{link, seed_profession, seed_qualification, test_config};
use examhub_core::complexity::{CostRequest, SelectionField};
use examhub_core::config::LoaderConfig;
use examhub_core::loader::{BatchFn, BatchLoader, CancellationSignal, LoadError};
use examhub_core::models::{ProfessionFilter, Qualification};
use examhub_core::repository::FetchConfig;
use examhub_core::resolver::{DataLoaders, RequestContext, Resolver};
use futures::future::join_all;
use parking_lot::Mutex;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Children keyed by parent id; parent 0 has none
#[derive(Default)]
struct ChildrenByParent {
    calls: Mutex<Vec<Vec<i32>>>,
}

#[async_trait]
impl BatchFn<i32, Vec<String>> for ChildrenByParent {
    async fn load(&self, keys: &[i32]) -> Result<Vec<Option<Vec<String>>>, LoadError> {
        self.calls.lock().push(keys.to_vec());
        Ok(keys
            .iter()
            .map(|parent| Some((0..*parent).map(|i| format!("{parent}-{i}")).collect()))
            .collect())
    }
}

/// Never answers until cancelled
struct Stalled;

#[async_trait]
impl BatchFn<i32, Qualification> for Stalled {
    async fn load(&self, _keys: &[i32]) -> Result<Vec<Option<Qualification>>, LoadError> {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        Ok(Vec::new())
    }
}

struct Unavailable;

#[async_trait]
impl BatchFn<i32, Vec<Qualification>> for Unavailable {
    async fn load(&self, _keys: &[i32]) -> Result<Vec<Option<Vec<Qualification>>>, LoadError> {
        Err(LoadError::FetchFailed("pool timed out".to_string()))
    }
}

fn loader_config() -> LoaderConfig {
    LoaderConfig {
        wait_ms: 5,
        max_batch: 0,
    }
}

#[tokio::test]
async fn five_parents_issue_one_child_fetch() {
    let source = Arc::new(ChildrenByParent::default());
    let loader = BatchLoader::new(
        "children_by_parent",
        Arc::clone(&source),
        &loader_config(),
        CancellationSignal::new(),
    );

    let results = join_all((1..=5).map(|parent| loader.load(parent))).await;

    assert_eq!(source.calls.lock().len(), 1);
    assert_eq!(loader.dispatch_count(), 1);
    for (parent, result) in (1..=5).zip(results) {
        assert_eq!(result.unwrap().unwrap().len(), parent as usize);
    }
}

#[tokio::test]
async fn separate_windows_issue_separate_fetches() {
    let source = Arc::new(ChildrenByParent::default());
    let loader = BatchLoader::new(
        "children_by_parent",
        Arc::clone(&source),
        &loader_config(),
        CancellationSignal::new(),
    );

    loader.load(1).await.unwrap();
    loader.load(2).await.unwrap();
    loader.load(1).await.unwrap();

    assert_eq!(*source.calls.lock(), vec![vec![1], vec![2]]);
}

#[tokio::test]
async fn dropping_the_request_cancels_pending_loads() {
    let cancel = CancellationSignal::new();
    let loaders = DataLoaders::new(
        Arc::new(Stalled),
        Arc::new(Unavailable),
        &loader_config(),
        &cancel,
    );
    let context = RequestContext::new(loaders, cancel);
    let loader = context.loaders().qualification_by_id.clone();

    let pending = tokio::spawn(async move { loader.load(1).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(context);

    let result = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .expect("cancelled load should finish promptly")
        .unwrap();
    assert_eq!(result, Err(LoadError::Cancelled));
}

#[tokio::test]
async fn fetch_failure_reaches_every_caller() {
    let cancel = CancellationSignal::new();
    let loaders = DataLoaders::new(
        Arc::new(Stalled),
        Arc::new(Unavailable),
        &loader_config(),
        &cancel,
    );
    let context = RequestContext::new(loaders, cancel);
    let loader = &context.loaders().qualifications_by_profession_id;

    let results = join_all([1, 2, 3].map(|id| loader.load(id))).await;

    for result in results {
        assert_eq!(
            result,
            Err(LoadError::FetchFailed("pool timed out".to_string()))
        );
    }
}

#[sqlx::test]
async fn profession_qualifications_are_loaded_in_one_dispatch(pool: PgPool) -> sqlx::Result<()> {
    let mut professions = Vec::new();
    for name in ["Baker", "Carpenter", "Electrician", "Plumber", "Welder"] {
        professions.push(seed_profession(&pool, name).await);
    }
    let shared = seed_qualification(&pool, "Workshop safety", "BHP.01").await;
    let wiring = seed_qualification(&pool, "Wiring", "EE.05").await;
    for profession in &professions[1..] {
        link(&pool, shared.id, profession.id).await;
    }
    link(&pool, wiring.id, professions[2].id).await;

    let resolver = Resolver::new(pool.clone(), &test_config());
    let context = resolver.request_context();
    let request = CostRequest::query(vec![SelectionField::new("professions")
        .of_type("ProfessionList")
        .select(
            SelectionField::new("items")
                .of_type("Profession")
                .select_leaves(&["id"])
                .select(
                    SelectionField::new("qualifications")
                        .of_type("Qualification")
                        .select_leaves(&["id"]),
                ),
        )]);

    let page = resolver
        .professions(
            &request,
            FetchConfig::<ProfessionFilter> {
                sort: vec!["name ASC".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 5);

    let nested = join_all(
        page.items
            .iter()
            .map(|profession| resolver.profession_qualifications(&context, profession.id)),
    )
    .await;

    let counts: Vec<usize> = nested.into_iter().map(|r| r.unwrap().len()).collect();
    assert_eq!(counts, vec![0, 1, 2, 1, 1]);
    assert_eq!(
        context
            .loaders()
            .qualifications_by_profession_id
            .dispatch_count(),
        1
    );

    Ok(())
}
