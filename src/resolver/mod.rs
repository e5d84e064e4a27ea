//! # Resolution Layer
//!
//! Entry points an API layer calls once per root field. Every list entry
//! point first admits the request against the complexity budget, then runs
//! the fetch path; nested fields go through the request's batch loaders.
//!
//! ```rust,no_run
//! use examhub_core::complexity::{CostRequest, SelectionField};
//! use examhub_core::config::ExamhubConfig;
//! use examhub_core::models::ProfessionFilter;
//! use examhub_core::repository::FetchConfig;
//! use examhub_core::resolver::Resolver;
//!
//! # async fn example(pool: sqlx::PgPool) -> examhub_core::error::Result<()> {
//! let resolver = Resolver::new(pool, &ExamhubConfig::default());
//! let context = resolver.request_context();
//!
//! let request = CostRequest::query(vec![SelectionField::new("professions")
//!     .of_type("ProfessionList")
//!     .select(SelectionField::new("items").of_type("Profession").select_leaves(&["id"]))]);
//! let page = resolver
//!     .professions(&request, FetchConfig::<ProfessionFilter>::default())
//!     .await?;
//!
//! for profession in &page.items {
//!     let qualifications = resolver
//!         .profession_qualifications(&context, profession.id)
//!         .await?;
//!     println!("{}: {}", profession.name, qualifications.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod loaders;

pub use context::RequestContext;
pub use loaders::{DataLoaders, QualificationsById, QualificationsByProfession};

use crate::complexity::{ComplexityEstimator, CostModel, CostRequest};
use crate::config::{ExamhubConfig, LoaderConfig};
use crate::error::Result;
use crate::loader::CancellationSignal;
use crate::logging::log_fetch_operation;
use crate::models::{
    Profession, ProfessionFilter, Qualification, QualificationFilter, QualificationInput,
    Question, QuestionFilter, User, UserFilter,
};
use crate::repository::{FetchConfig, ListResult, Repositories};
use sqlx::PgPool;
use std::time::Instant;

/// Root field names as they appear in a [`CostRequest`]
mod fields {
    pub const PROFESSIONS: &str = "professions";
    pub const QUALIFICATIONS: &str = "qualifications";
    pub const SIMILAR_QUALIFICATIONS: &str = "similarQualifications";
    pub const QUESTIONS: &str = "questions";
    pub const USERS: &str = "users";
}

pub struct Resolver {
    repositories: Repositories,
    estimator: ComplexityEstimator,
    loader_config: LoaderConfig,
}

impl Resolver {
    pub fn new(pool: PgPool, config: &ExamhubConfig) -> Self {
        Self::with_repositories(Repositories::new(pool, config), config)
    }

    pub fn with_repositories(repositories: Repositories, config: &ExamhubConfig) -> Self {
        let model = CostModel::standard(config.query.complexity_budget, &config.limits);

        Self {
            repositories,
            estimator: ComplexityEstimator::new(model),
            loader_config: config.loader.clone(),
        }
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repositories
    }

    /// Fresh loaders and cancellation signal for one inbound request
    pub fn request_context(&self) -> RequestContext {
        let cancel = CancellationSignal::new();
        let loaders =
            DataLoaders::from_repositories(&self.repositories, &self.loader_config, &cancel);
        RequestContext::new(loaders, cancel)
    }

    /// Reject the request if its estimated cost is over the budget
    pub fn admit(&self, request: &CostRequest) -> Result<u64> {
        Ok(self.estimator.admit(request)?)
    }

    pub async fn professions(
        &self,
        request: &CostRequest,
        config: FetchConfig<ProfessionFilter>,
    ) -> Result<ListResult<Profession>> {
        let started = Instant::now();
        let cost = self.admit(request)?;
        let config = with_requested_total(config, request, fields::PROFESSIONS);

        let page = self.repositories.professions.fetch(&config).await?;
        log_page("profession", &page, cost, started);
        Ok(page)
    }

    pub async fn qualifications(
        &self,
        request: &CostRequest,
        config: FetchConfig<QualificationFilter>,
    ) -> Result<ListResult<Qualification>> {
        let started = Instant::now();
        let cost = self.admit(request)?;
        let config = with_requested_total(config, request, fields::QUALIFICATIONS);

        let page = self.repositories.qualifications.fetch(&config).await?;
        log_page("qualification", &page, cost, started);
        Ok(page)
    }

    /// Qualifications sharing a profession with `qualification_id`
    pub async fn similar_qualifications(
        &self,
        request: &CostRequest,
        qualification_id: i32,
        config: FetchConfig<QualificationFilter>,
    ) -> Result<ListResult<Qualification>> {
        let started = Instant::now();
        let cost = self.admit(request)?;
        let config = with_requested_total(config, request, fields::SIMILAR_QUALIFICATIONS);

        let page = self
            .repositories
            .qualifications
            .similar(qualification_id, &config)
            .await?;
        log_page("qualification", &page, cost, started);
        Ok(page)
    }

    pub async fn questions(
        &self,
        request: &CostRequest,
        config: FetchConfig<QuestionFilter>,
    ) -> Result<ListResult<Question>> {
        let started = Instant::now();
        let cost = self.admit(request)?;
        let config = with_requested_total(config, request, fields::QUESTIONS);

        let page = self.repositories.questions.fetch(&config).await?;
        log_page("question", &page, cost, started);
        Ok(page)
    }

    pub async fn users(
        &self,
        request: &CostRequest,
        config: FetchConfig<UserFilter>,
    ) -> Result<ListResult<User>> {
        let started = Instant::now();
        let cost = self.admit(request)?;
        let config = with_requested_total(config, request, fields::USERS);

        let page = self.repositories.users.fetch(&config).await?;
        log_page("user", &page, cost, started);
        Ok(page)
    }

    pub async fn generate_test(
        &self,
        request: &CostRequest,
        qualification_ids: &[i32],
        limit: Option<i64>,
    ) -> Result<Vec<Question>> {
        let started = Instant::now();
        let cost = self.admit(request)?;

        let items = self
            .repositories
            .questions
            .generate_test(qualification_ids, limit)
            .await?;
        log_fetch_operation(
            "question",
            items.len(),
            None,
            Some(cost),
            elapsed_ms(started),
        );
        Ok(items)
    }

    pub async fn update_many_qualifications(
        &self,
        request: &CostRequest,
        filter: &QualificationFilter,
        input: &QualificationInput,
    ) -> Result<Vec<Qualification>> {
        self.admit(request)?;
        self.repositories
            .qualifications
            .update_many(filter, input)
            .await
    }

    pub async fn delete_questions(
        &self,
        request: &CostRequest,
        filter: &QuestionFilter,
    ) -> Result<Vec<Question>> {
        self.admit(request)?;
        self.repositories.questions.delete(filter).await
    }

    /// `Profession.qualifications`, batched across the request
    pub async fn profession_qualifications(
        &self,
        context: &RequestContext,
        profession_id: i32,
    ) -> Result<Vec<Qualification>> {
        let qualifications = context
            .loaders()
            .qualifications_by_profession_id
            .load(profession_id)
            .await?;
        Ok(qualifications.unwrap_or_default())
    }

    /// `Question.qualification`, batched across the request
    pub async fn question_qualification(
        &self,
        context: &RequestContext,
        question: &Question,
    ) -> Result<Option<Qualification>> {
        let qualification = context
            .loaders()
            .qualification_by_id
            .load(question.qualification_id)
            .await?;
        Ok(qualification)
    }
}

/// Count rows when the client asked for the list's `total`
fn with_requested_total<F>(
    mut config: FetchConfig<F>,
    request: &CostRequest,
    field: &str,
) -> FetchConfig<F> {
    config.count = config.count || request.selects_total(field);
    config
}

fn log_page<T>(entity: &str, page: &ListResult<T>, cost: u64, started: Instant) {
    log_fetch_operation(
        entity,
        page.items.len(),
        page.total,
        Some(cost),
        elapsed_ms(started),
    );
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
