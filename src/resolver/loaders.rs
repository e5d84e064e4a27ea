use crate::config::LoaderConfig;
use crate::loader::{BatchFn, BatchLoader, CancellationSignal, LoadError};
use crate::models::Qualification;
use crate::repository::{ProfessionRepository, QualificationRepository, Repositories};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Batch source for [`DataLoaders::qualification_by_id`]
pub struct QualificationsById {
    repository: QualificationRepository,
}

impl QualificationsById {
    pub fn new(repository: QualificationRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl BatchFn<i32, Qualification> for QualificationsById {
    async fn load(&self, keys: &[i32]) -> Result<Vec<Option<Qualification>>, LoadError> {
        let rows = self.repository.fetch_by_ids(keys).await?;
        let by_id = rows.into_iter().map(|row| (row.id, row)).collect();
        Ok(align_to_keys(keys, by_id))
    }
}

/// Batch source for [`DataLoaders::qualifications_by_profession_id`]
///
/// A profession with no qualifications resolves to an empty list, not to
/// an absent value.
pub struct QualificationsByProfession {
    repository: ProfessionRepository,
}

impl QualificationsByProfession {
    pub fn new(repository: ProfessionRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl BatchFn<i32, Vec<Qualification>> for QualificationsByProfession {
    async fn load(&self, keys: &[i32]) -> Result<Vec<Option<Vec<Qualification>>>, LoadError> {
        let grouped = self.repository.associated_qualifications(keys).await?;
        Ok(align_with_default(keys, grouped))
    }
}

/// The loaders of one request
///
/// Every loader shares the request's cancellation signal.
#[derive(Clone)]
pub struct DataLoaders {
    pub qualification_by_id: BatchLoader<i32, Qualification>,
    pub qualifications_by_profession_id: BatchLoader<i32, Vec<Qualification>>,
}

impl DataLoaders {
    pub fn new(
        qualification_by_id: Arc<dyn BatchFn<i32, Qualification>>,
        qualifications_by_profession_id: Arc<dyn BatchFn<i32, Vec<Qualification>>>,
        config: &LoaderConfig,
        cancel: &CancellationSignal,
    ) -> Self {
        Self {
            qualification_by_id: BatchLoader::from_arc(
                "qualification_by_id",
                qualification_by_id,
                config,
                cancel.clone(),
            ),
            qualifications_by_profession_id: BatchLoader::from_arc(
                "qualifications_by_profession_id",
                qualifications_by_profession_id,
                config,
                cancel.clone(),
            ),
        }
    }

    pub fn from_repositories(
        repositories: &Repositories,
        config: &LoaderConfig,
        cancel: &CancellationSignal,
    ) -> Self {
        Self::new(
            Arc::new(QualificationsById::new(repositories.qualifications.clone())),
            Arc::new(QualificationsByProfession::new(
                repositories.professions.clone(),
            )),
            config,
            cancel,
        )
    }
}

/// One entry per key, in key order; keys without a row are `None`
fn align_to_keys<T: Clone>(keys: &[i32], rows: HashMap<i32, T>) -> Vec<Option<T>> {
    keys.iter().map(|key| rows.get(key).cloned()).collect()
}

/// One entry per key, in key order; keys without rows get `T::default()`
fn align_with_default<T: Clone + Default>(keys: &[i32], rows: HashMap<i32, T>) -> Vec<Option<T>> {
    keys.iter()
        .map(|key| Some(rows.get(key).cloned().unwrap_or_default()))
        .collect()
}
