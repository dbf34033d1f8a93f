//! Periodic reviews.
//!
//! # Invariants
//!
//! - Only the review of the current period of its granularity is editable.
//! - Every edit appends a new version with a fresh id; the remote keeps all
//!   versions while the local collection keeps only the newest per
//!   `(type, period)`.

use crate::error::{PolicyViolation, ServiceError, ServiceResult};
use crate::model::{Review, ReviewType};
use lifesync_engine::{PullReport, PushMode, SyncCoordinator, SyncReport, WriteOptions};
use lifesync_protocol::{retain_latest_by, Record};
use std::sync::Arc;

/// Keeps only the newest version of every `(type, period)`.
pub fn compact_reviews(records: Vec<Review>) -> Vec<Review> {
    retain_latest_by(records, Review::period_key)
}

/// Reviews with a current-period edit window and append-only history.
#[derive(Debug, Clone)]
pub struct ReviewService {
    sync: SyncCoordinator<Review>,
}

impl ReviewService {
    /// Creates the service and installs compaction on every pull.
    pub fn new(sync: SyncCoordinator<Review>) -> Self {
        let sync = sync.with_post_merge(Arc::new(compact_reviews));
        Self { sync }
    }

    /// Returns the coordinator.
    pub fn coordinator(&self) -> &SyncCoordinator<Review> {
        &self.sync
    }

    /// Returns today's period key for `review_type`.
    pub fn current_period(&self, review_type: ReviewType) -> String {
        review_type.period_of(self.sync.context().clock().today())
    }

    /// Returns the review of the current period, if written.
    pub async fn get_current(&self, review_type: ReviewType) -> ServiceResult<Option<Review>> {
        let period = self.current_period(review_type);
        Ok(self
            .sync
            .list()
            .await?
            .into_iter()
            .find(|r| r.review_type == review_type && r.date == period))
    }

    /// Writes the review of the current period.
    pub async fn save_current(
        &self,
        review_type: ReviewType,
        content: impl Into<String>,
    ) -> ServiceResult<Review> {
        let period = self.current_period(review_type);
        self.append(review_type, period, content.into()).await
    }

    /// Replaces the content of review `id`.
    ///
    /// Fails with [`PolicyViolation::ReviewOutsideEditWindow`] unless the
    /// review belongs to the current period.
    pub async fn update(&self, id: &str, content: impl Into<String>) -> ServiceResult<Review> {
        let review = self
            .sync
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Review::KIND, id))?;
        let current = self.current_period(review.review_type);
        if review.date != current {
            return Err(PolicyViolation::ReviewOutsideEditWindow {
                review_type: review.review_type,
                period: review.date,
                current,
            }
            .into());
        }
        self.append(review.review_type, review.date, content.into())
            .await
    }

    /// Returns the reviews of `review_type`, newest period first.
    pub async fn history(&self, review_type: ReviewType) -> ServiceResult<Vec<Review>> {
        let mut reviews: Vec<Review> = self
            .sync
            .list()
            .await?
            .into_iter()
            .filter(|r| r.review_type == review_type)
            .collect();
        reviews.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(reviews)
    }

    /// Pushes pending versions, then pulls remote versions and compacts
    /// them. The pull is skipped while a pending version cannot be pushed.
    pub async fn sync_from_cloud(&self) -> ServiceResult<PullReport> {
        Ok(self.sync.push_then_sync().await?.pull)
    }

    /// Runs a full sync unless `review_type` was already synced today.
    pub async fn sync_if_due(
        &self,
        review_type: ReviewType,
        force: bool,
    ) -> ServiceResult<Option<SyncReport>> {
        self.sync_due(&[review_type], force).await
    }

    /// Runs one full sync if any granularity is due, then marks every due
    /// granularity as synced today.
    pub async fn sync_all_due(&self, force: bool) -> ServiceResult<Option<SyncReport>> {
        self.sync_due(&ReviewType::ALL, force).await
    }

    async fn sync_due(
        &self,
        types: &[ReviewType],
        force: bool,
    ) -> ServiceResult<Option<SyncReport>> {
        let markers = self.sync.markers();
        let today = self.sync.context().clock().today();
        let mut due = Vec::new();
        for review_type in types {
            if markers
                .is_sync_due(&review_type.cursor_scope(), today, force)
                .await?
            {
                due.push(*review_type);
            }
        }
        if due.is_empty() {
            tracing::debug!(entity = Review::KIND, "reviews already synced today");
            return Ok(None);
        }

        let report = self.sync.push_then_sync().await?;
        if report.pull.is_completed() {
            for review_type in due {
                markers
                    .mark_synced(&review_type.cursor_scope(), today)
                    .await?;
            }
        }
        Ok(Some(report))
    }

    async fn append(
        &self,
        review_type: ReviewType,
        period: String,
        content: String,
    ) -> ServiceResult<Review> {
        let now = self.sync.context().clock().now_ms();
        let options = WriteOptions::local().with_mode(PushMode::CreateOnly);
        self.sync
            .try_write(options, |reviews| {
                let latest = reviews
                    .iter()
                    .filter(|r| r.review_type == review_type && r.date == period)
                    .map(|r| r.updated_at())
                    .max();
                let mut review = Review::new(review_type, period, content, now);
                if let Some(latest) = latest {
                    review.touch(now.max(latest + 1));
                }
                reviews.push(review.clone());
                *reviews = compact_reviews(std::mem::take(reviews));
                Ok::<_, ServiceError>(review)
            })
            .await
    }
}
