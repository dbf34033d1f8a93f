use crate::error::{ServiceError, ServiceResult};
use crate::model::{required_text, Idea, IdeaPatch, NewIdea};
use lifesync_engine::{PullReport, SyncCoordinator, SyncReport, WriteOptions};
use lifesync_protocol::Record;

/// CRUD over ideas.
#[derive(Debug, Clone)]
pub struct IdeaService {
    sync: SyncCoordinator<Idea>,
}

impl IdeaService {
    /// Creates the service.
    pub fn new(sync: SyncCoordinator<Idea>) -> Self {
        Self { sync }
    }

    /// Returns the coordinator.
    pub fn coordinator(&self) -> &SyncCoordinator<Idea> {
        &self.sync
    }

    /// Returns every idea, newest first.
    pub async fn list(&self) -> ServiceResult<Vec<Idea>> {
        let mut ideas = self.sync.list().await?;
        ideas.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(ideas)
    }

    /// Returns the idea `id`.
    pub async fn get(&self, id: &str) -> ServiceResult<Idea> {
        self.sync
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Idea::KIND, id))
    }

    /// Captures an idea.
    pub async fn create(&self, input: NewIdea) -> ServiceResult<Idea> {
        let input = NewIdea {
            title: required_text("title", &input.title)?,
            ..input
        };
        let idea = Idea::new(input, self.sync.context().clock().now_ms());
        let created = idea.clone();
        self.sync.write(move |ideas| ideas.push(idea)).await?;
        Ok(created)
    }

    /// Applies a partial update.
    pub async fn update(&self, id: &str, patch: IdeaPatch) -> ServiceResult<Idea> {
        if let Some(title) = &patch.title {
            required_text("title", title)?;
        }
        let now = self.sync.context().clock().now_ms();
        self.sync
            .try_write(WriteOptions::local(), |ideas| {
                let idea = ideas
                    .iter_mut()
                    .find(|i| i.id() == id)
                    .ok_or_else(|| ServiceError::not_found(Idea::KIND, id))?;
                patch.apply(idea);
                idea.touch(now);
                Ok(idea.clone())
            })
            .await
    }

    /// Deletes the idea.
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        if !self.sync.delete(id).await? {
            return Err(ServiceError::not_found(Idea::KIND, id));
        }
        Ok(())
    }

    /// Pulls remote ideas.
    pub async fn sync_from_cloud(&self) -> ServiceResult<PullReport> {
        Ok(self.sync.pull_from_cloud().await?)
    }

    /// Pulls, then pushes pending edits and deletes.
    pub async fn sync(&self) -> ServiceResult<SyncReport> {
        Ok(self.sync.sync().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use std::time::Duration;

    #[tokio::test]
    async fn list_is_newest_first() {
        let fx = Fixture::offline();
        let ideas = &fx.services.ideas;
        let first = ideas
            .create(NewIdea {
                title: "first".into(),
                ..NewIdea::default()
            })
            .await
            .unwrap();
        fx.clock.advance(Duration::from_secs(1));
        let second = ideas
            .create(NewIdea {
                title: "second".into(),
                ..NewIdea::default()
            })
            .await
            .unwrap();

        let listed: Vec<_> = ideas.list().await.unwrap().into_iter().map(|i| i.meta.id).collect();
        assert_eq!(listed, vec![second.meta.id, first.meta.id]);
    }

    #[tokio::test]
    async fn deleted_idea_is_not_resurrected_by_pull() {
        let fx = Fixture::online();
        let idea = fx
            .services
            .ideas
            .create(NewIdea {
                title: "ephemeral".into(),
                ..NewIdea::default()
            })
            .await
            .unwrap();
        fx.flush().await;

        fx.remotes.ideas.set_online(false);
        fx.services.ideas.delete(idea.id()).await.unwrap();
        fx.flush().await;
        fx.remotes.ideas.set_online(true);

        fx.services.ideas.sync_from_cloud().await.unwrap();
        assert!(fx.services.ideas.list().await.unwrap().is_empty());
        assert!(fx.remotes.ideas.get(idea.id()).is_some());

        fx.services.ideas.sync().await.unwrap();
        fx.flush().await;
        assert!(fx.remotes.ideas.get(idea.id()).is_none());
    }
}
