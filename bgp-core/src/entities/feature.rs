use crate::entities::FeatureStatus;
use crate::framework::DatabaseProcessor;
use bgp_sdk::objects::catalog::FeatureResponse;
use kanau::processor::Processor;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Feature {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: FeatureStatus,
    pub upvotes: i64,
    pub submitted_by: Option<i64>,
    pub created_at: i64,
}

const FEATURE_COLUMNS: &str = "id, title, description, status, upvotes, submitted_by, created_at";

impl From<Feature> for FeatureResponse {
    fn from(value: Feature) -> Self {
        FeatureResponse {
            id: value.id,
            title: value.title,
            description: value.description,
            status: value.status.into(),
            upvotes: value.upvotes,
            submitted_by: value.submitted_by,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateFeature {
    pub title: String,
    pub description: String,
    pub submitted_by: Option<i64>,
    pub created_at: i64,
}

impl Processor<CreateFeature> for DatabaseProcessor {
    type Output = Feature;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CreateFeature")]
    async fn process(&self, cmd: CreateFeature) -> Result<Feature, sqlx::Error> {
        let sql = format!(
            "INSERT INTO features (title, description, submitted_by, created_at) \
             VALUES (?, ?, ?, ?) RETURNING {FEATURE_COLUMNS}"
        );
        sqlx::query_as::<_, Feature>(&sql)
            .bind(cmd.title)
            .bind(cmd.description)
            .bind(cmd.submitted_by)
            .bind(cmd.created_at)
            .fetch_one(&self.pool)
            .await
    }
}

#[derive(Debug, Clone, Copy)]
/// Most upvoted first.
pub struct ListFeatures;

impl Processor<ListFeatures> for DatabaseProcessor {
    type Output = Vec<Feature>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListFeatures")]
    async fn process(&self, _: ListFeatures) -> Result<Vec<Feature>, sqlx::Error> {
        let sql =
            format!("SELECT {FEATURE_COLUMNS} FROM features ORDER BY upvotes DESC, id ASC");
        sqlx::query_as::<_, Feature>(&sql)
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone, Copy)]
/// Count one vote per user. Repeated votes leave the count unchanged.
///
/// Returns `None` when the feature does not exist.
pub struct UpvoteFeature {
    pub feature_id: i64,
    pub user_id: i64,
}

impl Processor<UpvoteFeature> for DatabaseProcessor {
    type Output = Option<Feature>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpvoteFeature")]
    async fn process(&self, cmd: UpvoteFeature) -> Result<Option<Feature>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM features WHERE id = ?")
            .bind(cmd.feature_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let inserted =
            sqlx::query("INSERT OR IGNORE INTO feature_votes (feature_id, user_id) VALUES (?, ?)")
                .bind(cmd.feature_id)
                .bind(cmd.user_id)
                .execute(&mut *tx)
                .await?;
        if inserted.rows_affected() == 1 {
            sqlx::query("UPDATE features SET upvotes = upvotes + 1 WHERE id = ?")
                .bind(cmd.feature_id)
                .execute(&mut *tx)
                .await?;
        }

        let sql = format!("SELECT {FEATURE_COLUMNS} FROM features WHERE id = ?");
        let feature = sqlx::query_as::<_, Feature>(&sql)
            .bind(cmd.feature_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(feature))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UpdateFeatureStatus {
    pub feature_id: i64,
    pub status: FeatureStatus,
}

impl Processor<UpdateFeatureStatus> for DatabaseProcessor {
    type Output = Option<Feature>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpdateFeatureStatus")]
    async fn process(&self, cmd: UpdateFeatureStatus) -> Result<Option<Feature>, sqlx::Error> {
        let sql =
            format!("UPDATE features SET status = ? WHERE id = ? RETURNING {FEATURE_COLUMNS}");
        sqlx::query_as::<_, Feature>(&sql)
            .bind(cmd.status)
            .bind(cmd.feature_id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_user, test_db};

    #[tokio::test]
    async fn one_vote_per_user() {
        let db = test_db().await;
        let alice = insert_user(&db, "alice@example.com", 0).await;
        let bob = insert_user(&db, "bob@example.com", 0).await;
        let feature = db
            .process(CreateFeature {
                title: "Code 128 support".into(),
                description: String::new(),
                submitted_by: Some(alice.id),
                created_at: 1,
            })
            .await
            .unwrap();
        assert_eq!(feature.status, FeatureStatus::Planned);

        for user in [alice.id, alice.id, bob.id] {
            db.process(UpvoteFeature {
                feature_id: feature.id,
                user_id: user,
            })
            .await
            .unwrap();
        }

        let listed = db.process(ListFeatures).await.unwrap();
        assert_eq!(listed[0].upvotes, 2);

        let missing = db
            .process(UpvoteFeature {
                feature_id: 999,
                user_id: bob.id,
            })
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn status_update() {
        let db = test_db().await;
        let feature = db
            .process(CreateFeature {
                title: "QR codes".into(),
                description: "2D".into(),
                submitted_by: None,
                created_at: 1,
            })
            .await
            .unwrap();
        let updated = db
            .process(UpdateFeatureStatus {
                feature_id: feature.id,
                status: FeatureStatus::InProgress,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, FeatureStatus::InProgress);
        let response: FeatureResponse = updated.into();
        assert_eq!(
            serde_json::to_value(response.status).unwrap(),
            serde_json::json!("In Progress")
        );
    }
}
