use std::time::Duration;

use moka::future::Cache;
use sqlx::MySqlPool;

use crate::model::kpi::Kpi;

/// TTL cache of active KPI definitions, keyed by id.
///
/// Built by the composition root and shared through `web::Data`; handlers
/// that change a KPI must call [`KpiCache::invalidate`].
#[derive(Clone)]
pub struct KpiCache {
    inner: Cache<u64, Kpi>,
}

pub const KPI_COLUMNS: &str = "id, code, name, description, unit, department_id, default_target, \
     reward_program, is_deleted, deleted_at, created_at, updated_at";

impl KpiCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, id: u64) -> Option<Kpi> {
        self.inner.get(&id).await
    }

    pub async fn insert(&self, kpi: Kpi) {
        self.inner.insert(kpi.id, kpi).await;
    }

    pub async fn invalidate(&self, id: u64) {
        self.inner.invalidate(&id).await;
    }

    /// Cached lookup falling back to the database. Soft-deleted KPIs are never returned.
    pub async fn get_or_load(&self, pool: &MySqlPool, id: u64) -> Result<Option<Kpi>, sqlx::Error> {
        if let Some(kpi) = self.get(id).await {
            return Ok(Some(kpi));
        }

        let sql = format!("SELECT {} FROM kpis WHERE id = ? AND is_deleted = FALSE", KPI_COLUMNS);
        let kpi = sqlx::query_as::<_, Kpi>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        if let Some(kpi) = &kpi {
            self.insert(kpi.clone()).await;
        }
        Ok(kpi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn kpi(id: u64) -> Kpi {
        Kpi {
            id,
            code: format!("KPI-{id}"),
            name: "Doanh thu".to_string(),
            description: None,
            unit: "VND".to_string(),
            department_id: None,
            default_target: 100.0,
            reward_program: None,
            is_deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[actix_web::test]
    async fn insert_get_invalidate() {
        let cache = KpiCache::new(10, Duration::from_secs(60));
        assert!(cache.get(1).await.is_none());

        cache.insert(kpi(1)).await;
        assert_eq!(cache.get(1).await.map(|k| k.code), Some("KPI-1".to_string()));

        cache.invalidate(1).await;
        assert!(cache.get(1).await.is_none());
    }

    #[actix_web::test]
    async fn entries_expire() {
        let cache = KpiCache::new(10, Duration::from_millis(50));
        cache.insert(kpi(2)).await;
        actix_web::rt::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get(2).await.is_none());
    }
}
