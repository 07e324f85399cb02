use sqlx::SqlitePool;

use crate::{
    dao::housing::HousingDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{Municipality, MunicipalityListOutput, MunicipalitySummary, PaginationInput, Prediction, PredictionJoinOutput, SearchInput, StatsOutput},
    },
};

/**
 * Read-only query service over the municipality and prediction tables.
 * Owns the connection pool and DAO and is injected into the application
 * state at construction.
 */
pub struct HousingService {
    /**
     * The DAO for housing operations.
     */
    housing_dao: HousingDao,
    /**
     * Connection pool for database operations.
     */
    connection_pool: SqlitePool,
}

impl HousingService {
    /**
     * Creates a new instance of `HousingService`.
     *
     * # Arguments
     * `housing_dao`: The DAO for housing operations.
     * `connection_pool`: Connection pool for database operations.
     *
     * # Returns
     * A new instance of `HousingService`.
     */
    pub fn new(housing_dao: HousingDao, connection_pool: SqlitePool) -> Self {
        HousingService { housing_dao, connection_pool }
    }

    /**
     * Checks store connectivity by counting municipalities.
     *
     * # Returns
     * A Result containing the municipality count or an `ApplicationError`.
     */
    pub async fn health(&self) -> Result<i64, ApplicationError> {
        self.housing_dao.count_municipalities(&self.connection_pool).await
    }

    /**
     * Retrieves a page of municipalities ordered by population descending.
     *
     * # Arguments
     * `pagination_input`: Validated pagination parameters.
     *
     * # Returns
     * A Result containing `MunicipalityListOutput` or an `ApplicationError`.
     */
    pub async fn get_municipality_list(&self, pagination_input: PaginationInput) -> Result<MunicipalityListOutput, ApplicationError> {
        self.housing_dao.get_municipality_list(&self.connection_pool, pagination_input).await
    }

    /**
     * Retrieves a municipality with its prediction, if any.
     *
     * # Arguments
     * `nis_code`: The nis code to look up.
     *
     * # Returns
     * A Result containing the municipality and its optional prediction, or
     * a NotFound `ApplicationError` when the code is unknown.
     */
    pub async fn get_municipality(&self, nis_code: &str) -> Result<(Municipality, Option<Prediction>), ApplicationError> {
        let Some(municipality) = self.housing_dao.get_municipality(&self.connection_pool, nis_code).await? else {
            return Err(ApplicationError::new(ErrorType::NotFound, format!("Municipality {nis_code} not found")));
        };
        let prediction = self.housing_dao.get_prediction(&self.connection_pool, nis_code).await?;
        Ok((municipality, prediction))
    }

    /**
     * Retrieves the municipality/prediction join for a nis code. Prediction
     * fields are null-filled when the municipality exists without a
     * prediction; an unknown code is a NotFound error.
     *
     * # Arguments
     * `nis_code`: The nis code to look up.
     *
     * # Returns
     * A Result containing the joined row or an `ApplicationError`.
     */
    pub async fn get_prediction(&self, nis_code: &str) -> Result<PredictionJoinOutput, ApplicationError> {
        let Some(join) = self.housing_dao.get_prediction_join(&self.connection_pool, nis_code).await? else {
            return Err(ApplicationError::new(ErrorType::NotFound, format!("No data for {nis_code}")));
        };
        Ok(join)
    }

    /**
     * Searches municipalities by substring on either localized name.
     *
     * # Arguments
     * `search_input`: Validated search parameters.
     *
     * # Returns
     * A Result containing the matching rows or an `ApplicationError`.
     */
    pub async fn search(&self, search_input: &SearchInput) -> Result<Vec<MunicipalitySummary>, ApplicationError> {
        self.housing_dao.search_municipalities(&self.connection_pool, search_input).await
    }

    /**
     * Computes the aggregate statistics. Every call re-aggregates; there is
     * no caching layer.
     *
     * # Returns
     * A Result containing `StatsOutput` or an `ApplicationError`.
     */
    pub async fn get_stats(&self) -> Result<StatsOutput, ApplicationError> {
        let general = self.housing_dao.get_general_stats(&self.connection_pool).await?;
        let by_region = self.housing_dao.get_region_stats(&self.connection_pool).await?;
        let top_cities = self.housing_dao.get_top_cities(&self.connection_pool).await?;
        Ok(StatsOutput { general, by_region, top_cities })
    }
}

#[cfg(test)]
mod test {
    use sqlx::SqlitePool;

    use super::*;
    use crate::service::seed::SeedLoader;

    async fn seeded_service(pool: &SqlitePool) -> HousingService {
        SeedLoader::new(HousingDao::new()).run(pool).await.unwrap();
        HousingService::new(HousingDao::new(), pool.clone())
    }

    #[sqlx::test]
    async fn test_get_municipality_not_found(pool: SqlitePool) {
        let service = seeded_service(&pool).await;
        let error = service.get_municipality("99999").await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
    }

    #[sqlx::test]
    async fn test_get_prediction_not_found(pool: SqlitePool) {
        let service = seeded_service(&pool).await;
        let error = service.get_prediction("99999").await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
    }

    #[sqlx::test]
    async fn test_get_municipality_with_prediction(pool: SqlitePool) {
        let service = seeded_service(&pool).await;
        let (municipality, prediction) = service.get_municipality("21004").await.unwrap();
        assert_eq!(municipality.name_nl, "Brussel");
        assert!(prediction.is_some());
    }

    #[sqlx::test]
    async fn test_stats_aggregates_seeded_data(pool: SqlitePool) {
        let service = seeded_service(&pool).await;
        let stats = service.get_stats().await.unwrap();
        assert_eq!(stats.general.total_municipalities, 20);
        assert_eq!(stats.by_region.len(), 3);
        assert_eq!(stats.top_cities.len(), 10);
        assert_eq!(stats.top_cities[0].nis_code, "11002");
    }

    #[sqlx::test]
    async fn test_health_reports_count(pool: SqlitePool) {
        let service = seeded_service(&pool).await;
        assert_eq!(service.health().await.unwrap(), 20);
    }
}
