use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{Instrument, instrument};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{
        GeneralStats, Municipality, MunicipalityListOutput, MunicipalitySummary, PaginationInput, Prediction, PredictionInput, PredictionJoinOutput, RegionStats, SEARCH_RESULT_LIMIT, SearchInput,
        TopCity,
    },
};

/**
 * Database response type for querying a municipality row.
 */
pub type QueryMunicipalityDbResp = (String, String, String, String, String, i64, f64, f64, DateTime<Utc>);

/**
 * Database response type for querying a prediction row.
 */
pub type QueryPredictionDbResp = (String, f64, f64, f64, f64, String, DateTime<Utc>);

/**
 * Database response type for the municipality/prediction left join.
 */
pub type QueryPredictionJoinDbResp = (String, String, String, i64, f64, Option<f64>, Option<f64>, Option<f64>, Option<f64>, Option<String>);

/**
 * Database response type for the name search projection.
 */
pub type QuerySummaryDbResp = (String, String, String, String, i64, f64);

/**
 * Database response type for per-region aggregates.
 */
pub type QueryRegionStatsDbResp = (String, i64, i64, f64, Option<f64>, Option<f64>, Option<f64>);

/**
 * Database response type for the top cities projection.
 */
pub type QueryTopCityDbResp = (String, String, String, i64, f64);

/**
 * Database response type for the prediction batch inputs.
 */
pub type QueryPredictionInputDbResp = (String, i64, f64);

/**
 * SQL to create the municipality reference table. Idempotent.
 */
const CREATE_MUNICIPALITIES_TABLE: &str = "CREATE TABLE IF NOT EXISTS municipalities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nis_code TEXT UNIQUE,
        name_nl TEXT,
        name_fr TEXT,
        province TEXT,
        region TEXT,
        population INTEGER,
        area_km2 REAL,
        density REAL,
        last_updated TEXT
    )";

/**
 * SQL to create the derived prediction table. Idempotent. The unique
 * constraint on nis_code gives one-prediction-per-municipality overwrite
 * semantics with INSERT OR REPLACE.
 */
const CREATE_PREDICTIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS apartment_predictions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nis_code TEXT UNIQUE,
        studio_demand_pct REAL,
        one_bed_demand_pct REAL,
        two_bed_demand_pct REAL,
        confidence_score REAL,
        market_trend TEXT,
        prediction_date TEXT,
        FOREIGN KEY (nis_code) REFERENCES municipalities(nis_code)
    )";

/**
 * SQL to insert or fully replace a municipality by nis code.
 */
const UPSERT_MUNICIPALITY: &str =
    "INSERT OR REPLACE INTO municipalities (nis_code, name_nl, name_fr, province, region, population, area_km2, density, last_updated) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";

/**
 * SQL to insert or fully replace a prediction by nis code.
 */
const UPSERT_PREDICTION: &str =
    "INSERT OR REPLACE INTO apartment_predictions (nis_code, studio_demand_pct, one_bed_demand_pct, two_bed_demand_pct, confidence_score, market_trend, prediction_date) VALUES (?, ?, ?, ?, ?, ?, ?)";

/**
 * SQL to retrieve a page of municipalities ordered by population.
 */
const QUERY_MUNICIPALITY_LIST: &str =
    "SELECT nis_code, name_nl, name_fr, province, region, population, area_km2, density, last_updated FROM municipalities ORDER BY population DESC LIMIT ? OFFSET ?";

/**
 * SQL to count all municipalities.
 */
const COUNT_MUNICIPALITIES: &str = "SELECT COUNT(*) FROM municipalities";

/**
 * SQL to retrieve a single municipality by nis code.
 */
const QUERY_MUNICIPALITY_BY_CODE: &str = "SELECT nis_code, name_nl, name_fr, province, region, population, area_km2, density, last_updated FROM municipalities WHERE nis_code = ?";

/**
 * SQL to retrieve a single prediction by nis code.
 */
const QUERY_PREDICTION_BY_CODE: &str =
    "SELECT nis_code, studio_demand_pct, one_bed_demand_pct, two_bed_demand_pct, confidence_score, market_trend, prediction_date FROM apartment_predictions WHERE nis_code = ?";

/**
 * SQL joining a municipality with its prediction. Prediction columns are
 * null when no derived row exists.
 */
const QUERY_PREDICTION_JOIN: &str = "SELECT m.nis_code, m.name_nl, m.region, m.population, m.density,
        p.studio_demand_pct, p.one_bed_demand_pct, p.two_bed_demand_pct, p.confidence_score, p.market_trend
    FROM municipalities m
    LEFT JOIN apartment_predictions p ON m.nis_code = p.nis_code
    WHERE m.nis_code = ?";

/**
 * SQL to search municipalities by substring on either localized name.
 */
const QUERY_SEARCH: &str = "SELECT nis_code, name_nl, name_fr, region, population, density FROM municipalities
    WHERE name_nl LIKE ? OR name_fr LIKE ?
    ORDER BY population DESC
    LIMIT ?";

/**
 * SQL for per-region aggregates over the municipality/prediction join.
 */
const QUERY_REGION_STATS: &str = "SELECT m.region, COUNT(*), SUM(m.population), AVG(m.density),
        AVG(p.studio_demand_pct), AVG(p.one_bed_demand_pct), AVG(p.two_bed_demand_pct)
    FROM municipalities m
    LEFT JOIN apartment_predictions p ON m.nis_code = p.nis_code
    GROUP BY m.region";

/**
 * SQL for the ten largest municipalities by population.
 */
const QUERY_TOP_CITIES: &str = "SELECT nis_code, name_nl, region, population, density FROM municipalities ORDER BY population DESC LIMIT 10";

/**
 * SQL for global aggregates over the reference table.
 */
const QUERY_GENERAL_STATS: &str = "SELECT COUNT(*), SUM(population), AVG(density) FROM municipalities";

/**
 * SQL for the prediction batch inputs.
 */
const QUERY_PREDICTION_INPUTS: &str = "SELECT nis_code, population, density FROM municipalities";

impl From<QueryMunicipalityDbResp> for Municipality {
    fn from(row: QueryMunicipalityDbResp) -> Self {
        Municipality { nis_code: row.0, name_nl: row.1, name_fr: row.2, province: row.3, region: row.4, population: row.5, area_km2: row.6, density: row.7, last_updated: row.8 }
    }
}

impl From<QueryPredictionDbResp> for Prediction {
    fn from(row: QueryPredictionDbResp) -> Self {
        Prediction { nis_code: row.0, studio_demand_pct: row.1, one_bed_demand_pct: row.2, two_bed_demand_pct: row.3, confidence_score: row.4, market_trend: row.5, prediction_date: row.6 }
    }
}

impl From<QueryPredictionJoinDbResp> for PredictionJoinOutput {
    fn from(row: QueryPredictionJoinDbResp) -> Self {
        PredictionJoinOutput {
            nis_code: row.0,
            name_nl: row.1,
            region: row.2,
            population: row.3,
            density: row.4,
            studio_demand_pct: row.5,
            one_bed_demand_pct: row.6,
            two_bed_demand_pct: row.7,
            confidence_score: row.8,
            market_trend: row.9,
        }
    }
}

impl From<QuerySummaryDbResp> for MunicipalitySummary {
    fn from(row: QuerySummaryDbResp) -> Self {
        MunicipalitySummary { nis_code: row.0, name_nl: row.1, name_fr: row.2, region: row.3, population: row.4, density: row.5 }
    }
}

impl From<QueryRegionStatsDbResp> for RegionStats {
    fn from(row: QueryRegionStatsDbResp) -> Self {
        RegionStats { region: row.0, count: row.1, total_pop: row.2, avg_density: row.3, avg_studio: row.4, avg_one_bed: row.5, avg_two_bed: row.6 }
    }
}

impl From<QueryTopCityDbResp> for TopCity {
    fn from(row: QueryTopCityDbResp) -> Self {
        TopCity { nis_code: row.0, name_nl: row.1, region: row.2, population: row.3, density: row.4 }
    }
}

impl From<QueryPredictionInputDbResp> for PredictionInput {
    fn from(row: QueryPredictionInputDbResp) -> Self {
        PredictionInput { nis_code: row.0, population: row.1, density: row.2 }
    }
}

/**
 * DAO for housing-related database operations.
 */
pub struct HousingDao {}

impl HousingDao {
    /**
     * Creates a new instance of `HousingDao`.
     *
     * # Returns
     * A new instance of `HousingDao`.
     */
    pub fn new() -> Self {
        HousingDao {}
    }

    /**
     * Creates both tables if they do not exist yet.
     *
     * # Arguments
     * `pool`: The database connection pool.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, pool), fields(result))]
    pub async fn ensure_schema(&self, pool: &SqlitePool) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(CREATE_MUNICIPALITIES_TABLE)
            .execute(pool)
            .instrument(span.clone())
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to create municipalities table: {err}")))?;
        sqlx::query(CREATE_PREDICTIONS_TABLE)
            .execute(pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to create apartment_predictions table: {err}")))?;
        Ok(())
    }

    /**
     * Inserts or fully replaces a municipality keyed by nis code.
     *
     * # Arguments
     * `pool`: The database connection pool.
     * `municipality`: The municipality row to write.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, pool, municipality), fields(result))]
    pub async fn upsert_municipality(&self, pool: &SqlitePool, municipality: &Municipality) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(UPSERT_MUNICIPALITY)
            .bind(&municipality.nis_code)
            .bind(&municipality.name_nl)
            .bind(&municipality.name_fr)
            .bind(&municipality.province)
            .bind(&municipality.region)
            .bind(municipality.population)
            .bind(municipality.area_km2)
            .bind(municipality.density)
            .bind(municipality.last_updated)
            .execute(pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to upsert municipality: {err}")))?;
        Ok(())
    }

    /**
     * Inserts or fully replaces a prediction keyed by nis code.
     *
     * # Arguments
     * `pool`: The database connection pool.
     * `prediction`: The prediction row to write.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, pool, prediction), fields(result))]
    pub async fn upsert_prediction(&self, pool: &SqlitePool, prediction: &Prediction) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(UPSERT_PREDICTION)
            .bind(&prediction.nis_code)
            .bind(prediction.studio_demand_pct)
            .bind(prediction.one_bed_demand_pct)
            .bind(prediction.two_bed_demand_pct)
            .bind(prediction.confidence_score)
            .bind(&prediction.market_trend)
            .bind(prediction.prediction_date)
            .execute(pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to upsert prediction: {err}")))?;
        Ok(())
    }

    /**
     * Counts all municipalities.
     *
     * # Arguments
     * `pool`: The database connection pool.
     *
     * # Returns
     * A Result containing the row count or an `ApplicationError`.
     */
    #[instrument(skip(self, pool), fields(result))]
    pub async fn count_municipalities(&self, pool: &SqlitePool) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let count: (i64,) = sqlx::query_as(COUNT_MUNICIPALITIES)
            .fetch_one(pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to count municipalities: {err}")))?;
        Ok(count.0)
    }

    /**
     * Retrieves a page of municipalities ordered by population descending,
     * together with the total row count of the table.
     *
     * # Arguments
     * `pool`: The database connection pool.
     * `pagination_input`: Validated pagination parameters.
     *
     * # Returns
     * A Result containing `MunicipalityListOutput` or an `ApplicationError`.
     */
    #[instrument(skip(self, pool), fields(result))]
    pub async fn get_municipality_list(&self, pool: &SqlitePool, pagination_input: PaginationInput) -> Result<MunicipalityListOutput, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryMunicipalityDbResp> = sqlx::query_as(QUERY_MUNICIPALITY_LIST)
            .bind(pagination_input.limit)
            .bind(pagination_input.offset)
            .fetch_all(pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get municipality list: {err}")))?;
        let municipalities: Vec<Municipality> = results.into_iter().map(Municipality::from).collect();
        let total = self.count_municipalities(pool).await?;
        Ok(MunicipalityListOutput::new(municipalities, total))
    }

    /**
     * Retrieves a municipality by nis code.
     *
     * # Arguments
     * `pool`: The database connection pool.
     * `nis_code`: The nis code to look up.
     *
     * # Returns
     * A Result containing the municipality if it exists, or an `ApplicationError`.
     */
    #[instrument(skip(self, pool), fields(result))]
    pub async fn get_municipality(&self, pool: &SqlitePool, nis_code: &str) -> Result<Option<Municipality>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryMunicipalityDbResp> = sqlx::query_as(QUERY_MUNICIPALITY_BY_CODE)
            .bind(nis_code)
            .fetch_optional(pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get municipality: {err}")))?;
        Ok(result.map(Municipality::from))
    }

    /**
     * Retrieves a prediction by nis code.
     *
     * # Arguments
     * `pool`: The database connection pool.
     * `nis_code`: The nis code to look up.
     *
     * # Returns
     * A Result containing the prediction if it exists, or an `ApplicationError`.
     */
    #[instrument(skip(self, pool), fields(result))]
    pub async fn get_prediction(&self, pool: &SqlitePool, nis_code: &str) -> Result<Option<Prediction>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryPredictionDbResp> = sqlx::query_as(QUERY_PREDICTION_BY_CODE)
            .bind(nis_code)
            .fetch_optional(pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get prediction: {err}")))?;
        Ok(result.map(Prediction::from))
    }

    /**
     * Retrieves a municipality left-joined with its prediction. Prediction
     * fields are null-filled when the derived row does not exist; the result
     * is `None` only when the municipality itself is unknown.
     *
     * # Arguments
     * `pool`: The database connection pool.
     * `nis_code`: The nis code to look up.
     *
     * # Returns
     * A Result containing the joined row if the municipality exists, or an `ApplicationError`.
     */
    #[instrument(skip(self, pool), fields(result))]
    pub async fn get_prediction_join(&self, pool: &SqlitePool, nis_code: &str) -> Result<Option<PredictionJoinOutput>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryPredictionJoinDbResp> = sqlx::query_as(QUERY_PREDICTION_JOIN)
            .bind(nis_code)
            .fetch_optional(pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get prediction join: {err}")))?;
        Ok(result.map(PredictionJoinOutput::from))
    }

    /**
     * Searches municipalities by substring on either localized name,
     * ordered by population descending and capped at `SEARCH_RESULT_LIMIT`.
     *
     * # Arguments
     * `pool`: The database connection pool.
     * `search_input`: Validated search parameters.
     *
     * # Returns
     * A Result containing the matching rows or an `ApplicationError`.
     */
    #[instrument(skip(self, pool), fields(result))]
    pub async fn search_municipalities(&self, pool: &SqlitePool, search_input: &SearchInput) -> Result<Vec<MunicipalitySummary>, ApplicationError> {
        let span = tracing::Span::current();
        let pattern = format!("%{}%", search_input.query);
        let results: Vec<QuerySummaryDbResp> = sqlx::query_as(QUERY_SEARCH)
            .bind(&pattern)
            .bind(&pattern)
            .bind(SEARCH_RESULT_LIMIT)
            .fetch_all(pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute search query: {err}")))?;
        Ok(results.into_iter().map(MunicipalitySummary::from).collect())
    }

    /**
     * Retrieves per-region aggregates over the municipality/prediction join.
     *
     * # Arguments
     * `pool`: The database connection pool.
     *
     * # Returns
     * A Result containing the per-region aggregates or an `ApplicationError`.
     */
    #[instrument(skip(self, pool), fields(result))]
    pub async fn get_region_stats(&self, pool: &SqlitePool) -> Result<Vec<RegionStats>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryRegionStatsDbResp> = sqlx::query_as(QUERY_REGION_STATS)
            .fetch_all(pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute region stats query: {err}")))?;
        Ok(results.into_iter().map(RegionStats::from).collect())
    }

    /**
     * Retrieves the ten largest municipalities by population.
     *
     * # Arguments
     * `pool`: The database connection pool.
     *
     * # Returns
     * A Result containing the top cities or an `ApplicationError`.
     */
    #[instrument(skip(self, pool), fields(result))]
    pub async fn get_top_cities(&self, pool: &SqlitePool) -> Result<Vec<TopCity>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryTopCityDbResp> = sqlx::query_as(QUERY_TOP_CITIES)
            .fetch_all(pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute top cities query: {err}")))?;
        Ok(results.into_iter().map(TopCity::from).collect())
    }

    /**
     * Retrieves global aggregates over the reference table.
     *
     * # Arguments
     * `pool`: The database connection pool.
     *
     * # Returns
     * A Result containing the general aggregates or an `ApplicationError`.
     */
    #[instrument(skip(self, pool), fields(result))]
    pub async fn get_general_stats(&self, pool: &SqlitePool) -> Result<GeneralStats, ApplicationError> {
        let span = tracing::Span::current();
        let result: (i64, Option<i64>, Option<f64>) = sqlx::query_as(QUERY_GENERAL_STATS)
            .fetch_one(pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute general stats query: {err}")))?;
        Ok(GeneralStats { total_municipalities: result.0, total_population: result.1, avg_density: result.2 })
    }

    /**
     * Retrieves the inputs for the prediction batch, one per municipality.
     *
     * # Arguments
     * `pool`: The database connection pool.
     *
     * # Returns
     * A Result containing the prediction inputs or an `ApplicationError`.
     */
    #[instrument(skip(self, pool), fields(result))]
    pub async fn get_prediction_inputs(&self, pool: &SqlitePool) -> Result<Vec<PredictionInput>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryPredictionInputDbResp> = sqlx::query_as(QUERY_PREDICTION_INPUTS)
            .fetch_all(pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute prediction inputs query: {err}")))?;
        Ok(results.into_iter().map(PredictionInput::from).collect())
    }
}
