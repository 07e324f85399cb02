use chrono::{DateTime, Utc};

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Default page size for list queries when the caller does not provide one.
 */
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/**
 * Hard upper bound on the page size. Larger values are capped, not rejected.
 */
pub const MAX_PAGE_SIZE: i64 = 1000;

/**
 * Maximum number of rows returned by a name search.
 */
pub const SEARCH_RESULT_LIMIT: i64 = 20;

/**
 * Validated pagination parameters for list queries.
 */
#[derive(Debug, Clone, Copy)]
pub struct PaginationInput {
    pub limit: i64,
    pub offset: i64,
}

impl PaginationInput {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        PaginationInput { limit: limit.unwrap_or(DEFAULT_PAGE_SIZE), offset: offset.unwrap_or(0) }
    }

    /**
     * Validates the pagination parameters.
     *
     * Negative values are rejected. A limit above `MAX_PAGE_SIZE` is capped
     * rather than rejected so oversized callers still get a page.
     *
     * # Returns
     * The validated input or an `ApplicationError` of type Validation.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.limit < 0 {
            return Err(ApplicationError::new(ErrorType::Validation, "Limit must be a non-negative integer".to_string()));
        }
        if self.offset < 0 {
            return Err(ApplicationError::new(ErrorType::Validation, "Offset must be a non-negative integer".to_string()));
        }
        Ok(PaginationInput { limit: self.limit.min(MAX_PAGE_SIZE), offset: self.offset })
    }
}

/**
 * Validated search parameters for the name search.
 */
#[derive(Debug, Clone)]
pub struct SearchInput {
    pub query: String,
}

impl SearchInput {
    pub fn new(query: String) -> Self {
        SearchInput { query }
    }

    /**
     * Validates the search query. Queries shorter than two characters are rejected.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.query.chars().count() < 2 {
            return Err(ApplicationError::new(ErrorType::Validation, "Query must be at least 2 characters".to_string()));
        }
        Ok(self)
    }
}

/**
 * A Belgian municipality as stored in the reference table.
 */
#[derive(Debug, Clone)]
pub struct Municipality {
    pub nis_code: String,
    pub name_nl: String,
    pub name_fr: String,
    pub province: String,
    pub region: String,
    pub population: i64,
    pub area_km2: f64,
    pub density: f64,
    pub last_updated: DateTime<Utc>,
}

/**
 * A stored apartment demand prediction for one municipality.
 */
#[derive(Debug, Clone)]
pub struct Prediction {
    pub nis_code: String,
    pub studio_demand_pct: f64,
    pub one_bed_demand_pct: f64,
    pub two_bed_demand_pct: f64,
    pub confidence_score: f64,
    pub market_trend: String,
    pub prediction_date: DateTime<Utc>,
}

/**
 * The closed set of market trend labels the calculator can emit.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketTrend {
    Stable,
}

impl MarketTrend {
    pub fn as_str(self) -> &'static str {
        match self {
            MarketTrend::Stable => "stable",
        }
    }
}

/**
 * The per-municipality inputs the demand calculator reads from the store.
 */
#[derive(Debug, Clone)]
pub struct PredictionInput {
    pub nis_code: String,
    pub population: i64,
    pub density: f64,
}

/**
 * Output of the demand calculator for a single municipality.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandPrediction {
    pub studio_demand_pct: f64,
    pub one_bed_demand_pct: f64,
    pub two_bed_demand_pct: f64,
    pub confidence_score: f64,
    pub market_trend: MarketTrend,
}

/**
 * One page of municipalities plus the total row count of the table.
 */
#[derive(Debug)]
pub struct MunicipalityListOutput {
    pub municipalities: Vec<Municipality>,
    pub total: i64,
}

impl MunicipalityListOutput {
    pub fn new(municipalities: Vec<Municipality>, total: i64) -> Self {
        MunicipalityListOutput { municipalities, total }
    }
}

/**
 * A municipality joined with its prediction. Prediction fields are null
 * when the batch has not produced a row for the municipality yet.
 */
#[derive(Debug, Clone)]
pub struct PredictionJoinOutput {
    pub nis_code: String,
    pub name_nl: String,
    pub region: String,
    pub population: i64,
    pub density: f64,
    pub studio_demand_pct: Option<f64>,
    pub one_bed_demand_pct: Option<f64>,
    pub two_bed_demand_pct: Option<f64>,
    pub confidence_score: Option<f64>,
    pub market_trend: Option<String>,
}

/**
 * A reduced municipality projection used by the name search.
 */
#[derive(Debug, Clone)]
pub struct MunicipalitySummary {
    pub nis_code: String,
    pub name_nl: String,
    pub name_fr: String,
    pub region: String,
    pub population: i64,
    pub density: f64,
}

/**
 * Aggregates for a single region. Demand averages are null when the region
 * has no prediction rows.
 */
#[derive(Debug, Clone)]
pub struct RegionStats {
    pub region: String,
    pub count: i64,
    pub total_pop: i64,
    pub avg_density: f64,
    pub avg_studio: Option<f64>,
    pub avg_one_bed: Option<f64>,
    pub avg_two_bed: Option<f64>,
}

/**
 * One of the largest municipalities by population.
 */
#[derive(Debug, Clone)]
pub struct TopCity {
    pub nis_code: String,
    pub name_nl: String,
    pub region: String,
    pub population: i64,
    pub density: f64,
}

/**
 * Global aggregates over the whole reference table. Sum and average are null
 * when the table is empty.
 */
#[derive(Debug, Clone)]
pub struct GeneralStats {
    pub total_municipalities: i64,
    pub total_population: Option<i64>,
    pub avg_density: Option<f64>,
}

/**
 * Aggregated statistics served by the stats endpoint.
 */
#[derive(Debug)]
pub struct StatsOutput {
    pub general: GeneralStats,
    pub by_region: Vec<RegionStats>,
    pub top_cities: Vec<TopCity>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let pagination = PaginationInput::new(None, None).validate().unwrap();
        assert_eq!(pagination.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(pagination.offset, 0);
    }

    #[test]
    fn test_pagination_zero_limit_is_valid() {
        let pagination = PaginationInput::new(Some(0), Some(5)).validate().unwrap();
        assert_eq!(pagination.limit, 0);
        assert_eq!(pagination.offset, 5);
    }

    #[test]
    fn test_pagination_negative_limit_rejected() {
        let result = PaginationInput::new(Some(-1), None).validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_pagination_negative_offset_rejected() {
        let result = PaginationInput::new(None, Some(-10)).validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_pagination_limit_capped() {
        let pagination = PaginationInput::new(Some(50_000), None).validate().unwrap();
        assert_eq!(pagination.limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_search_query_too_short() {
        assert!(SearchInput::new("a".to_string()).validate().is_err());
        assert!(SearchInput::new(String::new()).validate().is_err());
    }

    #[test]
    fn test_search_query_accepted() {
        let input = SearchInput::new("An".to_string()).validate().unwrap();
        assert_eq!(input.query, "An");
    }
}
