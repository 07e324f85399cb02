use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{GeneralStats, Municipality, MunicipalityListOutput, MunicipalitySummary, Prediction, PredictionJoinOutput, RegionStats, StatsOutput, TopCity},
};

/***************** Query models *********************/

/**
 * Pagination query parameters for list requests.
 */
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    /**
     * Maximum number of rows to return.
     */
    pub limit: Option<i64>,
    /**
     * Number of rows to skip.
     */
    pub offset: Option<i64>,
}

/**
 * Query parameters for the name search.
 */
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /**
     * Substring to match against either localized name.
     */
    pub q: Option<String>,
}

/***************** Municipality list models *********************/

/**
 * Reduced municipality projection served by the list endpoint.
 */
#[derive(Debug, Serialize)]
pub struct MunicipalityListElement {
    nis_code: String,
    name_nl: String,
    name_fr: String,
    province: String,
    region: String,
    population: i64,
    density: f64,
}

impl From<Municipality> for MunicipalityListElement {
    fn from(municipality: Municipality) -> Self {
        MunicipalityListElement {
            nis_code: municipality.nis_code,
            name_nl: municipality.name_nl,
            name_fr: municipality.name_fr,
            province: municipality.province,
            region: municipality.region,
            population: municipality.population,
            density: municipality.density,
        }
    }
}

/**
 * Response structure for the municipality list endpoint.
 */
#[derive(Debug, Serialize)]
pub struct MunicipalityListResponse {
    success: bool,
    total: i64,
    count: usize,
    data: Vec<MunicipalityListElement>,
}

impl From<MunicipalityListOutput> for MunicipalityListResponse {
    fn from(output: MunicipalityListOutput) -> Self {
        let data: Vec<MunicipalityListElement> = output.municipalities.into_iter().map(MunicipalityListElement::from).collect();
        MunicipalityListResponse { success: true, total: output.total, count: data.len(), data }
    }
}

/***************** Municipality detail models *********************/

/**
 * Full municipality row served by the detail endpoint.
 */
#[derive(Debug, Serialize)]
pub struct MunicipalityDetailElement {
    nis_code: String,
    name_nl: String,
    name_fr: String,
    province: String,
    region: String,
    population: i64,
    area_km2: f64,
    density: f64,
    last_updated: DateTime<Utc>,
}

impl From<Municipality> for MunicipalityDetailElement {
    fn from(municipality: Municipality) -> Self {
        MunicipalityDetailElement {
            nis_code: municipality.nis_code,
            name_nl: municipality.name_nl,
            name_fr: municipality.name_fr,
            province: municipality.province,
            region: municipality.region,
            population: municipality.population,
            area_km2: municipality.area_km2,
            density: municipality.density,
            last_updated: municipality.last_updated,
        }
    }
}

/**
 * Stored prediction row as served to clients.
 */
#[derive(Debug, Serialize)]
pub struct PredictionElement {
    nis_code: String,
    studio_demand_pct: f64,
    one_bed_demand_pct: f64,
    two_bed_demand_pct: f64,
    confidence_score: f64,
    market_trend: String,
    prediction_date: DateTime<Utc>,
}

impl From<Prediction> for PredictionElement {
    fn from(prediction: Prediction) -> Self {
        PredictionElement {
            nis_code: prediction.nis_code,
            studio_demand_pct: prediction.studio_demand_pct,
            one_bed_demand_pct: prediction.one_bed_demand_pct,
            two_bed_demand_pct: prediction.two_bed_demand_pct,
            confidence_score: prediction.confidence_score,
            market_trend: prediction.market_trend,
            prediction_date: prediction.prediction_date,
        }
    }
}

/**
 * Payload of the municipality detail endpoint. The prediction is null when
 * the batch has not produced a row for the municipality.
 */
#[derive(Debug, Serialize)]
pub struct MunicipalityDetailData {
    municipality: MunicipalityDetailElement,
    prediction: Option<PredictionElement>,
}

/**
 * Response structure for the municipality detail endpoint.
 */
#[derive(Debug, Serialize)]
pub struct MunicipalityDetailResponse {
    success: bool,
    data: MunicipalityDetailData,
}

impl From<(Municipality, Option<Prediction>)> for MunicipalityDetailResponse {
    fn from((municipality, prediction): (Municipality, Option<Prediction>)) -> Self {
        MunicipalityDetailResponse {
            success: true,
            data: MunicipalityDetailData { municipality: MunicipalityDetailElement::from(municipality), prediction: prediction.map(PredictionElement::from) },
        }
    }
}

/***************** Prediction models *********************/

/**
 * Municipality attributes joined with prediction attributes. Prediction
 * fields are null-filled, not absent, when no prediction row exists.
 */
#[derive(Debug, Serialize)]
pub struct PredictionJoinElement {
    nis_code: String,
    name_nl: String,
    region: String,
    population: i64,
    density: f64,
    studio_demand_pct: Option<f64>,
    one_bed_demand_pct: Option<f64>,
    two_bed_demand_pct: Option<f64>,
    confidence_score: Option<f64>,
    market_trend: Option<String>,
}

impl From<PredictionJoinOutput> for PredictionJoinElement {
    fn from(join: PredictionJoinOutput) -> Self {
        PredictionJoinElement {
            nis_code: join.nis_code,
            name_nl: join.name_nl,
            region: join.region,
            population: join.population,
            density: join.density,
            studio_demand_pct: join.studio_demand_pct,
            one_bed_demand_pct: join.one_bed_demand_pct,
            two_bed_demand_pct: join.two_bed_demand_pct,
            confidence_score: join.confidence_score,
            market_trend: join.market_trend,
        }
    }
}

/**
 * Response structure for the prediction endpoint.
 */
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    success: bool,
    data: PredictionJoinElement,
}

impl From<PredictionJoinOutput> for PredictionResponse {
    fn from(join: PredictionJoinOutput) -> Self {
        PredictionResponse { success: true, data: PredictionJoinElement::from(join) }
    }
}

/***************** Search models *********************/

/**
 * Municipality projection served by the search endpoint.
 */
#[derive(Debug, Serialize)]
pub struct SearchElement {
    nis_code: String,
    name_nl: String,
    name_fr: String,
    region: String,
    population: i64,
    density: f64,
}

impl From<MunicipalitySummary> for SearchElement {
    fn from(summary: MunicipalitySummary) -> Self {
        SearchElement { nis_code: summary.nis_code, name_nl: summary.name_nl, name_fr: summary.name_fr, region: summary.region, population: summary.population, density: summary.density }
    }
}

/**
 * Response structure for the search endpoint.
 */
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    success: bool,
    query: String,
    count: usize,
    data: Vec<SearchElement>,
}

impl SearchResponse {
    pub fn new(query: String, results: Vec<MunicipalitySummary>) -> Self {
        let data: Vec<SearchElement> = results.into_iter().map(SearchElement::from).collect();
        SearchResponse { success: true, query, count: data.len(), data }
    }
}

/***************** Stats models *********************/

/**
 * Global aggregates element of the stats payload.
 */
#[derive(Debug, Serialize)]
pub struct GeneralStatsElement {
    total_municipalities: i64,
    total_population: Option<i64>,
    avg_density: Option<f64>,
}

impl From<GeneralStats> for GeneralStatsElement {
    fn from(general: GeneralStats) -> Self {
        GeneralStatsElement { total_municipalities: general.total_municipalities, total_population: general.total_population, avg_density: general.avg_density }
    }
}

/**
 * Per-region aggregates element of the stats payload.
 */
#[derive(Debug, Serialize)]
pub struct RegionStatsElement {
    region: String,
    count: i64,
    total_pop: i64,
    avg_density: f64,
    avg_studio: Option<f64>,
    avg_one_bed: Option<f64>,
    avg_two_bed: Option<f64>,
}

impl From<RegionStats> for RegionStatsElement {
    fn from(stats: RegionStats) -> Self {
        RegionStatsElement {
            region: stats.region,
            count: stats.count,
            total_pop: stats.total_pop,
            avg_density: stats.avg_density,
            avg_studio: stats.avg_studio,
            avg_one_bed: stats.avg_one_bed,
            avg_two_bed: stats.avg_two_bed,
        }
    }
}

/**
 * Top city element of the stats payload.
 */
#[derive(Debug, Serialize)]
pub struct TopCityElement {
    nis_code: String,
    name_nl: String,
    region: String,
    population: i64,
    density: f64,
}

impl From<TopCity> for TopCityElement {
    fn from(city: TopCity) -> Self {
        TopCityElement { nis_code: city.nis_code, name_nl: city.name_nl, region: city.region, population: city.population, density: city.density }
    }
}

/**
 * Payload of the stats endpoint.
 */
#[derive(Debug, Serialize)]
pub struct StatsData {
    general: GeneralStatsElement,
    by_region: Vec<RegionStatsElement>,
    top_10_cities: Vec<TopCityElement>,
}

/**
 * Response structure for the stats endpoint.
 */
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    success: bool,
    data: StatsData,
}

impl From<StatsOutput> for StatsResponse {
    fn from(output: StatsOutput) -> Self {
        StatsResponse {
            success: true,
            data: StatsData {
                general: GeneralStatsElement::from(output.general),
                by_region: output.by_region.into_iter().map(RegionStatsElement::from).collect(),
                top_10_cities: output.top_cities.into_iter().map(TopCityElement::from).collect(),
            },
        }
    }
}

/***************** Health and index models *********************/

/**
 * Response structure for the health endpoint.
 */
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub municipalities_count: i64,
    pub timestamp: DateTime<Utc>,
}

/**
 * Endpoint directory served from the root path.
 */
#[derive(Debug, Serialize)]
pub struct EndpointDirectory {
    pub health: String,
    pub municipalities: String,
    pub municipality: String,
    pub predictions: String,
    pub search: String,
    pub stats: String,
}

/**
 * Response structure for the root path.
 */
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub name: String,
    pub version: String,
    pub status: String,
    pub endpoints: EndpointDirectory,
}

/***************** Error models *********************/

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /**
     * Always false, mirror of the success flag on the happy path.
     */
    pub success: bool,
    /**
     * A human-readable message describing the error.
     */
    pub error: String,
}

impl ResponseError for ApplicationError {
    /**
     * Generates an error response for the application error.
     */
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse { success: false, error: self.message.clone() };
        HttpResponse::build(self.status_code()).json(&error_response)
    }

    fn status_code(&self) -> StatusCode {
        get_statuscode(&self.error_type)
    }
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::Validation => StatusCode::BAD_REQUEST,
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::Initialization | ErrorType::DatabaseError | ErrorType::Application => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(get_statuscode(&ErrorType::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(get_statuscode(&ErrorType::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(get_statuscode(&ErrorType::DatabaseError), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(get_statuscode(&ErrorType::Application), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_response_body() {
        let error = ApplicationError::new(ErrorType::NotFound, "Municipality 99999 not found".to_string());
        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
