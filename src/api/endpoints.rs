use actix_web::{
    HttpRequest, HttpResponse, get,
    web::{self, Path},
};
use chrono::Utc;
use tracing::{Instrument, instrument};

use crate::{
    api::{
        rest::{EndpointDirectory, HealthResponse, IndexResponse, MunicipalityDetailResponse, MunicipalityListResponse, PaginationQuery, PredictionResponse, SearchQuery, SearchResponse, StatsResponse},
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        models::{PaginationInput, SearchInput},
    },
};

/**
 * Root endpoint serving the service name and endpoint directory.
 */
#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(IndexResponse {
        name: "Belgian Housing Demand API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        endpoints: EndpointDirectory {
            health: "/api/health".to_string(),
            municipalities: "/api/municipalities".to_string(),
            municipality: "/api/municipalities/{nis_code}".to_string(),
            predictions: "/api/predictions/{nis_code}".to_string(),
            search: "/api/search?q={query}".to_string(),
            stats: "/api/stats".to_string(),
        },
    })
}

/**
 * Health check endpoint. Reports store connectivity and the municipality
 * row count.
 */
#[instrument(skip(http_request, app_state), fields(service = "health", trace_id = get_trace_id(&http_request), result))]
#[get("/api/health")]
pub async fn health(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let municipalities_count = app_state.housing_service.health().instrument(span).await?;
    Ok(HttpResponse::Ok().json(HealthResponse { status: "healthy".to_string(), database: "connected".to_string(), municipalities_count, timestamp: Utc::now() }))
}

/**
 * Endpoint to retrieve a page of municipalities ordered by population
 * descending, with the total row count.
 */
#[instrument(skip(http_request, app_state), fields(service = "listMunicipalities", trace_id = get_trace_id(&http_request), result))]
#[get("/api/municipalities")]
pub async fn list_municipalities(http_request: HttpRequest, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::new(pagination.limit, pagination.offset).validate()?;
    let output = app_state.housing_service.get_municipality_list(pagination_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(MunicipalityListResponse::from(output)))
}

/**
 * Endpoint to retrieve a single municipality with its prediction, if any.
 */
#[instrument(skip(http_request, app_state), fields(service = "getMunicipality", trace_id = get_trace_id(&http_request), result))]
#[get("/api/municipalities/{nis_code}")]
pub async fn get_municipality(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let nis_code = path.into_inner();
    let output = app_state.housing_service.get_municipality(&nis_code).instrument(span).await?;
    Ok(HttpResponse::Ok().json(MunicipalityDetailResponse::from(output)))
}

/**
 * Endpoint to retrieve the demand prediction for a municipality, joined
 * with its reference attributes.
 */
#[instrument(skip(http_request, app_state), fields(service = "getPrediction", trace_id = get_trace_id(&http_request), result))]
#[get("/api/predictions/{nis_code}")]
pub async fn get_prediction(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let nis_code = path.into_inner();
    let output = app_state.housing_service.get_prediction(&nis_code).instrument(span).await?;
    Ok(HttpResponse::Ok().json(PredictionResponse::from(output)))
}

/**
 * Endpoint to search municipalities by name substring.
 */
#[instrument(skip(http_request, app_state), fields(service = "search", trace_id = get_trace_id(&http_request), result))]
#[get("/api/search")]
pub async fn search(http_request: HttpRequest, query: web::Query<SearchQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let search_input = SearchInput::new(query.q.clone().unwrap_or_default()).validate()?;
    let results = app_state.housing_service.search(&search_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(SearchResponse::new(search_input.query, results)))
}

/**
 * Endpoint to retrieve aggregate statistics. Re-aggregates on every call.
 */
#[instrument(skip(http_request, app_state), fields(service = "stats", trace_id = get_trace_id(&http_request), result))]
#[get("/api/stats")]
pub async fn get_stats(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let output = app_state.housing_service.get_stats().instrument(span).await?;
    Ok(HttpResponse::Ok().json(StatsResponse::from(output)))
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID")
        .and_then(|v| v.to_str().ok().map(std::string::ToString::to_string))
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod test {
    use actix_web::{App, test, test::TestRequest};
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::{
        dao::housing::HousingDao,
        service::{housing::HousingService, seed::SeedLoader},
    };

    #[actix_web::test]
    async fn test_get_trace_id_exists() {
        let request = TestRequest::default()
            .insert_header(("X-Trace-ID", "test"))
            .to_http_request();
        let trace_id = get_trace_id(&request);
        assert_eq!(trace_id, "test");
    }

    #[actix_web::test]
    async fn test_get_trace_id_not_exists() {
        let request = TestRequest::default()
            .to_http_request();
        let trace_id = get_trace_id(&request);
        assert!(!trace_id.is_empty());
    }

    /**
     * Builds application state over a seeded in-memory store. A single
     * connection keeps the in-memory database alive for the test.
     */
    async fn seeded_state() -> web::Data<AppState> {
        let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
        SeedLoader::new(HousingDao::new()).run(&pool).await.unwrap();
        web::Data::new(AppState::new(HousingService::new(HousingDao::new(), pool)))
    }

    macro_rules! test_app {
        () => {
            test::init_service(
                App::new().app_data(seeded_state().await).service(index).service(health).service(list_municipalities).service(get_municipality).service(get_prediction).service(search).service(get_stats),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_index_returns_directory() {
        let app = test_app!();
        let response: serde_json::Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/").to_request()).await;
        assert_eq!(response["status"], "running");
        assert_eq!(response["endpoints"]["health"], "/api/health");
    }

    #[actix_web::test]
    async fn test_health_reports_count() {
        let app = test_app!();
        let response: serde_json::Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/api/health").to_request()).await;
        assert_eq!(response["status"], "healthy");
        assert_eq!(response["database"], "connected");
        assert_eq!(response["municipalities_count"], 20);
    }

    #[actix_web::test]
    async fn test_list_municipalities_paginated() {
        let app = test_app!();
        let response: serde_json::Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/api/municipalities?limit=2&offset=1").to_request()).await;
        assert_eq!(response["success"], true);
        assert_eq!(response["total"], 20);
        assert_eq!(response["count"], 2);
        // Antwerp is the largest, offset 1 starts at Gent.
        assert_eq!(response["data"][0]["nis_code"], "44021");
    }

    #[actix_web::test]
    async fn test_list_municipalities_zero_limit_keeps_total() {
        let app = test_app!();
        let response: serde_json::Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/api/municipalities?limit=0").to_request()).await;
        assert_eq!(response["count"], 0);
        assert_eq!(response["total"], 20);
    }

    #[actix_web::test]
    async fn test_list_municipalities_negative_limit_rejected() {
        let app = test_app!();
        let response = test::call_service(&app, TestRequest::get().uri("/api/municipalities?limit=-1").to_request()).await;
        assert_eq!(response.status(), 400);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn test_get_municipality_with_prediction() {
        let app = test_app!();
        let response: serde_json::Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/api/municipalities/11002").to_request()).await;
        assert_eq!(response["success"], true);
        assert_eq!(response["data"]["municipality"]["name_nl"], "Antwerpen");
        assert_eq!(response["data"]["prediction"]["studio_demand_pct"], 34.8);
    }

    #[actix_web::test]
    async fn test_get_municipality_unknown_code() {
        let app = test_app!();
        let response = test::call_service(&app, TestRequest::get().uri("/api/municipalities/99999").to_request()).await;
        assert_eq!(response.status(), 404);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn test_get_prediction_joined_fields() {
        let app = test_app!();
        let response: serde_json::Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/api/predictions/11002").to_request()).await;
        assert_eq!(response["success"], true);
        assert_eq!(response["data"]["nis_code"], "11002");
        assert_eq!(response["data"]["population"], 530504);
        assert_eq!(response["data"]["one_bed_demand_pct"], 38.5);
        assert_eq!(response["data"]["market_trend"], "stable");
    }

    #[actix_web::test]
    async fn test_get_prediction_unknown_code() {
        let app = test_app!();
        let response = test::call_service(&app, TestRequest::get().uri("/api/predictions/99999").to_request()).await;
        assert_eq!(response.status(), 404);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn test_search_query_too_short() {
        let app = test_app!();
        let response = test::call_service(&app, TestRequest::get().uri("/api/search?q=a").to_request()).await;
        assert_eq!(response.status(), 400);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn test_search_missing_query_rejected() {
        let app = test_app!();
        let response = test::call_service(&app, TestRequest::get().uri("/api/search").to_request()).await;
        assert_eq!(response.status(), 400);
    }

    #[actix_web::test]
    async fn test_search_no_matches() {
        let app = test_app!();
        let response: serde_json::Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/api/search?q=zz").to_request()).await;
        assert_eq!(response["success"], true);
        assert_eq!(response["count"], 0);
        assert_eq!(response["data"], serde_json::json!([]));
    }

    #[actix_web::test]
    async fn test_search_matches() {
        let app = test_app!();
        let response: serde_json::Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/api/search?q=Antwerp").to_request()).await;
        assert_eq!(response["query"], "Antwerp");
        assert_eq!(response["count"], 1);
        assert_eq!(response["data"][0]["nis_code"], "11002");
    }

    #[actix_web::test]
    async fn test_stats_shape() {
        let app = test_app!();
        let response: serde_json::Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/api/stats").to_request()).await;
        assert_eq!(response["success"], true);
        assert_eq!(response["data"]["general"]["total_municipalities"], 20);
        assert_eq!(response["data"]["by_region"].as_array().unwrap().len(), 3);
        assert_eq!(response["data"]["top_10_cities"].as_array().unwrap().len(), 10);
        assert_eq!(response["data"]["top_10_cities"][0]["nis_code"], "11002");
    }
}
