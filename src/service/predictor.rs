use chrono::Utc;
use sqlx::SqlitePool;
use tracing::instrument;

use crate::{
    dao::housing::HousingDao,
    model::{
        apperror::ApplicationError,
        models::{DemandPrediction, MarketTrend, Prediction},
    },
};

/**
 * Fixed confidence score attached to every prediction.
 */
const CONFIDENCE_SCORE: f64 = 85.0;

/**
 * Density at which the urbanization factor saturates (5000 inhabitants/km2).
 */
const URBANIZATION_DIVISOR: f64 = 50.0;

/**
 * Population at which the size factor saturates (100 000 inhabitants).
 */
const SIZE_FACTOR_DIVISOR: f64 = 1000.0;

/**
 * Rounds to one decimal place, the precision the demand percentages are
 * stored and served with.
 */
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/**
 * Computes the apartment demand distribution for a municipality.
 *
 * The three component scores are strictly positive for any non-negative
 * input (studio >= 20, one-bed >= 40, two-bed >= 30 at full urbanization),
 * so the total never reaches zero. Each percentage is rounded to one
 * decimal independently; the rounded values may sum to 99.9 or 100.1
 * rather than exactly 100.
 *
 * # Arguments
 * `population`: Municipality population, non-negative.
 * `density`: Population density in inhabitants per km2, non-negative.
 *
 * # Returns
 * The demand distribution with the fixed confidence score and trend label.
 */
pub fn calculate_demand(population: i64, density: f64) -> DemandPrediction {
    #[allow(clippy::cast_precision_loss)]
    let population = population as f64;
    let urbanization = (density / URBANIZATION_DIVISOR).min(100.0);
    let size_factor = (population / SIZE_FACTOR_DIVISOR).min(100.0);

    let studio_score = 20.0 + urbanization * 0.3 + size_factor * 0.1;
    let one_bed_score = 40.0 + urbanization * 0.2;
    let two_bed_score = 40.0 - urbanization * 0.1;
    let total = studio_score + one_bed_score + two_bed_score;

    DemandPrediction {
        studio_demand_pct: round_one_decimal(studio_score / total * 100.0),
        one_bed_demand_pct: round_one_decimal(one_bed_score / total * 100.0),
        two_bed_demand_pct: round_one_decimal(two_bed_score / total * 100.0),
        confidence_score: CONFIDENCE_SCORE,
        market_trend: MarketTrend::Stable,
    }
}

/**
 * Runs the prediction batch: computes a demand distribution for every
 * municipality in the store and writes one derived row each, replacing any
 * previous prediction for the same nis code.
 *
 * # Arguments
 * `dao`: The housing DAO.
 * `pool`: The database connection pool.
 *
 * # Returns
 * A Result containing the number of predictions written or an `ApplicationError`.
 */
#[instrument(skip(dao, pool), fields(result))]
pub async fn run_batch(dao: &HousingDao, pool: &SqlitePool) -> Result<usize, ApplicationError> {
    let inputs = dao.get_prediction_inputs(pool).await?;
    let count = inputs.len();
    for input in inputs {
        let demand = calculate_demand(input.population, input.density);
        let prediction = Prediction {
            nis_code: input.nis_code,
            studio_demand_pct: demand.studio_demand_pct,
            one_bed_demand_pct: demand.one_bed_demand_pct,
            two_bed_demand_pct: demand.two_bed_demand_pct,
            confidence_score: demand.confidence_score,
            market_trend: demand.market_trend.as_str().to_string(),
            prediction_date: Utc::now(),
        };
        dao.upsert_prediction(pool, &prediction).await?;
    }
    tracing::info!("Prediction batch wrote {} rows", count);
    Ok(count)
}

#[cfg(test)]
mod test {
    use sqlx::SqlitePool;

    use super::*;
    use crate::model::models::Municipality;

    #[test]
    fn test_antwerp_scenario() {
        // population 530504, density 2594: urbanization 51.88, size factor
        // clamped at 100, scores 45.564 / 50.376 / 34.812, total 130.752.
        let demand = calculate_demand(530504, 2594.0);
        assert_eq!(demand.studio_demand_pct, 34.8);
        assert_eq!(demand.one_bed_demand_pct, 38.5);
        assert_eq!(demand.two_bed_demand_pct, 26.6);
        assert_eq!(demand.confidence_score, 85.0);
        assert_eq!(demand.market_trend, MarketTrend::Stable);
    }

    #[test]
    fn test_both_factors_saturated() {
        // Scores 60 / 60 / 30, total 150.
        let demand = calculate_demand(1_000_000, 10_000.0);
        assert_eq!(demand.studio_demand_pct, 40.0);
        assert_eq!(demand.one_bed_demand_pct, 40.0);
        assert_eq!(demand.two_bed_demand_pct, 20.0);
    }

    #[test]
    fn test_zero_inputs() {
        // Scores 20 / 40 / 40, total 100. No division by zero.
        let demand = calculate_demand(0, 0.0);
        assert_eq!(demand.studio_demand_pct, 20.0);
        assert_eq!(demand.one_bed_demand_pct, 40.0);
        assert_eq!(demand.two_bed_demand_pct, 40.0);
    }

    #[test]
    fn test_monotonic_in_density_below_saturation() {
        let low = calculate_demand(50_000, 500.0);
        let high = calculate_demand(50_000, 3000.0);
        assert!(high.studio_demand_pct > low.studio_demand_pct);
        assert!(high.one_bed_demand_pct > low.one_bed_demand_pct);
        assert!(high.two_bed_demand_pct < low.two_bed_demand_pct);
    }

    #[test]
    fn test_percentages_sum_close_to_hundred() {
        let samples = [(0_i64, 0.0_f64), (1000, 50.0), (69660, 326.0), (194291, 5957.0), (530504, 2594.0), (1_000_000, 20_000.0), (134323, 16502.0)];
        for (population, density) in samples {
            let demand = calculate_demand(population, density);
            let sum = demand.studio_demand_pct + demand.one_bed_demand_pct + demand.two_bed_demand_pct;
            assert!((sum - 100.0).abs() <= 0.1 + 1e-9, "sum {sum} for population {population}, density {density}");
        }
    }

    #[sqlx::test]
    async fn test_batch_overwrites_previous_rows(pool: SqlitePool) {
        let dao = HousingDao::new();
        dao.ensure_schema(&pool).await.unwrap();
        let municipality = Municipality {
            nis_code: "11002".to_string(),
            name_nl: "Antwerpen".to_string(),
            name_fr: "Anvers".to_string(),
            province: "Antwerpen".to_string(),
            region: "Vlaanderen".to_string(),
            population: 530504,
            area_km2: 204.51,
            density: 2594.0,
            last_updated: Utc::now(),
        };
        dao.upsert_municipality(&pool, &municipality).await.unwrap();
        assert_eq!(run_batch(&dao, &pool).await.unwrap(), 1);
        assert_eq!(run_batch(&dao, &pool).await.unwrap(), 1);
        let prediction = dao.get_prediction(&pool, "11002").await.unwrap().unwrap();
        assert_eq!(prediction.studio_demand_pct, 34.8);
        assert_eq!(prediction.market_trend, "stable");
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM apartment_predictions").fetch_one(&pool).await.unwrap();
        assert_eq!(count.0, 1);
    }
}
