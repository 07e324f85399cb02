use chrono::Utc;
use sqlx::SqlitePool;
use tracing::instrument;

use crate::{
    dao::housing::HousingDao,
    model::{apperror::ApplicationError, models::Municipality},
    service::predictor,
};

/**
 * Static reference dataset: the major Belgian municipalities, keyed by nis
 * code. Format: (nis, name_nl, name_fr, province, region, population,
 * area km2, density).
 */
const MUNICIPALITIES: [(&str, &str, &str, &str, &str, i64, f64, f64); 20] = [
    // Flanders
    ("11002", "Antwerpen", "Anvers", "Antwerpen", "Vlaanderen", 530504, 204.51, 2594.0),
    ("44021", "Gent", "Gand", "Oost-Vlaanderen", "Vlaanderen", 264689, 156.18, 1695.0),
    ("24062", "Leuven", "Louvain", "Vlaams-Brabant", "Vlaanderen", 102275, 56.63, 1806.0),
    ("31003", "Brugge", "Bruges", "West-Vlaanderen", "Vlaanderen", 118656, 138.40, 857.0),
    ("71011", "Hasselt", "Hasselt", "Limburg", "Vlaanderen", 79421, 102.24, 777.0),
    ("12025", "Mechelen", "Malines", "Antwerpen", "Vlaanderen", 86921, 65.19, 1333.0),
    ("32003", "Kortrijk", "Courtrai", "West-Vlaanderen", "Vlaanderen", 76265, 80.03, 953.0),
    ("41002", "Aalst", "Alost", "Oost-Vlaanderen", "Vlaanderen", 87763, 78.08, 1124.0),
    // Brussels
    ("21004", "Brussel", "Bruxelles", "Brussels", "Brussels", 194291, 32.61, 5957.0),
    ("21001", "Anderlecht", "Anderlecht", "Brussels", "Brussels", 122547, 17.74, 6906.0),
    ("21015", "Schaarbeek", "Schaerbeek", "Brussels", "Brussels", 134323, 8.14, 16502.0),
    ("21009", "Elsene", "Ixelles", "Brussels", "Brussels", 88145, 6.34, 13902.0),
    ("21016", "Ukkel", "Uccle", "Brussels", "Brussels", 84847, 22.87, 3710.0),
    // Wallonia
    ("62003", "Liège", "Luik", "Liège", "Wallonië", 197355, 69.39, 2844.0),
    ("91013", "Charleroi", "Charleroi", "Hainaut", "Wallonië", 202598, 102.08, 1985.0),
    ("92003", "Namur", "Namen", "Namur", "Wallonië", 111257, 175.69, 633.0),
    ("91034", "Mons", "Bergen", "Hainaut", "Wallonië", 95748, 146.52, 653.0),
    ("91054", "Tournai", "Doornik", "Hainaut", "Wallonië", 69660, 213.75, 326.0),
    ("62096", "Seraing", "Seraing", "Liège", "Wallonië", 64678, 35.34, 1830.0),
    ("62063", "Verviers", "Verviers", "Liège", "Wallonië", 56440, 48.03, 1175.0),
];

/**
 * Seed loader for the municipality reference data. Invoked once before the
 * server starts serving; the query service only depends on the resulting
 * table contents.
 */
pub struct SeedLoader {
    dao: HousingDao,
}

impl SeedLoader {
    /**
     * Creates a new instance of `SeedLoader`.
     *
     * # Returns
     * A new instance of `SeedLoader`.
     */
    pub fn new(dao: HousingDao) -> Self {
        SeedLoader { dao }
    }

    /**
     * Upserts the reference dataset. Rows with an existing nis code are
     * fully replaced, so reseeding never duplicates municipalities.
     *
     * # Arguments
     * `pool`: The database connection pool.
     *
     * # Returns
     * A Result containing the number of rows written or an `ApplicationError`.
     */
    #[instrument(skip(self, pool), fields(result))]
    pub async fn load_municipalities(&self, pool: &SqlitePool) -> Result<usize, ApplicationError> {
        for (nis_code, name_nl, name_fr, province, region, population, area_km2, density) in MUNICIPALITIES {
            let municipality = Municipality {
                nis_code: nis_code.to_string(),
                name_nl: name_nl.to_string(),
                name_fr: name_fr.to_string(),
                province: province.to_string(),
                region: region.to_string(),
                population,
                area_km2,
                density,
                last_updated: Utc::now(),
            };
            self.dao.upsert_municipality(pool, &municipality).await?;
        }
        tracing::info!("Seeded {} municipalities", MUNICIPALITIES.len());
        Ok(MUNICIPALITIES.len())
    }

    /**
     * Runs the full batch: seeds the reference data, then computes and
     * stores a prediction for every municipality.
     *
     * # Arguments
     * `pool`: The database connection pool.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, pool), fields(result))]
    pub async fn run(&self, pool: &SqlitePool) -> Result<(), ApplicationError> {
        self.dao.ensure_schema(pool).await?;
        self.load_municipalities(pool).await?;
        predictor::run_batch(&self.dao, pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[sqlx::test]
    async fn test_seed_populates_both_tables(pool: SqlitePool) {
        let loader = SeedLoader::new(HousingDao::new());
        loader.run(&pool).await.unwrap();
        let municipalities: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM municipalities").fetch_one(&pool).await.unwrap();
        let predictions: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM apartment_predictions").fetch_one(&pool).await.unwrap();
        assert_eq!(municipalities.0, 20);
        assert_eq!(predictions.0, 20);
    }

    #[sqlx::test]
    async fn test_reseed_is_idempotent(pool: SqlitePool) {
        let loader = SeedLoader::new(HousingDao::new());
        loader.run(&pool).await.unwrap();
        loader.run(&pool).await.unwrap();
        let municipalities: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM municipalities").fetch_one(&pool).await.unwrap();
        let predictions: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM apartment_predictions").fetch_one(&pool).await.unwrap();
        assert_eq!(municipalities.0, 20);
        assert_eq!(predictions.0, 20);
    }

    #[sqlx::test]
    async fn test_seeded_predictions_match_calculator(pool: SqlitePool) {
        let dao = HousingDao::new();
        let loader = SeedLoader::new(HousingDao::new());
        loader.run(&pool).await.unwrap();
        let prediction = dao.get_prediction(&pool, "11002").await.unwrap().unwrap();
        assert_eq!(prediction.studio_demand_pct, 34.8);
        assert_eq!(prediction.one_bed_demand_pct, 38.5);
        assert_eq!(prediction.two_bed_demand_pct, 26.6);
        assert_eq!(prediction.confidence_score, 85.0);
        assert_eq!(prediction.market_trend, "stable");
    }
}
