use crate::service::housing::HousingService;

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * The housing service for handling read queries against the store.
     */
    pub housing_service: HousingService,
}

/**
 * Creates a new instance of `AppState`.
 *
 * # Arguments
 * `housing_service`: The housing service for handling read queries.
 */
impl AppState {
    pub fn new(housing_service: HousingService) -> Self {
        AppState { housing_service }
    }
}
