mod get_health;
mod get_table_data;
mod post_execute_sql;

use axum::{
    routing::{get, post},
    Router,
};

pub use get_health::get_health;
pub use get_table_data::get_table_data;
pub use post_execute_sql::{post_execute_sql, SqlRequest};

use super::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/data/execute_sql", post(post_execute_sql))
        .route("/data/:table_name", get(get_table_data))
        .with_state(state)
}
