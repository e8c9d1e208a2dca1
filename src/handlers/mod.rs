pub mod deliveries;
pub mod district_days;
pub mod health;
pub mod plannings;
pub mod routes;
pub mod transfers;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
