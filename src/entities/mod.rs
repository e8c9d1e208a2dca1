pub mod delivery_document;
pub mod delivery_planning;
pub mod delivery_route;
pub mod district_day_rule;
pub mod partner;
pub mod sequence;
pub mod stock_transfer;
pub mod vehicle_class;

pub use vehicle_class::VehicleClass;
