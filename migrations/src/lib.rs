pub use sea_orm_migration::prelude::*;

mod m20240501_000001_create_partner_and_transfer_tables;
mod m20240501_000002_create_district_day_rules_table;
mod m20240501_000003_create_delivery_plannings_table;
mod m20240501_000004_create_delivery_documents_table;
mod m20240501_000005_create_delivery_routes_table;
mod m20240501_000006_create_sequences_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240501_000001_create_partner_and_transfer_tables::Migration),
            Box::new(m20240501_000002_create_district_day_rules_table::Migration),
            Box::new(m20240501_000003_create_delivery_plannings_table::Migration),
            Box::new(m20240501_000004_create_delivery_documents_table::Migration),
            Box::new(m20240501_000005_create_delivery_routes_table::Migration),
            Box::new(m20240501_000006_create_sequences_table::Migration),
        ]
    }
}
