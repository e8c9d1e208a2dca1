use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fleet segment a delivery is loaded onto. The daily cap is counted per class.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum VehicleClass {
    #[sea_orm(string_value = "anadolu")]
    #[serde(rename = "anadolu")]
    Anadolu,
    #[sea_orm(string_value = "avrupa")]
    #[serde(rename = "avrupa")]
    Avrupa,
    #[sea_orm(string_value = "kucuk_arac_1")]
    #[serde(rename = "kucuk_arac_1")]
    KucukArac1,
    #[sea_orm(string_value = "kucuk_arac_2")]
    #[serde(rename = "kucuk_arac_2")]
    KucukArac2,
    #[sea_orm(string_value = "ek_arac")]
    #[serde(rename = "ek_arac")]
    EkArac,
}

impl VehicleClass {
    pub fn code(&self) -> &'static str {
        match self {
            VehicleClass::Anadolu => "anadolu",
            VehicleClass::Avrupa => "avrupa",
            VehicleClass::KucukArac1 => "kucuk_arac_1",
            VehicleClass::KucukArac2 => "kucuk_arac_2",
            VehicleClass::EkArac => "ek_arac",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VehicleClass::Anadolu => "Anadolu Yakası",
            VehicleClass::Avrupa => "Avrupa Yakası",
            VehicleClass::KucukArac1 => "Küçük Araç 1",
            VehicleClass::KucukArac2 => "Küçük Araç 2",
            VehicleClass::EkArac => "Ek Araç",
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for VehicleClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anadolu" => Ok(VehicleClass::Anadolu),
            "avrupa" => Ok(VehicleClass::Avrupa),
            "kucuk_arac_1" => Ok(VehicleClass::KucukArac1),
            "kucuk_arac_2" => Ok(VehicleClass::KucukArac2),
            "ek_arac" => Ok(VehicleClass::EkArac),
            other => Err(format!("unknown vehicle class: {}", other)),
        }
    }
}
