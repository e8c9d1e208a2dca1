use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, EntityTrait};
use tracing::{debug, error};

use crate::entities::sequence::{self, ActiveModel as SequenceActiveModel, Entity as SequenceEntity};
use crate::errors::ServiceError;

const DEFAULT_PADDING: i32 = 5;

/// Document families that get human-readable names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceCode {
    DeliveryDocument,
    DeliveryPlanning,
    DeliveryRoute,
}

impl SequenceCode {
    pub fn code(&self) -> &'static str {
        match self {
            SequenceCode::DeliveryDocument => "delivery.document",
            SequenceCode::DeliveryPlanning => "delivery.planning",
            SequenceCode::DeliveryRoute => "delivery.route",
        }
    }

    pub fn default_prefix(&self) -> &'static str {
        match self {
            SequenceCode::DeliveryDocument => "DLV/",
            SequenceCode::DeliveryPlanning => "PLN/",
            SequenceCode::DeliveryRoute => "RT/",
        }
    }
}

/// Takes the next number of `code` and formats it, creating the sequence on first use.
///
/// Runs on whatever connection it is given so the increment commits or rolls back
/// with the record being named.
pub async fn next_name<C: ConnectionTrait>(
    conn: &C,
    code: SequenceCode,
) -> Result<String, ServiceError> {
    let existing = SequenceEntity::find_by_id(code.code().to_string())
        .one(conn)
        .await
        .map_err(|e| {
            error!("Failed to read sequence {}: {}", code.code(), e);
            ServiceError::DatabaseError(e)
        })?;

    let (model, number) = match existing {
        Some(model) => {
            let number = model.next_number;
            let mut active: SequenceActiveModel = model.clone().into();
            active.next_number = Set(number + 1);
            active.updated_at = Set(Utc::now());
            active.update(conn).await?;
            (model, number)
        }
        None => {
            let model = sequence::Model {
                code: code.code().to_string(),
                prefix: code.default_prefix().to_string(),
                padding: DEFAULT_PADDING,
                next_number: 2,
                updated_at: Utc::now(),
            };
            let active: SequenceActiveModel = model.clone().into();
            SequenceEntity::insert(active).exec(conn).await?;
            (model, 1)
        }
    };

    let name = model.format(number);
    debug!(code = code.code(), %name, "Sequence advanced");
    Ok(name)
}

/// True when a caller-supplied name should be replaced by the sequence.
pub fn needs_generated_name(name: Option<&str>) -> bool {
    name.map(str::trim)
        .map_or(true, |name| name.is_empty() || name == "/")
}
