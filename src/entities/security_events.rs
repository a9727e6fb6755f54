use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Append-only audit record. Never updated or deleted by normal operation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "security_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Null when the event could not be tied to an account
    /// (e.g. a failed login against an unknown identifier).
    pub account_id: Option<i32>,

    pub event_type: String,

    pub success: bool,

    pub client_info: Option<String>,

    pub detail: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
