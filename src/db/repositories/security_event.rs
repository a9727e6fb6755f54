use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::{prelude::*, security_events};

/// Input for one audit record. The table is append-only; there is no
/// update or delete path in this repository.
#[derive(Debug, Clone)]
pub struct NewSecurityEvent {
    pub account_id: Option<i32>,
    pub event_type: String,
    pub success: bool,
    pub client_info: Option<String>,
    pub detail: Option<String>,
}

pub struct SecurityEventRepository {
    conn: DatabaseConnection,
}

impl SecurityEventRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn append(&self, event: NewSecurityEvent) -> Result<()> {
        security_events::ActiveModel {
            account_id: Set(event.account_id),
            event_type: Set(event.event_type),
            success: Set(event.success),
            client_info: Set(event.client_info),
            detail: Set(event.detail),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to append security event")?;

        Ok(())
    }

    /// Newest first, optionally narrowed to one account.
    pub async fn recent(
        &self,
        account_id: Option<i32>,
        limit: u64,
    ) -> Result<Vec<security_events::Model>> {
        let mut query = SecurityEvents::find()
            .order_by_desc(security_events::Column::Id)
            .limit(limit);

        if let Some(account_id) = account_id {
            query = query.filter(security_events::Column::AccountId.eq(account_id));
        }

        query
            .all(&self.conn)
            .await
            .context("Failed to query security events")
    }
}
