use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    domain::{
        repositories::users::UserRepository,
        value_objects::{collections::USERS_COLLECTION, provisioning::UserCustomerLink},
    },
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::documents},
};

pub struct UserPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserRepository for UserPostgres {
    async fn link_customer(&self, user_id: &str, link: UserCustomerLink) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let body = serde_json::to_value(link)?;

        documents::merge_document(&mut conn, USERS_COLLECTION, user_id, body)?;

        Ok(())
    }
}
