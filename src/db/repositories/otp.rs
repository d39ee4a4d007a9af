use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::entities::{otps, prelude::*};

pub struct OtpRepository {
    conn: DatabaseConnection,
}

impl OtpRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Deletes every outstanding code for `email` and stores a new one.
    pub async fn replace_for_email(
        &self,
        email: &str,
        code: &str,
        expires_at: &str,
    ) -> Result<otps::Model> {
        let txn = self.conn.begin().await?;

        Otps::delete_many()
            .filter(otps::Column::Email.eq(email))
            .exec(&txn)
            .await
            .context("Failed to delete previous OTP records")?;

        let record = otps::ActiveModel {
            email: Set(email.to_string()),
            code: Set(code.to_string()),
            attempts: Set(0),
            verified: Set(false),
            expires_at: Set(expires_at.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert OTP record")?;

        txn.commit().await?;
        Ok(record)
    }

    pub async fn latest_for_email(&self, email: &str) -> Result<Option<otps::Model>> {
        Otps::find()
            .filter(otps::Column::Email.eq(email))
            .order_by_desc(otps::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query OTP record")
    }

    pub async fn list_for_email(&self, email: &str) -> Result<Vec<otps::Model>> {
        Otps::find()
            .filter(otps::Column::Email.eq(email))
            .all(&self.conn)
            .await
            .context("Failed to list OTP records")
    }

    pub async fn increment_attempts(&self, id: i32) -> Result<()> {
        Otps::update_many()
            .col_expr(otps::Column::Attempts, Expr::col(otps::Column::Attempts).add(1))
            .filter(otps::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to record OTP attempt")?;
        Ok(())
    }

    pub async fn mark_verified(&self, id: i32) -> Result<()> {
        Otps::update_many()
            .col_expr(otps::Column::Verified, Expr::value(true))
            .filter(otps::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to mark OTP as verified")?;
        Ok(())
    }

    pub async fn delete_for_email(&self, email: &str) -> Result<u64> {
        let result = Otps::delete_many()
            .filter(otps::Column::Email.eq(email))
            .exec(&self.conn)
            .await
            .context("Failed to delete OTP records")?;
        Ok(result.rows_affected)
    }
}
