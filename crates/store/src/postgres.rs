use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CategoryId, Money, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EligibilityLink, Notification, NotificationId, PasswordResetCode, Quote, QuoteId,
    QuoteStatus, Result, Rfp, RfpFilter, RfpId, StoreError, rfp::RfpStatus,
    store::SourcingStore,
};

const RFP_COLUMNS: &str = "id, title, description, quantity, deadline, budget_min_cents, \
     budget_max_cents, status, is_active, category_id, created_by, created_at, updated_at";

const QUOTE_COLUMNS: &str = "id, rfp_id, vendor_id, unit_price_cents, description, quantity, \
     total_cost_cents, status, submitted_at";

const NOTIFICATION_COLUMNS: &str = "id, channel, recipient, subject, body, status, retry_count, \
     max_retries, last_error, sent_at, created_at, updated_at";

/// PostgreSQL-backed sourcing store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL sourcing store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_rfp(row: &PgRow) -> Result<Rfp> {
        Ok(Rfp {
            id: RfpId::from_uuid(row.try_get::<Uuid, _>("id")?),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            deadline: row.try_get("deadline")?,
            budget_min: Money::from_cents(row.try_get::<i64, _>("budget_min_cents")?),
            budget_max: Money::from_cents(row.try_get::<i64, _>("budget_max_cents")?),
            status: parse_text_column("status", row.try_get("status")?)?,
            is_active: row.try_get("is_active")?,
            category_id: CategoryId::from_uuid(row.try_get::<Uuid, _>("category_id")?),
            created_by: UserId::from_uuid(row.try_get::<Uuid, _>("created_by")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_quote(row: &PgRow) -> Result<Quote> {
        Ok(Quote {
            id: QuoteId::from_uuid(row.try_get::<Uuid, _>("id")?),
            rfp_id: RfpId::from_uuid(row.try_get::<Uuid, _>("rfp_id")?),
            vendor_id: UserId::from_uuid(row.try_get::<Uuid, _>("vendor_id")?),
            unit_price: Money::from_cents(row.try_get::<i64, _>("unit_price_cents")?),
            description: row.try_get("description")?,
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            total_cost: Money::from_cents(row.try_get::<i64, _>("total_cost_cents")?),
            status: parse_text_column("status", row.try_get("status")?)?,
            submitted_at: row.try_get("submitted_at")?,
        })
    }

    fn row_to_notification(row: &PgRow) -> Result<Notification> {
        Ok(Notification {
            id: NotificationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            channel: parse_text_column("channel", row.try_get("channel")?)?,
            recipient: row.try_get("recipient")?,
            subject: row.try_get("subject")?,
            body: row.try_get("body")?,
            status: parse_text_column("status", row.try_get("status")?)?,
            retry_count: row.try_get::<i32, _>("retry_count")? as u32,
            max_retries: row.try_get::<i32, _>("max_retries")? as u32,
            last_error: row.try_get("last_error")?,
            sent_at: row.try_get("sent_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_reset_code(row: &PgRow) -> Result<PasswordResetCode> {
        Ok(PasswordResetCode {
            email: row.try_get("email")?,
            code: row.try_get("code")?,
            attempts: row.try_get::<i32, _>("attempts")? as u32,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn parse_text_column<T: std::str::FromStr>(column: &'static str, value: String) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| StoreError::InvalidColumn { column, value })
}

async fn insert_notification_row<'e, E>(executor: E, n: &Notification) -> Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO notifications (id, channel, recipient, subject, body, status, retry_count, max_retries, last_error, sent_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(n.id.as_uuid())
    .bind(n.channel.as_str())
    .bind(&n.recipient)
    .bind(&n.subject)
    .bind(&n.body)
    .bind(n.status.as_str())
    .bind(n.retry_count as i32)
    .bind(n.max_retries as i32)
    .bind(&n.last_error)
    .bind(n.sent_at)
    .bind(n.created_at)
    .bind(n.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl SourcingStore for PostgresStore {
    async fn create_rfp(
        &self,
        rfp: &Rfp,
        invited: &[UserId],
        outbox: &[Notification],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO rfps (id, title, description, quantity, deadline, budget_min_cents, budget_max_cents, status, is_active, category_id, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(rfp.id.as_uuid())
        .bind(&rfp.title)
        .bind(&rfp.description)
        .bind(rfp.quantity as i32)
        .bind(rfp.deadline)
        .bind(rfp.budget_min.cents())
        .bind(rfp.budget_max.cents())
        .bind(rfp.status.as_str())
        .bind(rfp.is_active)
        .bind(rfp.category_id.as_uuid())
        .bind(rfp.created_by.as_uuid())
        .bind(rfp.created_at)
        .bind(rfp.updated_at)
        .execute(&mut *tx)
        .await?;

        for vendor_id in invited {
            sqlx::query(
                "INSERT INTO rfp_vendors (rfp_id, vendor_id, invited_at) VALUES ($1, $2, $3)",
            )
            .bind(rfp.id.as_uuid())
            .bind(vendor_id.as_uuid())
            .bind(rfp.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for notification in outbox {
            insert_notification_row(&mut *tx, notification).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_rfp(&self, id: RfpId) -> Result<Option<Rfp>> {
        let row = sqlx::query(&format!("SELECT {RFP_COLUMNS} FROM rfps WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_rfp).transpose()
    }

    async fn rfps_for_admin(&self, admin: UserId, filter: &RfpFilter) -> Result<Vec<Rfp>> {
        let mut sql = format!("SELECT {RFP_COLUMNS} FROM rfps WHERE created_by = $1");
        let mut param_count = 1;

        // Build dynamic query
        if filter.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if filter.category.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND category_id = ${param_count}"));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = sqlx::query(&sql).bind(admin.as_uuid());
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(category) = filter.category {
            query = query.bind(category.as_uuid());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_rfp).collect()
    }

    async fn set_rfp_status(
        &self,
        id: RfpId,
        admin: UserId,
        status: RfpStatus,
        is_active: bool,
    ) -> Result<Option<Rfp>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE rfps SET status = $3, is_active = $4, updated_at = now()
            WHERE id = $1 AND created_by = $2
            RETURNING {RFP_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(admin.as_uuid())
        .bind(status.as_str())
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_rfp).transpose()
    }

    async fn delete_rfp(&self, id: RfpId, admin: UserId) -> Result<bool> {
        // Links and quotes go with the RFP via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM rfps WHERE id = $1 AND created_by = $2")
            .bind(id.as_uuid())
            .bind(admin.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn links_for_rfp(&self, rfp_id: RfpId) -> Result<Vec<EligibilityLink>> {
        let rows = sqlx::query(
            "SELECT rfp_id, vendor_id, invited_at FROM rfp_vendors WHERE rfp_id = $1 ORDER BY invited_at ASC",
        )
        .bind(rfp_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(EligibilityLink {
                    rfp_id: RfpId::from_uuid(row.try_get::<Uuid, _>("rfp_id")?),
                    vendor_id: UserId::from_uuid(row.try_get::<Uuid, _>("vendor_id")?),
                    invited_at: row.try_get("invited_at")?,
                })
            })
            .collect()
    }

    async fn is_invited(&self, rfp_id: RfpId, vendor: UserId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM rfp_vendors WHERE rfp_id = $1 AND vendor_id = $2)",
        )
        .bind(rfp_id.as_uuid())
        .bind(vendor.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn open_rfps_for_vendor(&self, vendor: UserId, now: DateTime<Utc>) -> Result<Vec<Rfp>> {
        // One statement: link membership, openness, and the not-yet-quoted
        // check are evaluated against the same snapshot.
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.title, r.description, r.quantity, r.deadline, r.budget_min_cents,
                   r.budget_max_cents, r.status, r.is_active, r.category_id, r.created_by,
                   r.created_at, r.updated_at
            FROM rfps r
            JOIN rfp_vendors v ON v.rfp_id = r.id
            WHERE v.vendor_id = $1
              AND r.status = 'open'
              AND r.is_active = TRUE
              AND r.deadline > $2
              AND NOT EXISTS (
                  SELECT 1 FROM quotes q WHERE q.rfp_id = r.id AND q.vendor_id = $1
              )
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(vendor.as_uuid())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_rfp).collect()
    }

    async fn invited_rfps_with_quotes(
        &self,
        vendor: UserId,
    ) -> Result<Vec<(Rfp, Option<Quote>)>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.title, r.description, r.quantity, r.deadline, r.budget_min_cents,
                   r.budget_max_cents, r.status, r.is_active, r.category_id, r.created_by,
                   r.created_at, r.updated_at,
                   q.id AS quote_id, q.unit_price_cents, q.description AS quote_description,
                   q.quantity AS quote_quantity, q.total_cost_cents,
                   q.status AS quote_status, q.submitted_at
            FROM rfps r
            JOIN rfp_vendors v ON v.rfp_id = r.id
            LEFT JOIN quotes q ON q.rfp_id = r.id AND q.vendor_id = $1
            WHERE v.vendor_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(vendor.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let rfp = Self::row_to_rfp(row)?;
                let quote_id: Option<Uuid> = row.try_get("quote_id")?;
                let quote = match quote_id {
                    Some(id) => Some(Quote {
                        id: QuoteId::from_uuid(id),
                        rfp_id: rfp.id,
                        vendor_id: vendor,
                        unit_price: Money::from_cents(
                            row.try_get::<i64, _>("unit_price_cents")?,
                        ),
                        description: row.try_get("quote_description")?,
                        quantity: row.try_get::<i32, _>("quote_quantity")? as u32,
                        total_cost: Money::from_cents(
                            row.try_get::<i64, _>("total_cost_cents")?,
                        ),
                        status: parse_text_column::<QuoteStatus>(
                            "quote_status",
                            row.try_get("quote_status")?,
                        )?,
                        submitted_at: row.try_get("submitted_at")?,
                    }),
                    None => None,
                };
                Ok((rfp, quote))
            })
            .collect()
    }

    async fn insert_quote(&self, quote: &Quote) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO quotes (id, rfp_id, vendor_id, unit_price_cents, description, quantity, total_cost_cents, status, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(quote.id.as_uuid())
        .bind(quote.rfp_id.as_uuid())
        .bind(quote.vendor_id.as_uuid())
        .bind(quote.unit_price.cents())
        .bind(&quote.description)
        .bind(quote.quantity as i32)
        .bind(quote.total_cost.cents())
        .bind(quote.status.as_str())
        .bind(quote.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // Check if this is the unique (rfp_id, vendor_id) violation
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_rfp_vendor_quote")
            {
                return StoreError::DuplicateQuote {
                    rfp_id: quote.rfp_id,
                    vendor_id: quote.vendor_id,
                };
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn quote_for_vendor(&self, rfp_id: RfpId, vendor: UserId) -> Result<Option<Quote>> {
        let row = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes WHERE rfp_id = $1 AND vendor_id = $2"
        ))
        .bind(rfp_id.as_uuid())
        .bind(vendor.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_quote).transpose()
    }

    async fn quotes_for_rfp(&self, rfp_id: RfpId) -> Result<Vec<Quote>> {
        let rows = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes WHERE rfp_id = $1 ORDER BY submitted_at ASC"
        ))
        .bind(rfp_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_quote).collect()
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        insert_notification_row(&self.pool, notification).await
    }

    async fn get_notification(&self, id: NotificationId) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_notification).transpose()
    }

    async fn update_notification(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE notifications
            SET status = $2, retry_count = $3, last_error = $4, sent_at = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.status.as_str())
        .bind(notification.retry_count as i32)
        .bind(&notification.last_error)
        .bind(notification.sent_at)
        .bind(notification.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn deliverable_notifications(&self) -> Result<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE status IN ('pending', 'retry') ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_notification).collect()
    }

    async fn replace_reset_code(&self, code: &PasswordResetCode) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_codes (email, code, attempts, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET code = EXCLUDED.code, attempts = EXCLUDED.attempts,
                expires_at = EXCLUDED.expires_at, created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&code.email)
        .bind(&code.code)
        .bind(code.attempts as i32)
        .bind(code.expires_at)
        .bind(code.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn reset_code_for_email(&self, email: &str) -> Result<Option<PasswordResetCode>> {
        let row = sqlx::query(
            "SELECT email, code, attempts, expires_at, created_at FROM password_reset_codes WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_reset_code).transpose()
    }

    async fn update_reset_attempts(&self, email: &str, attempts: u32) -> Result<()> {
        sqlx::query("UPDATE password_reset_codes SET attempts = $2 WHERE email = $1")
            .bind(email)
            .bind(attempts as i32)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_reset_code(&self, email: &str) -> Result<()> {
        sqlx::query("DELETE FROM password_reset_codes WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
