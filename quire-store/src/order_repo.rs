use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use quire_order::models::{Order, OrderStatus, RefundStatus, RefundTransaction};
use quire_order::repository::OrderStore;

/// Postgres-backed `OrderStore`. The `*_if_pending` transitions are plain
/// conditional updates (`WHERE status = 'PENDING_COMMIT'`); the row count
/// tells the caller whether it won the transition.
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    buyer_id: String,
    buyer_email: String,
    seller_id: String,
    seller_email: String,
    item_id: Uuid,
    item_title: String,
    total_cents: i32,
    delivery_fee_cents: i32,
    currency: String,
    delivery_carrier: String,
    delivery_service: String,
    payment_reference: Option<String>,
    subaccount_code: String,
    platform_fee_cents: i32,
    seller_amount_cents: i32,
    status: String,
    commit_deadline: DateTime<Utc>,
    decline_reason: Option<String>,
    declined_at: Option<DateTime<Utc>>,
    refund_status: Option<String>,
    refund_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct RefundRow {
    id: Uuid,
    order_id: Uuid,
    payment_reference: Option<String>,
    refund_reference: Option<String>,
    amount_cents: i32,
    reason: String,
    status: String,
    gateway_response: serde_json::Value,
    created_at: DateTime<Utc>,
}

fn order_status_from_str(s: &str) -> Result<OrderStatus, Box<dyn std::error::Error + Send + Sync>> {
    match s {
        "PENDING_COMMIT" => Ok(OrderStatus::PendingCommit),
        "COMMITTED" => Ok(OrderStatus::Committed),
        "DECLINED" => Ok(OrderStatus::Declined),
        "REFUNDED" => Ok(OrderStatus::Refunded),
        other => Err(format!("unknown order status: {other}").into()),
    }
}

fn refund_status_from_str(
    s: &str,
) -> Result<RefundStatus, Box<dyn std::error::Error + Send + Sync>> {
    match s {
        "PENDING" => Ok(RefundStatus::Pending),
        "PROCESSED" => Ok(RefundStatus::Processed),
        "FAILED" => Ok(RefundStatus::Failed),
        other => Err(format!("unknown refund status: {other}").into()),
    }
}

impl OrderRow {
    fn into_order(self) -> Result<Order, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Order {
            id: self.id,
            buyer_id: self.buyer_id,
            buyer_email: self.buyer_email,
            seller_id: self.seller_id,
            seller_email: self.seller_email,
            item_id: self.item_id,
            item_title: self.item_title,
            total_cents: self.total_cents,
            delivery_fee_cents: self.delivery_fee_cents,
            currency: self.currency,
            delivery_carrier: self.delivery_carrier,
            delivery_service: self.delivery_service,
            payment_reference: self.payment_reference,
            subaccount_code: self.subaccount_code,
            platform_fee_cents: self.platform_fee_cents,
            seller_amount_cents: self.seller_amount_cents,
            status: order_status_from_str(&self.status)?,
            commit_deadline: self.commit_deadline,
            decline_reason: self.decline_reason,
            declined_at: self.declined_at,
            refund_status: self
                .refund_status
                .as_deref()
                .map(refund_status_from_str)
                .transpose()?,
            refund_reference: self.refund_reference,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl RefundRow {
    fn into_transaction(
        self,
    ) -> Result<RefundTransaction, Box<dyn std::error::Error + Send + Sync>> {
        Ok(RefundTransaction {
            id: self.id,
            order_id: self.order_id,
            payment_reference: self.payment_reference,
            refund_reference: self.refund_reference,
            amount_cents: self.amount_cents,
            reason: self.reason,
            status: refund_status_from_str(&self.status)?,
            gateway_response: self.gateway_response,
            created_at: self.created_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, buyer_id, buyer_email, seller_id, seller_email, item_id, \
    item_title, total_cents, delivery_fee_cents, currency, delivery_carrier, delivery_service, \
    payment_reference, subaccount_code, platform_fee_cents, seller_amount_cents, status, \
    commit_deadline, decline_reason, declined_at, refund_status, refund_reference, created_at, \
    updated_at";

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create_order(
        &self,
        order: &Order,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, buyer_id, buyer_email, seller_id, seller_email, item_id,
                item_title, total_cents, delivery_fee_cents, currency, delivery_carrier,
                delivery_service, payment_reference, subaccount_code, platform_fee_cents,
                seller_amount_cents, status, commit_deadline, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20)
            "#,
        )
        .bind(order.id)
        .bind(&order.buyer_id)
        .bind(&order.buyer_email)
        .bind(&order.seller_id)
        .bind(&order.seller_email)
        .bind(order.item_id)
        .bind(&order.item_title)
        .bind(order.total_cents)
        .bind(order.delivery_fee_cents)
        .bind(&order.currency)
        .bind(&order.delivery_carrier)
        .bind(&order.delivery_service)
        .bind(&order.payment_reference)
        .bind(&order.subaccount_code)
        .bind(order.platform_fee_cents)
        .bind(order.seller_amount_cents)
        .bind(order.status.as_str())
        .bind(order.commit_deadline)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(order.id)
    }

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(OrderRow::into_order).transpose()
    }

    async fn list_orders_for_buyer(
        &self,
        buyer_id: &str,
    ) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(buyer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }

    async fn decline_if_pending(
        &self,
        id: Uuid,
        reason: &str,
        declined_at: DateTime<Utc>,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'DECLINED', decline_reason = $2, declined_at = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING_COMMIT'
            "#,
        )
        .bind(id)
        .bind(reason)
        .bind(declined_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Distinguish "lost the race" from "no such order".
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            Some(_) => Ok(false),
            None => Err(format!("order not found: {id}").into()),
        }
    }

    async fn mark_committed_if_pending(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'COMMITTED', updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING_COMMIT'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            Some(_) => Ok(false),
            None => Err(format!("order not found: {id}").into()),
        }
    }

    async fn record_refund_outcome(
        &self,
        id: Uuid,
        status: RefundStatus,
        refund_reference: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            UPDATE orders
            SET refund_status = $2,
                refund_reference = $3,
                status = CASE
                    WHEN $2 = 'PROCESSED' AND status = 'DECLINED' THEN 'REFUNDED'
                    ELSE status
                END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(refund_reference)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_refund_transaction(
        &self,
        transaction: &RefundTransaction,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // The UNIQUE constraint on order_id is the double-refund backstop;
        // a violation here propagates as an error.
        sqlx::query(
            r#"
            INSERT INTO refund_transactions (id, order_id, payment_reference, refund_reference,
                amount_cents, reason, status, gateway_response, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.order_id)
        .bind(&transaction.payment_reference)
        .bind(&transaction.refund_reference)
        .bind(transaction.amount_cents)
        .bind(&transaction.reason)
        .bind(transaction.status.as_str())
        .bind(&transaction.gateway_response)
        .bind(transaction.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn refund_transaction_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Option<RefundTransaction>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<RefundRow> = sqlx::query_as(
            "SELECT id, order_id, payment_reference, refund_reference, amount_cents, reason, \
             status, gateway_response, created_at FROM refund_transactions WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(RefundRow::into_transaction).transpose()
    }

    async fn list_pending_past_deadline(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE status = 'PENDING_COMMIT' AND commit_deadline < $1 \
             ORDER BY commit_deadline ASC LIMIT $2"
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }
}
