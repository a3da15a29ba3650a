//! # Report Queries
//!
//! Aggregates behind the dashboard. Rendering (charts, PDF, CSV) happens
//! elsewhere; these only return rows.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use gestion_core::{MonthlyTotal, ProductSales};

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Sum of sale totals per calendar month (`YYYY-MM`), oldest first.
    pub async fn sales_by_month(&self) -> DbResult<Vec<MonthlyTotal>> {
        let rows = sqlx::query_as::<_, MonthlyTotal>(
            r#"
            SELECT substr(created_at, 1, 7) AS month,
                   SUM(total_cents)         AS total_cents
            FROM sales
            GROUP BY month
            ORDER BY month
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(months = rows.len(), "Computed sales by month");
        Ok(rows)
    }

    /// The `limit` products with the most units on sale lines.
    pub async fn top_products(&self, limit: u32) -> DbResult<Vec<ProductSales>> {
        let rows = sqlx::query_as::<_, ProductSales>(
            r#"
            SELECT p.id            AS product_id,
                   p.name          AS product_name,
                   SUM(l.quantity) AS quantity
            FROM sale_lines l
            JOIN products p ON p.id = l.product_id
            GROUP BY p.id, p.name
            ORDER BY quantity DESC, p.id
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::service::test_support::Fixture;
    use chrono::{Duration, Utc};
    use gestion_core::{OrderFilter, OrderKind};

    #[tokio::test]
    async fn test_sales_by_month_sums_current_month() {
        let fx = Fixture::new().await;
        let coffee = fx.product("CAF-500", 1000, 50).await;

        let first = fx.service.create_sale(&fx.admin, fx.client_id).await.unwrap();
        fx.service.add_sale_line(&fx.admin, first.id, coffee.id, 2).await.unwrap();
        let second = fx.service.create_sale(&fx.admin, fx.client_id).await.unwrap();
        fx.service.add_sale_line(&fx.admin, second.id, coffee.id, 3).await.unwrap();

        let months = fx.db.reports().sales_by_month().await.unwrap();
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].month, Utc::now().format("%Y-%m").to_string());
        assert_eq!(months[0].total_cents, 5000);
    }

    #[tokio::test]
    async fn test_top_products_orders_by_quantity() {
        let fx = Fixture::new().await;
        let coffee = fx.product("CAF-500", 1000, 50).await;
        let tea = fx.product("TE-100", 500, 50).await;
        let sugar = fx.product("AZU-1", 300, 50).await;

        let sale = fx.service.create_sale(&fx.admin, fx.client_id).await.unwrap();
        fx.service.add_sale_line(&fx.admin, sale.id, coffee.id, 2).await.unwrap();
        fx.service.add_sale_line(&fx.admin, sale.id, tea.id, 7).await.unwrap();
        fx.service.add_sale_line(&fx.admin, sale.id, sugar.id, 1).await.unwrap();

        let top = fx.db.reports().top_products(2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_id, tea.id);
        assert_eq!(top[0].quantity, 7);
        assert_eq!(top[1].product_id, coffee.id);
        assert_eq!(top[1].product_name, "Producto CAF-500");
    }

    #[tokio::test]
    async fn test_order_listing_filters() {
        let fx = Fixture::new().await;
        let other = fx
            .db
            .clients()
            .insert(&crate::repository::test_support::new_client("Jorge Vargas"))
            .await
            .unwrap();

        let marta = fx.service.create_sale(&fx.admin, fx.client_id).await.unwrap();
        let jorge = fx.service.create_sale(&fx.admin, other.id).await.unwrap();

        let all = fx
            .db
            .orders()
            .list(OrderKind::Sale, &OrderFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        // Newest first.
        assert_eq!(all[0].id, jorge.id);

        let by_name = OrderFilter {
            counterparty_contains: Some("  MARTA ".to_string()),
            ..OrderFilter::default()
        };
        let found = fx.db.orders().list(OrderKind::Sale, &by_name).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, marta.id);

        let today = Utc::now().date_naive();
        let today_only = OrderFilter {
            from: Some(today),
            to: Some(today),
            ..OrderFilter::default()
        };
        assert_eq!(
            fx.db.orders().list(OrderKind::Sale, &today_only).await.unwrap().len(),
            2
        );

        let tomorrow = today + Duration::days(1);
        let future = OrderFilter {
            from: Some(tomorrow),
            ..OrderFilter::default()
        };
        assert!(fx.db.orders().list(OrderKind::Sale, &future).await.unwrap().is_empty());
    }
}
