use async_trait::async_trait;
use common::{Money, NewOrder, Order, OrderId, OrderState, TimeWindow, UserId, Venue, VenueId};
use sqlx::{
    PgConnection, PgPool, Postgres, QueryBuilder, Row,
    postgres::{PgPoolOptions, PgRow},
};

use crate::{
    OrderQuery, Result, StoreError,
    store::{BookingOutcome, OrderStore, UserDirectory, VenueDirectory},
};

const ORDER_COLUMNS: &str =
    "order_id, user_id, venue_id, state, order_time, start_time, hours, total_cents";

const VENUE_COLUMNS: &str = "venue_id, venue_name, description, price_cents, picture, address, open_time, close_time";

/// PostgreSQL-backed store for orders, venues and users.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` with a small pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn hours_column(hours: u32) -> Result<i32> {
        i32::try_from(hours).map_err(|_| StoreError::HoursOutOfRange { hours })
    }

    /// Takes the venue's booking lock for the rest of the transaction, then
    /// checks for an occupying order overlapping `window`.
    async fn lock_and_scan(
        conn: &mut PgConnection,
        venue_id: VenueId,
        window: TimeWindow,
        exclude: Option<OrderId>,
    ) -> Result<bool> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(venue_id.as_i64())
            .execute(&mut *conn)
            .await?;

        let mut builder = QueryBuilder::new("SELECT EXISTS (SELECT 1 FROM orders");
        Self::push_filters(&mut builder, &OrderQuery::conflicting(venue_id, window, exclude));
        builder.push(")");

        let taken = builder
            .build_query_scalar::<bool>()
            .fetch_one(&mut *conn)
            .await?;
        Ok(taken)
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let order_id = OrderId::new(row.try_get("order_id")?);
        let state: i16 = row.try_get("state")?;
        let hours: i32 = row.try_get("hours")?;

        Ok(Order {
            order_id,
            user_id: UserId::new(row.try_get::<String, _>("user_id")?),
            venue_id: VenueId::new(row.try_get("venue_id")?),
            state: OrderState::try_from(state)
                .map_err(|e| StoreError::unknown_state(order_id, e))?,
            order_time: row.try_get("order_time")?,
            start_time: row.try_get("start_time")?,
            hours: u32::try_from(hours).map_err(|_| StoreError::CorruptRecord {
                order_id,
                reason: format!("negative duration: {hours}"),
            })?,
            total: Money::from_cents(row.try_get("total_cents")?),
        })
    }

    fn row_to_venue(row: PgRow) -> Result<Venue> {
        Ok(Venue {
            venue_id: VenueId::new(row.try_get("venue_id")?),
            venue_name: row.try_get("venue_name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            picture: row.try_get("picture")?,
            address: row.try_get("address")?,
            open_time: row.try_get("open_time")?,
            close_time: row.try_get("close_time")?,
        })
    }

    /// Appends the WHERE clause for `query`, without paging.
    fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &OrderQuery) {
        builder.push(" WHERE 1=1");

        if let Some(venue_id) = query.venue_id {
            builder.push(" AND venue_id = ").push_bind(venue_id.as_i64());
        }
        if let Some(ref user_id) = query.user_id {
            builder
                .push(" AND user_id = ")
                .push_bind(user_id.as_str().to_string());
        }
        if let Some(ref states) = query.states {
            let codes: Vec<i16> = states.iter().map(OrderState::code).collect();
            builder.push(" AND state = ANY(").push_bind(codes).push(")");
        }
        if let Some(window) = query.overlapping {
            // [start_time, start_time + hours) intersects [window.start, window.end)
            builder
                .push(" AND start_time < ")
                .push_bind(window.end())
                .push(" AND start_time + make_interval(hours => hours) > ")
                .push_bind(window.start());
        }
        if let Some(from) = query.starting_from {
            builder.push(" AND start_time >= ").push_bind(from);
        }
        if let Some(until) = query.starting_until {
            builder.push(" AND start_time <= ").push_bind(until);
        }
        if let Some(excluded) = query.exclude {
            builder.push(" AND order_id <> ").push_bind(excluded.as_i64());
        }
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"
        ))
        .bind(order_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn query_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut builder = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        Self::push_filters(&mut builder, &query);
        builder.push(" ORDER BY order_id ASC");

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            builder.push(" OFFSET ").push_bind(offset as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn count_orders(&self, query: OrderQuery) -> Result<usize> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM orders");
        Self::push_filters(&mut builder, &query);

        let count: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }

    async fn create(&self, order: NewOrder) -> Result<Order> {
        let hours = Self::hours_column(order.hours)?;
        let order_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (user_id, venue_id, state, order_time, start_time, hours, total_cents)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING order_id
            "#,
        )
        .bind(order.user_id.as_str())
        .bind(order.venue_id.as_i64())
        .bind(order.state.code())
        .bind(order.order_time)
        .bind(order.start_time)
        .bind(hours)
        .bind(order.total.cents())
        .fetch_one(&self.pool)
        .await?;

        Ok(order.with_id(OrderId::new(order_id)))
    }

    async fn create_if_free(&self, order: NewOrder) -> Result<BookingOutcome> {
        let window = order.window()?;
        let hours = Self::hours_column(order.hours)?;

        let mut tx = self.pool.begin().await?;
        if Self::lock_and_scan(&mut tx, order.venue_id, window, None).await? {
            return Ok(BookingOutcome::SlotTaken);
        }

        let order_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (user_id, venue_id, state, order_time, start_time, hours, total_cents)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING order_id
            "#,
        )
        .bind(order.user_id.as_str())
        .bind(order.venue_id.as_i64())
        .bind(order.state.code())
        .bind(order.order_time)
        .bind(order.start_time)
        .bind(hours)
        .bind(order.total.cents())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(BookingOutcome::Booked(order.with_id(OrderId::new(order_id))))
    }

    async fn update_if_free(&self, order: Order) -> Result<BookingOutcome> {
        let window = order.window()?;
        let hours = Self::hours_column(order.hours)?;

        let mut tx = self.pool.begin().await?;
        if Self::lock_and_scan(&mut tx, order.venue_id, window, Some(order.order_id)).await? {
            return Ok(BookingOutcome::SlotTaken);
        }

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                user_id = $2,
                venue_id = $3,
                state = $4,
                order_time = $5,
                start_time = $6,
                hours = $7,
                total_cents = $8
            WHERE order_id = $1
            "#,
        )
        .bind(order.order_id.as_i64())
        .bind(order.user_id.as_str())
        .bind(order.venue_id.as_i64())
        .bind(order.state.code())
        .bind(order.order_time)
        .bind(order.start_time)
        .bind(hours)
        .bind(order.total.cents())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(BookingOutcome::OrderMissing);
        }
        tx.commit().await?;

        Ok(BookingOutcome::Booked(order))
    }

    async fn save(&self, order: Order) -> Result<Order> {
        let hours = Self::hours_column(order.hours)?;
        sqlx::query(
            r#"
            INSERT INTO orders (order_id, user_id, venue_id, state, order_time, start_time, hours, total_cents)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (order_id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                venue_id = EXCLUDED.venue_id,
                state = EXCLUDED.state,
                order_time = EXCLUDED.order_time,
                start_time = EXCLUDED.start_time,
                hours = EXCLUDED.hours,
                total_cents = EXCLUDED.total_cents
            "#,
        )
        .bind(order.order_id.as_i64())
        .bind(order.user_id.as_str())
        .bind(order.venue_id.as_i64())
        .bind(order.state.code())
        .bind(order.order_time)
        .bind(order.start_time)
        .bind(hours)
        .bind(order.total.cents())
        .execute(&self.pool)
        .await?;

        Ok(order)
    }

    async fn update_state(&self, state: OrderState, order_id: OrderId) -> Result<()> {
        sqlx::query("UPDATE orders SET state = $1 WHERE order_id = $2")
            .bind(state.code())
            .bind(order_id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn transition_state(
        &self,
        order_id: OrderId,
        from: OrderState,
        to: OrderState,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE orders SET state = $1 WHERE order_id = $2 AND state = $3")
            .bind(to.code())
            .bind(order_id.as_i64())
            .bind(from.code())
            .execute(&self.pool)
            .await?;

        tracing::trace!(%order_id, %from, %to, rows = result.rows_affected(), "state compare-and-set");
        Ok(result.rows_affected() == 1)
    }

    async fn delete_by_id(&self, order_id: OrderId) -> Result<()> {
        sqlx::query("DELETE FROM orders WHERE order_id = $1")
            .bind(order_id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VenueDirectory for PostgresStore {
    async fn find_venue_by_name(&self, venue_name: &str) -> Result<Option<Venue>> {
        let row = sqlx::query(&format!(
            "SELECT {VENUE_COLUMNS} FROM venues WHERE venue_name = $1"
        ))
        .bind(venue_name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_venue).transpose()
    }

    async fn find_venue_by_id(&self, venue_id: VenueId) -> Result<Option<Venue>> {
        let row = sqlx::query(&format!(
            "SELECT {VENUE_COLUMNS} FROM venues WHERE venue_id = $1"
        ))
        .bind(venue_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_venue).transpose()
    }
}

#[async_trait]
impl UserDirectory for PostgresStore {
    async fn exists_by_id(&self, user_id: &UserId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE user_id = $1)")
                .bind(user_id.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}
