//! Postgres repository implementation using Diesel.
//!
//! This module implements the repository traits against a Postgres database
//! following the schema in `migrations/00000000000001_create_tables/up.sql`.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Connection health monitoring
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! [`PostgresConfig`] is built by `AppConfig::postgres_config` from the
//! `[database]` section and `DATABASE_URL`.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::upsert::excluded;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::task;

use crate::db::repository::*;
use crate::models::*;

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self { pool, config })
    }

    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;
        debug!("Applied {} pending migrations", applied.len());
        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// The closure is retried up to `max_retries` times with exponential
    /// backoff when it fails with a retryable error.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    debug!("Retrying database operation (attempt {})", attempt + 1);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        return Err(err);
                    }
                };

                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// `%value%` with LIKE wildcards in the input escaped.
fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn start_of_day(date: NaiveDate) -> chrono::DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn user_names(conn: &mut PgConnection, ids: &[i64]) -> RepositoryResult<HashMap<i64, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i64, String)> = users::table
        .filter(users::id.eq_any(ids))
        .select((users::id, users::name))
        .load(conn)
        .map_err(map_diesel_error)?;
    Ok(rows.into_iter().collect())
}

fn homestay_names(conn: &mut PgConnection, ids: &[i64]) -> RepositoryResult<HashMap<i64, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i64, String)> = homestays::table
        .filter(homestays::id.eq_any(ids))
        .select((homestays::id, homestays::name))
        .load(conn)
        .map_err(map_diesel_error)?;
    Ok(rows.into_iter().collect())
}

fn booking_codes(conn: &mut PgConnection, ids: &[i64]) -> RepositoryResult<HashMap<i64, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i64, String)> = bookings::table
        .filter(bookings::id.eq_any(ids))
        .select((bookings::id, bookings::booking_code))
        .load(conn)
        .map_err(map_diesel_error)?;
    Ok(rows.into_iter().collect())
}

fn attach_owners(
    conn: &mut PgConnection,
    rows: Vec<HomestayRow>,
) -> RepositoryResult<Vec<Homestay>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.owner_id).collect();
    let names = user_names(conn, &ids)?;
    rows.into_iter()
        .map(|row| {
            let owner = names.get(&row.owner_id).cloned();
            row.into_homestay(owner)
        })
        .collect()
}

fn attach_homestay_names(
    conn: &mut PgConnection,
    rows: Vec<RoomRow>,
) -> RepositoryResult<Vec<Room>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.homestay_id).collect();
    let names = homestay_names(conn, &ids)?;
    rows.into_iter()
        .map(|row| {
            let name = names.get(&row.homestay_id).cloned();
            row.into_room(name)
        })
        .collect()
}

fn attach_booking_codes(
    conn: &mut PgConnection,
    rows: Vec<PaymentRow>,
) -> RepositoryResult<Vec<Payment>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.booking_id).collect();
    let codes = booking_codes(conn, &ids)?;
    rows.into_iter()
        .map(|row| {
            let code = codes.get(&row.booking_id).cloned().unwrap_or_default();
            row.into_payment(code)
        })
        .collect()
}

fn attach_guest_names(
    conn: &mut PgConnection,
    rows: Vec<ReviewRow>,
) -> RepositoryResult<Vec<Review>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.user_id).collect();
    let names = user_names(conn, &ids)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let name = names.get(&row.user_id).cloned();
            row.into_review(name)
        })
        .collect())
}

fn attach_request_names(
    conn: &mut PgConnection,
    rows: Vec<BookingRequestRow>,
) -> RepositoryResult<Vec<BookingRequest>> {
    let user_ids: Vec<i64> = rows.iter().map(|r| r.user_id).collect();
    let room_ids: Vec<i64> = rows.iter().map(|r| r.room_id).collect();
    let user_lookup = user_names(conn, &user_ids)?;
    let room_rows: Vec<(i64, String, i64)> = if room_ids.is_empty() {
        Vec::new()
    } else {
        rooms::table
            .filter(rooms::id.eq_any(&room_ids))
            .select((rooms::id, rooms::name, rooms::homestay_id))
            .load(conn)
            .map_err(map_diesel_error)?
    };
    let homestay_ids: Vec<i64> = room_rows.iter().map(|(_, _, h)| *h).collect();
    let homestay_lookup = homestay_names(conn, &homestay_ids)?;
    let room_lookup: HashMap<i64, (String, i64)> = room_rows
        .into_iter()
        .map(|(id, name, homestay)| (id, (name, homestay)))
        .collect();

    rows.into_iter()
        .map(|row| {
            let mut request = BookingRequest::try_from(row)?;
            request.user_name = user_lookup.get(&request.user_id).cloned();
            if let Some((room_name, homestay_id)) = room_lookup.get(&request.room_id) {
                request.room_name = Some(room_name.clone());
                request.homestay_name = homestay_lookup.get(homestay_id).cloned();
            }
            Ok(request)
        })
        .collect()
}

fn filtered_homestays(filter: &HomestayFilter) -> homestays::BoxedQuery<'static, Pg> {
    let mut query = homestays::table.into_boxed();
    if let Some(owner) = filter.owner_id {
        query = query.filter(homestays::owner_id.eq(owner));
    }
    if let Some(name) = non_empty(&filter.name) {
        query = query.filter(homestays::name.ilike(like_pattern(name)));
    }
    if let Some(city) = non_empty(&filter.city) {
        query = query.filter(homestays::city.ilike(like_pattern(city)));
    }
    if let Some(district) = non_empty(&filter.district) {
        query = query.filter(homestays::district.ilike(like_pattern(district)));
    }
    if let Some(status) = filter.status {
        query = query.filter(homestays::status.eq(status.as_str()));
    }
    query
}

fn filtered_rooms(filter: &RoomFilter) -> rooms::BoxedQuery<'static, Pg> {
    let mut query = rooms::table.into_boxed();
    if let Some(homestay_id) = filter.homestay_id {
        query = query.filter(rooms::homestay_id.eq(homestay_id));
    }
    if let Some(owner) = filter.owner_id {
        query = query.filter(
            rooms::homestay_id.eq_any(
                homestays::table
                    .filter(homestays::owner_id.eq(owner))
                    .select(homestays::id),
            ),
        );
    }
    if let Some(status) = filter.status {
        query = query.filter(rooms::status.eq(status.as_str()));
    }
    if let Some(room_type) = filter.room_type {
        query = query.filter(rooms::room_type.eq(room_type.as_str()));
    }
    if let Some(min) = filter.min_price {
        query = query.filter(rooms::price.ge(min));
    }
    if let Some(max) = filter.max_price {
        query = query.filter(rooms::price.le(max));
    }
    query
}

fn filtered_bookings(filter: &BookingFilter) -> bookings::BoxedQuery<'static, Pg> {
    let mut query = bookings::table.into_boxed();
    if let Some(owner) = filter.owner_id {
        query = query.filter(
            bookings::homestay_id.eq_any(
                homestays::table
                    .filter(homestays::owner_id.eq(owner))
                    .select(homestays::id),
            ),
        );
    }
    if let Some(homestay_id) = filter.homestay_id {
        query = query.filter(bookings::homestay_id.eq(homestay_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(bookings::status.eq(status.as_str()));
    }
    if let Some(name) = non_empty(&filter.customer_name) {
        query = query.filter(bookings::name.ilike(like_pattern(name)));
    }
    if let Some(phone) = non_empty(&filter.customer_phone) {
        query = query.filter(bookings::phone.ilike(like_pattern(phone)));
    }
    if let Some(email) = non_empty(&filter.customer_email) {
        query = query.filter(bookings::email.eq(email.to_string()));
    }
    if let Some(from) = filter.date_from {
        query = query.filter(bookings::check_in.ge(from));
    }
    if let Some(to) = filter.date_to {
        query = query.filter(bookings::check_out.le(to));
    }
    query
}

fn filtered_payments(filter: &PaymentFilter) -> payments::BoxedQuery<'static, Pg> {
    let mut query = payments::table.into_boxed();
    if let Some(owner) = filter.owner_id {
        query = query.filter(
            payments::booking_id.eq_any(
                bookings::table
                    .filter(
                        bookings::homestay_id.eq_any(
                            homestays::table
                                .filter(homestays::owner_id.eq(owner))
                                .select(homestays::id),
                        ),
                    )
                    .select(bookings::id),
            ),
        );
    }
    if let Some(code) = non_empty(&filter.booking_code) {
        query = query.filter(
            payments::booking_id.eq_any(
                bookings::table
                    .filter(bookings::booking_code.ilike(like_pattern(code)))
                    .select(bookings::id),
            ),
        );
    }
    if let Some(method) = non_empty(&filter.method) {
        query = query.filter(payments::payment_method.eq(method.to_string()));
    }
    if let Some(from) = filter.date_from {
        query = query.filter(payments::payment_date.ge(start_of_day(from)));
    }
    if let Some(to) = filter.date_to {
        let end = start_of_day(to) + chrono::Duration::days(1);
        query = query.filter(payments::payment_date.lt(end));
    }
    query
}

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User> {
        let row = NewUserRow::from(user);
        self.with_conn(move |conn| {
            let inserted: UserRow = diesel::insert_into(users::table)
                .values(&row)
                .returning(UserRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_user"))?;
            User::try_from(inserted)
        })
        .await
    }

    async fn get_user(&self, user_id: i64) -> RepositoryResult<User> {
        self.with_conn(move |conn| {
            let row = users::table
                .find(user_id)
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::missing("get_user", "user", user_id))?;
            User::try_from(row)
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            users::table
                .filter(users::email.eq(&email))
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(User::try_from)
                .transpose()
        })
        .await
    }

    async fn update_user(&self, user_id: i64, changes: &UserChanges) -> RepositoryResult<User> {
        if changes.is_empty() {
            return self.get_user(user_id).await;
        }
        let changeset = UserChangeset::from(changes);
        self.with_conn(move |conn| {
            let row = diesel::update(users::table.find(user_id))
                .set(&changeset)
                .returning(UserRow::as_returning())
                .get_result::<UserRow>(conn)
                .optional()
                .map_err(|e| map_diesel_error(e).with_operation("update_user"))?
                .ok_or_else(|| RepositoryError::missing("update_user", "user", user_id))?;
            User::try_from(row)
        })
        .await
    }
}

#[async_trait]
impl HomestayRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn create_homestay(&self, homestay: &NewHomestay) -> RepositoryResult<Homestay> {
        let row = NewHomestayRow::from(homestay);
        self.with_conn(move |conn| {
            let inserted: HomestayRow = diesel::insert_into(homestays::table)
                .values(&row)
                .returning(HomestayRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_homestay"))?;
            let mut items = attach_owners(conn, vec![inserted])?;
            items
                .pop()
                .ok_or_else(|| RepositoryError::internal("insert returned no row"))
        })
        .await
    }

    async fn get_homestay(&self, homestay_id: i64) -> RepositoryResult<Homestay> {
        self.with_conn(move |conn| {
            let row = homestays::table
                .find(homestay_id)
                .select(HomestayRow::as_select())
                .first::<HomestayRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::missing("get_homestay", "homestay", homestay_id))?;
            let mut items = attach_owners(conn, vec![row])?;
            items
                .pop()
                .ok_or_else(|| RepositoryError::missing("get_homestay", "homestay", homestay_id))
        })
        .await
    }

    async fn update_homestay(
        &self,
        homestay_id: i64,
        changes: &HomestayChanges,
    ) -> RepositoryResult<Homestay> {
        if changes.is_empty() {
            return Err(RepositoryError::validation_with_context(
                "no fields to update",
                ErrorContext::new("update_homestay").with_entity_id(homestay_id),
            ));
        }
        let changeset = HomestayChangeset::from(changes);
        self.with_conn(move |conn| {
            let row = diesel::update(homestays::table.find(homestay_id))
                .set(&changeset)
                .returning(HomestayRow::as_returning())
                .get_result::<HomestayRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::missing("update_homestay", "homestay", homestay_id)
                })?;
            let mut items = attach_owners(conn, vec![row])?;
            items.pop().ok_or_else(|| {
                RepositoryError::missing("update_homestay", "homestay", homestay_id)
            })
        })
        .await
    }

    async fn delete_homestay(&self, homestay_id: i64) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(homestays::table.find(homestay_id))
                .execute(conn)
                .map_err(|e| map_diesel_error(e).with_operation("delete_homestay"))?;
            if deleted == 0 {
                return Err(RepositoryError::missing(
                    "delete_homestay",
                    "homestay",
                    homestay_id,
                ));
            }
            debug!("Deleted homestay {}", homestay_id);
            Ok(())
        })
        .await
    }

    async fn search_homestays(&self, filter: &HomestayFilter) -> RepositoryResult<Page<Homestay>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let total: i64 = filtered_homestays(&filter)
                .count()
                .get_result(conn)
                .map_err(map_diesel_error)?;
            let rows = filtered_homestays(&filter)
                .order((homestays::created_at.desc(), homestays::id.desc()))
                .limit(filter.page.limit())
                .offset(filter.page.offset())
                .select(HomestayRow::as_select())
                .load::<HomestayRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(Page::new(attach_owners(conn, rows)?, total))
        })
        .await
    }

    async fn search_available_homestays(
        &self,
        filter: &HomestayFilter,
        stay: &StayQuery,
    ) -> RepositoryResult<Page<Homestay>> {
        let filter = filter.clone();
        let stay = *stay;
        self.with_conn(move |conn| {
            let candidates = filtered_homestays(&filter)
                .filter(homestays::status.eq(HomestayStatus::Active.as_str()))
                .order((homestays::created_at.desc(), homestays::id.desc()))
                .select(HomestayRow::as_select())
                .load::<HomestayRow>(conn)
                .map_err(map_diesel_error)?;
            if candidates.is_empty() {
                return Ok(Page::empty());
            }
            let ids: Vec<i64> = candidates.iter().map(|h| h.id).collect();

            let taken: HashSet<i64> = match (stay.check_in, stay.check_out) {
                (Some(check_in), Some(check_out)) => booking_rooms::table
                    .inner_join(bookings::table)
                    .filter(bookings::status.eq(BookingStatus::Confirmed.as_str()))
                    .filter(bookings::check_in.lt(check_out))
                    .filter(bookings::check_out.gt(check_in))
                    .select(booking_rooms::room_id)
                    .load::<i64>(conn)
                    .map_err(map_diesel_error)?
                    .into_iter()
                    .collect(),
                _ => HashSet::new(),
            };

            let room_rows: Vec<(i64, i64, i32)> = rooms::table
                .filter(rooms::homestay_id.eq_any(&ids))
                .filter(rooms::status.eq(RoomStatus::Available.as_str()))
                .select((rooms::id, rooms::homestay_id, rooms::capacity))
                .load(conn)
                .map_err(map_diesel_error)?;

            let mut free_capacity: HashMap<i64, (usize, i64)> = HashMap::new();
            for (room_id, homestay_id, capacity) in room_rows {
                if !taken.contains(&room_id) {
                    let entry = free_capacity.entry(homestay_id).or_insert((0, 0));
                    entry.0 += 1;
                    entry.1 += i64::from(capacity);
                }
            }

            let matched: Vec<HomestayRow> = candidates
                .into_iter()
                .filter(|h| {
                    free_capacity
                        .get(&h.id)
                        .is_some_and(|(rooms, beds)| *rooms > 0 && *beds >= i64::from(stay.guests))
                })
                .collect();
            let total = matched.len() as i64;
            let page = filter.page.apply(&matched);
            Ok(Page::new(attach_owners(conn, page)?, total))
        })
        .await
    }

    async fn top_homestays(&self, limit: i64) -> RepositoryResult<Vec<Homestay>> {
        self.with_conn(move |conn| {
            let totals: HashMap<i64, i64> = reviews::table
                .group_by(reviews::homestay_id)
                .select((reviews::homestay_id, diesel::dsl::sum(reviews::rating)))
                .load::<(i64, Option<i64>)>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(|(id, total)| (id, total.unwrap_or(0)))
                .collect();

            let mut active = homestays::table
                .filter(homestays::status.eq(HomestayStatus::Active.as_str()))
                .select(HomestayRow::as_select())
                .load::<HomestayRow>(conn)
                .map_err(map_diesel_error)?;
            active.sort_by(|a, b| {
                let ta = totals.get(&a.id).copied().unwrap_or(0);
                let tb = totals.get(&b.id).copied().unwrap_or(0);
                tb.cmp(&ta).then(a.id.cmp(&b.id))
            });
            active.truncate(limit.max(0) as usize);
            attach_owners(conn, active)
        })
        .await
    }
}

#[async_trait]
impl RoomRepository for PostgresRepository {
    async fn create_room(&self, room: &NewRoom) -> RepositoryResult<Room> {
        let row = NewRoomRow::from(room);
        self.with_conn(move |conn| {
            let inserted: RoomRow = diesel::insert_into(rooms::table)
                .values(&row)
                .returning(RoomRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_room"))?;
            let mut items = attach_homestay_names(conn, vec![inserted])?;
            items
                .pop()
                .ok_or_else(|| RepositoryError::internal("insert returned no row"))
        })
        .await
    }

    async fn get_room(&self, room_id: i64) -> RepositoryResult<Room> {
        self.with_conn(move |conn| {
            let row = rooms::table
                .find(room_id)
                .select(RoomRow::as_select())
                .first::<RoomRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::missing("get_room", "room", room_id))?;
            let mut items = attach_homestay_names(conn, vec![row])?;
            items
                .pop()
                .ok_or_else(|| RepositoryError::missing("get_room", "room", room_id))
        })
        .await
    }

    async fn update_room(&self, room_id: i64, changes: &RoomChanges) -> RepositoryResult<Room> {
        if changes.is_empty() {
            return Err(RepositoryError::validation_with_context(
                "no fields to update",
                ErrorContext::new("update_room").with_entity_id(room_id),
            ));
        }
        let changeset = RoomChangeset::from(changes);
        self.with_conn(move |conn| {
            let row = diesel::update(rooms::table.find(room_id))
                .set(&changeset)
                .returning(RoomRow::as_returning())
                .get_result::<RoomRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::missing("update_room", "room", room_id))?;
            let mut items = attach_homestay_names(conn, vec![row])?;
            items
                .pop()
                .ok_or_else(|| RepositoryError::missing("update_room", "room", room_id))
        })
        .await
    }

    async fn delete_room(&self, room_id: i64) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(rooms::table.find(room_id))
                .execute(conn)
                .map_err(|e| map_diesel_error(e).with_operation("delete_room"))?;
            if deleted == 0 {
                return Err(RepositoryError::missing("delete_room", "room", room_id));
            }
            Ok(())
        })
        .await
    }

    async fn search_rooms(&self, filter: &RoomFilter) -> RepositoryResult<Page<Room>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let total: i64 = filtered_rooms(&filter)
                .count()
                .get_result(conn)
                .map_err(map_diesel_error)?;
            let rows = filtered_rooms(&filter)
                .order(rooms::id.desc())
                .limit(filter.page.limit())
                .offset(filter.page.offset())
                .select(RoomRow::as_select())
                .load::<RoomRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(Page::new(attach_homestay_names(conn, rows)?, total))
        })
        .await
    }

    async fn rooms_for_homestay(&self, homestay_id: i64) -> RepositoryResult<Vec<Room>> {
        self.with_conn(move |conn| {
            let rows = rooms::table
                .filter(rooms::homestay_id.eq(homestay_id))
                .order(rooms::id.desc())
                .select(RoomRow::as_select())
                .load::<RoomRow>(conn)
                .map_err(map_diesel_error)?;
            attach_homestay_names(conn, rows)
        })
        .await
    }
}

#[async_trait]
impl AvailabilityRepository for PostgresRepository {
    async fn create_availability(
        &self,
        availability: &NewAvailability,
    ) -> RepositoryResult<RoomAvailability> {
        let row = NewAvailabilityRow::from(availability);
        self.with_conn(move |conn| {
            let inserted: AvailabilityRow = diesel::insert_into(room_availability::table)
                .values(&row)
                .returning(AvailabilityRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_availability"))?;
            RoomAvailability::try_from(inserted)
        })
        .await
    }

    async fn get_availability(&self, availability_id: i64) -> RepositoryResult<RoomAvailability> {
        self.with_conn(move |conn| {
            let row = room_availability::table
                .find(availability_id)
                .select(AvailabilityRow::as_select())
                .first::<AvailabilityRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::missing(
                        "get_availability",
                        "room_availability",
                        availability_id,
                    )
                })?;
            RoomAvailability::try_from(row)
        })
        .await
    }

    async fn update_availability(
        &self,
        availability_id: i64,
        changes: &AvailabilityChanges,
    ) -> RepositoryResult<RoomAvailability> {
        if changes.is_empty() {
            return Err(RepositoryError::validation_with_context(
                "no fields to update",
                ErrorContext::new("update_availability").with_entity_id(availability_id),
            ));
        }
        let changeset = AvailabilityChangeset::from(changes);
        self.with_conn(move |conn| {
            let row = diesel::update(room_availability::table.find(availability_id))
                .set(&changeset)
                .returning(AvailabilityRow::as_returning())
                .get_result::<AvailabilityRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::missing(
                        "update_availability",
                        "room_availability",
                        availability_id,
                    )
                })?;
            RoomAvailability::try_from(row)
        })
        .await
    }

    async fn upsert_availabilities(&self, entries: &[NewAvailability]) -> RepositoryResult<usize> {
        let rows: Vec<NewAvailabilityRow> = entries.iter().map(NewAvailabilityRow::from).collect();
        if rows.is_empty() {
            return Ok(0);
        }
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let mut written = 0;
                for chunk in rows.chunks(1000) {
                    written += diesel::insert_into(room_availability::table)
                        .values(chunk)
                        .on_conflict((room_availability::room_id, room_availability::date))
                        .do_update()
                        .set((
                            room_availability::status.eq(excluded(room_availability::status)),
                            room_availability::price.eq(excluded(room_availability::price)),
                            room_availability::updated_at
                                .eq(excluded(room_availability::updated_at)),
                        ))
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                }
                debug!("Upserted {} availability rows", written);
                Ok(written)
            })
        })
        .await
    }

    async fn availabilities_for_room(
        &self,
        room_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> RepositoryResult<Vec<RoomAvailability>> {
        self.with_conn(move |conn| {
            let mut query = room_availability::table
                .filter(room_availability::room_id.eq(room_id))
                .into_boxed();
            if let Some(from) = from {
                query = query.filter(room_availability::date.ge(from));
            }
            if let Some(to) = to {
                query = query.filter(room_availability::date.le(to));
            }
            query
                .order(room_availability::date.asc())
                .select(AvailabilityRow::as_select())
                .load::<AvailabilityRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(RoomAvailability::try_from)
                .collect()
        })
        .await
    }
}

#[async_trait]
impl BookingRepository for PostgresRepository {
    async fn create_booking(&self, booking: &NewBooking) -> RepositoryResult<Booking> {
        let booking = booking.clone();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let room_ids: Vec<i64> = booking.rooms.iter().map(|r| r.room_id).collect();
                if booking.status.holds_rooms() && !room_ids.is_empty() {
                    // Row locks serialize concurrent bookings of the same rooms.
                    rooms::table
                        .filter(rooms::id.eq_any(&room_ids))
                        .select(rooms::id)
                        .for_update()
                        .load::<i64>(tx)
                        .map_err(map_diesel_error)?;
                    let taken: i64 = booking_rooms::table
                        .inner_join(bookings::table)
                        .filter(booking_rooms::room_id.eq_any(&room_ids))
                        .filter(bookings::status.ne(BookingStatus::Cancelled.as_str()))
                        .filter(bookings::check_in.lt(booking.check_out))
                        .filter(bookings::check_out.gt(booking.check_in))
                        .count()
                        .get_result(tx)
                        .map_err(map_diesel_error)?;
                    if taken > 0 {
                        return Err(RepositoryError::conflict_with_context(
                            "room already booked for these dates",
                            ErrorContext::new("create_booking")
                                .with_details(booking.booking_code.clone()),
                        ));
                    }
                }

                let inserted: BookingRow = diesel::insert_into(bookings::table)
                    .values(&NewBookingRow::from(&booking))
                    .returning(BookingRow::as_returning())
                    .get_result(tx)
                    .map_err(|e| map_diesel_error(e).with_operation("create_booking"))?;

                let room_rows: Vec<NewBookingRoomRow> = booking
                    .rooms
                    .iter()
                    .map(|room| NewBookingRoomRow::new(inserted.id, room))
                    .collect();
                if !room_rows.is_empty() {
                    diesel::insert_into(booking_rooms::table)
                        .values(&room_rows)
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                }

                if let Some(ref payment) = booking.initial_payment {
                    diesel::insert_into(payments::table)
                        .values(&NewPaymentRow::new(inserted.id, payment))
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                }

                debug!(
                    "Created booking {} with {} rooms",
                    inserted.booking_code,
                    room_rows.len()
                );
                Booking::try_from(inserted)
            })
        })
        .await
    }

    async fn get_booking(&self, booking_id: i64) -> RepositoryResult<Booking> {
        self.with_conn(move |conn| {
            let row = bookings::table
                .find(booking_id)
                .select(BookingRow::as_select())
                .first::<BookingRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::missing("get_booking", "booking", booking_id))?;
            Booking::try_from(row)
        })
        .await
    }

    async fn booking_rooms(&self, booking_id: i64) -> RepositoryResult<Vec<BookingRoom>> {
        self.with_conn(move |conn| {
            Ok(booking_rooms::table
                .filter(booking_rooms::booking_id.eq(booking_id))
                .order(booking_rooms::id.asc())
                .select(BookingRoomRow::as_select())
                .load::<BookingRoomRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(BookingRoom::from)
                .collect())
        })
        .await
    }

    async fn room_has_overlap(
        &self,
        room_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            let count: i64 = booking_rooms::table
                .inner_join(bookings::table)
                .filter(booking_rooms::room_id.eq(room_id))
                .filter(bookings::status.ne(BookingStatus::Cancelled.as_str()))
                .filter(bookings::check_in.lt(check_out))
                .filter(bookings::check_out.gt(check_in))
                .count()
                .get_result(conn)
                .map_err(map_diesel_error)?;
            Ok(count > 0)
        })
        .await
    }

    async fn search_bookings(&self, filter: &BookingFilter) -> RepositoryResult<Page<Booking>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let total: i64 = filtered_bookings(&filter)
                .count()
                .get_result(conn)
                .map_err(map_diesel_error)?;
            let items = filtered_bookings(&filter)
                .order((bookings::created_at.desc(), bookings::id.desc()))
                .limit(filter.page.limit())
                .offset(filter.page.offset())
                .select(BookingRow::as_select())
                .load::<BookingRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(Booking::try_from)
                .collect::<RepositoryResult<Vec<_>>>()?;
            Ok(Page::new(items, total))
        })
        .await
    }

    async fn bookings_for_room(&self, room_id: i64) -> RepositoryResult<Vec<Booking>> {
        self.with_conn(move |conn| {
            bookings::table
                .filter(
                    bookings::id.eq_any(
                        booking_rooms::table
                            .filter(booking_rooms::room_id.eq(room_id))
                            .select(booking_rooms::booking_id),
                    ),
                )
                .order(bookings::check_in.asc())
                .select(BookingRow::as_select())
                .load::<BookingRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(Booking::try_from)
                .collect()
        })
        .await
    }

    async fn apply_status_change(
        &self,
        booking_id: i64,
        change: &StatusChange,
    ) -> RepositoryResult<Booking> {
        let change = change.clone();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let changeset = BookingStatusChangeset {
                    status: change.status.as_str().to_string(),
                    paid_amount: change.paid_amount,
                };
                let current = bookings::table
                    .find(booking_id)
                    .select(bookings::status)
                    .for_update()
                    .first::<String>(tx)
                    .optional()
                    .map_err(map_diesel_error)?
                    .ok_or_else(|| {
                        RepositoryError::missing("apply_status_change", "booking", booking_id)
                    })?;
                if current != change.from.as_str() {
                    return Err(RepositoryError::conflict_with_context(
                        format!("booking is {}, not {}", current, change.from),
                        ErrorContext::new("apply_status_change")
                            .with_entity("booking")
                            .with_entity_id(booking_id),
                    ));
                }
                let row = diesel::update(bookings::table.find(booking_id))
                    .set(&changeset)
                    .returning(BookingRow::as_returning())
                    .get_result::<BookingRow>(tx)
                    .map_err(map_diesel_error)?;

                if let Some(ref payment) = change.payment {
                    diesel::insert_into(payments::table)
                        .values(&NewPaymentRow::new(booking_id, payment))
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                }
                Booking::try_from(row)
            })
        })
        .await
    }
}

#[async_trait]
impl BookingRequestRepository for PostgresRepository {
    async fn create_booking_request(
        &self,
        request: &NewBookingRequest,
    ) -> RepositoryResult<BookingRequest> {
        let row = NewBookingRequestRow::from(request);
        self.with_conn(move |conn| {
            let inserted: BookingRequestRow = diesel::insert_into(booking_requests::table)
                .values(&row)
                .returning(BookingRequestRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_booking_request"))?;
            let mut items = attach_request_names(conn, vec![inserted])?;
            items
                .pop()
                .ok_or_else(|| RepositoryError::internal("insert returned no row"))
        })
        .await
    }

    async fn get_booking_request(&self, request_id: i64) -> RepositoryResult<BookingRequest> {
        self.with_conn(move |conn| {
            let row = booking_requests::table
                .find(request_id)
                .select(BookingRequestRow::as_select())
                .first::<BookingRequestRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::missing("get_booking_request", "booking_request", request_id)
                })?;
            let mut items = attach_request_names(conn, vec![row])?;
            items.pop().ok_or_else(|| {
                RepositoryError::missing("get_booking_request", "booking_request", request_id)
            })
        })
        .await
    }

    async fn update_booking_request(
        &self,
        request_id: i64,
        changes: &BookingRequestChanges,
    ) -> RepositoryResult<BookingRequest> {
        if changes.is_empty() {
            return Err(RepositoryError::validation_with_context(
                "no fields to update",
                ErrorContext::new("update_booking_request").with_entity_id(request_id),
            ));
        }
        let changeset = BookingRequestChangeset::from(changes);
        self.with_conn(move |conn| {
            let row = diesel::update(booking_requests::table.find(request_id))
                .set(&changeset)
                .returning(BookingRequestRow::as_returning())
                .get_result::<BookingRequestRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::missing(
                        "update_booking_request",
                        "booking_request",
                        request_id,
                    )
                })?;
            let mut items = attach_request_names(conn, vec![row])?;
            items.pop().ok_or_else(|| {
                RepositoryError::missing("update_booking_request", "booking_request", request_id)
            })
        })
        .await
    }

    async fn booking_requests_for_user(
        &self,
        user_id: i64,
    ) -> RepositoryResult<Vec<BookingRequest>> {
        self.with_conn(move |conn| {
            let rows = booking_requests::table
                .filter(booking_requests::user_id.eq(user_id))
                .order(booking_requests::id.desc())
                .select(BookingRequestRow::as_select())
                .load::<BookingRequestRow>(conn)
                .map_err(map_diesel_error)?;
            attach_request_names(conn, rows)
        })
        .await
    }

    async fn booking_requests_for_owner(
        &self,
        owner_id: i64,
    ) -> RepositoryResult<Vec<BookingRequest>> {
        self.with_conn(move |conn| {
            let rows = booking_requests::table
                .filter(
                    booking_requests::room_id.eq_any(
                        rooms::table
                            .filter(
                                rooms::homestay_id.eq_any(
                                    homestays::table
                                        .filter(homestays::owner_id.eq(owner_id))
                                        .select(homestays::id),
                                ),
                            )
                            .select(rooms::id),
                    ),
                )
                .order(booking_requests::id.desc())
                .select(BookingRequestRow::as_select())
                .load::<BookingRequestRow>(conn)
                .map_err(map_diesel_error)?;
            attach_request_names(conn, rows)
        })
        .await
    }
}

#[async_trait]
impl PaymentRepository for PostgresRepository {
    async fn create_payment(
        &self,
        booking_id: i64,
        payment: &NewPayment,
    ) -> RepositoryResult<Payment> {
        let row = NewPaymentRow::new(booking_id, payment);
        self.with_conn(move |conn| {
            let inserted: PaymentRow = diesel::insert_into(payments::table)
                .values(&row)
                .returning(PaymentRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_payment"))?;
            let mut items = attach_booking_codes(conn, vec![inserted])?;
            items
                .pop()
                .ok_or_else(|| RepositoryError::internal("insert returned no row"))
        })
        .await
    }

    async fn payments_for_booking(&self, booking_id: i64) -> RepositoryResult<Vec<Payment>> {
        self.with_conn(move |conn| {
            let rows = payments::table
                .filter(payments::booking_id.eq(booking_id))
                .order(payments::id.desc())
                .select(PaymentRow::as_select())
                .load::<PaymentRow>(conn)
                .map_err(map_diesel_error)?;
            attach_booking_codes(conn, rows)
        })
        .await
    }

    async fn search_payments(&self, filter: &PaymentFilter) -> RepositoryResult<Page<Payment>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let total: i64 = filtered_payments(&filter)
                .count()
                .get_result(conn)
                .map_err(map_diesel_error)?;
            let rows = filtered_payments(&filter)
                .order((payments::created_at.desc(), payments::id.desc()))
                .limit(filter.page.limit())
                .offset(filter.page.offset())
                .select(PaymentRow::as_select())
                .load::<PaymentRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(Page::new(attach_booking_codes(conn, rows)?, total))
        })
        .await
    }
}

#[async_trait]
impl ReviewRepository for PostgresRepository {
    async fn create_review(&self, review: &NewReview) -> RepositoryResult<Review> {
        let row = NewReviewRow::from(review);
        self.with_conn(move |conn| {
            let inserted: ReviewRow = diesel::insert_into(reviews::table)
                .values(&row)
                .returning(ReviewRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_review"))?;
            let mut items = attach_guest_names(conn, vec![inserted])?;
            items
                .pop()
                .ok_or_else(|| RepositoryError::internal("insert returned no row"))
        })
        .await
    }

    async fn reviews_for_homestay(&self, homestay_id: i64) -> RepositoryResult<Vec<Review>> {
        self.with_conn(move |conn| {
            let rows = reviews::table
                .filter(reviews::homestay_id.eq(homestay_id))
                .order((reviews::created_at.desc(), reviews::id.desc()))
                .select(ReviewRow::as_select())
                .load::<ReviewRow>(conn)
                .map_err(map_diesel_error)?;
            attach_guest_names(conn, rows)
        })
        .await
    }

    async fn review_for_booking(&self, booking_id: i64) -> RepositoryResult<Option<Review>> {
        self.with_conn(move |conn| {
            let row = reviews::table
                .filter(reviews::booking_id.eq(booking_id))
                .select(ReviewRow::as_select())
                .first::<ReviewRow>(conn)
                .optional()
                .map_err(map_diesel_error)?;
            match row {
                Some(row) => Ok(attach_guest_names(conn, vec![row])?.pop()),
                None => Ok(None),
            }
        })
        .await
    }
}
