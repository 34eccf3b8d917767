use async_trait::async_trait;
use safar_core::directory::{Company, OperatorDirectory, UserProfile};
use safar_core::{BookingRepository, NotificationRepository, TripRepository};
use safar_domain::pii::Masked;
use safar_domain::trip::TransportKind;
use safar_domain::{Booking, BookingStatus, Notification, NotificationKind, PaymentStatus, Trip};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

/// Postgres-backed store. Queries go through the runtime API so the
/// workspace builds without a live database; the schema ships as embedded
/// migrations applied on connect.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Connected to Postgres and applied migrations");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }
}

fn trip_from_row(row: &PgRow) -> Result<Trip, Box<dyn std::error::Error + Send + Sync>> {
    let transport: String = row.try_get("transport")?;
    let seat_map: serde_json::Value = row.try_get("seat_map")?;
    Ok(Trip {
        id: row.try_get("id")?,
        company_id: row.try_get("company_id")?,
        title: row.try_get("title")?,
        transport: transport.parse::<TransportKind>()?,
        capacity: row.try_get::<i32, _>("capacity")? as u32,
        price_display: row.try_get("price_display")?,
        unit_price: row.try_get("unit_price")?,
        departure_date: row.try_get("departure_date")?,
        seat_map: serde_json::from_value(seat_map)?,
        created_at: row.try_get("created_at")?,
    })
}

fn booking_from_row(row: &PgRow) -> Result<Booking, Box<dyn std::error::Error + Send + Sync>> {
    let status: String = row.try_get("status")?;
    let payment_status: String = row.try_get("payment_status")?;
    Ok(Booking {
        id: row.try_get("id")?,
        reference: row.try_get("reference")?,
        trip_id: row.try_get("trip_id")?,
        company_id: row.try_get("company_id")?,
        requester_id: row.try_get("requester_id")?,
        seat_count: row.try_get::<i32, _>("seat_count")? as u32,
        seat_labels: row.try_get("seat_labels")?,
        travel_date: row.try_get("travel_date")?,
        contact_name: row.try_get("contact_name")?,
        contact_phone: Masked(row.try_get("contact_phone")?),
        special_requests: row.try_get("special_requests")?,
        unit_price: row.try_get("unit_price")?,
        total_price: row.try_get("total_price")?,
        commission: row.try_get("commission")?,
        net_to_operator: row.try_get("net_to_operator")?,
        status: status.parse::<BookingStatus>()?,
        payment_status: payment_status.parse::<PaymentStatus>()?,
        payment_method: row.try_get("payment_method")?,
        status_updated_at: row.try_get("status_updated_at")?,
        rejection_reason: row.try_get("rejection_reason")?,
        cancellation_reason: row.try_get("cancellation_reason")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn notification_from_row(
    row: &PgRow,
) -> Result<Notification, Box<dyn std::error::Error + Send + Sync>> {
    let kind: String = row.try_get("kind")?;
    Ok(Notification {
        id: row.try_get("id")?,
        recipient_id: row.try_get("recipient_id")?,
        actor_id: row.try_get("actor_id")?,
        kind: kind.parse::<NotificationKind>()?,
        message: row.try_get("message")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl TripRepository for PgStore {
    async fn get_trip(
        &self,
        id: Uuid,
    ) -> Result<Option<Trip>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query("SELECT * FROM trips WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(trip_from_row).transpose()
    }

    async fn save_trip(
        &self,
        trip: &Trip,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO trips (id, company_id, title, transport, capacity, price_display, unit_price, departure_date, seat_map, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                transport = EXCLUDED.transport,
                capacity = EXCLUDED.capacity,
                price_display = EXCLUDED.price_display,
                unit_price = EXCLUDED.unit_price,
                departure_date = EXCLUDED.departure_date,
                seat_map = EXCLUDED.seat_map
            "#,
        )
        .bind(trip.id)
        .bind(trip.company_id)
        .bind(&trip.title)
        .bind(trip.transport.to_string())
        .bind(trip.capacity as i32)
        .bind(&trip.price_display)
        .bind(trip.unit_price)
        .bind(trip.departure_date)
        .bind(serde_json::to_value(&trip.seat_map)?)
        .bind(trip.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for PgStore {
    async fn create_booking(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, reference, trip_id, company_id, requester_id,
                seat_count, seat_labels, travel_date, contact_name, contact_phone,
                special_requests, unit_price, total_price, commission, net_to_operator,
                status, payment_status, payment_method, status_updated_at,
                rejection_reason, cancellation_reason, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.reference)
        .bind(booking.trip_id)
        .bind(booking.company_id)
        .bind(booking.requester_id)
        .bind(booking.seat_count as i32)
        .bind(&booking.seat_labels)
        .bind(booking.travel_date)
        .bind(&booking.contact_name)
        .bind(booking.contact_phone.inner())
        .bind(&booking.special_requests)
        .bind(booking.unit_price)
        .bind(booking.total_price)
        .bind(booking.commission)
        .bind(booking.net_to_operator)
        .bind(booking.status.to_string())
        .bind(booking.payment_status.to_string())
        .bind(&booking.payment_method)
        .bind(booking.status_updated_at)
        .bind(&booking.rejection_reason)
        .bind(&booking.cancellation_reason)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_booking(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn update_booking(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                seat_count = $2,
                seat_labels = $3,
                contact_phone = $4,
                special_requests = $5,
                unit_price = $6,
                total_price = $7,
                commission = $8,
                net_to_operator = $9,
                status = $10,
                payment_status = $11,
                payment_method = $12,
                status_updated_at = $13,
                rejection_reason = $14,
                cancellation_reason = $15,
                updated_at = $16
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(booking.seat_count as i32)
        .bind(&booking.seat_labels)
        .bind(booking.contact_phone.inner())
        .bind(&booking.special_requests)
        .bind(booking.unit_price)
        .bind(booking.total_price)
        .bind(booking.commission)
        .bind(booking.net_to_operator)
        .bind(booking.status.to_string())
        .bind(booking.payment_status.to_string())
        .bind(&booking.payment_method)
        .bind(booking.status_updated_at)
        .bind(&booking.rejection_reason)
        .bind(&booking.cancellation_reason)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(format!("booking {} does not exist", booking.id).into());
        }
        Ok(())
    }

    async fn list_by_requester(
        &self,
        requester_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows =
            sqlx::query("SELECT * FROM bookings WHERE requester_id = $1 ORDER BY created_at DESC")
                .bind(requester_id)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn list_by_company(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows =
            sqlx::query("SELECT * FROM bookings WHERE company_id = $1 ORDER BY created_at DESC")
                .bind(company_id)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn list_pending_for_trip(
        &self,
        trip_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query("SELECT * FROM bookings WHERE trip_id = $1 AND status = 'PENDING'")
            .bind(trip_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(booking_from_row).collect()
    }
}

#[async_trait]
impl NotificationRepository for PgStore {
    async fn create_notification(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient_id, actor_id, kind, message, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notification.id)
        .bind(notification.recipient_id)
        .bind(notification.actor_id)
        .bind(notification.kind.to_string())
        .bind(&notification.message)
        .bind(&notification.metadata)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_recipient(
        &self,
        recipient_id: Uuid,
    ) -> Result<Vec<Notification>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query(
            "SELECT * FROM notifications WHERE recipient_id = $1 ORDER BY created_at DESC",
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(notification_from_row).collect()
    }
}

/// Operator directory over the normalized `company_links` table.
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record the ownership/creation linkage path.
    pub async fn record_company(&self, company: &Company) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO company_links (user_id, company_id, source)
            VALUES ($1, $2, 'OWNER'), ($3, $2, 'CREATOR')
            ON CONFLICT (user_id, company_id) DO NOTHING
            "#,
        )
        .bind(company.owner_id)
        .bind(company.id)
        .bind(company.created_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record the profile-carried linkage path.
    pub async fn record_profile(&self, profile: &UserProfile) -> Result<(), sqlx::Error> {
        if let Some(company_id) = profile.company_id {
            sqlx::query(
                r#"
                INSERT INTO company_links (user_id, company_id, source)
                VALUES ($1, $2, 'PROFILE')
                ON CONFLICT (user_id, company_id) DO NOTHING
                "#,
            )
            .bind(profile.id)
            .bind(company_id)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl OperatorDirectory for PgDirectory {
    async fn company_for(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query(
            "SELECT company_id FROM company_links WHERE user_id = $1 ORDER BY company_id LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get("company_id")))
    }

    async fn is_operator_for(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM company_links WHERE user_id = $1 AND company_id = $2) AS linked",
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("linked"))
    }

    async fn operator_for_company(
        &self,
        company_id: Uuid,
    ) -> Result<Option<Uuid>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query(
            "SELECT user_id FROM company_links WHERE company_id = $1 AND source = 'OWNER' LIMIT 1",
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get("user_id")))
    }
}
