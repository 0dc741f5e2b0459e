//! # Room Repositories
//!
//! Room types (categories with rates) and physical rooms.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use hotel_core::{Room, RoomStatus, RoomType};

// =============================================================================
// Room Types
// =============================================================================

/// Repository for room type operations.
#[derive(Debug, Clone)]
pub struct RoomTypeRepository {
    pool: SqlitePool,
}

impl RoomTypeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RoomTypeRepository { pool }
    }

    /// Inserts a room type and returns it with its new id.
    pub async fn create(&self, room_type: &RoomType) -> DbResult<RoomType> {
        let mut conn = self.pool.acquire().await?;
        let id = Self::insert(&mut conn, room_type).await?;
        Ok(RoomType {
            id,
            ..room_type.clone()
        })
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<RoomType>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    pub async fn list_active(&self) -> DbResult<Vec<RoomType>> {
        let room_types = sqlx::query_as::<_, RoomType>(
            "SELECT * FROM room_types WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(room_types)
    }

    pub async fn insert(conn: &mut SqliteConnection, room_type: &RoomType) -> DbResult<i64> {
        debug!(name = %room_type.name, "Inserting room type");

        let result = sqlx::query(
            r#"
            INSERT INTO room_types (
                name, capacity,
                base_price_ves_cents, base_price_usd_cents, base_price_eur_cents,
                is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&room_type.name)
        .bind(room_type.capacity)
        .bind(room_type.base_price_ves_cents)
        .bind(room_type.base_price_usd_cents)
        .bind(room_type.base_price_eur_cents)
        .bind(room_type.is_active)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<RoomType>> {
        let room_type = sqlx::query_as::<_, RoomType>("SELECT * FROM room_types WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(room_type)
    }
}

// =============================================================================
// Rooms
// =============================================================================

/// Repository for room operations.
#[derive(Debug, Clone)]
pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RoomRepository { pool }
    }

    /// Inserts a room and returns it with its new id.
    pub async fn create(&self, room: &Room) -> DbResult<Room> {
        let mut conn = self.pool.acquire().await?;
        let id = Self::insert(&mut conn, room).await?;
        Ok(Room {
            id,
            ..room.clone()
        })
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Room>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    pub async fn list_all(&self) -> DbResult<Vec<Room>> {
        let rooms = sqlx::query_as::<_, Room>("SELECT * FROM rooms ORDER BY room_number")
            .fetch_all(&self.pool)
            .await?;

        Ok(rooms)
    }

    pub async fn insert(conn: &mut SqliteConnection, room: &Room) -> DbResult<i64> {
        debug!(room_number = %room.room_number, "Inserting room");

        let result = sqlx::query(
            r#"
            INSERT INTO rooms (room_number, floor, room_type_id, status, notes, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&room.room_number)
        .bind(room.floor)
        .bind(room.room_type_id)
        .bind(room.status)
        .bind(&room.notes)
        .bind(room.is_active)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &room.room_number),
            other => other,
        })?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Room>> {
        let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(room)
    }

    /// Active rooms whose status allows new stays (AVAILABLE or CLEANING).
    pub async fn find_bookable(conn: &mut SqliteConnection) -> DbResult<Vec<Room>> {
        let rooms = sqlx::query_as::<_, Room>(
            r#"
            SELECT * FROM rooms
            WHERE is_active = 1 AND status IN ('available', 'cleaning')
            ORDER BY room_number
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(rooms)
    }

    pub async fn update_status(
        conn: &mut SqliteConnection,
        id: i64,
        status: RoomStatus,
    ) -> DbResult<()> {
        debug!(room_id = id, ?status, "Updating room status");

        let result = sqlx::query("UPDATE rooms SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Room", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
