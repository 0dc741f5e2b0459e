//! # Guest Repository

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use hotel_core::Guest;

/// Repository for guest operations.
#[derive(Debug, Clone)]
pub struct GuestRepository {
    pool: SqlitePool,
}

impl GuestRepository {
    pub fn new(pool: SqlitePool) -> Self {
        GuestRepository { pool }
    }

    /// Inserts a guest and returns it with its new id.
    pub async fn create(&self, guest: &Guest) -> DbResult<Guest> {
        let mut conn = self.pool.acquire().await?;
        let id = Self::insert(&mut conn, guest).await?;
        Ok(Guest {
            id,
            ..guest.clone()
        })
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Guest>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    pub async fn insert(conn: &mut SqliteConnection, guest: &Guest) -> DbResult<i64> {
        debug!(document = %guest.document_number, "Inserting guest");

        let result = sqlx::query(
            r#"
            INSERT INTO guests (
                first_name, last_name, document_type, document_number,
                email, phone, address
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&guest.first_name)
        .bind(&guest.last_name)
        .bind(guest.document_type)
        .bind(&guest.document_number)
        .bind(&guest.email)
        .bind(&guest.phone)
        .bind(&guest.address)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Guest>> {
        let guest = sqlx::query_as::<_, Guest>("SELECT * FROM guests WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(guest)
    }
}
