//! # Seed Data Generator
//!
//! Populates the database with room types, rooms and guests for development.
//!
//! ## Usage
//! ```bash
//! # Four floors of rooms (default)
//! cargo run -p hotel-db --bin seed
//!
//! # Custom number of floors
//! cargo run -p hotel-db --bin seed -- --floors 8
//!
//! # Specify database path
//! cargo run -p hotel-db --bin seed -- --db ./data/hotel.db
//! ```
//!
//! ## Generated Data
//! - One room type per entry in `ROOM_TYPES`, with VES / USD / EUR rates
//! - `ROOMS_PER_FLOOR` rooms per floor, numbered `{floor}{01..}`, cycling
//!   through the room types
//! - A handful of guests with distinct identity documents

use std::env;

use hotel_core::{DocumentType, Guest, Room, RoomStatus, RoomType};
use hotel_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// `(name, capacity, VES cents, USD cents, EUR cents)`
const ROOM_TYPES: &[(&str, i64, i64, i64, Option<i64>)] = &[
    ("Standard", 2, 150_000, 4_000, None),
    ("Double", 3, 220_000, 6_000, Some(5_500)),
    ("Family", 5, 330_000, 9_000, Some(8_300)),
    ("Suite", 4, 480_000, 13_000, Some(12_000)),
];

const ROOMS_PER_FLOOR: usize = 10;

/// `(first name, last name, document type, document number)`
const GUESTS: &[(&str, &str, DocumentType, &str)] = &[
    ("Ana", "Pérez", DocumentType::National, "12345678"),
    ("Luis", "González", DocumentType::National, "18765432"),
    ("Marie", "Dubois", DocumentType::Passport, "FR8842197"),
    ("John", "Carter", DocumentType::Passport, "US5531200"),
    ("Inversiones", "Caribe", DocumentType::Company, "J-30512345-6"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,hotel_db=debug,hotel_booking=debug,sqlx=warn")
        }))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut floors: usize = 4;
    let mut db_path = String::from("./hotel_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--floors" | "-f" => {
                if i + 1 < args.len() {
                    floors = args[i + 1].parse().unwrap_or(4);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Hotel Booking Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -f, --floors <N>   Number of floors to fill with rooms (default: 4)");
                println!("  -d, --db <PATH>    Database file path (default: ./hotel_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, floors, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.rooms().list_all().await?;
    if !existing.is_empty() {
        warn!(
            rooms = existing.len(),
            "Database already has rooms; skipping seed. Delete the file to regenerate."
        );
        return Ok(());
    }

    let start = std::time::Instant::now();

    let mut room_types = Vec::with_capacity(ROOM_TYPES.len());
    for (name, capacity, ves, usd, eur) in ROOM_TYPES {
        let created = db
            .room_types()
            .create(&RoomType::new(*name, *capacity, *ves, *usd, *eur))
            .await?;
        room_types.push(created);
    }
    info!(count = room_types.len(), "Room types created");

    let mut rooms = 0;
    for floor in 1..=floors {
        for n in 1..=ROOMS_PER_FLOOR {
            let room_type = &room_types[(n - 1) % room_types.len()];
            let room = Room {
                id: 0,
                room_number: format!("{}{:02}", floor, n),
                floor: floor as i64,
                room_type_id: room_type.id,
                status: RoomStatus::Available,
                notes: None,
                is_active: true,
            };

            if let Err(e) = db.rooms().create(&room).await {
                warn!(room = %room.room_number, error = %e, "Failed to insert room");
                continue;
            }
            rooms += 1;
        }
    }
    info!(count = rooms, "Rooms created");

    for (first, last, document_type, number) in GUESTS {
        let guest = Guest {
            id: 0,
            first_name: first.to_string(),
            last_name: last.to_string(),
            document_type: *document_type,
            document_number: number.to_string(),
            email: None,
            phone: None,
            address: None,
        };
        db.guests().create(&guest).await?;
    }
    info!(count = GUESTS.len(), "Guests created");

    info!(elapsed = ?start.elapsed(), "Seed complete");

    db.close().await;
    Ok(())
}
