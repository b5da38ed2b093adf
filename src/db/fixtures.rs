// src/db/fixtures.rs

// Dados mínimos para os testes com banco (#[sqlx::test])

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::{test_settings, AppState},
    db::UserRepository,
    models::{auth::User, catalog::ProductStatus, rbac::Role},
};

/// JPEG mínimo (só a assinatura) em base64.
pub const JPEG_BASE64: &str = "/9j/4AECAw==";

pub fn state(pool: PgPool) -> AppState {
    AppState::build(test_settings(), pool).unwrap()
}

pub fn state_with_media(pool: PgPool, media_root: &Path) -> AppState {
    let mut settings = test_settings();
    settings.media_root = media_root.to_path_buf();
    AppState::build(settings, pool).unwrap()
}

pub async fn user(pool: &PgPool, username: &str, role: Role) -> User {
    let (dpi, code) = match role {
        Role::Salesperson => (
            Some(format!("{:013}", Uuid::new_v4().as_u128() % 10_000_000_000_000)),
            Some(format!("V-{}", username)),
        ),
        _ => (None, None),
    };
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (username, email, first_name, password_hash, dpi, employee_code, phone, role)
        VALUES ($1, $2, $1, 'sem-login', $3, $4, '55550000', $5)
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(format!("{}@rutas.test", username))
    .bind(dpi)
    .bind(code)
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap();

    UserRepository::new(pool.clone()).find_by_id(id).await.unwrap().unwrap()
}

pub async fn client(pool: &PgPool, nit: &str) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO clients (nit, name, phone, address, latitude, longitude)
        VALUES ($1, $2, '22223333', 'Zona 1', 14.6349, -90.5069)
        RETURNING id
        "#,
    )
    .bind(nit)
    .bind(format!("Tienda {}", nit))
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Rota com um cliente novo por parada, na ordem 1..n. Devolve (rota, paradas).
pub async fn route_with_clients(pool: &PgPool, name: &str, clients: usize) -> (Uuid, Vec<Uuid>) {
    let route_id: Uuid = sqlx::query_scalar("INSERT INTO routes (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap();

    let mut stops = Vec::with_capacity(clients);
    for order in 1..=clients {
        let client_id = client(pool, &format!("{}-{}", &name[..name.len().min(8)], order)).await;
        let detail_id: Uuid = sqlx::query_scalar(
            "INSERT INTO route_details (route_id, client_id, visit_order) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(route_id)
        .bind(client_id)
        .bind(order as i32)
        .fetch_one(pool)
        .await
        .unwrap();
        stops.push(detail_id);
    }
    (route_id, stops)
}

pub async fn assignment(pool: &PgPool, route_id: Uuid, salesperson_id: Uuid, start: NaiveDate, end: Option<NaiveDate>) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO assignments (route_id, salesperson_id, start_date, end_date) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(route_id)
    .bind(salesperson_id)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Plano com a visita já iniciada. Devolve o id do detalhe.
pub async fn visit_in_progress(pool: &PgPool, assignment_id: Uuid, route_detail_id: Uuid, date: NaiveDate) -> Uuid {
    let planning_id: Uuid = sqlx::query_scalar(
        "INSERT INTO plannings (assignment_id, route_detail_id, date) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(assignment_id)
    .bind(route_detail_id)
    .bind(date)
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query_scalar(
        r#"
        INSERT INTO plan_details (planning_id, state, arrived_at, latitude, longitude)
        VALUES ($1, 'visitado', NOW(), 14.6349, -90.5069)
        RETURNING id
        "#,
    )
    .bind(planning_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn product(pool: &PgPool, name: &str, sale_price: Decimal, active: bool) -> Uuid {
    let category_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO categories (name) VALUES ('Bebidas')
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query_scalar(
        r#"
        INSERT INTO products (name, category_id, purchase_price, sale_price, status)
        VALUES ($1, $2, $3, $3, $4)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(category_id)
    .bind(sale_price)
    .bind(if active { ProductStatus::Active } else { ProductStatus::Inactive })
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Camião atribuído à rota desde `date` com a carga do dia aberta.
/// `stock` = (produto, quantidade carregada). Devolve o id da carga.
pub async fn truck_load(pool: &PgPool, route_id: Uuid, date: NaiveDate, stock: &[(Uuid, Decimal)]) -> Uuid {
    let plate = format!("T{:08}", Uuid::new_v4().as_u128() % 100_000_000);
    let truck_id: Uuid = sqlx::query_scalar("INSERT INTO trucks (plate, brand) VALUES ($1, 'Hino') RETURNING id")
        .bind(plate)
        .fetch_one(pool)
        .await
        .unwrap();
    let truck_route_id: Uuid = sqlx::query_scalar(
        "INSERT INTO truck_routes (truck_id, route_id, start_date) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(truck_id)
    .bind(route_id)
    .bind(date)
    .fetch_one(pool)
    .await
    .unwrap();
    let load_id: Uuid = sqlx::query_scalar(
        "INSERT INTO truck_loads (truck_id, truck_route_id, date) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(truck_id)
    .bind(truck_route_id)
    .bind(date)
    .fetch_one(pool)
    .await
    .unwrap();

    for (product_id, quantity) in stock {
        sqlx::query(
            "INSERT INTO truck_load_lines (load_id, product_id, loaded_qty, current_qty) VALUES ($1, $2, $3, $3)",
        )
        .bind(load_id)
        .bind(product_id)
        .bind(quantity)
        .execute(pool)
        .await
        .unwrap();
    }
    load_id
}

pub async fn stock(pool: &PgPool, load_id: Uuid, product_id: Uuid) -> Decimal {
    sqlx::query_scalar("SELECT current_qty FROM truck_load_lines WHERE load_id = $1 AND product_id = $2")
        .bind(load_id)
        .bind(product_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
