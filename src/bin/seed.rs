use axum_checkout_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::auth::Claims,
    middleware::auth::ADMIN_ROLE,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, 2).await?;
    run_migrations(&create_orm_conn(pool.clone())).await?;

    seed_products(&pool).await?;
    seed_vouchers(&pool).await?;

    match std::env::var("JWT_SECRET") {
        Ok(secret) => {
            let user_id = Uuid::new_v4();
            let admin_id = Uuid::new_v4();
            println!("User  {user_id}: {}", dev_token(user_id, "user", &secret)?);
            println!("Admin {admin_id}: {}", dev_token(admin_id, ADMIN_ROLE, &secret)?);
        }
        Err(_) => println!("JWT_SECRET not set, skipping dev tokens"),
    }

    println!("Seed completed");
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = vec![
        ("Axum Hoodie", "Warm hoodie for Rustaceans", 260_000_i64),
        ("Ferris Mug", "Coffee tastes better with Ferris", 120_000),
        ("Rust Sticker Pack", "Decorate your laptop", 50_000),
        ("E-book: Async Rust", "Learn async Rust patterns", 250_000),
    ];

    for (name, desc, price) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_vouchers(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let now = Utc::now();
    let end = now + Duration::days(90);
    // code, description, type, value, min_order, max_discount, global, per user
    let vouchers = vec![
        ("SAVE10", "10% off, up to 40,000", "percent", 10_i64, 0_i64, 40_000_i64, 100_i64, 1_i64),
        ("FLAT150K", "150,000 off", "fixed", 150_000, 0, 0, 50, 1),
        ("BIGSPENDER", "5% off orders from 1,000,000", "percent", 5, 1_000_000, 0, 100, 2),
        ("LASTONE", "Single-use 20,000 off", "fixed", 20_000, 0, 0, 1, 1),
    ];

    for (code, desc, kind, value, min_order, max_discount, global, per_user) in vouchers {
        sqlx::query(
            r#"
            INSERT INTO vouchers (
                id, code, description, discount_type, discount_value, min_order,
                max_discount, start_date, end_date, usage_limit_global, usage_limit_per_user
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(desc)
        .bind(kind)
        .bind(value)
        .bind(min_order)
        .bind(max_discount)
        .bind(now)
        .bind(end)
        .bind(global)
        .bind(per_user)
        .execute(pool)
        .await?;
    }

    println!("Seeded vouchers");
    Ok(())
}

fn dev_token(user_id: Uuid, role: &str, secret: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + Duration::days(7)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}
