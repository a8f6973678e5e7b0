use ironclub::{
    domain::{CreatePaymentRequest, RequestState},
    repository::{
        MembershipRepository, PaymentRequestRepository, SqliteMembershipRepository,
        SqlitePaymentRequestRepository,
    },
};
use sqlx::sqlite::SqlitePoolOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("🌱 Starting database seeding...");

    // Initialize database connection
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:ironclub.db".to_string());

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    // Run migrations first (also seeds the status, payment-type and
    // membership catalogs)
    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    // Initialize repositories
    let payment_repo = SqlitePaymentRequestRepository::new(db_pool.clone());
    let membership_repo = SqliteMembershipRepository::new(db_pool.clone());

    let memberships = membership_repo.list().await?;
    println!("🏋️  Membership catalog: {} plans", memberships.len());

    // Seed demo payment requests
    println!("💳 Creating payment requests...");

    // Alice paid her annual plan in cash at the front desk
    let alice = payment_repo.create(CreatePaymentRequest {
        membership_id: 5,
        payment_type_id: 1,
        user_id: "alice".to_string(),
    }).await?;
    payment_repo
        .append_transition(alice.id, RequestState::Pending, RequestState::Confirmed)
        .await?;
    println!("  ✅ alice: Annual, confirmed (cash)");

    // Bruno started an online checkout that is still pending
    let bruno = payment_repo.create(CreatePaymentRequest {
        membership_id: 2,
        payment_type_id: 2,
        user_id: "bruno".to_string(),
    }).await?;
    println!("  ⏳ bruno: Monthly, pending (online), request {}", bruno.id);

    // Carla changed her mind about the quarterly plan
    let carla = payment_repo.create(CreatePaymentRequest {
        membership_id: 3,
        payment_type_id: 1,
        user_id: "carla".to_string(),
    }).await?;
    payment_repo
        .append_transition(carla.id, RequestState::Pending, RequestState::Cancelled)
        .await?;
    println!("  ❌ carla: Quarterly, cancelled");

    if let Some(validity) = membership_repo.validity_for_user("alice").await? {
        println!(
            "📅 alice's {} membership is valid until {}",
            validity.membership_name,
            validity.valid_until.format("%Y-%m-%d")
        );
    }

    println!("✨ Seeding complete!");

    Ok(())
}
