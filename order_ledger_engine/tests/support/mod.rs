use order_ledger_engine::{
    access::Requester,
    db_types::NewUser,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    LedgerEntryApi,
    OrderSyncApi,
    SqliteDatabase,
};

pub struct TestContext {
    pub db: SqliteDatabase,
    pub orders: OrderSyncApi<SqliteDatabase>,
    pub entries: LedgerEntryApi<SqliteDatabase>,
    pub alice: Requester,
    pub bob: Requester,
    pub admin: Requester,
}

/// Spins up a throwaway database with three users: two plain tenants and one elevated admin.
pub async fn setup() -> TestContext {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::builder().is_test(true).try_init();
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let orders = OrderSyncApi::new(db.clone());
    let entries = LedgerEntryApi::new(db.clone());
    let alice = Requester::from(&orders.create_user(NewUser::new("alice")).await.expect("Error creating alice"));
    let bob = Requester::from(&orders.create_user(NewUser::new("bob")).await.expect("Error creating bob"));
    let admin = Requester::from(&orders.create_user(NewUser::admin("root")).await.expect("Error creating admin"));
    TestContext { db, orders, entries, alice, bob, admin }
}
