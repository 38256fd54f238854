//! End-to-end flows against a spawned admin server.
//!
//! These tests require a scratch `PostgreSQL` database:
//! `TRADEDESK_TEST_DATABASE_URL` (or `DATABASE_URL`). Migrations are run
//! before each test; every test works in its own freshly created store.
//!
//! Run with: cargo test -p tradedesk-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use reqwest::{Client, StatusCode, multipart};
use serde_json::Value;

use tradedesk_admin::config::AdminConfig;
use tradedesk_admin::db::StoreRepository;
use tradedesk_integration_tests::{
    migrated_pool, spawn_app_with, test_config, test_database_url, unique_name,
};

struct Session {
    client: Client,
    base_url: String,
}

impl Session {
    /// Spawn a server, create a store and select it.
    async fn start() -> (Self, String) {
        Self::start_with(test_config(&test_database_url())).await
    }

    async fn start_with(config: AdminConfig) -> (Self, String) {
        let base_url = spawn_app_with(migrated_pool().await, config).await;
        let client = Client::builder().cookie_store(true).build().unwrap();
        let session = Self { client, base_url };

        let store = unique_name("store");
        let resp = session.post_form("/stores", &[("name", store.as_str())]).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.url().path(), "/");
        assert!(resp.text().await.unwrap().contains(&store));

        (session, store)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Create a customer and return its database id.
    async fn create_customer(&self, code: &str, name: &str) -> i32 {
        let resp = self
            .post_form(
                "/customers",
                &[("code", code), ("name", name), ("phone", "06-1234-5678")],
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        last_segment(&resp)
    }

    /// Create an order with one line and return its id.
    async fn create_order(&self, customer_id: i32, quantity: &str) -> i32 {
        let customer_id = customer_id.to_string();
        let resp = self
            .post_form(
                "/orders",
                &[
                    ("customer_id", customer_id.as_str()),
                    ("order_date", "2026-04-01"),
                    ("product_name", "Soy sauce 1L"),
                    ("unit_price", "480"),
                    ("quantity", quantity),
                    ("description", ""),
                ],
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.url().path().starts_with("/orders/"));
        last_segment(&resp)
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> reqwest::Response {
        let form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(bytes).file_name(file_name.to_string()),
        );
        self.client
            .post(self.url("/customers/import"))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    async fn open_details(&self, customer_id: i32) -> Vec<Value> {
        let resp = self
            .get(&format!("/api/customers/{customer_id}/open-details"))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        resp.json::<Vec<Value>>().await.unwrap()
    }
}

fn last_segment(resp: &reqwest::Response) -> i32 {
    resp.url()
        .path_segments()
        .and_then(|mut s| s.next_back())
        .and_then(|id| id.parse().ok())
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database"]
async fn test_customer_crud_and_duplicate_code() {
    let (session, _) = Session::start().await;
    let id = session.create_customer("C-001", "Sato Shoten").await;

    let resp = session.get(&format!("/customers/{id}")).await;
    assert!(resp.text().await.unwrap().contains("Sato Shoten"));

    let resp = session
        .post_form("/customers", &[("code", "C-001"), ("name", "Other")])
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = session
        .post_form("/customers", &[("code", ""), ("name", "")])
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = session.get("/customers?q=sato&sort=name&order=desc").await;
    assert!(resp.text().await.unwrap().contains("C-001"));

    let resp = session
        .post_form(&format!("/customers/{id}/delete"), &[])
        .await;
    assert_eq!(resp.url().path(), "/customers");
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database"]
async fn test_delivery_allocation_limits() {
    let (session, _) = Session::start().await;
    let customer_id = session.create_customer("C-100", "Yamada Foods").await;
    let order_id = session.create_order(customer_id, "10").await;

    let details = session.open_details(customer_id).await;
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["remaining_quantity"], 10);
    let field = format!("qty_{}", details[0]["order_detail_id"]);
    let customer = customer_id.to_string();

    // Over-delivery is refused
    let resp = session
        .post_form(
            "/deliveries",
            &[
                ("customer_id", customer.as_str()),
                ("delivery_date", "2026-04-03"),
                (field.as_str(), "11"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Partial delivery
    let resp = session
        .post_form(
            "/deliveries",
            &[
                ("customer_id", customer.as_str()),
                ("delivery_date", "2026-04-03"),
                (field.as_str(), "6"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let delivery_id = last_segment(&resp);

    let details = session.open_details(customer_id).await;
    assert_eq!(details[0]["remaining_quantity"], 4);

    // Orders with deliveries are locked
    let resp = session
        .post_form(&format!("/orders/{order_id}/delete"), &[])
        .await;
    assert_eq!(resp.url().path(), format!("/orders/{order_id}"));

    // Deleting the delivery frees the quantity again
    let resp = session
        .post_form(&format!("/deliveries/{delivery_id}/delete"), &[])
        .await;
    assert_eq!(resp.url().path(), "/deliveries");
    let details = session.open_details(customer_id).await;
    assert_eq!(details[0]["remaining_quantity"], 10);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database"]
async fn test_statistics_page_and_export() {
    let (session, _) = Session::start().await;
    let customer_id = session.create_customer("C-200", "Kato Trading").await;
    session.create_order(customer_id, "3").await;

    let resp = session
        .get("/statistics?from=2026-04-01&to=2026-04-30")
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("C-200"));

    let resp = session
        .get("/statistics/export?from=2026-04-01&to=2026-04-30")
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "text/csv; charset=Shift_JIS"
    );
    let bytes = resp.bytes().await.unwrap();
    assert!(bytes.windows(5).any(|w| w == b"C-200"));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database"]
async fn test_customer_export_then_import() {
    let (session, _) = Session::start().await;
    session.create_customer("C-300", "Ito Shoten").await;

    let resp = session.get("/customers/export").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.bytes().await.unwrap().to_vec();

    let resp = session.upload("customers.csv", bytes).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("0 created, 1 updated"));

    let resp = session
        .upload("bad.csv", b"not,a,customer,file\r\n".to_vec())
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database"]
async fn test_api_is_scoped_to_selected_store() {
    let (first, _) = Session::start().await;
    let customer_id = first.create_customer("C-400", "Abe Foods").await;

    let resp = first.get("/api/customers?q=C-4").await;
    let found: Vec<Value> = resp.json().await.unwrap();
    assert!(found.iter().any(|c| c["code"] == "C-400"));

    // Another session with its own store cannot see the customer
    let (second, _) = Session::start().await;
    let resp = second.get("/api/customers?q=C-4").await;
    let found: Vec<Value> = resp.json().await.unwrap();
    assert!(found.is_empty());

    let resp = second
        .get(&format!("/api/customers/{customer_id}/open-details"))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database"]
async fn test_customer_with_orders_is_kept() {
    let (session, _) = Session::start().await;
    let customer_id = session.create_customer("C-500", "Mori Shoten").await;
    session.create_order(customer_id, "2").await;

    let resp = session
        .post_form(&format!("/customers/{customer_id}/delete"), &[])
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.url().path(), format!("/customers/{customer_id}"));
    let body = resp.text().await.unwrap();
    assert!(body.contains("cannot be deleted"));
    assert!(body.contains("Mori Shoten"));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database"]
async fn test_order_with_deliveries_cannot_be_edited() {
    let (session, _) = Session::start().await;
    let customer_id = session.create_customer("C-600", "Ueda Foods").await;
    let order_id = session.create_order(customer_id, "5").await;

    let details = session.open_details(customer_id).await;
    let field = format!("qty_{}", details[0]["order_detail_id"]);
    let customer = customer_id.to_string();
    let resp = session
        .post_form(
            "/deliveries",
            &[
                ("customer_id", customer.as_str()),
                ("delivery_date", "2026-04-03"),
                (field.as_str(), "2"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = session
        .post_form(
            &format!("/orders/{order_id}"),
            &[
                ("customer_id", customer.as_str()),
                ("order_date", "2026-04-01"),
                ("product_name", "Soy sauce 1L"),
                ("unit_price", "500"),
                ("quantity", "5"),
                ("description", ""),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.text().await.unwrap().contains("already has deliveries"));

    let resp = session.get(&format!("/orders/{order_id}")).await;
    assert!(resp.text().await.unwrap().contains("¥480"));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database"]
async fn test_import_over_size_limit() {
    let config = AdminConfig {
        import_max_bytes: 64,
        ..test_config(&test_database_url())
    };
    let (session, _) = Session::start_with(config).await;

    let resp = session.upload("big.csv", vec![b'a'; 65]).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        resp.text()
            .await
            .unwrap()
            .contains("the file is 65 bytes; the limit is 64 bytes")
    );
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database"]
async fn test_renamed_store_is_used_by_open_sessions() {
    let (session, store) = Session::start().await;
    session.create_customer("C-700", "Noda Trading").await;

    let pool = migrated_pool().await;
    let stores = StoreRepository::new(&pool);
    let selected = stores.find_by_name(&store).await.unwrap().unwrap();
    let renamed = unique_name("renamed");
    stores.rename(selected.id, &renamed).await.unwrap();

    let resp = session.get("/").await;
    assert!(resp.text().await.unwrap().contains(&renamed));

    // The export carries the new name, so re-importing it raises no warning
    let bytes = session.get("/customers/export").await.bytes().await.unwrap();
    assert!(bytes.windows(renamed.len()).any(|w| w == renamed.as_bytes()));
    let resp = session.upload("customers.csv", bytes.to_vec()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!resp.text().await.unwrap().contains("differs from the selected store"));
}
