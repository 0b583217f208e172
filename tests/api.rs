//! End-to-end tests driving the JSON API through the full router.

use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::{Value, json};
use tempfile::TempDir;

use spearmint::{AppState, PaginationConfig, ReservedCategories, build_router};

const OWNER: i64 = 1;

fn new_test_server() -> (TestServer, TempDir) {
    let import_dir = TempDir::new().unwrap();
    let state = AppState::new(
        Connection::open_in_memory().unwrap(),
        PaginationConfig::default(),
        ReservedCategories::default(),
        import_dir.path().to_path_buf(),
    )
    .unwrap();

    (TestServer::new(build_router(state)).unwrap(), import_dir)
}

async fn create_category(server: &TestServer, name: &str) -> i64 {
    let response = server
        .post("/api/categories")
        .json(&json!({
            "id": null,
            "name": name,
            "parentCategory": null,
            "owner": OWNER,
        }))
        .await;

    response.assert_status_ok();
    response.json::<Value>()["id"].as_i64().unwrap()
}

async fn create_transaction(server: &TestServer, name: &str, amt: f64, date: &str) -> i64 {
    let response = server
        .post("/api/transactions")
        .json(&json!({
            "id": null,
            "fitId": format!("FIT-{name}"),
            "amt": amt,
            "type": "debit",
            "date": date,
            "name": name,
            "category": null,
            "account": null,
            "owner": OWNER,
        }))
        .await;

    response.assert_status_ok();
    response.json::<Value>()["id"].as_i64().unwrap()
}

#[tokio::test]
async fn unknown_routes_return_a_json_404() {
    let (server, _import_dir) = new_test_server();

    let response = server.get("/api/nope").await;

    response.assert_status_not_found();
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn categories_round_trip_through_the_api() {
    let (server, _import_dir) = new_test_server();

    let groceries = create_category(&server, "Groceries").await;

    let fetched = server
        .get(&format!("/api/categories/{groceries}"))
        .await
        .json::<Value>();
    assert_eq!(fetched["name"], "Groceries");
    assert_eq!(fetched["owner"], OWNER);

    let listing = server
        .get(&format!("/api/categories/by-owner/{OWNER}"))
        .await
        .json::<Value>();
    // The envelope carries the camelCase paging bookkeeping.
    assert_eq!(listing["page"], 1);
    assert_eq!(listing["pageSize"], 50);
    assert_eq!(listing["hasNext"], false);
    assert_eq!(listing["hasPrev"], false);
    // Three reserved categories plus the new one.
    assert_eq!(listing["totalHitCount"], 4);
    assert_eq!(listing["hitCount"], 4);
}

#[tokio::test]
async fn invalid_category_nesting_is_a_bad_request() {
    let (server, _import_dir) = new_test_server();
    let food = create_category(&server, "Food").await;

    let sub = server
        .post("/api/categories")
        .json(&json!({
            "id": null,
            "name": "Restaurants",
            "parentCategory": food,
            "owner": OWNER,
        }))
        .await;
    sub.assert_status_ok();
    let sub_id = sub.json::<Value>()["id"].as_i64().unwrap();

    let nested_twice = server
        .post("/api/categories")
        .json(&json!({
            "id": null,
            "name": "Sushi",
            "parentCategory": sub_id,
            "owner": OWNER,
        }))
        .await;

    nested_twice.assert_status_bad_request();
}

#[tokio::test]
async fn rules_apply_by_priority_over_the_api() {
    let (server, _import_dir) = new_test_server();
    let breakfast = create_category(&server, "Breakfast").await;
    let dining = create_category(&server, "Dining").await;

    for (priority, category) in [(1, breakfast), (2, dining)] {
        let response = server
            .post("/api/rules")
            .json(&json!({
                "id": null,
                "priority": priority,
                "resultCategory": category,
                "owner": OWNER,
                "matchName": "coffee",
                "matchAmt": null,
            }))
            .await;
        response.assert_status_ok();
    }

    let transaction = create_transaction(&server, "COFFEE SHOP", 4.5, "2024-03-10").await;

    let applied = server
        .post(&format!("/api/rules/apply/{OWNER}"))
        .await
        .json::<Value>();
    assert_eq!(applied["transactionsMatched"], 1);
    assert_eq!(applied["categoriesApplied"], 1);

    let fetched = server
        .get(&format!("/api/transactions/{transaction}"))
        .await
        .json::<Value>();
    assert_eq!(fetched["category"], breakfast);
}

#[tokio::test]
async fn uncategorized_only_flag_is_honored_over_the_api() {
    let (server, _import_dir) = new_test_server();
    let groceries = create_category(&server, "Groceries").await;
    let dining = create_category(&server, "Dining").await;

    let rule = server
        .post("/api/rules")
        .json(&json!({
            "id": null,
            "priority": 1,
            "resultCategory": dining,
            "owner": OWNER,
            "matchName": "market",
            "matchAmt": null,
        }))
        .await;
    rule.assert_status_ok();

    let transaction = create_transaction(&server, "MARKET STREET", 20.0, "2024-03-10").await;
    // Categorize it by hand first.
    let update = server
        .post("/api/transactions")
        .json(&json!({
            "id": transaction,
            "fitId": "FIT-MARKET STREET",
            "amt": 20.0,
            "type": "debit",
            "date": "2024-03-10",
            "name": "MARKET STREET",
            "category": groceries,
            "account": null,
            "owner": OWNER,
        }))
        .await;
    update.assert_status_ok();

    server
        .post(&format!("/api/rules/apply/{OWNER}?uncategorizedOnly=true"))
        .await
        .assert_status_ok();
    let untouched = server
        .get(&format!("/api/transactions/{transaction}"))
        .await
        .json::<Value>();
    assert_eq!(untouched["category"], groceries);

    server
        .post(&format!("/api/rules/apply/{OWNER}?uncategorizedOnly=false"))
        .await
        .assert_status_ok();
    let reassigned = server
        .get(&format!("/api/transactions/{transaction}"))
        .await
        .json::<Value>();
    assert_eq!(reassigned["category"], dining);
}

#[tokio::test]
async fn splitting_a_transaction_over_the_api() {
    let (server, _import_dir) = new_test_server();
    let groceries = create_category(&server, "Groceries").await;
    let household = create_category(&server, "Household").await;
    let transaction = create_transaction(&server, "BIG BOX", 100.0, "2024-03-10").await;

    let imbalanced = server
        .post(&format!("/api/transactions/{transaction}/split"))
        .json(&json!([
            { "amt": -40.0, "category": groceries },
            { "amt": -59.99, "category": household },
        ]))
        .await;
    imbalanced.assert_status_bad_request();

    let balanced = server
        .post(&format!("/api/transactions/{transaction}/split"))
        .json(&json!([
            { "amt": -40.0, "category": groceries },
            { "amt": -60.0, "category": household },
        ]))
        .await;
    balanced.assert_status_ok();

    let parts = balanced.json::<Value>();
    assert_eq!(parts.as_array().unwrap().len(), 2);
    assert_eq!(parts[0]["fitId"], "FIT-BIG BOX");

    server
        .get(&format!("/api/transactions/{transaction}"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn budget_report_rolls_up_income_and_expenses() {
    let (server, _import_dir) = new_test_server();
    let reserved = ReservedCategories::default();
    let rent = create_category(&server, "Rent").await;

    // A salary budget under the reserved Income category and a rent
    // budget, both monthly.
    for (category, amt) in [(reserved.income, 3000.0), (rent, 2600.0)] {
        let response = server
            .post("/api/budgets")
            .json(&json!({
                "id": null,
                "category": category,
                "amt": amt,
                "period": 1,
                "createDate": "2024-01-01",
                "inactiveDate": null,
                "owner": OWNER,
            }))
            .await;
        response.assert_status_ok();
    }

    let report = server
        .get(&format!("/api/budgets/by-owner/{OWNER}/2024/3"))
        .await
        .json::<Value>();

    assert_eq!(report["budgetedIncome"], 3000.0);
    assert_eq!(report["budgetedExpenses"], 2600.0);
    assert_eq!(report["anticipatedNet"], 400.0);
    assert_eq!(report["income"].as_array().unwrap().len(), 1);
    assert_eq!(report["budgets"].as_array().unwrap().len(), 1);
    // The synthetic Unallocated entry is always present.
    let other = report["other"].as_array().unwrap();
    assert_eq!(other.len(), 1);
    assert_eq!(other[0]["category"]["name"], "Unallocated");
}

#[tokio::test]
async fn budget_delete_is_a_soft_delete() {
    let (server, _import_dir) = new_test_server();
    let rent = create_category(&server, "Rent").await;

    let budget = server
        .post("/api/budgets")
        .json(&json!({
            "id": null,
            "category": rent,
            "amt": 2600.0,
            "period": 1,
            "createDate": "2024-01-01",
            "inactiveDate": null,
            "owner": OWNER,
        }))
        .await
        .json::<Value>();
    let budget_id = budget["id"].as_i64().unwrap();

    let deactivated = server
        .delete(&format!("/api/budgets/{budget_id}"))
        .await
        .json::<Value>();
    assert!(deactivated["inactiveDate"].is_string());

    // The budget is still fetchable after "deletion".
    server
        .get(&format!("/api/budgets/{budget_id}"))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn primary_categories_group_their_subcategories() {
    let (server, _import_dir) = new_test_server();
    let food = create_category(&server, "Food").await;

    let sub = server
        .post("/api/categories")
        .json(&json!({
            "id": null,
            "name": "Restaurants",
            "parentCategory": food,
            "owner": OWNER,
        }))
        .await;
    sub.assert_status_ok();

    let primaries = server
        .get(&format!("/api/categories/by-owner/{OWNER}/primary"))
        .await
        .json::<Value>();

    let food_entry = primaries
        .as_array()
        .unwrap()
        .iter()
        .find(|primary| primary["name"] == "Food")
        .unwrap();
    assert_eq!(food_entry["subcategories"][0]["name"], "Restaurants");
}

#[tokio::test]
async fn importing_a_statement_over_the_api() {
    let (server, import_dir) = new_test_server();

    let institution = server
        .post("/api/institutions")
        .json(&json!({
            "id": null,
            "name": "Test Bank",
            "fitId": "011000138",
            "transFitIdPat": null,
        }))
        .await;
    institution.assert_status_ok();

    let inbox = import_dir.path().join("inbox");
    std::fs::create_dir_all(&inbox).unwrap();
    std::fs::write(
        inbox.join("march.ofx"),
        "<OFX>\n\
         <BANKID>011000138\n\
         <ACCTID>1234567890\n\
         <ACCTTYPE>CHECKING\n\
         <STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20240310<TRNAMT>-45.99<FITID>FIT-A<NAME>COFFEE SHOP<MEMO></STMTTRN>\n\
         <STMTTRN><TRNTYPE>CREDIT<DTPOSTED>20240315<TRNAMT>3000.00<FITID>FIT-B<NAME>PAYROLL<MEMO></STMTTRN>\n\
         </OFX>\n",
    )
    .unwrap();

    let imported = server
        .post(&format!("/api/transactions/import/{OWNER}"))
        .await;
    imported.assert_status_ok();
    let counts = imported.json::<Value>();
    assert_eq!(counts["files"], 1);
    assert_eq!(counts["imported"], 2);
    assert_eq!(counts["skipped"], 0);

    let march = server
        .get(&format!(
            "/api/transactions/by-owner/{OWNER}?year=2024&month=3"
        ))
        .await
        .json::<Value>();
    assert_eq!(march["totalHitCount"], 2);

    let oldest = server
        .get(&format!("/api/transactions/by-owner/{OWNER}/oldest"))
        .await
        .json::<Value>();
    assert_eq!(oldest["name"], "COFFEE SHOP");
    assert_eq!(oldest["date"], "2024-03-10");
}

#[tokio::test]
async fn net_income_trend_summarizes_by_month() {
    let (server, _import_dir) = new_test_server();

    let salary = server
        .post("/api/transactions")
        .json(&json!({
            "id": null,
            "fitId": "FIT-PAY",
            "amt": 3000.0,
            "type": "credit",
            "date": "2024-03-01",
            "name": "PAYROLL",
            "category": null,
            "account": null,
            "owner": OWNER,
        }))
        .await;
    salary.assert_status_ok();
    create_transaction(&server, "RENT", 1200.0, "2024-03-03").await;

    let trend = server
        .get(&format!(
            "/api/trends/net-income/{OWNER}?startDt=2024-03-01&endDt=2024-03-31"
        ))
        .await
        .json::<Value>();

    let months = trend.as_array().unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0]["income"], 3000.0);
    assert_eq!(months[0]["expense"], 1200.0);
    assert_eq!(months[0]["net"], 1800.0);
}
