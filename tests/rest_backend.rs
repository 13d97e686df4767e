mod common;

use std::sync::Arc;

use common::mock_backend::{MockBackend, MockResponse};
use common::{free_port, rest_backend, TEST_KEY};
use futures::TryStreamExt;
use recipe_catalog::backend::{AuthService, ObjectStore, RowStore, Selection};
use recipe_catalog::config::CatalogSettings;
use recipe_catalog::enrich::IngredientEnricher;
use recipe_catalog::images::ImageRegistry;
use recipe_catalog::model::{RecipeDraft, RecipePatch};
use recipe_catalog::query::{QueryExecutor, QuerySpec};
use recipe_catalog::writes::RecipeWriter;
use recipe_catalog::CatalogError;
use serde_json::json;

fn pair(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

#[tokio::test]
async fn test_select_wire_format() {
    let mock = MockBackend::start().await;
    mock.enqueue_response(MockResponse::json(
        r#"[{"idIngredient": "1", "strIngredient": "Tomato"}]"#,
    ))
    .await;

    let executor = QueryExecutor::new(Arc::new(rest_backend(&mock.base_url())));
    let spec = QuerySpec::new("ingredients")
        .filter("strType", "Vegetable")
        .id_field("idIngredient")
        .ids(vec![Some("1"), None, Some("2")]);
    let rows = executor.execute(&spec).await.unwrap();
    assert_eq!(rows.len(), 1);

    let requests = mock.captured_requests().await;
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.method, "GET");
    assert_eq!(req.path, "/rest/v1/ingredients");
    assert_eq!(
        req.query_pairs(),
        vec![
            pair("select", "*"),
            pair("strType", "eq.Vegetable"),
            pair("idIngredient", r#"in.("1","2")"#),
        ]
    );
    assert_eq!(req.header("apikey"), Some(TEST_KEY));
    assert_eq!(
        req.header("authorization"),
        Some(format!("Bearer {}", TEST_KEY).as_str())
    );
}

#[tokio::test]
async fn test_empty_id_set_sends_no_request() {
    let mock = MockBackend::start().await;
    let executor = QueryExecutor::new(Arc::new(rest_backend(&mock.base_url())));

    let rows = executor
        .execute(&QuerySpec::new("ingredients").ids(vec![None::<String>]))
        .await
        .unwrap();

    assert!(rows.is_empty());
    assert!(mock.captured_requests().await.is_empty());
}

#[tokio::test]
async fn test_backend_error_is_normalized() {
    let mock = MockBackend::start().await;
    mock.enqueue_response(MockResponse::error(
        404,
        "42P01",
        "relation \"public.nope\" does not exist",
    ))
    .await;

    let executor = QueryExecutor::new(Arc::new(rest_backend(&mock.base_url())));
    let err = executor.execute(&QuerySpec::new("nope")).await.unwrap_err();

    match err {
        CatalogError::Backend {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 404);
            assert_eq!(code.as_deref(), Some("42P01"));
            assert_eq!(message, "relation \"public.nope\" does not exist");
        }
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_auth_error_shape_is_normalized() {
    let mock = MockBackend::start().await;
    mock.enqueue_response(
        MockResponse::json(
            r#"{"error": "invalid_grant", "error_description": "Invalid login credentials"}"#,
        )
        .with_status(400),
    )
    .await;

    let backend = rest_backend(&mock.base_url());
    let err = backend
        .sign_in_with_password("a@b.c", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::Backend { status: 400, .. }));
    assert_eq!(err.message(), "Invalid login credentials");
}

#[tokio::test]
async fn test_transport_error_against_closed_port() {
    let url = format!("http://127.0.0.1:{}", free_port());
    let executor = QueryExecutor::new(Arc::new(rest_backend(&url)));

    let err = executor.execute(&QuerySpec::new("meals")).await.unwrap_err();
    match err {
        CatalogError::Transport { endpoint, .. } => {
            assert!(endpoint.contains("/rest/v1/meals"));
        }
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_insert_and_update_wire_format() {
    let mock = MockBackend::start().await;
    let backend = Arc::new(rest_backend(&mock.base_url()));
    let writer = RecipeWriter::new(backend, &CatalogSettings::default());

    mock.route("GET", "/rest/v1/meals", MockResponse::json(r#"[{"idMeal": "41"}]"#))
        .await;
    mock.route(
        "POST",
        "/rest/v1/meals",
        MockResponse::json(r#"{"idMeal": "42", "strMeal": "Pie", "idIngredients": []}"#)
            .with_status(201),
    )
    .await;
    mock.route(
        "PATCH",
        "/rest/v1/meals",
        MockResponse::json(r#"{"idMeal": "42", "strMeal": "Tart"}"#),
    )
    .await;

    let created = writer
        .create_next(RecipeDraft {
            name: "Pie".to_string(),
            ..RecipeDraft::default()
        })
        .await
        .unwrap();
    assert_eq!(created.id, "42");

    let updated = writer
        .update("42", &RecipePatch::default().name("Tart"))
        .await
        .unwrap();
    assert_eq!(updated.name, "Tart");

    let requests = mock.captured_requests().await;
    assert_eq!(requests.len(), 3);

    let last_id = &requests[0];
    assert_eq!(
        last_id.query_pairs(),
        vec![
            pair("select", "idMeal"),
            pair("order", "idMeal.desc"),
            pair("limit", "1"),
        ]
    );

    let insert = &requests[1];
    assert_eq!(insert.method, "POST");
    assert_eq!(insert.header("prefer"), Some("return=representation"));
    assert_eq!(
        insert.header("accept"),
        Some("application/vnd.pgrst.object+json")
    );
    let body = insert.json_body();
    assert_eq!(body[0]["idMeal"], json!("42"));
    assert_eq!(body[0]["strMeal"], json!("Pie"));

    let update = &requests[2];
    assert_eq!(update.method, "PATCH");
    assert_eq!(update.query_pairs(), vec![pair("idMeal", "eq.42")]);
    assert_eq!(update.json_body(), json!({"strMeal": "Tart"}));
}

#[tokio::test]
async fn test_update_without_match_is_error() {
    let mock = MockBackend::start().await;
    mock.enqueue_response(MockResponse::error(
        406,
        "PGRST116",
        "JSON object requested, multiple (or no) rows returned",
    ))
    .await;

    let backend = rest_backend(&mock.base_url());
    let err = backend
        .update("meals", "idMeal", "404", serde_json::Map::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_download_path_and_cache_token() {
    let mock = MockBackend::start().await;
    mock.route(
        "GET",
        "/rest/v1/ingredients",
        MockResponse::json(
            r#"[{"idIngredient": "1", "strStorageimg": "img/tomato.png"},
                {"idIngredient": "2", "strStorageimg": "img/garlic.png"}]"#,
        ),
    )
    .await;
    mock.route(
        "GET",
        "/storage/v1/object/recipes/img/tomato.png",
        MockResponse::bytes(b"tomato"),
    )
    .await;
    mock.route(
        "GET",
        "/storage/v1/object/recipes/img/garlic.png",
        MockResponse::error(400, "404", "Object not found"),
    )
    .await;

    let backend = Arc::new(rest_backend(&mock.base_url()));
    let images = ImageRegistry::new();
    let enricher = IngredientEnricher::new(
        QueryExecutor::new(backend.clone()),
        backend,
        images.clone(),
        &CatalogSettings::default(),
    );

    let items: Vec<_> = enricher
        .enrich(vec![Some("1".to_string()), Some("2".to_string())])
        .try_collect()
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    let tomato = items.iter().find(|i| i.ingredient.id == "1").unwrap();
    assert_eq!(tomato.image.as_ref().unwrap().bytes().as_deref(), Some(&b"tomato"[..]));
    let garlic = items.iter().find(|i| i.ingredient.id == "2").unwrap();
    assert!(!garlic.has_image());

    let downloads: Vec<_> = mock
        .captured_requests()
        .await
        .into_iter()
        .filter(|r| r.path.starts_with("/storage/"))
        .collect();
    assert_eq!(downloads.len(), 2);
    for download in downloads {
        let token = download.query.unwrap_or_default();
        assert!(token.starts_with("rand="));
        assert!(token.len() > "rand=".len());
    }
}

#[tokio::test]
async fn test_object_download_direct() {
    let mock = MockBackend::start().await;
    mock.enqueue_response(MockResponse::bytes(b"\x89PNG")).await;

    let backend = rest_backend(&mock.base_url());
    let bytes = backend.download("recipes", "/salt.png", None).await.unwrap();
    assert_eq!(&bytes[..], b"\x89PNG");

    let requests = mock.captured_requests().await;
    assert_eq!(requests[0].path, "/storage/v1/object/recipes/salt.png");
    assert_eq!(requests[0].query, None);
}

#[tokio::test]
async fn test_download_path_with_reserved_characters() {
    let mock = MockBackend::start().await;
    mock.route(
        "GET",
        "/rest/v1/ingredients",
        MockResponse::json(r#"[{"idIngredient": "1", "strStorageimg": "img/#1 tomato.png"}]"#),
    )
    .await;
    mock.route(
        "GET",
        "/storage/v1/object/recipes/img/%231%20tomato.png",
        MockResponse::bytes(b"tomato"),
    )
    .await;

    let backend = Arc::new(rest_backend(&mock.base_url()));
    let enricher = IngredientEnricher::new(
        QueryExecutor::new(backend.clone()),
        backend,
        ImageRegistry::new(),
        &CatalogSettings::default(),
    );

    let items: Vec<_> = enricher
        .enrich(vec![Some("1".to_string())])
        .try_collect()
        .await
        .unwrap();
    assert!(items[0].has_image());

    let requests = mock.captured_requests().await;
    let download = requests
        .iter()
        .find(|r| r.path.starts_with("/storage/"))
        .unwrap();
    assert_eq!(download.path, "/storage/v1/object/recipes/img/%231%20tomato.png");
    let query = download.query_pairs();
    assert_eq!(query.len(), 1);
    assert_eq!(query[0].0, "rand");
    assert_eq!(query[0].1.len(), 32);
}

#[tokio::test]
async fn test_selection_limit_only() {
    let mock = MockBackend::start().await;
    let backend = rest_backend(&mock.base_url());

    backend
        .select("meals", &Selection::all().limit(5))
        .await
        .unwrap();

    let requests = mock.captured_requests().await;
    assert_eq!(
        requests[0].query_pairs(),
        vec![pair("select", "*"), pair("limit", "5")]
    );
}
