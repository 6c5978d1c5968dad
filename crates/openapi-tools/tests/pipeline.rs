use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};
use axum::routing::any;
use mcprox_http_tools::request::HttpMethod;
use mcprox_http_tools::runtime::HttpInvoker;
use mcprox_openapi_tools::catalog::ToolCatalog;
use mcprox_openapi_tools::config::{CompilerOptions, ServiceTarget};
use mcprox_openapi_tools::error::OpenApiToolsError;
use mcprox_openapi_tools::tools::{ParamLocation, PrimitiveType};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpListener;

fn bookstore_3_1() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "openapi": "3.1.0",
        "info": {"title": "Bookstore", "version": "2.0"},
        "paths": {
            "/books": {
                "get": {
                    "summary": "List books",
                    "parameters": [
                        {"name": "genre", "in": "query", "schema": {"type": "string", "enum": ["scifi", "poetry"]}},
                        {"name": "max-price", "in": "query", "schema": {"anyOf": [{"type": "number"}, {"type": "null"}]}},
                        {"name": "X-Api-Version", "in": "header", "required": true, "schema": {"type": "string"}}
                    ],
                    "responses": {"200": {"description": "ok"}}
                },
                "post": {
                    "description": "Add a book",
                    "requestBody": {
                        "required": true,
                        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Book"}}}
                    },
                    "responses": {"201": {"description": "created"}}
                }
            },
            "/books/{book-id}": {
                "parameters": [
                    {"name": "book-id", "in": "path", "required": true, "schema": {"type": "integer"}}
                ],
                "delete": {"responses": {"204": {"description": "gone"}}}
            }
        },
        "components": {"schemas": {
            "Book": {
                "type": "object",
                "error_messages": {"title": "required"},
                "properties": {
                    "title": {"type": "string"},
                    "subtitle": {"anyOf": [{"type": "string"}, {"type": "null"}]},
                    "authors": {"type": "array", "items": {"anyOf": [{"type": "string"}, {"type": "null"}]}}
                }
            }
        }}
    }))
    .unwrap()
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> axum::Json<Value> {
    axum::Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "authorization": headers.get("authorization").and_then(|v| v.to_str().ok()),
        "apiVersion": headers.get("x-api-version").and_then(|v| v.to_str().ok()),
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn spawn_echo() -> (
    String,
    tokio::sync::oneshot::Sender<()>,
    tokio::task::JoinHandle<std::io::Result<()>>,
) {
    let app = Router::new().route("/{*path}", any(echo));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = shutdown_rx.await;
    });
    let handle = tokio::spawn(async move { server.await });
    (format!("http://{addr}/"), shutdown_tx, handle)
}

#[test]
fn compiles_3_1_document_into_ordered_tools() {
    let catalog =
        ToolCatalog::from_document_bytes(&bookstore_3_1(), &CompilerOptions::default()).unwrap();
    let ids: Vec<&str> = catalog.tools().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["getBooks", "postBooks", "deleteBooks_book_id"]);

    let list = catalog.get("getBooks").unwrap();
    assert_eq!(list.description, "List books");
    let names: Vec<&str> = list.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["X-Api-Version", "genre", "max-price"]);
    assert_eq!(list.parameters[0].location, ParamLocation::Header);
    assert_eq!(
        list.parameters[1].enum_values,
        Some(vec!["scifi".to_string(), "poetry".to_string()])
    );
    assert_eq!(list.parameters[2].primitive_type, PrimitiveType::Number);
    assert_eq!(list.parameters[2].sanitized_name, "max_price");

    let create = catalog.get("postBooks").unwrap();
    assert_eq!(create.description, "Add a book");
    assert!(create.has_body() && create.body_required());

    let delete = catalog.get("deleteBooks_book_id").unwrap();
    assert_eq!(delete.method, HttpMethod::Delete);
    assert_eq!(delete.parameters[0].primitive_type, PrimitiveType::Integer);
    assert_eq!(delete.description, "DELETE /books/{book-id}");
}

#[test]
fn catalog_exports_stable_json() {
    let a = ToolCatalog::from_document_bytes(&bookstore_3_1(), &CompilerOptions::default()).unwrap();
    let b = ToolCatalog::from_document_bytes(&bookstore_3_1(), &CompilerOptions::default()).unwrap();
    let export_a = serde_json::to_string(a.tools()).unwrap();
    let export_b = serde_json::to_string(b.tools()).unwrap();
    assert_eq!(export_a, export_b);

    let exported: Value = serde_json::from_str(&export_a).unwrap();
    assert_eq!(exported[0]["parameters"][2]["sanitizedName"], "max_price");
    assert_eq!(exported[1]["body"]["mediaType"], "application/json");
}

#[test]
fn swagger_2_documents_fail_validation() {
    let raw = br#"{"swagger":"2.0","info":{"title":"t","version":"1"},"paths":{}}"#;
    let err = ToolCatalog::from_document_bytes(raw, &CompilerOptions::default()).unwrap_err();
    assert!(matches!(err, OpenApiToolsError::Validation(_)), "{err}");
}

#[tokio::test]
async fn call_tool_sends_planned_request() {
    let (base, shutdown_tx, handle) = spawn_echo().await;
    let catalog =
        ToolCatalog::from_document_bytes(&bookstore_3_1(), &CompilerOptions::default()).unwrap();
    let target = ServiceTarget::new(base).with_authorization("Bearer t0k");
    let invoker = HttpInvoker::new(Duration::from_secs(10)).unwrap();

    let result = catalog
        .call_tool(
            "getBooks",
            &json!({"genre": "scifi", "max-price": 9.5, "X-Api-Version": "2"}),
            &target,
            &invoker,
        )
        .await
        .unwrap();
    let text = result.content[0].as_text().unwrap().text.clone();
    let echoed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(echoed["method"], "GET");
    assert_eq!(echoed["path"], "/books");
    assert_eq!(echoed["query"], "genre=scifi&max-price=9.5");
    assert_eq!(echoed["authorization"], "Bearer t0k");
    assert_eq!(echoed["apiVersion"], "2");
    assert_eq!(echoed["body"], "");

    let result = catalog
        .call_tool(
            "postBooks",
            &json!({"title": "Dune", "subtitle": null}),
            &target,
            &invoker,
        )
        .await
        .unwrap();
    let text = result.content[0].as_text().unwrap().text.clone();
    let echoed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(echoed["method"], "POST");
    let sent: Value = serde_json::from_str(echoed["body"].as_str().unwrap()).unwrap();
    assert_eq!(sent, json!({"title": "Dune", "subtitle": null}));

    let result = catalog
        .call_tool("deleteBooks_book_id", &json!({"book-id": 12}), &target, &invoker)
        .await
        .unwrap();
    let text = result.content[0].as_text().unwrap().text.clone();
    let echoed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(echoed["method"], "DELETE");
    assert_eq!(echoed["path"], "/books/12");

    let _ = shutdown_tx.send(());
    handle.await.unwrap().unwrap();
}
