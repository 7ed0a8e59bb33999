#![cfg(feature = "memory")]

use bson::{Bson, doc};
use recast_client::*;

const ADDR: &str = "memory://local";
const DB: &str = "inventory";

fn seeded() -> MemoryClient {
    let client = MemoryClient::new(ADDR);
    client.insert_many(
        DB,
        "items",
        vec![
            doc! { "_id": 1, "name": "bolt", "note": "zinc" },
            doc! { "_id": 2, "name": "nut", "note": "steel" },
        ],
    );
    client.create_collection(DB, "empty");
    client
}

fn set(id: impl Into<Bson>, fields: bson::Document) -> UpdateOne {
    UpdateOne {
        id: id.into(),
        set: fields,
    }
}

// ── Connection lifecycle ────────────────────────────────────────

#[tokio::test]
async fn connect_to_wrong_address_is_unreachable() {
    let client = seeded();
    let err = client.connect("memory://elsewhere", None).await.unwrap_err();
    assert!(matches!(err, ClientError::Unreachable { .. }));
    assert!(err.to_string().contains("memory://elsewhere"));
    assert_eq!(client.connects(), 0);
}

#[tokio::test]
async fn connect_and_close_are_counted() {
    let client = seeded();
    let session = client.connect(ADDR, None).await.unwrap();
    assert_eq!(client.connects(), 1);
    assert_eq!(client.open_sessions(), 1);

    client.close(session).await;
    assert_eq!(client.closes(), 1);
    assert_eq!(client.open_sessions(), 0);
}

#[tokio::test]
async fn credentials_must_match_when_required() {
    let creds = Credentials {
        username: "svc".into(),
        password: "secret".into(),
        source: None,
    };
    let client = seeded().with_credentials(creds.clone());

    let err = client.connect(ADDR, None).await.unwrap_err();
    assert!(err.to_string().contains("authentication failed"));

    let session = client.connect(ADDR, Some(&creds)).await.unwrap();
    client.close(session).await;
}

// ── Listing and reads ───────────────────────────────────────────

#[tokio::test]
async fn lists_databases_and_collections() {
    let client = seeded();
    let session = client.connect(ADDR, None).await.unwrap();

    assert_eq!(client.list_databases(&session).await.unwrap(), vec![DB]);
    assert_eq!(
        client.list_collections(&session, DB).await.unwrap(),
        vec!["empty", "items"]
    );
    assert!(
        client
            .list_collections(&session, "missing")
            .await
            .unwrap()
            .is_empty()
    );

    client.close(session).await;
}

#[tokio::test]
async fn fetch_all_returns_documents_in_insertion_order() {
    let client = seeded();
    let session = client.connect(ADDR, None).await.unwrap();

    let docs = client.fetch_all(&session, DB, "items").await.unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].get_i32("_id").unwrap(), 1);
    assert!(client.fetch_all(&session, DB, "empty").await.unwrap().is_empty());

    client.close(session).await;
}

// ── Bulk updates ────────────────────────────────────────────────

#[tokio::test]
async fn bulk_update_sets_fields_and_counts() {
    let client = seeded();
    let session = client.connect(ADDR, None).await.unwrap();

    let outcome = client
        .bulk_update(
            &session,
            DB,
            "items",
            vec![
                set(1, doc! { "note": "brass" }),
                set(2, doc! { "note": "steel" }),
                set(3, doc! { "note": "ghost" }),
            ],
        )
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.matched, 2);
    assert_eq!(outcome.modified, 1);
    assert_eq!(
        client.bulk_calls(),
        vec![BulkCall {
            database: DB.into(),
            collection: "items".into(),
            updates: 3,
        }]
    );

    let docs = client.documents(DB, "items");
    assert_eq!(docs[0].get_str("note").unwrap(), "brass");
    assert_eq!(docs[0].get_str("name").unwrap(), "bolt");

    client.close(session).await;
}

#[tokio::test]
async fn rejected_ids_report_write_errors_and_apply_the_rest() {
    let client = seeded();
    client.reject_update("items", 1);
    let session = client.connect(ADDR, None).await.unwrap();

    let outcome = client
        .bulk_update(
            &session,
            DB,
            "items",
            vec![set(1, doc! { "note": "a" }), set(2, doc! { "note": "b" })],
        )
        .await
        .unwrap();

    assert!(!outcome.is_success());
    assert_eq!(outcome.write_errors.len(), 1);
    assert_eq!(outcome.write_errors[0].index, Some(0));
    assert_eq!(client.documents(DB, "items")[1].get_str("note").unwrap(), "b");

    client.close(session).await;
}

#[tokio::test]
async fn failing_bulk_writes_surface_transport_errors() {
    let client = seeded();
    client.fail_bulk_writes();
    let session = client.connect(ADDR, None).await.unwrap();

    let err = client
        .bulk_update(&session, DB, "items", vec![set(1, doc! { "note": "a" })])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert_eq!(client.documents(DB, "items")[0].get_str("note").unwrap(), "zinc");

    client.close(session).await;
}

#[tokio::test]
async fn failing_fetches_surface_transport_errors() {
    let client = seeded();
    client.fail_fetches();
    let session = client.connect(ADDR, None).await.unwrap();

    let err = client.fetch_all(&session, DB, "items").await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    // Listing still works; only reads are broken.
    assert_eq!(client.list_databases(&session).await.unwrap(), vec![DB]);

    client.close(session).await;
    assert_eq!(client.open_sessions(), 0);
}
