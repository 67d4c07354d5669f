//! Dashboard client tests against a mocked paydesk server.

use httpmock::Method::{DELETE, GET, POST, PUT};
use httpmock::MockServer;
use paydesk_client::{
    ClientError, ContributionRecord, DashboardClient, PdfOptions, Permission, RecordFilter,
    RecordPage, SbrUpdate, UploadOutcome, display_amount, strip_currency_symbol,
};
use proptest::prelude::*;
use serde_json::json;

const TOKEN: &str = "pd_test-token";

fn client(server: &MockServer) -> DashboardClient {
    DashboardClient::new(&server.base_url(), TOKEN).unwrap()
}

fn record(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "batchDate": "2024-05-01",
        "sss_no": format!("34-{:07}-0", id),
        "name": format!("Employee {:03}", id),
        "ss": "500.00",
        "ec": "10.00",
        "total": "510.00",
        "sbr_no": null,
        "sbr_date": null,
        "created_at": 0,
        "updated_at": 0
    })
}

fn page_of(n: i64) -> RecordPage {
    let records: Vec<ContributionRecord> = (1..=n)
        .map(|id| serde_json::from_value(record(id)).unwrap())
        .collect();
    RecordPage {
        count: records.len(),
        total: None,
        records,
    }
}

#[tokio::test]
async fn list_reads_totals_headers_and_sends_filter() {
    let server = MockServer::start_async().await;
    let list = server.mock(|when, then| {
        when.method(GET)
            .path("/api/record/v1")
            .header("authorization", format!("Bearer {}", TOKEN))
            .query_param("name", "Employee")
            .query_param("from", "2024-01-01")
            .query_param("to", "2024-06-01");
        then.status(200)
            .header("nodex-generated-count", "2")
            .header("nodex-generated-total", "1020.00")
            .json_body(json!([record(1), record(2)]));
    });

    let filter = RecordFilter {
        name: Some("Employee".into()),
        from: Some("2024-01-01".into()),
        to: Some("2024-06-01".into()),
        ..Default::default()
    };
    let page = client(&server).list_records(&filter).await.unwrap();

    list.assert();
    assert_eq!(page.count, 2);
    assert_eq!(page.total.as_deref(), Some("1020.00"));
    assert_eq!(page.records[1].name, "Employee 002");
}

#[tokio::test]
async fn profile_permissions_gate_actions() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/user/v1");
        then.status(200).json_body(json!({
            "id": "u1",
            "email": "viewer@paydesk.test",
            "name": "Viewer",
            "user_permissions": ["view"],
            "created_at": 0
        }));
    });

    let profile = client(&server).profile().await.unwrap();
    assert!(profile.user_permissions.allows(Permission::View));
    assert!(!profile.user_permissions.allows(Permission::Upload));
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_required() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/record/v1");
        then.status(401)
            .json_body(json!({ "status": "error", "message": "Authentication required." }));
    });

    let err = client(&server)
        .list_records(&RecordFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::AuthenticationRequired));
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn validation_errors_keep_every_message() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/api/record/v1/upload");
        then.status(400).json_body(json!({
            "status": "error",
            "message": ["Row 2: ss is not a valid amount", "Row 5: sss_no is required"]
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/record/v1/validate");
        then.status(200).json_body(json!({ "exists": false }));
    });

    let never = |_: &str| -> bool { panic!("no confirmation for a new month") };
    let err = client(&server)
        .upload_batch("2024-05", b"bad".to_vec(), &RecordFilter::default(), &never)
        .await
        .unwrap_err();
    match err {
        ClientError::Validation(messages) => assert_eq!(messages.len(), 2),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn declined_overwrite_does_not_upload() {
    let server = MockServer::start_async().await;
    let validate = server.mock(|when, then| {
        when.method(GET)
            .path("/api/record/v1/validate")
            .query_param("batchDate", "2024-05");
        then.status(200).json_body(json!({ "exists": true }));
    });
    let upload = server.mock(|when, then| {
        when.method(POST).path("/api/record/v1/upload");
        then.status(200).json_body(json!({ "inserted": 1 }));
    });

    let asked = std::cell::Cell::new(None::<String>);
    let decline = |month: &str| {
        asked.set(Some(month.to_string()));
        false
    };
    let outcome = client(&server)
        .upload_batch("2024-05", b"sss_no,name,ss,ec\n".to_vec(), &RecordFilter::default(), &decline)
        .await
        .unwrap();

    validate.assert();
    upload.assert_hits(0);
    assert!(matches!(outcome, UploadOutcome::Declined));
    assert_eq!(asked.take().as_deref(), Some("2024-05"));
}

#[tokio::test]
async fn confirmed_overwrite_uploads_and_refreshes() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/record/v1/validate");
        then.status(200).json_body(json!({ "exists": true }));
    });
    let upload = server.mock(|when, then| {
        when.method(POST)
            .path("/api/record/v1/upload")
            .body_contains("name=\"csv\"")
            .body_contains("name=\"overwrite\"")
            .body_contains("Juan Dela Cruz");
        then.status(200).json_body(json!({
            "status": "success",
            "batchDate": "2024-05-01",
            "inserted": 1,
            "deleted": 3
        }));
    });
    let list = server.mock(|when, then| {
        when.method(GET).path("/api/record/v1");
        then.status(200)
            .header("nodex-generated-count", "1")
            .json_body(json!([record(1)]));
    });

    let csv = b"sss_no,name,ss,ec\n34-0000001-0,Juan Dela Cruz,500,10\n".to_vec();
    let outcome = client(&server)
        .upload_batch("2024-05", csv, &RecordFilter::default(), &|_: &str| true)
        .await
        .unwrap();

    upload.assert();
    list.assert();
    match outcome {
        UploadOutcome::Uploaded {
            inserted,
            deleted,
            page,
        } => {
            assert_eq!((inserted, deleted), (1, 3));
            assert_eq!(page.count, 1);
        }
        UploadOutcome::Declined => panic!("upload was confirmed"),
    }
}

#[tokio::test]
async fn new_month_uploads_without_overwrite_flag() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/record/v1/validate");
        then.status(200).json_body(json!({ "exists": false }));
    });
    let upload = server.mock(|when, then| {
        when.method(POST)
            .path("/api/record/v1/upload")
            .body_contains("name=\"batchDate\"");
        then.status(200).json_body(json!({ "inserted": 2 }));
    });
    let with_overwrite = server.mock(|when, then| {
        when.method(POST)
            .path("/api/record/v1/upload")
            .body_contains("name=\"overwrite\"");
        then.status(500);
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/record/v1");
        then.status(200).json_body(json!([]));
    });

    let outcome = client(&server)
        .upload_batch("2024-06", b"x".to_vec(), &RecordFilter::default(), &|_: &str| true)
        .await
        .unwrap();

    with_overwrite.assert_hits(0);
    upload.assert();
    assert!(matches!(outcome, UploadOutcome::Uploaded { inserted: 2, .. }));
}

#[tokio::test]
async fn pdf_refused_locally_for_large_pages() {
    let server = MockServer::start_async().await;
    let pdf = server.mock(|when, then| {
        when.method(GET).path("/api/record/v1/pdf");
        then.status(200).body("%PDF-1.4");
    });

    let err = client(&server)
        .generate_pdf(&page_of(100), &RecordFilter::default(), &PdfOptions::default())
        .await
        .unwrap_err();

    pdf.assert_hits(0);
    assert!(matches!(
        err,
        ClientError::TooManyRows {
            count: 100,
            limit: 100
        }
    ));
}

#[tokio::test]
async fn pdf_sends_filter_and_display_fields() {
    let server = MockServer::start_async().await;
    let pdf = server.mock(|when, then| {
        when.method(GET)
            .path("/api/record/v1/pdf")
            .header("accept", "application/pdf")
            .query_param("sssNo", "34-0000001")
            .query_param("displayCoverage", "May 2024 up to May 2024");
        then.status(200)
            .header("content-type", "application/pdf")
            .body("%PDF-1.4 test");
    });

    let filter = RecordFilter {
        sss_no: Some("34-0000001".into()),
        ..Default::default()
    };
    let options = PdfOptions {
        display_coverage: Some("May 2024 up to May 2024".into()),
        ..Default::default()
    };
    let bytes = client(&server)
        .generate_pdf(&page_of(99), &filter, &options)
        .await
        .unwrap();

    pdf.assert();
    assert!(bytes.starts_with(b"%PDF-1.4"));
}

#[tokio::test]
async fn batch_delete_reports_count() {
    let server = MockServer::start_async().await;
    let delete = server.mock(|when, then| {
        when.method(DELETE)
            .path("/api/record/v1/batch/delete")
            .json_body(json!({ "date": "2024-05" }));
        then.status(200)
            .json_body(json!({ "status": "success", "deleted": 7 }));
    });

    let deleted = client(&server).delete_batch("2024-05").await.unwrap();
    delete.assert();
    assert_eq!(deleted, 7);
}

#[tokio::test]
async fn forbidden_carries_server_message() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(DELETE).path("/api/record/v1/3");
        then.status(403).json_body(json!({
            "status": "error",
            "message": "Insufficient permissions: delete permission required"
        }));
    });

    let err = client(&server).delete_record(3).await.unwrap_err();
    match err {
        ClientError::PermissionDenied(message) => assert!(message.contains("delete")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn sbr_edit_form_sends_raw_amounts() {
    let server = MockServer::start_async().await;
    let update = server.mock(|when, then| {
        when.method(PUT)
            .path("/api/record/v1/4/sbr")
            .json_body(json!({
                "sbr_no": "SBR-2024-05",
                "sbr_date": "",
                "sss_no": "34-0000004-0",
                "name": "Employee 004",
                "ss": "500.00",
                "ec": "10.00",
                "total": "510.00"
            }));
        then.status(200).json_body(record(4));
    });

    let mut shown: ContributionRecord = serde_json::from_value(record(4)).unwrap();
    shown.ss = display_amount(&shown.ss);
    shown.ec = display_amount(&shown.ec);
    shown.total = display_amount(&shown.total);
    shown.sbr_no = Some("SBR-2024-05".into());

    let saved = client(&server)
        .update_sbr(4, &SbrUpdate::from_edit_form(&shown))
        .await
        .unwrap();

    update.assert();
    assert_eq!(saved.total, "510.00");
}

#[test]
fn rejects_invalid_base_url() {
    assert!(matches!(
        DashboardClient::new("not a url", TOKEN),
        Err(ClientError::InvalidUrl(_))
    ));
    assert!(matches!(
        DashboardClient::new("ftp://paydesk.test", TOKEN),
        Err(ClientError::InvalidUrl(_))
    ));
}

proptest! {
    #[test]
    fn currency_prefix_round_trips(whole in 0u64..10_000_000, cents in 0u8..100) {
        let raw = format!("{}.{:02}", whole, cents);
        let shown = display_amount(&raw);
        prop_assert!(shown.starts_with('₱'));
        prop_assert_eq!(strip_currency_symbol(&shown), raw.as_str());
    }
}
