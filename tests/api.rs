mod common;

use actix_web::http::{header, StatusCode};
use actix_web::dev::ServiceResponse;
use actix_web::{test, web, App};
use image::ImageOutputFormat;
use serde_json::Value;
use std::io::{Cursor, Read};

use common::{fake_engines, image_bytes, page_labels, sample_pdf, MultipartBody};
use pdf_tools_gateway::{routes, DocumentConverter, GatewayConfig};

fn converter(raster_pages: u32) -> DocumentConverter {
    DocumentConverter::with_engines(GatewayConfig::default(), fake_engines(raster_pages))
}

macro_rules! app {
    ($converter:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($converter))
                .configure(routes::configure),
        )
        .await
    };
}

fn post(uri: &str, form: MultipartBody) -> test::TestRequest {
    let (content_type, body) = form.finish();
    test::TestRequest::post()
        .uri(uri)
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
}

fn disposition<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn zip_names(content: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(content)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

#[actix_web::test]
async fn test_ping() {
    let app = app!(converter(1));
    let req = test::TestRequest::get().uri("/ping").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "pong");
}

#[actix_web::test]
async fn test_health_lists_engines() {
    let app = app!(converter(1));
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
    let engines = body["engines"].as_array().unwrap();
    assert!(engines.iter().any(|e| e == "fake-office"));
}

#[actix_web::test]
async fn test_extract_returns_selected_pages() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("file", "report.pdf", &sample_pdf(6))
        .text("pages", "5-6, 2");

    let resp = test::call_service(&app, post("/tools/extract", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(disposition(&resp), "attachment; filename=\"extracted.pdf\"");

    let body = test::read_body(resp).await;
    assert_eq!(page_labels(&body), vec!["Page 2", "Page 5", "Page 6"]);
}

#[actix_web::test]
async fn test_extract_bad_spec_is_bad_request() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("file", "report.pdf", &sample_pdf(3))
        .text("pages", "3-1");

    let resp = test::call_service(&app, post("/tools/extract", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["detail"].as_str().unwrap().contains("3-1"));
}

#[actix_web::test]
async fn test_extract_without_pages_field() {
    let app = app!(converter(1));
    let form = MultipartBody::new().pdf("file", "report.pdf", &sample_pdf(3));

    let resp = test::call_service(&app, post("/tools/extract", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn test_reorder_out_of_range() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("file", "report.pdf", &sample_pdf(3))
        .text("order", "3,1,4");

    let resp = test::call_service(&app, post("/tools/reorder", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_reorder_clones_repeated_pages() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("file", "report.pdf", &sample_pdf(3))
        .text("order", "2,2,1");

    let resp = test::call_service(&app, post("/tools/reorder", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert_eq!(page_labels(&body), vec!["Page 2", "Page 2", "Page 1"]);
}

#[actix_web::test]
async fn test_delete_pages() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("file", "report.pdf", &sample_pdf(5))
        .text("pages", "2,4-5");

    let resp = test::call_service(&app, post("/tools/delete-pages", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert_eq!(page_labels(&body), vec!["Page 1", "Page 3"]);
}

#[actix_web::test]
async fn test_rotate_page_set() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("file", "report.pdf", &sample_pdf(3))
        .text("pages", "1-2")
        .text("degrees", "-90");

    let resp = test::call_service(&app, post("/tools/rotate", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = test::read_body(resp).await;
    let doc = lopdf::Document::load_mem(&body).unwrap();
    let rotations: Vec<i64> = doc
        .get_pages()
        .into_values()
        .map(|id| {
            doc.get_dictionary(id)
                .unwrap()
                .get(b"Rotate")
                .and_then(|r| r.as_i64())
                .unwrap_or(0)
        })
        .collect();
    assert_eq!(rotations, vec![270, 270, 0]);
}

#[actix_web::test]
async fn test_rotate_rejects_odd_angles() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("file", "report.pdf", &sample_pdf(2))
        .text("page", "1")
        .text("degrees", "45");

    let resp = test::call_service(&app, post("/tools/rotate", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_rotate_single_page_field_rejects_lists() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("file", "report.pdf", &sample_pdf(3))
        .text("page", "1,2")
        .text("degrees", "90");

    let resp = test::call_service(&app, post("/tools/rotate", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn test_merge_in_upload_order() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("files", "a.pdf", &sample_pdf(2))
        .pdf("files", "b.pdf", &sample_pdf(1));

    let resp = test::call_service(&app, post("/tools/merge", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert_eq!(page_labels(&body), vec!["Page 1", "Page 2", "Page 1"]);
}

#[actix_web::test]
async fn test_split_selected_pages() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("file", "report.pdf", &sample_pdf(4))
        .text("pages", "4,2");

    let resp = test::call_service(&app, post("/tools/split", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(disposition(&resp), "attachment; filename=\"pages.zip\"");

    let body = test::read_body(resp).await;
    assert_eq!(zip_names(&body), vec!["page_2.pdf", "page_4.pdf"]);

    let mut archive = zip::ZipArchive::new(Cursor::new(body.to_vec())).unwrap();
    let mut page = Vec::new();
    archive.by_name("page_4.pdf").unwrap().read_to_end(&mut page).unwrap();
    assert_eq!(page_labels(&page), vec!["Page 4"]);
}

#[actix_web::test]
async fn test_pdf_to_jpg_zip_for_many_pages() {
    let app = app!(converter(3));
    let form = MultipartBody::new().pdf("file", "report.pdf", &sample_pdf(3));

    let resp = test::call_service(&app, post("/convert/pdf-to-jpg", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert_eq!(zip_names(&body), vec!["page_1.jpg", "page_2.jpg", "page_3.jpg"]);
}

#[actix_web::test]
async fn test_pdf_to_jpg_single_page() {
    let app = app!(converter(1));
    let form = MultipartBody::new().pdf("file", "report.pdf", &sample_pdf(1));

    let resp = test::call_service(&app, post("/convert/pdf-to-jpg", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/jpeg");
}

#[actix_web::test]
async fn test_jpg_to_pdf() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .file("files", "a.png", "image/png", &image_bytes(30, 10, ImageOutputFormat::Png))
        .file("files", "b.jpg", "image/jpeg", &image_bytes(10, 30, ImageOutputFormat::Jpeg(90)));

    let resp = test::call_service(&app, post("/convert/jpg-to-pdf", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let doc = lopdf::Document::load_mem(&body).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
}

#[actix_web::test]
async fn test_word_to_pdf_names_output_after_upload() {
    let app = app!(converter(1));
    let form = MultipartBody::new().file(
        "file",
        "Quarterly Report.docx",
        "application/octet-stream",
        b"docx",
    );

    let resp = test::call_service(&app, post("/convert/word-to-pdf", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(disposition(&resp), "attachment; filename=\"Quarterly Report.pdf\"");
    assert_eq!(&test::read_body(resp).await[..], b"%PDF-office");
}

#[actix_web::test]
async fn test_non_ascii_upload_name_survives_in_header() {
    let app = app!(converter(1));
    let form = MultipartBody::new().file("file", "Résumé.docx", "application/octet-stream", b"docx");

    let resp = test::call_service(&app, post("/convert/word-to-pdf", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let value = disposition(&resp);
    assert!(value.is_ascii(), "got: {value}");
    assert!(value.starts_with("attachment; filename=\"R_sum_.pdf\""), "got: {value}");
    assert!(value.contains("filename*=UTF-8''R%C3%A9sum%C3%A9.pdf"), "got: {value}");
}

#[actix_web::test]
async fn test_pdf_to_excel_without_tables() {
    let app = app!(converter(1));
    let form = MultipartBody::new().pdf("file", "report.pdf", &sample_pdf(1));

    let resp = test::call_service(&app, post("/convert/pdf-to-excel", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "No tables found");
}

#[actix_web::test]
async fn test_unlock_wrong_password() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("file", "locked.pdf", &sample_pdf(1))
        .text("password", "guess");

    let resp = test::call_service(&app, post("/tools/unlock", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_unlock_right_password() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("file", "locked.pdf", &sample_pdf(1))
        .text("password", "secret");

    let resp = test::call_service(&app, post("/tools/unlock", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(disposition(&resp), "attachment; filename=\"unlocked.pdf\"");
}

#[actix_web::test]
async fn test_ocr_joins_pages() {
    let app = app!(converter(2));
    let form = MultipartBody::new().pdf("file", "scan.pdf", &sample_pdf(2));

    let resp = test::call_service(&app, post("/tools/ocr", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["text"], "text of page-1\ntext of page-2");
}

#[actix_web::test]
async fn test_add_page_numbers_and_watermark() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("file", "report.pdf", &sample_pdf(2))
        .text("start", "10");
    let resp = test::call_service(&app, post("/tools/add-page-numbers", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let numbered = test::read_body(resp).await;

    let form = MultipartBody::new()
        .pdf("file", "report.pdf", &numbered)
        .text("text", "DRAFT");
    let resp = test::call_service(&app, post("/tools/watermark-text", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = test::read_body(resp).await;
    let doc = lopdf::Document::load_mem(&body).unwrap();
    let last = *doc.get_pages().get(&2).unwrap();
    let content = String::from_utf8_lossy(&doc.get_page_content(last).unwrap()).into_owned();
    assert!(content.contains("(11)"), "got: {content}");
    assert!(content.contains("(DRAFT)"), "got: {content}");
}

#[actix_web::test]
async fn test_page_numbers_overflowing_start() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("file", "report.pdf", &sample_pdf(2))
        .text("start", &i64::MAX.to_string());

    let resp = test::call_service(&app, post("/tools/add-page-numbers", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn test_non_finite_numbers_rejected() {
    let app = app!(converter(1));
    let form = MultipartBody::new()
        .pdf("file", "report.pdf", &sample_pdf(1))
        .text("text", "DRAFT")
        .text("fontsize", "inf");
    let resp = test::call_service(&app, post("/tools/watermark-text", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let form = MultipartBody::new()
        .pdf("file", "report.pdf", &sample_pdf(1))
        .text("page", "1")
        .text("x", "NaN")
        .text("y", "10")
        .text("text", "hi");
    let resp = test::call_service(&app, post("/tools/edit/add-text", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["detail"].as_str().unwrap().contains("'x'"), "got: {body}");
}

#[actix_web::test]
async fn test_upload_limit() {
    let config = GatewayConfig {
        max_upload_bytes: 64,
        ..GatewayConfig::default()
    };
    let app = app!(DocumentConverter::with_engines(config, fake_engines(1)));
    let form = MultipartBody::new().pdf("file", "big.pdf", &sample_pdf(3));

    let resp = test::call_service(&app, post("/tools/repair", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[actix_web::test]
async fn test_pdf_to_ppt_goes_through_slides_engine() {
    let app = app!(converter(2));
    let form = MultipartBody::new().pdf("file", "deck.pdf", &sample_pdf(2));

    let resp = test::call_service(&app, post("/convert/pdf-to-ppt", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(disposition(&resp), "attachment; filename=\"converted.pptx\"");
    assert_eq!(&test::read_body(resp).await[..], b"pptx-bytes");
}

#[actix_web::test]
async fn test_html_to_pdf_requires_html_field() {
    let app = app!(converter(1));

    let form = MultipartBody::new().text("html", "<h1>Hello</h1>");
    let resp = test::call_service(&app, post("/convert/html-to-pdf", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&test::read_body(resp).await[..], b"%PDF-html");

    let form = MultipartBody::new().text("markup", "<h1>Hello</h1>");
    let resp = test::call_service(&app, post("/convert/html-to-pdf", form).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Missing form field 'html'");
}
