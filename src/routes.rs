//! The route table: every (method, path) the service answers.

use actix_web::web;

use crate::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::root))
        .route("/ping", web::get().to(handlers::ping))
        .route("/health", web::get().to(handlers::health))
        .service(
            web::scope("/convert")
                .route("/pdf-to-word", web::post().to(handlers::pdf_to_word))
                .route("/word-to-pdf", web::post().to(handlers::office_to_pdf))
                .route("/excel-to-pdf", web::post().to(handlers::office_to_pdf))
                .route("/ppt-to-pdf", web::post().to(handlers::office_to_pdf))
                .route("/pdf-to-jpg", web::post().to(handlers::pdf_to_jpg))
                .route("/jpg-to-pdf", web::post().to(handlers::jpg_to_pdf))
                .route("/pdf-to-excel", web::post().to(handlers::pdf_to_excel))
                .route("/pdf-to-ppt", web::post().to(handlers::pdf_to_ppt))
                .route("/html-to-pdf", web::post().to(handlers::html_to_pdf)),
        )
        .service(
            web::scope("/tools")
                .route("/merge", web::post().to(handlers::merge))
                .route("/split", web::post().to(handlers::split))
                .route("/extract", web::post().to(handlers::extract))
                .route("/delete-pages", web::post().to(handlers::delete_pages))
                .route("/reorder", web::post().to(handlers::reorder))
                .route("/rotate", web::post().to(handlers::rotate))
                .route("/watermark-text", web::post().to(handlers::watermark_text))
                .route("/add-page-numbers", web::post().to(handlers::add_page_numbers))
                .route("/edit/add-text", web::post().to(handlers::add_text))
                .route("/protect", web::post().to(handlers::protect))
                .route("/unlock", web::post().to(handlers::unlock))
                .route("/repair", web::post().to(handlers::repair))
                .route("/pdfa", web::post().to(handlers::pdfa))
                .route("/ocr", web::post().to(handlers::ocr)),
        );
}
