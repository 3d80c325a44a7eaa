pub mod auth;
pub mod files;
pub mod health;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/auth")
                    .route("/sign-up", web::post().to(auth::sign_up))
                    .route("/sign-in", web::post().to(auth::sign_in))
                    .route("/otp", web::post().to(auth::resend_otp))
                    .route("/verify", web::post().to(auth::verify))
                    .route("/me", web::get().to(auth::me))
                    .route("/sign-out", web::post().to(auth::sign_out)),
            )
            .service(
                web::scope("/files")
                    .route("", web::post().to(files::upload_file))
                    .route("", web::get().to(files::list_files))
                    .route("/{id}/rename", web::patch().to(files::rename_file))
                    .route("/{id}/users", web::put().to(files::update_file_users))
                    .route("/{id}", web::delete().to(files::delete_file)),
            ),
    );
}
