use crate::{
    api::{analytics, attendance, live, reports, selfie, students},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    store::photos::PhotoStore,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Context, Result};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-IP limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct RateLimiters {
    login: Limiter,
    refresh: Limiter,
    protected: Limiter,
}

fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let burst = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(60_000 / u64::from(burst))
        .burst_size(burst)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .with_context(|| format!("invalid rate limit of {requests_per_min}/min"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

impl RateLimiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(RateLimiters {
            login: build_limiter(config.rate_login_per_min)?,
            refresh: build_limiter(config.rate_refresh_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &RateLimiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::student_login)),
            )
            .service(
                web::resource("/teacher/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::teacher_login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Stored selfies, public so <img> tags can load them
    let photos = PhotoStore::from_config(config);
    if let Some(path) = photos.route() {
        cfg.service(
            web::resource(path)
                .app_data(web::Data::new(photos))
                .route(web::get().to(selfie::photo)),
        );
    }

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(
                web::scope("/students")
                    // /students
                    .service(
                        web::resource("")
                            .route(web::get().to(students::list_students))
                            .route(web::post().to(students::enroll_student)),
                    )
                    // /students/me
                    .service(web::resource("/me").route(web::get().to(students::me))),
            )
            .service(
                web::scope("/attendance")
                    .service(web::resource("").route(web::get().to(attendance::daily_table)))
                    .service(web::resource("/logs").route(web::get().to(attendance::list_logs)))
                    .service(web::resource("/me").route(web::get().to(attendance::my_attendance)))
                    .service(web::resource("/live").route(web::get().to(live::live))),
            )
            .service(
                web::scope("/analytics")
                    .service(web::resource("/monthly").route(web::get().to(analytics::monthly)))
                    .service(web::resource("/daily").route(web::get().to(analytics::daily)))
                    .service(web::resource("/students").route(web::get().to(analytics::students))),
            )
            .service(
                web::scope("/selfie")
                    .service(web::resource("").route(web::post().to(selfie::upload)))
                    .service(web::resource("/window").route(web::get().to(selfie::window))),
            )
            .service(
                web::scope("/reports")
                    .service(web::resource("/daily").route(web::get().to(reports::daily)))
                    .service(web::resource("/monthly").route(web::get().to(reports::monthly)))
                    .service(web::resource("/defaulters").route(web::get().to(reports::defaulters))),
            ),
    );
}

// LOGIN (student: /auth/login, teacher: /auth/teacher/login)
//  ├─ access_token
//  └─ refresh_token

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new pair, old refresh token revoked

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{
        App,
        http::StatusCode,
        test::{TestRequest, call_service, init_service, read_body},
        web::Data,
    };

    #[test]
    fn zero_rate_still_builds_a_limiter() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(120).is_ok());
    }

    #[actix_web::test]
    async fn saved_photo_is_served_at_its_url() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            photo_dir: dir.path().to_path_buf(),
            ..Config::for_tests()
        };
        let limiters = RateLimiters::from_config(&config).unwrap();
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        let url = PhotoStore::from_config(&config)
            .save("A1", &jpeg, 1)
            .await
            .unwrap();
        assert_eq!(url, "/photos/selfies/A1_1.jpg");

        let app = init_service(App::new().configure(|cfg| configure(cfg, &config, &limiters))).await;

        let resp = call_service(&app, TestRequest::get().uri(&url).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("content-type").unwrap(), "image/jpeg");
        assert_eq!(read_body(resp).await.as_ref(), jpeg);

        let missing = TestRequest::get().uri("/photos/selfies/A1_2.jpg").to_request();
        assert_eq!(call_service(&app, missing).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn protected_routes_require_a_token() {
        let config = Config::for_tests();
        let limiters = RateLimiters::from_config(&config).unwrap();
        let app = init_service(
            App::new()
                .app_data(Data::new(config.clone()))
                .configure(|cfg| configure(cfg, &config, &limiters)),
        )
        .await;

        for uri in ["/api/students", "/api/attendance", "/api/selfie/window", "/api/reports/daily"] {
            let req = TestRequest::get()
                .uri(uri)
                .peer_addr("127.0.0.1:4000".parse().unwrap())
                .to_request();
            let resp = call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }
}
