//! HTTP handler functions for the crate digger API.

use actix_web::http::{StatusCode, header};
use actix_web::{HttpRequest, HttpResponse, web};
use crate_digger_collection_models::CollectionReport;
use crate_digger_report::{ReportError, ReportSections, SummarizationError};
use crate_digger_server_models::{
    ApiError, ApiHealth, ApiReport, ApiReportSections, ApiSession, CallbackParams, UploadParams,
};
use crate_digger_session::SessionData;

use crate::AppState;
use crate::session::RequestSession;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/session`
///
/// Reports whether the browser is logged in with Discogs and has a report.
pub async fn session_status(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let session = RequestSession::from_request(&req);
    let data = state.store.load(session.id);

    let mut builder = HttpResponse::Ok();
    session.attach(&mut builder);
    builder.json(api_session(&data))
}

/// `GET /auth/discogs/login`
///
/// Obtains a request token and redirects the browser to Discogs.
pub async fn login(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let session = RequestSession::from_request(&req);
    let mut data = state.store.load(session.id);

    let result = state.discogs.begin_login(&mut data.oauth).await;
    state.store.save(session.id, data);

    match result {
        Ok(authorize_url) => {
            let mut builder = HttpResponse::Found();
            session.attach(&mut builder);
            builder
                .insert_header((header::LOCATION, authorize_url))
                .finish()
        }
        Err(e) => error_response(&session, &e.into()),
    }
}

/// `GET /auth/discogs/callback`
///
/// Completes the login Discogs redirected back from, then sends the
/// browser home.
pub async fn callback(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<CallbackParams>,
) -> HttpResponse {
    let session = RequestSession::from_request(&req);
    let mut data = state.store.load(session.id);

    if params.denied.is_some() {
        log::info!("User declined Discogs authorization");
        data.oauth.clear();
        state.store.save(session.id, data);
        return error_response(
            &session,
            &ReportError::OAuth {
                message: "authorization was declined".to_owned(),
            },
        );
    }

    let result = state
        .discogs
        .complete_login(
            &mut data.oauth,
            params.oauth_token.as_deref().unwrap_or_default(),
            params.oauth_verifier.as_deref().unwrap_or_default(),
        )
        .await;
    state.store.save(session.id, data);

    match result {
        Ok(()) => {
            let mut builder = HttpResponse::Found();
            session.attach(&mut builder);
            builder.insert_header((header::LOCATION, "/")).finish()
        }
        Err(e) => error_response(&session, &e.into()),
    }
}

/// `POST /auth/logout`
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let session = RequestSession::from_request(&req);
    let mut data = state.store.load(session.id);

    crate_digger_discogs::logout(&mut data.oauth);
    let body = api_session(&data);
    state.store.save(session.id, data);

    let mut builder = HttpResponse::Ok();
    session.attach(&mut builder);
    builder.json(body)
}

/// `POST /api/generate-report`
///
/// Fetches the logged-in user's Discogs collection and summarizes it.
pub async fn generate_report(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let session = RequestSession::from_request(&req);
    let mut data = state.store.load(session.id);

    let result = crate_digger_report::generate_from_discogs(
        state.provider.as_ref(),
        &state.discogs,
        &mut data.oauth,
    )
    .await;
    state.store.save(session.id, data);

    match result {
        Ok(report) => store_and_respond(&state, &session, report),
        Err(e) => error_response(&session, &e),
    }
}

/// `POST /api/upload?filename=…`
///
/// Summarizes a CSV export sent as the raw request body.
pub async fn upload(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<UploadParams>,
    body: web::Bytes,
) -> HttpResponse {
    let session = RequestSession::from_request(&req);

    if body.is_empty() {
        return bad_request(&session, "No file provided");
    }

    if let Some(filename) = params.filename.as_deref()
        && !filename.to_ascii_lowercase().ends_with(".csv")
    {
        return bad_request(&session, "Please upload a CSV file");
    }

    log::info!(
        "Received CSV upload {} ({} bytes)",
        params.filename.as_deref().unwrap_or("<unnamed>"),
        body.len()
    );

    match crate_digger_report::generate_from_csv(state.provider.as_ref(), &body).await {
        Ok(report) => store_and_respond(&state, &session, report),
        Err(ReportError::Summarization(SummarizationError::EmptySample)) => {
            bad_request(&session, "CSV file appears to be empty or invalid")
        }
        Err(e) => error_response(&session, &e),
    }
}

/// `GET /api/report`
///
/// Returns the session's most recent report.
pub async fn report(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let session = RequestSession::from_request(&req);

    match state.store.get_report(session.id) {
        Some(report) => {
            let mut builder = HttpResponse::Ok();
            session.attach(&mut builder);
            builder.json(api_report(report))
        }
        None => respond_error(
            &session,
            StatusCode::NOT_FOUND,
            "No report found. Please upload a collection or connect Discogs first.",
        ),
    }
}

fn store_and_respond(
    state: &AppState,
    session: &RequestSession,
    report: CollectionReport,
) -> HttpResponse {
    log::info!(
        "Generated {} report ({} of {} entries)",
        report.source,
        report.sample_size,
        report.total_count
    );
    state.store.put_report(session.id, report.clone());

    let mut builder = HttpResponse::Ok();
    session.attach(&mut builder);
    builder.json(api_report(report))
}

fn api_session(data: &SessionData) -> ApiSession {
    ApiSession {
        authenticated: data.oauth.is_authenticated(),
        login_pending: data.oauth.request_token().is_some(),
        username: data.oauth.username().map(ToOwned::to_owned),
        has_report: data.report.is_some(),
    }
}

fn api_report(report: CollectionReport) -> ApiReport {
    let sections = ReportSections::parse(&report.narrative_text).map(|s| ApiReportSections {
        vibe_summary: s.vibe_summary,
        strengths: s.strengths,
        improvements: s.improvements,
        recommendations: s.recommendations,
    });
    ApiReport::new(report, sections)
}

/// Status code and user-facing message for a failed operation.
fn status_and_message(e: &ReportError) -> (StatusCode, String) {
    match e {
        ReportError::Parse(inner) => (
            StatusCode::BAD_REQUEST,
            format!("Error parsing CSV: {inner}"),
        ),
        ReportError::OAuth { .. } => (
            StatusCode::UNAUTHORIZED,
            "Discogs authentication failed".to_owned(),
        ),
        ReportError::AuthRequired => (
            StatusCode::UNAUTHORIZED,
            "Log in with Discogs first".to_owned(),
        ),
        ReportError::Fetch { .. } => (
            StatusCode::BAD_GATEWAY,
            "Could not fetch your Discogs collection".to_owned(),
        ),
        ReportError::Summarization(SummarizationError::EmptySample) => (
            StatusCode::BAD_REQUEST,
            "Your collection has no albums to analyze".to_owned(),
        ),
        ReportError::Summarization(SummarizationError::Provider(_)) => (
            StatusCode::BAD_GATEWAY,
            "Could not generate a report right now".to_owned(),
        ),
        ReportError::Config { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server is not configured correctly".to_owned(),
        ),
    }
}

fn error_response(session: &RequestSession, e: &ReportError) -> HttpResponse {
    let (status, message) = status_and_message(e);

    if status.is_server_error() {
        log::error!("{e}");
    } else {
        log::warn!("{e}");
    }

    respond_error(session, status, &message)
}

fn bad_request(session: &RequestSession, message: &str) -> HttpResponse {
    log::warn!("Rejected upload: {message}");
    respond_error(session, StatusCode::BAD_REQUEST, message)
}

fn respond_error(session: &RequestSession, status: StatusCode, message: &str) -> HttpResponse {
    let mut builder = HttpResponse::build(status);
    session.attach(&mut builder);
    builder.json(ApiError::new(message))
}
