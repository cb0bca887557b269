use crate::{
    api,
    models::Selection,
    services::{
        auth::Claims,
        filters::{self, FilterSelection},
        gateway,
        metrics::{self, latest_entry_date},
        timeseries::{self, ChartDuration, DailyCount},
    },
    state::{AppState, Dataset, SharedState},
};
use actix_web::{HttpResponse, Responder, get, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const MISSING_FILES: &str = "Please upload all required files in the Admin Panel.";

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Filter controls as sent by the dashboard page. Absent values mean "All".
#[derive(Deserialize, Default)]
pub struct DashboardQuery {
    pub date: Option<String>, // Format: YYYY-MM-DD
    pub farm_status: Option<String>,
    pub housing_type: Option<String>,
    pub cluster: Option<String>,
    pub farm_name: Option<String>,
    pub duration: Option<String>,
    pub device_type: Option<String>,
}

impl DashboardQuery {
    pub fn selection(&self) -> FilterSelection {
        let pick = |v: &Option<String>| v.clone().map(Selection::from).unwrap_or_default();
        FilterSelection {
            farm_status: pick(&self.farm_status),
            housing_type: pick(&self.housing_type),
            cluster: pick(&self.cluster),
            farm_name: pick(&self.farm_name),
        }
    }

    pub fn date(&self) -> Result<Option<NaiveDate>, HttpResponse> {
        match &self.date {
            Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| HttpResponse::BadRequest().body("Invalid date format. Use YYYY-MM-DD")),
            None => Ok(None),
        }
    }

    pub fn duration(&self) -> Result<ChartDuration, HttpResponse> {
        match &self.duration {
            Some(label) => ChartDuration::from_label(label).ok_or_else(|| {
                HttpResponse::BadRequest().body("Invalid duration. Use 7 days, 1 Month, 3 Month or 6 Month")
            }),
            None => Ok(ChartDuration::default()),
        }
    }

    pub fn device_type(&self) -> Selection {
        self.device_type.clone().map(Selection::from).unwrap_or_default()
    }
}

#[derive(Serialize)]
pub struct ChartResponse {
    pub duration: ChartDuration,
    pub device_type: Selection,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub series: Vec<DailyCount>,
}

/// Checks the session and that every table is uploaded, then hands the data over
fn with_dataset<'a>(state: &'a AppState, claims: &Claims) -> Result<Dataset<'a>, HttpResponse> {
    api::require_session(state, claims)?;
    state.data.dataset().ok_or_else(|| {
        HttpResponse::Conflict().json(serde_json::json!({
            "error": MISSING_FILES,
            "missing": state.data.missing(),
        }))
    })
}

/// Chosen date, or the latest entry date of the unfiltered event log
fn selected_date(query: &DashboardQuery, dataset: &Dataset<'_>) -> Result<Option<NaiveDate>, HttpResponse> {
    Ok(query.date()?.or_else(|| latest_entry_date(dataset.events)))
}

// ============================================================================
// Endpoints
// ============================================================================

#[get("/options")]
pub async fn get_options(state: web::Data<SharedState>, claims: Claims) -> impl Responder {
    let state = match api::lock(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let dataset = match with_dataset(&state, &claims) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    HttpResponse::Ok().json(filters::filter_options(
        dataset.master,
        dataset.devices,
        dataset.events,
    ))
}

#[get("/metrics")]
pub async fn get_metrics(
    state: web::Data<SharedState>,
    claims: Claims,
    query: web::Query<DashboardQuery>,
) -> impl Responder {
    let state = match api::lock(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let dataset = match with_dataset(&state, &claims) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let date = match selected_date(&query, &dataset) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let selection = query.selection();
    let tables = dataset.filter(&selection);

    HttpResponse::Ok().json(metrics::compute_metrics(
        &tables,
        &selection,
        dataset.devices,
        date,
    ))
}

/// Disconnected devices per day over the chosen trailing window
#[get("/charts/disconnected")]
pub async fn get_disconnected_chart(
    state: web::Data<SharedState>,
    claims: Claims,
    query: web::Query<DashboardQuery>,
) -> impl Responder {
    let state = match api::lock(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let dataset = match with_dataset(&state, &claims) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let (date, duration) = match (selected_date(&query, &dataset), query.duration()) {
        (Ok(d), Ok(dur)) => (d, dur),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    let device_type = query.device_type();
    let tables = dataset.filter(&query.selection());

    let response = match date {
        Some(end) => {
            let (start, end) = duration.window(end);
            ChartResponse {
                duration,
                start_date: Some(start),
                end_date: Some(end),
                series: timeseries::disconnected_series(&tables.events, start, end, &device_type),
                device_type,
            }
        }
        None => ChartResponse {
            duration,
            device_type,
            start_date: None,
            end_date: None,
            series: Vec::new(),
        },
    };

    HttpResponse::Ok().json(response)
}

/// Farms with a gateway issue per day over the chosen trailing window
#[get("/charts/gateways")]
pub async fn get_gateway_chart(
    state: web::Data<SharedState>,
    claims: Claims,
    query: web::Query<DashboardQuery>,
) -> impl Responder {
    let state = match api::lock(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let dataset = match with_dataset(&state, &claims) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let (date, duration) = match (selected_date(&query, &dataset), query.duration()) {
        (Ok(d), Ok(dur)) => (d, dur),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    let tables = dataset.filter(&query.selection());

    let (start_date, end_date, series) = match date {
        Some(end) => {
            let (start, end) = duration.window(end);
            let series = gateway::gateway_issue_series(&tables.devices, &tables.events, start, end);
            (Some(start), Some(end), series)
        }
        None => (None, None, Vec::new()),
    };

    HttpResponse::Ok().json(ChartResponse {
        duration,
        device_type: Selection::All,
        start_date,
        end_date,
        series,
    })
}
