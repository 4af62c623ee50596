use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::{
    http::header::{self, ContentType},
    web, App, HttpResponse, HttpServer, Responder,
};
use price_action::{
    analysis::AnalysisService,
    chart::ChartSpec,
    config::PriceActionConfig,
    data::{metadata::StockCatalog, source::PriceSource, yahoo::YahooSource},
    error::PriceActionError,
    export::{csv_bytes, workbook_file_name, xlsx_bytes},
    logging::setup_tracing,
};
use serde::Serialize;
use tracing::{error, info, warn};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

struct AppState<S> {
    service: Mutex<AnalysisService<S>>,
    catalog: StockCatalog,
}

impl<S: PriceSource> AppState<S> {
    fn new(service: AnalysisService<S>, catalog: StockCatalog) -> Self {
        Self {
            service: Mutex::new(service),
            catalog,
        }
    }

    fn with_service<T>(
        &self,
        f: impl FnOnce(&mut AnalysisService<S>) -> Result<T, PriceActionError>,
    ) -> Result<T, PriceActionError> {
        let mut service = self.service.lock().map_err(|_| {
            PriceActionError::CacheError("analysis service lock poisoned".to_string())
        })?;
        f(&mut service)
    }
}

#[derive(Debug, Serialize)]
struct StockEntry {
    ticker: String,
    company_name: String,
    industry: Option<String>,
}

/// Runs `render` on the blocking pool once the ticker is known to have data.
/// A ticker without monthly data is a 404 on every route.
async fn for_ticker<S, T, F>(
    state: web::Data<AppState<S>>,
    ticker: String,
    render: F,
) -> Result<T, HttpResponse>
where
    S: PriceSource + Send + 'static,
    T: Send + 'static,
    F: FnOnce(&mut AnalysisService<S>, &str) -> Result<T, PriceActionError> + Send + 'static,
{
    let lookup = ticker.clone();
    let result = web::block(move || {
        state.with_service(|s| {
            if s.monthly_analysis(&lookup)?.is_empty() {
                return Ok(None);
            }
            render(s, &lookup).map(Some)
        })
    })
    .await;

    match result {
        Ok(Ok(Some(value))) => Ok(value),
        Ok(Ok(None)) => {
            warn!("No data for {}", ticker);
            Err(HttpResponse::NotFound().body(format!("No data available for {}", ticker)))
        }
        Ok(Err(e)) => {
            error!("Request for {} failed: {}", ticker, e);
            Err(HttpResponse::BadGateway().body(e.to_string()))
        }
        Err(e) => {
            error!("Blocking task failed: {}", e);
            Err(HttpResponse::InternalServerError().finish())
        }
    }
}

async fn health() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

async fn get_analysis<S: PriceSource + Send + 'static>(
    path: web::Path<String>,
    state: web::Data<AppState<S>>,
) -> HttpResponse {
    match for_ticker(state, path.into_inner(), |s, t| s.formatted_table(t)).await {
        Ok(table) => HttpResponse::Ok().json(table),
        Err(response) => response,
    }
}

async fn get_analysis_csv<S: PriceSource + Send + 'static>(
    path: web::Path<String>,
    state: web::Data<AppState<S>>,
) -> HttpResponse {
    let render = |s: &mut AnalysisService<S>, t: &str| csv_bytes(&s.formatted_table(t)?);
    match for_ticker(state, path.into_inner(), render).await {
        Ok(bytes) => HttpResponse::Ok().content_type("text/csv").body(bytes),
        Err(response) => response,
    }
}

async fn get_analysis_xlsx<S: PriceSource + Send + 'static>(
    path: web::Path<String>,
    state: web::Data<AppState<S>>,
) -> HttpResponse {
    let ticker = path.into_inner();
    let file_name = workbook_file_name(&ticker);
    let render = |s: &mut AnalysisService<S>, t: &str| xlsx_bytes(&s.formatted_table(t)?);
    match for_ticker(state, ticker, render).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type(XLSX_CONTENT_TYPE)
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ))
            .body(bytes),
        Err(response) => response,
    }
}

async fn get_heatmap<S: PriceSource + Send + 'static>(
    path: web::Path<String>,
    state: web::Data<AppState<S>>,
) -> HttpResponse {
    let render = |s: &mut AnalysisService<S>, t: &str| ChartSpec::from(s.heatmap(t)?).to_json();
    match for_ticker(state, path.into_inner(), render).await {
        Ok(json) => HttpResponse::Ok().content_type(ContentType::json()).body(json),
        Err(response) => response,
    }
}

async fn get_bar_chart<S: PriceSource + Send + 'static>(
    path: web::Path<String>,
    state: web::Data<AppState<S>>,
) -> HttpResponse {
    let render =
        |s: &mut AnalysisService<S>, t: &str| ChartSpec::from(s.average_bar_chart(t)?).to_json();
    match for_ticker(state, path.into_inner(), render).await {
        Ok(json) => HttpResponse::Ok().content_type(ContentType::json()).body(json),
        Err(response) => response,
    }
}

async fn get_sectors<S: PriceSource + Send + 'static>(
    state: web::Data<AppState<S>>,
) -> impl Responder {
    HttpResponse::Ok().json(state.catalog.sectors())
}

async fn get_sector_stocks<S: PriceSource + Send + 'static>(
    path: web::Path<String>,
    state: web::Data<AppState<S>>,
) -> HttpResponse {
    let sector = path.into_inner();
    let stocks: Vec<StockEntry> = state
        .catalog
        .companies_in(&sector)
        .into_iter()
        .map(|s| StockEntry {
            ticker: s.symbol.clone(),
            company_name: s.company_name.clone(),
            industry: s.industry.clone(),
        })
        .collect();
    if stocks.is_empty() {
        return HttpResponse::NotFound().body(format!("Unknown sector: {}", sector));
    }
    HttpResponse::Ok().json(stocks)
}

fn routes<S: PriceSource + Send + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/analysis/{ticker}", web::get().to(get_analysis::<S>))
        .route("/analysis/{ticker}/csv", web::get().to(get_analysis_csv::<S>))
        .route("/analysis/{ticker}/xlsx", web::get().to(get_analysis_xlsx::<S>))
        .route("/heatmap/{ticker}", web::get().to(get_heatmap::<S>))
        .route("/bar-chart/{ticker}", web::get().to(get_bar_chart::<S>))
        .route("/sectors", web::get().to(get_sectors::<S>))
        .route("/sectors/{sector}/stocks", web::get().to(get_sector_stocks::<S>));
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let (_, _guard) =
        setup_tracing(Some("logs")).map_err(|e| std::io::Error::other(e.to_string()))?;
    let config = PriceActionConfig::read_config::<&str>(None)
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let catalog = match &config.metadata_dir {
        Some(dir) => StockCatalog::load(dir, &config.symbol_suffix).unwrap_or_else(|e| {
            warn!("Stock catalog unavailable: {}", e);
            StockCatalog::default()
        }),
        None => StockCatalog::default(),
    };
    info!("Loaded {} catalog entries", catalog.stocks().len());

    let service = AnalysisService::from_config(
        YahooSource::with_base_url(config.yahoo_base_url.clone()),
        &config,
    );
    let app_state = web::Data::new(AppState::new(service, catalog));

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(app_state.clone())
            .configure(routes::<YahooSource>)
    })
    .bind(("0.0.0.0", 8080))?
    .run()
    .await
}
