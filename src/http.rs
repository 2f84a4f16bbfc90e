//! The HTTP transport adapter (spec §6): one route per ledger intent, plus
//! the replication endpoints peers use to gossip and pull blocks. Route
//! paths and the query/body shapes they accept are fixed by spec §6 and are
//! compatibility-critical for peer-to-peer endpoints — do not rename them.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{app::Ledger, block::Block, error::AppError, projection, validator};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/blockchain", get(get_blockchain))
        .route("/receber-bloco", post(receber_bloco))
        .route("/receber-blockchain", post(receber_blockchain))
        .route("/saldo", get(saldo))
        .route("/criar-evento", post(criar_evento))
        .route("/eventos", get(list_eventos))
        .route("/votar", post(votar))
        .route("/apostar", post(apostar))
        .route("/depositar", post(depositar))
        .route("/sacar", post(sacar))
        .route("/concluir-evento", post(concluir_evento))
        .route("/validar", get(validar))
        .route("/adicionar", post(adicionar))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Uniform error body so peers and clients get a stable JSON shape.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    /// Matches spec §7: an integrity rejection is a plain-text 200, not a
    /// 4xx — a peer retries a gossip rejection by falling back to a full
    /// pull rather than by branching on status code.
    fn into_response(self) -> Response {
        match self.0 {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error: msg })).into_response()
            }
            AppError::IntegrityRejection(msg) => (StatusCode::OK, msg).into_response(),
            AppError::TransientPeerFailure(msg) => {
                (StatusCode::BAD_GATEWAY, Json(ErrorBody { error: msg })).into_response()
            }
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: msg })).into_response()
            }
        }
    }
}

async fn get_blockchain(State(state): State<AppState>) -> Json<Vec<Block>> {
    Json(state.ledger.chain().snapshot())
}

/// Inbound single-block gossip (spec §4.7 "Inbound — single block"). A
/// block that does not cleanly extend the local tip is an integrity
/// rejection, answered 200 with a plain-text message; the peer that sent it
/// is expected to fall back to `/receber-blockchain` or a pull.
async fn receber_bloco(
    State(state): State<AppState>,
    Json(block): Json<Block>,
) -> Result<StatusCode, ApiError> {
    state.ledger.chain().accept_single(block)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Inbound full-chain push (spec §4.7 "Inbound — full chain"). Adopts
/// `blocks` if it is strictly longer than the local chain and validates;
/// otherwise answers with a plain-text rejection and makes no change.
async fn receber_blockchain(
    State(state): State<AppState>,
    Json(blocks): Json<Vec<Block>>,
) -> Result<&'static str, ApiError> {
    match state.ledger.chain().replace(blocks) {
        Ok(true) => Ok("blockchain substituida"),
        Ok(false) => Err(AppError::IntegrityRejection(
            "blockchain recebida nao e maior que a local".to_string(),
        )
        .into()),
        Err(err) => Err(err.into()),
    }
}

/// Runs `validator::validate_chain` over the local chain and reports the
/// result as plain text (spec §6).
async fn validar(State(state): State<AppState>) -> &'static str {
    let blocks = state.ledger.chain().snapshot();
    if validator::validate_chain(&blocks) {
        "válida"
    } else {
        "inválida"
    }
}

#[derive(Deserialize)]
struct AdicionarRequest {
    evento: String,
    resultado: String,
}

/// Diagnostic raw-insert endpoint (spec §6): mines and appends a block with
/// arbitrary text, bypassing every intent's precondition checks.
async fn adicionar(
    State(state): State<AppState>,
    Json(req): Json<AdicionarRequest>,
) -> Json<Block> {
    Json(state.ledger.insert_raw(req.evento, req.resultado))
}

async fn list_eventos(State(state): State<AppState>) -> Json<Vec<projection::Event>> {
    let blocks = state.ledger.chain().snapshot();
    Json(projection::list_events(&blocks).into_values().collect())
}

#[derive(Deserialize)]
struct CriarEventoRequest {
    nome: String,
    opcoes: Vec<String>,
}

async fn criar_evento(
    State(state): State<AppState>,
    Json(req): Json<CriarEventoRequest>,
) -> Result<Json<projection::Event>, ApiError> {
    let event = state.ledger.create_event(req.nome, req.opcoes)?;
    Ok(Json(event))
}

#[derive(Deserialize)]
struct VotarRequest {
    usuario: String,
    evento_id: u64,
    opcao: String,
}

async fn votar(
    State(state): State<AppState>,
    Json(req): Json<VotarRequest>,
) -> Result<Json<Block>, ApiError> {
    let block = state.ledger.vote(req.usuario, req.evento_id, req.opcao)?;
    Ok(Json(block))
}

#[derive(Deserialize)]
struct ApostarRequest {
    usuario: String,
    evento_id: u64,
    opcao: String,
    valor: f64,
}

async fn apostar(
    State(state): State<AppState>,
    Json(req): Json<ApostarRequest>,
) -> Result<Json<Block>, ApiError> {
    let block = state.ledger.bet(req.usuario, req.evento_id, req.opcao, req.valor)?;
    Ok(Json(block))
}

#[derive(Deserialize)]
struct ConcluirEventoRequest {
    evento_id: u64,
    opcao_vencedora: String,
}

async fn concluir_evento(
    State(state): State<AppState>,
    Json(req): Json<ConcluirEventoRequest>,
) -> Result<String, ApiError> {
    let evento_id = req.evento_id;
    let opcao_vencedora = req.opcao_vencedora;
    state.ledger.settle(evento_id, opcao_vencedora.clone())?;
    Ok(format!("evento {evento_id} concluido, vencedor: {opcao_vencedora}"))
}

#[derive(Deserialize)]
struct SaldoAjusteRequest {
    usuario: String,
    valor: f64,
}

async fn depositar(
    State(state): State<AppState>,
    Json(req): Json<SaldoAjusteRequest>,
) -> Result<Json<Block>, ApiError> {
    let block = state.ledger.deposit(req.usuario, req.valor)?;
    Ok(Json(block))
}

async fn sacar(
    State(state): State<AppState>,
    Json(req): Json<SaldoAjusteRequest>,
) -> Result<Json<Block>, ApiError> {
    let block = state.ledger.withdraw(req.usuario, req.valor)?;
    Ok(Json(block))
}

#[derive(Deserialize)]
struct SaldoQuery {
    usuario: String,
}

#[derive(Serialize)]
struct SaldoResponse {
    usuario: String,
    saldo: f64,
}

async fn saldo(
    State(state): State<AppState>,
    Query(query): Query<SaldoQuery>,
) -> Json<SaldoResponse> {
    let blocks = state.ledger.chain().snapshot();
    let saldo = projection::balance_of(&blocks, &query.usuario);
    Json(SaldoResponse { usuario: query.usuario, saldo })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState { ledger: Arc::new(Ledger::new()) }
    }

    async fn body_string(resp: Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn get_blockchain_returns_the_genesis_block() {
        let app = router(state());
        let resp = app
            .oneshot(Request::builder().uri("/blockchain").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let blocks: Vec<Block> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].index, 0);
    }

    #[tokio::test]
    async fn validar_reports_a_fresh_chain_as_valid() {
        let app = router(state());
        let resp = app
            .oneshot(Request::builder().uri("/validar").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "válida");
    }

    #[tokio::test]
    async fn adicionar_mines_an_arbitrary_block() {
        let app = router(state());
        let req = Request::builder()
            .method("POST")
            .uri("/adicionar")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"evento":"nota","resultado":"texto livre"}"#))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let block: Block = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(block.kind, "nota");
        assert_eq!(block.payload, "texto livre");
    }

    #[tokio::test]
    async fn criar_evento_then_saldo_round_trips_through_query_param() {
        let s = state();
        s.ledger.deposit("alice".to_string(), 42.0).unwrap();
        let app = router(s);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/saldo?usuario=alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let saldo: SaldoResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(saldo.saldo, 42.0);
    }

    #[tokio::test]
    async fn receber_bloco_rejects_a_block_that_does_not_extend_the_tip() {
        let app = router(state());
        let mut bogus = Ledger::new().chain().snapshot()[0].clone();
        bogus.index = 9;
        let body = serde_json::to_string(&bogus).unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/receber-bloco")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        // Integrity rejections answer 200 with a plain-text body (spec §7).
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn receber_blockchain_rejects_a_chain_that_is_not_longer() {
        let s = state();
        let snapshot = s.ledger.chain().snapshot();
        let app = router(s);
        let body = serde_json::to_string(&snapshot).unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/receber-blockchain")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_string(resp).await;
        assert!(text.contains("nao e maior"));
    }

    #[tokio::test]
    async fn apostar_rejects_insufficient_balance() {
        let s = state();
        s.ledger
            .create_event("final".to_string(), vec!["a".to_string(), "b".to_string()])
            .unwrap();
        let app = router(s);
        let req = Request::builder()
            .method("POST")
            .uri("/apostar")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"usuario":"alice","evento_id":1,"opcao":"a","valor":10.0}"#,
            ))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
