//! Pure folds over the block log that derive application state (spec §4.5).
//!
//! Nothing here is cached: every read recomputes its answer from a fresh
//! `Chain::snapshot`, which keeps the projection trivially consistent with
//! whatever the chain currently holds, at the cost of an O(n) scan per
//! query. For a betting ledger's expected chain lengths that trade is fine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::block::{
    AjustarSaldoPayload, ApostarPayload, Block, ConcluirEventoPayload, CriarEventoPayload,
    VotarPayload,
};

/// One wager placed against an event option.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bet {
    pub usuario: String,
    pub valor: f64,
}

/// A betting event and everything recorded against it so far.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: u64,
    pub nome: String,
    pub opcoes: Vec<String>,
    /// Bets placed per option, in the order they were recorded.
    pub bets: BTreeMap<String, Vec<Bet>>,
    /// Empty until `concluir_evento` is recorded; then the winning option.
    pub resultado: String,
}

impl Event {
    fn from_payload(payload: &CriarEventoPayload) -> Self {
        Self {
            id: payload.id,
            nome: payload.nome.clone(),
            opcoes: payload.opcoes.clone(),
            bets: payload.opcoes.iter().map(|o| (o.clone(), Vec::new())).collect(),
            resultado: payload.resultado.clone(),
        }
    }

    #[must_use]
    pub fn is_concluded(&self) -> bool {
        !self.resultado.is_empty()
    }
}

/// Folds the chain into a map of event id to its current projection.
#[must_use]
pub fn list_events(blocks: &[Block]) -> BTreeMap<u64, Event> {
    let mut events: BTreeMap<u64, Event> = BTreeMap::new();

    for block in blocks {
        match block.kind.as_str() {
            "criar_evento" => {
                if let Ok(payload) = serde_json::from_str::<CriarEventoPayload>(&block.payload) {
                    events.insert(payload.id, Event::from_payload(&payload));
                }
            }
            // "votar" is accepted onto the chain (spec §9 Open Question 3)
            // but deliberately feeds no projection.
            "apostar" => {
                if let Ok(payload) = serde_json::from_str::<ApostarPayload>(&block.payload) {
                    if let Some(event) = events.get_mut(&payload.evento_id) {
                        event
                            .bets
                            .entry(payload.opcao)
                            .or_default()
                            .push(Bet { usuario: payload.usuario, valor: payload.valor });
                    }
                }
            }
            "concluir_evento" => {
                if let Ok(payload) = serde_json::from_str::<ConcluirEventoPayload>(&block.payload)
                {
                    if let Some(event) = events.get_mut(&payload.evento_id) {
                        event.resultado = payload.opcao_vencedora;
                    }
                }
            }
            _ => {}
        }
    }

    events
}

/// Sums every `ajustar_saldo` credit/debit and every `apostar` debit
/// recorded for `usuario`. Deposits, withdrawals, and settlement payouts
/// all travel as `ajustar_saldo` entries; a stake is debited the moment the
/// `apostar` block lands, independent of that event's eventual outcome.
#[must_use]
pub fn balance_of(blocks: &[Block], usuario: &str) -> f64 {
    let mut balance = 0.0;
    for block in blocks {
        match block.kind.as_str() {
            "ajustar_saldo" => {
                if let Ok(payload) = serde_json::from_str::<AjustarSaldoPayload>(&block.payload) {
                    if payload.usuario == usuario {
                        balance += payload.valor;
                    }
                }
            }
            "apostar" => {
                if let Ok(payload) = serde_json::from_str::<ApostarPayload>(&block.payload) {
                    if payload.usuario == usuario {
                        balance -= payload.valor;
                    }
                }
            }
            _ => {}
        }
    }
    balance
}

/// The id the next `criar_evento` should use: one past the highest id seen,
/// or 1 if no event has ever been created.
#[must_use]
pub fn next_event_id(blocks: &[Block]) -> u64 {
    list_events(blocks).keys().max().map_or(1, |max| max + 1)
}

/// Whether `opcao` is a declared option of `evento_id`, and the event has
/// not already been concluded.
#[must_use]
pub fn event_option_valid(blocks: &[Block], evento_id: u64, opcao: &str) -> bool {
    list_events(blocks)
        .get(&evento_id)
        .is_some_and(|event| !event.is_concluded() && event.opcoes.iter().any(|o| o == opcao))
}
