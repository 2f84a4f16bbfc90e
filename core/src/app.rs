//! The ledger facade (spec §4.6): validates each intent against a fresh
//! projection snapshot, then appends one or more blocks recording it.

use std::collections::BTreeMap;

use tracing::info;

use crate::block::{
    AjustarSaldoPayload, ApostarPayload, Block, ConcluirEventoPayload, CriarEventoPayload, TxKind,
    VotarPayload,
};
use crate::chain::Chain;
use crate::error::{AppError, AppResult};
use crate::projection::{self, Event};

/// Facade over the chain store exposing one method per user-facing intent.
pub struct Ledger {
    chain: Chain,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self { chain: Chain::new() }
    }

    #[must_use]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Creates a new betting event with at least two distinct options.
    pub fn create_event(&self, nome: String, opcoes: Vec<String>) -> AppResult<Event> {
        if opcoes.len() < 2 {
            return Err(AppError::BadRequest(
                "an event needs at least two options".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        if !opcoes.iter().all(|o| seen.insert(o)) {
            return Err(AppError::BadRequest("event options must be distinct".to_string()));
        }

        let blocks = self.chain.snapshot();
        let id = projection::next_event_id(&blocks);
        let payload = CriarEventoPayload {
            id,
            nome: nome.clone(),
            opcoes: opcoes.clone(),
            votos: BTreeMap::new(),
            resultado: String::new(),
        };
        self.chain.append(TxKind::CriarEvento, &payload)?;
        info!(event_id = id, %nome, "created event");
        Ok(Event {
            id,
            nome,
            opcoes: opcoes.clone(),
            bets: opcoes.into_iter().map(|o| (o, Vec::new())).collect(),
            resultado: String::new(),
        })
    }

    /// Records an advisory, non-binding vote for an event option. Accepted
    /// onto the chain but never folded into any projection (spec §9 Open
    /// Question 3).
    pub fn vote(&self, usuario: String, evento_id: u64, opcao: String) -> AppResult<Block> {
        let blocks = self.chain.snapshot();
        if !projection::event_option_valid(&blocks, evento_id, &opcao) {
            return Err(AppError::BadRequest(format!(
                "event {evento_id} has no open option {opcao}"
            )));
        }
        let payload = VotarPayload { usuario, evento_id, opcao };
        self.chain.append(TxKind::Votar, &payload)
    }

    /// Places a wager against an event option, debiting the user's balance.
    pub fn bet(
        &self,
        usuario: String,
        evento_id: u64,
        opcao: String,
        valor: f64,
    ) -> AppResult<Block> {
        if valor <= 0.0 {
            return Err(AppError::BadRequest("stake must be positive".to_string()));
        }
        let blocks = self.chain.snapshot();
        if !projection::event_option_valid(&blocks, evento_id, &opcao) {
            return Err(AppError::BadRequest(format!(
                "event {evento_id} has no open option {opcao}"
            )));
        }
        let balance = projection::balance_of(&blocks, &usuario);
        if balance < valor {
            return Err(AppError::BadRequest(format!(
                "{usuario} has insufficient balance for a stake of {valor}"
            )));
        }
        let payload = ApostarPayload { usuario, evento_id, opcao, valor };
        self.chain.append(TxKind::Apostar, &payload)
    }

    /// Credits a user's balance.
    pub fn deposit(&self, usuario: String, valor: f64) -> AppResult<Block> {
        if valor <= 0.0 {
            return Err(AppError::BadRequest("deposit must be positive".to_string()));
        }
        let payload = AjustarSaldoPayload { usuario, valor };
        self.chain.append(TxKind::AjustarSaldo, &payload)
    }

    /// Debits a user's balance, refusing to take it negative.
    pub fn withdraw(&self, usuario: String, valor: f64) -> AppResult<Block> {
        if valor <= 0.0 {
            return Err(AppError::BadRequest("withdrawal must be positive".to_string()));
        }
        let blocks = self.chain.snapshot();
        let balance = projection::balance_of(&blocks, &usuario);
        if balance < valor {
            return Err(AppError::BadRequest(format!(
                "{usuario} has insufficient balance to withdraw {valor}"
            )));
        }
        let payload = AjustarSaldoPayload { usuario, valor: -valor };
        self.chain.append(TxKind::AjustarSaldo, &payload)
    }

    /// Appends a raw, un-typed block for the `/adicionar` diagnostic
    /// endpoint (spec §6): arbitrary `evento`/`resultado` text, bypassing
    /// the `TxKind` taxonomy and every intent's precondition checks.
    pub fn insert_raw(&self, evento: String, resultado: String) -> Block {
        self.chain.append_raw(evento, resultado)
    }

    /// Settles an event: credits every winning bettor their share of the
    /// losing pool, then records the winning option.
    ///
    /// Profit is split proportionally to stake: a winner who staked `s`
    /// receives `s * (losers_total / winners_total)` on top of the stake
    /// already held (it was debited at bet time, not refunded here). If
    /// nobody backed the winning option the losing pool is retained by the
    /// ledger with no credits issued. This method is not idempotent:
    /// settling the same event twice pays out twice, since `concluir_evento`
    /// does not by itself prevent a second settlement from being attempted.
    /// Callers should check `Event::is_concluded` first.
    pub fn settle(&self, evento_id: u64, opcao_vencedora: String) -> AppResult<()> {
        let blocks = self.chain.snapshot();
        let events = projection::list_events(&blocks);
        let event = events
            .get(&evento_id)
            .ok_or_else(|| AppError::BadRequest(format!("no such event {evento_id}")))?;
        if !event.opcoes.iter().any(|o| o == &opcao_vencedora) {
            return Err(AppError::BadRequest(format!(
                "{opcao_vencedora} is not an option of event {evento_id}"
            )));
        }

        let winners_total: f64 = event
            .bets
            .get(&opcao_vencedora)
            .map(|bets| bets.iter().map(|b| b.valor).sum())
            .unwrap_or(0.0);
        let losers_total: f64 = event
            .bets
            .iter()
            .filter(|(opcao, _)| *opcao != &opcao_vencedora)
            .flat_map(|(_, bets)| bets.iter())
            .map(|b| b.valor)
            .sum();

        if winners_total > 0.0 {
            if let Some(winning_bets) = event.bets.get(&opcao_vencedora) {
                for bet in winning_bets {
                    let profit = bet.valor * (losers_total / winners_total);
                    if profit > 0.0 {
                        self.chain.append(
                            TxKind::AjustarSaldo,
                            &AjustarSaldoPayload { usuario: bet.usuario.clone(), valor: profit },
                        )?;
                    }
                }
            }
        } else {
            info!(event_id = evento_id, "settling with no winning bets, losing pool retained");
        }

        self.chain.append(
            TxKind::ConcluirEvento,
            &ConcluirEventoPayload { evento_id, opcao_vencedora: opcao_vencedora.clone() },
        )?;

        info!(event_id = evento_id, %opcao_vencedora, "settled event");
        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_event_requires_two_distinct_options() {
        let ledger = Ledger::new();
        assert!(ledger.create_event("x".to_string(), vec!["a".to_string()]).is_err());
        assert!(ledger
            .create_event("x".to_string(), vec!["a".to_string(), "a".to_string()])
            .is_err());
    }

    #[test]
    fn bet_requires_sufficient_balance() {
        let ledger = Ledger::new();
        ledger
            .create_event("final".to_string(), vec!["a".to_string(), "b".to_string()])
            .unwrap();
        let err = ledger
            .bet("alice".to_string(), 1, "a".to_string(), 50.0)
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn full_betting_and_settlement_flow_pays_out_winners() {
        let ledger = Ledger::new();
        ledger.deposit("alice".to_string(), 100.0).unwrap();
        ledger.deposit("bob".to_string(), 100.0).unwrap();
        ledger
            .create_event("final".to_string(), vec!["a".to_string(), "b".to_string()])
            .unwrap();
        ledger.bet("alice".to_string(), 1, "a".to_string(), 50.0).unwrap();
        ledger.bet("bob".to_string(), 1, "b".to_string(), 50.0).unwrap();

        ledger.settle(1, "a".to_string()).unwrap();

        let blocks = ledger.chain().snapshot();
        // alice staked 50 of her 100, then won the 50 bob lost: 50 + 50 = 100.
        assert_eq!(projection::balance_of(&blocks, "alice"), 100.0);
        // bob staked and lost his 50: 100 - 50 = 50.
        assert_eq!(projection::balance_of(&blocks, "bob"), 50.0);
    }

    #[test]
    fn settling_with_no_winners_retains_the_losing_pool() {
        let ledger = Ledger::new();
        ledger.deposit("bob".to_string(), 100.0).unwrap();
        ledger
            .create_event("final".to_string(), vec!["a".to_string(), "b".to_string()])
            .unwrap();
        ledger.bet("bob".to_string(), 1, "b".to_string(), 50.0).unwrap();

        ledger.settle(1, "a".to_string()).unwrap();

        let blocks = ledger.chain().snapshot();
        assert_eq!(projection::balance_of(&blocks, "bob"), 50.0);
    }

    #[test]
    fn withdraw_refuses_to_take_balance_negative() {
        let ledger = Ledger::new();
        ledger.deposit("alice".to_string(), 10.0).unwrap();
        assert!(ledger.withdraw("alice".to_string(), 20.0).is_err());
        assert!(ledger.withdraw("alice".to_string(), 10.0).is_ok());
    }

    #[test]
    fn settle_appends_payout_blocks_before_the_conclusion_block() {
        let ledger = Ledger::new();
        ledger.deposit("alice".to_string(), 100.0).unwrap();
        ledger.deposit("bob".to_string(), 100.0).unwrap();
        ledger
            .create_event("final".to_string(), vec!["a".to_string(), "b".to_string()])
            .unwrap();
        ledger.bet("alice".to_string(), 1, "a".to_string(), 50.0).unwrap();
        ledger.bet("bob".to_string(), 1, "b".to_string(), 50.0).unwrap();

        ledger.settle(1, "a".to_string()).unwrap();

        let blocks = ledger.chain().snapshot();
        let kinds: Vec<&str> = blocks.iter().map(|b| b.kind.as_str()).collect();
        let payout_pos = kinds.iter().rposition(|k| *k == "ajustar_saldo").unwrap();
        let conclusion_pos = kinds.iter().position(|k| *k == "concluir_evento").unwrap();
        assert!(payout_pos < conclusion_pos);
    }

    #[test]
    fn insert_raw_accepts_arbitrary_untyped_text() {
        let ledger = Ledger::new();
        let block = ledger.insert_raw("nota".to_string(), "texto".to_string());
        assert_eq!(block.kind, "nota");
        assert_eq!(block.payload, "texto");
    }
}
