//! Block format, transaction-kind taxonomy, and the canonical hash preimage.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::Hash256;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Discriminant over the transaction taxonomy (spec §3/§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxKind {
    Genesis,
    CriarEvento,
    Apostar,
    Votar,
    AjustarSaldo,
    ConcluirEvento,
}

impl TxKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TxKind::Genesis => "genesis",
            TxKind::CriarEvento => "criar_evento",
            TxKind::Apostar => "apostar",
            TxKind::Votar => "votar",
            TxKind::AjustarSaldo => "ajustar_saldo",
            TxKind::ConcluirEvento => "concluir_evento",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "genesis" => Ok(TxKind::Genesis),
            "criar_evento" => Ok(TxKind::CriarEvento),
            "apostar" => Ok(TxKind::Apostar),
            "votar" => Ok(TxKind::Votar),
            "ajustar_saldo" => Ok(TxKind::AjustarSaldo),
            "concluir_evento" => Ok(TxKind::ConcluirEvento),
            other => Err(AppError::Internal(format!("unknown transaction kind: {other}"))),
        }
    }
}

/// Payload schemas, one struct per transaction kind (spec §3).
///
/// Each struct's field order is fixed, so `serde_json::to_string` of it is
/// the canonical JSON text the hash preimage and the wire format require.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisPayload {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriarEventoPayload {
    pub id: u64,
    pub nome: String,
    pub opcoes: Vec<String>,
    pub votos: BTreeMap<String, serde_json::Value>,
    pub resultado: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApostarPayload {
    pub usuario: String,
    pub evento_id: u64,
    pub opcao: String,
    pub valor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotarPayload {
    pub usuario: String,
    pub evento_id: u64,
    pub opcao: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AjustarSaldoPayload {
    pub usuario: String,
    pub valor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcluirEventoPayload {
    pub evento_id: u64,
    pub opcao_vencedora: String,
}

/// The atomic chain entry (spec §3).
///
/// The wire field names below (`evento`, `resultado`, `hash_anterior`,
/// `hash_atual`, `dificuldade`) are the stable names spec §6 mandates for
/// cross-peer compatibility; they don't describe what `kind`/`payload`
/// actually hold, they're just the names the wire protocol fixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: String,
    #[serde(rename = "evento")]
    pub kind: String,
    #[serde(rename = "resultado")]
    pub payload: String,
    #[serde(rename = "hash_anterior")]
    pub prev_hash: String,
    #[serde(rename = "hash_atual")]
    pub hash: String,
    pub nonce: u64,
    #[serde(rename = "dificuldade")]
    pub difficulty: u32,
}

impl Block {
    /// Builds an unmined candidate (nonce 0, hash unset) ready for the miner.
    pub fn candidate(
        index: u64,
        kind: TxKind,
        payload: &impl Serialize,
        prev_hash: String,
        difficulty: u32,
    ) -> Result<Self, AppError> {
        let payload_json = serde_json::to_string(payload)?;
        Ok(Self {
            index,
            timestamp: Utc::now().to_rfc3339(),
            kind: kind.as_str().to_string(),
            payload: payload_json,
            prev_hash,
            hash: String::new(),
            nonce: 0,
            difficulty,
        })
    }

    /// Builds an unmined candidate with a raw, un-typed kind/payload pair,
    /// for the `/adicionar` diagnostic endpoint (spec §6) which accepts
    /// arbitrary `{evento, resultado}` text rather than one of the
    /// declared transaction kinds.
    #[must_use]
    pub fn candidate_raw(
        index: u64,
        kind: String,
        payload: String,
        prev_hash: String,
        difficulty: u32,
    ) -> Self {
        Self {
            index,
            timestamp: Utc::now().to_rfc3339(),
            kind,
            payload,
            prev_hash,
            hash: String::new(),
            nonce: 0,
            difficulty,
        }
    }

    /// The textual preimage defined in spec §4.1: index, timestamp, kind,
    /// payload, nonce, difficulty, concatenated with no separators.
    #[must_use]
    pub fn preimage(&self) -> String {
        format!(
            "{}{}{}{}{}{}",
            self.index, self.timestamp, self.kind, self.payload, self.nonce, self.difficulty
        )
    }

    /// Recomputes this block's hash from its own fields.
    #[must_use]
    pub fn recompute_hash(&self) -> Hash256 {
        Hash256::sha256(self.preimage().as_bytes())
    }

    /// Whether this block's stored hash matches its recomputed hash.
    #[must_use]
    pub fn hash_is_consistent(&self) -> bool {
        self.recompute_hash().to_string() == self.hash
    }

    /// Whether this block's stored hash meets its own declared difficulty.
    #[must_use]
    pub fn meets_own_difficulty(&self) -> bool {
        match Hash256::from_hex(&self.hash) {
            Ok(h) => h.meets_difficulty(self.difficulty),
            Err(_) => false,
        }
    }
}
