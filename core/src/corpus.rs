use crate::decoder::PduDecoder;
use crate::pdu::PduVariant;
use crate::push::parse_push;
use crate::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Datagramme UDP de push WAP avec ses métadonnées
#[derive(Debug, Clone)]
pub struct UdpDatagram {
    pub timestamp: f64,
    pub src_port: u16,
    pub dst_port: u16,
    pub direction: Direction,
    pub payload: Arc<[u8]>,
}

// Implémentation manuelle de Serialize pour UdpDatagram
impl serde::Serialize for UdpDatagram {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("UdpDatagram", 5)?;
        state.serialize_field("timestamp", &self.timestamp)?;
        state.serialize_field("src_port", &self.src_port)?;
        state.serialize_field("dst_port", &self.dst_port)?;
        state.serialize_field("direction", &self.direction)?;
        state.serialize_field("payload_len", &self.payload.len())?;
        state.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Vers le terminal (port de destination = push WAP)
    ToTerminal,
    FromTerminal,
}

/// Ensemble des datagrammes de push extraits d'une capture
#[derive(Debug, Clone, Serialize)]
pub struct Flow {
    pub source: String,
    pub datagrams: Vec<UdpDatagram>,
}

impl Flow {
    pub fn len(&self) -> usize {
        self.datagrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datagrams.is_empty()
    }

    /// Corps MMS des datagrammes dont l'enveloppe WSP est valide
    pub fn mms_bodies(&self) -> Vec<Result<Arc<[u8]>>> {
        self.datagrams
            .iter()
            .map(|d| {
                let push = parse_push(&d.payload)?;
                Ok(Arc::from(push.mms_body()?))
            })
            .collect()
    }
}

/// Décode des buffers indépendants en parallèle (le codec est sans état)
pub fn decode_batch(decoder: &PduDecoder, items: &[Arc<[u8]>]) -> Vec<Result<PduVariant>> {
    items
        .par_iter()
        .map(|item| decoder.decode(item))
        .collect()
}
