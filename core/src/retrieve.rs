use crate::decoder::PduDecoder;
use crate::headers::HeaderField;
use crate::pdu::{
    GenericPdu, MessageType, NotificationInd, Pdu, PduVariant, RetrieveConf, MMS_VERSION_1_2,
};
use crate::{Error, Result};
use serde::Serialize;

/// Statuts X-Mms-Status d'un M-NotifyResp.ind
pub const STATUS_RETRIEVED: u8 = 0x81;
pub const STATUS_REJECTED: u8 = 0x82;
pub const STATUS_DEFERRED: u8 = 0x83;

/// Message récupéré et prêt à être persisté
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievedMessage {
    pub conf: RetrieveConf,
    /// Date de la PDU, à utiliser comme date d'envoi
    pub date_sent: Option<u64>,
    /// Taille de la réponse brute
    pub message_size: usize,
}

/// Valide une réponse de téléchargement : elle doit être un M-Retrieve.conf
pub fn accept_retrieve_conf(decoder: &PduDecoder, response: &[u8]) -> Result<RetrievedMessage> {
    if response.is_empty() {
        return Err(Error::Truncated {
            needed: 1,
            available: 0,
        });
    }
    match decoder.decode(response)? {
        PduVariant::RetrieveConf(conf) => Ok(RetrievedMessage {
            date_sent: conf.date(),
            message_size: response.len(),
            conf,
        }),
        other => Err(Error::InvalidHeader(format!(
            "Invalid M-Retrieve.conf PDU: got {}",
            other.message_type().name()
        ))),
    }
}

/// M-Acknowledge.ind confirmant la récupération d'un message
///
/// X-Mms-MMS-Version est toujours présent, 1.2 à défaut de celle du message.
pub fn acknowledge_ind(conf: &RetrieveConf) -> Result<GenericPdu> {
    let transaction_id = conf.transaction_id().ok_or_else(|| {
        Error::InvalidHeader(
            "M-Retrieve.conf without transaction-id cannot be acknowledged".to_string(),
        )
    })?;
    let mut ack = GenericPdu::new(MessageType::AcknowledgeInd)?;
    let headers = ack.headers_mut();
    headers.put_text(HeaderField::TransactionId, transaction_id);
    headers.put_octet(
        HeaderField::MmsVersion,
        conf.mms_version().unwrap_or(MMS_VERSION_1_2),
    );
    Ok(ack)
}

/// M-NotifyResp.ind en réponse à une notification
pub fn notify_resp_ind(ind: &NotificationInd, status: u8) -> Result<GenericPdu> {
    let transaction_id = ind.transaction_id().ok_or_else(|| {
        Error::InvalidHeader("M-Notification.ind without transaction-id".to_string())
    })?;
    if status & 0x80 == 0 {
        return Err(Error::malformed(
            HeaderField::Status.name(),
            format!("token octet {:#04x} lacks high bit", status),
        ));
    }
    let mut resp = GenericPdu::new(MessageType::NotifyRespInd)?;
    let headers = resp.headers_mut();
    headers.put_text(HeaderField::TransactionId, transaction_id);
    headers.put_octet(HeaderField::Status, status);
    headers.put_octet(
        HeaderField::MmsVersion,
        ind.mms_version().unwrap_or(MMS_VERSION_1_2),
    );
    Ok(resp)
}
