use crate::config::CodecConfig;
use crate::content_type::{read_content_type, ContentType};
use crate::decoder::PduDecoder;
use crate::headers::HeaderField;
use crate::location::{effective_content_location, BoundedDedupStore, DedupStore};
use crate::pdu::{MessageType, NotificationInd, PduVariant};
use crate::wsp::Reader;
use crate::{Error, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Port UDP du push WAP sans connexion
pub const WAP_PUSH_PORT: u16 = 2948;

const WSP_PUSH: u8 = 0x06;
const WSP_CONFIRMED_PUSH: u8 = 0x07;

/// PDU WSP Push (mode sans connexion)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WspPush {
    pub transaction_id: u8,
    pub pdu_type: u8,
    pub content_type: ContentType,
    /// En-têtes WSP bruts après le Content-Type
    pub headers: Vec<u8>,
    pub data: Vec<u8>,
}

impl WspPush {
    /// Corps MMS porté par le push, si le type de contenu est bien MMS
    pub fn mms_body(&self) -> Result<&[u8]> {
        if self.content_type.media.is_mms_message() {
            Ok(&self.data)
        } else {
            Err(Error::InvalidHeader(format!(
                "push content type {} is not an MMS message",
                self.content_type
            )))
        }
    }
}

/// Décode l'enveloppe WSP d'un datagramme de push
pub fn parse_push(datagram: &[u8]) -> Result<WspPush> {
    let mut reader = Reader::new(datagram);
    reader.set_field("wsp-push");
    let transaction_id = reader.read_u8()?;
    let pdu_type = reader.read_u8()?;
    if pdu_type != WSP_PUSH && pdu_type != WSP_CONFIRMED_PUSH {
        return Err(Error::UnsupportedType(pdu_type));
    }
    let headers_len = reader.read_uintvar()? as usize;
    let mut headers = reader.sub_reader(headers_len)?;
    headers.set_field("wsp-content-type");
    let content_type = read_content_type(&mut headers)?;
    Ok(WspPush {
        transaction_id,
        pdu_type,
        content_type,
        headers: headers.rest().to_vec(),
        data: reader.rest().to_vec(),
    })
}

/// Suite à donner à un push reçu
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action")]
pub enum PushOutcome {
    /// Nouvelle notification : télécharger le message à `location`
    Download {
        location: String,
        notification: NotificationInd,
    },
    /// Notification déjà vue, ne pas retélécharger
    Duplicate { location: String },
    /// Rapport de livraison / lecture à rattacher au message envoyé `message_id`
    Report { message_id: String, pdu: PduVariant },
    /// Type reçu sans traitement côté réception
    Ignored { message_type: MessageType },
}

/// Traitement pur des pushs MMS : décodage, politique transaction-id,
/// déduplication. Les E/S (persistance, téléchargement) restent à l'appelant.
pub struct PushProcessor<S: DedupStore> {
    decoder: PduDecoder,
    append_transaction_id: bool,
    store: S,
}

impl PushProcessor<BoundedDedupStore> {
    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(config, BoundedDedupStore::new(config.dedup_capacity))
    }
}

impl<S: DedupStore> PushProcessor<S> {
    pub fn new(config: &CodecConfig, store: S) -> Self {
        Self {
            decoder: PduDecoder::from_config(config),
            append_transaction_id: config.append_transaction_id,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Traite le corps MMS d'un push
    pub fn process(&mut self, data: &[u8]) -> Result<PushOutcome> {
        let pdu = self.decoder.decode(data)?;
        self.dispatch(pdu)
    }

    /// Traite un datagramme WSP Push complet
    pub fn process_datagram(&mut self, datagram: &[u8]) -> Result<PushOutcome> {
        let push = parse_push(datagram)?;
        self.process(push.mms_body()?)
    }

    /// Politique de réception appliquée à une PDU déjà décodée
    ///
    /// Le content-location sert de clé de déduplication : il doit être UTF-8.
    pub fn dispatch(&mut self, pdu: PduVariant) -> Result<PushOutcome> {
        let outcome = match pdu {
            PduVariant::NotificationInd(mut ind) => {
                let effective = effective_content_location(&ind, self.append_transaction_id);
                let location = std::str::from_utf8(&effective)
                    .map_err(|e| {
                        Error::malformed(
                            HeaderField::ContentLocation.name(),
                            format!("content-location is not UTF-8: {}", e),
                        )
                    })?
                    .to_string();
                if self.append_transaction_id && ind.content_location() != Some(&effective[..]) {
                    debug!("Transaction-id ajouté au content-location: {}", location);
                    ind.set_content_location(effective);
                }

                if !self.store.insert(location.clone()) {
                    warn!("Notification en double ignorée: {}", location);
                    return Ok(PushOutcome::Duplicate { location });
                }
                info!("Nouvelle notification MMS: {}", location);
                PushOutcome::Download {
                    location,
                    notification: ind,
                }
            }
            PduVariant::DeliveryInd(_) | PduVariant::ReadOrigInd(_) => {
                let message_id = pdu
                    .message_id()
                    .map(|m| String::from_utf8_lossy(m).into_owned())
                    .unwrap_or_default();
                debug!("Rapport reçu pour {}: {}", message_id, pdu.describe());
                PushOutcome::Report { message_id, pdu }
            }
            other => {
                warn!("PDU non traitée en réception: {}", other.describe());
                PushOutcome::Ignored {
                    message_type: other.message_type(),
                }
            }
        };
        Ok(outcome)
    }
}
