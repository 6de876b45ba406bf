pub mod config;
pub mod content_type;
pub mod corpus;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod headers;
pub mod location;
pub mod pcap;
pub mod pdu;
pub mod push;
pub mod retrieve;
pub mod wsp;

#[cfg(test)]
mod tests;

pub use config::CodecConfig;
pub use content_type::{ContentParam, ContentType, MediaType};
pub use corpus::{decode_batch, Direction, Flow, UdpDatagram};
pub use decoder::{decode, PduDecoder};
pub use encoder::encode;
pub use error::{Error, Result};
pub use headers::{
    EncodedString, FromAddress, HeaderField, HeaderValue, MessageClass, PduHeaders, TimeValue,
    ValueKind,
};
pub use location::{
    append_transaction_id_to, effective_content_location, is_duplicate, BoundedDedupStore,
    DedupStore,
};
pub use pdu::{
    DeliveryInd, GenericPdu, MessageType, NotificationInd, Pdu, PduBody, PduPart, PduVariant,
    ReadOrigInd, RetrieveConf, SendReq,
};
pub use push::{parse_push, PushOutcome, PushProcessor, WspPush};
pub use retrieve::{accept_retrieve_conf, acknowledge_ind, notify_resp_ind, RetrievedMessage};
