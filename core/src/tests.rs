#[cfg(test)]
mod tests {
    use crate::config::CodecConfig;
    use crate::content_type::{
        ContentParam, ContentType, MediaType, MULTIPART_RELATED, TEXT_PLAIN,
    };
    use crate::corpus::{decode_batch, Direction};
    use crate::decoder::{decode, PduDecoder};
    use crate::encoder::encode;
    use crate::headers::{
        EncodedString, FromAddress, HeaderField, HeaderValue, MessageClass, TimeValue,
    };
    use crate::location::{
        effective_content_location, is_duplicate, BoundedDedupStore, DedupStore,
    };
    use crate::pdu::{
        DeliveryInd, GenericPdu, MessageType, NotificationInd, Pdu, PduBody, PduPart,
        PduVariant, ReadOrigInd, RetrieveConf, SendReq, MMS_VERSION_1_2,
    };
    use crate::pcap::{extract_push_datagram, parse_pcap};
    use crate::push::{parse_push, PushOutcome, PushProcessor};
    use crate::retrieve::{
        accept_retrieve_conf, acknowledge_ind, notify_resp_ind, STATUS_DEFERRED,
        STATUS_RETRIEVED,
    };
    use crate::Error;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    /// Text-string terminé par NUL
    fn text(s: &str) -> Vec<u8> {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        bytes
    }

    fn minimal_notification_bytes() -> Vec<u8> {
        let mut data = vec![0x8C, 0x82];
        data.push(0x83);
        data.extend(text("http://mmsc/1"));
        data.push(0x98);
        data.extend(text("AB"));
        data
    }

    fn sample_retrieve_conf() -> RetrieveConf {
        let ct = ContentType::well_known(MULTIPART_RELATED)
            .with_param(ContentParam::Type(MediaType::Extension(b"application/smil".to_vec())))
            .with_param(ContentParam::Start(b"<smil>".to_vec()));
        let parts = vec![
            PduPart::new(
                ContentType::new(MediaType::Extension(b"application/smil".to_vec())),
                b"<smil><body/></smil>".to_vec(),
            )
            .with_content_id(b"<smil>")
            .unwrap(),
            PduPart::new(
                ContentType::well_known(TEXT_PLAIN).with_param(ContentParam::Charset(106)),
                "bonjour à tous".as_bytes().to_vec(),
            )
            .with_content_location(b"text_0.txt")
            .unwrap(),
        ];

        let mut conf = RetrieveConf::new(ct, PduBody::Multipart(parts));
        let headers = conf.headers_mut();
        headers
            .set(HeaderField::TransactionId, HeaderValue::Text(b"T-9".to_vec()))
            .unwrap();
        headers
            .set(HeaderField::MmsVersion, HeaderValue::Octet(MMS_VERSION_1_2))
            .unwrap();
        headers
            .set(HeaderField::MessageId, HeaderValue::Text(b"mid-0001".to_vec()))
            .unwrap();
        headers
            .set(HeaderField::Date, HeaderValue::LongInteger(1_700_000_000))
            .unwrap();
        headers
            .set(
                HeaderField::From,
                HeaderValue::From(FromAddress::Present(EncodedString::new(
                    "+33612345678/TYPE=PLMN",
                ))),
            )
            .unwrap();
        headers
            .append_address(HeaderField::To, EncodedString::new("+33700000000/TYPE=PLMN"))
            .unwrap();
        headers
            .set(
                HeaderField::Subject,
                HeaderValue::EncodedString(EncodedString::utf8("Vacances été")),
            )
            .unwrap();
        conf
    }

    #[test]
    fn test_decode_minimal_notification_ind() {
        let pdu = decode(&minimal_notification_bytes()).expect("notification valide");

        let PduVariant::NotificationInd(ind) = pdu else {
            panic!("NotificationInd attendue");
        };
        assert_eq!(ind.content_location(), Some(&b"http://mmsc/1"[..]));
        assert_eq!(ind.transaction_id(), Some(&b"AB"[..]));
        assert_eq!(ind.message_type(), MessageType::NotificationInd);
        // Aucun autre champ ne doit être présent
        assert_eq!(ind.headers().len(), 3);
        assert_eq!(ind.expiry(), None);
        assert_eq!(ind.message_size(), None);
        assert_eq!(ind.message_class(), None);
        assert_eq!(ind.mms_version(), None);
    }

    #[test]
    fn test_encode_notification_canonical_bytes() {
        let ind = NotificationInd::new(b"http://mmsc/1", b"AB");
        let bytes = encode(&ind.into()).unwrap();

        // Type, transaction-id, puis les autres champs par code croissant
        let mut expected = vec![0x8C, 0x82, 0x98];
        expected.extend(text("AB"));
        expected.push(0x83);
        expected.extend(text("http://mmsc/1"));
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_unknown_message_type() {
        let mut data = vec![0x8C, 0x9F, 0x98];
        data.extend(text("X"));

        let err = decode(&data).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(0x9F)), "{:?}", err);
    }

    #[test]
    fn test_empty_buffer_is_truncated() {
        assert!(matches!(decode(&[]).unwrap_err(), Error::Truncated { .. }));
    }

    #[test]
    fn test_truncated_text_string() {
        let mut data = vec![0x8C, 0x82, 0x83];
        data.extend_from_slice(b"http://mm");

        let err = decode(&data).unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }), "{:?}", err);
    }

    #[test]
    fn test_first_field_must_be_message_type() {
        let mut data = vec![0x98];
        data.extend(text("A"));
        data.extend([0x8C, 0x82]);

        assert!(matches!(decode(&data).unwrap_err(), Error::InvalidHeader(_)));
    }

    #[test]
    fn test_missing_mandatory_field() {
        // Notification sans content-location
        let mut data = vec![0x8C, 0x82, 0x98];
        data.extend(text("A"));

        let err = decode(&data).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(ref m) if m.contains("X-Mms-Content-Location")));
    }

    #[test]
    fn test_wrong_primitive_is_malformed() {
        // Date attend un long-integer, un short-integer est une erreur
        let mut data = vec![0x8C, 0x86, 0x8B];
        data.extend(text("m"));
        data.extend([0x95, 0x81, 0x85, 0x81]);

        let err = decode(&data).unwrap_err();
        assert!(
            matches!(err, Error::MalformedField { ref field, .. } if field == "Date"),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_octet_field_requires_token() {
        let mut data = vec![0x8C, 0x86, 0x8B];
        data.extend(text("m"));
        data.extend([0x95, 0x01]);

        assert!(matches!(decode(&data).unwrap_err(), Error::MalformedField { .. }));
    }

    #[test]
    fn test_uintvar_longer_than_five_octets() {
        // Content-Type en forme générale avec une longueur uintvar invalide
        let data = [0x8C, 0x84, 0x84, 0x1F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];

        let err = decode(&data).unwrap_err();
        assert!(matches!(err, Error::MalformedField { .. }), "{:?}", err);
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let mut data = minimal_notification_bytes();
        // X-Mms-Previously-Sent-By (non supporté), valeur en value-length
        data.extend([0xA0, 0x03, 0x81, 0x41, 0x00]);
        // En-tête applicatif
        data.extend(text("X-Carrier"));
        data.extend(text("foo"));
        data.push(0x8E);
        data.extend([0x02, 0x30, 0x39]);

        let PduVariant::NotificationInd(ind) = decode(&data).unwrap() else {
            panic!("NotificationInd attendue");
        };
        assert_eq!(ind.message_size(), Some(12345));
        assert_eq!(ind.headers().len(), 4);
    }

    #[test]
    fn test_decode_encoded_string_with_charset() {
        let mut data = minimal_notification_bytes();
        data.extend([0x96, 0x07, 0xEA]);
        data.extend(text("hello"));

        let PduVariant::NotificationInd(ind) = decode(&data).unwrap() else {
            panic!("NotificationInd attendue");
        };
        assert_eq!(ind.subject(), Some(&EncodedString::utf8("hello")));
    }

    #[test]
    fn test_notification_round_trip() {
        let ind = NotificationInd::new(b"http://mmsc.example.com/mms?id=", b"0123456789")
            .with_version(MMS_VERSION_1_2)
            .with_expiry(TimeValue::Relative(604_800))
            .with_message_size(48_213)
            .with_message_class(MessageClass::Personal)
            .with_from(FromAddress::Present(EncodedString::utf8("+33612345678/TYPE=PLMN")));
        let pdu: PduVariant = ind.into();

        let bytes = encode(&pdu).unwrap();
        assert_eq!(decode(&bytes).unwrap(), pdu);
    }

    #[test]
    fn test_retrieve_conf_round_trip() {
        let conf = sample_retrieve_conf();
        let pdu: PduVariant = conf.clone().into();

        let bytes = encode(&pdu).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, pdu);

        let PduVariant::RetrieveConf(decoded) = decoded else {
            panic!("RetrieveConf attendue");
        };
        let parts = decoded.body().parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].content_id(), Some(b"<smil>".to_vec()));
        assert_eq!(parts[0].content_location(), None);
        assert_eq!(parts[1].content_location(), Some(b"text_0.txt".to_vec()));
        assert_eq!(parts[1].content_type.charset(), Some(106));
        assert_eq!(decoded.content_type().and_then(|ct| ct.start()), Some(&b"<smil>"[..]));
        assert_eq!(decoded.date(), Some(1_700_000_000));
    }

    #[test]
    fn test_send_req_round_trip() {
        let mut req = SendReq::new(
            b"send-1",
            ContentType::well_known(TEXT_PLAIN),
            PduBody::Single(b"salut".to_vec()),
        );
        let headers = req.headers_mut();
        headers
            .set(HeaderField::From, HeaderValue::From(FromAddress::Insert))
            .unwrap();
        for to in ["+33600000001/TYPE=PLMN", "alice@example.com"] {
            headers
                .append_address(HeaderField::To, EncodedString::new(to))
                .unwrap();
        }
        headers
            .append_address(HeaderField::Cc, EncodedString::utf8("bob@example.com"))
            .unwrap();
        headers
            .append_address(HeaderField::Bcc, EncodedString::new("carol@example.com"))
            .unwrap();
        headers
            .set(HeaderField::DeliveryReport, HeaderValue::Octet(0x80))
            .unwrap();
        headers
            .set(HeaderField::Expiry, HeaderValue::Time(TimeValue::Absolute(1_800_000_000)))
            .unwrap();
        let pdu: PduVariant = req.into();

        let decoded = decode(&encode(&pdu).unwrap()).unwrap();
        assert_eq!(decoded, pdu);

        let PduVariant::SendReq(req) = decoded else {
            panic!("SendReq attendue");
        };
        assert_eq!(req.to().map(|t| t.len()), Some(2));
        assert_eq!(req.from(), Some(&FromAddress::Insert));
        assert_eq!(req.delivery_report(), Some(0x80));
        assert_eq!(req.read_report(), None);
        assert_eq!(req.body(), &PduBody::Single(b"salut".to_vec()));
    }

    #[test]
    fn test_delivery_and_read_orig_round_trip() {
        let mut delivery = DeliveryInd::new(b"mid-42", 0x81).with_date(1_600_000_000);
        delivery
            .headers_mut()
            .append_address(HeaderField::To, EncodedString::new("+33611111111/TYPE=PLMN"))
            .unwrap();
        let pdu: PduVariant = delivery.into();
        assert_eq!(decode(&encode(&pdu).unwrap()).unwrap(), pdu);

        let read = ReadOrigInd::new(b"mid-42", 0x80);
        let pdu: PduVariant = read.into();
        let PduVariant::ReadOrigInd(decoded) = decode(&encode(&pdu).unwrap()).unwrap() else {
            panic!("ReadOrigInd attendue");
        };
        assert_eq!(decoded.message_id(), Some(&b"mid-42"[..]));
        assert_eq!(decoded.read_status(), Some(0x80));
        assert_eq!(decoded.date(), None);
    }

    #[test]
    fn test_generic_pdu_cannot_shadow_dedicated_variant() {
        assert!(GenericPdu::new(MessageType::NotificationInd).is_err());
        assert!(GenericPdu::new(MessageType::SendConf).is_ok());
    }

    #[test]
    fn test_encode_refuses_missing_mandatory_field() {
        let conf = GenericPdu::new(MessageType::SendConf).unwrap();

        let err = encode(&conf.into()).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[test]
    fn test_encode_refuses_multipart_body_mismatch() {
        let conf = RetrieveConf::new(
            ContentType::well_known(TEXT_PLAIN),
            PduBody::Multipart(vec![]),
        );

        assert!(matches!(encode(&conf.into()).unwrap_err(), Error::InvalidHeader(_)));
    }

    #[test]
    fn test_headers_set_checks_primitive() {
        let mut ind = NotificationInd::new(b"loc", b"tid");
        let err = ind
            .headers_mut()
            .set(HeaderField::Date, HeaderValue::Text(b"hier".to_vec()))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedField { .. }));
    }

    #[test]
    fn test_transaction_id_appended_when_enabled() {
        let ind = NotificationInd::new(b"http://x.com/y=", b"42");

        assert_eq!(effective_content_location(&ind, true), b"http://x.com/y=42".to_vec());
        assert_eq!(effective_content_location(&ind, false), b"http://x.com/y=".to_vec());
    }

    #[test]
    fn test_location_without_delimiter_never_modified() {
        let ind = NotificationInd::new(b"http://x.com/y", b"42");

        assert_eq!(effective_content_location(&ind, true), b"http://x.com/y".to_vec());
        assert_eq!(effective_content_location(&ind, false), b"http://x.com/y".to_vec());
    }

    #[test]
    fn test_is_duplicate() {
        let known: HashSet<String> = ["loc1", "loc2"].iter().map(|s| s.to_string()).collect();

        assert!(is_duplicate("loc1", &known));
        assert!(!is_duplicate("loc3", &known));
    }

    #[test]
    fn test_bounded_dedup_store_evicts_oldest() {
        let mut store = BoundedDedupStore::new(2);
        assert!(store.insert("a".to_string()));
        assert!(store.insert("b".to_string()));
        assert!(!store.insert("a".to_string()));
        assert!(store.insert("c".to_string()));

        assert_eq!(store.len(), 2);
        assert!(!store.contains("a"));
        assert!(store.contains("b"));
        assert!(store.contains("c"));
    }

    #[test]
    fn test_push_processor_downloads_once() {
        let config = CodecConfig::new();
        let mut processor = PushProcessor::from_config(&config);
        let data = minimal_notification_bytes();

        match processor.process(&data).unwrap() {
            PushOutcome::Download { location, notification } => {
                assert_eq!(location, "http://mmsc/1");
                assert_eq!(notification.transaction_id(), Some(&b"AB"[..]));
            }
            other => panic!("Download attendu, obtenu {:?}", other),
        }
        assert_eq!(
            processor.process(&data).unwrap(),
            PushOutcome::Duplicate {
                location: "http://mmsc/1".to_string()
            }
        );
    }

    #[test]
    fn test_push_processor_appends_transaction_id() {
        let config = CodecConfig::new().with_append_transaction_id(true);
        let mut processor = PushProcessor::new(&config, HashSet::<String>::new());
        let ind = NotificationInd::new(b"http://mmsc/get?id=", b"T1");
        let data = encode(&ind.into()).unwrap();

        let PushOutcome::Download { location, notification } = processor.process(&data).unwrap()
        else {
            panic!("Download attendu");
        };
        assert_eq!(location, "http://mmsc/get?id=T1");
        assert_eq!(notification.content_location(), Some(&b"http://mmsc/get?id=T1"[..]));
        assert!(processor.store().contains("http://mmsc/get?id=T1"));
    }

    #[test]
    fn test_push_processor_reports_and_ignores() {
        let mut processor = PushProcessor::from_config(&CodecConfig::default());

        let delivery = encode(&DeliveryInd::new(b"mid-7", 0x81).into()).unwrap();
        match processor.process(&delivery).unwrap() {
            PushOutcome::Report { message_id, pdu } => {
                assert_eq!(message_id, "mid-7");
                assert_eq!(pdu.message_type(), MessageType::DeliveryInd);
            }
            other => panic!("Report attendu, obtenu {:?}", other),
        }

        let mut conf = GenericPdu::new(MessageType::SendConf).unwrap();
        conf.headers_mut()
            .set(HeaderField::TransactionId, HeaderValue::Text(b"t".to_vec()))
            .unwrap();
        conf.headers_mut()
            .set(HeaderField::ResponseStatus, HeaderValue::Octet(0x80))
            .unwrap();
        let data = encode(&conf.into()).unwrap();
        assert_eq!(
            processor.process(&data).unwrap(),
            PushOutcome::Ignored {
                message_type: MessageType::SendConf
            }
        );
    }

    #[test]
    fn test_wsp_push_envelope() {
        // TID, Push, longueur des en-têtes, application/vnd.wap.mms-message
        let mut datagram = vec![0x01, 0x06, 0x01, 0xBE];
        datagram.extend(minimal_notification_bytes());

        let push = parse_push(&datagram).unwrap();
        assert_eq!(push.transaction_id, 0x01);
        assert_eq!(push.mms_body().unwrap(), &minimal_notification_bytes()[..]);

        let mut processor = PushProcessor::from_config(&CodecConfig::default());
        assert!(matches!(
            processor.process_datagram(&datagram).unwrap(),
            PushOutcome::Download { .. }
        ));
    }

    #[test]
    fn test_wsp_push_rejects_other_content() {
        let datagram = [0x01, 0x06, 0x01, 0x83, b'h', b'i'];
        let push = parse_push(&datagram).unwrap();
        assert!(matches!(push.mms_body().unwrap_err(), Error::InvalidHeader(_)));

        let not_push = [0x01, 0x04, 0x00];
        assert!(matches!(parse_push(&not_push).unwrap_err(), Error::UnsupportedType(0x04)));
    }

    #[test]
    fn test_accept_retrieve_conf() {
        let decoder = PduDecoder::new();
        let bytes = encode(&sample_retrieve_conf().into()).unwrap();

        let retrieved = accept_retrieve_conf(&decoder, &bytes).unwrap();
        assert_eq!(retrieved.date_sent, Some(1_700_000_000));
        assert_eq!(retrieved.message_size, bytes.len());

        let err = accept_retrieve_conf(&decoder, &minimal_notification_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
        assert!(matches!(
            accept_retrieve_conf(&decoder, &[]).unwrap_err(),
            Error::Truncated { .. }
        ));
    }

    #[test]
    fn test_acknowledgements_round_trip() {
        let ack = acknowledge_ind(&sample_retrieve_conf()).unwrap();
        let bytes = encode(&ack.clone().into()).unwrap();
        assert_eq!(&bytes[..2], &[0x8C, 0x85]);
        assert_eq!(decode(&bytes).unwrap(), PduVariant::Generic(ack));

        let ind = NotificationInd::new(b"http://mmsc/1", b"AB").with_version(MMS_VERSION_1_2);
        let resp = notify_resp_ind(&ind, STATUS_DEFERRED).unwrap();
        let PduVariant::Generic(decoded) = decode(&encode(&resp.into()).unwrap()).unwrap() else {
            panic!("GenericPdu attendue");
        };
        assert_eq!(decoded.message_type(), MessageType::NotifyRespInd);
        assert_eq!(decoded.status(), Some(STATUS_DEFERRED));
        assert_eq!(decoded.mms_version(), Some(MMS_VERSION_1_2));
    }

    #[test]
    fn test_decoder_size_limit() {
        let decoder = PduDecoder::new().with_max_pdu_size(8);
        let err = decoder.decode(&minimal_notification_bytes()).unwrap_err();
        assert!(matches!(err, Error::MalformedField { .. }));
    }

    #[test]
    fn test_config_from_json() {
        let config = CodecConfig::from_json_str(r#"{ "append_transaction_id": true }"#).unwrap();
        assert!(config.append_transaction_id);
        assert_eq!(config.dedup_capacity, CodecConfig::DEFAULT_DEDUP_CAPACITY);

        let err = CodecConfig::from_json_str(r#"{ "dedup_capacity": 0 }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(CodecConfig::from_json_str("pas du json").is_err());
    }

    #[test]
    fn test_decode_batch() {
        let good: Arc<[u8]> = Arc::from(minimal_notification_bytes());
        let bad: Arc<[u8]> = Arc::from(vec![0x8C, 0x9F]);

        let results = decode_batch(&PduDecoder::new(), &[good, bad]);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::UnsupportedType(0x9F))));
    }

    #[test]
    fn test_text_field_rejects_other_primitive() {
        // Short-integer à la place du content-location
        let mut data = vec![0x8C, 0x82, 0x98];
        data.extend(text("A"));
        data.extend([0x83, 0x85, 0x00]);
        let err = decode(&data).unwrap_err();
        assert!(
            matches!(
                err,
                Error::MalformedField { ref field, .. } if field == "X-Mms-Content-Location"
            ),
            "{:?}",
            err
        );

        // Valeur préfixée par une longueur (encoded-string avec charset)
        let mut data = vec![0x8C, 0x82, 0x98];
        data.extend(text("A"));
        data.extend([0x83, 0x03, 0xEA, b'x', 0x00]);
        assert!(matches!(decode(&data).unwrap_err(), Error::MalformedField { .. }));
    }

    #[test]
    fn test_text_writer_refuses_length_octet() {
        let ind = NotificationInd::new(b"\x05http://mmsc/1", b"AB");
        assert!(matches!(encode(&ind.into()).unwrap_err(), Error::MalformedField { .. }));

        // Un premier octet >= 0x80 est protégé par le guillemet 0x7F
        let ind = NotificationInd::new("été://mmsc/1".as_bytes(), b"AB");
        let pdu: PduVariant = ind.into();
        let bytes = encode(&pdu).unwrap();
        assert_eq!(&bytes[6..8], &[0x83, 0x7F]);
        assert_eq!(decode(&bytes).unwrap(), pdu);
    }

    #[test]
    fn test_empty_address_list_refused() {
        let mut req = SendReq::new(
            b"send-2",
            ContentType::well_known(TEXT_PLAIN),
            PduBody::Single(Vec::new()),
        );
        let err = req
            .headers_mut()
            .set(HeaderField::To, HeaderValue::AddressList(vec![]))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedField { .. }));

        // L'encodeur refuse aussi une liste vide insérée sans contrôle
        req.headers_mut()
            .put(HeaderField::To, HeaderValue::AddressList(vec![]));
        assert!(matches!(encode(&req.into()).unwrap_err(), Error::InvalidHeader(_)));
    }

    #[test]
    fn test_push_processor_rejects_non_utf8_location() {
        let mut processor = PushProcessor::from_config(&CodecConfig::default());

        for location in [&b"http://m/\xff"[..], &b"http://m/\xfe"[..]] {
            let data = encode(&NotificationInd::new(location, b"T").into()).unwrap();
            let err = processor.process(&data).unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::MalformedField { ref field, .. } if field == "X-Mms-Content-Location"
                ),
                "{:?}",
                err
            );
        }
        assert!(processor.store().is_empty());
    }

    #[test]
    fn test_push_processor_dispatch_decoded_pdu() {
        let mut processor = PushProcessor::from_config(&CodecConfig::default());
        let pdu = decode(&minimal_notification_bytes()).unwrap();

        assert!(matches!(
            processor.dispatch(pdu.clone()).unwrap(),
            PushOutcome::Download { .. }
        ));
        assert!(matches!(
            processor.dispatch(pdu).unwrap(),
            PushOutcome::Duplicate { .. }
        ));
    }

    #[test]
    fn test_acknowledgements_default_version() {
        let ind = NotificationInd::new(b"http://mmsc/1", b"AB");
        let resp = notify_resp_ind(&ind, STATUS_RETRIEVED).unwrap();
        let bytes = encode(&resp.into()).unwrap();
        assert_eq!(
            bytes,
            vec![0x8C, 0x83, 0x98, b'A', b'B', 0x00, 0x8D, MMS_VERSION_1_2, 0x95, 0x81]
        );

        let mut conf = RetrieveConf::new(
            ContentType::well_known(TEXT_PLAIN),
            PduBody::Single(b"hi".to_vec()),
        );
        conf.headers_mut()
            .set(HeaderField::TransactionId, HeaderValue::Text(b"T-1".to_vec()))
            .unwrap();
        let ack = acknowledge_ind(&conf).unwrap();
        assert_eq!(ack.mms_version(), Some(MMS_VERSION_1_2));
    }

    #[test]
    fn test_is_malformed_input() {
        let malformed = [
            decode(&[]).unwrap_err(),
            decode(&[0x8C, 0x9F]).unwrap_err(),
            decode(&[0x8C, 0x01]).unwrap_err(),
            decode(&[0x8C, 0x82]).unwrap_err(),
        ];
        for err in &malformed {
            assert!(err.is_malformed_input(), "{:?}", err);
        }

        let missing = parse_pcap("/nonexistent/mms_pdu/capture.pcap").unwrap_err();
        assert!(matches!(missing, Error::Io(_)));
        assert!(!missing.is_malformed_input());
        assert!(!Error::Config("x".to_string()).is_malformed_input());
        assert!(!Error::PcapParse("x".to_string()).is_malformed_input());
    }

    /// Trame Ethernet / IPv4 / UDP complétée à la taille minimale de 60 octets
    fn udp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let builder =
            etherparse::PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
                .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
                .udp(src_port, dst_port);
        let mut frame = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut frame, payload).unwrap();
        if frame.len() < 60 {
            frame.resize(60, 0);
        }
        frame
    }

    fn push_datagram(body: &[u8]) -> Vec<u8> {
        let mut datagram = vec![0x01, 0x06, 0x01, 0xBE];
        datagram.extend_from_slice(body);
        datagram
    }

    #[test]
    fn test_extract_push_datagram_ignores_padding() {
        let payload = [0x01, 0x06, 0x01, 0xBE];
        let frame = udp_frame(9200, 2948, &payload);

        let datagram = extract_push_datagram(1.5, &frame).expect("datagramme de push");
        assert_eq!(&datagram.payload[..], &payload[..]);
        assert_eq!(datagram.direction, Direction::ToTerminal);
        assert_eq!(datagram.dst_port, 2948);

        // Autre port : ignoré
        assert!(extract_push_datagram(1.5, &udp_frame(53, 53, &payload)).is_none());
    }

    #[test]
    fn test_extract_push_datagram_vlan() {
        let body = push_datagram(&minimal_notification_bytes());
        let mut frame = udp_frame(2948, 9200, &body);
        // Étiquette 802.1Q insérée avant l'ethertype
        frame.splice(12..12, [0x81, 0x00, 0x00, 0x64]);

        let datagram = extract_push_datagram(0.0, &frame).expect("datagramme de push");
        assert_eq!(datagram.direction, Direction::FromTerminal);
        assert_eq!(&datagram.payload[..], &body[..]);
    }

    /// Fichier PCAP classique (little-endian, lien Ethernet)
    fn pcap_bytes(packets: &[(u32, Vec<u8>)]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(0xA1B2_C3D4u32.to_le_bytes());
        out.extend(2u16.to_le_bytes());
        out.extend(4u16.to_le_bytes());
        out.extend(0i32.to_le_bytes());
        out.extend(0u32.to_le_bytes());
        out.extend(65_535u32.to_le_bytes());
        out.extend(1u32.to_le_bytes());
        for (ts_sec, frame) in packets {
            out.extend(ts_sec.to_le_bytes());
            out.extend(0u32.to_le_bytes());
            out.extend((frame.len() as u32).to_le_bytes());
            out.extend((frame.len() as u32).to_le_bytes());
            out.extend_from_slice(frame);
        }
        out
    }

    #[test]
    fn test_parse_pcap_capture() {
        let delivery = encode(&DeliveryInd::new(b"mid-7", 0x81).into()).unwrap();
        let capture = pcap_bytes(&[
            (5, udp_frame(9200, 2948, &push_datagram(&minimal_notification_bytes()))),
            (1, udp_frame(5353, 53, b"dns")),
            (3, udp_frame(9200, 2948, &push_datagram(&delivery))),
        ]);
        let path = std::env::temp_dir()
            .join(format!("mms_pdu_capture_{}.pcap", std::process::id()));
        std::fs::write(&path, capture).unwrap();

        let flow = parse_pcap(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();
        let flow = flow.unwrap();

        // Le paquet DNS est écarté, les datagrammes sont triés par date
        assert_eq!(flow.len(), 2);
        assert_eq!(flow.datagrams[0].timestamp, 3.0);
        assert_eq!(flow.datagrams[1].timestamp, 5.0);

        let bodies: Vec<Arc<[u8]>> = flow
            .mms_bodies()
            .into_iter()
            .map(|body| body.unwrap())
            .collect();
        assert_eq!(&bodies[0][..], &delivery[..]);
        assert_eq!(&bodies[1][..], &minimal_notification_bytes()[..]);

        let results = decode_batch(&PduDecoder::new(), &bodies);
        assert_eq!(results[0].as_ref().unwrap().message_type(), MessageType::DeliveryInd);
        assert_eq!(
            results[1].as_ref().unwrap().message_type(),
            MessageType::NotificationInd
        );
    }

    #[test]
    fn test_describe() {
        let pdu = decode(&minimal_notification_bytes()).unwrap();
        assert_eq!(pdu.describe(), "m-notification-ind tid=AB location=http://mmsc/1");
    }

    /// Texte sans NUL dont le premier octet n'est pas un octet de longueur
    fn text_bytes(max: usize) -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(1u8..=255, 0..max).prop_map(|mut text| {
            if let Some(first) = text.first_mut() {
                if *first < 0x20 {
                    *first += 0x20;
                }
            }
            text
        })
    }

    fn encoded_string() -> impl Strategy<Value = EncodedString> {
        prop_oneof![
            proptest::collection::vec(0x20u8..=255, 0..24)
                .prop_map(|text| EncodedString::new(text)),
            (any::<u64>(), text_bytes(24))
                .prop_map(|(charset, text)| EncodedString::with_charset(charset, text)),
        ]
    }

    fn time_value() -> impl Strategy<Value = TimeValue> {
        prop_oneof![
            any::<u64>().prop_map(TimeValue::Absolute),
            any::<u64>().prop_map(TimeValue::Relative),
        ]
    }

    prop_compose! {
        fn notification()(
            location in text_bytes(64),
            tid in text_bytes(16),
            size in proptest::option::of(any::<u64>()),
            expiry in proptest::option::of(time_value()),
            subject in proptest::option::of(encoded_string()),
            class in proptest::option::of(prop_oneof![
                Just(MessageClass::Personal),
                Just(MessageClass::Auto),
                text_bytes(12).prop_map(MessageClass::Other),
            ]),
        ) -> NotificationInd {
            let mut ind = NotificationInd::new(&location, &tid);
            if let Some(size) = size {
                ind = ind.with_message_size(size);
            }
            if let Some(expiry) = expiry {
                ind = ind.with_expiry(expiry);
            }
            if let Some(class) = class {
                ind = ind.with_message_class(class);
            }
            if let Some(subject) = subject {
                ind.headers_mut()
                    .set(HeaderField::Subject, HeaderValue::EncodedString(subject))
                    .unwrap();
            }
            ind
        }
    }

    fn assert_prefix_safe(bytes: &[u8]) -> std::result::Result<(), TestCaseError> {
        for k in 0..bytes.len() {
            match decode(&bytes[..k]) {
                Ok(_)
                | Err(Error::Truncated { .. })
                | Err(Error::MalformedField { .. })
                | Err(Error::InvalidHeader(_)) => {}
                Err(other) => prop_assert!(false, "préfixe {}: erreur inattendue {:?}", k, other),
            }
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_notification_round_trip(ind in notification()) {
            let pdu: PduVariant = ind.into();
            let bytes = encode(&pdu).unwrap();
            prop_assert_eq!(decode(&bytes).unwrap(), pdu);
        }

        #[test]
        fn prop_retrieve_conf_round_trip(
            parts in proptest::collection::vec((text_bytes(12), any::<Vec<u8>>()), 0..4),
        ) {
            let parts = parts
                .into_iter()
                .map(|(id, data)| {
                    PduPart::new(ContentType::well_known(TEXT_PLAIN), data)
                        .with_content_id(&id)
                        .unwrap()
                })
                .collect();
            let pdu: PduVariant = RetrieveConf::new(
                ContentType::well_known(MULTIPART_RELATED),
                PduBody::Multipart(parts),
            )
            .into();
            let bytes = encode(&pdu).unwrap();
            prop_assert_eq!(decode(&bytes).unwrap(), pdu);
        }

        #[test]
        fn prop_notification_prefixes_never_panic(ind in notification()) {
            let bytes = encode(&ind.into()).unwrap();
            assert_prefix_safe(&bytes)?;
        }

        #[test]
        fn prop_arbitrary_bytes_never_panic(
            data in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let _ = decode(&data);
        }
    }

    #[test]
    fn test_retrieve_conf_prefixes_never_panic() {
        let bytes = encode(&sample_retrieve_conf().into()).unwrap();
        assert_prefix_safe(&bytes).unwrap();
    }
}
