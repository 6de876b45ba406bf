use anyhow::{Context, Result};
use clap::Parser;
use mms_pdu_core::{decode_batch, pcap, CodecConfig, Error, PduDecoder, PushProcessor};
use std::fs;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mms_pdu")]
#[command(about = "Décode des PDU MMS (fichier brut ou capture PCAP de push WAP) en rapport JSON")]
struct Args {
    /// PDU MMS brute à décoder
    #[arg(short, long, conflicts_with = "pcap", required_unless_present = "pcap")]
    input: Option<String>,

    /// Capture PCAP contenant des datagrammes de push WAP
    #[arg(short, long)]
    pcap: Option<String>,

    /// Fichier de sortie JSON
    #[arg(short, long)]
    out: String,

    /// Configuration du codec (JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Ajoute le transaction-id aux content-location terminés par '='
    #[arg(long)]
    append_transaction_id: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CodecConfig::from_json_file(path)
            .with_context(|| format!("Échec du chargement de la configuration: {}", path))?,
        None => CodecConfig::default(),
    };
    if args.append_transaction_id {
        config = config.with_append_transaction_id(true);
    }

    let output = match (&args.input, &args.pcap) {
        (Some(input), _) => report_raw(input, &config)?,
        (None, Some(path)) => report_pcap(path, &config)?,
        (None, None) => anyhow::bail!("--input ou --pcap est requis"),
    };

    fs::write(&args.out, serde_json::to_string_pretty(&output)?)
        .with_context(|| format!("Échec de l'écriture du fichier: {}", args.out))?;

    info!("Résultats sauvegardés dans: {}", args.out);

    Ok(())
}

/// Rapport pour une PDU brute
fn report_raw(path: &str, config: &CodecConfig) -> Result<serde_json::Value> {
    info!("Chargement de la PDU: {}", path);
    let data = fs::read(path).with_context(|| format!("Échec de la lecture: {}", path))?;

    let pdu = PduDecoder::from_config(config)
        .decode(&data)
        .with_context(|| format!("Échec du décodage de la PDU: {}", path))?;
    info!("PDU décodée: {}", pdu.describe());

    let mut processor = PushProcessor::from_config(config);
    let outcome = processor.dispatch(pdu.clone())?;

    Ok(serde_json::json!({
        "source": path,
        "size": data.len(),
        "pdu": pdu,
        "outcome": outcome,
    }))
}

/// Rapport pour une capture : décodage parallèle puis traitement des pushs dans l'ordre
fn report_pcap(path: &str, config: &CodecConfig) -> Result<serde_json::Value> {
    info!("Chargement du fichier PCAP: {}", path);
    let flow = pcap::parse_pcap(path)
        .with_context(|| format!("Échec du parsing PCAP: {}", path))?;

    info!("{} datagrammes de push WAP trouvés", flow.len());

    if flow.is_empty() {
        anyhow::bail!("Aucun datagramme de push WAP dans le fichier PCAP");
    }

    let mut bodies: Vec<Arc<[u8]>> = Vec::new();
    let mut rejected = Vec::new();
    for (index, body) in flow.mms_bodies().into_iter().enumerate() {
        match body {
            Ok(body) => bodies.push(body),
            Err(e) => {
                warn!("Datagramme {} ignoré: {}", index, e);
                let mut entry = error_entry(&e);
                entry["index"] = serde_json::json!(index);
                rejected.push(entry);
            }
        }
    }

    let decoder = PduDecoder::from_config(config);
    let decoded = decode_batch(&decoder, &bodies);
    let pdus: Vec<serde_json::Value> = decoded
        .iter()
        .map(|result| match result {
            Ok(pdu) => serde_json::json!({ "pdu": pdu }),
            Err(e) => error_entry(e),
        })
        .collect();

    let mut processor = PushProcessor::from_config(config);
    let outcomes: Vec<serde_json::Value> = decoded
        .into_iter()
        .map(|result| match result.and_then(|pdu| processor.dispatch(pdu)) {
            Ok(outcome) => serde_json::json!(outcome),
            Err(e) => error_entry(&e),
        })
        .collect();
    info!(
        "Traitement terminé: {} PDU, {} datagrammes rejetés",
        pdus.len(),
        rejected.len()
    );

    Ok(serde_json::json!({
        "flow": flow,
        "pdus": pdus,
        "outcomes": outcomes,
        "rejected": rejected,
        "summary": {
            "total_datagrams": flow.len(),
            "mms_bodies": bodies.len(),
        }
    }))
}

/// Entrée d'erreur du rapport : une entrée invalide est abandonnée,
/// une erreur d'E/S ou de capture peut être réessayée
fn error_entry(e: &Error) -> serde_json::Value {
    let retryable = !e.is_malformed_input();
    if retryable {
        warn!("Échec non lié au contenu: {}", e);
    } else {
        debug!("PDU invalide abandonnée: {}", e);
    }
    serde_json::json!({ "error": e.to_string(), "retryable": retryable })
}
