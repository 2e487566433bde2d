// CLI utility to decode one packet payload against a protocol document
// Usage: packet_dump <protocol.json> <type> <hex payload>
//   <type> is either a bare name ("packet") or "namespace:name"
//   ("play/toClient:packet_chat"); RUST_LOG controls verbosity.

use std::env;
use std::fs;

use anyhow::{bail, Context, Result};
use tracing::info;

use protodec::{decode_packet, ResourceLocation, TypeRegistry};

fn parse_type_id(spec: &str) -> ResourceLocation {
    match spec.split_once(':') {
        Some((namespace, name)) => ResourceLocation::new(namespace, name),
        None => ResourceLocation::global(spec),
    }
}

fn parse_hex(hex: &str) -> Result<Vec<u8>> {
    let cleaned: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.len() % 2 != 0 {
        bail!("hex payload has an odd number of digits");
    }
    (0..cleaned.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&cleaned[i..i + 2], 16)
                .with_context(|| format!("bad hex byte at offset {i}"))
        })
        .collect()
}

fn main() -> Result<()> {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: packet_dump <protocol.json> <type> <hex payload>");
        std::process::exit(1);
    }

    let document: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(&args[1])
            .with_context(|| format!("Failed to read protocol document {}", args[1]))?,
    )
    .context("Protocol document is not valid JSON")?;

    let registry = TypeRegistry::from_protocol(&document)
        .context("Failed to load type definitions")?;
    info!(types = registry.type_ids().count(), "protocol loaded");

    let type_id = parse_type_id(&args[2]);
    let handler = registry
        .handler(&type_id)
        .with_context(|| format!("Type {type_id} is not defined"))?;

    let payload = parse_hex(&args[3])?;
    let value = decode_packet(&handler, payload)
        .with_context(|| format!("Failed to decode payload as {type_id}"))?;

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
