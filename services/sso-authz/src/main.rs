//! Operator entry point: loads the keystore, reports what it can do and
//! prints the documents a host would publish.

use anyhow::Context;
use sso_authz::discovery::ProviderMetadata;
use sso_authz::jwks::Jwks;
use sso_authz::{Config, JoseService, KeyRegistry, SharedJoseService};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;
    rust_common::init_tracing(&config.tracing_config());

    info!(issuer = %config.issuer, keystore = %config.keystore_path.display(), "Starting SSO authorization core");

    let registry = KeyRegistry::from_file(&config.keystore_path).context("loading keystore")?;
    let service = JoseService::new(registry, config.jose_defaults()).context("building JOSE service")?;
    let shared = SharedJoseService::new(service);
    let jose = shared.snapshot();

    info!(
        encrypters = ?jose.encrypter_key_ids(),
        decrypters = ?jose.decrypter_key_ids(),
        signers = ?jose.signer_key_ids(),
        default_signing_key = ?jose.default_signing_key_id(),
        "JOSE capabilities"
    );

    let metadata = ProviderMetadata::from_service(&config.issuer, &jose);
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    let jwks = Jwks::from_service(&jose);
    if jwks.is_empty() {
        warn!("No public keys to publish");
    } else {
        info!(keys = jwks.len(), "JWKS ready");
    }
    println!("{}", jwks.to_json()?);

    Ok(())
}
