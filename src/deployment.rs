use std::path::{Path, PathBuf};

use ethers::types::Address;
use ethers::utils::to_checksum;
use tracing::{info, instrument};
use url::Url;

use self::sequencer::Sequencer;
use crate::artifacts::ArtifactLoader;
use crate::cli::{Args, PrivateKey};
use crate::config::Config;
use crate::error::DeployError;
use crate::report::{self, DeploymentRecord};
use crate::signer::{DeploymentSigner, RpcSigner};

pub mod fund_vault;
pub mod plan;
pub mod sequencer;

pub async fn run_deployment(args: Args) -> eyre::Result<()> {
    let config = Config::load(&args).await?;
    let token_address = config.token_address()?;

    let private_key = match args.private_key {
        Some(private_key) => private_key,
        None => prompt_private_key()?,
    };

    info!("Deploying to {}...", config.network.name);

    let signer = RpcSigner::connect(
        &config.network,
        &private_key,
        config.confirmation.clone(),
    )
    .await?;

    info!(deployer = ?signer.address(), "Deploying from");

    let (record, record_path) = deploy(&config, token_address, &signer).await?;

    print_next_steps(&config, &record, &record_path);

    Ok(())
}

/// Runs the vault deployment and writes its record.
///
/// Nothing is written unless every step succeeded.
#[instrument(skip_all, fields(network = %config.network.name))]
pub async fn deploy(
    config: &Config,
    token_address: Address,
    signer: &dyn DeploymentSigner,
) -> Result<(DeploymentRecord, PathBuf), DeployError> {
    let plan = fund_vault::plan(&config.token.role, token_address);
    let loader = ArtifactLoader::new(&config.paths.build_dir);

    let outcome = Sequencer::new(signer, &loader).execute(&plan).await?;

    for contract in &outcome.deployed {
        info!(
            address = ?contract.address,
            tx_hash = ?contract.tx_hash,
            "{} confirmed",
            contract.name
        );
    }

    let record = DeploymentRecord::new(
        &config.network.name,
        signer.chain_id(),
        signer.address(),
        outcome.addresses,
    );

    let record_path = config.record_path();
    report::persist(&record, &record_path).await?;

    Ok((record, record_path))
}

fn prompt_private_key() -> eyre::Result<PrivateKey> {
    loop {
        let secret = inquire::Password::new("Private key:")
            .without_confirmation()
            .with_display_mode(inquire::PasswordDisplayMode::Masked)
            .prompt()?;

        match secret.parse() {
            Ok(private_key) => return Ok(private_key),
            Err(err) => println!("Error: {err}"),
        }
    }
}

fn print_next_steps(
    config: &Config,
    record: &DeploymentRecord,
    record_path: &Path,
) {
    println!();
    println!("Deployment complete at {}", record.timestamp_string());
    println!("Deployment info saved to {}", record_path.display());
    println!();
    println!("Contracts:");
    for (name, address) in &record.contracts {
        println!("  {name}: {}", to_checksum(address, None));
    }
    println!();
    println!("Next steps:");
    println!("1. Verify contracts on the block explorer");
    println!("2. Get testnet {} from a faucet", config.token.role);
    println!("3. Test deposit flow");

    if let Some(explorer_url) = config.network.explorer_url.as_ref() {
        println!();
        println!("Explorer:");
        for name in [fund_vault::FUND_VAULT, fund_vault::GOVERNANCE] {
            let link = record
                .contracts
                .get(name)
                .and_then(|address| explorer_link(explorer_url, address));

            if let Some(link) = link {
                println!("  {name}: {link}");
            }
        }
    }
}

/// `<explorer>/address/<checksummed address>`, keeping any base path.
fn explorer_link(explorer_url: &Url, address: &Address) -> Option<Url> {
    let mut link = explorer_url.clone();
    link.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push("address")
        .push(&to_checksum(address, None));

    Some(link)
}
