use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;
use ethers::types::Address;
use url::Url;

pub mod private_key;

pub use private_key::PrivateKey;

#[derive(Debug, Clone, Parser)]
#[clap(rename_all = "kebab-case")]
pub struct Args {
    /// Path to an optional deployment configuration file (YAML)
    #[clap(short, long, env)]
    pub config: Option<PathBuf>,

    /// Private key of the deployer account
    ///
    /// Prompted for interactively when not provided
    #[clap(short, long, env)]
    pub private_key: Option<PrivateKey>,

    /// Overrides the RPC Url of the configured network
    #[clap(short, long, env)]
    pub rpc_url: Option<Url>,

    /// Address of the token contract passed to the vault constructor
    #[clap(short, long, env)]
    pub token_address: Option<Address>,

    /// Directory holding the compiled `.bin` and `.abi` artifacts
    #[clap(long, env)]
    pub build_dir: Option<PathBuf>,

    /// Directory the deployment record is written to
    #[clap(long, env)]
    pub deployments_dir: Option<PathBuf>,
}

impl Args {
    /// Parses the command line.
    ///
    /// Help and version requests print and exit. Every other parse failure
    /// (a malformed private key, token address or RPC url) is returned so it
    /// fails the run like any other error.
    pub fn try_parse_args<I, T>(args: I) -> eyre::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match Self::try_parse_from(args) {
            Ok(args) => Ok(args),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
                ) =>
            {
                err.exit()
            }
            Err(err) => Err(err.into()),
        }
    }
}
