use anyhow::Context;
use clap::Parser;

use portal_api::{ApiClient, ApiConfig};
use portal_auth::FileTokenStore;
use portal_cli::{App, Cli};
use portal_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = LogFormat::parse(&cli.log_format);
    portal_observability::init_with(format, "warn");

    let store = match &cli.token_file {
        Some(path) => FileTokenStore::new(path),
        None => FileTokenStore::in_data_dir().context("failed to locate the token file")?,
    };
    tracing::debug!(token_file = %store.path().display(), "using token store");

    let mut config = ApiConfig::from_env();
    if let Some(url) = &cli.api_url {
        config.base_url = url.clone();
    }
    if cli.insecure {
        config.accept_invalid_certs = true;
    }
    let api = ApiClient::new(&config).context("failed to build the API client")?;

    let mut app = App::new(api);
    app.bootstrap(store).context("failed to restore the session")?;

    let mut stdout = std::io::stdout().lock();
    app.run(cli.command, &mut stdout).await
}
