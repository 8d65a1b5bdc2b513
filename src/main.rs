use clap::Parser;
use std::path::PathBuf;
use vk_photo_backup::utils::{logger, validation::Validate};
use vk_photo_backup::{
    BackupEngine, BackupReport, BackupRequest, CliConfig, GoogleAuth, GoogleDrive, HttpDownloader,
    Secrets, VkClient, YandexDisk,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = CliConfig::parse();
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting vk-photo-backup");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // Secrets are read before any network call; a missing variable ends the
    // run right here.
    let secrets = match Secrets::from_env() {
        Ok(secrets) => secrets,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    match run(config, secrets).await {
        Ok(report) => {
            println!(
                "Backup finished: {} photos backed up, {} skipped",
                report.processed, report.skipped
            );
            println!("Manifest saved to {}", report.manifest_path.display());
        }
        Err(e) => {
            tracing::error!("Backup failed: {}", e);
            eprintln!("Backup failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn run(config: CliConfig, secrets: Secrets) -> vk_photo_backup::Result<BackupReport> {
    let http = reqwest::Client::new();

    let vk_token = VkClient::refresh_access_token(
        &http,
        &config.vk_oauth_url,
        &secrets.vk_client_id,
        &secrets.vk_client_secret,
        &secrets.vk_refresh_token,
    )
    .await?;
    if vk_token.refresh_token != secrets.vk_refresh_token {
        tracing::warn!(
            "VK issued a rotated refresh token; update VK_REFRESH_TOKEN before the next run"
        );
    }
    tracing::info!("VK access token refreshed");

    // May block on the interactive consent flow on first use.
    let auth = GoogleAuth::new(http.clone(), &config.token_path, &config.credentials_path);
    let google_token = auth.authenticate().await?;
    tracing::info!("Google Drive credential ready");

    let source = VkClient::with_token(
        http.clone(),
        config.vk_api_base.as_str(),
        vk_token.access_token,
    );
    let downloader = HttpDownloader::new(http.clone());
    let disk = YandexDisk::new(
        http.clone(),
        config.yandex_api_base.as_str(),
        secrets.yandex_token.as_str(),
    );
    let drive = GoogleDrive::new(http, config.gdrive_upload_base.as_str(), google_token);

    let engine = BackupEngine::new(
        source,
        downloader,
        disk,
        drive,
        BackupRequest {
            owner_id: config.owner_id,
            album_id: config.album_id.clone(),
            count: config.count,
            photos_dir: PathBuf::from(&config.photos_dir),
            manifest_path: PathBuf::from(&config.manifest_path),
        },
    );

    engine.run().await
}
