//! 命令行参数
//!
//! 参数覆盖 TOML 文件和环境变量中的同名配置。

use clap::Parser;

use super::StaticConfig;

/// URL shortener service
#[derive(Parser, Debug, Default)]
#[command(name = "shortener")]
#[command(version)]
#[command(about = "URL shortener service", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Address to listen on, e.g. localhost:8080
    #[arg(short = 'a', long = "address")]
    pub address: Option<String>,

    /// Base address used to build short URLs
    #[arg(short = 'b', long = "base-url")]
    pub base_url: Option<String>,

    /// Path of the append-only file storage
    #[arg(short = 'f', long = "file-storage-path")]
    pub file_storage_path: Option<String>,

    /// Database DSN (sqlite:, postgres://, mysql://)
    #[arg(short = 'd', long = "database-dsn")]
    pub database_dsn: Option<String>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub generate_config: bool,
}

impl Cli {
    /// 把显式给出的参数写入配置
    pub fn apply(&self, config: &mut StaticConfig) {
        if let Some(address) = &self.address {
            config.server.address = address.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.server.base_url = base_url.clone();
        }
        if let Some(path) = &self.file_storage_path {
            config.storage.file_storage_path = path.clone();
        }
        if let Some(dsn) = &self.database_dsn {
            config.storage.database_dsn = dsn.clone();
        }
    }
}
