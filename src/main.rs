//! realm-mgr 服务主程序
//!
//! 加载配置、初始化日志、连接存储后端并启动 Realm gRPC 服务

mod cli;
mod error;
mod observability;

use clap::Parser;
use observability::init_observability;
use realm_mgr::RealmGrpcService;
use realm_mgr_common::config::RealmMgrConfig;
use std::path::{Path, PathBuf};

use tracing::{error, info};

macro_rules! bootstrap_info {
    ($($arg:tt)*) => {
        println!($($arg)*);
    };
}

macro_rules! bootstrap_error {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

use cli::{Cli, Commands};
use error::{Error, Result};

/// Application launcher utilities
struct ApplicationLauncher;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Test { config_file }) => {
            let config_path =
                ApplicationLauncher::find_config_file(config_file.as_ref().unwrap_or(&cli.config))?;
            ApplicationLauncher::test_config_file(&config_path)
        }
        None => {
            let config_path = ApplicationLauncher::find_config_file(&cli.config)?;

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            runtime.block_on(ApplicationLauncher::run_application(&config_path))
        }
    }
}

impl ApplicationLauncher {
    /// Find config file with fallback locations
    fn find_config_file(provided_path: &PathBuf) -> Result<PathBuf> {
        // An explicit path must exist, no fallback
        if provided_path != Path::new("config.toml") {
            if provided_path.exists() {
                bootstrap_info!("Using provided config file: {:?}", provided_path);
                return Ok(provided_path.clone());
            } else {
                bootstrap_error!("Provided config file not found: {:?}", provided_path);
                return Err(Error::custom(format!(
                    "Config file not found: {provided_path:?}"
                )));
            }
        }

        let fallback_paths = vec![
            PathBuf::from("config.toml"),
            PathBuf::from("/etc/realm-mgr/config.toml"),
        ];

        bootstrap_info!("Searching for config file in default locations...");

        for path in &fallback_paths {
            if path.exists() {
                bootstrap_info!("Found config file: {:?}", path);
                return Ok(path.clone());
            } else {
                bootstrap_info!("Config not found at: {:?}", path);
            }
        }

        bootstrap_error!("No configuration file found!");
        bootstrap_error!("Please create a config file in one of these locations:");
        for (i, path) in fallback_paths.iter().enumerate() {
            bootstrap_error!("  {}. {:?}", i + 1, path);
        }
        bootstrap_error!("Or specify a custom path with: realm-mgr --config <path>");

        Err(Error::custom(
            "No configuration file found. Please create one or specify path with --config",
        ))
    }

    /// 测试配置文件是否有效
    fn test_config_file(config_path: &Path) -> Result<()> {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();

        match RealmMgrConfig::from_file(config_path) {
            Ok(config) => {
                info!("✅ 配置文件解析成功: {:?}", config_path);

                if let Err(errors) = config.validate() {
                    error!("❌ 配置验证发现问题:");
                    for (i, err) in errors.iter().enumerate() {
                        if err.starts_with("Warning:") {
                            info!("  {}. ⚠️  {}", i + 1, err);
                        } else {
                            error!("  {}. ❌ {}", i + 1, err);
                        }
                    }
                    if errors.iter().any(|e| !e.starts_with("Warning:")) {
                        eprintln!("配置验证失败: {}", errors.join("; "));
                        return Err(Error::service_validation("配置验证失败".to_string()));
                    }
                }

                info!("✅ 完整配置验证通过");
                Ok(())
            }
            Err(e) => {
                error!("❌ 配置文件解析失败: {}", e);
                eprintln!("配置解析失败: {e}");
                Err(Error::service_validation(format!("配置解析失败: {e}")))
            }
        }
    }

    /// 运行应用程序的主入口
    async fn run_application(config_path: &Path) -> Result<()> {
        bootstrap_info!("📄 加载配置文件: {:?}", config_path);

        let config = match RealmMgrConfig::from_file(config_path) {
            Ok(config) => {
                bootstrap_info!("✅ 配置加载成功");

                if let Err(errors) = config.validate() {
                    bootstrap_error!("❌ 配置验证发现问题:");
                    let mut has_critical_errors = false;
                    for (i, err) in errors.iter().enumerate() {
                        if err.starts_with("Warning:") {
                            bootstrap_info!("  {}. ⚠️  {}", i + 1, err);
                        } else {
                            bootstrap_error!("  {}. ❌ {}", i + 1, err);
                            has_critical_errors = true;
                        }
                    }
                    if has_critical_errors {
                        return Err(Error::custom("配置验证失败，请修复上述错误".to_string()));
                    }
                }

                config
            }
            Err(e) => {
                bootstrap_error!("❌ 配置加载失败: {}", e);
                return Err(Error::custom(format!("配置加载失败: {e}")));
            }
        };

        let _observability_guard = init_observability(&config)?;

        Self::run_services(config).await
    }

    /// 连接存储并运行 gRPC 服务直到收到关闭信号
    async fn run_services(config: RealmMgrConfig) -> Result<()> {
        info!(
            "🚀 启动 realm-mgr 实例 {} (env: {})",
            config.name, config.env
        );

        let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(10);
        setup_ctrl_c_handler(shutdown_tx.clone()).await;

        let mut grpc_service = RealmGrpcService::new(config.clone());
        let ops = grpc_service
            .connect_storage()
            .await
            .map_err(|e| Error::service_startup(format!("存储初始化失败: {e}")))?;
        info!("✅ 存储后端初始化完成: {}", ops.backend_name());

        let shutdown_rx = shutdown_tx.subscribe();
        let handle = tokio::spawn(async move { grpc_service.start(ops, shutdown_rx).await });

        info!("🔌 gRPC 服务:");
        info!("  - Realm gRPC Server: {}", config.bind.grpc.endpoint());

        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Realm gRPC service failed: {}", e);
                return Err(Error::service_startup(format!("Realm gRPC 服务失败: {e}")));
            }
            Err(e) => {
                error!("Service task terminated unexpectedly: {}", e);
                let _ = shutdown_tx.send(());
                return Err(e.into());
            }
        }

        info!("🛑 所有服务已安全关闭");
        Ok(())
    }
}

/// 设置Ctrl-C信号处理程序
async fn setup_ctrl_c_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("无法监听Ctrl-C信号: {}", e);
            return;
        }
        info!("收到Ctrl-C信号，开始优雅关闭...");
        let _ = shutdown_tx.send(());
    });
}
