//! 网络绑定配置

use serde::{Deserialize, Serialize};
use std::net::{AddrParseError, SocketAddr};

/// 网络绑定配置
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BindConfig {
    /// gRPC 服务绑定配置
    #[serde(default)]
    pub grpc: GrpcBindConfig,
}

/// gRPC 服务绑定配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GrpcBindConfig {
    /// 监听地址
    ///
    /// 内部部署可使用 "127.0.0.1"，对外服务使用 "0.0.0.0"
    #[serde(default = "default_grpc_ip")]
    pub ip: String,

    /// 监听端口，不允许使用特权端口（< 1024）
    #[serde(default = "default_grpc_port")]
    pub port: u16,
}

impl Default for GrpcBindConfig {
    fn default() -> Self {
        Self {
            ip: default_grpc_ip(),
            port: default_grpc_port(),
        }
    }
}

impl GrpcBindConfig {
    /// 解析为监听地址
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.ip, self.port).parse()
    }

    /// 客户端访问地址，未指定地址时回落到本机回环
    pub fn endpoint(&self) -> String {
        let host = if self.ip == "0.0.0.0" {
            "127.0.0.1"
        } else {
            self.ip.as_str()
        };
        format!("http://{host}:{}", self.port)
    }
}

fn default_grpc_ip() -> String {
    "0.0.0.0".to_string()
}

fn default_grpc_port() -> u16 {
    50051
}
