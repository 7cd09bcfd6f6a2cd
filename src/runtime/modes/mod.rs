//! 运行模式，目前只有 HTTP 服务

pub mod server;

pub use server::run_server;
