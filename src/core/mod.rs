pub mod filename;
pub mod http_client;
pub mod redirect;
pub mod stream_proxy;
